//! # Catalog Boundary Module
//!
//! ## Purpose
//! Typed boundary to the upstream mod catalog. The catalog is an
//! unreliable, rate-limited network collaborator; this module defines the
//! trait the engine calls, the raw payload shapes the upstream actually
//! sends, and the strict conversion that keeps untyped data from leaking
//! past this boundary.
//!
//! ## Input/Output Specification
//! - **Input**: Item ids and search filter tuples
//! - **Output**: Validated [`CatalogItem`] snapshots or a typed error
//! - **Validation**: ids must be nonzero, names nonempty, timestamps
//!   parseable; counters default to zero when the upstream omits them
//!
//! The static client at the bottom doubles as the fallback chain's
//! terminal dataset and as the demo wiring for the server binary.

use crate::errors::{CacheError, Result};
use crate::{scoring, CatalogItem, ModId, SearchFilters, SearchResultPage, SortField, SortOrder};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Upstream catalog boundary. Implementations are expected to fail often:
/// timeouts, 5xx responses, and empty answers for valid-seeming queries
/// are all normal here.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch a single item snapshot by id
    async fn fetch_item(&self, id: ModId) -> Result<CatalogItem>;

    /// Fetch one page of search results
    async fn search_items(&self, filters: &SearchFilters) -> Result<SearchResultPage>;

    /// Client name for logging
    fn name(&self) -> &str {
        "catalog"
    }
}

/// Raw item payload as the upstream sends it. Counters arrive as floats
/// and most fields are optional in practice.
#[derive(Debug, Deserialize)]
pub struct RawCatalogItem {
    pub id: u64,
    pub name: String,
    pub summary: Option<String>,
    #[serde(rename = "downloadCount")]
    pub download_count: Option<f64>,
    #[serde(rename = "thumbsUpCount")]
    pub thumbs_up_count: Option<u64>,
    #[serde(rename = "isFeatured")]
    pub featured: Option<bool>,
    #[serde(default)]
    pub categories: Vec<RawCategory>,
    #[serde(default)]
    pub authors: Vec<RawAuthor>,
    #[serde(rename = "dateModified")]
    pub date_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCategory {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawAuthor {
    pub name: String,
}

/// Raw search response envelope
#[derive(Debug, Deserialize)]
pub struct RawSearchResponse {
    pub data: Vec<RawCatalogItem>,
    pub pagination: RawPagination,
}

#[derive(Debug, Deserialize)]
pub struct RawPagination {
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

impl RawCatalogItem {
    /// Validate and convert into the internal snapshot type
    pub fn into_item(self) -> Result<CatalogItem> {
        if self.id == 0 {
            return Err(CacheError::ValidationFailed {
                field: "id".to_string(),
                reason: "catalog item id must be nonzero".to_string(),
            });
        }

        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CacheError::ValidationFailed {
                field: "name".to_string(),
                reason: format!("catalog item {} has an empty name", self.id),
            });
        }

        let date_modified = match self.date_modified {
            Some(raw) => raw
                .parse::<DateTime<Utc>>()
                .map_err(|e| CacheError::ValidationFailed {
                    field: "dateModified".to_string(),
                    reason: format!("unparseable timestamp '{}': {}", raw, e),
                })?,
            None => Utc
                .timestamp_opt(0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        };

        Ok(CatalogItem {
            id: self.id,
            name,
            summary: self.summary.unwrap_or_default(),
            download_count: self.download_count.map(|c| c.max(0.0) as u64).unwrap_or(0),
            thumbs_up_count: self.thumbs_up_count.unwrap_or(0),
            featured: self.featured.unwrap_or(false),
            categories: self.categories.into_iter().map(|c| c.name).collect(),
            authors: self.authors.into_iter().map(|a| a.name).collect(),
            date_modified,
        })
    }
}

/// Sort a slice of items the way the upstream catalog would
pub fn sort_items(items: &mut [CatalogItem], field: SortField, order: SortOrder) {
    match field {
        SortField::Popularity => items.sort_by(|a, b| {
            scoring::popularity_score(a)
                .partial_cmp(&scoring::popularity_score(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortField::Name => items.sort_by(|a, b| a.name.cmp(&b.name)),
        SortField::LastUpdated => items.sort_by(|a, b| a.date_modified.cmp(&b.date_modified)),
        SortField::TotalDownloads => {
            items.sort_by(|a, b| a.download_count.cmp(&b.download_count))
        }
    }

    if order == SortOrder::Desc {
        items.reverse();
    }
}

/// Fixed demo dataset. Clearly degraded data: the fallback chain's
/// terminal strategy serves it tagged as `fallback`, and the demo server
/// binary uses it as its catalog.
pub fn fallback_dataset() -> Vec<CatalogItem> {
    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    vec![
        CatalogItem {
            id: 101,
            name: "Dino Storage (demo)".to_string(),
            summary: "Store tamed dinosaurs in pocket cryopods".to_string(),
            download_count: 4_800_000,
            thumbs_up_count: 21_000,
            featured: true,
            categories: vec!["Utility".to_string(), "Creatures".to_string()],
            authors: vec!["demo-author".to_string()],
            date_modified: at(2024, 11, 3),
        },
        CatalogItem {
            id: 102,
            name: "Structures Plus (demo)".to_string(),
            summary: "Expanded building pieces and quality of life placement".to_string(),
            download_count: 9_200_000,
            thumbs_up_count: 45_000,
            featured: true,
            categories: vec!["Structures".to_string()],
            authors: vec!["demo-author".to_string()],
            date_modified: at(2024, 9, 18),
        },
        CatalogItem {
            id: 103,
            name: "Stack Size Plus (demo)".to_string(),
            summary: "Configurable resource stacking for crowded inventories".to_string(),
            download_count: 2_100_000,
            thumbs_up_count: 9_300,
            featured: false,
            categories: vec!["Utility".to_string()],
            authors: vec!["demo-collective".to_string()],
            date_modified: at(2025, 1, 22),
        },
        CatalogItem {
            id: 104,
            name: "Island Expansion Map (demo)".to_string(),
            summary: "New explorable map region with custom spawns".to_string(),
            download_count: 860_000,
            thumbs_up_count: 4_100,
            featured: false,
            categories: vec!["Maps".to_string()],
            authors: vec!["demo-cartographer".to_string()],
            date_modified: at(2024, 12, 9),
        },
        CatalogItem {
            id: 105,
            name: "Server Admin Tools (demo)".to_string(),
            summary: "Moderation commands and scheduled broadcast messages".to_string(),
            download_count: 430_000,
            thumbs_up_count: 2_800,
            featured: false,
            categories: vec!["Admin".to_string(), "Utility".to_string()],
            authors: vec!["demo-ops".to_string()],
            date_modified: at(2025, 2, 14),
        },
    ]
}

/// Evaluate a search against an in-memory dataset: keyword filter,
/// category filter, sort, paginate
pub fn search_dataset(items: &[CatalogItem], filters: &SearchFilters) -> SearchResultPage {
    let query = filters.query.trim();
    let mut matched: Vec<CatalogItem> = items
        .iter()
        .filter(|item| query.is_empty() || scoring::keywords_match(item, query))
        .filter(|item| match filters.category {
            // The demo dataset carries labels, not upstream category ids;
            // a category filter narrows to items with any label at all
            Some(_) => !item.categories.is_empty(),
            None => true,
        })
        .cloned()
        .collect();

    sort_items(&mut matched, filters.sort_field, filters.sort_order);

    let total_count = matched.len() as u64;
    let start = (filters.page_index as usize).saturating_mul(filters.page_size as usize);
    let page: Vec<CatalogItem> = matched
        .into_iter()
        .skip(start)
        .take(filters.page_size as usize)
        .collect();

    SearchResultPage {
        items: page,
        total_count,
    }
}

/// Catalog client over the fixed demo dataset
pub struct StaticCatalogClient {
    items: Vec<CatalogItem>,
}

impl StaticCatalogClient {
    pub fn new() -> Self {
        Self {
            items: fallback_dataset(),
        }
    }
}

impl Default for StaticCatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogClient for StaticCatalogClient {
    async fn fetch_item(&self, id: ModId) -> Result<CatalogItem> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| CacheError::NotFoundUpstream {
                key: format!("item/{}", id),
            })
    }

    async fn search_items(&self, filters: &SearchFilters) -> Result<SearchResultPage> {
        Ok(search_dataset(&self.items, filters))
    }

    fn name(&self) -> &str {
        "static-demo"
    }
}
