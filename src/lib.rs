//! # Mod Catalog Cache & Retrieval Engine
//!
//! ## Overview
//! This library implements the metadata cache and resilient retrieval engine
//! behind a game-server dashboard. It fetches, scores, stores, and re-serves
//! mod catalog metadata (individual items and paginated search results) from
//! an aggressively rate-limited, frequently unavailable upstream catalog.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `store`: Bounded, TTL-aware entry store for items and search pages
//! - `mirror`: Optional sled-backed durable mirror surviving restarts
//! - `scoring`: Popularity scoring and search keyword extraction
//! - `ratelimit`: Token bucket bounding total upstream call volume
//! - `catalog`: Typed boundary to the upstream catalog client
//! - `warmer`: Background refresh loop for popular query buckets
//! - `resolver`: Request-facing orchestrator with a layered fallback chain
//! - `api`: Thin HTTP surface exposing the engine operations
//! - `config`: Configuration management and tunable defaults
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Item ids and search filter tuples from the dashboard routes
//! - **Output**: Best-effort results tagged with their source
//!   (`cache` / `live` / `fallback`) — never an error
//! - **Guarantees**: TTL correctness, bounded memory, at-most-one in-flight
//!   resolution per key, deterministic fallback ordering
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use modcache::catalog::StaticCatalogClient;
//! use modcache::ratelimit::TokenBucket;
//! use modcache::resolver::Resolver;
//! use modcache::store::EntryStore;
//! use modcache::Config;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(Config::default());
//!     let store = Arc::new(EntryStore::new(config.cache.clone(), None));
//!     let bucket = Arc::new(TokenBucket::new(
//!         config.warmer.bucket_capacity,
//!         config.warmer.refill_per_second,
//!     ));
//!     let client = Arc::new(StaticCatalogClient::new());
//!     let resolver = Resolver::new(config, store, bucket, client);
//!     let result = resolver.resolve_item(101).await;
//!     println!("source: {}", result.source);
//! }
//! ```

// Core modules
pub mod catalog;
pub mod config;
pub mod errors;
pub mod mirror;
pub mod ratelimit;
pub mod resolver;
pub mod scoring;
pub mod store;
pub mod warmer;

// HTTP surface
pub mod api;

// Re-exports for convenience
pub use config::Config;
pub use errors::{CacheError, Result};
pub use resolver::{ResolvedItem, ResolvedSearch, Resolver};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Unique identifier for catalog items, assigned upstream
pub type ModId = u64;

/// Immutable-per-fetch snapshot of one catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Upstream-assigned numeric id (identity)
    pub id: ModId,
    /// Display name
    pub name: String,
    /// Free-text summary
    pub summary: String,
    /// Total download count
    pub download_count: u64,
    /// Thumbs-up / endorsement count
    pub thumbs_up_count: u64,
    /// Whether the catalog marks this item as featured
    pub featured: bool,
    /// Category labels
    pub categories: Vec<String>,
    /// Author names
    pub authors: Vec<String>,
    /// Last modification timestamp reported by the catalog
    pub date_modified: DateTime<Utc>,
}

/// Sort field accepted by the upstream catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Popularity,
    Name,
    LastUpdated,
    TotalDownloads,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Search request parameters as received from the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Free-text query
    pub query: String,
    /// Optional category filter (upstream category id)
    pub category: Option<u32>,
    /// Sort field
    pub sort_field: SortField,
    /// Sort direction
    pub sort_order: SortOrder,
    /// Zero-based page index
    pub page_index: u32,
    /// Page size
    pub page_size: u32,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: None,
            sort_field: SortField::Popularity,
            sort_order: SortOrder::Desc,
            page_index: 0,
            page_size: 20,
        }
    }
}

impl SearchFilters {
    /// Filters for a simple first-page popularity search
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Cache key for this filter tuple. Pure function of the tuple; the
    /// query text is normalized so trivially different spellings share an
    /// entry.
    pub fn cache_key(&self) -> SearchKey {
        SearchKey {
            query: self.query.trim().to_lowercase(),
            category: self.category,
            sort_field: self.sort_field,
            sort_order: self.sort_order,
            page_index: self.page_index,
            page_size: self.page_size,
        }
    }
}

/// Normalized search filter tuple. Full-tuple equality defines cache
/// identity; any differing field is a different cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchKey {
    pub query: String,
    pub category: Option<u32>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub page_index: u32,
    pub page_size: u32,
}

/// One page of search results plus the upstream total count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage {
    pub items: Vec<CatalogItem>,
    pub total_count: u64,
}

/// Key under which a value lives in the entry store and durable mirror
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKey {
    Item(ModId),
    Search(SearchKey),
}

impl CacheKey {
    /// Stable byte representation used as the durable mirror's row key
    pub fn mirror_key(&self) -> String {
        match self {
            CacheKey::Item(id) => format!("item/{}", id),
            CacheKey::Search(key) => {
                let category = key
                    .category
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "search/{}/{}/{:?}/{:?}/{}/{}",
                    key.query,
                    category,
                    key.sort_field,
                    key.sort_order,
                    key.page_index,
                    key.page_size
                )
            }
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mirror_key())
    }
}

/// Value stored under a [`CacheKey`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    Item(CatalogItem),
    Page(SearchResultPage),
}

/// Where a resolved result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Served from the entry store (or promoted from the mirror)
    Cache,
    /// Fetched from the upstream catalog during this request
    Live,
    /// Degraded result: cached-scan match or the static demo dataset
    Fallback,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Cache => f.write_str("cache"),
            Source::Live => f.write_str("live"),
            Source::Fallback => f.write_str("fallback"),
        }
    }
}

/// Application state shared across components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub resolver: Arc<resolver::Resolver>,
    pub warmer: Arc<warmer::Warmer>,
    pub store: Arc<store::EntryStore>,
}
