//! # Resilient Retrieval Orchestrator
//!
//! ## Purpose
//! Request-facing façade for the engine. Deduplicates concurrent identical
//! requests, consults the entry store, and on a genuine miss walks an
//! ordered chain of recovery strategies. Always returns a best-effort,
//! tagged result; no error kind from this subsystem ever reaches a caller.
//!
//! ## Resolution State Machine
//! Deduplicating → CacheCheck → [hit: done] → StrategyChain → done
//!
//! Strategy chain, strictly in order, stopping at the first non-empty
//! result:
//! 1. Exact live fetch (token-gated fast reject, per-call timeout)
//! 2. Broadened live fetch with the query's primary keyword (search only)
//! 3. Scan of already-cached entries across all keys
//! 4. Fixed static dataset, clearly tagged as degraded data
//!
//! Live results are written back to the entry store (and mirror) before
//! returning, so the next identical request is a cache hit. The upstream
//! catalog rate-limits aggressively and sometimes 404s valid queries; this
//! layered chain trades a little precision for availability instead of
//! showing the dashboard an error page.

use crate::catalog::{self, CatalogClient};
use crate::config::Config;
use crate::ratelimit::TokenBucket;
use crate::scoring;
use crate::store::EntryStore;
use crate::{
    CacheKey, CachedValue, CatalogItem, ModId, SearchFilters, SearchKey, SearchResultPage, Source,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Resolved single item, tagged with its source
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedItem {
    pub data: Option<CatalogItem>,
    pub source: Source,
}

/// Resolved search page, tagged with its source
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSearch {
    pub data: Vec<CatalogItem>,
    pub total_count: u64,
    pub source: Source,
}

/// Internal resolution shared between dedup'd callers
#[derive(Debug, Clone)]
struct Resolution {
    value: Option<CachedValue>,
    source: Source,
}

type InflightRegistry = Arc<DashMap<CacheKey, watch::Receiver<Option<Resolution>>>>;

/// Request-facing orchestrator
pub struct Resolver {
    ctx: ChainContext,
    inflight: InflightRegistry,
}

/// Everything one resolution needs, cloneable into the spawned task so an
/// abandoned caller never cancels a resolution other callers wait on
#[derive(Clone)]
struct ChainContext {
    config: Arc<Config>,
    store: Arc<EntryStore>,
    bucket: Arc<TokenBucket>,
    client: Arc<dyn CatalogClient>,
}

impl Resolver {
    pub fn new(
        config: Arc<Config>,
        store: Arc<EntryStore>,
        bucket: Arc<TokenBucket>,
        client: Arc<dyn CatalogClient>,
    ) -> Self {
        Self {
            ctx: ChainContext {
                config,
                store,
                bucket,
                client,
            },
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Resolve a single item by id. Never fails; absence is reported as
    /// `data: None` with a `fallback` source.
    pub async fn resolve_item(&self, id: ModId) -> ResolvedItem {
        let resolution = self.resolve_key(CacheKey::Item(id)).await;
        let data = match resolution.value {
            Some(CachedValue::Item(item)) => Some(item),
            Some(CachedValue::Page(_)) | None => None,
        };
        ResolvedItem {
            data,
            source: resolution.source,
        }
    }

    /// Resolve one page of search results. Never fails; exhaustion ends at
    /// the static dataset tagged `fallback`.
    pub async fn resolve_search(&self, filters: &SearchFilters) -> ResolvedSearch {
        let resolution = self
            .resolve_key(CacheKey::Search(filters.cache_key()))
            .await;
        match resolution.value {
            Some(CachedValue::Page(page)) => ResolvedSearch {
                data: page.items,
                total_count: page.total_count,
                source: resolution.source,
            },
            Some(CachedValue::Item(item)) => ResolvedSearch {
                data: vec![item],
                total_count: 1,
                source: resolution.source,
            },
            None => ResolvedSearch {
                data: Vec::new(),
                total_count: 0,
                source: resolution.source,
            },
        }
    }

    /// Number of resolutions currently in flight (observability)
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Dedup layer: at most one resolution per key is ever in flight.
    /// Followers attach to the leader's watch channel; the registry entry
    /// is removed when the resolution completes, so later requests start
    /// fresh.
    async fn resolve_key(&self, key: CacheKey) -> Resolution {
        let rx = match self.inflight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                tracing::debug!("attaching to in-flight resolution for {}", key);
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(rx.clone());

                let ctx = self.ctx.clone();
                let inflight = self.inflight.clone();
                let task_key = key.clone();
                tokio::spawn(async move {
                    let resolution = ctx.run(&task_key).await;
                    let _ = tx.send(Some(resolution));
                    inflight.remove(&task_key);
                });

                rx
            }
        };

        let mut rx = rx;
        let resolution = match rx.wait_for(|value| value.is_some()).await {
            Ok(value) => value.clone().unwrap_or_else(|| self.ctx.static_fallback(&key)),
            // Leader task gone without an answer; fall back rather than fail
            Err(_) => self.ctx.static_fallback(&key),
        };
        resolution
    }
}

impl ChainContext {
    async fn run(&self, key: &CacheKey) -> Resolution {
        if let Some(value) = self.store.get(key).await {
            return Resolution {
                value: Some(value),
                source: Source::Cache,
            };
        }

        match key {
            CacheKey::Item(id) => self.run_item_chain(*id).await,
            CacheKey::Search(search_key) => self.run_search_chain(search_key).await,
        }
    }

    async fn run_item_chain(&self, id: ModId) -> Resolution {
        let key = CacheKey::Item(id);

        // Strategy 1: exact live fetch
        match self.live_fetch_item(id).await {
            Ok(item) => {
                self.store
                    .put(key, CachedValue::Item(item.clone()))
                    .await;
                return Resolution {
                    value: Some(CachedValue::Item(item)),
                    source: Source::Live,
                };
            }
            Err(e @ crate::CacheError::RateLimitExceeded { .. }) => {
                tracing::debug!("skipping live item fetch for {}: {}", id, e);
            }
            Err(e) => {
                tracing::warn!("live item fetch for {} failed ({}): {}", id, e.category(), e);
            }
        }

        // Strategy 2: scan cached search pages for the item
        if let Some(item) = self.scan_cached_item(id).await {
            self.store
                .put(key, CachedValue::Item(item.clone()))
                .await;
            return Resolution {
                value: Some(CachedValue::Item(item)),
                source: Source::Fallback,
            };
        }

        // Strategy 3: static dataset
        self.static_fallback(&key)
    }

    async fn run_search_chain(&self, search_key: &SearchKey) -> Resolution {
        let key = CacheKey::Search(search_key.clone());
        let filters = filters_from_key(search_key);

        // Strategy 1: exact live fetch
        if let Some(page) = self.try_live_search(&filters, "exact").await {
            self.write_back_page(&key, &page).await;
            return Resolution {
                value: Some(CachedValue::Page(page)),
                source: Source::Live,
            };
        }

        // Strategy 2: broadened live fetch with the primary keyword
        if let Some(broadened) = broaden_filters(&filters) {
            if let Some(page) = self.try_live_search(&broadened, "broadened").await {
                self.write_back_page(&key, &page).await;
                return Resolution {
                    value: Some(CachedValue::Page(page)),
                    source: Source::Live,
                };
            }
        }

        // Strategy 3: scan every cached entry for anything matching
        if let Some(page) = self.scan_cached_entries(&filters).await {
            // Promote under the request key so the next identical request
            // skips the scan
            self.store
                .put(key.clone(), CachedValue::Page(page.clone()))
                .await;
            return Resolution {
                value: Some(CachedValue::Page(page)),
                source: Source::Fallback,
            };
        }

        // Strategy 4: static dataset, never written back so degraded data
        // stays tagged as such
        self.static_fallback(&key)
    }

    /// Token-gated, timeout-bounded live search. Returns `None` on any
    /// failure or an empty page, logging which strategy failed and why.
    async fn try_live_search(
        &self,
        filters: &SearchFilters,
        strategy: &str,
    ) -> Option<SearchResultPage> {
        match self.live_fetch_page(filters).await {
            Ok(page) if !page.items.is_empty() => Some(page),
            Ok(_) => {
                tracing::debug!("{} live search for '{}' returned empty", strategy, filters.query);
                None
            }
            Err(e @ crate::CacheError::RateLimitExceeded { .. }) => {
                tracing::debug!(
                    "skipping {} live search for '{}': {}",
                    strategy,
                    filters.query,
                    e
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    "{} live search for '{}' failed ({}): {}",
                    strategy,
                    filters.query,
                    e.category(),
                    e
                );
                None
            }
        }
    }

    /// Fetch one item, gated on the shared rate budget. A missing token is
    /// reported as `RateLimitExceeded` without touching the upstream.
    async fn live_fetch_item(&self, id: ModId) -> crate::Result<CatalogItem> {
        if !self.bucket.try_consume(1.0) {
            return Err(crate::CacheError::RateLimitExceeded {
                source_name: self.client.name().to_string(),
            });
        }

        let timeout = self.config.catalog.fetch_timeout();
        match tokio::time::timeout(timeout, self.client.fetch_item(id)).await {
            Ok(result) => result,
            Err(_) => Err(crate::CacheError::UpstreamTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Fetch one search page, gated on the shared rate budget
    async fn live_fetch_page(&self, filters: &SearchFilters) -> crate::Result<SearchResultPage> {
        if !self.bucket.try_consume(1.0) {
            return Err(crate::CacheError::RateLimitExceeded {
                source_name: self.client.name().to_string(),
            });
        }

        let timeout = self.config.catalog.fetch_timeout();
        match tokio::time::timeout(timeout, self.client.search_items(filters)).await {
            Ok(result) => result,
            Err(_) => Err(crate::CacheError::UpstreamTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Write a live page back under its search key and each contained item
    /// under its own key, so item lookups also benefit from the fetch
    async fn write_back_page(&self, key: &CacheKey, page: &SearchResultPage) {
        self.store
            .put(key.clone(), CachedValue::Page(page.clone()))
            .await;
        for item in &page.items {
            self.store
                .put(CacheKey::Item(item.id), CachedValue::Item(item.clone()))
                .await;
        }
    }

    /// Degraded pass: anything already cached under any key beats nothing
    async fn scan_cached_entries(&self, filters: &SearchFilters) -> Option<SearchResultPage> {
        let query = filters.query.trim();
        let mut matched: Vec<CatalogItem> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for (_, value) in self.store.unexpired_values().await {
            let candidates: Vec<CatalogItem> = match value {
                CachedValue::Item(item) => vec![item],
                CachedValue::Page(page) => page.items,
            };
            for item in candidates {
                if !seen.insert(item.id) {
                    continue;
                }
                if query.is_empty() || scoring::keywords_match(&item, query) {
                    matched.push(item);
                }
            }
        }

        if matched.is_empty() {
            return None;
        }

        catalog::sort_items(&mut matched, filters.sort_field, filters.sort_order);
        let total_count = matched.len() as u64;
        matched.truncate(filters.page_size as usize);
        tracing::info!(
            "cached-entry scan satisfied '{}' with {} degraded results",
            query,
            total_count
        );

        Some(SearchResultPage {
            items: matched,
            total_count,
        })
    }

    async fn scan_cached_item(&self, id: ModId) -> Option<CatalogItem> {
        for (_, value) in self.store.unexpired_values().await {
            if let CachedValue::Page(page) = value {
                if let Some(item) = page.items.into_iter().find(|item| item.id == id) {
                    tracing::info!("cached-entry scan recovered item {}", id);
                    return Some(item);
                }
            }
        }
        None
    }

    /// Terminal strategy: the fixed demo dataset. Always yields an answer.
    fn static_fallback(&self, key: &CacheKey) -> Resolution {
        match key {
            CacheKey::Item(id) => {
                let item = catalog::fallback_dataset()
                    .into_iter()
                    .find(|item| item.id == *id);
                Resolution {
                    value: item.map(CachedValue::Item),
                    source: Source::Fallback,
                }
            }
            CacheKey::Search(search_key) => {
                let filters = filters_from_key(search_key);
                let dataset = catalog::fallback_dataset();
                let mut page = catalog::search_dataset(&dataset, &filters);
                if page.items.is_empty() {
                    // The chain must terminate with something to show
                    let mut unfiltered = filters.clone();
                    unfiltered.query = String::new();
                    unfiltered.category = None;
                    unfiltered.page_index = 0;
                    page = catalog::search_dataset(&dataset, &unfiltered);
                }
                Resolution {
                    value: Some(CachedValue::Page(page)),
                    source: Source::Fallback,
                }
            }
        }
    }
}

/// Rebuild request filters from a normalized search key
fn filters_from_key(key: &SearchKey) -> SearchFilters {
    SearchFilters {
        query: key.query.clone(),
        category: key.category,
        sort_field: key.sort_field,
        sort_order: key.sort_order,
        page_index: key.page_index,
        page_size: key.page_size,
    }
}

/// Broadened variant of a query: primary keyword only, category filter
/// dropped, first page. `None` when broadening would not change anything.
fn broaden_filters(filters: &SearchFilters) -> Option<SearchFilters> {
    let keyword = scoring::primary_keyword(&filters.query)?;
    if keyword == filters.query.trim().to_lowercase() && filters.category.is_none() {
        return None;
    }

    Some(SearchFilters {
        query: keyword,
        category: None,
        sort_field: filters.sort_field,
        sort_order: filters.sort_order,
        page_index: 0,
        page_size: filters.page_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::errors::CacheError;
    use crate::store::{EntryStore, ManualClock};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn item(id: ModId, name: &str) -> CatalogItem {
        CatalogItem {
            id,
            name: name.to_string(),
            summary: format!("{} summary", name),
            download_count: 1000 * id,
            thumbs_up_count: 10 * id,
            featured: false,
            categories: vec![],
            authors: vec![],
            date_modified: Utc::now(),
        }
    }

    /// Scripted catalog double: canned pages per query, optional latency,
    /// optional total failure, call counters
    struct ScriptedClient {
        items: Mutex<HashMap<ModId, CatalogItem>>,
        pages: Mutex<HashMap<String, Vec<CatalogItem>>>,
        fail_all: AtomicBool,
        delay: Option<Duration>,
        fetch_calls: AtomicUsize,
        search_calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                items: Mutex::new(HashMap::new()),
                pages: Mutex::new(HashMap::new()),
                fail_all: AtomicBool::new(false),
                delay: None,
                fetch_calls: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
            }
        }

        fn with_page(self, query: &str, items: Vec<CatalogItem>) -> Self {
            self.pages.lock().insert(query.to_string(), items);
            self
        }

        fn with_item(self, item: CatalogItem) -> Self {
            self.items.lock().insert(item.id, item);
            self
        }

        fn failing(self) -> Self {
            self.fail_all.store(true, Ordering::Relaxed);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl CatalogClient for ScriptedClient {
        async fn fetch_item(&self, id: ModId) -> crate::Result<CatalogItem> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_all.load(Ordering::Relaxed) {
                return Err(CacheError::TransientUpstream {
                    source_name: "scripted".to_string(),
                    details: "503".to_string(),
                });
            }
            self.items
                .lock()
                .get(&id)
                .cloned()
                .ok_or(CacheError::NotFoundUpstream {
                    key: format!("item/{}", id),
                })
        }

        async fn search_items(&self, filters: &SearchFilters) -> crate::Result<SearchResultPage> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_all.load(Ordering::Relaxed) {
                return Err(CacheError::TransientUpstream {
                    source_name: "scripted".to_string(),
                    details: "503".to_string(),
                });
            }
            let items = self
                .pages
                .lock()
                .get(filters.query.trim().to_lowercase().as_str())
                .cloned()
                .unwrap_or_default();
            let total_count = items.len() as u64;
            Ok(SearchResultPage { items, total_count })
        }
    }

    struct Harness {
        resolver: Arc<Resolver>,
        store: Arc<EntryStore>,
        bucket: Arc<TokenBucket>,
        client: Arc<ScriptedClient>,
    }

    fn harness(client: ScriptedClient, bucket_capacity: f64) -> Harness {
        let config = Arc::new(Config::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(EntryStore::with_clock(config.cache.clone(), None, clock));
        // Slow refill so tests control the token count exactly
        let bucket = Arc::new(TokenBucket::new(bucket_capacity, 0.0001));
        let client = Arc::new(client);
        let resolver = Arc::new(Resolver::new(
            config,
            store.clone(),
            bucket.clone(),
            client.clone(),
        ));
        Harness {
            resolver,
            store,
            bucket,
            client,
        }
    }

    #[tokio::test]
    async fn live_search_then_cache_hit_within_ttl() {
        let items: Vec<CatalogItem> = (1..=5).map(|id| item(id, &format!("Dino {}", id))).collect();
        let h = harness(ScriptedClient::new().with_page("dino", items), 10.0);

        let filters = SearchFilters::for_query("dino");
        let first = h.resolver.resolve_search(&filters).await;
        assert_eq!(first.source, Source::Live);
        assert_eq!(first.data.len(), 5);

        let second = h.resolver.resolve_search(&filters).await;
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.data, first.data);
        assert_eq!(h.client.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn live_search_writes_items_through_for_item_lookups() {
        let h = harness(
            ScriptedClient::new().with_page("dino", vec![item(7, "Dino Gates")]),
            10.0,
        );

        h.resolver
            .resolve_search(&SearchFilters::for_query("dino"))
            .await;

        let resolved = h.resolver.resolve_item(7).await;
        assert_eq!(resolved.source, Source::Cache);
        assert_eq!(resolved.data.unwrap().name, "Dino Gates");
        assert_eq!(h.client.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_identical_requests_share_one_chain_execution() {
        let h = harness(
            ScriptedClient::new()
                .with_page("dino", vec![item(1, "Dino Tracker")])
                .with_delay(Duration::from_millis(100)),
            10.0,
        );

        let mut handles = Vec::new();
        for _ in 0..10 {
            let resolver = h.resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver
                    .resolve_search(&SearchFilters::for_query("dino"))
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(h.client.search_calls.load(Ordering::SeqCst), 1);
        for result in &results {
            assert_eq!(result.source, results[0].source);
            assert_eq!(result.data, results[0].data);
        }
        assert_eq!(h.resolver.inflight_count(), 0);
    }

    #[tokio::test]
    async fn broadened_query_recovers_when_exact_is_empty() {
        let h = harness(
            ScriptedClient::new().with_page("dino", vec![item(3, "Dino Arena")]),
            10.0,
        );

        // Exact "dino roar arena xyz" has no canned page; broadened "dino"
        // does
        let result = h
            .resolver
            .resolve_search(&SearchFilters::for_query("dino roar arena xyz"))
            .await;
        assert_eq!(result.source, Source::Live);
        assert_eq!(result.data.len(), 1);
        assert_eq!(h.client.search_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_tokens_fall_back_to_cached_scan_of_another_key() {
        let h = harness(ScriptedClient::new(), 2.0);

        // Seed the store under a different key
        h.store
            .put(
                CacheKey::Search(SearchFilters::for_query("creatures").cache_key()),
                CachedValue::Page(SearchResultPage {
                    items: vec![item(9, "Dino Rider Saddles")],
                    total_count: 1,
                }),
            )
            .await;

        // Drain the budget so both live strategies fast-reject
        assert!(h.bucket.try_consume(2.0));

        let result = h
            .resolver
            .resolve_search(&SearchFilters::for_query("dino"))
            .await;
        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].id, 9);
        assert_eq!(h.client.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_tokens_skip_the_live_item_fetch() {
        let h = harness(ScriptedClient::new().with_item(item(42, "Tek Elevators")), 1.0);
        assert!(h.bucket.try_consume(1.0));

        let resolved = h.resolver.resolve_item(42).await;
        assert_eq!(resolved.source, Source::Fallback);
        assert!(resolved.data.is_none());
        assert_eq!(h.client.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_ends_at_the_static_dataset() {
        let h = harness(ScriptedClient::new().failing(), 10.0);

        let result = h
            .resolver
            .resolve_search(&SearchFilters::for_query("anything at all"))
            .await;
        assert_eq!(result.source, Source::Fallback);
        assert!(!result.data.is_empty(), "chain must terminate with data");
    }

    #[tokio::test]
    async fn static_fallback_is_not_written_back() {
        let h = harness(ScriptedClient::new().failing(), 10.0);
        let filters = SearchFilters::for_query("anything at all");

        let first = h.resolver.resolve_search(&filters).await;
        assert_eq!(first.source, Source::Fallback);

        // A second identical request is still tagged fallback, not cache
        let second = h.resolver.resolve_search(&filters).await;
        assert_eq!(second.source, Source::Fallback);
    }

    #[tokio::test]
    async fn item_chain_live_then_cache() {
        let h = harness(ScriptedClient::new().with_item(item(42, "Tek Elevators")), 10.0);

        let first = h.resolver.resolve_item(42).await;
        assert_eq!(first.source, Source::Live);
        assert_eq!(first.data.as_ref().unwrap().id, 42);

        let second = h.resolver.resolve_item(42).await;
        assert_eq!(second.source, Source::Cache);
        assert_eq!(h.client.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_item_resolves_to_fallback_without_error() {
        let h = harness(ScriptedClient::new().failing(), 10.0);

        // Known to the demo dataset
        let demo = h.resolver.resolve_item(101).await;
        assert_eq!(demo.source, Source::Fallback);
        assert!(demo.data.is_some());

        // Known to nobody: still a value, never an error
        let missing = h.resolver.resolve_item(424242).await;
        assert_eq!(missing.source, Source::Fallback);
        assert!(missing.data.is_none());
    }

    #[test]
    fn broadening_drops_noise_and_category() {
        let mut filters = SearchFilters::for_query("the dino overhaul");
        filters.category = Some(4);
        filters.page_index = 3;
        let broadened = broaden_filters(&filters).unwrap();
        assert_eq!(broadened.query, "dino");
        assert_eq!(broadened.category, None);
        assert_eq!(broadened.page_index, 0);

        // Already minimal: nothing to broaden
        assert!(broaden_filters(&SearchFilters::for_query("dino")).is_none());
    }
}
