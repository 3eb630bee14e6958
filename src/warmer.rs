//! # Background Warmer Module
//!
//! ## Purpose
//! Token-bucket-throttled loop that proactively refreshes popular query
//! buckets so interactive reads mostly hit the entry store. Shares its
//! rate budget with the orchestrator's live-fetch strategies, keeping
//! total upstream call volume inside the provider's limits.
//!
//! ## Behavior
//! - Per cycle, each tracked bucket is refreshed only if a token is
//!   available; otherwise the bucket is skipped until the next cycle
//!   (never queued, never blocking)
//! - Failed refreshes are logged and retried on the next interval; the
//!   warmer never raises application-visible errors
//! - `start` is a no-op when already running; `stop` cancels the timer
//!   between ticks and leaves cached data intact

use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::ratelimit::TokenBucket;
use crate::store::EntryStore;
use crate::{CacheKey, CachedValue, SearchFilters};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Observable warmer state
#[derive(Debug, Clone, Serialize)]
pub struct WarmerStatus {
    pub is_running: bool,
    pub tokens_available: f64,
    pub capacity: f64,
    pub rate_limited: bool,
}

/// Background refresher for popular query buckets. Cheap to clone; all
/// clones share one shutdown channel, whose presence is the single
/// source of truth for whether a warm loop is installed.
#[derive(Clone)]
pub struct Warmer {
    config: Arc<Config>,
    store: Arc<EntryStore>,
    bucket: Arc<TokenBucket>,
    client: Arc<dyn CatalogClient>,
    shutdown: Arc<parking_lot::Mutex<Option<watch::Sender<bool>>>>,
}

impl Warmer {
    pub fn new(
        config: Arc<Config>,
        store: Arc<EntryStore>,
        bucket: Arc<TokenBucket>,
        client: Arc<dyn CatalogClient>,
    ) -> Self {
        Self {
            config,
            store,
            bucket,
            client,
            shutdown: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// Start the warm loop. No-op when already running. The sender is
    /// installed under the lock, so a concurrent `stop` either sees it and
    /// cancels this loop or arrives first and cancels nothing.
    pub fn start(&self) {
        let mut shutdown = self.shutdown.lock();
        if shutdown.is_some() {
            tracing::debug!("warmer already running, start ignored");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        *shutdown = Some(tx);

        let warmer = self.clone();
        let period = self.config.warmer.interval();
        tokio::spawn(async move {
            tracing::info!(
                "warmer started: {} buckets every {:?}",
                warmer.config.warmer.popular_queries.len(),
                period
            );
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        warmer.warm_cycle().await;
                    }
                    _ = rx.changed() => {
                        tracing::info!("warmer stopped");
                        break;
                    }
                }
            }
        });
    }

    /// Stop the warm loop between ticks. Cached data stays intact.
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.lock().is_some()
    }

    /// Status snapshot for observability
    pub fn status(&self) -> WarmerStatus {
        let bucket = self.bucket.status();
        WarmerStatus {
            is_running: self.is_running(),
            tokens_available: bucket.tokens_available,
            capacity: bucket.capacity,
            rate_limited: bucket.rate_limited,
        }
    }

    /// One pass over every tracked bucket. Buckets without a rate token
    /// are skipped for this cycle; per-bucket failures are logged and
    /// retried next time.
    async fn warm_cycle(&self) {
        for query in &self.config.warmer.popular_queries {
            if !self.bucket.try_consume(1.0) {
                tracing::debug!("warm skip for '{}': no rate tokens", query);
                continue;
            }

            if let Err(e) = self.refresh_bucket(query).await {
                tracing::warn!("warm refresh for '{}' failed ({}): {}", query, e.category(), e);
            }
        }
    }

    async fn refresh_bucket(&self, query: &str) -> crate::Result<()> {
        let filters = SearchFilters {
            query: query.to_string(),
            page_size: self.config.catalog.warm_page_size,
            ..SearchFilters::default()
        };

        let timeout = self.config.catalog.fetch_timeout();
        let page = match tokio::time::timeout(timeout, self.client.search_items(&filters)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(crate::CacheError::UpstreamTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };

        let key = CacheKey::Search(filters.cache_key());
        let count = page.items.len();
        for item in &page.items {
            self.store
                .put(CacheKey::Item(item.id), CachedValue::Item(item.clone()))
                .await;
        }
        self.store.put(key, CachedValue::Page(page)).await;

        tracing::debug!("warmed '{}' with {} items", query, count);
        Ok(())
    }
}
