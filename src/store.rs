//! # Entry Store Module
//!
//! ## Purpose
//! Bounded, TTL-aware in-memory cache for catalog items and search-result
//! pages, optionally backed by the durable mirror. This is the only mutable
//! shared state in the engine besides the token bucket; the orchestrator
//! and warmer both read and write it concurrently.
//!
//! ## Input/Output Specification
//! - **Input**: Cache keys and values from the orchestrator and warmer
//! - **Output**: Unexpired values, promotion from the mirror on miss,
//!   hit/miss statistics
//! - **Bounds**: Entry count never exceeds the configured maximum;
//!   insertion beyond the limit evicts the least-recently-accessed entry
//!
//! ## Key Features
//! - Two TTL classes: long for items, short for search pages
//! - Reads self-check expiry, so staleness is never observable even
//!   between sweeps
//! - Mirror lookups degrade to absent on failure; mirror writes are
//!   best-effort on a spawned task and never block the caller
//! - Injected clock so TTL behavior is testable without real time

use crate::config::CacheSettings;
use crate::mirror::{DurableMirror, MirrorRecord};
use crate::{CacheKey, CachedValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Time source for TTL decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests
pub struct ManualClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: parking_lot::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// One cached value with its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CachedValue,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
    pub last_access: DateTime<Utc>,
}

/// Store statistics for observability
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Bounded TTL cache with optional durable mirror
pub struct EntryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    mirror: Option<Arc<DurableMirror>>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EntryStore {
    /// Create a store on the system clock
    pub fn new(settings: CacheSettings, mirror: Option<Arc<DurableMirror>>) -> Self {
        Self::with_clock(settings, mirror, Arc::new(SystemClock))
    }

    /// Create a store with an injected clock
    pub fn with_clock(
        settings: CacheSettings,
        mirror: Option<Arc<DurableMirror>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            mirror,
            clock,
            settings,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// TTL class for a value
    fn ttl_for(&self, value: &CachedValue) -> chrono::Duration {
        match value {
            CachedValue::Item(_) => self.settings.item_ttl(),
            CachedValue::Page(_) => self.settings.search_ttl(),
        }
    }

    /// Look up a key. Memory first; on miss, attempt promotion from the
    /// mirror if one is configured and the record is still fresh by this
    /// store's clock. Mirror failures degrade to absent.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let now = self.clock.now();

        {
            let mut entries = self.entries.write().await;
            match entries.get_mut(key) {
                Some(entry) if entry.expires_at > now => {
                    entry.hit_count += 1;
                    entry.last_access = now;
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
                Some(_) => {
                    // Expired between sweeps; reads never return stale data
                    entries.remove(key);
                }
                None => {}
            }
        }

        if let Some(promoted) = self.promote_from_mirror(key, now).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(promoted);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn promote_from_mirror(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CachedValue> {
        let mirror = self.mirror.as_ref()?;

        let record = match mirror.load(key) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("mirror lookup for {} degraded to absent: {}", key, e);
                return None;
            }
        };

        // Expiry is always decided by this store's clock, never by the
        // mirror alone
        if record.expires_at <= now {
            return None;
        }

        let value = record.value.clone();
        let entry = CacheEntry {
            value: record.value,
            created_at: record.created_at,
            expires_at: record.expires_at,
            hit_count: 1,
            last_access: now,
        };

        let mut entries = self.entries.write().await;
        Self::evict_if_full(&mut entries, self.settings.max_entries, key);
        entries.insert(key.clone(), entry);
        tracing::debug!("promoted {} from durable mirror", key);

        Some(value)
    }

    /// Insert a value under its TTL class. Always writes to memory;
    /// mirror persistence happens on a spawned task and never blocks or
    /// fails the caller.
    pub async fn put(&self, key: CacheKey, value: CachedValue) {
        let now = self.clock.now();
        let expires_at = now + self.ttl_for(&value);

        let entry = CacheEntry {
            value: value.clone(),
            created_at: now,
            expires_at,
            hit_count: 0,
            last_access: now,
        };

        {
            let mut entries = self.entries.write().await;
            Self::evict_if_full(&mut entries, self.settings.max_entries, &key);
            entries.insert(key.clone(), entry);
        }

        if let Some(mirror) = self.mirror.clone() {
            let record = MirrorRecord {
                value,
                created_at: now,
                expires_at,
            };
            tokio::spawn(async move {
                if let Err(e) = mirror.save(&key, &record) {
                    tracing::warn!("mirror persist for {} failed: {}", key, e);
                }
            });
        }
    }

    /// Approximate LRU: when inserting a new key into a full map, remove
    /// the entry with the oldest last-access timestamp. Soft capacity
    /// bound, so a scan is acceptable.
    fn evict_if_full(
        entries: &mut HashMap<CacheKey, CacheEntry>,
        max_entries: usize,
        incoming: &CacheKey,
    ) {
        if entries.contains_key(incoming) {
            return;
        }

        while entries.len() >= max_entries {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());

            match victim {
                Some(key) => {
                    tracing::debug!("evicting least-recently-accessed entry {}", key);
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Remove all expired entries from memory and sweep the mirror.
    /// Returns the number of memory entries removed.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();

        let removed = {
            let mut entries = self.entries.write().await;
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at > now);
            before - entries.len()
        };

        if removed > 0 {
            tracing::info!("sweep removed {} expired entries", removed);
        }

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.delete_expired(now) {
                tracing::warn!("mirror sweep failed: {}", e);
            }
        }

        removed
    }

    /// Snapshot of all unexpired values, for the cached-entry scan
    /// strategy. O(store size), which is bounded.
    pub async fn unexpired_values(&self) -> Vec<(CacheKey, CachedValue)> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Number of entries currently held (including any not yet swept)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Hit/miss and occupancy statistics
    pub async fn stats(&self) -> StoreStats {
        StoreStats {
            entries: self.entries.read().await.len(),
            max_entries: self.settings.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Flush pending mirror writes, if a mirror is attached
    pub async fn flush_mirror(&self) -> crate::errors::Result<()> {
        match &self.mirror {
            Some(mirror) => mirror.flush().await,
            None => Ok(()),
        }
    }

    /// Run `sweep` on a fixed interval until the returned handle is
    /// aborted or the store is dropped
    pub fn spawn_sweep_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        // Weak handle so the task never keeps a dropped store alive
        let store = Arc::downgrade(&self);
        let period = self.settings.sweep_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        store.sweep().await;
                    }
                    None => break,
                }
            }
        })
    }
}
