//! # Durable Mirror Module
//!
//! ## Purpose
//! Optional persistent backing store for cache entries, surviving process
//! restarts. The entry store consults it on memory miss and populates it on
//! write. Absence or failure of this component degrades the engine to
//! memory-only caching without failure.
//!
//! ## Input/Output Specification
//! - **Input**: Cache entries keyed by their stable mirror key
//! - **Output**: Previously mirrored entries with their original expiry
//! - **Storage**: Sled embedded database, bincode values, gzip for large
//!   records
//!
//! ## Availability Semantics
//! A single `available` flag guards every operation. Once an I/O failure
//! marks the backend unusable the flag stays down for the rest of the
//! process, so a dead backend never attracts retry storms. Expiry recorded
//! here is advisory only; the entry store re-checks expiry against its own
//! clock on every read.

use crate::config::MirrorConfig;
use crate::errors::{CacheError, Result};
use crate::{CacheKey, CachedValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Marker byte prefixed to raw bincode records
const ENCODING_RAW: u8 = 0;
/// Marker byte prefixed to gzip-compressed records
const ENCODING_GZIP: u8 = 1;

/// One mirrored cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub value: CachedValue,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Sled-backed durable mirror
pub struct DurableMirror {
    db: Arc<sled::Db>,
    entries: sled::Tree,
    compression_threshold: usize,
    available: AtomicBool,
}

impl DurableMirror {
    /// Open the mirror database. Callers treat failure here as "run
    /// memory-only", not as a startup error.
    pub fn open(config: &MirrorConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = sled::open(&config.db_path).map_err(|e| CacheError::PersistenceUnavailable {
            details: format!("failed to open {:?}: {}", config.db_path, e),
        })?;

        let entries = db
            .open_tree("cache_entries")
            .map_err(|e| CacheError::PersistenceUnavailable {
                details: format!("failed to open entries tree: {}", e),
            })?;

        tracing::info!(
            "durable mirror opened at {:?} with {} entries",
            config.db_path,
            entries.len()
        );

        Ok(Self {
            db: Arc::new(db),
            entries,
            compression_threshold: config.compression_threshold_bytes,
            available: AtomicBool::new(true),
        })
    }

    /// Whether the backend is still usable for this process
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Flip the availability flag after a backend failure. One-way for the
    /// process lifetime.
    fn mark_unavailable(&self, details: &str) {
        if self.available.swap(false, Ordering::Relaxed) {
            tracing::error!(
                "durable mirror unavailable, continuing memory-only: {}",
                details
            );
        }
    }

    /// Load a mirrored record, if present
    pub fn load(&self, key: &CacheKey) -> Result<Option<MirrorRecord>> {
        if !self.is_available() {
            return Ok(None);
        }

        let raw = match self.entries.get(key.mirror_key().as_bytes()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.mark_unavailable(&e.to_string());
                return Err(CacheError::PersistenceUnavailable {
                    details: e.to_string(),
                });
            }
        };

        let record = self.decode(&raw)?;
        Ok(Some(record))
    }

    /// Persist a record. Failures flip the availability flag and are
    /// reported to the caller, which logs and moves on.
    pub fn save(&self, key: &CacheKey, record: &MirrorRecord) -> Result<()> {
        if !self.is_available() {
            return Err(CacheError::PersistenceUnavailable {
                details: "mirror previously marked unavailable".to_string(),
            });
        }

        let encoded = self.encode(record)?;
        if let Err(e) = self.entries.insert(key.mirror_key().as_bytes(), encoded) {
            self.mark_unavailable(&e.to_string());
            return Err(CacheError::PersistenceUnavailable {
                details: e.to_string(),
            });
        }

        tracing::debug!("mirrored entry {}", key);
        Ok(())
    }

    /// Remove all records whose recorded expiry is before the cutoff.
    /// Returns the number of records removed.
    pub fn delete_expired(&self, before: DateTime<Utc>) -> Result<usize> {
        if !self.is_available() {
            return Ok(0);
        }

        let mut expired_keys = Vec::new();
        for result in self.entries.iter() {
            let (key, raw) = match result {
                Ok(pair) => pair,
                Err(e) => {
                    self.mark_unavailable(&e.to_string());
                    return Err(CacheError::PersistenceUnavailable {
                        details: e.to_string(),
                    });
                }
            };

            // Undecodable records count as expired
            match self.decode(&raw) {
                Ok(record) if record.expires_at >= before => {}
                _ => expired_keys.push(key),
            }
        }

        let mut removed = 0;
        for key in expired_keys {
            match self.entries.remove(&key) {
                Ok(_) => removed += 1,
                Err(e) => {
                    self.mark_unavailable(&e.to_string());
                    return Err(CacheError::PersistenceUnavailable {
                        details: e.to_string(),
                    });
                }
            }
        }

        if removed > 0 {
            tracing::info!("mirror sweep removed {} expired records", removed);
        }
        Ok(removed)
    }

    /// Number of mirrored records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| CacheError::PersistenceUnavailable {
                details: format!("flush failed: {}", e),
            })?;
        Ok(())
    }

    fn encode(&self, record: &MirrorRecord) -> Result<Vec<u8>> {
        let payload = bincode::serialize(record)?;

        if payload.len() >= self.compression_threshold {
            use std::io::Write;
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&payload)?;
            let compressed = encoder.finish()?;

            let mut out = Vec::with_capacity(compressed.len() + 1);
            out.push(ENCODING_GZIP);
            out.extend_from_slice(&compressed);
            Ok(out)
        } else {
            let mut out = Vec::with_capacity(payload.len() + 1);
            out.push(ENCODING_RAW);
            out.extend_from_slice(&payload);
            Ok(out)
        }
    }

    fn decode(&self, raw: &[u8]) -> Result<MirrorRecord> {
        let (marker, payload) = raw.split_first().ok_or_else(|| CacheError::Internal {
            message: "empty mirror record".to_string(),
        })?;

        match *marker {
            ENCODING_RAW => Ok(bincode::deserialize(payload)?),
            ENCODING_GZIP => {
                use std::io::Read;
                let mut decoder = flate2::read::GzDecoder::new(payload);
                let mut decompressed = Vec::new();
                decoder.read_to_end(&mut decompressed)?;
                Ok(bincode::deserialize(&decompressed)?)
            }
            other => Err(CacheError::Internal {
                message: format!("unknown mirror record encoding: {}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CatalogItem, ModId};
    use chrono::Duration;

    fn test_config(dir: &std::path::Path) -> MirrorConfig {
        MirrorConfig {
            enabled: true,
            db_path: dir.join("mirror.db"),
            compression_threshold_bytes: 4096,
        }
    }

    fn item(id: ModId) -> CatalogItem {
        CatalogItem {
            id,
            name: format!("Mod {}", id),
            summary: "A test mod".to_string(),
            download_count: 1000,
            thumbs_up_count: 50,
            featured: false,
            categories: vec!["Utility".to_string()],
            authors: vec!["tester".to_string()],
            date_modified: Utc::now(),
        }
    }

    fn record(id: ModId) -> MirrorRecord {
        let now = Utc::now();
        MirrorRecord {
            value: CachedValue::Item(item(id)),
            created_at: now,
            expires_at: now + Duration::hours(6),
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = DurableMirror::open(&test_config(dir.path())).unwrap();

        let key = CacheKey::Item(7);
        mirror.save(&key, &record(7)).unwrap();

        let loaded = mirror.load(&key).unwrap().unwrap();
        match loaded.value {
            CachedValue::Item(it) => assert_eq!(it.id, 7),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let key = CacheKey::Item(11);

        {
            let mirror = DurableMirror::open(&config).unwrap();
            mirror.save(&key, &record(11)).unwrap();
            drop(mirror);
        }

        let mirror = DurableMirror::open(&config).unwrap();
        assert!(mirror.load(&key).unwrap().is_some());
    }

    #[test]
    fn large_records_round_trip_through_compression() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.compression_threshold_bytes = 16;
        let mirror = DurableMirror::open(&config).unwrap();

        let mut big = record(3);
        if let CachedValue::Item(ref mut it) = big.value {
            it.summary = "dinosaur ".repeat(500);
        }

        let key = CacheKey::Item(3);
        mirror.save(&key, &big).unwrap();
        let loaded = mirror.load(&key).unwrap().unwrap();
        match loaded.value {
            CachedValue::Item(it) => assert_eq!(it.summary.len(), 9 * 500),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn delete_expired_removes_only_old_records() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = DurableMirror::open(&test_config(dir.path())).unwrap();
        let now = Utc::now();

        let mut stale = record(1);
        stale.expires_at = now - Duration::minutes(5);
        mirror.save(&CacheKey::Item(1), &stale).unwrap();
        mirror.save(&CacheKey::Item(2), &record(2)).unwrap();

        let removed = mirror.delete_expired(now).unwrap();
        assert_eq!(removed, 1);
        assert!(mirror.load(&CacheKey::Item(1)).unwrap().is_none());
        assert!(mirror.load(&CacheKey::Item(2)).unwrap().is_some());
    }

    #[test]
    fn missing_key_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = DurableMirror::open(&test_config(dir.path())).unwrap();
        assert!(mirror.load(&CacheKey::Item(999)).unwrap().is_none());
    }
}
