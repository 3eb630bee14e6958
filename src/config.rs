//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the catalog cache engine, supporting TOML
//! files and environment variable overrides with validation and type-safe
//! access to all tunable constants.
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (`MODCACHE_*`)
//! 2. Configuration file (TOML)
//! 3. Default values
//!
//! The TTL durations, cache capacity, rate budget, and popularity weights
//! are deliberately plain named defaults here; they are operational tuning
//! knobs, not derived quantities.
//!
//! ## Usage
//! ```rust,no_run
//! use modcache::config::Config;
//!
//! let config = Config::from_file("modcache.toml").unwrap();
//! println!("cache capacity: {}", config.cache.max_entries);
//! ```

use crate::errors::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure containing all engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Upstream catalog boundary settings
    pub catalog: CatalogConfig,
    /// Entry store settings
    pub cache: CacheSettings,
    /// Durable mirror settings
    pub mirror: MirrorConfig,
    /// Background warmer and rate budget settings
    pub warmer: WarmerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS for the dashboard origin
    pub enable_cors: bool,
}

/// Upstream catalog boundary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Upper bound on any single live fetch, in seconds
    pub fetch_timeout_seconds: u64,
    /// Page size used when the warmer refreshes a query bucket
    pub warm_page_size: u32,
}

impl CatalogConfig {
    /// Per-call timeout as a [`Duration`]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// Entry store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of entries held in memory; insertion beyond this
    /// evicts the least-recently-accessed entry first
    pub max_entries: usize,
    /// Time to live for single-item entries, in seconds (items change
    /// rarely, so this is the long class)
    pub item_ttl_seconds: u64,
    /// Time to live for search-page entries, in seconds (search freshness
    /// matters more, so this is the short class)
    pub search_ttl_seconds: u64,
    /// Interval between expiry sweeps, in seconds
    pub sweep_interval_seconds: u64,
}

impl CacheSettings {
    pub fn item_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.item_ttl_seconds as i64)
    }

    pub fn search_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.search_ttl_seconds as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Durable mirror configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Enable the durable mirror; when disabled or unavailable the engine
    /// runs memory-only
    pub enabled: bool,
    /// Database file path
    pub db_path: PathBuf,
    /// Gzip-compress mirrored values larger than this many bytes
    pub compression_threshold_bytes: usize,
}

/// Background warmer and shared rate budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmerConfig {
    /// Start the warmer automatically on boot
    pub autostart: bool,
    /// Interval between warm cycles, in seconds
    pub interval_seconds: u64,
    /// Query buckets refreshed ahead of demand
    pub popular_queries: Vec<String>,
    /// Token bucket capacity shared with the live-fetch strategies
    pub bucket_capacity: f64,
    /// Token refill rate, tokens per second
    pub refill_per_second: f64,
}

impl WarmerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("modcache.toml")
    }

    /// Load configuration from a specific file, falling back to defaults
    /// when the file does not exist
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Config {
            message: format!("failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| CacheError::Config {
            message: format!("failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("MODCACHE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MODCACHE_PORT") {
            self.server.port = port.parse().map_err(|_| CacheError::Config {
                message: "invalid port number in MODCACHE_PORT".to_string(),
            })?;
        }
        if let Ok(db_path) = std::env::var("MODCACHE_DB_PATH") {
            self.mirror.db_path = PathBuf::from(db_path);
        }
        if let Ok(level) = std::env::var("MODCACHE_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(CacheError::ValidationFailed {
                field: "server.port".to_string(),
                reason: "port cannot be zero".to_string(),
            });
        }

        if self.cache.max_entries == 0 {
            return Err(CacheError::ValidationFailed {
                field: "cache.max_entries".to_string(),
                reason: "entry store capacity must be greater than zero".to_string(),
            });
        }

        if self.cache.item_ttl_seconds == 0 || self.cache.search_ttl_seconds == 0 {
            return Err(CacheError::ValidationFailed {
                field: "cache.ttl".to_string(),
                reason: "TTL durations must be greater than zero".to_string(),
            });
        }

        if self.warmer.bucket_capacity <= 0.0 || self.warmer.refill_per_second <= 0.0 {
            return Err(CacheError::ValidationFailed {
                field: "warmer.bucket".to_string(),
                reason: "token bucket capacity and refill rate must be positive".to_string(),
            });
        }

        if self.catalog.fetch_timeout_seconds == 0 {
            return Err(CacheError::ValidationFailed {
                field: "catalog.fetch_timeout_seconds".to_string(),
                reason: "fetch timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CacheError::Config {
            message: format!("failed to serialize config to TOML: {}", e),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                enable_cors: true,
            },
            catalog: CatalogConfig {
                fetch_timeout_seconds: 25,
                warm_page_size: 20,
            },
            cache: CacheSettings {
                max_entries: 500,
                item_ttl_seconds: 6 * 3600,
                search_ttl_seconds: 20 * 60,
                sweep_interval_seconds: 3600,
            },
            mirror: MirrorConfig {
                enabled: true,
                db_path: PathBuf::from("./data/modcache.db"),
                compression_threshold_bytes: 4096,
            },
            warmer: WarmerConfig {
                autostart: true,
                interval_seconds: 300,
                popular_queries: vec![
                    "dino".to_string(),
                    "stacking".to_string(),
                    "structures".to_string(),
                    "map".to_string(),
                    "quality of life".to_string(),
                ],
                bucket_capacity: 10.0,
                refill_per_second: 0.5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = Config::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_refill_is_rejected() {
        let mut config = Config::default();
        config.warmer.refill_per_second = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.cache.max_entries, config.cache.max_entries);
        assert_eq!(parsed.warmer.popular_queries, config.warmer.popular_queries);
    }

    #[test]
    fn ttl_classes_differ() {
        let config = Config::default();
        assert!(config.cache.item_ttl() > config.cache.search_ttl());
    }
}
