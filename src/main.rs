//! # Mod Cache Server Driver
//!
//! ## Purpose
//! Entry point for the catalog cache server. Wires the entry store, durable
//! mirror, token bucket, warmer, and orchestrator together, starts the HTTP
//! surface, and shuts everything down cleanly on SIGINT.
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Open the durable mirror, degrading to memory-only on failure
//! 4. Build the entry store, rate budget, and orchestrator
//! 5. Start the warmer and expiry sweep task
//! 6. Serve the API until a shutdown signal arrives

use clap::{Arg, Command};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use modcache::{
    api::ApiServer,
    catalog::StaticCatalogClient,
    config::Config,
    errors::{CacheError, Result},
    mirror::DurableMirror,
    ratelimit::TokenBucket,
    resolver::Resolver,
    store::EntryStore,
    warmer::Warmer,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("modcache-server")
        .version("0.1.0")
        .about("Resilient mod catalog metadata cache for game-server dashboards")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("modcache.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("no-warmer")
                .long("no-warmer")
                .help("Do not start the background warmer")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Check component health and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").expect("has default");
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if matches.get_flag("no-warmer") {
        config.warmer.autostart = false;
    }

    let config = Arc::new(config);

    init_logging(&config)?;

    if matches.get_flag("check-health") {
        return check_health(&config);
    }

    info!("starting modcache server v0.1.0");
    info!("configuration loaded from: {}", config_path);

    let app_state = initialize_components(config.clone()).await;
    let sweep_task = app_state.store.clone().spawn_sweep_task();

    if config.warmer.autostart {
        app_state.warmer.start();
    }

    let server = ApiServer::new(app_state.clone()).await?;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("server error: {}", e);
        }
    });

    info!(
        "modcache server listening on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
        }
        _ = server_handle => {
            warn!("server stopped unexpectedly");
        }
    }

    shutdown_components(&app_state, sweep_task).await;
    info!("modcache server shut down");

    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let level: tracing::Level = config
        .logging
        .level
        .parse()
        .map_err(|_| CacheError::Config {
            message: format!("invalid log level: {}", config.logging.level),
        })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(fmt_layer.json().with_filter(filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer.with_filter(filter))
            .init();
    }

    info!("logging initialized with level: {}", config.logging.level);
    Ok(())
}

/// Probe the components the server would start with, report, and exit.
/// A mirror that is enabled but unusable fails the check; the server
/// itself would degrade to memory-only instead.
fn check_health(config: &Config) -> Result<()> {
    println!("modcache health check");
    println!(
        "  config: ok (cache capacity {}, {} warm queries)",
        config.cache.max_entries,
        config.warmer.popular_queries.len()
    );

    if !config.mirror.enabled {
        println!("  mirror: disabled (memory-only)");
        return Ok(());
    }

    match DurableMirror::open(&config.mirror) {
        Ok(mirror) => {
            println!(
                "  mirror: ok ({} records at {:?})",
                mirror.len(),
                config.mirror.db_path
            );
            Ok(())
        }
        Err(e) => {
            println!("  mirror: unavailable ({})", e);
            Err(e)
        }
    }
}

/// Build every component; the mirror degrades rather than failing startup
async fn initialize_components(config: Arc<Config>) -> AppState {
    info!("initializing components");

    let mirror = if config.mirror.enabled {
        match DurableMirror::open(&config.mirror) {
            Ok(mirror) => Some(Arc::new(mirror)),
            Err(e) => {
                warn!("durable mirror unavailable, running memory-only: {}", e);
                None
            }
        }
    } else {
        info!("durable mirror disabled by configuration");
        None
    };

    let store = Arc::new(EntryStore::new(config.cache.clone(), mirror));
    let bucket = Arc::new(TokenBucket::new(
        config.warmer.bucket_capacity,
        config.warmer.refill_per_second,
    ));

    // The upstream catalog client is injected at this boundary; the demo
    // server runs against the static dataset
    let client = Arc::new(StaticCatalogClient::new());

    let resolver = Arc::new(Resolver::new(
        config.clone(),
        store.clone(),
        bucket.clone(),
        client.clone(),
    ));
    let warmer = Arc::new(Warmer::new(config.clone(), store.clone(), bucket, client));

    info!("all components initialized");
    AppState {
        config,
        resolver,
        warmer,
        store,
    }
}

/// Stop background work and flush pending mirror writes
async fn shutdown_components(app_state: &AppState, sweep_task: tokio::task::JoinHandle<()>) {
    info!("shutting down components");

    app_state.warmer.stop();
    sweep_task.abort();

    app_state.store.sweep().await;
    if let Err(e) = app_state.store.flush_mirror().await {
        warn!("mirror flush on shutdown failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_health_passes_with_a_writable_mirror_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.mirror.db_path = dir.path().join("health.db");
        assert!(check_health(&config).is_ok());
    }

    #[test]
    fn check_health_skips_a_disabled_mirror() {
        let mut config = Config::default();
        config.mirror.enabled = false;
        config.mirror.db_path = "/nonexistent/never/created".into();
        assert!(check_health(&config).is_ok());
    }

    #[test]
    fn check_health_reports_an_unusable_mirror_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut config = Config::default();
        config.mirror.db_path = blocker.join("db");
        assert!(check_health(&config).is_err());
    }
}
