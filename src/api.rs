//! # API Server Module
//!
//! ## Purpose
//! Thin HTTP surface over the retrieval engine for the dashboard frontend.
//! Every data route answers 200 with a tagged payload; the engine beneath
//! it never produces an error for a caller to see.
//!
//! ## Endpoints
//! - `GET  /api/mods/{id}`       resolve one item
//! - `GET  /api/mods`            resolve a search page (query params)
//! - `GET  /api/warmer/status`   warmer and rate-budget observability
//! - `POST /api/warmer/start`    start the warmer (idempotent)
//! - `POST /api/warmer/stop`     stop the warmer
//! - `GET  /api/health`          store statistics and liveness

use crate::errors::{CacheError, Result};
use crate::{ModId, SearchFilters, SortField, SortOrder};
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::Deserialize;

/// HTTP server over the shared application state
pub struct ApiServer {
    app_state: crate::AppState,
}

/// Search query parameters as sent by the dashboard
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub category: Option<u32>,
    pub sort_field: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub page_index: Option<u32>,
    pub page_size: Option<u32>,
}

impl SearchParams {
    fn into_filters(self) -> SearchFilters {
        let defaults = SearchFilters::default();
        SearchFilters {
            query: self.query,
            category: self.category,
            sort_field: self.sort_field.unwrap_or(defaults.sort_field),
            sort_order: self.sort_order.unwrap_or(defaults.sort_order),
            page_index: self.page_index.unwrap_or(defaults.page_index),
            page_size: self.page_size.unwrap_or(defaults.page_size).clamp(1, 50),
        }
    }
}

impl ApiServer {
    /// Create new API server
    pub async fn new(app_state: crate::AppState) -> Result<Self> {
        Ok(Self { app_state })
    }

    /// Run the API server
    pub async fn run(self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let enable_cors = self.app_state.config.server.enable_cors;
        let app_state = self.app_state;

        tracing::info!("starting API server on {}", bind_addr);

        let server = HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(app_state.clone()))
                .route("/api/mods/{id}", web::get().to(item_handler))
                .route("/api/mods", web::get().to(search_handler))
                .route("/api/warmer/status", web::get().to(warmer_status_handler))
                .route("/api/warmer/start", web::post().to(warmer_start_handler))
                .route("/api/warmer/stop", web::post().to(warmer_stop_handler))
                .route("/api/health", web::get().to(health_handler))
        })
        .bind(&bind_addr)
        .map_err(|e| CacheError::Internal {
            message: format!("failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| CacheError::Internal {
            message: format!("server error: {}", e),
        })?;

        Ok(())
    }
}

/// Single item endpoint
async fn item_handler(
    app_state: web::Data<crate::AppState>,
    path: web::Path<ModId>,
) -> ActixResult<HttpResponse> {
    let resolved = app_state.resolver.resolve_item(path.into_inner()).await;
    Ok(HttpResponse::Ok().json(resolved))
}

/// Search endpoint
async fn search_handler(
    app_state: web::Data<crate::AppState>,
    params: web::Query<SearchParams>,
) -> ActixResult<HttpResponse> {
    let filters = params.into_inner().into_filters();
    let resolved = app_state.resolver.resolve_search(&filters).await;
    Ok(HttpResponse::Ok().json(resolved))
}

/// Warmer observability endpoint
async fn warmer_status_handler(
    app_state: web::Data<crate::AppState>,
) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(app_state.warmer.status()))
}

/// Start the warmer (no-op when already running)
async fn warmer_start_handler(
    app_state: web::Data<crate::AppState>,
) -> ActixResult<HttpResponse> {
    app_state.warmer.start();
    Ok(HttpResponse::Ok().json(app_state.warmer.status()))
}

/// Stop the warmer; cached data stays intact
async fn warmer_stop_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    app_state.warmer.stop();
    Ok(HttpResponse::Ok().json(app_state.warmer.status()))
}

/// Liveness and store statistics
async fn health_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    let stats = app_state.store.stats().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "store": stats,
        "inflight": app_state.resolver.inflight_count(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_params_fill_defaults_and_clamp_page_size() {
        let params = SearchParams {
            query: "dino".to_string(),
            category: None,
            sort_field: None,
            sort_order: None,
            page_index: None,
            page_size: Some(500),
        };
        let filters = params.into_filters();
        assert_eq!(filters.query, "dino");
        assert_eq!(filters.sort_field, SortField::Popularity);
        assert_eq!(filters.page_size, 50);
        assert_eq!(filters.page_index, 0);
    }
}
