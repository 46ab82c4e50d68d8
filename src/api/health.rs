//! Health check endpoints.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use sea_orm::ConnectionTrait;
use serde::Serialize;
use tracing::warn;

use crate::db::DbPool;
use crate::db::analysis_results::KEY_ANALYSIS_LAYOUT;
use crate::error::ErrorResponse;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    database: &'static str,
    /// Store backend, e.g. `sqlite` or `postgres`.
    backend: String,
    /// Layout version recorded for analysis_results, if the store has one yet.
    analysis_layout: Option<String>,
}

/// Health check endpoint.
///
/// Returns 200 if the service is running.
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Ready once the store answers a metadata read. Reports which backend
/// serves the store and the analysis_results layout it is on.
#[get("/ready")]
pub async fn ready(pool: web::Data<DbPool>) -> HttpResponse {
    let backend = format!("{:?}", pool.connection().get_database_backend()).to_lowercase();

    match pool.get_metadata(KEY_ANALYSIS_LAYOUT).await {
        Ok(analysis_layout) => HttpResponse::Ok().json(ReadyResponse {
            status: "ready",
            database: "connected",
            backend,
            analysis_layout,
        }),
        Err(e) => {
            warn!("Readiness check failed on {}: {}", backend, e);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "NOT_READY".to_string(),
                message: "Store is not answering".to_string(),
            })
        }
    }
}

/// Configure health routes.
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
