//! Read-only insight endpoints over the store.

use actix_web::{HttpResponse, get, web};
use serde::Deserialize;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{WORKFLOW_FAILURE_ANALYSIS, clamp_limit};

/// `?limit=` query shared by list endpoints.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

/// Most recent failed runs, newest first.
///
/// GET /api/v1/failures?limit=20
#[get("/failures")]
pub async fn recent_failures(
    pool: web::Data<DbPool>,
    query: web::Query<LimitQuery>,
) -> AppResult<HttpResponse> {
    let runs = pool.recent_failed_runs(clamp_limit(query.limit)).await?;
    Ok(HttpResponse::Ok().json(runs))
}

/// A single stored run.
///
/// GET /api/v1/runs/{run_id}
#[get("/runs/{run_id}")]
pub async fn get_run(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let run_id = path.into_inner();
    let run = pool
        .get_run(&run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run {}", run_id)))?;
    Ok(HttpResponse::Ok().json(run))
}

/// Failed tests with their workflow name, newest first.
///
/// GET /api/v1/failed-tests?limit=20
#[get("/failed-tests")]
pub async fn failed_tests(
    pool: web::Data<DbPool>,
    query: web::Query<LimitQuery>,
) -> AppResult<HttpResponse> {
    let tests = pool.failed_tests_with_workflow(clamp_limit(query.limit)).await?;
    Ok(HttpResponse::Ok().json(tests))
}

/// Error patterns, most frequent first.
///
/// GET /api/v1/patterns
#[get("/patterns")]
pub async fn patterns(pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let patterns = pool.patterns_by_frequency().await?;
    Ok(HttpResponse::Ok().json(patterns))
}

/// Stored per-run insights, newest first.
///
/// GET /api/v1/insights?limit=20
#[get("/insights")]
pub async fn insights(
    pool: web::Data<DbPool>,
    query: web::Query<LimitQuery>,
) -> AppResult<HttpResponse> {
    let results = pool
        .analysis_results_by_type(WORKFLOW_FAILURE_ANALYSIS, clamp_limit(query.limit))
        .await?;
    Ok(HttpResponse::Ok().json(results))
}

/// Configure insight routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(recent_failures)
        .service(get_run)
        .service(failed_tests)
        .service(patterns)
        .service(insights);
}
