//! Read API over a seeded store.

use actix_web::{App, test, web};
use chrono::Utc;
use ci_insights_lib::api;
use ci_insights_lib::db::DbPool;
use ci_insights_lib::middleware::RequestLogger;
use ci_insights_lib::migration::analysis_results::LAYOUT_VERSION;
use ci_insights_lib::models::{
    AnalysisRecord, Category, ErrorPattern, NewTestResult, TestStatus, WORKFLOW_FAILURE_ANALYSIS,
};
use serde_json::Value;

use super::test_helpers::{at, create_test_pool, failed_run};

async fn seed(pool: &DbPool) {
    for (i, hour) in [8, 9, 10].into_iter().enumerate() {
        pool.upsert_run(&failed_run(&format!("r{}", i), "Job timed out", at(hour, 0)))
            .await
            .unwrap();
    }
    pool.append_test_result(&NewTestResult {
        run_id: "r0".to_string(),
        test_name: "test_checkout".to_string(),
        status: TestStatus::Failed,
        duration_seconds: 2.0,
        failure_message: Some("timeout".to_string()),
        error_type: Some("TimeoutError".to_string()),
        stack_trace: None,
        retry_count: 0,
    })
    .await
    .unwrap();
    pool.upsert_error_pattern(&ErrorPattern {
        pattern: "Job timed out".to_string(),
        error_type: Category::OtherIssues,
        frequency: 3,
        last_seen: Utc::now(),
        suggested_fix: Category::OtherIssues.default_fix().to_string(),
    })
    .await
    .unwrap();
    pool.append_analysis_result(&AnalysisRecord::new(
        WORKFLOW_FAILURE_ANALYSIS,
        serde_json::json!({"run_id": "r2"}),
    ))
    .await
    .unwrap();
}

macro_rules! app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestLogger)
                .app_data(web::Data::new($pool.clone()))
                .service(
                    web::scope("/api/v1")
                        .configure(api::configure_health_routes)
                        .configure(api::configure_insight_routes),
                ),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_health_and_ready() {
    let (pool, _dir) = create_test_pool().await;
    let app = app!(pool);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");

    let req = test::TestRequest::get().uri("/api/v1/ready").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["database"], "connected");
    assert_eq!(body["backend"], "sqlite");
    assert_eq!(body["analysis_layout"], LAYOUT_VERSION);
}

#[actix_rt::test]
async fn test_failures_endpoint_respects_limit() {
    let (pool, _dir) = create_test_pool().await;
    seed(&pool).await;
    let app = app!(pool);

    let req = test::TestRequest::get()
        .uri("/api/v1/failures?limit=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let runs = body.as_array().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["run_id"], "r2");
    assert_eq!(runs[0]["failure_reason"], "Job timed out");
    assert_eq!(runs[0]["conclusion"], "failure");
}

#[actix_rt::test]
async fn test_run_lookup() {
    let (pool, _dir) = create_test_pool().await;
    seed(&pool).await;
    let app = app!(pool);

    let req = test::TestRequest::get().uri("/api/v1/runs/r1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["run_id"], "r1");
    assert_eq!(body["workflow_name"], "CI");

    let req = test::TestRequest::get().uri("/api/v1/runs/missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_failed_tests_and_patterns_endpoints() {
    let (pool, _dir) = create_test_pool().await;
    seed(&pool).await;
    let app = app!(pool);

    let req = test::TestRequest::get().uri("/api/v1/failed-tests").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["test_name"], "test_checkout");
    assert_eq!(body[0]["workflow_name"], "CI");

    let req = test::TestRequest::get().uri("/api/v1/patterns").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["pattern"], "Job timed out");
    assert_eq!(body[0]["error_type"], "Other Issues");
    assert_eq!(body[0]["frequency"], 3);

    let req = test::TestRequest::get().uri("/api/v1/insights").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["payload"]["run_id"], "r2");
}

#[actix_rt::test]
async fn test_invalid_limit_is_rejected() {
    let (pool, _dir) = create_test_pool().await;
    let app = app!(pool);

    let req = test::TestRequest::get()
        .uri("/api/v1/failures?limit=lots")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
}
