//! analysis_results layout versioning and rebuild.

use ci_insights_lib::db::DbPool;
use ci_insights_lib::db::analysis_results::KEY_ANALYSIS_LAYOUT;
use ci_insights_lib::error::AppError;
use ci_insights_lib::migration::analysis_results::LAYOUT_VERSION;
use ci_insights_lib::models::AnalysisRecord;
use sea_orm::ConnectionTrait;

use super::test_helpers::{create_test_pool, reject_analysis_inserts, sqlite_url};

fn record(marker: &str) -> AnalysisRecord {
    AnalysisRecord::new("workflow_failure_analysis", serde_json::json!({ "marker": marker }))
}

#[actix_rt::test]
async fn test_fresh_store_records_layout_version() {
    let (pool, _dir) = create_test_pool().await;

    assert_eq!(
        pool.get_metadata(KEY_ANALYSIS_LAYOUT).await.unwrap().as_deref(),
        Some(LAYOUT_VERSION)
    );
    assert!(!pool.ensure_analysis_schema().await.unwrap());
}

#[actix_rt::test]
async fn test_matching_layout_keeps_rows_across_restarts() {
    let (pool, dir) = create_test_pool().await;
    pool.append_analysis_result(&record("kept")).await.unwrap();

    let restarted = DbPool::connect(&sqlite_url(&dir)).await.unwrap();
    restarted.run_migrations().await.unwrap();

    let stored = restarted
        .analysis_results_by_type("workflow_failure_analysis", 10)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload["marker"], "kept");
}

#[actix_rt::test]
async fn test_stale_layout_version_rebuilds_table() {
    let (pool, dir) = create_test_pool().await;
    pool.append_analysis_result(&record("lost")).await.unwrap();
    pool.set_metadata(KEY_ANALYSIS_LAYOUT, "0").await.unwrap();

    let restarted = DbPool::connect(&sqlite_url(&dir)).await.unwrap();
    assert!(restarted.ensure_analysis_schema().await.unwrap());

    assert!(
        restarted
            .analysis_results_by_type("workflow_failure_analysis", 10)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        restarted.get_metadata(KEY_ANALYSIS_LAYOUT).await.unwrap().as_deref(),
        Some(LAYOUT_VERSION)
    );
    restarted.append_analysis_result(&record("new")).await.unwrap();
}

#[actix_rt::test]
async fn test_legacy_unversioned_table_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let pool = DbPool::connect(&sqlite_url(&dir)).await.unwrap();
    pool.connection()
        .execute_unprepared(
            "CREATE TABLE analysis_results (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 analysis_type TEXT NOT NULL,
                 analysis_data TEXT NOT NULL
             )",
        )
        .await
        .unwrap();
    pool.connection()
        .execute_unprepared(
            "INSERT INTO analysis_results (analysis_type, analysis_data) VALUES ('old', '{}')",
        )
        .await
        .unwrap();

    pool.run_migrations().await.unwrap();

    let id = pool.append_analysis_result(&record("fresh")).await.unwrap();
    assert_eq!(id, 1);
    assert!(pool.analysis_results_by_type("old", 10).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_table_dropped_behind_the_store_is_recreated_on_retry() {
    let (pool, _dir) = create_test_pool().await;
    pool.append_analysis_result(&record("before")).await.unwrap();

    pool.connection()
        .execute_unprepared("DROP TABLE analysis_results")
        .await
        .unwrap();

    pool.append_analysis_result(&record("after")).await.unwrap();
    let stored = pool
        .analysis_results_by_type("workflow_failure_analysis", 10)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload["marker"], "after");
}

#[actix_rt::test]
async fn test_second_insert_failure_is_schema_mismatch() {
    let (pool, _dir) = create_test_pool().await;
    reject_analysis_inserts(&pool).await;

    let err = pool.append_analysis_result(&record("blocked")).await.unwrap_err();
    assert!(matches!(err, AppError::SchemaMismatch(_)), "got {:?}", err);
    assert!(err.is_fatal());

    // Layout was current, so the retry did not rebuild the table.
    assert_eq!(
        pool.get_metadata(KEY_ANALYSIS_LAYOUT).await.unwrap().as_deref(),
        Some(LAYOUT_VERSION)
    );
}
