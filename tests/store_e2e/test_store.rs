//! Store operations: upserts, appends, and read views.

use chrono::Utc;
use ci_insights_lib::entity::pipeline_run;
use ci_insights_lib::error::AppError;
use ci_insights_lib::models::{
    AnalysisRecord, Category, Conclusion, ErrorPattern, NewTestResult, Run, TestStatus,
};
use futures_util::future::join_all;
use sea_orm::EntityTrait;

use super::test_helpers::{at, create_test_pool, failed_run, summary};

fn failed_test(run_id: &str, name: &str) -> NewTestResult {
    NewTestResult {
        run_id: run_id.to_string(),
        test_name: name.to_string(),
        status: TestStatus::Failed,
        duration_seconds: 1.25,
        failure_message: Some("expected 200, got 500".to_string()),
        error_type: Some("AssertionError".to_string()),
        stack_trace: Some("at login_test.rs:12".to_string()),
        retry_count: 1,
    }
}

fn passed_test(run_id: &str, name: &str) -> NewTestResult {
    NewTestResult {
        run_id: run_id.to_string(),
        test_name: name.to_string(),
        status: TestStatus::Passed,
        duration_seconds: 0.5,
        failure_message: None,
        error_type: None,
        stack_trace: None,
        retry_count: 0,
    }
}

fn pattern(text: &str, frequency: u64) -> ErrorPattern {
    ErrorPattern {
        pattern: text.to_string(),
        error_type: Category::TestFailures,
        frequency,
        last_seen: Utc::now(),
        suggested_fix: Category::TestFailures.default_fix().to_string(),
    }
}

#[actix_rt::test]
async fn test_upsert_run_is_idempotent() {
    let (pool, _dir) = create_test_pool().await;
    let run = failed_run("r1", "Test failure in step: Run unit tests", at(10, 0));

    pool.upsert_run(&run).await.unwrap();
    let first = pool.recent_failed_runs(10).await.unwrap();
    pool.upsert_run(&run).await.unwrap();
    let second = pool.recent_failed_runs(10).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert_eq!(second[0], run);
}

#[actix_rt::test]
async fn test_upsert_run_replaces_fields_and_keeps_created_at() {
    let (pool, _dir) = create_test_pool().await;

    let running = Run::from_summary(summary("r1", None, at(10, 0)), None);
    pool.upsert_run(&running).await.unwrap();
    let created = pipeline_run::Entity::find_by_id("r1".to_string())
        .one(pool.connection())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.conclusion, None);
    assert_eq!(created.duration_seconds, 0);

    let failed = failed_run("r1", "Job timed out", at(10, 0));
    pool.upsert_run(&failed).await.unwrap();
    let updated = pipeline_run::Entity::find_by_id("r1".to_string())
        .one(pool.connection())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.conclusion.as_deref(), Some("failure"));
    assert_eq!(updated.failure_reason.as_deref(), Some("Job timed out"));
    assert_eq!(updated.duration_seconds, 180);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(pool.get_run("r1").await.unwrap(), Some(failed));
}

#[actix_rt::test]
async fn test_upsert_run_rejects_reason_invariant_violations() {
    let (pool, _dir) = create_test_pool().await;

    let mut run = failed_run("r1", "boom", at(10, 0));
    run.failure_reason = None;
    assert!(matches!(
        pool.upsert_run(&run).await,
        Err(AppError::Validation(_))
    ));

    let mut passed = Run::from_summary(summary("r2", Some(Conclusion::Success), at(10, 0)), None);
    passed.failure_reason = Some("stray".to_string());
    assert!(matches!(
        pool.upsert_run(&passed).await,
        Err(AppError::Validation(_))
    ));

    assert_eq!(pool.get_run("r1").await.unwrap(), None);
    assert_eq!(pool.get_run("r2").await.unwrap(), None);
}

#[actix_rt::test]
async fn test_concurrent_upserts_of_one_run_leave_one_row() {
    let (pool, _dir) = create_test_pool().await;

    let writes = (0..16).map(|i| {
        let pool = pool.clone();
        async move {
            let run = failed_run("r1", &format!("reason {}", i), at(10, 0));
            pool.upsert_run(&run).await
        }
    });
    for result in join_all(writes).await {
        result.unwrap();
    }

    let runs = pool.recent_failed_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    let reason = runs[0].failure_reason.as_deref().unwrap();
    assert!(reason.starts_with("reason "));
}

#[actix_rt::test]
async fn test_recent_failed_runs_order_and_limit() {
    let (pool, _dir) = create_test_pool().await;

    pool.upsert_run(&failed_run("old", "a", at(8, 0))).await.unwrap();
    pool.upsert_run(&failed_run("new", "b", at(12, 0))).await.unwrap();
    pool.upsert_run(&failed_run("mid", "c", at(10, 0))).await.unwrap();
    pool.upsert_run(&Run::from_summary(
        summary("ok", Some(Conclusion::Success), at(13, 0)),
        None,
    ))
    .await
    .unwrap();

    let ids: Vec<String> = pool
        .recent_failed_runs(10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.run_id)
        .collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);

    let limited = pool.recent_failed_runs(2).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].run_id, "new");
}

#[actix_rt::test]
async fn test_test_results_are_append_only() {
    let (pool, _dir) = create_test_pool().await;
    pool.upsert_run(&failed_run("r1", "boom", at(10, 0))).await.unwrap();

    let first = pool.append_test_result(&failed_test("r1", "test_login")).await.unwrap();
    let second = pool.append_test_result(&failed_test("r1", "test_login")).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(pool.test_results_for_run("r1").await.unwrap().len(), 2);
}

#[actix_rt::test]
async fn test_test_result_validation() {
    let (pool, _dir) = create_test_pool().await;

    let mut missing_type = failed_test("r1", "test_login");
    missing_type.error_type = None;
    assert!(matches!(
        pool.append_test_result(&missing_type).await,
        Err(AppError::Validation(_))
    ));

    let mut passed_with_message = passed_test("r1", "test_ok");
    passed_with_message.failure_message = Some("nope".to_string());
    assert!(matches!(
        pool.append_test_result(&passed_with_message).await,
        Err(AppError::Validation(_))
    ));

    assert!(pool.test_results_for_run("r1").await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_failed_tests_joined_with_workflow() {
    let (pool, _dir) = create_test_pool().await;

    let mut nightly = failed_run("r2", "boom", at(11, 0));
    nightly.workflow_name = "Nightly".to_string();
    pool.upsert_run(&failed_run("r1", "boom", at(10, 0))).await.unwrap();
    pool.upsert_run(&nightly).await.unwrap();

    pool.append_test_result(&failed_test("r1", "test_first")).await.unwrap();
    pool.append_test_result(&passed_test("r1", "test_passing")).await.unwrap();
    pool.append_test_result(&failed_test("gone", "test_orphan")).await.unwrap();
    pool.append_test_result(&failed_test("r2", "test_latest")).await.unwrap();

    let tests = pool.failed_tests_with_workflow(10).await.unwrap();
    let names: Vec<(&str, &str)> = tests
        .iter()
        .map(|t| (t.test_name.as_str(), t.workflow_name.as_str()))
        .collect();
    assert_eq!(names, vec![("test_latest", "Nightly"), ("test_first", "CI")]);
    assert_eq!(tests[0].error_type.as_deref(), Some("AssertionError"));
    assert_eq!(tests[0].retry_count, 1);

    assert_eq!(pool.failed_tests_with_workflow(1).await.unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_error_pattern_upsert_replaces_row() {
    let (pool, _dir) = create_test_pool().await;

    pool.upsert_error_pattern(&pattern("Test assertion failed", 2)).await.unwrap();
    let mut replacement = pattern("Test assertion failed", 5);
    replacement.suggested_fix = "Fix the assertion".to_string();
    pool.upsert_error_pattern(&replacement).await.unwrap();

    let stored = pool.patterns_by_frequency().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].frequency, 5);
    assert_eq!(stored[0].suggested_fix, "Fix the assertion");
}

#[actix_rt::test]
async fn test_error_pattern_frequency_never_decreases() {
    let (pool, _dir) = create_test_pool().await;

    pool.upsert_error_pattern(&pattern("Missing dependency", 4)).await.unwrap();
    assert!(matches!(
        pool.upsert_error_pattern(&pattern("Missing dependency", 3)).await,
        Err(AppError::Validation(_))
    ));

    let stored = pool.get_error_pattern("Missing dependency").await.unwrap().unwrap();
    assert_eq!(stored.frequency, 4);
}

#[actix_rt::test]
async fn test_patterns_by_frequency_order() {
    let (pool, _dir) = create_test_pool().await;

    pool.upsert_error_pattern(&pattern("rare", 1)).await.unwrap();
    pool.upsert_error_pattern(&pattern("common", 9)).await.unwrap();
    pool.upsert_error_pattern(&pattern("medium", 4)).await.unwrap();

    let order: Vec<String> = pool
        .patterns_by_frequency()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.pattern)
        .collect();
    assert_eq!(order, vec!["common", "medium", "rare"]);
}

#[actix_rt::test]
async fn test_analysis_results_are_appended_opaquely() {
    let (pool, _dir) = create_test_pool().await;

    let mut record = AnalysisRecord::new(
        "workflow_failure_analysis",
        serde_json::json!({"nested": {"anything": [1, 2, 3]}}),
    );
    record.failure_id = Some("r1".to_string());
    record.workflow_name = Some("CI".to_string());

    let first = pool.append_analysis_result(&record).await.unwrap();
    let second = pool.append_analysis_result(&record).await.unwrap();
    assert_ne!(first, second);

    let stored = pool
        .analysis_results_by_type("workflow_failure_analysis", 10)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].payload["nested"]["anything"][2], 3);
    assert_eq!(stored[0].failure_id.as_deref(), Some("r1"));

    assert!(
        pool.analysis_results_by_type("other", 10)
            .await
            .unwrap()
            .is_empty()
    );
}
