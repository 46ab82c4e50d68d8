//! Batch orchestration against a fake run source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ci_insights_lib::error::{AppError, AppResult};
use ci_insights_lib::models::{Category, Conclusion, WORKFLOW_FAILURE_ANALYSIS};
use ci_insights_lib::services::Pipeline;
use ci_insights_lib::services::advisor::{AdvicePrompt, Advisor, FALLBACK_SUGGESTIONS};
use ci_insights_lib::services::correlator::{LINE_NOT_FOUND, UNKNOWN_JOB};

use super::test_helpers::{
    CI_WORKFLOW, CI_WORKFLOW_PATH, FakeRunSource, at, create_test_pool, job,
    reject_analysis_inserts, step, summary,
};

struct FixedAdvisor(Vec<&'static str>);

#[async_trait]
impl Advisor for FixedAdvisor {
    async fn suggest(&self, _prompt: &AdvicePrompt) -> AppResult<Vec<String>> {
        Ok(self.0.iter().map(|s| s.to_string()).collect())
    }
}

struct BrokenAdvisor;

#[async_trait]
impl Advisor for BrokenAdvisor {
    async fn suggest(&self, _prompt: &AdvicePrompt) -> AppResult<Vec<String>> {
        Err(AppError::Upstream("service unavailable".to_string()))
    }
}

/// Four runs: one success, one failed step, one log-only failure, one whose
/// jobs cannot be listed.
fn mixed_source() -> FakeRunSource {
    let mut jobs = HashMap::new();
    jobs.insert(
        "r-step".to_string(),
        vec![
            job("11", "build", Conclusion::Success, vec![step("Compile", Conclusion::Success)]),
            job(
                "12",
                "test",
                Conclusion::Failure,
                vec![
                    step("Checkout", Conclusion::Success),
                    step("Run unit tests", Conclusion::Failure),
                ],
            ),
        ],
    );
    jobs.insert(
        "r-log".to_string(),
        vec![job("21", "deploy", Conclusion::Failure, vec![])],
    );

    let mut logs = HashMap::new();
    logs.insert(
        "21".to_string(),
        "Deploying...\nssh: connect to host: Connection refused\n".to_string(),
    );

    let mut definitions = HashMap::new();
    definitions.insert(CI_WORKFLOW_PATH.to_string(), CI_WORKFLOW.to_string());

    FakeRunSource {
        runs: vec![
            summary("r-ok", Some(Conclusion::Success), at(9, 0)),
            summary("r-step", Some(Conclusion::Failure), at(10, 0)),
            summary("r-log", Some(Conclusion::Failure), at(11, 0)),
            summary("r-nojobs", Some(Conclusion::Failure), at(12, 0)),
        ],
        jobs,
        logs,
        definitions,
        ..Default::default()
    }
}

#[actix_rt::test]
async fn test_batch_stores_every_run_and_analyzes_failures() {
    let (pool, _dir) = create_test_pool().await;
    let source = Arc::new(mixed_source());
    let pipeline = Pipeline::new(pool.clone(), source.clone());

    let summary = pipeline.run_batch(None).await.unwrap();

    assert_eq!(summary.runs_seen, 4);
    assert_eq!(summary.runs_stored, 4);
    assert_eq!(summary.failures_analyzed, 3);
    assert_eq!(summary.skipped, 0);

    let reasons: Vec<(&str, &str)> = summary
        .insights
        .iter()
        .map(|i| (i.run_id.as_str(), i.reason.as_str()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("r-log", "Network connection failed"),
            ("r-nojobs", "Unknown failure"),
            ("r-step", "Test failure in step: Run unit tests"),
        ]
    );

    let ok = pool.get_run("r-ok").await.unwrap().unwrap();
    assert_eq!(ok.failure_reason, None);
    for run in pool.recent_failed_runs(10).await.unwrap() {
        assert!(run.failure_reason.is_some());
    }

    // Only the log-only failure needed its log.
    assert_eq!(source.log_requests(), 1);

    let analyses = pool
        .analysis_results_by_type(WORKFLOW_FAILURE_ANALYSIS, 10)
        .await
        .unwrap();
    assert_eq!(analyses.len(), 3);
}

#[actix_rt::test]
async fn test_step_failure_is_correlated_and_classified() {
    let (pool, _dir) = create_test_pool().await;
    let pipeline = Pipeline::new(pool.clone(), Arc::new(mixed_source()));

    let summary = pipeline.run_batch(None).await.unwrap();
    let insight = summary
        .insights
        .iter()
        .find(|i| i.run_id == "r-step")
        .unwrap();

    assert_eq!(insight.category, Category::TestFailures);
    assert_eq!(insight.correlated_job, "test");
    assert_eq!(insight.correlated_line, Some(7));
    assert_eq!(insight.correlated_line_text, "- uses: actions/checkout@v4");
    assert!(insight.suggestions.is_empty());

    let network = summary
        .insights
        .iter()
        .find(|i| i.run_id == "r-log")
        .unwrap();
    assert_eq!(network.category, Category::NetworkProblems);
}

#[actix_rt::test]
async fn test_missing_definition_degrades_to_sentinels() {
    let (pool, _dir) = create_test_pool().await;
    let mut source = mixed_source();
    source.definitions.clear();
    let pipeline = Pipeline::new(pool, Arc::new(source));

    let summary = pipeline.run_batch(None).await.unwrap();

    assert_eq!(summary.failures_analyzed, 3);
    for insight in &summary.insights {
        assert_eq!(insight.correlated_line, None);
        assert_eq!(insight.correlated_line_text, LINE_NOT_FOUND);
        assert_eq!(insight.correlated_job, UNKNOWN_JOB);
    }
}

#[actix_rt::test]
async fn test_patterns_follow_stored_failures() {
    let (pool, _dir) = create_test_pool().await;
    let mut source = mixed_source();
    source.runs.push(summary("r-step-2", Some(Conclusion::Failure), at(13, 0)));
    let step_jobs = source.jobs["r-step"].clone();
    source.jobs.insert("r-step-2".to_string(), step_jobs);
    let pipeline = Pipeline::new(pool.clone(), Arc::new(source));

    let summary = pipeline.run_batch(None).await.unwrap();
    assert_eq!(summary.patterns_updated, 3);

    let patterns = pool.patterns_by_frequency().await.unwrap();
    assert_eq!(patterns[0].pattern, "Test failure in step: Run unit tests");
    assert_eq!(patterns[0].frequency, 2);
    assert_eq!(patterns[0].error_type, Category::TestFailures);
    assert_eq!(
        patterns[0].suggested_fix,
        Category::TestFailures.default_fix()
    );

    // Re-running the same batch does not inflate frequencies.
    pipeline.run_batch(None).await.unwrap();
    let again = pool.get_error_pattern("Test failure in step: Run unit tests").await.unwrap().unwrap();
    assert_eq!(again.frequency, 2);
    assert_eq!(pool.recent_failed_runs(10).await.unwrap().len(), 4);
}

#[actix_rt::test]
async fn test_advisor_output_and_fallback() {
    let (pool, _dir) = create_test_pool().await;
    let pipeline = Pipeline::new(pool.clone(), Arc::new(mixed_source()))
        .with_advisor(Arc::new(FixedAdvisor(vec!["Re-run the job"])));
    let summary = pipeline.run_batch(None).await.unwrap();
    assert!(
        summary
            .insights
            .iter()
            .all(|i| i.suggestions == vec!["Re-run the job"])
    );

    let pipeline = Pipeline::new(pool, Arc::new(mixed_source())).with_advisor(Arc::new(BrokenAdvisor));
    let summary = pipeline.run_batch(None).await.unwrap();
    assert_eq!(summary.failures_analyzed, 3);
    assert!(
        summary
            .insights
            .iter()
            .all(|i| i.suggestions == FALLBACK_SUGGESTIONS.to_vec())
    );
}

#[actix_rt::test]
async fn test_slow_log_fetch_falls_back_to_job_name() {
    let (pool, _dir) = create_test_pool().await;
    let mut source = mixed_source();
    source.log_delay = Some(Duration::from_secs(5));
    let pipeline = Pipeline::new(pool, Arc::new(source))
        .with_fetch_timeout(Duration::from_millis(50));

    let summary = pipeline.run_batch(None).await.unwrap();
    let insight = summary
        .insights
        .iter()
        .find(|i| i.run_id == "r-log")
        .unwrap();
    assert_eq!(insight.reason, "Failure in job: deploy");
    assert_eq!(insight.category, Category::OtherIssues);
}

#[actix_rt::test]
async fn test_listing_failure_yields_empty_batch() {
    let (pool, _dir) = create_test_pool().await;
    let source = FakeRunSource {
        fail_listing: true,
        ..mixed_source()
    };
    let pipeline = Pipeline::new(pool.clone(), Arc::new(source));

    let summary = pipeline.run_batch(None).await.unwrap();
    assert_eq!(summary.runs_seen, 0);
    assert!(pool.recent_failed_runs(10).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_since_filters_runs() {
    let (pool, _dir) = create_test_pool().await;
    let pipeline = Pipeline::new(pool, Arc::new(mixed_source()));

    let summary = pipeline.run_batch(Some(at(11, 0))).await.unwrap();
    assert_eq!(summary.runs_seen, 2);
}

#[actix_rt::test]
async fn test_fatal_store_error_aborts_batch() {
    let (pool, _dir) = create_test_pool().await;
    reject_analysis_inserts(&pool).await;
    let pipeline = Pipeline::new(pool.clone(), Arc::new(mixed_source()));

    let err = pipeline.run_batch(None).await.unwrap_err();
    assert!(matches!(err, AppError::SchemaMismatch(_)), "got {:?}", err);
    assert!(pool.patterns_by_frequency().await.unwrap().is_empty());
}
