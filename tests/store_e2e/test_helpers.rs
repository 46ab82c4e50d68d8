//! Shared test helpers for store E2E tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ci_insights_lib::db::DbPool;
use ci_insights_lib::error::{AppError, AppResult};
use ci_insights_lib::models::{Conclusion, Job, Run, RunStatus, RunSummary, Step};
use ci_insights_lib::services::RunSource;
use sea_orm::ConnectionTrait;
use tempfile::TempDir;

/// Workflow used by most pipeline tests.
pub const CI_WORKFLOW: &str = "\
name: CI
on: push
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Compile
        run: cargo build
  test:
    runs-on: ubuntu-latest
    steps:
      - name: Run unit tests
        run: cargo test
";

pub const CI_WORKFLOW_PATH: &str = ".github/workflows/ci.yml";

/// SQLite URL for a database file inside `dir`.
pub fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("insights.db").display())
}

/// Fresh migrated pool. Keep the returned directory alive for the test.
pub async fn create_test_pool() -> (DbPool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = DbPool::connect(&sqlite_url(&dir))
        .await
        .expect("Failed to connect to database");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    (pool, dir)
}

/// Make every insert into analysis_results fail while the layout stays current,
/// so a rebuild cannot clear the fault.
pub async fn reject_analysis_inserts(pool: &DbPool) {
    pool.connection()
        .execute_unprepared(
            "CREATE TRIGGER reject_analysis BEFORE INSERT ON analysis_results
             BEGIN SELECT RAISE(ABORT, 'analysis writes disabled'); END",
        )
        .await
        .expect("Failed to install trigger");
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

pub fn summary(run_id: &str, conclusion: Option<Conclusion>, started_at: DateTime<Utc>) -> RunSummary {
    RunSummary {
        run_id: run_id.to_string(),
        workflow_name: "CI".to_string(),
        status: if conclusion.is_some() {
            RunStatus::Completed
        } else {
            RunStatus::InProgress
        },
        conclusion,
        started_at,
        completed_at: conclusion.map(|_| started_at + chrono::Duration::minutes(3)),
        repository: "acme/widgets".to_string(),
        branch: "main".to_string(),
        commit_sha: format!("sha-{}", run_id),
        definition_path: Some(CI_WORKFLOW_PATH.to_string()),
    }
}

pub fn failed_run(run_id: &str, reason: &str, started_at: DateTime<Utc>) -> Run {
    Run::from_summary(
        summary(run_id, Some(Conclusion::Failure), started_at),
        Some(reason.to_string()),
    )
}

pub fn step(name: &str, conclusion: Conclusion) -> Step {
    Step {
        name: name.to_string(),
        conclusion: Some(conclusion),
        log: None,
    }
}

pub fn job(id: &str, name: &str, conclusion: Conclusion, steps: Vec<Step>) -> Job {
    Job {
        id: id.to_string(),
        name: Some(name.to_string()),
        conclusion: Some(conclusion),
        steps,
    }
}

/// In-memory run source. Missing entries behave like provider errors.
#[derive(Default)]
pub struct FakeRunSource {
    pub runs: Vec<RunSummary>,
    pub jobs: HashMap<String, Vec<Job>>,
    pub logs: HashMap<String, String>,
    pub definitions: HashMap<String, String>,
    pub fail_listing: bool,
    /// Delay applied to every job log fetch.
    pub log_delay: Option<Duration>,
    pub log_requests: AtomicUsize,
}

impl FakeRunSource {
    pub fn log_requests(&self) -> usize {
        self.log_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunSource for FakeRunSource {
    async fn list_runs(&self, since: Option<DateTime<Utc>>) -> AppResult<Vec<RunSummary>> {
        if self.fail_listing {
            return Err(AppError::Upstream("listing unavailable".to_string()));
        }
        Ok(self
            .runs
            .iter()
            .filter(|r| since.is_none_or(|s| r.started_at >= s))
            .cloned()
            .collect())
    }

    async fn list_jobs(&self, run_id: &str) -> AppResult<Vec<Job>> {
        self.jobs
            .get(run_id)
            .cloned()
            .ok_or_else(|| AppError::Upstream(format!("no jobs for {}", run_id)))
    }

    async fn job_log(&self, job_id: &str) -> AppResult<String> {
        self.log_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.log_delay {
            tokio::time::sleep(delay).await;
        }
        self.logs
            .get(job_id)
            .cloned()
            .ok_or_else(|| AppError::Upstream(format!("no log for {}", job_id)))
    }

    async fn definition_text(&self, path: &str, _git_ref: Option<&str>) -> AppResult<String> {
        self.definitions
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::Upstream(format!("no definition at {}", path)))
    }
}
