//! CI provider access: the `RunSource` seam and its GitHub Actions implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GitHubSettings;
use crate::error::{AppError, AppResult};
use crate::models::{Conclusion, Job, RunStatus, RunSummary, Step};

/// HTTP connect timeout for GitHub API calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Page size for the workflow runs listing (GitHub maximum).
const RUNS_PER_PAGE: usize = 100;
/// Upper bound on listing pages fetched per batch.
const MAX_RUN_PAGES: u32 = 10;
const USER_AGENT: &str = "ci-insights";
const API_VERSION: &str = "2022-11-28";

/// Supplier of runs, jobs, logs and workflow definitions.
///
/// Every call may fail; callers degrade to "no data" instead of aborting.
#[async_trait]
pub trait RunSource: Send + Sync {
    /// Runs created at or after `since` (all runs when `None`).
    async fn list_runs(&self, since: Option<DateTime<Utc>>) -> AppResult<Vec<RunSummary>>;

    /// Jobs of one run, in provider order.
    async fn list_jobs(&self, run_id: &str) -> AppResult<Vec<Job>>;

    /// Raw log of one job. May be empty.
    async fn job_log(&self, job_id: &str) -> AppResult<String>;

    /// Workflow definition text at `git_ref` (default branch when `None`). May be empty.
    async fn definition_text(&self, path: &str, git_ref: Option<&str>) -> AppResult<String>;
}

/// Wraps a source so that no single call runs longer than `timeout`.
pub struct BoundedSource {
    inner: Arc<dyn RunSource>,
    timeout: Duration,
}

impl BoundedSource {
    pub fn new(inner: Arc<dyn RunSource>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl std::future::Future<Output = AppResult<T>> + Send,
    ) -> AppResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| AppError::Upstream(format!("{} timed out after {:?}", what, self.timeout)))?
    }
}

#[async_trait]
impl RunSource for BoundedSource {
    async fn list_runs(&self, since: Option<DateTime<Utc>>) -> AppResult<Vec<RunSummary>> {
        self.bounded("listing runs", self.inner.list_runs(since)).await
    }

    async fn list_jobs(&self, run_id: &str) -> AppResult<Vec<Job>> {
        self.bounded("listing jobs", self.inner.list_jobs(run_id))
            .await
    }

    async fn job_log(&self, job_id: &str) -> AppResult<String> {
        self.bounded("fetching job log", self.inner.job_log(job_id))
            .await
    }

    async fn definition_text(&self, path: &str, git_ref: Option<&str>) -> AppResult<String> {
        self.bounded(
            "fetching workflow definition",
            self.inner.definition_text(path, git_ref),
        )
        .await
    }
}

// ============================================================================
// GitHub Actions
// ============================================================================

#[derive(Deserialize)]
struct WorkflowRunsPage {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRunDto>,
}

#[derive(Deserialize)]
struct WorkflowRunDto {
    id: u64,
    name: Option<String>,
    status: Option<String>,
    conclusion: Option<String>,
    created_at: DateTime<Utc>,
    run_started_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    head_branch: Option<String>,
    head_sha: String,
    path: Option<String>,
    repository: Option<RepositoryDto>,
}

#[derive(Deserialize)]
struct RepositoryDto {
    full_name: String,
}

#[derive(Deserialize)]
struct JobsPage {
    #[serde(default)]
    jobs: Vec<JobDto>,
}

#[derive(Deserialize)]
struct JobDto {
    id: u64,
    name: Option<String>,
    conclusion: Option<String>,
    #[serde(default)]
    steps: Vec<StepDto>,
}

#[derive(Deserialize)]
struct StepDto {
    name: String,
    conclusion: Option<String>,
}

impl WorkflowRunDto {
    /// `None` when the provider reports a status outside the known set.
    fn into_summary(self, fallback_repository: &str) -> Option<RunSummary> {
        let status = match self.status.as_deref().and_then(RunStatus::parse) {
            Some(status) => status,
            None => {
                warn!("Skipping run {} with unknown status {:?}", self.id, self.status);
                return None;
            }
        };
        let completed = status == RunStatus::Completed;

        Some(RunSummary {
            run_id: self.id.to_string(),
            workflow_name: self.name.unwrap_or_else(|| "Unnamed workflow".to_string()),
            status,
            conclusion: if completed {
                self.conclusion.as_deref().and_then(Conclusion::parse)
            } else {
                None
            },
            started_at: self.run_started_at.unwrap_or(self.created_at),
            completed_at: completed.then_some(self.updated_at),
            repository: self
                .repository
                .map(|r| r.full_name)
                .unwrap_or_else(|| fallback_repository.to_string()),
            branch: self.head_branch.unwrap_or_default(),
            commit_sha: self.head_sha,
            definition_path: self.path.filter(|p| !p.is_empty()),
        })
    }
}

impl From<JobDto> for Job {
    fn from(dto: JobDto) -> Self {
        Job {
            id: dto.id.to_string(),
            name: dto.name,
            conclusion: dto.conclusion.as_deref().and_then(Conclusion::parse),
            steps: dto
                .steps
                .into_iter()
                .map(|s| Step {
                    name: s.name,
                    conclusion: s.conclusion.as_deref().and_then(Conclusion::parse),
                    log: None,
                })
                .collect(),
        }
    }
}

/// GitHub Actions REST client for one repository.
pub struct GitHubRunSource {
    http_client: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: SecretString,
}

impl GitHubRunSource {
    /// Build a client with connect and total request timeouts.
    pub fn new(settings: &GitHubSettings, request_timeout: Duration) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            token: SecretString::from(settings.token.expose_secret().to_string()),
        })
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
            suffix
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(url)
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn get_text(&self, url: &str, accept: &str) -> AppResult<String> {
        let bytes = self
            .get(url)
            .header("Accept", accept)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl RunSource for GitHubRunSource {
    async fn list_runs(&self, since: Option<DateTime<Utc>>) -> AppResult<Vec<RunSummary>> {
        let fallback_repository = format!("{}/{}", self.owner, self.repo);
        let created_filter = since
            .map(|s| {
                format!(
                    "&created={}",
                    urlencoding::encode(&format!(">={}", s.format("%Y-%m-%d")))
                )
            })
            .unwrap_or_default();

        let mut runs = Vec::new();
        for page in 1..=MAX_RUN_PAGES {
            let url = self.repo_url(&format!(
                "actions/runs?per_page={}&page={}{}",
                RUNS_PER_PAGE, page, created_filter
            ));
            let body: WorkflowRunsPage = self
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let fetched = body.workflow_runs.len();
            debug!("Fetched {} runs from page {}", fetched, page);
            runs.extend(
                body.workflow_runs
                    .into_iter()
                    .filter_map(|dto| dto.into_summary(&fallback_repository)),
            );

            if fetched < RUNS_PER_PAGE {
                break;
            }
        }

        Ok(runs)
    }

    async fn list_jobs(&self, run_id: &str) -> AppResult<Vec<Job>> {
        let url = self.repo_url(&format!(
            "actions/runs/{}/jobs?per_page=100",
            urlencoding::encode(run_id)
        ));
        let body: JobsPage = self
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.jobs.into_iter().map(Job::from).collect())
    }

    async fn job_log(&self, job_id: &str) -> AppResult<String> {
        let url = self.repo_url(&format!(
            "actions/jobs/{}/logs",
            urlencoding::encode(job_id)
        ));
        self.get_text(&url, "application/vnd.github+json").await
    }

    async fn definition_text(&self, path: &str, git_ref: Option<&str>) -> AppResult<String> {
        let encoded_path = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let mut url = self.repo_url(&format!("contents/{}", encoded_path));
        if let Some(git_ref) = git_ref {
            url.push_str(&format!("?ref={}", urlencoding::encode(git_ref)));
        }

        self.get_text(&url, "application/vnd.github.raw").await
    }
}
