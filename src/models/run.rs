//! Pipeline run domain models.
//!
//! `Run` is persisted; `Job` and `Step` are transient extractor input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Run lifecycle status reported by the CI provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Parse a provider status. Pending states other than `in_progress`
    /// (`waiting`, `requested`, `pending`) are treated as queued.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" | "waiting" | "requested" | "pending" => Some(Self::Queued),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a completed run, job or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    TimedOut,
    Neutral,
    ActionRequired,
    Stale,
}

impl Conclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
            Self::Neutral => "neutral",
            Self::ActionRequired => "action_required",
            Self::Stale => "stale",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "cancelled" => Some(Self::Cancelled),
            "skipped" => Some(Self::Skipped),
            "timed_out" => Some(Self::TimedOut),
            "neutral" => Some(Self::Neutral),
            "action_required" => Some(Self::ActionRequired),
            "stale" => Some(Self::Stale),
            _ => None,
        }
    }
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run record as supplied by the run source, before failure analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub workflow_name: String,
    pub status: RunStatus,
    pub conclusion: Option<Conclusion>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub repository: String,
    pub branch: String,
    pub commit_sha: String,
    /// Workflow definition file, e.g. `.github/workflows/ci.yml`.
    pub definition_path: Option<String>,
}

impl RunSummary {
    pub fn is_failed(&self) -> bool {
        self.conclusion == Some(Conclusion::Failure)
    }
}

/// One persisted pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub workflow_name: String,
    pub status: RunStatus,
    pub conclusion: Option<Conclusion>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub repository: String,
    pub branch: String,
    pub commit_sha: String,
    pub definition_path: Option<String>,
    /// Set iff `conclusion == Some(Failure)`.
    pub failure_reason: Option<String>,
}

impl Run {
    /// Attach a failure reason to a summary. The reason is dropped for
    /// runs that did not fail so the invariant holds by construction.
    pub fn from_summary(summary: RunSummary, failure_reason: Option<String>) -> Self {
        let failure_reason = if summary.is_failed() {
            Some(failure_reason.unwrap_or_else(|| "Unknown failure".to_string()))
        } else {
            None
        };

        Self {
            run_id: summary.run_id,
            workflow_name: summary.workflow_name,
            status: summary.status,
            conclusion: summary.conclusion,
            started_at: summary.started_at,
            completed_at: summary.completed_at,
            repository: summary.repository,
            branch: summary.branch,
            commit_sha: summary.commit_sha,
            definition_path: summary.definition_path,
            failure_reason,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.conclusion == Some(Conclusion::Failure)
    }

    /// Whole seconds between start and completion; zero while running
    /// and never negative.
    pub fn duration_seconds(&self) -> i64 {
        self.completed_at
            .map(|done| (done - self.started_at).num_seconds().max(0))
            .unwrap_or(0)
    }

    /// Check caller-supplied invariants before persisting.
    pub fn validate(&self) -> AppResult<()> {
        if self.run_id.trim().is_empty() {
            return Err(AppError::Validation("run_id must not be empty".to_string()));
        }

        match (self.is_failed(), &self.failure_reason) {
            (true, None) => Err(AppError::Validation(format!(
                "run {} failed but has no failure_reason",
                self.run_id
            ))),
            (false, Some(_)) => Err(AppError::Validation(format!(
                "run {} did not fail but has a failure_reason",
                self.run_id
            ))),
            _ => Ok(()),
        }
    }
}

/// One step of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub conclusion: Option<Conclusion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl Step {
    pub fn is_failed(&self) -> bool {
        self.conclusion == Some(Conclusion::Failure)
    }
}

/// One unit of work within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Provider job ID, used to fetch the job log.
    pub id: String,
    pub name: Option<String>,
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Job {
    pub fn is_failed(&self) -> bool {
        self.conclusion == Some(Conclusion::Failure)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown job")
    }
}
