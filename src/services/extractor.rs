//! Failure reason extraction from job and step data.
//!
//! Precedence for the first failed job of a run:
//! 1. first failed step, labelled by [`STEP_RULES`]
//! 2. fixed log signatures in [`LOG_SIGNATURES`] order
//! 3. last log line containing one of [`LOG_KEYWORDS`]
//! 4. `Failure in job: <name>`
//!
//! A run with no failed job yields [`UNKNOWN_FAILURE`].

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::Job;
use crate::services::run_source::RunSource;

/// Reason given when no job of the run failed.
pub const UNKNOWN_FAILURE: &str = "Unknown failure";

/// Failed-step name substrings (case-insensitive) and the label they produce.
pub const STEP_RULES: &[(&str, &str)] = &[
    ("test", "Test failure in step"),
    ("build", "Build failure in step"),
];

/// Label for failed steps that match no entry of [`STEP_RULES`].
pub const STEP_FALLBACK_LABEL: &str = "Failure in step";

/// Case-sensitive log substrings, checked in order.
pub const LOG_SIGNATURES: &[(&str, &str)] = &[
    ("AssertionError", "Test assertion failed"),
    ("ModuleNotFoundError", "Missing dependency"),
    ("Timeout", "Job timed out"),
    ("Permission denied", "Permission error"),
    ("Connection refused", "Network connection failed"),
];

/// Lowercase keywords marking a log line as an error line.
pub const LOG_KEYWORDS: &[&str] = &["error", "failed", "exception", "traceback"];

/// Which rule produced a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonOrigin {
    FailedStep,
    LogSignature,
    LogLine,
    JobFallback,
    NoFailedJob,
}

/// Best-effort explanation of why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub text: String,
    pub origin: ReasonOrigin,
}

impl FailureReason {
    fn new(text: impl Into<String>, origin: ReasonOrigin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_FAILURE, ReasonOrigin::NoFailedJob)
    }
}

impl AsRef<str> for FailureReason {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Reason from the first failed step of `job`, if any step failed.
pub fn failed_step_reason(job: &Job) -> Option<FailureReason> {
    let step = job.steps.iter().find(|s| s.is_failed())?;
    let lowered = step.name.to_lowercase();
    let label = STEP_RULES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, label)| *label)
        .unwrap_or(STEP_FALLBACK_LABEL);

    Some(FailureReason::new(
        format!("{}: {}", label, step.name),
        ReasonOrigin::FailedStep,
    ))
}

/// Reason from log text, falling back to the job name.
pub fn log_reason(job: &Job, log: &str) -> FailureReason {
    if let Some((_, label)) = LOG_SIGNATURES
        .iter()
        .find(|(signature, _)| log.contains(signature))
    {
        return FailureReason::new(*label, ReasonOrigin::LogSignature);
    }

    let last_error_line = log
        .lines()
        .filter(|line| {
            let lowered = line.to_lowercase();
            LOG_KEYWORDS.iter().any(|kw| lowered.contains(kw))
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last();

    match last_error_line {
        Some(line) => FailureReason::new(line, ReasonOrigin::LogLine),
        None => FailureReason::new(
            format!("Failure in job: {}", job.display_name()),
            ReasonOrigin::JobFallback,
        ),
    }
}

/// Explain one failed job given its (possibly empty) log.
pub fn explain_job(job: &Job, log: &str) -> FailureReason {
    failed_step_reason(job).unwrap_or_else(|| log_reason(job, log))
}

/// Step logs joined in step order, used when the job log is unavailable.
fn step_logs(job: &Job) -> String {
    job.steps
        .iter()
        .filter_map(|s| s.log.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the failure reason for a run from its jobs.
///
/// Only the first failed job is examined. Its log is fetched only when no
/// step failed; a fetch error counts as an empty log.
pub async fn extract(jobs: &[Job], source: &dyn RunSource) -> FailureReason {
    let Some(job) = jobs.iter().find(|j| j.is_failed()) else {
        return FailureReason::unknown();
    };

    if let Some(reason) = failed_step_reason(job) {
        return reason;
    }

    let fetched = match source.job_log(&job.id).await {
        Ok(log) => log,
        Err(e) => {
            warn!("Failed to fetch log for job {}: {}", job.id, e);
            String::new()
        }
    };
    let log = if fetched.trim().is_empty() {
        step_logs(job)
    } else {
        fetched
    };
    debug!("Scanning {} bytes of log for job {}", log.len(), job.id);

    log_reason(job, &log)
}
