//! Test result model representing individual test executions within a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Test execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
}

impl TestStatus {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Test result to be appended to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTestResult {
    pub run_id: String,
    pub test_name: String,
    pub status: TestStatus,
    /// Execution time in seconds
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl NewTestResult {
    /// Reject records that break the failure-detail invariants instead of coercing them.
    pub fn validate(&self) -> AppResult<()> {
        if self.run_id.trim().is_empty() {
            return Err(AppError::Validation("run_id must not be empty".to_string()));
        }
        if self.test_name.trim().is_empty() {
            return Err(AppError::Validation(
                "test_name must not be empty".to_string(),
            ));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(AppError::Validation(format!(
                "test {} has invalid duration {}",
                self.test_name, self.duration_seconds
            )));
        }

        match self.status {
            TestStatus::Failed => {
                if self.error_type.as_deref().is_none_or(|t| t.trim().is_empty()) {
                    return Err(AppError::Validation(format!(
                        "failed test {} has no error_type",
                        self.test_name
                    )));
                }
            }
            TestStatus::Passed => {
                if self.failure_message.is_some()
                    || self.error_type.is_some()
                    || self.stack_trace.is_some()
                {
                    return Err(AppError::Validation(format!(
                        "passed test {} carries failure details",
                        self.test_name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Failed test joined with the workflow of its run.
#[derive(Debug, Clone, Serialize)]
pub struct FailedTest {
    pub id: i64,
    pub run_id: String,
    pub workflow_name: String,
    pub test_name: String,
    pub duration_seconds: f64,
    pub failure_message: Option<String>,
    pub error_type: Option<String>,
    pub stack_trace: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}
