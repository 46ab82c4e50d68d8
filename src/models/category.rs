//! Closed failure taxonomy.

use serde::{Deserialize, Serialize};

/// Failure category used to group runs for pattern aggregation.
///
/// Declaration order is the display order of grouped output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Test Failures")]
    TestFailures,
    #[serde(rename = "Build Failures")]
    BuildFailures,
    #[serde(rename = "Timeout Issues")]
    TimeoutIssues,
    #[serde(rename = "Dependency Problems")]
    DependencyProblems,
    #[serde(rename = "Permission Issues")]
    PermissionIssues,
    #[serde(rename = "Network Problems")]
    NetworkProblems,
    #[serde(rename = "Other Issues")]
    OtherIssues,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::TestFailures,
        Self::BuildFailures,
        Self::TimeoutIssues,
        Self::DependencyProblems,
        Self::PermissionIssues,
        Self::NetworkProblems,
        Self::OtherIssues,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TestFailures => "Test Failures",
            Self::BuildFailures => "Build Failures",
            Self::TimeoutIssues => "Timeout Issues",
            Self::DependencyProblems => "Dependency Problems",
            Self::PermissionIssues => "Permission Issues",
            Self::NetworkProblems => "Network Problems",
            Self::OtherIssues => "Other Issues",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Fix suggestion stored with error patterns of this category.
    pub fn default_fix(&self) -> &'static str {
        match self {
            Self::TestFailures => {
                "Reproduce the failing test locally and check recent changes to the code under test"
            }
            Self::BuildFailures => {
                "Check compiler output for the first error and verify toolchain versions"
            }
            Self::TimeoutIssues => {
                "Raise the job timeout or split long-running steps; look for hanging processes"
            }
            Self::DependencyProblems => {
                "Verify all dependencies are declared and the lockfile is up to date"
            }
            Self::PermissionIssues => {
                "Review token scopes and file permissions used by the workflow"
            }
            Self::NetworkProblems => {
                "Check service availability and add retries around network calls"
            }
            Self::OtherIssues => "Review the job log and the workflow configuration",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
