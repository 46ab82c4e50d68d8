//! Domain models for CI Insights.

pub mod analysis;
pub mod category;
pub mod definition;
pub mod error_pattern;
pub mod insight;
pub mod run;
pub mod test_result;

// Re-export commonly used types
pub use analysis::{AnalysisRecord, StoredAnalysis, WORKFLOW_FAILURE_ANALYSIS};
pub use category::Category;
pub use definition::{DefinitionDoc, JobDef, StepDef};
pub use error_pattern::ErrorPattern;
pub use insight::RunInsight;
pub use run::{Conclusion, Job, Run, RunStatus, RunSummary, Step};
pub use test_result::{FailedTest, NewTestResult, TestStatus};

/// Default row limit for list queries.
pub const DEFAULT_LIMIT: u64 = 20;

/// Upper bound for caller-supplied list limits.
pub const MAX_LIMIT: u64 = 500;

/// Clamp a caller-supplied limit into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
