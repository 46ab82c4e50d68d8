//! Per-run result bundle handed to callers.

use serde::{Deserialize, Serialize};

use super::Category;

/// Extraction, classification and correlation outcome for one failed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInsight {
    pub run_id: String,
    pub workflow_name: String,
    pub reason: String,
    pub category: Category,
    /// 1-based line in the workflow definition, if one was located.
    pub correlated_line: Option<usize>,
    pub correlated_line_text: String,
    pub correlated_job: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}
