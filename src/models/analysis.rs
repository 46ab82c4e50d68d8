//! Derived analysis artifacts stored with an opaque payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Analysis type written by the pipeline for each failed run.
pub const WORKFLOW_FAILURE_ANALYSIS: &str = "workflow_failure_analysis";

/// Analysis artifact to append. The store does not interpret `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analysis_type: String,
    pub failure_id: Option<String>,
    pub workflow_name: Option<String>,
    pub failure_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub payload: JsonValue,
}

impl AnalysisRecord {
    pub fn new(analysis_type: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            analysis_type: analysis_type.into(),
            failure_id: None,
            workflow_name: None,
            failure_reason: None,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Analysis artifact read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAnalysis {
    pub id: i64,
    pub analysis_type: String,
    pub failure_id: Option<String>,
    pub workflow_name: Option<String>,
    pub failure_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub payload: JsonValue,
}
