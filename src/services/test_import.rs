//! Import of test results from a JSON report.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{NewTestResult, TestStatus};

/// One entry of an imported report. The run is given by the caller.
#[derive(Debug, Deserialize)]
struct ImportedTest {
    #[serde(alias = "name")]
    test_name: String,
    status: String,
    #[serde(default, alias = "duration")]
    duration_seconds: f64,
    #[serde(default)]
    failure_message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    stack_trace: Option<String>,
    #[serde(default)]
    retry_count: u32,
}

/// Counts from one import. Rejected entries keep their index and reason.
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: Vec<String>,
}

/// Append every entry of a JSON array to `run_id`.
///
/// Entries that fail validation are reported and skipped; store errors abort.
pub async fn import_test_results(
    pool: &DbPool,
    run_id: &str,
    json: &str,
) -> AppResult<ImportSummary> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut summary = ImportSummary::default();

    for (index, entry) in entries.into_iter().enumerate() {
        let result = match to_result(run_id, entry) {
            Ok(result) => result,
            Err(msg) => {
                summary.rejected.push(format!("entry {}: {}", index, msg));
                continue;
            }
        };

        match pool.append_test_result(&result).await {
            Ok(_) => summary.imported += 1,
            Err(AppError::Validation(msg)) => {
                summary.rejected.push(format!("entry {}: {}", index, msg));
            }
            Err(e) => return Err(e),
        }
    }

    if !summary.rejected.is_empty() {
        warn!(
            "Rejected {} test results for run {}",
            summary.rejected.len(),
            run_id
        );
    }
    info!("Imported {} test results for run {}", summary.imported, run_id);
    Ok(summary)
}

fn to_result(run_id: &str, entry: serde_json::Value) -> Result<NewTestResult, String> {
    let test: ImportedTest = serde_json::from_value(entry).map_err(|e| e.to_string())?;
    let status = TestStatus::parse(&test.status.to_lowercase())
        .ok_or_else(|| format!("unknown status '{}'", test.status))?;

    Ok(NewTestResult {
        run_id: run_id.to_string(),
        test_name: test.test_name,
        status,
        duration_seconds: test.duration_seconds,
        failure_message: test.failure_message,
        error_type: test.error_type,
        stack_trace: test.stack_trace,
        retry_count: test.retry_count,
    })
}
