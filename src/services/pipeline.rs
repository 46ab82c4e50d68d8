//! Batch orchestration: fetch, extract, classify, correlate, persist.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    AnalysisRecord, ErrorPattern, Run, RunInsight, RunSummary, WORKFLOW_FAILURE_ANALYSIS,
};
use crate::services::advisor::{AdvicePrompt, Advisor, suggestions_or_fallback};
use crate::services::classifier::{classify, group_by_category};
use crate::services::correlator::{Correlation, correlate};
use crate::services::extractor;
use crate::services::run_source::{BoundedSource, RunSource};

/// Default number of runs fetched concurrently.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;
/// Default bound on a single collaborator call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one batch.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub runs_seen: usize,
    pub runs_stored: usize,
    pub failures_analyzed: usize,
    pub skipped: usize,
    pub patterns_updated: usize,
    /// Per-run results of failed runs, ordered by run_id.
    pub insights: Vec<RunInsight>,
}

/// Composition root tying the run source, the advisor and the store together.
pub struct Pipeline {
    pool: DbPool,
    source: BoundedSource,
    advisor: Option<Arc<dyn Advisor>>,
    max_concurrent_fetches: usize,
}

impl Pipeline {
    pub fn new(pool: DbPool, source: Arc<dyn RunSource>) -> Self {
        Self {
            pool,
            source: BoundedSource::new(source, DEFAULT_FETCH_TIMEOUT),
            advisor: None,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }

    /// Bound every collaborator call by `timeout`.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.source = self.source.with_timeout(timeout);
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Process every run created since `since`, then refresh error patterns.
    ///
    /// A failure to list runs yields an empty batch. Per-run errors skip that
    /// run; fatal store errors abort the batch.
    pub async fn run_batch(&self, since: Option<DateTime<Utc>>) -> AppResult<BatchSummary> {
        let runs = match self.source.list_runs(since).await {
            Ok(runs) => runs,
            Err(e) => {
                warn!("Failed to list runs: {}", e);
                Vec::new()
            }
        };

        let mut summary = BatchSummary {
            runs_seen: runs.len(),
            ..Default::default()
        };
        info!(
            "Processing {} runs ({} concurrent fetches)",
            summary.runs_seen, self.max_concurrent_fetches
        );

        let mut results = stream::iter(runs)
            .map(|run| async move {
                let run_id = run.run_id.clone();
                (run_id, self.process_run(run).await)
            })
            .buffer_unordered(self.max_concurrent_fetches);

        while let Some((run_id, result)) = results.next().await {
            match result {
                Ok(insight) => {
                    summary.runs_stored += 1;
                    if let Some(insight) = insight {
                        summary.failures_analyzed += 1;
                        summary.insights.push(insight);
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!("Aborting batch at run {}: {}", run_id, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Skipping run {}: {}", run_id, e);
                    summary.skipped += 1;
                }
            }
        }
        drop(results);

        summary.insights.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        summary.patterns_updated = self.aggregate_patterns(&summary.insights).await?;

        info!(
            "Batch complete: {} seen, {} stored, {} failures analyzed, {} skipped, {} patterns updated",
            summary.runs_seen,
            summary.runs_stored,
            summary.failures_analyzed,
            summary.skipped,
            summary.patterns_updated
        );
        Ok(summary)
    }

    /// Store one run. Failed runs are also analyzed and their insight
    /// appended as a `workflow_failure_analysis` artifact.
    pub async fn process_run(&self, summary: RunSummary) -> AppResult<Option<RunInsight>> {
        if !summary.is_failed() {
            self.pool.upsert_run(&Run::from_summary(summary, None)).await?;
            return Ok(None);
        }

        let jobs = match self.source.list_jobs(&summary.run_id).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("Failed to list jobs for run {}: {}", summary.run_id, e);
                Vec::new()
            }
        };
        let reason = extractor::extract(&jobs, &self.source).await;
        debug!("Run {} failed: {} ({:?})", summary.run_id, reason.text, reason.origin);

        let run = Run::from_summary(summary, Some(reason.text.clone()));
        self.pool.upsert_run(&run).await?;

        let category = classify(&reason.text);
        let correlation = self.correlate_run(&run, &reason.text).await;
        let suggestions = match &self.advisor {
            Some(advisor) => {
                let prompt = AdvicePrompt {
                    workflow_name: run.workflow_name.clone(),
                    failed_job: correlation.job.clone(),
                    error_line: correlation.line_text.clone(),
                    location: correlation
                        .line
                        .map(|l| format!("Line {}", l))
                        .unwrap_or_else(|| "Unknown line".to_string()),
                    failure_reason: reason.text.clone(),
                };
                suggestions_or_fallback(advisor.as_ref(), &prompt).await
            }
            None => Vec::new(),
        };

        let insight = RunInsight {
            run_id: run.run_id.clone(),
            workflow_name: run.workflow_name.clone(),
            reason: reason.text,
            category,
            correlated_line: correlation.line,
            correlated_line_text: correlation.line_text,
            correlated_job: correlation.job,
            suggestions,
        };

        let mut record = AnalysisRecord::new(
            WORKFLOW_FAILURE_ANALYSIS,
            serde_json::to_value(&insight)?,
        );
        record.failure_id = Some(run.run_id.clone());
        record.workflow_name = Some(run.workflow_name.clone());
        record.failure_reason = run.failure_reason.clone();
        self.pool.append_analysis_result(&record).await?;

        Ok(Some(insight))
    }

    async fn correlate_run(&self, run: &Run, reason: &str) -> Correlation {
        let Some(path) = run.definition_path.as_deref() else {
            return Correlation::unavailable();
        };
        let git_ref = (!run.commit_sha.is_empty()).then_some(run.commit_sha.as_str());

        match self.source.definition_text(path, git_ref).await {
            Ok(text) if !text.trim().is_empty() => correlate(&text, reason),
            Ok(_) => Correlation::unavailable(),
            Err(e) => {
                warn!("Failed to fetch definition {} for run {}: {}", path, run.run_id, e);
                Correlation::unavailable()
            }
        }
    }

    /// Upsert one error pattern per distinct failure reason.
    ///
    /// Frequency is the larger of the stored value and the number of stored
    /// failed runs with that reason. Returns the number of patterns written.
    pub async fn aggregate_patterns(&self, insights: &[RunInsight]) -> AppResult<usize> {
        let reasons = insights.iter().map(|i| i.reason.as_str());
        let mut updated = 0;

        for (category, reasons) in group_by_category(reasons) {
            let mut seen: Vec<&str> = Vec::new();
            for reason in reasons {
                if seen.contains(&reason) {
                    continue;
                }
                seen.push(reason);

                let stored = self.pool.count_failed_runs_with_reason(reason).await?;
                let existing = self
                    .pool
                    .get_error_pattern(reason)
                    .await?
                    .map(|p| p.frequency)
                    .unwrap_or(0);

                let pattern = ErrorPattern {
                    pattern: reason.to_string(),
                    error_type: category,
                    frequency: existing.max(stored),
                    last_seen: Utc::now(),
                    suggested_fix: category.default_fix().to_string(),
                };

                match self.pool.upsert_error_pattern(&pattern).await {
                    Ok(()) => updated += 1,
                    Err(AppError::Validation(msg)) => warn!("Pattern not updated: {}", msg),
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(updated)
    }
}

/// Run a batch every `interval_secs`, looking back `lookback_days` each time.
pub fn start_collection_task(
    pipeline: Arc<Pipeline>,
    interval_secs: u64,
    lookback_days: i64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting collection service (interval: {} seconds, lookback: {} days)",
            interval_secs, lookback_days
        );

        let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

        loop {
            ticker.tick().await;

            let since = Utc::now() - chrono::Duration::days(lookback_days);
            match pipeline.run_batch(Some(since)).await {
                Ok(summary) => debug!("Collection cycle stored {} runs", summary.runs_stored),
                Err(e) => error!("Collection task error: {}", e),
            }
        }
    })
}
