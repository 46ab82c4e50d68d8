//! Database queries for pipeline runs.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entity::pipeline_run::{self, ActiveModel, Column, Entity as PipelineRun};
use crate::error::{AppError, AppResult};
use crate::models::{Conclusion, Run, RunStatus};

use super::DbPool;

impl DbPool {
    /// Insert a run or replace every field of the existing row with the same
    /// `run_id`. `created_at` of an existing row is kept.
    pub async fn upsert_run(&self, run: &Run) -> AppResult<()> {
        run.validate()?;

        let _guard = self.run_locks.lock(&run.run_id).await;
        let now = Utc::now();

        let model = ActiveModel {
            run_id: Set(run.run_id.clone()),
            workflow_name: Set(run.workflow_name.clone()),
            status: Set(run.status.as_str().to_string()),
            conclusion: Set(run.conclusion.map(|c| c.as_str().to_string())),
            started_at: Set(run.started_at),
            completed_at: Set(run.completed_at),
            duration_seconds: Set(run.duration_seconds()),
            repository: Set(run.repository.clone()),
            branch: Set(run.branch.clone()),
            commit_sha: Set(run.commit_sha.clone()),
            definition_path: Set(run.definition_path.clone()),
            failure_reason: Set(run.failure_reason.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        PipelineRun::insert(model)
            .on_conflict(
                OnConflict::column(Column::RunId)
                    .update_columns([
                        Column::WorkflowName,
                        Column::Status,
                        Column::Conclusion,
                        Column::StartedAt,
                        Column::CompletedAt,
                        Column::DurationSeconds,
                        Column::Repository,
                        Column::Branch,
                        Column::CommitSha,
                        Column::DefinitionPath,
                        Column::FailureReason,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to upsert run: {}", e)))?;

        Ok(())
    }

    /// Get a run by its provider ID.
    pub async fn get_run(&self, run_id: &str) -> AppResult<Option<Run>> {
        let result = PipelineRun::find_by_id(run_id.to_string())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run: {}", e)))?;

        result.map(model_to_run).transpose()
    }

    /// The `limit` most recently started failed runs, newest first.
    pub async fn recent_failed_runs(&self, limit: u64) -> AppResult<Vec<Run>> {
        let results = PipelineRun::find()
            .filter(Column::Conclusion.eq(Conclusion::Failure.as_str()))
            .order_by_desc(Column::StartedAt)
            .order_by_desc(Column::RunId)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list failed runs: {}", e)))?;

        results.into_iter().map(model_to_run).collect()
    }

    /// Count stored failed runs whose failure reason equals `reason`.
    pub async fn count_failed_runs_with_reason(&self, reason: &str) -> AppResult<u64> {
        PipelineRun::find()
            .filter(Column::Conclusion.eq(Conclusion::Failure.as_str()))
            .filter(Column::FailureReason.eq(reason))
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count failed runs: {}", e)))
    }
}

fn model_to_run(m: pipeline_run::Model) -> AppResult<Run> {
    let status = RunStatus::parse(&m.status).ok_or_else(|| {
        AppError::Database(format!("Run {} has unknown status '{}'", m.run_id, m.status))
    })?;
    let conclusion = match m.conclusion.as_deref() {
        Some(value) => Some(Conclusion::parse(value).ok_or_else(|| {
            AppError::Database(format!("Run {} has unknown conclusion '{}'", m.run_id, value))
        })?),
        None => None,
    };

    Ok(Run {
        run_id: m.run_id,
        workflow_name: m.workflow_name,
        status,
        conclusion,
        started_at: m.started_at,
        completed_at: m.completed_at,
        repository: m.repository,
        branch: m.branch,
        commit_sha: m.commit_sha,
        definition_path: m.definition_path,
        failure_reason: m.failure_reason,
    })
}
