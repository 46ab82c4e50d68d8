//! Database queries for test results.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect,
    Set,
};

use crate::entity::pipeline_run::{self, Entity as PipelineRun};
use crate::entity::test_result::{self, ActiveModel, Entity as TestResult};
use crate::error::{AppError, AppResult};
use crate::models::{FailedTest, NewTestResult, TestStatus};

use super::DbPool;

impl DbPool {
    /// Append one test execution. Never deduplicates.
    pub async fn append_test_result(&self, result: &NewTestResult) -> AppResult<i64> {
        result.validate()?;

        let retry_count = i32::try_from(result.retry_count).map_err(|_| {
            AppError::Validation(format!(
                "test {} has retry_count {} out of range",
                result.test_name, result.retry_count
            ))
        })?;

        let model = ActiveModel {
            id: NotSet,
            run_id: Set(result.run_id.clone()),
            test_name: Set(result.test_name.clone()),
            status: Set(result.status.as_str().to_string()),
            duration_seconds: Set(result.duration_seconds),
            failure_message: Set(result.failure_message.clone()),
            error_type: Set(result.error_type.clone()),
            stack_trace: Set(result.stack_trace.clone()),
            retry_count: Set(retry_count),
            created_at: Set(Utc::now()),
        };

        let inserted = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert test result: {}", e)))?;

        Ok(inserted.id)
    }

    /// Failed tests joined with their run's workflow name, newest first.
    /// Results whose run is not stored are left out.
    pub async fn failed_tests_with_workflow(&self, limit: u64) -> AppResult<Vec<FailedTest>> {
        let rows = TestResult::find()
            .find_also_related(PipelineRun)
            .filter(test_result::Column::Status.eq(TestStatus::Failed.as_str()))
            .filter(pipeline_run::Column::RunId.is_not_null())
            .order_by_desc(test_result::Column::CreatedAt)
            .order_by_desc(test_result::Column::Id)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list failed tests: {}", e)))?;

        Ok(rows
            .into_iter()
            .filter_map(|(test, run)| {
                run.map(|run| FailedTest {
                    id: test.id,
                    run_id: test.run_id,
                    workflow_name: run.workflow_name,
                    test_name: test.test_name,
                    duration_seconds: test.duration_seconds,
                    failure_message: test.failure_message,
                    error_type: test.error_type,
                    stack_trace: test.stack_trace,
                    retry_count: test.retry_count,
                    created_at: test.created_at,
                })
            })
            .collect())
    }

    /// All stored results of one run in insertion order.
    pub async fn test_results_for_run(&self, run_id: &str) -> AppResult<Vec<test_result::Model>> {
        TestResult::find()
            .filter(test_result::Column::RunId.eq(run_id))
            .order_by_asc(test_result::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list test results: {}", e)))
    }
}
