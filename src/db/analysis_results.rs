//! Database queries for analysis results.
//!
//! The table layout is tracked in `store_metadata` under
//! [`KEY_ANALYSIS_LAYOUT`]. When the recorded version differs from
//! [`LAYOUT_VERSION`] the table is dropped and recreated, discarding its rows.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use sea_orm_migration::SchemaManager;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::entity::analysis_result::{self, ActiveModel, Column, Entity as AnalysisResult};
use crate::error::{AppError, AppResult};
use crate::migration::analysis_results::{
    LAYOUT_VERSION, create_statement, drop_statement, type_index_statement,
};
use crate::models::{AnalysisRecord, StoredAnalysis};

use super::DbPool;

/// Metadata key holding the analysis_results layout version.
pub const KEY_ANALYSIS_LAYOUT: &str = "analysis_results_layout";

const TABLE_NAME: &str = "analysis_results";

impl DbPool {
    /// Check the analysis_results layout once per process.
    ///
    /// Returns `true` when an existing table was dropped and recreated.
    pub async fn ensure_analysis_schema(&self) -> AppResult<bool> {
        let mut verified = self.analysis_schema_verified.lock().await;
        if *verified {
            return Ok(false);
        }

        let rebuilt = self.sync_analysis_schema().await?;
        *verified = true;
        Ok(rebuilt)
    }

    async fn sync_analysis_schema(&self) -> AppResult<bool> {
        let manager = SchemaManager::new(self.connection());

        let exists = manager
            .has_table(TABLE_NAME)
            .await
            .map_err(|e| AppError::Database(format!("Failed to inspect {}: {}", TABLE_NAME, e)))?;
        let stored = self.get_metadata(KEY_ANALYSIS_LAYOUT).await?;

        if exists && stored.as_deref() == Some(LAYOUT_VERSION) {
            return Ok(false);
        }

        if exists {
            warn!(
                "{} layout {} does not match {}; dropping and recreating the table, existing analysis rows are lost",
                TABLE_NAME,
                stored.as_deref().unwrap_or("(unversioned)"),
                LAYOUT_VERSION
            );
            manager
                .drop_table(drop_statement())
                .await
                .map_err(|e| AppError::Database(format!("Failed to drop {}: {}", TABLE_NAME, e)))?;
        }

        manager
            .create_table(create_statement())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create {}: {}", TABLE_NAME, e)))?;
        manager
            .create_index(type_index_statement())
            .await
            .map_err(|e| AppError::Database(format!("Failed to index {}: {}", TABLE_NAME, e)))?;
        self.set_metadata(KEY_ANALYSIS_LAYOUT, LAYOUT_VERSION).await?;

        if !exists {
            info!("Created {} (layout {})", TABLE_NAME, LAYOUT_VERSION);
        }
        Ok(exists)
    }

    /// Append an analysis artifact. Insert-only; the payload is stored as
    /// serialized JSON without interpretation.
    ///
    /// A failed insert triggers one fresh layout check and one retry. Failing
    /// again is reported as [`AppError::SchemaMismatch`].
    pub async fn append_analysis_result(&self, record: &AnalysisRecord) -> AppResult<i64> {
        if record.analysis_type.trim().is_empty() {
            return Err(AppError::Validation(
                "analysis_type must not be empty".to_string(),
            ));
        }
        let payload = serde_json::to_string(&record.payload)?;

        self.ensure_analysis_schema().await?;
        let first_error = match self.insert_analysis(record, &payload).await {
            Ok(id) => return Ok(id),
            Err(e) => e,
        };

        warn!(
            "Insert into {} failed ({}); re-checking layout and retrying once",
            TABLE_NAME, first_error
        );
        *self.analysis_schema_verified.lock().await = false;
        self.ensure_analysis_schema().await?;

        self.insert_analysis(record, &payload).await.map_err(|e| {
            AppError::SchemaMismatch(format!("{} insert failed after retry: {}", TABLE_NAME, e))
        })
    }

    async fn insert_analysis(&self, record: &AnalysisRecord, payload: &str) -> Result<i64, sea_orm::DbErr> {
        let model = ActiveModel {
            id: NotSet,
            analysis_type: Set(record.analysis_type.clone()),
            failure_id: Set(record.failure_id.clone()),
            payload: Set(payload.to_string()),
            timestamp: Set(record.timestamp),
            workflow_name: Set(record.workflow_name.clone()),
            failure_reason: Set(record.failure_reason.clone()),
        };

        model.insert(self.connection()).await.map(|m| m.id)
    }

    /// Stored artifacts of one type, newest first.
    pub async fn analysis_results_by_type(
        &self,
        analysis_type: &str,
        limit: u64,
    ) -> AppResult<Vec<StoredAnalysis>> {
        self.ensure_analysis_schema().await?;

        let results = AnalysisResult::find()
            .filter(Column::AnalysisType.eq(analysis_type))
            .order_by_desc(Column::Timestamp)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list analysis results: {}", e)))?;

        Ok(results.into_iter().map(model_to_stored).collect())
    }
}

fn model_to_stored(m: analysis_result::Model) -> StoredAnalysis {
    let payload = serde_json::from_str(&m.payload).unwrap_or(JsonValue::String(m.payload));
    StoredAnalysis {
        id: m.id,
        analysis_type: m.analysis_type,
        failure_id: m.failure_id,
        workflow_name: m.workflow_name,
        failure_reason: m.failure_reason,
        timestamp: m.timestamp,
        payload,
    }
}
