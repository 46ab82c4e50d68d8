//! Database queries for error patterns.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, QueryOrder, Set};

use crate::entity::error_pattern::{self, ActiveModel, Column, Entity as ErrorPatternEntity};
use crate::error::{AppError, AppResult};
use crate::models::{Category, ErrorPattern};

use super::DbPool;

impl DbPool {
    /// Insert a pattern or replace the whole row with the same `pattern` key.
    ///
    /// Frequency is taken from the caller as-is, but a value lower than the
    /// stored one is rejected.
    pub async fn upsert_error_pattern(&self, pattern: &ErrorPattern) -> AppResult<()> {
        if pattern.pattern.trim().is_empty() {
            return Err(AppError::Validation("pattern must not be empty".to_string()));
        }
        let frequency = i64::try_from(pattern.frequency).map_err(|_| {
            AppError::Validation(format!("pattern frequency {} out of range", pattern.frequency))
        })?;

        let _guard = self.pattern_locks.lock(&pattern.pattern).await;

        if let Some(existing) = self.get_error_pattern(&pattern.pattern).await?
            && existing.frequency > pattern.frequency
        {
            return Err(AppError::Validation(format!(
                "pattern '{}' frequency would decrease from {} to {}",
                pattern.pattern, existing.frequency, pattern.frequency
            )));
        }

        let model = ActiveModel {
            pattern: Set(pattern.pattern.clone()),
            error_type: Set(pattern.error_type.as_str().to_string()),
            frequency: Set(frequency),
            last_seen: Set(pattern.last_seen),
            suggested_fix: Set(pattern.suggested_fix.clone()),
            created_at: Set(Utc::now()),
        };

        ErrorPatternEntity::insert(model)
            .on_conflict(
                OnConflict::column(Column::Pattern)
                    .update_columns([
                        Column::ErrorType,
                        Column::Frequency,
                        Column::LastSeen,
                        Column::SuggestedFix,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to upsert error pattern: {}", e)))?;

        Ok(())
    }

    /// Get a pattern by its key.
    pub async fn get_error_pattern(&self, pattern: &str) -> AppResult<Option<ErrorPattern>> {
        let result = ErrorPatternEntity::find_by_id(pattern.to_string())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get error pattern: {}", e)))?;

        Ok(result.map(model_to_pattern))
    }

    /// All patterns, most frequent first.
    pub async fn patterns_by_frequency(&self) -> AppResult<Vec<ErrorPattern>> {
        let results = ErrorPatternEntity::find()
            .order_by_desc(Column::Frequency)
            .order_by_asc(Column::Pattern)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list error patterns: {}", e)))?;

        Ok(results.into_iter().map(model_to_pattern).collect())
    }
}

/// Rows written by external tooling may carry labels outside the taxonomy.
fn model_to_pattern(m: error_pattern::Model) -> ErrorPattern {
    ErrorPattern {
        error_type: Category::parse(&m.error_type).unwrap_or(Category::OtherIssues),
        frequency: u64::try_from(m.frequency).unwrap_or(0),
        pattern: m.pattern,
        last_seen: m.last_seen,
        suggested_fix: m.suggested_fix,
    }
}
