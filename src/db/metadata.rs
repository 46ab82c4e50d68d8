//! Store metadata (layout versions) kept in `store_metadata`.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};

use crate::entity::store_metadata::{ActiveModel, Column, Entity as StoreMetadata};
use crate::error::{AppError, AppResult};

use super::DbPool;

impl DbPool {
    /// Read a metadata value.
    pub async fn get_metadata(&self, key: &str) -> AppResult<Option<String>> {
        let result = StoreMetadata::find_by_id(key.to_string())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to read metadata {}: {}", key, e)))?;

        Ok(result.map(|m| m.value))
    }

    /// Write or overwrite a metadata value.
    pub async fn set_metadata(&self, key: &str, value: &str) -> AppResult<()> {
        let model = ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now()),
        };

        StoreMetadata::insert(model)
            .on_conflict(
                OnConflict::column(Column::Key)
                    .update_columns([Column::Value, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to write metadata {}: {}", key, e)))?;

        Ok(())
    }
}
