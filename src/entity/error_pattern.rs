//! Error pattern entity, keyed by the pattern text.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "error_patterns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pattern: String,
    /// Category label, e.g. "Test Failures"
    pub error_type: String,
    pub frequency: i64,
    pub last_seen: DateTimeUtc,
    pub suggested_fix: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
