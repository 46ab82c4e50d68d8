//! Analysis result entity. The layout is versioned through `store_metadata`.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "analysis_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub analysis_type: String,
    pub failure_id: Option<String>,
    /// Serialized JSON; shape depends on `analysis_type`
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub timestamp: DateTimeUtc,
    pub workflow_name: Option<String>,
    pub failure_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
