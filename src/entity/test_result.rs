//! Test result entity. Rows are append-only.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub run_id: String,
    pub test_name: String,
    /// passed or failed
    pub status: String,
    pub duration_seconds: f64,
    pub failure_message: Option<String>,
    pub error_type: Option<String>,
    pub stack_trace: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTimeUtc,
}

/// Logical link only; the table carries no foreign key constraint.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pipeline_run::Entity",
        from = "Column::RunId",
        to = "super::pipeline_run::Column::RunId"
    )]
    PipelineRun,
}

impl Related<super::pipeline_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PipelineRun.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
