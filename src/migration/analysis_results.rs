//! Table definition for analysis_results.
//!
//! Bump [`LAYOUT_VERSION`] whenever the column set changes; the store drops and
//! recreates the table when the recorded version differs.

use sea_orm_migration::prelude::*;

/// Current column layout of `analysis_results`.
pub const LAYOUT_VERSION: &str = "2";

#[derive(DeriveIden)]
pub enum AnalysisResult {
    #[sea_orm(iden = "analysis_results")]
    Table,
    Id,
    AnalysisType,
    FailureId,
    Payload,
    Timestamp,
    WorkflowName,
    FailureReason,
}

pub fn create_statement() -> TableCreateStatement {
    Table::create()
        .table(AnalysisResult::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AnalysisResult::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(AnalysisResult::AnalysisType)
                .string()
                .not_null(),
        )
        .col(ColumnDef::new(AnalysisResult::FailureId).string())
        .col(ColumnDef::new(AnalysisResult::Payload).text().not_null())
        .col(
            ColumnDef::new(AnalysisResult::Timestamp)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(ColumnDef::new(AnalysisResult::WorkflowName).string())
        .col(ColumnDef::new(AnalysisResult::FailureReason).text())
        .to_owned()
}

pub fn drop_statement() -> TableDropStatement {
    Table::drop()
        .table(AnalysisResult::Table)
        .if_exists()
        .to_owned()
}

pub fn type_index_statement() -> IndexCreateStatement {
    Index::create()
        .name("idx_analysis_results_type_timestamp")
        .table(AnalysisResult::Table)
        .col(AnalysisResult::AnalysisType)
        .col(AnalysisResult::Timestamp)
        .if_not_exists()
        .to_owned()
}
