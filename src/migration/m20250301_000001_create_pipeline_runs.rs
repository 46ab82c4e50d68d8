//! Create pipeline_runs table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PipelineRun::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PipelineRun::RunId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PipelineRun::WorkflowName).string().not_null())
                    .col(ColumnDef::new(PipelineRun::Status).string().not_null())
                    .col(ColumnDef::new(PipelineRun::Conclusion).string())
                    .col(
                        ColumnDef::new(PipelineRun::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PipelineRun::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PipelineRun::DurationSeconds)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PipelineRun::Repository).string().not_null())
                    .col(ColumnDef::new(PipelineRun::Branch).string().not_null())
                    .col(ColumnDef::new(PipelineRun::CommitSha).string().not_null())
                    .col(ColumnDef::new(PipelineRun::DefinitionPath).string())
                    .col(ColumnDef::new(PipelineRun::FailureReason).text())
                    .col(
                        ColumnDef::new(PipelineRun::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PipelineRun::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pipeline_runs_conclusion_started")
                    .table(PipelineRun::Table)
                    .col(PipelineRun::Conclusion)
                    .col(PipelineRun::StartedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PipelineRun::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PipelineRun {
    #[sea_orm(iden = "pipeline_runs")]
    Table,
    RunId,
    WorkflowName,
    Status,
    Conclusion,
    StartedAt,
    CompletedAt,
    DurationSeconds,
    Repository,
    Branch,
    CommitSha,
    DefinitionPath,
    FailureReason,
    CreatedAt,
    UpdatedAt,
}
