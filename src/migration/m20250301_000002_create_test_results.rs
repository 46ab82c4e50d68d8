//! Create test_results table.
//!
//! `run_id` is indexed but not a foreign key: results may outlive their run.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TestResult::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TestResult::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TestResult::RunId).string().not_null())
                    .col(ColumnDef::new(TestResult::TestName).string().not_null())
                    .col(ColumnDef::new(TestResult::Status).string().not_null())
                    .col(
                        ColumnDef::new(TestResult::DurationSeconds)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(TestResult::FailureMessage).text())
                    .col(ColumnDef::new(TestResult::ErrorType).string())
                    .col(ColumnDef::new(TestResult::StackTrace).text())
                    .col(
                        ColumnDef::new(TestResult::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TestResult::CreatedAt)
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
                    .name("idx_test_results_run_id")
                    .table(TestResult::Table)
                    .col(TestResult::RunId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_results_status_created")
                    .table(TestResult::Table)
                    .col(TestResult::Status)
                    .col(TestResult::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestResult::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TestResult {
    #[sea_orm(iden = "test_results")]
    Table,
    Id,
    RunId,
    TestName,
    Status,
    DurationSeconds,
    FailureMessage,
    ErrorType,
    StackTrace,
    RetryCount,
    CreatedAt,
}
