//! Create error_patterns table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ErrorPattern::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ErrorPattern::Pattern)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ErrorPattern::ErrorType).string().not_null())
                    .col(
                        ColumnDef::new(ErrorPattern::Frequency)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ErrorPattern::LastSeen)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ErrorPattern::SuggestedFix).text().not_null())
                    .col(
                        ColumnDef::new(ErrorPattern::CreatedAt)
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
                    .name("idx_error_patterns_frequency")
                    .table(ErrorPattern::Table)
                    .col(ErrorPattern::Frequency)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ErrorPattern::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ErrorPattern {
    #[sea_orm(iden = "error_patterns")]
    Table,
    Pattern,
    ErrorType,
    Frequency,
    LastSeen,
    SuggestedFix,
    CreatedAt,
}
