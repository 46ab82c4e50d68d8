//! Create store_metadata table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StoreMetadata::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoreMetadata::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StoreMetadata::Value).string().not_null())
                    .col(
                        ColumnDef::new(StoreMetadata::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoreMetadata::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StoreMetadata {
    #[sea_orm(iden = "store_metadata")]
    Table,
    Key,
    Value,
    UpdatedAt,
}
