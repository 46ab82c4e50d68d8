//! SeaORM database migrations.
//!
//! `analysis_results` is not migrated here. Its layout is versioned separately
//! and (re)built by the store, see [`analysis_results`].

pub use sea_orm_migration::prelude::*;

pub mod analysis_results;
mod m20250301_000001_create_pipeline_runs;
mod m20250301_000002_create_test_results;
mod m20250301_000003_create_error_patterns;
mod m20250301_000004_create_store_metadata;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_pipeline_runs::Migration),
            Box::new(m20250301_000002_create_test_results::Migration),
            Box::new(m20250301_000003_create_error_patterns::Migration),
            Box::new(m20250301_000004_create_store_metadata::Migration),
        ]
    }
}
