//! Insight store: connection management, migrations, and queries.
//!
//! Every table gets its own file with an `impl DbPool` block.

pub mod analysis_results;
pub mod error_patterns;
pub mod locks;
pub mod metadata;
pub mod runs;
pub mod test_results;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

pub use locks::KeyedLocks;

/// Explicit store handle shared by the pipeline, the CLI and the read API.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
    /// Linearizes writes that share a run_id.
    run_locks: KeyedLocks,
    /// Linearizes writes that share a pattern.
    pattern_locks: KeyedLocks,
    /// Set once the analysis_results layout has been checked this process.
    analysis_schema_verified: Arc<Mutex<bool>>,
}

impl DbPool {
    /// Create a new database pool from configuration.
    pub async fn new(config: &Config) -> AppResult<Self> {
        Self::connect(&config.database_url).await
    }

    /// Connect to a database URL (`postgres://…` or `sqlite://…`).
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options
            .max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(DbPool {
            conn,
            run_locks: KeyedLocks::default(),
            pattern_locks: KeyedLocks::default(),
            analysis_schema_verified: Arc::new(Mutex::new(false)),
        })
    }

    /// Apply pending migrations, then check the analysis_results layout.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))?;
        info!("Database migrations complete");

        self.ensure_analysis_schema().await?;
        Ok(())
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}
