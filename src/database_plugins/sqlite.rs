// ABOUTME: SQLite tenant database handle for local development and tests
// ABOUTME: Pooled connection with a transactional schema_migrations ledger
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::DataPlaneProvider;
use crate::config::PoolConfig;
use crate::errors::{AppError, AppResult};
use crate::security::SecretDsn;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dataplane_core::models::{MigrationFile, MigrationLedgerRow, MigrationOutcome};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Row};
use std::str::FromStr;
use tracing::debug;

// SQLite has no TIMESTAMPTZ; store RFC 3339 text so rows decode without guessing
const CREATE_LEDGER: &str = r"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        name TEXT PRIMARY KEY,
        applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
";

/// Pooled `SQLite` tenant database
#[derive(Debug, Clone)]
pub struct SqliteDataPlane {
    pool: SqlitePool,
}

impl SqliteDataPlane {
    /// Open a pool for a `sqlite:` DSN, creating the file if needed
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unparseable DSN and `Database` if the pool
    /// cannot be established
    pub async fn connect(dsn: &SecretDsn, pool_config: &PoolConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(dsn.expose())
            .map_err(|e| AppError::config(format!("invalid SQLite connection string: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_config.max_connections)
            .min_connections(pool_config.min_connections)
            .acquire_timeout(pool_config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to connect to tenant database {}: {e}",
                    dsn.fingerprint()
                ))
            })?;

        debug!(fingerprint = %dsn.fingerprint(), "Opened SQLite tenant pool");
        Ok(Self { pool })
    }

    /// Underlying pool for tenant queries
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DataPlaneProvider for SqliteDataPlane {
    fn backend_info(&self) -> &'static str {
        "SQLite"
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Tenant database ping failed: {e}")))?;
        Ok(())
    }

    async fn ensure_ledger_table(&self) -> AppResult<()> {
        sqlx::query(CREATE_LEDGER)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::ledger_write_failed(format!("Failed to create ledger: {e}")))?;
        Ok(())
    }

    async fn applied_migrations(&self) -> AppResult<Vec<MigrationLedgerRow>> {
        let rows = sqlx::query("SELECT name, applied_at FROM schema_migrations ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to read ledger: {e}")))?;

        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get("name")
                    .map_err(|e| AppError::database(format!("Failed to get name: {e}")))?;
                let applied_at: String = row
                    .try_get("applied_at")
                    .map_err(|e| AppError::database(format!("Failed to get applied_at: {e}")))?;
                let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                    .map_err(|e| {
                        AppError::database(format!("Invalid applied_at for {name}: {e}"))
                    })?
                    .with_timezone(&Utc);
                Ok(MigrationLedgerRow { name, applied_at })
            })
            .collect()
    }

    async fn apply_migration(&self, file: &MigrationFile) -> AppResult<MigrationOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            let cause = format!("failed to begin transaction: {e}");
            AppError::migration_apply_failed(&file.name, cause)
        })?;

        let recorded: Option<String> =
            sqlx::query_scalar("SELECT name FROM schema_migrations WHERE name = ?")
                .bind(&file.name)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    let cause = format!("ledger lookup failed: {e}");
                    AppError::migration_apply_failed(&file.name, cause)
                })?;
        if recorded.is_some() {
            tx.rollback().await.map_err(|e| {
                AppError::migration_apply_failed(&file.name, format!("rollback failed: {e}"))
            })?;
            return Ok(MigrationOutcome::AlreadyApplied);
        }

        execute_migration_body(tx.as_mut(), file).await?;

        sqlx::query("INSERT INTO schema_migrations (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
            .bind(&file.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::ledger_write_failed(format!("{}: {e}", file.name)))?;

        tx.commit().await.map_err(|e| {
            AppError::migration_apply_failed(&file.name, format!("commit failed: {e}"))
        })?;

        Ok(MigrationOutcome::Applied)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// Body of one migration file, run on the caller's open transaction
async fn execute_migration_body(
    conn: &mut SqliteConnection,
    file: &MigrationFile,
) -> AppResult<()> {
    conn.execute(sqlx::raw_sql(&file.sql))
        .await
        .map_err(|e| AppError::migration_apply_failed(&file.name, e.to_string()))?;
    Ok(())
}
