// ABOUTME: PostgreSQL tenant database handle for production deployments
// ABOUTME: Pooled connection with retrying connect and a transactional schema_migrations ledger
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! `PostgreSQL` tenant database implementation
//!
//! Same contract as the `SQLite` handle; the ledger uses `TIMESTAMPTZ`.

use super::DataPlaneProvider;
use crate::config::PoolConfig;
use crate::errors::{AppError, AppResult};
use crate::security::SecretDsn;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dataplane_core::models::{MigrationFile, MigrationLedgerRow, MigrationOutcome};
use sqlx::postgres::{PgConnection, PgPoolOptions, PgRow};
use sqlx::{Executor, Pool, Postgres, Row};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const CREATE_LEDGER: &str = r"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        name TEXT PRIMARY KEY,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
";

/// Pooled `PostgreSQL` tenant database
#[derive(Debug, Clone)]
pub struct PostgresDataPlane {
    pool: Pool<Postgres>,
}

impl PostgresDataPlane {
    /// Open a pool for a `postgres://` DSN
    ///
    /// # Errors
    ///
    /// Returns `Database` once all connection attempts are exhausted
    pub async fn connect(dsn: &SecretDsn, pool_config: &PoolConfig) -> AppResult<Self> {
        let pool = Self::connect_with_retry(dsn, pool_config).await?;
        debug!(fingerprint = %dsn.fingerprint(), "Opened PostgreSQL tenant pool");
        Ok(Self { pool })
    }

    /// Connect with exponential backoff on transient failures
    async fn connect_with_retry(
        dsn: &SecretDsn,
        pool_config: &PoolConfig,
    ) -> AppResult<Pool<Postgres>> {
        let pool_options = PgPoolOptions::new()
            .max_connections(pool_config.max_connections)
            .min_connections(pool_config.min_connections)
            .acquire_timeout(pool_config.acquire_timeout())
            .idle_timeout(Some(Duration::from_secs(300)))
            .max_lifetime(Some(Duration::from_secs(600)))
            .test_before_acquire(true);

        let max_retries = pool_config.connection_retries;
        let mut delay_ms = pool_config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match pool_options.clone().connect(dsn.expose()).await {
                Ok(pool) => {
                    if attempt > 0 {
                        info!(
                            fingerprint = %dsn.fingerprint(),
                            "PostgreSQL connection established after {} retries", attempt
                        );
                    }
                    return Ok(pool);
                }
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            fingerprint = %dsn.fingerprint(),
                            "PostgreSQL connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms,
                            e.as_database_error()
                                .map_or("connection error", |de| de.message())
                        );
                        sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(pool_config.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::database(format!(
            "Failed to connect to tenant database {} after {} attempts: {}",
            dsn.fingerprint(),
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }

    /// Underlying pool for tenant queries
    #[must_use]
    pub const fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    fn parse_ledger_row(row: &PgRow) -> AppResult<MigrationLedgerRow> {
        Ok(MigrationLedgerRow {
            name: row
                .try_get("name")
                .map_err(|e| AppError::database(format!("Failed to get name: {e}")))?,
            applied_at: row
                .try_get::<DateTime<Utc>, _>("applied_at")
                .map_err(|e| AppError::database(format!("Failed to get applied_at: {e}")))?,
        })
    }
}

#[async_trait]
impl DataPlaneProvider for PostgresDataPlane {
    fn backend_info(&self) -> &'static str {
        "PostgreSQL"
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
        rows.iter().map(Self::parse_ledger_row).collect()
    }

    async fn apply_migration(&self, file: &MigrationFile) -> AppResult<MigrationOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            let cause = format!("failed to begin transaction: {e}");
            AppError::migration_apply_failed(&file.name, cause)
        })?;

        let recorded: Option<String> =
            sqlx::query_scalar("SELECT name FROM schema_migrations WHERE name = $1")
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

        sqlx::query(
            "INSERT INTO schema_migrations (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        )
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
    conn: &mut PgConnection,
    file: &MigrationFile,
) -> AppResult<()> {
    conn.execute(sqlx::raw_sql(&file.sql))
        .await
        .map_err(|e| AppError::migration_apply_failed(&file.name, e.to_string()))?;
    Ok(())
}
