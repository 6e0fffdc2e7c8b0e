// ABOUTME: Read-only lookup of tenants and their sealed DSNs in the control plane
// ABOUTME: TenantRegistry trait with a SQLite/PostgreSQL implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::validation::validate_slug;
use crate::config::PoolConfig;
use crate::database_plugins::factory::{detect_database_type, DatabaseType};
use crate::errors::{AppError, AppResult};
use crate::security::SecretDsn;
use async_trait::async_trait;
use dataplane_core::models::{EncryptedCredential, TenantId, TenantIdentity, TenantRecord};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

#[cfg(feature = "postgresql")]
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

/// Control-plane lookups needed to resolve a tenant
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Identity fields of a tenant
    ///
    /// Slugs are validated before they reach the store.
    async fn fetch_tenant(&self, identity: &TenantIdentity) -> AppResult<TenantRecord>;

    /// Sealed credential of a tenant, `NotFound` if no row exists
    async fn fetch(&self, tenant_id: TenantId) -> AppResult<EncryptedCredential>;

    /// Release control-plane connections
    async fn close(&self) {}
}

/// Connection to the control-plane store
#[derive(Debug, Clone)]
pub enum RegistryPool {
    /// `SQLite` control plane
    SQLite(SqlitePool),
    /// `PostgreSQL` control plane
    #[cfg(feature = "postgresql")]
    PostgreSQL(PgPool),
}

/// Registry backed by the `tenants` and `tenant_credentials` tables
#[derive(Debug, Clone)]
pub struct SqlTenantRegistry {
    pool: RegistryPool,
}

impl SqlTenantRegistry {
    /// Connect to an existing control-plane database
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unsupported URL and `Database` if the connection fails
    pub async fn connect(url: &SecretDsn, pool_config: &PoolConfig) -> AppResult<Self> {
        let pool = match detect_database_type(url.expose())? {
            DatabaseType::SQLite => {
                let options = SqliteConnectOptions::from_str(url.expose()).map_err(|e| {
                    AppError::config(format!("invalid control-plane connection string: {e}"))
                })?;
                let pool = SqlitePoolOptions::new()
                    .max_connections(pool_config.max_connections)
                    .acquire_timeout(pool_config.acquire_timeout())
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        AppError::database(format!("Failed to connect to control plane: {e}"))
                    })?;
                RegistryPool::SQLite(pool)
            }
            #[cfg(feature = "postgresql")]
            DatabaseType::PostgreSQL => {
                let pool = PgPoolOptions::new()
                    .max_connections(pool_config.max_connections)
                    .acquire_timeout(pool_config.acquire_timeout())
                    .connect(url.expose())
                    .await
                    .map_err(|e| {
                        AppError::database(format!("Failed to connect to control plane: {e}"))
                    })?;
                RegistryPool::PostgreSQL(pool)
            }
            #[cfg(not(feature = "postgresql"))]
            DatabaseType::PostgreSQL => {
                return Err(AppError::config(
                    "PostgreSQL control plane requires the 'postgresql' feature",
                ))
            }
        };

        info!(fingerprint = %url.fingerprint(), "Connected to control-plane registry");
        Ok(Self { pool })
    }

    /// Registry over an existing `SQLite` pool
    #[must_use]
    pub const fn from_sqlite_pool(pool: SqlitePool) -> Self {
        Self {
            pool: RegistryPool::SQLite(pool),
        }
    }

    /// Registry over an existing `PostgreSQL` pool
    #[cfg(feature = "postgresql")]
    #[must_use]
    pub const fn from_postgres_pool(pool: PgPool) -> Self {
        Self {
            pool: RegistryPool::PostgreSQL(pool),
        }
    }

    async fn tenant_by_id(&self, id: TenantId) -> AppResult<Option<TenantRecord>> {
        match &self.pool {
            RegistryPool::SQLite(pool) => {
                let row = sqlx::query("SELECT id, slug, name FROM tenants WHERE id = ?")
                    .bind(id.to_string())
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| AppError::database(format!("Tenant lookup failed: {e}")))?;
                row.as_ref().map(parse_sqlite_tenant).transpose()
            }
            #[cfg(feature = "postgresql")]
            RegistryPool::PostgreSQL(pool) => {
                let row = sqlx::query("SELECT id, slug, name FROM tenants WHERE id = $1")
                    .bind(*id.as_uuid())
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| AppError::database(format!("Tenant lookup failed: {e}")))?;
                row.as_ref().map(parse_pg_tenant).transpose()
            }
        }
    }

    async fn tenant_by_slug(&self, slug: &str) -> AppResult<Option<TenantRecord>> {
        match &self.pool {
            RegistryPool::SQLite(pool) => {
                let row = sqlx::query("SELECT id, slug, name FROM tenants WHERE slug = ?")
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| AppError::database(format!("Tenant lookup failed: {e}")))?;
                row.as_ref().map(parse_sqlite_tenant).transpose()
            }
            #[cfg(feature = "postgresql")]
            RegistryPool::PostgreSQL(pool) => {
                let row = sqlx::query("SELECT id, slug, name FROM tenants WHERE slug = $1")
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| AppError::database(format!("Tenant lookup failed: {e}")))?;
                row.as_ref().map(parse_pg_tenant).transpose()
            }
        }
    }
}

#[async_trait]
impl TenantRegistry for SqlTenantRegistry {
    async fn fetch_tenant(&self, identity: &TenantIdentity) -> AppResult<TenantRecord> {
        let tenant = match identity {
            TenantIdentity::Id(id) => self.tenant_by_id(*id).await?,
            TenantIdentity::Slug(slug) => self.tenant_by_slug(validate_slug(slug)?).await?,
        };
        tenant.ok_or_else(|| {
            debug!(identity = %identity, "Tenant not found in registry");
            AppError::not_found("Tenant")
        })
    }

    async fn fetch(&self, tenant_id: TenantId) -> AppResult<EncryptedCredential> {
        let ciphertext: Option<String> = match &self.pool {
            RegistryPool::SQLite(pool) => {
                sqlx::query_scalar::<_, String>(
                    "SELECT ciphertext FROM tenant_credentials WHERE tenant_id = ?",
                )
                    .bind(tenant_id.to_string())
                    .fetch_optional(pool)
                    .await
            }
            #[cfg(feature = "postgresql")]
            RegistryPool::PostgreSQL(pool) => {
                sqlx::query_scalar::<_, String>(
                    "SELECT ciphertext FROM tenant_credentials WHERE tenant_id = $1",
                )
                    .bind(*tenant_id.as_uuid())
                    .fetch_optional(pool)
                    .await
            }
        }
        .map_err(|e| AppError::database(format!("Credential lookup failed: {e}")))?;

        ciphertext
            .map(|ciphertext| EncryptedCredential {
                tenant_id,
                ciphertext,
            })
            .ok_or_else(|| AppError::not_found("Tenant credential"))
    }

    async fn close(&self) {
        match &self.pool {
            RegistryPool::SQLite(pool) => pool.close().await,
            #[cfg(feature = "postgresql")]
            RegistryPool::PostgreSQL(pool) => pool.close().await,
        }
    }
}

fn parse_sqlite_tenant(row: &SqliteRow) -> AppResult<TenantRecord> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    Ok(TenantRecord {
        id: id
            .parse()
            .map_err(|e| AppError::database(format!("Invalid tenant id in registry: {e}")))?,
        slug: row
            .try_get("slug")
            .map_err(|e| AppError::database(format!("Failed to get slug: {e}")))?,
        name: row
            .try_get("name")
            .map_err(|e| AppError::database(format!("Failed to get name: {e}")))?,
    })
}

#[cfg(feature = "postgresql")]
fn parse_pg_tenant(row: &PgRow) -> AppResult<TenantRecord> {
    let id: uuid::Uuid = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    Ok(TenantRecord {
        id: TenantId::from_uuid(id),
        slug: row
            .try_get("slug")
            .map_err(|e| AppError::database(format!("Failed to get slug: {e}")))?,
        name: row
            .try_get("name")
            .map_err(|e| AppError::database(format!("Failed to get name: {e}")))?,
    })
}
