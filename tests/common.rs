// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Quiet logging, temporary SQLite databases, test keys and control-plane seeding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `tenant_dataplane`

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Once;
use tempfile::TempDir;
use tenant_dataplane::config::{DataPlaneConfig, PoolConfig};
use tenant_dataplane::models::{TenantId, TenantRecord};
use tenant_dataplane::security::{EncryptionKey, SecretCipher, SecretDsn};
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// 64 hex characters, decodes to bytes 0x00..=0x1f
pub const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// Initialize quiet test logging (set `TEST_LOG=DEBUG` for more)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

pub fn test_key() -> EncryptionKey {
    EncryptionKey::parse(TEST_KEY_HEX).expect("test key must parse")
}

/// DSN of a not-yet-existing SQLite file inside `dir`
pub fn sqlite_dsn(dir: &Path, name: &str) -> SecretDsn {
    SecretDsn::new(format!("sqlite:{}", dir.join(format!("{name}.db")).display()))
}

pub fn test_pool_config() -> PoolConfig {
    PoolConfig {
        max_connections: 2,
        acquire_timeout_secs: 5,
        ..PoolConfig::default()
    }
}

/// Write migration files into a fresh directory under `root`
pub fn write_migrations(root: &Path, files: &[(&str, &str)]) -> std::path::PathBuf {
    let dir = root.join("migrations");
    std::fs::create_dir_all(&dir).expect("create migrations dir");
    for (name, sql) in files {
        std::fs::write(dir.join(name), sql).expect("write migration file");
    }
    dir
}

/// Control-plane database with its schema, plus the DSN it lives at
pub struct ControlPlane {
    pub pool: SqlitePool,
    pub url: SecretDsn,
}

impl ControlPlane {
    pub async fn create(dir: &Path) -> Self {
        let url = sqlite_dsn(dir, "control_plane");
        let options = SqliteConnectOptions::from_str(url.expose())
            .expect("control-plane url")
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("open control plane");

        sqlx::raw_sql(
            r"
            CREATE TABLE tenants (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            );
            CREATE TABLE tenant_credentials (
                tenant_id TEXT PRIMARY KEY REFERENCES tenants(id),
                ciphertext TEXT NOT NULL
            );
            ",
        )
        .execute(&pool)
        .await
        .expect("create control-plane schema");

        Self { pool, url }
    }

    /// Insert a tenant without a credential row
    pub async fn insert_tenant(&self, slug: &str) -> TenantRecord {
        let record = TenantRecord {
            id: TenantId::from_uuid(Uuid::new_v4()),
            slug: slug.to_owned(),
            name: format!("Tenant {slug}"),
        };
        sqlx::query("INSERT INTO tenants (id, slug, name) VALUES (?, ?, ?)")
            .bind(record.id.to_string())
            .bind(&record.slug)
            .bind(&record.name)
            .execute(&self.pool)
            .await
            .expect("insert tenant");
        record
    }

    /// Store a raw ciphertext for `tenant`
    pub async fn insert_ciphertext(&self, tenant: &TenantRecord, ciphertext: &str) {
        sqlx::query("INSERT INTO tenant_credentials (tenant_id, ciphertext) VALUES (?, ?)")
            .bind(tenant.id.to_string())
            .bind(ciphertext)
            .execute(&self.pool)
            .await
            .expect("insert credential");
    }

    /// Insert a tenant whose credential seals `dsn` under the test key
    pub async fn provision(&self, slug: &str, dsn: &SecretDsn) -> TenantRecord {
        let tenant = self.insert_tenant(slug).await;
        let sealed = SecretCipher::encrypt(&test_key(), dsn.expose()).expect("seal dsn");
        self.insert_ciphertext(&tenant, &sealed).await;
        tenant
    }
}

/// Data-plane config over a temp control plane and migrations directory
pub fn test_config(control_plane: &ControlPlane, migrations_dir: &Path) -> DataPlaneConfig {
    DataPlaneConfig::new(test_key(), control_plane.url.clone(), migrations_dir)
        .with_pool(test_pool_config())
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}
