// ABOUTME: Operator CLI for the tenant data plane
// ABOUTME: Resolve a tenant, list its migration ledger, or seal a DSN for the control plane
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tenant data-plane CLI
//!
//! ```bash
//! # Resolve a tenant (runs pending migrations when auto-migration is on)
//! tenant-dataplane resolve --tenant acme
//!
//! # Show which migrations the tenant database has recorded
//! tenant-dataplane ledger --tenant 5f1c9a52-3c1e-4c55-9a55-0e7b7f3b1d10 --json
//!
//! # Seal a DSN before inserting it into tenant_credentials
//! echo "postgres://app:secret@db/acme" | tenant-dataplane seal
//! ```
//!
//! Configuration comes from the environment; `seal` only needs
//! `TENANT_DSN_ENCRYPTION_KEY`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tenant_dataplane::config::{DataPlaneConfig, LoggingConfig};
use tenant_dataplane::constants::env_vars;
use tenant_dataplane::context::DataPlane;
use tenant_dataplane::database_plugins::DataPlaneProvider;
use tenant_dataplane::logging::init_logging;
use tenant_dataplane::models::TenantIdentity;
use tenant_dataplane::security::{EncryptionKey, SecretCipher};
use tenant_dataplane::tenant::{AuthenticatedPrincipal, TenantContext, TenantRole};
use tokio::io::{stdin, AsyncReadExt};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "tenant-dataplane",
    about = "Tenant data-plane operator tool",
    long_about = "Resolve tenant databases, inspect their migration ledger and seal connection strings"
)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a tenant and report the backend it lives on
    Resolve {
        /// Tenant id (UUID) or slug
        #[arg(long)]
        tenant: String,
    },
    /// Resolve a tenant and print its applied migrations
    Ledger {
        /// Tenant id (UUID) or slug
        #[arg(long)]
        tenant: String,
    },
    /// Read a DSN from stdin and print it sealed as iv.ciphertext.tag
    Seal,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Seal => seal().await,
        Command::Resolve { tenant } => {
            let (data_plane, context) = open_tenant(&tenant).await?;
            finish(&data_plane, print_resolution(&context, cli.json)).await
        }
        Command::Ledger { tenant } => {
            let (data_plane, context) = open_tenant(&tenant).await?;
            finish(&data_plane, print_ledger(&context, cli.json).await).await
        }
    }
}

/// Close every pool, then hand back the command's result
async fn finish<T>(data_plane: &DataPlane, result: Result<T>) -> Result<T> {
    data_plane.shutdown().await;
    result
}

fn print_resolution(context: &TenantContext, as_json: bool) -> Result<()> {
    if as_json {
        let output = json!({
            "tenant": context.tenant,
            "backend": context.handle.backend_info(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{} ({}) -> {}",
            context.tenant.slug,
            context.tenant.id,
            context.handle.backend_info()
        );
    }
    Ok(())
}

async fn print_ledger(context: &TenantContext, as_json: bool) -> Result<()> {
    let rows = context
        .handle
        .applied_migrations()
        .await
        .context("failed to read migration ledger")?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{}  {}", row.applied_at.to_rfc3339(), row.name);
        }
    }
    info!(tenant = %context.tenant.slug, count = rows.len(), "Listed migration ledger");
    Ok(())
}

async fn open_tenant(tenant: &str) -> Result<(DataPlane, TenantContext)> {
    let config = DataPlaneConfig::from_env().context("invalid configuration")?;
    init_logging(&config.logging)?;

    let data_plane = DataPlane::connect(&config)
        .await
        .context("failed to open control plane")?;

    // operator access acts as the tenant owner
    let principal = AuthenticatedPrincipal::new(
        TenantIdentity::parse_lenient(tenant),
        Uuid::nil(),
        TenantRole::Owner,
    );
    let context = match data_plane.resolve(&principal).await {
        Ok(context) => context,
        Err(e) => {
            data_plane.shutdown().await;
            return Err(e).with_context(|| format!("failed to resolve tenant '{tenant}'"));
        }
    };

    Ok((data_plane, context))
}

async fn seal() -> Result<()> {
    init_logging(&LoggingConfig::default())?;

    let raw_key = std::env::var(env_vars::ENCRYPTION_KEY)
        .with_context(|| format!("{} is not set", env_vars::ENCRYPTION_KEY))?;
    let key = EncryptionKey::parse(&raw_key)?;

    let mut input = String::new();
    stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read DSN from stdin")?;
    let dsn = input.trim();
    anyhow::ensure!(!dsn.is_empty(), "no DSN on stdin");

    println!("{}", SecretCipher::encrypt(&key, dsn)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tenant_dataplane::errors::{AppError, AppResult};
    use tenant_dataplane::models::{EncryptedCredential, TenantId, TenantRecord};
    use tenant_dataplane::security::SecretDsn;
    use tenant_dataplane::tenant::TenantRegistry;

    struct EmptyRegistry;

    #[async_trait]
    impl TenantRegistry for EmptyRegistry {
        async fn fetch_tenant(&self, _identity: &TenantIdentity) -> AppResult<TenantRecord> {
            Err(AppError::not_found("Tenant"))
        }

        async fn fetch(&self, _tenant_id: TenantId) -> AppResult<EncryptedCredential> {
            Err(AppError::not_found("Tenant credential"))
        }
    }

    #[tokio::test]
    async fn test_failed_ledger_listing_still_closes_pools() {
        let dir = tempfile::TempDir::new().unwrap();
        let key = EncryptionKey::parse(&"11".repeat(32)).unwrap();
        let control_plane = SecretDsn::new("sqlite::memory:");
        let config = DataPlaneConfig::new(key, control_plane, dir.path());
        let data_plane = DataPlane::new(&config, Arc::new(EmptyRegistry));

        // fresh database without a ledger table
        let dsn = SecretDsn::new(format!("sqlite:{}", dir.path().join("acme.db").display()));
        let handle = data_plane.cache().get(&dsn).await.unwrap();
        let context = TenantContext {
            tenant: TenantRecord {
                id: TenantId::new(),
                slug: "acme".into(),
                name: "Acme".into(),
            },
            principal_id: Uuid::nil(),
            role: TenantRole::Owner,
            handle: Arc::clone(&handle),
        };

        let result = finish(&data_plane, print_ledger(&context, false).await).await;

        assert!(result.is_err());
        assert!(data_plane.cache().is_empty());
        assert!(handle.ping().await.is_err());
    }
}
