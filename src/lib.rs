// ABOUTME: Main library entry point for the tenant data-plane manager
// ABOUTME: Resolves authenticated tenants into migrated, pooled database handles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Tenant Data Plane
//!
//! Each tenant owns a dedicated database whose connection string is stored
//! sealed in a shared control plane. Given an already-authenticated principal,
//! this crate hands back a handle to that tenant's database, guaranteed to be
//! reachable and fully migrated.
//!
//! ## Flow
//!
//! caller → `TenantContextResolver` → `TenantRegistry` → `SecretCipher` →
//! `MigrationCoordinator` → `ConnectionCache` → `TenantContext`
//!
//! ## Components
//!
//! - **Security**: AES-256-GCM credential opening, zeroizing secret holders
//! - **Tenant**: registry lookups, slug and identifier validation, resolver
//! - **Migrations**: ledger-backed runner and per-database run de-duplication
//! - **Cache**: one pooled handle per tenant DSN for the life of the process
//! - **Database plugins**: `SQLite` and `PostgreSQL` tenant backends
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tenant_dataplane::config::DataPlaneConfig;
//! use tenant_dataplane::context::DataPlane;
//! use tenant_dataplane::errors::AppResult;
//! use tenant_dataplane::models::TenantIdentity;
//! use tenant_dataplane::tenant::{AuthenticatedPrincipal, TenantRole};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = DataPlaneConfig::from_env()?;
//!     let data_plane = DataPlane::connect(&config).await?;
//!
//!     let principal = AuthenticatedPrincipal::new(
//!         TenantIdentity::Slug("acme".into()),
//!         Uuid::new_v4(),
//!         TenantRole::Member,
//!     );
//!     let context = data_plane.resolve(&principal).await?;
//!     println!("tenant {} ready", context.tenant.slug);
//!
//!     data_plane.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Process-lifetime cache of pooled tenant handles
pub mod cache;

/// Environment-based configuration
pub mod config;

/// Environment variable names, defaults and format constants
pub mod constants;

/// Process-scoped owner of the data plane
pub mod context;

/// Tenant database backends
pub mod database_plugins;

/// Unified error handling
pub mod errors;

/// Logging setup
pub mod logging;

/// Schema migration source, runner and coordinator
pub mod migrations;

/// Credential decryption and secret handling
pub mod security;

/// Tenant boundary types, registry and resolver
pub mod tenant;

/// Shared models from the core crate
pub mod models {
    pub use dataplane_core::models::*;
}
