// ABOUTME: Process-scoped owner of the tenant data plane
// ABOUTME: Wires key, registry, connection cache, migration coordinator and resolver once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data plane
//!
//! Build one [`DataPlane`] at startup, share it behind an `Arc`, and call
//! [`DataPlane::shutdown`] once on exit. Every pooled tenant handle stays open
//! until then.

use crate::cache::ConnectionCache;
use crate::config::DataPlaneConfig;
use crate::errors::AppResult;
use crate::migrations::{
    MigrationCoordinator, MigrationRunner, MigrationSource, PooledMigrationExecutor,
};
use crate::tenant::{
    AuthenticatedPrincipal, SqlTenantRegistry, TenantContext, TenantContextResolver,
    TenantRegistry,
};
use std::sync::Arc;
use tracing::info;

/// Owns every long-lived data-plane component
pub struct DataPlane {
    registry: Arc<dyn TenantRegistry>,
    cache: Arc<ConnectionCache>,
    coordinator: Arc<MigrationCoordinator>,
    resolver: TenantContextResolver,
}

impl DataPlane {
    /// Wire the data plane around an existing registry
    #[must_use]
    pub fn new(config: &DataPlaneConfig, registry: Arc<dyn TenantRegistry>) -> Self {
        let cache = Arc::new(ConnectionCache::new(config.pool.clone()));
        let runner = MigrationRunner::new(MigrationSource::directory(&config.migrations_dir));
        let executor = Arc::new(PooledMigrationExecutor::new(Arc::clone(&cache), runner));
        let coordinator = Arc::new(MigrationCoordinator::new(executor, config.auto_migrate));
        let resolver = TenantContextResolver::new(
            config.encryption_key.clone(),
            Arc::clone(&registry),
            Arc::clone(&coordinator),
            Arc::clone(&cache),
        );

        info!(
            auto_migrate = config.auto_migrate,
            migrations_dir = %config.migrations_dir.display(),
            "Tenant data plane initialized"
        );

        Self {
            registry,
            cache,
            coordinator,
            resolver,
        }
    }

    /// Open the SQL control-plane registry and wire the data plane around it
    ///
    /// # Errors
    ///
    /// Returns an error if the control-plane database cannot be reached
    pub async fn connect(config: &DataPlaneConfig) -> AppResult<Self> {
        let registry = SqlTenantRegistry::connect(&config.control_plane_url, &config.pool).await?;
        Ok(Self::new(config, Arc::new(registry)))
    }

    /// Resolve a principal into a ready-to-query context
    ///
    /// # Errors
    ///
    /// See [`TenantContextResolver::resolve`]
    pub async fn resolve(&self, principal: &AuthenticatedPrincipal) -> AppResult<TenantContext> {
        self.resolver.resolve(principal).await
    }

    /// The resolver
    #[must_use]
    pub const fn resolver(&self) -> &TenantContextResolver {
        &self.resolver
    }

    /// Shared connection cache
    #[must_use]
    pub const fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }

    /// Shared migration coordinator
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<MigrationCoordinator> {
        &self.coordinator
    }

    /// Close every tenant pool and the registry
    pub async fn shutdown(&self) {
        self.cache.close_all().await;
        self.registry.close().await;
        info!("Tenant data plane shut down");
    }
}
