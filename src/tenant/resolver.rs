// ABOUTME: Turns an authenticated principal into a ready-to-query tenant context
// ABOUTME: Registry lookup, DSN decryption, migration gate and cached pool, in that order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::registry::TenantRegistry;
use super::{AuthenticatedPrincipal, TenantContext};
use crate::cache::ConnectionCache;
use crate::errors::AppResult;
use crate::migrations::MigrationCoordinator;
use crate::security::{EncryptionKey, SecretCipher};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Resolves tenant contexts; any failing step aborts the whole resolution
pub struct TenantContextResolver {
    key: EncryptionKey,
    registry: Arc<dyn TenantRegistry>,
    coordinator: Arc<MigrationCoordinator>,
    cache: Arc<ConnectionCache>,
}

impl TenantContextResolver {
    /// Create a resolver from its collaborators
    #[must_use]
    pub fn new(
        key: EncryptionKey,
        registry: Arc<dyn TenantRegistry>,
        coordinator: Arc<MigrationCoordinator>,
        cache: Arc<ConnectionCache>,
    ) -> Self {
        Self {
            key,
            registry,
            coordinator,
            cache,
        }
    }

    /// Resolve `principal` into a context whose handle is safe to query
    ///
    /// The decrypted DSN lives only for the duration of this call.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed slug
    /// - `NotFound` for an unknown tenant or a tenant without a credential
    /// - `InvalidPayloadFormat` / `AuthenticationFailure` if the credential does not open
    /// - any migration or database error from the migration gate or the pool
    #[instrument(skip(self, principal), fields(tenant = %principal.tenant, role = %principal.role))]
    pub async fn resolve(&self, principal: &AuthenticatedPrincipal) -> AppResult<TenantContext> {
        let tenant = self.registry.fetch_tenant(&principal.tenant).await?;
        let credential = self.registry.fetch(tenant.id).await?;

        let dsn = SecretCipher::decrypt_with_key(&self.key, &credential.ciphertext)
            .inspect_err(|e| {
                warn!(tenant_id = %tenant.id, error = %e, "Tenant credential did not open");
            })?;
        let fingerprint = dsn.fingerprint();
        debug!(tenant_id = %tenant.id, fingerprint = %fingerprint, "Decrypted tenant credential");

        self.coordinator.ensure_migrated(&dsn).await?;
        let handle = self.cache.get(&dsn).await?;

        info!(
            tenant_id = %tenant.id,
            slug = %tenant.slug,
            fingerprint = %fingerprint,
            "Resolved tenant context"
        );

        Ok(TenantContext {
            tenant,
            principal_id: principal.principal_id,
            role: principal.role,
            handle,
        })
    }

    /// Registry used for lookups
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn TenantRegistry> {
        &self.registry
    }
}
