// ABOUTME: Tenant boundary: upstream principal contract, resolved context, registry and resolver
// ABOUTME: Everything between "an authenticated caller names a tenant" and "a ready pool"
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tenant resolution
//!
//! Authentication and authorization happen upstream. This module trusts the
//! [`AuthenticatedPrincipal`] it is given and turns it into a [`TenantContext`]
//! whose handle points at a fully migrated tenant database.

/// Control-plane lookups of tenants and sealed credentials
pub mod registry;
/// Orchestration of lookup, decryption, migration and pooling
pub mod resolver;
/// Slug validation and SQL identifier quoting
pub mod validation;

pub use registry::{RegistryPool, SqlTenantRegistry, TenantRegistry};
pub use resolver::TenantContextResolver;
pub use validation::{is_valid_identifier, is_valid_slug, quote_identifier, validate_slug};

use crate::database_plugins::factory::Database;
use crate::errors::AppError;
use dataplane_core::models::{TenantIdentity, TenantRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Role of a principal inside its tenant
///
/// Carried through for callers; nothing in this crate enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    /// Full control, including billing and deletion
    Owner,
    /// Manages members and settings
    Admin,
    /// Regular user
    Member,
}

impl TenantRole {
    /// Lowercase wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for TenantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(AppError::invalid_input(format!(
                "unknown tenant role '{other}', expected owner, admin or member"
            ))),
        }
    }
}

/// Already-authenticated caller, as handed over by the upstream layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedPrincipal {
    /// Tenant the principal acts for
    pub tenant: TenantIdentity,
    /// Principal (user or service account) id
    pub principal_id: Uuid,
    /// Role within the tenant
    pub role: TenantRole,
}

impl AuthenticatedPrincipal {
    /// Principal acting for `tenant`
    pub fn new(tenant: impl Into<TenantIdentity>, principal_id: Uuid, role: TenantRole) -> Self {
        Self {
            tenant: tenant.into(),
            principal_id,
            role,
        }
    }
}

/// A ready-to-query tenant context
///
/// Only ever built once every resolution step succeeded, so `handle` always
/// points at a database whose migrations are applied (unless auto-migration is
/// switched off).
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Tenant identity fields
    pub tenant: TenantRecord,
    /// Caller's principal id
    pub principal_id: Uuid,
    /// Caller's role
    pub role: TenantRole,
    /// Shared pooled handle to the tenant database
    pub handle: Arc<Database>,
}
