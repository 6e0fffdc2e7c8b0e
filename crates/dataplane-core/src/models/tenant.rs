// ABOUTME: Tenant identity types read from the control-plane registry
// ABOUTME: TenantId newtype, TenantRecord, TenantIdentity lookup key and EncryptedCredential
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of an isolated customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Generate a fresh random tenant id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identity fields of a tenant, as provisioned by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Tenant id
    pub id: TenantId,
    /// URL-safe short name (lowercase letters, digits, hyphen)
    pub slug: String,
    /// Display name
    pub name: String,
}

/// How an upstream caller names the tenant it is acting for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TenantIdentity {
    /// Lookup by primary id
    Id(TenantId),
    /// Lookup by slug
    Slug(String),
}

impl TenantIdentity {
    /// Interpret a free-form operator argument: a UUID is an id, anything else a slug
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        value
            .parse::<TenantId>()
            .map_or_else(|_| Self::Slug(value.to_owned()), Self::Id)
    }
}

impl fmt::Display for TenantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Slug(slug) => write!(f, "slug:{slug}"),
        }
    }
}

impl From<TenantId> for TenantIdentity {
    fn from(id: TenantId) -> Self {
        Self::Id(id)
    }
}

/// Stored credential of a tenant database
///
/// `ciphertext` has the form `<iv_b64>.<ciphertext_b64>.<tag_b64>`. The record is
/// immutable once issued and owned by the control plane.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCredential {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Sealed connection string
    pub ciphertext: String,
}

impl fmt::Debug for EncryptedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedCredential")
            .field("tenant_id", &self.tenant_id)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lenient_identity_parses_uuid_as_id() {
        let id = TenantId::new();
        assert_eq!(
            TenantIdentity::parse_lenient(&id.to_string()),
            TenantIdentity::Id(id)
        );
        assert_eq!(
            TenantIdentity::parse_lenient("acme-corp"),
            TenantIdentity::Slug("acme-corp".to_owned())
        );
    }

    #[test]
    fn credential_debug_hides_ciphertext() {
        let credential = EncryptedCredential {
            tenant_id: TenantId::new(),
            ciphertext: "aXY=.Y3Q=.dGFn".to_owned(),
        };
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("Y3Q="));
        assert!(rendered.contains("ciphertext_len"));
    }

    #[test]
    fn identity_serializes_with_kind_tag() {
        let json = serde_json::to_string(&TenantIdentity::Slug("acme".to_owned())).unwrap();
        assert_eq!(json, r#"{"kind":"slug","value":"acme"}"#);
    }
}
