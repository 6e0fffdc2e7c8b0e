// ABOUTME: Model re-exports for tenants and schema migrations
// ABOUTME: Groups the tenant identity types and the migration ledger types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Schema migration files, ledger rows and run reports
pub mod migration;
/// Tenant identity and credential records
pub mod tenant;

pub use migration::{MigrationFile, MigrationLedgerRow, MigrationOutcome, MigrationReport};
pub use tenant::{EncryptedCredential, TenantId, TenantIdentity, TenantRecord};
