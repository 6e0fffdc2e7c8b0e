// ABOUTME: Database abstraction layer for tenant data-plane handles
// ABOUTME: Plugin architecture with SQLite and PostgreSQL backends behind one trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::AppResult;
use async_trait::async_trait;
use dataplane_core::models::{MigrationFile, MigrationLedgerRow, MigrationOutcome};

/// Database provider factory
pub mod factory;

/// `SQLite` tenant database implementation
pub mod sqlite;

/// PostgreSQL tenant database implementation
#[cfg(feature = "postgresql")]
pub mod postgres;

/// Capability of a pooled tenant database handle
///
/// The migration runner and the resolver only see this trait, so the data plane
/// works against any SQL backend that can run a transaction and close its pool.
#[async_trait]
pub trait DataPlaneProvider: Send + Sync {
    /// Short human readable backend name
    fn backend_info(&self) -> &'static str;

    /// Round-trip a trivial query
    async fn ping(&self) -> AppResult<()>;

    /// Create the `schema_migrations` ledger if it does not exist
    ///
    /// Idempotent. Returns `LedgerWriteFailed` on failure.
    async fn ensure_ledger_table(&self) -> AppResult<()>;

    /// Ledger rows ordered by migration name
    async fn applied_migrations(&self) -> AppResult<Vec<MigrationLedgerRow>>;

    /// Apply one file and record it, atomically
    ///
    /// Inside a single transaction: check the ledger, run the body, insert the
    /// ledger row with insert-if-absent semantics, commit. A failure anywhere
    /// rolls back both the schema change and the ledger row.
    async fn apply_migration(&self, file: &MigrationFile) -> AppResult<MigrationOutcome>;

    /// Close the underlying pool
    async fn close(&self);
}
