// ABOUTME: Tenant schema migrations: file source, transactional runner, in-process coordinator
// ABOUTME: Guarantees every tenant database is schema-current before it is handed out
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tenant migrations
//!
//! - [`MigrationSource`] lists operator-versioned `*.sql` files in name order
//! - [`MigrationRunner`] applies them to one database, one transaction per file,
//!   recording each in the `schema_migrations` ledger
//! - [`MigrationCoordinator`] makes sure concurrent callers in this process
//!   share a single run per database
//!
//! Down migrations are not supported.

/// Concurrent run de-duplication
pub mod coordinator;
/// Ledger-backed migration runner
pub mod runner;
/// Migration file source
pub mod source;

pub use coordinator::{
    MigrationCoordinator, MigrationExecutor, MigrationState, PooledMigrationExecutor,
};
pub use runner::MigrationRunner;
pub use source::MigrationSource;
