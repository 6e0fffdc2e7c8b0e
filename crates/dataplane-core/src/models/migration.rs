// ABOUTME: Schema migration DTOs shared by the runner, the backends and callers
// ABOUTME: MigrationFile input, MigrationLedgerRow proof of application, run reports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One operator-versioned SQL file
///
/// The name must sort lexically into the intended application order, e.g.
/// `0001_init.sql`, `0002_add_col.sql`. Bodies are trusted input and are never
/// derived from tenant data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// File name, also the ledger key
    pub name: String,
    /// Full SQL text, possibly several statements
    pub sql: String,
}

impl MigrationFile {
    /// Build a migration from a name and SQL body
    #[must_use]
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Append-only record that a file was applied to one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationLedgerRow {
    /// Migration file name (primary key of the ledger)
    pub name: String,
    /// Commit time of the application
    pub applied_at: DateTime<Utc>,
}

/// Result of offering one file to a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// The body ran and the ledger row was written in the same transaction
    Applied,
    /// The ledger already listed this file; nothing ran
    AlreadyApplied,
}

/// Summary of a full migration run against one database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Files applied during this run, in application order
    pub applied: Vec<String>,
    /// Files found already recorded in the ledger
    pub skipped: Vec<String>,
}

impl MigrationReport {
    /// True when the run changed nothing
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }

    /// Record the outcome for one file
    pub fn record(&mut self, name: &str, outcome: MigrationOutcome) {
        match outcome {
            MigrationOutcome::Applied => self.applied.push(name.to_owned()),
            MigrationOutcome::AlreadyApplied => self.skipped.push(name.to_owned()),
        }
    }
}
