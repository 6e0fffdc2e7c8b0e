// ABOUTME: Applies ordered SQL migration files to one tenant database exactly once each
// ABOUTME: Ledger-backed, one transaction per file, stop on the first failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::source::MigrationSource;
use crate::database_plugins::DataPlaneProvider;
use crate::errors::AppResult;
use dataplane_core::models::{MigrationOutcome, MigrationReport};
use std::time::Instant;
use tracing::{debug, error, info};

/// Brings one database to the latest known schema version
///
/// Files apply strictly one at a time in name order. Each file's body and its
/// ledger row commit together, so the ledger lists exactly the files that fully
/// applied. The first failure aborts the run and later files are not attempted.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    source: MigrationSource,
}

impl MigrationRunner {
    /// Create a runner over a migration source
    #[must_use]
    pub const fn new(source: MigrationSource) -> Self {
        Self { source }
    }

    /// The configured source
    #[must_use]
    pub const fn source(&self) -> &MigrationSource {
        &self.source
    }

    /// Run every pending migration against `db`
    ///
    /// # Errors
    ///
    /// - `LedgerWriteFailed` if the ledger cannot be created or written
    /// - `MigrationFileUnreadable` if the source cannot be listed or read
    /// - `MigrationApplyFailed` for the first file whose body fails
    pub async fn run(&self, db: &dyn DataPlaneProvider) -> AppResult<MigrationReport> {
        let started = Instant::now();
        db.ensure_ledger_table().await?;

        let files = self.source.load().await?;
        let mut report = MigrationReport::default();

        for file in &files {
            let file_started = Instant::now();
            match db.apply_migration(file).await {
                Ok(outcome) => {
                    match outcome {
                        MigrationOutcome::Applied => info!(
                            migration = %file.name,
                            elapsed_ms = file_started.elapsed().as_millis() as u64,
                            "Applied migration"
                        ),
                        MigrationOutcome::AlreadyApplied => {
                            debug!(migration = %file.name, "Migration already applied");
                        }
                    }
                    report.record(&file.name, outcome);
                }
                Err(e) => {
                    error!(
                        migration = %file.name,
                        applied_this_run = report.applied.len(),
                        error = %e,
                        "Migration failed, aborting run"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            backend = db.backend_info(),
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Migration run complete"
        );
        Ok(report)
    }
}
