// ABOUTME: In-process de-duplication of concurrent migration runs per tenant database
// ABOUTME: Shared outcome per DSN fingerprint, memoized on success, cleared on failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::runner::MigrationRunner;
use crate::cache::ConnectionCache;
use crate::errors::{AppError, AppResult};
use crate::security::{DsnFingerprint, SecretDsn};
use async_trait::async_trait;
use dataplane_core::models::MigrationReport;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Something that can bring the database behind a DSN up to date
#[async_trait]
pub trait MigrationExecutor: Send + Sync + 'static {
    /// Run all pending migrations for `dsn`
    async fn migrate(&self, dsn: &SecretDsn) -> AppResult<MigrationReport>;
}

/// Production executor: pooled handle from the cache, files from the runner
pub struct PooledMigrationExecutor {
    cache: Arc<ConnectionCache>,
    runner: MigrationRunner,
}

impl PooledMigrationExecutor {
    /// Executor that migrates through handles owned by `cache`
    #[must_use]
    pub const fn new(cache: Arc<ConnectionCache>, runner: MigrationRunner) -> Self {
        Self { cache, runner }
    }
}

#[async_trait]
impl MigrationExecutor for PooledMigrationExecutor {
    async fn migrate(&self, dsn: &SecretDsn) -> AppResult<MigrationReport> {
        let handle = self.cache.get(dsn).await?;
        self.runner.run(handle.as_ref()).await
    }
}

/// Where a database stands from this process's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// No run started, or the last one failed and was cleared
    Unknown,
    /// A run is in progress
    InFlight,
    /// A run succeeded; further calls are free
    Migrated,
}

type SharedOutcome = Shared<BoxFuture<'static, AppResult<()>>>;

enum Entry {
    Running { attempt: u64, outcome: SharedOutcome },
    Migrated,
}

type EntryMap = Arc<Mutex<HashMap<DsnFingerprint, Entry>>>;

/// Guarantees at most one in-flight migration run per database in this process
///
/// Callers arriving while a run is pending await the same outcome. Success is
/// retained for the lifetime of the coordinator; failure removes the entry so
/// the next call starts over. The run task settles its own entry, so this
/// holds even when every caller has stopped waiting. Coordination across
/// processes relies solely on the transactional ledger.
pub struct MigrationCoordinator {
    executor: Arc<dyn MigrationExecutor>,
    enabled: bool,
    entries: EntryMap,
    next_attempt: AtomicU64,
}

impl MigrationCoordinator {
    /// Coordinator over `executor`; `enabled = false` turns every call into a no-op
    #[must_use]
    pub fn new(executor: Arc<dyn MigrationExecutor>, enabled: bool) -> Self {
        Self {
            executor,
            enabled,
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_attempt: AtomicU64::new(0),
        }
    }

    /// Whether auto-migration is on
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ensure the database behind `dsn` is fully migrated
    ///
    /// A started run executes on its own task, so a caller that gives up does
    /// not abandon the run half-way.
    ///
    /// # Errors
    ///
    /// Returns the run's error to every caller that awaited it
    pub async fn ensure_migrated(&self, dsn: &SecretDsn) -> AppResult<()> {
        if !self.enabled {
            debug!("Auto-migration disabled, skipping");
            return Ok(());
        }

        let fingerprint = dsn.fingerprint();
        let outcome = {
            let mut entries = lock_entries(&self.entries)?;
            match entries.get(&fingerprint) {
                Some(Entry::Migrated) => return Ok(()),
                Some(Entry::Running { outcome, .. }) => outcome.clone(),
                None => {
                    let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
                    let outcome = self.start_run(dsn, &fingerprint, attempt);
                    entries.insert(
                        fingerprint,
                        Entry::Running {
                            attempt,
                            outcome: outcome.clone(),
                        },
                    );
                    outcome
                }
            }
        };

        outcome.await
    }

    /// Current state for `dsn`
    ///
    /// # Errors
    ///
    /// Returns an error if the entry lock is poisoned
    pub fn state(&self, dsn: &SecretDsn) -> AppResult<MigrationState> {
        let entries = lock_entries(&self.entries)?;
        Ok(match entries.get(&dsn.fingerprint()) {
            None => MigrationState::Unknown,
            Some(Entry::Running { .. }) => MigrationState::InFlight,
            Some(Entry::Migrated) => MigrationState::Migrated,
        })
    }

    // The entry is inserted by the caller while it still holds the lock, so
    // the task cannot settle it before it exists.
    fn start_run(
        &self,
        dsn: &SecretDsn,
        fingerprint: &DsnFingerprint,
        attempt: u64,
    ) -> SharedOutcome {
        info!(fingerprint = %fingerprint, attempt, "Starting tenant migration run");
        let executor = Arc::clone(&self.executor);
        let entries = Arc::clone(&self.entries);
        let dsn = dsn.clone();
        let task_fingerprint = fingerprint.clone();

        let task = tokio::spawn(async move {
            let result = match AssertUnwindSafe(executor.migrate(&dsn)).catch_unwind().await {
                Ok(Ok(report)) => {
                    info!(
                        fingerprint = %task_fingerprint,
                        applied = report.applied.len(),
                        skipped = report.skipped.len(),
                        "Tenant database is up to date"
                    );
                    Ok(())
                }
                Ok(Err(e)) => {
                    error!(
                        fingerprint = %task_fingerprint,
                        error = %e,
                        "Tenant migration run failed"
                    );
                    Err(e)
                }
                Err(_) => {
                    error!(fingerprint = %task_fingerprint, "Tenant migration run panicked");
                    Err(AppError::internal("migration run panicked"))
                }
            };
            settle(&entries, &task_fingerprint, attempt, result.is_ok());
            result
        });

        let entries = Arc::clone(&self.entries);
        let fingerprint = fingerprint.clone();
        async move {
            task.await.unwrap_or_else(|join_error| {
                settle(&entries, &fingerprint, attempt, false);
                Err(AppError::internal(format!(
                    "migration task did not complete: {join_error}"
                )))
            })
        }
        .boxed()
        .shared()
    }
}

/// Record the end of `attempt`: memoize success, clear failure
///
/// A newer attempt that already replaced the entry is left alone.
fn settle(entries: &EntryMap, fingerprint: &DsnFingerprint, attempt: u64, succeeded: bool) {
    let Ok(mut entries) = lock_entries(entries) else {
        return;
    };
    let current = matches!(
        entries.get(fingerprint),
        Some(Entry::Running { attempt: running, .. }) if *running == attempt
    );
    if !current {
        return;
    }
    if succeeded {
        entries.insert(fingerprint.clone(), Entry::Migrated);
    } else {
        entries.remove(fingerprint);
        warn!(fingerprint = %fingerprint, attempt, "Cleared failed migration attempt");
    }
}

fn lock_entries(
    entries: &Mutex<HashMap<DsnFingerprint, Entry>>,
) -> AppResult<MutexGuard<'_, HashMap<DsnFingerprint, Entry>>> {
    entries.lock().map_err(|e| {
        error!(error = ?e, "Migration coordinator lock poisoned");
        AppError::internal("Migration coordinator lock poisoned")
    })
}
