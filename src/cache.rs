// ABOUTME: Process-lifetime cache of pooled tenant database handles
// ABOUTME: One pool per exact DSN, created on first access, closed only at shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Connection cache
//!
//! Tenant count and DSNs are stable and bounded, so handles are never evicted.
//! Entries are keyed by the SHA-256 fingerprint of the exact DSN string, which
//! keeps plaintext credentials out of the shared map.

use crate::config::PoolConfig;
use crate::database_plugins::factory::Database;
use crate::database_plugins::DataPlaneProvider;
use crate::errors::AppResult;
use crate::security::{DsnFingerprint, SecretDsn};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Maps a DSN to a live, reusable pooled handle
pub struct ConnectionCache {
    pool_config: PoolConfig,
    handles: DashMap<DsnFingerprint, Arc<OnceCell<Arc<Database>>>>,
}

impl ConnectionCache {
    /// Empty cache; every pool it opens uses `pool_config`
    #[must_use]
    pub fn new(pool_config: PoolConfig) -> Self {
        Self {
            pool_config,
            handles: DashMap::new(),
        }
    }

    /// Handle for `dsn`, opening the pool on first access
    ///
    /// Concurrent first calls for the same DSN share one connect attempt. If it
    /// fails, nothing is cached and the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be opened
    pub async fn get(&self, dsn: &SecretDsn) -> AppResult<Arc<Database>> {
        let fingerprint = dsn.fingerprint();
        let cell = {
            let entry = self
                .handles
                .entry(fingerprint.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };

        let handle = cell
            .get_or_try_init(|| async {
                Database::connect(dsn, &self.pool_config).await.map(Arc::new)
            })
            .await?;

        Ok(Arc::clone(handle))
    }

    /// Number of DSNs with an open pool
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    /// True when no pool has been opened
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every pool; called once at process shutdown
    pub async fn close_all(&self) {
        let handles: Vec<Arc<Database>> = self
            .handles
            .iter()
            .filter_map(|entry| entry.value().get().cloned())
            .collect();
        self.handles.clear();

        let count = handles.len();
        for handle in handles {
            handle.close().await;
        }
        info!(closed = count, "Closed tenant connection pools");
    }
}
