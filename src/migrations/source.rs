// ABOUTME: Operator-controlled source of tenant schema migration files
// ABOUTME: Reads *.sql from a fixed directory or a static list, sorted by file name
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::ledger::FILE_SUFFIX;
use crate::errors::{AppError, AppResult};
use dataplane_core::models::MigrationFile;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Where migration files come from
///
/// Never tenant input. Files are returned in ascending lexical order of their
/// names, which is the application order.
#[derive(Debug, Clone)]
pub enum MigrationSource {
    /// A directory scanned for `*.sql` files on every run
    Directory(PathBuf),
    /// A list built by the operator, e.g. from `include_str!`
    Static(Vec<MigrationFile>),
}

impl MigrationSource {
    /// Source backed by a directory
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory(path.into())
    }

    /// Source backed by an in-memory list
    #[must_use]
    pub fn from_files(files: Vec<MigrationFile>) -> Self {
        Self::Static(files)
    }

    /// Load candidate files sorted ascending by name
    ///
    /// # Errors
    ///
    /// Returns `MigrationFileUnreadable` if the directory or a file cannot be
    /// read, or if two files share a name
    pub async fn load(&self) -> AppResult<Vec<MigrationFile>> {
        let mut files = match self {
            Self::Directory(dir) => read_directory(dir).await?,
            Self::Static(files) => files
                .iter()
                .filter(|file| is_candidate(&file.name))
                .cloned()
                .collect(),
        };

        files.sort_by(|a, b| a.name.cmp(&b.name));

        if let Some(name) = files.windows(2).find_map(|pair| match pair {
            [a, b] if a.name == b.name => Some(a.name.clone()),
            _ => None,
        }) {
            return Err(AppError::migration_unreadable(
                name,
                "duplicate migration name",
            ));
        }

        Ok(files)
    }
}

fn is_candidate(name: &str) -> bool {
    name.len() > FILE_SUFFIX.len() && name.ends_with(FILE_SUFFIX)
}

async fn read_directory(dir: &Path) -> AppResult<Vec<MigrationFile>> {
    let unreadable = |path: &Path, e: std::io::Error| {
        AppError::migration_unreadable(path.display().to_string(), e.to_string())
    };

    let mut entries = fs::read_dir(dir).await.map_err(|e| unreadable(dir, e))?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| unreadable(dir, e))? {
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(path = %path.display(), "Skipping migration file with non UTF-8 name");
            continue;
        };
        if !is_candidate(&name) {
            debug!(file = %name, "Ignoring non-migration file");
            continue;
        }
        // follows symlinks, unlike DirEntry::file_type
        let metadata = fs::metadata(&path).await.map_err(|e| unreadable(&path, e))?;
        if !metadata.is_file() {
            continue;
        }

        let sql = fs::read_to_string(&path)
            .await
            .map_err(|e| unreadable(&path, e))?;
        files.push(MigrationFile::new(name, sql));
    }

    Ok(files)
}
