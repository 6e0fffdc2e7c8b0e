// ABOUTME: Unified error type for the tenant data-plane manager
// ABOUTME: Typed failures for crypto, registry, migration and pooling, grouped by category
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Error handling
//!
//! Every fallible operation returns [`AppResult`]. Variants only carry strings so
//! one outcome can be cloned to every caller waiting on the same migration run.
//! Messages never contain connection strings, plaintext credentials or keys.

use serde::Serialize;
use thiserror::Error;

/// Result alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Coarse grouping used by callers to decide how to surface a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or malformed configuration (encryption key, URLs, toggles)
    Configuration,
    /// Malformed ciphertext or failed authentication tag
    Cryptographic,
    /// Migration file read, apply or ledger failure
    Migration,
    /// Unknown tenant or missing credential record
    NotFound,
    /// Connection or query failure outside a migration
    Database,
    /// Caller-supplied value rejected at the boundary
    InvalidInput,
    /// Invariant violation inside this process
    Internal,
}

/// Errors produced by the data plane
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Missing or malformed configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Encryption key decoded to the wrong number of bytes
    #[error("invalid encryption key length: expected 32 bytes, decoded {actual}")]
    InvalidKeyLength {
        /// Number of bytes the key actually decoded to
        actual: usize,
    },

    /// Credential payload is not `iv.ciphertext.tag` in base64
    #[error("invalid credential payload format: {0}")]
    InvalidPayloadFormat(String),

    /// Authentication tag did not verify (tampered data or wrong key)
    #[error("credential authentication failed")]
    AuthenticationFailure,

    /// Requested resource does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Migration directory or file could not be read
    #[error("migration source unreadable at {path}: {cause}")]
    MigrationFileUnreadable {
        /// Path that failed
        path: String,
        /// Underlying I/O failure
        cause: String,
    },

    /// A migration body failed; its transaction was rolled back
    #[error("migration {file} failed: {cause}")]
    MigrationApplyFailed {
        /// Migration file name
        file: String,
        /// Database error text
        cause: String,
    },

    /// The migration ledger could not be created or written
    #[error("migration ledger write failed: {0}")]
    LedgerWriteFailed(String),

    /// Connection or query failure
    #[error("database error: {0}")]
    Database(String),

    /// Caller-supplied value rejected
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Resource not found, e.g. `AppError::not_found("Tenant")`
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Database failure outside a migration
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Invalid boundary input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Malformed credential payload
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayloadFormat(message.into())
    }

    /// Failed migration body
    pub fn migration_apply_failed(file: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::MigrationApplyFailed {
            file: file.into(),
            cause: cause.into(),
        }
    }

    /// Unreadable migration source
    pub fn migration_unreadable(path: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::MigrationFileUnreadable {
            path: path.into(),
            cause: cause.into(),
        }
    }

    /// Failed ledger write
    pub fn ledger_write_failed(message: impl Into<String>) -> Self {
        Self::LedgerWriteFailed(message.into())
    }

    /// Category of this error
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::InvalidKeyLength { .. } => ErrorCategory::Configuration,
            Self::InvalidPayloadFormat(_) | Self::AuthenticationFailure => {
                ErrorCategory::Cryptographic
            }
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::MigrationFileUnreadable { .. }
            | Self::MigrationApplyFailed { .. }
            | Self::LedgerWriteFailed(_) => ErrorCategory::Migration,
            Self::Database(_) => ErrorCategory::Database,
            Self::InvalidInput(_) => ErrorCategory::InvalidInput,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the failure is the caller's (surface as 4xx rather than a server fault)
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::NotFound | ErrorCategory::InvalidInput
        )
    }

    /// Whether a later attempt can succeed without operator action
    ///
    /// Crypto and configuration failures are deterministic for a given key and
    /// stored payload, so retrying them is pointless.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Migration | ErrorCategory::Database
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::not_found("Row"),
            sqlx::Error::Configuration(e) => Self::config(format!("invalid database options: {e}")),
            other => Self::database(other.to_string()),
        }
    }
}
