// ABOUTME: Boundary validation for tenant-derived strings
// ABOUTME: Slug validator and the only sanctioned SQL identifier quoter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Tenant-controlled text must never reach SQL as structure unless it passes
//! [`quote_identifier`]. Migration bodies are operator input and do not go
//! through here.

use crate::constants::limits::{IDENTIFIER_MAX_LEN, SLUG_MAX_LEN};
use crate::errors::{AppError, AppResult};

/// True for 1-32 chars of `[a-z0-9-]` starting with a letter or digit
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    let bytes = slug.as_bytes();
    match bytes.first() {
        Some(first) if first.is_ascii_lowercase() || first.is_ascii_digit() => {
            bytes.len() <= SLUG_MAX_LEN
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        }
        _ => false,
    }
}

/// Validate a tenant slug
///
/// # Errors
///
/// Returns `InvalidInput` if the slug is empty, too long, or contains anything
/// other than lowercase letters, digits and hyphens
pub fn validate_slug(slug: &str) -> AppResult<&str> {
    if is_valid_slug(slug) {
        Ok(slug)
    } else {
        Err(AppError::invalid_input(format!(
            "tenant slug must be 1-{SLUG_MAX_LEN} lowercase letters, digits or hyphens starting with a letter or digit"
        )))
    }
}

/// True for `[a-z_][a-z0-9_]{0,62}`
#[must_use]
pub fn is_valid_identifier(ident: &str) -> bool {
    let bytes = ident.as_bytes();
    match bytes.first() {
        Some(first) if first.is_ascii_lowercase() || *first == b'_' => {
            bytes.len() <= IDENTIFIER_MAX_LEN
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_')
        }
        _ => false,
    }
}

/// Turn a tenant-derived name into a double-quoted SQL identifier
///
/// # Errors
///
/// Returns `InvalidInput` for anything outside `[a-z_][a-z0-9_]{0,62}`; no
/// escaping is attempted
pub fn quote_identifier(ident: &str) -> AppResult<String> {
    if is_valid_identifier(ident) {
        Ok(format!("\"{ident}\""))
    } else {
        Err(AppError::invalid_input(
            "identifier must match [a-z_][a-z0-9_]{0,62}",
        ))
    }
}
