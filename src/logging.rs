// ABOUTME: Structured logging setup built on tracing-subscriber
// ABOUTME: EnvFilter from RUST_LOG with pretty, compact or JSON output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::{AppError, AppResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `config.default_filter` when set. Only DSN fingerprints
/// are ever passed to the logging macros in this crate; plaintext credentials
/// never reach a subscriber.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global subscriber
/// is already installed
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| AppError::config(format!("invalid log filter: {e}")))?;

    let registry = Registry::default().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| AppError::internal(format!("Failed to install tracing subscriber: {e}")))
}
