// ABOUTME: Configuration management for the tenant data plane
// ABOUTME: Environment-only configuration, no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Environment variable loading and validated settings
pub mod environment;

pub use environment::{DataPlaneConfig, LogFormat, LoggingConfig, PoolConfig};
