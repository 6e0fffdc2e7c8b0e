// ABOUTME: Application constants for the tenant data plane
// ABOUTME: Environment variable names, defaults, ledger and cipher parameters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Environment variable names read by `DataPlaneConfig::from_env`
pub mod env_vars {
    /// Hex or base64 AES-256 key used to open tenant credentials
    pub const ENCRYPTION_KEY: &str = "TENANT_DSN_ENCRYPTION_KEY";
    /// Control-plane database holding tenants and their sealed DSNs
    pub const CONTROL_PLANE_DATABASE_URL: &str = "CONTROL_PLANE_DATABASE_URL";
    /// Global auto-migration toggle
    pub const AUTO_MIGRATE: &str = "TENANT_AUTO_MIGRATE";
    /// Directory of tenant schema files
    pub const MIGRATIONS_DIR: &str = "TENANT_MIGRATIONS_DIR";
    /// Per-tenant pool upper bound
    pub const POOL_MAX_CONNECTIONS: &str = "TENANT_POOL_MAX_CONNECTIONS";
    /// Per-tenant pool lower bound
    pub const POOL_MIN_CONNECTIONS: &str = "TENANT_POOL_MIN_CONNECTIONS";
    /// Seconds to wait for a pooled connection
    pub const POOL_ACQUIRE_TIMEOUT_SECS: &str = "TENANT_POOL_ACQUIRE_TIMEOUT_SECS";
    /// Extra connection attempts for `PostgreSQL` pools
    pub const POOL_CONNECTION_RETRIES: &str = "TENANT_POOL_CONNECTION_RETRIES";
    /// Log output format (`pretty`, `compact`, `json`)
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Defaults applied when the environment is silent
pub mod defaults {
    /// Default migrations directory, relative to the working directory
    pub const MIGRATIONS_DIR: &str = "./tenant_migrations";
    /// Default per-tenant pool upper bound
    pub const POOL_MAX_CONNECTIONS: u32 = 5;
    /// Default per-tenant pool lower bound
    pub const POOL_MIN_CONNECTIONS: u32 = 0;
    /// Default acquire timeout in seconds
    pub const POOL_ACQUIRE_TIMEOUT_SECS: u64 = 30;
    /// Default extra connection attempts
    pub const POOL_CONNECTION_RETRIES: u32 = 3;
    /// Default first backoff delay
    pub const POOL_INITIAL_RETRY_DELAY_MS: u64 = 250;
    /// Default backoff ceiling
    pub const POOL_MAX_RETRY_DELAY_MS: u64 = 4_000;
    /// Default `EnvFilter` directive
    pub const LOG_FILTER: &str = "info";
}

/// Migration ledger parameters
pub mod ledger {
    /// Only files with this suffix are migration candidates
    pub const FILE_SUFFIX: &str = ".sql";
}

/// AES-256-GCM parameters of the credential format
pub mod cipher {
    /// Key length in bytes
    pub const KEY_LEN: usize = 32;
    /// IV length in bytes (96 bits)
    pub const IV_LEN: usize = 12;
    /// Authentication tag length in bytes (128 bits)
    pub const TAG_LEN: usize = 16;
    /// Separator between the three base64 segments
    pub const SEGMENT_SEPARATOR: char = '.';
}

/// Boundary validation limits
pub mod limits {
    /// Maximum tenant slug length
    pub const SLUG_MAX_LEN: usize = 32;
    /// Maximum SQL identifier length (`PostgreSQL` NAMEDATALEN - 1)
    pub const IDENTIFIER_MAX_LEN: usize = 63;
    /// Hex characters of a DSN fingerprint shown in logs
    pub const FINGERPRINT_SHORT_LEN: usize = 12;
}
