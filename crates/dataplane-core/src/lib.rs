// ABOUTME: Shared data model for the tenant data-plane manager
// ABOUTME: Plain DTOs for tenants, encrypted credentials and the migration ledger
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data-plane core models
//!
//! Types in this crate carry no I/O and no secrets in plaintext. They are the
//! vocabulary shared by the control-plane registry, the migration runner and
//! the callers of the resolver.

/// Tenant and migration DTOs
pub mod models;
