// ABOUTME: Security module for tenant credential decryption and secret handling
// ABOUTME: AES-256-GCM credential codec plus zeroizing key and DSN wrappers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Security Module
//!
//! Tenant connection strings are stored sealed in the control plane. This module
//! turns a sealed credential back into a [`SecretDsn`]:
//! - Key decoding from hex or base64, strictly 32 bytes
//! - AES-256-GCM authenticated decryption (96-bit IV, 128-bit tag)
//! - Redacted, zeroize-on-drop holders for keys and plaintext DSNs
//! - One-way DSN fingerprints for use as cache keys and in logs

/// AES-256-GCM credential codec
pub mod cipher;
/// Key and DSN secret wrappers
pub mod secret;

pub use cipher::SecretCipher;
pub use secret::{DsnFingerprint, EncryptionKey, SecretDsn};
