// ABOUTME: In-memory secret wrappers for encryption keys and decrypted DSNs
// ABOUTME: Zeroize-on-drop storage, redacted Debug output and one-way DSN fingerprints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::{cipher::KEY_LEN, limits::FINGERPRINT_SHORT_LEN};
use crate::errors::{AppError, AppResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// AES-256 key used to open sealed tenant credentials
#[derive(Clone)]
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Decode a key supplied as hex or base64
    ///
    /// An even-length string made only of hex digits is decoded as hex; anything
    /// else is decoded as standard base64.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the input is empty or decodes under neither encoding,
    /// and `InvalidKeyLength` if it decodes to anything but 32 bytes.
    pub fn parse(encoded: &str) -> AppResult<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(AppError::config("encryption key is empty"));
        }

        let decoded = Zeroizing::new(if looks_like_hex(encoded) {
            hex::decode(encoded)
                .map_err(|e| AppError::config(format!("encryption key is not valid hex: {e}")))?
        } else {
            STANDARD
                .decode(encoded)
                .map_err(|e| AppError::config(format!("encryption key is not valid base64: {e}")))?
        });

        Self::from_slice(&decoded)
    }

    /// Build a key from raw bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyLength` unless exactly 32 bytes are supplied
    pub fn from_slice(bytes: &[u8]) -> AppResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(AppError::InvalidKeyLength {
                actual: bytes.len(),
            });
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Raw key bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

fn looks_like_hex(value: &str) -> bool {
    value.len() % 2 == 0 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Plaintext connection string of a tenant database
///
/// Exists only for the duration of a resolution. It has no `Display` impl, its
/// `Debug` output is redacted, and the buffer is wiped on drop. Shared maps key
/// on [`SecretDsn::fingerprint`] instead of the string itself.
#[derive(Clone)]
pub struct SecretDsn(Zeroizing<String>);

impl SecretDsn {
    /// Wrap a plaintext DSN
    pub fn new(dsn: impl Into<String>) -> Self {
        Self(Zeroizing::new(dsn.into()))
    }

    /// Borrow the plaintext; only database drivers should call this
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// One-way SHA-256 fingerprint of the exact DSN string
    #[must_use]
    pub fn fingerprint(&self) -> DsnFingerprint {
        DsnFingerprint(hex::encode(Sha256::digest(self.0.as_bytes())))
    }
}

impl fmt::Debug for SecretDsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretDsn([REDACTED])")
    }
}

/// Hex-encoded SHA-256 of a DSN, safe to log and to use as a map key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DsnFingerprint(String);

impl DsnFingerprint {
    /// Full 64-character hex digest
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters used in log lines
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..FINGERPRINT_SHORT_LEN]
    }
}

impl fmt::Display for DsnFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}
