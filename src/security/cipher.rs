// ABOUTME: Authenticated decryption of sealed tenant connection strings
// ABOUTME: AES-256-GCM over the `iv.ciphertext.tag` base64 credential format
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::secret::{EncryptionKey, SecretDsn};
use crate::constants::cipher::{IV_LEN, SEGMENT_SEPARATOR, TAG_LEN};
use crate::errors::{AppError, AppResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Stateless AES-256-GCM codec for tenant credentials
///
/// Decryption is a pure function of key and payload: the same inputs always
/// produce the same plaintext or the same error, and a failed tag check never
/// yields plaintext.
pub struct SecretCipher;

impl SecretCipher {
    /// Open a sealed credential with a hex or base64 encoded key
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength` if the key does not decode to 32 bytes
    /// - `Config` if the key is empty or not hex/base64
    /// - `InvalidPayloadFormat` if the payload is not three base64 segments
    /// - `AuthenticationFailure` if the tag does not verify
    pub fn decrypt(key: &str, payload: &str) -> AppResult<SecretDsn> {
        let key = EncryptionKey::parse(key)?;
        Self::decrypt_with_key(&key, payload)
    }

    /// Open a sealed credential with an already parsed key
    ///
    /// # Errors
    ///
    /// Same as [`SecretCipher::decrypt`], minus the key decoding errors
    pub fn decrypt_with_key(key: &EncryptionKey, payload: &str) -> AppResult<SecretDsn> {
        let segments: Vec<&str> = payload.split(SEGMENT_SEPARATOR).collect();
        let [iv_b64, ciphertext_b64, tag_b64] = segments.as_slice() else {
            return Err(AppError::invalid_payload(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        let iv = decode_segment("iv", iv_b64)?;
        let ciphertext = decode_segment("ciphertext", ciphertext_b64)?;
        let tag = decode_segment("tag", tag_b64)?;

        if iv.len() != IV_LEN {
            return Err(AppError::invalid_payload(format!(
                "iv must be {IV_LEN} bytes, found {}",
                iv.len()
            )));
        }
        if tag.len() != TAG_LEN {
            return Err(AppError::invalid_payload(format!(
                "tag must be {TAG_LEN} bytes, found {}",
                tag.len()
            )));
        }

        let nonce = Nonce::try_assume_unique_for_key(&iv)
            .map_err(|_| AppError::invalid_payload("iv has the wrong length"))?;
        let opening_key = aead_key(key)?;

        // ring expects the tag appended to the ciphertext
        let mut in_out = Zeroizing::new(ciphertext);
        in_out.extend_from_slice(&tag);

        let plaintext = opening_key
            .open_in_place(nonce, Aad::empty(), &mut in_out[..])
            .map_err(|_| AppError::AuthenticationFailure)?;

        let dsn = std::str::from_utf8(plaintext)
            .map_err(|_| AppError::invalid_payload("decrypted credential is not UTF-8"))?;
        Ok(SecretDsn::new(dsn))
    }

    /// Seal a connection string into the `iv.ciphertext.tag` format
    ///
    /// Used by provisioning tooling; a fresh random IV is drawn for every call.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the system RNG or the cipher fails
    pub fn encrypt(key: &EncryptionKey, plaintext: &str) -> AppResult<String> {
        let rng = SystemRandom::new();
        let mut iv = [0u8; IV_LEN];
        rng.fill(&mut iv)
            .map_err(|e| AppError::internal(format!("Failed to generate iv: {e}")))?;

        let sealing_key = aead_key(key)?;
        let mut in_out = Zeroizing::new(plaintext.as_bytes().to_vec());
        let tag = sealing_key
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(iv),
                Aad::empty(),
                &mut in_out[..],
            )
            .map_err(|e| AppError::internal(format!("Failed to seal credential: {e}")))?;

        Ok(format!(
            "{}{SEGMENT_SEPARATOR}{}{SEGMENT_SEPARATOR}{}",
            STANDARD.encode(iv),
            STANDARD.encode(&in_out[..]),
            STANDARD.encode(tag.as_ref())
        ))
    }
}

fn aead_key(key: &EncryptionKey) -> AppResult<LessSafeKey> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|e| AppError::internal(format!("Failed to create AES-256-GCM key: {e}")))?;
    Ok(LessSafeKey::new(unbound))
}

fn decode_segment(label: &str, segment: &str) -> AppResult<Vec<u8>> {
    STANDARD
        .decode(segment)
        .map_err(|e| AppError::invalid_payload(format!("{label} segment is not base64: {e}")))
}
