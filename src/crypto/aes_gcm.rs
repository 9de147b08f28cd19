// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-256-GCM with a detached tag
//!
//! The ECIES envelope carries the nonce and the 16-byte authentication tag in
//! their own fields ahead of the ciphertext, so encryption and decryption work
//! on the detached form rather than the `ciphertext || tag` layout.
//!
//! - Nonce: 12 bytes (96 bits)
//! - Tag: 16 bytes (128 bits)
//! - Key: 32 bytes (256 bits)

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use rand::{rngs::OsRng, RngCore};

use super::error::CryptoError;

/// AES-GCM nonce size in bytes
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag size in bytes
pub const TAG_LEN: usize = 16;

/// AES-256 key size in bytes
pub const KEY_LEN: usize = 32;

/// Generate a random nonce
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext`, returning the ciphertext and its detached tag.
///
/// Zero-length plaintext is valid and yields an empty ciphertext with a full tag.
pub fn encrypt(
    plaintext: &[u8],
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN]), CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::invalid_key("aes_key", e.to_string()))?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, &mut buffer)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok((buffer, tag_bytes))
}

/// Decrypt `ciphertext` against its detached tag.
///
/// # Arguments
///
/// * `ciphertext` - Encrypted bytes, same length as the plaintext
/// * `tag` - 16-byte detached authentication tag
/// * `key` - 32-byte AES-256 key
/// * `nonce` - 12-byte nonce used for encryption
/// * `aad` - Additional data that must match what was bound at encryption
///
/// # Returns
///
/// The plaintext. Any tag or AAD mismatch yields
/// [`CryptoError::AuthenticationFailed`]; no partial plaintext is ever returned.
pub fn decrypt(
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::invalid_key("aes_key", e.to_string()))?;

    let mut buffer = ciphertext.to_vec();
    match cipher.decrypt_in_place_detached(
        Nonce::from_slice(nonce),
        aad,
        &mut buffer,
        Tag::from_slice(tag),
    ) {
        Ok(()) => Ok(buffer),
        Err(_) => Err(CryptoError::AuthenticationFailed),
    }
}
