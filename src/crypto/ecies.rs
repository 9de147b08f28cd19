// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECIES Seal / Open
//!
//! Composes the pieces of the scheme:
//!
//! 1. Sender generates an ephemeral secp256k1 keypair
//! 2. ECDH(ephemeral secret, recipient public) → 32-byte shared secret
//! 3. HKDF-SHA256 → 32-byte AES key
//! 4. AES-256-GCM with a random 12-byte nonce, AAD = header || ephemeral key
//!
//! The recipient reverses steps 2-4 with its static secret and the ephemeral
//! public key found in the envelope.

use k256::SecretKey;

use super::aes_gcm;
use super::ecdh::{derive_symmetric_key, encode_public_key, ephemeral_keypair, shared_secret};
use super::envelope::{
    EciesEnvelope, EncodingType, CIPHER_SUITE_SECP256K1_AES256GCM, ENVELOPE_VERSION,
};
use super::error::CryptoError;

/// Encrypt `plaintext` for the holder of `recipient_public` (SEC1 bytes).
///
/// A new ephemeral keypair and nonce are drawn for every call.
///
/// # Arguments
///
/// * `plaintext` - Bytes to encrypt; may be empty
/// * `recipient_public` - Recipient's public key (33 bytes compressed or 65 bytes uncompressed)
/// * `encoding` - Whether the envelope carries an explicit ciphertext length
///
/// # Returns
///
/// The envelope, ready for [`EciesEnvelope::encode`]
///
/// # Example
///
/// ```ignore
/// let wire = seal(b"hello", &peer_pub_bytes, EncodingType::Basic)?.encode();
/// ```
pub fn seal(
    plaintext: &[u8],
    recipient_public: &[u8],
    encoding: EncodingType,
) -> Result<EciesEnvelope, CryptoError> {
    let (ephemeral_secret, ephemeral_public) = ephemeral_keypair();
    let secret =
        shared_secret(&ephemeral_secret, recipient_public).ok_or(CryptoError::KeyAgreementFailed)?;
    let key = derive_symmetric_key(&secret)?;

    let mut envelope = EciesEnvelope {
        version: ENVELOPE_VERSION,
        cipher_suite: CIPHER_SUITE_SECP256K1_AES256GCM,
        encoding,
        ephemeral_public_key: encode_public_key(&ephemeral_public, true),
        nonce: aes_gcm::generate_nonce(),
        tag: [0u8; aes_gcm::TAG_LEN],
        ciphertext: Vec::new(),
    };

    let (ciphertext, tag) = aes_gcm::encrypt(plaintext, &key, &envelope.nonce, &envelope.aad())?;
    envelope.ciphertext = ciphertext;
    envelope.tag = tag;
    Ok(envelope)
}

/// Decrypt an envelope with the recipient's static secret.
///
/// # Arguments
///
/// * `envelope` - Parsed envelope; its header bytes are authenticated as AAD
/// * `recipient_secret` - The static key the envelope was sealed to
///
/// # Returns
///
/// The plaintext, or [`CryptoError::AuthenticationFailed`] when the tag,
/// header or key do not match
pub fn open(envelope: &EciesEnvelope, recipient_secret: &SecretKey) -> Result<Vec<u8>, CryptoError> {
    let secret = shared_secret(recipient_secret, &envelope.ephemeral_public_key)
        .ok_or(CryptoError::KeyAgreementFailed)?;
    let key = derive_symmetric_key(&secret)?;

    aes_gcm::decrypt(
        &envelope.ciphertext,
        &envelope.tag,
        &key,
        &envelope.nonce,
        &envelope.aad(),
    )
}

/// Parse the wire bytes and decrypt in one step
pub fn open_bytes(bytes: &[u8], recipient_secret: &SecretKey) -> Result<Vec<u8>, CryptoError> {
    let envelope = EciesEnvelope::decode(bytes)?;
    open(&envelope, recipient_secret)
}
