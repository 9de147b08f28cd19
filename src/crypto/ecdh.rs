// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Agreement and Key Derivation
//!
//! Elliptic Curve Diffie-Hellman over secp256k1 followed by HKDF-SHA256.
//! The recipient holds a static key-agreement key; every sealed message
//! carries a fresh ephemeral public key, so each message gets its own
//! symmetric key.

use hkdf::Hkdf;
use k256::{ecdh::diffie_hellman, elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::Sha256;

use super::error::CryptoError;

/// Length of a SEC1 compressed secp256k1 point
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Length of a SEC1 uncompressed secp256k1 point
pub const UNCOMPRESSED_KEY_LEN: usize = 65;

/// Length of the ECDH output (x-coordinate of the shared point)
pub const SHARED_SECRET_LEN: usize = 32;

/// Length of the derived AES-256 key
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// HKDF context string; changing it breaks every existing client.
pub const HKDF_INFO: &[u8] = b"enclave-bridge/ecies/v1";

/// Generate a fresh key-agreement keypair for a single message.
pub fn ephemeral_keypair() -> (SecretKey, PublicKey) {
    let secret = SecretKey::random(&mut OsRng);
    let public = secret.public_key();
    (secret, public)
}

/// Parse a SEC1-encoded secp256k1 public key (33 or 65 bytes)
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    if bytes.len() != COMPRESSED_KEY_LEN && bytes.len() != UNCOMPRESSED_KEY_LEN {
        return Err(CryptoError::invalid_key(
            "public_key",
            format!(
                "expected {} or {} bytes, got {}",
                COMPRESSED_KEY_LEN,
                UNCOMPRESSED_KEY_LEN,
                bytes.len()
            ),
        ));
    }

    PublicKey::from_sec1_bytes(bytes)
        .map_err(|e| CryptoError::invalid_key("public_key", format!("not a curve point: {}", e)))
}

/// Encode a public key as SEC1 bytes
pub fn encode_public_key(public: &PublicKey, compressed: bool) -> Vec<u8> {
    public.to_encoded_point(compressed).as_bytes().to_vec()
}

/// Compute the ECDH shared secret between `private` and a SEC1 peer key.
///
/// Returns only the raw 32-byte x-coordinate of the shared point (the parity
/// prefix of the compressed encoding is not part of the secret).
///
/// # Arguments
///
/// * `private` - Our side of the exchange (static or ephemeral)
/// * `peer_public` - Peer's SEC1 public key (33 or 65 bytes)
///
/// # Returns
///
/// The 32-byte secret, or `None` when the peer key cannot be parsed; callers
/// treat that as "ECDH failed"
pub fn shared_secret(private: &SecretKey, peer_public: &[u8]) -> Option<[u8; SHARED_SECRET_LEN]> {
    let peer = parse_public_key(peer_public).ok()?;

    let shared = diffie_hellman(private.to_nonzero_scalar(), peer.as_affine());
    let raw = shared.raw_secret_bytes();
    if raw.len() != SHARED_SECRET_LEN {
        return None;
    }

    let mut secret = [0u8; SHARED_SECRET_LEN];
    secret.copy_from_slice(raw);
    Some(secret)
}

/// Derive the AEAD key from an ECDH shared secret.
///
/// HKDF-SHA256 with an empty salt and [`HKDF_INFO`] as context. Deterministic.
pub fn derive_symmetric_key(
    shared_secret: &[u8; SHARED_SECRET_LEN],
) -> Result<[u8; SYMMETRIC_KEY_LEN], CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; SYMMETRIC_KEY_LEN];
    hkdf.expand(HKDF_INFO, &mut key)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    Ok(key)
}
