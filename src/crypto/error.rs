// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error types for the ECIES engine and its wire codec.
//!
//! ## Error Variants
//!
//! - **DecodeError**: the binary envelope could not be parsed (too short, bad key prefix,
//!   explicit length larger than the buffer, unknown header values)
//! - **CryptoError**: key agreement, key derivation or AEAD failed
//!
//! Both are recoverable: the protocol layer turns them into an error response
//! and keeps the connection open.

use thiserror::Error;

/// Failure to parse an ECIES envelope from bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer is shorter than the fixed part of the layout
    #[error("Envelope too short: need at least {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    /// Byte after the header is not 0x02, 0x03 or 0x04
    #[error("Unrecognized ephemeral key format: leading byte 0x{0:02x}")]
    UnrecognizedKeyFormat(u8),

    /// Explicit length field claims more bytes than remain
    #[error("Ciphertext length mismatch: header declares {declared} bytes, {available} available")]
    LengthMismatch { declared: u64, available: usize },

    /// Version or cipher suite byte is not one this engine speaks
    #[error("Unsupported envelope version {version} / cipher suite {cipher_suite}")]
    UnsupportedVersion { version: u8, cipher_suite: u8 },

    /// Encoding type byte is outside the reserved tag values
    #[error("Unsupported encoding type 0x{0:02x}")]
    UnsupportedEncoding(u8),
}

/// Failure inside the cryptographic transformations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key has wrong length or is not a valid curve point / scalar
    #[error("Invalid key ({key_type}): {reason}")]
    InvalidKey { key_type: String, reason: String },

    /// ECDH produced no shared secret
    #[error("ECDH failed")]
    KeyAgreementFailed,

    /// HKDF expansion failed
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// AEAD encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// AEAD tag or AAD mismatch
    #[error("Decryption failed: authentication tag mismatch")]
    AuthenticationFailed,

    /// Envelope could not be parsed
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl CryptoError {
    pub fn invalid_key(key_type: &str, reason: impl Into<String>) -> Self {
        CryptoError::InvalidKey {
            key_type: key_type.to_string(),
            reason: reason.into(),
        }
    }
}
