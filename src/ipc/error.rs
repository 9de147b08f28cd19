// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Protocol Error Types
//!
//! Every variant is reported back to the caller as `{"error": ..., "code": ...}`.
//! None of them closes the connection; only transport failures do.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::keystore::{KeyStoreError, SignerError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame was not a JSON object, or exceeded the size limit
    #[error("Malformed request: {0}")]
    Framing(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// Bad base64, bad key bytes, or a binary envelope that does not parse
    #[error("Invalid {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error("ECDH failed")]
    KeyAgreementFailure,

    #[error("Decryption failed: authentication tag mismatch")]
    AuthenticationFailure,

    /// Passed through verbatim from the signer
    #[error("{0}")]
    HardwareUnavailable(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Peer public key not set")]
    PeerKeyNotSet,

    #[error("{0} not implemented")]
    NotImplemented(&'static str),

    #[error("{0} not supported on this platform")]
    NotSupported(&'static str),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl ProtocolError {
    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::Framing(_) => "FRAMING_ERROR",
            ProtocolError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            ProtocolError::MissingField(_) => "MISSING_FIELD",
            ProtocolError::InvalidEncoding { .. } => "INVALID_ENCODING",
            ProtocolError::KeyAgreementFailure => "KEY_AGREEMENT_FAILED",
            ProtocolError::AuthenticationFailure => "AUTHENTICATION_FAILED",
            ProtocolError::HardwareUnavailable(_) => "HARDWARE_UNAVAILABLE",
            ProtocolError::SigningFailed(_) => "SIGNING_FAILED",
            ProtocolError::PeerKeyNotSet => "PEER_KEY_NOT_SET",
            ProtocolError::NotImplemented(_) => "NOT_IMPLEMENTED",
            ProtocolError::NotSupported(_) => "NOT_SUPPORTED",
            ProtocolError::KeyStore(_) => "KEY_STORE_ERROR",
            ProtocolError::Crypto(_) => "CRYPTO_ERROR",
        }
    }
}

impl From<CryptoError> for ProtocolError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyAgreementFailed => ProtocolError::KeyAgreementFailure,
            CryptoError::AuthenticationFailed => ProtocolError::AuthenticationFailure,
            CryptoError::Decode(e) => ProtocolError::InvalidEncoding {
                field: "data",
                reason: e.to_string(),
            },
            other => ProtocolError::Crypto(other.to_string()),
        }
    }
}

impl From<SignerError> for ProtocolError {
    fn from(err: SignerError) -> Self {
        match &err {
            SignerError::HardwareUnavailable(_) => ProtocolError::HardwareUnavailable(err.to_string()),
            SignerError::SigningFailed(reason) => ProtocolError::SigningFailed(reason.clone()),
        }
    }
}

impl From<KeyStoreError> for ProtocolError {
    fn from(err: KeyStoreError) -> Self {
        ProtocolError::KeyStore(err.to_string())
    }
}
