// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Signing Capability
//!
//! The hardware-backed signing key lives outside this crate. The bridge only
//! sees it through [`Signer`]; whoever embeds the bridge injects the real
//! implementation. Two implementations ship here:
//!
//! - [`UnavailableSigner`]: reports the hardware as unreachable on every call
//! - [`SoftwareSigner`]: secp256k1 ECDSA over SHA-256 held in process memory,
//!   for development and tests

use k256::ecdsa::{signature::Signer as _, Signature, SigningKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// Failures reported by a signing capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The hardware key cannot be reached right now
    #[error("Hardware signer unavailable: {0}")]
    HardwareUnavailable(String),

    /// The signer was reached but refused or failed to sign
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// A signing key whose private half never leaves its holder
pub trait Signer: Send + Sync {
    /// Public half of the signing key, SEC1 encoded
    fn public_key(&self) -> Result<Vec<u8>, SignerError>;

    /// Sign `message`, returning an encoded signature
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;

    /// Whether the signer can currently be reached
    fn is_available(&self) -> bool {
        self.public_key().is_ok()
    }
}

/// Signer for hosts without signing hardware
#[derive(Debug, Clone)]
pub struct UnavailableSigner {
    reason: String,
}

impl UnavailableSigner {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableSigner {
    fn default() -> Self {
        Self::new(format!(
            "no hardware signer on this platform ({})",
            std::env::consts::OS
        ))
    }
}

impl Signer for UnavailableSigner {
    fn public_key(&self) -> Result<Vec<u8>, SignerError> {
        Err(SignerError::HardwareUnavailable(self.reason.clone()))
    }

    fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Err(SignerError::HardwareUnavailable(self.reason.clone()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// In-memory ECDSA signer standing in for the hardware key
pub struct SoftwareSigner {
    key: SigningKey,
}

impl SoftwareSigner {
    pub fn random() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| SignerError::SigningFailed(format!("invalid signing key: {}", e)))?;
        Ok(Self { key })
    }
}

impl Signer for SoftwareSigner {
    /// Uncompressed SEC1 point (65 bytes)
    fn public_key(&self) -> Result<Vec<u8>, SignerError> {
        Ok(self
            .key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }

    /// DER-encoded ECDSA signature over SHA-256(message)
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        let signature: Signature = self
            .key
            .try_sign(message)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}
