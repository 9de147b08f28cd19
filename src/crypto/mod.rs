// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECIES Engine
//!
//! Pure cryptographic building blocks for the bridge. Nothing here performs
//! I/O or holds shared state.
//!
//! - **Envelope**: bit-exact binary codec for the ECIES message format
//! - **ECDH**: secp256k1 key agreement plus HKDF-SHA256 key derivation
//! - **AES-GCM**: AES-256-GCM with a detached 16-byte tag and 12-byte nonce
//! - **ECIES**: `seal` / `open` composed from the above
//!
//! ## Security Considerations
//!
//! - Every sealed message uses a fresh ephemeral keypair and nonce
//! - Decryption fails closed on any tag or AAD mismatch
//! - The envelope header and ephemeral key are bound into the tag as AAD

pub mod aes_gcm;
pub mod ecdh;
pub mod ecies;
pub mod envelope;
pub mod error;

pub use ecdh::{derive_symmetric_key, ephemeral_keypair, parse_public_key, shared_secret};
pub use ecies::{open, open_bytes, seal};
pub use envelope::{EciesEnvelope, EncodingType};
pub use error::{CryptoError, DecodeError};
