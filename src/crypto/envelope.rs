// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECIES Envelope Wire Format
//!
//! **Layout** (all offsets in bytes):
//! ```text
//! [0]        version           (1)
//! [1]        cipher suite      (1)
//! [2]        encoding type     (Basic | WithLength | Multiple)
//! [3..3+N]   ephemeral pubkey  (N = 33 compressed 0x02/0x03, or 65 uncompressed 0x04)
//! [..+12]    nonce
//! [..+16]    authentication tag
//! [..+8]     ciphertext length, big-endian u64 (WithLength only)
//! [..]       ciphertext
//! ```
//!
//! The AEAD additional data is `[version, cipher_suite, encoding] || ephemeral_pubkey`,
//! computed by [`EciesEnvelope::aad`] only.

use super::aes_gcm::{NONCE_LEN, TAG_LEN};
use super::ecdh::{COMPRESSED_KEY_LEN, UNCOMPRESSED_KEY_LEN};
use super::error::DecodeError;

/// Envelope format version understood by this engine
pub const ENVELOPE_VERSION: u8 = 1;

/// secp256k1 ECDH + HKDF-SHA256 + AES-256-GCM
pub const CIPHER_SUITE_SECP256K1_AES256GCM: u8 = 1;

/// Size of the version / suite / encoding header
pub const HEADER_LEN: usize = 3;

/// Size of the explicit length field in the WithLength encoding
pub const LENGTH_FIELD_LEN: usize = 8;

/// How the ciphertext is delimited inside the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncodingType {
    /// Ciphertext runs to the end of the buffer
    Basic = 0x00,
    /// An 8-byte big-endian length precedes the ciphertext
    WithLength = 0x01,
    /// Reserved; parsed with the Basic layout
    Multiple = 0x02,
}

impl EncodingType {
    pub fn has_explicit_length(self) -> bool {
        matches!(self, EncodingType::WithLength)
    }
}

impl TryFrom<u8> for EncodingType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(EncodingType::Basic),
            0x01 => Ok(EncodingType::WithLength),
            0x02 => Ok(EncodingType::Multiple),
            other => Err(DecodeError::UnsupportedEncoding(other)),
        }
    }
}

/// One ECIES message, as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EciesEnvelope {
    pub version: u8,
    pub cipher_suite: u8,
    pub encoding: EncodingType,
    pub ephemeral_public_key: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl EciesEnvelope {
    /// Additional authenticated data bound into the AEAD tag
    pub fn aad(&self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(HEADER_LEN + self.ephemeral_public_key.len());
        aad.push(self.version);
        aad.push(self.cipher_suite);
        aad.push(self.encoding as u8);
        aad.extend_from_slice(&self.ephemeral_public_key);
        aad
    }

    /// Serialize to the wire layout.
    ///
    /// The explicit length field is written for [`EncodingType::WithLength`] only.
    pub fn encode(&self) -> Vec<u8> {
        let explicit = self.encoding.has_explicit_length();
        let mut out = Vec::with_capacity(
            HEADER_LEN
                + self.ephemeral_public_key.len()
                + NONCE_LEN
                + TAG_LEN
                + if explicit { LENGTH_FIELD_LEN } else { 0 }
                + self.ciphertext.len(),
        );

        out.push(self.version);
        out.push(self.cipher_suite);
        out.push(self.encoding as u8);
        out.extend_from_slice(&self.ephemeral_public_key);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        if explicit {
            out.extend_from_slice(&(self.ciphertext.len() as u64).to_be_bytes());
        }
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse an envelope from the wire layout.
    ///
    /// Only the structure is checked here; the tag is verified by
    /// [`open`](super::ecies::open).
    ///
    /// # Returns
    ///
    /// The envelope, or a [`DecodeError`] naming the first field that did not fit
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        // Header plus the key-format byte
        if bytes.len() < HEADER_LEN + 1 {
            return Err(DecodeError::TooShort {
                needed: HEADER_LEN + 1,
                actual: bytes.len(),
            });
        }

        let version = bytes[0];
        let cipher_suite = bytes[1];
        if version != ENVELOPE_VERSION || cipher_suite != CIPHER_SUITE_SECP256K1_AES256GCM {
            return Err(DecodeError::UnsupportedVersion {
                version,
                cipher_suite,
            });
        }
        let encoding = EncodingType::try_from(bytes[2])?;

        let key_len = match bytes[HEADER_LEN] {
            0x02 | 0x03 => COMPRESSED_KEY_LEN,
            0x04 => UNCOMPRESSED_KEY_LEN,
            other => return Err(DecodeError::UnrecognizedKeyFormat(other)),
        };

        let mut fixed = HEADER_LEN + key_len + NONCE_LEN + TAG_LEN;
        if encoding.has_explicit_length() {
            fixed += LENGTH_FIELD_LEN;
        }
        if bytes.len() < fixed {
            return Err(DecodeError::TooShort {
                needed: fixed,
                actual: bytes.len(),
            });
        }

        let mut offset = HEADER_LEN;
        let ephemeral_public_key = bytes[offset..offset + key_len].to_vec();
        offset += key_len;

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[offset..offset + NONCE_LEN]);
        offset += NONCE_LEN;

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[offset..offset + TAG_LEN]);
        offset += TAG_LEN;

        let ciphertext = if encoding.has_explicit_length() {
            let mut len_bytes = [0u8; LENGTH_FIELD_LEN];
            len_bytes.copy_from_slice(&bytes[offset..offset + LENGTH_FIELD_LEN]);
            offset += LENGTH_FIELD_LEN;

            let declared = u64::from_be_bytes(len_bytes);
            let available = bytes.len() - offset;
            if declared > available as u64 {
                return Err(DecodeError::LengthMismatch {
                    declared,
                    available,
                });
            }
            bytes[offset..offset + declared as usize].to_vec()
        } else {
            bytes[offset..].to_vec()
        };

        Ok(Self {
            version,
            cipher_suite,
            encoding,
            ephemeral_public_key,
            nonce,
            tag,
            ciphertext,
        })
    }
}
