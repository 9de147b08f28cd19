// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Store
//!
//! Supplies the two keys the bridge works with:
//!
//! - **Key agreement**: secp256k1 keypair owned and persisted by the bridge
//! - **Signing**: an injected [`Signer`] whose key never enters this process
//!
//! A single `KeyStore` is shared (behind `Arc`) by every connection. Nothing
//! reachable from a request can replace either key.

pub mod agreement;
pub mod error;
pub mod signer;

use std::path::Path;
use std::sync::Arc;

pub use agreement::{AgreementKeyPair, KeyAgreementStore, KEY_FILE_NAME};
pub use error::KeyStoreError;
pub use signer::{Signer, SignerError, SoftwareSigner, UnavailableSigner};

pub struct KeyStore {
    agreement: KeyAgreementStore,
    signer: Arc<dyn Signer>,
}

impl KeyStore {
    pub fn new(agreement: KeyAgreementStore, signer: Arc<dyn Signer>) -> Self {
        Self { agreement, signer }
    }

    /// Key store whose key-agreement key lives in `key_dir`
    pub fn open(key_dir: impl AsRef<Path>, signer: Arc<dyn Signer>) -> Self {
        Self::new(KeyAgreementStore::new(key_dir), signer)
    }

    pub fn key_agreement_keypair(&self) -> Result<Arc<AgreementKeyPair>, KeyStoreError> {
        self.agreement.get_or_create()
    }

    pub fn key_agreement_path(&self) -> &Path {
        self.agreement.path()
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("key_agreement_path", &self.agreement.path())
            .field("signer_available", &self.signer.is_available())
            .finish()
    }
}
