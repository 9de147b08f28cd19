// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persisted Key-Agreement Key
//!
//! The bridge owns one secp256k1 key-agreement keypair. Its private scalar is
//! stored as raw 32 bytes in `<key_dir>/key-agreement.key`, readable and
//! writable by the owner only.
//!
//! ## Lifecycle
//!
//! - First access with no file: generate, persist atomically, use
//! - Every later access (and every restart): load the file
//! - A file of the wrong size or holding an invalid scalar is an error; the
//!   key is never regenerated behind the operator's back
//!
//! ## Security Considerations
//!
//! - The scalar is NEVER logged or returned over the socket
//! - Only one worker runs the generate-and-persist sequence

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use k256::{PublicKey, SecretKey};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::error::KeyStoreError;
use crate::crypto::ecdh::encode_public_key;

/// File name of the persisted private scalar
pub const KEY_FILE_NAME: &str = "key-agreement.key";

/// Size of the persisted private scalar
pub const PRIVATE_KEY_LEN: usize = 32;

/// The bridge's static key-agreement keypair
#[derive(Clone)]
pub struct AgreementKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl AgreementKeyPair {
    /// Build a keypair from a raw 32-byte scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_LEN,
                bytes.len()
            ));
        }
        let secret = SecretKey::from_slice(bytes).map_err(|e| format!("invalid scalar: {}", e))?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    pub fn generate() -> Self {
        let (secret, public) = crate::crypto::ephemeral_keypair();
        Self { secret, public }
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// SEC1 compressed public key (33 bytes)
    pub fn public_key_bytes(&self) -> Vec<u8> {
        encode_public_key(&self.public, true)
    }
}

impl fmt::Debug for AgreementKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgreementKeyPair")
            .field("public", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// Loads or creates the key-agreement keypair, once per process
pub struct KeyAgreementStore {
    path: PathBuf,
    keypair: OnceLock<Arc<AgreementKeyPair>>,
    init_lock: Mutex<()>,
}

impl KeyAgreementStore {
    /// Store backed by `<key_dir>/key-agreement.key`
    pub fn new(key_dir: impl AsRef<Path>) -> Self {
        Self {
            path: key_dir.as_ref().join(KEY_FILE_NAME),
            keypair: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the keypair, loading or creating the key file on first use
    pub fn get_or_create(&self) -> Result<Arc<AgreementKeyPair>, KeyStoreError> {
        if let Some(keypair) = self.keypair.get() {
            return Ok(keypair.clone());
        }

        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| KeyStoreError::LockPoisoned)?;

        // Another worker may have finished while we waited
        if let Some(keypair) = self.keypair.get() {
            return Ok(keypair.clone());
        }

        let keypair = if self.path.exists() {
            self.load()?
        } else {
            self.create()?
        };

        let keypair = Arc::new(keypair);
        let _ = self.keypair.set(keypair.clone());
        Ok(keypair)
    }

    fn load(&self) -> Result<AgreementKeyPair, KeyStoreError> {
        let bytes = fs::read(&self.path).map_err(|e| KeyStoreError::io(&self.path, e))?;
        warn_if_permissive(&self.path);

        let keypair =
            AgreementKeyPair::from_bytes(&bytes).map_err(|reason| KeyStoreError::CorruptKey {
                path: self.path.clone(),
                reason,
            })?;
        info!(
            "Loaded key-agreement key from {} (public key {})",
            self.path.display(),
            hex::encode(keypair.public_key_bytes())
        );
        Ok(keypair)
    }

    fn create(&self) -> Result<AgreementKeyPair, KeyStoreError> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        // Only a directory we create ourselves is tightened; an existing one
        // belongs to the operator
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| KeyStoreError::io(&dir, e))?;
            restrict_dir(&dir);
        }

        let keypair = AgreementKeyPair::generate();

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| KeyStoreError::io(&dir, e))?;
        restrict_file(tmp.path()).map_err(|e| KeyStoreError::io(tmp.path(), e))?;
        tmp.write_all(&keypair.secret.to_bytes())
            .map_err(|e| KeyStoreError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| KeyStoreError::io(tmp.path(), e))?;

        match tmp.persist_noclobber(&self.path) {
            Ok(_) => {
                info!(
                    "Created key-agreement key at {} (public key {})",
                    self.path.display(),
                    hex::encode(keypair.public_key_bytes())
                );
                Ok(keypair)
            }
            // Another process won the race; its key is the one on disk
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => self.load(),
            Err(e) => Err(KeyStoreError::io(&self.path, e.error)),
        }
    }
}

#[cfg(unix)]
fn restrict_file(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_file(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn restrict_dir(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o700)) {
        warn!("Could not restrict key directory {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn restrict_dir(_path: &Path) {}

#[cfg(unix)]
fn warn_if_permissive(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mode = meta.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                "Key file {} has permissive mode {:o}; expected 600",
                path.display(),
                mode
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_if_permissive(_path: &Path) {}
