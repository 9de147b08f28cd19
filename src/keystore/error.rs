// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or creating the persisted key-agreement key
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// Filesystem access failed
    #[error("Key store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key file exists but does not hold a usable scalar
    #[error("Persisted key at {} is corrupt: {reason}", path.display())]
    CorruptKey { path: PathBuf, reason: String },

    /// A worker panicked while holding the key-creation lock
    #[error("Key store lock poisoned")]
    LockPoisoned,
}

impl KeyStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KeyStoreError::Io {
            path: path.into(),
            source,
        }
    }
}
