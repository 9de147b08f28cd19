// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persistence tests for the key-agreement key

use anyhow::Result;
use enclave_bridge::keystore::{
    KeyAgreementStore, KeyStore, KeyStoreError, UnavailableSigner, KEY_FILE_NAME,
};
use std::sync::Arc;

#[test]
fn test_same_key_within_process() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = KeyAgreementStore::new(dir.path());

    let first = store.get_or_create()?;
    let second = store.get_or_create()?;
    assert_eq!(first.public_key_bytes(), second.public_key_bytes());
    assert_eq!(first.public_key_bytes().len(), 33);
    Ok(())
}

#[test]
fn test_same_key_across_restarts() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let before = KeyAgreementStore::new(dir.path()).get_or_create()?;
    // A fresh store stands in for a restarted process
    let after = KeyAgreementStore::new(dir.path()).get_or_create()?;
    assert_eq!(before.public_key_bytes(), after.public_key_bytes());

    let raw = std::fs::read(dir.path().join(KEY_FILE_NAME))?;
    assert_eq!(raw.len(), 32);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_key_file_is_owner_only() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let store = KeyAgreementStore::new(dir.path().join("nested"));
    store.get_or_create()?;

    let mode = std::fs::metadata(store.path())?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    Ok(())
}

#[test]
fn test_corrupt_key_file_is_not_replaced() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(KEY_FILE_NAME);
    std::fs::write(&path, b"short")?;

    let result = KeyAgreementStore::new(dir.path()).get_or_create();
    assert!(matches!(result, Err(KeyStoreError::CorruptKey { .. })));
    assert_eq!(std::fs::read(&path)?, b"short");
    Ok(())
}

#[test]
fn test_concurrent_first_use_creates_one_key() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let keys = Arc::new(KeyStore::open(
        dir.path(),
        Arc::new(UnavailableSigner::default()),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let keys = keys.clone();
            std::thread::spawn(move || keys.key_agreement_keypair().map(|k| k.public_key_bytes()))
        })
        .collect();

    let mut public_keys = Vec::new();
    for handle in handles {
        public_keys.push(handle.join().expect("worker panicked")?);
    }
    public_keys.dedup();
    assert_eq!(public_keys.len(), 1);
    Ok(())
}
