// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Injecting a signing capability through the key store

use enclave_bridge::ipc::{BridgeMetrics, ProtocolHandler, Response, Session};
use enclave_bridge::keystore::{KeyStore, Signer, SignerError, SoftwareSigner};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Software signer that can be switched off, like hardware going to sleep
struct SwitchableSigner {
    inner: SoftwareSigner,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl SwitchableSigner {
    fn new() -> Self {
        Self {
            inner: SoftwareSigner::random(),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    fn check(&self) -> Result<(), SignerError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SignerError::HardwareUnavailable("device asleep".to_string()))
        }
    }
}

impl Signer for SwitchableSigner {
    fn public_key(&self) -> Result<Vec<u8>, SignerError> {
        self.check()?;
        self.inner.public_key()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.sign(message)
    }
}

#[test]
fn test_signer_outage_reported_per_request() {
    let dir = tempfile::tempdir().unwrap();
    let signer = Arc::new(SwitchableSigner::new());
    let keys = Arc::new(KeyStore::open(dir.path(), signer.clone()));
    let metrics = Arc::new(BridgeMetrics::new());
    let mut handler = ProtocolHandler::new(Session::default(), keys.clone(), metrics.clone());

    let request = br#"{"cmd":"ENCLAVE_SIGN","data":"aGVsbG8="}"#;
    assert!(matches!(handler.handle_frame(request), Response::Signature { .. }));

    signer.online.store(false, Ordering::SeqCst);
    assert!(!keys.signer().is_available());
    match handler.handle_frame(request) {
        Response::Error { error, code } => {
            assert_eq!(code, "HARDWARE_UNAVAILABLE");
            assert_eq!(error, "Hardware signer unavailable: device asleep");
        }
        other => panic!("expected error, got {:?}", other),
    }

    // The outage does not poison the session
    signer.online.store(true, Ordering::SeqCst);
    assert!(matches!(handler.handle_frame(request), Response::Signature { .. }));

    assert_eq!(signer.calls.load(Ordering::SeqCst), 3);
    let counters = metrics.counters();
    assert_eq!(counters["signOk"], 2);
    assert_eq!(counters["signFailed"], 1);
}
