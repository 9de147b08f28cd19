// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Service-wide counters reported by the METRICS command
#[derive(Debug)]
pub struct BridgeMetrics {
    started_at: Instant,
    connections_accepted: AtomicU64,
    connections_active: AtomicU64,
    connections_rejected: AtomicU64,
    requests_total: AtomicU64,
    errors_total: AtomicU64,
    decrypt_ok: AtomicU64,
    decrypt_failed: AtomicU64,
    encrypt_ok: AtomicU64,
    sign_ok: AtomicU64,
    sign_failed: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            started_at: crate::version::process_started_at(),
            connections_accepted: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            decrypt_ok: AtomicU64::new(0),
            decrypt_failed: AtomicU64::new(0),
            encrypt_ok: AtomicU64::new(0),
            sign_ok: AtomicU64::new(0),
            sign_failed: AtomicU64::new(0),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // Saturating: never wrap below zero
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decrypt(&self, ok: bool) {
        let counter = if ok { &self.decrypt_ok } else { &self.decrypt_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encrypt(&self) {
        self.encrypt_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sign(&self, ok: bool) {
        let counter = if ok { &self.sign_ok } else { &self.sign_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u64 {
        self.connections_active.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn counters(&self) -> BTreeMap<&'static str, u64> {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        BTreeMap::from([
            ("connectionsAccepted", load(&self.connections_accepted)),
            ("connectionsActive", load(&self.connections_active)),
            ("connectionsRejected", load(&self.connections_rejected)),
            ("requestsTotal", load(&self.requests_total)),
            ("errorsTotal", load(&self.errors_total)),
            ("decryptOk", load(&self.decrypt_ok)),
            ("decryptFailed", load(&self.decrypt_failed)),
            ("encryptOk", load(&self.encrypt_ok)),
            ("signOk", load(&self.sign_ok)),
            ("signFailed", load(&self.sign_failed)),
        ])
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
