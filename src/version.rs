// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Enclave Bridge

use std::sync::OnceLock;
use std::time::{Duration, Instant};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Service identifier reported by HEARTBEAT and METRICS
pub const SERVICE_NAME: &str = "enclave-bridge";

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-ecies-ipc-2025-11-02";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-11-02";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "unix-socket-ipc",
    "length-prefixed-json",
    "per-connection-sessions",
    "ecies-secp256k1",
    "hkdf-sha256",
    "aes-256-gcm",
    "persisted-key-agreement-key",
    "signer-capability",
];

/// `<os>-<arch>` of the running binary
pub fn platform() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Enclave Bridge {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Instant the process started, fixed by the first call (made early in `main`)
pub fn process_started_at() -> Instant {
    *PROCESS_START.get_or_init(Instant::now)
}

/// Time since [`process_started_at`]
pub fn process_uptime() -> Duration {
    process_started_at().elapsed()
}
