// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bridge Configuration
//!
//! Loaded in three layers: built-in defaults, an optional TOML file named by
//! `ENCLAVE_BRIDGE_CONFIG` (table `[bridge]`), then individual environment
//! overrides.
//!
//! ```toml
//! [bridge]
//! socket_path = "/run/user/501/enclave-bridge.sock"
//! key_dir = "/Users/me/.enclave-bridge"
//! max_connections = 64
//! max_frame_bytes = 1048576
//! signer = "none"
//! ```

pub mod paths;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

pub use paths::{resolve_key_dir, resolve_socket_path, SOCKET_FILE_NAME};

pub const ENV_CONFIG_FILE: &str = "ENCLAVE_BRIDGE_CONFIG";
pub const ENV_SOCKET_PATH: &str = "ENCLAVE_BRIDGE_SOCKET";
pub const ENV_KEY_DIR: &str = "ENCLAVE_BRIDGE_KEY_DIR";
pub const ENV_MAX_CONNECTIONS: &str = "ENCLAVE_BRIDGE_MAX_CONNECTIONS";
pub const ENV_MAX_FRAME_BYTES: &str = "ENCLAVE_BRIDGE_MAX_FRAME_BYTES";
pub const ENV_SIGNER: &str = "ENCLAVE_BRIDGE_SIGNER";

/// Application bundle whose sandbox container may host the socket
pub const DEFAULT_BUNDLE_ID: &str = "com.enclave.bridge";

/// Which signing capability the daemon wires in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerKind {
    /// No signing hardware; signing commands report it unavailable
    #[default]
    None,
    /// In-memory ECDSA key, for development
    Software,
}

impl FromStr for SignerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "hardware" => Ok(SignerKind::None),
            "software" => Ok(SignerKind::Software),
            other => Err(anyhow!("unknown signer kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Explicit socket path; resolved from the environment when unset
    pub socket_path: Option<PathBuf>,
    /// Directory holding the key-agreement key file
    pub key_dir: Option<PathBuf>,
    pub max_connections: usize,
    pub max_frame_bytes: usize,
    pub signer: SignerKind,
    pub bundle_id: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            key_dir: None,
            max_connections: 64,
            max_frame_bytes: 1024 * 1024, // 1MB
            signer: SignerKind::None,
            bundle_id: DEFAULT_BUNDLE_ID.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    bridge: Option<BridgeConfig>,
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.bridge.unwrap_or_default())
    }

    /// Defaults, then the optional config file, then environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(ENV_CONFIG_FILE) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `ENCLAVE_BRIDGE_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = lookup(ENV_SOCKET_PATH) {
            self.socket_path = Some(PathBuf::from(val.trim()));
        }

        if let Some(val) = lookup(ENV_KEY_DIR) {
            self.key_dir = Some(PathBuf::from(val.trim()));
        }

        if let Some(val) = lookup(ENV_MAX_CONNECTIONS) {
            match val.trim().parse() {
                Ok(num) => self.max_connections = num,
                Err(_) => warn!("Ignoring invalid {}={}", ENV_MAX_CONNECTIONS, val),
            }
        }

        if let Some(val) = lookup(ENV_MAX_FRAME_BYTES) {
            match val.trim().parse() {
                Ok(num) => self.max_frame_bytes = num,
                Err(_) => warn!("Ignoring invalid {}={}", ENV_MAX_FRAME_BYTES, val),
            }
        }

        if let Some(val) = lookup(ENV_SIGNER) {
            match val.parse() {
                Ok(kind) => self.signer = kind,
                Err(e) => warn!("Ignoring {}: {}", ENV_SIGNER, e),
            }
        }
    }

    /// Socket path after applying the resolution order
    pub fn socket_path(&self) -> PathBuf {
        resolve_socket_path(
            self.socket_path.as_deref(),
            dirs::home_dir().as_deref(),
            &self.bundle_id,
        )
    }

    /// Key directory, defaulting to a home-relative location
    pub fn key_dir(&self) -> PathBuf {
        resolve_key_dir(self.key_dir.as_deref(), dirs::home_dir().as_deref())
    }
}
