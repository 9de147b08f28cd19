// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Socket and key path resolution
//!
//! Socket order: explicit override → sandbox container
//! (`~/Library/Containers/<bundle>/Data`, only if it exists) → `~/.enclave-bridge`
//! → `/tmp`.

use std::path::{Path, PathBuf};

pub const SOCKET_FILE_NAME: &str = "enclave-bridge.sock";

/// Home-relative directory for the socket and key file
pub const HOME_DIR_NAME: &str = ".enclave-bridge";

pub const FALLBACK_SOCKET_PATH: &str = "/tmp/enclave-bridge.sock";
pub const FALLBACK_KEY_DIR: &str = "/tmp/enclave-bridge";

pub fn container_data_dir(home: &Path, bundle_id: &str) -> PathBuf {
    home.join("Library")
        .join("Containers")
        .join(bundle_id)
        .join("Data")
}

pub fn resolve_socket_path(
    override_path: Option<&Path>,
    home: Option<&Path>,
    bundle_id: &str,
) -> PathBuf {
    if let Some(path) = override_path {
        return path.to_path_buf();
    }

    if let Some(home) = home {
        let container = container_data_dir(home, bundle_id);
        if container.is_dir() {
            return container.join(SOCKET_FILE_NAME);
        }
        return home.join(HOME_DIR_NAME).join(SOCKET_FILE_NAME);
    }

    PathBuf::from(FALLBACK_SOCKET_PATH)
}

pub fn resolve_key_dir(override_dir: Option<&Path>, home: Option<&Path>) -> PathBuf {
    match (override_dir, home) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(home)) => home.join(HOME_DIR_NAME),
        (None, None) => PathBuf::from(FALLBACK_KEY_DIR),
    }
}
