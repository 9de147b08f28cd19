// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod config;
pub mod crypto;
pub mod ipc;
pub mod keystore;
pub mod version;

pub use config::{BridgeConfig, SignerKind};
pub use crypto::{CryptoError, DecodeError, EciesEnvelope, EncodingType};
pub use ipc::{ConnectionServer, ProtocolError, ServerConfig, ServerHandle};
pub use keystore::{KeyStore, Signer, SignerError, SoftwareSigner, UnavailableSigner};
