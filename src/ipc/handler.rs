// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-session command dispatcher
//!
//! One `ProtocolHandler` exists per connection and owns that connection's
//! [`Session`]. The only state change a request can cause is setting the
//! session's peer key (SET_PEER_PUBLIC_KEY); the persisted keys are read-only
//! from here.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::ProtocolError;
use super::metrics::BridgeMetrics;
use super::protocol::{Command, KeyEntry, Response};
use super::session::Session;
use crate::crypto::{self, EncodingType};
use crate::keystore::KeyStore;
use crate::version::{self, SERVICE_NAME};

pub const KEY_AGREEMENT_KEY_ID: &str = "key-agreement";
pub const ENCLAVE_SIGNING_KEY_ID: &str = "enclave-signing";

pub struct ProtocolHandler {
    session: Session,
    keys: Arc<KeyStore>,
    metrics: Arc<BridgeMetrics>,
}

impl ProtocolHandler {
    pub fn new(session: Session, keys: Arc<KeyStore>, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            session,
            keys,
            metrics,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handle one frame payload; always produces a response
    pub fn handle_frame(&mut self, payload: &[u8]) -> Response {
        self.begin_request();
        let result = Command::parse(payload).and_then(|command| {
            debug!("[{}] {}", self.session.id(), command.name());
            self.dispatch(command)
        });
        self.finish(result)
    }

    /// Answer a frame that never reached the parser (e.g. over the size limit)
    pub fn reject_frame(&mut self, error: ProtocolError) -> Response {
        self.begin_request();
        self.finish(Err(error))
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Response, ProtocolError> {
        match command {
            Command::Heartbeat => Ok(self.heartbeat()),
            Command::Version => Ok(self.version()),
            Command::Status => Ok(self.status()),
            Command::Metrics => Ok(self.metrics()),
            Command::GetPublicKey => self.get_public_key(),
            Command::GetEnclavePublicKey => self.get_enclave_public_key(),
            Command::ListKeys => self.list_keys(),
            Command::SetPeerPublicKey { public_key } => self.set_peer_public_key(public_key),
            Command::EnclaveSign { data } => self.sign(data),
            Command::EnclaveEncrypt { data } => self.encrypt(data),
            Command::EnclaveDecrypt { data } => self.decrypt(data),
            Command::EnclaveGenerateKey => Err(ProtocolError::NotImplemented("Key generation")),
            Command::EnclaveRotateKey => Err(ProtocolError::NotSupported("Key rotation")),
        }
    }

    fn begin_request(&mut self) {
        self.session.record_request();
        self.metrics.record_request();
    }

    fn finish(&self, result: Result<Response, ProtocolError>) -> Response {
        match result {
            Ok(response) => response,
            Err(err) => {
                self.metrics.record_error();
                warn!("[{}] request failed: {}", self.session.id(), err);
                Response::from(err)
            }
        }
    }

    fn heartbeat(&self) -> Response {
        Response::Heartbeat {
            ok: true,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            service: SERVICE_NAME,
        }
    }

    fn version(&self) -> Response {
        Response::Version {
            version: version::VERSION_NUMBER,
            build: version::VERSION,
            date: version::BUILD_DATE,
            platform: version::platform(),
            features: version::FEATURES,
            uptime_seconds: version::process_uptime().as_secs(),
        }
    }

    fn status(&self) -> Response {
        Response::Status {
            ok: true,
            peer_public_key_set: self.session.has_peer_public_key(),
            enclave_available: self.keys.signer().is_available(),
        }
    }

    fn metrics(&self) -> Response {
        Response::Metrics {
            uptime_seconds: self.metrics.uptime().as_secs(),
            service: SERVICE_NAME,
            session_requests: self.session.request_count(),
            counters: self.metrics.counters(),
        }
    }

    fn get_public_key(&self) -> Result<Response, ProtocolError> {
        let keypair = self.keys.key_agreement_keypair()?;
        Ok(Response::PublicKey {
            public_key: BASE64.encode(keypair.public_key_bytes()),
        })
    }

    fn get_enclave_public_key(&self) -> Result<Response, ProtocolError> {
        let public_key = self.keys.signer().public_key()?;
        Ok(Response::PublicKey {
            public_key: BASE64.encode(public_key),
        })
    }

    fn list_keys(&self) -> Result<Response, ProtocolError> {
        let keypair = self.keys.key_agreement_keypair()?;
        let mut keys = vec![KeyEntry {
            id: KEY_AGREEMENT_KEY_ID,
            key_type: "secp256k1-ecdh",
            public_key: BASE64.encode(keypair.public_key_bytes()),
        }];

        if let Ok(public_key) = self.keys.signer().public_key() {
            keys.push(KeyEntry {
                id: ENCLAVE_SIGNING_KEY_ID,
                key_type: "ecdsa-signing",
                public_key: BASE64.encode(public_key),
            });
        }

        Ok(Response::Keys { keys })
    }

    fn set_peer_public_key(&mut self, public_key: Option<String>) -> Result<Response, ProtocolError> {
        let encoded = public_key.ok_or(ProtocolError::MissingField("publicKey"))?;
        let bytes = decode_base64("publicKey", &encoded)?;

        crypto::parse_public_key(&bytes).map_err(|e| ProtocolError::InvalidEncoding {
            field: "publicKey",
            reason: e.to_string(),
        })?;

        self.session.set_peer_public_key(bytes);
        debug!("[{}] peer public key set", self.session.id());
        Ok(Response::Ok { ok: true })
    }

    fn sign(&self, data: Option<String>) -> Result<Response, ProtocolError> {
        let message = decode_base64("data", &data.ok_or(ProtocolError::MissingField("data"))?)?;

        match self.keys.signer().sign(&message) {
            Ok(signature) => {
                self.metrics.record_sign(true);
                Ok(Response::Signature {
                    signature: BASE64.encode(signature),
                })
            }
            Err(e) => {
                self.metrics.record_sign(false);
                Err(e.into())
            }
        }
    }

    fn encrypt(&self, data: Option<String>) -> Result<Response, ProtocolError> {
        let plaintext = decode_base64("data", &data.ok_or(ProtocolError::MissingField("data"))?)?;
        let peer = self
            .session
            .peer_public_key()
            .ok_or(ProtocolError::PeerKeyNotSet)?;

        let envelope = crypto::seal(&plaintext, peer, EncodingType::Basic)?;
        self.metrics.record_encrypt();
        Ok(Response::Ciphertext {
            ciphertext: BASE64.encode(envelope.encode()),
        })
    }

    fn decrypt(&self, data: Option<String>) -> Result<Response, ProtocolError> {
        let wire = decode_base64("data", &data.ok_or(ProtocolError::MissingField("data"))?)?;
        let keypair = self.keys.key_agreement_keypair()?;

        match crypto::open_bytes(&wire, keypair.secret()) {
            Ok(plaintext) => {
                self.metrics.record_decrypt(true);
                Ok(Response::Plaintext {
                    plaintext: BASE64.encode(plaintext),
                })
            }
            Err(e) => {
                self.metrics.record_decrypt(false);
                Err(e.into())
            }
        }
    }
}

fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>, ProtocolError> {
    BASE64
        .decode(value.trim())
        .map_err(|e| ProtocolError::InvalidEncoding {
            field,
            reason: format!("bad base64: {}", e),
        })
}
