// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Command and Response Types
//!
//! A request is a JSON object with a `cmd` string plus command-specific
//! fields (`data`, `publicKey`). Binary values travel as standard base64.
//! A response is a JSON object carrying either the command's result fields
//! or `error` (with a machine-readable `code`).

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::error::ProtocolError;

/// Request fields that carry base64 payloads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFields {
    pub data: Option<String>,
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Heartbeat,
    Version,
    Status,
    Metrics,
    GetPublicKey,
    GetEnclavePublicKey,
    ListKeys,
    SetPeerPublicKey { public_key: Option<String> },
    EnclaveSign { data: Option<String> },
    EnclaveEncrypt { data: Option<String> },
    EnclaveDecrypt { data: Option<String> },
    EnclaveGenerateKey,
    EnclaveRotateKey,
}

impl Command {
    /// Parse one frame payload into a command
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| ProtocolError::Framing(format!("invalid JSON: {}", e)))?;
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::Framing("request must be a JSON object".to_string()))?;

        let cmd = match object.get("cmd") {
            None | Some(Value::Null) => return Err(ProtocolError::MissingField("cmd")),
            Some(Value::String(cmd)) => cmd.as_str(),
            Some(_) => {
                return Err(ProtocolError::InvalidEncoding {
                    field: "cmd",
                    reason: "expected a string".to_string(),
                })
            }
        };

        let fields = RequestFields {
            data: string_field(object, "data")?,
            public_key: string_field(object, "publicKey")?,
        };
        Self::from_parts(cmd, fields)
    }

    pub fn from_parts(cmd: &str, fields: RequestFields) -> Result<Self, ProtocolError> {
        let command = match cmd {
            "HEARTBEAT" | "PING" => Command::Heartbeat,
            "VERSION" | "INFO" => Command::Version,
            "STATUS" => Command::Status,
            "METRICS" => Command::Metrics,
            "GET_PUBLIC_KEY" => Command::GetPublicKey,
            "GET_ENCLAVE_PUBLIC_KEY" => Command::GetEnclavePublicKey,
            "LIST_KEYS" => Command::ListKeys,
            "SET_PEER_PUBLIC_KEY" => Command::SetPeerPublicKey {
                public_key: fields.public_key.or(fields.data),
            },
            "ENCLAVE_SIGN" => Command::EnclaveSign { data: fields.data },
            "ENCLAVE_ENCRYPT" => Command::EnclaveEncrypt { data: fields.data },
            "ENCLAVE_DECRYPT" => Command::EnclaveDecrypt { data: fields.data },
            "ENCLAVE_GENERATE_KEY" => Command::EnclaveGenerateKey,
            "ENCLAVE_ROTATE_KEY" => Command::EnclaveRotateKey,
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Heartbeat => "HEARTBEAT",
            Command::Version => "VERSION",
            Command::Status => "STATUS",
            Command::Metrics => "METRICS",
            Command::GetPublicKey => "GET_PUBLIC_KEY",
            Command::GetEnclavePublicKey => "GET_ENCLAVE_PUBLIC_KEY",
            Command::ListKeys => "LIST_KEYS",
            Command::SetPeerPublicKey { .. } => "SET_PEER_PUBLIC_KEY",
            Command::EnclaveSign { .. } => "ENCLAVE_SIGN",
            Command::EnclaveEncrypt { .. } => "ENCLAVE_ENCRYPT",
            Command::EnclaveDecrypt { .. } => "ENCLAVE_DECRYPT",
            Command::EnclaveGenerateKey => "ENCLAVE_GENERATE_KEY",
            Command::EnclaveRotateKey => "ENCLAVE_ROTATE_KEY",
        }
    }
}

fn string_field(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ProtocolError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ProtocolError::InvalidEncoding {
            field,
            reason: "expected a base64 string".to_string(),
        }),
    }
}

/// Entry returned by LIST_KEYS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEntry {
    pub id: &'static str,
    #[serde(rename = "type")]
    pub key_type: &'static str,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Heartbeat {
        ok: bool,
        timestamp: String,
        service: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Version {
        version: &'static str,
        build: &'static str,
        date: &'static str,
        platform: String,
        features: &'static [&'static str],
        uptime_seconds: u64,
    },
    #[serde(rename_all = "camelCase")]
    Status {
        ok: bool,
        peer_public_key_set: bool,
        enclave_available: bool,
    },
    #[serde(rename_all = "camelCase")]
    Metrics {
        uptime_seconds: u64,
        service: &'static str,
        session_requests: u64,
        counters: BTreeMap<&'static str, u64>,
    },
    #[serde(rename_all = "camelCase")]
    PublicKey { public_key: String },
    Keys { keys: Vec<KeyEntry> },
    Ok { ok: bool },
    Signature { signature: String },
    Ciphertext { ciphertext: String },
    Plaintext { plaintext: String },
    Error { error: String, code: &'static str },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    /// JSON bytes for the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize response: {}", e);
            br#"{"error":"Internal serialization error","code":"INTERNAL"}"#.to_vec()
        })
    }
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        Response::Error {
            error: err.to_string(),
            code: err.code(),
        }
    }
}
