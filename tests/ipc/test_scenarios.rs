// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request/response scenarios over a live socket

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use enclave_bridge::crypto::{ecdh::encode_public_key, ephemeral_keypair, seal, EncodingType};
use enclave_bridge::keystore::SoftwareSigner;
use serde_json::json;
use std::sync::Arc;

use super::client::{BridgeOptions, TestBridge};

async fn server_public_key(client: &mut super::client::TestClient) -> Result<Vec<u8>> {
    let response = client.request(json!({"cmd": "GET_PUBLIC_KEY"})).await?;
    let encoded = response["publicKey"].as_str().expect("publicKey missing");
    Ok(BASE64.decode(encoded)?)
}

#[tokio::test]
async fn test_heartbeat() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    let response = client.request(json!({"cmd": "HEARTBEAT"})).await?;
    assert_eq!(response["ok"], true);
    assert_eq!(response["service"], "enclave-bridge");
    let timestamp = response["timestamp"].as_str().expect("timestamp missing");
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    bridge.shutdown().await
}

#[tokio::test]
async fn test_status_tracks_peer_key() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    let status = client.request(json!({"cmd": "STATUS"})).await?;
    assert_eq!(status["peerPublicKeySet"], false);

    let (_, peer) = ephemeral_keypair();
    let peer_key = encode_public_key(&peer, true);
    assert_eq!(peer_key.len(), 33);

    let response = client
        .request(json!({"cmd": "SET_PEER_PUBLIC_KEY", "publicKey": BASE64.encode(&peer_key)}))
        .await?;
    assert_eq!(response["ok"], true);

    let status = client.request(json!({"cmd": "STATUS"})).await?;
    assert_eq!(status["peerPublicKeySet"], true);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_decrypt_for_other_recipient_fails() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    // Recipient A is not the server's key B
    let (_, other) = ephemeral_keypair();
    let wire = seal(b"not for you", &encode_public_key(&other, true), EncodingType::Basic)?.encode();

    let response = client
        .request(json!({"cmd": "ENCLAVE_DECRYPT", "data": BASE64.encode(wire)}))
        .await?;
    assert!(response.get("error").is_some());
    assert!(response.get("plaintext").is_none());

    bridge.shutdown().await
}

#[tokio::test]
async fn test_sign_without_data() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    let response = client.request(json!({"cmd": "ENCLAVE_SIGN"})).await?;
    let error = response["error"].as_str().expect("error missing");
    assert!(error.contains("Missing"));
    assert!(error.contains("data"));

    bridge.shutdown().await
}

#[tokio::test]
async fn test_unknown_command() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    let response = client.request(json!({"cmd": "BOGUS"})).await?;
    let error = response["error"].as_str().expect("error missing");
    assert!(error.contains("Unknown command"));
    assert!(error.contains("BOGUS"));
    assert_eq!(response["code"], "UNKNOWN_COMMAND");

    bridge.shutdown().await
}

#[tokio::test]
async fn test_decrypt_roundtrip() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    let server_key = server_public_key(&mut client).await?;
    let message = "Grüße aus der Enclave ✓";

    for encoding in [EncodingType::Basic, EncodingType::WithLength] {
        let wire = seal(message.as_bytes(), &server_key, encoding)?.encode();
        let response = client
            .request(json!({"cmd": "ENCLAVE_DECRYPT", "data": BASE64.encode(wire)}))
            .await?;

        let plaintext = BASE64.decode(response["plaintext"].as_str().expect("plaintext missing"))?;
        assert_eq!(String::from_utf8(plaintext)?, message);
    }

    bridge.shutdown().await
}

#[tokio::test]
async fn test_version_and_metrics() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    let version = client.request(json!({"cmd": "INFO"})).await?;
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(version["date"], enclave_bridge::version::BUILD_DATE);
    assert!(version["platform"].as_str().is_some());
    assert!(version["uptimeSeconds"].as_u64().is_some());
    let features: Vec<&str> = version["features"]
        .as_array()
        .expect("features missing")
        .iter()
        .filter_map(|f| f.as_str())
        .collect();
    assert!(features.contains(&"aes-256-gcm"));
    assert!(features.contains(&"unix-socket-ipc"));

    client.request(json!({"cmd": "BOGUS"})).await?;
    let metrics = client.request(json!({"cmd": "METRICS"})).await?;
    assert_eq!(metrics["service"], "enclave-bridge");
    assert_eq!(metrics["sessionRequests"], 3);
    assert_eq!(metrics["counters"]["errorsTotal"], 1);
    assert_eq!(metrics["counters"]["connectionsActive"], 1);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_signing_commands_with_software_signer() -> Result<()> {
    let bridge = TestBridge::start_with(BridgeOptions {
        signer: Arc::new(SoftwareSigner::random()),
        ..Default::default()
    })
    .await?;
    let mut client = bridge.connect().await?;

    let status = client.request(json!({"cmd": "STATUS"})).await?;
    assert_eq!(status["enclaveAvailable"], true);

    let enclave_key = client.request(json!({"cmd": "GET_ENCLAVE_PUBLIC_KEY"})).await?;
    assert_eq!(BASE64.decode(enclave_key["publicKey"].as_str().unwrap())?.len(), 65);

    let signed = client
        .request(json!({"cmd": "ENCLAVE_SIGN", "data": BASE64.encode(b"payload")}))
        .await?;
    assert!(signed["signature"].as_str().is_some());

    let keys = client.request(json!({"cmd": "LIST_KEYS"})).await?;
    let ids: Vec<&str> = keys["keys"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["key-agreement", "enclave-signing"]);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_hardware_unavailable_is_reported() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    let response = client.request(json!({"cmd": "GET_ENCLAVE_PUBLIC_KEY"})).await?;
    assert_eq!(response["code"], "HARDWARE_UNAVAILABLE");
    assert!(response["error"]
        .as_str()
        .unwrap()
        .contains("no hardware in tests"));

    let status = client.request(json!({"cmd": "STATUS"})).await?;
    assert_eq!(status["enclaveAvailable"], false);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_stub_commands() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    let generate = client.request(json!({"cmd": "ENCLAVE_GENERATE_KEY"})).await?;
    assert_eq!(generate["code"], "NOT_IMPLEMENTED");

    let rotate = client.request(json!({"cmd": "ENCLAVE_ROTATE_KEY"})).await?;
    assert!(rotate["error"]
        .as_str()
        .unwrap()
        .contains("not supported on this platform"));

    bridge.shutdown().await
}
