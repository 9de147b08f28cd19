// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Framing behaviour on a live connection

use anyhow::Result;
use serde_json::json;

use super::client::{BridgeOptions, TestBridge};

#[tokio::test]
async fn test_oversized_frame_keeps_connection_open() -> Result<()> {
    let bridge = TestBridge::start_with(BridgeOptions {
        max_frame_bytes: 1024,
        ..Default::default()
    })
    .await?;
    let mut client = bridge.connect().await?;

    let huge = json!({"cmd": "ENCLAVE_SIGN", "data": "A".repeat(4096)});
    let response = client.request(huge).await?;
    assert_eq!(response["code"], "FRAMING_ERROR");
    assert!(response["error"].as_str().unwrap().contains("exceeds limit"));

    let response = client.request(json!({"cmd": "HEARTBEAT"})).await?;
    assert_eq!(response["ok"], true);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_malformed_payloads_get_error_responses() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    client.send_raw(b"{not json".to_vec()).await?;
    let response = client.receive().await?;
    assert_eq!(response["code"], "FRAMING_ERROR");

    client.send_raw(b"\"just a string\"".to_vec()).await?;
    let response = client.receive().await?;
    assert_eq!(response["code"], "FRAMING_ERROR");

    client.send_raw(br#"{"data":"aGk="}"#.to_vec()).await?;
    let response = client.receive().await?;
    assert_eq!(response["code"], "MISSING_FIELD");

    let response = client.request(json!({"cmd": "STATUS"})).await?;
    assert_eq!(response["ok"], true);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_pipelined_requests_answered_in_order() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;

    // Payload bytes that would confuse a delimiter-based reader
    client
        .send_raw(br#"{"cmd":"BOGUS\n}{"}"#.to_vec())
        .await?;
    client.send_raw(br#"{"cmd":"HEARTBEAT"}"#.to_vec()).await?;
    client.send_raw(br#"{"cmd":"STATUS"}"#.to_vec()).await?;

    let first = client.receive().await?;
    assert!(first["error"].as_str().unwrap().contains("BOGUS\n}{"));
    let second = client.receive().await?;
    assert_eq!(second["service"], "enclave-bridge");
    let third = client.receive().await?;
    assert_eq!(third["peerPublicKeySet"], false);

    bridge.shutdown().await
}
