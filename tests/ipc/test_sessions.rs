// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-connection session isolation and connection bookkeeping

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use enclave_bridge::crypto::{ecdh::encode_public_key, ephemeral_keypair, open_bytes};
use enclave_bridge::keystore::{KeyStore, UnavailableSigner};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

use super::client::{BridgeOptions, TestBridge};

#[tokio::test]
async fn test_peer_keys_do_not_leak_between_sessions() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut alice = bridge.connect().await?;
    let mut bob = bridge.connect().await?;
    let mut carol = bridge.connect().await?;

    let (alice_secret, alice_public) = ephemeral_keypair();
    let (bob_secret, bob_public) = ephemeral_keypair();

    for (client, public) in [(&mut alice, &alice_public), (&mut bob, &bob_public)] {
        let response = client
            .request(json!({
                "cmd": "SET_PEER_PUBLIC_KEY",
                "publicKey": BASE64.encode(encode_public_key(public, true)),
            }))
            .await?;
        assert_eq!(response["ok"], true);
    }

    // Each session encrypts only to its own peer
    let for_alice = alice
        .request(json!({"cmd": "ENCLAVE_ENCRYPT", "data": BASE64.encode(b"to alice")}))
        .await?;
    let wire = BASE64.decode(for_alice["ciphertext"].as_str().unwrap())?;
    assert_eq!(open_bytes(&wire, &alice_secret)?, b"to alice");
    assert!(open_bytes(&wire, &bob_secret).is_err());

    let for_bob = bob
        .request(json!({"cmd": "ENCLAVE_ENCRYPT", "data": BASE64.encode(b"to bob")}))
        .await?;
    let wire = BASE64.decode(for_bob["ciphertext"].as_str().unwrap())?;
    assert_eq!(open_bytes(&wire, &bob_secret)?, b"to bob");

    // A session that never set a key sees none
    let status = carol.request(json!({"cmd": "STATUS"})).await?;
    assert_eq!(status["peerPublicKeySet"], false);
    let response = carol
        .request(json!({"cmd": "ENCLAVE_ENCRYPT", "data": BASE64.encode(b"x")}))
        .await?;
    assert_eq!(response["code"], "PEER_KEY_NOT_SET");

    bridge.shutdown().await
}

#[tokio::test]
async fn test_concurrent_sessions_share_key_agreement_key() -> Result<()> {
    let bridge = TestBridge::start().await?;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let mut client = bridge.connect().await?;
        tasks.push(tokio::spawn(async move {
            let response = client.request(json!({"cmd": "GET_PUBLIC_KEY"})).await?;
            Ok::<_, anyhow::Error>(response["publicKey"].as_str().unwrap_or_default().to_string())
        }));
    }

    let mut keys = Vec::new();
    for task in tasks {
        keys.push(task.await??);
    }
    keys.dedup();
    assert_eq!(keys.len(), 1);

    let expected = BASE64.encode(bridge.keys.key_agreement_keypair()?.public_key_bytes());
    assert_eq!(keys[0], expected);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_registry_follows_connection_lifecycle() -> Result<()> {
    let bridge = TestBridge::start().await?;

    let mut first = bridge.connect().await?;
    let mut second = bridge.connect().await?;
    first.request(json!({"cmd": "HEARTBEAT"})).await?;
    first.request(json!({"cmd": "HEARTBEAT"})).await?;
    second.request(json!({"cmd": "HEARTBEAT"})).await?;
    bridge.wait_for_connections(2).await?;

    let snapshot = bridge.handle.connections().snapshot().await;
    let mut counts: Vec<u64> = snapshot.iter().map(|c| c.request_count).collect();
    counts.sort();
    assert_eq!(counts, vec![1, 2]);
    assert!(snapshot.iter().all(|c| c.id.starts_with("conn-")));

    drop(first);
    bridge.wait_for_connections(1).await?;

    drop(second);
    bridge.wait_for_connections(0).await?;
    assert_eq!(bridge.handle.metrics().active_connections(), 0);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_connection_limit() -> Result<()> {
    let bridge = TestBridge::start_with(BridgeOptions {
        max_connections: 1,
        ..Default::default()
    })
    .await?;

    let mut admitted = bridge.connect().await?;
    admitted.request(json!({"cmd": "HEARTBEAT"})).await?;

    let mut rejected = bridge.connect().await?;
    assert!(rejected.request(json!({"cmd": "HEARTBEAT"})).await.is_err());
    assert_eq!(bridge.handle.metrics().counters()["connectionsRejected"], 1);

    // The admitted connection is unaffected
    let response = admitted.request(json!({"cmd": "STATUS"})).await?;
    assert_eq!(response["ok"], true);

    bridge.shutdown().await
}

#[tokio::test]
async fn test_shutdown_closes_clients_and_removes_socket() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let mut client = bridge.connect().await?;
    let response = client.request(json!({"cmd": "GET_PUBLIC_KEY"})).await?;
    let served_key = response["publicKey"].as_str().expect("publicKey missing").to_string();

    let socket_path = bridge.handle.socket_path().to_path_buf();
    let key_dir = bridge
        .keys
        .key_agreement_path()
        .parent()
        .expect("key file has a directory")
        .to_path_buf();
    bridge.handle.shutdown().await?;

    assert!(!socket_path.exists());
    assert!(client.receive().await.is_err());

    // A restarted bridge on the same key directory serves the same key
    let restarted = KeyStore::open(&key_dir, Arc::new(UnavailableSigner::default()));
    let reloaded = BASE64.encode(restarted.key_agreement_keypair()?.public_key_bytes());
    assert_eq!(reloaded, served_key);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_aborts_connection_blocked_on_slow_reader() -> Result<()> {
    let bridge = TestBridge::start().await?;
    let stream = UnixStream::connect(bridge.handle.socket_path()).await?;
    // Keep the read half alive but never read, so server writes back up
    let (_read_half, mut write_half) = stream.into_split();

    let payload = br#"{"cmd":"HEARTBEAT"}"#;
    let mut frame = (payload.len() as u32).to_be_bytes().to_vec();
    frame.extend_from_slice(payload);
    let writer = tokio::spawn(async move {
        loop {
            if write_half.write_all(&frame).await.is_err() {
                break;
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    tokio::time::timeout(Duration::from_secs(5), bridge.handle.shutdown())
        .await
        .expect("shutdown hung on a blocked connection")?;

    // The server side of the stream is gone, so the flooding client fails
    tokio::time::timeout(Duration::from_secs(3), writer)
        .await
        .expect("connection was not closed on shutdown")?;
    Ok(())
}
