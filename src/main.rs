// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use enclave_bridge::{
    config::{BridgeConfig, SignerKind},
    ipc::{ConnectionServer, ServerConfig},
    keystore::{KeyStore, Signer, SoftwareSigner, UnavailableSigner},
    version,
};
use std::{env, sync::Arc};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ENV_LOG_JSON: &str = "ENCLAVE_BRIDGE_LOG_JSON";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var(ENV_LOG_JSON)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_signer(kind: SignerKind) -> Arc<dyn Signer> {
    match kind {
        SignerKind::None => Arc::new(UnavailableSigner::default()),
        SignerKind::Software => {
            warn!("Using in-memory software signer; signatures are not hardware backed");
            Arc::new(SoftwareSigner::random())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let started_at = version::process_started_at();
    init_tracing();

    info!("{}", version::get_version_string());
    info!("Build: {}", version::VERSION);

    let config = BridgeConfig::from_env().context("loading configuration")?;
    let server_config = ServerConfig::from(&config);
    let key_dir = config.key_dir();
    info!("Socket path: {}", server_config.socket_path.display());
    info!("Key directory: {}", key_dir.display());
    info!(
        "Limits: {} connections, {} byte frames",
        server_config.max_connections, server_config.max_frame_bytes
    );

    let keys = Arc::new(KeyStore::open(&key_dir, build_signer(config.signer)));
    // Surface key file problems at startup instead of on the first request
    let keypair = keys
        .key_agreement_keypair()
        .with_context(|| format!("loading key-agreement key from {}", key_dir.display()))?;
    info!(
        "Key-agreement public key: {}",
        hex::encode(keypair.public_key_bytes())
    );
    info!("Signer available: {}", keys.signer().is_available());

    let server = ConnectionServer::new(server_config, keys);
    let handle = server.start().await?;

    info!("Enclave bridge ready. Press Ctrl+C to stop.");
    signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    info!("Received shutdown signal");

    handle.shutdown().await?;
    info!("Stopped after {}s", started_at.elapsed().as_secs());
    Ok(())
}
