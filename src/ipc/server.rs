// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Unix socket server
//!
//! Accepts local connections and gives each one its own task, [`Session`]
//! and [`ProtocolHandler`]. Requests on a connection are answered strictly in
//! order; connections proceed independently of each other.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

use super::error::ProtocolError;
use super::framing::{Frame, FrameCodec, DEFAULT_MAX_FRAME_LEN};
use super::handler::ProtocolHandler;
use super::metrics::BridgeMetrics;
use super::registry::ConnectionRegistry;
use super::session::Session;
use crate::config::BridgeConfig;
use crate::keystore::KeyStore;

/// Socket file mode: owner read/write only
pub const SOCKET_MODE: u32 = 0o600;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause after `failures` consecutive accept errors (e.g. EMFILE)
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1u32 << failures.saturating_sub(1).min(16))
        .min(ACCEPT_BACKOFF_MAX)
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    pub max_connections: usize,
    pub max_frame_bytes: usize,
}

impl ServerConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            max_connections: 64,
            max_frame_bytes: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl From<&BridgeConfig> for ServerConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            socket_path: config.socket_path(),
            max_connections: config.max_connections,
            max_frame_bytes: config.max_frame_bytes,
        }
    }
}

pub struct ConnectionServer {
    config: ServerConfig,
    keys: Arc<KeyStore>,
    metrics: Arc<BridgeMetrics>,
    registry: ConnectionRegistry,
}

/// Everything a connection task needs, cloned per connection
#[derive(Clone)]
struct ConnectionContext {
    keys: Arc<KeyStore>,
    metrics: Arc<BridgeMetrics>,
    registry: ConnectionRegistry,
    max_frame_bytes: usize,
}

impl ConnectionServer {
    pub fn new(config: ServerConfig, keys: Arc<KeyStore>) -> Self {
        Self {
            config,
            keys,
            metrics: Arc::new(BridgeMetrics::new()),
            registry: ConnectionRegistry::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the socket and start accepting connections.
    ///
    /// Dropping the returned handle without calling
    /// [`ServerHandle::shutdown`] also stops the server, but leaves the
    /// socket file behind.
    pub async fn start(&self) -> Result<ServerHandle> {
        let socket_path = self.config.socket_path.clone();
        prepare_socket_path(&socket_path)?;

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("binding {}", socket_path.display()))?;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))
            .with_context(|| format!("restricting permissions on {}", socket_path.display()))?;
        info!("Enclave bridge listening on {}", socket_path.display());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let context = ConnectionContext {
            keys: self.keys.clone(),
            metrics: self.metrics.clone(),
            registry: self.registry.clone(),
            max_frame_bytes: self.config.max_frame_bytes,
        };
        let accept_handle = tokio::spawn(accept_loop(
            listener,
            context,
            self.config.max_connections,
            shutdown_rx,
        ));

        Ok(ServerHandle {
            socket_path,
            registry: self.registry.clone(),
            metrics: self.metrics.clone(),
            shutdown_tx,
            accept_handle: Some(accept_handle),
        })
    }
}

/// Make `path` bindable: create its directory and clear a stale socket.
/// Anything at `path` that is not a socket is left alone and reported.
fn prepare_socket_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating socket directory {}", parent.display()))?;
    }

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            debug!("Removing stale socket {}", path.display());
            std::fs::remove_file(path)
                .with_context(|| format!("removing stale socket {}", path.display()))?;
        }
        Ok(_) => bail!("{} exists and is not a socket", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("inspecting {}", path.display())),
    }
    Ok(())
}

async fn accept_loop(
    listener: UnixListener,
    context: ConnectionContext,
    max_connections: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tasks = JoinSet::new();
    let mut accept_failures: u32 = 0;

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _addr)) => {
                        accept_failures = 0;
                        if context.registry.len().await >= max_connections {
                            warn!("Connection limit ({}) reached, rejecting client", max_connections);
                            context.metrics.connection_rejected();
                            drop(stream);
                            continue;
                        }

                        let id = Session::generate_id();
                        context.registry.register(&id).await;
                        context.metrics.connection_opened();
                        tasks.spawn(handle_connection(
                            stream,
                            id,
                            context.clone(),
                            shutdown_rx.clone(),
                        ));
                    }
                    Err(e) => {
                        accept_failures = accept_failures.saturating_add(1);
                        let pause = accept_backoff(accept_failures);
                        error!("Failed to accept connection: {} (retrying in {:?})", e, pause);
                        tokio::time::sleep(pause).await;
                    }
                }
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = result {
                    error!("Connection task failed: {}", e);
                }
            }
            _ = shutdown_rx.changed() => {
                info!("Shutting down enclave bridge");
                break;
            }
        }
    }

    drop(listener);
    while tasks.join_next().await.is_some() {}
}

async fn handle_connection(
    stream: UnixStream,
    id: String,
    context: ConnectionContext,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("Connection {} established", id);

    let max_frame_bytes = context.max_frame_bytes;
    let mut framed = Framed::new(stream, FrameCodec::with_max_frame_len(max_frame_bytes));
    let mut handler = ProtocolHandler::new(
        Session::new(id.clone()),
        context.keys.clone(),
        context.metrics.clone(),
    );

    loop {
        let frame = tokio::select! {
            frame = framed.next() => frame,
            _ = shutdown_rx.changed() => break,
        };

        let response = match frame {
            Some(Ok(Frame::Message(payload))) => handler.handle_frame(&payload),
            Some(Ok(Frame::Oversized { declared })) => {
                handler.reject_frame(ProtocolError::Framing(format!(
                    "frame of {} bytes exceeds limit of {} bytes",
                    declared, max_frame_bytes
                )))
            }
            Some(Err(e)) => {
                warn!("[{}] read error: {}", id, e);
                break;
            }
            None => break,
        };

        context.registry.touch(&id).await;

        if let Err(e) = framed.send(Bytes::from(response.to_bytes())).await {
            warn!("[{}] write error: {}", id, e);
            break;
        }
    }

    context.registry.remove(&id).await;
    context.metrics.connection_closed();
    info!(
        "Connection {} closed after {} requests",
        id,
        handler.session().request_count()
    );
}

pub struct ServerHandle {
    socket_path: PathBuf,
    registry: ConnectionRegistry,
    metrics: Arc<BridgeMetrics>,
    shutdown_tx: watch::Sender<bool>,
    accept_handle: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        self.metrics.clone()
    }

    /// Stop accepting, close every connection and remove the socket file.
    ///
    /// Connections still busy after the grace period (e.g. blocked writing
    /// to a client that stopped reading) are aborted.
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown_tx.send(true).ok();

        if let Some(mut handle) = self.accept_handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!(
                    "Connections did not close within {:?}, aborting them",
                    SHUTDOWN_GRACE
                );
                // Dropping the accept loop's JoinSet aborts every connection task
                handle.abort();
                handle.await.ok();
            }
        }

        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("removing socket {}", self.socket_path.display()))
            }
        }

        info!("Enclave bridge shutdown complete");
        Ok(())
    }
}
