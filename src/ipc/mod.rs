// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local IPC
//!
//! Length-prefixed JSON over a Unix domain socket. One task per connection,
//! each with its own session; the key store and metrics are the only state
//! connections share.

pub mod error;
pub mod framing;
pub mod handler;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use error::ProtocolError;
pub use framing::{Frame, FrameCodec};
pub use handler::ProtocolHandler;
pub use metrics::BridgeMetrics;
pub use protocol::{Command, KeyEntry, Response};
pub use registry::{ConnectionInfo, ConnectionRegistry};
pub use server::{ConnectionServer, ServerConfig, ServerHandle};
pub use session::Session;
