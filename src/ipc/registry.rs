// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Connection registry
//!
//! Bookkeeping of live connections for status displays. It holds no protocol
//! state: peer keys stay inside each connection's own session. Only the
//! server mutates it; everyone else gets snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub id: String,
    pub accepted_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub request_count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<String, ConnectionInfo>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn register(&self, id: &str) {
        let now = Utc::now();
        let info = ConnectionInfo {
            id: id.to_string(),
            accepted_at: now,
            last_activity_at: now,
            request_count: 0,
        };
        let mut connections = self.connections.write().await;
        connections.insert(id.to_string(), info);
        debug!("Registered connection {} (total: {})", id, connections.len());
    }

    /// Note one handled request on `id`
    pub(crate) async fn touch(&self, id: &str) {
        if let Some(info) = self.connections.write().await.get_mut(id) {
            info.last_activity_at = Utc::now();
            info.request_count += 1;
        }
    }

    pub(crate) async fn remove(&self, id: &str) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            debug!("Removed connection {} (remaining: {})", id, connections.len());
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<ConnectionInfo> {
        self.connections.read().await.get(id).cloned()
    }

    /// All live connections, oldest first
    pub async fn snapshot(&self) -> Vec<ConnectionInfo> {
        let mut list: Vec<ConnectionInfo> =
            self.connections.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.accepted_at.cmp(&b.accepted_at).then(a.id.cmp(&b.id)));
        list
    }
}
