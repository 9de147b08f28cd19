// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-connection state; dropped (with any peer key) when the connection closes
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    request_count: u64,
    peer_public_key: Option<Vec<u8>>,
}

impl Session {
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_activity_at: now,
            request_count: 0,
            peer_public_key: None,
        }
    }

    pub fn generate_id() -> String {
        format!("conn-{}", Uuid::new_v4())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn record_request(&mut self) {
        self.request_count += 1;
        self.last_activity_at = Utc::now();
    }

    pub fn peer_public_key(&self) -> Option<&[u8]> {
        self.peer_public_key.as_deref()
    }

    pub fn has_peer_public_key(&self) -> bool {
        self.peer_public_key.is_some()
    }

    /// Store the negotiated peer key; a later call replaces it
    pub fn set_peer_public_key(&mut self, key: Vec<u8>) {
        self.peer_public_key = Some(key);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Self::generate_id())
    }
}
