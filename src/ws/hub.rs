//! Connection registry: player id → live websocket session.
//!
//! Bots never register here, so room-scoped fan-out can address them
//! freely and the hub simply has nowhere to deliver.

use std::sync::atomic::{AtomicUsize, Ordering};

use actix::prelude::*;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::domain::PlayerId;
use crate::protocol::ServerEvent;

/// One event addressed to one session.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Deliver {
    pub event: ServerEvent,
}

pub struct ConnectionHub {
    sessions: DashMap<PlayerId, Recipient<Deliver>>,
    active_connections: AtomicUsize,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            active_connections: AtomicUsize::new(0),
        }
    }

    pub fn register(&self, pid: &str, recipient: Recipient<Deliver>) {
        self.sessions.insert(pid.to_string(), recipient);
        let active = self.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
        info!(player_id = pid, active_connections = active, "session registered");
    }

    pub fn unregister(&self, pid: &str) {
        if self.sessions.remove(pid).is_some() {
            let before = self.active_connections.load(Ordering::Relaxed);
            if before > 0 {
                self.active_connections.fetch_sub(1, Ordering::Relaxed);
            }
            info!(
                player_id = pid,
                active_connections = before.saturating_sub(1),
                "session unregistered"
            );
        }
    }

    /// Deliver one event to one player. Unknown recipients (bots, players
    /// who just disconnected) are dropped without error.
    pub fn send_to(&self, pid: &str, event: ServerEvent) {
        match self.sessions.get(pid) {
            Some(recipient) => recipient.do_send(Deliver { event }),
            None => debug!(player_id = pid, "no session for event recipient"),
        }
    }

    pub fn active_connections_count(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}
