//! Broadcaster
//!
//! Read-only fan-out over the connection table. Holds shared borrows only,
//! so it can never touch session state.

use std::collections::BTreeMap;

use tracing::debug;

use crate::network::connection::{Connection, ConnectionId, ConnectionRole};
use crate::network::protocol::ServerMessage;

/// Fan-out view for one dispatch.
pub struct Broadcaster<'a> {
    connections: &'a BTreeMap<ConnectionId, Connection>,
    host: Option<ConnectionId>,
}

impl<'a> Broadcaster<'a> {
    /// View over `connections` with `host` as the authoritative host slot.
    pub fn new(connections: &'a BTreeMap<ConnectionId, Connection>, host: Option<ConnectionId>) -> Self {
        Self { connections, host }
    }

    /// Send to one connection. Returns whether it was queued.
    pub fn send_to(&self, conn: ConnectionId, message: ServerMessage) -> bool {
        match self.connections.get(&conn) {
            Some(connection) => connection.send(message),
            None => false,
        }
    }

    /// Send to the current host only.
    pub fn notify_host(&self, message: ServerMessage) -> bool {
        match self.host {
            Some(host) => self.send_to(host, message),
            None => false,
        }
    }

    /// Send to the current host and every player.
    ///
    /// Returns the number of connections the message was queued on.
    pub fn broadcast(&self, message: ServerMessage) -> usize {
        let mut delivered = 0;

        if self.notify_host(message.clone()) {
            delivered += 1;
        }

        for connection in self.connections.values() {
            if matches!(connection.role, ConnectionRole::Player(_)) && connection.send(message.clone()) {
                delivered += 1;
            }
        }

        debug!("Broadcast {} to {} connections", message.kind(), delivered);
        delivered
    }
}
