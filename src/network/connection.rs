//! Connection Handles
//!
//! Each socket gets an id, a role and an outbound queue. The socket task
//! drains the queue; the router only ever pushes into it.

use std::fmt;

use tokio::sync::mpsc;

use crate::game::state::PlayerId;
use crate::network::protocol::ServerMessage;

/// Identifier for one live socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// What a connection has identified itself as.
///
/// Set by the first `host_connect` or `player_join`, then fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionRole {
    /// No role message seen yet.
    Unidentified,
    /// Claimed the host role.
    Host,
    /// Joined as this player.
    Player(PlayerId),
}

/// Outbound side of a connection.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// A connection as seen by the router.
#[derive(Debug)]
pub struct Connection {
    /// Current role.
    pub role: ConnectionRole,
    /// Message queue to the socket writer.
    sender: Outbound,
}

impl Connection {
    /// New unidentified connection.
    pub fn new(sender: Outbound) -> Self {
        Self {
            role: ConnectionRole::Unidentified,
            sender,
        }
    }

    /// Is the socket writer still accepting messages.
    pub fn is_live(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a message. Closed connections are skipped.
    ///
    /// Returns whether the message was queued.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.is_live() && self.sender.send(message).is_ok()
    }

    /// Player id, if this connection joined as a player.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self.role {
            ConnectionRole::Player(id) => Some(id),
            _ => None,
        }
    }
}
