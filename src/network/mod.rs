//! Network Layer
//!
//! WebSocket server, wire protocol, and the router that owns the game
//! session. Game rules themselves live in `game/`.

pub mod broadcast;
pub mod connection;
pub mod invite;
pub mod protocol;
pub mod router;
pub mod server;
pub mod session;

pub use broadcast::Broadcaster;
pub use connection::{Connection, ConnectionId, ConnectionRole};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use router::{Router, RouterEvent};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::{ClaimOutcome, Session, SessionConfig, SessionError, SessionId};
