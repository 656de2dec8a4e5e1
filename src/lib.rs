//! # Bingo Hall Server
//!
//! Real-time multiplayer bingo: one host calls numbers, players hold
//! generated cards and claim wins over WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    BINGO HALL SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  └── rng.rs      - Seedable Xorshift128+ PRNG                │
//! │                                                              │
//! │  game/           - Game rules (no I/O)                       │
//! │  ├── card.rs     - Card layout and generation                │
//! │  ├── win.rs      - Row / column / diagonal evaluation        │
//! │  └── state.rs    - Player records and game phase             │
//! │                                                              │
//! │  network/        - Networking                                │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── router.rs   - Single-task message dispatch              │
//! │  ├── session.rs  - Authoritative session store               │
//! │  ├── broadcast.rs- Fan-out to host and players               │
//! │  └── invite.rs   - Player join URL                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Socket tasks never touch game state. They forward frames to one router
//! task, which handles each event to completion before the next, so the
//! session needs no locks.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use game::card::{Card, CardGenerator, Cell};
pub use game::state::{Player, PlayerId};
pub use game::win::has_win;
pub use network::{GameServer, Router, ServerConfig, Session};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
