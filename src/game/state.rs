//! Player and Game State Definitions
//!
//! Plain data for the bingo session. Mutation rules live in
//! `network::session`.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::card::Card;

/// Display name given to players who join without one.
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes).
///
/// Serialized as a hyphenated UUID string. Implements Ord for BTreeMap keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Allocate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().into_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

impl Serialize for PlayerId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_uuid_string())
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_uuid_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid player id: {}", s)))
    }
}

// =============================================================================
// GAME PHASE
// =============================================================================

/// Overall game phase.
///
/// Tracked for clients and diagnostics; host actions are accepted in
/// either phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Lobby is open, nothing has started.
    #[default]
    Waiting,
    /// Numbers are being called.
    Playing,
}

// =============================================================================
// PLAYER
// =============================================================================

/// A registered player.
#[derive(Clone, Debug)]
pub struct Player {
    /// Unique identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Current card.
    pub card: Card,
    /// Marks from the player's most recent claim, filtered to called numbers.
    pub marks: BTreeSet<u32>,
    /// Accepted claims so far.
    pub wins: u32,
    /// Position in join order; strictly increasing within a session.
    pub join_seq: u64,
    /// Wall-clock join time, for logs only.
    pub joined_at: DateTime<Utc>,
}

impl Player {
    /// Create a player with a fresh card.
    ///
    /// Blank or missing names fall back to [`DEFAULT_PLAYER_NAME`]; any
    /// other name is kept exactly as given.
    pub fn new(id: PlayerId, name: Option<&str>, card: Card, join_seq: u64) -> Self {
        Self {
            id,
            name: display_name(name),
            card,
            marks: BTreeSet::new(),
            wins: 0,
            join_seq,
            joined_at: Utc::now(),
        }
    }

    /// Swap in a new card and forget prior marks.
    pub fn replace_card(&mut self, card: Card) {
        self.card = card;
        self.marks.clear();
    }
}

fn display_name(name: Option<&str>) -> String {
    match name {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => DEFAULT_PLAYER_NAME.to_string(),
    }
}
