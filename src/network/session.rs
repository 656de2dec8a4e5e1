//! Game Session Store
//!
//! Authoritative state for one bingo game: registered players, the host
//! slot, the called-number history and the game phase. Owned by the
//! router; nothing else mutates it.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::rng::derive_session_seed;
use crate::game::card::{Card, MAX_NUMBER};
use crate::game::state::{GamePhase, Player, PlayerId};
use crate::game::win::{winning_line, WinLine};
use crate::network::connection::ConnectionId;
use crate::network::protocol::{HostSnapshot, PlayerSummary};

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Reason sent with `bingo_rejected`.
pub const CLAIM_REJECTED_REASON: &str = "No complete line among the called numbers";

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Highest callable number.
    pub max_number: u32,
    /// Ignore draws outside `1..=max_number`.
    pub enforce_range: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_number: MAX_NUMBER,
            enforce_range: true,
        }
    }
}

/// Result of evaluating a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Claim satisfied a line.
    Accepted {
        /// Winner's display name.
        name: String,
        /// The completed line.
        line: WinLine,
        /// Winner's total accepted claims, this one included.
        wins: u32,
    },
    /// No complete line among the called numbers.
    Rejected {
        /// Reason for the claimant.
        reason: String,
    },
}

/// The game session.
pub struct Session {
    /// Unique session identifier.
    id: SessionId,
    /// Creation time, nanoseconds since the Unix epoch.
    started_at_nanos: u128,
    /// Session configuration.
    config: SessionConfig,
    /// Registered players.
    players: BTreeMap<PlayerId, Player>,
    /// Join sequence for the next player.
    next_join_seq: u64,
    /// Called numbers in draw order, no duplicates.
    called_numbers: Vec<u32>,
    /// Overall phase.
    status: GamePhase,
    /// The authoritative host connection.
    host: Option<ConnectionId>,
}

impl Session {
    /// Create an empty session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().into_bytes(),
            started_at_nanos: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
            config,
            players: BTreeMap::new(),
            next_join_seq: 0,
            called_numbers: Vec::new(),
            status: GamePhase::Waiting,
            host: None,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Seed for this session's card generator.
    pub fn card_seed(&self) -> u64 {
        derive_session_seed(&self.id, self.started_at_nanos)
    }

    /// Current phase.
    pub fn status(&self) -> GamePhase {
        self.status
    }

    // -------------------------------------------------------------------------
    // Host slot
    // -------------------------------------------------------------------------

    /// Current host connection.
    pub fn host(&self) -> Option<ConnectionId> {
        self.host
    }

    /// Is `conn` the current host.
    pub fn is_host(&self, conn: ConnectionId) -> bool {
        self.host == Some(conn)
    }

    /// Make `conn` the host. Returns the displaced host, if any.
    pub fn set_host(&mut self, conn: ConnectionId) -> Option<ConnectionId> {
        self.host.replace(conn).filter(|previous| *previous != conn)
    }

    /// Clear the host slot if `conn` still holds it.
    pub fn clear_host(&mut self, conn: ConnectionId) -> bool {
        if self.is_host(conn) {
            self.host = None;
            true
        } else {
            false
        }
    }

    // -------------------------------------------------------------------------
    // Players
    // -------------------------------------------------------------------------

    /// Register a new player with `card`. Always allocates a fresh id.
    pub fn add_player(&mut self, name: Option<&str>, card: Card) -> &Player {
        let mut id = PlayerId::generate();
        while self.players.contains_key(&id) {
            id = PlayerId::generate();
        }
        let join_seq = self.next_join_seq;
        self.next_join_seq += 1;
        self.players
            .entry(id)
            .or_insert_with(|| Player::new(id, name, card, join_seq))
    }

    /// Remove a player.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        self.players.remove(id)
    }

    /// Look up a player.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Mutable player lookup.
    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Get player count.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Players ordered by join time.
    pub fn players_by_join_time(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.join_seq);
        players
    }

    // -------------------------------------------------------------------------
    // Numbers
    // -------------------------------------------------------------------------

    /// Called numbers in draw order.
    pub fn called_numbers(&self) -> &[u32] {
        &self.called_numbers
    }

    /// Has `number` been called.
    pub fn is_called(&self, number: u32) -> bool {
        self.called_numbers.contains(&number)
    }

    /// Append a called number.
    pub fn record_draw(&mut self, number: u32) -> Result<(), SessionError> {
        if self.config.enforce_range && !(1..=self.config.max_number).contains(&number) {
            return Err(SessionError::OutOfRange {
                number,
                max: self.config.max_number,
            });
        }

        if self.is_called(number) {
            return Err(SessionError::AlreadyCalled(number));
        }

        self.called_numbers.push(number);
        Ok(())
    }

    /// Start a fresh round: clear called numbers and deal every player a new card.
    ///
    /// Players and phase are kept. Returns each player's new card.
    pub fn reset_round(&mut self, mut deal: impl FnMut() -> Card) -> Vec<(PlayerId, Card)> {
        self.called_numbers.clear();

        self.players
            .values_mut()
            .map(|player| {
                player.replace_card(deal());
                (player.id, player.card.clone())
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Claims
    // -------------------------------------------------------------------------

    /// Check a claim against the player's card.
    ///
    /// Marks that were never called, negative ones included, are dropped
    /// before evaluation. The filtered marks are remembered on the player.
    pub fn evaluate_claim(&mut self, id: &PlayerId, marks: &[i64]) -> Result<ClaimOutcome, SessionError> {
        let called: BTreeSet<u32> = self.called_numbers.iter().copied().collect();
        let player = self.players.get_mut(id).ok_or(SessionError::PlayerNotFound)?;

        let filtered: BTreeSet<u32> = marks
            .iter()
            .filter_map(|&n| u32::try_from(n).ok())
            .filter(|n| called.contains(n))
            .collect();

        let line = winning_line(&player.card, &filtered);
        player.marks = filtered;

        match line {
            Some(line) => {
                player.wins += 1;
                Ok(ClaimOutcome::Accepted {
                    name: player.name.clone(),
                    line,
                    wins: player.wins,
                })
            }
            None => Ok(ClaimOutcome::Rejected {
                reason: CLAIM_REJECTED_REASON.to_string(),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    /// Host view of the session.
    pub fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            players: self
                .players_by_join_time()
                .into_iter()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    wins: Some(p.wins),
                })
                .collect(),
            called_numbers: self.called_numbers.clone(),
        }
    }
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Number was already called.
    #[error("Number {0} already called")]
    AlreadyCalled(u32),

    /// Number outside the callable range.
    #[error("Number {number} outside 1..={max}")]
    OutOfRange {
        /// Requested number.
        number: u32,
        /// Highest callable number.
        max: u32,
    },

    /// Player not found.
    #[error("Player not found")]
    PlayerNotFound,
}
