//! Game Logic Module
//!
//! Pure bingo rules with no I/O.
//!
//! ## Module Structure
//!
//! - `card`: Card layout and random generation
//! - `win`: Line evaluation against a marked set
//! - `state`: Player records and game phase

pub mod card;
pub mod state;
pub mod win;

// Re-export key types
pub use card::{Card, CardGenerator, Cell, CARD_SIZE, MAX_NUMBER};
pub use state::{GamePhase, Player, PlayerId, DEFAULT_PLAYER_NAME};
pub use win::{has_win, winning_line, WinLine};
