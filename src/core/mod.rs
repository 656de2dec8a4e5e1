//! Core primitives.
//!
//! Randomness shared by the game layer. Seedable so that card generation
//! can be replayed in tests.

pub mod rng;

// Re-export core types
pub use rng::{DeterministicRng, derive_session_seed};
