//! Bingo Card Generation
//!
//! A card is 5 columns of 5 cells. Values are drawn without replacement
//! from `1..=MAX_NUMBER` by a Fisher-Yates shuffle and laid out
//! column-major. The center cell is always FREE.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;

/// Highest number that can appear on a card or be called.
pub const MAX_NUMBER: u32 = 50;

/// Cards are `CARD_SIZE` x `CARD_SIZE`.
pub const CARD_SIZE: usize = 5;

/// Row/column index of the FREE cell.
pub const FREE_INDEX: usize = CARD_SIZE / 2;

/// Wire spelling of the FREE cell.
const FREE_TEXT: &str = "FREE";

// =============================================================================
// CELL
// =============================================================================

/// A single card cell.
///
/// Serialized as a bare integer, or the string `"FREE"` for the center.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    /// A callable number.
    Number(u32),
    /// The always-marked center cell.
    Free,
}

impl Cell {
    /// Numeric value, if this is not the FREE cell.
    pub fn number(self) -> Option<u32> {
        match self {
            Cell::Number(n) => Some(n),
            Cell::Free => None,
        }
    }

    /// Is this the FREE cell.
    pub fn is_free(self) -> bool {
        matches!(self, Cell::Free)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(n) => serializer.serialize_u32(*n),
            Cell::Free => serializer.serialize_str(FREE_TEXT),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellVisitor;

        impl Visitor<'_> for CellVisitor {
            type Value = Cell;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a card number or \"FREE\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cell, E> {
                u32::try_from(v)
                    .map(Cell::Number)
                    .map_err(|_| E::custom(format!("card number out of range: {}", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cell, E> {
                u32::try_from(v)
                    .map(Cell::Number)
                    .map_err(|_| E::custom(format!("card number out of range: {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Cell, E> {
                if v == FREE_TEXT {
                    Ok(Cell::Free)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

// =============================================================================
// CARD
// =============================================================================

/// A 5x5 bingo card stored column-major: `columns[col][row]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card {
    columns: [[Cell; CARD_SIZE]; CARD_SIZE],
}

impl Card {
    /// Build a card from explicit columns.
    ///
    /// The center cell is forced to FREE whatever the input holds there.
    pub fn from_columns(mut columns: [[Cell; CARD_SIZE]; CARD_SIZE]) -> Self {
        columns[FREE_INDEX][FREE_INDEX] = Cell::Free;
        Self { columns }
    }

    /// Cell at `(row, col)`.
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.columns[col][row]
    }

    /// All columns, left to right.
    pub fn columns(&self) -> &[[Cell; CARD_SIZE]; CARD_SIZE] {
        &self.columns
    }

    /// Every number printed on the card (FREE excluded).
    pub fn numbers(&self) -> BTreeSet<u32> {
        self.columns
            .iter()
            .flatten()
            .filter_map(|cell| cell.number())
            .collect()
    }
}

// =============================================================================
// GENERATOR
// =============================================================================

/// Produces uniformly random cards.
#[derive(Clone, Debug)]
pub struct CardGenerator {
    rng: DeterministicRng,
}

impl CardGenerator {
    /// Generator with a fixed seed (reproducible).
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: DeterministicRng::new(seed) }
    }

    /// Generate a fresh card.
    pub fn generate(&mut self) -> Card {
        let mut pool: Vec<u32> = (1..=MAX_NUMBER).collect();
        self.rng.shuffle(&mut pool);

        let mut columns = [[Cell::Free; CARD_SIZE]; CARD_SIZE];
        for (col, column) in columns.iter_mut().enumerate() {
            for (row, cell) in column.iter_mut().enumerate() {
                *cell = Cell::Number(pool[col * CARD_SIZE + row]);
            }
        }

        // Overwrites the drawn value; the pool is not re-consulted
        Card::from_columns(columns)
    }
}
