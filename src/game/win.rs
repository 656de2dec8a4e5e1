//! Win Evaluation
//!
//! A line wins when every cell in it is marked. FREE is always marked.
//! The marked set is taken as given; filtering claims against the called
//! numbers is the session's job.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};

use crate::game::card::{Card, CARD_SIZE};

/// A completed line on a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinLine {
    /// Full row (0 = top).
    Row(usize),
    /// Full column (0 = leftmost).
    Column(usize),
    /// Top-left to bottom-right.
    Diagonal,
    /// Top-right to bottom-left.
    AntiDiagonal,
}

impl WinLine {
    /// Cells `(row, col)` covered by this line.
    pub fn cells(self) -> [(usize, usize); CARD_SIZE] {
        let mut cells = [(0, 0); CARD_SIZE];
        for (i, cell) in cells.iter_mut().enumerate() {
            *cell = match self {
                WinLine::Row(row) => (row, i),
                WinLine::Column(col) => (i, col),
                WinLine::Diagonal => (i, i),
                WinLine::AntiDiagonal => (i, CARD_SIZE - 1 - i),
            };
        }
        cells
    }

    /// Every line, in evaluation order.
    pub fn all() -> impl Iterator<Item = WinLine> {
        (0..CARD_SIZE)
            .map(WinLine::Row)
            .chain((0..CARD_SIZE).map(WinLine::Column))
            .chain([WinLine::Diagonal, WinLine::AntiDiagonal])
    }
}

#[inline]
fn is_marked(card: &Card, row: usize, col: usize, marked: &BTreeSet<u32>) -> bool {
    match card.cell(row, col).number() {
        None => true,
        Some(n) => marked.contains(&n),
    }
}

/// First fully marked line, if any.
pub fn winning_line(card: &Card, marked: &BTreeSet<u32>) -> Option<WinLine> {
    WinLine::all().find(|line| {
        line.cells()
            .iter()
            .all(|&(row, col)| is_marked(card, row, col, marked))
    })
}

/// Does the card hold a complete row, column or diagonal.
pub fn has_win(card: &Card, marked: &BTreeSet<u32>) -> bool {
    winning_line(card, marked).is_some()
}
