//! Connect Four rules: 7x6 gravity grid, four-in-a-row detection.
//!
//! The board is stored column-major (`col * HEIGHT + row`, row 0 at the
//! bottom) to match the snapshot layout clients render from.

use crate::ActionError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const WIDTH: usize = 7;
pub const HEIGHT: usize = 6;
pub const CELLS: usize = WIDTH * HEIGHT;

/// Scan directions for win detection: horizontal, vertical, rising
/// diagonal, falling diagonal. The scan order (increasing column, then
/// increasing row, then this direction order) fixes which of several
/// simultaneous winning lines gets highlighted.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disc {
    R,
    Y,
}

impl Disc {
    pub fn other(self) -> Disc {
        match self {
            Disc::R => Disc::Y,
            Disc::Y => Disc::R,
        }
    }
}

impl fmt::Display for Disc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disc::R => write!(f, "R"),
            Disc::Y => write!(f, "Y"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundResult {
    Won(Disc),
    Draw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectFourState {
    pub board: Vec<Option<Disc>>,
    /// Disc to move; `None` once the game is decided.
    pub next: Option<Disc>,
    pub winner: Option<RoundResult>,
    /// Cell indices of the first winning run found, for UI highlighting.
    pub winning_line: Option<[usize; 4]>,
}

pub fn cell_index(col: usize, row: usize) -> usize {
    col * HEIGHT + row
}

impl ConnectFourState {
    /// Red always opens.
    pub fn new() -> Self {
        Self {
            board: vec![None; CELLS],
            next: Some(Disc::R),
            winner: None,
            winning_line: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn current_player(&self) -> Option<Disc> {
        if self.winner.is_some() {
            None
        } else {
            self.next
        }
    }

    /// Drops `disc` into `column`, filling the lowest empty row.
    /// Returns the row the disc landed in.
    pub fn drop_disc(&mut self, disc: Disc, column: usize) -> Result<usize, ActionError> {
        if self.winner.is_some() {
            return Err(ActionError::GameOver);
        }
        if column >= WIDTH {
            return Err(ActionError::OutOfRange);
        }
        if self.next != Some(disc) {
            return Err(ActionError::NotYourTurn);
        }

        let row = (0..HEIGHT)
            .find(|&row| self.board[cell_index(column, row)].is_none())
            .ok_or(ActionError::ColumnFull)?;

        self.board[cell_index(column, row)] = Some(disc);

        if let Some((winner, line)) = self.find_winning_line() {
            self.winner = Some(RoundResult::Won(winner));
            self.winning_line = Some(line);
            self.next = None;
        } else if self.board.iter().all(|cell| cell.is_some()) {
            self.winner = Some(RoundResult::Draw);
            self.next = None;
        } else {
            self.next = Some(disc.other());
        }
        Ok(row)
    }

    fn at(&self, col: i32, row: i32) -> Option<Disc> {
        if col < 0 || col >= WIDTH as i32 || row < 0 || row >= HEIGHT as i32 {
            return None;
        }
        self.board[cell_index(col as usize, row as usize)]
    }

    /// Scans for the first run of four equal discs in scan order.
    fn find_winning_line(&self) -> Option<(Disc, [usize; 4])> {
        for col in 0..WIDTH as i32 {
            for row in 0..HEIGHT as i32 {
                let disc = match self.at(col, row) {
                    Some(disc) => disc,
                    None => continue,
                };
                for (dx, dy) in DIRECTIONS {
                    let mut line = [0usize; 4];
                    let mut run = 0;
                    for step in 0..4 {
                        let c = col + dx * step;
                        let r = row + dy * step;
                        if self.at(c, r) != Some(disc) {
                            break;
                        }
                        line[step as usize] = cell_index(c as usize, r as usize);
                        run += 1;
                    }
                    if run == 4 {
                        return Some((disc, line));
                    }
                }
            }
        }
        None
    }
}

impl Default for ConnectFourState {
    fn default() -> Self {
        Self::new()
    }
}
