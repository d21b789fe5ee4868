//! Tic-Tac-Toe rules: 3x3 grid, win and draw detection.

use crate::ActionError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CELLS: usize = 9;

/// The eight winning triples, in canonical order: rows, columns, diagonals.
pub const WINNING_TRIPLES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundResult {
    Won(Mark),
    Draw,
}

/// Full game state; broadcast as-is after every accepted move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicTacToeState {
    pub board: Vec<Option<Mark>>,
    /// Mark to move; `None` once the game is decided.
    pub next: Option<Mark>,
    pub winner: Option<RoundResult>,
}

impl TicTacToeState {
    /// X always opens.
    pub fn new() -> Self {
        Self {
            board: vec![None; CELLS],
            next: Some(Mark::X),
            winner: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Mark whose turn it is, or `None` once the game is decided.
    pub fn current_player(&self) -> Option<Mark> {
        if self.winner.is_some() {
            None
        } else {
            self.next
        }
    }

    /// Places `mark` into `cell`. Rejects occupied cells, finished games,
    /// out-of-range indices, and out-of-turn movers without mutating state.
    pub fn place(&mut self, mark: Mark, cell: usize) -> Result<(), ActionError> {
        if self.winner.is_some() {
            return Err(ActionError::GameOver);
        }
        if cell >= CELLS {
            return Err(ActionError::OutOfRange);
        }
        if self.next != Some(mark) {
            return Err(ActionError::NotYourTurn);
        }
        if self.board[cell].is_some() {
            return Err(ActionError::CellOccupied);
        }

        self.board[cell] = Some(mark);

        if let Some(result) = self.compute_result() {
            self.winner = Some(result);
            self.next = None;
        } else {
            self.next = Some(mark.other());
        }
        Ok(())
    }

    fn compute_result(&self) -> Option<RoundResult> {
        for [a, b, c] in WINNING_TRIPLES {
            if let Some(mark) = self.board[a] {
                if self.board[b] == Some(mark) && self.board[c] == Some(mark) {
                    return Some(RoundResult::Won(mark));
                }
            }
        }
        if self.board.iter().all(|cell| cell.is_some()) {
            return Some(RoundResult::Draw);
        }
        None
    }
}

impl Default for TicTacToeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_board_x_opens() {
        let state = TicTacToeState::new();
        assert_eq!(state.board.len(), CELLS);
        assert!(state.board.iter().all(|c| c.is_none()));
        assert_eq!(state.next, Some(Mark::X));
        assert_eq!(state.winner, None);
    }

    #[test]
    fn test_diagonal_win() {
        let mut state = TicTacToeState::new();
        state.place(Mark::X, 0).unwrap();
        state.place(Mark::O, 1).unwrap();
        state.place(Mark::X, 4).unwrap();
        state.place(Mark::O, 2).unwrap();
        state.place(Mark::X, 8).unwrap();

        assert_eq!(state.winner, Some(RoundResult::Won(Mark::X)));
        assert_eq!(state.next, None);
        assert_eq!(state.current_player(), None);
    }

    #[test]
    fn test_occupied_cell_rejected_without_mutation() {
        let mut state = TicTacToeState::new();
        state.place(Mark::X, 4).unwrap();

        let before = state.clone();
        assert_eq!(state.place(Mark::O, 4), Err(ActionError::CellOccupied));
        assert_eq!(state, before);
    }

    #[test]
    fn test_out_of_turn_rejected() {
        let mut state = TicTacToeState::new();
        assert_eq!(state.place(Mark::O, 0), Err(ActionError::NotYourTurn));
        assert!(state.board[0].is_none());
    }

    #[test]
    fn test_out_of_range_cell_rejected() {
        let mut state = TicTacToeState::new();
        assert_eq!(state.place(Mark::X, 9), Err(ActionError::OutOfRange));
    }

    #[test]
    fn test_no_moves_after_win() {
        let mut state = TicTacToeState::new();
        state.place(Mark::X, 0).unwrap();
        state.place(Mark::O, 3).unwrap();
        state.place(Mark::X, 1).unwrap();
        state.place(Mark::O, 4).unwrap();
        state.place(Mark::X, 2).unwrap();
        assert_eq!(state.winner, Some(RoundResult::Won(Mark::X)));

        assert_eq!(state.place(Mark::O, 5), Err(ActionError::GameOver));
    }

    #[test]
    fn test_draw_when_board_full() {
        let mut state = TicTacToeState::new();
        // X O X / X O O / O X X, no three in a row.
        for (mark, cell) in [
            (Mark::X, 0),
            (Mark::O, 1),
            (Mark::X, 2),
            (Mark::O, 4),
            (Mark::X, 3),
            (Mark::O, 5),
            (Mark::X, 7),
            (Mark::O, 6),
            (Mark::X, 8),
        ] {
            state.place(mark, cell).unwrap();
        }
        assert_eq!(state.winner, Some(RoundResult::Draw));
    }

    #[test]
    fn test_reset_restores_opening_state() {
        let mut state = TicTacToeState::new();
        state.place(Mark::X, 0).unwrap();
        state.reset();
        assert_eq!(state, TicTacToeState::new());
    }

    #[test]
    fn test_state_serialization_roundtrip() {
        let mut state = TicTacToeState::new();
        state.place(Mark::X, 4).unwrap();

        let bytes = bincode::serialize(&state).unwrap();
        let back: TicTacToeState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, state);
    }
}
