//! Shared rules and wire types for the party-game relay.
//!
//! Everything the authoritative server and any client agree on lives here:
//! the packet format, the full-state snapshots, and the four game engines
//! (Tic-Tac-Toe, Connect Four, Carrom, Ludo) as pure, deterministic state
//! machines. The engines draw no randomness themselves; dice values and
//! room codes are produced by the server and passed in, so an offline
//! practice mode and the server share exactly the same rule evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod carrom;
pub mod connect_four;
pub mod ludo;
pub mod protocol;
pub mod tictactoe;

/// Room codes are 6 characters from an alphabet without visually
/// ambiguous characters (no 0/O, no 1/I).
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_CODE_LEN: usize = 6;

/// The games a room can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameKey {
    TicTacToe,
    ConnectFour,
    Carrom,
    Ludo,
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKey::TicTacToe => write!(f, "tictactoe"),
            GameKey::ConnectFour => write!(f, "connect4"),
            GameKey::Carrom => write!(f, "carrom"),
            GameKey::Ludo => write!(f, "ludo"),
        }
    }
}

/// A participant's play seat within the active game. Spectators carry no
/// role and are barred from action packets server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerRole {
    Mark(tictactoe::Mark),
    Disc(connect_four::Disc),
    CarromSeat(carrom::Seat),
    LudoSeat(u8),
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerRole::Mark(m) => write!(f, "{}", m),
            PlayerRole::Disc(d) => write!(f, "{}", d),
            PlayerRole::CarromSeat(s) => write!(f, "{}", s),
            PlayerRole::LudoSeat(i) => write!(f, "seat {}", i),
        }
    }
}

/// Why an action was rejected. Sent back to the offending sender only;
/// the rest of the room never sees it and no state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionError {
    NotYourTurn,
    GameOver,
    CellOccupied,
    ColumnFull,
    OutOfRange,
    WrongPhase,
    IllegalTokenMove,
    SpectatorsCannotAct,
    UnknownRoom,
    NotInRoom,
    NoActiveGame,
    WrongGame,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ActionError::NotYourTurn => "not your turn",
            ActionError::GameOver => "the game is already over",
            ActionError::CellOccupied => "that cell is occupied",
            ActionError::ColumnFull => "that column is full",
            ActionError::OutOfRange => "value out of range",
            ActionError::WrongPhase => "action not legal in the current phase",
            ActionError::IllegalTokenMove => "that token cannot move with this roll",
            ActionError::SpectatorsCannotAct => "spectators cannot act",
            ActionError::UnknownRoom => "unknown room code",
            ActionError::NotInRoom => "you are not in this room",
            ActionError::NoActiveGame => "no game has been started in this room",
            ActionError::WrongGame => "action does not match the active game",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for ActionError {}
