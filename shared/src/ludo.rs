//! Ludo rules: a token race on a shared 28-square loop with home zones,
//! captures, safe squares, and extra rolls on a six.
//!
//! The engine never rolls dice itself; the server passes the rolled value
//! in, which keeps every transition deterministic and testable.

use crate::ActionError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TOKENS_PER_PLAYER: usize = 4;
pub const TRACK_LENGTH: u16 = 28;
pub const DICE_MAX: u8 = 6;

/// Star squares on the loop where captures cannot occur.
pub const SAFE_SQUARES: [u16; 8] = [2, 6, 10, 14, 16, 20, 24, 26];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenState {
    Home,
    Track,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub state: TokenState,
    /// Steps taken from this player's start square.
    pub steps: u16,
    /// Board index while on the track, `None` otherwise.
    pub pos: Option<u16>,
}

impl Token {
    fn home() -> Self {
        Token {
            state: TokenState::Home,
            steps: 0,
            pos: None,
        }
    }
}

/// Seat colors in join order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatColor {
    Red,
    Green,
    Yellow,
    Blue,
}

impl fmt::Display for SeatColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatColor::Red => write!(f, "Red"),
            SeatColor::Green => write!(f, "Green"),
            SeatColor::Yellow => write!(f, "Yellow"),
            SeatColor::Blue => write!(f, "Blue"),
        }
    }
}

const SEAT_COLORS: [SeatColor; 4] = [
    SeatColor::Red,
    SeatColor::Green,
    SeatColor::Yellow,
    SeatColor::Blue,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LudoPlayer {
    pub id: u8,
    pub name: String,
    pub color: SeatColor,
    /// Fixed entry square on the shared loop.
    pub start_index: u16,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Awaiting a dice roll.
    Idle,
    /// Awaiting a token choice for the rolled value.
    Rolled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LudoState {
    pub players: Vec<LudoPlayer>,
    pub current_player: u8,
    pub dice: Option<u8>,
    pub phase: Phase,
    pub winner: Option<u8>,
    /// Who has rolled in the current round-robin cycle; cleared once
    /// everyone has.
    pub rolled_flags: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollOutcome {
    pub value: u8,
    /// False means no token could move and the turn auto-passed.
    pub can_move: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// `(player, token)` pairs sent back home by this move.
    pub captured: Vec<(u8, usize)>,
    pub finished_token: bool,
    pub extra_roll: bool,
}

impl LudoState {
    /// Creates a fresh race for 2 or 4 players. Start squares are spread
    /// evenly around the loop.
    pub fn new(names: &[String]) -> Self {
        let count = names.len();
        let players = names
            .iter()
            .enumerate()
            .map(|(i, name)| LudoPlayer {
                id: i as u8,
                name: name.clone(),
                color: SEAT_COLORS[i],
                start_index: (TRACK_LENGTH * i as u16) / count as u16,
                tokens: vec![Token::home(); TOKENS_PER_PLAYER],
            })
            .collect();

        Self {
            players,
            current_player: 0,
            dice: None,
            phase: Phase::Idle,
            winner: None,
            rolled_flags: vec![false; count],
        }
    }

    pub fn reset(&mut self) {
        let names: Vec<String> = self.players.iter().map(|p| p.name.clone()).collect();
        *self = Self::new(&names);
    }

    pub fn current_player(&self) -> Option<u8> {
        if self.winner.is_some() {
            None
        } else {
            Some(self.current_player)
        }
    }

    /// Rolls `value` for `seat`. Legal only for the current player in the
    /// idle phase. If the roll leaves no legal move the turn auto-passes
    /// immediately; clients never need to time out.
    pub fn roll(&mut self, seat: u8, value: u8) -> Result<RollOutcome, ActionError> {
        if self.winner.is_some() {
            return Err(ActionError::GameOver);
        }
        if seat != self.current_player {
            return Err(ActionError::NotYourTurn);
        }
        if self.phase != Phase::Idle {
            return Err(ActionError::WrongPhase);
        }
        if !(1..=DICE_MAX).contains(&value) {
            return Err(ActionError::OutOfRange);
        }

        self.dice = Some(value);
        self.phase = Phase::Rolled;
        self.rolled_flags[seat as usize] = true;
        if self.rolled_flags.iter().all(|&rolled| rolled) {
            self.rolled_flags.iter_mut().for_each(|f| *f = false);
        }

        let can_move = self.players[seat as usize]
            .tokens
            .iter()
            .any(|t| Self::token_movable(t, value));
        if !can_move {
            self.end_turn(value);
        }
        Ok(RollOutcome { value, can_move })
    }

    /// Moves the given token by the rolled value. A home token enters the
    /// track only on a six; a track token may not overshoot the final
    /// square; such a move is rejected, never clamped.
    pub fn move_token(&mut self, seat: u8, token: usize) -> Result<MoveOutcome, ActionError> {
        if self.winner.is_some() {
            return Err(ActionError::GameOver);
        }
        if seat != self.current_player {
            return Err(ActionError::NotYourTurn);
        }
        if self.phase != Phase::Rolled {
            return Err(ActionError::WrongPhase);
        }
        if token >= TOKENS_PER_PLAYER {
            return Err(ActionError::OutOfRange);
        }
        let value = self.dice.ok_or(ActionError::WrongPhase)?;

        let start_index = self.players[seat as usize].start_index;
        let tok = self.players[seat as usize].tokens[token];
        if !Self::token_movable(&tok, value) {
            return Err(ActionError::IllegalTokenMove);
        }

        let mut finished = false;
        let moved = {
            let tok = &mut self.players[seat as usize].tokens[token];
            match tok.state {
                TokenState::Home => {
                    tok.state = TokenState::Track;
                    tok.steps = 0;
                    tok.pos = Some(start_index);
                }
                TokenState::Track => {
                    let steps = tok.steps + value as u16;
                    if steps == TRACK_LENGTH {
                        tok.state = TokenState::Done;
                        tok.steps = steps;
                        tok.pos = None;
                        finished = true;
                    } else {
                        tok.steps = steps;
                        tok.pos = Some((start_index + steps) % TRACK_LENGTH);
                    }
                }
                TokenState::Done => unreachable!("movable check excludes done tokens"),
            }
            *tok
        };

        let captured = if let (TokenState::Track, Some(pos)) = (moved.state, moved.pos) {
            self.capture_at(seat, pos)
        } else {
            Vec::new()
        };

        if self.players[seat as usize]
            .tokens
            .iter()
            .all(|t| t.state == TokenState::Done)
        {
            self.winner = Some(seat);
        }

        let extra_roll = value == DICE_MAX && self.winner.is_none();
        self.end_turn(value);

        Ok(MoveOutcome {
            captured,
            finished_token: finished,
            extra_roll,
        })
    }

    /// Sends every opposing token on `pos` back home, unless `pos` is a
    /// safe square. Stacked opponents all go home together; same-owner
    /// stacking never captures.
    fn capture_at(&mut self, mover: u8, pos: u16) -> Vec<(u8, usize)> {
        let mut captured = Vec::new();
        if SAFE_SQUARES.contains(&pos) {
            return captured;
        }
        for player in &mut self.players {
            if player.id == mover {
                continue;
            }
            for (idx, tok) in player.tokens.iter_mut().enumerate() {
                if tok.state == TokenState::Track && tok.pos == Some(pos) {
                    *tok = Token::home();
                    captured.push((player.id, idx));
                }
            }
        }
        captured
    }

    /// A six grants the same player another roll; otherwise the turn
    /// advances round-robin.
    fn end_turn(&mut self, last_roll: u8) {
        if self.winner.is_some() {
            return;
        }
        if last_roll != DICE_MAX {
            self.current_player = (self.current_player + 1) % self.players.len() as u8;
        }
        self.phase = Phase::Idle;
        self.dice = None;
    }

    fn token_movable(token: &Token, value: u8) -> bool {
        match token.state {
            TokenState::Done => false,
            TokenState::Home => value == DICE_MAX,
            TokenState::Track => token.steps + value as u16 <= TRACK_LENGTH,
        }
    }
}
