//! Game instance dispatch and turn arbitration
//!
//! A room runs at most one [`GameInstance`]. This module maps wire
//! actions onto the engine for whichever game is active, checks that the
//! sender's seat is allowed to act right now, and supplies the dice rolls
//! the engines themselves refuse to generate.

use log::debug;
use rand::Rng;
use shared::carrom::{CarromState, Seat, ShotPayload};
use shared::connect_four::{ConnectFourState, Disc};
use shared::ludo::{LudoState, DICE_MAX};
use shared::protocol::{GameConfig, GameSnapshot};
use shared::tictactoe::{Mark, TicTacToeState};
use shared::{ActionError, GameKey, PlayerRole};

/// An action extracted from a client packet, addressed to whichever
/// game is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerAction {
    Place { cell: usize },
    Drop { column: usize },
    Shot { shot: ShotPayload },
    Roll,
    MoveToken { token: usize },
}

impl PlayerAction {
    fn game(&self) -> GameKey {
        match self {
            PlayerAction::Place { .. } => GameKey::TicTacToe,
            PlayerAction::Drop { .. } => GameKey::ConnectFour,
            PlayerAction::Shot { .. } => GameKey::Carrom,
            PlayerAction::Roll | PlayerAction::MoveToken { .. } => GameKey::Ludo,
        }
    }
}

/// The active game of a room.
#[derive(Debug, Clone, PartialEq)]
pub enum GameInstance {
    TicTacToe(TicTacToeState),
    ConnectFour(ConnectFourState),
    Carrom(CarromState),
    Ludo(LudoState),
}

impl GameInstance {
    /// Builds a fresh game for the given config. `names` are the seated
    /// players in join order; missing names get placeholder labels so a
    /// game can be started before every seat is filled.
    pub fn start(config: GameConfig, names: &[String]) -> Self {
        let seats = config.seat_count();
        let mut seated: Vec<String> = names.iter().take(seats).cloned().collect();
        while seated.len() < seats {
            seated.push(format!("player {}", seated.len() + 1));
        }

        match config.game {
            GameKey::TicTacToe => GameInstance::TicTacToe(TicTacToeState::new()),
            GameKey::ConnectFour => GameInstance::ConnectFour(ConnectFourState::new()),
            GameKey::Carrom => {
                let mut it = seated.into_iter();
                let name_a = it.next().unwrap_or_default();
                let name_b = it.next().unwrap_or_default();
                GameInstance::Carrom(CarromState::new([name_a, name_b], 1))
            }
            GameKey::Ludo => GameInstance::Ludo(LudoState::new(&seated)),
        }
    }

    pub fn key(&self) -> GameKey {
        match self {
            GameInstance::TicTacToe(_) => GameKey::TicTacToe,
            GameInstance::ConnectFour(_) => GameKey::ConnectFour,
            GameInstance::Carrom(_) => GameKey::Carrom,
            GameInstance::Ludo(_) => GameKey::Ludo,
        }
    }

    /// The role handed to seat `index` when this game starts.
    pub fn role_for_seat(game: GameKey, index: usize) -> PlayerRole {
        match game {
            GameKey::TicTacToe => PlayerRole::Mark(if index == 0 { Mark::X } else { Mark::O }),
            GameKey::ConnectFour => PlayerRole::Disc(if index == 0 { Disc::R } else { Disc::Y }),
            GameKey::Carrom => PlayerRole::CarromSeat(if index == 0 { Seat::A } else { Seat::B }),
            GameKey::Ludo => PlayerRole::LudoSeat(index as u8),
        }
    }

    /// Whether `role` holds the turn right now. This is the single gate
    /// every action passes before it reaches an engine; an engine-level
    /// turn check behind it is a backstop, not the policy.
    pub fn can_act(&self, role: PlayerRole) -> bool {
        match (self, role) {
            (GameInstance::TicTacToe(state), PlayerRole::Mark(mark)) => {
                state.current_player() == Some(mark)
            }
            (GameInstance::ConnectFour(state), PlayerRole::Disc(disc)) => {
                state.current_player() == Some(disc)
            }
            (GameInstance::Carrom(state), PlayerRole::CarromSeat(seat)) => {
                state.current_player() == Some(seat)
            }
            (GameInstance::Ludo(state), PlayerRole::LudoSeat(seat)) => {
                state.current_player() == Some(seat)
            }
            _ => false,
        }
    }

    /// Applies one action for `role`. The registry has already verified
    /// room membership; this verifies seat, turn, and game match, then
    /// defers to the engine. Rejected actions leave the state untouched.
    pub fn apply<R: Rng>(
        &mut self,
        role: PlayerRole,
        action: PlayerAction,
        rng: &mut R,
    ) -> Result<(), ActionError> {
        if action.game() != self.key() {
            return Err(ActionError::WrongGame);
        }
        if !self.can_act(role) {
            return Err(ActionError::NotYourTurn);
        }

        match (self, role, action) {
            (
                GameInstance::TicTacToe(state),
                PlayerRole::Mark(mark),
                PlayerAction::Place { cell },
            ) => state.place(mark, cell),
            (
                GameInstance::ConnectFour(state),
                PlayerRole::Disc(disc),
                PlayerAction::Drop { column },
            ) => state.drop_disc(disc, column).map(|_| ()),
            (
                GameInstance::Carrom(state),
                PlayerRole::CarromSeat(seat),
                PlayerAction::Shot { shot },
            ) => {
                let outcome = state.shoot(seat, shot)?;
                debug!(
                    "carrom shot by {}: own {} opp {} foul {}",
                    seat, outcome.own_pocketed, outcome.opponent_pocketed, outcome.foul
                );
                Ok(())
            }
            (GameInstance::Ludo(state), PlayerRole::LudoSeat(seat), PlayerAction::Roll) => {
                let value = rng.gen_range(1..=DICE_MAX);
                let outcome = state.roll(seat, value)?;
                debug!(
                    "ludo seat {} rolled {} (can move: {})",
                    seat, outcome.value, outcome.can_move
                );
                Ok(())
            }
            (
                GameInstance::Ludo(state),
                PlayerRole::LudoSeat(seat),
                PlayerAction::MoveToken { token },
            ) => state.move_token(seat, token).map(|_| ()),
            _ => Err(ActionError::WrongGame),
        }
    }

    /// Restarts the game with the same players and settings.
    pub fn reset(&mut self) {
        match self {
            GameInstance::TicTacToe(state) => state.reset(),
            GameInstance::ConnectFour(state) => state.reset(),
            GameInstance::Carrom(state) => state.reset(),
            GameInstance::Ludo(state) => state.reset(),
        }
    }

    /// Full-state snapshot as broadcast after every accepted action.
    pub fn snapshot(&self) -> GameSnapshot {
        match self {
            GameInstance::TicTacToe(state) => GameSnapshot::TicTacToe(state.clone()),
            GameInstance::ConnectFour(state) => GameSnapshot::ConnectFour(state.clone()),
            GameInstance::Carrom(state) => GameSnapshot::Carrom(state.clone()),
            GameInstance::Ludo(state) => GameSnapshot::Ludo(state.clone()),
        }
    }
}
