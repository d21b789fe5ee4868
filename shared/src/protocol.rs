//! Wire protocol between clients and the authoritative server.
//!
//! Every datagram is a single bincode-encoded [`Packet`]. Clients send
//! join/action packets; the server answers with room bookkeeping and
//! full-state [`GameSnapshot`] broadcasts. There are no deltas: after
//! every accepted action the complete game state goes to the whole room,
//! so a late joiner or a reconnecting client is current after one packet.

use crate::carrom::{CarromState, ShotPayload};
use crate::connect_four::ConnectFourState;
use crate::ludo::LudoState;
use crate::tictactoe::TicTacToeState;
use crate::{ActionError, GameKey, PlayerRole};
use serde::{Deserialize, Serialize};

/// What a room is about to play and with how many seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub game: GameKey,
    /// Requested seat count; only Ludo honors values other than two.
    pub players: u8,
}

impl GameConfig {
    /// Seats the game actually plays with. Ludo allows two or four,
    /// everything else is strictly two.
    pub fn seat_count(&self) -> usize {
        match self.game {
            GameKey::Ludo => {
                if self.players >= 4 {
                    4
                } else {
                    2
                }
            }
            _ => 2,
        }
    }
}

/// Roster entry broadcast whenever a room's membership changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPlayer {
    pub username: String,
    pub role: Option<PlayerRole>,
    pub connected: bool,
}

/// Complete state of whichever game a room is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameSnapshot {
    TicTacToe(TicTacToeState),
    ConnectFour(ConnectFourState),
    Carrom(CarromState),
    Ludo(LudoState),
}

impl GameSnapshot {
    pub fn key(&self) -> GameKey {
        match self {
            GameSnapshot::TicTacToe(_) => GameKey::TicTacToe,
            GameSnapshot::ConnectFour(_) => GameKey::ConnectFour,
            GameSnapshot::Carrom(_) => GameKey::Carrom,
            GameSnapshot::Ludo(_) => GameKey::Ludo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    // Client -> server.
    JoinRoom { code: String, username: String },
    LeaveRoom { code: String },
    StartGame { code: String, config: GameConfig },
    Chat { code: String, text: String },
    RequestState { code: String },
    ResetGame { code: String },
    Ping { code: String },
    TicTacToeMove { code: String, cell: u8 },
    ConnectFourMove { code: String, column: u8 },
    CarromShot { code: String, shot: ShotPayload },
    LudoRoll { code: String },
    LudoMove { code: String, token: u8 },

    // Server -> client.
    JoinedRoom {
        code: String,
        participant_id: u32,
        role: Option<PlayerRole>,
    },
    /// Sent to each participant when a game starts; spectators get
    /// `role: None`.
    RoleAssigned {
        game: GameKey,
        role: Option<PlayerRole>,
    },
    RoomPlayers { players: Vec<RoomPlayer> },
    GameStarted { config: GameConfig },
    ChatMessage { from: String, text: String },
    System { text: String },
    State { snapshot: GameSnapshot },
    Rejected { reason: ActionError },
    Disconnected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tictactoe::Mark;

    #[test]
    fn test_packet_serialization_roundtrip() {
        let packets = vec![
            Packet::JoinRoom {
                code: "PARTY7".to_string(),
                username: "alice".to_string(),
            },
            Packet::StartGame {
                code: "PARTY7".to_string(),
                config: GameConfig {
                    game: GameKey::Ludo,
                    players: 4,
                },
            },
            Packet::CarromShot {
                code: "PARTY7".to_string(),
                shot: ShotPayload {
                    angle: -1.2,
                    power: 0.7,
                    baseline_x: 0.4,
                },
            },
            Packet::Rejected {
                reason: ActionError::NotYourTurn,
            },
        ];

        for packet in packets {
            let bytes = bincode::serialize(&packet).unwrap();
            let back: Packet = bincode::deserialize(&bytes).unwrap();
            assert_eq!(back, packet);
        }
    }

    #[test]
    fn test_snapshot_carries_its_game_key() {
        let snapshot = GameSnapshot::TicTacToe(TicTacToeState::new());
        assert_eq!(snapshot.key(), GameKey::TicTacToe);

        let bytes = bincode::serialize(&snapshot).unwrap();
        let back: GameSnapshot = bincode::deserialize(&bytes).unwrap();
        match back {
            GameSnapshot::TicTacToe(state) => assert_eq!(state.next, Some(Mark::X)),
            other => panic!("wrong snapshot variant: {:?}", other),
        }
    }

    #[test]
    fn test_seat_count_rules() {
        let two = GameConfig {
            game: GameKey::Ludo,
            players: 2,
        };
        let four = GameConfig {
            game: GameKey::Ludo,
            players: 4,
        };
        let odd = GameConfig {
            game: GameKey::Ludo,
            players: 3,
        };
        assert_eq!(two.seat_count(), 2);
        assert_eq!(four.seat_count(), 4);
        assert_eq!(odd.seat_count(), 2);

        let carrom = GameConfig {
            game: GameKey::Carrom,
            players: 4,
        };
        assert_eq!(carrom.seat_count(), 2);
    }

    #[test]
    fn test_malformed_bytes_fail_to_decode() {
        let garbage = [0xffu8; 16];
        assert!(bincode::deserialize::<Packet>(&garbage).is_err());
    }
}
