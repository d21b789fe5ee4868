//! Integration tests for the party game server components
//!
//! These tests validate cross-component interactions: the wire protocol,
//! real socket behavior, room membership flows, and the action path from
//! packet to engine.

use bincode::{deserialize, serialize};
use shared::protocol::{GameConfig, GameSnapshot, Packet};
use shared::tictactoe::Mark;
use shared::{ActionError, GameKey, PlayerRole};
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;
use tokio::time::sleep;

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests packet serialization round-trip for network protocol validation
    #[tokio::test]
    async fn packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::JoinRoom {
                code: "PARTY7".to_string(),
                username: "alice".to_string(),
            },
            Packet::StartGame {
                code: "PARTY7".to_string(),
                config: GameConfig {
                    game: GameKey::Carrom,
                    players: 2,
                },
            },
            Packet::TicTacToeMove {
                code: "PARTY7".to_string(),
                cell: 4,
            },
            Packet::Rejected {
                reason: ActionError::SpectatorsCannotAct,
            },
            Packet::Disconnected {
                reason: "Test".to_string(),
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: Packet = deserialize(&serialized).unwrap();
            assert_eq!(deserialized, packet);
        }
    }

    /// Tests that a garbage datagram never decodes into a packet
    #[test]
    fn malformed_datagram_is_rejected() {
        let garbage = vec![0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 0xff, 0xff];
        assert!(deserialize::<Packet>(&garbage).is_err());
        assert!(deserialize::<Packet>(&[]).is_err());
    }

    /// Tests real UDP socket communication with protocol packets
    #[tokio::test]
    async fn udp_socket_communication() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server_socket.local_addr().unwrap();

        // Echo server
        let server_socket_clone = server_socket.try_clone().unwrap();
        thread::spawn(move || {
            let mut buf = [0; 4096];
            if let Ok((size, client_addr)) = server_socket_clone.recv_from(&mut buf) {
                let _ = server_socket_clone.send_to(&buf[..size], client_addr);
            }
        });

        sleep(Duration::from_millis(10)).await;

        let client_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
        client_socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let test_packet = Packet::JoinRoom {
            code: "PARTY7".to_string(),
            username: "alice".to_string(),
        };
        let serialized = serialize(&test_packet).unwrap();

        client_socket.send_to(&serialized, server_addr).unwrap();

        let mut buf = [0; 4096];
        let (size, _) = client_socket.recv_from(&mut buf).unwrap();
        let received_packet: Packet = deserialize(&buf[..size]).unwrap();
        assert_eq!(received_packet, test_packet);
    }

    /// A full-state snapshot fits comfortably in a single datagram
    #[test]
    fn snapshot_packet_fits_one_datagram() {
        let names = ["alice".to_string(), "bob".to_string()];
        let carrom = shared::carrom::CarromState::new(names, 3);
        let packet = Packet::State {
            snapshot: GameSnapshot::Carrom(carrom),
        };

        let bytes = serialize(&packet).unwrap();
        assert!(
            bytes.len() < 4096,
            "snapshot packet is {} bytes",
            bytes.len()
        );
    }
}

/// ROOM REGISTRY TESTS
mod room_tests {
    use super::*;
    use server::rooms::RoomRegistry;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    /// Tests the full join, start, leave, reclaim lifecycle
    #[test]
    fn room_lifecycle_with_reconnection() {
        let mut registry = RoomRegistry::new();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        registry
            .join("PARTY7".to_string(), addr(5001), "bob".to_string())
            .unwrap();

        let config = GameConfig {
            game: GameKey::Ludo,
            players: 2,
        };
        registry.start_game("PARTY7", addr(5000), config).unwrap();

        let bob_role = registry
            .room("PARTY7")
            .unwrap()
            .participant_by_addr(addr(5001))
            .unwrap()
            .role;
        assert_eq!(bob_role, Some(PlayerRole::LudoSeat(1)));

        // Bob drops and returns from a new address with the same name.
        registry.leave("PARTY7", addr(5001)).unwrap();
        registry
            .join("PARTY7".to_string(), addr(7001), "bob".to_string())
            .unwrap();
        let reclaimed = registry
            .room("PARTY7")
            .unwrap()
            .participant_by_addr(addr(7001))
            .unwrap()
            .role;
        assert_eq!(reclaimed, bob_role);
    }

    /// Tests that joins to distinct codes land in distinct rooms
    #[test]
    fn rooms_are_isolated_by_code() {
        let mut registry = RoomRegistry::new();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        registry
            .join("GAMER2".to_string(), addr(5001), "bob".to_string())
            .unwrap();

        assert_eq!(registry.room_count(), 2);
        assert_eq!(registry.room("PARTY7").unwrap().participants.len(), 1);
        assert_eq!(registry.room("GAMER2").unwrap().participants.len(), 1);
        assert_eq!(registry.find_room_by_addr(addr(5001)), Some("GAMER2"));
    }
}

/// ACTION PATH TESTS
mod action_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use server::game::{GameInstance, PlayerAction};

    fn two_names() -> Vec<String> {
        vec!["alice".to_string(), "bob".to_string()]
    }

    /// Tests that an out-of-turn action is rejected and mutates nothing
    #[test]
    fn arbiter_rejects_without_mutation() {
        let config = GameConfig {
            game: GameKey::TicTacToe,
            players: 2,
        };
        let mut instance = GameInstance::start(config, &two_names());
        let mut rng = StdRng::seed_from_u64(3);
        let before = instance.clone();

        let err = instance
            .apply(
                PlayerRole::Mark(Mark::O),
                PlayerAction::Place { cell: 0 },
                &mut rng,
            )
            .unwrap_err();

        assert_eq!(err, ActionError::NotYourTurn);
        assert_eq!(instance, before);
    }

    /// Tests that a role from a different game cannot drive this one
    #[test]
    fn arbiter_rejects_cross_game_roles() {
        let config = GameConfig {
            game: GameKey::ConnectFour,
            players: 2,
        };
        let mut instance = GameInstance::start(config, &two_names());
        let mut rng = StdRng::seed_from_u64(3);

        let err = instance
            .apply(
                PlayerRole::Mark(Mark::X),
                PlayerAction::Drop { column: 0 },
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err, ActionError::NotYourTurn);
    }

    /// Tests a complete game driven through the instance layer, ending
    /// with a winner and a dead board
    #[test]
    fn full_tictactoe_game_through_instance() {
        let config = GameConfig {
            game: GameKey::TicTacToe,
            players: 2,
        };
        let mut instance = GameInstance::start(config, &two_names());
        let mut rng = StdRng::seed_from_u64(3);

        let script = [
            (Mark::X, 0usize),
            (Mark::O, 1),
            (Mark::X, 4),
            (Mark::O, 2),
            (Mark::X, 8),
        ];
        for (mark, cell) in script {
            instance
                .apply(PlayerRole::Mark(mark), PlayerAction::Place { cell }, &mut rng)
                .unwrap();
        }

        match instance.snapshot() {
            GameSnapshot::TicTacToe(state) => {
                assert_eq!(
                    state.winner,
                    Some(shared::tictactoe::RoundResult::Won(Mark::X))
                );
            }
            other => panic!("wrong snapshot: {:?}", other.key()),
        }

        let err = instance
            .apply(
                PlayerRole::Mark(Mark::O),
                PlayerAction::Place { cell: 5 },
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err, ActionError::NotYourTurn);
    }
}
