//! Manual test client: joins a room with two sockets, starts a game of
//! Tic-Tac-Toe, and plays a scripted win while printing every packet the
//! server sends back.

use bincode::{deserialize, serialize};
use shared::protocol::{GameConfig, Packet};
use shared::GameKey;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

const ROOM: &str = "PARTY7";

async fn send(socket: &UdpSocket, server: SocketAddr, packet: &Packet) {
    match serialize(packet) {
        Ok(data) => {
            if let Err(e) = socket.send_to(&data, server).await {
                println!("Send failed: {}", e);
            }
        }
        Err(e) => println!("Serialize failed: {}", e),
    }
}

async fn drain(socket: &UdpSocket, label: &str) {
    let mut buf = [0u8; 4096];
    while let Ok(Ok((len, _))) =
        timeout(Duration::from_millis(200), socket.recv_from(&mut buf)).await
    {
        match deserialize::<Packet>(&buf[0..len]) {
            Ok(Packet::State { snapshot }) => {
                println!("[{}] state update for {}", label, snapshot.key());
            }
            Ok(packet) => println!("[{}] {:?}", label, packet),
            Err(e) => println!("[{}] failed to deserialize: {}", label, e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server_addr = "127.0.0.1:4000".parse::<SocketAddr>()?;

    let alice = UdpSocket::bind("0.0.0.0:0").await?;
    let bob = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Alice socket bound to {}", alice.local_addr()?);
    println!("Bob socket bound to {}", bob.local_addr()?);

    // Both players join the same room.
    send(
        &alice,
        server_addr,
        &Packet::JoinRoom {
            code: ROOM.to_string(),
            username: "alice".to_string(),
        },
    )
    .await;
    send(
        &bob,
        server_addr,
        &Packet::JoinRoom {
            code: ROOM.to_string(),
            username: "bob".to_string(),
        },
    )
    .await;
    sleep(Duration::from_millis(100)).await;
    drain(&alice, "alice").await;
    drain(&bob, "bob").await;

    // Alice starts Tic-Tac-Toe; join order seats her as X.
    send(
        &alice,
        server_addr,
        &Packet::StartGame {
            code: ROOM.to_string(),
            config: GameConfig {
                game: GameKey::TicTacToe,
                players: 2,
            },
        },
    )
    .await;
    sleep(Duration::from_millis(100)).await;
    drain(&alice, "alice").await;
    drain(&bob, "bob").await;

    // Scripted game: X takes the diagonal through the center.
    let moves: [(&UdpSocket, &str, u8); 5] = [
        (&alice, "alice", 0),
        (&bob, "bob", 1),
        (&alice, "alice", 4),
        (&bob, "bob", 2),
        (&alice, "alice", 8),
    ];
    for (socket, label, cell) in moves {
        println!("{} plays cell {}", label, cell);
        send(
            socket,
            server_addr,
            &Packet::TicTacToeMove {
                code: ROOM.to_string(),
                cell,
            },
        )
        .await;
        sleep(Duration::from_millis(100)).await;
        drain(&alice, "alice").await;
        drain(&bob, "bob").await;
    }

    send(
        &alice,
        server_addr,
        &Packet::LeaveRoom {
            code: ROOM.to_string(),
        },
    )
    .await;
    send(
        &bob,
        server_addr,
        &Packet::LeaveRoom {
            code: ROOM.to_string(),
        },
    )
    .await;
    println!("Test client finished");

    Ok(())
}
