//! Server network layer handling UDP communications and room coordination

use crate::game::{GameInstance, PlayerAction};
use crate::rooms::RoomRegistry;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::protocol::{GameConfig, Packet};
use shared::ActionError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ParticipantTimeout {
        code: String,
        username: String,
        addr: SocketAddr,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the room loop to the network sender task
#[derive(Debug)]
pub enum RoomMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        addrs: Vec<SocketAddr>,
    },
}

/// Main server coordinating networking and room state
pub struct Server {
    socket: Arc<UdpSocket>,
    rooms: Arc<RwLock<RoomRegistry>>,
    rng: StdRng,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    room_tx: mpsc::UnboundedSender<RoomMessage>,
    room_rx: mpsc::UnboundedReceiver<RoomMessage>,
}

impl Server {
    pub async fn new(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (room_tx, room_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            rooms: Arc::new(RwLock::new(RoomRegistry::new())),
            rng: StdRng::from_entropy(),
            server_tx,
            server_rx,
            room_tx,
            room_rx,
        })
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 4096];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut room_rx = std::mem::replace(&mut self.room_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = room_rx.recv().await {
                match message {
                    RoomMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    RoomMessage::BroadcastPacket { packet, addrs } => {
                        for addr in addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that sweeps for silent participants and stale rooms
    async fn spawn_timeout_checker(&self) {
        let rooms = Arc::clone(&self.rooms);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut rooms_guard = rooms.write().await;
                    let timed_out = rooms_guard.check_timeouts();
                    rooms_guard.reap_empty_rooms();
                    timed_out
                };

                for (code, participant) in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ParticipantTimeout {
                        code,
                        username: participant.username,
                        addr: participant.addr,
                    }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.room_tx.send(RoomMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Queues a packet for every participant of the room.
    async fn broadcast_to_room(&self, code: &str, packet: &Packet) {
        let addrs = {
            let rooms = self.rooms.read().await;
            match rooms.room(code) {
                Some(room) => room.addrs(),
                None => return,
            }
        };
        if addrs.is_empty() {
            return;
        }
        if let Err(e) = self.room_tx.send(RoomMessage::BroadcastPacket {
            packet: packet.clone(),
            addrs,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn broadcast_roster(&self, code: &str) {
        let players = {
            let rooms = self.rooms.read().await;
            match rooms.room(code) {
                Some(room) => room.roster(),
                None => return,
            }
        };
        self.broadcast_to_room(code, &Packet::RoomPlayers { players })
            .await;
    }

    async fn broadcast_state(&self, code: &str) {
        let snapshot = {
            let rooms = self.rooms.read().await;
            rooms
                .room(code)
                .and_then(|room| room.game.as_ref())
                .map(GameInstance::snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.broadcast_to_room(code, &Packet::State { snapshot })
                .await;
        }
    }

    async fn broadcast_system(&self, code: &str, text: String) {
        self.broadcast_to_room(code, &Packet::System { text }).await;
    }

    /// Processes incoming packets and updates room state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::JoinRoom { code, username } => {
                self.handle_join(code, username, addr).await;
            }

            Packet::LeaveRoom { code } => {
                self.handle_leave(&code, addr, "left the room").await;
            }

            Packet::StartGame { code, config } => {
                self.handle_start(&code, config, addr).await;
            }

            Packet::Chat { code, text } => {
                let sender = {
                    let mut rooms = self.rooms.write().await;
                    rooms.touch(&code, addr);
                    rooms.room(&code).and_then(|room| {
                        room.participant_by_addr(addr).map(|p| p.username.clone())
                    })
                };
                if let Some(from) = sender {
                    self.broadcast_to_room(&code, &Packet::ChatMessage { from, text })
                        .await;
                }
            }

            Packet::RequestState { code } => {
                // Idempotent full-state resend for the asking client only.
                let snapshot = {
                    let mut rooms = self.rooms.write().await;
                    rooms.touch(&code, addr);
                    rooms
                        .room(&code)
                        .filter(|room| room.participant_by_addr(addr).is_some())
                        .and_then(|room| room.game.as_ref())
                        .map(GameInstance::snapshot)
                };
                if let Some(snapshot) = snapshot {
                    self.send_packet(&Packet::State { snapshot }, addr);
                }
            }

            Packet::ResetGame { code } => {
                self.handle_reset(&code, addr).await;
            }

            Packet::Ping { code } => {
                let mut rooms = self.rooms.write().await;
                rooms.touch(&code, addr);
            }

            Packet::TicTacToeMove { code, cell } => {
                let action = PlayerAction::Place { cell: cell as usize };
                self.handle_action(&code, addr, action).await;
            }

            Packet::ConnectFourMove { code, column } => {
                let action = PlayerAction::Drop {
                    column: column as usize,
                };
                self.handle_action(&code, addr, action).await;
            }

            Packet::CarromShot { code, shot } => {
                self.handle_action(&code, addr, PlayerAction::Shot { shot })
                    .await;
            }

            Packet::LudoRoll { code } => {
                self.handle_action(&code, addr, PlayerAction::Roll).await;
            }

            Packet::LudoMove { code, token } => {
                let action = PlayerAction::MoveToken {
                    token: token as usize,
                };
                self.handle_action(&code, addr, action).await;
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn handle_join(&mut self, code: String, username: String, addr: SocketAddr) {
        let code = match RoomRegistry::normalize_code(&code) {
            Some(code) => code,
            None => {
                self.send_packet(
                    &Packet::Rejected {
                        reason: ActionError::UnknownRoom,
                    },
                    addr,
                );
                return;
            }
        };

        let joined = {
            let mut rooms = self.rooms.write().await;
            match rooms.join(code.clone(), addr, username.clone()) {
                Ok(room) => room.participant_by_addr(addr).map(|p| (p.id, p.role)),
                Err(reason) => {
                    drop(rooms);
                    self.send_packet(&Packet::Rejected { reason }, addr);
                    return;
                }
            }
        };

        if let Some((participant_id, role)) = joined {
            self.send_packet(
                &Packet::JoinedRoom {
                    code: code.clone(),
                    participant_id,
                    role,
                },
                addr,
            );
            self.broadcast_roster(&code).await;
            self.broadcast_system(&code, format!("{} joined", username))
                .await;
            // A mid-game joiner gets the board right away.
            let snapshot = {
                let rooms = self.rooms.read().await;
                rooms
                    .room(&code)
                    .and_then(|room| room.game.as_ref())
                    .map(GameInstance::snapshot)
            };
            if let Some(snapshot) = snapshot {
                self.send_packet(&Packet::State { snapshot }, addr);
            }
        }
    }

    async fn handle_leave(&mut self, code: &str, addr: SocketAddr, notice: &str) {
        let left = {
            let mut rooms = self.rooms.write().await;
            rooms.leave(code, addr).ok()
        };
        if let Some(participant) = left {
            self.broadcast_roster(code).await;
            self.broadcast_system(code, format!("{} {}", participant.username, notice))
                .await;
        }
    }

    async fn handle_start(&mut self, code: &str, config: GameConfig, addr: SocketAddr) {
        let result = {
            let mut rooms = self.rooms.write().await;
            rooms.touch(code, addr);
            rooms.start_game(code, addr, config).map(|room| {
                room.participants
                    .iter()
                    .map(|p| (p.addr, p.role))
                    .collect::<Vec<_>>()
            })
        };

        match result {
            Ok(seats) => {
                for (seat_addr, role) in seats {
                    self.send_packet(
                        &Packet::RoleAssigned {
                            game: config.game,
                            role,
                        },
                        seat_addr,
                    );
                }
                self.broadcast_to_room(code, &Packet::GameStarted { config })
                    .await;
                self.broadcast_roster(code).await;
                self.broadcast_state(code).await;
            }
            Err(reason) => {
                self.send_packet(&Packet::Rejected { reason }, addr);
            }
        }
    }

    async fn handle_reset(&mut self, code: &str, addr: SocketAddr) {
        let reset = {
            let mut rooms = self.rooms.write().await;
            rooms.touch(code, addr);
            match rooms.room_mut(code) {
                Some(room) if room.participant_by_addr(addr).is_some() => {
                    match room.game.as_mut() {
                        Some(game) => {
                            game.reset();
                            Ok(())
                        }
                        None => Err(ActionError::NoActiveGame),
                    }
                }
                Some(_) => Err(ActionError::NotInRoom),
                None => Err(ActionError::UnknownRoom),
            }
        };

        match reset {
            Ok(()) => {
                self.broadcast_system(code, "game reset".to_string()).await;
                self.broadcast_state(code).await;
            }
            Err(reason) => {
                self.send_packet(&Packet::Rejected { reason }, addr);
            }
        }
    }

    /// Common path for every in-game action: membership, seat, and turn
    /// checks happen here in order, then the engine applies the move.
    /// On success the whole room gets the new state; on rejection only
    /// the sender hears about it and nothing changes.
    async fn handle_action(&mut self, code: &str, addr: SocketAddr, action: PlayerAction) {
        let result = {
            let mut rooms = self.rooms.write().await;
            rooms.touch(code, addr);
            let room = match rooms.room_mut(code) {
                Some(room) => room,
                None => {
                    drop(rooms);
                    self.send_packet(
                        &Packet::Rejected {
                            reason: ActionError::UnknownRoom,
                        },
                        addr,
                    );
                    return;
                }
            };

            let role = match room.participant_by_addr(addr) {
                Some(participant) => participant.role,
                None => {
                    drop(rooms);
                    self.send_packet(
                        &Packet::Rejected {
                            reason: ActionError::NotInRoom,
                        },
                        addr,
                    );
                    return;
                }
            };

            match (room.game.as_mut(), role) {
                (None, _) => Err(ActionError::NoActiveGame),
                (Some(_), None) => Err(ActionError::SpectatorsCannotAct),
                (Some(game), Some(role)) => game.apply(role, action, &mut self.rng),
            }
        };

        match result {
            Ok(()) => {
                self.broadcast_state(code).await;
            }
            Err(reason) => {
                debug!("Rejected action from {} in {}: {}", addr, code, reason);
                self.send_packet(&Packet::Rejected { reason }, addr);
            }
        }
    }

    /// Tells a timed-out participant why they were dropped, then lets the
    /// rest of the room know. The registry has already removed them.
    async fn handle_timeout(&mut self, code: &str, username: &str, addr: SocketAddr) {
        info!("Participant {} timed out in room {}", username, code);
        self.send_packet(
            &Packet::Disconnected {
                reason: "timed out".to_string(),
            },
            addr,
        );
        self.broadcast_roster(code).await;
        self.broadcast_system(code, format!("{} disconnected", username))
            .await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        info!("Server started successfully");

        loop {
            match self.server_rx.recv().await {
                Some(ServerMessage::PacketReceived { packet, addr }) => {
                    self.handle_packet(packet, addr).await;
                }
                Some(ServerMessage::ParticipantTimeout {
                    code,
                    username,
                    addr,
                }) => {
                    self.handle_timeout(&code, &username, addr).await;
                }
                Some(ServerMessage::Shutdown) | None => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
