//! Room and participant management for the party server
//!
//! This module handles the server-side bookkeeping of rooms and the people
//! in them, including:
//! - Room creation on first join and code generation
//! - Participant lifecycle (join, leave, timeout, reconnect)
//! - Seat parking so a dropped player can reclaim their role by username
//! - Reaping of rooms that have sat empty past their grace period
//!
//! The registry owns no game rules; it decides who is in which room and
//! which seat, and hands the rest to the active [`GameInstance`].

use crate::game::GameInstance;
use log::info;
use rand::Rng;
use shared::protocol::{GameConfig, RoomPlayer};
use shared::{ActionError, PlayerRole, ROOM_CODE_ALPHABET, ROOM_CODE_LEN};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// No packet from a participant for this long marks them disconnected.
pub const PARTICIPANT_TIMEOUT: Duration = Duration::from_secs(30);
/// Rooms with nobody in them are deleted after this grace period.
pub const EMPTY_ROOM_TTL: Duration = Duration::from_secs(60);

const MAX_ROOM_OCCUPANTS: usize = 16;

/// One person in a room, identified by their network address.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Unique id assigned by the registry, stable across the session
    pub id: u32,
    pub addr: SocketAddr,
    pub username: String,
    /// Play seat in the active game; `None` for spectators
    pub role: Option<PlayerRole>,
    /// Last time any packet arrived from this address
    pub last_seen: Instant,
}

impl Participant {
    fn new(id: u32, addr: SocketAddr, username: String) -> Self {
        Self {
            id,
            addr,
            username,
            role: None,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// A single room: its occupants in join order and the game they play.
#[derive(Debug)]
pub struct Room {
    pub code: String,
    /// Join order decides seat assignment when a game starts.
    pub participants: Vec<Participant>,
    pub config: Option<GameConfig>,
    pub game: Option<GameInstance>,
    /// Roles of players who dropped mid-game, keyed by username so a
    /// reconnecting player can pick their seat back up.
    pub parked_roles: HashMap<String, PlayerRole>,
    /// Set when the last participant leaves; cleared on any join.
    pub empty_since: Option<Instant>,
}

impl Room {
    fn new(code: String) -> Self {
        Self {
            code,
            participants: Vec::new(),
            config: None,
            game: None,
            parked_roles: HashMap::new(),
            empty_since: None,
        }
    }

    pub fn participant_by_addr(&self, addr: SocketAddr) -> Option<&Participant> {
        self.participants.iter().find(|p| p.addr == addr)
    }

    pub fn participant_by_addr_mut(&mut self, addr: SocketAddr) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.addr == addr)
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.participants.iter().map(|p| p.addr).collect()
    }

    /// Roster as broadcast to the room after every membership change.
    pub fn roster(&self) -> Vec<RoomPlayer> {
        let mut players: Vec<RoomPlayer> = self
            .participants
            .iter()
            .map(|p| RoomPlayer {
                username: p.username.clone(),
                role: p.role,
                connected: true,
            })
            .collect();
        for (username, role) in &self.parked_roles {
            players.push(RoomPlayer {
                username: username.clone(),
                role: Some(*role),
                connected: false,
            });
        }
        players
    }

    /// Hands out seats in join order when a game starts. Participants
    /// beyond the seat count stay roleless and spectate.
    fn assign_roles(&mut self, config: GameConfig) {
        let seats = config.seat_count();
        for (index, participant) in self.participants.iter_mut().enumerate() {
            participant.role = if index < seats {
                Some(GameInstance::role_for_seat(config.game, index))
            } else {
                None
            };
        }
        self.parked_roles.clear();
    }
}

/// All rooms on the server, plus the id counter for new participants.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    next_participant_id: u32,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            next_participant_id: 1,
        }
    }

    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn room_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Draws a code that is not currently in use.
    pub fn generate_code<R: Rng>(&self, rng: &mut R) -> String {
        loop {
            let code: String = (0..ROOM_CODE_LEN)
                .map(|_| {
                    let idx = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
                    ROOM_CODE_ALPHABET[idx] as char
                })
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// Normalizes a client-supplied code to the room code alphabet.
    /// Returns `None` when the code has the wrong length or characters
    /// outside the alphabet.
    pub fn normalize_code(code: &str) -> Option<String> {
        let upper = code.trim().to_ascii_uppercase();
        if upper.len() != ROOM_CODE_LEN {
            return None;
        }
        if upper.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)) {
            Some(upper)
        } else {
            None
        }
    }

    /// Joins `addr` into the room with `code`, creating the room if it
    /// does not exist yet. A username that matches a parked mid-game
    /// seat reclaims that seat.
    pub fn join(
        &mut self,
        code: String,
        addr: SocketAddr,
        username: String,
    ) -> Result<&Room, ActionError> {
        let room = self
            .rooms
            .entry(code.clone())
            .or_insert_with(|| Room::new(code.clone()));

        if room.participants.len() >= MAX_ROOM_OCCUPANTS {
            return Err(ActionError::NotInRoom);
        }

        // A rejoin from the same address just refreshes the entry.
        if let Some(existing) = room.participant_by_addr_mut(addr) {
            existing.username = username;
            existing.last_seen = Instant::now();
            return Ok(&self.rooms[&code]);
        }

        let id = self.next_participant_id;
        self.next_participant_id += 1;

        let mut participant = Participant::new(id, addr, username);
        if let Some(role) = room.parked_roles.remove(&participant.username) {
            info!(
                "{} reclaims seat {} in room {}",
                participant.username, role, code
            );
            participant.role = Some(role);
        }
        info!(
            "Participant {} ({}) joined room {} from {}",
            participant.id, participant.username, code, addr
        );

        room.empty_since = None;
        room.participants.push(participant);
        Ok(&self.rooms[&code])
    }

    /// Removes `addr` from the room. A seated player leaving mid-game
    /// has their role parked under their username for reconnection.
    /// Returns the removed participant.
    pub fn leave(&mut self, code: &str, addr: SocketAddr) -> Result<Participant, ActionError> {
        let room = self.rooms.get_mut(code).ok_or(ActionError::UnknownRoom)?;
        let index = room
            .participants
            .iter()
            .position(|p| p.addr == addr)
            .ok_or(ActionError::NotInRoom)?;

        let participant = room.participants.remove(index);
        if let Some(role) = participant.role {
            if room.game.is_some() {
                room.parked_roles
                    .insert(participant.username.clone(), role);
            }
        }
        if room.participants.is_empty() {
            room.empty_since = Some(Instant::now());
        }
        info!(
            "Participant {} ({}) left room {}",
            participant.id, participant.username, code
        );
        Ok(participant)
    }

    /// Starts (or restarts) a game in the room, assigning seats in join
    /// order. Any participant may start; a start replaces the previous
    /// game outright.
    pub fn start_game(
        &mut self,
        code: &str,
        addr: SocketAddr,
        config: GameConfig,
    ) -> Result<&Room, ActionError> {
        let room = self.rooms.get_mut(code).ok_or(ActionError::UnknownRoom)?;
        if room.participant_by_addr(addr).is_none() {
            return Err(ActionError::NotInRoom);
        }

        room.assign_roles(config);
        let names: Vec<String> = room
            .participants
            .iter()
            .filter(|p| p.role.is_some())
            .map(|p| p.username.clone())
            .collect();
        room.game = Some(GameInstance::start(config, &names));
        room.config = Some(config);
        info!("Room {} started {}", code, config.game);
        Ok(&*room)
    }

    /// Finds which room an address currently sits in.
    pub fn find_room_by_addr(&self, addr: SocketAddr) -> Option<&str> {
        self.rooms
            .values()
            .find(|room| room.participant_by_addr(addr).is_some())
            .map(|room| room.code.as_str())
    }

    pub fn touch(&mut self, code: &str, addr: SocketAddr) {
        if let Some(room) = self.rooms.get_mut(code) {
            if let Some(participant) = room.participant_by_addr_mut(addr) {
                participant.last_seen = Instant::now();
            }
        }
    }

    /// Sweeps all rooms for silent participants. Returns the removed
    /// `(room code, participant)` pairs so the caller can notify rooms.
    pub fn check_timeouts(&mut self) -> Vec<(String, Participant)> {
        let mut timed_out = Vec::new();
        let codes: Vec<String> = self.rooms.keys().cloned().collect();
        for code in codes {
            let stale: Vec<SocketAddr> = self.rooms[&code]
                .participants
                .iter()
                .filter(|p| p.is_timed_out(PARTICIPANT_TIMEOUT))
                .map(|p| p.addr)
                .collect();
            for addr in stale {
                if let Ok(participant) = self.leave(&code, addr) {
                    timed_out.push((code.clone(), participant));
                }
            }
        }
        timed_out
    }

    /// Deletes rooms that have been empty past the grace period.
    pub fn reap_empty_rooms(&mut self) -> Vec<String> {
        let dead: Vec<String> = self
            .rooms
            .values()
            .filter(|room| {
                room.participants.is_empty()
                    && room
                        .empty_since
                        .map(|since| since.elapsed() > EMPTY_ROOM_TTL)
                        .unwrap_or(false)
            })
            .map(|room| room.code.clone())
            .collect();
        for code in &dead {
            self.rooms.remove(code);
            info!("Reaped empty room {}", code);
        }
        dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::GameKey;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn test_generated_codes_use_the_room_alphabet() {
        let registry = RoomRegistry::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let code = registry.generate_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_normalize_code_uppercases_and_validates() {
        assert_eq!(
            RoomRegistry::normalize_code(" party7 "),
            Some("PARTY7".to_string())
        );
        assert_eq!(RoomRegistry::normalize_code("SHORT"), None);
        // 0 and O are not in the alphabet.
        assert_eq!(RoomRegistry::normalize_code("PART00"), None);
    }

    #[test]
    fn test_join_creates_room_on_first_use() {
        let mut registry = RoomRegistry::new();
        assert_eq!(registry.room_count(), 0);

        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        assert_eq!(registry.room_count(), 1);
        let room = registry.room("PARTY7").unwrap();
        assert_eq!(room.participants.len(), 1);
        assert_eq!(room.participants[0].username, "alice");
        assert_eq!(room.participants[0].role, None);
    }

    #[test]
    fn test_rejoin_from_same_addr_does_not_duplicate() {
        let mut registry = RoomRegistry::new();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        assert_eq!(registry.room("PARTY7").unwrap().participants.len(), 1);
    }

    #[test]
    fn test_start_game_seats_in_join_order() {
        let mut registry = RoomRegistry::new();
        for (port, name) in [(5000, "alice"), (5001, "bob"), (5002, "carol")] {
            registry
                .join("PARTY7".to_string(), addr(port), name.to_string())
                .unwrap();
        }

        let config = GameConfig {
            game: GameKey::TicTacToe,
            players: 2,
        };
        let room = registry.start_game("PARTY7", addr(5000), config).unwrap();

        assert!(room.participants[0].role.is_some());
        assert!(room.participants[1].role.is_some());
        // Third joiner spectates a two-seat game.
        assert_eq!(room.participants[2].role, None);
        assert!(room.game.is_some());
    }

    #[test]
    fn test_start_game_rejected_for_outsider() {
        let mut registry = RoomRegistry::new();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();

        let config = GameConfig {
            game: GameKey::TicTacToe,
            players: 2,
        };
        let err = registry
            .start_game("PARTY7", addr(9999), config)
            .unwrap_err();
        assert_eq!(err, ActionError::NotInRoom);
        let missing = registry.start_game("NOROOM", addr(5000), config);
        assert_eq!(missing.unwrap_err(), ActionError::UnknownRoom);
    }

    #[test]
    fn test_leave_parks_role_for_reconnection() {
        let mut registry = RoomRegistry::new();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        registry
            .join("PARTY7".to_string(), addr(5001), "bob".to_string())
            .unwrap();
        let config = GameConfig {
            game: GameKey::TicTacToe,
            players: 2,
        };
        registry.start_game("PARTY7", addr(5000), config).unwrap();
        let alice_role = registry.room("PARTY7").unwrap().participants[0].role;

        registry.leave("PARTY7", addr(5000)).unwrap();
        let room = registry.room("PARTY7").unwrap();
        assert_eq!(room.participants.len(), 1);
        assert_eq!(room.parked_roles.get("alice").copied(), alice_role);

        // Same username on a new address reclaims the seat.
        registry
            .join("PARTY7".to_string(), addr(6000), "alice".to_string())
            .unwrap();
        let room = registry.room("PARTY7").unwrap();
        let alice = room.participant_by_addr(addr(6000)).unwrap();
        assert_eq!(alice.role, alice_role);
        assert!(room.parked_roles.is_empty());
    }

    #[test]
    fn test_roster_includes_parked_players_as_disconnected() {
        let mut registry = RoomRegistry::new();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        registry
            .join("PARTY7".to_string(), addr(5001), "bob".to_string())
            .unwrap();
        let config = GameConfig {
            game: GameKey::ConnectFour,
            players: 2,
        };
        registry.start_game("PARTY7", addr(5000), config).unwrap();
        registry.leave("PARTY7", addr(5001)).unwrap();

        let roster = registry.room("PARTY7").unwrap().roster();
        assert_eq!(roster.len(), 2);
        let bob = roster.iter().find(|p| p.username == "bob").unwrap();
        assert!(!bob.connected);
        assert!(bob.role.is_some());
    }

    #[test]
    fn test_last_leaver_marks_room_empty() {
        let mut registry = RoomRegistry::new();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        registry.leave("PARTY7", addr(5000)).unwrap();

        let room = registry.room("PARTY7").unwrap();
        assert!(room.empty_since.is_some());
        // Grace period has not elapsed, so the room survives a reap.
        assert!(registry.reap_empty_rooms().is_empty());
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn test_find_room_by_addr() {
        let mut registry = RoomRegistry::new();
        registry
            .join("PARTY7".to_string(), addr(5000), "alice".to_string())
            .unwrap();
        registry
            .join("OTHER2".to_string(), addr(5001), "bob".to_string())
            .unwrap();

        assert_eq!(registry.find_room_by_addr(addr(5001)), Some("OTHER2"));
        assert_eq!(registry.find_room_by_addr(addr(9999)), None);
    }
}
