//! # Party Game Server Library
//!
//! This library provides the authoritative server for a room-based party
//! game service. Clients join rooms with short codes, start one of four
//! games (Tic-Tac-Toe, Connect Four, Carrom, Ludo), and send their moves;
//! the server validates every action against the rules and broadcasts the
//! complete game state back to the whole room.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! All rule evaluation happens here, using the engines from the `shared`
//! crate. Clients are treated as untrusted input sources: a move that is
//! out of turn, out of range, or from a spectator is rejected with a
//! reason sent to the offending sender only, and room state is untouched.
//!
//! ### Room Management
//! Rooms come into existence when the first participant joins a code and
//! are reaped after sitting empty past a grace period. Seats are handed
//! out in join order when a game starts; latecomers spectate. A player
//! who drops mid-game has their seat parked under their username so a
//! reconnect picks it back up.
//!
//! ### State Broadcasting
//! After every accepted action the full game snapshot goes to everyone in
//! the room. There is no delta encoding; a single state packet is always
//! enough to render the board, which makes reconnection and late joining
//! trivial.
//!
//! ## Architecture Design
//!
//! The server uses a single-threaded, event-driven main loop fed by an
//! unbounded channel. Dedicated tasks handle socket receive, socket send,
//! and timeout sweeping; because all room mutations happen on the main
//! loop, actions within a room are serialized without per-room locks.
//!
//! ## Module Organization
//!
//! - [`rooms`]: room registry, participant lifecycle, seat parking
//! - [`game`]: per-room game instance dispatch and turn arbitration
//! - [`network`]: UDP socket management and the main server loop

pub mod game;
pub mod network;
pub mod rooms;
