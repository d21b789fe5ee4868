//! Carrom rules and physics on a unit board.
//!
//! Coordinates are normalized to `[0, 1]` on both axes with pockets in
//! the four corners. A shot runs a fixed-step simulation to rest inside
//! a single call, then the turn resolver applies fouls, scoring, queen
//! cover, and board/match progression. The same shot input always yields
//! the same final state, so server and replay tooling agree bit for bit.

use crate::ActionError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const BOARD_SIZE: f32 = 1.0;
pub const COIN_RADIUS: f32 = 0.025;
pub const STRIKER_RADIUS: f32 = 0.035;
pub const POCKET_RADIUS: f32 = 0.05;
/// Pocket centers are inset from the corners by this much on each axis.
pub const POCKET_INSET: f32 = 0.05;

pub const COINS_PER_PLAYER: usize = 9;
pub const QUEEN_POINTS: i32 = 3;

/// Simulation runs at a fixed 120 Hz step regardless of wall clock.
pub const SIM_DT: f32 = 1.0 / 120.0;
/// Per-step velocity retention; exponential friction.
const FRICTION_PER_STEP: f32 = 0.985;
const WALL_RESTITUTION: f32 = 0.9;
const MAX_STRIKER_SPEED: f32 = 1.8;
/// Below this speed a piece is considered at rest.
const MIN_MOTION: f32 = 0.002;
/// Hard cap so a degenerate shot cannot spin forever (50 seconds of
/// simulated time).
const MAX_SIM_STEPS: usize = 6000;

pub const BASELINE_Y_A: f32 = 0.85;
pub const BASELINE_Y_B: f32 = 0.15;
const BASELINE_X_MIN: f32 = 0.15;
const BASELINE_X_MAX: f32 = 0.85;
const MIN_POWER: f32 = 0.2;

const CENTER: Vec2 = Vec2 { x: 0.5, y: 0.5 };
/// Ring radii of the opening rack around the queen.
const INNER_RING_RADIUS: f32 = 0.052;
const OUTER_RING_RADIUS: f32 = 0.104;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance_to(&self, other: &Vec2) -> f32 {
        Vec2::new(self.x - other.x, self.y - other.y).length()
    }

    fn scaled(&self, factor: f32) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }
}

/// The two playing seats. Seat A breaks the first board and shoots from
/// the bottom baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seat {
    A,
    B,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Seat::A => 0,
            Seat::B => 1,
        }
    }

    pub fn baseline_y(self) -> f32 {
        match self {
            Seat::A => BASELINE_Y_A,
            Seat::B => BASELINE_Y_B,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::A => write!(f, "A"),
            Seat::B => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSet {
    White,
    Black,
}

impl ColorSet {
    pub fn other(self) -> ColorSet {
        match self {
            ColorSet::White => ColorSet::Black,
            ColorSet::Black => ColorSet::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinKind {
    White,
    Black,
    Queen,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub kind: CoinKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub pocketed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Striker {
    pub pos: Vec2,
    pub vel: Vec2,
    pub pocketed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarromPlayer {
    pub name: String,
    pub color_set: ColorSet,
    /// Cumulative score across all boards of the match.
    pub score: i32,
    pub fouls: u32,
    /// Own-color coins currently credited to this player on this board.
    pub coins_pocketed: usize,
    pub queen_covered: bool,
}

/// Lifecycle of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Waiting for the current player's shot.
    Aiming,
    /// Pieces in motion; only entered transiently inside `shoot`.
    Moving,
    /// Outcome being applied; only entered transiently inside `shoot`.
    Resolving,
}

/// Shot input as sent by the client. `power` is a fraction of the
/// maximum striker speed; `baseline_x` the launch position along the
/// shooter's baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotPayload {
    pub angle: f32,
    pub power: f32,
    pub baseline_x: f32,
}

/// What a resolved shot did, for logging and chat notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotOutcome {
    pub own_pocketed: usize,
    pub opponent_pocketed: usize,
    pub queen_pocketed: bool,
    pub queen_covered: bool,
    pub striker_pocketed: bool,
    pub foul: bool,
    pub extra_turn: bool,
    pub board_finished: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarromState {
    pub coins: Vec<Coin>,
    pub striker: Striker,
    /// Index 0 is seat A, index 1 is seat B.
    pub players: [CarromPlayer; 2],
    pub current: Seat,
    pub turn_phase: TurnPhase,
    pub break_done: bool,
    /// Seat that pocketed the queen and still must cover it.
    pub pending_queen_cover_for: Option<Seat>,
    pub board_number: u32,
    pub max_boards: u32,
    pub winner: Option<Seat>,
}

fn pocket_centers() -> [Vec2; 4] {
    [
        Vec2::new(POCKET_INSET, POCKET_INSET),
        Vec2::new(BOARD_SIZE - POCKET_INSET, POCKET_INSET),
        Vec2::new(POCKET_INSET, BOARD_SIZE - POCKET_INSET),
        Vec2::new(BOARD_SIZE - POCKET_INSET, BOARD_SIZE - POCKET_INSET),
    ]
}

/// The opening rack: queen on the center spot, six coins on an inner
/// ring, twelve on an outer ring, colors alternating. Nine of each
/// color in total.
fn racked_coins() -> Vec<Coin> {
    let mut coins = Vec::with_capacity(COINS_PER_PLAYER * 2 + 1);
    coins.push(Coin {
        kind: CoinKind::Queen,
        pos: CENTER,
        vel: Vec2::new(0.0, 0.0),
        pocketed: false,
    });
    for (count, radius, offset) in [(6, INNER_RING_RADIUS, 0.0), (12, OUTER_RING_RADIUS, 0.5)] {
        for i in 0..count {
            let angle = std::f32::consts::TAU * (i as f32 + offset) / count as f32;
            let kind = if i % 2 == 0 {
                CoinKind::White
            } else {
                CoinKind::Black
            };
            coins.push(Coin {
                kind,
                pos: Vec2::new(CENTER.x + radius * angle.cos(), CENTER.y + radius * angle.sin()),
                vel: Vec2::new(0.0, 0.0),
                pocketed: false,
            });
        }
    }
    coins
}

impl CarromState {
    /// Starts a match. Seat A gets the white set and the first break.
    pub fn new(names: [String; 2], max_boards: u32) -> Self {
        let [name_a, name_b] = names;
        Self {
            coins: racked_coins(),
            striker: Striker {
                pos: Vec2::new(0.5, BASELINE_Y_A),
                vel: Vec2::new(0.0, 0.0),
                pocketed: false,
            },
            players: [
                CarromPlayer {
                    name: name_a,
                    color_set: ColorSet::White,
                    score: 0,
                    fouls: 0,
                    coins_pocketed: 0,
                    queen_covered: false,
                },
                CarromPlayer {
                    name: name_b,
                    color_set: ColorSet::Black,
                    score: 0,
                    fouls: 0,
                    coins_pocketed: 0,
                    queen_covered: false,
                },
            ],
            current: Seat::A,
            turn_phase: TurnPhase::Aiming,
            break_done: false,
            pending_queen_cover_for: None,
            board_number: 1,
            max_boards: max_boards.max(1),
            winner: None,
        }
    }

    pub fn reset(&mut self) {
        let names = [self.players[0].name.clone(), self.players[1].name.clone()];
        *self = Self::new(names, self.max_boards);
    }

    pub fn current_player(&self) -> Option<Seat> {
        if self.winner.is_some() {
            None
        } else {
            Some(self.current)
        }
    }

    fn player(&self, seat: Seat) -> &CarromPlayer {
        &self.players[seat.index()]
    }

    fn player_mut(&mut self, seat: Seat) -> &mut CarromPlayer {
        &mut self.players[seat.index()]
    }

    fn coin_color(&self, seat: Seat) -> CoinKind {
        match self.player(seat).color_set {
            ColorSet::White => CoinKind::White,
            ColorSet::Black => CoinKind::Black,
        }
    }

    /// Takes the current player's shot, simulates it to rest, and
    /// resolves the outcome. This is the only mutation entry point.
    pub fn shoot(&mut self, seat: Seat, shot: ShotPayload) -> Result<ShotOutcome, ActionError> {
        if self.winner.is_some() {
            return Err(ActionError::GameOver);
        }
        if seat != self.current {
            return Err(ActionError::NotYourTurn);
        }
        if self.turn_phase != TurnPhase::Aiming {
            return Err(ActionError::WrongPhase);
        }
        if !shot.angle.is_finite() || !shot.power.is_finite() || !shot.baseline_x.is_finite() {
            return Err(ActionError::OutOfRange);
        }

        let power = shot.power.clamp(MIN_POWER, 1.0);
        let baseline_x = shot.baseline_x.clamp(BASELINE_X_MIN, BASELINE_X_MAX);
        let speed = power * MAX_STRIKER_SPEED;

        self.striker = Striker {
            pos: Vec2::new(baseline_x, seat.baseline_y()),
            vel: Vec2::new(speed * shot.angle.cos(), speed * shot.angle.sin()),
            pocketed: false,
        };
        self.turn_phase = TurnPhase::Moving;
        self.break_done = true;

        let contact = self.run_simulation();
        self.turn_phase = TurnPhase::Resolving;
        let outcome = self.resolve_turn(seat, contact);
        if self.winner.is_none() {
            self.turn_phase = TurnPhase::Aiming;
        }
        Ok(outcome)
    }

    /// Fixed-step integration until every piece is at rest. Returns
    /// whether the striker touched any coin.
    fn run_simulation(&mut self) -> bool {
        let pockets = pocket_centers();
        let mut contact = false;

        for _ in 0..MAX_SIM_STEPS {
            let mut moving = false;

            if !self.striker.pocketed {
                step_piece(&mut self.striker.pos, &mut self.striker.vel, STRIKER_RADIUS);
            }
            for coin in self.coins.iter_mut().filter(|c| !c.pocketed) {
                step_piece(&mut coin.pos, &mut coin.vel, COIN_RADIUS);
            }

            // Striker against each live coin.
            if !self.striker.pocketed {
                for coin in self.coins.iter_mut().filter(|c| !c.pocketed) {
                    if collide(
                        &mut self.striker.pos,
                        &mut self.striker.vel,
                        STRIKER_RADIUS,
                        &mut coin.pos,
                        &mut coin.vel,
                        COIN_RADIUS,
                    ) {
                        contact = true;
                    }
                }
            }

            // Coin against coin, pairwise.
            for i in 0..self.coins.len() {
                for j in (i + 1)..self.coins.len() {
                    if self.coins[i].pocketed || self.coins[j].pocketed {
                        continue;
                    }
                    let (left, right) = self.coins.split_at_mut(j);
                    let a = &mut left[i];
                    let b = &mut right[0];
                    collide(
                        &mut a.pos,
                        &mut a.vel,
                        COIN_RADIUS,
                        &mut b.pos,
                        &mut b.vel,
                        COIN_RADIUS,
                    );
                }
            }

            // Pocket checks after movement and collisions.
            if !self.striker.pocketed {
                if in_pocket(&self.striker.pos, &pockets) {
                    self.striker.pocketed = true;
                    self.striker.vel = Vec2::new(0.0, 0.0);
                } else if self.striker.vel.length() > MIN_MOTION {
                    moving = true;
                }
            }
            for coin in self.coins.iter_mut().filter(|c| !c.pocketed) {
                if in_pocket(&coin.pos, &pockets) {
                    coin.pocketed = true;
                    coin.vel = Vec2::new(0.0, 0.0);
                } else if coin.vel.length() > MIN_MOTION {
                    moving = true;
                }
            }

            if !moving {
                break;
            }
        }

        // Everything rests exactly at the end of a shot.
        self.striker.vel = Vec2::new(0.0, 0.0);
        for coin in &mut self.coins {
            coin.vel = Vec2::new(0.0, 0.0);
        }
        contact
    }

    /// Applies fouls, scoring, queen cover, and progression for the shot
    /// the given seat just played. Coins pocketed during the shot are
    /// those marked pocketed but not yet credited to either player.
    fn resolve_turn(&mut self, seat: Seat, contact: bool) -> ShotOutcome {
        let own_kind = self.coin_color(seat);
        let opp_kind = self.coin_color(seat.other());

        // Coins pocketed on this shot are the delta between what lies in
        // the pockets and what was already credited on earlier shots.
        let down = |kind: CoinKind| {
            self.coins
                .iter()
                .filter(|c| c.kind == kind && c.pocketed)
                .count()
        };
        let own_n = down(own_kind).saturating_sub(self.player(seat).coins_pocketed);
        let opp_n = down(opp_kind).saturating_sub(self.player(seat.other()).coins_pocketed);
        let queen_already_out = self.pending_queen_cover_for.is_some()
            || self.players.iter().any(|p| p.queen_covered);
        let queen_now = self.queen_pocketed_flag() && !queen_already_out;
        let striker_pocketed = self.striker.pocketed;

        let mut foul = striker_pocketed
            || (!contact && own_n == 0 && opp_n == 0 && !queen_now)
            || (opp_n > 0 && own_n == 0 && !queen_now);

        // Credit coins. Opponent coins count for the opponent even on a
        // foul shot.
        self.player_mut(seat).coins_pocketed += own_n;
        self.player_mut(seat).score += own_n as i32;
        self.player_mut(seat.other()).coins_pocketed += opp_n;
        self.player_mut(seat.other()).score += opp_n as i32;

        // Queen handling. On a foul the queen goes straight back to the
        // center; otherwise the shooter owes a cover.
        let mut queen_covered = false;
        if queen_now {
            if foul {
                self.return_queen_to_center();
            } else {
                self.pending_queen_cover_for = Some(seat);
            }
        }
        if !foul && own_n > 0 && self.pending_queen_cover_for == Some(seat) && !queen_now {
            self.player_mut(seat).queen_covered = true;
            self.player_mut(seat).score += QUEEN_POINTS;
            self.pending_queen_cover_for = None;
            queen_covered = true;
        }

        // Pocketing the last own coin while the queen is still on the
        // board is itself a foul; the coin comes back out.
        if !foul
            && self.player(seat).coins_pocketed >= COINS_PER_PLAYER
            && !self.queen_pocketed_flag()
        {
            self.uncredit_last_coin(seat);
            foul = true;
        }

        if foul {
            self.apply_foul_penalty(seat);
        }

        let extra_turn = !foul && (own_n > 0 || queen_now);
        let board_finished = self.check_board_end();

        if !board_finished && self.winner.is_none() && !extra_turn {
            self.pass_turn(seat);
        }
        if !board_finished && self.winner.is_none() {
            self.respawn_striker();
        }

        ShotOutcome {
            own_pocketed: own_n,
            opponent_pocketed: opp_n,
            queen_pocketed: queen_now,
            queen_covered,
            striker_pocketed,
            foul,
            extra_turn,
            board_finished,
        }
    }

    fn queen_pocketed_flag(&self) -> bool {
        self.coins
            .iter()
            .any(|c| c.kind == CoinKind::Queen && c.pocketed)
    }

    fn return_queen_to_center(&mut self) {
        if let Some(queen) = self.coins.iter_mut().find(|c| c.kind == CoinKind::Queen) {
            queen.pocketed = false;
            queen.vel = Vec2::new(0.0, 0.0);
            queen.pos = CENTER;
        }
        self.nudge_center_overlaps();
        self.pending_queen_cover_for = None;
    }

    /// Foul penalty: record the foul, return the shooter's most recent
    /// pocketed coin to the center if they have any, and (via the
    /// caller) lose the turn.
    fn apply_foul_penalty(&mut self, seat: Seat) {
        self.player_mut(seat).fouls += 1;
        if self.player(seat).coins_pocketed > 0 {
            self.uncredit_last_coin(seat);
        }
    }

    fn uncredit_last_coin(&mut self, seat: Seat) {
        let kind = self.coin_color(seat);
        if let Some(coin) = self
            .coins
            .iter_mut()
            .rev()
            .find(|c| c.kind == kind && c.pocketed)
        {
            coin.pocketed = false;
            coin.vel = Vec2::new(0.0, 0.0);
            coin.pos = CENTER;
        }
        self.nudge_center_overlaps();
        let player = self.player_mut(seat);
        player.coins_pocketed = player.coins_pocketed.saturating_sub(1);
        player.score -= 1;
    }

    /// Coins returned to the center may land on occupied spots; spread
    /// them outward deterministically so the simulation never starts
    /// with interpenetrating pieces.
    fn nudge_center_overlaps(&mut self) {
        let n = self.coins.len();
        for i in 0..n {
            if self.coins[i].pocketed {
                continue;
            }
            for j in (i + 1)..n {
                if self.coins[j].pocketed {
                    continue;
                }
                if self.coins[i].pos.distance_to(&self.coins[j].pos) < COIN_RADIUS {
                    let angle = std::f32::consts::TAU * j as f32 / n as f32;
                    self.coins[j].pos = Vec2::new(
                        CENTER.x + 2.5 * COIN_RADIUS * angle.cos(),
                        CENTER.y + 2.5 * COIN_RADIUS * angle.sin(),
                    );
                }
            }
        }
    }

    /// An uncovered queen returns to the center when the shooter's turn
    /// actually ends.
    fn pass_turn(&mut self, seat: Seat) {
        if self.pending_queen_cover_for == Some(seat) {
            self.return_queen_to_center();
        }
        self.current = seat.other();
    }

    fn respawn_striker(&mut self) {
        self.striker = Striker {
            pos: Vec2::new(0.5, self.current.baseline_y()),
            vel: Vec2::new(0.0, 0.0),
            pocketed: false,
        };
    }

    /// A board ends when one seat has all nine coins down and the queen
    /// settled (pocketed with no pending cover). Advances to the next
    /// board or ends the match on cumulative score.
    fn check_board_end(&mut self) -> bool {
        let queen_settled = self.queen_pocketed_flag() && self.pending_queen_cover_for.is_none();
        let done = queen_settled
            && self
                .players
                .iter()
                .any(|p| p.coins_pocketed >= COINS_PER_PLAYER);
        if !done {
            return false;
        }

        if self.board_number >= self.max_boards {
            match self.players[0].score.cmp(&self.players[1].score) {
                std::cmp::Ordering::Greater => self.winner = Some(Seat::A),
                std::cmp::Ordering::Less => self.winner = Some(Seat::B),
                // Tie after the last board: play one more.
                std::cmp::Ordering::Equal => self.next_board(),
            }
        } else {
            self.next_board();
        }
        true
    }

    /// Re-racks for the next board. Scores and fouls carry over; the
    /// break alternates between seats.
    fn next_board(&mut self) {
        self.board_number += 1;
        self.coins = racked_coins();
        self.break_done = false;
        self.pending_queen_cover_for = None;
        for player in &mut self.players {
            player.coins_pocketed = 0;
            player.queen_covered = false;
        }
        self.current = if self.board_number % 2 == 1 {
            Seat::A
        } else {
            Seat::B
        };
        self.turn_phase = TurnPhase::Aiming;
        self.respawn_striker();
    }
}

fn step_piece(pos: &mut Vec2, vel: &mut Vec2, radius: f32) {
    pos.x += vel.x * SIM_DT;
    pos.y += vel.y * SIM_DT;
    *vel = vel.scaled(FRICTION_PER_STEP);

    // Wall bounce with restitution.
    if pos.x < radius {
        pos.x = radius;
        vel.x = -vel.x * WALL_RESTITUTION;
    } else if pos.x > BOARD_SIZE - radius {
        pos.x = BOARD_SIZE - radius;
        vel.x = -vel.x * WALL_RESTITUTION;
    }
    if pos.y < radius {
        pos.y = radius;
        vel.y = -vel.y * WALL_RESTITUTION;
    } else if pos.y > BOARD_SIZE - radius {
        pos.y = BOARD_SIZE - radius;
        vel.y = -vel.y * WALL_RESTITUTION;
    }

    if vel.length() < MIN_MOTION {
        *vel = Vec2::new(0.0, 0.0);
    }
}

/// Equal-mass elastic collision between two circles; exchanges the
/// normal velocity components and separates the overlap evenly.
fn collide(
    pos_a: &mut Vec2,
    vel_a: &mut Vec2,
    radius_a: f32,
    pos_b: &mut Vec2,
    vel_b: &mut Vec2,
    radius_b: f32,
) -> bool {
    let dx = pos_b.x - pos_a.x;
    let dy = pos_b.y - pos_a.y;
    let dist = (dx * dx + dy * dy).sqrt();
    let min_dist = radius_a + radius_b;
    if dist >= min_dist || dist == 0.0 {
        return false;
    }

    let nx = dx / dist;
    let ny = dy / dist;

    let overlap = min_dist - dist;
    pos_a.x -= nx * overlap / 2.0;
    pos_a.y -= ny * overlap / 2.0;
    pos_b.x += nx * overlap / 2.0;
    pos_b.y += ny * overlap / 2.0;

    let va_n = vel_a.x * nx + vel_a.y * ny;
    let vb_n = vel_b.x * nx + vel_b.y * ny;
    if va_n - vb_n <= 0.0 {
        // Already separating.
        return true;
    }

    let delta = va_n - vb_n;
    vel_a.x -= delta * nx;
    vel_a.y -= delta * ny;
    vel_b.x += delta * nx;
    vel_b.y += delta * ny;
    true
}

fn in_pocket(pos: &Vec2, pockets: &[Vec2; 4]) -> bool {
    pockets.iter().any(|p| pos.distance_to(p) < POCKET_RADIUS)
}
