//! Types shared by the arena server and its clients: entity records, arena
//! geometry constants, the collision test and the wire protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod protocol;
pub mod ranking;

pub use protocol::{
    decode_packet, encode_frame, read_frame, read_packet, write_packet, Packet, MAX_FRAME_LEN,
};
pub use ranking::{leaderboard, rank, Rank};

pub const ARENA_WIDTH: i32 = 640;
pub const ARENA_HEIGHT: i32 = 480;
pub const PLAYER_SIZE: i32 = 24;
pub const COLLECTIBLE_SIZE: i32 = 18;

/// Largest distance a single move command may cover, in pixels
pub const MAX_STEP: f64 = 40.0;

/// Distance kept between freshly spawned collectibles and the arena edge
pub const COLLECTIBLE_MARGIN: i32 = 20;
/// Distance kept between a joining player and the arena edge
pub const PLAYER_MARGIN: i32 = 40;

pub const DEFAULT_COLLECTIBLE_VALUE: u32 = 1;

/// Player identifier. Ordering is lexicographic and used as the ranking tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectibleId(String);

impl CollectibleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectibleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axis-aligned bounding box as `(x1, y1, x2, y2)`
pub trait Bounded {
    fn bounds(&self) -> (i32, i32, i32, i32);
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub score: u32,
}

impl Player {
    pub const SIZE: i32 = PLAYER_SIZE;

    pub fn new(id: PlayerId, x: i32, y: i32) -> Self {
        Self { id, x, y, score: 0 }
    }
}

impl Bounded for Player {
    fn bounds(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.x + Self::SIZE, self.y + Self::SIZE)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Collectible {
    pub id: CollectibleId,
    pub x: i32,
    pub y: i32,
    pub value: u32,
}

impl Collectible {
    pub const SIZE: i32 = COLLECTIBLE_SIZE;

    pub fn new(id: CollectibleId, x: i32, y: i32) -> Self {
        Self {
            id,
            x,
            y,
            value: DEFAULT_COLLECTIBLE_VALUE,
        }
    }
}

impl Bounded for Collectible {
    fn bounds(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.x + Self::SIZE, self.y + Self::SIZE)
    }
}

/// Strict overlap test; boxes that only share an edge do not collide.
pub fn check_collision(a: &impl Bounded, b: &impl Bounded) -> bool {
    let (ax1, ay1, ax2, ay2) = a.bounds();
    let (bx1, by1, bx2, by2) = b.bounds();

    ax1 < bx2 && ax2 > bx1 && ay1 < by2 && ay2 > by1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Parses the wire name of a direction. Matching is exact and case-sensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
