//! Coordinates and positions shared by zones, creatures and the player.

use serde::{Deserialize, Serialize};
use wildgrid_logic::catchup::zone_distance;
use wildgrid_logic::constants::{GRID_HEIGHT, GRID_WIDTH};

/// Integer address of a zone in the infinite world.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ZoneCoord {
    pub x: i32,
    pub y: i32,
}

impl ZoneCoord {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    pub fn neighbor(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    /// Manhattan distance in zones.
    pub fn distance(self, other: Self) -> u32 {
        zone_distance((self.x, self.y), (other.x, other.y))
    }
}

impl std::fmt::Display for ZoneCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Cardinal direction on the grid. North is toward smaller `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

/// A cell inside a zone grid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn center() -> Self {
        Self::new(GRID_WIDTH as i32 / 2, GRID_HEIGHT as i32 / 2)
    }

    pub fn in_bounds(self) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < GRID_WIDTH && (self.y as usize) < GRID_HEIGHT
    }

    pub fn on_border(self) -> bool {
        self.x == 0
            || self.y == 0
            || self.x == GRID_WIDTH as i32 - 1
            || self.y == GRID_HEIGHT as i32 - 1
    }

    /// Row-major index into a zone grid.
    pub fn index(self) -> Option<usize> {
        self.in_bounds()
            .then(|| self.y as usize * GRID_WIDTH + self.x as usize)
    }

    pub fn from_index(index: usize) -> Self {
        Self::new((index % GRID_WIDTH) as i32, (index / GRID_WIDTH) as i32)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    pub fn manhattan(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn chebyshev(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// In-bounds cells of the 8-neighbourhood.
    pub fn neighbors8(self) -> impl Iterator<Item = CellPos> {
        (-1..=1)
            .flat_map(move |dy| (-1..=1).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .map(move |(dx, dy)| self.offset(dx, dy))
            .filter(|p| p.in_bounds())
    }

    /// One step toward `target`, along the axis with the larger gap.
    pub fn step_toward(self, target: Self) -> Self {
        let dx = (target.x - self.x).signum();
        let dy = (target.y - self.y).signum();
        if (target.x - self.x).abs() >= (target.y - self.y).abs() {
            self.offset(dx, 0)
        } else {
            self.offset(0, dy)
        }
    }

    /// One step away from `threat`.
    pub fn step_away(self, threat: Self) -> Self {
        let dx = (self.x - threat.x).signum();
        let dy = (self.y - threat.y).signum();
        if (self.x - threat.x).abs() >= (self.y - threat.y).abs() && dx != 0 {
            self.offset(dx, 0)
        } else if dy != 0 {
            self.offset(0, dy)
        } else {
            self.offset(1, 0)
        }
    }
}

/// 2D vector for fractional render offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

/// Where an entity is: zone, cell, and a fractional offset the renderer
/// interpolates away after each step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub zone: ZoneCoord,
    pub cell: CellPos,
    pub offset: Vec2,
}

impl Position {
    pub fn new(zone: ZoneCoord, cell: CellPos) -> Self {
        Self {
            zone,
            cell,
            offset: Vec2::ZERO,
        }
    }

    /// Move to `cell` in the same zone, leaving an offset back toward the
    /// previous cell for interpolation.
    pub fn move_to(&mut self, cell: CellPos) {
        self.offset = Vec2::new((self.cell.x - cell.x) as f32, (self.cell.y - cell.y) as f32);
        self.cell = cell;
    }

    /// Shrink the render offset toward zero.
    pub fn settle(&mut self, factor: f32) {
        self.offset = self.offset * factor;
        if self.offset.length() < 0.01 {
            self.offset = Vec2::ZERO;
        }
    }
}

/// Serialize `hecs::Entity` handles as their raw bits.
///
/// Saves restore entities at the same handles with `World::spawn_at`,
/// so stored references stay valid across a load.
pub mod entity_bits {
    use hecs::Entity;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(entity: &Entity, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(entity.to_bits().get())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Entity, D::Error> {
        let bits = u64::deserialize(d)?;
        Entity::from_bits(bits).ok_or_else(|| D::Error::custom(format!("invalid entity bits {bits}")))
    }

    /// Same encoding for `Option<Entity>`.
    pub mod option {
        use hecs::Entity;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(entity: &Option<Entity>, s: S) -> Result<S::Ok, S::Error> {
            match entity {
                Some(e) => s.serialize_some(&e.to_bits().get()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Entity>, D::Error> {
            match Option::<u64>::deserialize(d)? {
                Some(bits) => Entity::from_bits(bits)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid entity bits {bits}"))),
                None => Ok(None),
            }
        }
    }

    /// Same encoding for a set of entities.
    pub mod set {
        use std::collections::BTreeSet;

        use hecs::Entity;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(set: &BTreeSet<Entity>, s: S) -> Result<S::Ok, S::Error> {
            s.collect_seq(set.iter().map(|e| e.to_bits().get()))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<Entity>, D::Error> {
            Vec::<u64>::deserialize(d)?
                .into_iter()
                .map(|bits| {
                    Entity::from_bits(bits)
                        .ok_or_else(|| D::Error::custom(format!("invalid entity bits {bits}")))
                })
                .collect()
        }
    }
}
