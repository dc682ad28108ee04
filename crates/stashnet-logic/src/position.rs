//! Tile positions and footprints.
//!
//! A [`Position`] is a tile coordinate inside an optional location. A `None`
//! location is a virtual position with no world placement (used for pure
//! inventory sources such as a backpack). Positions are plain values:
//! equality and hashing go by `(location, x, y)`.

use serde::{Deserialize, Serialize};

/// Identifier of a location (map, building interior, cave level...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(pub u32);

/// A tile coordinate in a location context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub location: Option<LocationId>,
    pub x: i32,
    pub y: i32,
}

/// Neighbor offsets in enumeration order. Discovery relies on this order
/// being fixed: it breaks ties between equally distant tiles.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Position {
    pub fn new(location: LocationId, x: i32, y: i32) -> Self {
        Self {
            location: Some(location),
            x,
            y,
        }
    }

    /// A position with no location.
    pub fn virtual_at(x: i32, y: i32) -> Self {
        Self {
            location: None,
            x,
            y,
        }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            location: self.location,
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chebyshev (king-move) distance on the grid, ignoring location.
    pub fn chebyshev(&self, other: &Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Adjacent positions in [`NEIGHBOR_OFFSETS`] order. Without diagonals
    /// only the four orthogonal neighbors are produced.
    pub fn neighbors(&self, include_diagonal: bool) -> impl Iterator<Item = Position> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .filter(move |(dx, dy)| include_diagonal || *dx == 0 || *dy == 0)
            .map(move |&(dx, dy)| self.offset(dx, dy))
    }
}

/// A multi-tile region, origin at the top-left tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Grow the rect by `amount` tiles on every side.
    pub fn expand(&self, amount: i32) -> Self {
        Self {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + amount * 2,
            height: self.height + amount * 2,
        }
    }

    /// Every tile of the rect in column-major order (x outer, y inner).
    pub fn tiles(&self, location: Option<LocationId>) -> Vec<Position> {
        let mut tiles = Vec::with_capacity((self.width.max(0) * self.height.max(0)) as usize);
        for x in 0..self.width {
            for y in 0..self.height {
                tiles.push(Position {
                    location,
                    x: self.x + x,
                    y: self.y + y,
                });
            }
        }
        tiles
    }
}
