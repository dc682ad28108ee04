//! Placement components: where an entity sits and what it does to discovery.

use serde::{Deserialize, Serialize};
use stashnet_logic::position::{LocationId, Position, Rect};
use stashnet_logic::provider::Layer;

/// Tiles an entity occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Area {
    Tile(Position),
    Footprint(Rect),
    /// Belongs to a location without occupying a tile (built-in fridge,
    /// backpack).
    Unplaced,
}

/// Placement component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub location: Option<LocationId>,
    pub layer: Layer,
    pub area: Area,
}

impl Placement {
    pub fn tile(layer: Layer, position: Position) -> Self {
        Self {
            location: position.location,
            layer,
            area: Area::Tile(position),
        }
    }

    pub fn footprint(layer: Layer, location: LocationId, rect: Rect) -> Self {
        Self {
            location: Some(location),
            layer,
            area: Area::Footprint(rect),
        }
    }

    pub fn unplaced(location: Option<LocationId>) -> Self {
        Self {
            location,
            layer: Layer::Furniture,
            area: Area::Unplaced,
        }
    }

    /// Every tile covered, row by row for footprints.
    pub fn tiles(&self) -> Vec<Position> {
        match self.area {
            Area::Tile(position) => vec![position],
            Area::Footprint(rect) => rect.tiles(self.location),
            Area::Unplaced => Vec::new(),
        }
    }
}

/// Conveyor segment. Discovery passes through it without reporting it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conveyor;

/// Named scenery (rocks, fences, crops): occupies a tile, stops discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenery {
    pub name: String,
}

impl Scenery {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
