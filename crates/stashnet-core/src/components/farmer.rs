//! Farmer components.

use serde::{Deserialize, Serialize};
use stashnet_logic::provider::ActorId;

/// Backpack size of a new farmer.
pub const BACKPACK_SLOTS: usize = 36;

/// Farmer component - a player or hired hand acting on storages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farmer {
    pub name: String,
    pub actor: ActorId,
    pub backpack_slots: usize,
}

impl Farmer {
    pub fn new(name: impl Into<String>, actor: ActorId) -> Self {
        Self {
            name: name.into(),
            actor,
            backpack_slots: BACKPACK_SLOTS,
        }
    }
}

/// Where a farmer is standing. Farmers are not in the tile index; this is
/// only the seed for their searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing(pub stashnet_logic::position::Position);
