//! Save/Load functionality for persisting the farm world
//!
//! Uses bincode for compact binary saves and serde_json for readable
//! snapshots. Components and slot contents are serialized per entity and
//! respawned on load, so handles are not stable across a save/load cycle.
//! Lock states are transient and always load unlocked; private locks are
//! not saved and get fresh ones on load.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use stashnet_logic::item::SlotList;
use thiserror::Error;

use crate::components::*;
use crate::engine::EngineConfig;
use crate::world::{handle_of, FarmWorld};

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the farm
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    pub ticks: u64,
    pub config: EngineConfig,
    /// All entities with their components
    pub entities: Vec<SerializableEntity>,
}

/// All possible components for an entity, serialized as optionals
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct SerializableEntity {
    pub placement: Option<Placement>,
    pub storage: Option<Storage>,
    pub conveyor: bool,
    pub scenery: Option<Scenery>,
    pub farmer: Option<Farmer>,
    pub standing: Option<Standing>,
    /// Slot contents of storages and backpacks
    pub items: Option<SlotList>,
}

/// Errors that can occur during save/load
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Result of loading a farm
pub struct LoadedFarm {
    pub world: FarmWorld,
    pub config: EngineConfig,
    pub ticks: u64,
}

/// Extract all entities from a world into serializable form
fn serialize_entities(world: &FarmWorld) -> Vec<SerializableEntity> {
    let mut entities = Vec::new();

    for entity_ref in world.ecs.iter() {
        let mut se = SerializableEntity::default();

        if let Some(c) = entity_ref.get::<&Placement>() {
            se.placement = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Storage>() {
            se.storage = Some((*c).clone());
        }
        se.conveyor = entity_ref.has::<Conveyor>();
        if let Some(c) = entity_ref.get::<&Scenery>() {
            se.scenery = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Farmer>() {
            se.farmer = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Standing>() {
            se.standing = Some(*c);
        }
        se.items = world.contents(handle_of(entity_ref.entity()));

        entities.push(se);
    }

    entities
}

/// Spawn an entity through the world so tiles, slots and locks are rebuilt
fn spawn_entity(world: &mut FarmWorld, mut se: SerializableEntity) {
    let items = se.items.take().unwrap_or_default();

    match se {
        SerializableEntity {
            storage: Some(storage),
            placement: Some(placement),
            ..
        } => {
            world.spawn_storage(storage, placement, items);
        }
        SerializableEntity {
            farmer: Some(farmer),
            standing: Some(Standing(position)),
            ..
        } => {
            let handle = world.spawn_farmer(farmer, position);
            if let Some(slots) = world.slots(handle) {
                *slots.borrow_mut() = items;
            }
        }
        SerializableEntity {
            conveyor: true,
            placement: Some(placement),
            ..
        } => {
            if let Area::Tile(position) = placement.area {
                world.spawn_conveyor(position);
            }
        }
        SerializableEntity {
            scenery: Some(scenery),
            placement: Some(placement),
            ..
        } => {
            if let Area::Tile(position) = placement.area {
                world.spawn_scenery(&scenery.name, position);
            }
        }
        other => log::warn!("skipping unrecognized entity in save: {other:?}"),
    }
}

fn snapshot(world: &FarmWorld, config: &EngineConfig, ticks: u64) -> SaveData {
    SaveData {
        version: SAVE_VERSION,
        ticks,
        config: config.clone(),
        entities: serialize_entities(world),
    }
}

fn restore(save_data: SaveData) -> Result<LoadedFarm, SnapshotError> {
    if save_data.version != SAVE_VERSION {
        log::warn!(
            "refusing save version {} (expected {})",
            save_data.version,
            SAVE_VERSION
        );
        return Err(SnapshotError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut world = FarmWorld::new();
    for se in save_data.entities {
        spawn_entity(&mut world, se);
    }

    Ok(LoadedFarm {
        world,
        config: save_data.config,
        ticks: save_data.ticks,
    })
}

/// Save the complete farm to a writer
pub fn save_world<W: Write>(
    writer: W,
    world: &FarmWorld,
    config: &EngineConfig,
    ticks: u64,
) -> Result<(), SnapshotError> {
    bincode::serialize_into(writer, &snapshot(world, config, ticks))?;
    Ok(())
}

/// Load a farm from a reader
pub fn load_world<R: Read>(reader: R) -> Result<LoadedFarm, SnapshotError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;
    restore(save_data)
}

/// Readable snapshot for debugging and fixtures.
pub fn to_json(world: &FarmWorld, config: &EngineConfig, ticks: u64) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(&snapshot(world, config, ticks))?)
}

pub fn from_json(json: &str) -> Result<LoadedFarm, SnapshotError> {
    restore(serde_json::from_str(json)?)
}
