//! Farm generation - scatters storages, conveyor lines and scenery over a
//! rectangular location

use rand::Rng;
use stashnet_logic::item::Item;
use stashnet_logic::position::{LocationId, Position, Rect};
use stashnet_logic::provider::{ActorId, Handle, Layer};

use super::items::random_slots;
use super::names::FARMER_NAMES;
use crate::components::{Area, Farmer, Placement, Storage, StorageKind};
use crate::world::FarmWorld;

/// Placement attempts per object before giving up on it
const PLACEMENT_ATTEMPTS: u32 = 64;

/// Configuration for farm generation
#[derive(Debug, Clone, PartialEq)]
pub struct FarmConfig {
    pub location: LocationId,
    pub width: i32,
    pub height: i32,
    pub chests: u32,
    /// 2x2 crates on the furniture layer
    pub crates: u32,
    pub hoppers: u32,
    pub shipping_bins: u32,
    pub conveyor_lines: u32,
    pub conveyor_length: u32,
    /// Scenery occupying object tiles without storing anything
    pub rocks: u32,
    pub fridge: bool,
    pub farmers: u32,
    /// Most stacks put into one generated storage
    pub max_stacks: usize,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            location: LocationId(1),
            width: 32,
            height: 32,
            chests: 8,
            crates: 2,
            hoppers: 1,
            shipping_bins: 1,
            conveyor_lines: 3,
            conveyor_length: 6,
            rocks: 20,
            fridge: true,
            farmers: 2,
            max_stacks: 8,
        }
    }
}

impl FarmConfig {
    /// Validate the configuration. Returns a list of problems (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.width < 1 || self.height < 1 {
            errors.push(format!(
                "farm must be at least 1x1, got {}x{}",
                self.width, self.height
            ));
        }
        if self.crates > 0 && (self.width < 2 || self.height < 2) {
            errors.push("crates need a farm of at least 2x2".to_string());
        }
        let objects = u64::from(self.chests + self.hoppers + self.shipping_bins + self.rocks);
        let area = (self.width.max(0) as u64) * (self.height.max(0) as u64);
        if objects > area {
            errors.push(format!("{} objects do not fit on {} tiles", objects, area));
        }
        if self.farmers as usize > FARMER_NAMES.len() {
            errors.push(format!(
                "at most {} farmers supported, got {}",
                FARMER_NAMES.len(),
                self.farmers
            ));
        }

        errors
    }
}

/// Handles of everything a generation pass spawned
#[derive(Debug, Clone, Default)]
pub struct FarmLayout {
    pub location: Option<LocationId>,
    pub chests: Vec<Handle>,
    pub crates: Vec<Handle>,
    pub hoppers: Vec<Handle>,
    pub shipping_bins: Vec<Handle>,
    pub fridge: Option<Handle>,
    pub conveyors: Vec<Handle>,
    pub rocks: Vec<Handle>,
    pub farmers: Vec<Handle>,
}

impl FarmLayout {
    /// Every storage handle, placed ones first.
    pub fn storages(&self) -> Vec<Handle> {
        self.chests
            .iter()
            .chain(&self.crates)
            .chain(&self.hoppers)
            .chain(&self.shipping_bins)
            .chain(&self.fridge)
            .copied()
            .collect()
    }
}

fn random_tile(config: &FarmConfig, rng: &mut impl Rng) -> Position {
    Position::new(
        config.location,
        rng.gen_range(0..config.width.max(1)),
        rng.gen_range(0..config.height.max(1)),
    )
}

/// Try random corners within `bounds` until `make` yields a placement
/// that is not blocked.
fn find_spot(
    world: &FarmWorld,
    rng: &mut impl Rng,
    bounds: (i32, i32),
    make: impl Fn(i32, i32) -> Placement,
) -> Option<Placement> {
    let (w, h) = bounds;
    (0..PLACEMENT_ATTEMPTS)
        .map(|_| make(rng.gen_range(0..w), rng.gen_range(0..h)))
        .find(|placement| !world.is_blocked(placement))
}

fn place_storage(
    world: &mut FarmWorld,
    layout_slot: &mut Vec<Handle>,
    storage: Storage,
    placement: Option<Placement>,
    config: &FarmConfig,
    rng: &mut impl Rng,
) {
    let Some(placement) = placement else {
        log::debug!("no free spot for a {:?}", storage.kind);
        return;
    };
    let items = random_slots(rng, storage.capacity, config.max_stacks);
    layout_slot.push(world.spawn_storage(storage, placement, items));
}

/// Generate a farm in the world
pub fn generate_farm(world: &mut FarmWorld, config: &FarmConfig, rng: &mut impl Rng) -> FarmLayout {
    let mut layout = FarmLayout {
        location: Some(config.location),
        ..FarmLayout::default()
    };
    let location = config.location;
    let bounds = (config.width.max(1), config.height.max(1));

    // Conveyor lines first so storages end up beside them
    for _ in 0..config.conveyor_lines {
        let start = random_tile(config, rng);
        let (dx, dy) = if rng.gen_bool(0.5) { (1, 0) } else { (0, 1) };
        for step in 0..config.conveyor_length as i32 {
            let tile = start.offset(dx * step, dy * step);
            if tile.x >= config.width || tile.y >= config.height {
                break;
            }
            if !world.is_blocked(&Placement::tile(Layer::Feature, tile)) {
                layout.conveyors.push(world.spawn_conveyor(tile));
            }
        }
    }

    let object_at = |x, y| Placement::tile(Layer::Object, Position::new(location, x, y));

    for _ in 0..config.chests {
        let spot = find_spot(world, rng, bounds, object_at);
        place_storage(world, &mut layout.chests, Storage::new(StorageKind::Chest), spot, config, rng);
    }

    let crate_bounds = ((config.width - 1).max(1), (config.height - 1).max(1));
    for _ in 0..config.crates {
        let spot = find_spot(world, rng, crate_bounds, |x, y| {
            Placement::footprint(Layer::Furniture, location, Rect::new(x, y, 2, 2))
        });
        place_storage(world, &mut layout.crates, Storage::new(StorageKind::Crate), spot, config, rng);
    }

    for _ in 0..config.hoppers {
        let spot = find_spot(world, rng, bounds, object_at);
        let hopper = Storage::new(StorageKind::Hopper).accepting(&["Hay"]);
        let Some(placement) = spot else {
            continue;
        };
        let hay = if rng.gen_bool(0.5) {
            vec![Some(Item::new("Hay", rng.gen_range(1..=60)))]
        } else {
            Vec::new()
        };
        layout.hoppers.push(world.spawn_storage(hopper, placement, hay));
    }

    for _ in 0..config.shipping_bins {
        if let Some(placement) = find_spot(world, rng, bounds, object_at) {
            let bin = Storage::new(StorageKind::ShippingBin);
            layout.shipping_bins.push(world.spawn_storage(bin, placement, Vec::new()));
        }
    }

    for _ in 0..config.rocks {
        let spot = find_spot(world, rng, bounds, object_at);
        if let Some(Placement { area: Area::Tile(position), .. }) = spot {
            layout.rocks.push(world.spawn_scenery("Rock", position));
        }
    }

    if config.fridge {
        let fridge = Storage::new(StorageKind::Fridge);
        let items = random_slots(rng, fridge.capacity, config.max_stacks);
        layout.fridge = Some(world.spawn_storage(fridge, Placement::unplaced(Some(location)), items));
    }

    for (idx, name) in FARMER_NAMES.iter().take(config.farmers as usize).enumerate() {
        let farmer = Farmer::new(*name, ActorId(idx as u64 + 1));
        layout.farmers.push(world.spawn_farmer(farmer, random_tile(config, rng)));
    }

    log::debug!(
        "generated farm {:?}: {} storages, {} conveyors, {} farmers",
        location,
        layout.storages().len(),
        layout.conveyors.len(),
        layout.farmers.len()
    );

    layout
}
