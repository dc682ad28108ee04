//! Farm world - hecs entities plus the tile index, slot lists and locks.
//!
//! Entities carry plain data components ([`Storage`], [`Placement`],
//! [`Conveyor`], [`Farmer`]). Slot contents and locks are shared with the
//! providers handed to the storage engine, so they live next to the ECS,
//! keyed by handle. A handle is the entity's bit representation.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use hecs::{Entity, World};
use stashnet_logic::item::{shared_slots, Item, SharedSlots, SlotList};
use stashnet_logic::mutex::MutexHandle;
use stashnet_logic::position::{LocationId, Position, Rect};
use stashnet_logic::provider::{
    Handle, Layer, ResourceContext, ResourceProvider, Resolver, TileContents, TileWorld,
};

use crate::components::*;

pub fn handle_of(entity: Entity) -> Handle {
    Handle(entity.to_bits().get())
}

pub fn entity_of(handle: Handle) -> Option<Entity> {
    Entity::from_bits(handle.0)
}

/// ECS world plus everything the storage engine shares with it.
pub struct FarmWorld {
    pub ecs: World,
    tiles: HashMap<Position, TileContents>,
    slots: HashMap<Handle, SharedSlots>,
    /// Locks shared by name between storages.
    locks: HashMap<String, MutexHandle>,
    /// Locks of storages that name none. Never saved.
    private_locks: HashMap<Handle, MutexHandle>,
    alive: HashMap<Handle, Rc<Cell<bool>>>,
}

impl Default for FarmWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FarmWorld {
    pub fn new() -> Self {
        Self {
            ecs: World::new(),
            tiles: HashMap::new(),
            slots: HashMap::new(),
            locks: HashMap::new(),
            private_locks: HashMap::new(),
            alive: HashMap::new(),
        }
    }

    // ── Spawning ───────────────────────────────────────────────────────

    fn occupy(&mut self, handle: Handle, placement: &Placement) {
        for tile in placement.tiles() {
            self.tiles.entry(tile).or_default().set(placement.layer, Some(handle));
        }
    }

    /// Whether any tile of `placement` already has an occupant on its layer.
    pub fn is_blocked(&self, placement: &Placement) -> bool {
        placement.tiles().iter().any(|tile| {
            self.tiles
                .get(tile)
                .is_some_and(|contents| contents.get(placement.layer).is_some())
        })
    }

    /// Spawn a storage with its initial contents.
    ///
    /// Storages that must be locked but name no lock get a private one.
    pub fn spawn_storage(&mut self, storage: Storage, placement: Placement, items: SlotList) -> Handle {
        let entity = self.ecs.reserve_entity();
        let handle = handle_of(entity);

        match &storage.lock {
            Some(name) => {
                self.locks
                    .entry(name.clone())
                    .or_insert_with(|| MutexHandle::new(name.clone()));
            }
            None if storage.kind.needs_lock() => {
                let name = format!("{:?}#{}", storage.kind, handle.0);
                self.private_locks.insert(handle, MutexHandle::new(name));
            }
            None => {}
        }

        self.occupy(handle, &placement);
        self.slots.insert(handle, shared_slots(items));
        self.alive.insert(handle, Rc::new(Cell::new(true)));
        self.ecs.spawn_at(entity, (storage, placement));
        handle
    }

    pub fn spawn_conveyor(&mut self, position: Position) -> Handle {
        let placement = Placement::tile(Layer::Feature, position);
        let handle = handle_of(self.ecs.spawn((Conveyor, placement)));
        self.occupy(handle, &placement);
        handle
    }

    pub fn spawn_scenery(&mut self, name: &str, position: Position) -> Handle {
        let placement = Placement::tile(Layer::Object, position);
        let handle = handle_of(self.ecs.spawn((Scenery::new(name), placement)));
        self.occupy(handle, &placement);
        handle
    }

    /// Spawn a farmer standing at `position` with an empty backpack.
    pub fn spawn_farmer(&mut self, farmer: Farmer, position: Position) -> Handle {
        let placement = Placement::unplaced(position.location);
        let handle = handle_of(self.ecs.spawn((farmer, Standing(position), placement)));
        self.slots.insert(handle, shared_slots(Vec::new()));
        self.alive.insert(handle, Rc::new(Cell::new(true)));
        handle
    }

    /// Remove an entity. Providers already handed out turn invalid.
    pub fn despawn(&mut self, handle: Handle) -> bool {
        let Some(entity) = entity_of(handle) else {
            return false;
        };
        let placement = self.ecs.get::<&Placement>(entity).ok().map(|p| *p);
        if self.ecs.despawn(entity).is_err() {
            return false;
        }
        if let Some(placement) = placement {
            for tile in placement.tiles() {
                if let Some(contents) = self.tiles.get_mut(&tile) {
                    contents.remove(handle);
                    if contents.is_empty() {
                        self.tiles.remove(&tile);
                    }
                }
            }
        }
        self.slots.remove(&handle);
        self.private_locks.remove(&handle);
        if let Some(alive) = self.alive.remove(&handle) {
            alive.set(false);
        }
        true
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn slots(&self, handle: Handle) -> Option<SharedSlots> {
        self.slots.get(&handle).cloned()
    }

    /// Copy of the slot contents.
    pub fn contents(&self, handle: Handle) -> Option<SlotList> {
        self.slots.get(&handle).map(|slots| slots.borrow().clone())
    }

    pub fn lock(&self, name: &str) -> Option<MutexHandle> {
        self.locks.get(name).cloned()
    }

    /// Lock guarding a storage, if any.
    pub fn lock_of(&self, handle: Handle) -> Option<MutexHandle> {
        let entity = entity_of(handle)?;
        let storage = self.ecs.get::<&Storage>(entity).ok()?;
        match storage.lock.as_deref() {
            Some(name) => self.lock(name),
            None => self.private_locks.get(&handle).cloned(),
        }
    }

    /// Named and private locks currently tracked.
    pub fn lock_count(&self) -> usize {
        self.locks.len() + self.private_locks.len()
    }

    pub fn is_conveyor(&self, handle: Handle) -> bool {
        entity_of(handle).is_some_and(|e| self.ecs.get::<&Conveyor>(e).is_ok())
    }

    pub fn farmer(&self, handle: Handle) -> Option<(Farmer, Position)> {
        let entity = entity_of(handle)?;
        let farmer = self.ecs.get::<&Farmer>(entity).ok()?;
        let standing = self.ecs.get::<&Standing>(entity).ok()?;
        Some(((*farmer).clone(), standing.0))
    }

    pub fn move_farmer(&mut self, handle: Handle, position: Position) -> bool {
        let Some(entity) = entity_of(handle) else {
            return false;
        };
        match self.ecs.query_one_mut::<(&mut Standing, &mut Placement)>(entity) {
            Ok((standing, placement)) => {
                standing.0 = position;
                placement.location = position.location;
                true
            }
            Err(_) => false,
        }
    }

    /// Storages belonging to `location` without occupying a tile.
    pub fn unplaced_storages(&self, location: LocationId) -> Vec<Handle> {
        let mut found: Vec<Handle> = self
            .ecs
            .query::<(&Storage, &Placement)>()
            .iter()
            .filter(|(_, (_, p))| p.area == Area::Unplaced && p.location == Some(location))
            .map(|(entity, _)| handle_of(entity))
            .collect();
        found.sort();
        found
    }

    pub fn storage_count(&self) -> usize {
        self.ecs.query::<&Storage>().iter().count()
    }

    /// Total items across every storage and backpack.
    pub fn total_items(&self) -> u64 {
        self.slots
            .values()
            .map(|slots| stashnet_logic::item::total_stack(&slots.borrow()))
            .sum()
    }
}

impl TileWorld for FarmWorld {
    fn contents_at(&self, position: &Position) -> TileContents {
        self.tiles.get(position).copied().unwrap_or_default()
    }

    fn location_contains(&self, location: LocationId, handle: Handle) -> bool {
        entity_of(handle)
            .and_then(|e| self.ecs.get::<&Placement>(e).ok().map(|p| p.location == Some(location)))
            .unwrap_or(false)
    }
}

impl Resolver for FarmWorld {
    fn provider(&self, handle: Handle) -> Option<Rc<dyn ResourceProvider>> {
        let entity = entity_of(handle)?;
        let slots = self.slots.get(&handle)?.clone();
        let alive = self.alive.get(&handle)?.clone();

        if let Ok(storage) = self.ecs.get::<&Storage>(entity) {
            let placement = *self.ecs.get::<&Placement>(entity).ok()?;
            return Some(Rc::new(StorageProvider {
                mutex: self.lock_of(handle),
                storage: (*storage).clone(),
                placement,
                slots,
                alive,
            }));
        }

        let farmer = self.ecs.get::<&Farmer>(entity).ok()?;
        Some(Rc::new(BackpackProvider {
            capacity: farmer.backpack_slots,
            slots,
            alive,
        }))
    }
}

/// Provider view of a storage entity.
struct StorageProvider {
    storage: Storage,
    placement: Placement,
    slots: SharedSlots,
    mutex: Option<MutexHandle>,
    alive: Rc<Cell<bool>>,
}

impl ResourceProvider for StorageProvider {
    fn is_valid(&self, _ctx: &ResourceContext) -> bool {
        self.alive.get()
    }

    fn footprint(&self, _ctx: &ResourceContext) -> Option<Rect> {
        match self.placement.area {
            Area::Footprint(rect) => Some(rect),
            _ => None,
        }
    }

    fn tile_position(&self, _ctx: &ResourceContext) -> Option<Position> {
        match self.placement.area {
            Area::Tile(position) => Some(position),
            _ => None,
        }
    }

    fn mutex(&self, _ctx: &ResourceContext) -> Option<MutexHandle> {
        self.mutex.clone()
    }

    fn is_mutex_required(&self, _ctx: &ResourceContext) -> bool {
        self.storage.kind.needs_lock()
    }

    fn items(&self, _ctx: &ResourceContext) -> Option<SharedSlots> {
        self.alive.get().then(|| self.slots.clone())
    }

    fn can_insert_items(&self, _ctx: &ResourceContext) -> bool {
        self.storage.kind.insertable()
    }

    fn can_extract_items(&self, _ctx: &ResourceContext) -> bool {
        self.storage.kind.extractable()
    }

    fn is_item_valid(&self, _ctx: &ResourceContext, item: &Item) -> bool {
        self.storage.accepts_id(&item.id)
    }

    fn capacity(&self, _ctx: &ResourceContext) -> usize {
        self.storage.capacity
    }
}

/// Provider view of a farmer's backpack. Only the farmer touches it, so it
/// has no lock.
struct BackpackProvider {
    capacity: usize,
    slots: SharedSlots,
    alive: Rc<Cell<bool>>,
}

impl ResourceProvider for BackpackProvider {
    fn is_valid(&self, _ctx: &ResourceContext) -> bool {
        self.alive.get()
    }

    fn mutex(&self, _ctx: &ResourceContext) -> Option<MutexHandle> {
        None
    }

    fn is_mutex_required(&self, _ctx: &ResourceContext) -> bool {
        false
    }

    fn items(&self, _ctx: &ResourceContext) -> Option<SharedSlots> {
        self.alive.get().then(|| self.slots.clone())
    }

    fn capacity(&self, _ctx: &ResourceContext) -> usize {
        self.capacity
    }
}
