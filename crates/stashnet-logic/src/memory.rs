//! Map-backed world for hosts without their own entity store.
//!
//! `MemoryWorld` keeps a tile index and a table of [`MemoryStorage`]
//! providers. It implements both [`TileWorld`] and [`Resolver`], so it can be
//! handed straight to the explorer and the lock coordinator. Virtual
//! inventories (no tile, no location) are supported through
//! [`MemoryWorld::add_unplaced`].

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::item::{shared_slots, trim_trailing_empty, Item, SharedSlots, SlotList};
use crate::mutex::MutexHandle;
use crate::position::{LocationId, Position, Rect};
use crate::provider::{
    Handle, Layer, ResourceContext, ResourceProvider, Resolver, TileContents, TileWorld,
};

type ItemFilter = Box<dyn Fn(&Item) -> bool>;

/// A storage with its slots, lock and placement.
pub struct MemoryStorage {
    pub slots: SharedSlots,
    pub mutex: Option<MutexHandle>,
    pub mutex_required: bool,
    pub capacity: usize,
    pub location: Option<LocationId>,
    pub footprint: Option<Rect>,
    pub tile: Option<Position>,
    pub insertable: bool,
    pub extractable: bool,
    valid: Cell<bool>,
    cleanups: Cell<usize>,
    filter: Option<ItemFilter>,
}

impl MemoryStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: shared_slots(Vec::new()),
            mutex: None,
            mutex_required: false,
            capacity,
            location: None,
            footprint: None,
            tile: None,
            insertable: true,
            extractable: true,
            valid: Cell::new(true),
            cleanups: Cell::new(0),
            filter: None,
        }
    }

    pub fn with_items(self, items: SlotList) -> Self {
        *self.slots.borrow_mut() = items;
        self
    }

    /// Guard the storage with `mutex` and refuse access without it.
    pub fn with_mutex(mut self, mutex: MutexHandle) -> Self {
        self.mutex = Some(mutex);
        self.mutex_required = true;
        self
    }

    /// Require a lock without exposing one; such storages are never usable
    /// under the coordinator.
    pub fn requiring_mutex(mut self) -> Self {
        self.mutex_required = true;
        self
    }

    pub fn at(mut self, tile: Position) -> Self {
        self.location = tile.location;
        self.tile = Some(tile);
        self
    }

    pub fn covering(mut self, location: LocationId, footprint: Rect) -> Self {
        self.location = Some(location);
        self.footprint = Some(footprint);
        self
    }

    pub fn extract_only(mut self) -> Self {
        self.insertable = false;
        self
    }

    pub fn insert_only(mut self) -> Self {
        self.extractable = false;
        self
    }

    pub fn accepting(mut self, filter: impl Fn(&Item) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn invalidate(&self) {
        self.valid.set(false);
    }

    /// How many times the storage was compacted after consumption.
    pub fn cleanups(&self) -> usize {
        self.cleanups.get()
    }

    pub fn snapshot(&self) -> SlotList {
        self.slots.borrow().clone()
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("slots", &self.slots.borrow())
            .field("mutex", &self.mutex)
            .field("capacity", &self.capacity)
            .field("tile", &self.tile)
            .field("footprint", &self.footprint)
            .finish_non_exhaustive()
    }
}

impl ResourceProvider for MemoryStorage {
    fn is_valid(&self, _ctx: &ResourceContext) -> bool {
        self.valid.get()
    }

    fn footprint(&self, _ctx: &ResourceContext) -> Option<Rect> {
        self.footprint
    }

    fn tile_position(&self, _ctx: &ResourceContext) -> Option<Position> {
        self.tile
    }

    fn mutex(&self, _ctx: &ResourceContext) -> Option<MutexHandle> {
        self.mutex.clone()
    }

    fn is_mutex_required(&self, _ctx: &ResourceContext) -> bool {
        self.mutex_required
    }

    fn items(&self, _ctx: &ResourceContext) -> Option<SharedSlots> {
        Some(self.slots.clone())
    }

    fn can_insert_items(&self, _ctx: &ResourceContext) -> bool {
        self.insertable
    }

    fn can_extract_items(&self, _ctx: &ResourceContext) -> bool {
        self.extractable
    }

    fn is_item_valid(&self, _ctx: &ResourceContext, item: &Item) -> bool {
        self.filter.as_ref().map_or(true, |accepts| accepts(item))
    }

    fn capacity(&self, _ctx: &ResourceContext) -> usize {
        self.capacity
    }

    fn clean_inventory(&self, _ctx: &ResourceContext) {
        self.cleanups.set(self.cleanups.get() + 1);
        trim_trailing_empty(&mut self.slots.borrow_mut());
    }
}

/// Tile index plus storage table.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    tiles: HashMap<Position, TileContents>,
    storages: HashMap<Handle, Rc<MemoryStorage>>,
    connectors: HashSet<Handle>,
    placements: HashMap<Handle, (Option<LocationId>, Vec<Position>)>,
    next_handle: u64,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }

    fn place(&mut self, handle: Handle, layer: Layer, location: Option<LocationId>, tiles: Vec<Position>) {
        for tile in &tiles {
            self.tiles.entry(*tile).or_default().set(layer, Some(handle));
        }
        self.placements.insert(handle, (location, tiles));
    }

    /// Place a storage on its footprint, or on its single tile.
    ///
    /// A storage with neither is registered but occupies no tile.
    pub fn add_storage(&mut self, layer: Layer, storage: MemoryStorage) -> Handle {
        let handle = self.alloc();
        let location = storage.location;
        let tiles = match (storage.footprint, storage.tile) {
            (Some(rect), _) => rect.tiles(location),
            (None, Some(tile)) => vec![tile],
            (None, None) => Vec::new(),
        };
        self.place(handle, layer, location, tiles);
        self.storages.insert(handle, Rc::new(storage));
        handle
    }

    /// Register a storage that belongs to `location` (or to no location)
    /// without occupying a tile, like a built-in fridge or a backpack.
    pub fn add_unplaced(&mut self, location: Option<LocationId>, storage: MemoryStorage) -> Handle {
        let handle = self.alloc();
        self.placements.insert(handle, (location, Vec::new()));
        self.storages.insert(handle, Rc::new(storage));
        handle
    }

    /// Pass-through entity, e.g. a conveyor segment.
    pub fn add_connector(&mut self, layer: Layer, tile: Position) -> Handle {
        let handle = self.alloc();
        self.place(handle, layer, tile.location, vec![tile]);
        self.connectors.insert(handle);
        handle
    }

    /// Entity that is neither storage nor connector.
    pub fn add_obstacle(&mut self, layer: Layer, tile: Position) -> Handle {
        let handle = self.alloc();
        self.place(handle, layer, tile.location, vec![tile]);
        handle
    }

    pub fn storage(&self, handle: Handle) -> Option<&Rc<MemoryStorage>> {
        self.storages.get(&handle)
    }

    pub fn is_connector(&self, handle: Handle) -> bool {
        self.connectors.contains(&handle)
    }

    /// Take an entity out of the world. Providers already handed out report
    /// it as invalid from now on.
    pub fn remove(&mut self, handle: Handle) {
        if let Some((_, tiles)) = self.placements.remove(&handle) {
            for tile in tiles {
                if let Some(contents) = self.tiles.get_mut(&tile) {
                    contents.remove(handle);
                    if contents.is_empty() {
                        self.tiles.remove(&tile);
                    }
                }
            }
        }
        if let Some(storage) = self.storages.remove(&handle) {
            storage.invalidate();
        }
        self.connectors.remove(&handle);
    }
}

impl TileWorld for MemoryWorld {
    fn contents_at(&self, position: &Position) -> TileContents {
        self.tiles.get(position).copied().unwrap_or_default()
    }

    fn location_contains(&self, location: LocationId, handle: Handle) -> bool {
        matches!(self.placements.get(&handle), Some((Some(loc), _)) if *loc == location)
    }
}

impl Resolver for MemoryWorld {
    fn provider(&self, handle: Handle) -> Option<Rc<dyn ResourceProvider>> {
        self.storages
            .get(&handle)
            .map(|s| s.clone() as Rc<dyn ResourceProvider>)
    }
}
