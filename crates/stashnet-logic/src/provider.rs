//! Resource handles, provider capabilities and world lookup.
//!
//! The engine never inspects concrete world entities. It sees an opaque
//! [`Handle`], asks a [`Resolver`] for the [`ResourceProvider`] capability of
//! that handle, and asks a [`TileWorld`] which handles sit on a tile. Anything
//! exposing validity, slots and a lock can act as storage: chests, fridges,
//! machines with output trays, multi-tile crates.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::item::{trim_trailing_empty, Item, SharedSlots};
use crate::mutex::MutexHandle;
use crate::position::{LocationId, Position, Rect};

/// Opaque identity of a world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub u64);

/// Identity of a player or other acting party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

/// Arguments every provider query is made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceContext {
    pub handle: Handle,
    pub location: Option<LocationId>,
    pub actor: Option<ActorId>,
}

/// Storage capability for a handle.
pub trait ResourceProvider {
    /// Whether the handle still refers to a usable storage.
    fn is_valid(&self, ctx: &ResourceContext) -> bool;

    /// Tiles covered by a multi-tile storage.
    fn footprint(&self, _ctx: &ResourceContext) -> Option<Rect> {
        None
    }

    /// Tile of a single-tile storage.
    fn tile_position(&self, _ctx: &ResourceContext) -> Option<Position> {
        None
    }

    fn mutex(&self, ctx: &ResourceContext) -> Option<MutexHandle>;

    /// Whether the storage is unsafe to touch without its lock.
    fn is_mutex_required(&self, _ctx: &ResourceContext) -> bool {
        true
    }

    fn items(&self, ctx: &ResourceContext) -> Option<SharedSlots>;

    fn can_insert_items(&self, _ctx: &ResourceContext) -> bool {
        true
    }

    fn can_extract_items(&self, _ctx: &ResourceContext) -> bool {
        true
    }

    /// Whether the storage accepts this kind of item at all.
    fn is_item_valid(&self, _ctx: &ResourceContext, _item: &Item) -> bool {
        true
    }

    /// Maximum number of slots.
    fn capacity(&self, ctx: &ResourceContext) -> usize;

    /// Compact storage after items were removed.
    fn clean_inventory(&self, ctx: &ResourceContext) {
        if let Some(slots) = self.items(ctx) {
            trim_trailing_empty(&mut slots.borrow_mut());
        }
    }
}

/// Maps a handle to its provider capability.
pub trait Resolver {
    fn provider(&self, handle: Handle) -> Option<Rc<dyn ResourceProvider>>;
}

impl<F> Resolver for F
where
    F: Fn(Handle) -> Option<Rc<dyn ResourceProvider>>,
{
    fn provider(&self, handle: Handle) -> Option<Rc<dyn ResourceProvider>> {
        self(handle)
    }
}

/// Entity layers. A tile holds at most one occupant per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Object,
    Feature,
    Furniture,
}

/// Entities occupying one tile, by layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileContents {
    pub object: Option<Handle>,
    pub feature: Option<Handle>,
    pub furniture: Option<Handle>,
}

impl TileContents {
    /// Occupants in lookup order: object, terrain feature, furniture.
    pub fn iter(&self) -> impl Iterator<Item = Handle> {
        [self.object, self.feature, self.furniture].into_iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.object.is_none() && self.feature.is_none() && self.furniture.is_none()
    }

    pub fn get(&self, layer: Layer) -> Option<Handle> {
        match layer {
            Layer::Object => self.object,
            Layer::Feature => self.feature,
            Layer::Furniture => self.furniture,
        }
    }

    pub fn set(&mut self, layer: Layer, handle: Option<Handle>) {
        match layer {
            Layer::Object => self.object = handle,
            Layer::Feature => self.feature = handle,
            Layer::Furniture => self.furniture = handle,
        }
    }

    /// Clear whichever layer holds `handle`.
    pub fn remove(&mut self, handle: Handle) {
        for slot in [&mut self.object, &mut self.feature, &mut self.furniture] {
            if *slot == Some(handle) {
                *slot = None;
            }
        }
    }
}

/// Host world lookups.
pub trait TileWorld {
    fn contents_at(&self, position: &Position) -> TileContents;

    /// Whether `handle` is placed somewhere in `location`.
    fn location_contains(&self, _location: LocationId, _handle: Handle) -> bool {
        false
    }
}

/// A storage found somewhere. Equality is by handle only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocatedResource {
    pub handle: Handle,
    pub location: Option<LocationId>,
}

impl LocatedResource {
    pub fn new(handle: Handle, location: Option<LocationId>) -> Self {
        Self { handle, location }
    }
}

impl PartialEq for LocatedResource {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for LocatedResource {}

impl std::hash::Hash for LocatedResource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

/// A storage that passed validity and lock checks for one transaction.
#[derive(Clone)]
pub struct WorkingResource {
    pub handle: Handle,
    pub provider: Rc<dyn ResourceProvider>,
    pub mutex: Option<MutexHandle>,
    pub location: Option<LocationId>,
    pub actor: Option<ActorId>,
}

impl WorkingResource {
    pub fn context(&self) -> ResourceContext {
        ResourceContext {
            handle: self.handle,
            location: self.location,
            actor: self.actor,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.provider.is_valid(&self.context())
    }

    pub fn items(&self) -> Option<SharedSlots> {
        self.provider.items(&self.context())
    }

    pub fn can_insert_items(&self) -> bool {
        self.provider.can_insert_items(&self.context())
    }

    pub fn can_extract_items(&self) -> bool {
        self.provider.can_extract_items(&self.context())
    }

    pub fn is_item_valid(&self, item: &Item) -> bool {
        self.provider.is_item_valid(&self.context(), item)
    }

    pub fn capacity(&self) -> usize {
        self.provider.capacity(&self.context())
    }

    pub fn clean_inventory(&self) {
        self.provider.clean_inventory(&self.context());
    }

    pub fn located(&self) -> LocatedResource {
        LocatedResource::new(self.handle, self.location)
    }
}

impl fmt::Debug for WorkingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingResource")
            .field("handle", &self.handle)
            .field("mutex", &self.mutex)
            .field("location", &self.location)
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}
