//! Storage engine - main entry point for hosts.
//!
//! `StashEngine` ties the farm world to the storage logic: it finds the
//! storages around a farmer, locks them through a [`QueuedTransport`], and
//! crafts or deposits once the locks resolve. Results arrive through a
//! [`Receipt`] that fills in on the tick that resolves the locks (or right
//! away when nothing needed locking).

use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use stashnet_logic::config::{ConsumeConfig, DiscoveryConfig};
use stashnet_logic::consume::{consume_items, count_items, Ingredient};
use stashnet_logic::discovery::{deduplicate, locate_resources, Explorer};
use stashnet_logic::item::Item;
use stashnet_logic::locking::{unsafe_resources, LockCoordinator};
use stashnet_logic::position::Position;
use stashnet_logic::provider::{ActorId, Handle, LocatedResource, WorkingResource};
use stashnet_logic::registry::OwnerRegistry;
use stashnet_logic::transfer::{add_item_to_inventory, add_to_inventories, TransferBehavior};

use crate::components::Farmer;
use crate::error::{HostError, Result};
use crate::persistence::{load_world, save_world};
use crate::transport::QueuedTransport;
use crate::world::FarmWorld;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub discovery: DiscoveryConfig,
    pub consume: ConsumeConfig,
    /// Also use the unplaced storages (fridges) of the farmer's location.
    pub include_unplaced: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            consume: ConsumeConfig::default(),
            include_unplaced: true,
        }
    }
}

/// Per-farmer preferences, kept in the engine's owner registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerPrefs {
    pub consume: ConsumeConfig,
    pub deposit: TransferBehavior,
}

impl Default for FarmerPrefs {
    fn default() -> Self {
        Self {
            consume: ConsumeConfig::default(),
            deposit: TransferBehavior::All,
        }
    }
}

/// A crafting recipe: ingredients by item id, and the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<(String, u32)>,
    pub product: Item,
}

impl Recipe {
    /// Ingredients with repeated ids merged, in first-seen order.
    pub fn requirements(&self) -> Vec<(String, u32)> {
        let mut merged: Vec<(String, u32)> = Vec::new();
        for (id, amount) in &self.ingredients {
            match merged.iter_mut().find(|(seen, _)| seen == id) {
                Some((_, total)) => *total = total.saturating_add(*amount),
                None => merged.push((id.clone(), *amount)),
            }
        }
        merged
    }

    pub fn new(name: impl Into<String>, ingredients: &[(&str, u32)], product: Item) -> Self {
        Self {
            name: name.into(),
            ingredients: ingredients
                .iter()
                .map(|(id, amount)| (id.to_string(), *amount))
                .collect(),
            product,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CraftOutcome {
    Crafted {
        /// Part of the product the backpack had no room for. The host
        /// decides what happens to it (drop it, mail it...).
        leftover: Option<Item>,
        storages_used: usize,
    },
    /// Not enough ingredients; nothing was consumed.
    Missing(Vec<(String, u32)>),
    /// Consumption fell short after the count passed. What was taken is
    /// gone and no product was made.
    Incomplete(Vec<(String, u32)>),
    /// The farmer was despawned before the locks resolved; nothing was
    /// touched.
    FarmerGone,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DepositOutcome {
    /// The farmer was despawned before the locks resolved; nothing moved.
    pub farmer_gone: bool,
    /// Every stackable backpack stack found a place.
    pub all_placed: bool,
    /// Backpack slots that gave up items.
    pub touched_slots: Vec<usize>,
    pub storages_used: usize,
}

/// Result of an engine operation that may finish on a later tick.
#[derive(Debug)]
pub struct Receipt<T> {
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for Receipt<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Receipt<T> {
    fn pending() -> (Self, Rc<RefCell<Option<T>>>) {
        let slot = Rc::new(RefCell::new(None));
        (Self { slot: slot.clone() }, slot)
    }

    pub fn is_ready(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub fn take(&self) -> Option<T> {
        self.slot.borrow_mut().take()
    }
}

impl<T: Clone> Receipt<T> {
    pub fn get(&self) -> Option<T> {
        self.slot.borrow().clone()
    }
}

/// Main storage engine
pub struct StashEngine {
    pub world: FarmWorld,
    pub config: EngineConfig,
    /// Per-farmer values. [`FarmerPrefs`] live here; hosts may store their
    /// own types for other owners.
    pub registry: OwnerRegistry<ActorId>,
    transport: Rc<QueuedTransport>,
    coordinator: LockCoordinator,
    pub ticks: u64,
}

impl Default for StashEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl StashEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_world(FarmWorld::new(), config)
    }

    pub fn with_world(world: FarmWorld, config: EngineConfig) -> Self {
        let transport = Rc::new(QueuedTransport::new());
        let coordinator = LockCoordinator::new(transport.clone());
        Self {
            world,
            config,
            registry: OwnerRegistry::new(),
            transport,
            coordinator,
            ticks: 0,
        }
    }

    pub fn transport(&self) -> &QueuedTransport {
        &self.transport
    }

    /// Advance one tick, resolving queued lock requests.
    pub fn tick(&mut self) -> usize {
        self.ticks += 1;
        self.transport.tick()
    }

    pub fn spawn_farmer(&mut self, name: &str, actor: ActorId, position: Position) -> Handle {
        self.world.spawn_farmer(Farmer::new(name, actor), position)
    }

    /// Preferences of `actor`, defaults if none were stored.
    pub fn prefs(&self, actor: ActorId) -> Result<FarmerPrefs> {
        Ok(self
            .registry
            .get_typed::<FarmerPrefs>(&actor)?
            .cloned()
            .unwrap_or_default())
    }

    pub fn set_prefs(&mut self, actor: ActorId, prefs: FarmerPrefs) -> Result<()> {
        *self.registry.get_or_create(actor, FarmerPrefs::default)? = prefs;
        Ok(())
    }

    fn farmer_parts(&self, farmer: Handle) -> Result<(ActorId, Position, WorkingResource)> {
        let (info, position) = self.world.farmer(farmer).ok_or(HostError::UnknownFarmer(farmer))?;
        let backpack = unsafe_resources(
            &[LocatedResource::new(farmer, None)],
            &self.world,
            Some(info.actor),
            true,
        )
        .pop()
        .ok_or(HostError::UnknownFarmer(farmer))?;
        Ok((info.actor, position, backpack))
    }

    /// Storages within reach of a farmer, in discovery order, followed by
    /// the unplaced storages of the farmer's location.
    pub fn nearby_storages(&self, farmer: Handle) -> Result<Vec<LocatedResource>> {
        let (actor, position, _) = self.farmer_parts(farmer)?;
        let world = &self.world;
        let is_conveyor = |handle: Handle| world.is_conveyor(handle);

        let mut found = Explorer::new(world, world)
            .with_connector(&is_conveyor)
            .with_actor(actor)
            .with_config(self.config.discovery.clone())
            .from_positions(&[position])
            .into_resources();

        if self.config.include_unplaced {
            if let Some(location) = position.location {
                let unplaced = world.unplaced_storages(location);
                found.extend(locate_resources(&unplaced, &[location], Some(location), world, world, false));
            }
        }

        deduplicate(&mut found);
        Ok(found)
    }

    /// Craft `recipe` from the farmer's backpack and nearby storages.
    ///
    /// Ingredients are checked against what could be locked before anything
    /// is consumed; the product goes into the backpack.
    pub fn craft(&mut self, farmer: Handle, recipe: &Recipe) -> Result<Receipt<CraftOutcome>> {
        let (actor, _, backpack) = self.farmer_parts(farmer)?;
        let prefs = self.prefs(actor)?;
        let candidates = self.nearby_storages(farmer)?;
        let recipe = recipe.clone();
        let requirements = recipe.requirements();
        let (receipt, sink) = Receipt::pending();

        log::debug!(
            "{:?} crafting {} with {} candidate storages",
            actor,
            recipe.name,
            candidates.len()
        );

        self.coordinator.with_locks(&candidates, &self.world, actor, move |locked, mut release| {
            let Some(bag) = backpack.items().filter(|_| backpack.is_valid()) else {
                log::info!("{:?} left before crafting {}", actor, recipe.name);
                *sink.borrow_mut() = Some(CraftOutcome::FarmerGone);
                return;
            };

            let missing: Vec<(String, u32)> = requirements
                .iter()
                .filter_map(|(id, amount)| {
                    let have = count_items(
                        &|item: &Item| item.id == *id,
                        Some(bag.borrow().as_slice()),
                        &locked,
                        prefs.consume.max_quality,
                        Some(u64::from(*amount)),
                    )
                    .amount;
                    (have < u64::from(*amount)).then(|| (id.clone(), *amount - have as u32))
                })
                .collect();

            if !missing.is_empty() {
                *sink.borrow_mut() = Some(CraftOutcome::Missing(missing));
                return;
            }

            let ingredients: Vec<Ingredient> = requirements
                .iter()
                .map(|(id, amount)| Ingredient::by_id(id.clone(), *amount))
                .collect();
            let shortfall = consume_items(
                &ingredients,
                Some(bag.borrow_mut().as_mut_slice()),
                &locked,
                &prefs.consume,
            );
            release.release();

            let incomplete: Vec<(String, u32)> = requirements
                .iter()
                .zip(shortfall)
                .filter(|(_, short)| *short > 0)
                .map(|((id, _), short)| (id.clone(), short))
                .collect();
            if !incomplete.is_empty() {
                log::warn!("{:?} crafting {} came up short: {:?}", actor, recipe.name, incomplete);
                *sink.borrow_mut() = Some(CraftOutcome::Incomplete(incomplete));
                return;
            }

            let stack = recipe.product.stack;
            let leftover = add_item_to_inventory(recipe.product, stack, &backpack);
            *sink.borrow_mut() = Some(CraftOutcome::Crafted {
                leftover,
                storages_used: locked.len(),
            });
        });

        Ok(receipt)
    }

    /// Move backpack stacks into nearby storages following the farmer's
    /// deposit preference, or `behavior` when given.
    pub fn deposit(&mut self, farmer: Handle, behavior: Option<TransferBehavior>) -> Result<Receipt<DepositOutcome>> {
        let (actor, _, backpack) = self.farmer_parts(farmer)?;
        let behavior = match behavior {
            Some(behavior) => behavior,
            None => self.prefs(actor)?.deposit,
        };
        let candidates = self.nearby_storages(farmer)?;
        let (receipt, sink) = Receipt::pending();

        self.coordinator.with_locks_scoped(&candidates, &self.world, actor, move |locked| {
            let Some(bag) = backpack.items().filter(|_| backpack.is_valid()) else {
                *sink.borrow_mut() = Some(DepositOutcome {
                    farmer_gone: true,
                    ..DepositOutcome::default()
                });
                return;
            };
            let mut touched = Vec::new();
            let mut observer = |_: &Item, idx: usize| touched.push(idx);
            let all_placed = add_to_inventories(&mut bag.borrow_mut(), locked, behavior, Some(&mut observer));
            *sink.borrow_mut() = Some(DepositOutcome {
                farmer_gone: false,
                all_placed,
                touched_slots: touched,
                storages_used: locked.len(),
            });
        });

        Ok(receipt)
    }

    /// Give a farmer items directly, as a pickup would. Returns what did not
    /// fit; unstackable items take a slot of their own.
    pub fn give(&mut self, farmer: Handle, item: Item) -> Result<Option<Item>> {
        let (_, _, backpack) = self.farmer_parts(farmer)?;
        let stack = item.stack;
        Ok(add_item_to_inventory(item, stack, &backpack))
    }

    /// Save the world and configuration to a writer (bincode).
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        save_world(writer, &self.world, &self.config, self.ticks)?;
        Ok(())
    }

    /// Replace the world with a saved one. Pending lock requests and
    /// registry values are dropped.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<()> {
        let loaded = load_world(reader)?;
        *self = Self::with_world(loaded.world, loaded.config);
        self.ticks = loaded.ticks;
        Ok(())
    }
}
