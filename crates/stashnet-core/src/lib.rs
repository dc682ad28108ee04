//! StashNet Core - tile-world host for the storage engine
//!
//! A farm built on an Entity Component System (ECS) via `hecs`, wired to
//! `stashnet-logic` so farmers can craft from and deposit into the storages
//! around them.
//!
//! # Architecture
//!
//! - **Entities**: storages (chests, crates, fridges, hoppers, shipping
//!   bins), conveyors, scenery and farmers
//! - **Components**: pure data ([`Storage`](components::Storage),
//!   [`Placement`](components::Placement), [`Farmer`](components::Farmer))
//! - **World**: [`FarmWorld`](world::FarmWorld) keeps the tile index, slot
//!   lists and locks next to the ECS and resolves handles into providers
//! - **Transport**: [`QueuedTransport`](transport::QueuedTransport) decides
//!   lock requests one tick after they are made
//!
//! # Example
//!
//! ```rust,no_run
//! use stashnet_core::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut engine = StashEngine::default();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let farm = generate_farm(&mut engine.world, &FarmConfig::default(), &mut rng);
//!
//! let robin = farm.farmers[0];
//! let receipt = engine.deposit(robin, None).unwrap();
//! while !receipt.is_ready() {
//!     engine.tick();
//! }
//! ```

pub mod components;
pub mod engine;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod transport;
pub mod world;

pub use error::{HostError, Result};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{CraftOutcome, DepositOutcome, EngineConfig, Recipe, Receipt, StashEngine};
    pub use crate::generation::{generate_farm, FarmConfig, FarmLayout};
    pub use crate::world::FarmWorld;
    pub use stashnet_logic::item::Item;
    pub use stashnet_logic::position::{LocationId, Position};
}
