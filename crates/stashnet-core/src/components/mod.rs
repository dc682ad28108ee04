//! Component definitions for the farm world.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in the world and the engine.

mod farmer;
mod placement;
mod storage;

pub use farmer::*;
pub use placement::*;
pub use storage::*;
