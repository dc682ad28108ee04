//! Generation - procedural creation of farms and their storage contents.

mod farm;
mod items;
mod names;

pub use farm::*;
pub use items::*;
pub use names::*;
