//! Storage logic for StashNet.
//!
//! This crate finds storages scattered across a tile world, locks a batch of
//! them for one actor, and moves or consumes items across the batch. It knows
//! nothing about how a host represents entities: everything goes through the
//! [`provider::TileWorld`], [`provider::Resolver`] and
//! [`mutex::MutexTransport`] traits, so the same code runs against an ECS
//! world, a server database or the in-memory [`memory::MemoryWorld`].
//!
//! Data flows one way:
//!
//! ```text
//! Explorer ──► LocatedResource ──► LockCoordinator ──► WorkingResource ──► consume / transfer
//! ```
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Discovery limits and consumption quality policy, with validation |
//! | [`consume`] | Reverse-order consumption, quality tiers, item counting |
//! | [`discovery`] | Bounded flood fill over storages and connectors |
//! | [`error`] | Host contract violations |
//! | [`item`] | Item stacks and slot lists |
//! | [`locking`] | Aggregated lock requests with graceful degradation |
//! | [`memory`] | Map-backed tile world and storages |
//! | [`mutex`] | Lock handles, lock states, transports |
//! | [`position`] | Tile positions, neighborhoods, rects |
//! | [`provider`] | Handles, storage capabilities, world lookup traits |
//! | [`registry`] | Per-owner typed values |
//! | [`transfer`] | Placing stacks into storages by transfer mode |

pub mod config;
pub mod consume;
pub mod discovery;
pub mod error;
pub mod item;
pub mod locking;
pub mod memory;
pub mod mutex;
pub mod position;
pub mod provider;
pub mod registry;
pub mod transfer;

pub use error::{EngineError, Result};
