//! Engine errors.
//!
//! Ordinary runtime conditions (a missing provider, a lock held elsewhere, a
//! full storage, an item above the quality bound) are not errors: the engine
//! simply returns fewer results. The variants here are contract violations by
//! the integrating host and must stop the caller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// An owner already has a registered value of a different type.
    #[error("owner {owner} already registered a {registered}, cannot use it as {requested}")]
    TypeMismatch {
        owner: String,
        registered: &'static str,
        requested: &'static str,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),
}

pub type Result<T> = std::result::Result<T, EngineError>;
