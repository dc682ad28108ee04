//! Host errors.

use stashnet_logic::provider::Handle;
use stashnet_logic::EngineError;
use thiserror::Error;

/// Errors surfaced by [`StashEngine`](crate::engine::StashEngine).
#[derive(Error, Debug)]
pub enum HostError {
    #[error("{0:?} is not a farmer")]
    UnknownFarmer(Handle),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Snapshot(#[from] crate::persistence::SnapshotError),
}

pub type Result<T> = std::result::Result<T, HostError>;
