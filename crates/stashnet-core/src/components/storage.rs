//! Storage components.
//!
//! The slot contents of a storage live outside the ECS (they are shared with
//! the providers handed to the engine); these components carry the rest.

use serde::{Deserialize, Serialize};

/// Kinds of storage the host knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    Chest,
    /// Multi-tile crate.
    Crate,
    /// Kitchen fridge, unplaced and shared by the location.
    Fridge,
    /// Machine output tray: items can be taken, never put back.
    Hopper,
    /// Shipping bin: items go in, never come out.
    ShippingBin,
}

impl StorageKind {
    /// Slot capacity of a freshly built storage.
    pub fn default_capacity(self) -> usize {
        match self {
            StorageKind::Chest => 36,
            StorageKind::Crate => 72,
            StorageKind::Fridge => 36,
            StorageKind::Hopper => 1,
            StorageKind::ShippingBin => 100,
        }
    }

    pub fn insertable(self) -> bool {
        self != StorageKind::Hopper
    }

    pub fn extractable(self) -> bool {
        self != StorageKind::ShippingBin
    }

    /// Storages whose contents are synchronized with other players and must
    /// be locked first.
    pub fn needs_lock(self) -> bool {
        matches!(self, StorageKind::Chest | StorageKind::Crate | StorageKind::Fridge)
    }
}

/// Storage component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub kind: StorageKind,
    pub capacity: usize,
    /// Item ids this storage accepts. Empty means anything.
    pub accepts: Vec<String>,
    /// Name of the lock guarding this storage. Storages naming the same lock
    /// share it.
    pub lock: Option<String>,
}

impl Storage {
    pub fn new(kind: StorageKind) -> Self {
        Self {
            kind,
            capacity: kind.default_capacity(),
            accepts: Vec::new(),
            lock: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_lock(mut self, name: impl Into<String>) -> Self {
        self.lock = Some(name.into());
        self
    }

    pub fn accepting(mut self, ids: &[&str]) -> Self {
        self.accepts = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn accepts_id(&self, id: &str) -> bool {
        self.accepts.is_empty() || self.accepts.iter().any(|a| a == id)
    }
}
