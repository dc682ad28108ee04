//! Per-owner typed registry.
//!
//! Hosts keep one long-lived value per owner (a mod, a player, a machine
//! kind): its preferences, a cached search result, a custom manager. The
//! first `get_or_create` for an owner fixes the value's type; asking for the
//! same owner with another type is an error rather than a silent
//! reinterpretation.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::{EngineError, Result};

struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any>,
}

pub struct OwnerRegistry<K> {
    entries: HashMap<K, Entry>,
}

impl<K> Default for OwnerRegistry<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + fmt::Debug> OwnerRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the owner's value, creating it on first use.
    ///
    /// Fails with [`EngineError::TypeMismatch`] if the owner already holds a
    /// value of another type.
    pub fn get_or_create<T: Any>(&mut self, owner: K, create: impl FnOnce() -> T) -> Result<&mut T> {
        let label = format!("{owner:?}");
        let entry = self.entries.entry(owner).or_insert_with(|| Entry {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: Box::new(create()),
        });
        let registered = entry.type_name;
        entry.value.downcast_mut::<T>().ok_or_else(|| EngineError::TypeMismatch {
            owner: label,
            registered,
            requested: type_name::<T>(),
        })
    }

    /// Untyped lookup, along with the registered type's name.
    pub fn get(&self, owner: &K) -> Option<(&'static str, &dyn Any)> {
        self.entries
            .get(owner)
            .map(|entry| (entry.type_name, entry.value.as_ref()))
    }

    /// Typed lookup. `Ok(None)` when nothing is registered for the owner.
    pub fn get_typed<T: Any>(&self, owner: &K) -> Result<Option<&T>> {
        let Some(entry) = self.entries.get(owner) else {
            return Ok(None);
        };
        match entry.value.downcast_ref::<T>() {
            Some(value) => Ok(Some(value)),
            None => Err(EngineError::TypeMismatch {
                owner: format!("{owner:?}"),
                registered: entry.type_name,
                requested: type_name::<T>(),
            }),
        }
    }

    pub fn contains(&self, owner: &K) -> bool {
        self.entries.contains_key(owner)
    }

    /// Whether the owner's value has type `T`.
    pub fn holds<T: Any>(&self, owner: &K) -> bool {
        self.entries
            .get(owner)
            .is_some_and(|entry| entry.type_id == TypeId::of::<T>())
    }

    pub fn remove(&mut self, owner: &K) -> Option<Box<dyn Any>> {
        self.entries.remove(owner).map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: fmt::Debug> fmt::Debug for OwnerRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(owner, entry)| (owner, entry.type_name)))
            .finish()
    }
}
