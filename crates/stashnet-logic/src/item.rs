//! Item stacks and slot lists.
//!
//! A storage holds an ordered list of slots, each either empty (`None`) or an
//! [`Item`] stack. Occupied slots always satisfy `0 < stack <= max_stack`;
//! code that drains a stack must null the slot rather than leave a zero
//! stack behind.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Highest quality tier in the base game ("iridium").
pub const MAX_QUALITY: u8 = 4;

/// Ordered slots of a storage or inventory.
pub type SlotList = Vec<Option<Item>>;

/// Slots shared between a storage and every provider handed out for it.
pub type SharedSlots = Rc<RefCell<SlotList>>;

/// An item stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Item kind identifier, e.g. `"Wood"`.
    pub id: String,
    pub stack: u32,
    /// Quality tier, 0 = normal.
    pub quality: u8,
    /// Stacking limit for this kind. Kinds with `max_stack <= 1` never merge.
    pub max_stack: u32,
}

impl Item {
    pub fn new(id: impl Into<String>, stack: u32) -> Self {
        Self {
            id: id.into(),
            stack,
            quality: 0,
            max_stack: 999,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack;
        self
    }

    /// Whether `other` could merge into this stack (same kind and quality,
    /// stackable kind).
    pub fn can_stack_with(&self, other: &Item) -> bool {
        self.max_stack > 1
            && self.id == other.id
            && self.quality == other.quality
            && self.max_stack == other.max_stack
    }

    pub fn remaining_stack_space(&self) -> u32 {
        self.max_stack.saturating_sub(self.stack)
    }

    /// Split `amount` off into a new stack of the same kind.
    ///
    /// `amount` must be less than the current stack; taking the whole stack is
    /// a move, not a split.
    pub fn split_off(&mut self, amount: u32) -> Item {
        debug_assert!(amount < self.stack, "split_off must leave a non-empty stack");
        self.stack -= amount;
        Item {
            stack: amount,
            ..self.clone()
        }
    }
}

/// Convenience constructor for a shared slot list.
pub fn shared_slots(slots: SlotList) -> SharedSlots {
    Rc::new(RefCell::new(slots))
}

/// Total items held across occupied slots.
pub fn total_stack(slots: &[Option<Item>]) -> u64 {
    slots.iter().flatten().map(|item| item.stack as u64).sum()
}

/// Drop trailing empty slots, keeping interior gaps so slot indices stay
/// stable for anyone watching them.
pub fn trim_trailing_empty(slots: &mut SlotList) {
    while matches!(slots.last(), Some(None)) {
        slots.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_stack_with() {
        let wood = Item::new("Wood", 10);
        assert!(wood.can_stack_with(&Item::new("Wood", 3)));
        assert!(!wood.can_stack_with(&Item::new("Stone", 3)));
        assert!(!wood.can_stack_with(&Item::new("Wood", 3).with_quality(2)));
        let sword = Item::new("Sword", 1).with_max_stack(1);
        assert!(!sword.can_stack_with(&sword.clone()));
    }

    #[test]
    fn test_split_off() {
        let mut wood = Item::new("Wood", 10).with_quality(1);
        let part = wood.split_off(4);
        assert_eq!(wood.stack, 6);
        assert_eq!(part.stack, 4);
        assert_eq!(part.quality, 1);
        assert_eq!(part.id, "Wood");
    }

    #[test]
    fn test_remaining_space() {
        let item = Item::new("Wood", 990);
        assert_eq!(item.remaining_stack_space(), 9);
        let over = Item::new("Wood", 5).with_max_stack(3);
        assert_eq!(over.remaining_stack_space(), 0);
    }

    #[test]
    fn test_trim_keeps_interior_gaps() {
        let mut slots = vec![Some(Item::new("Wood", 1)), None, Some(Item::new("Clay", 2)), None, None];
        trim_trailing_empty(&mut slots);
        assert_eq!(slots.len(), 3);
        assert!(slots[1].is_none());
        assert_eq!(total_stack(&slots), 3);
    }
}
