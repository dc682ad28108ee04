//! Random storage contents

use rand::Rng;
use stashnet_logic::item::{Item, SlotList, MAX_QUALITY};

/// An item kind the generator can hand out.
#[derive(Debug, Clone, Copy)]
pub struct ItemKind {
    pub id: &'static str,
    pub max_stack: u32,
    /// Whether stacks of this kind come in quality tiers.
    pub graded: bool,
}

/// Kinds stored by generated farms
pub static ITEM_KINDS: &[ItemKind] = &[
    ItemKind { id: "Wood", max_stack: 999, graded: false },
    ItemKind { id: "Stone", max_stack: 999, graded: false },
    ItemKind { id: "Clay", max_stack: 999, graded: false },
    ItemKind { id: "Fiber", max_stack: 999, graded: false },
    ItemKind { id: "Coal", max_stack: 999, graded: false },
    ItemKind { id: "Hay", max_stack: 999, graded: false },
    ItemKind { id: "Egg", max_stack: 999, graded: true },
    ItemKind { id: "Milk", max_stack: 999, graded: true },
    ItemKind { id: "Parsnip", max_stack: 999, graded: true },
    ItemKind { id: "Pumpkin", max_stack: 999, graded: true },
    // Tools never stack
    ItemKind { id: "Pickaxe", max_stack: 1, graded: false },
    ItemKind { id: "Watering Can", max_stack: 1, graded: false },
];

/// Largest stack the generator creates.
const MAX_GENERATED_STACK: u32 = 60;

pub fn random_item(rng: &mut impl Rng) -> Item {
    let kind = ITEM_KINDS[rng.gen_range(0..ITEM_KINDS.len())];
    item_of_kind(kind, rng)
}

pub fn item_of_kind(kind: ItemKind, rng: &mut impl Rng) -> Item {
    let stack = rng.gen_range(1..=kind.max_stack.min(MAX_GENERATED_STACK));
    let quality = if kind.graded {
        // Mostly normal quality, occasionally better
        match rng.gen_range(0..100) {
            0..=59 => 0,
            60..=84 => 1,
            85..=96 => 2,
            _ => MAX_QUALITY,
        }
    } else {
        0
    };
    Item::new(kind.id, stack)
        .with_max_stack(kind.max_stack)
        .with_quality(quality)
}

/// Fill up to `max_filled` slots of a list no longer than `capacity`,
/// leaving gaps between stacks.
pub fn random_slots(rng: &mut impl Rng, capacity: usize, max_filled: usize) -> SlotList {
    let filled = rng.gen_range(0..=max_filled.min(capacity));
    let mut slots = SlotList::with_capacity(filled * 2);
    while slots.iter().flatten().count() < filled && slots.len() < capacity {
        if !slots.is_empty() && rng.gen_bool(0.25) {
            slots.push(None);
        } else {
            slots.push(Some(random_item(rng)));
        }
    }
    slots
}
