//! Moving item stacks into storages.
//!
//! [`add_to_inventories`] walks the storages in order and places each source
//! stack according to a [`TransferBehavior`]. The amount wanted for a stack is
//! computed once from its size at the start of the batch; what earlier
//! storages already took counts against it. Placement into one storage:
//!
//! 1. top up compatible stacks that still have room,
//! 2. fill empty slots, last slot first,
//! 3. append new slots while the storage is below capacity.
//!
//! Items are only ever moved, never created or destroyed: the total stack
//! count of source plus storages is the same before and after.

use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::provider::WorkingResource;

/// How much of each stack a transfer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferBehavior {
    None,
    All,
    /// Everything except `n` items.
    AllButQuantity(u32),
    /// `floor(stack / 2)`.
    Half,
    /// At most `n` items.
    Quantity(u32),
}

impl TransferBehavior {
    /// Items to move out of a stack of `stack`.
    pub fn quantity(self, stack: u32) -> u32 {
        match self {
            TransferBehavior::None => 0,
            TransferBehavior::All => stack,
            TransferBehavior::AllButQuantity(keep) => stack.saturating_sub(keep),
            TransferBehavior::Half => stack / 2,
            TransferBehavior::Quantity(n) => n.min(stack),
        }
    }
}

/// Observer told about each source slot the first time it gives up items,
/// with the stack as it was before the batch touched it.
pub type TransferObserver<'a> = &'a mut dyn FnMut(&Item, usize);

/// Place `items` into `resources` following `behavior`.
///
/// Fully placed source slots become `None`; partially placed ones keep the
/// leftover. Returns `true` as soon as one storage pass leaves nothing owed
/// for any stackable item, `false` if storages run out first, if none accept
/// insertion, or if `behavior` is `None`. Stacks with `max_stack <= 1` are
/// never moved.
pub fn add_to_inventories(
    items: &mut [Option<Item>],
    resources: &[WorkingResource],
    behavior: TransferBehavior,
    mut on_transfer: Option<TransferObserver<'_>>,
) -> bool {
    if behavior == TransferBehavior::None {
        return false;
    }

    let mut transferred = vec![0u32; items.len()];

    for resource in resources {
        if !resource.can_insert_items() {
            continue;
        }

        for (idx, slot) in items.iter_mut().enumerate() {
            let Some(item) = slot.take() else { continue };
            let owed = outstanding(&item, transferred[idx], behavior);
            if owed == 0 || !resource.is_item_valid(&item) {
                *slot = Some(item);
                continue;
            }

            let before = item.stack;
            let first_touch = (transferred[idx] == 0).then(|| item.clone());
            *slot = add_item_to_inventory(item, owed, resource);
            let moved = before - slot.as_ref().map_or(0, |left| left.stack);
            transferred[idx] += moved;

            if moved > 0 {
                if let (Some(observer), Some(original)) = (on_transfer.as_deref_mut(), first_touch.as_ref()) {
                    observer(original, idx);
                }
            }
        }

        let settled = items
            .iter()
            .enumerate()
            .all(|(idx, slot)| slot.as_ref().map_or(true, |item| outstanding(item, transferred[idx], behavior) == 0));
        if settled {
            log::debug!("transfer settled at storage {:?}", resource.handle);
            return true;
        }
    }

    false
}

/// Amount of `item` still owed to storages, given `moved` already went out.
fn outstanding(item: &Item, moved: u32, behavior: TransferBehavior) -> u32 {
    if item.max_stack <= 1 {
        return 0;
    }
    behavior
        .quantity(item.stack + moved)
        .saturating_sub(moved)
        .min(item.stack)
}

/// Place up to `quantity` of `item` into one storage.
///
/// Returns the leftover stack, or `None` when the whole stack was placed.
pub fn add_item_to_inventory(mut item: Item, quantity: u32, resource: &WorkingResource) -> Option<Item> {
    let mut quantity = quantity.min(item.stack);
    if quantity == 0 {
        return (item.stack > 0).then_some(item);
    }

    let Some(slots) = resource.items() else {
        return Some(item);
    };
    let mut slots = slots.borrow_mut();

    for existing in slots.iter_mut().flatten() {
        if quantity == 0 {
            break;
        }
        if !existing.can_stack_with(&item) {
            continue;
        }
        let moved = existing.remaining_stack_space().min(quantity);
        existing.stack += moved;
        item.stack -= moved;
        quantity -= moved;
    }
    if item.stack == 0 {
        return None;
    }

    let mut source = Some(item);

    for slot in slots.iter_mut().rev() {
        if quantity == 0 {
            break;
        }
        if slot.is_none() {
            let piece = split(&mut source, quantity);
            quantity -= piece.as_ref().map_or(0, |p| p.stack);
            *slot = piece;
        }
    }

    let capacity = resource.capacity();
    while quantity > 0 && slots.len() < capacity {
        let piece = split(&mut source, quantity);
        quantity -= piece.as_ref().map_or(0, |p| p.stack);
        slots.push(piece);
    }

    source
}

/// Take one slot's worth (at most `quantity` and `max_stack`) off `source`,
/// moving the stack itself when all of it goes.
fn split(source: &mut Option<Item>, quantity: u32) -> Option<Item> {
    let item = source.as_mut()?;
    let amount = quantity.min(item.max_stack).min(item.stack);
    if amount >= item.stack {
        source.take()
    } else {
        Some(item.split_off(amount))
    }
}
