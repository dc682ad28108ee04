//! Counting and consuming items across an actor inventory and storages.
//!
//! Slots are scanned from last to first when consuming, so the most recently
//! added stacks go first. Stacks above the quality cap are never touched but
//! are reported through `passed_quality`, which drives the tier loop in
//! [`consume_items`]: with `low_quality_first` the engine consumes tier 0,
//! then tier 1, and so on, moving up only while something better was skipped.

use std::fmt;

use crate::config::ConsumeConfig;
use crate::item::{Item, SharedSlots};
use crate::provider::WorkingResource;

/// Result of a single consumption pass over one slot list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumeOutcome {
    /// Amount still owed after the pass.
    pub remaining: u32,
    /// Some slot was drained and set to `None`.
    pub nullified: bool,
    /// Some matching slot was skipped for exceeding the quality cap.
    pub passed_quality: bool,
}

/// Remove up to `amount` matching items from `slots`.
pub fn consume_item<M>(matcher: &M, amount: u32, slots: &mut [Option<Item>], max_quality: u8) -> ConsumeOutcome
where
    M: Fn(&Item) -> bool + ?Sized,
{
    let mut outcome = ConsumeOutcome {
        remaining: amount,
        ..ConsumeOutcome::default()
    };
    if amount == 0 {
        return outcome;
    }

    for slot in slots.iter_mut().rev() {
        let Some(item) = slot.as_mut() else { continue };
        if !matcher(item) {
            continue;
        }
        if item.quality > max_quality {
            outcome.passed_quality = true;
            continue;
        }

        let taken = outcome.remaining.min(item.stack);
        outcome.remaining -= taken;
        if item.stack <= taken {
            *slot = None;
            outcome.nullified = true;
        } else {
            item.stack -= taken;
        }

        if outcome.remaining == 0 {
            break;
        }
    }

    outcome
}

/// One line of a recipe: which items match and how many are needed.
pub struct Ingredient {
    matcher: Box<dyn Fn(&Item) -> bool>,
    pub amount: u32,
}

impl Ingredient {
    pub fn new(matcher: impl Fn(&Item) -> bool + 'static, amount: u32) -> Self {
        Self {
            matcher: Box::new(matcher),
            amount,
        }
    }

    /// Match any quality of the item kind `id`.
    pub fn by_id(id: impl Into<String>, amount: u32) -> Self {
        let id = id.into();
        Self::new(move |item: &Item| item.id == id, amount)
    }

    pub fn matches(&self, item: &Item) -> bool {
        (self.matcher)(item)
    }
}

impl fmt::Debug for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ingredient")
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

/// Consume every ingredient from the actor inventory first, then from each
/// extractable storage in order.
///
/// Returns the amount still missing per ingredient (all zeros when the
/// recipe was fully paid). Storages that had a slot drained are compacted
/// once at the end through their `clean_inventory` hook.
pub fn consume_items(
    ingredients: &[Ingredient],
    mut actor_items: Option<&mut [Option<Item>]>,
    resources: &[WorkingResource],
    config: &ConsumeConfig,
) -> Vec<u32> {
    let inventories: Vec<Option<SharedSlots>> = resources
        .iter()
        .map(|r| if r.can_extract_items() { r.items() } else { None })
        .collect();
    let mut dirty = vec![false; resources.len()];
    let mut missing = Vec::with_capacity(ingredients.len());

    let first_tier = if config.low_quality_first {
        0
    } else {
        config.max_quality
    };

    for ingredient in ingredients {
        let mut remaining = ingredient.amount;

        for tier in first_tier..=config.max_quality {
            let mut passed = false;

            if let Some(slots) = actor_items.as_deref_mut() {
                let outcome = consume_item(&|item: &Item| ingredient.matches(item), remaining, slots, tier);
                remaining = outcome.remaining;
                passed = outcome.passed_quality;
            }
            if remaining == 0 {
                break;
            }

            for (idx, inventory) in inventories.iter().enumerate() {
                let Some(inventory) = inventory else { continue };
                let mut slots = inventory.borrow_mut();
                if slots.is_empty() {
                    continue;
                }
                let outcome = consume_item(&|item: &Item| ingredient.matches(item), remaining, &mut slots, tier);
                remaining = outcome.remaining;
                dirty[idx] |= outcome.nullified;
                passed |= outcome.passed_quality;
                if remaining == 0 {
                    break;
                }
            }

            if remaining == 0 || !passed {
                break;
            }
        }

        if remaining > 0 {
            log::debug!("ingredient short by {remaining} of {}", ingredient.amount);
        }
        missing.push(remaining);
    }

    for (resource, _) in resources.iter().zip(&dirty).filter(|(_, dirty)| **dirty) {
        resource.clean_inventory();
    }

    missing
}

/// Result of counting matching items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountOutcome {
    pub amount: u64,
    pub passed_quality: bool,
}

/// Count matching items at or below `max_quality`, stopping once `limit` is
/// reached.
pub fn count_item<M>(matcher: &M, slots: &[Option<Item>], max_quality: u8, limit: Option<u64>) -> CountOutcome
where
    M: Fn(&Item) -> bool + ?Sized,
{
    let mut outcome = CountOutcome::default();
    for item in slots.iter().flatten() {
        if !matcher(item) {
            continue;
        }
        if item.quality > max_quality {
            outcome.passed_quality = true;
            continue;
        }
        outcome.amount += u64::from(item.stack);
        if limit.is_some_and(|limit| outcome.amount >= limit) {
            break;
        }
    }
    outcome
}

/// Count across the actor inventory and every extractable storage.
pub fn count_items<M>(
    matcher: &M,
    actor_items: Option<&[Option<Item>]>,
    resources: &[WorkingResource],
    max_quality: u8,
    limit: Option<u64>,
) -> CountOutcome
where
    M: Fn(&Item) -> bool + ?Sized,
{
    let mut total = CountOutcome::default();
    let reached = |total: &CountOutcome| limit.is_some_and(|limit| total.amount >= limit);

    if let Some(slots) = actor_items {
        total = count_item(matcher, slots, max_quality, limit);
    }

    for resource in resources {
        if reached(&total) {
            break;
        }
        if !resource.can_extract_items() {
            continue;
        }
        let Some(slots) = resource.items() else { continue };
        let part = count_item(
            matcher,
            &slots.borrow(),
            max_quality,
            limit.map(|limit| limit - total.amount),
        );
        total.amount += part.amount;
        total.passed_quality |= part.passed_quality;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locking::unsafe_resources;
    use crate::memory::{MemoryStorage, MemoryWorld};
    use crate::provider::{Handle, LocatedResource};

    fn wood(n: u32) -> Option<Item> {
        Some(Item::new("Wood", n))
    }

    fn is_wood(item: &Item) -> bool {
        item.id == "Wood"
    }

    fn working(world: &MemoryWorld, handles: &[Handle]) -> Vec<WorkingResource> {
        let located: Vec<_> = handles.iter().map(|h| LocatedResource::new(*h, None)).collect();
        unsafe_resources(&located, world, None, true)
    }

    #[test]
    fn test_consume_newest_first() {
        let mut slots = vec![wood(30), Some(Item::new("Stone", 10)), wood(40)];
        let outcome = consume_item(&is_wood, 50, &mut slots, u8::MAX);
        assert_eq!(outcome.remaining, 0);
        assert!(outcome.nullified);
        assert!(!outcome.passed_quality);
        assert_eq!(slots[0].as_ref().map(|i| i.stack), Some(20));
        assert_eq!(slots[1].as_ref().map(|i| i.stack), Some(10));
        assert!(slots[2].is_none());
    }

    #[test]
    fn test_consume_reports_shortfall() {
        let mut slots = vec![wood(3), None];
        let outcome = consume_item(&is_wood, 5, &mut slots, u8::MAX);
        assert_eq!(outcome.remaining, 2);
        assert!(slots.iter().all(Option::is_none));
    }

    #[test]
    fn test_consume_zero_is_noop() {
        let mut slots = vec![wood(3)];
        assert_eq!(consume_item(&is_wood, 0, &mut slots, 0), ConsumeOutcome::default());
        assert_eq!(slots, vec![wood(3)]);
    }

    #[test]
    fn test_quality_cap_skips_and_reports() {
        let mut slots = vec![wood(5), Some(Item::new("Wood", 5).with_quality(2))];
        let outcome = consume_item(&is_wood, 8, &mut slots, 1);
        assert_eq!(outcome.remaining, 3);
        assert!(outcome.passed_quality);
        assert_eq!(slots[1].as_ref().map(|i| i.stack), Some(5));
    }

    #[test]
    fn test_tiers_default_takes_newest_regardless_of_quality() {
        let mut actor = vec![wood(5), Some(Item::new("Wood", 10).with_quality(2))];
        let missing = consume_items(
            &[Ingredient::by_id("Wood", 8)],
            Some(actor.as_mut_slice()),
            &[],
            &ConsumeConfig {
                max_quality: 4,
                low_quality_first: false,
            },
        );
        assert_eq!(missing, vec![0]);
        assert_eq!(actor[0].as_ref().map(|i| i.stack), Some(5));
        assert_eq!(actor[1].as_ref().map(|i| i.stack), Some(2));
    }

    #[test]
    fn test_tiers_low_quality_first() {
        let mut actor = vec![wood(5), Some(Item::new("Wood", 10).with_quality(2))];
        let missing = consume_items(
            &[Ingredient::by_id("Wood", 8)],
            Some(actor.as_mut_slice()),
            &[],
            &ConsumeConfig {
                max_quality: 4,
                low_quality_first: true,
            },
        );
        assert_eq!(missing, vec![0]);
        assert!(actor[0].is_none());
        assert_eq!(actor[1].as_ref().map(|i| i.stack), Some(7));
    }

    #[test]
    fn test_actor_then_storages_and_cleanup() {
        let mut world = MemoryWorld::new();
        let chest = world.add_unplaced(None, MemoryStorage::new(9).with_items(vec![wood(5), None, wood(3)]));
        let locked_out = world.add_unplaced(None, MemoryStorage::new(9).with_items(vec![wood(50)]).insert_only());
        let resources = working(&world, &[locked_out, chest]);

        let mut actor = vec![wood(2)];
        let missing = consume_items(
            &[Ingredient::by_id("Wood", 6), Ingredient::by_id("Clay", 1)],
            Some(actor.as_mut_slice()),
            &resources,
            &ConsumeConfig::default(),
        );
        assert_eq!(missing, vec![0, 1]);
        assert!(actor[0].is_none());

        let chest = world.storage(chest).unwrap();
        assert_eq!(chest.snapshot(), vec![wood(4)]);
        assert_eq!(chest.cleanups(), 1);
        let untouched = world.storage(locked_out).unwrap();
        assert_eq!(untouched.snapshot(), vec![wood(50)]);
        assert_eq!(untouched.cleanups(), 0);
    }

    #[test]
    fn test_count_respects_limit_and_quality() {
        let slots = vec![wood(10), Some(Item::new("Wood", 7).with_quality(3)), wood(10)];
        let all = count_item(&is_wood, &slots, u8::MAX, None);
        assert_eq!(all.amount, 27);
        let capped = count_item(&is_wood, &slots, 2, None);
        assert_eq!(capped.amount, 20);
        assert!(capped.passed_quality);
        assert_eq!(count_item(&is_wood, &slots, u8::MAX, Some(5)).amount, 10);
    }

    #[test]
    fn test_count_items_across_storages() {
        let mut world = MemoryWorld::new();
        let a = world.add_unplaced(None, MemoryStorage::new(9).with_items(vec![wood(4)]));
        let b = world.add_unplaced(None, MemoryStorage::new(9).with_items(vec![wood(6)]));
        let hidden = world.add_unplaced(None, MemoryStorage::new(9).with_items(vec![wood(100)]).insert_only());
        let resources = working(&world, &[a, hidden, b]);
        let actor = vec![wood(1)];

        let total = count_items(&is_wood, Some(actor.as_slice()), &resources, u8::MAX, None);
        assert_eq!(total.amount, 11);
        let limited = count_items(&is_wood, Some(actor.as_slice()), &resources, u8::MAX, Some(3));
        assert_eq!(limited.amount, 5);
    }
}
