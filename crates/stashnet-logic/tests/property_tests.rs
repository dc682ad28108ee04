//! Property-based tests for the storage engine.
//!
//! These tests verify:
//! - Discovery respects its target, scan and distance limits
//! - Discovery never reports a storage twice
//! - Consumption bookkeeping adds up and never exceeds what counting reports
//! - Transfers conserve the total item count in every mode
//! - Depositing everything and consuming it again leaves nothing owed

use std::collections::HashSet;

use proptest::prelude::*;

use stashnet_logic::config::DiscoveryConfig;
use stashnet_logic::consume::{consume_item, count_item};
use stashnet_logic::discovery::Explorer;
use stashnet_logic::item::{total_stack, Item, SlotList};
use stashnet_logic::locking::unsafe_resources;
use stashnet_logic::memory::{MemoryStorage, MemoryWorld};
use stashnet_logic::position::{LocationId, Position};
use stashnet_logic::provider::{Handle, Layer, LocatedResource, WorkingResource};
use stashnet_logic::transfer::{add_to_inventories, TransferBehavior};

const FARM: LocationId = LocationId(1);

// =============================================================================
// Strategies
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Tile {
    Chest,
    Conveyor,
    Rock,
}

fn tile_strategy() -> impl Strategy<Value = Tile> {
    prop_oneof![
        3 => Just(Tile::Chest),
        3 => Just(Tile::Conveyor),
        1 => Just(Tile::Rock),
    ]
}

fn layout_strategy() -> impl Strategy<Value = Vec<(i32, i32, Tile)>> {
    prop::collection::vec((0..16i32, 0..16i32, tile_strategy()), 0..120)
}

fn config_strategy() -> impl Strategy<Value = DiscoveryConfig> {
    (0..6i32, 1..80usize, 1..12usize, any::<bool>(), any::<bool>()).prop_map(
        |(distance_limit, scan_limit, target_limit, include_source, include_diagonal)| DiscoveryConfig {
            distance_limit,
            scan_limit,
            target_limit,
            include_source,
            include_diagonal,
            expand_source: 0,
        },
    )
}

fn item_strategy() -> impl Strategy<Value = Item> {
    (
        prop_oneof![Just("Wood"), Just("Stone"), Just("Clay")],
        1..200u32,
        0..5u8,
        prop_oneof![4 => Just(999u32), 1 => Just(50u32), 1 => Just(1u32)],
    )
        .prop_map(|(id, stack, quality, max_stack)| {
            Item::new(id, stack.min(max_stack))
                .with_quality(quality)
                .with_max_stack(max_stack)
        })
}

fn slots_strategy() -> impl Strategy<Value = SlotList> {
    prop::collection::vec(prop::option::weighted(0.8, item_strategy()), 0..12)
}

fn behavior_strategy() -> impl Strategy<Value = TransferBehavior> {
    prop_oneof![
        Just(TransferBehavior::All),
        Just(TransferBehavior::Half),
        (0..100u32).prop_map(TransferBehavior::AllButQuantity),
        (0..300u32).prop_map(TransferBehavior::Quantity),
    ]
}

// =============================================================================
// Helpers
// =============================================================================

struct Farm {
    world: MemoryWorld,
    conveyors: HashSet<Handle>,
    chests: Vec<(Handle, Position)>,
}

fn build_farm(layout: &[(i32, i32, Tile)]) -> Farm {
    let mut world = MemoryWorld::new();
    let mut taken = HashSet::new();
    let mut conveyors = HashSet::new();
    let mut chests = Vec::new();

    for &(x, y, tile) in layout {
        if !taken.insert((x, y)) {
            continue;
        }
        let position = Position::new(FARM, x, y);
        match tile {
            Tile::Chest => {
                let handle = world.add_storage(Layer::Object, MemoryStorage::new(9).at(position));
                chests.push((handle, position));
            }
            Tile::Conveyor => {
                conveyors.insert(world.add_connector(Layer::Feature, position));
            }
            Tile::Rock => {
                world.add_obstacle(Layer::Object, position);
            }
        }
    }

    Farm {
        world,
        conveyors,
        chests,
    }
}

fn storages(slot_lists: Vec<(SlotList, usize)>) -> (MemoryWorld, Vec<Handle>, Vec<WorkingResource>) {
    let mut world = MemoryWorld::new();
    let handles: Vec<Handle> = slot_lists
        .into_iter()
        .map(|(slots, extra)| {
            let capacity = slots.len() + extra;
            world.add_unplaced(None, MemoryStorage::new(capacity).with_items(slots))
        })
        .collect();
    let located: Vec<_> = handles.iter().map(|h| LocatedResource::new(*h, None)).collect();
    let working = unsafe_resources(&located, &world, None, true);
    (world, handles, working)
}

fn stored(world: &MemoryWorld, handles: &[Handle]) -> u64 {
    handles
        .iter()
        .filter_map(|h| world.storage(*h))
        .map(|s| total_stack(&s.snapshot()))
        .sum()
}

// =============================================================================
// Discovery
// =============================================================================

proptest! {
    /// Limits hold and handles are unique for any layout
    #[test]
    fn discovery_respects_limits(
        layout in layout_strategy(),
        config in config_strategy(),
        seed in (0..16i32, 0..16i32),
    ) {
        let farm = build_farm(&layout);
        let is_conveyor = |h: Handle| farm.conveyors.contains(&h);
        let origin = Position::new(FARM, seed.0, seed.1);
        let report = Explorer::new(&farm.world, &farm.world)
            .with_connector(&is_conveyor)
            .with_config(config.clone())
            .from_positions(&[origin]);

        prop_assert!(report.located.len() <= config.target_limit);
        prop_assert!(report.scanned <= config.scan_limit);

        let unique: HashSet<Handle> = report.located.iter().map(|r| r.handle).collect();
        prop_assert_eq!(unique.len(), report.located.len());
    }

    /// Every storage found lies within the distance limit of the seed
    #[test]
    fn discovery_stays_within_distance(
        layout in layout_strategy(),
        config in config_strategy(),
        seed in (0..16i32, 0..16i32),
    ) {
        let farm = build_farm(&layout);
        let is_conveyor = |h: Handle| farm.conveyors.contains(&h);
        let origin = Position::new(FARM, seed.0, seed.1);
        let found = Explorer::new(&farm.world, &farm.world)
            .with_connector(&is_conveyor)
            .with_config(config.clone())
            .from_positions(&[origin])
            .into_resources();

        for resource in &found {
            let tile = farm
                .chests
                .iter()
                .find(|(h, _)| *h == resource.handle)
                .map(|(_, p)| *p);
            prop_assert!(tile.is_some());
            let tile = tile.unwrap_or(origin);
            prop_assert!(tile.chebyshev(&origin) <= config.distance_limit);
            if !config.include_source {
                prop_assert!(tile != origin);
            }
        }
    }
}

// =============================================================================
// Consumption
// =============================================================================

proptest! {
    /// remaining + consumed == requested, and counting bounds consuming
    #[test]
    fn consume_bookkeeping(
        slots in slots_strategy(),
        amount in 0..600u32,
        max_quality in 0..5u8,
    ) {
        let is_wood = |item: &Item| item.id == "Wood";
        let available = count_item(&is_wood, &slots, max_quality, None);

        let mut after = slots.clone();
        let outcome = consume_item(&is_wood, amount, &mut after, max_quality);

        let before_wood = count_item(&is_wood, &slots, max_quality, None).amount;
        let after_wood = count_item(&is_wood, &after, max_quality, None).amount;
        let consumed = before_wood - after_wood;

        prop_assert_eq!(u64::from(outcome.remaining) + consumed, u64::from(amount));
        prop_assert!(available.amount >= consumed);
        if outcome.remaining > 0 {
            prop_assert_eq!(after_wood, 0);
        }

        // Untouched: other kinds and stacks above the quality cap
        let untouched = |item: &Item| !is_wood(item) || item.quality > max_quality;
        let kept: Vec<_> = slots.iter().flatten().filter(|i| untouched(i)).collect();
        let kept_after: Vec<_> = after.iter().flatten().filter(|i| untouched(i)).collect();
        prop_assert_eq!(kept, kept_after);

        for item in after.iter().flatten() {
            prop_assert!(item.stack > 0);
        }
    }
}

// =============================================================================
// Transfer
// =============================================================================

proptest! {
    /// Items are moved, never created or destroyed
    #[test]
    fn transfer_conserves_items(
        items in slots_strategy(),
        targets in prop::collection::vec((slots_strategy(), 0..4usize), 0..4),
        behavior in behavior_strategy(),
    ) {
        let (world, handles, working) = storages(targets);
        let mut items = items;
        let before = total_stack(&items) + stored(&world, &handles);

        add_to_inventories(&mut items, &working, behavior, None);

        prop_assert_eq!(total_stack(&items) + stored(&world, &handles), before);
        for handle in &handles {
            let storage = world.storage(*handle);
            prop_assert!(storage.is_some());
            if let Some(storage) = storage {
                let slots = storage.snapshot();
                prop_assert!(slots.len() <= storage.capacity);
                for item in slots.iter().flatten() {
                    prop_assert!(item.stack > 0 && item.stack <= item.max_stack);
                }
            }
        }
    }

    /// Depositing a stack with All and consuming it back leaves nothing owed
    #[test]
    fn deposit_then_consume_round_trip(
        stack in 1..999u32,
        quality in 0..5u8,
        capacity in 1..6usize,
    ) {
        let (world, handles, working) = storages(vec![(Vec::new(), capacity)]);
        let mut items = vec![Some(Item::new("Wood", stack).with_quality(quality))];

        prop_assert!(add_to_inventories(&mut items, &working, TransferBehavior::All, None));
        prop_assert!(items[0].is_none());

        let storage = world.storage(handles[0]);
        prop_assert!(storage.is_some());
        if let Some(storage) = storage {
            let mut slots = storage.slots.borrow_mut();
            let outcome = consume_item(&|item: &Item| item.id == "Wood", stack, &mut slots, u8::MAX);
            prop_assert_eq!(outcome.remaining, 0);
        }
    }
}
