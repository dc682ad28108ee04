//! Engine behavior over hand-built and generated farms.

use rand::rngs::StdRng;
use rand::SeedableRng;
use stashnet_core::prelude::*;
use stashnet_logic::provider::{ActorId, Handle, Layer};

const FARM: LocationId = LocationId(1);

fn run_until_ready<T>(engine: &mut StashEngine, receipt: &Receipt<T>) {
    for _ in 0..3 {
        if receipt.is_ready() {
            return;
        }
        engine.tick();
    }
}

fn all_locks_free(engine: &StashEngine, storages: &[Handle]) -> bool {
    storages
        .iter()
        .all(|&h| engine.world.lock_of(h).map_or(true, |lock| lock.is_free()))
}

#[test]
fn test_second_farmer_is_denied_while_chest_is_claimed() {
    let mut engine = StashEngine::default();
    let robin = engine.spawn_farmer("Robin", ActorId(1), Position::new(FARM, 0, 0));
    let linus = engine.spawn_farmer("Linus", ActorId(2), Position::new(FARM, 2, 0));
    let chest = engine.world.spawn_storage(
        Storage::new(StorageKind::Chest),
        Placement::tile(Layer::Object, Position::new(FARM, 1, 0)),
        vec![Some(Item::new("Wood", 25))],
    );
    let recipe = Recipe::new("Fence", &[("Wood", 20)], Item::new("Fence", 1));

    let first = engine.craft(robin, &recipe).unwrap();
    let second = engine.craft(linus, &recipe).unwrap();
    assert_eq!(engine.transport().pending(), 2);
    engine.tick();

    assert!(matches!(first.get(), Some(CraftOutcome::Crafted { .. })));
    assert_eq!(
        second.get(),
        Some(CraftOutcome::Missing(vec![("Wood".to_string(), 20)]))
    );
    assert_eq!(engine.world.contents(chest).unwrap(), vec![Some(Item::new("Wood", 5))]);
    assert!(engine.world.lock_of(chest).unwrap().is_free());
    assert_eq!(engine.transport().totals(), (1, 1));

    // With the chest released, Linus can lock it but there is not enough left
    let retry = engine.craft(linus, &recipe).unwrap();
    run_until_ready(&mut engine, &retry);
    assert_eq!(
        retry.get(),
        Some(CraftOutcome::Missing(vec![("Wood".to_string(), 15)]))
    );
}

#[test]
fn test_deposit_on_generated_farm_conserves_items() {
    let mut engine = StashEngine::default();
    let mut rng = StdRng::seed_from_u64(2024);
    let farm = generate_farm(&mut engine.world, &FarmConfig::default(), &mut rng);
    let robin = farm.farmers[0];

    assert_eq!(engine.give(robin, Item::new("Wood", 40)).unwrap(), None);
    assert_eq!(engine.give(robin, Item::new("Pickaxe", 1).with_max_stack(1)).unwrap(), None);
    let before = engine.world.total_items();

    let receipt = engine.deposit(robin, None).unwrap();
    run_until_ready(&mut engine, &receipt);

    let outcome = receipt.take().expect("deposit resolved");
    assert_eq!(engine.world.total_items(), before);
    assert!(!outcome.touched_slots.contains(&1), "tools stay in the backpack");
    assert!(all_locks_free(&engine, &farm.storages()));
}

#[test]
fn test_craft_on_generated_farm_consumes_exactly() {
    let mut engine = StashEngine::default();
    let mut rng = StdRng::seed_from_u64(77);
    let farm = generate_farm(&mut engine.world, &FarmConfig::default(), &mut rng);
    let robin = farm.farmers[0];
    engine.give(robin, Item::new("Stone", 12)).unwrap();

    let before = engine.world.total_items();
    let recipe = Recipe::new("Path", &[("Stone", 10)], Item::new("Stone Path", 5));
    let receipt = engine.craft(robin, &recipe).unwrap();
    run_until_ready(&mut engine, &receipt);

    assert!(matches!(receipt.get(), Some(CraftOutcome::Crafted { leftover: None, .. })));
    assert_eq!(engine.world.total_items(), before - 10 + 5);
    assert!(all_locks_free(&engine, &farm.storages()));
}

#[test]
fn test_generated_farm_survives_save_load() {
    let mut engine = StashEngine::default();
    let mut rng = StdRng::seed_from_u64(5);
    let farm = generate_farm(&mut engine.world, &FarmConfig::default(), &mut rng);
    engine.tick();

    let mut buffer = Vec::new();
    engine.save(&mut buffer).unwrap();
    let mut restored = StashEngine::default();
    restored.load(&buffer[..]).unwrap();

    assert_eq!(restored.ticks, 1);
    assert_eq!(restored.world.total_items(), engine.world.total_items());
    assert_eq!(restored.world.storage_count(), farm.storages().len());
    assert_eq!(
        restored.world.unplaced_storages(FARM).len(),
        usize::from(farm.fridge.is_some())
    );
}
