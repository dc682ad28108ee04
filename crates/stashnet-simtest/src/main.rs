//! StashNet Headless Simulation Harness
//!
//! Validates discovery, locking, crafting and deposits against generated
//! farms. Runs entirely in-process with no rendering.
//!
//! Usage:
//!   cargo run -p stashnet-simtest
//!   cargo run -p stashnet-simtest -- --verbose

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use stashnet_core::engine::{CraftOutcome, Receipt, Recipe, StashEngine};
use stashnet_core::generation::{generate_farm, FarmConfig, FarmLayout};
use stashnet_core::persistence;
use stashnet_logic::config::{validate_config, DiscoveryConfig};
use stashnet_logic::discovery::{Explorer, StopReason};
use stashnet_logic::item::Item;
use stashnet_logic::provider::Handle;
use stashnet_logic::transfer::TransferBehavior;

// ── Recipe book (shared with hosts as plain JSON) ───────────────────────
const RECIPES_JSON: &str = include_str!("../../../data/recipes.json");

/// Farms generated per section
const FARM_SEEDS: u64 = 12;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== StashNet Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Recipe book validation
    let recipes = load_recipes(&mut results);

    // 2. Configuration
    results.extend(validate_configuration(verbose));

    // 3. Discovery limits on generated farms
    results.extend(validate_discovery(verbose));

    // 4. Crafting conserves items and releases locks
    results.extend(validate_crafting(&recipes, verbose));

    // 5. Deposits in every transfer mode
    results.extend(validate_deposits(verbose));

    // 6. Two farmers racing for the same storages
    results.extend(validate_contention(&recipes, verbose));

    // 7. Snapshots
    results.extend(validate_snapshots(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn farm(seed: u64) -> (StashEngine, FarmLayout) {
    let mut engine = StashEngine::default();
    let mut rng = StdRng::seed_from_u64(seed);
    let layout = generate_farm(&mut engine.world, &FarmConfig::default(), &mut rng);
    (engine, layout)
}

fn resolve<T>(engine: &mut StashEngine, receipt: &Receipt<T>) -> bool {
    for _ in 0..3 {
        if receipt.is_ready() {
            return true;
        }
        engine.tick();
    }
    receipt.is_ready()
}

fn locks_free(engine: &StashEngine, layout: &FarmLayout) -> bool {
    layout
        .storages()
        .iter()
        .all(|&h| engine.world.lock_of(h).map_or(true, |lock| lock.is_free()))
}

/// Change in total items a craft outcome implies, if it is known.
fn craft_delta(recipe: &Recipe, outcome: &CraftOutcome) -> Option<i64> {
    match outcome {
        CraftOutcome::Missing(_) | CraftOutcome::FarmerGone => Some(0),
        CraftOutcome::Incomplete(_) => None,
        CraftOutcome::Crafted { leftover, .. } => {
            let consumed: i64 = recipe.ingredients.iter().map(|(_, n)| i64::from(*n)).sum();
            let kept = recipe.product.stack - leftover.as_ref().map_or(0, |item| item.stack);
            Some(i64::from(kept) - consumed)
        }
    }
}

// ── 1. Recipe Book ──────────────────────────────────────────────────────

fn load_recipes(results: &mut Vec<TestResult>) -> Vec<Recipe> {
    println!("--- Recipe Book ---");

    let recipes: Vec<Recipe> = match serde_json::from_str(RECIPES_JSON) {
        Ok(r) => r,
        Err(e) => {
            results.push(TestResult {
                name: "recipes_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return Vec::new();
        }
    };

    results.push(TestResult {
        name: "recipes_not_empty".into(),
        passed: !recipes.is_empty(),
        detail: format!("{} recipes loaded", recipes.len()),
    });

    let bad: Vec<_> = recipes
        .iter()
        .filter(|r| r.ingredients.is_empty() || r.ingredients.iter().any(|(_, n)| *n == 0))
        .map(|r| r.name.as_str())
        .collect();
    results.push(TestResult {
        name: "recipes_positive_amounts".into(),
        passed: bad.is_empty(),
        detail: if bad.is_empty() {
            "every ingredient amount is positive".into()
        } else {
            format!("bad ingredients in {:?}", bad)
        },
    });

    let bad_products: Vec<_> = recipes
        .iter()
        .filter(|r| r.product.stack == 0 || r.product.stack > r.product.max_stack)
        .map(|r| r.name.as_str())
        .collect();
    results.push(TestResult {
        name: "recipes_valid_products".into(),
        passed: bad_products.is_empty(),
        detail: format!("{} products outside 1..=max_stack", bad_products.len()),
    });

    recipes
}

// ── 2. Configuration ────────────────────────────────────────────────────

fn validate_configuration(_verbose: bool) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let defaults = DiscoveryConfig::default();
    results.push(TestResult {
        name: "config_defaults_valid".into(),
        passed: validate_config(&defaults).is_empty(),
        detail: format!("{:?}", defaults),
    });

    let round_trip = serde_json::to_string(&defaults)
        .ok()
        .and_then(|json| serde_json::from_str::<DiscoveryConfig>(&json).ok());
    results.push(TestResult {
        name: "config_json_round_trip".into(),
        passed: round_trip.as_ref() == Some(&defaults),
        detail: "DiscoveryConfig survives serde_json".into(),
    });

    let broken = DiscoveryConfig {
        scan_limit: 0,
        distance_limit: -3,
        ..DiscoveryConfig::default()
    };
    let problems = validate_config(&broken);
    results.push(TestResult {
        name: "config_rejects_invalid".into(),
        passed: problems.len() == 2 && broken.validated().is_err(),
        detail: problems.join("; "),
    });

    results.push(TestResult {
        name: "config_farm_default_valid".into(),
        passed: FarmConfig::default().validate().is_empty(),
        detail: "default farm generation settings".into(),
    });

    results
}

// ── 3. Discovery ────────────────────────────────────────────────────────

fn validate_discovery(verbose: bool) -> Vec<TestResult> {
    println!("--- Discovery ---");
    let mut results = Vec::new();

    let configs = [
        DiscoveryConfig::default(),
        DiscoveryConfig {
            target_limit: 2,
            ..DiscoveryConfig::default()
        },
        DiscoveryConfig {
            scan_limit: 10,
            include_diagonal: false,
            ..DiscoveryConfig::default()
        },
        DiscoveryConfig {
            distance_limit: 12,
            include_source: false,
            ..DiscoveryConfig::default()
        },
    ];

    let mut violations = Vec::new();
    let mut found_total = 0;
    let mut stops = [0usize; 3];

    for seed in 0..FARM_SEEDS {
        let (engine, layout) = farm(seed);
        let world = &engine.world;
        let is_conveyor = |h: Handle| world.is_conveyor(h);

        for &farmer in &layout.farmers {
            let Some((_, position)) = world.farmer(farmer) else {
                continue;
            };
            for (ci, config) in configs.iter().enumerate() {
                let report = Explorer::new(world, world)
                    .with_connector(&is_conveyor)
                    .with_config(config.clone())
                    .from_positions(&[position]);

                let unique: HashSet<Handle> = report.located.iter().map(|r| r.handle).collect();
                if report.located.len() > config.target_limit {
                    violations.push(format!("seed {} config {}: over target", seed, ci));
                }
                if report.scanned > config.scan_limit {
                    violations.push(format!("seed {} config {}: over scan limit", seed, ci));
                }
                if unique.len() != report.located.len() {
                    violations.push(format!("seed {} config {}: duplicates", seed, ci));
                }
                found_total += report.located.len();
                stops[match report.stop {
                    StopReason::Exhausted => 0,
                    StopReason::ScanLimit => 1,
                    StopReason::TargetLimit => 2,
                }] += 1;
            }
        }
    }

    results.push(TestResult {
        name: "discovery_within_limits".into(),
        passed: violations.is_empty(),
        detail: if violations.is_empty() {
            format!("{} storages found across {} farms", found_total, FARM_SEEDS)
        } else {
            violations.join(", ")
        },
    });

    if verbose {
        println!(
            "  Stop reasons: exhausted={} scan_limit={} target_limit={}",
            stops[0], stops[1], stops[2]
        );
    }

    results
}

// ── 4. Crafting ─────────────────────────────────────────────────────────

fn validate_crafting(recipes: &[Recipe], verbose: bool) -> Vec<TestResult> {
    println!("--- Crafting ---");
    let mut results = Vec::new();

    let mut crafted = 0;
    let mut missing = 0;
    let mut conservation = Vec::new();
    let mut stuck = Vec::new();

    for seed in 0..FARM_SEEDS {
        let (mut engine, layout) = farm(seed);
        let Some(&farmer) = layout.farmers.first() else {
            continue;
        };

        for recipe in recipes {
            let before = engine.world.total_items() as i64;
            let Ok(receipt) = engine.craft(farmer, recipe) else {
                stuck.push(format!("seed {}: craft {} errored", seed, recipe.name));
                continue;
            };
            if !resolve(&mut engine, &receipt) {
                stuck.push(format!("seed {}: {} never resolved", seed, recipe.name));
                continue;
            }
            let Some(outcome) = receipt.take() else {
                continue;
            };
            match outcome {
                CraftOutcome::Crafted { .. } => crafted += 1,
                CraftOutcome::Missing(_) => missing += 1,
                CraftOutcome::Incomplete(_) | CraftOutcome::FarmerGone => {
                    stuck.push(format!("seed {} {}: {:?}", seed, recipe.name, outcome));
                }
            }
            let after = engine.world.total_items() as i64;
            if Some(after - before) != craft_delta(recipe, &outcome) {
                conservation.push(format!(
                    "seed {} {}: {} -> {} ({:?})",
                    seed, recipe.name, before, after, outcome
                ));
            }
        }

        if !locks_free(&engine, &layout) {
            stuck.push(format!("seed {}: locks still held", seed));
        }
    }

    results.push(TestResult {
        name: "craft_conserves_items".into(),
        passed: conservation.is_empty(),
        detail: if conservation.is_empty() {
            format!("{} crafted, {} missing ingredients", crafted, missing)
        } else {
            conservation.join("; ")
        },
    });
    results.push(TestResult {
        name: "craft_releases_locks".into(),
        passed: stuck.is_empty(),
        detail: if stuck.is_empty() {
            "every craft resolved and released its locks".into()
        } else {
            stuck.join("; ")
        },
    });
    results.push(TestResult {
        name: "craft_some_succeed".into(),
        passed: crafted > 0,
        detail: format!("{} successful crafts", crafted),
    });

    if verbose {
        println!("  Crafted {} / attempted {}", crafted, crafted + missing);
    }

    results
}

// ── 5. Deposits ─────────────────────────────────────────────────────────

fn validate_deposits(_verbose: bool) -> Vec<TestResult> {
    println!("--- Deposits ---");
    let mut results = Vec::new();

    let modes = [
        TransferBehavior::All,
        TransferBehavior::Half,
        TransferBehavior::Quantity(7),
        TransferBehavior::AllButQuantity(3),
        TransferBehavior::None,
    ];

    for behavior in modes {
        let mut problems = Vec::new();
        for seed in 0..FARM_SEEDS {
            let (mut engine, layout) = farm(seed);
            let Some(&farmer) = layout.farmers.first() else {
                continue;
            };
            for item in [
                Item::new("Wood", 40),
                Item::new("Parsnip", 9).with_quality(2),
                Item::new("Pickaxe", 1).with_max_stack(1),
            ] {
                let _ = engine.give(farmer, item);
            }
            let backpack_before = engine
                .world
                .contents(farmer)
                .map_or(0, |slots| stashnet_logic::item::total_stack(&slots));
            let before = engine.world.total_items();

            let Ok(receipt) = engine.deposit(farmer, Some(behavior)) else {
                problems.push(format!("seed {}: deposit errored", seed));
                continue;
            };
            if !resolve(&mut engine, &receipt) {
                problems.push(format!("seed {}: never resolved", seed));
                continue;
            }
            if engine.world.total_items() != before {
                problems.push(format!("seed {}: items not conserved", seed));
            }
            let backpack_after = engine
                .world
                .contents(farmer)
                .map_or(0, |slots| stashnet_logic::item::total_stack(&slots));
            if backpack_after > backpack_before {
                problems.push(format!("seed {}: backpack grew", seed));
            }
            if behavior == TransferBehavior::None && backpack_after != backpack_before {
                problems.push(format!("seed {}: None moved items", seed));
            }
            if !locks_free(&engine, &layout) {
                problems.push(format!("seed {}: locks still held", seed));
            }
        }

        results.push(TestResult {
            name: format!("deposit_{:?}", behavior).to_lowercase(),
            passed: problems.is_empty(),
            detail: if problems.is_empty() {
                format!("{} farms conserved items", FARM_SEEDS)
            } else {
                problems.join("; ")
            },
        });
    }

    results
}

// ── 6. Contention ───────────────────────────────────────────────────────

fn validate_contention(recipes: &[Recipe], _verbose: bool) -> Vec<TestResult> {
    println!("--- Contention ---");
    let mut results = Vec::new();

    let mut problems = Vec::new();
    let mut denied = 0;

    for seed in 0..FARM_SEEDS {
        let (mut engine, layout) = farm(seed);
        let &[first, second, ..] = layout.farmers.as_slice() else {
            continue;
        };
        // Put both farmers on the same spot so they see the same storages
        if let Some((_, position)) = engine.world.farmer(first) {
            engine.world.move_farmer(second, position);
        }

        for recipe in recipes {
            let before = engine.world.total_items() as i64;
            let (Ok(a), Ok(b)) = (engine.craft(first, recipe), engine.craft(second, recipe)) else {
                problems.push(format!("seed {}: craft errored", seed));
                continue;
            };
            engine.tick();
            let (Some(a), Some(b)) = (a.take(), b.take()) else {
                problems.push(format!("seed {} {}: unresolved after one tick", seed, recipe.name));
                continue;
            };
            let expected = craft_delta(recipe, &a).zip(craft_delta(recipe, &b)).map(|(x, y)| x + y);
            if Some(engine.world.total_items() as i64 - before) != expected {
                problems.push(format!("seed {} {}: items not conserved", seed, recipe.name));
            }
        }

        denied += engine.transport().totals().1;
        if !locks_free(&engine, &layout) {
            problems.push(format!("seed {}: locks still held", seed));
        }
    }

    results.push(TestResult {
        name: "contention_conserves_and_releases".into(),
        passed: problems.is_empty(),
        detail: if problems.is_empty() {
            format!("{} requests denied to the later farmer", denied)
        } else {
            problems.join("; ")
        },
    });

    results
}

// ── 7. Snapshots ────────────────────────────────────────────────────────

fn validate_snapshots(_verbose: bool) -> Vec<TestResult> {
    println!("--- Snapshots ---");
    let mut results = Vec::new();

    let mut binary_failures = Vec::new();
    let mut json_failures = Vec::new();

    for seed in 0..FARM_SEEDS {
        let (engine, layout) = farm(seed);

        let mut buffer = Vec::new();
        let restored = persistence::save_world(&mut buffer, &engine.world, &engine.config, seed)
            .and_then(|_| persistence::load_world(&buffer[..]));
        match restored {
            Ok(loaded)
                if loaded.world.total_items() == engine.world.total_items()
                    && loaded.world.storage_count() == layout.storages().len()
                    && loaded.ticks == seed => {}
            Ok(_) => binary_failures.push(format!("seed {}: contents differ", seed)),
            Err(e) => binary_failures.push(format!("seed {}: {}", seed, e)),
        }

        let restored = persistence::to_json(&engine.world, &engine.config, seed)
            .and_then(|json| persistence::from_json(&json));
        match restored {
            Ok(loaded) if loaded.world.total_items() == engine.world.total_items() => {}
            Ok(_) => json_failures.push(format!("seed {}: contents differ", seed)),
            Err(e) => json_failures.push(format!("seed {}: {}", seed, e)),
        }
    }

    results.push(TestResult {
        name: "snapshot_bincode_round_trip".into(),
        passed: binary_failures.is_empty(),
        detail: if binary_failures.is_empty() {
            format!("{} farms restored", FARM_SEEDS)
        } else {
            binary_failures.join("; ")
        },
    });
    results.push(TestResult {
        name: "snapshot_json_round_trip".into(),
        passed: json_failures.is_empty(),
        detail: if json_failures.is_empty() {
            format!("{} farms restored", FARM_SEEDS)
        } else {
            json_failures.join("; ")
        },
    });

    results
}
