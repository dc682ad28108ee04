//! Bounded flood fill that finds storages around one or more seeds.
//!
//! The explorer keeps an insertion-ordered frontier of tiles. Every tile
//! remembers the seed it grew from (its *origin*), and neighbors are only
//! enqueued while they stay within `distance_limit` (Chebyshev) of that
//! origin. A long conveyor line can therefore reach far-away chests as long
//! as each tile along it is close to *some* seed, but a single chain can
//! never drift away from all seeds.
//!
//! Tiles are classified through the [`Resolver`]:
//!
//! | Tile holds | Emitted | Expanded |
//! |------------|---------|----------|
//! | valid storage | yes | yes |
//! | connector (e.g. conveyor) | no | yes |
//! | anything else / nothing | no | no |
//!
//! Results come back in discovery order, which follows the fixed neighbor
//! enumeration order, not spatial distance.
//!
//! ```
//! use stashnet_logic::discovery::Explorer;
//! use stashnet_logic::memory::{MemoryStorage, MemoryWorld};
//! use stashnet_logic::position::{LocationId, Position};
//! use stashnet_logic::provider::Layer;
//!
//! let farm = LocationId(1);
//! let mut world = MemoryWorld::new();
//! let chest = world.add_storage(Layer::Object, MemoryStorage::new(36).at(Position::new(farm, 11, 11)));
//!
//! let found = Explorer::new(&world, &world).from_positions(&[Position::new(farm, 10, 10)]);
//! assert_eq!(found.located.len(), 1);
//! assert_eq!(found.located[0].handle, chest);
//! ```

use std::collections::{HashMap, HashSet};

use crate::config::DiscoveryConfig;
use crate::position::{LocationId, Position, Rect};
use crate::provider::{ActorId, Handle, LocatedResource, ResourceContext, Resolver, TileWorld};

/// Why a discovery pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The frontier ran dry.
    Exhausted,
    /// `scan_limit` frontier entries were examined.
    ScanLimit,
    /// `target_limit` storages were found.
    TargetLimit,
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    /// Storages in discovery order, unique by handle.
    pub located: Vec<LocatedResource>,
    /// Frontier entries examined (seed entries skipped for emission are not
    /// counted).
    pub scanned: usize,
    /// Distinct tiles ever enqueued.
    pub frontier: usize,
    pub stop: StopReason,
}

impl DiscoveryReport {
    pub fn into_resources(self) -> Vec<LocatedResource> {
        self.located
    }
}

/// Insertion-ordered tile queue with origin tracking.
struct Frontier {
    order: Vec<Position>,
    seen: HashSet<Position>,
    origins: HashMap<Position, Position>,
}

impl Frontier {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
            origins: HashMap::new(),
        }
    }

    fn push_seed(&mut self, position: Position) {
        if self.seen.insert(position) {
            self.order.push(position);
            self.origins.insert(position, position);
        }
    }

    fn origin_of(&self, position: &Position) -> Position {
        self.origins.get(position).copied().unwrap_or(*position)
    }

    fn expand(&mut self, from: Position, distance_limit: i32, include_diagonal: bool) {
        let origin = self.origin_of(&from);
        for next in from.neighbors(include_diagonal) {
            if next.chebyshev(&origin) > distance_limit {
                continue;
            }
            if self.seen.insert(next) {
                self.order.push(next);
                self.origins.insert(next, origin);
            }
        }
    }
}

/// Storage discovery over a host world.
pub struct Explorer<'a, W: TileWorld + ?Sized, R: Resolver + ?Sized> {
    world: &'a W,
    resolver: &'a R,
    connector: Option<&'a dyn Fn(Handle) -> bool>,
    actor: Option<ActorId>,
    config: DiscoveryConfig,
}

impl<'a, W: TileWorld + ?Sized, R: Resolver + ?Sized> Explorer<'a, W, R> {
    pub fn new(world: &'a W, resolver: &'a R) -> Self {
        Self {
            world,
            resolver,
            connector: None,
            actor: None,
            config: DiscoveryConfig::default(),
        }
    }

    /// Treat handles matching `connector` as pass-through tiles.
    pub fn with_connector(mut self, connector: &'a dyn Fn(Handle) -> bool) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover around raw seed positions.
    pub fn from_positions(&self, seeds: &[Position]) -> DiscoveryReport {
        let mut frontier = Frontier::new();
        for seed in seeds {
            frontier.push_seed(*seed);
        }
        self.run(frontier, Vec::new())
    }

    /// Discover around every tile of `rect`, grown by `expand_source`.
    pub fn from_rect(&self, rect: Rect, location: Option<LocationId>) -> DiscoveryReport {
        let tiles = rect.expand(self.config.expand_source).tiles(location);
        self.from_sources(&[], &tiles)
    }

    /// Discover around known storages (every tile they cover) and optional
    /// extra positions.
    ///
    /// A valid source with neither a footprint nor a tile position cannot be
    /// searched from, but is still reported, ahead of everything found by the
    /// flood fill.
    pub fn from_sources(&self, sources: &[LocatedResource], extra: &[Position]) -> DiscoveryReport {
        let mut frontier = Frontier::new();
        for position in extra {
            frontier.push_seed(*position);
        }

        let mut unplaced = Vec::new();
        for source in sources {
            let Some(provider) = self.resolver.provider(source.handle) else {
                continue;
            };
            let ctx = ResourceContext {
                handle: source.handle,
                location: source.location,
                actor: self.actor,
            };
            if !provider.is_valid(&ctx) {
                continue;
            }

            if let Some(rect) = provider.footprint(&ctx) {
                for tile in rect.tiles(source.location) {
                    frontier.push_seed(tile);
                }
            } else if let Some(tile) = provider.tile_position(&ctx) {
                frontier.push_seed(Position {
                    location: source.location,
                    ..tile
                });
            } else {
                unplaced.push(*source);
            }
        }

        self.run(frontier, unplaced)
    }

    fn run(&self, mut frontier: Frontier, unplaced: Vec<LocatedResource>) -> DiscoveryReport {
        let config = &self.config;
        let seed_count = frontier.order.len();

        // Seeds always grow, even when they are not reported.
        for i in 0..seed_count {
            let seed = frontier.order[i];
            frontier.expand(seed, config.distance_limit, config.include_diagonal);
        }

        let mut emitted: HashSet<Handle> = HashSet::new();
        let mut located = Vec::new();
        for source in unplaced {
            if emitted.insert(source.handle) {
                located.push(source);
            }
        }

        let start = if config.include_source { 0 } else { seed_count };
        let mut idx = start;
        let mut stop = StopReason::Exhausted;

        if located.len() >= config.target_limit {
            stop = StopReason::TargetLimit;
        } else {
            while idx < frontier.order.len() {
                if idx >= config.scan_limit {
                    stop = StopReason::ScanLimit;
                    break;
                }
                let position = frontier.order[idx];
                idx += 1;

                let expand = self.visit(&position, &mut emitted, &mut located);

                if located.len() >= config.target_limit {
                    stop = StopReason::TargetLimit;
                    break;
                }
                if expand {
                    frontier.expand(position, config.distance_limit, config.include_diagonal);
                }
            }
        }

        located.truncate(config.target_limit);
        let scanned = idx - start;
        log::debug!(
            "discovery stopped ({:?}): {} found, {} scanned, {} tiles queued",
            stop,
            located.len(),
            scanned,
            frontier.order.len()
        );

        DiscoveryReport {
            located,
            scanned,
            frontier: frontier.order.len(),
            stop,
        }
    }

    /// Classify one tile. Returns whether its neighbors should be explored.
    fn visit(
        &self,
        position: &Position,
        emitted: &mut HashSet<Handle>,
        located: &mut Vec<LocatedResource>,
    ) -> bool {
        // Virtual positions have no tiles to look at.
        if position.location.is_none() {
            return false;
        }

        let mut expand = false;
        for handle in self.world.contents_at(position).iter() {
            let ctx = ResourceContext {
                handle,
                location: position.location,
                actor: self.actor,
            };
            let is_storage = self
                .resolver
                .provider(handle)
                .is_some_and(|provider| provider.is_valid(&ctx));

            if is_storage {
                if emitted.insert(handle) {
                    located.push(LocatedResource::new(handle, position.location));
                }
                expand = true;
            } else if !expand && self.connector.is_some_and(|is_connector| is_connector(handle)) {
                expand = true;
            }
        }
        expand
    }
}

/// Discover around raw positions and return the storages found.
pub fn discover<W, R>(
    seeds: &[Position],
    world: &W,
    resolver: &R,
    connector: Option<&dyn Fn(Handle) -> bool>,
    actor: Option<ActorId>,
    config: &DiscoveryConfig,
) -> Vec<LocatedResource>
where
    W: TileWorld + ?Sized,
    R: Resolver + ?Sized,
{
    let mut explorer = Explorer::new(world, resolver).with_config(config.clone());
    explorer.connector = connector;
    explorer.actor = actor;
    explorer.from_positions(seeds).into_resources()
}

/// Remove repeated handles, keeping the first occurrence of each.
pub fn deduplicate(resources: &mut Vec<LocatedResource>) {
    let mut seen = HashSet::new();
    resources.retain(|r| seen.insert(r.handle));
}

/// Work out which location holds each handle.
///
/// `first` is checked before the other candidates. Handles with no provider
/// are dropped; handles found in no location are dropped unless
/// `null_location_valid`, in which case they are kept with no location.
pub fn locate_resources<W, R>(
    handles: &[Handle],
    locations: &[LocationId],
    first: Option<LocationId>,
    world: &W,
    resolver: &R,
    null_location_valid: bool,
) -> Vec<LocatedResource>
where
    W: TileWorld + ?Sized,
    R: Resolver + ?Sized,
{
    let mut result = Vec::new();
    for &handle in handles {
        if resolver.provider(handle).is_none() {
            continue;
        }

        let location = first
            .filter(|loc| world.location_contains(*loc, handle))
            .or_else(|| {
                locations
                    .iter()
                    .copied()
                    .filter(|loc| Some(*loc) != first)
                    .find(|loc| world.location_contains(*loc, handle))
            });

        if location.is_some() || null_location_valid {
            result.push(LocatedResource::new(handle, location));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStorage, MemoryWorld};
    use crate::provider::Layer;

    const FARM: LocationId = LocationId(1);
    const CAVE: LocationId = LocationId(2);

    fn at(x: i32, y: i32) -> Position {
        Position::new(FARM, x, y)
    }

    fn chest(world: &mut MemoryWorld, x: i32, y: i32) -> Handle {
        world.add_storage(Layer::Object, MemoryStorage::new(36).at(at(x, y)))
    }

    fn config(distance: i32, scan: usize, target: usize) -> DiscoveryConfig {
        DiscoveryConfig {
            distance_limit: distance,
            scan_limit: scan,
            target_limit: target,
            ..DiscoveryConfig::default()
        }
    }

    #[test]
    fn test_single_diagonal_chest() {
        let mut world = MemoryWorld::new();
        let h = chest(&mut world, 11, 11);
        let report = Explorer::new(&world, &world)
            .with_config(config(2, 9, 20))
            .from_positions(&[at(10, 10)]);
        assert_eq!(report.located, vec![LocatedResource::new(h, Some(FARM))]);
        assert_eq!(report.scanned, 9);
    }

    #[test]
    fn test_chest_out_of_scan_budget_is_missed() {
        let mut world = MemoryWorld::new();
        chest(&mut world, 11, 11);
        let report = Explorer::new(&world, &world)
            .with_config(config(2, 8, 20))
            .from_positions(&[at(10, 10)]);
        assert!(report.located.is_empty());
        assert_eq!(report.stop, StopReason::ScanLimit);
    }

    #[test]
    fn test_chained_chests_spread_search() {
        let mut world = MemoryWorld::new();
        let a = chest(&mut world, 11, 10);
        let b = chest(&mut world, 12, 10);
        let c = chest(&mut world, 13, 10);
        let report = Explorer::new(&world, &world)
            .with_config(config(5, 200, 20))
            .from_positions(&[at(10, 10)]);
        let handles: Vec<_> = report.located.iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![a, b, c]);
        assert_eq!(report.stop, StopReason::Exhausted);
    }

    #[test]
    fn test_distance_measured_from_origin_not_path() {
        // A conveyor line running away from the seed. The chest at x=14 is
        // four tiles from the seed and out of reach with distance 3, no
        // matter how many connectors lead to it.
        let mut world = MemoryWorld::new();
        for x in 11..=13 {
            world.add_connector(Layer::Object, at(x, 10));
        }
        let far = chest(&mut world, 14, 10);
        let is_connector = |h: Handle| world.is_connector(h);

        let report = Explorer::new(&world, &world)
            .with_connector(&is_connector)
            .with_config(config(3, 500, 20))
            .from_positions(&[at(10, 10)]);
        assert!(report.located.iter().all(|r| r.handle != far));

        let report = Explorer::new(&world, &world)
            .with_connector(&is_connector)
            .with_config(config(4, 500, 20))
            .from_positions(&[at(10, 10)]);
        assert_eq!(report.located.len(), 1);
        assert_eq!(report.located[0].handle, far);
    }

    #[test]
    fn test_connectors_required_to_cross_gaps() {
        let mut world = MemoryWorld::new();
        world.add_connector(Layer::Feature, at(11, 10));
        let far = chest(&mut world, 12, 10);

        let plain = Explorer::new(&world, &world)
            .with_config(config(5, 500, 20))
            .from_positions(&[at(10, 10)]);
        // Seeds expand, so (11,10) is scanned, but a bare conveyor is a
        // dead end without the connector predicate.
        assert!(plain.located.is_empty());

        let is_connector = |h: Handle| world.is_connector(h);
        let linked = Explorer::new(&world, &world)
            .with_connector(&is_connector)
            .with_config(config(5, 500, 20))
            .from_positions(&[at(10, 10)]);
        assert_eq!(linked.located.len(), 1);
        assert_eq!(linked.located[0].handle, far);
    }

    #[test]
    fn test_obstacles_are_dead_ends() {
        let mut world = MemoryWorld::new();
        world.add_obstacle(Layer::Object, at(11, 10));
        chest(&mut world, 12, 10);
        let is_connector = |h: Handle| world.is_connector(h);
        let report = Explorer::new(&world, &world)
            .with_connector(&is_connector)
            .with_config(config(5, 500, 20))
            .from_positions(&[at(10, 10)]);
        assert!(report.located.is_empty());
    }

    #[test]
    fn test_exclude_source_still_expands() {
        let mut world = MemoryWorld::new();
        let seed_chest = chest(&mut world, 10, 10);
        let next = chest(&mut world, 11, 10);
        let report = Explorer::new(&world, &world)
            .with_config(DiscoveryConfig {
                include_source: false,
                ..config(2, 100, 20)
            })
            .from_positions(&[at(10, 10)]);
        let handles: Vec<_> = report.located.iter().map(|r| r.handle).collect();
        assert!(!handles.contains(&seed_chest));
        assert_eq!(handles, vec![next]);
    }

    #[test]
    fn test_orthogonal_only() {
        let mut world = MemoryWorld::new();
        chest(&mut world, 11, 11);
        let report = Explorer::new(&world, &world)
            .with_config(DiscoveryConfig {
                include_diagonal: false,
                ..config(1, 100, 20)
            })
            .from_positions(&[at(10, 10)]);
        assert!(report.located.is_empty());
        assert_eq!(report.frontier, 5);
    }

    #[test]
    fn test_target_limit_stops_early() {
        let mut world = MemoryWorld::new();
        for x in 11..16 {
            chest(&mut world, x, 10);
        }
        let report = Explorer::new(&world, &world)
            .with_config(config(10, 1000, 2))
            .from_positions(&[at(10, 10)]);
        assert_eq!(report.located.len(), 2);
        assert_eq!(report.stop, StopReason::TargetLimit);
    }

    #[test]
    fn test_multi_tile_reported_once() {
        let mut world = MemoryWorld::new();
        let crate_handle = world.add_storage(
            Layer::Furniture,
            MemoryStorage::new(72).covering(FARM, Rect::new(11, 9, 3, 3)),
        );
        let report = Explorer::new(&world, &world)
            .with_config(config(5, 500, 20))
            .from_positions(&[at(10, 10)]);
        assert_eq!(report.located.len(), 1);
        assert_eq!(report.located[0].handle, crate_handle);
    }

    #[test]
    fn test_every_layer_is_checked() {
        let mut world = MemoryWorld::new();
        let obj = chest(&mut world, 11, 10);
        let furn = world.add_storage(Layer::Furniture, MemoryStorage::new(9).at(at(11, 10)));
        let report = Explorer::new(&world, &world)
            .with_config(config(1, 100, 20))
            .from_positions(&[at(10, 10)]);
        let handles: Vec<_> = report.located.iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![obj, furn]);
    }

    #[test]
    fn test_sources_seed_from_footprint() {
        let mut world = MemoryWorld::new();
        let big = world.add_storage(
            Layer::Furniture,
            MemoryStorage::new(72).covering(FARM, Rect::new(0, 0, 4, 1)),
        );
        // One tile right of the crate's last tile, four from its first.
        let near = chest(&mut world, 4, 0);
        // Two tiles from the nearest crate tile.
        let far = chest(&mut world, 5, 0);
        let report = Explorer::new(&world, &world)
            .with_config(config(1, 500, 20))
            .from_sources(&[LocatedResource::new(big, Some(FARM))], &[]);
        let handles: Vec<_> = report.located.iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![big, near]);
        assert!(!handles.contains(&far));
    }

    #[test]
    fn test_unplaced_sources_reported_first() {
        let mut world = MemoryWorld::new();
        let fridge = world.add_unplaced(Some(FARM), MemoryStorage::new(36));
        let near = chest(&mut world, 1, 0);
        let report = Explorer::new(&world, &world)
            .with_config(config(2, 100, 20))
            .from_sources(&[LocatedResource::new(fridge, Some(FARM))], &[at(0, 0)]);
        let handles: Vec<_> = report.located.iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![fridge, near]);
    }

    #[test]
    fn test_invalid_sources_ignored() {
        let mut world = MemoryWorld::new();
        let gone = chest(&mut world, 0, 0);
        world.storage(gone).unwrap().invalidate();
        let report = Explorer::new(&world, &world).from_sources(&[LocatedResource::new(gone, Some(FARM))], &[]);
        assert!(report.located.is_empty());
        assert_eq!(report.frontier, 0);
    }

    #[test]
    fn test_rect_seed_with_expand() {
        let mut world = MemoryWorld::new();
        let h = chest(&mut world, 5, 5);
        let report = Explorer::new(&world, &world)
            .with_config(DiscoveryConfig {
                expand_source: 1,
                ..config(0, 100, 20)
            })
            .from_rect(Rect::new(3, 3, 1, 1), Some(FARM));
        // distance 0 means no growth; only the 3x3 seed block is scanned.
        assert!(report.located.is_empty());

        let report = Explorer::new(&world, &world)
            .with_config(DiscoveryConfig {
                expand_source: 2,
                ..config(0, 100, 20)
            })
            .from_rect(Rect::new(3, 3, 1, 1), Some(FARM));
        assert_eq!(report.located.len(), 1);
        assert_eq!(report.located[0].handle, h);
    }

    #[test]
    fn test_virtual_positions_never_resolve() {
        let world = MemoryWorld::new();
        let report = Explorer::new(&world, &world).from_positions(&[Position::virtual_at(0, 0)]);
        assert!(report.located.is_empty());
        assert_eq!(report.stop, StopReason::Exhausted);
    }

    #[test]
    fn test_discover_free_function() {
        let mut world = MemoryWorld::new();
        let h = chest(&mut world, 1, 1);
        let found = discover(&[at(0, 0)], &world, &world, None, None, &DiscoveryConfig::default());
        assert_eq!(found, vec![LocatedResource::new(h, Some(FARM))]);
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let mut list = vec![
            LocatedResource::new(Handle(1), Some(FARM)),
            LocatedResource::new(Handle(2), Some(FARM)),
            LocatedResource::new(Handle(1), Some(CAVE)),
        ];
        deduplicate(&mut list);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].location, Some(FARM));
    }

    #[test]
    fn test_locate_resources() {
        let mut world = MemoryWorld::new();
        let on_farm = chest(&mut world, 0, 0);
        let in_cave = world.add_storage(
            Layer::Object,
            MemoryStorage::new(9).at(Position::new(CAVE, 0, 0)),
        );
        let nowhere = world.add_unplaced(None, MemoryStorage::new(9));

        let found = locate_resources(&[on_farm, in_cave, nowhere], &[FARM, CAVE], Some(CAVE), &world, &world, false);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].location, Some(FARM));
        assert_eq!(found[1].location, Some(CAVE));

        let found = locate_resources(&[nowhere, Handle(999)], &[FARM], None, &world, &world, true);
        assert_eq!(found, vec![LocatedResource::new(nowhere, None)]);
    }
}
