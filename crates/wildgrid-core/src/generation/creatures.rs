//! Creature spawning for fresh zones, night spawns, raids and merges

use hecs::{Entity, World};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;
use wildgrid_logic::config::SimConfig;
use wildgrid_logic::items::Inventory;
use wildgrid_logic::species::CreatureKind;

use super::names::generate_name;
use crate::components::*;
use crate::zones::ZoneStore;

/// Most creatures a freshly generated zone starts with.
const INITIAL_SPAWNS: usize = 3;

/// Spawn one creature with every component its kind needs.
#[allow(clippy::too_many_arguments)]
pub fn spawn_creature(
    world: &mut World,
    zones: &mut ZoneStore,
    kind: CreatureKind,
    coord: ZoneCoord,
    cell: CellPos,
    level: u32,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Entity {
    let creature = Creature::new(kind);
    let behavior = kind.behavior();
    let level = level.max(1);

    let entity = world.spawn((
        creature,
        Position::new(coord, cell),
        Vitals::full(creature.max_health(level)),
        Progression::new(level, config.survival.default_max_age),
        Brain::idle(config.ai.idle_ticks),
        MemoryLane::new(behavior.memory_len),
        Inventory::with_capacity(behavior.inventory_slots),
    ));

    if kind.is_npc() {
        let _ = world.insert_one(entity, generate_name(kind, rng));
    }
    if let Some(focus) = kind.default_focus() {
        let _ = world.insert_one(entity, Focus::new(focus));
    }

    zones.add_member(coord, entity);
    entity
}

/// Populate a freshly generated zone from its biome's spawn table.
pub fn populate_zone(
    world: &mut World,
    zones: &mut ZoneStore,
    coord: ZoneCoord,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Vec<Entity> {
    let Some(zone) = zones.get(coord) else {
        return Vec::new();
    };

    let mut eligible: Vec<CreatureKind> = zone
        .biome
        .spawn_table()
        .iter()
        .filter(|(_, chance)| rng.gen::<f32>() < *chance)
        .map(|(kind, _)| *kind)
        .collect();
    eligible.shuffle(rng);
    eligible.truncate(INITIAL_SPAWNS);

    let arrivals = arrival_cells(zone);
    if arrivals.is_empty() {
        return Vec::new();
    }

    let spawned: Vec<Entity> = eligible
        .into_iter()
        .map(|kind| {
            let cell = arrivals[rng.gen_range(0..arrivals.len())];
            spawn_creature(world, zones, kind, coord, cell, 1, config, rng)
        })
        .collect();

    debug!(zone = %coord, count = spawned.len(), "populated zone");
    spawned
}

/// Walkable cells around the zone's entrances.
pub fn arrival_cells(zone: &Zone) -> Vec<CellPos> {
    let mut cells: Vec<CellPos> = zone
        .entrance_cells()
        .into_iter()
        .flat_map(|p| std::iter::once(p).chain(p.neighbors8()))
        .filter(|p| !p.on_border() && zone.walkable(*p))
        .collect();
    cells.sort();
    cells.dedup();
    cells
}
