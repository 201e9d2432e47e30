//! Night spawns, daylight, raids and catch-up migration

use hecs::{Entity, World};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};
use wildgrid_logic::config::SimConfig;
use wildgrid_logic::species::{AnimalKind, CreatureKind, HostileKind};

use crate::components::*;
use crate::generation::creatures::{arrival_cells, spawn_creature};
use crate::systems::actions::max_health_of;
use crate::zones::{random_walkable, ZoneStore};

/// Kinds a raid is drawn from.
pub const RAIDERS: [CreatureKind; 3] = [
    CreatureKind::Hostile(HostileKind::Goblin),
    CreatureKind::Hostile(HostileKind::Bandit),
    CreatureKind::Animal(AnimalKind::Wolf),
];

const SKELETON: CreatureKind = CreatureKind::Hostile(HostileKind::Skeleton);

fn room_in(zones: &ZoneStore, coord: ZoneCoord, config: &SimConfig) -> usize {
    config
        .spawning
        .max_creatures_per_zone
        .saturating_sub(zones.member_count(coord))
}

/// Roll for a skeleton rising somewhere in `coord`. Only call at night.
pub fn night_spawn(
    world: &mut World,
    zones: &mut ZoneStore,
    coord: ZoneCoord,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Option<Entity> {
    if room_in(zones, coord, config) == 0 || rng.gen::<f32>() >= config.spawning.night_skeleton_chance {
        return None;
    }
    let cell = random_walkable(zones.get(coord)?, rng)?;
    let skeleton = spawn_creature(world, zones, SKELETON, coord, cell, 1, config, rng);
    info!(zone = %coord, ?cell, "skeleton spawned");
    Some(skeleton)
}

fn skeletons(world: &World, zone: &Zone) -> Vec<(Entity, CellPos)> {
    zone.members
        .iter()
        .filter_map(|&e| {
            let creature = world.get::<&Creature>(e).ok()?;
            let pos = world.get::<&Position>(e).ok()?;
            (creature.kind == SKELETON).then_some((e, pos.cell))
        })
        .collect()
}

/// Burn every skeleton in the zone once. Returns how many were hurt.
pub fn daylight_damage(world: &mut World, zone: &Zone, config: &SimConfig) -> usize {
    let burning = skeletons(world, zone);
    for &(skeleton, _) in &burning {
        let max = max_health_of(world, skeleton);
        if let Ok(mut vitals) = world.get::<&mut Vitals>(skeleton) {
            vitals.damage(config.survival.skeleton_daylight_damage, max);
        }
    }
    burning.len()
}

/// Skeletons near the player hurt them at night. Returns the damage dealt.
pub fn haunt_player(world: &World, zone: &Zone, player: &mut Player, config: &SimConfig) -> f32 {
    if player.zone() != zone.coord {
        return 0.0;
    }
    let spawning = &config.spawning;
    let near = skeletons(world, zone)
        .into_iter()
        .filter(|(_, cell)| cell.chebyshev(player.cell()) <= spawning.skeleton_reach)
        .count();
    let damage = near as f32 * spawning.skeleton_night_damage;
    if damage > 0.0 {
        let max = player.max_health();
        player.vitals.damage(damage, max);
    }
    damage
}

/// Roll for a raid on `coord`. Busy zones attract one to three raiders
/// arriving through the exits.
pub fn raid(
    world: &mut World,
    zones: &mut ZoneStore,
    coord: ZoneCoord,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Vec<Entity> {
    let spawning = &config.spawning;
    if zones.member_count(coord) < spawning.raid_min_creatures || rng.gen::<f32>() >= spawning.raid_chance {
        return Vec::new();
    }
    let Some(zone) = zones.get(coord) else {
        return Vec::new();
    };
    let arrivals = arrival_cells(zone);
    if arrivals.is_empty() {
        return Vec::new();
    }

    let size = (rng.gen_range(1..=spawning.raid_max_size.max(1)) as usize).min(room_in(zones, coord, config));
    let mut raiders = Vec::with_capacity(size);
    for _ in 0..size {
        let (Some(kind), Some(cell)) = (RAIDERS.choose(rng).copied(), arrivals.choose(rng).copied()) else {
            break;
        };
        raiders.push(spawn_creature(world, zones, kind, coord, cell, 1, config, rng));
    }
    if !raiders.is_empty() {
        info!(zone = %coord, raiders = raiders.len(), "raid");
    }
    raiders
}

/// Chance that one unsettled creature leaves during a catch-up job of
/// `cycles` cycles.
pub fn migration_chance(cycles: u32, config: &SimConfig) -> f32 {
    let spawning = &config.spawning;
    if cycles <= spawning.migration_min_cycles {
        return 0.0;
    }
    (cycles as f32 * spawning.migration_rate).min(spawning.migration_cap)
}

/// Move wandering kinds out of a caught-up zone into loaded neighbours.
/// Returns how many left.
pub fn migrate(
    world: &mut World,
    zones: &mut ZoneStore,
    coord: ZoneCoord,
    cycles: u32,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> usize {
    let chance = migration_chance(cycles, config);
    if chance <= 0.0 {
        return 0;
    }
    let Some(zone) = zones.get(coord) else {
        return 0;
    };
    let exits: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|d| zone.exits.open(*d) && zones.contains(coord.neighbor(*d)))
        .collect();
    if exits.is_empty() {
        return 0;
    }

    let mut moved = 0;
    for entity in zones.members(coord) {
        let settled = world
            .get::<&Creature>(entity)
            .map_or(true, |c| c.kind.is_settled());
        if settled || rng.gen::<f32>() >= chance {
            continue;
        }
        let Some(&dir) = exits.choose(rng) else {
            continue;
        };
        let to = coord.neighbor(dir);
        if room_in(zones, to, config) == 0 {
            continue;
        }
        let Some(cell) = zones.get(to).and_then(|z| entry_cell(z, dir.opposite())) else {
            continue;
        };

        if let Ok(mut pos) = world.get::<&mut Position>(entity) {
            *pos = Position::new(to, cell);
        }
        if let Ok(mut brain) = world.get::<&mut Brain>(entity) {
            *brain = Brain::idle(config.ai.idle_ticks);
        }
        if let Ok(mut memory) = world.get::<&mut MemoryLane>(entity) {
            memory.clear();
        }
        zones.move_member(entity, coord, to);
        moved += 1;
    }
    if moved > 0 {
        debug!(from = %coord, moved, "creatures migrated");
    }
    moved
}

/// The walkable cell just inside the exit on `side`, falling back to any
/// arrival cell.
pub fn entry_cell(zone: &Zone, side: Direction) -> Option<CellPos> {
    let (dx, dy) = side.opposite().delta();
    Exits::cells(side)
        .into_iter()
        .map(|p| p.offset(dx, dy))
        .find(|p| !p.on_border() && zone.walkable(*p))
        .or_else(|| arrival_cells(zone).into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::species::PeacefulRole;

    fn setup() -> (World, ZoneStore, SimConfig, ChaCha8Rng) {
        let config = SimConfig::default();
        let mut zones = ZoneStore::new(21);
        zones.ensure_radius(ZoneCoord::ORIGIN, 1, &config.biomes);
        (World::new(), zones, config, ChaCha8Rng::seed_from_u64(21))
    }

    #[test]
    fn certain_night_spawn_creates_a_skeleton() {
        let (mut world, mut zones, mut config, mut rng) = setup();
        config.spawning.night_skeleton_chance = 1.0;
        let skeleton = night_spawn(&mut world, &mut zones, ZoneCoord::ORIGIN, &config, &mut rng).unwrap();
        assert_eq!(world.get::<&Creature>(skeleton).unwrap().kind, SKELETON);
        assert_eq!(zones.member_count(ZoneCoord::ORIGIN), 1);
    }

    #[test]
    fn full_zones_get_no_spawns() {
        let (mut world, mut zones, mut config, mut rng) = setup();
        config.spawning.night_skeleton_chance = 1.0;
        config.spawning.max_creatures_per_zone = 0;
        assert!(night_spawn(&mut world, &mut zones, ZoneCoord::ORIGIN, &config, &mut rng).is_none());
    }

    #[test]
    fn daylight_burns_skeletons_only() {
        let (mut world, mut zones, config, mut rng) = setup();
        let skeleton = spawn_creature(&mut world, &mut zones, SKELETON, ZoneCoord::ORIGIN, CellPos::new(4, 4), 1, &config, &mut rng);
        let farmer = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Peaceful(PeacefulRole::Farmer),
            ZoneCoord::ORIGIN,
            CellPos::new(5, 4),
            1,
            &config,
            &mut rng,
        );
        let before = world.get::<&Vitals>(skeleton).unwrap().health;
        let burned = daylight_damage(&mut world, zones.get(ZoneCoord::ORIGIN).unwrap(), &config);
        assert_eq!(burned, 1);
        assert!(world.get::<&Vitals>(skeleton).unwrap().health < before);
        assert_eq!(world.get::<&Vitals>(farmer).unwrap().health, 80.0);
    }

    #[test]
    fn skeletons_haunt_a_nearby_player() {
        let (mut world, mut zones, config, mut rng) = setup();
        spawn_creature(&mut world, &mut zones, SKELETON, ZoneCoord::ORIGIN, CellPos::new(4, 4), 1, &config, &mut rng);
        let mut near = Player::new(ZoneCoord::ORIGIN, CellPos::new(6, 6));
        let mut far = Player::new(ZoneCoord::ORIGIN, CellPos::new(15, 12));
        let zone = zones.get(ZoneCoord::ORIGIN).unwrap();

        assert_eq!(haunt_player(&world, zone, &mut near, &config), 1.0);
        assert_eq!(haunt_player(&world, zone, &mut far, &config), 0.0);
        assert!(near.vitals.health < near.max_health());
    }

    #[test]
    fn raids_need_a_busy_zone() {
        let (mut world, mut zones, mut config, mut rng) = setup();
        config.spawning.raid_chance = 1.0;
        assert!(raid(&mut world, &mut zones, ZoneCoord::ORIGIN, &config, &mut rng).is_empty());

        for i in 0..6 {
            spawn_creature(
                &mut world,
                &mut zones,
                CreatureKind::Animal(AnimalKind::Sheep),
                ZoneCoord::ORIGIN,
                CellPos::new(3 + i, 5),
                1,
                &config,
                &mut rng,
            );
        }
        let raiders = raid(&mut world, &mut zones, ZoneCoord::ORIGIN, &config, &mut rng);
        assert!((1..=3).contains(&raiders.len()));
        for r in raiders {
            let kind = world.get::<&Creature>(r).unwrap().kind;
            assert!(RAIDERS.contains(&kind));
        }
    }

    #[test]
    fn migration_chance_is_capped() {
        let config = SimConfig::default();
        assert_eq!(migration_chance(10, &config), 0.0);
        assert!((migration_chance(20, &config) - 0.1).abs() < 1e-6);
        assert_eq!(migration_chance(100, &config), 0.3);
    }

    #[test]
    fn settled_kinds_stay_put() {
        let (mut world, mut zones, mut config, mut rng) = setup();
        config.spawning.migration_cap = 1.0;
        config.spawning.migration_rate = 1.0;
        let farmer = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Peaceful(PeacefulRole::Farmer),
            ZoneCoord::ORIGIN,
            CellPos::center(),
            1,
            &config,
            &mut rng,
        );
        let wolf = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Animal(AnimalKind::Wolf),
            ZoneCoord::ORIGIN,
            CellPos::center(),
            1,
            &config,
            &mut rng,
        );

        let moved = migrate(&mut world, &mut zones, ZoneCoord::ORIGIN, 50, &config, &mut rng);
        assert_eq!(moved, 1);
        assert_eq!(world.get::<&Position>(farmer).unwrap().zone, ZoneCoord::ORIGIN);
        let wolf_zone = world.get::<&Position>(wolf).unwrap().zone;
        assert_ne!(wolf_zone, ZoneCoord::ORIGIN);
        assert!(zones.members(wolf_zone).contains(&wolf));
        assert!(!zones.members(ZoneCoord::ORIGIN).contains(&wolf));
    }
}
