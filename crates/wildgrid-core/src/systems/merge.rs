//! Merging - two idle twins become one stronger creature

use hecs::{Entity, World};
use rand::Rng;
use tracing::info;
use wildgrid_logic::config::SimConfig;
use wildgrid_logic::items::Inventory;

use crate::components::*;
use crate::generation::creatures::spawn_creature;
use crate::systems::enchantments::Enchantments;
use crate::systems::factions::FactionRegistry;
use crate::zones::ZoneStore;

/// The outcome of one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
    pub consumed: [Entity; 2],
    pub merged: Entity,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    entity: Entity,
    creature: Creature,
    level: u32,
    cell: CellPos,
}

fn candidates(world: &World, zone: &Zone, enchantments: &Enchantments) -> Vec<Candidate> {
    zone.members
        .iter()
        .filter(|e| !enchantments.entity_frozen(**e))
        .filter_map(|&entity| {
            let mut query = world
                .query_one::<(&Creature, &Position, &Progression, &Vitals, &Brain)>(entity)
                .ok()?;
            let (creature, pos, progression, vitals, brain) = query.get()?;
            let eligible = !creature.doubled && !vitals.is_dead() && brain.state == AiState::Idle;
            eligible.then_some(Candidate {
                entity,
                creature: *creature,
                level: progression.level,
                cell: pos.cell,
            })
        })
        .collect()
}

/// Merge idle, adjacent pairs of the same kind and level in one zone.
///
/// Each merge despawns both originals and spawns a doubled creature one
/// level higher with their combined inventory. The first original's name,
/// focus and faction seat pass to the result.
pub fn merge_system(
    world: &mut World,
    zones: &mut ZoneStore,
    coord: ZoneCoord,
    factions: &mut FactionRegistry,
    enchantments: &Enchantments,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Vec<Merge> {
    let Some(zone) = zones.get(coord) else {
        return Vec::new();
    };
    let pool = candidates(world, zone, enchantments);

    let mut used = vec![false; pool.len()];
    let mut pairs = Vec::new();
    for i in 0..pool.len() {
        if used[i] {
            continue;
        }
        for j in i + 1..pool.len() {
            if used[j] {
                continue;
            }
            let (a, b) = (&pool[i], &pool[j]);
            let twins = a.creature.kind == b.creature.kind
                && a.level == b.level
                && a.cell.chebyshev(b.cell) <= 1;
            if twins && rng.gen::<f32>() < config.ai.merge_chance {
                used[i] = true;
                used[j] = true;
                pairs.push((*a, *b));
                break;
            }
        }
    }

    pairs
        .into_iter()
        .map(|(a, b)| merge_pair(world, zones, coord, a, b, factions, config, rng))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn merge_pair(
    world: &mut World,
    zones: &mut ZoneStore,
    coord: ZoneCoord,
    a: Candidate,
    b: Candidate,
    factions: &mut FactionRegistry,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Merge {
    let inventory = {
        let empty = Inventory::default();
        let ia = world.get::<&Inventory>(a.entity).ok();
        let ib = world.get::<&Inventory>(b.entity).ok();
        Inventory::union(ia.as_deref().unwrap_or(&empty), ib.as_deref().unwrap_or(&empty))
    };
    let name = world.get::<&Name>(a.entity).ok().map(|n| (*n).clone());
    let focus = world.get::<&Focus>(a.entity).ok().map(|f| (*f).clone());

    let level = a.level + 1;
    let merged = spawn_creature(world, zones, a.creature.kind, coord, a.cell, level, config, rng);
    let creature = Creature {
        kind: a.creature.kind,
        doubled: true,
    };
    let _ = world.insert(
        merged,
        (
            creature,
            inventory,
            Vitals::full(creature.max_health(level)),
        ),
    );
    if let Some(name) = name {
        let _ = world.insert_one(merged, name);
    }
    if let Some(focus) = focus {
        let _ = world.insert_one(merged, focus);
    }

    factions.replace_member(world, a.entity, merged);
    factions.remove_member(world, b.entity);
    for consumed in [a.entity, b.entity] {
        zones.remove_member(coord, consumed);
        let _ = world.despawn(consumed);
    }

    info!(kind = %creature.label(), level, zone = %coord, "creatures merged");
    Merge {
        consumed: [a.entity, b.entity],
        merged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::items::Item;
    use wildgrid_logic::species::{AnimalKind, CreatureKind};

    fn setup() -> (World, ZoneStore, SimConfig, ChaCha8Rng) {
        let mut config = SimConfig::default();
        config.ai.merge_chance = 1.0;
        let mut zones = ZoneStore::new(8);
        zones.ensure(ZoneCoord::ORIGIN, &config.biomes);
        (World::new(), zones, config, ChaCha8Rng::seed_from_u64(8))
    }

    fn wolf(world: &mut World, zones: &mut ZoneStore, cell: CellPos, config: &SimConfig, rng: &mut ChaCha8Rng) -> Entity {
        spawn_creature(
            world,
            zones,
            CreatureKind::Animal(AnimalKind::Wolf),
            ZoneCoord::ORIGIN,
            cell,
            1,
            config,
            rng,
        )
    }

    #[test]
    fn adjacent_idle_twins_merge() {
        let (mut world, mut zones, config, mut rng) = setup();
        let a = wolf(&mut world, &mut zones, CellPos::new(5, 5), &config, &mut rng);
        let b = wolf(&mut world, &mut zones, CellPos::new(6, 6), &config, &mut rng);
        let mut factions = FactionRegistry::new();

        let merges = merge_system(
            &mut world,
            &mut zones,
            ZoneCoord::ORIGIN,
            &mut factions,
            &Enchantments::new(),
            &config,
            &mut rng,
        );
        assert_eq!(merges.len(), 1);
        let merged = merges[0].merged;

        assert!(!world.contains(a) && !world.contains(b));
        assert_eq!(zones.members(ZoneCoord::ORIGIN), vec![merged]);
        let creature = *world.get::<&Creature>(merged).unwrap();
        assert!(creature.doubled);
        assert_eq!(creature.label(), "wolf_double");
        assert_eq!(world.get::<&Progression>(merged).unwrap().level, 2);
        assert_eq!(world.get::<&Vitals>(merged).unwrap().health, creature.max_health(2));
    }

    #[test]
    fn inventories_are_combined() {
        let (mut world, mut zones, config, mut rng) = setup();
        let a = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Peaceful(wildgrid_logic::species::PeacefulRole::Miner),
            ZoneCoord::ORIGIN,
            CellPos::new(5, 5),
            1,
            &config,
            &mut rng,
        );
        let b = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Peaceful(wildgrid_logic::species::PeacefulRole::Miner),
            ZoneCoord::ORIGIN,
            CellPos::new(5, 6),
            1,
            &config,
            &mut rng,
        );
        world.get::<&mut Inventory>(a).unwrap().add(Item::Stone, 4);
        world.get::<&mut Inventory>(b).unwrap().add(Item::Stone, 3);
        let name = world.get::<&Name>(a).unwrap().full();

        let merges = merge_system(
            &mut world,
            &mut zones,
            ZoneCoord::ORIGIN,
            &mut FactionRegistry::new(),
            &Enchantments::new(),
            &config,
            &mut rng,
        );
        let merged = merges[0].merged;
        assert_eq!(world.get::<&Inventory>(merged).unwrap().count(Item::Stone), 7);
        assert_eq!(world.get::<&Name>(merged).unwrap().full(), name);
    }

    #[test]
    fn distant_or_busy_creatures_stay_apart() {
        let (mut world, mut zones, config, mut rng) = setup();
        wolf(&mut world, &mut zones, CellPos::new(3, 3), &config, &mut rng);
        wolf(&mut world, &mut zones, CellPos::new(8, 8), &config, &mut rng);
        let c = wolf(&mut world, &mut zones, CellPos::new(8, 9), &config, &mut rng);
        world.get::<&mut Brain>(c).unwrap().state = AiState::Wandering;

        let merges = merge_system(
            &mut world,
            &mut zones,
            ZoneCoord::ORIGIN,
            &mut FactionRegistry::new(),
            &Enchantments::new(),
            &config,
            &mut rng,
        );
        assert!(merges.is_empty());
        assert_eq!(zones.member_count(ZoneCoord::ORIGIN), 3);
    }

    #[test]
    fn doubled_creatures_never_merge_again() {
        let (mut world, mut zones, config, mut rng) = setup();
        let a = wolf(&mut world, &mut zones, CellPos::new(5, 5), &config, &mut rng);
        let b = wolf(&mut world, &mut zones, CellPos::new(5, 6), &config, &mut rng);
        for e in [a, b] {
            world.get::<&mut Creature>(e).unwrap().doubled = true;
        }
        let merges = merge_system(
            &mut world,
            &mut zones,
            ZoneCoord::ORIGIN,
            &mut FactionRegistry::new(),
            &Enchantments::new(),
            &config,
            &mut rng,
        );
        assert!(merges.is_empty());
    }
}
