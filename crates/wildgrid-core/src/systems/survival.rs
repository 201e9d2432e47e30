//! Survival system - hunger, thirst, healing, ageing and death

use hecs::{Entity, World};
use tracing::{debug, info};
use wildgrid_logic::cells::CellType;
use wildgrid_logic::config::SurvivalConfig;
use wildgrid_logic::health::{decay_needs, healing, survival_damage, Shelter};
use wildgrid_logic::items::{Inventory, ItemStack};
use wildgrid_logic::species::{Behavior, CreatureKind};

use crate::components::*;
use crate::systems::enchantments::Enchantments;
use crate::systems::factions::FactionRegistry;
use crate::systems::loot::DroppedItems;
use crate::zones::ZoneStore;

/// The shelter a cell offers: a camp underfoot, or a house next door.
pub fn shelter_at(zone: &Zone, cell: CellPos) -> Shelter {
    if zone.grid.kind_at(cell) == Some(CellType::Camp) {
        return Shelter::Camp;
    }
    let housed = cell.neighbors8().any(|n| {
        matches!(
            zone.grid.kind_at(n),
            Some(CellType::House | CellType::StoneHouse)
        )
    });
    if housed {
        Shelter::House
    } else {
        Shelter::Open
    }
}

/// Advance needs, healing and age for one set of vitals by `dt` ticks.
///
/// Needs decay only where the kind actually eats or drinks. Returns the
/// damage taken.
pub fn tick_vitals(
    vitals: &mut Vitals,
    max_health: f32,
    behavior: Option<&Behavior>,
    past_max_age: bool,
    shelter: Shelter,
    dt: u32,
    config: &SurvivalConfig,
) -> f32 {
    let (eats, drinks) = match behavior {
        Some(b) if !b.needs_sustenance => (false, false),
        Some(b) => (!b.food.is_empty() || b.hunts.is_some(), !b.water.is_empty()),
        None => (true, true),
    };

    let mut taken = 0.0;
    for _ in 0..dt {
        let (hunger, thirst) = decay_needs(vitals.hunger, vitals.thirst, config);
        if eats {
            vitals.hunger = hunger;
        }
        if drinks {
            vitals.thirst = thirst;
        }
        let damage = survival_damage(vitals.hunger, vitals.thirst, past_max_age, config);
        if damage > 0.0 {
            taken += damage;
            if vitals.damage(damage, max_health) {
                break;
            }
        }

        vitals.heal_timer += 1;
        if u64::from(vitals.heal_timer) >= config.healing_interval {
            vitals.heal_timer = 0;
            vitals.heal(healing(vitals.hunger, vitals.thirst, shelter, config), max_health);
        }
    }
    taken
}

/// Run survival for every unfrozen creature in one zone.
pub fn survival_system(
    world: &mut World,
    zone: &Zone,
    dt: u32,
    enchantments: &Enchantments,
    config: &SurvivalConfig,
) {
    for &entity in &zone.members {
        if enchantments.entity_frozen(entity) {
            continue;
        }
        let Ok((creature, pos, vitals, progression)) =
            world.query_one_mut::<(&Creature, &Position, &mut Vitals, &mut Progression)>(entity)
        else {
            continue;
        };
        if vitals.is_dead() {
            continue;
        }
        progression.age += u64::from(dt);
        let past_max_age = progression.age > progression.max_age;
        let max_health = creature.max_health(progression.level);
        tick_vitals(
            vitals,
            max_health,
            Some(creature.behavior()),
            past_max_age,
            shelter_at(zone, pos.cell),
            dt,
            config,
        );
    }
}

/// A creature removed from the world this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Death {
    pub entity: Entity,
    pub kind: CreatureKind,
    pub zone: ZoneCoord,
    pub cell: CellPos,
    pub name: Option<String>,
}

/// Remove every creature at zero health.
///
/// The body leaves its inventory and its kind's drops on the ground, and
/// bones on open ground. Faction and enchantment bookkeeping is cleaned up
/// so no stale handle survives the entity.
pub fn reap_dead(
    world: &mut World,
    zones: &mut ZoneStore,
    loot: &mut DroppedItems,
    factions: &mut FactionRegistry,
    enchantments: &mut Enchantments,
) -> Vec<Death> {
    let dead: Vec<Entity> = world
        .query::<&Vitals>()
        .iter()
        .filter(|(_, v)| v.is_dead())
        .map(|(e, _)| e)
        .collect();

    let mut deaths = Vec::with_capacity(dead.len());
    for entity in dead {
        let Ok(pos) = world.get::<&Position>(entity).map(|p| *p) else {
            let _ = world.despawn(entity);
            continue;
        };
        let kind = world.get::<&Creature>(entity).ok().map(|c| c.kind);
        let name = world.get::<&Name>(entity).ok().map(|n| n.full());
        let carried = world
            .get::<&mut Inventory>(entity)
            .map(|mut inv| inv.drain())
            .unwrap_or_default();

        for stack in carried {
            loot.drop_stack(pos.zone, pos.cell, stack);
        }
        if let Some(kind) = kind {
            for &(item, count) in kind.behavior().drops {
                loot.drop_stack(pos.zone, pos.cell, ItemStack::new(item, count));
            }
        }
        if let Some(zone) = zones.get_mut(pos.zone) {
            let open_ground = matches!(
                zone.grid.kind_at(pos.cell),
                Some(CellType::Grass | CellType::Dirt | CellType::Sand)
            );
            if open_ground && zone.grid.set_kind(pos.cell, CellType::Bones) {
                zone.touched = true;
            }
        }

        zones.remove_member(pos.zone, entity);
        let _ = world.despawn(entity);
        factions.forget(world, entity);
        enchantments.forget_entity(entity);

        let Some(kind) = kind else {
            continue;
        };
        match &name {
            Some(name) => info!(name = %name, zone = %pos.zone, "npc died"),
            None => debug!(kind = %kind, zone = %pos.zone, "creature died"),
        }
        deaths.push(Death {
            entity,
            kind,
            zone: pos.zone,
            cell: pos.cell,
            name,
        });
    }
    deaths
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::config::SimConfig;
    use wildgrid_logic::constants::MAX_NEED;
    use wildgrid_logic::items::Item;
    use wildgrid_logic::species::{AnimalKind, HostileKind, PeacefulRole};

    use crate::generation::creatures::spawn_creature;
    use crate::systems::enchantments::EnchantTarget;

    fn world_with(kind: CreatureKind) -> (World, ZoneStore, Entity, SimConfig) {
        let config = SimConfig::default();
        let mut world = World::new();
        let mut zones = ZoneStore::new(11);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        zones.ensure(ZoneCoord::ORIGIN, &config.biomes);
        if let Some(zone) = zones.get_mut(ZoneCoord::ORIGIN) {
            zone.grid.set_kind(CellPos::center(), CellType::Grass);
        }
        let e = spawn_creature(
            &mut world,
            &mut zones,
            kind,
            ZoneCoord::ORIGIN,
            CellPos::center(),
            1,
            &config,
            &mut rng,
        );
        (world, zones, e, config)
    }

    #[test]
    fn needs_decay_per_tick() {
        let (mut world, zones, sheep, config) = world_with(CreatureKind::Animal(AnimalKind::Sheep));
        let zone = zones.get(ZoneCoord::ORIGIN).unwrap();
        survival_system(&mut world, zone, 100, &Enchantments::new(), &config.survival);

        let vitals = world.get::<&Vitals>(sheep).unwrap();
        assert!((vitals.hunger - (MAX_NEED - 100.0 * config.survival.hunger_decay)).abs() < 1e-3);
        assert!((vitals.thirst - (MAX_NEED - 100.0 * config.survival.thirst_decay)).abs() < 1e-3);
        assert_eq!(world.get::<&Progression>(sheep).unwrap().age, 100);
    }

    #[test]
    fn skeletons_do_not_hunger() {
        let (mut world, zones, skeleton, config) = world_with(CreatureKind::Hostile(HostileKind::Skeleton));
        let zone = zones.get(ZoneCoord::ORIGIN).unwrap();
        survival_system(&mut world, zone, 1_000, &Enchantments::new(), &config.survival);
        let vitals = world.get::<&Vitals>(skeleton).unwrap();
        assert_eq!(vitals.hunger, MAX_NEED);
        assert_eq!(vitals.thirst, MAX_NEED);
    }

    #[test]
    fn starvation_damages_and_clamps_at_zero() {
        let (mut world, zones, sheep, config) = world_with(CreatureKind::Animal(AnimalKind::Sheep));
        {
            let mut vitals = world.get::<&mut Vitals>(sheep).unwrap();
            vitals.hunger = 0.0;
            vitals.thirst = 0.0;
        }
        let zone = zones.get(ZoneCoord::ORIGIN).unwrap();
        survival_system(&mut world, zone, 10_000, &Enchantments::new(), &config.survival);
        let vitals = world.get::<&Vitals>(sheep).unwrap();
        assert_eq!(vitals.health, 0.0);
    }

    #[test]
    fn frozen_creatures_are_skipped() {
        let (mut world, zones, sheep, config) = world_with(CreatureKind::Animal(AnimalKind::Sheep));
        let mut enchantments = Enchantments::new();
        enchantments.cast(EnchantTarget::Entity(sheep), 100);
        let zone = zones.get(ZoneCoord::ORIGIN).unwrap();
        survival_system(&mut world, zone, 50, &enchantments, &config.survival);
        assert_eq!(world.get::<&Vitals>(sheep).unwrap().hunger, MAX_NEED);
    }

    #[test]
    fn healing_is_faster_by_a_house() {
        let config = SurvivalConfig::default();
        let mut open = Vitals::full(100.0);
        open.health = 50.0;
        let mut housed = open;

        tick_vitals(&mut open, 100.0, None, false, Shelter::Open, 60, &config);
        tick_vitals(&mut housed, 100.0, None, false, Shelter::House, 60, &config);
        assert!((open.health - 51.5).abs() < 1e-3);
        assert!((housed.health - 54.5).abs() < 1e-3);
    }

    #[test]
    fn shelter_detection() {
        let (_, mut zones, _, _) = world_with(CreatureKind::Animal(AnimalKind::Sheep));
        let zone = zones.get_mut(ZoneCoord::ORIGIN).unwrap();
        let spot = CellPos::new(5, 5);
        for n in spot.neighbors8() {
            zone.grid.set_kind(n, CellType::Grass);
        }
        zone.grid.set_kind(spot, CellType::Grass);
        assert_eq!(shelter_at(zone, spot), Shelter::Open);
        zone.grid.set_kind(CellPos::new(6, 6), CellType::StoneHouse);
        assert_eq!(shelter_at(zone, spot), Shelter::House);
        zone.grid.set_kind(spot, CellType::Camp);
        assert_eq!(shelter_at(zone, spot), Shelter::Camp);
    }

    #[test]
    fn reaping_drops_loot_and_leaves_bones() {
        let (mut world, mut zones, farmer, _) = world_with(CreatureKind::Peaceful(PeacefulRole::Farmer));
        world.get::<&mut Inventory>(farmer).unwrap().add(Item::Carrot, 3);
        world.get::<&mut Vitals>(farmer).unwrap().health = 0.0;

        let mut loot = DroppedItems::new();
        let mut factions = FactionRegistry::new();
        let mut enchantments = Enchantments::new();
        enchantments.cast(EnchantTarget::Entity(farmer), 100);
        let deaths = reap_dead(&mut world, &mut zones, &mut loot, &mut factions, &mut enchantments);

        assert_eq!(deaths.len(), 1);
        assert!(!world.contains(farmer));
        assert_eq!(zones.member_count(ZoneCoord::ORIGIN), 0);
        assert_eq!(loot.at(ZoneCoord::ORIGIN, CellPos::center()), &[ItemStack::new(Item::Carrot, 3)]);
        let zone = zones.get(ZoneCoord::ORIGIN).unwrap();
        assert_eq!(zone.grid.kind_at(CellPos::center()), Some(CellType::Bones));
        assert!(enchantments.is_empty());
    }
}
