//! Applying AI intents: steps, attacks and work on cells
//!
//! Intents are applied in the order they were produced. Each one is
//! re-validated against the current state first, since an earlier intent
//! in the same pass may have moved, killed or changed its target.

use std::collections::BTreeSet;

use hecs::{Entity, World};
use rand::Rng;
use tracing::{debug, trace};
use wildgrid_logic::cells::CellType;
use wildgrid_logic::config::SimConfig;
use wildgrid_logic::constants::xp_rewards;
use wildgrid_logic::items::{Inventory, Item};
use wildgrid_logic::species::{CreatureKind, WorkAction};

use crate::components::*;
use crate::systems::ai::{cell_matches, Intent};
use crate::systems::progression::grant_xp;
use crate::zones::ZoneStore;

/// One death caused by an attack this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub victim: Target,
    pub victim_kind: Option<CreatureKind>,
    pub killer: Target,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionReport {
    pub steps: usize,
    pub attacks: usize,
    pub acts: usize,
    pub houses_built: usize,
    pub kills: Vec<Kill>,
}

/// Apply intents for the creatures of one zone.
pub fn apply_intents(
    world: &mut World,
    zones: &mut ZoneStore,
    coord: ZoneCoord,
    intents: &[(Entity, Intent)],
    mut player: Option<&mut Player>,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> ActionReport {
    let mut report = ActionReport::default();
    let mut occupied: BTreeSet<CellPos> = zones
        .get(coord)
        .map(|z| {
            z.members
                .iter()
                .filter_map(|e| world.get::<&Position>(*e).ok().map(|p| p.cell))
                .collect()
        })
        .unwrap_or_default();
    if let Some(p) = player.as_deref().filter(|p| p.zone() == coord) {
        occupied.insert(p.cell());
    }

    for &(entity, intent) in intents {
        if !is_alive(world, entity) {
            continue;
        }
        match intent {
            Intent::Stay => {}
            Intent::Step(to) => {
                if step(world, zones, coord, entity, to, &mut occupied) {
                    report.steps += 1;
                }
            }
            Intent::Attack(target) => {
                if let Some(kill) = attack(world, entity, target, player.as_deref_mut(), config, rng) {
                    report.kills.push(kill);
                }
                report.attacks += 1;
            }
            Intent::Act { cell, purpose } => {
                let Some(zone) = zones.get_mut(coord) else {
                    continue;
                };
                match act(world, zone, entity, cell, purpose, config, rng) {
                    Some(ActOutcome::Built) => {
                        report.acts += 1;
                        report.houses_built += 1;
                    }
                    Some(ActOutcome::Done) => report.acts += 1,
                    None => {}
                }
            }
        }
    }
    report
}

fn is_alive(world: &World, entity: Entity) -> bool {
    world
        .get::<&Vitals>(entity)
        .is_ok_and(|v| !v.is_dead())
}

fn step(
    world: &mut World,
    zones: &ZoneStore,
    coord: ZoneCoord,
    entity: Entity,
    to: CellPos,
    occupied: &mut BTreeSet<CellPos>,
) -> bool {
    let walkable = zones
        .get(coord)
        .is_some_and(|z| !to.on_border() && z.walkable(to));
    if !walkable || occupied.contains(&to) {
        return false;
    }
    let from = {
        let Ok(mut pos) = world.get::<&mut Position>(entity) else {
            return false;
        };
        if pos.zone != coord || pos.cell.manhattan(to) != 1 {
            return false;
        }
        let from = pos.cell;
        pos.move_to(to);
        from
    };
    occupied.remove(&from);
    occupied.insert(to);
    if let Ok(mut memory) = world.get::<&mut MemoryLane>(entity) {
        memory.remember(from);
    }
    true
}

/// Raw damage for one blow from `attacker`.
pub fn blow_damage(strength: f32, config: &SimConfig, rng: &mut impl Rng) -> f32 {
    strength * config.ai.damage_scale * rng.gen_range(0.8..=1.2)
}

/// Damage a creature. Returns whether the blow was fatal.
pub fn strike_creature(world: &mut World, victim: Entity, attacker: Target, amount: f32) -> bool {
    let max_health = max_health_of(world, victim);
    let fatal = match world.get::<&mut Vitals>(victim) {
        Ok(mut vitals) => vitals.damage(amount, max_health),
        Err(_) => return false,
    };
    if let Ok(mut brain) = world.get::<&mut Brain>(victim) {
        brain.provoked_by = Some(attacker);
    }
    fatal
}

pub fn max_health_of(world: &World, entity: Entity) -> f32 {
    let level = world.get::<&Progression>(entity).map(|p| p.level).unwrap_or(1);
    world
        .get::<&Creature>(entity)
        .map(|c| c.max_health(level))
        .unwrap_or(0.0)
}

fn attack(
    world: &mut World,
    attacker: Entity,
    target: Target,
    player: Option<&mut Player>,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Option<Kill> {
    let (zone, cell, strength, hunter) = {
        let pos = world.get::<&Position>(attacker).ok()?;
        let creature = world.get::<&Creature>(attacker).ok()?;
        let level = world.get::<&Progression>(attacker).map(|p| p.level).unwrap_or(1);
        (
            pos.zone,
            pos.cell,
            creature.strength(level),
            creature.behavior().hunts.is_some(),
        )
    };
    let amount = blow_damage(strength, config, rng);

    let (fatal, victim_kind) = match target {
        Target::Creature(victim) => {
            if victim == attacker || !is_alive(world, victim) {
                return None;
            }
            let reachable = world
                .get::<&Position>(victim)
                .is_ok_and(|p| p.zone == zone && p.cell.chebyshev(cell) <= 1);
            if !reachable {
                return None;
            }
            let kind = world.get::<&Creature>(victim).ok().map(|c| c.kind);
            let fatal = strike_creature(world, victim, Target::Creature(attacker), amount);
            (fatal, kind)
        }
        Target::Player => {
            let player = player?;
            if player.zone() != zone || player.cell().chebyshev(cell) > 1 || player.vitals.is_dead() {
                return None;
            }
            let max = player.max_health();
            player.interrupt_autopilot();
            (player.vitals.damage(amount, max), None)
        }
        Target::Cell(_) => return None,
    };
    trace!(?attacker, ?target, damage = amount, fatal, "attack");

    if !fatal {
        return None;
    }
    grant_xp(world, attacker, xp_rewards::KILL, &config.leveling, rng);
    if hunter {
        if let Ok(mut vitals) = world.get::<&mut Vitals>(attacker) {
            vitals.eat(config.survival.restore_amount);
        }
    }
    Some(Kill {
        victim: target,
        victim_kind,
        killer: Target::Creature(attacker),
    })
}

enum ActOutcome {
    Done,
    Built,
}

fn act(
    world: &mut World,
    zone: &mut Zone,
    entity: Entity,
    cell: CellPos,
    purpose: Purpose,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Option<ActOutcome> {
    let (here, behavior) = {
        let pos = world.get::<&Position>(entity).ok()?;
        let creature = world.get::<&Creature>(entity).ok()?;
        (pos.cell, creature.behavior())
    };
    let kind = zone.grid.kind_at(cell)?;
    if here.chebyshev(cell) > 1 || !cell_matches(kind, purpose, behavior) {
        return None;
    }
    let restore = config.survival.restore_amount;

    let mut xp = 0;
    let mut outcome = ActOutcome::Done;
    match purpose {
        Purpose::Eat => {
            with_vitals(world, entity, |v| v.eat(restore));
            if kind.is_crop() || (kind == CellType::Grass && rng.gen::<f32>() < 0.3) {
                zone.grid.set_kind(cell, CellType::Dirt);
            }
        }
        Purpose::Drink => with_vitals(world, entity, |v| v.drink(restore)),
        Purpose::Build => {
            let spawning = &config.spawning;
            if zone.houses_built as usize >= spawning.max_houses_per_zone {
                return None;
            }
            if !with_inventory(world, entity, |inv| inv.remove(Item::Wood, spawning.house_wood_cost)) {
                return None;
            }
            zone.grid.set_kind(cell, CellType::House);
            zone.houses_built += 1;
            xp = xp_rewards::BUILD;
            outcome = ActOutcome::Built;
            debug!(zone = %zone.coord, ?cell, "house built");
        }
        Purpose::Work(action) => {
            if rng.gen::<f32>() >= behavior.work_success {
                return None;
            }
            xp = work(world, zone, entity, cell, kind, action, restore, rng)?;
        }
        Purpose::Hunt | Purpose::Explore => return None,
    }

    zone.touched = true;
    if xp > 0 {
        grant_xp(world, entity, xp, &config.leveling, rng);
    }
    Some(outcome)
}

/// Carry out one unit of work. Returns the XP earned.
#[allow(clippy::too_many_arguments)]
fn work(
    world: &mut World,
    zone: &mut Zone,
    entity: Entity,
    cell: CellPos,
    kind: CellType,
    action: WorkAction,
    restore: f32,
    rng: &mut impl Rng,
) -> Option<u32> {
    let grid = &mut zone.grid;
    let xp = match action {
        WorkAction::Graze => {
            with_vitals(world, entity, |v| v.eat(restore));
            grid.set_kind(cell, CellType::Dirt);
            0
        }
        WorkAction::Farm => match kind {
            CellType::Carrot3 => {
                grid.set_kind(cell, CellType::Soil);
                with_inventory(world, entity, |inv| inv.add(Item::Carrot, 2) < 2);
                xp_rewards::HARVEST
            }
            CellType::Carrot2 => {
                let c = grid.get_mut(cell)?;
                c.progress = (c.progress + 0.25).min(1.0);
                0
            }
            CellType::Soil => {
                let planted = with_inventory(world, entity, |inv| {
                    inv.remove(Item::Seeds, 1) || inv.remove(Item::Carrot, 1)
                });
                if !planted {
                    return None;
                }
                grid.set_kind(cell, CellType::Carrot1);
                xp_rewards::HARVEST
            }
            _ => {
                grid.set_kind(cell, CellType::Soil);
                0
            }
        },
        WorkAction::Chop => {
            grid.set_kind(cell, CellType::Grass);
            with_inventory(world, entity, |inv| inv.add(Item::Wood, 2) < 2);
            xp_rewards::CHOP
        }
        WorkAction::Gnaw => {
            grid.set_kind(cell, CellType::Dirt);
            0
        }
        WorkAction::Mine => {
            grid.set_kind(cell, CellType::Dirt);
            with_inventory(world, entity, |inv| {
                inv.add(Item::Stone, 1);
                if rng.gen::<f32>() < 0.1 {
                    inv.add(Item::IronOre, 1);
                }
                true
            });
            xp_rewards::MINE
        }
        WorkAction::Trade => {
            with_inventory(world, entity, |inv| inv.add(Item::Gold, 1) == 0);
            xp_rewards::HARVEST
        }
        WorkAction::Forge => {
            let forged = with_inventory(world, entity, |inv| {
                inv.remove(Item::Wood, 1) && inv.add(Item::Planks, 1) == 0
            });
            if !forged {
                return None;
            }
            xp_rewards::HARVEST
        }
    };
    Some(xp)
}

fn with_vitals(world: &World, entity: Entity, f: impl FnOnce(&mut Vitals)) {
    if let Ok(mut vitals) = world.get::<&mut Vitals>(entity) {
        f(&mut vitals);
    }
}

fn with_inventory(world: &World, entity: Entity, f: impl FnOnce(&mut Inventory) -> bool) -> bool {
    match world.get::<&mut Inventory>(entity) {
        Ok(mut inv) => f(&mut inv),
        Err(_) => false,
    }
}
