//! Player movement, direct actions, survival and autopilot

use hecs::{Entity, World};
use rand::Rng;
use thiserror::Error;
use tracing::info;
use wildgrid_logic::biome::BiomeTable;
use wildgrid_logic::cells::CellType;
use wildgrid_logic::config::{LevelingConfig, SimConfig, SurvivalConfig};
use wildgrid_logic::constants::xp_rewards;
use wildgrid_logic::health::apply_xp;
use wildgrid_logic::items::{Item, ItemStack};
use wildgrid_logic::species::CreatureKind;

use crate::components::*;
use crate::systems::actions::{blow_damage, strike_creature};
use crate::systems::loot::DroppedItems;
use crate::systems::survival::{shelter_at, tick_vitals};
use crate::zones::ZoneStore;

/// Result of one movement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerMove {
    Moved,
    /// Walked through an exit into the neighbouring zone.
    Crossed { from: ZoneCoord, to: ZoneCoord },
    Blocked,
}

/// Things the player can do to an adjacent cell or creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    /// Carrot3, trees, stone and flowers.
    Harvest(CellPos),
    Till(CellPos),
    Plant(CellPos),
    BuildCamp(CellPos),
    Attack(Entity),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("the player is dead")]
    Dead,
    #[error("cell ({}, {}) is out of reach", .0.x, .0.y)]
    OutOfReach(CellPos),
    #[error("cannot {action} a {cell:?} cell")]
    WrongCell { action: &'static str, cell: CellType },
    #[error("needs {needed} {item:?}")]
    Missing { item: Item, needed: u32 },
    #[error("no creature to attack")]
    NoTarget,
}

/// What a successful action produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub xp: u32,
    pub killed: Option<(Entity, CreatureKind)>,
}

/// Grant XP to the player. Returns the new level on a level-up, which
/// fully heals.
pub fn grant_player_xp(player: &mut Player, amount: u32, config: &LevelingConfig) -> Option<u32> {
    let gain = apply_xp(player.level, player.xp, amount, config);
    player.level = gain.level;
    player.xp = gain.xp;
    if gain.levels_gained == 0 {
        return None;
    }
    player.vitals.health = player.max_health();
    info!(level = gain.level, "player leveled up");
    Some(gain.level)
}

/// Move one cell. Stepping out through an open exit enters the
/// neighbouring zone, generating it if needed.
pub fn move_player(player: &mut Player, zones: &mut ZoneStore, dir: Direction, table: &BiomeTable) -> PlayerMove {
    if player.vitals.is_dead() {
        return PlayerMove::Blocked;
    }
    let here = player.zone();
    let to = player.cell().step(dir);

    if to.in_bounds() {
        let walkable = zones.get(here).is_some_and(|z| z.walkable(to));
        if !walkable {
            return PlayerMove::Blocked;
        }
        player.position.move_to(to);
        return PlayerMove::Moved;
    }

    let leaving = zones
        .get(here)
        .and_then(|z| z.exit_open(player.cell()))
        .is_some_and(|side| side == dir);
    if !leaving {
        return PlayerMove::Blocked;
    }
    let next = here.neighbor(dir);
    zones.ensure(next, table);
    let arrival = mirror_across(player.cell(), dir);
    let open = zones.get(next).is_some_and(|z| z.walkable(arrival));
    if !open {
        return PlayerMove::Blocked;
    }
    player.position = Position::new(next, arrival);
    PlayerMove::Crossed { from: here, to: next }
}

/// The cell on the far side of an edge crossing.
fn mirror_across(cell: CellPos, dir: Direction) -> CellPos {
    let right = wildgrid_logic::constants::GRID_WIDTH as i32 - 1;
    let bottom = wildgrid_logic::constants::GRID_HEIGHT as i32 - 1;
    match dir {
        Direction::North => CellPos::new(cell.x, bottom),
        Direction::South => CellPos::new(cell.x, 0),
        Direction::East => CellPos::new(0, cell.y),
        Direction::West => CellPos::new(right, cell.y),
    }
}

/// Perform a direct action. Any action interrupts the autopilot.
pub fn perform_action(
    world: &mut World,
    zones: &mut ZoneStore,
    loot: &mut DroppedItems,
    player: &mut Player,
    action: PlayerAction,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Result<ActionOutcome, ActionError> {
    if player.vitals.is_dead() {
        return Err(ActionError::Dead);
    }
    player.interrupt_autopilot();

    if let PlayerAction::Attack(target) = action {
        return attack_creature(world, player, target, config, rng);
    }

    let (cell, action_name) = match action {
        PlayerAction::Harvest(c) => (c, "harvest"),
        PlayerAction::Till(c) => (c, "till"),
        PlayerAction::Plant(c) => (c, "plant"),
        PlayerAction::BuildCamp(c) => (c, "build on"),
        PlayerAction::Attack(_) => return Err(ActionError::NoTarget),
    };
    if cell.chebyshev(player.cell()) > 1 {
        return Err(ActionError::OutOfReach(cell));
    }
    let coord = player.zone();
    let zone = zones.get_mut(coord).ok_or(ActionError::OutOfReach(cell))?;
    let kind = zone.grid.kind_at(cell).ok_or(ActionError::OutOfReach(cell))?;
    let wrong = || ActionError::WrongCell {
        action: action_name,
        cell: kind,
    };

    let mut gained: Vec<ItemStack> = Vec::new();
    let (next, xp) = match action {
        PlayerAction::Harvest(_) => match kind {
            CellType::Carrot3 => {
                gained.push(ItemStack::new(Item::Carrot, 2));
                (CellType::Soil, xp_rewards::HARVEST)
            }
            CellType::Tree1 | CellType::Tree2 => {
                gained.push(ItemStack::new(Item::Wood, 2));
                (CellType::Grass, xp_rewards::CHOP)
            }
            CellType::Stone => {
                gained.push(ItemStack::new(Item::Stone, 1));
                if rng.gen::<f32>() < 0.1 {
                    gained.push(ItemStack::new(Item::IronOre, 1));
                }
                (CellType::Dirt, xp_rewards::MINE)
            }
            CellType::Flower => {
                gained.push(ItemStack::new(Item::Seeds, 1));
                (CellType::Grass, xp_rewards::HARVEST)
            }
            _ => return Err(wrong()),
        },
        PlayerAction::Till(_) => match kind {
            CellType::Grass | CellType::Dirt => (CellType::Soil, 0),
            _ => return Err(wrong()),
        },
        PlayerAction::Plant(_) => {
            if kind != CellType::Soil {
                return Err(wrong());
            }
            let inv = &mut player.inventory;
            if !(inv.remove(Item::Seeds, 1) || inv.remove(Item::Carrot, 1)) {
                return Err(ActionError::Missing {
                    item: Item::Carrot,
                    needed: 1,
                });
            }
            (CellType::Carrot1, xp_rewards::HARVEST)
        }
        PlayerAction::BuildCamp(_) => {
            if !matches!(kind, CellType::Grass | CellType::Dirt) {
                return Err(wrong());
            }
            let cost = config.spawning.camp_wood_cost;
            if !player.inventory.remove(Item::Wood, cost) {
                return Err(ActionError::Missing {
                    item: Item::Wood,
                    needed: cost,
                });
            }
            (CellType::Camp, xp_rewards::BUILD)
        }
        PlayerAction::Attack(_) => return Err(ActionError::NoTarget),
    };

    zone.grid.set_kind(cell, next);
    zone.touched = true;
    for stack in gained {
        let overflow = player.inventory.add(stack.item, stack.count);
        loot.drop_stack(coord, player.cell(), ItemStack::new(stack.item, overflow));
    }
    if xp > 0 {
        grant_player_xp(player, xp, &config.leveling);
    }
    Ok(ActionOutcome { xp, killed: None })
}

fn attack_creature(
    world: &mut World,
    player: &mut Player,
    target: Entity,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Result<ActionOutcome, ActionError> {
    let (kind, reachable) = {
        let pos = world.get::<&Position>(target).map_err(|_| ActionError::NoTarget)?;
        let creature = world.get::<&Creature>(target).map_err(|_| ActionError::NoTarget)?;
        let reachable = pos.zone == player.zone() && pos.cell.chebyshev(player.cell()) <= 1;
        (creature.kind, reachable)
    };
    if !reachable {
        return Err(ActionError::NoTarget);
    }
    let damage = blow_damage(player.strength(), config, rng);
    if !strike_creature(world, target, Target::Player, damage) {
        return Ok(ActionOutcome::default());
    }
    grant_player_xp(player, xp_rewards::KILL, &config.leveling);
    Ok(ActionOutcome {
        xp: xp_rewards::KILL,
        killed: Some((target, kind)),
    })
}

/// Pick up whatever lies on the player's cell.
pub fn pick_up(player: &mut Player, loot: &mut DroppedItems) -> u32 {
    let (zone, cell) = (player.zone(), player.cell());
    loot.pick_up(zone, cell, &mut player.inventory)
}

/// Needs and healing for the player, who ages but never dies of it.
pub fn player_survival(player: &mut Player, zone: &Zone, dt: u32, config: &SurvivalConfig) {
    if player.vitals.is_dead() {
        return;
    }
    let max = player.max_health();
    let shelter = shelter_at(zone, player.cell());
    tick_vitals(&mut player.vitals, max, None, false, shelter, dt, config);
}

/// Bring a dead player back at the origin, leaving the pack where they fell.
pub fn respawn_if_dead(player: &mut Player, loot: &mut DroppedItems) -> bool {
    if !player.vitals.is_dead() {
        return false;
    }
    for stack in player.inventory.drain() {
        loot.drop_stack(player.zone(), player.cell(), stack);
    }
    player.deaths += 1;
    info!(zone = %player.zone(), deaths = player.deaths, "player died");
    player.position = Position::new(ZoneCoord::ORIGIN, CellPos::center());
    player.vitals = Vitals::full(player.max_health());
    player.interrupt_autopilot();
    true
}

/// Next direction for the autopilot heading to `goal`, if any.
///
/// Across zones it walks to the exit facing the goal zone; inside a
/// zone it steps along the longer axis, trying the other axis when blocked.
pub fn autopilot_step(player: &Player, zones: &ZoneStore, goal: (ZoneCoord, CellPos)) -> Option<Direction> {
    let zone = zones.get(player.zone())?;
    let here = player.cell();
    let (goal_zone, goal_cell) = goal;

    let waypoint = if goal_zone == player.zone() {
        goal_cell
    } else {
        let (dx, dy) = (goal_zone.x - player.zone().x, goal_zone.y - player.zone().y);
        let dir = if dx.abs() >= dy.abs() {
            if dx > 0 { Direction::East } else { Direction::West }
        } else if dy > 0 {
            Direction::South
        } else {
            Direction::North
        };
        if !zone.exits.open(dir) {
            return None;
        }
        if zone.exit_open(here) == Some(dir) {
            return Some(dir);
        }
        let exits = Exits::cells(dir);
        *exits.iter().min_by_key(|c| c.manhattan(here))?
    };

    if waypoint == here {
        return None;
    }
    let (dx, dy) = (waypoint.x - here.x, waypoint.y - here.y);
    let horizontal = here.offset(dx.signum(), 0);
    let vertical = here.offset(0, dy.signum());
    let steps = if dx.abs() >= dy.abs() {
        [horizontal, vertical]
    } else {
        [vertical, horizontal]
    };
    steps
        .into_iter()
        .filter(|c| *c != here && (*c == waypoint || zone.walkable(*c)))
        .find_map(|c| direction_between(here, c))
}

fn direction_between(from: CellPos, to: CellPos) -> Option<Direction> {
    Direction::ALL.into_iter().find(|d| from.step(*d) == to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::species::AnimalKind;

    use crate::generation::creatures::spawn_creature;

    fn setup() -> (World, ZoneStore, Player, SimConfig, ChaCha8Rng) {
        let config = SimConfig::default();
        let mut zones = ZoneStore::new(42);
        zones.ensure(ZoneCoord::ORIGIN, &config.biomes);
        let zone = zones.get_mut(ZoneCoord::ORIGIN).unwrap();
        for p in (0..CellGrid::LEN).map(CellPos::from_index) {
            if !p.on_border() {
                zone.grid.set_kind(p, CellType::Grass);
            }
        }
        let player = Player::new(ZoneCoord::ORIGIN, CellPos::center());
        (World::new(), zones, player, config, ChaCha8Rng::seed_from_u64(42))
    }

    #[test]
    fn walls_block_and_grass_does_not() {
        let (_, mut zones, mut player, config, _) = setup();
        assert_eq!(move_player(&mut player, &mut zones, Direction::East, &config.biomes), PlayerMove::Moved);
        player.position = Position::new(ZoneCoord::ORIGIN, CellPos::new(1, 1));
        assert_eq!(move_player(&mut player, &mut zones, Direction::North, &config.biomes), PlayerMove::Blocked);
    }

    #[test]
    fn walking_through_an_exit_enters_the_neighbour() {
        let (_, mut zones, mut player, config, _) = setup();
        let [exit, _] = Exits::cells(Direction::East);
        player.position = Position::new(ZoneCoord::ORIGIN, exit);

        let outcome = move_player(&mut player, &mut zones, Direction::East, &config.biomes);
        assert_eq!(
            outcome,
            PlayerMove::Crossed {
                from: ZoneCoord::ORIGIN,
                to: ZoneCoord::new(1, 0)
            }
        );
        assert_eq!(player.zone(), ZoneCoord::new(1, 0));
        assert_eq!(player.cell(), CellPos::new(0, exit.y));
        assert!(zones.contains(ZoneCoord::new(1, 0)));
    }

    #[test]
    fn farming_by_hand() {
        let (mut world, mut zones, mut player, config, mut rng) = setup();
        let mut loot = DroppedItems::new();
        let plot = player.cell().offset(1, 0);

        perform_action(&mut world, &mut zones, &mut loot, &mut player, PlayerAction::Till(plot), &config, &mut rng).unwrap();
        let err = perform_action(&mut world, &mut zones, &mut loot, &mut player, PlayerAction::Plant(plot), &config, &mut rng);
        assert_eq!(err, Err(ActionError::Missing { item: Item::Carrot, needed: 1 }));

        player.inventory.add(Item::Carrot, 1);
        perform_action(&mut world, &mut zones, &mut loot, &mut player, PlayerAction::Plant(plot), &config, &mut rng).unwrap();
        let zone = zones.get_mut(ZoneCoord::ORIGIN).unwrap();
        assert_eq!(zone.grid.kind_at(plot), Some(CellType::Carrot1));
        zone.grid.set_kind(plot, CellType::Carrot3);

        let outcome = perform_action(&mut world, &mut zones, &mut loot, &mut player, PlayerAction::Harvest(plot), &config, &mut rng).unwrap();
        assert_eq!(outcome.xp, xp_rewards::HARVEST);
        assert_eq!(player.inventory.count(Item::Carrot), 2);
        assert_eq!(zones.get(ZoneCoord::ORIGIN).unwrap().grid.kind_at(plot), Some(CellType::Soil));
    }

    #[test]
    fn camps_cost_wood() {
        let (mut world, mut zones, mut player, config, mut rng) = setup();
        let mut loot = DroppedItems::new();
        let site = player.cell().offset(0, 1);
        let build = PlayerAction::BuildCamp(site);
        assert!(perform_action(&mut world, &mut zones, &mut loot, &mut player, build, &config, &mut rng).is_err());

        player.inventory.add(Item::Wood, config.spawning.camp_wood_cost);
        perform_action(&mut world, &mut zones, &mut loot, &mut player, build, &config, &mut rng).unwrap();
        assert_eq!(player.inventory.count(Item::Wood), 0);
        assert_eq!(zones.get(ZoneCoord::ORIGIN).unwrap().grid.kind_at(site), Some(CellType::Camp));
    }

    #[test]
    fn far_cells_are_out_of_reach() {
        let (mut world, mut zones, mut player, config, mut rng) = setup();
        let far = player.cell().offset(3, 0);
        let result = perform_action(&mut world, &mut zones, &mut DroppedItems::new(), &mut player, PlayerAction::Till(far), &config, &mut rng);
        assert_eq!(result, Err(ActionError::OutOfReach(far)));
    }

    #[test]
    fn attacking_provokes_the_victim() {
        let (mut world, mut zones, mut player, config, mut rng) = setup();
        let deer = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Animal(AnimalKind::Deer),
            ZoneCoord::ORIGIN,
            player.cell().offset(1, 1),
            1,
            &config,
            &mut rng,
        );
        perform_action(&mut world, &mut zones, &mut DroppedItems::new(), &mut player, PlayerAction::Attack(deer), &config, &mut rng).unwrap();
        assert_eq!(world.get::<&Brain>(deer).unwrap().provoked_by, Some(Target::Player));
        assert!(world.get::<&Vitals>(deer).unwrap().health < 30.0);
    }

    #[test]
    fn leveling_heals_the_player() {
        let config = LevelingConfig::default();
        let mut player = Player::new(ZoneCoord::ORIGIN, CellPos::center());
        player.vitals.health = 10.0;
        assert_eq!(grant_player_xp(&mut player, 100, &config), Some(2));
        assert_eq!(player.vitals.health, 200.0);
    }

    #[test]
    fn death_respawns_at_the_origin() {
        let mut player = Player::new(ZoneCoord::new(2, 2), CellPos::new(4, 4));
        let mut loot = DroppedItems::new();
        player.inventory.add(Item::Gold, 3);
        player.vitals.health = 0.0;
        assert!(respawn_if_dead(&mut player, &mut loot));
        assert_eq!(player.zone(), ZoneCoord::ORIGIN);
        assert_eq!(player.deaths, 1);
        assert_eq!(loot.at(ZoneCoord::new(2, 2), CellPos::new(4, 4)), &[ItemStack::new(Item::Gold, 3)]);
    }

    #[test]
    fn autopilot_heads_for_the_goal() {
        let (_, zones, player, _, _) = setup();
        let goal = (ZoneCoord::ORIGIN, player.cell().offset(4, 0));
        assert_eq!(autopilot_step(&player, &zones, goal), Some(Direction::East));
        let other_zone = (ZoneCoord::new(0, -1), CellPos::center());
        assert_eq!(autopilot_step(&player, &zones, other_zone), Some(Direction::North));
        let here = (ZoneCoord::ORIGIN, player.cell());
        assert_eq!(autopilot_step(&player, &zones, here), None);
    }
}
