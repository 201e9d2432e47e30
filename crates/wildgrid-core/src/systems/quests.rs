//! Player quest log - one quest per type, exactly one active

use hecs::{Entity, World};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wildgrid_logic::cells::CellType;
use wildgrid_logic::config::SimConfig;
use wildgrid_logic::quests::{completion_xp, QuestTargetKind, QuestType};
use wildgrid_logic::species::CreatureFilter;

use crate::components::*;
use crate::systems::player::grant_player_xp;
use crate::zones::ZoneStore;

/// How far from the player (in zones) quest targets are searched for.
const SEARCH_RADIUS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestTarget {
    /// A cell, with the type it had when assigned.
    Cell {
        zone: ZoneCoord,
        cell: CellPos,
        kind: CellType,
    },
    Entity(#[serde(with = "entity_bits")] Entity),
    Zone(ZoneCoord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub kind: QuestType,
    pub target: Option<QuestTarget>,
    /// Ticks until a new target may be assigned.
    pub cooldown: u32,
    pub completed: u32,
}

impl Quest {
    fn new(kind: QuestType) -> Self {
        Self {
            kind,
            target: None,
            cooldown: 0,
            completed: 0,
        }
    }
}

/// A finished quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestCompletion {
    pub kind: QuestType,
    pub xp: u32,
    pub level_up: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestLog {
    quests: Vec<Quest>,
    active: QuestType,
}

impl Default for QuestLog {
    fn default() -> Self {
        Self::new(QuestType::Explore)
    }
}

impl QuestLog {
    pub fn new(active: QuestType) -> Self {
        Self {
            quests: QuestType::ALL.into_iter().map(Quest::new).collect(),
            active,
        }
    }

    pub fn active_kind(&self) -> QuestType {
        self.active
    }

    pub fn active(&self) -> &Quest {
        self.quest(self.active)
    }

    pub fn quest(&self, kind: QuestType) -> &Quest {
        let index = QuestType::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        &self.quests[index]
    }

    fn active_mut(&mut self) -> &mut Quest {
        let index = QuestType::ALL
            .iter()
            .position(|k| *k == self.active)
            .unwrap_or(0);
        &mut self.quests[index]
    }

    /// Switch the active quest. Other quests keep their state.
    pub fn set_active(&mut self, kind: QuestType) {
        if self.active != kind {
            debug!(quest = ?kind, "active quest changed");
            self.active = kind;
        }
    }

    /// Every quest ticks its cooldown, active or not.
    pub fn tick(&mut self, dt: u32) {
        for quest in &mut self.quests {
            quest.cooldown = quest.cooldown.saturating_sub(dt);
        }
    }

    /// Whether the log is well formed: one quest per type, in order.
    pub fn is_valid(&self) -> bool {
        self.quests.len() == QuestType::ALL.len()
            && self.quests.iter().zip(QuestType::ALL).all(|(q, k)| q.kind == k)
    }

    /// Where the active target currently is, for the autopilot.
    pub fn target_position(&self, world: &World) -> Option<(ZoneCoord, CellPos)> {
        match self.active().target? {
            QuestTarget::Cell { zone, cell, .. } => Some((zone, cell)),
            QuestTarget::Entity(e) => world.get::<&Position>(e).ok().map(|p| (p.zone, p.cell)),
            QuestTarget::Zone(coord) => Some((coord, CellPos::center())),
        }
    }

    /// Give the active quest a target if it has none and is off cooldown.
    pub fn assign_target(
        &mut self,
        world: &World,
        zones: &ZoneStore,
        player: &Player,
        rng: &mut impl Rng,
    ) -> Option<QuestTarget> {
        let quest = *self.active();
        if quest.target.is_some() || quest.cooldown > 0 {
            return quest.target;
        }
        let target = match quest.kind.target_kind() {
            QuestTargetKind::Cell(kinds) => find_cell(zones, player, kinds),
            QuestTargetKind::Creature(filter) => find_creature(world, zones, player, filter),
            QuestTargetKind::Zone => Some(QuestTarget::Zone(far_zone(player.zone(), rng))),
        };
        if let Some(target) = target {
            debug!(quest = ?quest.kind, target = ?target, "quest target assigned");
        }
        self.active_mut().target = target;
        target
    }

    /// Check the active quest, granting XP when it completes.
    ///
    /// A rescue target that dies, or a cell target whose zone disappears,
    /// drops the target without reward.
    pub fn check_completion(
        &mut self,
        world: &World,
        zones: &ZoneStore,
        player: &mut Player,
        config: &SimConfig,
    ) -> Option<QuestCompletion> {
        let quest = *self.active();
        let target = quest.target?;
        let status = match target {
            QuestTarget::Cell { zone, cell, kind } => {
                match zones.get(zone).and_then(|z| z.grid.kind_at(cell)) {
                    None => Status::Lost,
                    Some(now) if quest.kind == QuestType::Search => {
                        if reached(player, zone, cell) {
                            Status::Done
                        } else if now != kind {
                            Status::Lost
                        } else {
                            Status::Pending
                        }
                    }
                    Some(now) if now != kind => Status::Done,
                    Some(_) => Status::Pending,
                }
            }
            QuestTarget::Entity(e) => {
                let alive = world.get::<&Vitals>(e).map(|v| !v.is_dead()).unwrap_or(false);
                if !alive {
                    if quest.kind.completes_on_target_death() {
                        Status::Done
                    } else {
                        Status::Lost
                    }
                } else if quest.kind == QuestType::Rescue {
                    let adjacent = world
                        .get::<&Position>(e)
                        .map(|p| reached(player, p.zone, p.cell))
                        .unwrap_or(false);
                    if adjacent {
                        Status::Done
                    } else {
                        Status::Pending
                    }
                } else {
                    Status::Pending
                }
            }
            QuestTarget::Zone(coord) => {
                if player.zone() == coord {
                    Status::Done
                } else {
                    Status::Pending
                }
            }
        };

        match status {
            Status::Pending => None,
            Status::Lost => {
                debug!(quest = ?quest.kind, "quest target lost");
                self.active_mut().target = None;
                None
            }
            Status::Done => {
                let xp = completion_xp(player.level, &config.quests);
                let level_up = grant_player_xp(player, xp, &config.leveling);
                let active = self.active_mut();
                active.target = None;
                active.cooldown = quest.kind.cooldown(&config.quests);
                active.completed += 1;
                info!(quest = ?quest.kind, xp, completed = active.completed, "quest completed");
                Some(QuestCompletion {
                    kind: quest.kind,
                    xp,
                    level_up,
                })
            }
        }
    }
}

enum Status {
    Pending,
    Done,
    Lost,
}

fn reached(player: &Player, zone: ZoneCoord, cell: CellPos) -> bool {
    player.zone() == zone && player.cell().chebyshev(cell) <= 1
}

/// Zones within the search radius, nearest first.
fn nearby_zones(zones: &ZoneStore, around: ZoneCoord) -> Vec<&Zone> {
    let mut near: Vec<&Zone> = zones
        .iter()
        .filter(|z| z.coord.distance(around) <= SEARCH_RADIUS)
        .collect();
    near.sort_by_key(|z| (z.coord.distance(around), z.coord));
    near
}

fn find_cell(zones: &ZoneStore, player: &Player, kinds: &[CellType]) -> Option<QuestTarget> {
    nearby_zones(zones, player.zone()).into_iter().find_map(|zone| {
        let from = if zone.coord == player.zone() {
            player.cell()
        } else {
            CellPos::center()
        };
        let cell = zone
            .grid
            .find_within(from, i32::MAX, |_, k| kinds.contains(&k))
            .into_iter()
            .next()?;
        let kind = zone.grid.kind_at(cell)?;
        Some(QuestTarget::Cell {
            zone: zone.coord,
            cell,
            kind,
        })
    })
}

fn find_creature(
    world: &World,
    zones: &ZoneStore,
    player: &Player,
    filter: CreatureFilter,
) -> Option<QuestTarget> {
    nearby_zones(zones, player.zone()).into_iter().find_map(|zone| {
        zone.members
            .iter()
            .filter_map(|&e| {
                let creature = world.get::<&Creature>(e).ok()?;
                let pos = world.get::<&Position>(e).ok()?;
                filter
                    .matches(creature.kind)
                    .then_some((pos.cell.manhattan(player.cell()), e))
            })
            .min()
            .map(|(_, e)| QuestTarget::Entity(e))
    })
}

/// A zone at least two zones away, at most three along each axis.
fn far_zone(from: ZoneCoord, rng: &mut impl Rng) -> ZoneCoord {
    loop {
        let dx = rng.gen_range(-3..=3);
        let dy = rng.gen_range(-3..=3);
        let to = from.offset(dx, dy);
        if to.distance(from) >= 2 {
            return to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::species::{AnimalKind, CreatureKind, PeacefulRole};

    use crate::generation::creatures::spawn_creature;

    fn setup() -> (World, ZoneStore, Player, SimConfig, ChaCha8Rng) {
        let config = SimConfig::default();
        let mut zones = ZoneStore::new(21);
        zones.ensure_radius(ZoneCoord::ORIGIN, 1, &config.biomes);
        let player = Player::new(ZoneCoord::ORIGIN, CellPos::center());
        (World::new(), zones, player, config, ChaCha8Rng::seed_from_u64(21))
    }

    #[test]
    fn one_quest_per_type() {
        let log = QuestLog::default();
        assert!(log.is_valid());
        assert_eq!(log.active_kind(), QuestType::Explore);
        assert_eq!(log.quest(QuestType::Mine).kind, QuestType::Mine);
    }

    #[test]
    fn explore_completes_on_entering_the_zone() {
        let (world, zones, mut player, config, mut rng) = setup();
        let mut log = QuestLog::new(QuestType::Explore);
        let Some(QuestTarget::Zone(goal)) = log.assign_target(&world, &zones, &player, &mut rng) else {
            panic!("explore should target a zone");
        };
        assert!(goal.distance(ZoneCoord::ORIGIN) >= 2);
        assert!(log.check_completion(&world, &zones, &mut player, &config).is_none());

        player.position = Position::new(goal, CellPos::center());
        let done = log.check_completion(&world, &zones, &mut player, &config).unwrap();
        assert_eq!(done.xp, 10);
        assert_eq!(player.xp, 10);
        assert_eq!(log.active().cooldown, 300);
        assert!(log.active().target.is_none());
        assert_eq!(log.active().completed, 1);
    }

    #[test]
    fn cooldown_blocks_new_targets() {
        let (world, zones, mut player, config, mut rng) = setup();
        let mut log = QuestLog::new(QuestType::Explore);
        let Some(QuestTarget::Zone(goal)) = log.assign_target(&world, &zones, &player, &mut rng) else {
            panic!("explore should target a zone");
        };
        player.position = Position::new(goal, CellPos::center());
        log.check_completion(&world, &zones, &mut player, &config);

        assert!(log.assign_target(&world, &zones, &player, &mut rng).is_none());
        log.tick(300);
        assert!(log.assign_target(&world, &zones, &player, &mut rng).is_some());
    }

    #[test]
    fn changed_cell_completes_lumber() {
        let (world, mut zones, mut player, config, mut rng) = setup();
        let tree = player.cell().offset(2, 0);
        zones.get_mut(ZoneCoord::ORIGIN).unwrap().grid.set_kind(tree, CellType::Tree2);
        let mut log = QuestLog::new(QuestType::Lumber);
        let target = log.assign_target(&world, &zones, &player, &mut rng);
        let Some(QuestTarget::Cell { zone, cell, .. }) = target else {
            panic!("lumber should target a cell");
        };
        assert_eq!(zone, ZoneCoord::ORIGIN);
        assert!(log.check_completion(&world, &zones, &mut player, &config).is_none());

        zones.get_mut(zone).unwrap().grid.set_kind(cell, CellType::Grass);
        assert!(log.check_completion(&world, &zones, &mut player, &config).is_some());
    }

    #[test]
    fn hunt_completes_when_the_prey_is_gone() {
        let (mut world, mut zones, mut player, config, mut rng) = setup();
        let deer = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Animal(AnimalKind::Deer),
            ZoneCoord::ORIGIN,
            CellPos::new(3, 3),
            1,
            &config,
            &mut rng,
        );
        let mut log = QuestLog::new(QuestType::Hunt);
        log.assign_target(&world, &zones, &player, &mut rng);
        assert_eq!(log.target_position(&world), Some((ZoneCoord::ORIGIN, CellPos::new(3, 3))));

        world.despawn(deer).unwrap();
        assert!(log.check_completion(&world, &zones, &mut player, &config).is_some());
    }

    #[test]
    fn rescue_needs_the_player_alongside() {
        let (mut world, mut zones, mut player, config, mut rng) = setup();
        let farmer = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Peaceful(PeacefulRole::Farmer),
            ZoneCoord::ORIGIN,
            CellPos::new(4, 4),
            1,
            &config,
            &mut rng,
        );
        let mut log = QuestLog::new(QuestType::Rescue);
        assert_eq!(
            log.assign_target(&world, &zones, &player, &mut rng),
            Some(QuestTarget::Entity(farmer))
        );
        assert!(log.check_completion(&world, &zones, &mut player, &config).is_none());

        player.position = Position::new(ZoneCoord::ORIGIN, CellPos::new(5, 5));
        assert!(log.check_completion(&world, &zones, &mut player, &config).is_some());
    }

    #[test]
    fn dead_rescue_target_is_dropped_without_reward() {
        let (mut world, mut zones, mut player, config, mut rng) = setup();
        let farmer = spawn_creature(
            &mut world,
            &mut zones,
            CreatureKind::Peaceful(PeacefulRole::Farmer),
            ZoneCoord::ORIGIN,
            CellPos::new(4, 4),
            1,
            &config,
            &mut rng,
        );
        let mut log = QuestLog::new(QuestType::Rescue);
        log.assign_target(&world, &zones, &player, &mut rng);
        world.despawn(farmer).unwrap();

        assert!(log.check_completion(&world, &zones, &mut player, &config).is_none());
        assert!(log.active().target.is_none());
        assert_eq!(player.xp, 0);
    }
}
