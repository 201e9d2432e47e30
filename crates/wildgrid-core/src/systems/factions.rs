//! Factions - peaceful orders and hostile clans
//!
//! The registry is a singleton owned by the engine. Membership is stored
//! twice: as a [`FactionMember`] component on the entity and in the
//! faction's member set. Every mutation goes through the registry so the
//! two never drift.

use std::collections::{BTreeMap, BTreeSet};

use hecs::{Entity, World};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wildgrid_logic::config::{FactionConfig, SimConfig};
use wildgrid_logic::species::CreatureKind;

use crate::components::*;
use crate::generation::generate_faction_name;
use crate::zones::ZoneStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    pub hostile: bool,
    #[serde(with = "entity_bits::option")]
    pub leader: Option<Entity>,
    #[serde(with = "entity_bits::set")]
    pub members: BTreeSet<Entity>,
    /// Zones where this faction holds the most members.
    pub territory: BTreeSet<ZoneCoord>,
}

/// All factions (singleton, stored in engine)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRegistry {
    factions: BTreeMap<FactionId, Faction>,
    next_id: u32,
}

impl FactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: FactionId) -> Option<&Faction> {
        self.factions.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.values()
    }

    pub fn len(&self) -> usize {
        self.factions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// Faction an entity belongs to, read from its component.
    pub fn faction_of(world: &World, entity: Entity) -> Option<FactionId> {
        world.get::<&FactionMember>(entity).ok().map(|m| m.0)
    }

    /// Whether two factions are at war: different, with at least one hostile.
    pub fn rivals(&self, a: FactionId, b: FactionId) -> bool {
        a != b
            && (self.factions.get(&a).is_some_and(|f| f.hostile)
                || self.factions.get(&b).is_some_and(|f| f.hostile))
    }

    /// Peaceful factions hold at most `base + leader level` members.
    pub fn capacity(&self, world: &World, id: FactionId, config: &FactionConfig) -> Option<usize> {
        let faction = self.factions.get(&id)?;
        if faction.hostile {
            return None;
        }
        let leader_level = faction
            .leader
            .and_then(|l| world.get::<&Progression>(l).ok().map(|p| p.level))
            .unwrap_or(1);
        Some(config.base_max_size + leader_level as usize)
    }

    /// Found a new faction led by `founder`.
    pub fn found(
        &mut self,
        world: &mut World,
        founder: Entity,
        hostile: bool,
        rng: &mut impl Rng,
    ) -> FactionId {
        self.remove_member(world, founder);
        let id = FactionId(self.next_id);
        self.next_id += 1;
        let faction = Faction {
            id,
            name: generate_faction_name(hostile, rng),
            hostile,
            leader: Some(founder),
            members: [founder].into_iter().collect(),
            territory: BTreeSet::new(),
        };
        info!(faction = %faction.name, hostile, "faction founded");
        self.factions.insert(id, faction);
        let _ = world.insert_one(founder, FactionMember(id));
        id
    }

    /// Add `entity` to a faction. Peaceful factions refuse when full.
    pub fn join(
        &mut self,
        world: &mut World,
        id: FactionId,
        entity: Entity,
        config: &FactionConfig,
    ) -> bool {
        if let Some(cap) = self.capacity(world, id, config) {
            if self.factions.get(&id).is_some_and(|f| f.members.len() >= cap) {
                return false;
            }
        }
        if !self.factions.contains_key(&id) {
            return false;
        }
        self.remove_member(world, entity);
        if let Some(faction) = self.factions.get_mut(&id) {
            faction.members.insert(entity);
            if faction.leader.is_none() {
                faction.leader = Some(entity);
            }
        }
        let _ = world.insert_one(entity, FactionMember(id));
        true
    }

    /// Take `entity` out of its faction, re-electing or disbanding as needed.
    pub fn remove_member(&mut self, world: &mut World, entity: Entity) {
        let Ok(FactionMember(id)) = world.remove_one::<FactionMember>(entity) else {
            return;
        };
        self.detach(world, id, entity);
    }

    /// Drop a dead entity that has already left the world.
    pub fn forget(&mut self, world: &World, entity: Entity) {
        let owners: Vec<FactionId> = self
            .factions
            .values()
            .filter(|f| f.members.contains(&entity))
            .map(|f| f.id)
            .collect();
        for id in owners {
            self.detach(world, id, entity);
        }
    }

    /// Hand `old`'s membership (and leadership) to `new`.
    pub fn replace_member(&mut self, world: &mut World, old: Entity, new: Entity) {
        let Some(id) = Self::faction_of(world, old) else {
            return;
        };
        if let Some(faction) = self.factions.get_mut(&id) {
            faction.members.remove(&old);
            faction.members.insert(new);
            if faction.leader == Some(old) {
                faction.leader = Some(new);
            }
        }
        let _ = world.insert_one(new, FactionMember(id));
    }

    fn detach(&mut self, world: &World, id: FactionId, entity: Entity) {
        let Some(faction) = self.factions.get_mut(&id) else {
            return;
        };
        faction.members.remove(&entity);
        if faction.members.is_empty() {
            debug!(faction = %faction.name, "faction disbanded");
            self.factions.remove(&id);
            return;
        }
        if faction.leader == Some(entity) {
            faction.leader = elect_leader(world, &faction.members);
            debug!(faction = %faction.name, "leader re-elected");
        }
    }

    /// Expel the lowest-level non-leaders of peaceful factions over capacity.
    pub fn enforce_caps(&mut self, world: &mut World, config: &FactionConfig) -> usize {
        let mut expelled = Vec::new();
        for faction in self.factions.values() {
            let Some(cap) = self.capacity(world, faction.id, config) else {
                continue;
            };
            if faction.members.len() <= cap {
                continue;
            }
            let mut ranked: Vec<(u32, Entity)> = faction
                .members
                .iter()
                .filter(|e| Some(**e) != faction.leader)
                .map(|e| (level_of(world, *e), *e))
                .collect();
            ranked.sort();
            expelled.extend(ranked.into_iter().take(faction.members.len() - cap).map(|(_, e)| e));
        }
        for entity in &expelled {
            self.remove_member(world, *entity);
        }
        expelled.len()
    }

    /// Recompute each faction's territory from member positions.
    pub fn update_territory(&mut self, world: &World) {
        let mut counts: BTreeMap<ZoneCoord, BTreeMap<FactionId, usize>> = BTreeMap::new();
        for faction in self.factions.values() {
            for member in &faction.members {
                if let Ok(pos) = world.get::<&Position>(*member) {
                    *counts.entry(pos.zone).or_default().entry(faction.id).or_default() += 1;
                }
            }
        }
        for faction in self.factions.values_mut() {
            faction.territory.clear();
        }
        for (zone, by_faction) in counts {
            // Highest count wins; ties go to the older faction.
            let winner = by_faction
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                .map(|(id, _)| *id);
            if let Some(faction) = winner.and_then(|id| self.factions.get_mut(&id)) {
                faction.territory.insert(zone);
            }
        }
    }
}

fn level_of(world: &World, entity: Entity) -> u32 {
    world.get::<&Progression>(entity).map(|p| p.level).unwrap_or(1)
}

fn elect_leader(world: &World, members: &BTreeSet<Entity>) -> Option<Entity> {
    members
        .iter()
        .copied()
        .max_by(|a, b| level_of(world, *a).cmp(&level_of(world, *b)).then(b.cmp(a)))
}

/// Periodic faction upkeep: clans recruit, combat NPCs organise, caps hold.
pub fn faction_system(
    world: &mut World,
    registry: &mut FactionRegistry,
    zones: &ZoneStore,
    config: &SimConfig,
    rng: &mut impl Rng,
) {
    let cfg = &config.factions;

    for coord in zones.coords() {
        let residents: Vec<(Entity, CreatureKind, Option<FactionId>)> = zones
            .members(coord)
            .into_iter()
            .filter_map(|e| {
                let kind = world.get::<&Creature>(e).ok()?.kind;
                Some((e, kind, FactionRegistry::faction_of(world, e)))
            })
            .collect();
        if residents.is_empty() {
            continue;
        }

        let mut clan = residents.iter().find_map(|(_, _, f)| {
            f.filter(|id| registry.get(*id).is_some_and(|fa| fa.hostile))
        });
        let mut order = residents.iter().find_map(|(_, _, f)| {
            f.filter(|id| registry.get(*id).is_some_and(|fa| !fa.hostile))
        });

        for (entity, kind, faction) in &residents {
            if faction.is_some() {
                continue;
            }
            if kind.is_hostile() && kind.is_npc() {
                if rng.gen::<f32>() >= cfg.recruit_chance {
                    continue;
                }
                match clan {
                    Some(id) => {
                        if registry.join(world, id, *entity, cfg) {
                            debug!(zone = %coord, "clan recruited a member");
                        }
                    }
                    None => clan = Some(registry.found(world, *entity, true, rng)),
                }
            } else if matches!(kind, CreatureKind::Combat(_)) {
                let joined = order.is_some_and(|id| registry.join(world, id, *entity, cfg));
                if !joined && order.is_none() {
                    order = Some(registry.found(world, *entity, false, rng));
                }
            }
        }
    }

    let expelled = registry.enforce_caps(world, cfg);
    if expelled > 0 {
        debug!(expelled, "faction caps enforced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::species::CombatRole;

    fn npc(world: &mut World, level: u32) -> Entity {
        world.spawn((
            Creature::new(CreatureKind::Combat(CombatRole::Guard)),
            Progression::new(level, 1000),
            Position::new(ZoneCoord::ORIGIN, CellPos::center()),
        ))
    }

    #[test]
    fn peaceful_factions_are_capped_by_leader_level() {
        let mut world = World::new();
        let mut registry = FactionRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let cfg = FactionConfig::default();

        let leader = npc(&mut world, 1);
        let id = registry.found(&mut world, leader, false, &mut rng);
        let cap = registry.capacity(&world, id, &cfg).unwrap();
        assert_eq!(cap, cfg.base_max_size + 1);

        let mut joined = 0;
        for _ in 0..10 {
            let e = npc(&mut world, 1);
            if registry.join(&mut world, id, e, &cfg) {
                joined += 1;
            }
        }
        assert_eq!(joined, cap - 1);
        assert_eq!(registry.get(id).unwrap().members.len(), cap);
    }

    #[test]
    fn leader_is_re_elected_by_level() {
        let mut world = World::new();
        let mut registry = FactionRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let cfg = FactionConfig::default();

        let leader = npc(&mut world, 1);
        let id = registry.found(&mut world, leader, false, &mut rng);
        let veteran = npc(&mut world, 4);
        let rookie = npc(&mut world, 2);
        registry.join(&mut world, id, veteran, &cfg);
        registry.join(&mut world, id, rookie, &cfg);

        registry.remove_member(&mut world, leader);
        assert_eq!(registry.get(id).unwrap().leader, Some(veteran));
        assert!(world.get::<&FactionMember>(leader).is_err());
    }

    #[test]
    fn last_member_leaving_disbands() {
        let mut world = World::new();
        let mut registry = FactionRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let leader = npc(&mut world, 1);
        let id = registry.found(&mut world, leader, true, &mut rng);
        registry.remove_member(&mut world, leader);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn rivalry_needs_a_hostile_side() {
        let mut world = World::new();
        let mut registry = FactionRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = npc(&mut world, 1);
        let b = npc(&mut world, 1);
        let c = npc(&mut world, 1);
        let order_a = registry.found(&mut world, a, false, &mut rng);
        let order_b = registry.found(&mut world, b, false, &mut rng);
        let clan = registry.found(&mut world, c, true, &mut rng);
        assert!(!registry.rivals(order_a, order_b));
        assert!(registry.rivals(order_a, clan));
        assert!(!registry.rivals(clan, clan));
    }

    #[test]
    fn territory_follows_members() {
        let mut world = World::new();
        let mut registry = FactionRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let cfg = FactionConfig::default();
        let a = npc(&mut world, 3);
        let id = registry.found(&mut world, a, false, &mut rng);
        let b = npc(&mut world, 1);
        registry.join(&mut world, id, b, &cfg);
        world.get::<&mut Position>(b).unwrap().zone = ZoneCoord::new(1, 0);

        registry.update_territory(&world);
        let territory = &registry.get(id).unwrap().territory;
        assert!(territory.contains(&ZoneCoord::ORIGIN));
        assert!(territory.contains(&ZoneCoord::new(1, 0)));
    }
}
