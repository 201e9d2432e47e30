//! AI system - per-creature state machine producing intents
//!
//! Evaluation is two-phase. First every creature in the zone is evaluated
//! against a snapshot of the zone ([`ZoneView`]) and produces an
//! [`Intent`]; only its own [`Brain`] is written during this phase. The
//! intents are then applied in handle order by the actions module.
//!
//! Each evaluated tick either transitions (fresh counter) or decrements
//! the current state's counter. Triggered transitions (threats, provocation,
//! low health, arrival, lost targets) are checked before the counter, so
//! they always win over a timeout on the same tick.

use hecs::{Entity, World};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use wildgrid_logic::cells::CellType;
use wildgrid_logic::config::{AiConfig, SimConfig};
use wildgrid_logic::constants::{MAX_NEED, TICKS_PER_SECOND};
use wildgrid_logic::items::{Inventory, Item};
use wildgrid_logic::quests::QuestFocus;
use wildgrid_logic::species::{are_enemies, Behavior, CreatureFilter, CreatureKind, WorkAction};

use crate::components::*;
use crate::systems::enchantments::Enchantments;
use crate::systems::factions::FactionRegistry;
use crate::zones::ZoneStore;

/// What a creature wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Stay,
    Step(CellPos),
    Attack(Target),
    Act { cell: CellPos, purpose: Purpose },
}

/// One creature (or the player) as others see it this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub target: Target,
    /// `None` for the player.
    pub kind: Option<CreatureKind>,
    pub cell: CellPos,
    pub faction: Option<FactionId>,
    pub strength: f32,
    pub alive: bool,
}

impl Sighting {
    fn hostile(&self) -> bool {
        self.kind.is_some_and(|k| k.is_hostile())
    }
}

/// Read-only snapshot of a zone for one evaluation pass.
#[derive(Debug, Clone)]
pub struct ZoneView<'a> {
    pub zone: &'a Zone,
    pub sightings: Vec<Sighting>,
}

impl<'a> ZoneView<'a> {
    /// Snapshot every living member of `zone`, plus the player if present.
    pub fn capture(world: &World, zone: &'a Zone, player: Option<&Player>) -> Self {
        let mut sightings: Vec<Sighting> = zone
            .members
            .iter()
            .filter_map(|&e| {
                let creature = *world.get::<&Creature>(e).ok()?;
                let pos = world.get::<&Position>(e).ok()?;
                let vitals = world.get::<&Vitals>(e).ok()?;
                let level = world.get::<&Progression>(e).map(|p| p.level).unwrap_or(1);
                Some(Sighting {
                    target: Target::Creature(e),
                    kind: Some(creature.kind),
                    cell: pos.cell,
                    faction: FactionRegistry::faction_of(world, e),
                    strength: creature.strength(level),
                    alive: !vitals.is_dead(),
                })
            })
            .collect();
        if let Some(player) = player.filter(|p| p.zone() == zone.coord) {
            sightings.push(Sighting {
                target: Target::Player,
                kind: None,
                cell: player.cell(),
                faction: None,
                strength: player.strength(),
                alive: !player.vitals.is_dead(),
            });
        }
        Self { zone, sightings }
    }

    pub fn find(&self, target: Target) -> Option<&Sighting> {
        self.sightings
            .iter()
            .find(|s| s.target == target && s.alive)
    }

    fn can_enter(&self, cell: CellPos) -> bool {
        !cell.on_border() && self.zone.walkable(cell)
    }
}

/// Everything the state machine needs to know about the creature itself.
#[derive(Debug, Clone)]
pub struct Actor {
    pub entity: Entity,
    pub creature: Creature,
    pub cell: CellPos,
    pub level: u32,
    pub health_fraction: f32,
    pub hunger: f32,
    pub thirst: f32,
    pub faction: Option<FactionId>,
    pub focus: Option<QuestFocus>,
    pub wood: u32,
    pub seeds: u32,
}

impl Actor {
    fn read(world: &World, entity: Entity) -> Option<Self> {
        let creature = *world.get::<&Creature>(entity).ok()?;
        let cell = world.get::<&Position>(entity).ok()?.cell;
        let level = world.get::<&Progression>(entity).map(|p| p.level).unwrap_or(1);
        let vitals = *world.get::<&Vitals>(entity).ok()?;
        let (wood, seeds) = world
            .get::<&Inventory>(entity)
            .map(|inv| (inv.count(Item::Wood), inv.count(Item::Seeds) + inv.count(Item::Carrot)))
            .unwrap_or((0, 0));
        Some(Self {
            entity,
            creature,
            cell,
            level,
            health_fraction: vitals.fraction(creature.max_health(level)),
            hunger: vitals.hunger,
            thirst: vitals.thirst,
            faction: FactionRegistry::faction_of(world, entity),
            focus: world.get::<&Focus>(entity).ok().map(|f| f.active),
            wood,
            seeds,
        })
    }

    fn behavior(&self) -> &'static Behavior {
        self.creature.behavior()
    }

    fn sighting(&self) -> Sighting {
        Sighting {
            target: Target::Creature(self.entity),
            kind: Some(self.creature.kind),
            cell: self.cell,
            faction: self.faction,
            strength: self.creature.strength(self.level),
            alive: true,
        }
    }
}

/// Enemy rule: shared faction means peace, rival factions mean war,
/// otherwise species hostility decides. The player is an enemy of
/// hostile kinds only.
pub fn is_enemy(me: &Sighting, other: &Sighting, factions: &FactionRegistry) -> bool {
    if me.target == other.target {
        return false;
    }
    match (me.kind, other.kind) {
        (Some(a), Some(b)) => {
            if let (Some(fa), Some(fb)) = (me.faction, other.faction) {
                if fa == fb {
                    return false;
                }
                if factions.rivals(fa, fb) {
                    return true;
                }
            }
            are_enemies(a, b)
        }
        (Some(a), None) | (None, Some(a)) => a.is_hostile(),
        (None, None) => false,
    }
}

/// Evaluate every unfrozen creature in `coord`. `dt` is the number of
/// ticks this evaluation stands for; it only drains step and attack
/// cooldowns, state counters always drop by one.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_zone(
    world: &World,
    zones: &ZoneStore,
    coord: ZoneCoord,
    player: Option<&Player>,
    dt: u32,
    enchantments: &Enchantments,
    factions: &FactionRegistry,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Vec<(Entity, Intent)> {
    let Some(zone) = zones.get(coord) else {
        return Vec::new();
    };
    let view = ZoneView::capture(world, zone, player);

    let mut intents = Vec::with_capacity(zone.members.len());
    for &entity in &zone.members {
        if enchantments.entity_frozen(entity) {
            continue;
        }
        let Some(actor) = Actor::read(world, entity) else {
            continue;
        };
        if actor.health_fraction <= 0.0 {
            continue;
        }
        let memory = world
            .get::<&MemoryLane>(entity)
            .map(|m| (*m).clone())
            .unwrap_or_else(|_| MemoryLane::new(0));
        let Ok(mut brain) = world.get::<&mut Brain>(entity) else {
            continue;
        };
        let intent = decide(&actor, &memory, &mut brain, &view, dt, factions, config, rng);
        intents.push((entity, intent));
    }
    intents
}

/// Run one evaluated tick of the state machine for one creature.
#[allow(clippy::too_many_arguments)]
pub fn decide(
    me: &Actor,
    memory: &MemoryLane,
    brain: &mut Brain,
    view: &ZoneView,
    dt: u32,
    factions: &FactionRegistry,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Intent {
    let ai = &config.ai;
    brain.attack_cooldown = brain.attack_cooldown.saturating_sub(dt);
    brain.move_cooldown = brain.move_cooldown.saturating_sub(dt);

    let triggered = check_triggers(me, brain, view, factions, config, rng);
    if let Some(intent) = triggered.intent {
        return intent;
    }
    if !triggered.transitioned {
        brain.remaining = brain.remaining.saturating_sub(1);
        if brain.remaining == 0 {
            on_timeout(me, brain, view, factions, config, rng);
        }
    }

    intent_for_state(me, memory, brain, view, ai, rng)
}

#[derive(Debug, Default)]
struct Triggered {
    transitioned: bool,
    /// An action decided by the trigger itself (arrival).
    intent: Option<Intent>,
}

impl Triggered {
    fn moved() -> Self {
        Self {
            transitioned: true,
            intent: None,
        }
    }
}

fn check_triggers(
    me: &Actor,
    brain: &mut Brain,
    view: &ZoneView,
    factions: &FactionRegistry,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Triggered {
    let ai = &config.ai;
    let b = me.behavior();

    // Counterattack whoever hit us since the last evaluation.
    if let Some(attacker) = brain.provoked_by.take() {
        let busy = matches!(brain.state, AiState::Combat | AiState::Fleeing);
        if !busy && view.find(attacker).is_some() {
            let state = if rng.gen::<f32>() < b.flee_chance {
                AiState::Fleeing
            } else {
                AiState::Combat
            };
            enter(brain, state, Some(attacker), None, ai, rng);
            return Triggered::moved();
        }
    }

    match brain.state {
        AiState::Idle | AiState::Wandering | AiState::Targeting => {
            if let Some(threat) = nearest_enemy(me, view, factions, b.detection_radius) {
                engage(me, brain, threat, ai, rng);
                return Triggered::moved();
            }
            if brain.state == AiState::Targeting {
                return check_target(me, brain, view, ai, rng);
            }
            Triggered::default()
        }
        AiState::Combat => {
            let Some(enemy) = brain.target.and_then(|t| view.find(t)) else {
                enter(brain, AiState::Idle, None, None, ai, rng);
                return Triggered::moved();
            };
            let enemy = enemy.target;
            if me.health_fraction < ai.flee_health_fraction
                && rng.gen::<f32>() < ai.low_health_flee_chance
            {
                enter(brain, AiState::Fleeing, Some(enemy), None, ai, rng);
                return Triggered::moved();
            }
            if rng.gen::<f32>() < ai.disengage_per_tick() {
                enter(brain, AiState::Idle, None, None, ai, rng);
                return Triggered::moved();
            }
            Triggered::default()
        }
        AiState::Fleeing => {
            let escaped = brain
                .target
                .and_then(|t| view.find(t))
                .map_or(true, |t| t.cell.chebyshev(me.cell) > b.detection_radius);
            if escaped {
                enter(brain, AiState::Idle, None, None, ai, rng);
                return Triggered::moved();
            }
            Triggered::default()
        }
    }
}

/// Targeting checks: a lost target drops back to idle, arrival acts.
fn check_target(
    me: &Actor,
    brain: &mut Brain,
    view: &ZoneView,
    ai: &AiConfig,
    rng: &mut impl Rng,
) -> Triggered {
    let b = me.behavior();
    match (brain.target, brain.purpose) {
        (Some(Target::Cell(cell)), Some(purpose)) => {
            let still_valid = view
                .zone
                .grid
                .kind_at(cell)
                .is_some_and(|kind| cell_matches(kind, purpose, b));
            if !still_valid {
                enter(brain, AiState::Idle, None, None, ai, rng);
                return Triggered::moved();
            }
            if cell.chebyshev(me.cell) <= 1 {
                enter(brain, AiState::Idle, None, None, ai, rng);
                let intent = match purpose {
                    Purpose::Explore => Intent::Stay,
                    _ => Intent::Act { cell, purpose },
                };
                return Triggered {
                    transitioned: true,
                    intent: Some(intent),
                };
            }
            Triggered::default()
        }
        (Some(target), _) => match view.find(target) {
            None => {
                enter(brain, AiState::Idle, None, None, ai, rng);
                Triggered::moved()
            }
            Some(prey) if prey.cell.chebyshev(me.cell) <= 1 => {
                enter(brain, AiState::Combat, Some(target), None, ai, rng);
                Triggered::moved()
            }
            Some(_) => Triggered::default(),
        },
        (None, _) => {
            enter(brain, AiState::Idle, None, None, ai, rng);
            Triggered::moved()
        }
    }
}

fn on_timeout(
    me: &Actor,
    brain: &mut Brain,
    view: &ZoneView,
    factions: &FactionRegistry,
    config: &SimConfig,
    rng: &mut impl Rng,
) {
    let ai = &config.ai;
    match brain.state {
        AiState::Idle => {
            let b = me.behavior();
            let drive = if b.work.is_some() || me.focus.is_some() {
                1.0 - b.passiveness
            } else {
                b.aggressiveness
            };
            let mut target = needs_target(me, view, ai);
            if target.is_none() && rng.gen::<f32>() < drive {
                target = choose_target(me, view, factions, config, rng);
            }
            match target {
                Some((target, purpose)) => {
                    enter(brain, AiState::Targeting, Some(target), Some(purpose), ai, rng)
                }
                None => enter(brain, AiState::Wandering, None, None, ai, rng),
            }
        }
        AiState::Combat => {
            // Still locked on and in reach: keep fighting with a fresh timer.
            let target = brain.target;
            let in_reach = target
                .and_then(|t| view.find(t))
                .is_some_and(|s| s.cell.chebyshev(me.cell) <= 1);
            if in_reach {
                enter(brain, AiState::Combat, target, None, ai, rng);
            } else {
                enter(brain, AiState::Idle, None, None, ai, rng);
            }
        }
        AiState::Wandering | AiState::Targeting | AiState::Fleeing => {
            enter(brain, AiState::Idle, None, None, ai, rng)
        }
    }
}

fn intent_for_state(
    me: &Actor,
    memory: &MemoryLane,
    brain: &mut Brain,
    view: &ZoneView,
    ai: &AiConfig,
    rng: &mut impl Rng,
) -> Intent {
    match brain.state {
        AiState::Idle => Intent::Stay,
        AiState::Wandering => {
            if rng.gen::<f32>() < me.behavior().idleness * 0.5 {
                return Intent::Stay;
            }
            gated_step(brain, ai, wander_step(me.cell, memory, view, rng))
        }
        AiState::Targeting => {
            let goal = match brain.target {
                Some(Target::Cell(cell)) => Some(cell),
                Some(t) => view.find(t).map(|s| s.cell),
                None => None,
            };
            match goal {
                Some(goal) => gated_step(brain, ai, step_toward(me.cell, goal, view)),
                None => Intent::Stay,
            }
        }
        AiState::Combat => {
            let Some(enemy) = brain.target.and_then(|t| view.find(t)) else {
                return Intent::Stay;
            };
            if enemy.cell.chebyshev(me.cell) <= 1 {
                if brain.attack_cooldown == 0 {
                    brain.attack_cooldown = ai.attack_interval;
                    Intent::Attack(enemy.target)
                } else {
                    Intent::Stay
                }
            } else {
                let goal = enemy.cell;
                gated_step(brain, ai, step_toward(me.cell, goal, view))
            }
        }
        AiState::Fleeing => {
            let Some(threat) = brain.target.and_then(|t| view.find(t)) else {
                return Intent::Stay;
            };
            let away = me.cell.step_away(threat.cell);
            let step = if view.can_enter(away) {
                Some(away)
            } else {
                wander_step(me.cell, memory, view, rng)
            };
            gated_step(brain, ai, step)
        }
    }
}

/// Turn a desired step into an intent, honouring the step cooldown.
fn gated_step(brain: &mut Brain, ai: &AiConfig, step: Option<CellPos>) -> Intent {
    match step {
        Some(cell) if brain.move_cooldown == 0 => {
            brain.move_cooldown = ai.move_interval;
            Intent::Step(cell)
        }
        _ => Intent::Stay,
    }
}

fn enter(
    brain: &mut Brain,
    state: AiState,
    target: Option<Target>,
    purpose: Option<Purpose>,
    ai: &AiConfig,
    rng: &mut impl Rng,
) {
    brain.transition(state, state_duration(state, ai, rng), target, purpose);
}

/// Configured duration for a freshly entered state.
pub fn state_duration(state: AiState, ai: &AiConfig, rng: &mut impl Rng) -> u32 {
    match state {
        AiState::Idle => ai.idle_ticks,
        AiState::Wandering => ai.wander_ticks,
        AiState::Targeting => ai.targeting_ticks,
        AiState::Fleeing => ai.flee_ticks,
        AiState::Combat => {
            let min = ai.combat_min_seconds.max(1);
            let max = ai.combat_max_seconds.max(min);
            TICKS_PER_SECOND * rng.gen_range(min..=max)
        }
    }
}

/// Fight or flight. Only a dangerous enemy (hostile, or at least as
/// strong) can make a creature run.
fn engage(me: &Actor, brain: &mut Brain, threat: &Sighting, ai: &AiConfig, rng: &mut impl Rng) {
    let dangerous = threat.hostile() || threat.strength >= me.creature.strength(me.level);
    let state = if dangerous && rng.gen::<f32>() < me.behavior().flee_chance {
        AiState::Fleeing
    } else {
        AiState::Combat
    };
    enter(brain, state, Some(threat.target), None, ai, rng);
}

fn nearest_enemy<'v>(
    me: &Actor,
    view: &'v ZoneView,
    factions: &FactionRegistry,
    radius: i32,
) -> Option<&'v Sighting> {
    let mine = me.sighting();
    view.sightings
        .iter()
        .filter(|s| s.alive && s.cell.chebyshev(me.cell) <= radius)
        .filter(|s| is_enemy(&mine, s, factions))
        .min_by_key(|s| (s.cell.chebyshev(me.cell), s.cell))
}

/// Whether a cell still serves the purpose it was picked for.
pub fn cell_matches(kind: CellType, purpose: Purpose, b: &Behavior) -> bool {
    use CellType::*;
    match purpose {
        Purpose::Eat => b.food.contains(&kind),
        Purpose::Drink => b.water.contains(&kind),
        Purpose::Work(WorkAction::Graze) => kind == Grass,
        Purpose::Work(WorkAction::Farm) => matches!(kind, Carrot2 | Carrot3 | Soil | Grass | Dirt),
        Purpose::Work(WorkAction::Chop | WorkAction::Gnaw) => kind.is_tree(),
        Purpose::Work(WorkAction::Mine) => kind == Stone,
        Purpose::Work(WorkAction::Trade) => matches!(kind, House | StoneHouse | Camp),
        Purpose::Work(WorkAction::Forge) => matches!(kind, Forge | Camp),
        Purpose::Build => matches!(kind, Grass | Dirt),
        Purpose::Explore => kind.is_walkable(),
        Purpose::Hunt => false,
    }
}

fn needs_target(me: &Actor, view: &ZoneView, ai: &AiConfig) -> Option<(Target, Purpose)> {
    let b = me.behavior();
    if !b.needs_sustenance {
        return None;
    }
    let half = MAX_NEED * 0.5;
    if me.thirst < half {
        if let Some(cell) = nearest_cell(me.cell, view, ai.search_radius, b.water) {
            return Some((Target::Cell(cell), Purpose::Drink));
        }
    }
    if me.hunger < half {
        if let Some(cell) = nearest_cell(me.cell, view, ai.search_radius, b.food) {
            return Some((Target::Cell(cell), Purpose::Eat));
        }
    }
    None
}

fn nearest_cell(from: CellPos, view: &ZoneView, radius: i32, kinds: &[CellType]) -> Option<CellPos> {
    if kinds.is_empty() {
        return None;
    }
    view.zone
        .grid
        .find_within(from, radius, |p, k| !p.on_border() && kinds.contains(&k))
        .into_iter()
        .next()
}

/// Pick among cells with probability proportional to `1 / (1 + d)`,
/// `d` measured the same way as the search radius.
fn distance_weighted(cells: &[CellPos], from: CellPos, rng: &mut impl Rng) -> Option<CellPos> {
    let weights: Vec<f32> = cells
        .iter()
        .map(|c| 1.0 / (1.0 + c.chebyshev(from) as f32))
        .collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    cells.get(dist.sample(rng)).copied()
}

/// Pick a target from hunting instincts, quest focus, then kind work.
pub fn choose_target(
    me: &Actor,
    view: &ZoneView,
    factions: &FactionRegistry,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Option<(Target, Purpose)> {
    let b = me.behavior();
    let radius = config.ai.search_radius;
    let mine = me.sighting();

    let prey = |filter: CreatureFilter, enemies_only: bool| {
        view.sightings
            .iter()
            .filter(|s| s.alive && s.target != mine.target)
            .filter(|s| s.cell.chebyshev(me.cell) <= radius)
            .filter(|s| s.kind.map_or(filter == CreatureFilter::Any, |k| filter.matches(k)))
            .filter(|s| match (me.faction, s.faction) {
                (Some(a), Some(b)) => a != b,
                _ => true,
            })
            .filter(|s| !enemies_only || is_enemy(&mine, s, factions))
            .min_by_key(|s| (s.cell.chebyshev(me.cell), s.cell))
            .map(|s| (s.target, Purpose::Hunt))
    };

    if let Some(filter) = b.hunts {
        if let Some(found) = prey(filter, true) {
            return Some(found);
        }
    }

    let cells_of = |kinds: &[CellType]| -> Vec<CellPos> {
        view.zone
            .grid
            .find_within(me.cell, radius, |p, k| !p.on_border() && kinds.contains(&k))
    };

    if let Some(focus) = me.focus {
        let found = match focus {
            QuestFocus::Farming => farming_target(me, view, &cells_of, rng),
            QuestFocus::Building => {
                let spawning = &config.spawning;
                let can_build = me.wood >= spawning.house_wood_cost
                    && (view.zone.houses_built as usize) < spawning.max_houses_per_zone;
                let site = can_build
                    .then(|| {
                        cells_of(&[CellType::Grass, CellType::Dirt])
                            .into_iter()
                            .find(|p| p.neighbors8().all(|n| !n.on_border()))
                    })
                    .flatten();
                site.map(|cell| (Target::Cell(cell), Purpose::Build)).or_else(|| {
                    distance_weighted(&cells_of(focus.work_cells()), me.cell, rng)
                        .map(|cell| (Target::Cell(cell), Purpose::Work(WorkAction::Chop)))
                })
            }
            QuestFocus::Mining => cells_of(focus.work_cells())
                .into_iter()
                .next()
                .map(|cell| (Target::Cell(cell), Purpose::Work(WorkAction::Mine))),
            QuestFocus::Exploring => {
                let far: Vec<CellPos> = view
                    .zone
                    .grid
                    .iter()
                    .filter(|(p, c)| !p.on_border() && c.kind.is_walkable() && p.manhattan(me.cell) >= 6)
                    .map(|(p, _)| p)
                    .collect();
                far.choose(rng).map(|cell| (Target::Cell(*cell), Purpose::Explore))
            }
            QuestFocus::CombatHostile => prey(CreatureFilter::Hostile, true),
            QuestFocus::CombatAll => prey(CreatureFilter::Any, false),
        };
        if found.is_some() {
            return found;
        }
    }

    let work = b.work?;
    let kinds: &[CellType] = match work {
        WorkAction::Graze => &[CellType::Grass],
        WorkAction::Farm => QuestFocus::Farming.work_cells(),
        WorkAction::Chop | WorkAction::Gnaw => &[CellType::Tree1, CellType::Tree2],
        WorkAction::Mine => &[CellType::Stone],
        WorkAction::Trade => &[CellType::House, CellType::StoneHouse, CellType::Camp],
        WorkAction::Forge => &[CellType::Forge, CellType::Camp],
    };
    distance_weighted(&cells_of(kinds), me.cell, rng)
        .map(|cell| (Target::Cell(cell), Purpose::Work(work)))
}

fn farming_target(
    me: &Actor,
    view: &ZoneView,
    cells_of: &dyn Fn(&[CellType]) -> Vec<CellPos>,
    rng: &mut impl Rng,
) -> Option<(Target, Purpose)> {
    let farm = |cell: CellPos| (Target::Cell(cell), Purpose::Work(WorkAction::Farm));
    for ripe in [CellType::Carrot3, CellType::Carrot2] {
        if let Some(cell) = distance_weighted(&cells_of(&[ripe]), me.cell, rng) {
            return Some(farm(cell));
        }
    }
    if me.seeds > 0 {
        if let Some(cell) = cells_of(&[CellType::Soil]).into_iter().next() {
            return Some(farm(cell));
        }
    }
    // Keep a small plot rather than tilling the whole zone.
    const MAX_PLOT: usize = 6;
    if view.zone.grid.count(CellType::Soil) < MAX_PLOT {
        return cells_of(&[CellType::Grass, CellType::Dirt]).into_iter().next().map(farm);
    }
    None
}

fn step_toward(from: CellPos, goal: CellPos, view: &ZoneView) -> Option<CellPos> {
    if from == goal {
        return None;
    }
    let primary = from.step_toward(goal);
    if view.can_enter(primary) {
        return Some(primary);
    }
    let alt = if primary.x != from.x {
        from.offset(0, (goal.y - from.y).signum())
    } else {
        from.offset((goal.x - from.x).signum(), 0)
    };
    (alt != from && view.can_enter(alt)).then_some(alt)
}

/// A random 4-neighbour step, avoiding the memory lane when possible.
fn wander_step(
    from: CellPos,
    memory: &MemoryLane,
    view: &ZoneView,
    rng: &mut impl Rng,
) -> Option<CellPos> {
    let options: Vec<CellPos> = Direction::ALL
        .into_iter()
        .map(|d| from.step(d))
        .filter(|c| view.can_enter(*c))
        .collect();
    let fresh: Vec<CellPos> = options
        .iter()
        .copied()
        .filter(|c| !memory.contains(*c))
        .collect();
    fresh.choose(rng).or_else(|| options.choose(rng)).copied()
}
