//! Creature components: kind, vitals, progression, AI brain and memory.

use std::collections::VecDeque;

use hecs::Entity;
use serde::{Deserialize, Serialize};
use wildgrid_logic::constants::MAX_NEED;
use wildgrid_logic::health;
use wildgrid_logic::quests::QuestFocus;
use wildgrid_logic::species::{Behavior, CreatureKind, WorkAction};

use super::common::{entity_bits, CellPos};

/// What a creature is. `doubled` marks the product of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creature {
    pub kind: CreatureKind,
    pub doubled: bool,
}

impl Creature {
    pub fn new(kind: CreatureKind) -> Self {
        Self {
            kind,
            doubled: false,
        }
    }

    pub fn behavior(&self) -> &'static Behavior {
        self.kind.behavior()
    }

    pub fn max_health(&self, level: u32) -> f32 {
        health::max_health(self.behavior().base_health, level)
    }

    pub fn strength(&self, level: u32) -> f32 {
        let base = health::strength(self.behavior().base_strength, level);
        if self.doubled {
            base * 1.5
        } else {
            base
        }
    }

    /// Display label, e.g. `wolf_double`.
    pub fn label(&self) -> String {
        if self.doubled {
            format!("{}_double", self.kind.name())
        } else {
            self.kind.name().to_string()
        }
    }
}

/// Personal name for NPCs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    pub given: String,
    pub epithet: String,
}

impl Name {
    pub fn new(given: impl Into<String>, epithet: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            epithet: epithet.into(),
        }
    }

    pub fn full(&self) -> String {
        format!("{} {}", self.given, self.epithet)
    }
}

/// Health and needs. Needs run from `MAX_NEED` (sated) down to 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f32,
    pub hunger: f32,
    pub thirst: f32,
    /// Evaluated ticks since the last healing tick.
    pub heal_timer: u32,
}

impl Vitals {
    pub fn full(max_health: f32) -> Self {
        Self {
            health: max_health,
            hunger: MAX_NEED,
            thirst: MAX_NEED,
            heal_timer: 0,
        }
    }

    pub fn fraction(&self, max_health: f32) -> f32 {
        if max_health > 0.0 {
            (self.health / max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Apply damage, clamped. Returns true if this hit was fatal.
    pub fn damage(&mut self, amount: f32, max_health: f32) -> bool {
        let was_alive = !health::is_dead(self.health);
        self.health = health::clamp_health(self.health - amount.max(0.0), max_health);
        was_alive && health::is_dead(self.health)
    }

    pub fn heal(&mut self, amount: f32, max_health: f32) {
        self.health = health::clamp_health(self.health + amount.max(0.0), max_health);
    }

    pub fn eat(&mut self, amount: f32) {
        self.hunger = (self.hunger + amount).clamp(0.0, MAX_NEED);
    }

    pub fn drink(&mut self, amount: f32) {
        self.thirst = (self.thirst + amount).clamp(0.0, MAX_NEED);
    }

    pub fn is_dead(&self) -> bool {
        health::is_dead(self.health)
    }
}

/// Level, experience and age (in evaluated ticks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub level: u32,
    pub xp: u32,
    pub age: u64,
    pub max_age: u64,
}

impl Progression {
    pub fn new(level: u32, max_age: u64) -> Self {
        Self {
            level: level.max(1),
            xp: 0,
            age: 0,
            max_age,
        }
    }
}

/// AI behaviour state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    Idle,
    Wandering,
    Targeting,
    Combat,
    Fleeing,
}

/// Something an AI can be locked onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Cell(CellPos),
    Creature(#[serde(with = "entity_bits")] Entity),
    Player,
}

/// Why a creature is heading for its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purpose {
    Eat,
    Drink,
    Work(WorkAction),
    Build,
    Hunt,
    Explore,
}

/// Per-creature AI state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    pub state: AiState,
    /// Evaluated ticks left in `state`.
    pub remaining: u32,
    pub target: Option<Target>,
    pub purpose: Option<Purpose>,
    /// Who hit this creature since its last evaluation.
    pub provoked_by: Option<Target>,
    /// Ticks until the next attack or step is allowed.
    pub attack_cooldown: u32,
    pub move_cooldown: u32,
}

impl Brain {
    pub fn idle(duration: u32) -> Self {
        Self {
            state: AiState::Idle,
            remaining: duration.max(1),
            target: None,
            purpose: None,
            provoked_by: None,
            attack_cooldown: 0,
            move_cooldown: 0,
        }
    }

    /// Enter `state` with a fresh counter.
    pub fn transition(&mut self, state: AiState, duration: u32, target: Option<Target>, purpose: Option<Purpose>) {
        self.state = state;
        self.remaining = duration.max(1);
        self.target = target;
        self.purpose = purpose;
    }
}

/// Recently visited cells, avoided while wandering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLane {
    cells: VecDeque<CellPos>,
    capacity: usize,
}

impl MemoryLane {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn remember(&mut self, cell: CellPos) {
        if self.capacity == 0 {
            return;
        }
        if self.cells.len() == self.capacity {
            self.cells.pop_front();
        }
        self.cells.push_back(cell);
    }

    pub fn contains(&self, cell: CellPos) -> bool {
        self.cells.contains(&cell)
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// NPC quest focus: the active bias and everything unlocked so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Focus {
    pub active: QuestFocus,
    pub unlocked: Vec<QuestFocus>,
}

impl Focus {
    pub fn new(active: QuestFocus) -> Self {
        Self {
            active,
            unlocked: vec![active],
        }
    }

    pub fn unlock(&mut self, focus: QuestFocus) -> bool {
        if self.unlocked.contains(&focus) {
            return false;
        }
        self.unlocked.push(focus);
        true
    }
}

/// Faction handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactionId(pub u32);

/// Membership of a creature in a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionMember(pub FactionId);

#[cfg(test)]
mod tests {
    use super::*;
    use wildgrid_logic::species::AnimalKind;

    #[test]
    fn damage_reports_the_fatal_hit_once() {
        let mut v = Vitals::full(20.0);
        assert!(!v.damage(5.0, 20.0));
        assert!(v.damage(50.0, 20.0));
        assert_eq!(v.health, 0.0);
        assert!(!v.damage(5.0, 20.0));
    }

    #[test]
    fn heal_never_exceeds_max() {
        let mut v = Vitals::full(20.0);
        v.damage(3.0, 20.0);
        v.heal(100.0, 20.0);
        assert_eq!(v.health, 20.0);
    }

    #[test]
    fn memory_lane_forgets_oldest() {
        let mut lane = MemoryLane::new(2);
        lane.remember(CellPos::new(1, 1));
        lane.remember(CellPos::new(2, 2));
        lane.remember(CellPos::new(3, 3));
        assert!(!lane.contains(CellPos::new(1, 1)));
        assert!(lane.contains(CellPos::new(3, 3)));
        assert_eq!(lane.len(), 2);
    }

    #[test]
    fn doubled_label_and_strength() {
        let mut wolf = Creature::new(CreatureKind::Animal(AnimalKind::Wolf));
        let single = wolf.strength(2);
        wolf.doubled = true;
        assert_eq!(wolf.label(), "wolf_double");
        assert!(wolf.strength(2) > single);
        assert_eq!(wolf.max_health(2), 60.0);
    }

    #[test]
    fn transition_reinitializes_counter() {
        let mut brain = Brain::idle(60);
        brain.remaining = 3;
        brain.transition(AiState::Wandering, 120, None, None);
        assert_eq!(brain.state, AiState::Wandering);
        assert_eq!(brain.remaining, 120);
    }
}
