//! Creature kinds and their behaviour records.
//!
//! Every kind carries a static [`Behavior`] record. Systems dispatch on
//! [`CreatureKind`] by exhaustive match, so adding a kind is a
//! compile-checked change.
//!
//! | Kind | HP | Str | Aggr | Flee | Hostile |
//! |------|----|-----|------|------|---------|
//! | Sheep | 20 | 6 | 0.02 | 0.95 | no |
//! | Deer | 30 | 9 | 0.05 | 0.90 | no |
//! | Wolf | 30 | 15 | 0.80 | 0.20 | yes |
//! | Farmer | 80 | 13 | 0.05 | 0.70 | no |
//! | Guard | 130 | 31 | 0.95 | 0.10 | no |
//! | King | 150 | 41 | 0.70 | 0.05 | no |
//! | Bandit | 50 | 20 | 0.90 | 0.10 | yes |
//! | Skeleton | 35 | 12 | 0.60 | 0.05 | yes |

use serde::{Deserialize, Serialize};

use crate::cells::CellType;
use crate::items::Item;
use crate::quests::QuestFocus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnimalKind {
    Sheep,
    Deer,
    Wolf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeacefulRole {
    Farmer,
    Trader,
    Blacksmith,
    Wizard,
    Lumberjack,
    Miner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CombatRole {
    Guard,
    Warrior,
    Commander,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HostileKind {
    Bandit,
    Goblin,
    Skeleton,
    Termite,
    Bat,
}

/// What a creature is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CreatureKind {
    Animal(AnimalKind),
    Peaceful(PeacefulRole),
    Combat(CombatRole),
    Hostile(HostileKind),
}

/// Coarse selector over creature kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureFilter {
    Animal,
    Peaceful,
    Hostile,
    Any,
}

impl CreatureFilter {
    pub fn matches(self, kind: CreatureKind) -> bool {
        match self {
            CreatureFilter::Animal => matches!(kind, CreatureKind::Animal(_)),
            CreatureFilter::Peaceful => matches!(kind, CreatureKind::Peaceful(_)),
            CreatureFilter::Hostile => kind.is_hostile(),
            CreatureFilter::Any => true,
        }
    }
}

/// The action a creature performs on arriving at a work cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkAction {
    /// Eat grass, leaving dirt.
    Graze,
    /// Harvest, plant or till depending on the cell.
    Farm,
    /// Fell a tree for wood; build a house once enough wood is carried.
    Chop,
    Mine,
    Trade,
    Forge,
    /// Eat a tree down to dirt.
    Gnaw,
}

/// Static behaviour parameters for one creature kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    pub base_health: f32,
    pub base_strength: f32,
    /// Chance to pick a target when idling ends.
    pub aggressiveness: f32,
    /// Chance to drop a target and go wandering.
    pub passiveness: f32,
    /// Chance to stay idle when idling ends.
    pub idleness: f32,
    /// Chance to flee instead of fight when a threat appears.
    pub flee_chance: f32,
    pub hostile: bool,
    /// Creatures this kind actively hunts regardless of quest focus.
    pub hunts: Option<CreatureFilter>,
    pub food: &'static [CellType],
    pub water: &'static [CellType],
    /// Skeletons neither eat nor drink.
    pub needs_sustenance: bool,
    pub work: Option<WorkAction>,
    pub work_success: f32,
    /// Number of recently visited cells avoided while wandering.
    pub memory_len: usize,
    pub detection_radius: i32,
    pub nocturnal: bool,
    pub inventory_slots: usize,
    /// Items dropped on death.
    pub drops: &'static [(Item, u32)],
}

const CROPS: &[CellType] = &[CellType::Carrot1, CellType::Carrot2, CellType::Carrot3];
const WATER: &[CellType] = &[CellType::Water];
const WATER_OR_WELL: &[CellType] = &[CellType::Water, CellType::Well];

static SHEEP: Behavior = Behavior {
    base_health: 20.0,
    base_strength: 6.0,
    aggressiveness: 0.02,
    passiveness: 0.70,
    idleness: 0.25,
    flee_chance: 0.95,
    hostile: false,
    hunts: None,
    food: &[CellType::Grass],
    water: WATER,
    needs_sustenance: true,
    work: Some(WorkAction::Graze),
    work_success: 0.3,
    memory_len: 8,
    detection_radius: 6,
    nocturnal: false,
    inventory_slots: 0,
    drops: &[(Item::Meat, 2), (Item::Fur, 1)],
};

static DEER: Behavior = Behavior {
    base_health: 30.0,
    base_strength: 9.0,
    aggressiveness: 0.05,
    passiveness: 0.60,
    idleness: 0.20,
    flee_chance: 0.90,
    hostile: false,
    hunts: None,
    food: &[
        CellType::Grass,
        CellType::Carrot1,
        CellType::Carrot2,
        CellType::Carrot3,
    ],
    water: WATER,
    needs_sustenance: true,
    work: Some(WorkAction::Graze),
    work_success: 0.3,
    memory_len: 8,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 0,
    drops: &[(Item::Meat, 3), (Item::Fur, 1)],
};

static WOLF: Behavior = Behavior {
    base_health: 30.0,
    base_strength: 15.0,
    aggressiveness: 0.80,
    passiveness: 0.10,
    idleness: 0.05,
    flee_chance: 0.20,
    hostile: true,
    hunts: Some(CreatureFilter::Animal),
    food: &[],
    water: WATER,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 10,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 0,
    drops: &[(Item::Meat, 1), (Item::Fur, 2)],
};

static FARMER: Behavior = Behavior {
    base_health: 80.0,
    base_strength: 13.0,
    aggressiveness: 0.05,
    passiveness: 0.40,
    idleness: 0.15,
    flee_chance: 0.70,
    hostile: false,
    hunts: None,
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: Some(WorkAction::Farm),
    work_success: 0.4,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 8,
    drops: &[],
};

static TRADER: Behavior = Behavior {
    base_health: 70.0,
    base_strength: 11.0,
    aggressiveness: 0.10,
    passiveness: 0.50,
    idleness: 0.30,
    flee_chance: 0.80,
    hostile: false,
    hunts: None,
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: Some(WorkAction::Trade),
    work_success: 0.5,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 10,
    drops: &[(Item::Gold, 2)],
};

static BLACKSMITH: Behavior = Behavior {
    base_health: 90.0,
    base_strength: 25.0,
    aggressiveness: 0.25,
    passiveness: 0.25,
    idleness: 0.30,
    flee_chance: 0.50,
    hostile: false,
    hunts: None,
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: Some(WorkAction::Forge),
    work_success: 0.5,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 8,
    drops: &[],
};

static WIZARD: Behavior = Behavior {
    base_health: 60.0,
    base_strength: 13.0,
    aggressiveness: 0.20,
    passiveness: 0.10,
    idleness: 0.05,
    flee_chance: 0.50,
    hostile: false,
    hunts: None,
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 6,
    drops: &[],
};

static LUMBERJACK: Behavior = Behavior {
    base_health: 100.0,
    base_strength: 19.0,
    aggressiveness: 0.95,
    passiveness: 0.30,
    idleness: 0.20,
    flee_chance: 0.60,
    hostile: false,
    hunts: Some(CreatureFilter::Hostile),
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: Some(WorkAction::Chop),
    work_success: 0.85,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 8,
    drops: &[],
};

static MINER: Behavior = Behavior {
    base_health: 110.0,
    base_strength: 21.0,
    aggressiveness: 0.10,
    passiveness: 0.35,
    idleness: 0.20,
    flee_chance: 0.65,
    hostile: false,
    hunts: None,
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: Some(WorkAction::Mine),
    work_success: 0.7,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 8,
    drops: &[],
};

static GUARD: Behavior = Behavior {
    base_health: 130.0,
    base_strength: 31.0,
    aggressiveness: 0.95,
    passiveness: 0.02,
    idleness: 0.01,
    flee_chance: 0.10,
    hostile: false,
    hunts: Some(CreatureFilter::Hostile),
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 6,
    drops: &[],
};

static WARRIOR: Behavior = Behavior {
    base_health: 100.0,
    base_strength: 26.0,
    aggressiveness: 0.95,
    passiveness: 0.02,
    idleness: 0.01,
    flee_chance: 0.05,
    hostile: false,
    hunts: Some(CreatureFilter::Hostile),
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 6,
    drops: &[],
};

static COMMANDER: Behavior = Behavior {
    base_health: 120.0,
    base_strength: 31.0,
    aggressiveness: 0.75,
    passiveness: 0.08,
    idleness: 0.07,
    flee_chance: 0.03,
    hostile: false,
    hunts: Some(CreatureFilter::Hostile),
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 6,
    drops: &[],
};

static KING: Behavior = Behavior {
    base_health: 150.0,
    base_strength: 41.0,
    aggressiveness: 0.70,
    passiveness: 0.10,
    idleness: 0.15,
    flee_chance: 0.05,
    hostile: false,
    hunts: Some(CreatureFilter::Hostile),
    food: CROPS,
    water: WATER_OR_WELL,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 25,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 10,
    drops: &[(Item::Gold, 5)],
};

static BANDIT: Behavior = Behavior {
    base_health: 50.0,
    base_strength: 20.0,
    aggressiveness: 0.90,
    passiveness: 0.03,
    idleness: 0.02,
    flee_chance: 0.10,
    hostile: true,
    hunts: None,
    food: &[],
    water: WATER,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 10,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 6,
    drops: &[(Item::Gold, 1)],
};

static GOBLIN: Behavior = Behavior {
    base_health: 35.0,
    base_strength: 12.0,
    aggressiveness: 0.85,
    passiveness: 0.05,
    idleness: 0.03,
    flee_chance: 0.15,
    hostile: true,
    hunts: None,
    food: &[],
    water: WATER,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 10,
    detection_radius: 8,
    nocturnal: false,
    inventory_slots: 4,
    drops: &[(Item::Bones, 1)],
};

static SKELETON: Behavior = Behavior {
    base_health: 35.0,
    base_strength: 12.0,
    aggressiveness: 0.60,
    passiveness: 0.20,
    idleness: 0.10,
    flee_chance: 0.05,
    hostile: true,
    hunts: None,
    food: &[],
    water: &[],
    needs_sustenance: false,
    work: None,
    work_success: 0.0,
    memory_len: 10,
    detection_radius: 8,
    nocturnal: true,
    inventory_slots: 0,
    drops: &[(Item::Bones, 2)],
};

static TERMITE: Behavior = Behavior {
    base_health: 25.0,
    base_strength: 3.0,
    aggressiveness: 0.95,
    passiveness: 0.02,
    idleness: 0.01,
    flee_chance: 0.80,
    hostile: true,
    hunts: None,
    food: &[CellType::Tree1, CellType::Tree2],
    water: WATER,
    needs_sustenance: true,
    work: Some(WorkAction::Gnaw),
    work_success: 0.5,
    memory_len: 10,
    detection_radius: 4,
    nocturnal: false,
    inventory_slots: 0,
    drops: &[],
};

static BAT: Behavior = Behavior {
    base_health: 10.0,
    base_strength: 4.0,
    aggressiveness: 0.40,
    passiveness: 0.30,
    idleness: 0.10,
    flee_chance: 0.30,
    hostile: true,
    hunts: None,
    food: &[],
    water: WATER,
    needs_sustenance: true,
    work: None,
    work_success: 0.0,
    memory_len: 10,
    detection_radius: 6,
    nocturnal: true,
    inventory_slots: 0,
    drops: &[],
};

impl CreatureKind {
    pub const ALL: [CreatureKind; 18] = [
        CreatureKind::Animal(AnimalKind::Sheep),
        CreatureKind::Animal(AnimalKind::Deer),
        CreatureKind::Animal(AnimalKind::Wolf),
        CreatureKind::Peaceful(PeacefulRole::Farmer),
        CreatureKind::Peaceful(PeacefulRole::Trader),
        CreatureKind::Peaceful(PeacefulRole::Blacksmith),
        CreatureKind::Peaceful(PeacefulRole::Wizard),
        CreatureKind::Peaceful(PeacefulRole::Lumberjack),
        CreatureKind::Peaceful(PeacefulRole::Miner),
        CreatureKind::Combat(CombatRole::Guard),
        CreatureKind::Combat(CombatRole::Warrior),
        CreatureKind::Combat(CombatRole::Commander),
        CreatureKind::Combat(CombatRole::King),
        CreatureKind::Hostile(HostileKind::Bandit),
        CreatureKind::Hostile(HostileKind::Goblin),
        CreatureKind::Hostile(HostileKind::Skeleton),
        CreatureKind::Hostile(HostileKind::Termite),
        CreatureKind::Hostile(HostileKind::Bat),
    ];

    pub fn behavior(self) -> &'static Behavior {
        match self {
            CreatureKind::Animal(kind) => match kind {
                AnimalKind::Sheep => &SHEEP,
                AnimalKind::Deer => &DEER,
                AnimalKind::Wolf => &WOLF,
            },
            CreatureKind::Peaceful(role) => match role {
                PeacefulRole::Farmer => &FARMER,
                PeacefulRole::Trader => &TRADER,
                PeacefulRole::Blacksmith => &BLACKSMITH,
                PeacefulRole::Wizard => &WIZARD,
                PeacefulRole::Lumberjack => &LUMBERJACK,
                PeacefulRole::Miner => &MINER,
            },
            CreatureKind::Combat(role) => match role {
                CombatRole::Guard => &GUARD,
                CombatRole::Warrior => &WARRIOR,
                CombatRole::Commander => &COMMANDER,
                CombatRole::King => &KING,
            },
            CreatureKind::Hostile(kind) => match kind {
                HostileKind::Bandit => &BANDIT,
                HostileKind::Goblin => &GOBLIN,
                HostileKind::Skeleton => &SKELETON,
                HostileKind::Termite => &TERMITE,
                HostileKind::Bat => &BAT,
            },
        }
    }

    pub fn is_hostile(self) -> bool {
        self.behavior().hostile
    }

    /// Humanoid NPCs carry names, quest focuses and faction membership.
    pub fn is_npc(self) -> bool {
        matches!(self, CreatureKind::Peaceful(_) | CreatureKind::Combat(_))
            || matches!(
                self,
                CreatureKind::Hostile(HostileKind::Bandit | HostileKind::Goblin)
            )
    }

    /// Peaceful kinds never migrate during catch-up.
    pub fn is_settled(self) -> bool {
        matches!(self, CreatureKind::Peaceful(_) | CreatureKind::Combat(_))
    }

    pub fn default_focus(self) -> Option<QuestFocus> {
        match self {
            CreatureKind::Animal(_) => None,
            CreatureKind::Peaceful(role) => Some(match role {
                PeacefulRole::Farmer => QuestFocus::Farming,
                PeacefulRole::Lumberjack => QuestFocus::Building,
                PeacefulRole::Miner => QuestFocus::Mining,
                PeacefulRole::Trader | PeacefulRole::Blacksmith | PeacefulRole::Wizard => {
                    QuestFocus::Exploring
                }
            }),
            CreatureKind::Combat(CombatRole::Guard) => Some(QuestFocus::Exploring),
            CreatureKind::Combat(_) => Some(QuestFocus::CombatHostile),
            CreatureKind::Hostile(_) => Some(QuestFocus::CombatAll),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CreatureKind::Animal(AnimalKind::Sheep) => "sheep",
            CreatureKind::Animal(AnimalKind::Deer) => "deer",
            CreatureKind::Animal(AnimalKind::Wolf) => "wolf",
            CreatureKind::Peaceful(PeacefulRole::Farmer) => "farmer",
            CreatureKind::Peaceful(PeacefulRole::Trader) => "trader",
            CreatureKind::Peaceful(PeacefulRole::Blacksmith) => "blacksmith",
            CreatureKind::Peaceful(PeacefulRole::Wizard) => "wizard",
            CreatureKind::Peaceful(PeacefulRole::Lumberjack) => "lumberjack",
            CreatureKind::Peaceful(PeacefulRole::Miner) => "miner",
            CreatureKind::Combat(CombatRole::Guard) => "guard",
            CreatureKind::Combat(CombatRole::Warrior) => "warrior",
            CreatureKind::Combat(CombatRole::Commander) => "commander",
            CreatureKind::Combat(CombatRole::King) => "king",
            CreatureKind::Hostile(HostileKind::Bandit) => "bandit",
            CreatureKind::Hostile(HostileKind::Goblin) => "goblin",
            CreatureKind::Hostile(HostileKind::Skeleton) => "skeleton",
            CreatureKind::Hostile(HostileKind::Termite) => "termite",
            CreatureKind::Hostile(HostileKind::Bat) => "bat",
        }
    }
}

impl std::fmt::Display for CreatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Species-level hostility: exactly one side hostile, or two different
/// hostile species. Faction rivalry is layered on top by the caller.
pub fn are_enemies(a: CreatureKind, b: CreatureKind) -> bool {
    match (a.is_hostile(), b.is_hostile()) {
        (true, false) | (false, true) => true,
        (true, true) => a != b,
        (false, false) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_sane_record() {
        for kind in CreatureKind::ALL {
            let b = kind.behavior();
            assert!(b.base_health > 0.0, "{kind}");
            assert!(b.base_strength > 0.0, "{kind}");
            assert!((0.0..=1.0).contains(&b.flee_chance), "{kind}");
            assert!((8..=25).contains(&b.memory_len), "{kind}");
        }
    }

    #[test]
    fn stat_table_matches_roster() {
        let guard = CreatureKind::Combat(CombatRole::Guard).behavior();
        assert_eq!(guard.base_health, 130.0);
        assert_eq!(guard.base_strength, 31.0);
        let bat = CreatureKind::Hostile(HostileKind::Bat).behavior();
        assert!(bat.nocturnal);
    }

    #[test]
    fn enemy_rules() {
        let sheep = CreatureKind::Animal(AnimalKind::Sheep);
        let wolf = CreatureKind::Animal(AnimalKind::Wolf);
        let goblin = CreatureKind::Hostile(HostileKind::Goblin);
        let farmer = CreatureKind::Peaceful(PeacefulRole::Farmer);
        assert!(are_enemies(sheep, wolf));
        assert!(are_enemies(wolf, goblin));
        assert!(!are_enemies(goblin, goblin));
        assert!(!are_enemies(sheep, farmer));
    }

    #[test]
    fn default_focus_by_role() {
        assert_eq!(
            CreatureKind::Peaceful(PeacefulRole::Farmer).default_focus(),
            Some(QuestFocus::Farming)
        );
        assert_eq!(
            CreatureKind::Combat(CombatRole::King).default_focus(),
            Some(QuestFocus::CombatHostile)
        );
        assert_eq!(CreatureKind::Animal(AnimalKind::Deer).default_focus(), None);
    }

    #[test]
    fn filters() {
        assert!(CreatureFilter::Hostile.matches(CreatureKind::Animal(AnimalKind::Wolf)));
        assert!(!CreatureFilter::Animal.matches(CreatureKind::Hostile(HostileKind::Bat)));
        assert!(CreatureFilter::Any.matches(CreatureKind::Combat(CombatRole::King)));
    }
}
