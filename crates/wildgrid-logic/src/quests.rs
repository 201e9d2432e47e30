//! Quest types for the player and quest focuses for NPCs.

use serde::{Deserialize, Serialize};

use crate::cells::CellType;
use crate::config::QuestConfig;
use crate::species::CreatureFilter;

/// Player quest types. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestType {
    Farm,
    Hunt,
    Slay,
    Explore,
    Gather,
    Lumber,
    Mine,
    Rescue,
    Search,
    CombatHostile,
    CombatAll,
}

/// What kind of thing a quest points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestTargetKind {
    /// A cell of one of these types; done once the cell changes.
    Cell(&'static [CellType]),
    /// A creature matching the filter.
    Creature(CreatureFilter),
    /// A zone to walk into.
    Zone,
}

impl QuestType {
    pub const ALL: [QuestType; 11] = [
        QuestType::Farm,
        QuestType::Hunt,
        QuestType::Slay,
        QuestType::Explore,
        QuestType::Gather,
        QuestType::Lumber,
        QuestType::Mine,
        QuestType::Rescue,
        QuestType::Search,
        QuestType::CombatHostile,
        QuestType::CombatAll,
    ];

    pub fn target_kind(self) -> QuestTargetKind {
        use QuestType::*;
        match self {
            Farm => QuestTargetKind::Cell(&[CellType::Carrot3]),
            Gather => QuestTargetKind::Cell(&[CellType::Flower, CellType::Carrot3]),
            Lumber => QuestTargetKind::Cell(&[CellType::Tree1, CellType::Tree2]),
            Mine => QuestTargetKind::Cell(&[CellType::Stone]),
            Search => QuestTargetKind::Cell(&[CellType::HiddenCave, CellType::Chest]),
            Hunt => QuestTargetKind::Creature(CreatureFilter::Animal),
            Slay | CombatHostile => QuestTargetKind::Creature(CreatureFilter::Hostile),
            CombatAll => QuestTargetKind::Creature(CreatureFilter::Any),
            Rescue => QuestTargetKind::Creature(CreatureFilter::Peaceful),
            Explore => QuestTargetKind::Zone,
        }
    }

    /// Whether the target creature disappearing counts as success.
    pub fn completes_on_target_death(self) -> bool {
        matches!(
            self,
            QuestType::Hunt | QuestType::Slay | QuestType::CombatHostile | QuestType::CombatAll
        )
    }

    /// Ticks before this quest can be given a new target.
    pub fn cooldown(self, config: &QuestConfig) -> u32 {
        match self {
            QuestType::Farm => config.farm_cooldown,
            _ => config.cooldown,
        }
    }
}

/// XP granted for completing a quest at the given player level.
pub fn completion_xp(level: u32, config: &QuestConfig) -> u32 {
    config.xp_multiplier * level.max(1)
}

/// An NPC's long-term behavioural bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestFocus {
    Farming,
    Building,
    Mining,
    Exploring,
    CombatHostile,
    CombatAll,
}

impl QuestFocus {
    pub const ALL: [QuestFocus; 6] = [
        QuestFocus::Farming,
        QuestFocus::Building,
        QuestFocus::Mining,
        QuestFocus::Exploring,
        QuestFocus::CombatHostile,
        QuestFocus::CombatAll,
    ];

    /// Cell types this focus works on, in preference order.
    pub fn work_cells(self) -> &'static [CellType] {
        match self {
            QuestFocus::Farming => &[
                CellType::Carrot3,
                CellType::Carrot2,
                CellType::Soil,
                CellType::Grass,
                CellType::Dirt,
            ],
            QuestFocus::Building => &[CellType::Tree1, CellType::Tree2],
            QuestFocus::Mining => &[CellType::Stone],
            QuestFocus::Exploring | QuestFocus::CombatHostile | QuestFocus::CombatAll => &[],
        }
    }

    /// Creatures this focus hunts, if any.
    pub fn prey(self) -> Option<CreatureFilter> {
        match self {
            QuestFocus::CombatHostile => Some(CreatureFilter::Hostile),
            QuestFocus::CombatAll => Some(CreatureFilter::Any),
            _ => None,
        }
    }
}
