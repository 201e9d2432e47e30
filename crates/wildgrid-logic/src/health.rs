//! Pure health, survival and leveling math.
//!
//! Stats scale linearly with level: `max_health(level) = base × level`
//! and `strength(level) = base × level`. Health is always clamped to
//! `[0, max_health(level)]`.

use crate::config::{LevelingConfig, SurvivalConfig};
use crate::constants::MAX_NEED;

/// Coarse health condition, used for flee checks and render hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Above half health.
    Healthy,
    /// Between the flee threshold and half health.
    Wounded,
    /// Below the flee threshold.
    Critical,
}

impl Condition {
    pub fn from_fraction(fraction: f32, flee_threshold: f32) -> Self {
        if fraction < flee_threshold {
            Self::Critical
        } else if fraction <= 0.5 {
            Self::Wounded
        } else {
            Self::Healthy
        }
    }
}

pub fn max_health(base: f32, level: u32) -> f32 {
    base * level.max(1) as f32
}

pub fn strength(base: f32, level: u32) -> f32 {
    base * level.max(1) as f32
}

/// Clamp health into `[0, max]`. Non-finite values count as dead.
pub fn clamp_health(health: f32, max: f32) -> f32 {
    if health.is_finite() {
        health.clamp(0.0, max.max(0.0))
    } else {
        0.0
    }
}

pub fn is_dead(health: f32) -> bool {
    health <= 0.0
}

pub fn xp_to_next(level: u32, config: &LevelingConfig) -> u32 {
    config.xp_per_level * level.max(1)
}

/// Result of granting experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpGain {
    pub level: u32,
    pub xp: u32,
    pub levels_gained: u32,
}

/// Add `gained` XP, rolling over into as many levels as it covers.
pub fn apply_xp(level: u32, xp: u32, gained: u32, config: &LevelingConfig) -> XpGain {
    let mut level = level.max(1);
    let mut xp = xp.saturating_add(gained);
    let mut levels_gained = 0;
    loop {
        let needed = xp_to_next(level, config);
        if xp < needed {
            break;
        }
        xp -= needed;
        level += 1;
        levels_gained += 1;
    }
    XpGain {
        level,
        xp,
        levels_gained,
    }
}

/// Needs after one evaluated tick of decay.
pub fn decay_needs(hunger: f32, thirst: f32, config: &SurvivalConfig) -> (f32, f32) {
    (
        (hunger - config.hunger_decay).clamp(0.0, MAX_NEED),
        (thirst - config.thirst_decay).clamp(0.0, MAX_NEED),
    )
}

/// Damage taken this tick from empty needs and old age.
pub fn survival_damage(hunger: f32, thirst: f32, past_max_age: bool, config: &SurvivalConfig) -> f32 {
    let mut damage = 0.0;
    if hunger <= 0.0 {
        damage += config.starvation_damage;
    }
    if thirst <= 0.0 {
        damage += config.dehydration_damage;
    }
    if past_max_age {
        damage += config.old_age_damage;
    }
    damage
}

/// Where a creature is resting, for healing bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shelter {
    Open,
    Camp,
    House,
}

/// Healing granted on a healing tick, zero unless fed and watered.
pub fn healing(hunger: f32, thirst: f32, shelter: Shelter, config: &SurvivalConfig) -> f32 {
    let half = MAX_NEED * 0.5;
    if hunger <= half || thirst <= half {
        return 0.0;
    }
    let multiplier = match shelter {
        Shelter::Open => 1.0,
        Shelter::Camp => config.camp_healing_multiplier,
        Shelter::House => config.house_healing_multiplier,
    };
    config.healing * multiplier
}
