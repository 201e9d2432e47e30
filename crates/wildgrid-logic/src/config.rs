//! Immutable simulation configuration.
//!
//! A [`SimConfig`] is built once at startup (from defaults or a JSON file)
//! and handed to every system by reference. Nothing reads tuning values
//! from ambient state.
//!
//! ```
//! use wildgrid_logic::config::SimConfig;
//!
//! let config = SimConfig::from_json(r#"{ "scheduler": { "max_zones_per_pass": 8 } }"#).unwrap();
//! assert_eq!(config.scheduler.max_zones_per_pass, 8);
//! assert_eq!(config.scheduler.max_cycles, 100);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::biome::BiomeTable;
use crate::constants::ai_durations;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Every tuned constant of the simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub automaton: AutomatonRates,
    pub weather: WeatherConfig,
    pub scheduler: SchedulerConfig,
    pub ai: AiConfig,
    pub survival: SurvivalConfig,
    pub leveling: LevelingConfig,
    pub spawning: SpawnConfig,
    pub factions: FactionConfig,
    pub quests: QuestConfig,
    pub biomes: BiomeTable,
}

/// Per-tick transition rates for the cellular automaton.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatonRates {
    pub grass_to_dirt: f32,
    pub dirt_to_grass: f32,
    pub dirt_to_sand: f32,
    pub tree_growth: f32,
    pub tree_mature: f32,
    pub tree_decay: f32,
    pub sand_reclaim: f32,
    pub flower_spread: f32,
    pub flower_decay: f32,
    pub deep_water_form: f32,
    pub deep_water_evaporate: f32,
    pub water_to_dirt: f32,
    pub flooding: f32,
    pub carrot_growth: f32,
    pub carrot_ripen: f32,
    pub crop_decay: f32,
    pub soil_decay: f32,
    pub cobblestone_wear: f32,
    pub camp_to_house: f32,
    pub house_upgrade: f32,
    pub cactus_decay: f32,
    pub cave_reveal: f32,
    pub bones_decay: f32,
    /// Growth multiplier applied once per adjacent water cell.
    pub water_neighbor_bonus: f32,
    /// Tree decay multiplier applied once per adjacent fire cell.
    pub fire_decay_multiplier: f32,
    /// Growth multiplier while it is raining on the zone.
    pub rain_growth_multiplier: f32,
    /// Crops count as watered for this many ticks after rain.
    pub watered_window_ticks: u64,
}

impl Default for AutomatonRates {
    fn default() -> Self {
        Self {
            grass_to_dirt: 0.00001,
            dirt_to_grass: 0.0001,
            dirt_to_sand: 0.000005,
            tree_growth: 0.00005,
            tree_mature: 0.00005,
            tree_decay: 0.0005,
            sand_reclaim: 0.0005,
            flower_spread: 0.0001,
            flower_decay: 0.0005,
            deep_water_form: 0.05,
            deep_water_evaporate: 0.03,
            water_to_dirt: 0.005,
            flooding: 0.015,
            // Farming and structure rates are tuned per second, stored per tick.
            carrot_growth: 0.02 / 60.0,
            carrot_ripen: 0.015 / 60.0,
            crop_decay: 0.0002,
            soil_decay: 0.0002,
            cobblestone_wear: 0.00001,
            camp_to_house: 0.001 / 60.0,
            house_upgrade: 0.01 / 60.0,
            cactus_decay: 0.0002 / 60.0,
            cave_reveal: 0.005 / 60.0,
            bones_decay: 0.001,
            water_neighbor_bonus: 1.25,
            fire_decay_multiplier: 2.0,
            rain_growth_multiplier: 2.0,
            watered_window_ticks: 600,
        }
    }
}

/// Day/night and rain timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub day_length: u64,
    pub night_length: u64,
    pub rain_interval_min: u32,
    pub rain_interval_max: u32,
    pub rain_duration_min: u32,
    pub rain_duration_max: u32,
    /// Random cells per zone step that may turn to water while raining.
    pub rain_water_spawns: u32,
    /// Random cells per zone step that may turn to grass while raining.
    pub rain_grass_spawns: u32,
    pub rain_water_chance: f32,
    pub rain_grass_chance: f32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            day_length: 150,
            night_length: 150,
            rain_interval_min: 30,
            rain_interval_max: 250,
            rain_duration_min: 10,
            rain_duration_max: 60,
            rain_water_spawns: 5,
            rain_grass_spawns: 8,
            rain_water_chance: 0.3,
            rain_grass_chance: 0.4,
        }
    }
}

/// Catch-up scheduler limits and priority weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Real ticks between scheduler passes.
    pub update_interval: u64,
    pub max_zones_per_pass: usize,
    /// Hard cap on catch-up cycles for one zone in one pass.
    pub max_cycles: u32,
    /// Simulated ticks represented by one catch-up cycle.
    pub ticks_per_cycle: u64,
    /// Fraction of staleness simulated at distance 0, 1, 2 and 3+.
    pub coverage: [f32; 4],
    pub distance_weight: f32,
    pub density_weight: f32,
    pub staleness_weight: f32,
    /// Zones within this Chebyshev radius of the player are kept instantiated.
    pub nearby_radius: i32,
    /// Consecutive capped passes before a zone is reported as starved.
    pub starvation_report_after: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval: 30,
            max_zones_per_pass: 20,
            max_cycles: 100,
            ticks_per_cycle: 60,
            coverage: [1.0, 0.9, 0.8, 0.6],
            distance_weight: 1.0,
            density_weight: 1.0,
            staleness_weight: 1.0,
            nearby_radius: 4,
            starvation_report_after: 10,
        }
    }
}

/// AI state durations and behaviour chances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub idle_ticks: u32,
    pub wander_ticks: u32,
    pub targeting_ticks: u32,
    pub flee_ticks: u32,
    pub combat_min_seconds: u32,
    pub combat_max_seconds: u32,
    /// Ticks between two attacks of the same creature.
    pub attack_interval: u32,
    /// Chance to disengage over one `disengage_window` of combat.
    pub disengage_chance: f32,
    pub disengage_window: u32,
    /// Health fraction under which a fighter considers fleeing.
    pub flee_health_fraction: f32,
    pub low_health_flee_chance: f32,
    /// Radius (cells) searched for work and food targets.
    pub search_radius: i32,
    /// Ticks between two steps of the same creature.
    pub move_interval: u32,
    /// Fraction of strength dealt per hit.
    pub damage_scale: f32,
    /// Chance per evaluation that an eligible adjacent pair merges.
    pub merge_chance: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            idle_ticks: ai_durations::IDLE,
            wander_ticks: ai_durations::WANDER,
            targeting_ticks: ai_durations::TARGETING,
            flee_ticks: ai_durations::FLEE,
            combat_min_seconds: ai_durations::COMBAT_MIN_SECONDS,
            combat_max_seconds: ai_durations::COMBAT_MAX_SECONDS,
            attack_interval: 30,
            disengage_chance: 0.05,
            disengage_window: 120,
            flee_health_fraction: 0.3,
            low_health_flee_chance: 0.4,
            search_radius: 12,
            move_interval: 12,
            damage_scale: 0.25,
            merge_chance: 0.05,
        }
    }
}

impl AiConfig {
    /// Per-tick disengage probability equivalent to `disengage_chance`
    /// over `disengage_window` ticks.
    pub fn disengage_per_tick(&self) -> f32 {
        let window = self.disengage_window.max(1) as f32;
        1.0 - (1.0 - self.disengage_chance.clamp(0.0, 1.0)).powf(1.0 / window)
    }
}

/// Hunger, thirst, healing and ageing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    pub hunger_decay: f32,
    pub thirst_decay: f32,
    pub starvation_damage: f32,
    pub dehydration_damage: f32,
    /// Healing applied every `healing_interval` ticks while fed and watered.
    pub healing: f32,
    pub healing_interval: u64,
    pub camp_healing_multiplier: f32,
    pub house_healing_multiplier: f32,
    pub old_age_damage: f32,
    /// Hunger or thirst restored by one meal or drink.
    pub restore_amount: f32,
    pub default_max_age: u64,
    pub skeleton_daylight_damage: f32,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            hunger_decay: 0.02,
            thirst_decay: 0.015,
            starvation_damage: 0.1,
            dehydration_damage: 0.15,
            healing: 1.5,
            healing_interval: 60,
            camp_healing_multiplier: 2.0,
            house_healing_multiplier: 3.0,
            old_age_damage: 0.05,
            restore_amount: 30.0,
            default_max_age: 60 * 60 * 30,
            skeleton_daylight_damage: 1.0,
        }
    }
}

/// Experience curve and level-up side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingConfig {
    pub xp_per_level: u32,
    pub focus_unlock_chance: f32,
    pub focus_switch_chance: f32,
    pub max_age_growth: f32,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            xp_per_level: 100,
            focus_unlock_chance: 0.1,
            focus_switch_chance: 0.1,
            max_age_growth: 1.2,
        }
    }
}

/// Night spawns, raids and catch-up migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub night_skeleton_chance: f32,
    pub skeleton_night_damage: f32,
    pub skeleton_reach: i32,
    pub raid_interval: u64,
    pub raid_min_creatures: usize,
    pub raid_chance: f32,
    pub raid_max_size: u32,
    pub catchup_raid_min_cycles: u32,
    pub migration_min_cycles: u32,
    pub migration_rate: f32,
    pub migration_cap: f32,
    pub max_houses_per_zone: usize,
    pub house_wood_cost: u32,
    pub camp_wood_cost: u32,
    /// Upper bound on creatures living in one zone; spawns beyond it are skipped.
    pub max_creatures_per_zone: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            night_skeleton_chance: 0.01,
            skeleton_night_damage: 1.0,
            skeleton_reach: 3,
            raid_interval: 600,
            raid_min_creatures: 6,
            raid_chance: 0.08,
            raid_max_size: 3,
            catchup_raid_min_cycles: 20,
            migration_min_cycles: 10,
            migration_rate: 0.005,
            migration_cap: 0.3,
            max_houses_per_zone: 3,
            house_wood_cost: 10,
            camp_wood_cost: 5,
            max_creatures_per_zone: 24,
        }
    }
}

/// Faction sizing and recruitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactionConfig {
    /// Peaceful factions hold at most `base_max_size + leader level` members.
    pub base_max_size: usize,
    pub recruit_chance: f32,
    pub territory_interval: u64,
}

impl Default for FactionConfig {
    fn default() -> Self {
        Self {
            base_max_size: 3,
            recruit_chance: 0.1,
            territory_interval: 600,
        }
    }
}

/// Player quest cooldowns and rewards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestConfig {
    pub cooldown: u32,
    pub farm_cooldown: u32,
    pub xp_multiplier: u32,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            cooldown: 300,
            farm_cooldown: 30,
            xp_multiplier: 10,
        }
    }
}

const COVERAGE_FIELDS: [&str; 4] = [
    "scheduler.coverage[0]",
    "scheduler.coverage[1]",
    "scheduler.coverage[2]",
    "scheduler.coverage[3]",
];

fn check_rate(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a finite non-negative number, got {value}"),
        })
    }
}

fn check_chance(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check_rate(field, value)?;
    if value > 1.0 {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("probability {value} is above 1"),
        });
    }
    Ok(())
}

fn check_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}

fn check_range(field: &'static str, min: u32, max: u32) -> Result<(), ConfigError> {
    if min == 0 || min > max {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("invalid range {min}..={max}"),
        });
    }
    Ok(())
}

impl SimConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the simulation misbehave.
    ///
    /// The biome table is not checked here: a malformed entry is a
    /// generation fault, recovered per zone with the fallback biome.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.automaton;
        for (field, value) in [
            ("automaton.grass_to_dirt", a.grass_to_dirt),
            ("automaton.dirt_to_grass", a.dirt_to_grass),
            ("automaton.dirt_to_sand", a.dirt_to_sand),
            ("automaton.tree_growth", a.tree_growth),
            ("automaton.tree_mature", a.tree_mature),
            ("automaton.tree_decay", a.tree_decay),
            ("automaton.sand_reclaim", a.sand_reclaim),
            ("automaton.flower_spread", a.flower_spread),
            ("automaton.flower_decay", a.flower_decay),
            ("automaton.deep_water_form", a.deep_water_form),
            ("automaton.deep_water_evaporate", a.deep_water_evaporate),
            ("automaton.water_to_dirt", a.water_to_dirt),
            ("automaton.flooding", a.flooding),
            ("automaton.carrot_growth", a.carrot_growth),
            ("automaton.carrot_ripen", a.carrot_ripen),
            ("automaton.crop_decay", a.crop_decay),
            ("automaton.soil_decay", a.soil_decay),
            ("automaton.cobblestone_wear", a.cobblestone_wear),
            ("automaton.camp_to_house", a.camp_to_house),
            ("automaton.house_upgrade", a.house_upgrade),
            ("automaton.cactus_decay", a.cactus_decay),
            ("automaton.cave_reveal", a.cave_reveal),
            ("automaton.bones_decay", a.bones_decay),
            ("automaton.water_neighbor_bonus", a.water_neighbor_bonus),
            ("automaton.fire_decay_multiplier", a.fire_decay_multiplier),
            ("automaton.rain_growth_multiplier", a.rain_growth_multiplier),
            ("survival.hunger_decay", self.survival.hunger_decay),
            ("survival.thirst_decay", self.survival.thirst_decay),
            ("survival.starvation_damage", self.survival.starvation_damage),
            ("survival.dehydration_damage", self.survival.dehydration_damage),
            ("survival.healing", self.survival.healing),
            ("survival.old_age_damage", self.survival.old_age_damage),
            ("ai.damage_scale", self.ai.damage_scale),
        ] {
            check_rate(field, value)?;
        }

        for (field, value) in [
            ("weather.rain_water_chance", self.weather.rain_water_chance),
            ("weather.rain_grass_chance", self.weather.rain_grass_chance),
            ("ai.disengage_chance", self.ai.disengage_chance),
            ("ai.flee_health_fraction", self.ai.flee_health_fraction),
            ("ai.low_health_flee_chance", self.ai.low_health_flee_chance),
            ("ai.merge_chance", self.ai.merge_chance),
            ("spawning.night_skeleton_chance", self.spawning.night_skeleton_chance),
            ("spawning.raid_chance", self.spawning.raid_chance),
            ("spawning.migration_cap", self.spawning.migration_cap),
            ("factions.recruit_chance", self.factions.recruit_chance),
            ("leveling.focus_unlock_chance", self.leveling.focus_unlock_chance),
            ("leveling.focus_switch_chance", self.leveling.focus_switch_chance),
        ] {
            check_chance(field, value)?;
        }

        for (field, value) in COVERAGE_FIELDS.into_iter().zip(self.scheduler.coverage) {
            check_chance(field, value)?;
        }

        check_nonzero("scheduler.update_interval", self.scheduler.update_interval)?;
        check_nonzero("scheduler.ticks_per_cycle", self.scheduler.ticks_per_cycle)?;
        check_nonzero("scheduler.max_cycles", u64::from(self.scheduler.max_cycles))?;
        check_nonzero("weather.day_length", self.weather.day_length)?;
        check_nonzero("weather.night_length", self.weather.night_length)?;
        check_nonzero("ai.idle_ticks", u64::from(self.ai.idle_ticks))?;
        check_nonzero("ai.wander_ticks", u64::from(self.ai.wander_ticks))?;
        check_nonzero("ai.targeting_ticks", u64::from(self.ai.targeting_ticks))?;
        check_nonzero("ai.flee_ticks", u64::from(self.ai.flee_ticks))?;
        check_nonzero("ai.attack_interval", u64::from(self.ai.attack_interval))?;
        check_nonzero("ai.move_interval", u64::from(self.ai.move_interval))?;
        check_nonzero("survival.healing_interval", self.survival.healing_interval)?;
        check_nonzero("leveling.xp_per_level", u64::from(self.leveling.xp_per_level))?;
        check_range(
            "weather.rain_interval",
            self.weather.rain_interval_min,
            self.weather.rain_interval_max,
        )?;
        check_range(
            "weather.rain_duration",
            self.weather.rain_duration_min,
            self.weather.rain_duration_max,
        )?;
        check_range(
            "ai.combat_seconds",
            self.ai.combat_min_seconds,
            self.ai.combat_max_seconds,
        )?;
        Ok(())
    }
}
