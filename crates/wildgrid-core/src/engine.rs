//! Simulation engine - main entry point for running the simulation
//!
//! One call to [`SimulationEngine::update`] is one tick. The player's zone
//! advances every tick; every other loaded zone is advanced in bounded
//! catch-up passes chosen by the [`CatchUpScheduler`].

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use wildgrid_logic::catchup::plan_cycles;
use wildgrid_logic::cells::CellType;
use wildgrid_logic::config::SimConfig;
use wildgrid_logic::items::{Inventory, ItemStack};
use wildgrid_logic::quests::QuestType;
use wildgrid_logic::species::{CreatureKind, PeacefulRole};

use crate::components::*;
use crate::generation::{mix_seed, populate_zone, zone_seed};
use crate::persistence::{self, SaveData, SaveError, SAVE_VERSION};
use crate::systems::*;
use crate::zones::ZoneStore;

/// Fraction of the render offset kept each tick.
const OFFSET_SETTLE: f32 = 0.8;

/// What one tick did, for callers that care.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub weather: Vec<WeatherEvent>,
    pub catch_up: Vec<CatchUpJob>,
    pub deaths: Vec<Death>,
    pub merges: Vec<Merge>,
    pub kills: Vec<Kill>,
    pub spawned: usize,
    pub migrated: usize,
    pub player_move: Option<PlayerMove>,
    pub quest: Option<QuestCompletion>,
    pub player_died: bool,
}

/// Render-facing view of one creature.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: u64,
    pub zone: ZoneCoord,
    pub cell: CellPos,
    pub offset: Vec2,
    pub kind: CreatureKind,
    pub doubled: bool,
    pub state: AiState,
    pub health_fraction: f32,
}

/// Render-facing view of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellView {
    pub cell: CellPos,
    pub kind: CellType,
    /// Stable sprite variant in `0..kind.variant_count()`.
    pub variant: u8,
}

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing every creature
    pub world: World,
    pub zones: ZoneStore,
    pub player: Player,
    pub quests: QuestLog,
    pub clock: WorldClock,
    pub scheduler: CatchUpScheduler,
    pub factions: FactionRegistry,
    pub enchantments: Enchantments,
    pub loot: DroppedItems,
    config: Arc<SimConfig>,
    rng: ChaCha8Rng,
}

impl SimulationEngine {
    /// Create a world from a seed, with the player at the origin.
    pub fn new(config: Arc<SimConfig>, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let clock = WorldClock::new(&config.weather, &mut rng);
        let mut engine = Self {
            world: World::new(),
            zones: ZoneStore::new(seed),
            player: Player::new(ZoneCoord::ORIGIN, CellPos::center()),
            quests: QuestLog::default(),
            clock,
            scheduler: CatchUpScheduler::new(),
            factions: FactionRegistry::new(),
            enchantments: Enchantments::new(),
            loot: DroppedItems::new(),
            config,
            rng,
        };
        engine.load_surroundings(ZoneCoord::ORIGIN);
        engine.player.position = Position::new(ZoneCoord::ORIGIN, engine.spawn_cell(ZoneCoord::ORIGIN));
        info!(seed, zones = engine.zones.len(), creatures = engine.creature_count(), "world created");
        engine
    }

    pub fn with_default_config(seed: u64) -> Self {
        Self::new(Arc::new(SimConfig::default()), seed)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.zones.world_seed()
    }

    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    pub fn creature_count(&self) -> usize {
        self.world.query::<&Creature>().iter().count()
    }

    /// Advance by one tick.
    pub fn update(&mut self) -> TickReport {
        let config = Arc::clone(&self.config);
        let weather = self.clock.advance(&config.weather, &mut self.rng);
        let now = self.clock.tick();
        for event in &weather {
            debug!(tick = now, event = ?event, "weather");
        }
        self.enchantments.tick();

        let mut report = TickReport {
            tick: now,
            weather,
            ..TickReport::default()
        };

        report.player_move = self.autopilot(now);

        let here = self.player.zone();
        self.advance_zone(here, 1, true, &mut report);
        if let Some(zone) = self.zones.get(here) {
            player_survival(&mut self.player, zone, 1, &config.survival);
        }
        self.scheduler.touch(here, now);

        if CatchUpScheduler::is_due(now, &config.scheduler) {
            self.catch_up_pass(now, &mut report);
        }

        report.deaths.extend(self.reap());
        if respawn_if_dead(&mut self.player, &mut self.loot) {
            report.player_died = true;
            self.load_surroundings(self.player.zone());
        }

        self.quests.tick(1);
        report.quest = self
            .quests
            .check_completion(&self.world, &self.zones, &mut self.player, &config);
        self.quests
            .assign_target(&self.world, &self.zones, &self.player, &mut self.rng);

        self.settle_offsets();
        report
    }

    /// Run `ticks` updates.
    pub fn advance(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.update();
        }
    }

    // ------------------------------------------------------------------
    // Player input
    // ------------------------------------------------------------------

    /// Walk one cell. Counts as player input.
    pub fn move_player(&mut self, dir: Direction) -> PlayerMove {
        self.player.interrupt_autopilot();
        self.walk(dir)
    }

    /// Perform a direct action. Counts as player input.
    pub fn act(&mut self, action: PlayerAction) -> Result<ActionOutcome, ActionError> {
        let config = Arc::clone(&self.config);
        let outcome = perform_action(
            &mut self.world,
            &mut self.zones,
            &mut self.loot,
            &mut self.player,
            action,
            &config,
            &mut self.rng,
        )?;
        self.reap();
        Ok(outcome)
    }

    pub fn set_autopilot(&mut self, enabled: bool) {
        self.player.autopilot.enabled = enabled;
        self.player.interrupt_autopilot();
    }

    pub fn set_quest(&mut self, kind: QuestType) {
        self.quests.set_active(kind);
        self.player.interrupt_autopilot();
    }

    pub fn cast(&mut self, target: EnchantTarget, duration: u32) {
        self.enchantments.cast(target, duration);
    }

    fn walk(&mut self, dir: Direction) -> PlayerMove {
        let config = Arc::clone(&self.config);
        let outcome = move_player(&mut self.player, &mut self.zones, dir, &config.biomes);
        match outcome {
            PlayerMove::Blocked => return outcome,
            PlayerMove::Moved => {}
            PlayerMove::Crossed { from, to } => self.enter_zone(from, to),
        }
        pick_up(&mut self.player, &mut self.loot);
        outcome
    }

    /// Bring a zone the player just entered up to date before it goes live.
    fn enter_zone(&mut self, from: ZoneCoord, to: ZoneCoord) {
        let now = self.clock.tick();
        self.load_surroundings(to);
        let staleness = self.scheduler.staleness(to, now);
        let plan = plan_cycles(staleness, 0, &self.config.scheduler);
        if plan.cycles > 0 {
            let mut report = TickReport::default();
            self.run_cycles(to, plan.cycles, &mut report);
            self.reap();
        }
        self.scheduler.touch(to, now);
        self.scheduler.touch(from, now);
        info!(from = %from, to = %to, cycles = plan.cycles, "player changed zone");
    }

    fn autopilot(&mut self, now: u64) -> Option<PlayerMove> {
        if !self.player.autopilot.enabled || self.player.vitals.is_dead() {
            return None;
        }
        let pending = self.player.autopilot.intent;
        self.player.autopilot.intent = self.quests.target_position(&self.world);
        let goal = pending?;
        if now % u64::from(self.config.ai.move_interval.max(1)) != 0 {
            return None;
        }
        let dir = autopilot_step(&self.player, &self.zones, goal)?;
        Some(self.walk(dir))
    }

    // ------------------------------------------------------------------
    // Zone simulation
    // ------------------------------------------------------------------

    /// One automaton + AI + survival + merge step of `dt` ticks.
    fn advance_zone(&mut self, coord: ZoneCoord, dt: u32, with_player: bool, report: &mut TickReport) {
        let config = Arc::clone(&self.config);
        let now = self.clock.tick();

        if !self.enchantments.zone_frozen(coord) {
            let frozen = self.enchantments.frozen_cells(coord);
            let farmer_present = self.farmer_in(coord);
            let raining = self.clock.is_raining();
            if let Some(zone) = self.zones.get_mut(coord) {
                step_zone(
                    zone,
                    u64::from(dt),
                    now,
                    raining,
                    farmer_present,
                    &frozen,
                    &config,
                    &mut self.rng,
                );
            }
        }

        let intents = evaluate_zone(
            &self.world,
            &self.zones,
            coord,
            with_player.then_some(&self.player),
            dt,
            &self.enchantments,
            &self.factions,
            &config,
            &mut self.rng,
        );
        let player = if with_player { Some(&mut self.player) } else { None };
        let actions = apply_intents(
            &mut self.world,
            &mut self.zones,
            coord,
            &intents,
            player,
            &config,
            &mut self.rng,
        );
        report.kills.extend(actions.kills);

        if let Some(zone) = self.zones.get(coord) {
            survival_system(&mut self.world, zone, dt, &self.enchantments, &config.survival);
        }
        report.merges.extend(merge_system(
            &mut self.world,
            &mut self.zones,
            coord,
            &mut self.factions,
            &self.enchantments,
            &config,
            &mut self.rng,
        ));
    }

    fn run_cycles(&mut self, coord: ZoneCoord, cycles: u32, report: &mut TickReport) {
        let dt = u32::try_from(self.config.scheduler.ticks_per_cycle).unwrap_or(u32::MAX);
        for _ in 0..cycles {
            self.advance_zone(coord, dt, false, report);
        }
    }

    /// Advance the zones the scheduler picks, then run the per-pass world
    /// events: night spawns, daylight, raids, migration and factions.
    fn catch_up_pass(&mut self, now: u64, report: &mut TickReport) {
        let config = Arc::clone(&self.config);
        let here = self.player.zone();
        let jobs = self.scheduler.plan(now, here, &self.zones, &config.scheduler);

        let mut raided = false;
        for job in &jobs {
            self.zones.ensure(job.coord, &config.biomes);
            self.run_cycles(job.coord, job.plan.cycles, report);
            if !raided && job.plan.cycles > config.spawning.catchup_raid_min_cycles {
                raided = true;
                report.spawned += raid(&mut self.world, &mut self.zones, job.coord, &config, &mut self.rng).len();
            }
            report.migrated += migrate(
                &mut self.world,
                &mut self.zones,
                job.coord,
                job.plan.cycles,
                &config,
                &mut self.rng,
            );
            self.scheduler.record(job, now, &config.scheduler);
        }
        self.scheduler.finish_pass(&jobs);

        let affected: Vec<ZoneCoord> = std::iter::once(here).chain(jobs.iter().map(|j| j.coord)).collect();
        if self.clock.is_night(&config.weather) {
            for &coord in &affected {
                if night_spawn(&mut self.world, &mut self.zones, coord, &config, &mut self.rng).is_some() {
                    report.spawned += 1;
                }
            }
            if let Some(zone) = self.zones.get(here) {
                haunt_player(&self.world, zone, &mut self.player, &config);
            }
        } else {
            for &coord in &affected {
                if let Some(zone) = self.zones.get(coord) {
                    daylight_damage(&mut self.world, zone, &config);
                }
            }
        }

        if now % config.spawning.raid_interval.max(1) == 0 {
            for coord in self.zones.coords() {
                report.spawned += raid(&mut self.world, &mut self.zones, coord, &config, &mut self.rng).len();
            }
        }

        faction_system(&mut self.world, &mut self.factions, &self.zones, &config, &mut self.rng);
        if now % config.factions.territory_interval.max(1) == 0 {
            self.factions.update_territory(&self.world);
        }
        report.catch_up = jobs;
    }

    fn reap(&mut self) -> Vec<Death> {
        reap_dead(
            &mut self.world,
            &mut self.zones,
            &mut self.loot,
            &mut self.factions,
            &mut self.enchantments,
        )
    }

    fn farmer_in(&self, coord: ZoneCoord) -> bool {
        self.zones.get(coord).is_some_and(|zone| {
            zone.members.iter().any(|&e| {
                self.world
                    .get::<&Creature>(e)
                    .is_ok_and(|c| c.kind == CreatureKind::Peaceful(PeacefulRole::Farmer))
            })
        })
    }

    /// Keep every zone near `center` loaded. New zones are populated and
    /// start out current.
    fn load_surroundings(&mut self, center: ZoneCoord) {
        let config = Arc::clone(&self.config);
        let now = self.clock.tick();
        let generated = self
            .zones
            .ensure_radius(center, config.scheduler.nearby_radius, &config.biomes);
        for coord in generated {
            populate_zone(&mut self.world, &mut self.zones, coord, &config, &mut self.rng);
            self.scheduler.touch(coord, now);
        }
    }

    /// Where the player appears in `coord`: the centre, or the nearest
    /// walkable interior cell.
    fn spawn_cell(&self, coord: ZoneCoord) -> CellPos {
        let center = CellPos::center();
        self.zones
            .get(coord)
            .and_then(|zone| {
                zone.grid
                    .find_within(center, i32::MAX, |p, k| !p.on_border() && k.is_walkable())
                    .into_iter()
                    .next()
            })
            .unwrap_or(center)
    }

    fn settle_offsets(&mut self) {
        let here = self.player.zone();
        self.player.position.settle(OFFSET_SETTLE);
        for entity in self.zones.members(here) {
            if let Ok(mut pos) = self.world.get::<&mut Position>(entity) {
                pos.settle(OFFSET_SETTLE);
            }
        }
    }

    // ------------------------------------------------------------------
    // Render-facing reads
    // ------------------------------------------------------------------

    /// Creatures in `coord`, in handle order.
    pub fn entity_snapshots(&self, coord: ZoneCoord) -> Vec<EntitySnapshot> {
        self.zones
            .members(coord)
            .into_iter()
            .filter_map(|e| self.snapshot_of(e))
            .collect()
    }

    fn snapshot_of(&self, entity: Entity) -> Option<EntitySnapshot> {
        let mut query = self
            .world
            .query_one::<(&Creature, &Position, &Vitals, &Progression, &Brain)>(entity)
            .ok()?;
        let (creature, pos, vitals, progression, brain) = query.get()?;
        Some(EntitySnapshot {
            id: entity.to_bits().get(),
            zone: pos.zone,
            cell: pos.cell,
            offset: pos.offset,
            kind: creature.kind,
            doubled: creature.doubled,
            state: brain.state,
            health_fraction: vitals.fraction(creature.max_health(progression.level)),
        })
    }

    /// Every cell of `coord` with its sprite variant.
    pub fn cell_views(&self, coord: ZoneCoord) -> Vec<CellView> {
        let Some(zone) = self.zones.get(coord) else {
            return Vec::new();
        };
        let seed = zone_seed(self.seed(), coord);
        zone.grid
            .iter()
            .enumerate()
            .map(|(index, (cell, c))| CellView {
                cell,
                kind: c.kind,
                variant: (mix_seed(seed, index as u64) % u64::from(c.kind.variant_count().max(1))) as u8,
            })
            .collect()
    }

    pub fn inventory(&self) -> &Inventory {
        &self.player.inventory
    }

    /// Item piles lying in `coord`, in cell order.
    pub fn dropped_items(&self, coord: ZoneCoord) -> Vec<(CellPos, &[ItemStack])> {
        self.loot
            .in_zone(coord)
            .map(|(cell, pile)| (*cell, pile.as_slice()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Capture everything a save needs.
    pub fn snapshot(&self) -> SaveData {
        SaveData {
            version: SAVE_VERSION,
            world_seed: self.seed(),
            clock: self.clock.clone(),
            player: self.player.clone(),
            quests: self.quests.clone(),
            zones: self.zones.iter().filter(|z| z.touched).cloned().collect(),
            last_updated: self.scheduler.timestamps().clone(),
            entities: persistence::capture_entities(&self.world),
            factions: self.factions.clone(),
            enchantments: self.enchantments.clone(),
            loot: self.loot.clone(),
        }
    }

    /// Build an engine from a save. Nothing is shared with any running
    /// engine, so a failure leaves the caller's state alone.
    pub fn from_save(data: SaveData, config: Arc<SimConfig>) -> Result<Self, SaveError> {
        persistence::validate(&data)?;
        let world = persistence::restore_world(&data.entities)?;

        let mut zones = ZoneStore::new(data.world_seed);
        for zone in data.zones {
            zones.insert(zone);
        }
        for coord in data.last_updated.keys() {
            zones.ensure(*coord, &config.biomes);
        }
        for saved in &data.entities {
            if let Some(entity) = Entity::from_bits(saved.handle) {
                zones.ensure(saved.position.zone, &config.biomes);
                zones.add_member(saved.position.zone, entity);
            }
        }

        let rng = ChaCha8Rng::seed_from_u64(mix_seed(data.world_seed, data.clock.tick()));
        let mut engine = Self {
            world,
            zones,
            player: data.player,
            quests: data.quests,
            clock: data.clock,
            scheduler: CatchUpScheduler::from_timestamps(data.last_updated),
            factions: data.factions,
            enchantments: data.enchantments,
            loot: data.loot,
            config,
            rng,
        };
        engine.load_surroundings(engine.player.zone());
        Ok(engine)
    }

    /// Save simulation state to a writer
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        persistence::save_simulation(writer, &self.snapshot())
    }

    /// Load simulation state from a reader. On error the engine is unchanged.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let data = persistence::load_simulation(reader)?;
        self.replace_with(data)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), SaveError> {
        persistence::save_to_path(path, &self.snapshot())?;
        info!(path = %path.display(), tick = self.tick(), "saved");
        Ok(())
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), SaveError> {
        let data = persistence::load_from_path(path)?;
        self.replace_with(data)?;
        info!(path = %path.display(), tick = self.tick(), "loaded");
        Ok(())
    }

    fn replace_with(&mut self, data: SaveData) -> Result<(), SaveError> {
        let fresh = Self::from_save(data, Arc::clone(&self.config))?;
        *self = fresh;
        Ok(())
    }
}
