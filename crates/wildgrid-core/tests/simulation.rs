//! Integration tests for the running engine.
//!
//! Drives a full world for a few in-game minutes and checks the rules
//! every tick must keep: bounded catch-up, clamped health, consistent
//! zone membership and reproducibility from a seed.

use std::sync::Arc;

use wildgrid_core::generation::creatures::spawn_creature;
use wildgrid_core::prelude::*;
use wildgrid_core::systems::{merge_system, Enchantments, FactionRegistry};
use wildgrid_core::zones::ZoneStore;
use wildgrid_logic::config::SimConfig;
use wildgrid_logic::species::{AnimalKind, CreatureKind};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ── Helpers ────────────────────────────────────────────────────────────

fn health_in_range(engine: &SimulationEngine) -> Result<(), String> {
    for (entity, (creature, vitals, progression)) in engine
        .world
        .query::<(&Creature, &Vitals, &Progression)>()
        .iter()
    {
        let max = creature.max_health(progression.level);
        if !vitals.health.is_finite() || vitals.health <= 0.0 || vitals.health > max {
            return Err(format!("{entity:?} ({}) has health {} of {max}", creature.label(), vitals.health));
        }
    }
    let player = &engine.player;
    if !(0.0..=player.max_health()).contains(&player.vitals.health) {
        return Err(format!("player health {}", player.vitals.health));
    }
    Ok(())
}

fn membership_consistent(engine: &SimulationEngine) -> Result<(), String> {
    let mut listed = 0;
    for zone in engine.zones.iter() {
        for &entity in &zone.members {
            listed += 1;
            let pos = engine
                .world
                .get::<&Position>(entity)
                .map_err(|_| format!("zone {} lists a missing entity", zone.coord))?;
            if pos.zone != zone.coord {
                return Err(format!("{entity:?} listed in {} but lives in {}", zone.coord, pos.zone));
            }
        }
    }
    let alive = engine.creature_count();
    if listed != alive {
        return Err(format!("{listed} members listed for {alive} creatures"));
    }
    Ok(())
}

// ── Scheduler bounds ───────────────────────────────────────────────────

#[test]
fn catch_up_stays_within_bounds_for_a_minute() {
    let mut engine = SimulationEngine::with_default_config(77);
    let mut passes = 0;
    for _ in 0..3_600 {
        let report = engine.update();
        if report.catch_up.is_empty() {
            continue;
        }
        passes += 1;
        assert_eq!(report.tick % 30, 0);
        assert!(report.catch_up.len() <= 20);
        for job in &report.catch_up {
            assert_ne!(job.coord, engine.player.zone());
            assert!(job.plan.cycles >= 1 && job.plan.cycles <= 100);
        }
    }
    assert!(passes > 0);
}

#[test]
fn smaller_pass_limits_are_honoured() {
    let config = SimConfig::from_json(r#"{ "scheduler": { "max_zones_per_pass": 3, "max_cycles": 5 } }"#).unwrap();
    let mut engine = SimulationEngine::new(Arc::new(config), 5);
    for _ in 0..600 {
        let report = engine.update();
        assert!(report.catch_up.len() <= 3);
        assert!(report.catch_up.iter().all(|j| j.plan.cycles <= 5));
    }
}

// ── World invariants ───────────────────────────────────────────────────

#[test]
fn invariants_hold_every_tick() {
    let mut engine = SimulationEngine::with_default_config(2024);
    engine.set_autopilot(true);
    for _ in 0..1_200 {
        engine.update();
        health_in_range(&engine).unwrap();
        membership_consistent(&engine).unwrap();
    }
    for zone in engine.zones.iter() {
        assert!(zone.grid.is_valid(), "zone {} grid invalid", zone.coord);
    }
}

#[test]
fn killed_creatures_leave_in_the_same_tick() {
    let mut engine = SimulationEngine::with_default_config(9);
    let config = engine.config().clone();
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let cell = engine.player.cell().offset(2, 0);
    let victim = spawn_creature(
        &mut engine.world,
        &mut engine.zones,
        CreatureKind::Animal(AnimalKind::Sheep),
        ZoneCoord::ORIGIN,
        cell,
        1,
        &config,
        &mut rng,
    );
    {
        let mut vitals = engine.world.get::<&mut Vitals>(victim).unwrap();
        assert!(vitals.damage(1.0e9, 10.0));
        assert_eq!(vitals.health, 0.0);
    }

    let report = engine.update();
    assert!(!engine.world.contains(victim));
    assert!(report.deaths.iter().any(|d| d.entity == victim));
    assert!(!engine.zones.members(ZoneCoord::ORIGIN).contains(&victim));
}

#[test]
fn merging_replaces_both_twins_at_once() {
    let mut config = SimConfig::default();
    config.ai.merge_chance = 1.0;
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut zones = ZoneStore::new(3);
    zones.ensure(ZoneCoord::ORIGIN, &config.biomes);
    let mut world = hecs::World::new();
    let sheep = CreatureKind::Animal(AnimalKind::Sheep);
    let a = spawn_creature(&mut world, &mut zones, sheep, ZoneCoord::ORIGIN, CellPos::new(6, 6), 1, &config, &mut rng);
    let b = spawn_creature(&mut world, &mut zones, sheep, ZoneCoord::ORIGIN, CellPos::new(7, 6), 1, &config, &mut rng);

    let merges = merge_system(
        &mut world,
        &mut zones,
        ZoneCoord::ORIGIN,
        &mut FactionRegistry::new(),
        &Enchantments::new(),
        &config,
        &mut rng,
    );

    assert_eq!(merges.len(), 1);
    let merged = merges[0].merged;
    assert!(!world.contains(a) && !world.contains(b));
    assert_eq!(zones.members(ZoneCoord::ORIGIN), vec![merged]);
    let creature = *world.get::<&Creature>(merged).unwrap();
    assert!(creature.doubled);
    assert_eq!(world.get::<&Progression>(merged).unwrap().level, 2);
}

// ── Determinism ────────────────────────────────────────────────────────

#[test]
fn same_seed_same_history() {
    let mut a = SimulationEngine::with_default_config(31337);
    let mut b = SimulationEngine::with_default_config(31337);
    for _ in 0..300 {
        let ra = a.update();
        let rb = b.update();
        assert_eq!(ra.catch_up, rb.catch_up);
        assert_eq!(ra.deaths, rb.deaths);
    }
    for coord in a.zones.coords() {
        assert_eq!(a.entity_snapshots(coord), b.entity_snapshots(coord));
        assert_eq!(a.cell_views(coord), b.cell_views(coord));
    }
    assert_eq!(a.player, b.player);
}

#[test]
fn different_seeds_differ() {
    let a = SimulationEngine::with_default_config(1);
    let b = SimulationEngine::with_default_config(2);
    let differs = a
        .zones
        .coords()
        .into_iter()
        .any(|coord| a.cell_views(coord) != b.cell_views(coord));
    assert!(differs);
}

// ── Day and night ──────────────────────────────────────────────────────

#[test]
fn a_full_day_passes_through_night() {
    let mut engine = SimulationEngine::with_default_config(12);
    let weather = engine.config().weather.clone();
    let day = weather.day_length + weather.night_length;
    let mut saw_night = false;
    let mut saw_day = false;
    for _ in 0..day {
        engine.update();
        if engine.clock.is_night(&weather) {
            saw_night = true;
        } else {
            saw_day = true;
        }
    }
    assert!(saw_night && saw_day);
}
