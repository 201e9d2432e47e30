//! WildGrid Headless Simulation Harness
//!
//! Runs the full engine in-process and validates world invariants.
//! No rendering, no input devices.
//!
//! Usage:
//!   cargo run -p wildgrid-simtest
//!   cargo run -p wildgrid-simtest -- --verbose --ticks 7200 --seed 9
//!   cargo run -p wildgrid-simtest -- --config tuning.json --save world.sav
//!   cargo run -p wildgrid-simtest -- --load world.sav --realtime

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wildgrid_core::prelude::*;
use wildgrid_core::systems::CatchUpJob;
use wildgrid_logic::catchup::zone_distance;
use wildgrid_logic::config::SimConfig;

const TICKS_PER_SECOND: u64 = 60;

// ── Command line ────────────────────────────────────────────────────────

struct Options {
    verbose: bool,
    realtime: bool,
    ticks: u64,
    seed: u64,
    config: Option<PathBuf>,
    save: Option<PathBuf>,
    load: Option<PathBuf>,
}

impl Options {
    fn parse() -> Result<Self, String> {
        let mut opts = Options {
            verbose: false,
            realtime: false,
            ticks: 3_600,
            seed: 42,
            config: None,
            save: None,
            load: None,
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--verbose" => opts.verbose = true,
                "--realtime" => opts.realtime = true,
                "--ticks" => opts.ticks = number(&arg, args.next())?,
                "--seed" => opts.seed = number(&arg, args.next())?,
                "--config" => opts.config = Some(path(&arg, args.next())?),
                "--save" => opts.save = Some(path(&arg, args.next())?),
                "--load" => opts.load = Some(path(&arg, args.next())?),
                other => return Err(format!("unknown argument `{other}`")),
            }
        }
        Ok(opts)
    }
}

fn number(flag: &str, value: Option<String>) -> Result<u64, String> {
    let value = value.ok_or_else(|| format!("{flag} needs a value"))?;
    value
        .parse()
        .map_err(|e| format!("{flag}: `{value}` is not a number ({e})"))
}

fn path(flag: &str, value: Option<String>) -> Result<PathBuf, String> {
    value
        .map(PathBuf::from)
        .ok_or_else(|| format!("{flag} needs a path"))
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn main() {
    let opts = match Options::parse() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    let default_filter = if opts.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    println!("=== WildGrid Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Configuration
    let config = match load_config(&opts, &mut results) {
        Some(config) => Arc::new(config),
        None => finish(&results, opts.verbose),
    };

    // 2. World generation (or a loaded save)
    let mut engine = SimulationEngine::new(Arc::clone(&config), opts.seed);
    if let Some(path) = &opts.load {
        let loaded = engine.load_from_path(path);
        results.push(TestResult::new(
            "save_load_file",
            loaded.is_ok(),
            match &loaded {
                Ok(()) => format!("{} at tick {}", path.display(), engine.tick()),
                Err(e) => format!("{}: {e}", path.display()),
            },
        ));
        if loaded.is_err() {
            finish(&results, opts.verbose);
        }
    }
    results.extend(validate_world(&engine, opts.verbose));

    // 3. Main loop
    results.extend(run_simulation(&mut engine, &opts));

    // 4. Persistence
    results.extend(validate_persistence(&engine, &config, opts.verbose));
    if let Some(path) = &opts.save {
        let saved = engine.save_to_path(path);
        results.push(TestResult::new(
            "save_write_file",
            saved.is_ok(),
            match saved {
                Ok(()) => format!("wrote {}", path.display()),
                Err(e) => format!("{}: {e}", path.display()),
            },
        ));
    }

    // 5. Determinism
    if opts.load.is_none() {
        results.extend(validate_determinism(&config, opts.seed));
    }

    finish(&results, opts.verbose);
}

fn finish(results: &[TestResult], verbose: bool) -> ! {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );
    std::process::exit(if failed > 0 { 1 } else { 0 });
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn load_config(opts: &Options, results: &mut Vec<TestResult>) -> Option<SimConfig> {
    println!("--- Configuration ---");
    let Some(path) = &opts.config else {
        let config = SimConfig::default();
        let valid = config.validate();
        results.push(TestResult::new(
            "config_defaults_valid",
            valid.is_ok(),
            match &valid {
                Ok(()) => "built-in defaults".to_string(),
                Err(e) => e.to_string(),
            },
        ));
        return valid.ok().map(|()| config);
    };

    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| SimConfig::from_json(&json).map_err(|e| e.to_string()));
    match parsed {
        Ok(config) => {
            results.push(TestResult::new("config_file", true, format!("loaded {}", path.display())));
            Some(config)
        }
        Err(e) => {
            results.push(TestResult::new("config_file", false, format!("{}: {e}", path.display())));
            None
        }
    }
}

// ── 2. World ────────────────────────────────────────────────────────────

fn validate_world(engine: &SimulationEngine, verbose: bool) -> Vec<TestResult> {
    println!("--- World ---");
    let mut results = Vec::new();
    let config = engine.config();
    let here = engine.player.zone();

    let radius = config.scheduler.nearby_radius;
    let missing: Vec<ZoneCoord> = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| here.offset(dx, dy)))
        .filter(|c| !engine.zones.contains(*c))
        .collect();
    results.push(TestResult::new(
        "world_surroundings_loaded",
        missing.is_empty(),
        if missing.is_empty() {
            format!("{} zones loaded around {here}", engine.zones.len())
        } else {
            format!("{} zones missing near {here}", missing.len())
        },
    ));

    let bad_grids: Vec<ZoneCoord> = engine
        .zones
        .iter()
        .filter(|z| !z.grid.is_valid())
        .map(|z| z.coord)
        .collect();
    results.push(TestResult::new(
        "world_grids_valid",
        bad_grids.is_empty(),
        format!("{} invalid grids", bad_grids.len()),
    ));

    let mut one_sided = 0;
    for zone in engine.zones.iter() {
        for dir in Direction::ALL {
            if let Some(other) = engine.zones.get(zone.coord.neighbor(dir)) {
                if zone.exits.open(dir) != other.exits.open(dir.opposite()) {
                    one_sided += 1;
                }
            }
        }
    }
    results.push(TestResult::new(
        "world_exits_shared",
        one_sided == 0,
        format!("{one_sided} one-sided exits"),
    ));

    let player_cell = engine.zones.get(here).is_some_and(|z| z.walkable(engine.player.cell()));
    results.push(TestResult::new(
        "world_player_placed",
        player_cell,
        format!("player at {:?} in {here}", engine.player.cell()),
    ));

    if verbose {
        let mut biomes = std::collections::BTreeMap::new();
        for zone in engine.zones.iter() {
            *biomes.entry(format!("{:?}", zone.biome)).or_insert(0u32) += 1;
        }
        println!("  Biomes:");
        for (biome, count) in biomes {
            println!("    {biome:10}: {count}");
        }
        println!("  Creatures: {}", engine.creature_count());
    }

    results
}

// ── 3. Simulation ───────────────────────────────────────────────────────

#[derive(Default)]
struct RunStats {
    passes: u64,
    jobs: u64,
    cycles: u64,
    capped: u64,
    deaths: u64,
    merges: u64,
    kills: u64,
    spawned: u64,
    migrated: u64,
    quests: u64,
    player_deaths: u64,
}

fn run_simulation(engine: &mut SimulationEngine, opts: &Options) -> Vec<TestResult> {
    println!("--- Simulation ({} ticks) ---", opts.ticks);
    let mut results = Vec::new();
    let mut stats = RunStats::default();
    let mut violations: Vec<String> = Vec::new();
    let frame = Duration::from_nanos(1_000_000_000 / TICKS_PER_SECOND);
    let started = Instant::now();
    let start_tick = engine.tick();

    engine.set_autopilot(true);
    for _ in 0..opts.ticks {
        let frame_start = Instant::now();
        let report = engine.update();

        if !report.catch_up.is_empty() {
            stats.passes += 1;
            // A respawn moves the player after the pass ran.
            if !report.player_died {
                if let Some(problem) = check_pass(engine, engine.player.zone(), report.tick, &report.catch_up) {
                    violations.push(problem);
                }
            }
        }
        for job in &report.catch_up {
            stats.jobs += 1;
            stats.cycles += u64::from(job.plan.cycles);
            stats.capped += u64::from(job.plan.capped);
        }
        stats.deaths += report.deaths.len() as u64;
        stats.merges += report.merges.len() as u64;
        stats.kills += report.kills.len() as u64;
        stats.spawned += report.spawned as u64;
        stats.migrated += report.migrated as u64;
        stats.quests += u64::from(report.quest.is_some());
        stats.player_deaths += u64::from(report.player_died);

        if let Err(problem) = check_health(engine).and_then(|()| check_membership(engine)) {
            violations.push(format!("tick {}: {problem}", report.tick));
        }
        if violations.len() >= 10 {
            warn!("stopping early after repeated invariant violations");
            break;
        }

        if opts.realtime {
            if let Some(rest) = frame.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        if opts.verbose && report.tick % (TICKS_PER_SECOND * 60) == 0 {
            info!(
                tick = report.tick,
                zone = %engine.player.zone(),
                creatures = engine.creature_count(),
                level = engine.player.level,
                "minute"
            );
        }
    }

    let elapsed = started.elapsed();
    let ran = engine.tick() - start_tick;
    results.push(TestResult::new(
        "sim_ticks_completed",
        ran == opts.ticks,
        format!(
            "{ran} ticks in {:.2}s ({:.0} ticks/s)",
            elapsed.as_secs_f64(),
            ran as f64 / elapsed.as_secs_f64().max(1e-9)
        ),
    ));
    results.push(TestResult::new(
        "sim_invariants",
        violations.is_empty(),
        violations
            .first()
            .cloned()
            .unwrap_or_else(|| "health, membership and catch-up bounds held".into()),
    ));

    let expected_passes = ran / engine.config().scheduler.update_interval;
    results.push(TestResult::new(
        "sim_catch_up_ran",
        ran < engine.config().scheduler.update_interval || stats.passes > 0,
        format!(
            "{} passes (≤{expected_passes}), {} jobs, {} cycles, {} capped",
            stats.passes, stats.jobs, stats.cycles, stats.capped
        ),
    ));

    let world_alive = engine.creature_count() > 0;
    results.push(TestResult::new(
        "sim_world_populated",
        world_alive,
        format!(
            "{} creatures; {} deaths, {} merges, {} kills, {} spawned, {} migrated",
            engine.creature_count(),
            stats.deaths,
            stats.merges,
            stats.kills,
            stats.spawned,
            stats.migrated
        ),
    ));

    if opts.verbose {
        let totals = engine.scheduler.stats();
        println!(
            "  Scheduler: {} passes, {} zones advanced, {} cycles, {} capped",
            totals.passes, totals.zones_advanced, totals.cycles_run, totals.capped_jobs
        );
        println!(
            "  Player: level {} in {}, {} quests done, {} deaths",
            engine.player.level,
            engine.player.zone(),
            stats.quests,
            stats.player_deaths
        );
    }

    results
}

fn check_pass(engine: &SimulationEngine, player_zone: ZoneCoord, tick: u64, jobs: &[CatchUpJob]) -> Option<String> {
    let limits = &engine.config().scheduler;
    if tick % limits.update_interval != 0 {
        return Some(format!("tick {tick}: catch-up off the interval"));
    }
    if jobs.len() > limits.max_zones_per_pass {
        return Some(format!("tick {tick}: {} zones in one pass", jobs.len()));
    }
    for job in jobs {
        if job.coord == player_zone {
            return Some(format!("tick {tick}: player zone {} scheduled", job.coord));
        }
        if job.plan.cycles == 0 || job.plan.cycles > limits.max_cycles {
            return Some(format!("tick {tick}: {} got {} cycles", job.coord, job.plan.cycles));
        }
        let distance = zone_distance((job.coord.x, job.coord.y), (player_zone.x, player_zone.y));
        if distance != job.distance {
            return Some(format!("tick {tick}: {} distance {} != {distance}", job.coord, job.distance));
        }
    }
    None
}

fn check_health(engine: &SimulationEngine) -> Result<(), String> {
    for (_, (creature, vitals, progression)) in engine
        .world
        .query::<(&Creature, &Vitals, &Progression)>()
        .iter()
    {
        let max = creature.max_health(progression.level);
        if !(vitals.health > 0.0 && vitals.health <= max) {
            return Err(format!("{} health {} of {max}", creature.label(), vitals.health));
        }
    }
    let player = &engine.player;
    if !(0.0..=player.max_health()).contains(&player.vitals.health) {
        return Err(format!("player health {}", player.vitals.health));
    }
    Ok(())
}

fn check_membership(engine: &SimulationEngine) -> Result<(), String> {
    let mut listed = 0;
    for zone in engine.zones.iter() {
        for &entity in &zone.members {
            listed += 1;
            match engine.world.get::<&Position>(entity) {
                Ok(pos) if pos.zone == zone.coord => {}
                Ok(pos) => return Err(format!("member of {} lives in {}", zone.coord, pos.zone)),
                Err(_) => return Err(format!("{} lists a despawned entity", zone.coord)),
            }
        }
    }
    let alive = engine.creature_count();
    if listed != alive {
        return Err(format!("{listed} zone members for {alive} creatures"));
    }
    Ok(())
}

// ── 4. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(engine: &SimulationEngine, config: &Arc<SimConfig>, verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut bytes = Vec::new();
    if let Err(e) = engine.save(&mut bytes) {
        results.push(TestResult::new("save_encode", false, e.to_string()));
        return results;
    }
    results.push(TestResult::new("save_encode", true, format!("{} bytes", bytes.len())));

    let mut restored = SimulationEngine::new(Arc::clone(config), engine.seed().wrapping_add(1));
    match restored.load(&bytes[..]) {
        Ok(()) => {
            let here = engine.player.zone();
            let same = restored.tick() == engine.tick()
                && restored.player == engine.player
                && restored.creature_count() == engine.creature_count()
                && restored.cell_views(here) == engine.cell_views(here)
                && restored.entity_snapshots(here) == engine.entity_snapshots(here);
            results.push(TestResult::new(
                "save_round_trip",
                same,
                if same {
                    format!("tick {} restored", restored.tick())
                } else {
                    "restored world differs".into()
                },
            ));
        }
        Err(e) => results.push(TestResult::new("save_round_trip", false, e.to_string())),
    }

    let mut truncated = bytes.clone();
    truncated.truncate(bytes.len() / 2);
    let tick = restored.tick();
    let rejected = restored.load(&truncated[..]).is_err() && restored.tick() == tick;
    results.push(TestResult::new(
        "save_corrupt_rejected",
        rejected,
        "truncated save refused, world kept",
    ));

    if verbose {
        let data = engine.snapshot();
        println!(
            "  Saved {} touched zones, {} timestamps, {} creatures, {} item piles",
            data.zones.len(),
            data.last_updated.len(),
            data.entities.len(),
            data.loot.total_stacks()
        );
    }
    results
}

// ── 5. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(config: &Arc<SimConfig>, seed: u64) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let mut a = SimulationEngine::new(Arc::clone(config), seed);
    let mut b = SimulationEngine::new(Arc::clone(config), seed);
    a.advance(TICKS_PER_SECOND * 5);
    b.advance(TICKS_PER_SECOND * 5);

    let same = a.player == b.player
        && a.zones
            .coords()
            .into_iter()
            .all(|c| a.cell_views(c) == b.cell_views(c) && a.entity_snapshots(c) == b.entity_snapshots(c));
    vec![TestResult::new(
        "determinism_same_seed",
        same,
        format!("seed {seed}, {} ticks", a.tick()),
    )]
}
