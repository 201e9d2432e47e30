//! Cellular automaton step
//!
//! Every cell is evaluated against the read-only input grid and written
//! to a fresh output grid, so the result does not depend on visiting
//! order. Rain conversions run as a separate pass afterwards.

use std::collections::BTreeSet;

use rand::Rng;
use wildgrid_logic::biome::reclassify;
use wildgrid_logic::cells::{transition_for, CellType, RuleContext};
use wildgrid_logic::config::{AutomatonRates, SimConfig, WeatherConfig};

use crate::components::{CellGrid, CellPos, Zone};

/// Inputs for one automaton step that do not come from the grid.
#[derive(Debug, Clone, Copy)]
pub struct StepParams<'a> {
    /// Elapsed ticks this step stands for.
    pub dt: f32,
    pub ctx: RuleContext,
    /// Cells held by a freeze enchantment.
    pub frozen: &'a BTreeSet<CellPos>,
}

/// What one zone step changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub transitions: usize,
    pub rain_conversions: usize,
}

/// Advance a grid by one step. Returns the new grid and the number of
/// transitions that fired.
pub fn step_grid(grid: &CellGrid, params: &StepParams, rates: &AutomatonRates) -> (CellGrid, usize) {
    let mut next = grid.clone();
    let mut fired = 0;

    for (pos, cell) in grid.iter() {
        if pos.on_border() || cell.kind.is_static() || params.frozen.contains(&pos) {
            continue;
        }
        let n = grid.neighborhood(pos);
        let Some(t) = transition_for(cell.kind, &n, &params.ctx, rates) else {
            continue;
        };
        let progress = cell.progress + t.rate * params.dt;
        let Some(out) = next.get_mut(pos) else {
            continue;
        };
        if progress >= 1.0 {
            out.kind = t.to;
            out.progress = 0.0;
            fired += 1;
        } else {
            out.progress = progress.max(cell.progress);
        }
    }
    (next, fired)
}

/// Rain conversions for one step. Attempts scale with `dt` relative to a
/// full catch-up cycle and with the biome's rain multiplier.
pub fn apply_rain(
    grid: &mut CellGrid,
    chance_scale: f32,
    frozen: &BTreeSet<CellPos>,
    config: &WeatherConfig,
    rng: &mut impl Rng,
) -> usize {
    let mut converted = 0;
    let mut attempt = |grid: &mut CellGrid, from: &[CellType], to: CellType, chance: f32| {
        let pos = CellPos::new(
            rng.gen_range(1..wildgrid_logic::constants::GRID_WIDTH as i32 - 1),
            rng.gen_range(1..wildgrid_logic::constants::GRID_HEIGHT as i32 - 1),
        );
        if frozen.contains(&pos) || rng.gen::<f32>() >= chance * chance_scale {
            return;
        }
        if grid.kind_at(pos).is_some_and(|k| from.contains(&k)) && grid.set_kind(pos, to) {
            converted += 1;
        }
    };

    for _ in 0..config.rain_water_spawns {
        attempt(
            grid,
            &[CellType::Dirt, CellType::Sand, CellType::Grass],
            CellType::Water,
            config.rain_water_chance,
        );
    }
    for _ in 0..config.rain_grass_spawns {
        attempt(grid, &[CellType::Dirt], CellType::Grass, config.rain_grass_chance);
    }
    converted
}

/// Step a whole zone: automaton, rain, then biome drift.
#[allow(clippy::too_many_arguments)]
pub fn step_zone(
    zone: &mut Zone,
    dt_ticks: u64,
    now: u64,
    raining: bool,
    farmer_present: bool,
    frozen: &BTreeSet<CellPos>,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> StepOutcome {
    let window = config.automaton.watered_window_ticks;
    let params = StepParams {
        dt: dt_ticks as f32,
        ctx: RuleContext {
            raining,
            recently_watered: zone.last_rain.is_some_and(|t| now.saturating_sub(t) <= window),
            farmer_present,
        },
        frozen,
    };

    let (grid, transitions) = step_grid(&zone.grid, &params, &config.automaton);
    zone.grid = grid;

    let mut rain_conversions = 0;
    if raining {
        let per_cycle = config.scheduler.ticks_per_cycle.max(1) as f32;
        let scale = (dt_ticks as f32 / per_cycle).min(1.0) * zone.biome.rain_multiplier();
        rain_conversions = apply_rain(&mut zone.grid, scale, frozen, &config.weather, rng);
        zone.last_rain = Some(now);
    }

    // Progress moves even when nothing fires.
    zone.touched = true;
    if transitions + rain_conversions > 0 {
        zone.biome = reclassify(&zone.grid.census(), zone.biome);
    }

    StepOutcome {
        transitions,
        rain_conversions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Exits, ZoneCoord};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wildgrid_logic::biome::Biome;

    fn params(dt: f32, frozen: &BTreeSet<CellPos>) -> StepParams<'_> {
        StepParams {
            dt,
            ctx: RuleContext::default(),
            frozen,
        }
    }

    #[test]
    fn nearly_ripe_grass_decays_in_one_cycle() {
        let mut grid = CellGrid::filled(CellType::Grass);
        let pos = CellPos::new(5, 5);
        grid.get_mut(pos).unwrap().progress = 0.9999;
        let frozen = BTreeSet::new();

        let (next, fired) = step_grid(&grid, &params(60.0, &frozen), &AutomatonRates::default());
        let cell = next.get(pos).unwrap();
        assert_eq!(cell.kind, CellType::Dirt);
        assert_eq!(cell.progress, 0.0);
        assert!(fired >= 1);
    }

    #[test]
    fn progress_never_decreases_without_transition() {
        let mut grid = CellGrid::filled(CellType::Dirt);
        grid.set_kind(CellPos::new(6, 6), CellType::Water);
        grid.set_kind(CellPos::new(7, 6), CellType::Water);
        let frozen = BTreeSet::new();
        let rates = AutomatonRates::default();

        for _ in 0..200 {
            let (next, _) = step_grid(&grid, &params(1.0, &frozen), &rates);
            for ((pos, before), (_, after)) in grid.iter().zip(next.iter()) {
                if before.kind == after.kind {
                    assert!(after.progress >= before.progress, "{pos:?}");
                } else {
                    assert_eq!(after.progress, 0.0);
                }
            }
            grid = next;
        }
    }

    #[test]
    fn frozen_cells_are_skipped() {
        let mut grid = CellGrid::filled(CellType::Grass);
        let pos = CellPos::new(4, 4);
        grid.get_mut(pos).unwrap().progress = 0.9999;
        let frozen: BTreeSet<CellPos> = [pos].into_iter().collect();

        let (next, _) = step_grid(&grid, &params(60.0, &frozen), &AutomatonRates::default());
        assert_eq!(next.get(pos).unwrap().kind, CellType::Grass);
        assert_eq!(next.get(pos).unwrap().progress, 0.9999);
    }

    #[test]
    fn neighbours_read_from_input_grid() {
        // Two dry grass cells side by side with a flower: both read the
        // original flower, whatever order they are visited in.
        let mut grid = CellGrid::filled(CellType::Dirt);
        let flower = CellPos::new(10, 10);
        grid.set_kind(flower, CellType::Flower);
        grid.get_mut(flower).unwrap().progress = 0.9999;
        for p in [CellPos::new(9, 10), CellPos::new(11, 10)] {
            grid.set_kind(p, CellType::Grass);
            grid.get_mut(p).unwrap().progress = 0.9999;
        }
        let frozen = BTreeSet::new();
        let (next, _) = step_grid(&grid, &params(60.0, &frozen), &AutomatonRates::default());
        assert_eq!(next.kind_at(flower), Some(CellType::Grass));
        assert_eq!(next.kind_at(CellPos::new(9, 10)), Some(CellType::Flower));
        assert_eq!(next.kind_at(CellPos::new(11, 10)), Some(CellType::Flower));
    }

    #[test]
    fn border_and_static_cells_never_change() {
        let mut grid = CellGrid::filled(CellType::Wall);
        grid.set_kind(CellPos::new(3, 3), CellType::Chest);
        let frozen = BTreeSet::new();
        let (next, fired) = step_grid(&grid, &params(60.0, &frozen), &AutomatonRates::default());
        assert_eq!(fired, 0);
        assert_eq!(next, grid);
    }

    #[test]
    fn rain_marks_zone_and_converts_cells() {
        let mut zone = Zone::new(
            ZoneCoord::ORIGIN,
            Biome::Plains,
            CellGrid::filled(CellType::Dirt),
            Exits::default(),
        );
        let mut config = SimConfig::default();
        config.weather.rain_water_chance = 1.0;
        config.weather.rain_grass_chance = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let frozen = BTreeSet::new();

        let outcome = step_zone(&mut zone, 60, 500, true, false, &frozen, &config, &mut rng);
        assert!(outcome.rain_conversions > 0);
        assert_eq!(zone.last_rain, Some(500));
        assert!(zone.touched);
    }
}
