//! Catch-up scheduling math for off-screen zones.
//!
//! Zones away from the player are not simulated every tick. Every
//! scheduler pass picks the most deserving stale zones and runs a number
//! of catch-up cycles on each, where one cycle stands for
//! `ticks_per_cycle` simulated ticks.
//!
//! # Coverage
//!
//! | Distance | Share of staleness simulated |
//! |----------|------------------------------|
//! | 0 | 100% (never scheduled; updated by the main loop) |
//! | 1 | 90% |
//! | 2 | 80% |
//! | ≥3 | 60% |
//!
//! Cycles are `min(max_cycles, ceil(staleness × coverage / ticks_per_cycle))`;
//! time beyond the cap is dropped.
//!
//! ```
//! use wildgrid_logic::catchup::plan_cycles;
//! use wildgrid_logic::config::SchedulerConfig;
//!
//! let plan = plan_cycles(1000, 3, &SchedulerConfig::default());
//! assert_eq!(plan.cycles, 10);
//! assert!(!plan.capped);
//! ```

use crate::config::SchedulerConfig;

/// Manhattan distance between two zone coordinates. A diagonal
/// neighbour is two zones away.
pub fn zone_distance(a: (i32, i32), b: (i32, i32)) -> u32 {
    let dx = (i64::from(a.0) - i64::from(b.0)).unsigned_abs();
    let dy = (i64::from(a.1) - i64::from(b.1)).unsigned_abs();
    dx.saturating_add(dy).min(u64::from(u32::MAX)) as u32
}

/// Fraction of a zone's staleness simulated at `distance`.
pub fn coverage(distance: u32, config: &SchedulerConfig) -> f32 {
    config.coverage[distance.min(3) as usize]
}

/// Cycle budget for one zone in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePlan {
    /// Cycles that will actually run.
    pub cycles: u32,
    /// Cycles the staleness asked for before capping.
    pub requested: u64,
    /// True when `requested` exceeded the cap and time was dropped.
    pub capped: bool,
}

/// Compute how many catch-up cycles a zone receives.
pub fn plan_cycles(staleness: u64, distance: u32, config: &SchedulerConfig) -> CyclePlan {
    if staleness == 0 {
        return CyclePlan {
            cycles: 0,
            requested: 0,
            capped: false,
        };
    }
    let per_cycle = config.ticks_per_cycle.max(1) as f64;
    let simulated = staleness as f64 * f64::from(coverage(distance, config));
    // Coverage is stored as f32; the epsilon absorbs its representation error.
    let requested = (simulated / per_cycle - 1e-4).ceil().max(1.0) as u64;
    let cap = u64::from(config.max_cycles);
    CyclePlan {
        cycles: requested.min(cap) as u32,
        requested,
        capped: requested > cap,
    }
}

/// Closer zones score higher; the player's own zone scores highest.
pub fn distance_score(distance: u32) -> f32 {
    match distance {
        0 => 100.0,
        1 => 50.0,
        2 => 25.0,
        3 => 10.0,
        d => (5.0 / d as f32).max(1.0),
    }
}

/// Staleness in cycles, saturating at 30.
pub fn staleness_score(staleness: u64, config: &SchedulerConfig) -> f32 {
    (staleness as f32 / config.ticks_per_cycle.max(1) as f32).min(30.0)
}

/// Two points per resident creature, saturating at 40.
pub fn density_score(entity_count: usize) -> f32 {
    (entity_count as f32 * 2.0).min(40.0)
}

/// Weighted selection priority of a zone.
pub fn priority(distance: u32, entity_count: usize, staleness: u64, config: &SchedulerConfig) -> f32 {
    config.distance_weight * distance_score(distance)
        + config.density_weight * density_score(entity_count)
        + config.staleness_weight * staleness_score(staleness, config)
}
