//! Catch-up scheduler - picks which off-screen zones to advance
//!
//! The scheduler only decides. The engine runs the planned cycles and
//! reports back through [`CatchUpScheduler::record`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wildgrid_logic::catchup::{plan_cycles, priority, zone_distance, CyclePlan};
use wildgrid_logic::config::SchedulerConfig;

use crate::components::ZoneCoord;
use crate::zones::ZoneStore;

/// One zone chosen for a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchUpJob {
    pub coord: ZoneCoord,
    pub distance: u32,
    pub staleness: u64,
    pub priority: f32,
    pub plan: CyclePlan,
}

/// Running totals, for logs and the harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub passes: u64,
    pub zones_advanced: u64,
    pub cycles_run: u64,
    pub capped_jobs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatchUpScheduler {
    /// Tick each zone was last brought up to date. Missing means never.
    last_updated: BTreeMap<ZoneCoord, u64>,
    /// Consecutive capped passes per zone.
    #[serde(skip)]
    capped_streak: BTreeMap<ZoneCoord, u32>,
    #[serde(skip)]
    stats: SchedulerStats,
}

impl CatchUpScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from saved timestamps. Zones without one count as
    /// maximally stale.
    pub fn from_timestamps(last_updated: BTreeMap<ZoneCoord, u64>) -> Self {
        Self {
            last_updated,
            ..Self::default()
        }
    }

    pub fn timestamps(&self) -> &BTreeMap<ZoneCoord, u64> {
        &self.last_updated
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Whether a pass runs on `tick`.
    pub fn is_due(tick: u64, config: &SchedulerConfig) -> bool {
        tick > 0 && tick % config.update_interval.max(1) == 0
    }

    pub fn last_updated(&self, coord: ZoneCoord) -> u64 {
        self.last_updated.get(&coord).copied().unwrap_or(0)
    }

    pub fn staleness(&self, coord: ZoneCoord, now: u64) -> u64 {
        now.saturating_sub(self.last_updated(coord))
    }

    /// Mark a zone as current.
    pub fn touch(&mut self, coord: ZoneCoord, now: u64) {
        self.last_updated.insert(coord, now);
    }

    /// Choose the zones for this pass, best first.
    ///
    /// The player's zone is never chosen; the main loop keeps it current.
    pub fn plan(
        &self,
        now: u64,
        player_zone: ZoneCoord,
        zones: &ZoneStore,
        config: &SchedulerConfig,
    ) -> Vec<CatchUpJob> {
        let mut jobs: Vec<CatchUpJob> = zones
            .iter()
            .filter(|zone| zone.coord != player_zone)
            .filter_map(|zone| {
                let staleness = self.staleness(zone.coord, now);
                if staleness == 0 {
                    return None;
                }
                let distance = zone_distance(
                    (zone.coord.x, zone.coord.y),
                    (player_zone.x, player_zone.y),
                );
                Some(CatchUpJob {
                    coord: zone.coord,
                    distance,
                    staleness,
                    priority: priority(distance, zone.members.len(), staleness, config),
                    plan: plan_cycles(staleness, distance, config),
                })
            })
            .collect();

        jobs.sort_by(|a, b| {
            b.priority
                .total_cmp(&a.priority)
                .then_with(|| b.staleness.cmp(&a.staleness))
                .then_with(|| a.coord.cmp(&b.coord))
        });
        jobs.truncate(config.max_zones_per_pass);
        jobs
    }

    /// Record a finished job. Time dropped by the cap is not carried over.
    pub fn record(&mut self, job: &CatchUpJob, now: u64, config: &SchedulerConfig) {
        self.touch(job.coord, now);
        self.stats.zones_advanced += 1;
        self.stats.cycles_run += u64::from(job.plan.cycles);

        if !job.plan.capped {
            self.capped_streak.remove(&job.coord);
            return;
        }
        self.stats.capped_jobs += 1;
        let streak = self.capped_streak.entry(job.coord).or_insert(0);
        *streak += 1;
        let dropped = job.plan.requested - u64::from(job.plan.cycles);
        debug!(zone = %job.coord, requested = job.plan.requested, dropped, "catch-up capped");
        let report_after = config.starvation_report_after.max(1);
        if *streak % report_after == 0 {
            warn!(zone = %job.coord, streak = *streak, "zone repeatedly capped by catch-up");
        }
    }

    /// Close out a pass.
    pub fn finish_pass(&mut self, jobs: &[CatchUpJob]) {
        self.stats.passes += 1;
        if !jobs.is_empty() {
            let cycles: u32 = jobs.iter().map(|j| j.plan.cycles).sum();
            debug!(zones = jobs.len(), cycles, "catch-up pass");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wildgrid_logic::config::SimConfig;

    fn store(radius: i32) -> (ZoneStore, SimConfig) {
        let config = SimConfig::default();
        let mut zones = ZoneStore::new(5);
        zones.ensure_radius(ZoneCoord::ORIGIN, radius, &config.biomes);
        (zones, config)
    }

    #[test]
    fn passes_run_every_thirty_ticks() {
        let config = SchedulerConfig::default();
        assert!(!CatchUpScheduler::is_due(0, &config));
        assert!(!CatchUpScheduler::is_due(29, &config));
        assert!(CatchUpScheduler::is_due(30, &config));
        assert!(CatchUpScheduler::is_due(60, &config));
    }

    #[test]
    fn player_zone_is_never_scheduled() {
        let (zones, config) = store(1);
        let scheduler = CatchUpScheduler::new();
        let jobs = scheduler.plan(6_000, ZoneCoord::ORIGIN, &zones, &config.scheduler);
        assert_eq!(jobs.len(), 8);
        assert!(jobs.iter().all(|j| j.coord != ZoneCoord::ORIGIN));
    }

    #[test]
    fn pass_is_bounded_in_zones_and_cycles() {
        let (zones, config) = store(4);
        let scheduler = CatchUpScheduler::new();
        let jobs = scheduler.plan(10_000_000, ZoneCoord::ORIGIN, &zones, &config.scheduler);
        assert_eq!(jobs.len(), 20);
        for job in &jobs {
            assert!((1..=100).contains(&job.plan.cycles));
            assert!(job.plan.capped);
        }
    }

    #[test]
    fn nearer_zones_come_first_and_ties_break_on_staleness() {
        let (zones, config) = store(1);
        let mut scheduler = CatchUpScheduler::new();
        let now = 3_000;
        scheduler.touch(ZoneCoord::new(1, 0), 2_990);
        let jobs = scheduler.plan(now, ZoneCoord::ORIGIN, &zones, &config.scheduler);

        assert!(jobs.windows(2).all(|w| w[0].priority >= w[1].priority));
        assert_eq!(jobs[0].distance, 1);
        let first_fresh = jobs.iter().position(|j| j.coord == ZoneCoord::new(1, 0)).unwrap();
        let stale_neighbor = jobs
            .iter()
            .position(|j| j.distance == 1 && j.coord != ZoneCoord::new(1, 0))
            .unwrap();
        assert!(stale_neighbor < first_fresh);
    }

    #[test]
    fn diagonal_zones_rank_behind_edge_neighbours() {
        let (zones, config) = store(1);
        let scheduler = CatchUpScheduler::new();
        let jobs = scheduler.plan(600, ZoneCoord::ORIGIN, &zones, &config.scheduler);

        let diagonal = jobs.iter().find(|j| j.coord == ZoneCoord::new(1, 1)).unwrap();
        assert_eq!(diagonal.distance, 2);
        assert_eq!(diagonal.plan.cycles, 8);
        let edges: Vec<_> = jobs.iter().take(4).map(|j| j.distance).collect();
        assert_eq!(edges, vec![1, 1, 1, 1]);
    }

    #[test]
    fn fresh_zones_are_skipped() {
        let (zones, config) = store(1);
        let mut scheduler = CatchUpScheduler::new();
        for coord in zones.coords() {
            scheduler.touch(coord, 500);
        }
        assert!(scheduler.plan(500, ZoneCoord::ORIGIN, &zones, &config.scheduler).is_empty());
    }

    #[test]
    fn recording_refreshes_and_counts() {
        let (zones, config) = store(1);
        let mut scheduler = CatchUpScheduler::new();
        let jobs = scheduler.plan(1_000_000, ZoneCoord::ORIGIN, &zones, &config.scheduler);
        for job in &jobs {
            scheduler.record(job, 1_000_000, &config.scheduler);
        }
        scheduler.finish_pass(&jobs);

        assert_eq!(scheduler.staleness(jobs[0].coord, 1_000_000), 0);
        let stats = scheduler.stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.zones_advanced, 8);
        assert_eq!(stats.capped_jobs, 8);
        assert_eq!(stats.cycles_run, 800);
    }

    #[test]
    fn missing_timestamps_mean_maximally_stale() {
        let scheduler = CatchUpScheduler::from_timestamps(BTreeMap::new());
        assert_eq!(scheduler.staleness(ZoneCoord::new(3, 3), 4_200), 4_200);
    }
}
