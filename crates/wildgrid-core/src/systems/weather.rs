//! Weather and day/night clock
//!
//! Simulation time `S` advances one unit per tick. The phase is a pure
//! function of `S`; rain is a countdown re-armed with a fresh random
//! interval each time a shower ends.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wildgrid_logic::config::WeatherConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayPhase {
    Day,
    Night,
}

/// Something the clock did this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherEvent {
    RainStarted { duration: u32 },
    RainStopped { next_in: u32 },
    Dawn,
    Dusk,
}

/// Process-wide simulation clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldClock {
    tick: u64,
    raining: bool,
    /// Ticks left in the current shower, or until the next one.
    countdown: u32,
}

impl WorldClock {
    pub fn new(config: &WeatherConfig, rng: &mut impl Rng) -> Self {
        Self {
            tick: 0,
            raining: false,
            countdown: draw(config.rain_interval_min, config.rain_interval_max, rng),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_raining(&self) -> bool {
        self.raining
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn phase(&self, config: &WeatherConfig) -> DayPhase {
        phase_at(self.tick, config)
    }

    pub fn is_night(&self, config: &WeatherConfig) -> bool {
        self.phase(config) == DayPhase::Night
    }

    /// Ambient light in `[0.35, 1.0]`, easing over the first and last
    /// tenth of each day.
    pub fn light_level(&self, config: &WeatherConfig) -> f32 {
        const NIGHT_LIGHT: f32 = 0.35;
        let cycle = (config.day_length + config.night_length).max(1);
        let t = self.tick % cycle;
        if t >= config.day_length {
            return NIGHT_LIGHT;
        }
        let ramp = (config.day_length / 10).max(1);
        let edge = t.min(config.day_length - 1 - t);
        let k = (edge as f32 / ramp as f32).min(1.0);
        NIGHT_LIGHT + (1.0 - NIGHT_LIGHT) * k
    }

    /// Advance one tick.
    pub fn advance(&mut self, config: &WeatherConfig, rng: &mut impl Rng) -> Vec<WeatherEvent> {
        let before = self.phase(config);
        self.tick += 1;
        let mut events = Vec::new();

        match self.phase(config) {
            DayPhase::Night if before == DayPhase::Day => events.push(WeatherEvent::Dusk),
            DayPhase::Day if before == DayPhase::Night => events.push(WeatherEvent::Dawn),
            _ => {}
        }

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            if self.raining {
                self.raining = false;
                self.countdown = draw(config.rain_interval_min, config.rain_interval_max, rng);
                debug!(tick = self.tick, next_in = self.countdown, "rain stopped");
                events.push(WeatherEvent::RainStopped {
                    next_in: self.countdown,
                });
            } else {
                self.raining = true;
                self.countdown = draw(config.rain_duration_min, config.rain_duration_max, rng);
                debug!(tick = self.tick, duration = self.countdown, "rain started");
                events.push(WeatherEvent::RainStarted {
                    duration: self.countdown,
                });
            }
        }
        events
    }
}

/// Day/night phase for simulation time `tick`.
pub fn phase_at(tick: u64, config: &WeatherConfig) -> DayPhase {
    let cycle = (config.day_length + config.night_length).max(1);
    if tick % cycle < config.day_length {
        DayPhase::Day
    } else {
        DayPhase::Night
    }
}

fn draw(min: u32, max: u32, rng: &mut impl Rng) -> u32 {
    rng.gen_range(min.max(1)..=max.max(min.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn phase_boundaries() {
        let cfg = WeatherConfig::default();
        assert_eq!(phase_at(0, &cfg), DayPhase::Day);
        assert_eq!(phase_at(149, &cfg), DayPhase::Day);
        assert_eq!(phase_at(150, &cfg), DayPhase::Night);
        assert_eq!(phase_at(299, &cfg), DayPhase::Night);
        assert_eq!(phase_at(300, &cfg), DayPhase::Day);
    }

    #[test]
    fn rain_intervals_stay_in_range() {
        let cfg = WeatherConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut clock = WorldClock::new(&cfg, &mut rng);
        let mut showers = 0;
        for _ in 0..20_000 {
            for event in clock.advance(&cfg, &mut rng) {
                match event {
                    WeatherEvent::RainStarted { duration } => {
                        showers += 1;
                        assert!((cfg.rain_duration_min..=cfg.rain_duration_max).contains(&duration));
                    }
                    WeatherEvent::RainStopped { next_in } => {
                        assert!((cfg.rain_interval_min..=cfg.rain_interval_max).contains(&next_in));
                    }
                    _ => {}
                }
            }
        }
        assert!(showers > 10);
    }

    #[test]
    fn dusk_and_dawn_fire_once_per_cycle() {
        let cfg = WeatherConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut clock = WorldClock::new(&cfg, &mut rng);
        let mut dusks = 0;
        let mut dawns = 0;
        for _ in 0..600 {
            for event in clock.advance(&cfg, &mut rng) {
                match event {
                    WeatherEvent::Dusk => dusks += 1,
                    WeatherEvent::Dawn => dawns += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(dusks, 2);
        assert_eq!(dawns, 2);
    }

    #[test]
    fn light_is_dim_at_night() {
        let cfg = WeatherConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut clock = WorldClock::new(&cfg, &mut rng);
        for _ in 0..75 {
            clock.advance(&cfg, &mut rng);
        }
        assert_eq!(clock.light_level(&cfg), 1.0);
        for _ in 0..100 {
            clock.advance(&cfg, &mut rng);
        }
        assert!(clock.light_level(&cfg) < 0.5);
    }
}
