//! Fixed world dimensions and timing.
//!
//! Anything a player might want to tune lives in [`crate::config::SimConfig`];
//! the values here are structural and baked into the save format.

/// Zone width in cells.
pub const GRID_WIDTH: usize = 24;
/// Zone height in cells.
pub const GRID_HEIGHT: usize = 18;
/// Logical ticks per real second.
pub const TICKS_PER_SECOND: u32 = 60;

/// Maximum hunger/thirst value. Both decay toward 0.
pub const MAX_NEED: f32 = 100.0;

/// Default AI state durations, in evaluated ticks.
pub mod ai_durations {
    pub const IDLE: u32 = 60;
    pub const WANDER: u32 = 120;
    pub const TARGETING: u32 = 180;
    pub const FLEE: u32 = 120;
    /// Combat lasts between these many seconds before re-evaluating.
    pub const COMBAT_MIN_SECONDS: u32 = 2;
    pub const COMBAT_MAX_SECONDS: u32 = 3;
}

/// Experience awarded per completed activity.
pub mod xp_rewards {
    pub const HARVEST: u32 = 5;
    pub const CHOP: u32 = 7;
    pub const MINE: u32 = 6;
    pub const BUILD: u32 = 10;
    pub const TRAVEL: u32 = 3;
    pub const KILL: u32 = 15;
}

/// Middle row/column used for zone exits.
pub const fn exit_center_x() -> usize {
    GRID_WIDTH / 2
}

pub const fn exit_center_y() -> usize {
    GRID_HEIGHT / 2
}
