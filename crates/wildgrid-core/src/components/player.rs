//! The player character.

use serde::{Deserialize, Serialize};
use wildgrid_logic::health;
use wildgrid_logic::items::Inventory;

use super::common::{CellPos, Position, ZoneCoord};
use super::creatures::Vitals;

/// Base health per player level.
pub const PLAYER_BASE_HEALTH: f32 = 100.0;
/// Base strength per player level.
pub const PLAYER_BASE_STRENGTH: f32 = 10.0;
pub const PLAYER_INVENTORY_SLOTS: usize = 20;

/// Target-seeking autopilot. Any player input clears its intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Autopilot {
    pub enabled: bool,
    /// Where the autopilot is currently heading.
    pub intent: Option<(ZoneCoord, CellPos)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub position: Position,
    pub vitals: Vitals,
    pub level: u32,
    pub xp: u32,
    pub inventory: Inventory,
    pub autopilot: Autopilot,
    pub deaths: u32,
}

impl Player {
    pub fn new(zone: ZoneCoord, cell: CellPos) -> Self {
        Self {
            position: Position::new(zone, cell),
            vitals: Vitals::full(PLAYER_BASE_HEALTH),
            level: 1,
            xp: 0,
            inventory: Inventory::with_capacity(PLAYER_INVENTORY_SLOTS),
            autopilot: Autopilot::default(),
            deaths: 0,
        }
    }

    pub fn max_health(&self) -> f32 {
        health::max_health(PLAYER_BASE_HEALTH, self.level)
    }

    pub fn strength(&self) -> f32 {
        health::strength(PLAYER_BASE_STRENGTH, self.level)
    }

    pub fn zone(&self) -> ZoneCoord {
        self.position.zone
    }

    pub fn cell(&self) -> CellPos {
        self.position.cell
    }

    /// Clear any pending autopilot intent; called on every player input.
    pub fn interrupt_autopilot(&mut self) {
        self.autopilot.intent = None;
    }
}
