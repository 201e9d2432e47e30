//! Freeze enchantments on zones, cells and entities.

use std::collections::BTreeSet;

use hecs::Entity;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::{entity_bits, CellPos, ZoneCoord};

/// What an enchantment holds still.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnchantTarget {
    /// The whole zone skips automaton steps.
    Zone(ZoneCoord),
    Cell(ZoneCoord, CellPos),
    /// The entity skips AI evaluation and survival decay.
    Entity(#[serde(with = "entity_bits")] Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enchantment {
    pub target: EnchantTarget,
    /// Ticks left.
    pub remaining: u32,
}

/// All active enchantments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enchantments {
    active: Vec<Enchantment>,
}

impl Enchantments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cast(&mut self, target: EnchantTarget, duration: u32) {
        if duration == 0 {
            return;
        }
        debug!(?target, duration, "enchantment cast");
        self.active.push(Enchantment {
            target,
            remaining: duration,
        });
    }

    /// Count every enchantment down by one tick; returns how many expired.
    pub fn tick(&mut self) -> usize {
        let before = self.active.len();
        for e in &mut self.active {
            e.remaining = e.remaining.saturating_sub(1);
        }
        self.active.retain(|e| e.remaining > 0);
        before - self.active.len()
    }

    pub fn zone_frozen(&self, coord: ZoneCoord) -> bool {
        self.active
            .iter()
            .any(|e| e.target == EnchantTarget::Zone(coord))
    }

    pub fn frozen_cells(&self, coord: ZoneCoord) -> BTreeSet<CellPos> {
        self.active
            .iter()
            .filter_map(|e| match e.target {
                EnchantTarget::Cell(z, p) if z == coord => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn entity_frozen(&self, entity: Entity) -> bool {
        self.active
            .iter()
            .any(|e| e.target == EnchantTarget::Entity(entity))
    }

    /// Drop enchantments on an entity that no longer exists.
    pub fn forget_entity(&mut self, entity: Entity) {
        self.active
            .retain(|e| e.target != EnchantTarget::Entity(entity));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Enchantment> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
