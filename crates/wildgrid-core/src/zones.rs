//! Zone store - sparse map of generated zones and their membership sets.

use std::collections::BTreeMap;

use hecs::Entity;
use rand::Rng;
use tracing::{debug, warn};
use wildgrid_logic::biome::BiomeTable;

use crate::components::{CellPos, Zone, ZoneCoord};
use crate::generation::{generate_fallback_zone, generate_zone};

/// Owns every zone generated so far. Zones are created on first access
/// and never regenerated unless their grid turns out to be unusable.
#[derive(Debug, Clone)]
pub struct ZoneStore {
    world_seed: u64,
    zones: BTreeMap<ZoneCoord, Zone>,
}

impl ZoneStore {
    pub fn new(world_seed: u64) -> Self {
        Self {
            world_seed,
            zones: BTreeMap::new(),
        }
    }

    pub fn world_seed(&self) -> u64 {
        self.world_seed
    }

    pub fn get(&self, coord: ZoneCoord) -> Option<&Zone> {
        self.zones.get(&coord)
    }

    pub fn get_mut(&mut self, coord: ZoneCoord) -> Option<&mut Zone> {
        self.zones.get_mut(&coord)
    }

    pub fn contains(&self, coord: ZoneCoord) -> bool {
        self.zones.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn coords(&self) -> Vec<ZoneCoord> {
        self.zones.keys().copied().collect()
    }

    /// Insert a zone as-is (used when restoring a save).
    pub fn insert(&mut self, zone: Zone) {
        self.zones.insert(zone.coord, zone);
    }

    /// Make sure `coord` holds a usable zone. Returns true when a zone was
    /// generated (or regenerated) by this call.
    ///
    /// Generation faults fall back to the built-in forest composition; a
    /// corrupt grid is regenerated in place, keeping its members.
    pub fn ensure(&mut self, coord: ZoneCoord, table: &BiomeTable) -> bool {
        if let Some(zone) = self.zones.get(&coord) {
            if zone.grid.is_valid() {
                return false;
            }
            warn!(zone = %coord, "zone grid is corrupt, regenerating");
        }

        let mut zone = match generate_zone(self.world_seed, coord, table) {
            Ok(zone) => zone,
            Err(err) => {
                warn!(zone = %coord, error = %err, "zone generation failed, using fallback biome");
                generate_fallback_zone(self.world_seed, coord)
            }
        };
        if let Some(old) = self.zones.remove(&coord) {
            zone.members = old.members;
        } else {
            debug!(zone = %coord, biome = ?zone.biome, "generated zone");
        }
        self.zones.insert(coord, zone);
        true
    }

    /// Ensure every zone within `radius` of `center`. Returns the coords
    /// that were newly generated.
    pub fn ensure_radius(
        &mut self,
        center: ZoneCoord,
        radius: i32,
        table: &BiomeTable,
    ) -> Vec<ZoneCoord> {
        let mut generated = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let coord = center.offset(dx, dy);
                let existed = self.contains(coord);
                if self.ensure(coord, table) && !existed {
                    generated.push(coord);
                }
            }
        }
        generated
    }

    pub fn add_member(&mut self, coord: ZoneCoord, entity: Entity) {
        if let Some(zone) = self.zones.get_mut(&coord) {
            zone.members.insert(entity);
        }
    }

    pub fn remove_member(&mut self, coord: ZoneCoord, entity: Entity) {
        if let Some(zone) = self.zones.get_mut(&coord) {
            zone.members.remove(&entity);
        }
    }

    /// Move an entity's membership from one zone to another.
    pub fn move_member(&mut self, entity: Entity, from: ZoneCoord, to: ZoneCoord) {
        self.remove_member(from, entity);
        self.add_member(to, entity);
    }

    /// Members of a zone in handle order.
    pub fn members(&self, coord: ZoneCoord) -> Vec<Entity> {
        self.zones
            .get(&coord)
            .map(|z| z.members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, coord: ZoneCoord) -> usize {
        self.zones.get(&coord).map_or(0, |z| z.members.len())
    }
}

/// A random walkable interior cell, if the zone has one.
pub fn random_walkable(zone: &Zone, rng: &mut impl Rng) -> Option<CellPos> {
    let cells: Vec<CellPos> = zone
        .grid
        .iter()
        .filter(|(p, c)| !p.on_border() && c.kind.is_walkable())
        .map(|(p, _)| p)
        .collect();
    if cells.is_empty() {
        None
    } else {
        Some(cells[rng.gen_range(0..cells.len())])
    }
}
