//! Procedural zone generation
//!
//! A zone is a pure function of `(world_seed, coord, biome table)`: every
//! draw comes from a ChaCha8 stream seeded by hashing those inputs, so the
//! same zone comes out byte-identical no matter when or in which order it
//! is generated.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use wildgrid_logic::biome::{pick_cell, Biome, BiomeError, BiomeTable, CellWeight};
use wildgrid_logic::cells::CellType;
use wildgrid_logic::constants::{GRID_HEIGHT, GRID_WIDTH};

use crate::components::{CellGrid, CellPos, Direction, Exits, Zone, ZoneCoord};

/// Chance that an edge between two zones is open.
const EDGE_OPEN_PERCENT: u64 = 75;
const STRUCTURE_CHANCE: f32 = 0.3;
const HIDDEN_CAVE_CHANCE: f32 = 0.08;
const EDGE_SALT: u64 = 0x5eed_ed6e;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Biome(#[from] BiomeError),
    #[error("zone {0} produced an invalid grid")]
    InvalidGrid(ZoneCoord),
}

/// Splitmix-style hash of a seed and an index.
pub fn mix_seed(seed: u64, index: u64) -> u64 {
    let mut h = seed.wrapping_mul(6364136223846793005).wrapping_add(index);
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h
}

/// Seed for everything random about one zone.
pub fn zone_seed(world_seed: u64, coord: ZoneCoord) -> u64 {
    let index = ((coord.x as u32 as u64) << 32) | coord.y as u32 as u64;
    mix_seed(world_seed, index)
}

/// Whether the edge between `coord` and its neighbour toward `dir` is open.
///
/// Both zones evaluate the same shared edge, so they always agree.
pub fn edge_open(world_seed: u64, coord: ZoneCoord, dir: Direction) -> bool {
    let other = coord.neighbor(dir);
    if coord == ZoneCoord::ORIGIN || other == ZoneCoord::ORIGIN {
        return true;
    }
    // Name each edge by its west/north zone plus an axis bit.
    let (anchor, axis) = match dir {
        Direction::East => (coord, 0u64),
        Direction::West => (other, 0),
        Direction::South => (coord, 1),
        Direction::North => (other, 1),
    };
    let key = zone_seed(world_seed ^ EDGE_SALT, anchor) ^ axis;
    mix_seed(key, axis) % 100 < EDGE_OPEN_PERCENT
}

pub fn exits_for(world_seed: u64, coord: ZoneCoord) -> Exits {
    Exits {
        north: edge_open(world_seed, coord, Direction::North),
        south: edge_open(world_seed, coord, Direction::South),
        east: edge_open(world_seed, coord, Direction::East),
        west: edge_open(world_seed, coord, Direction::West),
    }
}

/// Generate a zone from the biome table.
pub fn generate_zone(
    world_seed: u64,
    coord: ZoneCoord,
    table: &BiomeTable,
) -> Result<Zone, GenerationError> {
    let mut rng = ChaCha8Rng::seed_from_u64(zone_seed(world_seed, coord));
    let biome = table.select(rng.gen());
    let cells = table.composition(biome)?;
    build_zone(coord, biome, cells, exits_for(world_seed, coord), &mut rng)
}

/// Generate a zone with the built-in forest composition, ignoring the table.
pub fn generate_fallback_zone(world_seed: u64, coord: ZoneCoord) -> Zone {
    let mut rng = ChaCha8Rng::seed_from_u64(zone_seed(world_seed, coord));
    // Keep the stream aligned with `generate_zone`.
    let _: f32 = rng.gen();
    let exits = exits_for(world_seed, coord);
    let grid = fill_grid(BiomeTable::fallback_composition(), &exits, &mut rng);
    let mut zone = Zone::new(coord, Biome::Forest, grid, exits);
    place_features(&mut zone, &mut rng);
    zone
}

fn build_zone(
    coord: ZoneCoord,
    biome: Biome,
    cells: &[CellWeight],
    exits: Exits,
    rng: &mut ChaCha8Rng,
) -> Result<Zone, GenerationError> {
    let grid = fill_grid(cells, &exits, rng);
    let mut zone = Zone::new(coord, biome, grid, exits);
    place_features(&mut zone, rng);
    if zone.grid.is_valid() {
        Ok(zone)
    } else {
        Err(GenerationError::InvalidGrid(coord))
    }
}

fn fill_grid(cells: &[CellWeight], exits: &Exits, rng: &mut ChaCha8Rng) -> CellGrid {
    let mut grid = CellGrid::filled(CellType::Wall);
    for index in 0..CellGrid::LEN {
        let pos = CellPos::from_index(index);
        if !pos.on_border() {
            grid.set_kind(pos, pick_cell(cells, rng.gen()));
        }
    }
    for dir in Direction::ALL.into_iter().filter(|d| exits.open(*d)) {
        let (dx, dy) = dir.opposite().delta();
        for cell in Exits::cells(dir) {
            grid.set_kind(cell, CellType::Dirt);
            // Keep the arrival cell clear.
            let inner = cell.offset(dx, dy);
            if grid.kind_at(inner).is_some_and(|k| k.is_solid()) {
                grid.set_kind(inner, CellType::Dirt);
            }
        }
    }
    grid
}

fn interior_cell(rng: &mut ChaCha8Rng) -> CellPos {
    CellPos::new(
        rng.gen_range(3..GRID_WIDTH as i32 - 3),
        rng.gen_range(3..GRID_HEIGHT as i32 - 3),
    )
}

fn place_features(zone: &mut Zone, rng: &mut ChaCha8Rng) {
    if rng.gen::<f32>() < STRUCTURE_CHANCE {
        let kind = if rng.gen_bool(0.5) {
            CellType::House
        } else {
            CellType::Cave
        };
        let pos = interior_cell(rng);
        zone.grid.set_kind(pos, kind);
    }
    if rng.gen::<f32>() < HIDDEN_CAVE_CHANCE * zone.biome.cave_multiplier() {
        let pos = interior_cell(rng);
        zone.grid.set_kind(pos, CellType::HiddenCave);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let table = BiomeTable::default();
        for coord in [ZoneCoord::new(0, 0), ZoneCoord::new(3, -7), ZoneCoord::new(-12, 40)] {
            let a = generate_zone(42, coord, &table).unwrap();
            let b = generate_zone(42, coord, &table).unwrap();
            assert_eq!(
                bincode::serialize(&a).unwrap(),
                bincode::serialize(&b).unwrap()
            );
        }
    }

    #[test]
    fn different_seeds_differ() {
        let table = BiomeTable::default();
        let a = generate_zone(1, ZoneCoord::new(2, 2), &table).unwrap();
        let b = generate_zone(2, ZoneCoord::new(2, 2), &table).unwrap();
        assert_ne!(a.grid, b.grid);
    }

    #[test]
    fn origin_has_every_exit() {
        let zone = generate_zone(9, ZoneCoord::ORIGIN, &BiomeTable::default()).unwrap();
        assert_eq!(zone.exits.count(), 4);
        for dir in Direction::ALL {
            for cell in Exits::cells(dir) {
                assert!(zone.walkable(cell));
            }
        }
    }

    #[test]
    fn neighbours_agree_on_shared_edges() {
        for x in -5..5 {
            for y in -5..5 {
                let here = ZoneCoord::new(x, y);
                for dir in Direction::ALL {
                    assert_eq!(
                        edge_open(77, here, dir),
                        edge_open(77, here.neighbor(dir), dir.opposite()),
                        "{here} {dir:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn border_is_wall_except_exits() {
        let zone = generate_zone(5, ZoneCoord::new(1, 1), &BiomeTable::default()).unwrap();
        for (pos, cell) in zone.grid.iter() {
            if pos.on_border() && zone.exit_open(pos).is_none() {
                assert_eq!(cell.kind, CellType::Wall, "{pos:?}");
            }
        }
    }

    #[test]
    fn malformed_entry_is_an_error() {
        let mut table = BiomeTable::default();
        for entry in &mut table.entries {
            entry.cells.clear();
        }
        let err = generate_zone(5, ZoneCoord::new(1, 1), &table).unwrap_err();
        assert!(matches!(err, GenerationError::Biome(BiomeError::Malformed(_))));
    }

    #[test]
    fn fallback_is_forest() {
        let zone = generate_fallback_zone(5, ZoneCoord::new(1, 1));
        assert_eq!(zone.biome, Biome::Forest);
        assert!(zone.grid.is_valid());
    }
}
