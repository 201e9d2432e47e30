//! Cell grids and zones.

use std::collections::BTreeSet;

use hecs::Entity;
use serde::{Deserialize, Serialize};
use wildgrid_logic::biome::{Biome, CellCensus};
use wildgrid_logic::cells::{CellType, Neighborhood};
use wildgrid_logic::constants::{GRID_HEIGHT, GRID_WIDTH};

use super::common::{CellPos, Direction, ZoneCoord};

/// One tile: its type and progress toward its next transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellType,
    /// Accumulated transition progress in `[0, 1]`.
    pub progress: f32,
}

impl Cell {
    pub fn new(kind: CellType) -> Self {
        Self {
            kind,
            progress: 0.0,
        }
    }
}

/// Fixed-size row-major grid of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellGrid {
    cells: Vec<Cell>,
}

impl CellGrid {
    pub const LEN: usize = GRID_WIDTH * GRID_HEIGHT;

    pub fn filled(kind: CellType) -> Self {
        Self {
            cells: vec![Cell::new(kind); Self::LEN],
        }
    }

    pub fn get(&self, pos: CellPos) -> Option<&Cell> {
        pos.index().and_then(|i| self.cells.get(i))
    }

    pub fn get_mut(&mut self, pos: CellPos) -> Option<&mut Cell> {
        pos.index().and_then(move |i| self.cells.get_mut(i))
    }

    pub fn kind_at(&self, pos: CellPos) -> Option<CellType> {
        self.get(pos).map(|c| c.kind)
    }

    /// Change a cell's type, resetting its progress. Returns whether the
    /// type actually changed.
    pub fn set_kind(&mut self, pos: CellPos, kind: CellType) -> bool {
        match self.get_mut(pos) {
            Some(cell) if cell.kind != kind => {
                *cell = Cell::new(kind);
                true
            }
            _ => false,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellPos, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (CellPos::from_index(i), c))
    }

    pub fn neighborhood(&self, pos: CellPos) -> Neighborhood {
        Neighborhood::from_cells(pos.neighbors8().filter_map(|p| self.kind_at(p)))
    }

    pub fn census(&self) -> CellCensus {
        let mut census = CellCensus::default();
        for cell in &self.cells {
            census.add(cell.kind);
        }
        census
    }

    pub fn count(&self, kind: CellType) -> usize {
        self.cells.iter().filter(|c| c.kind == kind).count()
    }

    /// Right dimensions and every progress finite in `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.cells.len() == Self::LEN
            && self
                .cells
                .iter()
                .all(|c| c.progress.is_finite() && (0.0..=1.0).contains(&c.progress))
    }

    /// Cells within `radius` (Chebyshev) of `from` that satisfy `pred`,
    /// nearest first.
    pub fn find_within(
        &self,
        from: CellPos,
        radius: i32,
        mut pred: impl FnMut(CellPos, CellType) -> bool,
    ) -> Vec<CellPos> {
        let mut found: Vec<CellPos> = self
            .iter()
            .filter(|(p, c)| p.chebyshev(from) <= radius && pred(*p, c.kind))
            .map(|(p, _)| p)
            .collect();
        found.sort_by_key(|p| (p.manhattan(from), p.y, p.x));
        found
    }
}

/// Which sides of a zone have an opening into the neighbour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exits {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl Exits {
    pub fn open(&self, dir: Direction) -> bool {
        match dir {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    pub fn count(&self) -> usize {
        Direction::ALL.iter().filter(|d| self.open(**d)).count()
    }

    /// The two border cells forming the exit on `dir`.
    pub fn cells(dir: Direction) -> [CellPos; 2] {
        let cx = GRID_WIDTH as i32 / 2;
        let cy = GRID_HEIGHT as i32 / 2;
        let right = GRID_WIDTH as i32 - 1;
        let bottom = GRID_HEIGHT as i32 - 1;
        match dir {
            Direction::North => [CellPos::new(cx - 1, 0), CellPos::new(cx, 0)],
            Direction::South => [CellPos::new(cx - 1, bottom), CellPos::new(cx, bottom)],
            Direction::West => [CellPos::new(0, cy - 1), CellPos::new(0, cy)],
            Direction::East => [CellPos::new(right, cy - 1), CellPos::new(right, cy)],
        }
    }

    /// The side whose exit contains `pos`, if any.
    pub fn side_of(pos: CellPos) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| Self::cells(*d).contains(&pos))
    }
}

/// One screen of the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub coord: ZoneCoord,
    pub biome: Biome,
    pub grid: CellGrid,
    pub exits: Exits,
    /// Tick of the last rain that reached this zone.
    pub last_rain: Option<u64>,
    /// Houses built here by NPCs.
    pub houses_built: u32,
    /// Set once the zone diverges from its generated state.
    pub touched: bool,
    /// Entities currently inside; rebuilt from positions on load.
    #[serde(skip)]
    pub members: BTreeSet<Entity>,
}

impl Zone {
    pub fn new(coord: ZoneCoord, biome: Biome, grid: CellGrid, exits: Exits) -> Self {
        Self {
            coord,
            biome,
            grid,
            exits,
            last_rain: None,
            houses_built: 0,
            touched: false,
            members: BTreeSet::new(),
        }
    }

    /// Whether an entity may stand on `pos`.
    pub fn walkable(&self, pos: CellPos) -> bool {
        self.grid.kind_at(pos).is_some_and(|k| k.is_walkable())
    }

    /// Cells an entity may leave the zone through, toward `dir`.
    pub fn exit_open(&self, pos: CellPos) -> Option<Direction> {
        Exits::side_of(pos).filter(|d| self.exits.open(*d))
    }

    /// Walkable cells next to open exits, used as arrival points.
    pub fn entrance_cells(&self) -> Vec<CellPos> {
        let mut cells: Vec<CellPos> = Direction::ALL
            .into_iter()
            .filter(|d| self.exits.open(*d))
            .flat_map(|d| {
                let (dx, dy) = d.opposite().delta();
                Exits::cells(d).map(|p| p.offset(dx, dy))
            })
            .filter(|p| self.walkable(*p))
            .collect();
        if cells.is_empty() && self.walkable(CellPos::center()) {
            cells.push(CellPos::center());
        }
        cells
    }
}
