//! Biomes, their cell compositions and creature spawn tables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cells::CellType;
use crate::species::{
    AnimalKind, CombatRole, CreatureKind, HostileKind, PeacefulRole,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Biome {
    Forest,
    Plains,
    Desert,
    Mountains,
}

impl Biome {
    pub const ALL: [Biome; 4] = [Biome::Forest, Biome::Plains, Biome::Desert, Biome::Mountains];

    /// Scales how much rain reaches a zone of this biome.
    pub fn rain_multiplier(self) -> f32 {
        match self {
            Biome::Forest => 1.0,
            Biome::Plains => 1.2,
            Biome::Desert => 0.1,
            Biome::Mountains => 0.3,
        }
    }

    /// Scales the chance of a natural hidden cave.
    pub fn cave_multiplier(self) -> f32 {
        match self {
            Biome::Mountains => 3.0,
            Biome::Desert => 1.5,
            Biome::Forest | Biome::Plains => 1.0,
        }
    }

    /// Creatures that may arrive in a freshly generated zone, with chances.
    pub fn spawn_table(self) -> &'static [(CreatureKind, f32)] {
        use CreatureKind::*;
        match self {
            Biome::Forest => &[
                (Animal(AnimalKind::Deer), 0.5),
                (Animal(AnimalKind::Wolf), 0.3),
                (Animal(AnimalKind::Sheep), 0.2),
                (Peaceful(PeacefulRole::Farmer), 0.5),
                (Peaceful(PeacefulRole::Lumberjack), 0.6),
                (Peaceful(PeacefulRole::Wizard), 0.25),
                (Peaceful(PeacefulRole::Trader), 1.0),
                (Peaceful(PeacefulRole::Blacksmith), 0.5),
                (Combat(CombatRole::Guard), 1.0),
                (Hostile(HostileKind::Bandit), 0.2),
                (Hostile(HostileKind::Goblin), 0.3),
                (Hostile(HostileKind::Termite), 0.4),
            ],
            Biome::Plains => &[
                (Animal(AnimalKind::Sheep), 0.6),
                (Animal(AnimalKind::Deer), 0.4),
                (Animal(AnimalKind::Wolf), 0.2),
                (Peaceful(PeacefulRole::Farmer), 0.7),
                (Peaceful(PeacefulRole::Lumberjack), 0.3),
                (Peaceful(PeacefulRole::Wizard), 0.25),
                (Peaceful(PeacefulRole::Trader), 1.0),
                (Peaceful(PeacefulRole::Blacksmith), 0.5),
                (Combat(CombatRole::Guard), 1.0),
                (Hostile(HostileKind::Bandit), 0.2),
                (Hostile(HostileKind::Goblin), 0.2),
                (Hostile(HostileKind::Termite), 0.2),
            ],
            Biome::Desert => &[
                (Animal(AnimalKind::Sheep), 0.2),
                (Animal(AnimalKind::Deer), 0.2),
                (Animal(AnimalKind::Wolf), 0.2),
                (Hostile(HostileKind::Goblin), 0.7),
                (Hostile(HostileKind::Bandit), 0.5),
                (Peaceful(PeacefulRole::Wizard), 0.25),
                (Peaceful(PeacefulRole::Farmer), 0.3),
                (Peaceful(PeacefulRole::Lumberjack), 0.2),
                (Peaceful(PeacefulRole::Miner), 0.5),
                (Peaceful(PeacefulRole::Trader), 1.0),
                (Peaceful(PeacefulRole::Blacksmith), 0.4),
                (Combat(CombatRole::Guard), 1.0),
            ],
            Biome::Mountains => &[
                (Animal(AnimalKind::Wolf), 0.6),
                (Animal(AnimalKind::Deer), 0.3),
                (Animal(AnimalKind::Sheep), 0.2),
                (Hostile(HostileKind::Goblin), 0.6),
                (Hostile(HostileKind::Bandit), 0.3),
                (Peaceful(PeacefulRole::Wizard), 0.25),
                (Peaceful(PeacefulRole::Farmer), 0.2),
                (Peaceful(PeacefulRole::Lumberjack), 0.4),
                (Peaceful(PeacefulRole::Miner), 0.7),
                (Peaceful(PeacefulRole::Trader), 1.0),
                (Peaceful(PeacefulRole::Blacksmith), 0.6),
                (Combat(CombatRole::Guard), 1.0),
            ],
        }
    }
}

/// A cell type and its relative weight in a biome composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellWeight {
    pub cell: CellType,
    pub weight: f32,
}

const fn w(cell: CellType, weight: f32) -> CellWeight {
    CellWeight { cell, weight }
}

/// One biome's selection chance and cell composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeEntry {
    pub biome: Biome,
    pub chance: f32,
    pub cells: Vec<CellWeight>,
}

/// Faults in a biome table entry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BiomeError {
    #[error("no table entry for biome {0:?}")]
    Missing(Biome),
    #[error("biome {0:?} has an empty or non-positive composition")]
    Malformed(Biome),
}

/// Biome selection chances and compositions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeTable {
    pub entries: Vec<BiomeEntry>,
}

static FOREST_CELLS: [CellWeight; 5] = [
    w(CellType::Grass, 0.5),
    w(CellType::Dirt, 0.2),
    w(CellType::Tree1, 0.15),
    w(CellType::Tree2, 0.05),
    w(CellType::Water, 0.1),
];

impl Default for BiomeTable {
    fn default() -> Self {
        Self {
            entries: vec![
                BiomeEntry {
                    biome: Biome::Forest,
                    chance: 0.6,
                    cells: FOREST_CELLS.to_vec(),
                },
                BiomeEntry {
                    biome: Biome::Plains,
                    chance: 0.2,
                    cells: vec![
                        w(CellType::Grass, 0.6),
                        w(CellType::Dirt, 0.2),
                        w(CellType::Water, 0.05),
                        w(CellType::Carrot1, 0.1),
                        w(CellType::Tree1, 0.05),
                    ],
                },
                BiomeEntry {
                    biome: Biome::Mountains,
                    chance: 0.15,
                    cells: vec![
                        w(CellType::Dirt, 0.45),
                        w(CellType::Stone, 0.2),
                        w(CellType::Grass, 0.2),
                        w(CellType::Tree1, 0.1),
                        w(CellType::Water, 0.05),
                    ],
                },
                BiomeEntry {
                    biome: Biome::Desert,
                    chance: 0.05,
                    cells: vec![
                        w(CellType::Sand, 0.7),
                        w(CellType::Dirt, 0.2),
                        w(CellType::Water, 0.05),
                        w(CellType::Stone, 0.05),
                    ],
                },
            ],
        }
    }
}

impl BiomeTable {
    /// Pick a biome for a uniform roll in `[0, 1)`.
    ///
    /// Entries with non-positive chance are skipped; an unusable table
    /// yields [`Biome::Forest`].
    pub fn select(&self, roll: f32) -> Biome {
        let total: f32 = self
            .entries
            .iter()
            .map(|e| e.chance)
            .filter(|c| c.is_finite() && *c > 0.0)
            .sum();
        if total <= 0.0 {
            return Biome::Forest;
        }
        let mut target = roll.clamp(0.0, 1.0) * total;
        for entry in self.entries.iter().filter(|e| e.chance.is_finite() && e.chance > 0.0) {
            if target < entry.chance {
                return entry.biome;
            }
            target -= entry.chance;
        }
        self.entries
            .iter()
            .rev()
            .find(|e| e.chance.is_finite() && e.chance > 0.0)
            .map(|e| e.biome)
            .unwrap_or(Biome::Forest)
    }

    /// The validated composition for a biome.
    pub fn composition(&self, biome: Biome) -> Result<&[CellWeight], BiomeError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.biome == biome)
            .ok_or(BiomeError::Missing(biome))?;
        let usable = !entry.cells.is_empty()
            && entry
                .cells
                .iter()
                .all(|c| c.weight.is_finite() && c.weight >= 0.0)
            && entry.cells.iter().map(|c| c.weight).sum::<f32>() > 0.0;
        if usable {
            Ok(&entry.cells)
        } else {
            Err(BiomeError::Malformed(biome))
        }
    }

    /// Composition used when a table entry cannot be used.
    pub fn fallback_composition() -> &'static [CellWeight] {
        &FOREST_CELLS
    }
}

/// Weighted pick from a validated composition for a roll in `[0, 1)`.
pub fn pick_cell(cells: &[CellWeight], roll: f32) -> CellType {
    let total: f32 = cells.iter().map(|c| c.weight).sum();
    let mut target = roll.clamp(0.0, 1.0) * total;
    for c in cells {
        if target < c.weight {
            return c.cell;
        }
        target -= c.weight;
    }
    cells.last().map(|c| c.cell).unwrap_or(CellType::Grass)
}

/// Counts used to decide whether a zone's biome has drifted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCensus {
    pub total: u32,
    pub grass: u32,
    pub sand: u32,
    pub stone: u32,
    pub trees: u32,
}

impl CellCensus {
    pub fn add(&mut self, cell: CellType) {
        self.total += 1;
        match cell {
            CellType::Grass => self.grass += 1,
            CellType::Sand => self.sand += 1,
            CellType::Stone => self.stone += 1,
            CellType::Tree1 | CellType::Tree2 => self.trees += 1,
            _ => {}
        }
    }
}

/// Biome a zone drifts to given its current cells.
pub fn reclassify(census: &CellCensus, current: Biome) -> Biome {
    if census.total == 0 {
        return current;
    }
    let pct = |n: u32| n as f32 / census.total as f32;
    let (grass, sand, stone, trees) = (
        pct(census.grass),
        pct(census.sand),
        pct(census.stone),
        pct(census.trees),
    );
    if sand > 0.4 {
        Biome::Desert
    } else if stone > 0.3 {
        Biome::Mountains
    } else if grass > 0.5 && trees < 0.1 {
        Biome::Plains
    } else if grass > 0.3 && trees > 0.15 {
        Biome::Forest
    } else {
        current
    }
}
