//! Cell types and the terrain transition table.
//!
//! The automaton asks [`transition_for`] which transition a cell is
//! progressing toward, given counts of its eight neighbours. Rules are
//! checked in order and the first match wins; the returned rate already
//! includes neighbour and weather modifiers.
//!
//! | Cell | Rule | Target |
//! |------|------|--------|
//! | Grass | ≥5 water around | Water (flooding) |
//! | Grass | 1–2 trees and ≥1 water | Tree1 |
//! | Grass | a flower around | Flower |
//! | Grass | no water around | Dirt |
//! | Dirt | ≥5 water / ≥2 water / no water | Water / Grass / Sand |
//! | Tree1/2 | ≥4 trees or fire around | Grass |
//! | Carrot1/2 | watered | Carrot2/3 |
//! | Carrot* | dry | Dirt |

use serde::{Deserialize, Serialize};

use crate::config::AutomatonRates;

/// Every kind of tile a zone can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellType {
    // Terrain
    Grass,
    Dirt,
    Sand,
    Water,
    DeepWater,
    Stone,
    Cobblestone,
    Flower,
    Cactus,
    // Trees
    Tree1,
    Tree2,
    // Farming
    Soil,
    Carrot1,
    Carrot2,
    Carrot3,
    // Structures
    Wall,
    House,
    StoneHouse,
    Camp,
    Cave,
    HiddenCave,
    Mineshaft,
    Well,
    Forge,
    // Materials
    Wood,
    Planks,
    Bones,
    // Interiors
    FloorWood,
    CaveFloor,
    CaveWall,
    Chest,
    StairsDown,
    StairsUp,
}

/// Coarse grouping of cell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellCategory {
    Terrain,
    Tree,
    Farming,
    Structure,
    Material,
    Interior,
}

impl CellType {
    pub const ALL: [CellType; 33] = [
        CellType::Grass,
        CellType::Dirt,
        CellType::Sand,
        CellType::Water,
        CellType::DeepWater,
        CellType::Stone,
        CellType::Cobblestone,
        CellType::Flower,
        CellType::Cactus,
        CellType::Tree1,
        CellType::Tree2,
        CellType::Soil,
        CellType::Carrot1,
        CellType::Carrot2,
        CellType::Carrot3,
        CellType::Wall,
        CellType::House,
        CellType::StoneHouse,
        CellType::Camp,
        CellType::Cave,
        CellType::HiddenCave,
        CellType::Mineshaft,
        CellType::Well,
        CellType::Forge,
        CellType::Wood,
        CellType::Planks,
        CellType::Bones,
        CellType::FloorWood,
        CellType::CaveFloor,
        CellType::CaveWall,
        CellType::Chest,
        CellType::StairsDown,
        CellType::StairsUp,
    ];

    pub fn category(self) -> CellCategory {
        use CellType::*;
        match self {
            Grass | Dirt | Sand | Water | DeepWater | Stone | Cobblestone | Flower | Cactus => {
                CellCategory::Terrain
            }
            Tree1 | Tree2 => CellCategory::Tree,
            Soil | Carrot1 | Carrot2 | Carrot3 => CellCategory::Farming,
            Wall | House | StoneHouse | Camp | Cave | HiddenCave | Mineshaft | Well | Forge => {
                CellCategory::Structure
            }
            Wood | Planks | Bones => CellCategory::Material,
            FloorWood | CaveFloor | CaveWall | Chest | StairsDown | StairsUp => {
                CellCategory::Interior
            }
        }
    }

    /// Creatures and the player cannot stand on solid cells.
    pub fn is_solid(self) -> bool {
        use CellType::*;
        matches!(
            self,
            Wall | Stone
                | Tree1
                | Tree2
                | DeepWater
                | House
                | StoneHouse
                | Forge
                | Well
                | CaveWall
                | Chest
                | Cactus
        )
    }

    pub fn is_walkable(self) -> bool {
        !self.is_solid()
    }

    pub fn is_water(self) -> bool {
        matches!(self, CellType::Water | CellType::DeepWater)
    }

    pub fn is_tree(self) -> bool {
        matches!(self, CellType::Tree1 | CellType::Tree2)
    }

    pub fn is_crop(self) -> bool {
        matches!(self, CellType::Carrot1 | CellType::Carrot2 | CellType::Carrot3)
    }

    /// Cells that burn and scorch adjacent trees.
    pub fn is_fire(self) -> bool {
        matches!(self, CellType::Camp | CellType::Forge)
    }

    /// Cells that never change on their own.
    pub fn is_static(self) -> bool {
        use CellType::*;
        match self.category() {
            CellCategory::Interior => true,
            CellCategory::Structure => !matches!(self, Camp | House | HiddenCave),
            CellCategory::Material => !matches!(self, Bones),
            _ => false,
        }
    }

    /// Number of visual variants a renderer may pick from.
    pub fn variant_count(self) -> u8 {
        use CellType::*;
        match self {
            Grass => 11,
            Dirt | Sand | Stone => 4,
            Tree1 | Tree2 | Flower => 3,
            Water | Cobblestone => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Counts of relevant cell types among the eight neighbours of a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighborhood {
    pub water: u8,
    pub trees: u8,
    pub grass: u8,
    pub flowers: u8,
    pub fire: u8,
}

impl Neighborhood {
    pub fn add(&mut self, cell: CellType) {
        if cell.is_water() {
            self.water += 1;
        }
        if cell.is_tree() {
            self.trees += 1;
        }
        if cell.is_fire() {
            self.fire += 1;
        }
        match cell {
            CellType::Grass => self.grass += 1,
            CellType::Flower => self.flowers += 1,
            _ => {}
        }
    }

    pub fn from_cells(cells: impl IntoIterator<Item = CellType>) -> Self {
        let mut n = Self::default();
        for cell in cells {
            n.add(cell);
        }
        n
    }
}

/// Zone-wide conditions that modulate rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleContext {
    pub raining: bool,
    /// Rain fell on the zone recently enough to water crops.
    pub recently_watered: bool,
    /// A farmer lives in the zone and tends crops.
    pub farmer_present: bool,
}

/// The transition a cell is progressing toward, with its effective rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub to: CellType,
    pub rate: f32,
}

impl Transition {
    fn new(to: CellType, rate: f32) -> Option<Self> {
        Some(Self { to, rate })
    }
}

/// Look up the transition for `cell` given its neighbourhood.
pub fn transition_for(
    cell: CellType,
    n: &Neighborhood,
    ctx: &RuleContext,
    rates: &AutomatonRates,
) -> Option<Transition> {
    use CellType::*;

    let rain = if ctx.raining {
        rates.rain_growth_multiplier
    } else {
        1.0
    };
    let growth = |base: f32| base * rates.water_neighbor_bonus.powi(i32::from(n.water)) * rain;
    let scorch = rates.fire_decay_multiplier.powi(i32::from(n.fire));
    let watered = n.water > 0 || ctx.recently_watered || ctx.raining;
    let crop_decay = if ctx.farmer_present {
        rates.crop_decay * 0.5
    } else {
        rates.crop_decay
    };

    match cell {
        Grass => {
            if n.water >= 5 {
                Transition::new(Water, rates.flooding)
            } else if (1..=2).contains(&n.trees) && n.water >= 1 {
                Transition::new(Tree1, growth(rates.tree_growth))
            } else if n.flowers > 0 {
                Transition::new(Flower, rates.flower_spread)
            } else if n.water == 0 {
                Transition::new(Dirt, rates.grass_to_dirt)
            } else {
                None
            }
        }
        Dirt => {
            if n.water >= 5 {
                Transition::new(Water, rates.flooding)
            } else if n.water >= 2 {
                Transition::new(Grass, growth(rates.dirt_to_grass))
            } else if n.water == 0 && !ctx.raining {
                Transition::new(Sand, rates.dirt_to_sand)
            } else {
                None
            }
        }
        Tree1 => {
            if n.trees >= 4 || n.fire > 0 {
                Transition::new(Grass, rates.tree_decay * scorch)
            } else {
                Transition::new(Tree2, rates.tree_mature)
            }
        }
        Tree2 => {
            if n.trees >= 4 || n.fire > 0 {
                Transition::new(Grass, rates.tree_decay * scorch)
            } else {
                None
            }
        }
        Sand => {
            if n.water + n.grass >= 2 {
                Transition::new(Dirt, rates.sand_reclaim)
            } else {
                None
            }
        }
        Flower => Transition::new(Grass, rates.flower_decay),
        Water => {
            if n.water >= 4 {
                Transition::new(DeepWater, rates.deep_water_form)
            } else if n.water == 0 && !ctx.raining {
                Transition::new(Dirt, rates.water_to_dirt)
            } else {
                None
            }
        }
        DeepWater => {
            if n.water < 3 {
                Transition::new(Water, rates.deep_water_evaporate)
            } else {
                None
            }
        }
        Carrot1 if watered => Transition::new(Carrot2, growth(rates.carrot_growth)),
        Carrot2 if watered => Transition::new(Carrot3, growth(rates.carrot_ripen)),
        Carrot3 if watered => None,
        Carrot1 | Carrot2 | Carrot3 => Transition::new(Dirt, crop_decay),
        Soil => {
            if !watered {
                Transition::new(Dirt, rates.soil_decay)
            } else {
                None
            }
        }
        Cobblestone => Transition::new(Dirt, rates.cobblestone_wear),
        Camp => Transition::new(House, rates.camp_to_house),
        House => Transition::new(StoneHouse, rates.house_upgrade),
        Cactus => Transition::new(Sand, rates.cactus_decay),
        HiddenCave => Transition::new(Cave, rates.cave_reveal),
        Bones => Transition::new(Grass, rates.bones_decay),
        _ => None,
    }
}
