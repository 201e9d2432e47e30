//! Systems - logic that operates on components and zones

pub mod actions;
pub mod ai;
pub mod automaton;
pub mod enchantments;
pub mod factions;
pub mod loot;
pub mod merge;
pub mod player;
pub mod progression;
pub mod quests;
pub mod scheduler;
pub mod spawning;
pub mod survival;
pub mod weather;

pub use actions::*;
pub use ai::*;
pub use automaton::*;
pub use enchantments::*;
pub use factions::*;
pub use loot::*;
pub use merge::*;
pub use player::*;
pub use progression::*;
pub use quests::*;
pub use scheduler::*;
pub use spawning::*;
pub use survival::*;
pub use weather::*;
