//! Pure simulation rules for WildGrid.
//!
//! Everything in this crate is plain data and pure functions: no ECS, no
//! randomness source, no I/O beyond parsing configuration. The engine in
//! `wildgrid-core` feeds it state and random rolls and applies the results.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`biome`] | Biomes, cell compositions, spawn tables, biome drift |
//! | [`catchup`] | Off-screen zone cycle budgets and selection priority |
//! | [`cells`] | Cell types and the terrain transition table |
//! | [`config`] | Immutable `SimConfig` with every tuned constant |
//! | [`constants`] | Grid dimensions, tick rate, default durations |
//! | [`health`] | Health clamp, survival damage, healing, XP and levels |
//! | [`items`] | Items and bounded inventories |
//! | [`quests`] | Player quest types and NPC quest focuses |
//! | [`species`] | Creature kinds and their behaviour records |

pub mod biome;
pub mod catchup;
pub mod cells;
pub mod config;
pub mod constants;
pub mod health;
pub mod items;
pub mod quests;
pub mod species;
