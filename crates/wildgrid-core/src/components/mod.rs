//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to entities (or owned by
//! zones and the player). They have no behavior - that lives in systems.

mod common;
mod creatures;
mod player;
mod terrain;

pub use common::*;
pub use creatures::*;
pub use player::*;
pub use terrain::*;
