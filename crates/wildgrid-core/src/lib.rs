//! WildGrid Core - Zone Simulation Engine
//!
//! An ECS-based simulation of an endless tile world split into zones.
//! Each zone runs a terrain automaton and the creatures living in it;
//! only the player's zone advances every tick, and the rest are kept
//! roughly current by a bounded catch-up scheduler.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: creatures (animals, villagers, fighters, hostiles)
//! - **Components**: pure data attached to entities (Position, Vitals, Brain, ...)
//! - **Zones**: cell grids owned by the [`zones::ZoneStore`], referencing
//!   their members by handle
//! - **Systems**: logic that queries and updates components and zones
//!
//! # Example
//!
//! ```rust,no_run
//! use wildgrid_core::prelude::*;
//!
//! let mut engine = SimulationEngine::with_default_config(42);
//!
//! // Run simulation
//! loop {
//!     engine.update(); // one tick, 60 per second
//! }
//! ```

pub mod components;
pub mod engine;
pub mod generation;
pub mod persistence;
pub mod systems;
pub mod zones;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{CellView, EntitySnapshot, SimulationEngine, TickReport};
    pub use crate::persistence::SaveError;
    pub use crate::systems::{ActionError, PlayerAction, PlayerMove};
}
