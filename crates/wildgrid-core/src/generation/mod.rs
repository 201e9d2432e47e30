//! Generation - procedural creation of zones, creatures and names

pub mod creatures;
pub mod names;
pub mod zone;

pub use creatures::*;
pub use names::*;
pub use zone::*;
