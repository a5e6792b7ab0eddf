//! Component definitions for building entities.
//!
//! Components are plain data attached to building entities in the registry's
//! `hecs::World`. Cross-building behavior lives in systems.

mod building;
mod common;
mod computing;
mod garage;
mod research;

pub use building::*;
pub use common::*;
pub use computing::*;
pub use garage::*;
pub use research::*;
