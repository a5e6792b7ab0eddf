//! Habitat Core - Settlement Building Subsystem
//!
//! Tracks every building of a settlement and answers the questions the rest
//! of a colony simulation asks about them: which buildings offer a
//! capability, where a person or robot can stand or eat, which garage can
//! take a rover, which computing node should run a job, which lab needs
//! upkeep, what parts maintenance needs, and what a building is worth.
//!
//! # Architecture
//!
//! Buildings are `hecs` entities held by a [`registry::Registry`]:
//! - **Components**: Pure data attached to buildings (Building, FunctionSet, Occupancy, ComputingNode, ResearchLab, ...)
//! - **Systems**: Logic over components and the derived caches (capability index, adjacency, valuation)
//! - **Context**: Trait objects for the collaborators the subsystem consults (malfunctions, goods, fleet, ...)
//!
//! # Example
//!
//! ```rust,no_run
//! use habitat_core::prelude::*;
//!
//! let settlement = MemorySettlement::new(1);
//! let ctx = settlement.context(ValuationTable::uniform(1.0));
//! let mut manager = BuildingManager::new(ctx, ManagerConfig::default());
//!
//! let hab = manager.add_building(
//!     BuildingTemplate::new("Lander Hab", BuildingCategory::Habitat)
//!         .with_life_support(8, 4)
//!         .with_beds(4),
//!     true,
//! );
//!
//! let mut person = AgentState::person(1);
//! manager.place(&mut person, hab, None);
//!
//! // Drive it from the master clock
//! let mut total = 0.0;
//! loop {
//!     total += 0.5;
//!     manager.time_passing(&ClockPulse::new(total, 0.5));
//! }
//! ```

pub mod components;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod memory;
pub mod persistence;
pub mod random;
pub mod registry;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::ManagerConfig;
    pub use crate::context::{AgentState, ClockPulse, SimContext, Worker};
    pub use crate::error::{BuildingError, SaveError, ValuationError};
    pub use crate::manager::{BuildingEvent, BuildingManager, TickReport};
    pub use crate::memory::MemorySettlement;
    pub use crate::registry::BuildingTemplate;
    pub use crate::systems::ValuationTable;
}
