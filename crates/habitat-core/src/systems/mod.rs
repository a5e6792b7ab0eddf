//! Systems - logic that operates on building components

pub mod adjacency;
pub mod computing;
pub mod crowding;
pub mod garage;
pub mod index;
pub mod maintenance;
pub mod placement;
pub mod research;
pub mod valuation;

pub use adjacency::AdjacencyGraph;
pub use computing::ComputingSummary;
pub use index::CapabilityIndex;
pub use maintenance::MaintenanceDemand;
pub use valuation::{ValuationCache, ValuationFn, ValuationTable};
