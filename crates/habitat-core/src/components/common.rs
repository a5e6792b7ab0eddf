//! Common components and identifiers used across building, agent and vehicle data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a building within its settlement.
///
/// Unlike `hecs::Entity`, this survives save/load.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct BuildingId(pub u32);

/// Identity of a person or robot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct AgentId(pub u32);

/// Identity of a vehicle (rover, utility vehicle, flyer).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct VehicleId(pub u32);

/// Identity of a spare part good.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PartId(pub u32);

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "building#{}", self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle#{}", self.0)
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part#{}", self.0)
    }
}

/// Anything with its own malfunction tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Building(BuildingId),
    Vehicle(VehicleId),
    Equipment(u32),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Building(id) => write!(f, "{}", id),
            EntityRef::Vehicle(id) => write!(f, "{}", id),
            EntityRef::Equipment(id) => write!(f, "equipment#{}", id),
        }
    }
}

/// Position local to a building, in meters from the building center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPosition {
    pub x: f64,
    pub y: f64,
}

impl LocalPosition {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl fmt::Display for LocalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Whether an agent is biological or robotic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Person,
    Robot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_position_distance() {
        let a = LocalPosition::new(0.0, 0.0);
        let b = LocalPosition::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_entity_ref_ordering() {
        let mut refs = vec![
            EntityRef::Vehicle(VehicleId(1)),
            EntityRef::Building(BuildingId(7)),
            EntityRef::Building(BuildingId(2)),
        ];
        refs.sort();
        assert_eq!(refs[0], EntityRef::Building(BuildingId(2)));
        assert_eq!(refs[2], EntityRef::Vehicle(VehicleId(1)));
    }
}
