//! Building structure components: identity, capabilities, activity spots, occupancy.

use super::common::{AgentId, AgentKind, BuildingId, LocalPosition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Capability tag a building may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FunctionType {
    Administration,
    AlgaeFarming,
    AstronomicalObservation,
    BuildingConnection,
    Communication,
    Computation,
    Cooking,
    Dining,
    EarthReturn,
    Eva,
    Exercise,
    Farming,
    Fishery,
    FoodProduction,
    LifeSupport,
    LivingAccommodation,
    Management,
    Manufacture,
    MedicalCare,
    PowerGeneration,
    PowerStorage,
    Recreation,
    Research,
    ResourceProcessing,
    RoboticStation,
    Storage,
    ThermalGeneration,
    VehicleMaintenance,
    WasteProcessing,
}

impl FunctionType {
    pub const ALL: [FunctionType; 29] = [
        FunctionType::Administration,
        FunctionType::AlgaeFarming,
        FunctionType::AstronomicalObservation,
        FunctionType::BuildingConnection,
        FunctionType::Communication,
        FunctionType::Computation,
        FunctionType::Cooking,
        FunctionType::Dining,
        FunctionType::EarthReturn,
        FunctionType::Eva,
        FunctionType::Exercise,
        FunctionType::Farming,
        FunctionType::Fishery,
        FunctionType::FoodProduction,
        FunctionType::LifeSupport,
        FunctionType::LivingAccommodation,
        FunctionType::Management,
        FunctionType::Manufacture,
        FunctionType::MedicalCare,
        FunctionType::PowerGeneration,
        FunctionType::PowerStorage,
        FunctionType::Recreation,
        FunctionType::Research,
        FunctionType::ResourceProcessing,
        FunctionType::RoboticStation,
        FunctionType::Storage,
        FunctionType::ThermalGeneration,
        FunctionType::VehicleMaintenance,
        FunctionType::WasteProcessing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FunctionType::Administration => "administration",
            FunctionType::AlgaeFarming => "algae farming",
            FunctionType::AstronomicalObservation => "astronomical observation",
            FunctionType::BuildingConnection => "building connection",
            FunctionType::Communication => "communication",
            FunctionType::Computation => "computation",
            FunctionType::Cooking => "cooking",
            FunctionType::Dining => "dining",
            FunctionType::EarthReturn => "earth return",
            FunctionType::Eva => "eva",
            FunctionType::Exercise => "exercise",
            FunctionType::Farming => "farming",
            FunctionType::Fishery => "fishery",
            FunctionType::FoodProduction => "food production",
            FunctionType::LifeSupport => "life support",
            FunctionType::LivingAccommodation => "living accommodation",
            FunctionType::Management => "management",
            FunctionType::Manufacture => "manufacture",
            FunctionType::MedicalCare => "medical care",
            FunctionType::PowerGeneration => "power generation",
            FunctionType::PowerStorage => "power storage",
            FunctionType::Recreation => "recreation",
            FunctionType::Research => "research",
            FunctionType::ResourceProcessing => "resource processing",
            FunctionType::RoboticStation => "robotic station",
            FunctionType::Storage => "storage",
            FunctionType::ThermalGeneration => "thermal generation",
            FunctionType::VehicleMaintenance => "vehicle maintenance",
            FunctionType::WasteProcessing => "waste processing",
        }
    }

    /// The function an agent settles into when no capability is requested.
    pub fn default_for(kind: AgentKind) -> FunctionType {
        match kind {
            AgentKind::Person => FunctionType::LifeSupport,
            AgentKind::Robot => FunctionType::RoboticStation,
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingCategory {
    /// Hallways and tunnels
    Connection,
    /// Airlocks
    Eva,
    Astronomy,
    Habitat,
    Laboratory,
    Workshop,
    Farming,
    Processing,
    Power,
    Storage,
    VehicleGarage,
    Medical,
    Command,
}

/// Identity component of a building entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    /// Assigned at creation, intended unique per settlement
    pub template_id: String,
    pub name: String,
    /// Building type name, as used by the settlement's building specs
    pub building_type: String,
    /// Locality partition; zone 0 is the main zone
    pub zone: i32,
    pub category: BuildingCategory,
}

impl fmt::Display for Building {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A claimable local position inside a function instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySpot {
    pub name: String,
    pub position: LocalPosition,
    pub claimed_by: Option<AgentId>,
}

impl ActivitySpot {
    pub fn new(name: impl Into<String>, position: LocalPosition) -> Self {
        Self {
            name: name.into(),
            position,
            claimed_by: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.claimed_by.is_none()
    }
}

/// Per-building realization of one capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInstance {
    pub function_type: FunctionType,
    pub spots: Vec<ActivitySpot>,
}

impl FunctionInstance {
    pub fn new(function_type: FunctionType) -> Self {
        Self {
            function_type,
            spots: Vec::new(),
        }
    }

    pub fn with_spot(mut self, name: impl Into<String>, position: LocalPosition) -> Self {
        self.spots.push(ActivitySpot::new(name, position));
        self
    }

    /// Add `count` spots laid out on a one-meter row.
    pub fn with_spots(mut self, count: usize) -> Self {
        let start = self.spots.len();
        for i in start..start + count {
            let name = format!("{} {}", self.function_type.name(), i + 1);
            self.spots
                .push(ActivitySpot::new(name, LocalPosition::new(i as f64, 0.0)));
        }
        self
    }

    /// First unclaimed spot, if any.
    pub fn available_spot(&self) -> Option<LocalPosition> {
        self.spots.iter().find(|s| s.is_free()).map(|s| s.position)
    }

    pub fn has_empty_spot(&self) -> bool {
        self.spots.iter().any(ActivitySpot::is_free)
    }

    /// Claim the spot at `position`. Fails if absent or already claimed.
    pub fn claim_spot(&mut self, position: LocalPosition, agent: AgentId) -> bool {
        match self.spots.iter_mut().find(|s| s.position == position) {
            Some(spot) if spot.is_free() => {
                spot.claimed_by = Some(agent);
                true
            }
            _ => false,
        }
    }

    /// Release whatever spot `agent` holds here.
    pub fn release_agent(&mut self, agent: AgentId) -> bool {
        let mut released = false;
        for spot in self.spots.iter_mut() {
            if spot.claimed_by == Some(agent) {
                spot.claimed_by = None;
                released = true;
            }
        }
        released
    }

    /// Release the spot at `position` if `agent` holds it.
    pub fn release_at(&mut self, position: LocalPosition, agent: AgentId) -> bool {
        match self
            .spots
            .iter_mut()
            .find(|s| s.position == position && s.claimed_by == Some(agent))
        {
            Some(spot) => {
                spot.claimed_by = None;
                true
            }
            None => false,
        }
    }

    pub fn claimant_at(&self, position: LocalPosition) -> Option<AgentId> {
        self.spots
            .iter()
            .find(|s| s.position == position)
            .and_then(|s| s.claimed_by)
    }

    pub fn claimed_count(&self) -> usize {
        self.spots.iter().filter(|s| !s.is_free()).count()
    }
}

/// All capabilities a building supports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionSet {
    pub functions: Vec<FunctionInstance>,
}

impl FunctionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn supports(&self, function_type: FunctionType) -> bool {
        self.functions
            .iter()
            .any(|f| f.function_type == function_type)
    }

    pub fn get(&self, function_type: FunctionType) -> Option<&FunctionInstance> {
        self.functions
            .iter()
            .find(|f| f.function_type == function_type)
    }

    pub fn get_mut(&mut self, function_type: FunctionType) -> Option<&mut FunctionInstance> {
        self.functions
            .iter_mut()
            .find(|f| f.function_type == function_type)
    }

    pub fn types(&self) -> impl Iterator<Item = FunctionType> + '_ {
        self.functions.iter().map(|f| f.function_type)
    }

    /// Insert or replace the instance for its capability.
    pub fn insert(&mut self, instance: FunctionInstance) {
        match self.get_mut(instance.function_type) {
            Some(existing) => *existing = instance,
            None => self.functions.push(instance),
        }
    }

    /// First function (in declaration order) exposing an unclaimed spot.
    pub fn empty_spot_function(&self) -> Option<FunctionType> {
        self.functions
            .iter()
            .find(|f| f.has_empty_spot())
            .map(|f| f.function_type)
    }

    pub fn release_agent(&mut self, agent: AgentId) -> bool {
        let mut released = false;
        for f in self.functions.iter_mut() {
            released |= f.release_agent(agent);
        }
        released
    }
}

/// Coarse membership: who is inside the building, independent of exact spots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Occupancy {
    pub people: BTreeSet<AgentId>,
    pub robots: BTreeSet<AgentId>,
    /// Life support occupant capacity
    pub people_capacity: u32,
    /// Robotic station slots
    pub robot_capacity: u32,
}

impl Occupancy {
    pub fn new(people_capacity: u32, robot_capacity: u32) -> Self {
        Self {
            people_capacity,
            robot_capacity,
            ..Default::default()
        }
    }

    pub fn occupants(&self, kind: AgentKind) -> &BTreeSet<AgentId> {
        match kind {
            AgentKind::Person => &self.people,
            AgentKind::Robot => &self.robots,
        }
    }

    pub fn capacity(&self, kind: AgentKind) -> u32 {
        match kind {
            AgentKind::Person => self.people_capacity,
            AgentKind::Robot => self.robot_capacity,
        }
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.people.contains(&agent) || self.robots.contains(&agent)
    }

    /// Returns false if already registered.
    pub fn add(&mut self, agent: AgentId, kind: AgentKind) -> bool {
        match kind {
            AgentKind::Person => self.people.insert(agent),
            AgentKind::Robot => self.robots.insert(agent),
        }
    }

    pub fn remove(&mut self, agent: AgentId) -> bool {
        self.people.remove(&agent) | self.robots.remove(&agent)
    }

    /// Occupants minus capacity, clamped from below at `floor`.
    pub fn crowdedness(&self, kind: AgentKind, floor: i64) -> i64 {
        let crowded = self.occupants(kind).len() as i64 - self.capacity(kind) as i64;
        crowded.max(floor)
    }
}

/// Bed capacity of a living-accommodation building.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LivingAccommodation {
    pub beds: u32,
}
