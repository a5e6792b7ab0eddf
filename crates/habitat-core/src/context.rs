//! Collaborators the building manager talks to, bundled into a [`SimContext`].
//!
//! The manager owns its context for its whole life; nothing here is global.

use crate::components::*;
use crate::systems::ValuationTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Part id -> quantity outstanding.
pub type PartMap = BTreeMap<PartId, u32>;

/// One tick of the master clock, in millisols.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockPulse {
    /// Millisols since the previous pulse
    pub elapsed: f64,
    /// Millisols since mission start
    pub total_millisols: f64,
    /// 1-based sol of the mission
    pub mission_sol: u32,
    pub new_sol: bool,
    /// Crossed an integer millisol since the previous pulse
    pub new_millisol: bool,
}

impl ClockPulse {
    /// Pulse ending at `total_millisols` after `elapsed` millisols.
    pub fn new(total_millisols: f64, elapsed: f64) -> Self {
        let previous = total_millisols - elapsed;
        let sol_of = |t: f64| (t / MILLISOLS_PER_SOL as f64).floor();
        Self {
            elapsed,
            total_millisols,
            mission_sol: sol_of(total_millisols) as u32 + 1,
            new_sol: sol_of(total_millisols) > sol_of(previous),
            new_millisol: total_millisols.floor() > previous.floor(),
        }
    }

    pub fn millisol_of_sol(&self) -> u32 {
        (self.total_millisols.max(0.0) as u64 % MILLISOLS_PER_SOL as u64) as u32
    }
}

/// A physical connector between two buildings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingConnector {
    pub building_a: BuildingId,
    pub building_b: BuildingId,
}

impl BuildingConnector {
    pub fn new(building_a: BuildingId, building_b: BuildingId) -> Self {
        Self {
            building_a,
            building_b,
        }
    }

    pub fn touches(&self, building: BuildingId) -> bool {
        self.building_a == building || self.building_b == building
    }

    /// The end that is not `building`, if the connector touches it.
    pub fn other_end(&self, building: BuildingId) -> Option<BuildingId> {
        if self.building_a == building {
            Some(self.building_b)
        } else if self.building_b == building {
            Some(self.building_a)
        } else {
            None
        }
    }
}

pub trait ConnectorProvider {
    fn connections_to(&self, building: BuildingId) -> Vec<BuildingConnector>;
    fn remove_all_connections_to(&mut self, building: BuildingId);
    /// Called when a building is added with connection creation requested.
    fn create_connections(&mut self, _building: BuildingId) {}
}

pub trait MalfunctionSource {
    /// Every malfunction-tracked entity belonging to the settlement.
    fn associated_entities(&self) -> Vec<EntityRef>;
    fn has_malfunction(&self, entity: EntityRef) -> bool;
    /// Condition in percent, 100 = pristine.
    fn wear_condition(&self, entity: EntityRef) -> f64;
    /// Parts currently required for the entity's maintenance.
    fn maintenance_parts(&mut self, entity: EntityRef) -> PartMap;
}

pub trait GoodsSink {
    fn inject_part_demand(&mut self, part: PartId, quantity: u32);
}

/// Static description of a building type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub building_type: String,
    pub functions: Vec<FunctionType>,
    /// kW drawn while operating
    pub base_power: f64,
    pub frame: String,
}

pub trait SettlementFacade {
    fn settlement_id(&self) -> u32;
    /// Price of one kWh on the settlement grid
    fn power_value(&self) -> f64;
    /// Resources already stocked as items.
    fn item_resource_ids(&self) -> BTreeSet<PartId>;
    fn building_spec(&self, building_type: &str) -> Option<BuildingSpec>;
    /// Building types of in-progress construction stages.
    fn construction_stages(&self) -> Vec<String>;
    fn is_frame_constructable(&self, frame: &str) -> bool;
}

pub trait RelationshipSource {
    /// Opinion `of` holds about `about`, 0-100.
    fn opinion_of(&self, of: AgentId, about: AgentId) -> f64;
}

pub trait Fleet {
    fn status(&self, vehicle: VehicleId) -> Option<VehicleStatus>;
    fn on_evicted(&mut self, _vehicle: VehicleId, _garage: BuildingId) {}
}

/// Where an agent's claimed activity spot is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocatedSpot {
    pub building: BuildingId,
    pub function_type: FunctionType,
    pub position: LocalPosition,
}

/// A person or robot that can be placed into buildings.
pub trait Worker {
    fn agent_id(&self) -> AgentId;
    fn kind(&self) -> AgentKind;
    fn building_location(&self) -> Option<BuildingId>;
    fn set_building_location(&mut self, building: Option<BuildingId>);
    fn position(&self) -> LocalPosition;
    fn set_position(&mut self, position: LocalPosition);
    fn activity_spot(&self) -> Option<AllocatedSpot>;
    fn set_activity_spot(&mut self, spot: Option<AllocatedSpot>);
}

/// Plain agent record implementing [`Worker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub kind: AgentKind,
    pub building: Option<BuildingId>,
    pub position: LocalPosition,
    pub spot: Option<AllocatedSpot>,
}

impl AgentState {
    pub fn person(id: u32) -> Self {
        Self::new(AgentId(id), AgentKind::Person)
    }

    pub fn robot(id: u32) -> Self {
        Self::new(AgentId(id), AgentKind::Robot)
    }

    pub fn new(id: AgentId, kind: AgentKind) -> Self {
        Self {
            id,
            kind,
            building: None,
            position: LocalPosition::ORIGIN,
            spot: None,
        }
    }

    pub fn in_building(mut self, building: BuildingId) -> Self {
        self.building = Some(building);
        self
    }
}

impl Worker for AgentState {
    fn agent_id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        self.kind
    }

    fn building_location(&self) -> Option<BuildingId> {
        self.building
    }

    fn set_building_location(&mut self, building: Option<BuildingId>) {
        self.building = building;
    }

    fn position(&self) -> LocalPosition {
        self.position
    }

    fn set_position(&mut self, position: LocalPosition) {
        self.position = position;
    }

    fn activity_spot(&self) -> Option<AllocatedSpot> {
        self.spot
    }

    fn set_activity_spot(&mut self, spot: Option<AllocatedSpot>) {
        self.spot = spot;
    }
}

/// Every collaborator the manager needs.
pub struct SimContext {
    pub connectors: Box<dyn ConnectorProvider>,
    pub malfunctions: Box<dyn MalfunctionSource>,
    pub goods: Box<dyn GoodsSink>,
    pub settlement: Box<dyn SettlementFacade>,
    pub relationships: Box<dyn RelationshipSource>,
    pub fleet: Box<dyn Fleet>,
    pub valuation: ValuationTable,
}

impl SimContext {
    pub fn is_malfunctioning(&self, building: BuildingId) -> bool {
        self.malfunctions
            .has_malfunction(EntityRef::Building(building))
    }
}
