//! In-memory collaborators for harnesses and tests.
//!
//! `MemorySettlement` is a cheap shared handle: clone it, hand the clones to a
//! [`SimContext`], and keep one to script the world and inspect what the
//! manager did.

use crate::components::*;
use crate::context::*;
use crate::systems::ValuationTable;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct MemoryState {
    pub settlement_id: u32,
    pub power_value: f64,
    pub held_items: BTreeSet<PartId>,
    /// Keyed by lowercase building type
    pub specs: HashMap<String, BuildingSpec>,
    pub construction_stages: Vec<String>,
    pub constructable_frames: BTreeSet<String>,
    pub connectors: Vec<BuildingConnector>,
    pub entities: Vec<EntityRef>,
    pub malfunctioning: BTreeSet<EntityRef>,
    pub wear: HashMap<EntityRef, f64>,
    pub parts: BTreeMap<EntityRef, PartMap>,
    /// Every demand injection, in order
    pub injected: Vec<(PartId, u32)>,
    pub opinions: HashMap<(AgentId, AgentId), f64>,
    pub default_opinion: f64,
    pub vehicles: BTreeMap<VehicleId, VehicleStatus>,
    pub evictions: Vec<(VehicleId, BuildingId)>,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettlement {
    state: Rc<RefCell<MemoryState>>,
}

impl MemorySettlement {
    pub fn new(settlement_id: u32) -> Self {
        let settlement = Self::default();
        {
            let mut state = settlement.state_mut();
            state.settlement_id = settlement_id;
            state.default_opinion = 50.0;
        }
        settlement
    }

    pub fn state(&self) -> Ref<'_, MemoryState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, MemoryState> {
        self.state.borrow_mut()
    }

    /// Bundle handles to this settlement into a manager context.
    pub fn context(&self, valuation: ValuationTable) -> SimContext {
        SimContext {
            connectors: Box::new(self.clone()),
            malfunctions: Box::new(self.clone()),
            goods: Box::new(self.clone()),
            settlement: Box::new(self.clone()),
            relationships: Box::new(self.clone()),
            fleet: Box::new(self.clone()),
            valuation,
        }
    }

    pub fn add_spec(&self, spec: BuildingSpec) {
        self.state_mut()
            .specs
            .insert(spec.building_type.to_lowercase(), spec);
    }

    pub fn connect(&self, a: BuildingId, b: BuildingId) {
        self.state_mut().connectors.push(BuildingConnector::new(a, b));
    }

    pub fn track(&self, entity: EntityRef) {
        let mut state = self.state_mut();
        if !state.entities.contains(&entity) {
            state.entities.push(entity);
        }
    }

    pub fn set_malfunction(&self, entity: EntityRef, malfunctioning: bool) {
        let mut state = self.state_mut();
        if malfunctioning {
            state.malfunctioning.insert(entity);
        } else {
            state.malfunctioning.remove(&entity);
        }
    }

    pub fn set_parts(&self, entity: EntityRef, parts: PartMap) {
        self.track(entity);
        self.state_mut().parts.insert(entity, parts);
    }

    pub fn set_opinion(&self, of: AgentId, about: AgentId, opinion: f64) {
        self.state_mut().opinions.insert((of, about), opinion);
    }

    pub fn add_vehicle(&self, status: VehicleStatus) {
        self.state_mut().vehicles.insert(status.id, status);
    }

    pub fn take_injected(&self) -> Vec<(PartId, u32)> {
        std::mem::take(&mut self.state_mut().injected)
    }
}

impl ConnectorProvider for MemorySettlement {
    fn connections_to(&self, building: BuildingId) -> Vec<BuildingConnector> {
        self.state()
            .connectors
            .iter()
            .filter(|c| c.touches(building))
            .copied()
            .collect()
    }

    fn remove_all_connections_to(&mut self, building: BuildingId) {
        self.state_mut().connectors.retain(|c| !c.touches(building));
    }
}

impl MalfunctionSource for MemorySettlement {
    fn associated_entities(&self) -> Vec<EntityRef> {
        self.state().entities.clone()
    }

    fn has_malfunction(&self, entity: EntityRef) -> bool {
        self.state().malfunctioning.contains(&entity)
    }

    fn wear_condition(&self, entity: EntityRef) -> f64 {
        self.state().wear.get(&entity).copied().unwrap_or(100.0)
    }

    fn maintenance_parts(&mut self, entity: EntityRef) -> PartMap {
        self.state().parts.get(&entity).cloned().unwrap_or_default()
    }
}

impl GoodsSink for MemorySettlement {
    fn inject_part_demand(&mut self, part: PartId, quantity: u32) {
        self.state_mut().injected.push((part, quantity));
    }
}

impl SettlementFacade for MemorySettlement {
    fn settlement_id(&self) -> u32 {
        self.state().settlement_id
    }

    fn power_value(&self) -> f64 {
        self.state().power_value
    }

    fn item_resource_ids(&self) -> BTreeSet<PartId> {
        self.state().held_items.clone()
    }

    fn building_spec(&self, building_type: &str) -> Option<BuildingSpec> {
        self.state()
            .specs
            .get(&building_type.to_lowercase())
            .cloned()
    }

    fn construction_stages(&self) -> Vec<String> {
        self.state().construction_stages.clone()
    }

    fn is_frame_constructable(&self, frame: &str) -> bool {
        self.state().constructable_frames.contains(frame)
    }
}

impl RelationshipSource for MemorySettlement {
    fn opinion_of(&self, of: AgentId, about: AgentId) -> f64 {
        let state = self.state();
        state
            .opinions
            .get(&(of, about))
            .copied()
            .unwrap_or(state.default_opinion)
    }
}

impl Fleet for MemorySettlement {
    fn status(&self, vehicle: VehicleId) -> Option<VehicleStatus> {
        self.state().vehicles.get(&vehicle).copied()
    }

    fn on_evicted(&mut self, vehicle: VehicleId, garage: BuildingId) {
        self.state_mut().evictions.push((vehicle, garage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_share_state() {
        let settlement = MemorySettlement::new(1);
        let mut sink = settlement.clone();
        sink.inject_part_demand(PartId(3), 2);
        assert_eq!(settlement.take_injected(), vec![(PartId(3), 2)]);
        assert!(settlement.state().injected.is_empty());
    }

    #[test]
    fn test_connector_removal() {
        let settlement = MemorySettlement::new(1);
        settlement.connect(BuildingId(1), BuildingId(2));
        settlement.connect(BuildingId(2), BuildingId(3));
        let mut provider = settlement.clone();
        assert_eq!(provider.connections_to(BuildingId(2)).len(), 2);
        provider.remove_all_connections_to(BuildingId(1));
        assert_eq!(provider.connections_to(BuildingId(2)).len(), 1);
    }
}
