//! Maintenance demand aggregation - settlement-wide part shortfalls.

use crate::components::{EntityRef, PartId};
use crate::context::{GoodsSink, MalfunctionSource, PartMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Outstanding parts per malfunction-tracked entity (persisted)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceDemand {
    pub entries: BTreeMap<EntityRef, PartMap>,
}

impl MaintenanceDemand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, entity: EntityRef) -> Option<&PartMap> {
        self.entries.get(&entity)
    }

    /// Record `parts` for an entity. Returns true when the record changed
    /// and the new map should be forwarded.
    fn post(&mut self, entity: EntityRef, parts: PartMap) -> bool {
        if parts.is_empty() {
            self.entries.remove(&entity);
            return false;
        }
        if self.entries.get(&entity) == Some(&parts) {
            return false;
        }
        self.entries.insert(entity, parts);
        true
    }

    /// External write path once parts are consumed. Empty removes the entry.
    pub fn update_demand(&mut self, entity: EntityRef, new_parts: PartMap) {
        if new_parts.is_empty() {
            if self.entries.remove(&entity).is_some() {
                log::info!("Maintenance parts installed for {}", entity);
            }
        } else {
            log::info!("Maintenance parts updated for {}: {:?}", entity, new_parts);
            self.entries.insert(entity, new_parts);
        }
    }

    /// Total outstanding quantity of `part`, zero when the settlement already
    /// stocks it as an item resource.
    pub fn demand_for_part(&self, part: PartId, held: &BTreeSet<PartId>) -> u32 {
        if held.contains(&part) {
            return 0;
        }
        self.entries
            .values()
            .filter_map(|parts| parts.get(&part))
            .sum()
    }

    /// Part -> total outstanding, over all entities.
    pub fn outstanding_parts(&self) -> PartMap {
        let mut totals = PartMap::new();
        for parts in self.entries.values() {
            for (part, qty) in parts {
                *totals.entry(*part).or_insert(0) += qty;
            }
        }
        totals
    }
}

/// Pull every entity's required parts and forward changed maps as demand.
/// Returns the number of entities whose demand was forwarded.
pub fn aggregate_demand(
    demand: &mut MaintenanceDemand,
    malfunctions: &mut dyn MalfunctionSource,
    goods: &mut dyn GoodsSink,
) -> usize {
    let mut posted = 0;
    for entity in malfunctions.associated_entities() {
        let parts = malfunctions.maintenance_parts(entity);
        if demand.post(entity, parts.clone()) {
            for (part, qty) in &parts {
                goods.inject_part_demand(*part, *qty);
            }
            log::debug!("Maintenance parts posted for {}: {:?}", entity, parts);
            posted += 1;
        }
    }
    posted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::BuildingId;
    use crate::memory::MemorySettlement;

    fn parts(list: &[(u32, u32)]) -> PartMap {
        list.iter().map(|(p, q)| (PartId(*p), *q)).collect()
    }

    #[test]
    fn test_identical_map_not_forwarded_twice() {
        let settlement = MemorySettlement::new(1);
        let e = EntityRef::Building(BuildingId(1));
        settlement.set_parts(e, parts(&[(10, 2)]));
        let mut source = settlement.clone();
        let mut sink = settlement.clone();
        let mut demand = MaintenanceDemand::new();

        assert_eq!(aggregate_demand(&mut demand, &mut source, &mut sink), 1);
        assert_eq!(settlement.take_injected(), vec![(PartId(10), 2)]);
        assert_eq!(aggregate_demand(&mut demand, &mut source, &mut sink), 0);
        assert!(settlement.take_injected().is_empty());
    }

    #[test]
    fn test_changed_map_forwards_new_map() {
        let settlement = MemorySettlement::new(1);
        let e = EntityRef::Building(BuildingId(1));
        settlement.set_parts(e, parts(&[(10, 2)]));
        let mut source = settlement.clone();
        let mut sink = settlement.clone();
        let mut demand = MaintenanceDemand::new();
        aggregate_demand(&mut demand, &mut source, &mut sink);
        settlement.take_injected();

        settlement.set_parts(e, parts(&[(10, 1), (11, 4)]));
        aggregate_demand(&mut demand, &mut source, &mut sink);
        assert_eq!(
            settlement.take_injected(),
            vec![(PartId(10), 1), (PartId(11), 4)]
        );
        assert_eq!(demand.demand_for_part(PartId(11), &BTreeSet::new()), 4);
    }

    #[test]
    fn test_empty_map_removes_entry() {
        let settlement = MemorySettlement::new(1);
        let e = EntityRef::Building(BuildingId(1));
        settlement.set_parts(e, parts(&[(10, 2)]));
        let mut source = settlement.clone();
        let mut sink = settlement.clone();
        let mut demand = MaintenanceDemand::new();
        aggregate_demand(&mut demand, &mut source, &mut sink);

        settlement.set_parts(e, PartMap::new());
        assert_eq!(aggregate_demand(&mut demand, &mut source, &mut sink), 0);
        assert!(demand.is_empty());
        assert_eq!(demand.demand_for_part(PartId(10), &BTreeSet::new()), 0);
    }

    #[test]
    fn test_demand_excludes_held_items() {
        let mut demand = MaintenanceDemand::new();
        demand.update_demand(EntityRef::Building(BuildingId(1)), parts(&[(10, 2), (12, 1)]));
        demand.update_demand(EntityRef::Vehicle(crate::components::VehicleId(3)), parts(&[(10, 3)]));
        let held: BTreeSet<PartId> = [PartId(12)].into_iter().collect();
        assert_eq!(demand.demand_for_part(PartId(10), &held), 5);
        assert_eq!(demand.demand_for_part(PartId(12), &held), 0);
        assert_eq!(demand.outstanding_parts(), parts(&[(10, 5), (12, 1)]));

        demand.update_demand(EntityRef::Building(BuildingId(1)), PartMap::new());
        assert_eq!(demand.demand_for_part(PartId(10), &held), 3);
    }
}
