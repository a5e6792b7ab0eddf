//! Adjacency graph derived from the building connectors.

use crate::components::{BuildingId, FunctionType};
use crate::context::ConnectorProvider;
use crate::registry::Registry;
use std::collections::{BTreeMap, BTreeSet};

/// Building -> directly connected buildings. Never authoritative; rebuilt
/// from the connector provider whenever it is stale.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    neighbors: BTreeMap<BuildingId, BTreeSet<BuildingId>>,
    built: bool,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn invalidate(&mut self) {
        self.neighbors.clear();
        self.built = false;
    }

    pub fn rebuild(&mut self, registry: &Registry, connectors: &dyn ConnectorProvider) {
        self.neighbors.clear();
        for id in registry.ids() {
            let set = collect_neighbors(id, connectors);
            self.neighbors.insert(id, set);
        }
        self.built = true;
    }

    /// Cached neighbors, computing the entry on a miss. Unknown buildings
    /// have no neighbors and are not cached.
    pub fn neighbors_of(
        &mut self,
        registry: &Registry,
        connectors: &dyn ConnectorProvider,
        building: BuildingId,
    ) -> BTreeSet<BuildingId> {
        if !registry.contains(building) {
            return BTreeSet::new();
        }
        if !self.built {
            self.rebuild(registry, connectors);
        }
        self.neighbors
            .entry(building)
            .or_insert_with(|| collect_neighbors(building, connectors))
            .clone()
    }

    /// Detach a building from the graph, both as a key and as a neighbor.
    pub fn remove_building(&mut self, building: BuildingId) {
        self.neighbors.remove(&building);
        for set in self.neighbors.values_mut() {
            set.remove(&building);
        }
    }

    /// Edge count, each undirected edge counted once.
    pub fn edge_count(&self) -> usize {
        self.neighbors
            .iter()
            .map(|(id, set)| set.iter().filter(|n| *n > id).count())
            .sum()
    }
}

fn collect_neighbors(building: BuildingId, connectors: &dyn ConnectorProvider) -> BTreeSet<BuildingId> {
    connectors
        .connections_to(building)
        .iter()
        .filter_map(|c| c.other_end(building))
        .filter(|other| *other != building)
        .collect()
}

/// Whether the airlock has an observatory in it or right next to it.
pub fn is_observatory_attached(
    graph: &mut AdjacencyGraph,
    registry: &Registry,
    connectors: &dyn ConnectorProvider,
    airlock: BuildingId,
) -> bool {
    if registry.supports(airlock, FunctionType::AstronomicalObservation) {
        return true;
    }
    graph
        .neighbors_of(registry, connectors, airlock)
        .into_iter()
        .any(|n| registry.supports(n, FunctionType::AstronomicalObservation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::BuildingCategory;
    use crate::memory::MemorySettlement;
    use crate::registry::BuildingTemplate;

    fn setup() -> (Registry, MemorySettlement, [BuildingId; 3]) {
        let mut registry = Registry::new();
        let airlock = registry.spawn(
            BuildingTemplate::new("Airlock", BuildingCategory::Eva).with_spots(FunctionType::Eva, 2),
        );
        let hall = registry.spawn(
            BuildingTemplate::new("Hallway", BuildingCategory::Connection)
                .with_spots(FunctionType::BuildingConnection, 0),
        );
        let dome = registry.spawn(
            BuildingTemplate::new("Observatory", BuildingCategory::Astronomy)
                .with_spots(FunctionType::AstronomicalObservation, 1),
        );
        let settlement = MemorySettlement::new(1);
        settlement.connect(airlock, hall);
        settlement.connect(hall, dome);
        (registry, settlement, [airlock, hall, dome])
    }

    #[test]
    fn test_rebuild_is_symmetric() {
        let (registry, settlement, [airlock, hall, dome]) = setup();
        let mut graph = AdjacencyGraph::new();
        graph.rebuild(&registry, &settlement);
        assert_eq!(graph.edge_count(), 2);
        let hall_neighbors = graph.neighbors_of(&registry, &settlement, hall);
        assert!(hall_neighbors.contains(&airlock) && hall_neighbors.contains(&dome));
        assert!(!hall_neighbors.contains(&hall));
    }

    #[test]
    fn test_observatory_one_hop_only() {
        let (registry, settlement, [airlock, hall, dome]) = setup();
        let mut graph = AdjacencyGraph::new();
        assert!(!is_observatory_attached(&mut graph, &registry, &settlement, airlock));
        assert!(is_observatory_attached(&mut graph, &registry, &settlement, hall));
        assert!(is_observatory_attached(&mut graph, &registry, &settlement, dome));
    }

    #[test]
    fn test_remove_detaches_edges() {
        let (registry, settlement, [airlock, hall, _]) = setup();
        let mut graph = AdjacencyGraph::new();
        graph.rebuild(&registry, &settlement);
        graph.remove_building(hall);
        assert!(graph
            .neighbors_of(&registry, &settlement, airlock)
            .is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_unknown_building_is_not_cached() {
        let (registry, settlement, [airlock, _, _]) = setup();
        let mut graph = AdjacencyGraph::new();
        let ghost = BuildingId(99);
        settlement.connect(ghost, airlock);
        assert!(graph.neighbors_of(&registry, &settlement, ghost).is_empty());
        assert!(!graph.neighbors.contains_key(&ghost));
    }
}
