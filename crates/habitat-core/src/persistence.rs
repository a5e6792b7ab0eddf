//! Save/Load functionality for persisting a settlement's buildings
//!
//! Uses bincode for compact binary serialization. Building components are
//! serialized individually and respawned on load; the capability index,
//! adjacency graph and valuation cache are not saved and are rebuilt by
//! rehydration instead.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::components::*;
use crate::config::ManagerConfig;
use crate::context::SimContext;
use crate::error::SaveError;
use crate::manager::BuildingManager;
use crate::registry::{BuildingParts, Registry};
use crate::systems::MaintenanceDemand;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 2;

/// Serializable snapshot of the building subsystem
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Millisols since mission start at save time
    pub now: f64,
    /// Next building id to hand out
    pub next_id: u32,
    /// Outstanding maintenance parts
    pub maintenance: MaintenanceDemand,
    /// All buildings with their components
    pub buildings: Vec<SerializableBuilding>,
}

/// All components of a building, optional ones as `Option`
#[derive(Serialize, Deserialize)]
pub struct SerializableBuilding {
    pub building: Building,
    pub functions: FunctionSet,
    pub occupancy: Occupancy,
    pub accommodation: Option<LivingAccommodation>,
    pub computing: Option<ComputingNode>,
    pub lab: Option<ResearchLab>,
    pub garage: Option<VehicleMaintenance>,
}

impl From<BuildingParts> for SerializableBuilding {
    fn from(parts: BuildingParts) -> Self {
        Self {
            building: parts.building,
            functions: parts.functions,
            occupancy: parts.occupancy,
            accommodation: parts.accommodation,
            computing: parts.computing,
            lab: parts.lab,
            garage: parts.garage,
        }
    }
}

impl From<SerializableBuilding> for BuildingParts {
    fn from(sb: SerializableBuilding) -> Self {
        Self {
            building: sb.building,
            functions: sb.functions,
            occupancy: sb.occupancy,
            accommodation: sb.accommodation,
            computing: sb.computing,
            lab: sb.lab,
            garage: sb.garage,
        }
    }
}

/// Extract every building in registry order
fn serialize_buildings(registry: &Registry) -> Vec<SerializableBuilding> {
    registry
        .ids()
        .into_iter()
        .filter_map(|id| registry.parts(id))
        .map(SerializableBuilding::from)
        .collect()
}

/// Rebuild a registry from serialized buildings
fn deserialize_buildings(buildings: Vec<SerializableBuilding>, next_id: u32) -> Registry {
    let mut registry = Registry::new();
    for sb in buildings {
        registry.insert(sb.into());
    }
    // Ids of demolished buildings stay retired
    registry.set_next_id(next_id);
    registry
}

/// Save the building subsystem to a writer
pub fn save_manager<W: Write>(writer: W, manager: &BuildingManager) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        now: manager.now(),
        next_id: manager.registry().next_id(),
        maintenance: manager.demand().clone(),
        buildings: serialize_buildings(manager.registry()),
    };

    bincode::serialize_into(writer, &save_data)?;
    log::info!("Saved {} buildings", save_data.buildings.len());
    Ok(())
}

/// Load a building subsystem from a reader and rehydrate it against `ctx`
pub fn load_manager<R: Read>(
    reader: R,
    ctx: SimContext,
    config: ManagerConfig,
) -> Result<BuildingManager, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let registry = deserialize_buildings(save_data.buildings, save_data.next_id);
    log::info!("Loaded {} buildings", registry.len());
    Ok(BuildingManager::from_saved(
        ctx,
        config,
        registry,
        save_data.maintenance,
        save_data.now,
    ))
}

impl BuildingManager {
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        save_manager(writer, self)
    }

    pub fn load<R: Read>(reader: R, ctx: SimContext, config: ManagerConfig) -> Result<Self, SaveError> {
        load_manager(reader, ctx, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AgentState, PartMap};
    use crate::memory::MemorySettlement;
    use crate::registry::BuildingTemplate;
    use crate::systems::ValuationTable;

    #[test]
    fn test_save_load_roundtrip() {
        let settlement = MemorySettlement::new(3);
        let mut manager = BuildingManager::new(
            settlement.context(ValuationTable::uniform(1.0)),
            ManagerConfig::default(),
        );
        let hab = manager.add_building(
            BuildingTemplate::new("Lander Hab", BuildingCategory::Habitat)
                .with_life_support(6, 4)
                .with_beds(4),
            false,
        );
        let server = manager.add_building(
            BuildingTemplate::new("Server Farm", BuildingCategory::Command)
                .with_computing(ComputingNode::new(20.0).with_entropy(3.0)),
            false,
        );
        let lab = manager.add_building(
            BuildingTemplate::new("Lab", BuildingCategory::Laboratory)
                .with_lab(ResearchLab::default().with_entropy(2.5), 2),
            false,
        );
        let doomed = manager.add_building(
            BuildingTemplate::new("Shed", BuildingCategory::Storage),
            false,
        );
        manager.remove_building(doomed);

        let mut person = AgentState::person(1);
        assert!(manager.place(&mut person, hab, None));
        assert!(manager.schedule_workload(server, 4.0, 100, 110));
        let mut parts = PartMap::new();
        parts.insert(PartId(7), 2);
        manager.update_demand(EntityRef::Building(hab), parts);

        // Save
        let mut save_buffer = Vec::new();
        manager.save(&mut save_buffer).expect("Save failed");

        // Load against a fresh context
        let mut loaded = BuildingManager::load(
            &save_buffer[..],
            settlement.context(ValuationTable::uniform(1.0)),
            ManagerConfig::default(),
        )
        .expect("Load failed");

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.research_lab(lab).map(|l| l.entropy), Some(2.5));
        assert_eq!(loaded.population_capacity(), 4);
        assert!(loaded.buildings_with(FunctionType::Computation).contains(&server));
        assert_eq!(loaded.demand_for_part(PartId(7)), 2);
        assert_eq!(
            loaded.computing_node(server).unwrap().load_at(105),
            4.0
        );
        let occupancy = loaded.registry().get::<Occupancy>(hab).map(|o| (*o).clone()).unwrap();
        assert!(occupancy.contains(person.id));
        // Retired ids are not handed out again
        let next = loaded.add_building(
            BuildingTemplate::new("Shed", BuildingCategory::Storage),
            false,
        );
        assert_eq!(next.0, doomed.0 + 1);
    }

    #[test]
    fn test_version_mismatch() {
        let data = SaveData {
            version: SAVE_VERSION + 1,
            now: 0.0,
            next_id: 0,
            maintenance: MaintenanceDemand::new(),
            buildings: Vec::new(),
        };
        let bytes = bincode::serialize(&data).unwrap();
        let settlement = MemorySettlement::new(1);
        let result = load_manager(
            &bytes[..],
            settlement.context(ValuationTable::new()),
            ManagerConfig::default(),
        );
        assert!(matches!(
            result,
            Err(SaveError::VersionMismatch { found, .. }) if found == SAVE_VERSION + 1
        ));
    }
}
