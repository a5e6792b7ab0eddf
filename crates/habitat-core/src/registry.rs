//! Building registry - the authoritative set of a settlement's buildings.
//!
//! Buildings are `hecs` entities carrying a [`Building`], a [`FunctionSet`]
//! and an [`Occupancy`], plus optional [`LivingAccommodation`],
//! [`ComputingNode`], [`ResearchLab`] and [`VehicleMaintenance`] components. The registry maps
//! stable [`BuildingId`]s to entities; ids are handed out in increasing order,
//! so id order is registry order.

use crate::components::*;
use hecs::{Component, Entity, World};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Blueprint for a new building.
#[derive(Debug, Clone)]
pub struct BuildingTemplate {
    pub template_id: Option<String>,
    pub name: Option<String>,
    pub building_type: String,
    pub zone: i32,
    pub category: BuildingCategory,
    pub functions: FunctionSet,
    pub occupancy: Occupancy,
    pub beds: Option<u32>,
    pub computing: Option<ComputingNode>,
    pub lab: Option<ResearchLab>,
    pub garage: Option<VehicleMaintenance>,
}

impl BuildingTemplate {
    pub fn new(building_type: impl Into<String>, category: BuildingCategory) -> Self {
        Self {
            template_id: None,
            name: None,
            building_type: building_type.into(),
            zone: 0,
            category,
            functions: FunctionSet::new(),
            occupancy: Occupancy::default(),
            beds: None,
            computing: None,
            lab: None,
            garage: None,
        }
    }

    pub fn with_template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn in_zone(mut self, zone: i32) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_function(mut self, instance: FunctionInstance) -> Self {
        self.functions.insert(instance);
        self
    }

    /// Add a capability with `spots` evenly spaced activity spots.
    pub fn with_spots(self, function_type: FunctionType, spots: usize) -> Self {
        self.with_function(FunctionInstance::new(function_type).with_spots(spots))
    }

    /// Life support for `capacity` occupants.
    pub fn with_life_support(mut self, capacity: u32, spots: usize) -> Self {
        self.occupancy.people_capacity = capacity;
        self.with_spots(FunctionType::LifeSupport, spots)
    }

    pub fn with_robot_station(mut self, slots: u32) -> Self {
        self.occupancy.robot_capacity = slots;
        self.with_spots(FunctionType::RoboticStation, slots as usize)
    }

    /// Living accommodation with one spot per bed.
    pub fn with_beds(mut self, beds: u32) -> Self {
        self.beds = Some(beds);
        self.with_spots(FunctionType::LivingAccommodation, beds as usize)
    }

    pub fn with_computing(mut self, node: ComputingNode) -> Self {
        self.computing = Some(node);
        self.with_spots(FunctionType::Computation, 1)
    }

    /// Research with `spots` benches and the given lab state.
    pub fn with_lab(mut self, lab: ResearchLab, spots: usize) -> Self {
        self.lab = Some(lab);
        self.with_spots(FunctionType::Research, spots)
    }

    pub fn with_garage(mut self, garage: VehicleMaintenance) -> Self {
        self.garage = Some(garage);
        self.with_spots(FunctionType::VehicleMaintenance, 1)
    }
}

/// Every component of one building, detached from the world.
#[derive(Debug, Clone)]
pub struct BuildingParts {
    pub building: Building,
    pub functions: FunctionSet,
    pub occupancy: Occupancy,
    pub accommodation: Option<LivingAccommodation>,
    pub computing: Option<ComputingNode>,
    pub lab: Option<ResearchLab>,
    pub garage: Option<VehicleMaintenance>,
}

#[derive(Default)]
pub struct Registry {
    world: World,
    entities: BTreeMap<BuildingId, Entity>,
    next_id: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: BuildingId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Ids in registry order.
    pub fn ids(&self) -> Vec<BuildingId> {
        self.entities.keys().copied().collect()
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub(crate) fn set_next_id(&mut self, next_id: u32) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn entity(&self, id: BuildingId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn get<T: Component>(&self, id: BuildingId) -> Option<hecs::Ref<'_, T>> {
        let entity = self.entity(id)?;
        self.world.get::<&T>(entity).ok()
    }

    pub fn get_mut<T: Component>(&mut self, id: BuildingId) -> Option<hecs::RefMut<'_, T>> {
        let entity = self.entity(id)?;
        self.world.get::<&mut T>(entity).ok()
    }

    pub fn building(&self, id: BuildingId) -> Option<Building> {
        self.get::<Building>(id).map(|b| (*b).clone())
    }

    pub fn zone_of(&self, id: BuildingId) -> Option<i32> {
        self.get::<Building>(id).map(|b| b.zone)
    }

    pub fn category_of(&self, id: BuildingId) -> Option<BuildingCategory> {
        self.get::<Building>(id).map(|b| b.category)
    }

    pub fn supports(&self, id: BuildingId, function_type: FunctionType) -> bool {
        self.get::<FunctionSet>(id)
            .map(|f| f.supports(function_type))
            .unwrap_or(false)
    }

    pub fn function_types(&self, id: BuildingId) -> Vec<FunctionType> {
        self.get::<FunctionSet>(id)
            .map(|f| f.types().collect())
            .unwrap_or_default()
    }

    /// Template id for the next building: the current registry size.
    pub fn next_template_id(&self) -> String {
        self.len().to_string()
    }

    /// `"<type> <n+1>"` where n counts existing buildings of that type.
    pub fn unique_name(&self, building_type: &str) -> String {
        let count = self.ids_of_type(building_type).len();
        format!("{} {}", building_type, count + 1)
    }

    /// Create a building entity from a template and return its id.
    pub fn spawn(&mut self, template: BuildingTemplate) -> BuildingId {
        let id = BuildingId(self.next_id);
        let template_id = template
            .template_id
            .clone()
            .unwrap_or_else(|| self.next_template_id());
        let name = template
            .name
            .clone()
            .unwrap_or_else(|| self.unique_name(&template.building_type));
        let building = Building {
            id,
            template_id,
            name,
            building_type: template.building_type,
            zone: template.zone,
            category: template.category,
        };
        // Every research building keeps lab state
        let lab = template.lab.or_else(|| {
            template
                .functions
                .supports(FunctionType::Research)
                .then(ResearchLab::default)
        });
        self.insert(BuildingParts {
            building,
            functions: template.functions,
            occupancy: template.occupancy,
            accommodation: template.beds.map(|beds| LivingAccommodation { beds }),
            computing: template.computing,
            lab,
            garage: template.garage,
        });
        id
    }

    /// Insert a fully formed building under its own id.
    pub fn insert(&mut self, parts: BuildingParts) {
        let id = parts.building.id;
        if let Some(old) = self.entities.remove(&id) {
            let _ = self.world.despawn(old);
        }
        let entity = self
            .world
            .spawn((parts.building, parts.functions, parts.occupancy));
        if let Some(c) = parts.accommodation {
            let _ = self.world.insert_one(entity, c);
        }
        if let Some(c) = parts.computing {
            let _ = self.world.insert_one(entity, c);
        }
        if let Some(c) = parts.lab {
            let _ = self.world.insert_one(entity, c);
        }
        if let Some(c) = parts.garage {
            let _ = self.world.insert_one(entity, c);
        }
        self.entities.insert(id, entity);
        self.next_id = self.next_id.max(id.0 + 1);
    }

    /// Detach a building's components. Returns None if unknown.
    pub fn remove(&mut self, id: BuildingId) -> Option<BuildingParts> {
        let parts = self.parts(id)?;
        if let Some(entity) = self.entities.remove(&id) {
            let _ = self.world.despawn(entity);
        }
        Some(parts)
    }

    /// Clone all components of a building.
    pub fn parts(&self, id: BuildingId) -> Option<BuildingParts> {
        let entity = self.entity(id)?;
        let e = self.world.entity(entity).ok()?;
        Some(BuildingParts {
            building: (*e.get::<&Building>()?).clone(),
            functions: (*e.get::<&FunctionSet>()?).clone(),
            occupancy: (*e.get::<&Occupancy>()?).clone(),
            accommodation: e.get::<&LivingAccommodation>().map(|c| *c),
            computing: e.get::<&ComputingNode>().map(|c| (*c).clone()),
            lab: e.get::<&ResearchLab>().map(|c| (*c).clone()),
            garage: e.get::<&VehicleMaintenance>().map(|c| (*c).clone()),
        })
    }

    pub fn building_by_template_id(&self, template_id: &str) -> Option<BuildingId> {
        // Collisions resolve to the last match in registry order.
        let mut found = None;
        for id in self.entities.keys() {
            if let Some(b) = self.get::<Building>(*id) {
                if b.template_id.eq_ignore_ascii_case(template_id) {
                    found = Some(*id);
                }
            }
        }
        found
    }

    pub fn ids_of_category(&self, category: BuildingCategory) -> Vec<BuildingId> {
        self.filter_buildings(|b| b.category == category)
    }

    pub fn ids_of_category_in_zone0(&self, category: BuildingCategory) -> Vec<BuildingId> {
        self.filter_buildings(|b| b.category == category && b.zone == 0)
    }

    pub fn ids_of_type(&self, building_type: &str) -> Vec<BuildingId> {
        self.filter_buildings(|b| b.building_type.eq_ignore_ascii_case(building_type))
    }

    /// Ids ordered by name, with digit runs compared numerically.
    pub fn sorted_by_name(&self) -> Vec<BuildingId> {
        let mut named: Vec<(String, BuildingId)> = self
            .entities
            .keys()
            .filter_map(|id| self.get::<Building>(*id).map(|b| (b.name.clone(), *id)))
            .collect();
        named.sort_by(|a, b| natural_cmp(&a.0, &b.0).then(a.1.cmp(&b.1)));
        named.into_iter().map(|(_, id)| id).collect()
    }

    /// Sum of beds over buildings in `living`.
    pub fn bed_capacity(&self, living: impl IntoIterator<Item = BuildingId>) -> u32 {
        living
            .into_iter()
            .filter_map(|id| self.get::<LivingAccommodation>(id).map(|a| a.beds))
            .sum()
    }

    fn filter_buildings(&self, predicate: impl Fn(&Building) -> bool) -> Vec<BuildingId> {
        self.entities
            .keys()
            .filter(|id| {
                self.get::<Building>(**id)
                    .map(|b| predicate(&*b))
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }
}

/// Alphanumeric ordering: "Lab 2" < "Lab 10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chunks = chunks(a);
    let mut b_chunks = chunks(b);
    loop {
        match (a_chunks.next(), b_chunks.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny).then(x.len().cmp(&y.len())),
                    _ => x.to_lowercase().cmp(&y.to_lowercase()),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Split into alternating digit / non-digit runs.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}
