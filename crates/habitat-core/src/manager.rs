//! Building manager - main entry point for a settlement's building subsystem

use std::collections::BTreeSet;

use crate::components::*;
use crate::config::ManagerConfig;
use crate::context::{ClockPulse, SimContext, Worker};
use crate::error::{BuildingError, ValuationError};
use crate::random::{choose_uniform, seeded_rng, weighted_choice, SimRng};
use crate::registry::{BuildingTemplate, Registry};
use crate::systems::*;
use rand::Rng;

/// Structural change notifications, drained by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildingEvent {
    Added(BuildingId),
    Removed(BuildingId),
}

/// One building's failed update within a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingFault {
    pub building: BuildingId,
    pub error: BuildingError,
}

/// Outcome of one clock pulse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub buildings_updated: usize,
    /// Entities whose maintenance demand was forwarded
    pub demand_posted: usize,
    pub faults: Vec<BuildingFault>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Owns a settlement's buildings and every cache derived from them
pub struct BuildingManager {
    registry: Registry,
    index: CapabilityIndex,
    adjacency: AdjacencyGraph,
    valuation: ValuationCache,
    demand: MaintenanceDemand,
    ctx: SimContext,
    config: ManagerConfig,
    rng: SimRng,
    events: Vec<BuildingEvent>,
    /// Millisols since mission start, as of the last pulse
    now: f64,
}

impl BuildingManager {
    /// Create an empty manager
    pub fn new(ctx: SimContext, config: ManagerConfig) -> Self {
        let rng = seeded_rng(config.rng_seed);
        Self {
            registry: Registry::new(),
            index: CapabilityIndex::new(),
            adjacency: AdjacencyGraph::new(),
            valuation: ValuationCache::new(),
            demand: MaintenanceDemand::new(),
            ctx,
            config,
            rng,
            events: Vec::new(),
            now: 0.0,
        }
    }

    /// Create a manager holding the settlement's initial buildings
    pub fn with_templates(
        ctx: SimContext,
        config: ManagerConfig,
        templates: impl IntoIterator<Item = BuildingTemplate>,
    ) -> Self {
        let mut manager = Self::new(ctx, config);
        for template in templates {
            manager.registry.spawn(template);
        }
        manager.index.build(&manager.registry);
        log::info!(
            "Settlement {} starts with {} buildings",
            manager.ctx.settlement.settlement_id(),
            manager.registry.len()
        );
        manager
    }

    /// Restore from persisted parts, then rebuild every derived cache.
    pub(crate) fn from_saved(
        ctx: SimContext,
        config: ManagerConfig,
        registry: Registry,
        demand: MaintenanceDemand,
        now: f64,
    ) -> Self {
        let mut manager = Self::new(ctx, config);
        manager.registry = registry;
        manager.demand = demand;
        manager.now = now;
        manager.rehydrate();
        manager
    }

    /// Rebuild transient state from the registry and collaborators.
    ///
    /// Reseeds the RNG, rebuilds the capability index and adjacency graph and
    /// empties the valuation cache.
    pub fn rehydrate(&mut self) {
        self.rng = seeded_rng(self.config.rng_seed);
        self.index.build(&self.registry);
        self.adjacency
            .rebuild(&self.registry, self.ctx.connectors.as_ref());
        self.valuation.invalidate();
        log::info!("Building manager rehydrated with {} buildings", self.registry.len());
    }

    // ----------------------------------------------------------------------
    // Accessors
    // ----------------------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    pub fn demand(&self) -> &MaintenanceDemand {
        &self.demand
    }

    pub fn index(&self) -> &CapabilityIndex {
        &self.index
    }

    pub fn adjacency(&self) -> &AdjacencyGraph {
        &self.adjacency
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn drain_events(&mut self) -> Vec<BuildingEvent> {
        std::mem::take(&mut self.events)
    }

    // ----------------------------------------------------------------------
    // Structure
    // ----------------------------------------------------------------------

    pub fn add_building(&mut self, template: BuildingTemplate, create_connections: bool) -> BuildingId {
        let id = self.registry.spawn(template);
        if create_connections {
            self.ctx.connectors.create_connections(id);
        }
        self.index.on_add(&self.registry, id);
        self.adjacency.invalidate();
        self.events.push(BuildingEvent::Added(id));
        if let Some(b) = self.registry.building(id) {
            log::info!("Added {} [{}] in zone {}", b, b.building_type, b.zone);
        }
        id
    }

    /// Demolish a building: connectors, index entries, adjacency edges and
    /// maintenance demand go with it, and population capacity is recomputed.
    pub fn remove_building(&mut self, id: BuildingId) -> bool {
        if !self.registry.contains(id) {
            log::warn!("Cannot remove {}: not in registry", id);
            return false;
        }
        self.ctx.connectors.remove_all_connections_to(id);
        let removed = self.registry.remove(id);
        self.index.on_remove(&self.registry, id);
        self.adjacency.remove_building(id);
        self.demand
            .update_demand(EntityRef::Building(id), Default::default());
        self.events.push(BuildingEvent::Removed(id));
        if let Some(parts) = removed {
            log::info!("Removed {}", parts.building);
        }
        true
    }

    // ----------------------------------------------------------------------
    // Clock
    // ----------------------------------------------------------------------

    /// Advance every building by one pulse.
    ///
    /// A building whose update fails is logged and reported; the rest still
    /// update.
    pub fn time_passing(&mut self, pulse: &ClockPulse) -> TickReport {
        let mut report = TickReport::default();
        self.now = pulse.total_millisols;
        self.index.ensure_built(&self.registry);

        if pulse.new_sol {
            self.valuation.invalidate();
            log::debug!("Sol {} begins", pulse.mission_sol);
        }

        if pulse.new_millisol {
            report.demand_posted = maintenance::aggregate_demand(
                &mut self.demand,
                self.ctx.malfunctions.as_mut(),
                self.ctx.goods.as_mut(),
            );
        }

        for id in self.registry.ids() {
            match self.update_building(id, pulse) {
                Ok(()) => report.buildings_updated += 1,
                Err(error) => {
                    log::error!("Problem applying pulse to {}: {}", id, error);
                    report.faults.push(BuildingFault { building: id, error });
                }
            }
        }
        report
    }

    fn update_building(&mut self, id: BuildingId, pulse: &ClockPulse) -> Result<(), BuildingError> {
        if !self.registry.contains(id) {
            return Err(BuildingError::NotFound(id));
        }
        let has_node = self.registry.get::<ComputingNode>(id).is_some();
        if has_node && !self.registry.supports(id, FunctionType::Computation) {
            return Err(BuildingError::MissingFunction {
                building: id,
                function: FunctionType::Computation,
            });
        }
        if let Some(mut node) = self.registry.get_mut::<ComputingNode>(id) {
            node.time_passing(pulse.elapsed, pulse.millisol_of_sol())?;
        }
        research::time_passing(&mut self.registry, id, pulse.elapsed);
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Registry queries
    // ----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, id: BuildingId) -> bool {
        self.registry.contains(id)
    }

    pub fn building(&self, id: BuildingId) -> Option<Building> {
        self.registry.building(id)
    }

    pub fn building_ids(&self) -> Vec<BuildingId> {
        self.registry.ids()
    }

    pub fn sorted_by_name(&self) -> Vec<BuildingId> {
        self.registry.sorted_by_name()
    }

    /// Case-insensitive; the last match wins when template ids collide.
    pub fn building_by_template_id(&self, template_id: &str) -> Option<BuildingId> {
        self.registry.building_by_template_id(template_id)
    }

    pub fn buildings_of_category(&self, category: BuildingCategory) -> Vec<BuildingId> {
        self.registry.ids_of_category(category)
    }

    pub fn buildings_of_category_in_zone0(&self, category: BuildingCategory) -> Vec<BuildingId> {
        self.registry.ids_of_category_in_zone0(category)
    }

    pub fn buildings_of_type(&self, building_type: &str) -> Vec<BuildingId> {
        self.registry.ids_of_type(building_type)
    }

    pub fn next_template_id(&self) -> String {
        self.registry.next_template_id()
    }

    pub fn unique_name(&self, building_type: &str) -> String {
        self.registry.unique_name(building_type)
    }

    pub fn population_capacity(&mut self) -> u32 {
        self.index.ensure_built(&self.registry);
        self.index.population_capacity()
    }

    pub fn buildings_with(&mut self, tag: FunctionType) -> BTreeSet<BuildingId> {
        self.index.buildings_with(&self.registry, tag)
    }

    fn tagged(&mut self, tag: FunctionType) -> Vec<BuildingId> {
        self.buildings_with(tag).into_iter().collect()
    }

    /// Supporting `tag`, minus hallways, tunnels and observatories.
    pub fn buildings_without_hallway_or_observatory(&mut self, tag: FunctionType) -> Vec<BuildingId> {
        let registry = &self.registry;
        self.index
            .buildings_with(registry, tag)
            .into_iter()
            .filter(|id| {
                registry.category_of(*id) != Some(BuildingCategory::Connection)
                    && !registry.supports(*id, FunctionType::AstronomicalObservation)
            })
            .collect()
    }

    pub fn buildings_with_all(&mut self, f1: FunctionType, f2: FunctionType) -> Vec<BuildingId> {
        let registry = &self.registry;
        self.index
            .buildings_with(registry, f1)
            .into_iter()
            .filter(|id| registry.supports(*id, f2))
            .collect()
    }

    /// Buildings supporting neither `f1` nor `f2`.
    pub fn buildings_without(&self, f1: FunctionType, f2: FunctionType) -> Vec<BuildingId> {
        self.registry
            .ids()
            .into_iter()
            .filter(|id| !self.registry.supports(*id, f1) && !self.registry.supports(*id, f2))
            .collect()
    }

    /// Supporting `f1` but neither `f2` nor `f3`.
    pub fn buildings_with_but_not(
        &mut self,
        f1: FunctionType,
        f2: FunctionType,
        f3: FunctionType,
    ) -> Vec<BuildingId> {
        let registry = &self.registry;
        self.index
            .buildings_with(registry, f1)
            .into_iter()
            .filter(|id| !registry.supports(*id, f2) && !registry.supports(*id, f3))
            .collect()
    }

    /// A random building supporting `tag`.
    pub fn a_building_with(&mut self, tag: FunctionType) -> Option<BuildingId> {
        let candidates = self.tagged(tag);
        choose_uniform(&candidates, &mut self.rng)
    }

    pub fn random_airlock(&mut self) -> Option<BuildingId> {
        self.a_building_with(FunctionType::Eva)
    }

    pub fn garages(&mut self) -> BTreeSet<BuildingId> {
        self.buildings_with(FunctionType::VehicleMaintenance)
    }

    pub fn observatories(&mut self) -> BTreeSet<BuildingId> {
        self.buildings_with(FunctionType::AstronomicalObservation)
    }

    pub fn airlocks(&mut self) -> BTreeSet<BuildingId> {
        self.buildings_with(FunctionType::Eva)
    }

    pub fn computing_nodes(&mut self) -> BTreeSet<BuildingId> {
        self.buildings_with(FunctionType::Computation)
    }

    pub fn is_malfunctioning(&self, id: BuildingId) -> bool {
        self.ctx.is_malfunctioning(id)
    }

    pub fn non_malfunctioning(&self, buildings: impl IntoIterator<Item = BuildingId>) -> Vec<BuildingId> {
        buildings
            .into_iter()
            .filter(|id| !self.ctx.is_malfunctioning(*id))
            .collect()
    }

    /// Zone of the worker's building, or the main zone when it has none.
    pub fn zone_of_worker(&self, worker: &dyn Worker) -> i32 {
        worker
            .building_location()
            .and_then(|b| self.registry.zone_of(b))
            .unwrap_or(0)
    }

    /// Working buildings supporting `tag` in the worker's zone.
    pub fn buildings_in_same_zone(&mut self, worker: &dyn Worker, tag: FunctionType) -> Vec<BuildingId> {
        let zone = self.zone_of_worker(worker);
        self.local_candidates(tag, Some(zone))
    }

    /// Supporting `f1` but not `f2`, in the worker's zone.
    pub fn same_zone_buildings_with_but_not(
        &mut self,
        worker: &dyn Worker,
        f1: FunctionType,
        f2: FunctionType,
    ) -> Vec<BuildingId> {
        let zone = self.zone_of_worker(worker);
        let registry = &self.registry;
        self.index
            .buildings_with(registry, f1)
            .into_iter()
            .filter(|id| !registry.supports(*id, f2) && registry.zone_of(*id) == Some(zone))
            .collect()
    }

    /// Working buildings supporting `tag` that the worker may walk to: the
    /// main zone, or the zone it is in.
    fn reachable_candidates(&mut self, worker: &dyn Worker, tag: FunctionType) -> Vec<BuildingId> {
        let origin = self.zone_of_worker(worker);
        self.local_candidates(tag, None)
            .into_iter()
            .filter(|id| matches!(self.registry.zone_of(*id), Some(z) if z == 0 || z == origin))
            .collect()
    }

    /// Tagged, working, and in `zone` when one is given.
    fn local_candidates(&mut self, tag: FunctionType, zone: Option<i32>) -> Vec<BuildingId> {
        let tagged = self.tagged(tag);
        tagged
            .into_iter()
            .filter(|id| zone.map_or(true, |z| self.registry.zone_of(*id) == Some(z)))
            .filter(|id| !self.ctx.is_malfunctioning(*id))
            .collect()
    }

    // ----------------------------------------------------------------------
    // Placement
    // ----------------------------------------------------------------------

    pub fn place(&mut self, agent: &mut dyn Worker, building: BuildingId, function: Option<FunctionType>) -> bool {
        placement::place(
            &mut self.registry,
            agent,
            building,
            function,
            self.config.verbose_placement,
        )
    }

    pub fn release_spot(&mut self, agent: &mut dyn Worker) -> bool {
        placement::release_spot(&mut self.registry, agent)
    }

    pub fn remove_from_building(&mut self, agent: &mut dyn Worker) {
        placement::remove_from_building(&mut self.registry, agent);
    }

    /// Move the agent into `destination` without claiming a spot.
    pub fn transfer_to_building(&mut self, agent: &mut dyn Worker, destination: BuildingId) -> bool {
        let origin = agent.building_location();
        let moved = placement::transfer(&mut self.registry, agent, destination);
        if moved {
            log::debug!(
                "{} transferred from {:?} to {}",
                agent.agent_id(),
                origin,
                destination
            );
        }
        moved
    }

    /// Building listing `agent` as an occupant, spot or not.
    pub fn occupied_building(&self, agent: AgentId) -> Option<BuildingId> {
        placement::occupied_building(&self.registry, agent)
    }

    /// Settle the agent into the first main-zone building that takes it.
    pub fn add_to_random_building_spot(&mut self, agent: &mut dyn Worker) -> bool {
        let habitable = |manager: &Self, id: &BuildingId| {
            let category = manager.registry.category_of(*id);
            manager.registry.zone_of(*id) == Some(0)
                && category != Some(BuildingCategory::Eva)
                && category != Some(BuildingCategory::Connection)
                && !manager.ctx.is_malfunctioning(*id)
        };

        let placed = match agent.kind() {
            AgentKind::Person => {
                let candidates: Vec<BuildingId> = self
                    .tagged(FunctionType::LifeSupport)
                    .into_iter()
                    .filter(|id| habitable(self, id))
                    .collect();
                candidates
                    .into_iter()
                    .any(|id| self.place(agent, id, None))
            }
            AgentKind::Robot => {
                let station = FunctionType::default_for(AgentKind::Robot);
                let candidates: Vec<BuildingId> = self
                    .tagged(station)
                    .into_iter()
                    .filter(|id| habitable(self, id))
                    .filter(|id| {
                        self.registry
                            .get::<FunctionSet>(*id)
                            .and_then(|f| f.get(station).map(|i| i.has_empty_spot()))
                            .unwrap_or(false)
                    })
                    .collect();
                let mut placed = candidates
                    .into_iter()
                    .any(|id| self.place(agent, id, Some(station)));
                if !placed {
                    let rest: Vec<BuildingId> = self
                        .registry
                        .ids()
                        .into_iter()
                        .filter(|id| {
                            self.registry.zone_of(*id) == Some(0)
                                && self.registry.category_of(*id) != Some(BuildingCategory::Eva)
                        })
                        .collect();
                    placed = rest.into_iter().any(|id| self.place(agent, id, None));
                }
                placed
            }
        };

        if !placed {
            log::warn!(
                "{}: no main-zone building with an empty activity spot",
                agent.agent_id()
            );
        }
        placed
    }

    /// Put a patient on a medical bed in a building with medical care and
    /// life support.
    pub fn add_patient_to_medical_bed(&mut self, patient: &mut dyn Worker) -> bool {
        let wards = self.buildings_with_all(FunctionType::MedicalCare, FunctionType::LifeSupport);
        let Some(ward) = choose_uniform(&wards, &mut self.rng) else {
            log::warn!("No medical facility available for {}", patient.agent_id());
            return false;
        };
        let on_bed = placement::place_exact(
            &mut self.registry,
            patient,
            ward,
            FunctionType::MedicalCare,
            self.config.verbose_placement,
        );
        if on_bed {
            log::info!("{} sent to a medical bed in {}", patient.agent_id(), ward);
        } else {
            log::info!("{} could not get a medical bed in {}", patient.agent_id(), ward);
        }
        on_bed
    }

    // ----------------------------------------------------------------------
    // Crowding & preference
    // ----------------------------------------------------------------------

    pub fn least_crowded(&self, candidates: &[BuildingId], kind: AgentKind) -> Vec<BuildingId> {
        crowding::least_crowded(&self.registry, candidates, kind, self.config.crowding_floor)
    }

    pub fn relationship_weights(&self, agent: AgentId, candidates: &[BuildingId]) -> Vec<(BuildingId, f64)> {
        crowding::relationship_weights(
            &self.registry,
            self.ctx.relationships.as_ref(),
            agent,
            candidates,
            self.config.default_affinity,
        )
    }

    pub fn select_preferred(&mut self, agent: &dyn Worker, candidates: &[BuildingId]) -> Option<BuildingId> {
        crowding::select_preferred(
            &self.registry,
            self.ctx.relationships.as_ref(),
            agent,
            candidates,
            &self.config,
            &mut self.rng,
        )
    }

    /// A working building supporting `tag`, near the agent unless `any_zone`,
    /// chosen by crowding and affinity.
    pub fn available_function_building(
        &mut self,
        agent: &dyn Worker,
        tag: FunctionType,
        any_zone: bool,
    ) -> Option<BuildingId> {
        let zone = (!any_zone).then(|| self.zone_of_worker(agent));
        let candidates = self.local_candidates(tag, zone);
        self.select_preferred(agent, &candidates)
    }

    /// Working dining buildings the agent can reach.
    pub fn dining_buildings(&mut self, agent: &dyn Worker) -> Vec<BuildingId> {
        self.reachable_candidates(agent, FunctionType::Dining)
    }

    /// A dining building for a meal. A sociable diner prefers rooms where
    /// someone is already eating; otherwise the least crowded rooms are
    /// considered. The final pick is weighted by affinity.
    pub fn available_dining_building(&mut self, agent: &dyn Worker, can_chat: bool) -> Option<BuildingId> {
        let diners = self.dining_buildings(agent);
        if diners.is_empty() {
            return None;
        }
        let subset = if can_chat {
            let company = crowding::with_company(&self.registry, &diners, agent.agent_id());
            if company.is_empty() {
                diners
            } else {
                company
            }
        } else {
            self.least_crowded(&diners, agent.kind())
        };
        let weights = self.relationship_weights(agent.agent_id(), &subset);
        weighted_choice(&weights, &mut self.rng)
    }

    /// A working kitchen in the agent's zone, or the main zone when it has
    /// no building. Robots only weigh crowding half the time.
    pub fn available_kitchen(&mut self, agent: &dyn Worker) -> Option<BuildingId> {
        let zone = self.zone_of_worker(agent);
        let kitchens = self.local_candidates(FunctionType::Cooking, Some(zone));
        match agent.kind() {
            AgentKind::Person => self.select_preferred(agent, &kitchens),
            AgentKind::Robot => {
                let pool = if self.rng.gen_bool(0.5) {
                    self.least_crowded(&kitchens, AgentKind::Robot)
                } else {
                    kitchens
                };
                choose_uniform(&pool, &mut self.rng)
            }
        }
    }

    // ----------------------------------------------------------------------
    // Garages
    // ----------------------------------------------------------------------

    pub fn park(&mut self, vehicle: VehicleId) -> Option<BuildingId> {
        let garages: Vec<BuildingId> = self.garages().into_iter().collect();
        garage::park(&mut self.registry, self.ctx.fleet.as_mut(), &garages, vehicle)
    }

    pub fn unpark(&mut self, vehicle: VehicleId) -> bool {
        let garages: Vec<BuildingId> = self.garages().into_iter().collect();
        garage::unpark(&mut self.registry, &garages, vehicle)
    }

    pub fn garage_of(&mut self, vehicle: VehicleId) -> Option<BuildingId> {
        let garages: Vec<BuildingId> = self.garages().into_iter().collect();
        garage::garage_of(&self.registry, &garages, vehicle)
    }

    pub fn is_in_garage(&mut self, vehicle: VehicleId) -> bool {
        self.garage_of(vehicle).is_some()
    }

    pub fn a_garage(&mut self) -> Option<BuildingId> {
        self.a_building_with(FunctionType::VehicleMaintenance)
    }

    // ----------------------------------------------------------------------
    // Computing
    // ----------------------------------------------------------------------

    pub fn worst_entropy_node(&mut self) -> Option<BuildingId> {
        let nodes = self.tagged(FunctionType::Computation);
        computing::worst_entropy_node(&self.registry, &nodes)
    }

    pub fn worst_entropy_node_by_probability(&mut self, agent: &dyn Worker, any_zone: bool) -> Option<BuildingId> {
        let zone = (!any_zone).then(|| self.zone_of_worker(agent));
        let nodes = self.local_candidates(FunctionType::Computation, zone);
        computing::worst_entropy_node_by_probability(&self.registry, &nodes, &mut self.rng)
    }

    pub fn most_free_node(&mut self, need: f64, start: u32, end: u32) -> Option<BuildingId> {
        let nodes = self.tagged(FunctionType::Computation);
        computing::most_free_node(&self.registry, &nodes, need, start, end, &mut self.rng)
    }

    pub fn schedule_workload(&mut self, node: BuildingId, need: f64, start: u32, end: u32) -> bool {
        computing::schedule_workload(&mut self.registry, node, need, start, end)
    }

    pub fn reduce_entropy(&mut self, node: BuildingId, amount: f64) -> f64 {
        computing::reduce_entropy(&mut self.registry, node, amount)
    }

    pub fn computing_summary(&mut self) -> ComputingSummary {
        let nodes = self.tagged(FunctionType::Computation);
        computing::summarize(&self.registry, &nodes)
    }

    pub fn computing_node(&self, id: BuildingId) -> Option<ComputingNode> {
        self.registry.get::<ComputingNode>(id).map(|n| (*n).clone())
    }

    // ----------------------------------------------------------------------
    // Research labs
    // ----------------------------------------------------------------------

    pub fn research_labs(&mut self) -> BTreeSet<BuildingId> {
        self.buildings_with(FunctionType::Research)
    }

    /// A working lab drawn by entropy, near the agent unless `any_zone`.
    pub fn worst_entropy_lab_by_probability(&mut self, agent: &dyn Worker, any_zone: bool) -> Option<BuildingId> {
        let zone = (!any_zone).then(|| self.zone_of_worker(agent));
        let labs = self.local_candidates(FunctionType::Research, zone);
        research::worst_entropy_lab_by_probability(&self.registry, &labs, &mut self.rng)
    }

    /// Mean entropy across every research building.
    pub fn total_entropy_per_lab(&mut self) -> f64 {
        let labs = self.tagged(FunctionType::Research);
        research::mean_entropy(&self.registry, &labs)
    }

    pub fn reduce_lab_entropy(&mut self, lab: BuildingId, amount: f64) -> f64 {
        research::reduce_entropy(&mut self.registry, lab, amount)
    }

    pub fn research_lab(&self, id: BuildingId) -> Option<ResearchLab> {
        self.registry.get::<ResearchLab>(id).map(|l| (*l).clone())
    }

    // ----------------------------------------------------------------------
    // Maintenance demand
    // ----------------------------------------------------------------------

    pub fn demand_for_part(&self, part: PartId) -> u32 {
        let held = self.ctx.settlement.item_resource_ids();
        self.demand.demand_for_part(part, &held)
    }

    pub fn update_demand(&mut self, entity: EntityRef, new_parts: crate::context::PartMap) {
        self.demand.update_demand(entity, new_parts);
    }

    pub fn outstanding_parts(&self) -> crate::context::PartMap {
        self.demand.outstanding_parts()
    }

    // ----------------------------------------------------------------------
    // Adjacency
    // ----------------------------------------------------------------------

    pub fn rebuild_adjacency(&mut self) {
        self.adjacency
            .rebuild(&self.registry, self.ctx.connectors.as_ref());
    }

    pub fn neighbors_of(&mut self, building: BuildingId) -> BTreeSet<BuildingId> {
        self.adjacency
            .neighbors_of(&self.registry, self.ctx.connectors.as_ref(), building)
    }

    pub fn is_observatory_attached(&mut self, airlock: BuildingId) -> bool {
        adjacency::is_observatory_attached(
            &mut self.adjacency,
            &self.registry,
            self.ctx.connectors.as_ref(),
            airlock,
        )
    }

    // ----------------------------------------------------------------------
    // Valuation
    // ----------------------------------------------------------------------

    pub fn value_of(&mut self, building_type: &str, is_new: bool) -> Result<f64, ValuationError> {
        let existing: Vec<String> = self
            .registry
            .ids()
            .into_iter()
            .filter_map(|id| self.registry.building(id).map(|b| b.building_type))
            .collect();
        self.valuation.value_of(
            building_type,
            is_new,
            self.now,
            &self.ctx.valuation,
            self.ctx.settlement.as_ref(),
            &existing,
            &self.config,
        )
    }

    /// Existing-type value scaled by the building's wear condition.
    pub fn value_of_building(&mut self, id: BuildingId) -> Result<f64, ValuationError> {
        let building = self
            .registry
            .building(id)
            .ok_or_else(|| ValuationError::UnknownBuildingType(id.to_string()))?;
        let value = self.value_of(&building.building_type, false)?;
        let wear = self
            .ctx
            .malfunctions
            .wear_condition(EntityRef::Building(id));
        Ok(valuation::wear_adjusted(value, wear, &self.config))
    }
}
