//! Capability index - which buildings support which function.

use crate::components::{BuildingId, FunctionType};
use crate::registry::Registry;
use std::collections::{BTreeMap, BTreeSet};

/// FunctionType -> buildings supporting it, plus the population capacity
/// derived from it.
///
/// Starts unbuilt; the first query builds it from the registry. Structural
/// changes are applied incrementally through [`on_add`](Self::on_add) and
/// [`on_remove`](Self::on_remove).
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    sets: BTreeMap<FunctionType, BTreeSet<BuildingId>>,
    built: bool,
    population_capacity: u32,
}

impl CapabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Drop all cached sets; the next query rebuilds.
    pub fn invalidate(&mut self) {
        self.sets.clear();
        self.built = false;
    }

    pub fn build(&mut self, registry: &Registry) {
        self.sets.clear();
        for id in registry.ids() {
            for function_type in registry.function_types(id) {
                self.sets.entry(function_type).or_default().insert(id);
            }
        }
        self.built = true;
        self.recompute_population_capacity(registry);
        log::debug!(
            "Capability index built: {} buildings, {} tags",
            registry.len(),
            self.sets.len()
        );
    }

    pub fn ensure_built(&mut self, registry: &Registry) {
        if !self.built {
            self.build(registry);
        }
    }

    /// Buildings supporting `tag`; empty when none do.
    pub fn buildings_with(&mut self, registry: &Registry, tag: FunctionType) -> BTreeSet<BuildingId> {
        self.ensure_built(registry);
        self.sets.get(&tag).cloned().unwrap_or_default()
    }

    pub fn on_add(&mut self, registry: &Registry, id: BuildingId) {
        if !self.built {
            self.build(registry);
            return;
        }
        for function_type in registry.function_types(id) {
            self.sets.entry(function_type).or_default().insert(id);
        }
        self.recompute_population_capacity(registry);
    }

    /// Remove from every tag set and recompute population capacity.
    ///
    /// `registry` must no longer contain `id`.
    pub fn on_remove(&mut self, registry: &Registry, id: BuildingId) {
        for set in self.sets.values_mut() {
            set.remove(&id);
        }
        self.sets.retain(|_, set| !set.is_empty());
        self.recompute_population_capacity(registry);
    }

    pub fn population_capacity(&self) -> u32 {
        self.population_capacity
    }

    /// Beds over every building tagged living accommodation.
    pub fn recompute_population_capacity(&mut self, registry: &Registry) {
        let living = self
            .sets
            .get(&FunctionType::LivingAccommodation)
            .cloned()
            .unwrap_or_default();
        self.population_capacity = registry.bed_capacity(living);
    }

    /// Every (tag, set) pair currently cached.
    pub fn snapshot(&self) -> BTreeMap<FunctionType, BTreeSet<BuildingId>> {
        self.sets.clone()
    }
}
