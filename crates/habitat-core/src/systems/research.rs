//! Research lab upkeep - which lab's equipment needs attention most.

use crate::components::*;
use crate::random::weighted_choice;
use crate::registry::Registry;
use rand::Rng;

/// Researchers currently holding a bench in `lab`.
pub fn researchers(registry: &Registry, lab: BuildingId) -> usize {
    registry
        .get::<FunctionSet>(lab)
        .and_then(|f| f.get(FunctionType::Research).map(|r| r.claimed_count()))
        .unwrap_or(0)
}

/// Advance one lab. Returns false if the building has no lab state.
pub fn time_passing(registry: &mut Registry, lab: BuildingId, elapsed: f64) -> bool {
    let working = researchers(registry, lab);
    match registry.get_mut::<ResearchLab>(lab) {
        Some(mut state) => {
            state.time_passing(working, elapsed);
            true
        }
        None => false,
    }
}

/// Draw a lab with probability proportional to its entropy.
///
/// Callers pass labs already filtered by zone and malfunction.
pub fn worst_entropy_lab_by_probability<R: Rng + ?Sized>(
    registry: &Registry,
    labs: &[BuildingId],
    rng: &mut R,
) -> Option<BuildingId> {
    let weights: Vec<(BuildingId, f64)> = labs
        .iter()
        .filter_map(|id| registry.get::<ResearchLab>(*id).map(|l| (*id, l.entropy)))
        .collect();
    weighted_choice(&weights, rng)
}

/// Mean entropy over `labs`; zero when there are none.
pub fn mean_entropy(registry: &Registry, labs: &[BuildingId]) -> f64 {
    let entropies: Vec<f64> = labs
        .iter()
        .filter_map(|id| registry.get::<ResearchLab>(*id).map(|l| l.entropy))
        .collect();
    if entropies.is_empty() {
        return 0.0;
    }
    entropies.iter().sum::<f64>() / entropies.len() as f64
}

/// Returns the entropy actually removed.
pub fn reduce_entropy(registry: &mut Registry, lab: BuildingId, amount: f64) -> f64 {
    registry
        .get_mut::<ResearchLab>(lab)
        .map(|mut l| l.reduce_entropy(amount))
        .unwrap_or(0.0)
}
