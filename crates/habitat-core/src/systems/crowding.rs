//! Crowding and social preference - choosing among candidate buildings.

use crate::components::*;
use crate::config::ManagerConfig;
use crate::context::{RelationshipSource, Worker};
use crate::random::{choose_uniform, weighted_choice};
use crate::registry::Registry;
use rand::Rng;

/// Occupants minus capacity for `kind`, clamped below at `floor`.
/// None for unknown buildings.
pub fn crowdedness(registry: &Registry, building: BuildingId, kind: AgentKind, floor: i64) -> Option<i64> {
    registry
        .get::<Occupancy>(building)
        .map(|o| o.crowdedness(kind, floor))
}

fn is_eva(registry: &Registry, building: BuildingId) -> bool {
    registry.category_of(building) == Some(BuildingCategory::Eva)
}

/// Every candidate whose crowdedness equals the minimum. EVA buildings are
/// never candidates.
pub fn least_crowded(
    registry: &Registry,
    candidates: &[BuildingId],
    kind: AgentKind,
    floor: i64,
) -> Vec<BuildingId> {
    let scored: Vec<(BuildingId, i64)> = candidates
        .iter()
        .filter(|b| !is_eva(registry, **b))
        .filter_map(|b| crowdedness(registry, *b, kind, floor).map(|c| (*b, c)))
        .collect();
    let Some(min) = scored.iter().map(|(_, c)| *c).min() else {
        return Vec::new();
    };
    scored
        .into_iter()
        .filter(|(_, c)| *c == min)
        .map(|(b, _)| b)
        .collect()
}

/// Average opinion `agent` holds of each candidate's other occupants.
///
/// Buildings with nobody else inside score `default_affinity`; negative
/// averages count as zero.
pub fn relationship_weights(
    registry: &Registry,
    relationships: &dyn RelationshipSource,
    agent: AgentId,
    candidates: &[BuildingId],
    default_affinity: f64,
) -> Vec<(BuildingId, f64)> {
    candidates
        .iter()
        .filter(|b| !is_eva(registry, **b))
        .filter_map(|b| {
            let occupancy = registry.get::<Occupancy>(*b)?;
            let others: Vec<AgentId> = occupancy
                .people
                .iter()
                .filter(|o| **o != agent)
                .copied()
                .collect();
            let weight = if others.is_empty() {
                default_affinity
            } else {
                let total: f64 = others
                    .iter()
                    .map(|o| relationships.opinion_of(agent, *o))
                    .sum();
                (total / others.len() as f64).max(0.0)
            };
            Some((*b, weight))
        })
        .collect()
}

/// Candidates where someone other than `agent` is already present.
pub fn with_company(registry: &Registry, candidates: &[BuildingId], agent: AgentId) -> Vec<BuildingId> {
    candidates
        .iter()
        .filter(|b| {
            registry
                .get::<Occupancy>(**b)
                .map(|o| o.people.iter().any(|p| *p != agent))
                .unwrap_or(false)
        })
        .copied()
        .collect()
}

/// Least-crowded subset, then a draw weighted by affinity. Robots draw
/// uniformly.
pub fn select_preferred<R: Rng + ?Sized>(
    registry: &Registry,
    relationships: &dyn RelationshipSource,
    agent: &dyn Worker,
    candidates: &[BuildingId],
    config: &ManagerConfig,
    rng: &mut R,
) -> Option<BuildingId> {
    let subset = least_crowded(registry, candidates, agent.kind(), config.crowding_floor);
    match agent.kind() {
        AgentKind::Robot => choose_uniform(&subset, rng),
        AgentKind::Person => {
            let weights = relationship_weights(
                registry,
                relationships,
                agent.agent_id(),
                &subset,
                config.default_affinity,
            );
            weighted_choice(&weights, rng)
        }
    }
}
