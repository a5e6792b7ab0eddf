//! Computing resource scheduling across the settlement's nodes.

use crate::components::*;
use crate::random::weighted_choice;
use crate::registry::Registry;
use rand::Rng;

/// Node with the highest entropy; ties go to the lowest id.
pub fn worst_entropy_node(registry: &Registry, nodes: &[BuildingId]) -> Option<BuildingId> {
    let mut worst: Option<(BuildingId, f64)> = None;
    for &id in nodes {
        let Some(node) = registry.get::<ComputingNode>(id) else {
            continue;
        };
        match worst {
            Some((_, entropy)) if node.entropy <= entropy => {}
            _ => worst = Some((id, node.entropy)),
        }
    }
    worst.map(|(id, _)| id)
}

/// Draw a node with probability proportional to its entropy.
///
/// Callers pass nodes already filtered by zone and malfunction.
pub fn worst_entropy_node_by_probability<R: Rng + ?Sized>(
    registry: &Registry,
    nodes: &[BuildingId],
    rng: &mut R,
) -> Option<BuildingId> {
    let weights: Vec<(BuildingId, f64)> = nodes
        .iter()
        .filter_map(|id| registry.get::<ComputingNode>(*id).map(|n| (*id, n.entropy)))
        .collect();
    weighted_choice(&weights, rng)
}

/// Draw among nodes able to host `need` CU per millisol over the window,
/// weighted by their fit score.
pub fn most_free_node<R: Rng + ?Sized>(
    registry: &Registry,
    nodes: &[BuildingId],
    need: f64,
    start: u32,
    end: u32,
    rng: &mut R,
) -> Option<BuildingId> {
    let scores: Vec<(BuildingId, f64)> = nodes
        .iter()
        .filter_map(|id| {
            let score = registry.get::<ComputingNode>(*id)?.evaluate_schedule(need, start, end);
            (score > 0.0).then_some((*id, score))
        })
        .collect();
    weighted_choice(&scores, rng)
}

pub fn schedule_workload(registry: &mut Registry, node: BuildingId, need: f64, start: u32, end: u32) -> bool {
    registry
        .get_mut::<ComputingNode>(node)
        .map(|mut n| n.schedule_task(need, start, end))
        .unwrap_or(false)
}

/// Returns the entropy actually removed.
pub fn reduce_entropy(registry: &mut Registry, node: BuildingId, amount: f64) -> f64 {
    registry
        .get_mut::<ComputingNode>(node)
        .map(|mut n| n.reduce_entropy(amount))
        .unwrap_or(0.0)
}

/// Settlement-wide computing figures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComputingSummary {
    pub node_count: usize,
    /// kW
    pub power_load: f64,
    /// kW
    pub power_non_load: f64,
    pub current_usage: f64,
    pub peak_usage: f64,
    pub total_capacity: f64,
    pub total_entropy: f64,
    pub total_min_entropy: f64,
}

impl ComputingSummary {
    pub fn usage_percent(&self) -> f64 {
        if self.total_capacity > 0.0 {
            self.current_usage / self.total_capacity * 100.0
        } else {
            0.0
        }
    }

    pub fn entropy_per_node(&self) -> f64 {
        if self.node_count > 0 {
            self.total_entropy / self.node_count as f64
        } else {
            0.0
        }
    }

    pub fn entropy_per_cu(&self) -> f64 {
        if self.total_capacity > 0.0 {
            self.total_entropy / self.total_capacity
        } else {
            0.0
        }
    }

    /// Mean of the nodes' entropy floors.
    pub fn average_min_entropy(&self) -> f64 {
        if self.node_count > 0 {
            self.total_min_entropy / self.node_count as f64
        } else {
            0.0
        }
    }
}

pub fn summarize(registry: &Registry, nodes: &[BuildingId]) -> ComputingSummary {
    let mut summary = ComputingSummary::default();
    for &id in nodes {
        let Some(node) = registry.get::<ComputingNode>(id) else {
            continue;
        };
        let (load, non_load) = node.power_demand();
        summary.node_count += 1;
        summary.power_load += load;
        summary.power_non_load += non_load;
        summary.current_usage += node.current_cu;
        summary.peak_usage += node.peak_cu;
        summary.total_capacity += node.capacity_cu;
        summary.total_entropy += node.entropy;
        summary.total_min_entropy += node.min_entropy;
    }
    summary
}
