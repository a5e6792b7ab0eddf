//! Computing node component - the computation capability state of a building.
//!
//! Capacity and usage are in computing units (CU). Workloads are committed to
//! a per-millisol schedule covering one sol; the node draws its current usage
//! from that schedule as time passes. Entropy accumulates with usage and only
//! goes down through [`ComputingNode::reduce_entropy`].

use crate::error::BuildingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Millisols in one sol; the schedule wraps at this boundary.
pub const MILLISOLS_PER_SOL: u32 = 1000;

/// Entropy gained per CU of load per millisol
pub const DEFAULT_ENTROPY_RATE: f64 = 0.001;
/// Entropy beyond which the node refuses to run
pub const DEFAULT_MAX_ENTROPY: f64 = 1000.0;
/// kW drawn per CU of load
pub const DEFAULT_POWER_PER_CU: f64 = 0.5;
/// kW drawn per CU of installed capacity, whether used or not
pub const DEFAULT_IDLE_POWER_PER_CU: f64 = 0.05;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputingNode {
    pub capacity_cu: f64,
    pub current_cu: f64,
    /// Highest usage observed
    pub peak_cu: f64,
    pub entropy: f64,
    /// Entropy never drops below this floor
    pub min_entropy: f64,
    pub max_entropy: f64,
    pub entropy_rate: f64,
    pub power_per_cu: f64,
    pub idle_power_per_cu: f64,
    /// millisol-of-sol -> committed CU
    pub schedule: BTreeMap<u32, f64>,
    last_slot: Option<u32>,
}

impl ComputingNode {
    pub fn new(capacity_cu: f64) -> Self {
        Self {
            capacity_cu: capacity_cu.max(0.0),
            current_cu: 0.0,
            peak_cu: 0.0,
            entropy: 0.0,
            min_entropy: 0.0,
            max_entropy: DEFAULT_MAX_ENTROPY,
            entropy_rate: DEFAULT_ENTROPY_RATE,
            power_per_cu: DEFAULT_POWER_PER_CU,
            idle_power_per_cu: DEFAULT_IDLE_POWER_PER_CU,
            schedule: BTreeMap::new(),
            last_slot: None,
        }
    }

    pub fn with_entropy(mut self, entropy: f64) -> Self {
        self.entropy = entropy.max(self.min_entropy);
        self
    }

    pub fn with_min_entropy(mut self, min_entropy: f64) -> Self {
        self.min_entropy = min_entropy;
        self.entropy = self.entropy.max(min_entropy);
        self
    }

    pub fn with_max_entropy(mut self, max_entropy: f64) -> Self {
        self.max_entropy = max_entropy;
        self
    }

    /// Committed load at a millisol-of-sol slot.
    pub fn load_at(&self, slot: u32) -> f64 {
        self.schedule.get(&slot).copied().unwrap_or(0.0)
    }

    pub fn entropy_per_cu(&self) -> f64 {
        if self.capacity_cu > 0.0 {
            self.entropy / self.capacity_cu
        } else {
            0.0
        }
    }

    /// (load, non-load) power demand in kW.
    pub fn power_demand(&self) -> (f64, f64) {
        (
            self.current_cu * self.power_per_cu,
            self.capacity_cu * self.idle_power_per_cu,
        )
    }

    /// Score how well `need` CU/millisol fits into `[start, end)`.
    ///
    /// Zero when any slot lacks room; otherwise the mean headroom left after
    /// the workload, as a fraction of capacity.
    pub fn evaluate_schedule(&self, need: f64, start: u32, end: u32) -> f64 {
        if need <= 0.0 || need > self.capacity_cu {
            return 0.0;
        }
        let slots = window_slots(start, end);
        if slots.is_empty() {
            return 0.0;
        }
        let mut headroom = 0.0;
        for &slot in &slots {
            let free = self.capacity_cu - self.load_at(slot);
            if free < need {
                return 0.0;
            }
            headroom += (free - need) / self.capacity_cu;
        }
        headroom / slots.len() as f64
    }

    /// Commit a workload if it fits. Returns false without change otherwise.
    pub fn schedule_task(&mut self, need: f64, start: u32, end: u32) -> bool {
        if need <= 0.0 || need > self.capacity_cu {
            return false;
        }
        let slots = window_slots(start, end);
        if slots.is_empty() {
            return false;
        }
        if slots
            .iter()
            .any(|&slot| self.capacity_cu - self.load_at(slot) < need)
        {
            return false;
        }
        for slot in slots {
            *self.schedule.entry(slot).or_insert(0.0) += need;
        }
        true
    }

    /// External maintenance. Returns the amount actually removed.
    pub fn reduce_entropy(&mut self, amount: f64) -> f64 {
        let before = self.entropy;
        self.entropy = (self.entropy - amount.max(0.0)).max(self.min_entropy);
        before - self.entropy
    }

    /// Advance the node to `slot` after `elapsed` millisols.
    ///
    /// Every schedule slot passed since the last pulse is consumed and
    /// charges its own load for one millisol. Current usage is the load
    /// committed at `slot`.
    pub fn time_passing(&mut self, elapsed: f64, slot: u32) -> Result<(), BuildingError> {
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(BuildingError::InvalidPulse { elapsed });
        }
        let slot = slot % MILLISOLS_PER_SOL;
        let moved = self.last_slot != Some(slot);
        let now_cu = self.load_at(slot);

        let drained: f64 = if elapsed >= MILLISOLS_PER_SOL as f64 {
            std::mem::take(&mut self.schedule).into_values().sum()
        } else {
            match self.last_slot {
                Some(last) if last == slot => 0.0,
                Some(last) => self
                    .drain_range((last + 1) % MILLISOLS_PER_SOL, slot)
                    .into_iter()
                    .sum(),
                None => self.schedule.remove(&slot).unwrap_or(0.0),
            }
        };

        if moved || elapsed >= MILLISOLS_PER_SOL as f64 {
            self.current_cu = now_cu;
        }
        self.last_slot = Some(slot);

        self.peak_cu = self.peak_cu.max(self.current_cu);
        self.entropy += drained * self.entropy_rate;

        if self.entropy > self.max_entropy {
            return Err(BuildingError::EntropyOverflow {
                entropy: self.entropy,
                limit: self.max_entropy,
            });
        }
        Ok(())
    }

    /// Remove and return loads for slots `from..=to`, wrapping at the sol boundary.
    fn drain_range(&mut self, from: u32, to: u32) -> Vec<f64> {
        let keys: Vec<u32> = if from <= to {
            self.schedule.range(from..=to).map(|(k, _)| *k).collect()
        } else {
            self.schedule
                .range(from..)
                .chain(self.schedule.range(..=to))
                .map(|(k, _)| *k)
                .collect()
        };
        keys.into_iter()
            .filter_map(|k| self.schedule.remove(&k))
            .collect()
    }
}

/// Slots in `[start, end)`, wrapping past the end of the sol when `end < start`.
///
/// A window spanning a sol or more covers every slot, starting at `start`.
pub fn window_slots(start: u32, end: u32) -> Vec<u32> {
    if end.saturating_sub(start) >= MILLISOLS_PER_SOL {
        let start = start % MILLISOLS_PER_SOL;
        return (start..MILLISOLS_PER_SOL).chain(0..start).collect();
    }
    let start = start % MILLISOLS_PER_SOL;
    let end = end % MILLISOLS_PER_SOL;
    if start <= end {
        (start..end).collect()
    } else {
        (start..MILLISOLS_PER_SOL).chain(0..end).collect()
    }
}
