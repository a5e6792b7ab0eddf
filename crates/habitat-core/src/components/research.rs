//! Research lab component - wear of a building's research equipment.
//!
//! Entropy grows with the researchers working in the lab and drops only
//! through maintenance.

use serde::{Deserialize, Serialize};

/// Entropy gained per researcher per millisol
pub const DEFAULT_LAB_ENTROPY_RATE: f64 = 0.002;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchLab {
    pub entropy: f64,
    /// Entropy never drops below this floor
    pub min_entropy: f64,
    pub entropy_rate: f64,
}

impl Default for ResearchLab {
    fn default() -> Self {
        Self {
            entropy: 0.0,
            min_entropy: 0.0,
            entropy_rate: DEFAULT_LAB_ENTROPY_RATE,
        }
    }
}

impl ResearchLab {
    pub fn with_entropy(mut self, entropy: f64) -> Self {
        self.entropy = entropy.max(self.min_entropy);
        self
    }

    pub fn time_passing(&mut self, researchers: usize, elapsed: f64) {
        self.entropy += researchers as f64 * self.entropy_rate * elapsed.max(0.0);
    }

    /// Returns the amount actually removed.
    pub fn reduce_entropy(&mut self, amount: f64) -> f64 {
        let before = self.entropy;
        self.entropy = (self.entropy - amount.max(0.0)).max(self.min_entropy);
        before - self.entropy
    }
}
