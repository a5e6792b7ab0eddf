//! Manager configuration, loadable from JSON.

use serde::{Deserialize, Serialize};

/// Tunables for the building manager. Missing JSON fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Seed for the shared selection RNG
    pub rng_seed: u64,
    /// Lower clamp for crowdedness scores
    pub crowding_floor: i64,
    /// Affinity weight of a building with no other occupants
    pub default_affinity: f64,
    /// Scale applied to summed capability values
    pub value_multiplier: f64,
    /// Valuation cache lifetime in millisols
    pub valuation_refresh_millisols: f64,
    /// Hours in one millisol
    pub hours_per_millisol: f64,
    /// Share of building value that depends on wear condition
    pub wear_weight: f64,
    /// Share of building value independent of wear
    pub wear_base: f64,
    /// Log every placement decision at info level
    pub verbose_placement: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            rng_seed: 0x5eed,
            crowding_floor: -1,
            default_affinity: 50.0,
            value_multiplier: 1000.0,
            valuation_refresh_millisols: 1000.0,
            // 1 sol = 24.6597 h
            hours_per_millisol: 0.024_659_7,
            wear_weight: 0.75,
            wear_base: 0.25,
            verbose_placement: false,
        }
    }
}

impl ManagerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
