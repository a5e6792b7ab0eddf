//! Building valuation: a per-sol cache over capability-specific value functions.

use crate::components::FunctionType;
use crate::config::ManagerConfig;
use crate::context::SettlementFacade;
use crate::error::ValuationError;
use std::collections::HashMap;
use std::fmt;

/// Value of one capability for a building type: `(building_type, is_new)`.
pub type ValuationFn = Box<dyn Fn(&str, bool) -> f64>;

/// Capability -> valuation function registration table.
#[derive(Default)]
pub struct ValuationTable {
    functions: HashMap<FunctionType, ValuationFn>,
}

impl ValuationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability valued at the same constant.
    pub fn uniform(value: f64) -> Self {
        let mut table = Self::new();
        for function_type in FunctionType::ALL {
            table.register(function_type, move |_, _| value);
        }
        table
    }

    pub fn register(&mut self, function_type: FunctionType, f: impl Fn(&str, bool) -> f64 + 'static) {
        self.functions.insert(function_type, Box::new(f));
    }

    pub fn with(mut self, function_type: FunctionType, f: impl Fn(&str, bool) -> f64 + 'static) -> Self {
        self.register(function_type, f);
        self
    }

    pub fn contains(&self, function_type: FunctionType) -> bool {
        self.functions.contains_key(&function_type)
    }

    pub fn value(
        &self,
        function_type: FunctionType,
        building_type: &str,
        is_new: bool,
    ) -> Result<f64, ValuationError> {
        let f = self
            .functions
            .get(&function_type)
            .ok_or(ValuationError::UnknownCapability(function_type))?;
        Ok(f(building_type, is_new))
    }
}

impl fmt::Debug for ValuationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<_> = self.functions.keys().collect();
        registered.sort();
        f.debug_struct("ValuationTable")
            .field("registered", &registered)
            .finish()
    }
}

/// Building value points, cached per (type, new) and dropped once per sol.
#[derive(Debug, Clone, Default)]
pub struct ValuationCache {
    new_values: HashMap<String, f64>,
    existing_values: HashMap<String, f64>,
    last_update: Option<f64>,
}

impl ValuationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.new_values.clear();
        self.existing_values.clear();
        self.last_update = None;
    }

    pub fn cached(&self, building_type: &str, is_new: bool) -> Option<f64> {
        let key = normalize(building_type);
        if is_new {
            self.new_values.get(&key).copied()
        } else {
            self.existing_values.get(&key).copied()
        }
    }

    /// Value points of a building type at `now` (millisols).
    ///
    /// `existing_types` lists the building types currently standing in the
    /// settlement.
    #[allow(clippy::too_many_arguments)]
    pub fn value_of(
        &mut self,
        building_type: &str,
        is_new: bool,
        now: f64,
        table: &ValuationTable,
        settlement: &dyn SettlementFacade,
        existing_types: &[String],
        config: &ManagerConfig,
    ) -> Result<f64, ValuationError> {
        let expired = match self.last_update {
            None => true,
            Some(last) => now - last > config.valuation_refresh_millisols,
        };
        if expired {
            self.new_values.clear();
            self.existing_values.clear();
            self.last_update = Some(now);
        }

        if let Some(value) = self.cached(building_type, is_new) {
            return Ok(value);
        }

        let key = normalize(building_type);
        let spec = settlement
            .building_spec(&key)
            .ok_or_else(|| ValuationError::UnknownBuildingType(building_type.to_string()))?;

        let mut value = 0.0;
        for function_type in &spec.functions {
            value += table.value(*function_type, &key, is_new)?;
        }
        value *= config.value_multiplier;
        value -= spec.base_power * config.hours_per_millisol * settlement.power_value();
        value = value.max(0.0);

        if is_new
            && !settlement.is_frame_constructable(&spec.frame)
            && !frame_present(&spec.frame, settlement, existing_types)
        {
            log::debug!("Frame '{}' of {} unavailable; valued at zero", spec.frame, key);
            value = 0.0;
        }

        if is_new {
            self.new_values.insert(key, value);
        } else {
            self.existing_values.insert(key, value);
        }
        Ok(value)
    }
}

fn normalize(building_type: &str) -> String {
    building_type.trim().to_lowercase()
}

/// Whether a standing building or a construction stage already uses `frame`.
fn frame_present(frame: &str, settlement: &dyn SettlementFacade, existing_types: &[String]) -> bool {
    let uses_frame = |building_type: &str| {
        building_type.eq_ignore_ascii_case(frame)
            || settlement
                .building_spec(building_type)
                .map(|s| s.frame.eq_ignore_ascii_case(frame))
                .unwrap_or(false)
    };
    existing_types.iter().any(|t| uses_frame(t.as_str()))
        || settlement
            .construction_stages()
            .iter()
            .any(|t| uses_frame(t.as_str()))
}

/// Existing-building value scaled by wear condition (percent).
pub fn wear_adjusted(value: f64, wear_condition: f64, config: &ManagerConfig) -> f64 {
    value * (wear_condition / 100.0 * config.wear_weight + config.wear_base)
}
