//! Error types for the building subsystem.

use crate::components::{BuildingId, FunctionType};
use thiserror::Error;

/// Per-building failures. Tick faults are collected, never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildingError {
    #[error("{0} not found")]
    NotFound(BuildingId),

    #[error("{building} has no {function} function")]
    MissingFunction {
        building: BuildingId,
        function: FunctionType,
    },

    #[error("computing entropy {entropy:.3} exceeds limit {limit:.3}")]
    EntropyOverflow { entropy: f64, limit: f64 },

    #[error("invalid clock pulse: elapsed {elapsed} millisols")]
    InvalidPulse { elapsed: f64 },
}

/// Configuration mismatches in valuation. These must reach the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValuationError {
    #[error("no valuation function registered for capability '{0}'")]
    UnknownCapability(FunctionType),

    #[error("unknown building type '{0}'")]
    UnknownBuildingType(String),
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
