//! Vehicle maintenance (garage) component and vehicle status snapshots.

use super::common::VehicleId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Vehicle class; each class has its own slot pool in a garage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleKind {
    Rover,
    UtilityVehicle,
    Flyer,
}

impl VehicleKind {
    pub fn is_ground(&self) -> bool {
        !matches!(self, VehicleKind::Flyer)
    }
}

/// Status of a vehicle as reported by the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub reserved: bool,
    /// True when the vehicle carries a mission reference
    pub on_mission: bool,
    pub being_towed: bool,
    pub towing: bool,
}

impl VehicleStatus {
    pub fn new(id: VehicleId, kind: VehicleKind) -> Self {
        Self {
            id,
            kind,
            reserved: false,
            on_mission: false,
            being_towed: false,
            towing: false,
        }
    }

    /// Towed vehicles and ground vehicles towing another are kept out of garages.
    pub fn can_be_garaged(&self) -> bool {
        !(self.being_towed || (self.kind.is_ground() && self.towing))
    }
}

/// Garage slots, one pool per vehicle class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleMaintenance {
    pub rover_capacity: u32,
    pub utility_capacity: u32,
    pub flyer_capacity: u32,
    pub rovers: BTreeSet<VehicleId>,
    pub utility: BTreeSet<VehicleId>,
    pub flyers: BTreeSet<VehicleId>,
}

impl VehicleMaintenance {
    pub fn new(rover_capacity: u32, utility_capacity: u32, flyer_capacity: u32) -> Self {
        Self {
            rover_capacity,
            utility_capacity,
            flyer_capacity,
            ..Default::default()
        }
    }

    pub fn pool(&self, kind: VehicleKind) -> &BTreeSet<VehicleId> {
        match kind {
            VehicleKind::Rover => &self.rovers,
            VehicleKind::UtilityVehicle => &self.utility,
            VehicleKind::Flyer => &self.flyers,
        }
    }

    fn pool_mut(&mut self, kind: VehicleKind) -> &mut BTreeSet<VehicleId> {
        match kind {
            VehicleKind::Rover => &mut self.rovers,
            VehicleKind::UtilityVehicle => &mut self.utility,
            VehicleKind::Flyer => &mut self.flyers,
        }
    }

    pub fn capacity(&self, kind: VehicleKind) -> u32 {
        match kind {
            VehicleKind::Rover => self.rover_capacity,
            VehicleKind::UtilityVehicle => self.utility_capacity,
            VehicleKind::Flyer => self.flyer_capacity,
        }
    }

    pub fn has_free_slot(&self, kind: VehicleKind) -> bool {
        (self.pool(kind).len() as u32) < self.capacity(kind)
    }

    pub fn contains(&self, vehicle: VehicleId) -> bool {
        self.rovers.contains(&vehicle)
            || self.utility.contains(&vehicle)
            || self.flyers.contains(&vehicle)
    }

    /// Add to the class pool. Fails when the pool is full.
    pub fn add(&mut self, vehicle: VehicleId, kind: VehicleKind) -> bool {
        if self.pool(kind).contains(&vehicle) {
            return true;
        }
        if !self.has_free_slot(kind) {
            return false;
        }
        self.pool_mut(kind).insert(vehicle)
    }

    pub fn remove(&mut self, vehicle: VehicleId) -> bool {
        self.rovers.remove(&vehicle) | self.utility.remove(&vehicle) | self.flyers.remove(&vehicle)
    }

    pub fn parked(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.rovers
            .iter()
            .chain(self.utility.iter())
            .chain(self.flyers.iter())
            .copied()
    }
}
