//! Garage allocation for rovers, utility vehicles and flyers.

use crate::components::*;
use crate::context::Fleet;
use crate::registry::Registry;

/// Park `vehicle` in the first of `garages` that takes it.
///
/// A full pool gets one eviction attempt before moving on: the first parked
/// vehicle of the same class that is not reserved and carries a mission.
pub fn park(
    registry: &mut Registry,
    fleet: &mut dyn Fleet,
    garages: &[BuildingId],
    vehicle: VehicleId,
) -> Option<BuildingId> {
    let Some(status) = fleet.status(vehicle) else {
        log::warn!("Cannot garage unknown {}", vehicle);
        return None;
    };
    if !status.can_be_garaged() {
        log::debug!("{} is towing or under tow; not garaged", vehicle);
        return None;
    }

    if let Some(garage) = garage_of(registry, garages, vehicle) {
        return Some(garage);
    }

    for &garage in garages {
        let Some(mut slots) = registry.get_mut::<VehicleMaintenance>(garage) else {
            continue;
        };

        if !slots.has_free_slot(status.kind) {
            let evictee = slots.pool(status.kind).iter().copied().find(|parked| {
                fleet
                    .status(*parked)
                    .map(|s| !s.reserved && s.on_mission)
                    .unwrap_or(false)
            });
            if let Some(evictee) = evictee {
                slots.remove(evictee);
                fleet.on_evicted(evictee, garage);
                log::info!("Evicted {} from {} to make room for {}", evictee, garage, vehicle);
            }
        }

        if slots.add(vehicle, status.kind) {
            log::debug!("{} parked in {}", vehicle, garage);
            return Some(garage);
        }
    }
    None
}

pub fn unpark(registry: &mut Registry, garages: &[BuildingId], vehicle: VehicleId) -> bool {
    for &garage in garages {
        if let Some(mut slots) = registry.get_mut::<VehicleMaintenance>(garage) {
            if slots.remove(vehicle) {
                return true;
            }
        }
    }
    false
}

pub fn garage_of(registry: &Registry, garages: &[BuildingId], vehicle: VehicleId) -> Option<BuildingId> {
    garages.iter().copied().find(|g| {
        registry
            .get::<VehicleMaintenance>(*g)
            .map(|slots| slots.contains(vehicle))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySettlement;
    use crate::registry::BuildingTemplate;

    fn garage(rovers: u32, flyers: u32) -> BuildingTemplate {
        BuildingTemplate::new("Garage", BuildingCategory::VehicleGarage)
            .with_garage(VehicleMaintenance::new(rovers, 0, flyers))
    }

    #[test]
    fn test_park_is_idempotent() {
        let mut registry = Registry::new();
        let g = registry.spawn(garage(2, 0));
        let settlement = MemorySettlement::new(1);
        settlement.add_vehicle(VehicleStatus::new(VehicleId(1), VehicleKind::Rover));
        let mut fleet = settlement.clone();
        assert_eq!(park(&mut registry, &mut fleet, &[g], VehicleId(1)), Some(g));
        assert_eq!(park(&mut registry, &mut fleet, &[g], VehicleId(1)), Some(g));
        assert_eq!(registry.get::<VehicleMaintenance>(g).unwrap().rovers.len(), 1);
    }

    #[test]
    fn test_reserved_vehicle_is_not_evicted() {
        let mut registry = Registry::new();
        let g = registry.spawn(garage(1, 0));
        let settlement = MemorySettlement::new(1);
        let mut a = VehicleStatus::new(VehicleId(1), VehicleKind::Rover);
        a.reserved = true;
        a.on_mission = true;
        settlement.add_vehicle(a);
        settlement.add_vehicle(VehicleStatus::new(VehicleId(2), VehicleKind::Rover));
        let mut fleet = settlement.clone();
        assert_eq!(park(&mut registry, &mut fleet, &[g], VehicleId(1)), Some(g));
        assert_eq!(park(&mut registry, &mut fleet, &[g], VehicleId(2)), None);
        assert!(settlement.state().evictions.is_empty());
    }

    #[test]
    fn test_flyers_use_their_own_pool() {
        let mut registry = Registry::new();
        let g = registry.spawn(garage(1, 1));
        let settlement = MemorySettlement::new(1);
        settlement.add_vehicle(VehicleStatus::new(VehicleId(1), VehicleKind::Rover));
        settlement.add_vehicle(VehicleStatus::new(VehicleId(2), VehicleKind::Flyer));
        let mut fleet = settlement.clone();
        assert_eq!(park(&mut registry, &mut fleet, &[g], VehicleId(1)), Some(g));
        assert_eq!(park(&mut registry, &mut fleet, &[g], VehicleId(2)), Some(g));
    }

    #[test]
    fn test_towing_rejected_before_search() {
        let mut registry = Registry::new();
        let g = registry.spawn(garage(1, 0));
        let settlement = MemorySettlement::new(1);
        let mut towing = VehicleStatus::new(VehicleId(4), VehicleKind::Rover);
        towing.towing = true;
        settlement.add_vehicle(towing);
        let mut fleet = settlement.clone();
        assert_eq!(park(&mut registry, &mut fleet, &[g], VehicleId(4)), None);
    }

    #[test]
    fn test_unpark() {
        let mut registry = Registry::new();
        let g = registry.spawn(garage(1, 0));
        let settlement = MemorySettlement::new(1);
        settlement.add_vehicle(VehicleStatus::new(VehicleId(1), VehicleKind::Rover));
        let mut fleet = settlement.clone();
        park(&mut registry, &mut fleet, &[g], VehicleId(1));
        assert!(unpark(&mut registry, &[g], VehicleId(1)));
        assert_eq!(garage_of(&registry, &[g], VehicleId(1)), None);
        assert!(!unpark(&mut registry, &[g], VehicleId(1)));
    }
}
