//! Activity-spot allocation - putting agents into buildings.
//!
//! Occupancy is coarse membership and is recorded even when no spot is free.
//! Spots are exclusive; an agent holds at most one at a time.

use crate::components::*;
use crate::context::{AllocatedSpot, Worker};
use crate::registry::Registry;

/// Place `agent` in `building`, claiming a spot in `function` if given, else
/// in the agent kind's default function, else in any function with room.
///
/// Returns false when no spot was claimed. An agent with no current building
/// is still registered as an occupant; an agent already inside some building
/// stays where it is.
pub fn place(
    registry: &mut Registry,
    agent: &mut dyn Worker,
    building: BuildingId,
    function: Option<FunctionType>,
    verbose: bool,
) -> bool {
    if !registry.contains(building) {
        log::warn!("Cannot place {}: {} not found", agent.agent_id(), building);
        return false;
    }
    let requested = function.unwrap_or_else(|| FunctionType::default_for(agent.kind()));
    let candidate = find_spot(registry, building, requested, function.is_some(), true);

    // Soft overflow: a homeless agent is recorded with or without a spot.
    if agent.building_location().is_none() {
        register_occupant(registry, agent.agent_id(), agent.kind(), building);
        agent.set_building_location(Some(building));
    }

    let Some((function_type, position)) = candidate else {
        log::debug!(
            "No free activity spot for {} in {}",
            agent.agent_id(),
            building
        );
        return false;
    };
    claim(registry, agent, building, function_type, position, verbose)
}

/// Claim a spot in exactly `function`. The agent is left untouched when none
/// is free.
pub fn place_exact(
    registry: &mut Registry,
    agent: &mut dyn Worker,
    building: BuildingId,
    function: FunctionType,
    verbose: bool,
) -> bool {
    match find_spot(registry, building, function, true, false) {
        Some((function_type, position)) => {
            claim(registry, agent, building, function_type, position, verbose)
        }
        None => false,
    }
}

fn find_spot(
    registry: &Registry,
    building: BuildingId,
    requested: FunctionType,
    explicit: bool,
    fallback: bool,
) -> Option<(FunctionType, LocalPosition)> {
    let functions = registry.get::<FunctionSet>(building)?;
    let direct = match functions.get(requested) {
        Some(instance) => instance.available_spot().map(|pos| (requested, pos)),
        None => {
            if explicit {
                log::debug!("{} has no {} function", building, requested);
            }
            None
        }
    };
    if direct.is_some() || !fallback {
        return direct;
    }
    let spare = functions.empty_spot_function().and_then(|ft| {
        functions
            .get(ft)
            .and_then(|f| f.available_spot())
            .map(|pos| (ft, pos))
    });
    spare
}

/// Take `position`, then let go of the agent's previous spot and move its
/// membership over. Nothing changes if the spot is already taken.
fn claim(
    registry: &mut Registry,
    agent: &mut dyn Worker,
    building: BuildingId,
    function_type: FunctionType,
    position: LocalPosition,
    verbose: bool,
) -> bool {
    let claimed = registry
        .get_mut::<FunctionSet>(building)
        .and_then(|mut functions| {
            functions
                .get_mut(function_type)
                .map(|f| f.claim_spot(position, agent.agent_id()))
        })
        .unwrap_or(false);
    if !claimed {
        log::warn!(
            "Spot {} in {} ({}) was taken before {} could claim it",
            position,
            building,
            function_type,
            agent.agent_id()
        );
        return false;
    }

    release_spot(registry, agent);
    register_occupant(registry, agent.agent_id(), agent.kind(), building);
    agent.set_position(position);
    agent.set_building_location(Some(building));
    agent.set_activity_spot(Some(AllocatedSpot {
        building,
        function_type,
        position,
    }));

    if verbose {
        log::info!(
            "{} claimed {} spot {} in {}",
            agent.agent_id(),
            function_type,
            position,
            building
        );
    } else {
        log::debug!(
            "{} claimed {} spot {} in {}",
            agent.agent_id(),
            function_type,
            position,
            building
        );
    }
    true
}

/// Move the agent's membership and location to `destination` without
/// claiming a spot. A spot held in another building is given up.
pub fn transfer(registry: &mut Registry, agent: &mut dyn Worker, destination: BuildingId) -> bool {
    if !registry.contains(destination) {
        log::warn!(
            "Cannot transfer {}: {} not found",
            agent.agent_id(),
            destination
        );
        return false;
    }
    let held_elsewhere = agent
        .activity_spot()
        .is_some_and(|spot| spot.building != destination);
    if held_elsewhere {
        release_spot(registry, agent);
    }
    register_occupant(registry, agent.agent_id(), agent.kind(), destination);
    agent.set_building_location(Some(destination));
    true
}

/// Make `agent` an occupant of `building` and of no other building.
pub fn register_occupant(
    registry: &mut Registry,
    agent: AgentId,
    kind: AgentKind,
    building: BuildingId,
) -> bool {
    let already = registry
        .get::<Occupancy>(building)
        .map(|o| o.occupants(kind).contains(&agent))
        .unwrap_or(false);
    if already {
        return false;
    }
    clear_occupancy(registry, agent);
    registry
        .get_mut::<Occupancy>(building)
        .map(|mut o| o.add(agent, kind))
        .unwrap_or(false)
}

/// Drop `agent` from every building's occupancy.
pub fn clear_occupancy(registry: &mut Registry, agent: AgentId) {
    for (_, occupancy) in registry.world_mut().query_mut::<&mut Occupancy>() {
        occupancy.remove(agent);
    }
}

/// Release the agent's claimed spot, if any.
pub fn release_spot(registry: &mut Registry, agent: &mut dyn Worker) -> bool {
    let Some(spot) = agent.activity_spot() else {
        return false;
    };
    agent.set_activity_spot(None);
    registry
        .get_mut::<FunctionSet>(spot.building)
        .and_then(|mut functions| {
            functions
                .get_mut(spot.function_type)
                .map(|f| f.release_at(spot.position, agent.agent_id()))
        })
        .unwrap_or(false)
}

/// Take the agent out of its building entirely.
pub fn remove_from_building(registry: &mut Registry, agent: &mut dyn Worker) {
    release_spot(registry, agent);
    clear_occupancy(registry, agent.agent_id());
    agent.set_building_location(None);
}

/// Which building, if any, lists `agent` as an occupant.
pub fn occupied_building(registry: &Registry, agent: AgentId) -> Option<BuildingId> {
    let mut query = registry.world().query::<(&Building, &Occupancy)>();
    let found = query
        .iter()
        .find(|(_, (_, occupancy))| occupancy.contains(agent))
        .map(|(_, (building, _))| building.id);
    found
}
