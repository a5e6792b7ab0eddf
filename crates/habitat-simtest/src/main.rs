//! Habitat Headless Simulation Harness
//!
//! Validates the building subsystem end to end against an in-memory
//! settlement. Runs entirely in-process: no persistence backend, no
//! networking, no rendering.
//!
//! Usage:
//!   cargo run -p habitat-simtest
//!   cargo run -p habitat-simtest -- --verbose
//!   cargo run -p habitat-simtest -- --config manager.json --json

use habitat_core::context::{BuildingSpec, PartMap};
use habitat_core::prelude::*;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Settlement manifest ─────────────────────────────────────────────────
const MANIFEST_JSON: &str = include_str!("../../../data/settlement_manifest.json");

#[derive(Debug, Deserialize)]
struct FunctionEntry {
    function: FunctionType,
    spots: usize,
}

#[derive(Debug, Deserialize)]
struct FacilitySpec {
    building_type: String,
    category: BuildingCategory,
    zone: i32,
    count: u32,
    life_support: u32,
    #[serde(default)]
    beds: Option<u32>,
    #[serde(default)]
    robot_slots: Option<u32>,
    #[serde(default)]
    computing_cu: Option<f64>,
    #[serde(default)]
    garage: Option<[u32; 3]>,
    base_power: f64,
    frame: String,
    functions: Vec<FunctionEntry>,
}

impl FacilitySpec {
    fn template(&self) -> BuildingTemplate {
        let mut template =
            BuildingTemplate::new(self.building_type.as_str(), self.category).in_zone(self.zone);
        template.occupancy.people_capacity = self.life_support;
        for f in &self.functions {
            template = template.with_spots(f.function, f.spots);
        }
        if let Some(beds) = self.beds {
            template = template.with_beds(beds);
        }
        if let Some(slots) = self.robot_slots {
            template = template.with_robot_station(slots);
        }
        if let Some(cu) = self.computing_cu {
            template = template.with_computing(ComputingNode::new(cu));
        }
        if let Some([rovers, utility, flyers]) = self.garage {
            template = template.with_garage(VehicleMaintenance::new(rovers, utility, flyers));
        }
        template
    }

    fn spec(&self) -> BuildingSpec {
        let mut functions: Vec<FunctionType> = self.functions.iter().map(|f| f.function).collect();
        if self.beds.is_some() {
            functions.push(FunctionType::LivingAccommodation);
        }
        if self.robot_slots.is_some() {
            functions.push(FunctionType::RoboticStation);
        }
        if self.computing_cu.is_some() {
            functions.push(FunctionType::Computation);
        }
        if self.garage.is_some() {
            functions.push(FunctionType::VehicleMaintenance);
        }
        BuildingSpec {
            building_type: self.building_type.clone(),
            functions,
            base_power: self.base_power,
            frame: self.frame.clone(),
        }
    }
}

// ── Logging ─────────────────────────────────────────────────────────────

/// Route the core crate's `log` records through a stderr fmt subscriber.
/// `RUST_LOG` overrides the level picked from `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Serialize)]
struct Report<'a> {
    passed: usize,
    failed: usize,
    results: &'a [TestResult],
}

fn check(results: &mut Vec<TestResult>, name: &str, passed: bool, detail: String) {
    results.push(TestResult {
        name: name.into(),
        passed,
        detail,
    });
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let json = args.iter().any(|a| a == "--json");

    init_logging(verbose);

    let config = match args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
    {
        Some(path) => match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| ManagerConfig::from_json_str(&s).map_err(|e| e.to_string()))
        {
            Ok(c) => c,
            Err(e) => {
                error!(path = %path, "config.read_failed: {}", e);
                std::process::exit(2);
            }
        },
        None => ManagerConfig::default(),
    };
    info!(seed = config.rng_seed, "harness.start");

    if !json {
        println!("=== Habitat Building Subsystem Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Manifest validation
    let manifest = validate_manifest(&mut results);

    if !manifest.is_empty() {
        // 2. Capability index & adjacency
        validate_index(&manifest, &config, &mut results);

        // 3. Activity-spot placement
        validate_placement(&manifest, &config, &mut results);

        // 4. Crowding & preference
        validate_crowding(&manifest, &config, &mut results);

        // 5. Garages
        validate_garages(&manifest, &config, &mut results);

        // 6. Computing scheduler
        validate_computing(&manifest, &config, &mut results);

        // 7. Maintenance demand
        validate_maintenance(&manifest, &config, &mut results);

        // 8. Valuation
        validate_valuation(&manifest, &config, &mut results);

        // 9. Save / load
        validate_persistence(&manifest, &config, &mut results);
    }

    // ── Summary ──
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    if json {
        let report = Report {
            passed,
            failed,
            results: &results,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Cannot encode report: {}", e),
        }
    } else {
        for r in &results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
        println!(
            "\n=== RESULT: {}/{} passed, {} failed ===",
            passed,
            results.len(),
            failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

/// Build a settlement holding every manifest building, with specs registered.
fn build_settlement(
    manifest: &[FacilitySpec],
    config: &ManagerConfig,
    table: ValuationTable,
) -> (BuildingManager, MemorySettlement) {
    let settlement = MemorySettlement::new(1);
    settlement.state_mut().power_value = 0.5;
    for spec in manifest {
        settlement.add_spec(spec.spec());
    }
    let templates: Vec<BuildingTemplate> = manifest
        .iter()
        .flat_map(|spec| (0..spec.count).map(move |_| spec.template()))
        .collect();
    let manager =
        BuildingManager::with_templates(settlement.context(table), config.clone(), templates);
    (manager, settlement)
}

fn first_of(manager: &BuildingManager, building_type: &str) -> Option<BuildingId> {
    manager.buildings_of_type(building_type).first().copied()
}

// ── 1. Manifest ─────────────────────────────────────────────────────────

fn validate_manifest(results: &mut Vec<TestResult>) -> Vec<FacilitySpec> {
    let manifest: Vec<FacilitySpec> = match serde_json::from_str(MANIFEST_JSON) {
        Ok(m) => m,
        Err(e) => {
            check(results, "manifest_parse", false, format!("JSON parse error: {}", e));
            return Vec::new();
        }
    };

    check(
        results,
        "manifest_not_empty",
        manifest.len() >= 8,
        format!("{} building types loaded", manifest.len()),
    );

    let no_functions: Vec<_> = manifest.iter().filter(|f| f.functions.is_empty()).collect();
    check(
        results,
        "manifest_functions_present",
        no_functions.is_empty(),
        format!("{} types without capabilities", no_functions.len()),
    );

    let bad_zone: Vec<_> = manifest.iter().filter(|f| f.zone < 0).collect();
    check(
        results,
        "manifest_valid_zones",
        bad_zone.is_empty(),
        format!("{} types with negative zone", bad_zone.len()),
    );

    let bad_power: Vec<_> = manifest.iter().filter(|f| f.base_power < 0.0).collect();
    check(
        results,
        "manifest_nonnegative_power",
        bad_power.is_empty(),
        format!("{} types with negative base power", bad_power.len()),
    );

    let has = |category: BuildingCategory| manifest.iter().any(|f| f.category == category);
    check(
        results,
        "manifest_key_buildings",
        has(BuildingCategory::Habitat)
            && has(BuildingCategory::Eva)
            && has(BuildingCategory::VehicleGarage)
            && has(BuildingCategory::Medical),
        "habitat, airlock, garage and medical present".into(),
    );

    manifest
}

// ── 2. Capability index ─────────────────────────────────────────────────

fn validate_index(manifest: &[FacilitySpec], config: &ManagerConfig, results: &mut Vec<TestResult>) {
    let (mut manager, settlement) = build_settlement(manifest, config, ValuationTable::uniform(0.1));

    let expected_count: u32 = manifest.iter().map(|f| f.count).sum();
    check(
        results,
        "index_building_count",
        manager.len() as u32 == expected_count,
        format!("{} buildings (expected {})", manager.len(), expected_count),
    );

    let expected_beds: u32 = manifest
        .iter()
        .map(|f| f.beds.unwrap_or(0) * f.count)
        .sum();
    let capacity = manager.population_capacity();
    check(
        results,
        "index_population_capacity",
        capacity == expected_beds,
        format!("{} beds (expected {})", capacity, expected_beds),
    );

    let mut mismatches = 0;
    for tag in FunctionType::ALL {
        let indexed = manager.buildings_with(tag);
        for id in manager.building_ids() {
            if indexed.contains(&id) != manager.registry().supports(id, tag) {
                mismatches += 1;
            }
        }
    }
    check(
        results,
        "index_consistent",
        mismatches == 0,
        format!("{} tag/building mismatches", mismatches),
    );

    // Demolition updates tags and capacity in the same call
    if let Some(quarters) = first_of(&manager, "Residential Quarters") {
        manager.remove_building(quarters);
        let gone = FunctionType::ALL
            .iter()
            .all(|t| !manager.buildings_with(*t).contains(&quarters));
        let capacity = manager.population_capacity();
        check(
            results,
            "index_removal",
            gone && capacity == expected_beds.saturating_sub(8),
            format!("capacity after removal {}", capacity),
        );
    }

    // Observatory attachment through one connector hop
    let airlock = first_of(&manager, "Airlock");
    let observatory = first_of(&manager, "Observatory");
    if let (Some(airlock), Some(observatory)) = (airlock, observatory) {
        let before = manager.is_observatory_attached(airlock);
        settlement.connect(airlock, observatory);
        manager.rebuild_adjacency();
        let after = manager.is_observatory_attached(airlock);
        check(
            results,
            "adjacency_observatory_attached",
            !before && after,
            format!("before={} after={}", before, after),
        );
    }
}

// ── 3. Placement ────────────────────────────────────────────────────────

fn validate_placement(manifest: &[FacilitySpec], config: &ManagerConfig, results: &mut Vec<TestResult>) {
    let (mut manager, _) = build_settlement(manifest, config, ValuationTable::uniform(0.1));

    let mut people: Vec<AgentState> = (1..=30).map(AgentState::person).collect();
    let mut placed = 0;
    for person in people.iter_mut() {
        if manager.add_to_random_building_spot(person) {
            placed += 1;
        }
    }
    check(
        results,
        "placement_all_people_placed",
        placed == people.len(),
        format!("{}/{} placed", placed, people.len()),
    );

    let spots: BTreeSet<(BuildingId, FunctionType, i64, i64)> = people
        .iter()
        .filter_map(|p| p.spot)
        .map(|s| {
            (
                s.building,
                s.function_type,
                (s.position.x * 1000.0) as i64,
                (s.position.y * 1000.0) as i64,
            )
        })
        .collect();
    check(
        results,
        "placement_exclusive_spots",
        spots.len() == placed,
        format!("{} distinct spots for {} agents", spots.len(), placed),
    );

    let in_airlock = people.iter().any(|p| {
        p.building
            .and_then(|b| manager.registry().category_of(b))
            .map(|c| c == BuildingCategory::Eva || c == BuildingCategory::Connection)
            .unwrap_or(false)
    });
    check(
        results,
        "placement_skips_airlocks_and_hallways",
        !in_airlock,
        "nobody settled in an airlock or hallway".into(),
    );

    let mut robot = AgentState::robot(500);
    let workshop = first_of(&manager, "Workshop");
    let robot_placed = manager.add_to_random_building_spot(&mut robot);
    check(
        results,
        "placement_robot_station",
        robot_placed && robot.building == workshop,
        format!("robot in {:?}", robot.building),
    );

    let mut patients: Vec<AgentState> = (900..903).map(AgentState::person).collect();
    let admitted: Vec<bool> = patients
        .iter_mut()
        .map(|p| manager.add_patient_to_medical_bed(p))
        .collect();
    check(
        results,
        "placement_medical_beds",
        admitted == vec![true, true, false],
        format!("admissions {:?}", admitted),
    );
}

// ── 4. Crowding & preference ────────────────────────────────────────────

fn validate_crowding(manifest: &[FacilitySpec], config: &ManagerConfig, results: &mut Vec<TestResult>) {
    let draws = |manager: &mut BuildingManager| -> Vec<Option<BuildingId>> {
        let home = first_of(manager, "Lander Hab");
        let mut agent = AgentState::person(1);
        agent.building = home;
        (0..50)
            .map(|_| manager.available_function_building(&agent, FunctionType::Dining, false))
            .collect()
    };

    let (mut a, _) = build_settlement(manifest, config, ValuationTable::uniform(0.1));
    let (mut b, _) = build_settlement(manifest, config, ValuationTable::uniform(0.1));
    let first = draws(&mut a);
    let second = draws(&mut b);
    check(
        results,
        "crowding_seeded_replay",
        first == second && first.iter().all(|d| d.is_some()),
        format!("{} draws replayed identically", first.len()),
    );

    let outpost = first_of(&a, "Outpost Hab");
    if let Some(outpost) = outpost {
        let agent = AgentState::person(2).in_building(outpost);
        let local = (0..20).all(|_| {
            a.available_function_building(&agent, FunctionType::Dining, false) == Some(outpost)
        });
        check(
            results,
            "crowding_zone_filter",
            local,
            "zone-1 agent always dines in the outpost".into(),
        );
    }

    let airlock = first_of(&a, "Airlock");
    let hab = first_of(&a, "Lander Hab");
    if let (Some(airlock), Some(hab)) = (airlock, hab) {
        let picked = a.least_crowded(&[airlock, hab], AgentKind::Person);
        check(
            results,
            "crowding_excludes_airlocks",
            picked == vec![hab],
            format!("least crowded {:?}", picked),
        );
    }

    let landers = a.buildings_of_type("Lander Hab");
    let homeless = AgentState::person(3);
    let kitchen = a.available_kitchen(&homeless);
    let dining = a.available_dining_building(&homeless, false);
    check(
        results,
        "crowding_kitchen_and_dining",
        kitchen.is_some_and(|k| landers.contains(&k)) && dining.is_some_and(|d| landers.contains(&d)),
        format!("kitchen {:?}, dining {:?}", kitchen, dining),
    );
    if let Some(outpost) = outpost {
        let visitor = AgentState::person(4).in_building(outpost);
        let diners = a.dining_buildings(&visitor);
        check(
            results,
            "crowding_outpost_diners_reach_main_zone",
            diners.len() == landers.len() + 1 && diners.contains(&outpost),
            format!("{} dining rooms reachable", diners.len()),
        );
    }
}

// ── 5. Garages ──────────────────────────────────────────────────────────

fn validate_garages(manifest: &[FacilitySpec], config: &ManagerConfig, results: &mut Vec<TestResult>) {
    let (mut manager, settlement) = build_settlement(manifest, config, ValuationTable::uniform(0.1));
    let garage = first_of(&manager, "Garage");

    let mut rover_a = VehicleStatus::new(VehicleId(1), VehicleKind::Rover);
    let rover_b = VehicleStatus::new(VehicleId(2), VehicleKind::Rover);
    let flyer = VehicleStatus::new(VehicleId(3), VehicleKind::Flyer);
    let mut towed = VehicleStatus::new(VehicleId(4), VehicleKind::Rover);
    towed.being_towed = true;
    for v in [rover_a, rover_b, flyer, towed] {
        settlement.add_vehicle(v);
    }

    let a = manager.park(rover_a.id);
    let f = manager.park(flyer.id);
    check(
        results,
        "garage_separate_pools",
        a == garage && f == garage,
        format!("rover in {:?}, flyer in {:?}", a, f),
    );

    check(
        results,
        "garage_rejects_towed",
        manager.park(towed.id).is_none(),
        "towed rover refused".into(),
    );

    rover_a.on_mission = true;
    settlement.add_vehicle(rover_a);
    let b = manager.park(rover_b.id);
    let again = manager.park(rover_b.id);
    let evicted = !manager.is_in_garage(rover_a.id);
    check(
        results,
        "garage_eviction",
        b == garage && again == garage && evicted,
        format!("evictions {:?}", settlement.state().evictions),
    );
}

// ── 6. Computing ────────────────────────────────────────────────────────

fn validate_computing(manifest: &[FacilitySpec], config: &ManagerConfig, results: &mut Vec<TestResult>) {
    let (mut manager, _) = build_settlement(manifest, config, ValuationTable::uniform(0.1));
    let nodes: Vec<BuildingId> = manager.computing_nodes().into_iter().collect();
    check(
        results,
        "computing_nodes_present",
        nodes.len() == 3,
        format!("{} computing nodes", nodes.len()),
    );
    let servers = manager.buildings_of_type("Server Farm");
    let (Some(&busy), Some(&light)) = (servers.first(), servers.get(1)) else {
        return;
    };

    let scheduled = manager.schedule_workload(busy, 20.0, 0, 50) && manager.schedule_workload(light, 5.0, 0, 50);
    let mut total = 0.0;
    let mut faults = 0;
    for _ in 0..50 {
        total += 1.0;
        faults += manager.time_passing(&ClockPulse::new(total, 1.0)).faults.len();
    }
    check(
        results,
        "computing_ticks_clean",
        scheduled && faults == 0,
        format!("{} faults over 50 pulses", faults),
    );

    let stable = (0..10).all(|_| manager.worst_entropy_node() == Some(busy));
    check(
        results,
        "computing_worst_entropy",
        stable,
        format!("worst entropy node {:?}", manager.worst_entropy_node()),
    );

    let free = manager.most_free_node(30.0, 100, 120);
    check(
        results,
        "computing_most_free_fits",
        free == Some(busy) || free == Some(light),
        format!("30 CU job lands on {:?}", free),
    );

    let summary = manager.computing_summary();
    check(
        results,
        "computing_summary",
        summary.node_count == 3 && summary.total_entropy > 0.0 && summary.peak_usage >= 25.0,
        format!(
            "capacity {:.0} CU, peak {:.1}, entropy/node {:.3}, load {:.1} kW",
            summary.total_capacity,
            summary.peak_usage,
            summary.entropy_per_node(),
            summary.power_load
        ),
    );

    // One overheating node must not stop the others
    let fragile = manager.add_building(
        BuildingTemplate::new("Test Rack", BuildingCategory::Command)
            .with_computing(ComputingNode::new(10.0).with_max_entropy(0.0001)),
        false,
    );
    let all_day = manager.schedule_workload(fragile, 10.0, 0, 1000);
    total += 1.0;
    let report = manager.time_passing(&ClockPulse::new(total, 1.0));
    check(
        results,
        "computing_fault_isolated",
        all_day
            && report.faults.len() == 1
            && report.faults[0].building == fragile
            && report.buildings_updated == manager.len() - 1,
        format!(
            "all-sol workload accepted: {}, {} updated, {} faults",
            all_day,
            report.buildings_updated,
            report.faults.len()
        ),
    );

    // Research benches wear the lab they sit in
    let Some(observatory) = first_of(&manager, "Observatory") else {
        return;
    };
    let idle = manager.total_entropy_per_lab();
    let mut researcher = AgentState::person(700);
    let seated = manager.place(&mut researcher, observatory, Some(FunctionType::Research));
    for _ in 0..5 {
        total += 1.0;
        manager.time_passing(&ClockPulse::new(total, 1.0));
    }
    let worn = manager.research_lab(observatory).map(|l| l.entropy).unwrap_or_default();
    let homeless = AgentState::person(701);
    check(
        results,
        "research_lab_entropy",
        seated
            && idle == 0.0
            && worn > 0.0
            && manager.total_entropy_per_lab() > 0.0
            && manager.worst_entropy_lab_by_probability(&homeless, false) == Some(observatory),
        format!("observatory entropy {:.3}, mean {:.3}", worn, manager.total_entropy_per_lab()),
    );
}

// ── 7. Maintenance ──────────────────────────────────────────────────────

fn validate_maintenance(manifest: &[FacilitySpec], config: &ManagerConfig, results: &mut Vec<TestResult>) {
    let (mut manager, settlement) = build_settlement(manifest, config, ValuationTable::uniform(0.1));
    let Some(hab) = first_of(&manager, "Lander Hab") else {
        return;
    };
    let rover = EntityRef::Vehicle(VehicleId(7));
    let pump = PartId(11);
    let filter = PartId(12);
    settlement.set_parts(EntityRef::Building(hab), PartMap::from([(pump, 2)]));
    settlement.set_parts(rover, PartMap::from([(pump, 1), (filter, 3)]));

    let first = manager.time_passing(&ClockPulse::new(1.0, 1.0));
    let injected = settlement.take_injected().len();
    let second = manager.time_passing(&ClockPulse::new(2.0, 1.0));
    check(
        results,
        "maintenance_posts_once",
        first.demand_posted == 2 && injected == 3 && second.demand_posted == 0,
        format!(
            "first {} posted ({} parts), second {}",
            first.demand_posted, injected, second.demand_posted
        ),
    );

    let pumps = manager.demand_for_part(pump);
    settlement.set_parts(rover, PartMap::new());
    manager.time_passing(&ClockPulse::new(3.0, 1.0));
    let after = manager.demand_for_part(pump);
    check(
        results,
        "maintenance_resolved_entry_removed",
        pumps == 3 && after == 2 && manager.demand_for_part(filter) == 0,
        format!("pump demand {} -> {}", pumps, after),
    );

    settlement.state_mut().held_items.insert(pump);
    check(
        results,
        "maintenance_held_items_excluded",
        manager.demand_for_part(pump) == 0,
        "stocked part not demanded".into(),
    );
}

// ── 8. Valuation ────────────────────────────────────────────────────────

fn validate_valuation(manifest: &[FacilitySpec], config: &ManagerConfig, results: &mut Vec<TestResult>) {
    let (mut manager, settlement) = build_settlement(manifest, config, ValuationTable::uniform(0.1));

    let values: Vec<(String, Result<f64, ValuationError>)> = manifest
        .iter()
        .map(|f| (f.building_type.clone(), manager.value_of(&f.building_type, false)))
        .collect();
    let bad: Vec<_> = values
        .iter()
        .filter(|(_, v)| !matches!(v, Ok(x) if *x >= 0.0))
        .map(|(t, _)| t.as_str())
        .collect();
    check(
        results,
        "valuation_existing_types",
        bad.is_empty(),
        format!("{} types valued, failures: {:?}", values.len(), bad),
    );

    settlement.add_spec(BuildingSpec {
        building_type: "Fusion Reactor".into(),
        functions: vec![FunctionType::PowerGeneration],
        base_power: 0.0,
        frame: "reactor frame".into(),
    });
    let reactor = manager.value_of("Fusion Reactor", true);
    let lander = manager.value_of("Lander Hab", true);
    check(
        results,
        "valuation_frame_rule",
        reactor == Ok(0.0) && matches!(lander, Ok(v) if v > 0.0),
        format!("new reactor {:?}, new lander hab {:?}", reactor, lander),
    );

    if let Some(hab) = first_of(&manager, "Lander Hab") {
        let pristine = manager.value_of_building(hab);
        settlement
            .state_mut()
            .wear
            .insert(EntityRef::Building(hab), 40.0);
        let worn = manager.value_of_building(hab);
        check(
            results,
            "valuation_wear",
            matches!((pristine, worn), (Ok(p), Ok(w)) if w < p),
            "worn building valued lower".into(),
        );
    }

    let partial = ValuationTable::new().with(FunctionType::LifeSupport, |_, _| 1.0);
    let (mut strict, _) = build_settlement(manifest, config, partial);
    let err = strict.value_of("Lander Hab", false);
    check(
        results,
        "valuation_unknown_capability",
        matches!(err, Err(ValuationError::UnknownCapability(_))),
        format!("{:?}", err),
    );
}

// ── 9. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(manifest: &[FacilitySpec], config: &ManagerConfig, results: &mut Vec<TestResult>) {
    let (mut manager, settlement) = build_settlement(manifest, config, ValuationTable::uniform(0.1));
    let mut person = AgentState::person(1);
    manager.add_to_random_building_spot(&mut person);
    if let Some(hab) = first_of(&manager, "Lander Hab") {
        manager.update_demand(EntityRef::Building(hab), PartMap::from([(PartId(5), 4)]));
    }

    let before: Vec<BTreeSet<BuildingId>> = FunctionType::ALL
        .iter()
        .map(|t| manager.buildings_with(*t))
        .collect();

    let mut buffer = Vec::new();
    if let Err(e) = manager.save(&mut buffer) {
        check(results, "persistence_save", false, e.to_string());
        return;
    }

    let mut loaded = match BuildingManager::load(
        &buffer[..],
        settlement.context(ValuationTable::uniform(0.1)),
        config.clone(),
    ) {
        Ok(m) => m,
        Err(e) => {
            check(results, "persistence_load", false, e.to_string());
            return;
        }
    };

    let after: Vec<BTreeSet<BuildingId>> = FunctionType::ALL
        .iter()
        .map(|t| loaded.buildings_with(*t))
        .collect();
    check(
        results,
        "persistence_index_roundtrip",
        before == after,
        format!("{} bytes, {} buildings", buffer.len(), loaded.len()),
    );

    let capacity = (manager.population_capacity(), loaded.population_capacity());
    check(
        results,
        "persistence_capacity",
        capacity.0 == capacity.1,
        format!("{} vs {}", capacity.0, capacity.1),
    );

    check(
        results,
        "persistence_demand",
        loaded.demand_for_part(PartId(5)) == 4,
        format!("{} outstanding", loaded.demand_for_part(PartId(5))),
    );

    let occupied = person.building.map(|b| {
        loaded
            .registry()
            .get::<Occupancy>(b)
            .map(|o| o.contains(person.id))
            .unwrap_or(false)
    });
    check(
        results,
        "persistence_occupancy",
        occupied == Some(true),
        format!("occupant restored: {:?}", occupied),
    );

    tracing::debug!(bytes = buffer.len(), "save.encoded");
}
