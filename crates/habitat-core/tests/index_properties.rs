//! Property tests: the capability index and population capacity stay in
//! step with the registry under arbitrary add/remove sequences.

use habitat_core::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add { tags: Vec<usize>, beds: Option<u32> },
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (
            prop::collection::vec(0..FunctionType::ALL.len(), 0..5),
            prop::option::of(1u32..8),
        )
            .prop_map(|(tags, beds)| Op::Add { tags, beds }),
        1 => (0usize..32).prop_map(Op::Remove),
    ]
}

fn template(tags: &[usize], beds: Option<u32>) -> BuildingTemplate {
    let mut template = BuildingTemplate::new("Module", BuildingCategory::Habitat);
    for &t in tags {
        template = template.with_spots(FunctionType::ALL[t], 1);
    }
    if let Some(beds) = beds {
        template = template.with_beds(beds);
    }
    template
}

fn assert_consistent(manager: &mut BuildingManager) {
    for tag in FunctionType::ALL {
        let indexed = manager.buildings_with(tag);
        for id in manager.building_ids() {
            assert_eq!(
                indexed.contains(&id),
                manager.registry().supports(id, tag),
                "{} / {}",
                id,
                tag
            );
        }
        assert!(indexed.iter().all(|id| manager.contains(*id)));
    }

    let living = manager.buildings_with(FunctionType::LivingAccommodation);
    let beds = manager.registry().bed_capacity(living);
    assert_eq!(manager.population_capacity(), beds);
}

proptest! {
    #[test]
    fn index_matches_registry_after_any_sequence(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let settlement = MemorySettlement::new(1);
        let mut manager = BuildingManager::new(
            settlement.context(ValuationTable::uniform(1.0)),
            ManagerConfig::default(),
        );
        // Warm the cache so removals exercise incremental upkeep
        manager.buildings_with(FunctionType::Farming);

        for op in ops {
            match op {
                Op::Add { tags, beds } => {
                    manager.add_building(template(&tags, beds), false);
                }
                Op::Remove(pick) => {
                    let ids = manager.building_ids();
                    if !ids.is_empty() {
                        manager.remove_building(ids[pick % ids.len()]);
                    }
                }
            }
            assert_consistent(&mut manager);
        }
    }

    #[test]
    fn least_crowded_returns_exact_minimum_set(loads in prop::collection::vec(0u32..6, 1..8)) {
        let settlement = MemorySettlement::new(1);
        let mut manager = BuildingManager::new(
            settlement.context(ValuationTable::uniform(1.0)),
            ManagerConfig::default(),
        );
        let mut agent = 0;
        let mut ids = Vec::new();
        for load in &loads {
            let id = manager.add_building(
                BuildingTemplate::new("Lab", BuildingCategory::Laboratory).with_life_support(2, 2),
                false,
            );
            for _ in 0..*load {
                agent += 1;
                let mut person = AgentState::person(agent);
                manager.place(&mut person, id, None);
            }
            ids.push(id);
        }

        let floor = manager.config().crowding_floor;
        let scores: Vec<i64> = loads.iter().map(|l| (*l as i64 - 2).max(floor)).collect();
        let min = scores.iter().copied().min().unwrap_or_default();
        let expected: Vec<BuildingId> = ids
            .iter()
            .zip(&scores)
            .filter(|(_, s)| **s == min)
            .map(|(id, _)| *id)
            .collect();
        prop_assert_eq!(manager.least_crowded(&ids, AgentKind::Person), expected);
    }
}
