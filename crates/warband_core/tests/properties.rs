//! Property-based tests for targeting, production and squad bookkeeping.

use std::collections::BTreeSet;

use warband_core::body::Body;
use warband_core::components::{ObjectId, Role, SquadId, Store};
use warband_core::config::{EngineConfig, RoleWeights};
use warband_core::host::{BaseRecord, StructureRecord};
use warband_core::math::TilePos;
use warband_core::memory::{MemoryLedger, UnitMemory};
use warband_core::production::{ProductionPlanner, ProductionQueue, ProductionRequest, ProductionScheduler};
use warband_core::snapshot::{Target, TargetKind, UnitView, WorldSnapshot};
use warband_core::squad::SquadCoordinator;
use warband_core::targeting::{nearest_by_path, score, weighted_priority, ChebyshevRange, PathCost};
use warband_test_utils::fixtures::{engine_for, run_ticks, spawn_squad, standard_arena};
use warband_test_utils::proptest::prelude::*;
use warband_test_utils::strategies::{arb_deaths, arb_distance_weight, arb_request, arb_targets, arb_tile};

fn funded_snapshot(stored: u32) -> WorldSnapshot {
    WorldSnapshot {
        map_size: (100, 100),
        own_base: Some(BaseRecord {
            structure: StructureRecord {
                id: 1,
                position: TilePos::new(10, 10),
                store: Store::new(stored, 10_000),
            },
            producing: false,
        }),
        targets: vec![Target {
            id: 2,
            position: TilePos::new(90, 90),
            kind: TargetKind::ProductionFacility,
        }],
        ..WorldSnapshot::default()
    }
}

fn squad_member(id: ObjectId, squad: SquadId, leader: bool) -> UnitView {
    let mut memory = UnitMemory::stamped(Role::RangedAttacker, 1, format!("ranged-0-{id}"));
    memory.join_squad(squad);
    if leader {
        memory.promote();
    }
    let body = Body::for_role(Role::RangedAttacker, 1);
    UnitView {
        id,
        position: TilePos::new(40 + i32::try_from(id).unwrap_or(0), 40),
        hits: 100,
        hits_max: 100,
        body,
        cargo: Store::default(),
        spawning: false,
        memory,
    }
}

proptest! {
    #[test]
    fn test_weighted_priority_picks_first_best(
        from in arb_tile(),
        targets in arb_targets(12),
        distance_weight in arb_distance_weight(),
    ) {
        let weights = RoleWeights::default();
        let picked = weighted_priority(from, &targets, &weights, distance_weight);

        match picked {
            None => prop_assert!(targets.is_empty()),
            Some(picked) => {
                let best = score(from, picked, &weights, distance_weight);
                let first = targets
                    .iter()
                    .position(|t| score(from, t, &weights, distance_weight) == best)
                    .unwrap();
                prop_assert_eq!(targets[first].id, picked.id);
                for target in &targets {
                    prop_assert!(score(from, target, &weights, distance_weight) <= best);
                }
            }
        }

        // Same inputs, same answer.
        let again = weighted_priority(from, &targets, &weights, distance_weight).map(|t| t.id);
        prop_assert_eq!(picked.map(|t| t.id), again);
    }

    #[test]
    fn test_nearest_by_path_is_cheapest_and_stable(
        from in arb_tile(),
        targets in arb_targets(12),
    ) {
        let picked = nearest_by_path(from, &targets, |t| t.position, &ChebyshevRange);
        match picked {
            None => prop_assert!(targets.is_empty()),
            Some(picked) => {
                let cost = from.range_to(picked.position);
                let first = targets
                    .iter()
                    .position(|t| from.range_to(t.position) == cost)
                    .unwrap();
                prop_assert_eq!(targets[first].id, picked.id);
                prop_assert!(targets.iter().all(|t| ChebyshevRange.cost(from, t.position) >= Some(cost)));
            }
        }
    }

    #[test]
    fn test_queue_is_fifo(requests in proptest::collection::vec(arb_request(), 0..20)) {
        let mut queue = ProductionQueue::new();
        for request in &requests {
            queue.push(*request);
        }
        prop_assert_eq!(queue.len(), requests.len());

        let mut drained = Vec::new();
        while let Some(request) = queue.pop() {
            drained.push(request);
        }
        prop_assert_eq!(drained, requests);
    }

    #[test]
    fn test_planner_never_queues_what_base_cannot_pay(stored in 0u32..1_200) {
        let snapshot = funded_snapshot(stored);
        let config = EngineConfig::default();
        let planner = ProductionPlanner::new(&snapshot, &config);
        let mut scheduler = ProductionScheduler::new();

        let worker = planner.plan_workers(0, &mut scheduler);
        let worker_cost = ProductionRequest::new(Role::Harvester, config.worker_tier, 0).cost();
        prop_assert_eq!(worker.is_some(), stored >= worker_cost);

        let soldiers = planner.plan_soldiers(&BTreeSet::new(), &mut scheduler, &MemoryLedger::new());
        let soldier_cost = ProductionRequest::new(Role::RangedAttacker, config.soldier_tier, 0).cost();
        prop_assert_eq!(soldiers.is_empty(), stored < soldier_cost);

        for request in scheduler.queue().iter() {
            prop_assert!(request.cost() <= stored);
        }
    }

    #[test]
    fn test_disband_is_idempotent(members in 1u64..6, leader in 0u64..6) {
        let squad = SquadId(11);
        let units: Vec<UnitView> = (1..=members)
            .map(|id| squad_member(id, squad, id == leader))
            .collect();
        let snapshot = WorldSnapshot {
            own_units: units,
            ..WorldSnapshot::default()
        };
        let mut coordinator = SquadCoordinator::from_snapshot(&snapshot);
        let mut ledger = MemoryLedger::new();

        let released = coordinator.disband(squad, &snapshot, &mut ledger);
        prop_assert_eq!(released.map(|units| units.len()), Some(usize::try_from(members).unwrap()));
        let staged = ledger.len();

        prop_assert!(coordinator.disband(squad, &snapshot, &mut ledger).is_none());
        prop_assert_eq!(ledger.len(), staged);
        for id in 1..=members {
            let memory = ledger.get(id).unwrap();
            prop_assert!(memory.is_idle());
            prop_assert!(!memory.is_leader());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_one_leader_per_squad_after_losses(deaths in arb_deaths(5)) {
        let mut arena = standard_arena();
        let squad = SquadId(5);
        let positions: Vec<TilePos> = (0..5).map(|x| TilePos::new(40 + x, 40)).collect();
        let ids = spawn_squad(&mut arena, Role::RangedAttacker, squad, &positions);
        let config = EngineConfig::default();
        let squad_min = config.squad_min;
        let mut engine = engine_for(arena, config);
        run_ticks(&mut engine, 1);

        for (id, dies) in ids.iter().zip(&deaths) {
            if *dies {
                engine.host_mut().kill(*id);
            }
        }
        let survivors = deaths.iter().filter(|dies| !**dies).count();

        for _ in 0..2 {
            run_ticks(&mut engine, 1);
            let arena = engine.host();
            let members: Vec<UnitMemory> = ids
                .iter()
                .filter(|id| arena.unit(**id).is_some())
                .filter_map(|id| arena.memory_of(*id))
                .filter(|memory| memory.squad() == Some(squad))
                .collect();
            let leaders = members.iter().filter(|memory| memory.is_leader()).count();

            if survivors >= squad_min {
                prop_assert_eq!(members.len(), survivors);
                prop_assert_eq!(leaders, 1);
            } else {
                prop_assert!(members.is_empty());
            }
        }
    }
}
