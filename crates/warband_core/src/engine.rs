//! Tick orchestrator.
//!
//! [`Engine::advance`] runs one decision pass, strictly in this order:
//!
//! 1. capture the [`WorldSnapshot`];
//! 2. worker production policy;
//! 3. squad readiness, then soldier production policy;
//! 4. dispatch every living, fully produced unit in ascending id order;
//! 5. pump the production scheduler once;
//! 6. flush the memory ledger to the host.
//!
//! A failure inside one unit's turn is recorded in the [`TickReport`] and
//! never stops the loop.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::behavior::{dispatch, Turn, TurnContext};
use crate::components::SquadId;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::host::Host;
use crate::math::TilePos;
use crate::memory::MemoryLedger;
use crate::production::{
    ProductionPlanner, ProductionQueue, ProductionRequest, ProductionScheduler, PumpOutcome,
};
use crate::snapshot::WorldSnapshot;
use crate::squad::SquadCoordinator;
use crate::targeting::{ChebyshevRange, PathCost};

/// Compute the rally point for a base.
///
/// The point sits `offset` tiles from the base on each axis, on the side
/// facing away from the map centre, so gathering units never block the
/// production tile.
#[must_use]
pub fn rally_point(base: TilePos, map_size: (i32, i32), offset: i32) -> TilePos {
    let centre = TilePos::new(map_size.0 / 2, map_size.1 / 2);
    let away = |from: i32, mid: i32| match from.cmp(&mid) {
        std::cmp::Ordering::Less => -offset,
        std::cmp::Ordering::Greater => offset,
        std::cmp::Ordering::Equal => 0,
    };
    base.offset(away(base.x, centre.x), away(base.y, centre.y))
}

/// Everything that happened during one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Host tick.
    pub tick: u64,
    /// One entry per dispatched unit, in id order.
    pub turns: Vec<Turn>,
    /// Contained failures.
    pub errors: Vec<EngineError>,
    /// Requests enqueued this tick.
    pub enqueued: Vec<ProductionRequest>,
    /// What the scheduler did.
    pub production: Option<PumpOutcome>,
    /// Squads created.
    pub formed: Vec<SquadId>,
    /// Squads dissolved.
    pub disbanded: Vec<SquadId>,
    /// Hash of the decisions taken, for determinism checks.
    pub digest: u64,
}

impl TickReport {
    fn compute_digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.turns.len().hash(&mut hasher);
        for turn in &self.turns {
            turn.unit.hash(&mut hasher);
            turn.role.hash(&mut hasher);
            turn.state.hash(&mut hasher);
            turn.action.hash(&mut hasher);
            turn.error.hash(&mut hasher);
        }
        self.enqueued.hash(&mut hasher);
        self.production.hash(&mut hasher);
        self.formed.hash(&mut hasher);
        self.disbanded.hash(&mut hasher);
        hasher.finish()
    }
}

/// The decision engine bound to one host.
pub struct Engine<H: Host> {
    host: H,
    config: EngineConfig,
    rally: TilePos,
    start_tick: u64,
    scheduler: ProductionScheduler,
    path: Box<dyn PathCost>,
}

impl<H: Host> Engine<H> {
    /// Bind an engine to `host`.
    ///
    /// Fails when the config is invalid or the host shows no own base.
    pub fn new(host: H, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let observation = host.observe();
        let base = observation.own_base.ok_or(EngineError::MissingBase)?;
        let rally = rally_point(base.structure.position, observation.map_size, config.rally_offset);
        tracing::info!(tick = observation.tick, ?rally, "engine started");

        Ok(Self {
            host,
            config,
            rally,
            start_tick: observation.tick,
            scheduler: ProductionScheduler::new(),
            path: Box::new(ChebyshevRange),
        })
    }

    /// Use a host-provided path metric instead of straight-line range.
    #[must_use]
    pub fn with_path_cost(mut self, path: impl PathCost + 'static) -> Self {
        self.path = Box::new(path);
        self
    }

    /// The rally point.
    #[must_use]
    pub const fn rally_point(&self) -> TilePos {
        self.rally
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The pending production queue.
    #[must_use]
    pub const fn queue(&self) -> &ProductionQueue {
        self.scheduler.queue()
    }

    /// Queue a request directly, bypassing the planner.
    pub fn enqueue(&mut self, request: ProductionRequest) {
        self.scheduler.enqueue(request);
    }

    /// The host.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// The host, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Give the host back.
    pub fn into_host(self) -> H {
        self.host
    }

    /// Run one tick of decisions.
    pub fn advance(&mut self) -> TickReport {
        let mut snapshot = WorldSnapshot::capture(&self.host);
        let mut ledger = MemoryLedger::new();
        let mut report = TickReport {
            tick: snapshot.tick,
            errors: std::mem::take(&mut snapshot.decode_failures),
            ..TickReport::default()
        };

        let ctx = TurnContext {
            snapshot: &snapshot,
            config: &self.config,
            rally: self.rally,
            path: self.path.as_ref(),
        };
        let planner = ProductionPlanner::new(&snapshot, &self.config);

        // Workers.
        let elapsed = snapshot.tick.saturating_sub(self.start_tick);
        report.enqueued.extend(planner.plan_workers(elapsed, &mut self.scheduler));

        // Readiness and soldiers.
        let mut squads = SquadCoordinator::from_snapshot(&snapshot);
        let readiness = squads.prepare(&ctx, &mut ledger);
        report.formed = readiness.formed;
        report.disbanded = readiness.disbanded;
        report
            .enqueued
            .extend(planner.plan_soldiers(&readiness.active_roles, &mut self.scheduler, &ledger));

        // Dispatch.
        for unit in snapshot.own_units.iter().filter(|unit| !unit.spawning) {
            let turn = dispatch(unit, &ctx, &mut squads, &mut self.host, &mut ledger);
            if let Some(source) = turn.error {
                report.errors.push(EngineError::Action {
                    unit: turn.unit,
                    source,
                });
            }
            report.turns.push(turn);
        }

        #[cfg(feature = "debug-validation")]
        {
            for (squad, leaders) in squads.leader_counts() {
                debug_assert!(leaders <= 1, "{squad} ends the tick with {leaders} leaders");
            }
        }

        // Production.
        report.production = Some(self.scheduler.pump(
            snapshot.own_base.as_ref(),
            &mut self.host,
            &mut ledger,
            snapshot.tick,
        ));

        report.errors.extend(ledger.flush(&mut self.host));

        report.digest = report.compute_digest();
        tracing::debug!(
            tick = report.tick,
            turns = report.turns.len(),
            errors = report.errors.len(),
            digest = report.digest,
            "tick complete"
        );
        report
    }
}
