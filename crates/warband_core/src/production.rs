//! Unit production.
//!
//! Production is split in two:
//!
//! - [`ProductionPlanner`] decides *what* to ask for. It enqueues at most one
//!   request per policy per tick, and only when the base can pay for it at
//!   that moment.
//! - [`ProductionScheduler`] hands the head of the FIFO queue to the base,
//!   once per tick, whenever the base is not already busy.
//!
//! A request leaves the queue the instant it is handed to the base,
//! whatever the outcome. A request the base cannot pay for is dropped, not
//! requeued; the planner will ask again when demand persists.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::behavior::current_memory;
use crate::body::Body;
use crate::components::{ObjectId, Role};
use crate::config::EngineConfig;
use crate::host::{ActionApi, BaseRecord, OutcomeCode};
use crate::memory::{MemoryLedger, UnitMemory};
use crate::snapshot::WorldSnapshot;

/// A request to produce one unit. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductionRequest {
    role: Role,
    tier: u8,
    enqueued_at: u64,
}

impl ProductionRequest {
    /// Create a new request.
    #[must_use]
    pub const fn new(role: Role, tier: u8, enqueued_at: u64) -> Self {
        Self {
            role,
            tier,
            enqueued_at,
        }
    }

    /// Requested role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Requested tier.
    #[must_use]
    pub const fn tier(&self) -> u8 {
        self.tier
    }

    /// Tick the request was enqueued at.
    #[must_use]
    pub const fn enqueued_at(&self) -> u64 {
        self.enqueued_at
    }

    /// Body the request resolves to.
    #[must_use]
    pub fn body(&self) -> Body {
        Body::for_role(self.role, self.tier)
    }

    /// Resource cost of the body.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.body().cost()
    }
}

/// FIFO queue of production requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductionQueue {
    requests: VecDeque<ProductionRequest>,
}

impl ProductionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request at the tail.
    pub fn push(&mut self, request: ProductionRequest) {
        self.requests.push_back(request);
    }

    /// Remove and return the head.
    pub fn pop(&mut self) -> Option<ProductionRequest> {
        self.requests.pop_front()
    }

    /// The head, without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&ProductionRequest> {
        self.requests.front()
    }

    /// Number of queued requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of queued requests for a role.
    #[must_use]
    pub fn count_role(&self, role: Role) -> usize {
        self.requests.iter().filter(|r| r.role == role).count()
    }

    /// Requests in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &ProductionRequest> {
        self.requests.iter()
    }
}

/// What one scheduler pump did.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PumpOutcome {
    /// There is no own base.
    NoBase,
    /// The base is producing; nothing was dequeued.
    Busy,
    /// The queue was empty.
    Idle,
    /// The head was handed to the base and accepted.
    Produced {
        /// Id of the new unit.
        unit: ObjectId,
        /// The fulfilled request.
        request: ProductionRequest,
        /// Generated name.
        name: String,
    },
    /// The head was handed to the base and refused. It is gone.
    Dropped {
        /// The dropped request.
        request: ProductionRequest,
        /// Host outcome.
        code: OutcomeCode,
    },
}

/// Hands queued requests to the base.
#[derive(Debug, Clone, Default)]
pub struct ProductionScheduler {
    queue: ProductionQueue,
    serial: u32,
}

impl ProductionScheduler {
    /// Create a scheduler with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The queue.
    #[must_use]
    pub const fn queue(&self) -> &ProductionQueue {
        &self.queue
    }

    /// Append a request.
    pub fn enqueue(&mut self, request: ProductionRequest) {
        tracing::debug!(role = ?request.role, tier = request.tier, "production request queued");
        self.queue.push(request);
    }

    /// Hand the head of the queue to the base if it is free.
    ///
    /// On success the new unit's memory (role, tier, name) is staged in
    /// `ledger`. Any refusal drops the request.
    pub fn pump(
        &mut self,
        base: Option<&BaseRecord>,
        api: &mut dyn ActionApi,
        ledger: &mut MemoryLedger,
        tick: u64,
    ) -> PumpOutcome {
        let Some(base) = base else {
            return PumpOutcome::NoBase;
        };
        if base.producing {
            return PumpOutcome::Busy;
        }
        let Some(request) = self.queue.pop() else {
            return PumpOutcome::Idle;
        };

        let body = request.body();
        let name = format!("{}-{}-{}", request.role.tag(), tick, self.serial);
        self.serial = self.serial.wrapping_add(1);

        match api.produce(&body, &name) {
            Ok(unit) => {
                ledger.stage(unit, UnitMemory::stamped(request.role, request.tier, name.clone()));
                tracing::info!(unit, %name, role = ?request.role, cost = body.cost(), "production started");
                PumpOutcome::Produced {
                    unit,
                    request,
                    name,
                }
            }
            Err(OutcomeCode::InsufficientResource) => {
                tracing::warn!(
                    role = ?request.role,
                    cost = body.cost(),
                    stored = base.structure.store.used,
                    "dropping production request, base cannot pay"
                );
                PumpOutcome::Dropped {
                    request,
                    code: OutcomeCode::InsufficientResource,
                }
            }
            Err(code) => {
                tracing::warn!(role = ?request.role, ?code, "dropping production request");
                PumpOutcome::Dropped { request, code }
            }
        }
    }
}

/// Enqueue policies.
#[derive(Debug, Clone, Copy)]
pub struct ProductionPlanner<'a> {
    snapshot: &'a WorldSnapshot,
    config: &'a EngineConfig,
}

impl<'a> ProductionPlanner<'a> {
    /// Create a planner over this tick's snapshot.
    #[must_use]
    pub const fn new(snapshot: &'a WorldSnapshot, config: &'a EngineConfig) -> Self {
        Self { snapshot, config }
    }

    fn affordable(base: &BaseRecord, request: &ProductionRequest) -> bool {
        base.structure.store.can_afford(request.cost())
    }

    /// Keep the harvester population on target.
    ///
    /// `elapsed` is the number of ticks since the engine started.
    pub fn plan_workers(&self, elapsed: u64, scheduler: &mut ProductionScheduler) -> Option<ProductionRequest> {
        let base = self.snapshot.own_base?;
        if base.producing {
            return None;
        }

        let target = self.config.worker_target(elapsed);
        let current = self
            .snapshot
            .own_units
            .iter()
            .filter(|unit| unit.memory.role == Role::Harvester)
            .count();
        let queued = scheduler.queue().count_role(Role::Harvester);
        if current + queued >= target {
            return None;
        }

        let request = ProductionRequest::new(Role::Harvester, self.config.worker_tier, self.snapshot.tick);
        if !Self::affordable(&base, &request) {
            tracing::trace!(cost = request.cost(), "harvester not affordable yet");
            return None;
        }
        scheduler.enqueue(request);
        Some(request)
    }

    /// Build up soldiers for every squad role that has no live squad.
    ///
    /// Only runs while the enemy has something visible.
    pub fn plan_soldiers(
        &self,
        active_roles: &BTreeSet<Role>,
        scheduler: &mut ProductionScheduler,
        ledger: &MemoryLedger,
    ) -> Vec<ProductionRequest> {
        let mut enqueued = Vec::new();
        let Some(base) = self.snapshot.own_base else {
            return enqueued;
        };
        if !self.snapshot.has_enemies() {
            return enqueued;
        }

        for &role in &self.config.squad_roles {
            if active_roles.contains(&role) {
                continue;
            }
            let idle = self
                .snapshot
                .own_units
                .iter()
                .filter(|unit| unit.memory.role == role)
                .filter(|unit| current_memory(unit, ledger).is_idle())
                .count();
            let queued = scheduler.queue().count_role(role);
            if idle + queued >= self.config.squad_threshold {
                continue;
            }

            let request = ProductionRequest::new(role, self.config.soldier_tier, self.snapshot.tick);
            if !Self::affordable(&base, &request) {
                continue;
            }
            scheduler.enqueue(request);
            enqueued.push(request);
        }
        enqueued
    }
}
