//! # Warband Core
//!
//! Per-tick decision engine for autonomous unit squads.
//!
//! This crate contains **only** decision logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math (uses fixed-point)
//!
//! The world, the action primitives and per-unit memory are reached through
//! the traits in [`host`]. Every tick, [`engine::Engine::advance`] reads a
//! snapshot, decides one turn per unit, runs the production scheduler and
//! commits memory writes at the tick boundary.
//!
//! ## Crate Structure
//!
//! - [`host`] - Host traits and observation records
//! - [`snapshot`] - Immutable per-tick world view
//! - [`behavior`] - Unit state machine and role dispatch
//! - [`combat`] - Role capability kits
//! - [`economy`] - Harvester resource cycle
//! - [`squad`] - Squad formation, disband and leader election
//! - [`targeting`] - Target selection strategies
//! - [`production`] - Production queue, scheduler and planner
//! - [`engine`] - Tick orchestrator
//! - [`visual`] - Debug overlay

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behavior;
pub mod body;
pub mod combat;
pub mod components;
pub mod config;
pub mod economy;
pub mod engine;
pub mod error;
pub mod host;
pub mod math;
pub mod memory;
pub mod production;
pub mod snapshot;
pub mod squad;
pub mod targeting;
pub mod visual;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::behavior::{Action, Turn};
    pub use crate::body::{Body, PartKind};
    pub use crate::components::*;
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Engine, TickReport};
    pub use crate::error::{ActionError, EngineError, Result};
    pub use crate::host::{
        ActionApi, BaseRecord, Host, MemoryStore, Observation, OutcomeCode, StructureRecord,
        UnitRecord, WorldQuery,
    };
    pub use crate::math::{Direction, Fixed, TilePos};
    pub use crate::memory::UnitMemory;
    pub use crate::production::{ProductionQueue, ProductionRequest, PumpOutcome};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::targeting::{ChebyshevRange, PathCost};
    pub use crate::visual::{DrawCommand, Overlay, VisualSink};
}
