//! Interfaces to the host simulation.
//!
//! The engine never touches the world directly. It reads a typed
//! [`Observation`] through [`WorldQuery`], commits decisions through
//! [`ActionApi`], and persists per-unit memory through [`MemoryStore`].
//! Any type implementing all three is a [`Host`] and can be driven by
//! [`Engine`](crate::engine::Engine).
//!
//! # Outcome codes
//!
//! Every action returns an [`OutcomeCode`] from a closed set. The engine
//! maps codes to [`ActionError`] with [`OutcomeCode::into_result`] and
//! handles each class locally to the acting unit.

use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::components::{ObjectId, Store};
use crate::error::ActionError;
use crate::math::{Direction, TilePos};

/// Result code of a host action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeCode {
    /// The action was scheduled.
    Ok,
    /// The target is too far away.
    NotInRange,
    /// Not enough resource.
    InsufficientResource,
    /// The destination cannot accept more.
    DestinationFull,
    /// The target does not exist or cannot be acted on.
    InvalidTarget,
    /// The unit lacks the required body part.
    MissingCapability,
    /// Anything else the host reports.
    Other,
}

impl OutcomeCode {
    /// Convert into the engine's error taxonomy.
    pub fn into_result(self) -> Result<(), ActionError> {
        match self {
            Self::Ok => Ok(()),
            Self::NotInRange => Err(ActionError::Range),
            Self::InsufficientResource => Err(ActionError::Resource),
            Self::DestinationFull => Err(ActionError::Capacity),
            Self::InvalidTarget => Err(ActionError::InvalidTarget),
            Self::MissingCapability => Err(ActionError::Capability),
            Self::Other => Err(ActionError::Unknown),
        }
    }

    /// Check if the code reports success.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// A unit as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Host-assigned id.
    pub id: ObjectId,
    /// Current tile.
    pub position: TilePos,
    /// Current hit points.
    pub hits: u32,
    /// Maximum hit points.
    pub hits_max: u32,
    /// Equipment.
    pub body: Body,
    /// Carried resource.
    pub cargo: Store,
    /// Whether the unit is still being produced.
    pub spawning: bool,
}

/// A structure as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureRecord {
    /// Host-assigned id.
    pub id: ObjectId,
    /// Tile occupied by the structure.
    pub position: TilePos,
    /// Stored resource.
    pub store: Store,
}

/// The production facility of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRecord {
    /// The base structure.
    pub structure: StructureRecord,
    /// Whether the base is busy producing a unit.
    pub producing: bool,
}

/// Everything the host lets us see this tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Current host tick.
    pub tick: u64,
    /// Width and height of the map in tiles.
    pub map_size: (i32, i32),
    /// Units we control.
    pub own_units: Vec<UnitRecord>,
    /// Visible enemy units.
    pub enemy_units: Vec<UnitRecord>,
    /// Our base, if it still stands.
    pub own_base: Option<BaseRecord>,
    /// The enemy base, if visible.
    pub enemy_base: Option<StructureRecord>,
    /// Resource-bearing storage nodes.
    pub storages: Vec<StructureRecord>,
}

/// Read-only world query service.
pub trait WorldQuery {
    /// Observe the world as of the current tick.
    fn observe(&self) -> Observation;
}

/// Per-unit action primitives.
///
/// Each call is a one-shot, world-mutating request; the returned code says
/// whether the host accepted it.
pub trait ActionApi {
    /// Move one step along a path toward `to`.
    fn move_toward(&mut self, unit: ObjectId, to: TilePos) -> OutcomeCode;

    /// Move one step in a fixed direction.
    fn step(&mut self, unit: ObjectId, direction: Direction) -> OutcomeCode;

    /// Melee attack.
    fn attack(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode;

    /// Ranged attack.
    fn ranged_attack(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode;

    /// Heal an adjacent unit (or self).
    fn heal(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode;

    /// Heal a unit at range.
    fn ranged_heal(&mut self, unit: ObjectId, target: ObjectId) -> OutcomeCode;

    /// Withdraw resource from a storage node into the unit's cargo.
    fn withdraw(&mut self, unit: ObjectId, source: ObjectId) -> OutcomeCode;

    /// Transfer all carried resource into a structure.
    fn transfer(&mut self, unit: ObjectId, destination: ObjectId) -> OutcomeCode;

    /// Ask the own base to produce a unit.
    ///
    /// Returns the id the new unit will carry.
    fn produce(&mut self, body: &Body, name: &str) -> Result<ObjectId, OutcomeCode>;
}

/// Opaque per-unit memory, owned by the host.
pub trait MemoryStore {
    /// Read the blob stored for `unit`.
    fn read(&self, unit: ObjectId) -> Option<Vec<u8>>;

    /// Replace the blob stored for `unit`.
    fn write(&mut self, unit: ObjectId, blob: Vec<u8>);

    /// Ids that currently have a blob, in ascending order.
    fn ids(&self) -> Vec<ObjectId>;

    /// Drop the blob stored for `unit`. Absent ids are ignored.
    fn remove(&mut self, unit: ObjectId);
}

/// A complete host.
pub trait Host: WorldQuery + ActionApi + MemoryStore {}

impl<T: WorldQuery + ActionApi + MemoryStore> Host for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(OutcomeCode::Ok.into_result(), Ok(()));
        assert_eq!(OutcomeCode::NotInRange.into_result(), Err(ActionError::Range));
        assert_eq!(
            OutcomeCode::InsufficientResource.into_result(),
            Err(ActionError::Resource)
        );
        assert_eq!(
            OutcomeCode::DestinationFull.into_result(),
            Err(ActionError::Capacity)
        );
        assert_eq!(
            OutcomeCode::InvalidTarget.into_result(),
            Err(ActionError::InvalidTarget)
        );
        assert_eq!(
            OutcomeCode::MissingCapability.into_result(),
            Err(ActionError::Capability)
        );
        assert_eq!(OutcomeCode::Other.into_result(), Err(ActionError::Unknown));
    }
}
