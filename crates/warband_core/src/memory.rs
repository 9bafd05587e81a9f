//! Persisted per-unit memory and the per-tick write ledger.
//!
//! The host stores one opaque blob per unit. The engine encodes a
//! [`UnitMemory`] into that blob with bincode.
//!
//! # Tick-boundary consistency
//!
//! Writes made while a tick is being processed are staged in a
//! [`MemoryLedger`] and only reach the host when the ledger is flushed at the
//! end of the tick. Reads of *other* units always go through the snapshot
//! captured at tick start, so no unit can observe another unit's same-tick
//! write. Within the ledger the last write for a unit wins.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::{BehaviorState, ObjectId, Role, SquadId};
use crate::error::{EngineError, Result};
use crate::host::MemoryStore;

/// Decoded memory of one unit.
///
/// The squad id and leader flag are private so that a leader always has a
/// squad.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitMemory {
    /// Role stamped at production time.
    pub role: Role,
    /// Tier the unit was produced at.
    pub tier: u8,
    /// Generated name.
    pub name: String,
    /// Behavioral state as of the last turn.
    pub state: BehaviorState,
    /// Current squad.
    squad: Option<SquadId>,
    /// Whether this unit leads its squad.
    leader: bool,
    /// Stored target (weak reference, re-resolved every tick).
    pub target: Option<ObjectId>,
    /// Set once the unit has lost a capability for good.
    pub crippled: bool,
}

impl UnitMemory {
    /// Memory stamped on a freshly produced unit.
    #[must_use]
    pub fn stamped(role: Role, tier: u8, name: impl Into<String>) -> Self {
        Self {
            role,
            tier,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Current squad, if any.
    #[must_use]
    pub const fn squad(&self) -> Option<SquadId> {
        self.squad
    }

    /// Whether this unit leads its squad.
    #[must_use]
    pub const fn is_leader(&self) -> bool {
        self.leader
    }

    /// Check if the unit belongs to no squad.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.squad.is_none()
    }

    /// Join a squad as a follower.
    pub fn join_squad(&mut self, squad: SquadId) {
        self.squad = Some(squad);
        self.leader = false;
        self.state = BehaviorState::Attacking;
    }

    /// Leave the current squad, clearing the leader flag.
    pub fn leave_squad(&mut self) {
        self.squad = None;
        self.leader = false;
    }

    /// Take the leader flag. Ignored when the unit has no squad.
    pub fn promote(&mut self) {
        self.leader = self.squad.is_some();
    }

    /// Drop the leader flag.
    pub fn demote(&mut self) {
        self.leader = false;
    }

    /// Encode into an opaque blob.
    pub fn encode(&self, unit: ObjectId) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| EngineError::MemoryEncode {
            unit,
            message: e.to_string(),
        })
    }

    /// Decode from an opaque blob.
    ///
    /// An empty blob is the memory of a unit nobody has stamped yet.
    pub fn decode(unit: ObjectId, blob: &[u8]) -> Result<Self> {
        if blob.is_empty() {
            return Ok(Self::default());
        }
        let mut memory: Self = bincode::deserialize(blob).map_err(|e| EngineError::MemoryDecode {
            unit,
            message: e.to_string(),
        })?;
        if memory.squad.is_none() {
            memory.leader = false;
        }
        Ok(memory)
    }
}

/// Memory writes staged during one tick.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    staged: BTreeMap<ObjectId, UnitMemory>,
    retired: BTreeSet<ObjectId>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a write. A later write for the same unit replaces it.
    pub fn stage(&mut self, unit: ObjectId, memory: UnitMemory) {
        self.staged.insert(unit, memory);
    }

    /// Staged memory for `unit`, if written this tick.
    #[must_use]
    pub fn get(&self, unit: ObjectId) -> Option<&UnitMemory> {
        self.staged.get(&unit)
    }

    /// Mark the record of `unit` for removal at flush. Wins over any staged
    /// write for the same unit.
    pub fn retire(&mut self, unit: ObjectId) {
        self.retired.insert(unit);
    }

    /// Check if `unit` is marked for removal.
    #[must_use]
    pub fn is_retired(&self, unit: ObjectId) -> bool {
        self.retired.contains(&unit)
    }

    /// Number of staged writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Check if nothing is staged or retired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.retired.is_empty()
    }

    /// Write every staged record to the host store in ascending id order,
    /// then drop retired records.
    ///
    /// Records that fail to encode are skipped and returned; the rest are
    /// still written.
    pub fn flush<S: MemoryStore + ?Sized>(&mut self, store: &mut S) -> Vec<EngineError> {
        let mut failures = Vec::new();
        let retired = std::mem::take(&mut self.retired);
        for (unit, memory) in std::mem::take(&mut self.staged) {
            if retired.contains(&unit) {
                continue;
            }
            match memory.encode(unit) {
                Ok(blob) => store.write(unit, blob),
                Err(err) => {
                    tracing::warn!(unit, error = %err, "dropping unencodable memory");
                    failures.push(err);
                }
            }
        }
        for unit in retired {
            store.remove(unit);
        }
        failures
    }
}
