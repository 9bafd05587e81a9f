//! Plain data shared by every decision module.
//!
//! Components are pure data with no behavior.

use serde::{Deserialize, Serialize};

/// Host-assigned identifier of any game object (unit, base, storage node).
pub type ObjectId = u64;

/// Identifier shared by all members of one squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SquadId(pub u64);

impl SquadId {
    /// Create a new squad ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Generate the id for the `seq`-th squad formed during `tick`.
    ///
    /// Ids derived this way never collide across ticks.
    #[must_use]
    pub const fn generate(tick: u64, seq: u16) -> Self {
        Self((tick << 16) | seq as u64)
    }
}

impl std::fmt::Display for SquadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "squad-{}", self.0)
    }
}

/// Fixed role of a unit, stamped into its memory at production time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Role {
    /// Gathers resource from storage nodes and delivers it to the base.
    Harvester,
    /// Melee fighter with a self-heal part.
    Attacker,
    /// Ranged fighter with a heal part.
    RangedAttacker,
    /// Unit without a stamped role; behavior is inferred from its body.
    #[default]
    Generic,
}

impl Role {
    /// Roles that fight and may form squads.
    #[must_use]
    pub const fn is_soldier(self) -> bool {
        matches!(self, Self::Attacker | Self::RangedAttacker)
    }

    /// Short tag used in generated unit names.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Harvester => "harvester",
            Self::Attacker => "attacker",
            Self::RangedAttacker => "ranged",
            Self::Generic => "unit",
        }
    }
}

/// Behavioral state of a soldier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Travelling to the rally point, healing on the way.
    #[default]
    Gathering,
    /// Engaging a target.
    Attacking,
    /// Holding the rally point and defending its vicinity.
    Guarding,
}

/// Resource store of a unit, base or storage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Store {
    /// Resource currently held.
    pub used: u32,
    /// Maximum resource the store can hold.
    pub capacity: u32,
}

impl Store {
    /// Create a new store.
    #[must_use]
    pub const fn new(used: u32, capacity: u32) -> Self {
        Self { used, capacity }
    }

    /// Free space left in the store.
    #[must_use]
    pub const fn free(&self) -> u32 {
        self.capacity.saturating_sub(self.used)
    }

    /// Check if the store cannot accept more resource.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.free() == 0
    }

    /// Check if the store holds nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Check if the store holds at least `cost`.
    #[must_use]
    pub const fn can_afford(&self, cost: u32) -> bool {
        self.used >= cost
    }
}
