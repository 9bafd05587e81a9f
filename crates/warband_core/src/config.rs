//! Engine tuning, loaded from RON.
//!
//! Every field has a default, so a config file only needs to name the values
//! it changes.
//!
//! # Example RON
//!
//! ```ron
//! EngineConfig(
//!     squad_threshold: 5,
//!     squad_min: 2,
//!     squad_roles: [RangedAttacker, Attacker],
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::components::Role;
use crate::error::{EngineError, Result};
use crate::math::{fixed_serde, Fixed};

/// Base value of each target class in the weighted-priority score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleWeights {
    /// Enemy production facility.
    pub facility: i32,
    /// Units carrying a heal part.
    pub healer: i32,
    /// Units carrying cargo or work parts.
    pub worker: i32,
    /// Plain attackers.
    pub attacker: i32,
    /// Anything else.
    pub other: i32,
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            facility: 5,
            healer: 3,
            worker: 5,
            attacker: 2,
            other: 0,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Range at which an idle soldier notices an enemy and starts attacking.
    pub detection_radius: u32,
    /// Range within which a follower engages the leader's target.
    pub follow_range: u32,
    /// Range within which an understrength squad recruits idle units.
    pub recruit_range: u32,
    /// Range around the rally point that counts as "at the rally point".
    pub rally_radius: u32,
    /// Distance of the rally point from the base, per axis.
    pub rally_offset: i32,
    /// Range a guarding soldier defends around itself.
    pub guard_radius: u32,
    /// Idle units at the rally point needed to form a squad.
    pub squad_threshold: usize,
    /// Live members below which a squad disbands.
    pub squad_min: usize,
    /// Maximum members a squad accepts through recruitment or rejoining.
    pub squad_capacity: usize,
    /// Whether disbanded units look for another squad of their role.
    pub rejoin_after_disband: bool,
    /// Roles that form squads and receive reinforcements.
    pub squad_roles: Vec<Role>,
    /// Score penalty per tile of distance.
    #[serde(with = "fixed_serde")]
    pub distance_weight: Fixed,
    /// Base value of each target class.
    pub role_weights: RoleWeights,
    /// Harvester population at tick 0.
    pub base_workers: usize,
    /// Ticks between each extra harvester of target population.
    pub worker_growth_interval: u64,
    /// Largest harvester population the planner aims for.
    pub max_workers: usize,
    /// Tier requested for harvesters.
    pub worker_tier: u8,
    /// Tier requested for soldiers.
    pub soldier_tier: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detection_radius: 3,
            follow_range: 5,
            recruit_range: 10,
            rally_radius: 2,
            rally_offset: 3,
            guard_radius: 8,
            squad_threshold: 4,
            squad_min: 2,
            squad_capacity: 4,
            rejoin_after_disband: true,
            squad_roles: vec![Role::RangedAttacker],
            distance_weight: Fixed::from_num(0.5),
            role_weights: RoleWeights::default(),
            base_workers: 3,
            worker_growth_interval: 600,
            max_workers: 6,
            worker_tier: 1,
            soldier_tier: 1,
        }
    }
}

impl EngineConfig {
    /// Parse a config from a RON string and validate it.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(source).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        if self.squad_threshold == 0 {
            return Err(EngineError::InvalidConfig(
                "squad_threshold must be at least 1".to_string(),
            ));
        }
        if self.squad_min > self.squad_threshold {
            return Err(EngineError::InvalidConfig(format!(
                "squad_min ({}) exceeds squad_threshold ({})",
                self.squad_min, self.squad_threshold
            )));
        }
        if self.squad_capacity < self.squad_threshold {
            return Err(EngineError::InvalidConfig(format!(
                "squad_capacity ({}) is below squad_threshold ({})",
                self.squad_capacity, self.squad_threshold
            )));
        }
        if self.distance_weight < Fixed::ZERO {
            return Err(EngineError::InvalidConfig(
                "distance_weight must not be negative".to_string(),
            ));
        }
        if self.squad_roles.iter().any(|role| !role.is_soldier()) {
            return Err(EngineError::InvalidConfig(
                "squad_roles may only contain soldier roles".to_string(),
            ));
        }
        if self.worker_growth_interval == 0 {
            return Err(EngineError::InvalidConfig(
                "worker_growth_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Harvester population the planner aims for at `tick`.
    #[must_use]
    pub fn worker_target(&self, tick: u64) -> usize {
        let grown = usize::try_from(tick / self.worker_growth_interval).unwrap_or(usize::MAX);
        self.base_workers
            .saturating_add(grown)
            .min(self.max_workers.max(self.base_workers))
    }
}
