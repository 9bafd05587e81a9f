//! Error types for the decision engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::ObjectId;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for engine setup and memory handling.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Failed to parse a configuration file.
    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    /// Configuration values are inconsistent.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The world has no base owned by us.
    #[error("No own base in the world observation")]
    MissingBase,

    /// A unit memory blob could not be decoded.
    #[error("Failed to decode memory of unit {unit}: {message}")]
    MemoryDecode {
        /// Unit whose blob is corrupt.
        unit: ObjectId,
        /// Decoder message.
        message: String,
    },

    /// A unit memory record could not be encoded.
    #[error("Failed to encode memory of unit {unit}: {message}")]
    MemoryEncode {
        /// Unit whose record failed to encode.
        unit: ObjectId,
        /// Encoder message.
        message: String,
    },

    /// A unit's decision failed in an unrecoverable way for this tick.
    #[error("Unit {unit} action failed: {source}")]
    Action {
        /// Unit that was acting.
        unit: ObjectId,
        /// Classified action failure.
        #[source]
        source: ActionError,
    },
}

/// Classified failure of a single host action.
///
/// Every variant is unit-local and non-fatal; the behavior layer decides
/// how each one is recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ActionError {
    /// Target is out of operational range.
    #[error("target out of range")]
    Range,
    /// Not enough resource at the source or for production.
    #[error("insufficient resource")]
    Resource,
    /// Destination store is full.
    #[error("destination full")]
    Capacity,
    /// Unit lacks the body part the action needs.
    #[error("missing capability")]
    Capability,
    /// Referenced object no longer resolves.
    #[error("invalid target")]
    InvalidTarget,
    /// Unrecognized outcome.
    #[error("unknown outcome")]
    Unknown,
}

impl ActionError {
    /// Check if the failure is permanent for the unit's lifetime.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Capability)
    }
}
