//! Error types.
//!
//! `SimError` covers faults raised while ticking a single entity; the
//! driver isolates them so one bad entity never stalls the world.
//! `ConfigError` covers loading and validating `SimConfig`.

use thiserror::Error;

use crate::core::fixed::{Fixed, to_float};
use crate::game::entity::EntityHandle;

/// Per-entity simulation faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Handle no longer refers to a live entity.
    #[error("stale target handle {0:?}")]
    StaleTarget(EntityHandle),

    /// A live handle does not hold the entity kind the caller needs.
    #[error("entity {0:?} is missing or has the wrong kind")]
    MissingEntity(EntityHandle),

    /// Entity left the representable world area.
    #[error("entity {handle:?} out of bounds at ({:.2}, {:.2})", coord(.x), coord(.y))]
    OutOfBounds {
        /// Offending entity.
        handle: EntityHandle,
        /// X position when the fault was raised.
        x: Fixed,
        /// Y position when the fault was raised.
        y: Fixed,
    },
}

fn coord(value: &Fixed) -> f32 {
    to_float(*value)
}

/// Configuration load errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for `SimConfig`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Values that cannot be repaired by clamping.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_out_of_bounds_message() {
        let err = SimError::OutOfBounds {
            handle: EntityHandle::default(),
            x: to_fixed(1.5),
            y: to_fixed(-2.0),
        };
        let msg = err.to_string();
        assert!(msg.contains("(1.50, -2.00)"), "{}", msg);
    }

    #[test]
    fn test_config_error_from_json() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ConfigError = parse.into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
