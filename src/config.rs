//! Simulation Configuration
//!
//! JSON-backed tuning for the simulation. Every section is optional in the
//! file; missing fields fall back to defaults. `Fixed` values are written as
//! decimal numbers and converted with `to_fixed` once, at load time.
//!
//! Malformed values are clamped rather than rejected (see
//! [`SimConfig::sanitize`]); only values with no safe clamp fail to load.

use std::fmt::Display;
use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed, to_float};
use crate::error::ConfigError;
use crate::game::barrel::{SplitParams, StatKind, StatScaling};

/// Deepest split generation any projectile may reach.
pub const MAX_SPLIT_DEPTH: u32 = 4;

/// Most children a single split may produce.
pub const MAX_SPLIT_BULLETS: u32 = 8;

/// Cap on composed slow (90%).
pub const MAX_SLOW: Fixed = to_fixed(0.9);

/// Environment variable holding the config file path.
pub const CONFIG_ENV: &str = "TANKWAR_CONFIG";

/// Serde adapter writing `Fixed` as a decimal number.
pub mod fixed_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed};

    /// Serialize as `f64`.
    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value as f64 / FIXED_ONE as f64)
    }

    /// Deserialize from any JSON number.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(to_fixed(value))
    }
}

// =============================================================================
// WARNINGS
// =============================================================================

/// A value that was clamped during sanitization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Dotted field path
    pub field: &'static str,
    /// What was changed
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: String) -> Self {
        warn!(field, %message, "config value clamped");
        Self { field, message }
    }
}

/// Clamp an integer field, recording a warning when it moves.
pub(crate) fn clamp_count<T: Ord + Copy + Display>(
    warnings: &mut Vec<ConfigWarning>,
    field: &'static str,
    value: &mut T,
    min: T,
    max: T,
) {
    let clamped = (*value).clamp(min, max);
    if clamped != *value {
        warnings.push(ConfigWarning::new(field, format!("{} -> {}", value, clamped)));
        *value = clamped;
    }
}

/// Clamp a fixed-point field, recording a warning when it moves.
pub(crate) fn clamp_fixed(
    warnings: &mut Vec<ConfigWarning>,
    field: &'static str,
    value: &mut Fixed,
    min: Fixed,
    max: Fixed,
) {
    let clamped = (*value).clamp(min, max);
    if clamped != *value {
        warnings.push(ConfigWarning::new(
            field,
            format!("{:.4} -> {:.4}", to_float(*value), to_float(clamped)),
        ));
        *value = clamped;
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

/// World geometry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Spatial grid cell edge (units)
    #[serde(with = "fixed_serde")]
    pub grid_cell_size: Fixed,
    /// Tanks are clamped to ±this on both axes
    #[serde(with = "fixed_serde")]
    pub arena_half_extent: Fixed,
    /// Projectiles beyond ±this fault
    #[serde(with = "fixed_serde")]
    pub position_limit: Fixed,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: to_fixed(25.0),
            arena_half_extent: to_fixed(1000.0),
            position_limit: to_fixed(30000.0),
        }
    }
}

/// Projectile physics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Velocity retained per tick
    #[serde(with = "fixed_serde")]
    pub friction: Fixed,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self { friction: to_fixed(0.9) }
    }
}

/// Drone motion tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    /// Resting zone radius around the owner (units)
    #[serde(with = "fixed_serde")]
    pub max_resting_radius: Fixed,
    /// Acceleration divisor while resting
    pub rest_accel_divisor: i32,
    /// Acceleration divisor while orbiting close to the owner
    pub orbit_close_accel_divisor: i32,
    /// Orbit radius as a multiple of the owner's size
    #[serde(with = "fixed_serde")]
    pub orbit_radius_factor: Fixed,
    /// Heading drift per resting tick
    #[serde(with = "fixed_serde")]
    pub rest_drift_base: Fixed,
    /// Extra drift per unit of normalized distance
    #[serde(with = "fixed_serde")]
    pub rest_drift_scale: Fixed,
    /// Target acquisition range around the owner (units)
    #[serde(with = "fixed_serde")]
    pub view_range: Fixed,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            max_resting_radius: to_fixed(40.0),
            rest_accel_divisor: 6,
            orbit_close_accel_divisor: 3,
            orbit_radius_factor: to_fixed(1.2),
            rest_drift_base: to_fixed(0.01),
            rest_drift_scale: to_fixed(0.012),
            view_range: to_fixed(125.0),
        }
    }
}

/// Status effect tuning.
///
/// The four scalers are independent on purpose: poison grows with bullet
/// stats, slow does not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Cap on composed slow
    #[serde(with = "fixed_serde")]
    pub max_slow: Fixed,
    /// Poison damage per tick
    pub poison_damage: StatScaling,
    /// Poison duration
    pub poison_duration: StatScaling,
    /// Slow ratio per stack
    pub slow_ratio: StatScaling,
    /// Slow duration
    pub slow_duration: StatScaling,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            max_slow: MAX_SLOW,
            poison_damage: StatScaling::new(StatKind::BulletDamage, to_fixed(0.42857)),
            poison_duration: StatScaling::new(StatKind::BulletPenetration, to_fixed(0.75)),
            slow_ratio: StatScaling::new(StatKind::BulletDamage, 0),
            slow_duration: StatScaling::new(StatKind::BulletPenetration, 0),
        }
    }
}

/// Split tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Parameters for splitter barrels
    pub defaults: SplitParams,
    /// Side of the square children are scattered in (units)
    #[serde(with = "fixed_serde")]
    pub jitter_extent: Fixed,
    /// Launch speed of children (units/tick)
    #[serde(with = "fixed_serde")]
    pub child_speed: Fixed,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            defaults: SplitParams::default(),
            jitter_extent: to_fixed(25.0),
            child_speed: to_fixed(5.0),
        }
    }
}

// =============================================================================
// SIM CONFIG
// =============================================================================

/// Complete simulation configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks per second for the realtime driver
    pub tick_rate: u32,
    /// World geometry
    pub world: WorldConfig,
    /// Projectile physics
    pub physics: PhysicsConfig,
    /// Drone motion
    pub drone: DroneConfig,
    /// Status effects
    pub effects: EffectsConfig,
    /// Splitting
    pub split: SplitConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::TICK_RATE,
            world: WorldConfig::default(),
            physics: PhysicsConfig::default(),
            drone: DroneConfig::default(),
            effects: EffectsConfig::default(),
            split: SplitConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!(path = %path.display(), "loaded simulation config");
        Ok(config)
    }

    /// Parse, sanitize and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: SimConfig = serde_json::from_str(json)?;
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `TANKWAR_CONFIG`, or defaults if unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(path),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Serialize as pretty JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp every bounded value into its safe range.
    ///
    /// Each clamp is logged at `warn` and returned.
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = self.split.defaults.sanitize();

        clamp_count(&mut warnings, "tick_rate", &mut self.tick_rate, 1, 1000);
        clamp_fixed(&mut warnings, "effects.max_slow", &mut self.effects.max_slow, 0, MAX_SLOW);
        clamp_fixed(&mut warnings, "physics.friction", &mut self.physics.friction, 0, FIXED_ONE);
        clamp_count(&mut warnings, "drone.rest_accel_divisor",
            &mut self.drone.rest_accel_divisor, 1, i32::MAX);
        clamp_count(&mut warnings, "drone.orbit_close_accel_divisor",
            &mut self.drone.orbit_close_accel_divisor, 1, i32::MAX);
        clamp_fixed(&mut warnings, "drone.max_resting_radius",
            &mut self.drone.max_resting_radius, 1, Fixed::MAX);
        clamp_fixed(&mut warnings, "split.jitter_extent",
            &mut self.split.jitter_extent, 0, Fixed::MAX);

        warnings
    }

    /// Reject values that have no safe clamp.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.grid_cell_size <= 0 {
            return Err(ConfigError::Invalid("world.grid_cell_size must be positive".into()));
        }
        if self.world.arena_half_extent <= 0
            || self.world.arena_half_extent > self.world.position_limit
        {
            return Err(ConfigError::Invalid(
                "world.arena_half_extent must be positive and within world.position_limit".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
