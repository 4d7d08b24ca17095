//! Game Logic Module
//!
//! All simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `world`: Entity arena, tick counter, event queue
//! - `entity`: Tank/projectile variants and capability traits
//! - `input`: Pilot input, normalization, recording
//! - `barrel`: Barrel definitions, stat scaling, firing
//! - `projectile`: Projectile lifecycle and per-tick state machine
//! - `ai`: Drone motion controller
//! - `effect`: Handle-keyed registry of timed effects
//! - `status`: Slow and poison behaviors
//! - `split`: Recursive split spawner
//! - `collision`: Spatial grid and circle tests
//! - `tick`: Authoritative simulation loop
//! - `events`: Game events for replay/verification

pub mod ai;
pub mod barrel;
pub mod collision;
pub mod effect;
pub mod entity;
pub mod events;
pub mod input;
pub mod projectile;
pub mod split;
pub mod status;
pub mod tick;
pub mod world;

// Re-export key types
pub use ai::{AiController, AiMotionState};
pub use barrel::{BarrelDefinition, Payload, ProjectileSpec, SplitParams, StatLevels};
pub use collision::{CollisionIndex, SpatialGrid};
pub use effect::{EffectKind, EffectRegistry, StatusEffect};
pub use entity::{DestroyCause, Entity, EntityHandle, TankBody, TeamId};
pub use events::{GameEvent, GameEventData};
pub use input::{InputFrame, TankInputBuffer, MOVE_LUT};
pub use projectile::{Projectile, ProjectilePhase};
pub use tick::{tick, replay, TickResult};
pub use world::World;
