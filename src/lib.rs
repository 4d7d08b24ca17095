//! # Tankwar Simulation Core
//!
//! Deterministic projectile, drone and status-effect simulation for a
//! multiplayer tank server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TANKWAR SERVER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Simulation (deterministic)                │
//! │  ├── world.rs    - Entity arena and event queue              │
//! │  ├── entity.rs   - Tanks, projectiles, capabilities          │
//! │  ├── projectile.rs - Projectile state machine                │
//! │  ├── ai.rs       - Drone motion controller                   │
//! │  ├── effect.rs   - Timed effect registry                     │
//! │  ├── status.rs   - Slow and poison                           │
//! │  ├── split.rs    - Split spawner                             │
//! │  ├── barrel.rs   - Barrels and projectile specs              │
//! │  ├── collision.rs- Spatial grid                              │
//! │  └── tick.rs     - Authoritative simulation loop             │
//! │                                                              │
//! │  config.rs       - JSON/env configuration                    │
//! │  error.rs        - Error types                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in the tick path
//! - No HashMap (BTreeMap and slot order for iteration)
//! - No system time dependencies; every duration is in ticks
//! - All randomness from seeded Xorshift128+
//!
//! Given identical inputs and RNG seed, the simulation produces
//! **identical state hashes** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod game;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use config::SimConfig;
pub use error::{ConfigError, SimError};
pub use game::{EntityHandle, InputFrame, TankInputBuffer, World};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
