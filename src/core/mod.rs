//! Core deterministic primitives.
//!
//! All types in this module are designed for perfect cross-platform determinism.
//! The simulation in `game/` uses nothing else for arithmetic, randomness
//! or state verification.

pub mod fixed;
pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, WideFixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateField, StateHash, StateHasher};
