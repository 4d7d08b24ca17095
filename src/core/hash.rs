//! World state digests.
//!
//! Two runs fed the same seed and inputs must produce the same digest, so
//! every value is written in a fixed byte layout (little-endian) and in the
//! order the caller visits it.

use sha2::{Digest, Sha256};
use slotmap::Key;

use super::fixed::Fixed;
use super::vec2::FixedVec2;
use crate::game::entity::EntityHandle;

/// SHA-256 digest of a world.
pub type StateHash = [u8; 32];

const WORLD_DOMAIN: &[u8] = b"TANKWAR_WORLD_V1";

/// A value with a canonical byte encoding for state digests.
pub trait StateField {
    /// Feed the encoded bytes to `sha`.
    fn write_to(&self, sha: &mut Sha256);
}

impl StateField for u8 {
    fn write_to(&self, sha: &mut Sha256) {
        sha.update([*self]);
    }
}

impl StateField for bool {
    fn write_to(&self, sha: &mut Sha256) {
        (*self as u8).write_to(sha);
    }
}

impl StateField for u32 {
    fn write_to(&self, sha: &mut Sha256) {
        sha.update(self.to_le_bytes());
    }
}

impl StateField for u64 {
    fn write_to(&self, sha: &mut Sha256) {
        sha.update(self.to_le_bytes());
    }
}

// `Fixed` is an alias for i32
impl StateField for Fixed {
    fn write_to(&self, sha: &mut Sha256) {
        sha.update(self.to_le_bytes());
    }
}

impl StateField for FixedVec2 {
    fn write_to(&self, sha: &mut Sha256) {
        self.x.write_to(sha);
        self.y.write_to(sha);
    }
}

/// Slot index and version packed together, so a recycled slot hashes
/// differently from its previous occupant.
impl StateField for EntityHandle {
    fn write_to(&self, sha: &mut Sha256) {
        self.data().as_ffi().write_to(sha);
    }
}

impl<T: StateField> StateField for Option<T> {
    fn write_to(&self, sha: &mut Sha256) {
        match self {
            Some(value) => {
                true.write_to(sha);
                value.write_to(sha);
            }
            None => false.write_to(sha),
        }
    }
}

/// Incremental digest builder.
pub struct StateHasher {
    sha: Sha256,
}

impl StateHasher {
    /// Start a digest tagged with `domain`.
    pub fn new(domain: &[u8]) -> Self {
        let mut sha = Sha256::new();
        sha.update(domain);
        Self { sha }
    }

    /// Start a world digest.
    pub fn for_world_state() -> Self {
        Self::new(WORLD_DOMAIN)
    }

    /// Append one value.
    #[inline]
    pub fn field<T: StateField>(&mut self, value: T) -> &mut Self {
        value.write_to(&mut self.sha);
        self
    }

    /// Finish the digest.
    pub fn finalize(self) -> StateHash {
        self.sha.finalize().into()
    }
}

/// Digest of a world at `tick`, seeded with `rng_seed`.
///
/// Tick and seed always lead; `add_state` appends everything else.
pub fn compute_state_hash<F>(tick: u32, rng_seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_world_state();
    hasher.field(tick).field(rng_seed);
    add_state(&mut hasher);
    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================
