//! Seeded randomness for the simulation.
//!
//! Xorshift128+ seeded through SplitMix64. The world owns the only
//! instance and draws from it in tick order, so split jitter is identical
//! between a live run and its replay.

use serde::{Deserialize, Serialize};

use super::fixed::{Fixed, FIXED_ONE};
use super::hash::StateHasher;
use super::vec2::FixedVec2;

/// Xorshift128+ generator.
///
/// ```
/// use tankwar::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    lo: u64,
    hi: u64,
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Seed a generator. Weak seeds (0, 1, 2...) are spread by SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut cursor = seed;
        let lo = splitmix64(&mut cursor);
        let hi = splitmix64(&mut cursor);
        // All-zero state would be a fixed point
        if lo == 0 && hi == 0 {
            return Self { lo: 1, hi: 1 };
        }
        Self { lo, hi }
    }

    /// Next raw 64-bit draw.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.lo;
        let s1 = self.hi ^ s0;
        let out = s0.wrapping_add(self.hi);
        self.lo = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.hi = s1.rotate_left(37);
        out
    }

    /// Uniform `Fixed` in `[0, 1)`.
    #[inline]
    pub fn next_unit(&mut self) -> Fixed {
        // Top 16 bits are the fractional part
        (self.next_u64() >> 48) as Fixed
    }

    /// Uniform `Fixed` in `[min, max)`; `min` when the range is empty.
    pub fn fixed_between(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if min >= max {
            return min;
        }
        let span = max as i64 - min as i64;
        let offset = (span * self.next_unit() as i64) / FIXED_ONE as i64;
        (min as i64 + offset) as Fixed
    }

    /// Offset inside a square of side `extent` centred on the origin.
    pub fn jitter(&mut self, extent: Fixed) -> FixedVec2 {
        let half = extent.max(0) >> 1;
        let x = self.fixed_between(-half, half);
        let y = self.fixed_between(-half, half);
        FixedVec2::new(x, y)
    }

    /// Feed the generator position into a world digest.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.field(self.lo).field(self.hi);
    }
}

fn splitmix64(cursor: &mut u64) -> u64 {
    *cursor = cursor.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *cursor;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = DeterministicRng::new(12345);
        let mut b = DeterministicRng::new(12345);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        assert_ne!(DeterministicRng::new(1), DeterministicRng::new(2));
    }

    #[test]
    fn test_unit_range() {
        let mut rng = DeterministicRng::new(31);
        for _ in 0..1000 {
            let v = rng.next_unit();
            assert!((0..FIXED_ONE).contains(&v));
        }
    }

    #[test]
    fn test_fixed_between() {
        let mut rng = DeterministicRng::new(9999);
        let min = to_fixed(-12.5);
        let max = to_fixed(12.5);
        for _ in 0..1000 {
            let v = rng.fixed_between(min, max);
            assert!(v >= min && v < max);
        }
        assert_eq!(rng.fixed_between(max, min), max);
    }

    #[test]
    fn test_jitter_bounded() {
        let mut rng = DeterministicRng::new(7777);
        let extent = to_fixed(25.0);
        for _ in 0..500 {
            let offset = rng.jitter(extent);
            assert!(offset.x.abs() <= extent / 2);
            assert!(offset.y.abs() <= extent / 2);
        }
        assert_eq!(rng.jitter(0), FixedVec2::ZERO);
        assert_eq!(rng.jitter(-5), FixedVec2::ZERO);
    }

    #[test]
    fn test_draws_change_digest() {
        let digest = |rng: &DeterministicRng| {
            let mut hasher = StateHasher::for_world_state();
            rng.hash_into(&mut hasher);
            hasher.finalize()
        };
        let mut rng = DeterministicRng::new(5);
        let before = digest(&rng);
        rng.jitter(to_fixed(4.0));
        assert_ne!(before, digest(&rng));
    }
}
