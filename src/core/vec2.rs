//! Fixed-point 2D vectors.
//!
//! Positions, velocities and offsets in world units. Component add/sub
//! wrap instead of panicking; out-of-range entities are caught by the
//! bounds check in the projectile tick, not here.

use std::fmt;
use std::ops::{Add, Sub};
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, WideFixed, FIXED_SCALE,
    fixed_mul, fixed_sin, fixed_cos, fixed_atan2, isqrt_u64, to_float,
};

/// 2D vector with Q16.16 components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component
    pub x: Fixed,
    /// Y component
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Vector from raw fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Vector from whole world units.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Unit vector along `angle` (radians).
    #[inline]
    pub fn from_angle(angle: Fixed) -> Self {
        Self {
            x: fixed_cos(angle),
            y: fixed_sin(angle),
        }
    }

    /// Heading of this vector in (-π, π].
    #[inline]
    pub fn angle(self) -> Fixed {
        fixed_atan2(self.y, self.x)
    }

    /// Multiply both components by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Squared length in widened precision. Never wraps.
    #[inline]
    pub fn length_squared_wide(self) -> WideFixed {
        let x = self.x as i64;
        let y = self.y as i64;
        (x * x + y * y) >> FIXED_SCALE
    }

    /// Squared distance to `other`. Never wraps.
    #[inline]
    pub fn distance_squared(self, other: Self) -> WideFixed {
        (self - other).length_squared_wide()
    }

    /// Magnitude, floored to the nearest raw unit.
    pub fn length(self) -> Fixed {
        // sqrt(x² + y²) on raw components is already Q16.16
        let x = (self.x as i64).unsigned_abs();
        let y = (self.y as i64).unsigned_abs();
        isqrt_u64(x * x + y * y).min(Fixed::MAX as u64) as Fixed
    }

    /// Same direction, length `len`. ZERO stays ZERO.
    pub fn with_length(self, len: Fixed) -> Self {
        let current = self.length() as i64;
        if current == 0 {
            return Self::ZERO;
        }
        Self {
            x: (self.x as i64 * len as i64 / current) as Fixed,
            y: (self.y as i64 * len as i64 / current) as Fixed,
        }
    }

    /// Unit vector in the same direction. ZERO stays ZERO.
    #[inline]
    pub fn normalize(self) -> Self {
        self.with_length(1 << FIXED_SCALE)
    }
}

impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x.wrapping_add(rhs.x),
            y: self.y.wrapping_add(rhs.y),
        }
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(rhs.x),
            y: self.y.wrapping_sub(rhs.y),
        }
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec2({:.3}, {:.3})", to_float(self.x), to_float(self.y))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_HALF_PI, FIXED_ONE, FIXED_PI};

    #[test]
    fn test_vec2_add_sub() {
        let a = FixedVec2::new(to_fixed(3.0), to_fixed(4.0));
        let b = FixedVec2::new(to_fixed(1.0), to_fixed(2.0));
        assert_eq!(a + b, FixedVec2::new(to_fixed(4.0), to_fixed(6.0)));
        assert_eq!(a - b, FixedVec2::new(to_fixed(2.0), to_fixed(2.0)));
    }

    #[test]
    fn test_vec2_length_exact() {
        // 3-4-5 triangle
        let v = FixedVec2::new(to_fixed(3.0), to_fixed(4.0));
        assert_eq!(v.length(), to_fixed(5.0));
        // Would wrap with a Q16.16 squared length
        assert_eq!(FixedVec2::from_ints(300, 400).length(), to_fixed(500.0));
    }

    #[test]
    fn test_vec2_wide_distance_does_not_wrap() {
        let a = FixedVec2::from_ints(-300, -300);
        let b = FixedVec2::from_ints(300, 300);
        // 600² + 600² = 720000, far beyond Q16.16 range
        assert_eq!(a.distance_squared(b), 720_000 * FIXED_ONE as i64);
    }

    #[test]
    fn test_vec2_with_length() {
        let v = FixedVec2::from_ints(4, 0);
        assert_eq!(v.with_length(to_fixed(2.0)), FixedVec2::from_ints(2, 0));
        let unit = FixedVec2::new(to_fixed(3.0), to_fixed(4.0)).normalize();
        assert!((unit.x - to_fixed(0.6)).abs() <= 1);
        assert!((unit.y - to_fixed(0.8)).abs() <= 1);
        assert_eq!(FixedVec2::ZERO.normalize(), FixedVec2::ZERO);
        assert_eq!(FixedVec2::ZERO.with_length(FIXED_ONE), FixedVec2::ZERO);
    }

    #[test]
    fn test_vec2_from_angle_round_trips() {
        let up = FixedVec2::from_angle(FIXED_HALF_PI);
        assert!(up.x.abs() < 200);
        assert!((up.y - FIXED_ONE).abs() < 200);
        assert!((up.angle() - FIXED_HALF_PI).abs() < 300);

        let left = FixedVec2::from_angle(FIXED_PI);
        assert!((left.x + FIXED_ONE).abs() < 200);
    }
}
