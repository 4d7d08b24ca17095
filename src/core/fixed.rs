//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the projectile simulation.
//! All tick-path operations use integer arithmetic only.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Squared distances across the arena do not fit in Q16.16, so they are
//! carried as [`WideFixed`] (Q16.16 stored in an `i64`).
//!
//! Angles are radians in Q16.16. `fixed_sin`, `fixed_cos` and `fixed_atan2`
//! are polynomial approximations (error below 0.002) that evaluate
//! identically on every platform.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Q16.16 value widened to i64 (squared distances, products of large values).
pub type WideFixed = i64;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

/// Maximum positive value
pub const FIXED_MAX: Fixed = i32::MAX;

/// Minimum negative value
pub const FIXED_MIN: Fixed = i32::MIN;

// =============================================================================
// ANGLE CONSTANTS (All as integer literals - NO float conversion!)
// =============================================================================

/// π = 3.14159265 * 65536 = 205887
pub const FIXED_PI: Fixed = 205887;

/// 2π = 411775
pub const FIXED_TWO_PI: Fixed = 411775;

/// π/2 = 102944
pub const FIXED_HALF_PI: Fixed = 102944;

/// π/4 = 51472
pub const FIXED_QUARTER_PI: Fixed = 51472;

/// π/6 = 34315 (default split fan angle)
pub const FIXED_SIXTH_PI: Fixed = 34315;

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a float to fixed-point.
///
/// # Warning
/// Only use at compile-time or configuration load. NEVER in tick loop.
///
/// # Example
/// ```
/// use tankwar::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display/logging.
///
/// # Warning
/// Only use for visual output. NEVER use result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Convert an integer to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two wide fixed-point numbers, saturating into `Fixed`.
///
/// Returns 0 on divide-by-zero.
#[inline]
pub fn wide_div(a: WideFixed, b: WideFixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let quotient = a.saturating_mul(FIXED_ONE as i64) / b;
    quotient.clamp(FIXED_MIN as i64, FIXED_MAX as i64) as Fixed
}

/// Floor of the integer square root, by Newton iteration.
pub(crate) fn isqrt_u64(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    // Power of two at or above the root
    let mut x = 1u64 << ((64 - n.leading_zeros() + 1) / 2);
    let mut y = (x + n / x) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Clamp into `[min, max]`. Never panics; `min` wins if the range is inverted.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    value.min(max).max(min)
}

/// Raise a fixed-point base to a small integer power.
#[inline]
pub fn fixed_pow(base: Fixed, exp: u32) -> Fixed {
    let mut result = FIXED_ONE;
    for _ in 0..exp {
        result = fixed_mul(result, base);
    }
    result
}

// =============================================================================
// ANGLES
// =============================================================================

/// Wrap an angle into (-π, π].
#[inline]
pub fn wrap_angle(angle: Fixed) -> Fixed {
    let r = angle.rem_euclid(FIXED_TWO_PI);
    if r > FIXED_PI { r - FIXED_TWO_PI } else { r }
}

/// Sine of an angle in radians.
///
/// Parabolic approximation with one refinement step.
pub fn fixed_sin(angle: Fixed) -> Fixed {
    // 4/π and -4/π²
    const B: Fixed = 83443;
    const C: Fixed = -26561;
    // Refinement weight 0.225
    const P: Fixed = 14746;

    let x = wrap_angle(angle);
    let y = fixed_mul(B, x) + fixed_mul(fixed_mul(C, x), fixed_abs(x));
    fixed_mul(P, fixed_mul(y, fixed_abs(y)) - y) + y
}

/// Cosine of an angle in radians.
#[inline]
pub fn fixed_cos(angle: Fixed) -> Fixed {
    fixed_sin(wrap_angle(angle).wrapping_add(FIXED_HALF_PI))
}

/// atan of a ratio in [0, 1].
fn atan_unit(a: Fixed) -> Fixed {
    // 0.2447 and 0.0663
    const K1: Fixed = 16037;
    const K2: Fixed = 4345;
    fixed_mul(FIXED_QUARTER_PI, a)
        + fixed_mul(fixed_mul(a, FIXED_ONE - a), K1 + fixed_mul(K2, a))
}

/// Angle of the vector (x, y) in (-π, π]. Returns 0 for the zero vector.
pub fn fixed_atan2(y: Fixed, x: Fixed) -> Fixed {
    if x == 0 && y == 0 {
        return 0;
    }
    let ax = (x as i64).abs();
    let ay = (y as i64).abs();

    let mut angle = if ax >= ay {
        atan_unit(((ay << FIXED_SCALE) / ax) as Fixed)
    } else {
        FIXED_HALF_PI - atan_unit(((ax << FIXED_SCALE) / ay) as Fixed)
    };

    if x < 0 {
        angle = FIXED_PI - angle;
    }
    if y < 0 {
        angle = -angle;
    }
    angle
}

// =============================================================================
// TESTS
// =============================================================================
