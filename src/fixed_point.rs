//! 17.14 signed fixed-point arithmetic for the MLFQ scheduler (spec §4.1).
//!
//! Grounded on `original_source/threads/fixed-point.c`: the representation,
//! the rounding contract, and the share-division identity all match the
//! original's `fu_*` functions, renamed to idiomatic Rust and expressed as
//! an arithmetic type rather than free functions over `int64_t`.

use core::ops::{Add, Sub};

/// Fractional bits of the fixed-point representation.
const FRAC_BITS: i32 = 14;
/// `1 << FRAC_BITS`, the scale factor separating the integer and
/// fractional parts.
const SCALE: i64 = 1 << FRAC_BITS;

/// A signed 17.14 fixed-point number, backed by an `i64` intermediate so
/// that `fp * fp` cannot overflow the `i32` the original used for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fp(i64);

impl Fp {
    pub const ZERO: Fp = Fp(0);

    /// Promote an integer to fixed-point (`fu_introduce`).
    pub const fn from_int(n: i32) -> Self {
        Fp((n as i64) * SCALE)
    }

    /// Truncate toward zero to an integer (`fu_extract` without rounding,
    /// i.e. the `x / SCALE` half of the original's rounding division).
    pub const fn trunc(self) -> i32 {
        (self.0 / SCALE) as i32
    }

    /// Round to the nearest integer, half away from zero (`fu_extract`).
    ///
    /// Mirrors `fu_rounding_division(x, MULTIPLICATION, false)`: add half
    /// the divisor before truncating, with the half-step signed the same
    /// way as the numerator.
    pub const fn round(self) -> i32 {
        round_div(self.0, SCALE) as i32
    }

    /// Truncate toward negative infinity (the MLFQ priority formula's
    /// rounding rule, spec §4.8 — distinct from [`Fp::trunc`], which
    /// truncates toward zero).
    pub const fn floor(self) -> i32 {
        self.0.div_euclid(SCALE) as i32
    }

    /// `self + other`, native on the fixed-point representation.
    pub const fn add(self, other: Fp) -> Fp {
        Fp(self.0 + other.0)
    }

    /// `self - other`, native on the fixed-point representation.
    pub const fn sub(self, other: Fp) -> Fp {
        Fp(self.0 - other.0)
    }

    /// `self + n` for a plain integer.
    pub const fn add_int(self, n: i32) -> Fp {
        Fp(self.0 + (n as i64) * SCALE)
    }

    /// `self * n` for a plain integer.
    pub const fn mul_int(self, n: i32) -> Fp {
        Fp(self.0 * n as i64)
    }

    /// `self / n` for a plain integer divisor. `n == 0` is a programming
    /// error per spec §4.1.
    pub fn div_int(self, n: i32) -> Fp {
        assert!(n != 0, "fixed-point division by zero");
        Fp(self.0 / n as i64)
    }

    /// `self * other`, computed through a 64-bit intermediate (`fu_*` uses
    /// `int64_t` for exactly this reason).
    pub fn mul_fp(self, other: Fp) -> Fp {
        let product = (self.0 as i128) * (other.0 as i128);
        let scaled = product / SCALE as i128;
        assert!(
            scaled >= i64::MIN as i128 && scaled <= i64::MAX as i128,
            "fixed-point multiply overflowed the 64-bit intermediate"
        );
        Fp(scaled as i64)
    }

    /// `self / other`, computed through a 64-bit intermediate.
    pub fn div_fp(self, other: Fp) -> Fp {
        assert!(other.0 != 0, "fixed-point division by zero");
        let numerator = (self.0 as i128) * SCALE as i128;
        let result = numerator / other.0 as i128;
        assert!(
            result >= i64::MIN as i128 && result <= i64::MAX as i128,
            "fixed-point division overflowed the 64-bit intermediate"
        );
        Fp(result as i64)
    }

    /// The `(a + (b/c))` identity from `fu_share_division`, used by MLFQ's
    /// `recent_cpu = (2*load_avg)/(2*load_avg+1) * recent_cpu + nice` update
    /// where `nice` is a plain integer sharing the same fixed-point scale.
    pub fn share_div(self, y: Fp, n: i32) -> Fp {
        assert!(n != 0, "fixed-point division by zero");
        Fp(round_div(self.0 * n as i64 + y.0, n as i64))
    }
}

/// `(x + sign(x)*y/2) / y`, truncated toward zero — the rounding contract
/// from spec §4.1, shared by `round` and `share_div`.
const fn round_div(x: i64, y: i64) -> i64 {
    if x >= 0 {
        (x + y / 2) / y
    } else {
        (x - y / 2) / y
    }
}

impl Add for Fp {
    type Output = Fp;
    fn add(self, rhs: Fp) -> Fp {
        Fp::add(self, rhs)
    }
}

impl Sub for Fp {
    type Output = Fp;
    fn sub(self, rhs: Fp) -> Fp {
        Fp::sub(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_for_integers() {
        for x in [-1_000_000, -1, 0, 1, 31, 63, 1_000_000] {
            assert_eq!(Fp::from_int(x).trunc(), x);
            assert_eq!(Fp::from_int(x).round(), x);
        }
    }

    #[test]
    fn round_half_away_from_zero() {
        // 14/4 = 3.5 -> rounds to 4; -14/4 = -3.5 -> rounds to -4.
        let x = Fp::from_int(14).div_int(4);
        assert_eq!(x.round(), 4);
        let y = Fp::from_int(-14).div_int(4);
        assert_eq!(y.round(), -4);
    }

    #[test]
    fn trunc_discards_fraction_toward_zero() {
        let x = Fp::from_int(7).div_int(2); // 3.5
        assert_eq!(x.trunc(), 3);
        let y = Fp::from_int(-7).div_int(2); // -3.5
        assert_eq!(y.trunc(), -3);
    }

    #[test]
    fn mul_fp_uses_wide_intermediate() {
        let a = Fp::from_int(100_000);
        let b = Fp::from_int(2);
        assert_eq!(a.mul_fp(b).trunc(), 200_000);
    }

    #[test]
    fn div_fp_basic() {
        let a = Fp::from_int(10);
        let b = Fp::from_int(4);
        assert_eq!(a.div_fp(b).round(), 3); // 2.5 -> 3, away from zero
    }

    #[test]
    fn share_div_matches_add_then_divide() {
        // (a + b/c) with c=1 should equal a + b exactly.
        let a = Fp::from_int(5);
        let b = Fp::from_int(3);
        assert_eq!(a.share_div(b, 1), a.add(b));
    }
}
