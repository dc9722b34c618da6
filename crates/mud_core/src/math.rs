//! Fixed-point math utilities for deterministic resolution.
//!
//! Damage formulas in the catalog need fractional multipliers and
//! non-integer exponents. Floating-point results can differ between
//! CPUs, so everything here is built on [`Fixed`].

use fixed::types::I32F32;

/// Fixed-point number type for all engine math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Human-readable serde for catalog data.
///
/// Catalog authors write `1.25` in RON; the value is parsed once at load
/// time and converted to [`Fixed`]. Binary snapshots never go through here.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize as a decimal literal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize from a decimal literal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("{raw} is out of fixed-point range")))
    }
}

/// `value * pct / 100` without intermediate overflow.
#[must_use]
pub const fn percent_of(value: i32, pct: i32) -> i32 {
    ((value as i64 * pct as i64) / 100) as i32
}

/// Multiply an integer by a fixed-point factor, rounding toward negative infinity.
#[must_use]
pub fn scale(value: i32, factor: Fixed) -> i32 {
    Fixed::from_num(value).saturating_mul(factor).to_num()
}

/// `num / den` as a fixed-point ratio. A zero denominator yields zero.
#[must_use]
pub fn ratio(num: i32, den: i32) -> Fixed {
    if den == 0 {
        return Fixed::ZERO;
    }
    Fixed::from_num(num) / Fixed::from_num(den)
}

/// Square root by binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid.saturating_mul(mid) <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Base-2 logarithm by repeated squaring of the normalized mantissa.
///
/// Non-positive input returns [`Fixed::MIN`].
#[must_use]
pub fn fixed_log2(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::MIN;
    }

    let bits = value.to_bits();
    let msb = 63 - bits.leading_zeros() as i32;
    let int_part = msb - 32;
    let mut mantissa = if int_part >= 0 {
        Fixed::from_bits(bits >> int_part)
    } else {
        Fixed::from_bits(bits << -int_part)
    };

    let two = Fixed::from_num(2);
    let mut result = Fixed::from_num(int_part);
    let mut bit = Fixed::from_num(1) / two;
    while bit > Fixed::ZERO {
        mantissa = mantissa.saturating_mul(mantissa);
        if mantissa >= two {
            mantissa /= two;
            result += bit;
        }
        bit /= two;
    }
    result
}

/// Base-2 exponential, saturating at [`Fixed::MAX`].
#[must_use]
pub fn fixed_exp2(value: Fixed) -> Fixed {
    let two = Fixed::from_num(2);
    let int_part = value.floor();
    let mut frac = value - int_part;

    let mut result = Fixed::from_num(1);
    let mut root = fixed_sqrt(two);
    let mut bit = Fixed::from_num(1) / two;
    while frac > Fixed::ZERO && bit > Fixed::ZERO {
        if frac >= bit {
            frac -= bit;
            result = result.saturating_mul(root);
        }
        root = fixed_sqrt(root);
        bit /= two;
    }

    let shift: i32 = int_part.to_num();
    if shift >= 0 {
        for _ in 0..shift.min(64) {
            result = result.saturating_mul(two);
        }
        result
    } else if shift > -64 {
        result >> shift.unsigned_abs()
    } else {
        Fixed::ZERO
    }
}

/// `base ^ exponent` for a positive base. Non-positive bases yield zero.
///
/// # Example
///
/// ```
/// use mud_core::math::{fixed_pow, Fixed};
///
/// let eight = fixed_pow(Fixed::from_num(2), Fixed::from_num(3));
/// assert!((eight - Fixed::from_num(8)).abs() < Fixed::from_num(0.001));
/// ```
#[must_use]
pub fn fixed_pow(base: Fixed, exponent: Fixed) -> Fixed {
    if base <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    fixed_exp2(exponent.saturating_mul(fixed_log2(base)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Fixed, b: Fixed, eps: Fixed) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(200, 75), 150);
        assert_eq!(percent_of(i32::MAX, 100), i32::MAX);
        assert_eq!(percent_of(-10, 50), -5);
    }

    #[test]
    fn test_log2_powers_of_two() {
        assert_eq!(fixed_log2(Fixed::from_num(1)), Fixed::ZERO);
        assert!(close(fixed_log2(Fixed::from_num(8)), Fixed::from_num(3), Fixed::from_num(0.0001)));
        assert!(close(
            fixed_log2(Fixed::from_num(0.25)),
            Fixed::from_num(-2),
            Fixed::from_num(0.0001)
        ));
    }

    #[test]
    fn test_exp2_fraction() {
        let half = fixed_exp2(Fixed::from_num(0.5));
        assert!(close(half, Fixed::from_num(1.414_213_56), Fixed::from_num(0.0001)));
        assert!(close(fixed_exp2(Fixed::from_num(-1)), Fixed::from_num(0.5), Fixed::from_num(0.0001)));
    }

    #[test]
    fn test_pow_matches_known_values() {
        // 100^1.2 = 251.188...
        let value = fixed_pow(Fixed::from_num(100), Fixed::from_num(1.2));
        assert!(close(value, Fixed::from_num(251.188), Fixed::from_num(0.05)));
        assert_eq!(fixed_pow(Fixed::ZERO, Fixed::from_num(2)), Fixed::ZERO);
    }

    #[test]
    fn test_pow_determinism() {
        let a = fixed_pow(Fixed::from_num(57), Fixed::from_num(1.37));
        let b = fixed_pow(Fixed::from_num(57), Fixed::from_num(1.37));
        assert_eq!(a, b);
    }

    #[test]
    fn test_scale_and_ratio() {
        assert_eq!(scale(10, ratio(3, 2)), 15);
        assert_eq!(ratio(1, 0), Fixed::ZERO);
    }
}
