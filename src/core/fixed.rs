//! Decimal Fixed-Point Multiplier Arithmetic
//!
//! The multiplier curve is computed with integer arithmetic only — no floats
//! anywhere in round logic.
//!
//! ## Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Fixed: u64 scaled by 10^4 (four fractional decimal digits) │
//! │                                                             │
//! │  1.0000x  = 10_000        2.5000x = 25_000                  │
//! │                                                             │
//! │  Wire values are the two-decimal projection ("cents"):      │
//! │  cents(f) = f / 100       10_058 -> 100 cents -> "1.00"     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why four internal digits?
//!
//! Multiplication truncates toward zero. At two-decimal storage the curve
//! would stall: trunc2(1.00 × 1.0058) = 1.00 forever. Two extra digits keep
//! the per-tick product strictly increasing while everything a client or
//! auditor sees is still an exact two-decimal value.

/// Multiplier value scaled by [`FIXED_SCALE`].
pub type Fixed = u64;

/// Number of fractional decimal digits carried internally.
pub const FIXED_DIGITS: u32 = 4;

/// Internal scale: 10^4.
pub const FIXED_SCALE: u64 = 10_000;

/// 1.00x in fixed-point.
pub const FIXED_ONE: Fixed = FIXED_SCALE;

/// Per-tick growth factor: 1.0058x.
pub const GROWTH_FACTOR: Fixed = 10_058;

/// 1.00x expressed in cents.
pub const CENTS_ONE: u64 = 100;

/// Multiply two fixed-point values, truncating toward zero.
///
/// Widens to u128 so the product cannot overflow for any multiplier the
/// engine can reach.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as u128) * (b as u128);
    (wide / FIXED_SCALE as u128) as Fixed
}

/// Two-decimal projection of a fixed-point value (truncation).
#[inline]
pub fn to_cents(f: Fixed) -> u64 {
    f / (FIXED_SCALE / 100)
}

/// Lift a cents value to fixed-point.
#[inline]
pub fn from_cents(cents: u64) -> Fixed {
    cents * (FIXED_SCALE / 100)
}

/// Cents to an `f64` for JSON output.
///
/// Two-decimal values survive the round trip through f64 exactly as far as
/// serde_json's shortest representation is concerned; round logic never
/// reads this back.
#[inline]
pub fn cents_to_f64(cents: u64) -> f64 {
    cents as f64 / 100.0
}

/// Format cents as a two-decimal string, e.g. `250` -> `"2.50"`.
pub fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_is_truncated_toward_zero() {
        // 1.0000 * 1.0058 = 1.0058 exactly
        assert_eq!(fixed_mul(FIXED_ONE, GROWTH_FACTOR), 10_058);
        // 1.0058 * 1.0058 = 1.01163364 -> 1.0116
        assert_eq!(fixed_mul(10_058, GROWTH_FACTOR), 10_116);
        // 1.0116 * 1.0058 = 1.01746728 -> 1.0174
        assert_eq!(fixed_mul(10_116, GROWTH_FACTOR), 10_174);
    }

    #[test]
    fn test_curve_never_stalls() {
        let mut m = FIXED_ONE;
        for _ in 0..1000 {
            let next = fixed_mul(m, GROWTH_FACTOR);
            assert!(next > m);
            m = next;
        }
    }

    #[test]
    fn test_cents_projection() {
        assert_eq!(to_cents(10_058), 100);
        assert_eq!(to_cents(10_116), 101);
        assert_eq!(to_cents(25_000), 250);
        assert_eq!(from_cents(250), 25_000);
        assert_eq!(to_cents(from_cents(123)), 123);
    }

    #[test]
    fn test_known_curve_values() {
        // Reference sequence for the fixed growth factor: the tick where the
        // projection first reaches 2.00x and 2.50x.
        let mut m = FIXED_ONE;
        let mut first_200 = None;
        let mut first_250 = None;
        for tick in 1..=200u32 {
            m = fixed_mul(m, GROWTH_FACTOR);
            if first_200.is_none() && to_cents(m) >= 200 {
                first_200 = Some((tick, m));
            }
            if first_250.is_none() && to_cents(m) >= 250 {
                first_250 = Some((tick, m));
            }
        }
        assert_eq!(first_200, Some((121, 20_046)));
        assert_eq!(first_250, Some((160, 25_095)));
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(250), "2.50");
        assert_eq!(format_cents(1005), "10.05");
    }
}
