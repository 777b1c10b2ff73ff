//! Numeric semantics shared by the comparison and `multipleOf` keywords.
use serde_json::Number;

/// A JSON number viewed either as an exact integer (when written as one)
/// or as its `f64` approximation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i128),
    Float(f64),
}

impl Num {
    pub fn of(n: &Number) -> Num {
        if let Some(i) = n.as_i64() {
            Num::Int(i as i128)
        } else if let Some(u) = n.as_u64() {
            Num::Int(u as i128)
        } else {
            Num::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    /// Has no fractional part (`2` and `2.0` both qualify).
    pub fn is_whole(self) -> bool {
        match self {
            Num::Int(_) => true,
            Num::Float(f) => f.is_finite() && f.fract() == 0.0,
        }
    }

    /// Exact integer value, collapsing whole floats that fit.
    pub fn as_exact_int(self) -> Option<i128> {
        match self {
            Num::Int(i) => Some(i),
            Num::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e38 => Some(f as i128),
            Num::Float(_) => None,
        }
    }
}

// ------------------------------ Bounds ----------------------------------- //

/// `value >= bound` (or `>` when exclusive), comparing integers exactly.
pub fn above_minimum(value: Num, bound: f64, exclusive: bool) -> bool {
    match cmp_to_bound(value, bound) {
        Some(std::cmp::Ordering::Greater) => true,
        Some(std::cmp::Ordering::Equal) => !exclusive,
        _ => false,
    }
}

/// `value <= bound` (or `<` when exclusive).
pub fn below_maximum(value: Num, bound: f64, exclusive: bool) -> bool {
    match cmp_to_bound(value, bound) {
        Some(std::cmp::Ordering::Less) => true,
        Some(std::cmp::Ordering::Equal) => !exclusive,
        _ => false,
    }
}

fn cmp_to_bound(value: Num, bound: f64) -> Option<std::cmp::Ordering> {
    match value {
        // an integral bound in i128 range compares exactly; anything else
        // falls back to f64, which is exact for bounds with a fraction
        Num::Int(i) if bound.is_finite() && bound.fract() == 0.0 && bound.abs() < 1e38 => {
            Some(i.cmp(&(bound as i128)))
        }
        Num::Int(i) => (i as f64).partial_cmp(&bound),
        Num::Float(f) => f.partial_cmp(&bound),
    }
}

// ---------------------------- multipleOf ---------------------------------- //

/// Slack for the floating-point remainder, in units of `f64::EPSILON` scaled by
/// the operands.
const MULTIPLE_ULPS: f64 = 4.0;

/// `value` is an integer multiple of `divisor`.
///
/// Integral value and integral divisor → exact modulo. Otherwise the remainder
/// must sit within a few ULPs of `0` or of `divisor`, which absorbs binary
/// rounding (`0.3 % 0.1 == 0.09999999999999998`) and nothing more.
pub fn is_multiple_of(value: Num, divisor: f64) -> bool {
    if !(divisor.is_finite() && divisor > 0.0) {
        return false;
    }
    if let Num::Int(i) = value {
        if divisor.fract() == 0.0 {
            if divisor >= 1e38 {
                return i == 0;
            }
            return i % (divisor as i128) == 0;
        }
    }
    is_double_multiple(value.as_f64(), divisor)
}

fn is_double_multiple(value: f64, divisor: f64) -> bool {
    if !value.is_finite() {
        return false;
    }
    // `%` on f64 is exact; only the operands carry rounding error
    let remainder = (value % divisor).abs();
    let tolerance = (value.abs() + divisor) * MULTIPLE_ULPS * f64::EPSILON;
    remainder <= tolerance || divisor - remainder <= tolerance
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: serde_json::Value) -> Num {
        Num::of(v.as_number().unwrap())
    }

    #[test]
    fn integer_literals_stay_exact() {
        assert_eq!(num(json!(3)), Num::Int(3));
        assert_eq!(num(json!(u64::MAX)), Num::Int(u64::MAX as i128));
        assert_eq!(num(json!(3.0)), Num::Float(3.0));
        assert!(num(json!(3.0)).is_whole());
        assert!(!num(json!(3.5)).is_whole());
    }

    #[test]
    fn bounds_compare_exactly_for_large_integers() {
        // 2^53 + 1 is not representable as f64; a lossy compare would say equal
        let big = Num::Int(9_007_199_254_740_993);
        assert!(above_minimum(big, 9_007_199_254_740_992.0, true));
        assert!(below_maximum(Num::Int(5), 5.0, false));
        assert!(!below_maximum(Num::Int(5), 5.0, true));
        assert!(above_minimum(Num::Float(1.1), 1.0, true));
        assert!(!above_minimum(Num::Float(0.9), 1.0, false));
        assert!(below_maximum(Num::Int(2), 2.5, true));
    }

    #[test]
    fn multiple_of_integers_and_floats() {
        assert!(is_multiple_of(Num::Int(10), 2.0));
        assert!(!is_multiple_of(Num::Int(7), 2.0));
        assert!(is_multiple_of(Num::Float(0.3), 0.1));
        assert!(is_multiple_of(Num::Float(0.0075), 0.0001));
        assert!(!is_multiple_of(Num::Float(0.00751), 0.0001));
        assert!(is_multiple_of(Num::Int(4), 0.5));
        assert!(!is_multiple_of(Num::Float(4.5), 2.0));
        assert!(is_multiple_of(Num::Float(1e308), 0.5));
        assert!(!is_multiple_of(Num::Int(3), 0.0));
        assert!(is_multiple_of(Num::Float(19.99), 0.01));
        assert!(is_multiple_of(Num::Float(12345678.9), 0.01));
    }

    #[test]
    fn multiple_of_rejects_small_remainders_on_large_values() {
        assert!(!is_multiple_of(Num::Float(10000000.005), 1.0));
        assert!(!is_multiple_of(Num::Float(1.0000000001), 1.0));
        assert!(!is_multiple_of(Num::Float(12345678.901), 0.01));
    }
}
