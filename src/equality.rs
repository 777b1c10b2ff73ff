//! Structural equality between JSON values.
//!
//! Differs from `Value`'s own `PartialEq` in one way that matters for
//! `const`, `enum` and `uniqueItems`: numbers compare by value, so `1` and
//! `1.0` are the same number.
use std::collections::HashSet;

use ordered_float::OrderedFloat;
use serde_json::{Number, Value};

use crate::number::Num;

pub fn deep_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equals(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|(k, x)| ys.get(k).is_some_and(|y| deep_equals(x, y)))
        }
        _ => false,
    }
}

pub fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (Num::of(a), Num::of(b)) {
        (Num::Int(x), Num::Int(y)) => x == y,
        (x, y) => match (x.as_exact_int(), y.as_exact_int()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
    }
}

// ---------------------------- uniqueItems --------------------------------- //

/// Hashable identity of a scalar under `deep_equals`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ScalarKey<'a> {
    Null,
    Bool(bool),
    Int(i128),
    Float(OrderedFloat<f64>),
    Str(&'a str),
}

impl<'a> ScalarKey<'a> {
    fn of(v: &'a Value) -> Option<Self> {
        Some(match v {
            Value::Null => ScalarKey::Null,
            Value::Bool(b) => ScalarKey::Bool(*b),
            Value::Number(n) => {
                let n = Num::of(n);
                match n.as_exact_int() {
                    Some(i) => ScalarKey::Int(i),
                    None => ScalarKey::Float(OrderedFloat(n.as_f64())),
                }
            }
            Value::String(s) => ScalarKey::Str(s),
            Value::Array(_) | Value::Object(_) => return None,
        })
    }
}

/// No two elements are `deep_equals`.
///
/// All-scalar arrays are checked with a hash set; anything containing arrays
/// or objects falls back to the pairwise scan, stopping at the first
/// duplicate either way.
pub fn all_unique(items: &[Value]) -> bool {
    if items.len() < 2 {
        return true;
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        match ScalarKey::of(item) {
            Some(key) => {
                if !seen.insert(key) {
                    return false;
                }
            }
            None => return all_unique_pairwise(items),
        }
    }
    true
}

fn all_unique_pairwise(items: &[Value]) -> bool {
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            if deep_equals(a, b) {
                return false;
            }
        }
    }
    true
}

// ------------------------------- Tests ------------------------------------ //
