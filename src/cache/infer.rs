//! Column scalar-kind inference and value coercion.
//!
//! Loaders hand over dynamically typed cells; a column's storage kind is
//! decided by majority vote over a bounded sample of its non-null values,
//! falling back to text on mixed or ambiguous data. Cells that cannot be
//! coerced into the winning kind are stored as nulls, the same behavior the
//! original loaders had for unparseable cells.

use chrono::{DateTime, Utc};

use crate::models::{ScalarKind, Value};

/// Values sampled per column for kind inference
const SAMPLE_LIMIT: usize = 256;

/// Infer the storage kind for a column of raw values.
///
/// Rules, in order:
/// - no non-null values: [`ScalarKind::Null`]
/// - all sampled values numeric with at least one float: [`ScalarKind::Float`]
/// - one kind holds a strict majority of the sample: that kind
/// - otherwise: [`ScalarKind::Text`]
pub fn infer_kind(values: &[Value]) -> ScalarKind {
    let mut ints = 0usize;
    let mut floats = 0usize;
    let mut texts = 0usize;
    let mut bools = 0usize;
    let mut temporals = 0usize;

    for value in values.iter().filter(|v| !v.is_null()).take(SAMPLE_LIMIT) {
        match value {
            Value::Int(_) => ints += 1,
            Value::Float(_) => floats += 1,
            Value::Text(_) => texts += 1,
            Value::Bool(_) => bools += 1,
            Value::Temporal(_) => temporals += 1,
            Value::Null => unreachable!(),
        }
    }

    let total = ints + floats + texts + bools + temporals;
    if total == 0 {
        return ScalarKind::Null;
    }

    // Int/float mixtures are numeric, not ambiguous
    if ints + floats == total && floats > 0 {
        return ScalarKind::Float;
    }

    let candidates = [
        (ints, ScalarKind::Integer),
        (floats, ScalarKind::Float),
        (texts, ScalarKind::Text),
        (bools, ScalarKind::Boolean),
        (temporals, ScalarKind::Temporal),
    ];
    let mut best = (0usize, ScalarKind::Text);
    for candidate in candidates {
        if candidate.0 > best.0 {
            best = candidate;
        }
    }
    // Strict majority required; ties and pluralities degrade to text
    if best.0 * 2 > total { best.1 } else { ScalarKind::Text }
}

/// Coerce a raw value into an integer cell, or null
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 => {
            Some(*f as i64)
        }
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a raw value into a float cell, or null
pub fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a raw value into a boolean cell, or null
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Coerce a raw value into a temporal cell, or null
pub fn coerce_temporal(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Temporal(t) => Some(*t),
        Value::Text(s) => DateTime::parse_from_rfc3339(s.trim()).ok().map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

/// Smallest signed integer width that exactly fits every value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

pub fn narrow_int_width(values: &[Option<i64>]) -> IntWidth {
    let mut min = 0i64;
    let mut max = 0i64;
    for v in values.iter().flatten() {
        min = min.min(*v);
        max = max.max(*v);
    }
    if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        IntWidth::W8
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        IntWidth::W16
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        IntWidth::W32
    } else {
        IntWidth::W64
    }
}

/// True when every value survives an f64 -> f32 -> f64 round trip
pub fn fits_f32(values: &[Option<f64>]) -> bool {
    values.iter().flatten().all(|v| (*v as f32) as f64 == *v)
}
