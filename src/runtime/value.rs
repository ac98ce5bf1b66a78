//! Helpers over `serde_json::Value` with undefined as `None`.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

/// Object key for a value. Strings are used as-is.
pub fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_string(n),
        other => other.to_string(),
    }
}

fn number_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// Array index named by a key, if any.
pub fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .map(|u| u as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Keys a generator variable ranges over: object keys or array indices.
pub fn keys_of(collection: &Value) -> Vec<Value> {
    match collection {
        Value::Object(map) => map.keys().map(|k| Value::String(k.clone())).collect(),
        Value::Array(items) => (0..items.len()).map(Value::from).collect(),
        _ => Vec::new(),
    }
}

pub fn lookup<'v>(collection: &'v Value, key: &Value) -> Option<&'v Value> {
    match collection {
        Value::Object(map) => map.get(&key_string(key)),
        Value::Array(items) => array_index(key).and_then(|i| items.get(i)),
        _ => None,
    }
}

pub fn contains_key(collection: &Value, key: &Value) -> bool {
    lookup(collection, key).is_some()
}

/// Every key path of `root` in preorder, starting with `[]`. A path is
/// an array of the keys [`keys_of`] yields along the way.
pub fn deep_paths(root: &Value) -> Vec<Value> {
    fn walk(value: &Value, path: &mut Vec<Value>, out: &mut Vec<Value>) {
        out.push(Value::Array(path.clone()));
        for key in keys_of(value) {
            if let Some(child) = lookup(value, &key) {
                path.push(key);
                walk(child, path, out);
                path.pop();
            }
        }
    }
    let mut out = Vec::new();
    walk(root, &mut Vec::new(), &mut out);
    out
}

/// Follow a key path. Anything but an array of keys is undefined.
pub fn deep_lookup<'v>(root: &'v Value, path: &Value) -> Option<&'v Value> {
    let Value::Array(keys) = path else {
        return None;
    };
    keys.iter().try_fold(root, |cur, key| lookup(cur, key))
}

/// `{key(x): x}`, the zero-or-one element set of a value.
pub fn singleton(value: Option<Value>) -> Value {
    let mut map = Map::new();
    if let Some(value) = value {
        map.insert(key_string(&value), value);
    }
    Value::Object(map)
}

/// Whether a value counts as a satisfied condition.
pub fn holds(value: &Option<Value>) -> bool {
    !matches!(value, None | Some(Value::Null) | Some(Value::Bool(false)))
}

pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Number value; integral results stay integers, non-finite ones are
/// undefined.
pub fn from_number(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        return Some(Value::from(f as i64));
    }
    Number::from_f64(f).map(Value::Number)
}

/// Integer fast path for `+`, `-`, `*`; falls back to floats.
pub fn arith(
    a: &Value,
    b: &Value,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Option<Value> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(r) = int(x, y) {
            return Some(Value::from(r));
        }
    }
    from_number(float(to_number(a)?, to_number(b)?))
}

pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => to_number(a)?.partial_cmp(&to_number(b)?),
    }
}

pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}
