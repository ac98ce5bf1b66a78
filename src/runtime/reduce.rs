//! Reducer identities and steps.
//!
//! Undefined inputs never change the state. Reducers without an
//! identity (and all `?` variants) start undefined.

use serde_json::{json, Value};

use super::value::{arith, compare, holds};
use crate::ir::{Reducer, ReducerOp};

pub fn identity(op: Reducer) -> Option<Value> {
    if op.nullable {
        return None;
    }
    match op.op {
        ReducerOp::Sum | ReducerOp::Count => Some(json!(0)),
        ReducerOp::Product => Some(json!(1)),
        ReducerOp::Array => Some(json!([])),
        ReducerOp::All => Some(json!(true)),
        ReducerOp::Any => Some(json!(false)),
        ReducerOp::Max
        | ReducerOp::Min
        | ReducerOp::First
        | ReducerOp::Last
        | ReducerOp::Single => None,
    }
}

pub fn step(op: Reducer, state: Option<Value>, x: Option<Value>) -> Option<Value> {
    let Some(x) = x else {
        return state;
    };
    let Some(state) = state else {
        return Some(first(op.op, x));
    };
    match op.op {
        // non-numeric inputs leave the state alone
        ReducerOp::Sum => arith(&state, &x, i64::checked_add, |a, b| a + b).or(Some(state)),
        ReducerOp::Product => arith(&state, &x, i64::checked_mul, |a, b| a * b).or(Some(state)),
        ReducerOp::Count => arith(&state, &json!(1), i64::checked_add, |a, b| a + b).or(Some(state)),
        ReducerOp::Max => match compare(&x, &state) {
            Some(std::cmp::Ordering::Greater) => Some(x),
            _ => Some(state),
        },
        ReducerOp::Min => match compare(&x, &state) {
            Some(std::cmp::Ordering::Less) => Some(x),
            _ => Some(state),
        },
        ReducerOp::Array => {
            let mut items = match state {
                Value::Array(items) => items,
                other => vec![other],
            };
            items.push(x);
            Some(Value::Array(items))
        }
        ReducerOp::First => Some(state),
        ReducerOp::Last | ReducerOp::Single => Some(x),
        ReducerOp::All => Some(Value::Bool(holds(&Some(state)) && holds(&Some(x)))),
        ReducerOp::Any => Some(Value::Bool(holds(&Some(state)) || holds(&Some(x)))),
    }
}

/// State after the first defined input, for reducers starting undefined.
fn first(op: ReducerOp, x: Value) -> Value {
    match op {
        ReducerOp::Count => json!(1),
        ReducerOp::Array => Value::Array(vec![x]),
        ReducerOp::All | ReducerOp::Any => Value::Bool(holds(&Some(x))),
        _ => x,
    }
}
