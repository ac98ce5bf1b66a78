//! Pure operators and user-defined functions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::value::{arith, compare, holds, loosely_equal, singleton, to_number, from_number};
use crate::ir::PureOp;

pub type Udf = Arc<dyn Fn(&[Option<Value>]) -> Option<Value> + Send + Sync>;

/// Functions callable through `apply(f, args..)`, where `f` evaluates
/// to the registered name.
#[derive(Clone, Default)]
pub struct Udfs {
    fns: BTreeMap<String, Udf>,
}

impl Udfs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        name: &str,
        f: impl Fn(&[Option<Value>]) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.fns.insert(name.to_string(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Udf> {
        self.fns.get(name)
    }
}

impl fmt::Debug for Udfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fns.keys()).finish()
    }
}

pub fn apply_pure(op: PureOp, args: Vec<Option<Value>>, udfs: &Udfs) -> Option<Value> {
    match op {
        PureOp::Apply => {
            let (head, rest) = args.split_first()?;
            let Some(Value::String(name)) = head else {
                return None;
            };
            let f = udfs.get(name)?;
            f(rest)
        }
        PureOp::Plus => binary(&args, |a, b| arith(a, b, i64::checked_add, |x, y| x + y)),
        PureOp::Minus => binary(&args, |a, b| arith(a, b, i64::checked_sub, |x, y| x - y)),
        PureOp::Times => binary(&args, |a, b| arith(a, b, i64::checked_mul, |x, y| x * y)),
        PureOp::Fdiv => binary(&args, |a, b| from_number(to_number(a)? / to_number(b)?)),
        PureOp::Div => binary(&args, |a, b| {
            from_number((to_number(a)? / to_number(b)?).floor())
        }),
        PureOp::Mod => binary(&args, |a, b| from_number(to_number(a)? % to_number(b)?)),
        PureOp::And | PureOp::AndAlso => {
            let [a, b] = two(args)?;
            if holds(&a) {
                b
            } else {
                None
            }
        }
        PureOp::OrElse => {
            let [a, b] = two(args)?;
            if holds(&a) {
                a
            } else {
                b
            }
        }
        PureOp::Equal => test(&args, loosely_equal),
        PureOp::NotEqual => test(&args, |a, b| !loosely_equal(a, b)),
        PureOp::LessThan => test(&args, |a, b| compare(a, b).is_some_and(|o| o.is_lt())),
        PureOp::LessThanOrEqual => test(&args, |a, b| compare(a, b).is_some_and(|o| o.is_le())),
        PureOp::GreaterThan => test(&args, |a, b| compare(a, b).is_some_and(|o| o.is_gt())),
        PureOp::GreaterThanOrEqual => {
            test(&args, |a, b| compare(a, b).is_some_and(|o| o.is_ge()))
        }
        PureOp::IfElse => {
            let mut args = args.into_iter();
            let cond = args.next()?;
            let then = args.next()?;
            let otherwise = args.next()?;
            if holds(&cond) {
                then
            } else {
                otherwise
            }
        }
        PureOp::Singleton => Some(singleton(args.into_iter().next().flatten())),
        PureOp::Flatten => {
            let mut out = Vec::new();
            for arg in args.into_iter().flatten() {
                match arg {
                    Value::Array(items) => out.extend(items),
                    other => out.push(other),
                }
            }
            Some(Value::Array(out))
        }
        PureOp::Vars => Some(Value::Array(args.into_iter().flatten().collect())),
    }
}

fn two(args: Vec<Option<Value>>) -> Option<[Option<Value>; 2]> {
    let mut args = args.into_iter();
    Some([args.next()?, args.next()?])
}

/// Both operands defined, else undefined.
fn binary(args: &[Option<Value>], f: impl Fn(&Value, &Value) -> Option<Value>) -> Option<Value> {
    match args {
        [Some(a), Some(b)] => f(a, b),
        _ => None,
    }
}

/// Comparisons yield `true` or undefined, so they act as filters.
fn test(args: &[Option<Value>], f: impl Fn(&Value, &Value) -> bool) -> Option<Value> {
    binary(args, |a, b| f(a, b).then_some(Value::Bool(true)))
}
