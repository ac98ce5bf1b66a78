//! Raw query trees, as produced by an external parser/desugarer.
//!
//! The compiler never reads query text. Front-ends hand over a
//! [`RawExpr`], either deserialized (`{"kind": "get", ...}`) or built
//! with the helpers below.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawExpr {
    /// The query's single input value.
    Input,
    Const {
        value: Value,
    },
    /// `*name` is a generator variable, a bare `*` an anonymous one.
    /// Any other identifier is a string constant.
    Ident {
        name: String,
    },
    /// `base[key]`; without a base, `key` is looked up on the input.
    Get {
        #[serde(default)]
        base: Option<Box<RawExpr>>,
        key: Box<RawExpr>,
    },
    /// Call through a head expression. A constant head names a builtin.
    Apply {
        head: Box<RawExpr>,
        args: Vec<RawExpr>,
    },
    /// Call of a named operator.
    Op {
        op: String,
        args: Vec<RawExpr>,
    },
    Hint {
        head: Box<RawExpr>,
        args: Vec<RawExpr>,
    },
    Array {
        items: Vec<RawExpr>,
    },
    Object {
        entries: Vec<RawEntry>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    pub key: RawExpr,
    pub value: RawExpr,
}

// ─── Builders ──────────────────────────────────────────────────────

pub fn input() -> RawExpr {
    RawExpr::Input
}

pub fn lit(value: impl Into<Value>) -> RawExpr {
    RawExpr::Const {
        value: value.into(),
    }
}

pub fn ident(name: &str) -> RawExpr {
    RawExpr::Ident {
        name: name.to_string(),
    }
}

/// A dotted path rooted at the input: `path("data.*.value")`.
pub fn path(dotted: &str) -> RawExpr {
    let mut segments = dotted.split('.');
    let first = segments.next().unwrap_or_default();
    let mut expr = RawExpr::Get {
        base: None,
        key: Box::new(ident(first)),
    };
    for segment in segments {
        expr = get(expr, ident(segment));
    }
    expr
}

pub fn get(base: RawExpr, key: RawExpr) -> RawExpr {
    RawExpr::Get {
        base: Some(Box::new(base)),
        key: Box::new(key),
    }
}

pub fn call(op: &str, args: Vec<RawExpr>) -> RawExpr {
    RawExpr::Op {
        op: op.to_string(),
        args,
    }
}

pub fn apply(head: RawExpr, args: Vec<RawExpr>) -> RawExpr {
    RawExpr::Apply {
        head: Box::new(head),
        args,
    }
}

pub fn hint(head: RawExpr, args: Vec<RawExpr>) -> RawExpr {
    RawExpr::Hint {
        head: Box::new(head),
        args,
    }
}

pub fn array(items: Vec<RawExpr>) -> RawExpr {
    RawExpr::Array { items }
}

pub fn object(entries: Vec<(RawExpr, RawExpr)>) -> RawExpr {
    RawExpr::Object {
        entries: entries
            .into_iter()
            .map(|(key, value)| RawEntry { key, value })
            .collect(),
    }
}

pub fn sum(arg: RawExpr) -> RawExpr {
    call("sum", vec![arg])
}

pub fn count(arg: RawExpr) -> RawExpr {
    call("count", vec![arg])
}

pub fn group(key: RawExpr, value: RawExpr) -> RawExpr {
    call("group", vec![key, value])
}

pub fn plus(a: RawExpr, b: RawExpr) -> RawExpr {
    call("plus", vec![a, b])
}

pub fn times(a: RawExpr, b: RawExpr) -> RawExpr {
    call("times", vec![a, b])
}
