//! Operator name tables.
//!
//! Three disjoint tables (pure, stateful, prefix of stateful) plus the
//! special forms the extractor rewrites.

use crate::ir::{PureOp, Reducer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Get,
    Group,
    Update,
    Mkset,
    Pure(PureOp),
    Stateful(Reducer),
    Prefix(Reducer),
}

const PREFIX_MARKER: &str = "prefix_";

pub fn classify(name: &str) -> Option<Builtin> {
    match name {
        "get" => return Some(Builtin::Get),
        "group" => return Some(Builtin::Group),
        "update" => return Some(Builtin::Update),
        "mkset" => return Some(Builtin::Mkset),
        _ => {}
    }
    if let Some(op) = PureOp::from_name(name) {
        return Some(Builtin::Pure(op));
    }
    if let Some(op) = Reducer::from_name(name) {
        return Some(Builtin::Stateful(op));
    }
    name.strip_prefix(PREFIX_MARKER)
        .and_then(Reducer::from_name)
        .map(Builtin::Prefix)
}

/// Accepted argument counts for a builtin, as an inclusive range.
pub fn arity(builtin: Builtin) -> (usize, usize) {
    match builtin {
        Builtin::Get => (1, 2),
        Builtin::Group => (2, 2),
        Builtin::Update => (3, 3),
        Builtin::Mkset | Builtin::Stateful(_) | Builtin::Prefix(_) => (1, 1),
        Builtin::Pure(op) => match op.arity() {
            Some(n) => (n, n),
            None => (1, usize::MAX),
        },
    }
}
