//! Operator vocabularies carried by IR nodes.

use std::fmt;

use serde::Serialize;

/// Element-wise operators. Their result is defined per combination of
/// the free variables of their arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PureOp {
    Apply,
    Plus,
    Minus,
    Times,
    Fdiv,
    Div,
    Mod,
    And,
    AndAlso,
    OrElse,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    IfElse,
    Singleton,
    Flatten,
    /// Tuple of variables; only used as the key of the root grouping.
    Vars,
}

impl PureOp {
    pub const ALL: [PureOp; 20] = [
        PureOp::Apply,
        PureOp::Plus,
        PureOp::Minus,
        PureOp::Times,
        PureOp::Fdiv,
        PureOp::Div,
        PureOp::Mod,
        PureOp::And,
        PureOp::AndAlso,
        PureOp::OrElse,
        PureOp::Equal,
        PureOp::NotEqual,
        PureOp::LessThan,
        PureOp::LessThanOrEqual,
        PureOp::GreaterThan,
        PureOp::GreaterThanOrEqual,
        PureOp::IfElse,
        PureOp::Singleton,
        PureOp::Flatten,
        PureOp::Vars,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PureOp::Apply => "apply",
            PureOp::Plus => "plus",
            PureOp::Minus => "minus",
            PureOp::Times => "times",
            PureOp::Fdiv => "fdiv",
            PureOp::Div => "div",
            PureOp::Mod => "mod",
            PureOp::And => "and",
            PureOp::AndAlso => "andAlso",
            PureOp::OrElse => "orElse",
            PureOp::Equal => "equal",
            PureOp::NotEqual => "notEqual",
            PureOp::LessThan => "lessThan",
            PureOp::LessThanOrEqual => "lessThanOrEqual",
            PureOp::GreaterThan => "greaterThan",
            PureOp::GreaterThanOrEqual => "greaterThanOrEqual",
            PureOp::IfElse => "ifElse",
            PureOp::Singleton => "singleton",
            PureOp::Flatten => "flatten",
            PureOp::Vars => "vars",
        }
    }

    pub fn from_name(name: &str) -> Option<PureOp> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Expected argument count, `None` when variadic.
    pub fn arity(self) -> Option<usize> {
        match self {
            PureOp::Apply | PureOp::Flatten | PureOp::Vars => None,
            PureOp::Singleton => Some(1),
            PureOp::IfElse => Some(3),
            _ => Some(2),
        }
    }
}

impl fmt::Display for PureOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ReducerOp {
    Sum,
    Product,
    Count,
    Max,
    Min,
    Array,
    First,
    Last,
    Single,
    All,
    Any,
}

impl ReducerOp {
    pub const ALL: [ReducerOp; 11] = [
        ReducerOp::Sum,
        ReducerOp::Product,
        ReducerOp::Count,
        ReducerOp::Max,
        ReducerOp::Min,
        ReducerOp::Array,
        ReducerOp::First,
        ReducerOp::Last,
        ReducerOp::Single,
        ReducerOp::All,
        ReducerOp::Any,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReducerOp::Sum => "sum",
            ReducerOp::Product => "product",
            ReducerOp::Count => "count",
            ReducerOp::Max => "max",
            ReducerOp::Min => "min",
            ReducerOp::Array => "array",
            ReducerOp::First => "first",
            ReducerOp::Last => "last",
            ReducerOp::Single => "single",
            ReducerOp::All => "all",
            ReducerOp::Any => "any",
        }
    }
}

/// A reducer. `nullable` reducers (`sum?`, `count?`, ...) start undefined
/// instead of at their identity, so reducing nothing yields undefined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Reducer {
    pub op: ReducerOp,
    pub nullable: bool,
}

impl Reducer {
    pub fn new(op: ReducerOp) -> Self {
        Self {
            op,
            nullable: false,
        }
    }

    pub fn from_name(name: &str) -> Option<Reducer> {
        let (base, nullable) = match name.strip_suffix('?') {
            Some(base) => (base, true),
            None => (name, false),
        };
        ReducerOp::ALL
            .into_iter()
            .find(|op| op.name() == base)
            .map(|op| Reducer { op, nullable })
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op.name())?;
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// Whether a reduction keeps its argument's dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    #[default]
    Eager,
    Reluctant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_names_round_trip() {
        for op in PureOp::ALL {
            assert_eq!(PureOp::from_name(op.name()), Some(op));
        }
        assert_eq!(PureOp::from_name("sum"), None);
    }

    #[test]
    fn test_reducer_nullable_suffix() {
        let r = Reducer::from_name("count?").unwrap();
        assert_eq!(r.op, ReducerOp::Count);
        assert!(r.nullable);
        assert_eq!(r.to_string(), "count?");
        assert_eq!(Reducer::from_name("array"), Some(Reducer::new(ReducerOp::Array)));
        assert_eq!(Reducer::from_name("median"), None);
    }
}
