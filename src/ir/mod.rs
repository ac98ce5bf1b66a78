//! The annotated query IR.
//!
//! A closed set of node kinds. Each pass rebuilds the tree by value and
//! fills one more group of fields in [`Annot`]:
//!
//! - bottom-up: `vars`, `mind`, `dims`
//! - top-down bound pass: `bnd`, `all_bnd`
//! - top-down free pass: `fre`

pub mod ops;
pub mod vars;

use std::fmt;

use serde::Serialize;
use serde_json::Value;

pub use ops::{Mode, PureOp, Reducer, ReducerOp};
pub use vars::{Var, VarSet, VarTable};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    pub ann: Annot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Input,
    Const {
        value: Value,
    },
    Var {
        var: Var,
    },
    Get {
        base: Box<Node>,
        key: Box<Node>,
    },
    Pure {
        op: PureOp,
        args: Vec<Node>,
    },
    Hint {
        op: String,
        args: Vec<Node>,
    },
    Mkset {
        arg: Box<Node>,
    },
    Stateful {
        op: Reducer,
        mode: Mode,
        arg: Box<Node>,
    },
    Prefix {
        op: Reducer,
        mode: Mode,
        arg: Box<Node>,
    },
    /// `base` with `key: value` added for every binding of the key
    /// variable(s). `filter` is the generator for a computed key.
    Update {
        base: Box<Node>,
        key: Box<Node>,
        value: Box<Node>,
        filter: Option<Box<Node>>,
    },
}

/// Per-node variable sets.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Annot {
    pub vars: VarSet,
    pub mind: VarSet,
    pub dims: VarSet,
    pub bnd: VarSet,
    pub all_bnd: VarSet,
    pub fre: VarSet,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ann: Annot::default(),
        }
    }

    pub fn input() -> Self {
        Self::new(NodeKind::Input)
    }

    pub fn constant(value: Value) -> Self {
        Self::new(NodeKind::Const { value })
    }

    pub fn var(var: Var) -> Self {
        Self::new(NodeKind::Var { var })
    }

    pub fn get(base: Node, key: Node) -> Self {
        Self::new(NodeKind::Get {
            base: Box::new(base),
            key: Box::new(key),
        })
    }

    pub fn pure(op: PureOp, args: Vec<Node>) -> Self {
        Self::new(NodeKind::Pure { op, args })
    }

    pub fn mkset(arg: Node) -> Self {
        Self::new(NodeKind::Mkset { arg: Box::new(arg) })
    }

    pub fn stateful(op: Reducer, mode: Mode, arg: Node) -> Self {
        Self::new(NodeKind::Stateful {
            op,
            mode,
            arg: Box::new(arg),
        })
    }

    pub fn update(base: Node, key: Node, value: Node, filter: Option<Node>) -> Self {
        Self::new(NodeKind::Update {
            base: Box::new(base),
            key: Box::new(key),
            value: Box::new(value),
            filter: filter.map(Box::new),
        })
    }

    pub fn as_var(&self) -> Option<Var> {
        match self.kind {
            NodeKind::Var { var } => Some(var),
            _ => None,
        }
    }

    /// True for nodes hoisted into their own assignment by codegen.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Stateful { .. } | NodeKind::Prefix { .. } | NodeKind::Update { .. }
        )
    }

    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Input | NodeKind::Const { .. } | NodeKind::Var { .. } => Vec::new(),
            NodeKind::Get { base, key } => vec![base, key],
            NodeKind::Pure { args, .. } | NodeKind::Hint { args, .. } => args.iter().collect(),
            NodeKind::Mkset { arg }
            | NodeKind::Stateful { arg, .. }
            | NodeKind::Prefix { arg, .. } => vec![arg],
            NodeKind::Update {
                base,
                key,
                value,
                filter,
            } => {
                let mut out: Vec<&Node> = vec![base, key, value];
                if let Some(filter) = filter {
                    out.push(filter);
                }
                out
            }
        }
    }

    /// Structural identity, including annotations.
    pub fn structural_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    /// Visit every node, children before parents.
    pub fn walk_post<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        for child in self.children() {
            child.walk_post(f);
        }
        f(self);
    }

    pub fn display<'a>(&'a self, vars: &'a VarTable) -> DisplayNode<'a> {
        DisplayNode { node: self, vars }
    }
}

/// Pretty form of a constant: bare strings, JSON otherwise.
pub fn format_const(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct DisplayNode<'a> {
    node: &'a Node,
    vars: &'a VarTable,
}

impl DisplayNode<'_> {
    fn child<'b>(&'b self, node: &'b Node) -> DisplayNode<'b> {
        DisplayNode {
            node,
            vars: self.vars,
        }
    }

    fn write_args(&self, f: &mut fmt::Formatter<'_>, args: &[Node]) -> fmt::Result {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.child(arg))?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node.kind {
            NodeKind::Input => write!(f, "inp"),
            NodeKind::Const { value } => write!(f, "{}", format_const(value)),
            NodeKind::Var { var } => write!(f, "{}", self.vars.name(*var)),
            NodeKind::Get { base, key } => {
                if matches!(base.kind, NodeKind::Input) {
                    write!(f, "{}", self.child(key))
                } else {
                    write!(f, "{}[{}]", self.child(base), self.child(key))
                }
            }
            NodeKind::Pure { op, args } => {
                write!(f, "{op}(")?;
                self.write_args(f, args)?;
                write!(f, ")")
            }
            NodeKind::Hint { op, args } => {
                write!(f, "hint:{op}(")?;
                self.write_args(f, args)?;
                write!(f, ")")
            }
            NodeKind::Mkset { arg } => write!(f, "mkset({})", self.child(arg)),
            NodeKind::Stateful { op, arg, .. } => write!(f, "{op}({})", self.child(arg)),
            NodeKind::Prefix { op, arg, .. } => write!(f, "prefix_{op}({})", self.child(arg)),
            NodeKind::Update {
                base,
                key,
                value,
                filter,
            } => {
                write!(
                    f,
                    "{}{{ {}: {} }}",
                    self.child(base),
                    self.child(key),
                    self.child(value)
                )?;
                if let Some(filter) = filter {
                    write!(f, " / {}", self.child(filter))?;
                }
                Ok(())
            }
        }
    }
}
