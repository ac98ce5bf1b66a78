//! Loop-nest program IR and its generation.
//!
//! Every reduction and update in the annotated tree becomes an
//! assignment into a numbered slot, indexed by the node's free
//! variables. Assignments are emitted in dependency order; each one is
//! an init nest over its free variables followed by a step nest over
//! free and bound variables. The nests themselves come from scheduling
//! the filter catalogue (see `schedule`).

pub mod builder;
pub mod lower;
mod schedule;

use std::fmt;

use serde_json::Value;

use crate::context::Context;
use crate::ir::vars::is_deep_name;
use crate::ir::{format_const, Node, PureOp, Reducer, Var};

pub use builder::ProgramBuilder;

/// A loop-nest statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Comment(String),
    /// Inline diagnostic; the surrounding program still runs.
    Error(String),
    /// Loop `var` over the keys of `source`.
    ForIn {
        var: Var,
        source: Expr,
        body: Vec<Stmt>,
    },
    /// Run `body` only if the already bound `var` is a key of `source`.
    IfIn {
        var: Var,
        source: Expr,
        body: Vec<Stmt>,
    },
    /// Loop the deep variable `var` over every key path of `source`,
    /// the empty path first.
    DeepForIn {
        var: Var,
        source: Expr,
        body: Vec<Stmt>,
    },
    /// Run `body` only if the bound key path `var` leads somewhere in
    /// `source`.
    DeepIfIn {
        var: Var,
        source: Expr,
        body: Vec<Stmt>,
    },
    /// Run `fill` to collect the distinct `keys` tuples into projection
    /// `proj`, then run `body` once per tuple with `keys` bound.
    Project {
        proj: usize,
        keys: Vec<Var>,
        fill: Vec<Stmt>,
        body: Vec<Stmt>,
    },
    /// Record the current `keys` tuple in projection `proj`.
    Mark { proj: usize, keys: Vec<Var> },
    /// `tmp[slot][keys..] ??= value`.
    Init {
        slot: usize,
        keys: Vec<Var>,
        value: Expr,
        copy: bool,
    },
    /// `tmp[slot][keys..] = step(tmp[slot][keys..])`.
    Step {
        slot: usize,
        keys: Vec<Var>,
        step: Step,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Reduce { op: Reducer, arg: Expr },
    Prefix { op: Reducer, arg: Expr },
    Update { keys: Vec<Expr>, value: Expr },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Input,
    Const(Value),
    Var(Var),
    /// Placeholder for a variable that is not bound where it is used.
    Undefined(String),
    Get(Box<Expr>, Box<Expr>),
    /// Follow a key path.
    DeepGet(Box<Expr>, Box<Expr>),
    Pure(PureOp, Vec<Expr>),
    Singleton(Box<Expr>),
    /// Hints evaluate to nothing in this backend.
    Nop,
    Slot { slot: usize, keys: Vec<Expr> },
}

/// A generated program: hoisted assignments plus the result expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub result: Expr,
    pub slots: usize,
    pub projections: usize,
    pub var_names: Vec<String>,
}

impl Program {
    pub fn var_name(&self, var: Var) -> &str {
        self.var_names
            .get(var.index())
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn is_deep(&self, var: Var) -> bool {
        is_deep_name(self.var_name(var))
    }

    /// Total statement count, nested bodies included.
    pub fn stmt_count(&self) -> usize {
        fn count(stmts: &[Stmt]) -> usize {
            stmts
                .iter()
                .map(|s| match s {
                    Stmt::ForIn { body, .. }
                    | Stmt::IfIn { body, .. }
                    | Stmt::DeepForIn { body, .. }
                    | Stmt::DeepIfIn { body, .. } => 1 + count(body),
                    Stmt::Project { fill, body, .. } => 1 + count(fill) + count(body),
                    _ => 1,
                })
                .sum()
        }
        count(&self.body)
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Comment(text) => write!(f, "// {text}"),
            Stmt::Error(text) => write!(f, "// ERROR: {text}"),
            Stmt::ForIn { var, body, .. } => write!(f, "for v{}(body={})", var.0, body.len()),
            Stmt::IfIn { var, body, .. } => write!(f, "if v{}(body={})", var.0, body.len()),
            Stmt::DeepForIn { var, body, .. } => {
                write!(f, "deep for v{}(body={})", var.0, body.len())
            }
            Stmt::DeepIfIn { var, body, .. } => {
                write!(f, "deep if v{}(body={})", var.0, body.len())
            }
            Stmt::Project {
                proj, fill, body, ..
            } => write!(f, "project proj{proj}(fill={}, body={})", fill.len(), body.len()),
            Stmt::Mark { proj, keys } => write!(f, "mark proj{proj}[{}]", keys.len()),
            Stmt::Init { slot, keys, .. } => write!(f, "init tmp{slot}[{}]", keys.len()),
            Stmt::Step { slot, keys, step } => {
                let kind = match step {
                    Step::Reduce { op, .. } => op.to_string(),
                    Step::Prefix { op, .. } => format!("prefix_{op}"),
                    Step::Update { .. } => "update".to_string(),
                };
                write!(f, "step tmp{slot}[{}] {kind}", keys.len())
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Input => write!(f, "inp"),
            Expr::Const(value) => write!(f, "{}", format_const(value)),
            Expr::Var(var) => write!(f, "v{}", var.0),
            Expr::Undefined(name) => write!(f, "undefined({name})"),
            Expr::Get(base, key) => write!(f, "{base}[{key}]"),
            Expr::DeepGet(base, key) => write!(f, "{base}[{key}..]"),
            Expr::Pure(op, args) => {
                let args: Vec<String> = args.iter().map(Expr::to_string).collect();
                write!(f, "{op}({})", args.join(", "))
            }
            Expr::Singleton(arg) => write!(f, "mkset({arg})"),
            Expr::Nop => write!(f, "{{}}"),
            Expr::Slot { slot, keys } => {
                write!(f, "tmp{slot}")?;
                for key in keys {
                    write!(f, "[{key}]")?;
                }
                Ok(())
            }
        }
    }
}

/// Generate the program for an annotated, filter-collected tree.
pub fn generate(ctx: &mut Context, root: &Node, emit_comments: bool) -> Program {
    let mut builder = ProgramBuilder::new(ctx).with_comments(emit_comments);
    let result = builder.emit_expr(root, &Default::default());
    builder.finish(result)
}

#[cfg(test)]
mod tests;
