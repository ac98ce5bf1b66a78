//! Raw tree → stratified term tree.
//!
//! Resolves literals and identifiers, looks operator names up in the
//! builtin tables and lowers arrays and object literals. `*` markers and
//! `group` survive as-is for the extractor.

pub mod builtins;

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use crate::ast::RawExpr;
use crate::error::CompileError;
use crate::ir::{format_const, PureOp, Reducer, ReducerOp};
use builtins::Builtin;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    Input,
    Const { value: Value },
    Var { name: String },
    /// Anonymous `*`.
    Wildcard,
    Get { base: Box<Term>, key: Box<Term> },
    Pure { op: PureOp, args: Vec<Term> },
    Hint { op: String, args: Vec<Term> },
    Mkset { arg: Box<Term> },
    Stateful { op: Reducer, arg: Box<Term> },
    Prefix { op: Reducer, arg: Box<Term> },
    Group { key: Box<Term>, value: Box<Term> },
    Update {
        base: Box<Term>,
        key: Box<Term>,
        value: Box<Term>,
    },
}

impl Term {
    pub fn get(base: Term, key: Term) -> Term {
        Term::Get {
            base: Box::new(base),
            key: Box::new(key),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Term::Stateful { .. } | Term::Prefix { .. } | Term::Update { .. } | Term::Group { .. }
        )
    }

    /// Structural identity used for canonical variable naming.
    pub fn structural_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}

pub fn preprocess(raw: &RawExpr) -> Result<Term, CompileError> {
    match raw {
        RawExpr::Input => Ok(Term::Input),
        RawExpr::Const { value } => Ok(Term::Const {
            value: value.clone(),
        }),
        RawExpr::Ident { name } => ident(name),
        RawExpr::Get { base, key } => {
            let base = match base {
                Some(base) => preprocess(base)?,
                None => Term::Input,
            };
            Ok(Term::get(base, preprocess(key)?))
        }
        RawExpr::Op { op, args } => {
            let args = preprocess_all(args)?;
            build(op, args)
        }
        RawExpr::Apply { head, args } => {
            let head = preprocess(head)?;
            let args = preprocess_all(args)?;
            match head {
                Term::Const {
                    value: Value::String(name),
                } => build(&name, args),
                head => {
                    let mut all = vec![head];
                    all.extend(args);
                    Ok(Term::Pure {
                        op: PureOp::Apply,
                        args: all,
                    })
                }
            }
        }
        RawExpr::Hint { head, args } => {
            let head = preprocess(head)?;
            let args = preprocess_all(args)?;
            match head {
                Term::Const {
                    value: Value::String(op),
                } => Ok(Term::Hint { op, args }),
                head => {
                    let mut all = vec![head];
                    all.extend(args);
                    Ok(Term::Hint {
                        op: "generic".to_string(),
                        args: all,
                    })
                }
            }
        }
        RawExpr::Array { items } => {
            let mut items = preprocess_all(items)?;
            match items.len() {
                0 => Ok(Term::Const { value: json!([]) }),
                1 => Ok(collect_array(items.remove(0))),
                _ => Ok(Term::Pure {
                    op: PureOp::Flatten,
                    args: items.into_iter().map(collect_array).collect(),
                }),
            }
        }
        RawExpr::Object { entries } => {
            let mut acc = Term::Const { value: json!({}) };
            for entry in entries {
                acc = Term::Update {
                    base: Box::new(acc),
                    key: Box::new(preprocess(&entry.key)?),
                    value: Box::new(preprocess(&entry.value)?),
                };
            }
            Ok(acc)
        }
    }
}

fn preprocess_all(raws: &[RawExpr]) -> Result<Vec<Term>, CompileError> {
    raws.iter().map(preprocess).collect()
}

fn ident(name: &str) -> Result<Term, CompileError> {
    let term = match name {
        "*" => Term::Wildcard,
        "**" => {
            return Err(CompileError::Malformed {
                reason: "deep variables must be named, e.g. '**A'".to_string(),
                subterm: name.to_string(),
            })
        }
        _ if name.starts_with('*') => Term::Var {
            name: name.to_string(),
        },
        _ => Term::Const {
            value: Value::String(name.to_string()),
        },
    };
    Ok(term)
}

fn collect_array(item: Term) -> Term {
    Term::Stateful {
        op: Reducer::new(ReducerOp::Array),
        arg: Box::new(item),
    }
}

fn render_call(name: &str, args: &[Term]) -> String {
    let args: Vec<String> = args.iter().map(Term::to_string).collect();
    format!("{name}({})", args.join(", "))
}

fn build(name: &str, mut args: Vec<Term>) -> Result<Term, CompileError> {
    let Some(builtin) = builtins::classify(name) else {
        return Err(CompileError::UnknownOperator {
            op: name.to_string(),
            subterm: render_call(name, &args),
        });
    };
    let (min, max) = builtins::arity(builtin);
    if args.len() < min || args.len() > max {
        return Err(CompileError::Malformed {
            reason: format!("'{name}' does not take {} argument(s)", args.len()),
            subterm: render_call(name, &args),
        });
    }
    let term = match builtin {
        Builtin::Get => {
            let key = args.pop().unwrap_or(Term::Input);
            let base = args.pop().unwrap_or(Term::Input);
            Term::get(base, key)
        }
        Builtin::Group => {
            let value = args.remove(1);
            let key = args.remove(0);
            Term::Group {
                key: Box::new(key),
                value: Box::new(value),
            }
        }
        Builtin::Update => {
            let value = args.remove(2);
            let key = args.remove(1);
            let base = args.remove(0);
            Term::Update {
                base: Box::new(base),
                key: Box::new(key),
                value: Box::new(value),
            }
        }
        Builtin::Mkset => Term::Mkset {
            arg: Box::new(args.remove(0)),
        },
        Builtin::Stateful(op) => Term::Stateful {
            op,
            arg: Box::new(args.remove(0)),
        },
        Builtin::Prefix(op) => Term::Prefix {
            op,
            arg: Box::new(args.remove(0)),
        },
        Builtin::Pure(op) => Term::Pure { op, args },
    };
    Ok(term)
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Input => write!(f, "inp"),
            Term::Const { value } => write!(f, "{}", format_const(value)),
            Term::Var { name } => write!(f, "{name}"),
            Term::Wildcard => write!(f, "*"),
            Term::Get { base, key } => match **base {
                Term::Input => write!(f, "{key}"),
                _ => write!(f, "{base}[{key}]"),
            },
            Term::Pure { op, args } => write!(f, "{}", render_call(op.name(), args)),
            Term::Hint { op, args } => write!(f, "hint:{}", render_call(op, args)),
            Term::Mkset { arg } => write!(f, "mkset({arg})"),
            Term::Stateful { op, arg } => write!(f, "{op}({arg})"),
            Term::Prefix { op, arg } => write!(f, "prefix_{op}({arg})"),
            Term::Group { key, value } => write!(f, "group({key}, {value})"),
            Term::Update { base, key, value } => write!(f, "{base}{{ {key}: {value} }}"),
        }
    }
}
