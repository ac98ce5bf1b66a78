//! Term tree → IR node tree.
//!
//! - every anonymous `*` becomes a variable named after the collection
//!   it ranges over, so equal collections share one generator
//! - `group(k, v)` becomes `update({}, k, v)`
//! - a key that is not a variable is routed through `mkset`, giving the
//!   update a generator that yields zero or one key
//! - update values that are not aggregates are wrapped in a reluctant
//!   `single`, keeping them indexed by their own variables

pub mod collect;

use serde_json::json;

use crate::context::Context;
use crate::error::CompileError;
use crate::ir::{Mode, Node, NodeKind, Reducer, ReducerOp};
use crate::preprocess::Term;

pub fn extract(ctx: &mut Context, term: &Term) -> Result<Node, CompileError> {
    let node = match term {
        Term::Input => Node::input(),
        Term::Const { value } => Node::constant(value.clone()),
        Term::Var { name } => Node::var(ctx.vars.intern(name)),
        Term::Wildcard => {
            return Err(CompileError::Malformed {
                reason: "anonymous '*' outside of a path".to_string(),
                subterm: term.to_string(),
            })
        }
        Term::Get { base, key } => {
            let e1 = extract(ctx, base)?;
            let e2 = match **key {
                Term::Wildcard => Node::var(ctx.canonical_var('D', base.structural_key())),
                _ => extract(ctx, key)?,
            };
            Node::get(e1, e2)
        }
        Term::Pure { op, args } => Node::pure(*op, extract_all(ctx, args)?),
        Term::Hint { op, args } => Node::new(NodeKind::Hint {
            op: op.clone(),
            args: extract_all(ctx, args)?,
        }),
        Term::Mkset { arg } => Node::mkset(extract(ctx, arg)?),
        Term::Stateful { op, arg } => Node::stateful(*op, Mode::Eager, extract(ctx, arg)?),
        Term::Prefix { op, arg } => Node::new(NodeKind::Prefix {
            op: *op,
            mode: Mode::Eager,
            arg: Box::new(extract(ctx, arg)?),
        }),
        Term::Group { key, value } => {
            let base = Node::constant(json!({}));
            extract_update(ctx, base, key, value)?
        }
        Term::Update { base, key, value } => {
            let base = extract(ctx, base)?;
            extract_update(ctx, base, key, value)?
        }
    };
    Ok(node)
}

fn extract_all(ctx: &mut Context, terms: &[Term]) -> Result<Vec<Node>, CompileError> {
    terms.iter().map(|t| extract(ctx, t)).collect()
}

fn extract_update(
    ctx: &mut Context,
    base: Node,
    key: &Term,
    value: &Term,
) -> Result<Node, CompileError> {
    let key = extract(ctx, key)?;
    let value = extract_flex(ctx, value)?;
    if key.as_var().is_some() {
        return Ok(Node::update(base, key, value, None));
    }
    let set = Node::mkset(key);
    let var = ctx.canonical_var('K', set.structural_key());
    let filter = Node::get(set, Node::var(var));
    Ok(Node::update(base, Node::var(var), value, Some(filter)))
}

/// Extract an update value, wrapping non-aggregates in `single`.
fn extract_flex(ctx: &mut Context, term: &Term) -> Result<Node, CompileError> {
    let node = extract(ctx, term)?;
    if term.is_aggregate() {
        return Ok(node);
    }
    Ok(Node::stateful(
        Reducer::new(ReducerOp::Single),
        Mode::Reluctant,
        node,
    ))
}
