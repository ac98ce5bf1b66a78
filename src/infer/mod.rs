//! Variable inference.
//!
//! Bottom-up ([`dims`]) computes what each subterm ranges over, the
//! dependency graph ([`deps`]) relates generator variables, and the two
//! top-down passes ([`bound`], [`free`]) decide where every variable is
//! looped over. Each pass checks the annotation invariants on every node
//! it produces and aborts on the first violation.

pub mod bound;
pub mod deps;
pub mod dims;
pub mod free;

use serde_json::json;

use crate::context::Context;
use crate::error::CompileError;
use crate::ir::{Annot, Node, NodeKind, PureOp, VarSet};

/// Run both top-down passes with `out` as the root's free budget, then
/// wrap the root in a grouping over `out` if it is non-empty.
pub fn infer_top_down(ctx: &Context, root: Node, out: &VarSet) -> Result<Node, CompileError> {
    let root = bound::infer_bound(ctx, root, out)?;
    let root = free::infer_free(ctx, root, out, &[])?;
    if out.is_empty() {
        return Ok(root);
    }

    let key_vars: Vec<Node> = out
        .iter()
        .map(|var| {
            let mut node = Node::var(var);
            let single = VarSet::single(var);
            node.ann = Annot {
                vars: single.clone(),
                mind: single.clone(),
                dims: single.clone(),
                fre: single,
                ..Annot::default()
            };
            node
        })
        .collect();
    let mut key = Node::pure(PureOp::Vars, key_vars);
    key.ann = Annot {
        vars: out.clone(),
        mind: out.clone(),
        dims: out.clone(),
        fre: out.clone(),
        ..Annot::default()
    };

    let ann = Annot {
        vars: root.ann.vars.union(out),
        mind: root.ann.mind.diff(out),
        dims: root.ann.dims.diff(out),
        bnd: out.clone(),
        all_bnd: out.union(&root.ann.all_bnd),
        fre: VarSet::new(),
    };
    let wrapped = Node {
        kind: NodeKind::Update {
            base: Box::new(Node::constant(json!({}))),
            key: Box::new(key),
            value: Box::new(root),
            filter: None,
        },
        ann,
    };
    check_dims(ctx, &wrapped, "top-down")?;
    check_scopes(ctx, &wrapped, "top-down")?;
    Ok(wrapped)
}

/// `mind ⊆ dims ⊆ vars`.
pub fn check_dims(ctx: &Context, node: &Node, pass: &'static str) -> Result<(), CompileError> {
    let ann = &node.ann;
    if !ann.mind.is_subset(&ann.dims) {
        return Err(violation(ctx, node, pass, "mind", &ann.mind, "dims", &ann.dims));
    }
    if !ann.dims.is_subset(&ann.vars) {
        return Err(violation(ctx, node, pass, "dims", &ann.dims, "vars", &ann.vars));
    }
    Ok(())
}

/// `fre ∩ bnd = ∅` and `fre ∩ allBnd = ∅`.
pub fn check_scopes(ctx: &Context, node: &Node, pass: &'static str) -> Result<(), CompileError> {
    let ann = &node.ann;
    for (name, set) in [("bnd", &ann.bnd), ("allBnd", &ann.all_bnd)] {
        let shared = ann.fre.intersect(set);
        if !shared.is_empty() {
            return Err(CompileError::InvariantViolation {
                pass,
                detail: format!(
                    "fre ∩ {name} = {{{}}}",
                    shared.display(&ctx.vars)
                ),
                subterm: ctx.render(node),
            });
        }
    }
    Ok(())
}

/// Re-check every invariant on a finished tree.
pub fn verify(ctx: &Context, root: &Node) -> Result<(), CompileError> {
    let mut result = Ok(());
    root.walk_post(&mut |node| {
        if result.is_ok() {
            result = check_dims(ctx, node, "verify").and_then(|()| check_scopes(ctx, node, "verify"));
        }
    });
    result
}

fn violation(
    ctx: &Context,
    node: &Node,
    pass: &'static str,
    small: &str,
    small_set: &VarSet,
    large: &str,
    large_set: &VarSet,
) -> CompileError {
    CompileError::InvariantViolation {
        pass,
        detail: format!(
            "{small} {{{}}} ⊄ {large} {{{}}}",
            small_set.display(&ctx.vars),
            large_set.display(&ctx.vars)
        ),
        subterm: ctx.render(node),
    }
}

/// Union of one annotation field over several nodes.
pub(crate) fn union_of<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    field: impl Fn(&Annot) -> &VarSet,
) -> VarSet {
    let mut acc = VarSet::new();
    for node in nodes {
        acc.extend(field(&node.ann));
    }
    acc
}

#[cfg(test)]
mod tests;
