//! Top-down bound pass: `bnd`, `all_bnd`.
//!
//! `out` is the set of variables an enclosing scope still provides.
//! A reduction loops over whatever its argument ranges over beyond
//! `out`; an update loops over its key variable(s).

use crate::context::Context;
use crate::error::CompileError;
use crate::ir::{Annot, Node, NodeKind, VarSet};

use super::{check_scopes, union_of};

pub fn infer_bound(ctx: &Context, node: Node, out: &VarSet) -> Result<Node, CompileError> {
    let Node { kind, ann } = node;
    let (kind, bnd, children_bnd) = match kind {
        NodeKind::Input | NodeKind::Const { .. } | NodeKind::Var { .. } => {
            (kind, VarSet::new(), VarSet::new())
        }
        NodeKind::Get { base, key } => {
            let base = infer_bound(ctx, *base, out)?;
            let key = infer_bound(ctx, *key, out)?;
            let below = union_of([&base, &key], |a| &a.all_bnd);
            let kind = NodeKind::Get {
                base: Box::new(base),
                key: Box::new(key),
            };
            (kind, VarSet::new(), below)
        }
        NodeKind::Pure { op, args } => {
            let args = infer_all(ctx, args, out)?;
            let below = union_of(&args, |a| &a.all_bnd);
            (NodeKind::Pure { op, args }, VarSet::new(), below)
        }
        NodeKind::Hint { op, args } => {
            let args = infer_all(ctx, args, out)?;
            let below = union_of(&args, |a| &a.all_bnd);
            (NodeKind::Hint { op, args }, VarSet::new(), below)
        }
        NodeKind::Mkset { arg } => {
            let arg = infer_bound(ctx, *arg, out)?;
            let below = arg.ann.all_bnd.clone();
            (NodeKind::Mkset { arg: Box::new(arg) }, VarSet::new(), below)
        }
        NodeKind::Stateful { op, mode, arg } => {
            let (arg, bnd) = infer_reduced(ctx, *arg, out)?;
            let below = arg.ann.all_bnd.clone();
            let kind = NodeKind::Stateful {
                op,
                mode,
                arg: Box::new(arg),
            };
            (kind, bnd, below)
        }
        NodeKind::Prefix { op, mode, arg } => {
            let (arg, bnd) = infer_reduced(ctx, *arg, out)?;
            let below = arg.ann.all_bnd.clone();
            let kind = NodeKind::Prefix {
                op,
                mode,
                arg: Box::new(arg),
            };
            (kind, bnd, below)
        }
        NodeKind::Update {
            base,
            key,
            value,
            filter,
        } => {
            let key_vars = key.ann.vars.clone();
            let base = infer_bound(ctx, *base, out)?;
            let key = infer_bound(ctx, *key, out)?;
            let filter = match filter {
                Some(filter) => {
                    let inner = out.union(&key_vars).union(&filter.ann.dims);
                    Some(infer_bound(ctx, *filter, &inner)?)
                }
                None => None,
            };
            let value = infer_bound(ctx, *value, &out.union(&key_vars))?;

            let mut all = vec![&base, &key, &value];
            all.extend(filter.as_ref());
            let below = union_of(all, |a| &a.all_bnd);
            let bnd = key_vars.diff(out);
            let kind = NodeKind::Update {
                base: Box::new(base),
                key: Box::new(key),
                value: Box::new(value),
                filter: filter.map(Box::new),
            };
            (kind, bnd, below)
        }
    };
    let all_bnd = bnd.union(&children_bnd);
    let node = Node {
        kind,
        ann: Annot { bnd, all_bnd, ..ann },
    };
    check_scopes(ctx, &node, "bound")?;
    Ok(node)
}

fn infer_all(ctx: &Context, nodes: Vec<Node>, out: &VarSet) -> Result<Vec<Node>, CompileError> {
    nodes
        .into_iter()
        .map(|n| infer_bound(ctx, n, out))
        .collect()
}

/// Argument of a reduction, visited with its own dimensions in scope.
fn infer_reduced(ctx: &Context, arg: Node, out: &VarSet) -> Result<(Node, VarSet), CompileError> {
    let bnd = arg.ann.dims.diff(out);
    let inner = out.union(&arg.ann.dims);
    let arg = infer_bound(ctx, arg, &inner)?;
    Ok((arg, bnd))
}
