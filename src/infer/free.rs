//! Top-down free pass: `fre`.
//!
//! A node's free variables are the ones it needs from the enclosing
//! scope: its bound variables' dependencies, its children's free
//! variables, and the keys of enclosing groupings it is correlated with.
//! All of it limited to `out`.
//!
//! Correlation through an outer grouping is not visible locally, so the
//! enclosing filtered updates are passed down as [`PathEntry`]s.

use crate::context::Context;
use crate::error::CompileError;
use crate::ir::{Annot, Node, NodeKind, VarSet};

use super::{check_scopes, union_of};

/// An enclosing update with a computed key.
#[derive(Clone, Debug)]
pub struct PathEntry {
    pub keys: VarSet,
    /// `trans(keys)`.
    pub trans: VarSet,
}

pub fn infer_free(
    ctx: &Context,
    node: Node,
    out: &VarSet,
    path: &[PathEntry],
) -> Result<Node, CompileError> {
    let Node { kind, ann } = node;
    let (kind, fre) = match kind {
        NodeKind::Input | NodeKind::Const { .. } => (kind, VarSet::new()),
        NodeKind::Var { var } => (kind, VarSet::single(var)),
        NodeKind::Get { base, key } => {
            let base = infer_free(ctx, *base, out, path)?;
            let key = infer_free(ctx, *key, out, path)?;
            let fre = union_of([&base, &key], |a| &a.fre);
            let kind = NodeKind::Get {
                base: Box::new(base),
                key: Box::new(key),
            };
            (kind, fre)
        }
        NodeKind::Pure { op, args } => {
            let args = infer_all(ctx, args, out, path)?;
            let fre = union_of(&args, |a| &a.fre);
            (NodeKind::Pure { op, args }, fre)
        }
        NodeKind::Hint { op, args } => {
            let args = infer_all(ctx, args, out, path)?;
            let fre = union_of(&args, |a| &a.fre);
            (NodeKind::Hint { op, args }, fre)
        }
        NodeKind::Mkset { arg } => {
            let arg = infer_free(ctx, *arg, out, path)?;
            let fre = arg.ann.fre.clone();
            (NodeKind::Mkset { arg: Box::new(arg) }, fre)
        }
        NodeKind::Stateful { op, mode, arg } => {
            let arg = infer_reduced(ctx, *arg, out, path)?;
            let fre = reduced_free(ctx, &ann.bnd, &arg.ann.fre, out, path);
            let kind = NodeKind::Stateful {
                op,
                mode,
                arg: Box::new(arg),
            };
            (kind, fre)
        }
        NodeKind::Prefix { op, mode, arg } => {
            let arg = infer_reduced(ctx, *arg, out, path)?;
            let fre = reduced_free(ctx, &ann.bnd, &arg.ann.fre, out, path);
            let kind = NodeKind::Prefix {
                op,
                mode,
                arg: Box::new(arg),
            };
            (kind, fre)
        }
        NodeKind::Update {
            base,
            key,
            value,
            filter,
        } => {
            let key_vars = key.ann.vars.clone();
            let base = infer_free(ctx, *base, out, path)?;
            let key_out = out.union(&key.ann.dims);
            let key = infer_free(ctx, *key, &key_out, path)?;

            let mut body_free = VarSet::new();
            let filter = match filter {
                Some(filter) => {
                    let inner = out.union(&filter.ann.dims.diff(&key_vars));
                    let filter = infer_free(ctx, *filter, &inner, path)?;
                    if let Some(body) = filter_body(&filter) {
                        let local = body.ann.dims.diff(out);
                        body_free = body.ann.fre.diff(&local);
                    }
                    Some(filter)
                }
                None => None,
            };

            let value_out = out.union(&key_vars);
            let value = if filter.is_some() {
                let mut inner_path = path.to_vec();
                inner_path.push(PathEntry {
                    trans: ctx.deps.trans(&key_vars),
                    keys: key_vars.clone(),
                });
                infer_free(ctx, *value, &value_out, &inner_path)?
            } else {
                infer_free(ctx, *value, &value_out, path)?
            };

            let mut fre = ctx.deps.trans(&ann.bnd);
            fre.extend(&base.ann.fre);
            fre.extend(&key.ann.fre);
            fre.extend(&value.ann.fre);
            fre.extend(&body_free);
            fre.extend(&correlated(ctx, &ann.bnd, path));
            let fre = fre.intersect(out);

            let kind = NodeKind::Update {
                base: Box::new(base),
                key: Box::new(key),
                value: Box::new(value),
                filter: filter.map(Box::new),
            };
            (kind, fre)
        }
    };
    let node = Node {
        kind,
        ann: Annot { fre, ..ann },
    };
    check_scopes(ctx, &node, "free")?;
    Ok(node)
}

fn infer_all(
    ctx: &Context,
    nodes: Vec<Node>,
    out: &VarSet,
    path: &[PathEntry],
) -> Result<Vec<Node>, CompileError> {
    nodes
        .into_iter()
        .map(|n| infer_free(ctx, n, out, path))
        .collect()
}

fn infer_reduced(
    ctx: &Context,
    arg: Node,
    out: &VarSet,
    path: &[PathEntry],
) -> Result<Node, CompileError> {
    let inner = out.union(&arg.ann.dims);
    infer_free(ctx, arg, &inner, path)
}

fn reduced_free(
    ctx: &Context,
    bnd: &VarSet,
    arg_free: &VarSet,
    out: &VarSet,
    path: &[PathEntry],
) -> VarSet {
    let mut fre = ctx.deps.trans(bnd);
    fre.extend(arg_free);
    fre.extend(&correlated(ctx, bnd, path));
    fre.intersect(out)
}

/// Keys of enclosing groupings whose dependencies meet `trans(bnd)`.
fn correlated(ctx: &Context, bnd: &VarSet, path: &[PathEntry]) -> VarSet {
    let reach = ctx.deps.trans(bnd);
    let mut keys = VarSet::new();
    for entry in path {
        if entry.trans.overlaps(&reach) {
            keys.extend(&entry.keys);
        }
    }
    keys
}

/// `body` of a `get(mkset(body), K)` key filter.
fn filter_body(filter: &Node) -> Option<&Node> {
    let NodeKind::Get { base, .. } = &filter.kind else {
        return None;
    };
    match &base.kind {
        NodeKind::Mkset { arg } => Some(arg),
        _ => None,
    }
}
