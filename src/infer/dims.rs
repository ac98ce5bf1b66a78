//! Bottom-up pass: `vars`, `mind`, `dims`.

use crate::context::Context;
use crate::error::CompileError;
use crate::ir::{Annot, Mode, Node, NodeKind, VarSet};

use super::{check_dims, union_of};

pub fn infer_dims(ctx: &Context, node: Node) -> Result<Node, CompileError> {
    let (kind, ann) = match node.kind {
        NodeKind::Input => (NodeKind::Input, Annot::default()),
        NodeKind::Const { value } => (NodeKind::Const { value }, Annot::default()),
        NodeKind::Var { var } => {
            let single = VarSet::single(var);
            let ann = Annot {
                vars: single.clone(),
                mind: single.clone(),
                dims: single,
                ..Annot::default()
            };
            (NodeKind::Var { var }, ann)
        }
        NodeKind::Get { base, key } => {
            let base = infer_dims(ctx, *base)?;
            let key = infer_dims(ctx, *key)?;
            let ann = union_ann([&base, &key]);
            let kind = NodeKind::Get {
                base: Box::new(base),
                key: Box::new(key),
            };
            (kind, ann)
        }
        NodeKind::Pure { op, args } => {
            let args = infer_all(ctx, args)?;
            let ann = union_ann(&args);
            (NodeKind::Pure { op, args }, ann)
        }
        NodeKind::Hint { op, args } => {
            let args = infer_all(ctx, args)?;
            let ann = union_ann(&args);
            (NodeKind::Hint { op, args }, ann)
        }
        NodeKind::Mkset { arg } => {
            let arg = infer_dims(ctx, *arg)?;
            let ann = union_ann([&arg]);
            (NodeKind::Mkset { arg: Box::new(arg) }, ann)
        }
        NodeKind::Stateful { op, mode, arg } => {
            let arg = infer_dims(ctx, *arg)?;
            let ann = reduce_ann(mode, &arg);
            let kind = NodeKind::Stateful {
                op,
                mode,
                arg: Box::new(arg),
            };
            (kind, ann)
        }
        NodeKind::Prefix { op, mode, arg } => {
            let arg = infer_dims(ctx, *arg)?;
            let ann = reduce_ann(mode, &arg);
            let kind = NodeKind::Prefix {
                op,
                mode,
                arg: Box::new(arg),
            };
            (kind, ann)
        }
        NodeKind::Update {
            base,
            key,
            value,
            filter,
        } => {
            let base = infer_dims(ctx, *base)?;
            let key = infer_dims(ctx, *key)?;
            let value = infer_dims(ctx, *value)?;
            let filter = filter.map(|f| infer_dims(ctx, *f)).transpose()?;

            let mut all = vec![&base, &key, &value];
            all.extend(filter.as_ref());
            let vars = union_of(all, |a| &a.vars);
            // the key variables become the grouping index
            let mind = base.ann.mind.union(&value.ann.mind.diff(&key.ann.vars));
            let dims = base.ann.dims.union(&value.ann.dims.diff(&key.ann.vars));
            let ann = Annot {
                vars,
                mind,
                dims,
                ..Annot::default()
            };
            let kind = NodeKind::Update {
                base: Box::new(base),
                key: Box::new(key),
                value: Box::new(value),
                filter: filter.map(Box::new),
            };
            (kind, ann)
        }
    };
    let node = Node { kind, ann };
    check_dims(ctx, &node, "dims")?;
    Ok(node)
}

fn infer_all(ctx: &Context, nodes: Vec<Node>) -> Result<Vec<Node>, CompileError> {
    nodes.into_iter().map(|n| infer_dims(ctx, n)).collect()
}

fn union_ann<'a>(nodes: impl IntoIterator<Item = &'a Node> + Clone) -> Annot {
    Annot {
        vars: union_of(nodes.clone(), |a| &a.vars),
        mind: union_of(nodes.clone(), |a| &a.mind),
        dims: union_of(nodes, |a| &a.dims),
        ..Annot::default()
    }
}

/// A reduction can always collapse to one value. A reluctant one
/// prefers to stay indexed by its argument's dimensions.
fn reduce_ann(mode: Mode, arg: &Node) -> Annot {
    let dims = match mode {
        Mode::Reluctant => arg.ann.dims.clone(),
        Mode::Eager => VarSet::new(),
    };
    Annot {
        vars: arg.ann.vars.clone(),
        mind: VarSet::new(),
        dims,
        ..Annot::default()
    }
}
