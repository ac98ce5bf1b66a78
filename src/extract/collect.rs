//! Filter and hint catalogues.
//!
//! Every `get(base, var)` in the annotated tree is a generator
//! definition for `var`. The catalogue keeps first-seen order (children
//! before parents) and drops structural duplicates.

use std::collections::HashSet;

use crate::context::Context;
use crate::ir::{Node, NodeKind, Var};

pub fn collect(ctx: &mut Context, root: &Node) {
    let mut filters = Catalogue::default();
    let mut hints = Catalogue::default();
    root.walk_post(&mut |node| match &node.kind {
        NodeKind::Get { key, .. } if key.as_var().is_some() => filters.push(node),
        NodeKind::Hint { .. } => hints.push(node),
        _ => {}
    });
    tracing::debug!(
        filters = filters.items.len(),
        hints = hints.items.len(),
        "collected generators"
    );
    ctx.filters = filters.items;
    ctx.hints = hints.items;
}

/// Variable a filter defines.
pub fn filter_var(filter: &Node) -> Option<Var> {
    match &filter.kind {
        NodeKind::Get { key, .. } => key.as_var(),
        _ => None,
    }
}

/// Generator expression of a filter.
pub fn filter_source(filter: &Node) -> Option<&Node> {
    match &filter.kind {
        NodeKind::Get { base, .. } => Some(base),
        _ => None,
    }
}

#[derive(Default)]
struct Catalogue {
    seen: HashSet<String>,
    items: Vec<Node>,
}

impl Catalogue {
    fn push(&mut self, node: &Node) {
        if self.seen.insert(node.structural_key()) {
            self.items.push(node.clone());
        }
    }
}
