//! Generator dependency graph.
//!
//! `get(base, v)` makes `v` range over something computed from
//! `base.dims`, so `v` depends on those variables. The graph is closed
//! reflexively and transitively once; later passes only ever ask for
//! `trans(S)`.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::context::Context;
use crate::ir::{Node, NodeKind, Var, VarSet, VarTable};

/// Closed dependency sets, indexed by variable id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dependencies {
    closure: Vec<VarSet>,
}

impl Dependencies {
    pub fn from_closure(closure: Vec<VarSet>) -> Self {
        Self { closure }
    }

    /// Everything `var` transitively depends on, including itself.
    pub fn of(&self, var: Var) -> VarSet {
        self.closure
            .get(var.index())
            .cloned()
            .unwrap_or_else(|| VarSet::single(var))
    }

    pub fn trans(&self, set: &VarSet) -> VarSet {
        let mut acc = VarSet::new();
        for var in set {
            acc.extend(&self.of(var));
        }
        acc
    }

    /// `v -> deps` lines for every variable, in id order.
    pub fn listing(&self, vars: &VarTable) -> String {
        let mut out = String::new();
        for (i, deps) in self.closure.iter().enumerate() {
            let var = Var(i as u32);
            out.push_str(&format!(
                "{} -> {}\n",
                vars.name(var),
                deps.diff(&VarSet::single(var)).display(vars)
            ));
        }
        out
    }
}

/// Direct edges of the annotated tree, one entry per variable.
pub fn direct_edges(var_count: usize, root: &Node) -> Vec<VarSet> {
    let mut direct = vec![VarSet::new(); var_count];
    root.walk_post(&mut |node| {
        if let NodeKind::Get { base, key } = &node.kind {
            if let Some(var) = key.as_var() {
                if let Some(entry) = direct.get_mut(var.index()) {
                    entry.extend(&base.ann.dims);
                }
            }
        }
    });
    direct
}

/// Reflexive-transitive closure of `direct`.
pub fn close(direct: &[VarSet]) -> Vec<VarSet> {
    let mut graph: DiGraph<Var, ()> = DiGraph::with_capacity(direct.len(), direct.len());
    let nodes: Vec<NodeIndex> = (0..direct.len())
        .map(|i| graph.add_node(Var(i as u32)))
        .collect();
    for (from, deps) in direct.iter().enumerate() {
        for dep in deps {
            if let Some(&to) = nodes.get(dep.index()) {
                graph.add_edge(nodes[from], to, ());
            }
        }
    }

    nodes
        .iter()
        .map(|&start| {
            let mut reach = VarSet::new();
            let mut dfs = Dfs::new(&graph, start);
            while let Some(ix) = dfs.next(&graph) {
                reach.insert(graph[ix]);
            }
            reach
        })
        .collect()
}

/// Build and close the graph, storing it in the context.
pub fn compute(ctx: &mut Context, root: &Node) {
    let direct = direct_edges(ctx.vars.len(), root);
    ctx.deps = Dependencies::from_closure(close(&direct));
    tracing::debug!("dependencies:\n{}", ctx.deps.listing(&ctx.vars));
}
