//! Filter scheduling.
//!
//! Turns a set of variables to iterate into a loop nest. Filters whose
//! collection only needs already bound variables become available; an
//! available filter binds its variable with a `for` or, when the variable
//! is already bound, tests membership with an `if`. Deep variables get
//! the key-path forms of both. Rounds repeat until
//! nothing is pending or a round makes no progress.
//!
//! When the transitive closure of the requested variables reaches beyond
//! them, the full nest is run once to fill a projection keyed by the
//! requested variables, and the body iterates the projection instead.
//! This is what lets an uncorrelated aggregate be computed once.

use crate::ir::{Var, VarSet};

use super::builder::ProgramBuilder;
use super::{Expr, Stmt};

struct Level {
    var: Var,
    fresh: bool,
    deep: bool,
    source: Expr,
}

impl ProgramBuilder<'_> {
    /// Nest `body` inside loops binding `(free ∪ bnd) − scope`.
    pub(crate) fn schedule<F>(
        &mut self,
        scope: &VarSet,
        free: &VarSet,
        bnd: &VarSet,
        body: F,
    ) -> Vec<Stmt>
    where
        F: FnOnce(&mut Self, &VarSet) -> Vec<Stmt>,
    {
        let iter = free.union(bnd).diff(scope);
        if iter.is_empty() {
            return body(self, scope);
        }

        let full = self.closure_of(&iter);
        if full.diff(scope) == iter {
            return self.emit_filters(scope, &iter, body);
        }

        let proj = self.proj_counter;
        self.proj_counter += 1;
        let keys: Vec<Var> = iter.iter().collect();
        let mark = Stmt::Mark {
            proj,
            keys: keys.clone(),
        };
        let fill = self.emit_filters(scope, &full, |_, _| vec![mark]);
        let inner = scope.union(&iter);
        let body = body(self, &inner);
        vec![Stmt::Project {
            proj,
            keys,
            fill,
            body,
        }]
    }

    /// `iter` plus everything their collections need, transitively.
    pub(crate) fn closure_of(&self, iter: &VarSet) -> VarSet {
        let mut full = iter.clone();
        loop {
            let before = full.len();
            for generator in &self.generators {
                if full.contains(generator.var) {
                    full.extend(&generator.needs);
                }
            }
            if full.len() == before {
                return full;
            }
        }
    }

    fn emit_filters<F>(&mut self, scope: &VarSet, iter: &VarSet, body: F) -> Vec<Stmt>
    where
        F: FnOnce(&mut Self, &VarSet) -> Vec<Stmt>,
    {
        let mut pending: Vec<usize> = (0..self.generators.len())
            .filter(|&i| iter.contains(self.generators[i].var))
            .collect();
        let mut seen = scope.clone();
        let mut levels: Vec<Level> = Vec::new();

        loop {
            let (available, rest): (Vec<usize>, Vec<usize>) = pending
                .iter()
                .copied()
                .partition(|&i| self.generators[i].needs.is_subset(&seen));
            if available.is_empty() {
                break;
            }
            pending = rest;
            for i in available {
                let var = self.generators[i].var;
                let source_node = self.generators[i].source.clone();
                let source = self.emit_expr(&source_node, &seen);
                let fresh = seen.insert(var);
                let deep = self.ctx.vars.is_deep(var);
                levels.push(Level {
                    var,
                    fresh,
                    deep,
                    source,
                });
            }
        }

        let mut inner = Vec::new();
        for i in pending {
            let var = self.generators[i].var;
            let text = format!(
                "unsolved filter ordering problem: {} := {}",
                self.ctx.vars.name(var),
                self.generators[i].text
            );
            let filter = self.generators[i].text.clone();
            self.ctx.warn(text.clone(), &filter);
            inner.push(Stmt::Error(text));
        }
        inner.extend(body(self, &seen));

        levels.into_iter().rev().fold(inner, |body, level| {
            let Level {
                var,
                fresh,
                deep,
                source,
            } = level;
            let stmt = match (fresh, deep) {
                (true, false) => Stmt::ForIn { var, source, body },
                (false, false) => Stmt::IfIn { var, source, body },
                (true, true) => Stmt::DeepForIn { var, source, body },
                (false, true) => Stmt::DeepIfIn { var, source, body },
            };
            vec![stmt]
        })
    }
}
