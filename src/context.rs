//! Per-compilation state.
//!
//! Every pass takes a `&mut Context` (or `&Context`). Nothing outlives a
//! single `compile` call, so compilations never observe each other.

use indexmap::IndexSet;

use crate::diagnostic::Diagnostic;
use crate::infer::deps::Dependencies;
use crate::ir::{Node, Var, VarTable};
use crate::span::Span;

#[derive(Debug, Default)]
pub struct Context {
    pub vars: VarTable,
    /// Structural keys of collection expressions ranged over by
    /// canonical variables. A variable's number is its key's index.
    prefixes: IndexSet<String>,
    pub deps: Dependencies,
    pub filters: Vec<Node>,
    pub hints: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
    /// Rendered query the diagnostics point into.
    pub listing: String,
}

impl Context {
    pub fn new(listing: String) -> Self {
        Self {
            listing,
            ..Self::default()
        }
    }

    /// Variable named after `key`'s position in the prefix registry,
    /// e.g. `D0` or `K3`. Equal keys get the same variable.
    pub fn canonical_var(&mut self, tag: char, key: String) -> Var {
        let (index, _) = self.prefixes.insert_full(key);
        self.vars.intern(&format!("{tag}{index}"))
    }

    pub fn render(&self, node: &Node) -> String {
        node.display(&self.vars).to_string()
    }

    pub fn warn(&mut self, message: String, subterm: &str) {
        tracing::warn!("{message}");
        let span = Span::locate_or_all(&self.listing, subterm);
        self.diagnostics.push(Diagnostic::warning(message, span));
    }

    pub fn error(&mut self, message: String, subterm: &str) {
        tracing::warn!("{message}");
        let span = Span::locate_or_all(&self.listing, subterm);
        self.diagnostics.push(Diagnostic::error(message, span));
    }
}
