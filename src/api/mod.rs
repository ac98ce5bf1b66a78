//! Public entry points: compile a raw query, run it, explain it.

pub(crate) mod pipeline;

use serde::Serialize;
use serde_json::Value;

use crate::ast::RawExpr;
use crate::codegen::lower::{JsLowering, Lowering};
use crate::codegen::Program;
use crate::diagnostic::{render_diagnostics, Diagnostic};
use crate::error::CompileError;
use crate::ir::Node;
use crate::runtime::{self, Udfs};
use pipeline::Compiled;

#[cfg(test)]
mod tests;

/// Which variables the root keeps as output dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputDims {
    /// Only the variables every result entry needs (`mind`).
    #[default]
    Minimal,
    /// Everything the root ranges over (`dims`).
    Desired,
}

/// Options controlling compilation.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    pub output: OutputDims,
    /// Re-verify every annotation invariant on the finished tree.
    pub check_invariants: bool,
    /// Emit a comment before every hoisted assignment.
    pub emit_comments: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            output: OutputDims::Minimal,
            check_invariants: true,
            emit_comments: true,
        }
    }
}

impl CompileOptions {
    pub fn with_output(mut self, output: OutputDims) -> Self {
        self.output = output;
        self
    }

    pub fn with_check_invariants(mut self, check: bool) -> Self {
        self.check_invariants = check;
        self
    }

    pub fn with_comments(mut self, emit: bool) -> Self {
        self.emit_comments = emit;
        self
    }
}

/// Compile a query with default options.
pub fn compile(raw: &RawExpr) -> Result<Query, CompileError> {
    compile_with_options(raw, &CompileOptions::default())
}

/// Compile a query with options.
pub fn compile_with_options(raw: &RawExpr, options: &CompileOptions) -> Result<Query, CompileError> {
    let compiled = Compiled::run(raw, options)?;
    let pseudo = compiled.pseudo_listing();
    tracing::trace!("pseudo listing:\n{pseudo}");

    let code = JsLowering::new().lower(&compiled.program).join("\n");
    let Compiled {
        ctx,
        term,
        root,
        program,
    } = compiled;
    let explain = Explain {
        source: term.to_string(),
        tree: root,
        vars: ctx.vars.names().to_vec(),
        filters: ctx.filters,
        hints: ctx.hints,
        pseudo,
        code,
        diagnostics: ctx.diagnostics,
    };
    Ok(Query { program, explain })
}

// ─── Query ─────────────────────────────────────────────────────────

/// A compiled query. Compiling once and running many times is the
/// intended use; a `Query` holds no per-run state.
#[derive(Clone, Debug)]
pub struct Query {
    program: Program,
    explain: Explain,
}

impl Query {
    /// Run on one input. An undefined result is `null`.
    pub fn run(&self, input: &Value) -> Value {
        self.run_with(input, &Udfs::new())
    }

    pub fn run_with(&self, input: &Value, udfs: &Udfs) -> Value {
        runtime::run(&self.program, input, udfs).unwrap_or(Value::Null)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn explain(&self) -> &Explain {
        &self.explain
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.explain.diagnostics
    }
}

/// Everything the compiler knows about a query, for inspection and for
/// alternate backends.
#[derive(Clone, Debug, Serialize)]
pub struct Explain {
    /// Preprocessed query, pretty-printed. Diagnostic spans point here.
    pub source: String,
    /// Annotated root.
    pub tree: Node,
    /// Variable names, indexed by id.
    pub vars: Vec<String>,
    pub filters: Vec<Node>,
    pub hints: Vec<Node>,
    pub pseudo: String,
    /// Generated source.
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl Explain {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Print the diagnostics to stderr against the query listing.
    pub fn render_diagnostics(&self, filename: &str) {
        render_diagnostics(&self.diagnostics, filename, &self.source);
    }
}
