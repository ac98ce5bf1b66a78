//! The pass sequence behind `compile`.
//!
//! preprocess → extract → dims → deps → top-down → verify → collect →
//! generate. Each pass logs a summary at debug level; the first fatal
//! error aborts the whole compilation.

use crate::ast::RawExpr;
use crate::codegen::{self, Program};
use crate::context::Context;
use crate::error::CompileError;
use crate::extract::{self, collect};
use crate::infer::{self, deps, dims};
use crate::ir::Node;
use crate::preprocess::{self, Term};

use super::{CompileOptions, OutputDims};

/// Everything a successful run of the passes produced.
pub(crate) struct Compiled {
    pub ctx: Context,
    pub term: Term,
    pub root: Node,
    pub program: Program,
}

impl Compiled {
    pub fn run(raw: &RawExpr, options: &CompileOptions) -> Result<Self, CompileError> {
        let term = preprocess::preprocess(raw)?;
        let mut ctx = Context::new(term.to_string());
        tracing::debug!(query = %ctx.listing, "preprocessed");

        let root = extract::extract(&mut ctx, &term)?;
        tracing::debug!(vars = ctx.vars.len(), tree = %ctx.render(&root), "extracted");

        let root = dims::infer_dims(&ctx, root)?;
        tracing::debug!(
            vars = %root.ann.vars.display(&ctx.vars),
            mind = %root.ann.mind.display(&ctx.vars),
            dims = %root.ann.dims.display(&ctx.vars),
            "bottom-up inference"
        );

        deps::compute(&mut ctx, &root);

        let out = match options.output {
            OutputDims::Minimal => root.ann.mind.clone(),
            OutputDims::Desired => root.ann.dims.clone(),
        };
        let root = infer::infer_top_down(&ctx, root, &out)?;
        tracing::debug!(
            out = %out.display(&ctx.vars),
            all_bnd = %root.ann.all_bnd.display(&ctx.vars),
            "top-down inference"
        );

        if options.check_invariants {
            infer::verify(&ctx, &root)?;
        }

        collect::collect(&mut ctx, &root);
        let program = codegen::generate(&mut ctx, &root, options.emit_comments);
        tracing::debug!(
            slots = program.slots,
            projections = program.projections,
            stmts = program.stmt_count(),
            "generated"
        );

        Ok(Self {
            ctx,
            term,
            root,
            program,
        })
    }

    /// Generators with their free variables, the dependency closure,
    /// and the final tree.
    pub fn pseudo_listing(&self) -> String {
        let ctx = &self.ctx;
        let mut out = String::new();
        for (i, filter) in ctx.filters.iter().enumerate() {
            let fre = collect::filter_source(filter)
                .map(|source| source.ann.fre.display(&ctx.vars).to_string())
                .unwrap_or_default();
            out.push_str(&format!("gen{i}[{fre}] = {}\n", ctx.render(filter)));
        }
        for hint in &ctx.hints {
            out.push_str(&format!("{}\n", ctx.render(hint)));
        }
        out.push_str(&ctx.deps.listing(&ctx.vars));
        out.push_str(&format!("res = {}\n", ctx.render(&self.root)));
        out
    }
}
