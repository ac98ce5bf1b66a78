//! ProgramBuilder: hoists aggregates out of the annotated tree.

use std::collections::HashMap;

use serde_json::json;

use crate::context::Context;
use crate::extract::collect::{filter_source, filter_var};
use crate::ir::{Node, NodeKind, PureOp, Var, VarSet};
use crate::runtime::reduce;

use super::{Expr, Program, Step, Stmt};

// ─── ProgramBuilder ────────────────────────────────────────────────

/// A catalogued filter, prepared for scheduling.
#[derive(Clone, Debug)]
pub(crate) struct Generator {
    /// Variable the filter defines.
    pub(crate) var: Var,
    /// Collection the variable ranges over.
    pub(crate) source: Node,
    /// Variables the collection needs before it can be evaluated.
    pub(crate) needs: VarSet,
    /// Rendered filter, for diagnostics.
    pub(crate) text: String,
}

pub struct ProgramBuilder<'a> {
    pub(crate) ctx: &'a mut Context,
    /// Filter catalogue in scheduling order.
    pub(crate) generators: Vec<Generator>,
    /// Completed assignments, in dependency order.
    pub(crate) stmts: Vec<Stmt>,
    /// Structural key of an aggregate -> its slot.
    pub(crate) assigned: HashMap<String, usize>,
    pub(crate) slot_counter: usize,
    pub(crate) proj_counter: usize,
    pub(crate) emit_comments: bool,
}

impl<'a> ProgramBuilder<'a> {
    pub fn new(ctx: &'a mut Context) -> Self {
        let generators = ctx
            .filters
            .iter()
            .filter_map(|filter| {
                let var = filter_var(filter)?;
                let source = filter_source(filter)?.clone();
                Some(Generator {
                    var,
                    needs: source.ann.fre.clone(),
                    source,
                    text: ctx.render(filter),
                })
            })
            .collect();
        Self {
            ctx,
            generators,
            stmts: Vec::new(),
            assigned: HashMap::new(),
            slot_counter: 0,
            proj_counter: 0,
            emit_comments: true,
        }
    }

    pub fn with_comments(mut self, emit: bool) -> Self {
        self.emit_comments = emit;
        self
    }

    pub fn finish(self, result: Expr) -> Program {
        Program {
            body: self.stmts,
            result,
            slots: self.slot_counter,
            projections: self.proj_counter,
            var_names: self.ctx.vars.names().to_vec(),
        }
    }

    // ── Expressions ───────────────────────────────────────────────

    /// Translate `node` for use where `env` is bound.
    pub fn emit_expr(&mut self, node: &Node, env: &VarSet) -> Expr {
        match &node.kind {
            NodeKind::Input => Expr::Input,
            NodeKind::Const { value } => Expr::Const(value.clone()),
            NodeKind::Var { var } => self.emit_var(*var, env),
            NodeKind::Get { base, key } => {
                let deep = key.as_var().is_some_and(|v| self.ctx.vars.is_deep(v));
                let base = Box::new(self.emit_expr(base, env));
                let key = Box::new(self.emit_expr(key, env));
                if deep {
                    Expr::DeepGet(base, key)
                } else {
                    Expr::Get(base, key)
                }
            }
            NodeKind::Pure { op, args } => {
                let args = args.iter().map(|a| self.emit_expr(a, env)).collect();
                Expr::Pure(*op, args)
            }
            NodeKind::Hint { .. } => Expr::Nop,
            NodeKind::Mkset { arg } => Expr::Singleton(Box::new(self.emit_expr(arg, env))),
            NodeKind::Stateful { .. } | NodeKind::Prefix { .. } | NodeKind::Update { .. } => {
                let slot = self.assign(node);
                let keys = node.ann.fre.iter().map(|v| self.emit_var(v, env)).collect();
                Expr::Slot { slot, keys }
            }
        }
    }

    pub(crate) fn emit_var(&mut self, var: Var, env: &VarSet) -> Expr {
        if env.contains(var) {
            return Expr::Var(var);
        }
        let name = self.ctx.vars.name(var).to_string();
        self.ctx.error(format!("var '{name}' not defined"), &name);
        Expr::Undefined(name)
    }

    // ── Assignments ───────────────────────────────────────────────

    /// Hoist an aggregate into its own slot, reusing an equal one.
    fn assign(&mut self, node: &Node) -> usize {
        let key = node.structural_key();
        if let Some(&slot) = self.assigned.get(&key) {
            return slot;
        }
        let slot = self.slot_counter;
        self.slot_counter += 1;

        let fre = node.ann.fre.clone();
        let bnd = node.ann.bnd.clone();
        let keys: Vec<Var> = fre.iter().collect();
        let mut out = Vec::new();

        if self.emit_comments {
            out.push(Stmt::Comment(format!(
                "tmp{slot}[{}] = {}",
                fre.display(&self.ctx.vars),
                self.ctx.render(node)
            )));
        }

        let recomputed = match &node.kind {
            NodeKind::Stateful { arg, .. } | NodeKind::Prefix { arg, .. } => arg.ann.dims.diff(&fre),
            NodeKind::Update { key, .. } => key.ann.vars.diff(&fre),
            _ => bnd.clone(),
        };
        if recomputed != bnd {
            let message = format!(
                "bound variables of tmp{slot} disagree: inferred {{{}}}, recomputed {{{}}}",
                bnd.display(&self.ctx.vars),
                recomputed.display(&self.ctx.vars)
            );
            out.push(Stmt::Comment(format!("WARNING! {message}")));
            let rendered = self.ctx.render(node);
            self.ctx.warn(message, &rendered);
        }

        if let Some(init) = init_of(node) {
            let init_keys = keys.clone();
            let stmts = self.schedule(&VarSet::new(), &fre, &VarSet::new(), |b, env| {
                let (value, copy) = match (init, &node.kind) {
                    (Init::Identity(value), _) => (Expr::Const(value), false),
                    (Init::Base, NodeKind::Update { base, .. }) => (b.emit_expr(base, env), true),
                    (Init::Base, _) => (Expr::Const(json!(null)), false),
                };
                vec![Stmt::Init {
                    slot,
                    keys: init_keys,
                    value,
                    copy,
                }]
            });
            out.extend(stmts);
        }

        let step = self.schedule(&VarSet::new(), &fre, &bnd, |b, env| {
            b.emit_step(node, env)
                .map(|step| Stmt::Step { slot, keys, step })
                .into_iter()
                .collect()
        });
        out.extend(step);

        tracing::debug!(
            slot,
            fre = %fre.display(&self.ctx.vars),
            bnd = %bnd.display(&self.ctx.vars),
            "assigned aggregate"
        );
        self.assigned.insert(key, slot);
        self.stmts.extend(out);
        slot
    }

    fn emit_step(&mut self, node: &Node, env: &VarSet) -> Option<Step> {
        let step = match &node.kind {
            NodeKind::Stateful { op, arg, .. } => Step::Reduce {
                op: *op,
                arg: self.emit_expr(arg, env),
            },
            NodeKind::Prefix { op, arg, .. } => Step::Prefix {
                op: *op,
                arg: self.emit_expr(arg, env),
            },
            NodeKind::Update { key, value, .. } => {
                let keys = match &key.kind {
                    NodeKind::Pure {
                        op: PureOp::Vars,
                        args,
                    } => args.iter().map(|a| self.emit_expr(a, env)).collect(),
                    _ => vec![self.emit_expr(key, env)],
                };
                Step::Update {
                    keys,
                    value: self.emit_expr(value, env),
                }
            }
            _ => return None,
        };
        Some(step)
    }
}

enum Init {
    Identity(serde_json::Value),
    /// A copy of the update's base, evaluated per free-variable binding.
    Base,
}

fn init_of(node: &Node) -> Option<Init> {
    match &node.kind {
        NodeKind::Stateful { op, .. } => reduce::identity(*op).map(Init::Identity),
        NodeKind::Prefix { .. } => Some(Init::Identity(json!([]))),
        NodeKind::Update { .. } => Some(Init::Base),
        _ => None,
    }
}
