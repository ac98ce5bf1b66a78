//! Interpreter for generated loop-nest programs.
//!
//! Values are `serde_json::Value`, with undefined as `None`. Slots hold
//! nested objects keyed by the rendered values of their free variables;
//! a slot with no free variables holds the aggregate itself.

pub mod ops;
pub mod reduce;
pub mod value;

use std::borrow::Cow;
use std::mem;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::codegen::{Expr, Program, Step, Stmt};
use crate::ir::Var;

pub use ops::{Udf, Udfs};
use value::{contains_key, deep_lookup, deep_paths, key_string, keys_of, lookup, singleton};

/// Distinct key tuples collected by a projection fill, in first-seen order.
#[derive(Clone, Debug, Default)]
struct Projection(IndexMap<String, ProjEntry>);

#[derive(Clone, Debug)]
struct ProjEntry {
    key: Value,
    next: Projection,
}

/// Run `program` over `input`. Returns `None` when the result is undefined.
pub fn run(program: &Program, input: &Value, udfs: &Udfs) -> Option<Value> {
    let mut interp = Interpreter::new(program, input, udfs);
    interp.exec_all(&program.body);
    let result = interp.eval(&program.result).map(Cow::into_owned);
    tracing::trace!(defined = result.is_some(), "program finished");
    result
}

struct Interpreter<'p> {
    program: &'p Program,
    udfs: &'p Udfs,
    input: &'p Value,
    env: Vec<Option<Value>>,
    tmp: Vec<Option<Value>>,
    proj: Vec<Projection>,
}

impl<'p> Interpreter<'p> {
    fn new(program: &'p Program, input: &'p Value, udfs: &'p Udfs) -> Self {
        Self {
            program,
            udfs,
            input,
            env: vec![None; program.var_names.len()],
            tmp: vec![None; program.slots],
            proj: vec![Projection::default(); program.projections],
        }
    }

    // ── Statements ────────────────────────────────────────────────

    fn exec_all(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.exec(stmt);
        }
    }

    fn exec(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Comment(_) | Stmt::Error(_) => {}
            Stmt::ForIn { var, source, body } => {
                let keys = match self.eval(source) {
                    Some(collection) => keys_of(&collection),
                    None => return,
                };
                let saved = self.env[var.index()].take();
                for key in keys {
                    self.env[var.index()] = Some(key);
                    self.exec_all(body);
                }
                self.env[var.index()] = saved;
            }
            Stmt::IfIn { var, source, body } => {
                let present = match (self.eval(source), &self.env[var.index()]) {
                    (Some(collection), Some(key)) => contains_key(&collection, key),
                    _ => false,
                };
                if present {
                    self.exec_all(body);
                }
            }
            Stmt::DeepForIn { var, source, body } => {
                let paths = match self.eval(source) {
                    Some(root) => deep_paths(&root),
                    None => return,
                };
                let saved = self.env[var.index()].take();
                for path in paths {
                    self.env[var.index()] = Some(path);
                    self.exec_all(body);
                }
                self.env[var.index()] = saved;
            }
            Stmt::DeepIfIn { var, source, body } => {
                let present = match (self.eval(source), &self.env[var.index()]) {
                    (Some(root), Some(path)) => deep_lookup(&root, path).is_some(),
                    _ => false,
                };
                if present {
                    self.exec_all(body);
                }
            }
            Stmt::Project {
                proj,
                keys,
                fill,
                body,
            } => {
                self.proj[*proj] = Projection::default();
                self.exec_all(fill);
                let tuples = mem::take(&mut self.proj[*proj]);
                self.walk_projection(&tuples, keys, body);
            }
            Stmt::Mark { proj, keys } => {
                let Some(values) = self.bound(keys) else {
                    return;
                };
                let mut level = &mut self.proj[*proj];
                for key in values {
                    level = &mut level
                        .0
                        .entry(key_string(&key))
                        .or_insert_with(|| ProjEntry {
                            key,
                            next: Projection::default(),
                        })
                        .next;
                }
            }
            Stmt::Init {
                slot, keys, value, ..
            } => {
                let Some(path) = self.bound_keys(keys) else {
                    return;
                };
                let Some(value) = self.eval(value).map(Cow::into_owned) else {
                    return;
                };
                modify(&mut self.tmp[*slot], &path, |state| state.or(Some(value)));
            }
            Stmt::Step { slot, keys, step } => {
                let Some(path) = self.bound_keys(keys) else {
                    return;
                };
                self.exec_step(*slot, &path, step);
            }
        }
    }

    fn exec_step(&mut self, slot: usize, path: &[String], step: &Step) {
        match step {
            Step::Reduce { op, arg } => {
                let x = self.eval(arg).map(Cow::into_owned);
                let op = *op;
                modify(&mut self.tmp[slot], path, |state| reduce::step(op, state, x));
            }
            Step::Prefix { op, arg } => {
                let Some(x) = self.eval(arg).map(Cow::into_owned) else {
                    return;
                };
                let op = *op;
                modify(&mut self.tmp[slot], path, |state| {
                    let mut items = match state {
                        Some(Value::Array(items)) => items,
                        _ => Vec::new(),
                    };
                    let last = items.last().cloned().or_else(|| reduce::identity(op));
                    if let Some(next) = reduce::step(op, last, Some(x)) {
                        items.push(next);
                    }
                    Some(Value::Array(items))
                });
            }
            Step::Update { keys, value } => {
                let mut target = Vec::with_capacity(keys.len());
                for key in keys {
                    let deep = matches!(key, Expr::Var(v) if self.program.is_deep(*v));
                    match self.eval(key) {
                        // a key path nests the value, `[]` replaces the state
                        Some(path) if deep => {
                            if let Value::Array(parts) = path.as_ref() {
                                target.extend(parts.iter().map(key_string));
                            }
                        }
                        Some(key) => target.push(key_string(&key)),
                        None => return,
                    }
                }
                let Some(value) = self.eval(value).map(Cow::into_owned) else {
                    return;
                };
                modify(&mut self.tmp[slot], path, |state| {
                    let mut state = state.unwrap_or_else(|| Value::Object(Map::new()));
                    set_path(&mut state, &target, value);
                    Some(state)
                });
            }
        }
    }

    fn walk_projection(&mut self, level: &Projection, keys: &[Var], body: &[Stmt]) {
        let Some((var, rest)) = keys.split_first() else {
            self.exec_all(body);
            return;
        };
        let saved = self.env[var.index()].take();
        for entry in level.0.values() {
            self.env[var.index()] = Some(entry.key.clone());
            self.walk_projection(&entry.next, rest, body);
        }
        self.env[var.index()] = saved;
    }

    /// Current values of `vars`, or `None` if any is unbound.
    fn bound(&self, vars: &[Var]) -> Option<Vec<Value>> {
        vars.iter().map(|v| self.env[v.index()].clone()).collect()
    }

    fn bound_keys(&self, vars: &[Var]) -> Option<Vec<String>> {
        vars.iter()
            .map(|v| self.env[v.index()].as_ref().map(key_string))
            .collect()
    }

    // ── Expressions ───────────────────────────────────────────────

    fn eval<'s>(&'s self, expr: &'s Expr) -> Option<Cow<'s, Value>> {
        match expr {
            Expr::Input => Some(Cow::Borrowed(self.input)),
            Expr::Const(value) => Some(Cow::Borrowed(value)),
            Expr::Var(var) => self.env[var.index()].as_ref().map(Cow::Borrowed),
            Expr::Undefined(_) => None,
            Expr::Get(base, key) => {
                let base = self.eval(base)?;
                let key = self.eval(key)?;
                match base {
                    Cow::Borrowed(base) => lookup(base, &key).map(Cow::Borrowed),
                    Cow::Owned(base) => lookup(&base, &key).cloned().map(Cow::Owned),
                }
            }
            Expr::DeepGet(base, path) => {
                let base = self.eval(base)?;
                let path = self.eval(path)?;
                match base {
                    Cow::Borrowed(base) => deep_lookup(base, &path).map(Cow::Borrowed),
                    Cow::Owned(base) => deep_lookup(&base, &path).cloned().map(Cow::Owned),
                }
            }
            Expr::Pure(op, args) => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a).map(Cow::into_owned))
                    .collect();
                ops::apply_pure(*op, args, self.udfs).map(Cow::Owned)
            }
            Expr::Singleton(arg) => {
                let arg = self.eval(arg).map(Cow::into_owned);
                Some(Cow::Owned(singleton(arg)))
            }
            Expr::Nop => Some(Cow::Owned(Value::Object(Map::new()))),
            Expr::Slot { slot, keys } => {
                let mut cur = self.tmp[*slot].as_ref()?;
                for key in keys {
                    let key = self.eval(key)?;
                    cur = lookup(cur, &key)?;
                }
                Some(Cow::Borrowed(cur))
            }
        }
    }
}

// ─── Slot storage ──────────────────────────────────────────────────

/// Replace the entry at `path` under `root` with `f(entry)`, creating
/// intermediate objects. Entries keep their position in the object.
fn modify(root: &mut Option<Value>, path: &[String], f: impl FnOnce(Option<Value>) -> Option<Value>) {
    let Some((last, init)) = path.split_last() else {
        let state = root.take();
        *root = f(state);
        return;
    };
    let mut cur = root.get_or_insert_with(|| Value::Object(Map::new()));
    for key in init {
        let Value::Object(map) = cur else {
            return;
        };
        cur = map
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let Value::Object(map) = cur else {
        return;
    };
    match map.get_mut(last) {
        Some(entry) => {
            let state = mem::take(entry);
            if let Some(next) = f(Some(state)) {
                *entry = next;
            }
        }
        None => {
            if let Some(next) = f(None) {
                map.insert(last.clone(), next);
            }
        }
    }
}

fn set_path(target: &mut Value, path: &[String], value: Value) {
    let Some((last, init)) = path.split_last() else {
        *target = value;
        return;
    };
    let mut cur = target;
    for key in init {
        let Value::Object(map) = cur else {
            return;
        };
        cur = map
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Value::Object(map) = cur {
        map.insert(last.clone(), value);
    }
}
