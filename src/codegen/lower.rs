//! Lowering of a [`Program`] to source text.
//!
//! The emitted source targets a small JavaScript runtime object `rt`
//! (`rt.init`, `rt.update`, `rt.deepForIn`, `rt.stateful.*`,
//! `rt.pure.*`). It is the
//! "generated source" of the explain bundle; execution goes through the
//! interpreter in `runtime`.

use super::{Expr, Program, Step, Stmt};
use crate::ir::Reducer;

/// Lowers a generated program to source lines.
pub trait Lowering {
    fn lower(&self, program: &Program) -> Vec<String>;
}

/// Create the lowering for a target name. Only `"js"` exists today.
pub fn create_lowering(target: &str) -> Option<Box<dyn Lowering>> {
    match target {
        "js" => Some(Box::new(JsLowering::new())),
        _ => None,
    }
}

pub struct JsLowering {
    indent: usize,
}

impl Default for JsLowering {
    fn default() -> Self {
        Self::new()
    }
}

impl JsLowering {
    pub fn new() -> Self {
        Self { indent: 4 }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    fn line(&self, out: &mut Vec<String>, depth: usize, text: String) {
        out.push(format!("{}{}", " ".repeat(depth * self.indent), text));
    }

    fn stmts(&self, program: &Program, stmts: &[Stmt], depth: usize, out: &mut Vec<String>) {
        for stmt in stmts {
            self.stmt(program, stmt, depth, out);
        }
    }

    fn stmt(&self, program: &Program, stmt: &Stmt, depth: usize, out: &mut Vec<String>) {
        match stmt {
            Stmt::Comment(text) => self.line(out, depth, format!("// {text}")),
            Stmt::Error(text) => {
                self.line(out, depth, format!("// ERROR: {text}"));
                self.line(
                    out,
                    depth,
                    format!("console.warn({})", serde_json::Value::from(text.as_str())),
                );
            }
            Stmt::ForIn { var, source, body } => {
                let source = expr(program, source);
                let var = quote_var(program.var_name(*var));
                self.line(out, depth, format!("for (let {var} in ({source} ?? {{}})) {{"));
                self.stmts(program, body, depth + 1, out);
                self.line(out, depth, "}".to_string());
            }
            Stmt::IfIn { var, source, body } => {
                let source = expr(program, source);
                let var = quote_var(program.var_name(*var));
                self.line(out, depth, format!("if ({var} in ({source} ?? {{}})) {{"));
                self.stmts(program, body, depth + 1, out);
                self.line(out, depth, "}".to_string());
            }
            Stmt::DeepForIn { var, source, body } => {
                let source = expr(program, source);
                let var = quote_var(program.var_name(*var));
                self.line(out, depth, format!("rt.deepForIn({source}, {var} => {{"));
                self.stmts(program, body, depth + 1, out);
                self.line(out, depth, "})".to_string());
            }
            Stmt::DeepIfIn { var, source, body } => {
                let source = expr(program, source);
                let var = quote_var(program.var_name(*var));
                self.line(out, depth, format!("rt.deepIfIn({source}, {var}, () => {{"));
                self.stmts(program, body, depth + 1, out);
                self.line(out, depth, "})".to_string());
            }
            Stmt::Project {
                proj,
                keys,
                fill,
                body,
            } => {
                self.line(out, depth, "{".to_string());
                self.line(out, depth + 1, format!("let proj{proj} = {{}}"));
                self.stmts(program, fill, depth + 1, out);
                let mut path = format!("proj{proj}");
                for (i, key) in keys.iter().enumerate() {
                    let name = quote_var(program.var_name(*key));
                    if program.is_deep(*key) {
                        self.line(
                            out,
                            depth + 1 + i,
                            format!("rt.deepForInTemp({path}, ({name}_key, {name}) => {{"),
                        );
                        path = format!("{path}[{name}_key]");
                    } else {
                        self.line(out, depth + 1 + i, format!("for (let {name} in {path}) {{"));
                        path = format!("{path}[{name}]");
                    }
                }
                self.stmts(program, body, depth + 1 + keys.len(), out);
                for (i, key) in keys.iter().enumerate().rev() {
                    let close = if program.is_deep(*key) { "})" } else { "}" };
                    self.line(out, depth + 1 + i, close.to_string());
                }
                self.line(out, depth, "}".to_string());
            }
            Stmt::Mark { proj, keys } => {
                let keys = var_list(program, keys);
                self.line(out, depth, format!("rt.mark(proj{proj}{keys})"));
            }
            Stmt::Init {
                slot,
                keys,
                value,
                copy,
            } => {
                let keys = var_list(program, keys);
                let value = expr(program, value);
                let value = if *copy {
                    format!("structuredClone({value})")
                } else {
                    value
                };
                self.line(out, depth, format!("rt.init(tmp, {slot}{keys})(() => {value})"));
            }
            Stmt::Step { slot, keys, step } => {
                let keys = var_list(program, keys);
                let step = match step {
                    Step::Reduce { op, arg } => {
                        format!("{}({})", reducer(op), expr(program, arg))
                    }
                    Step::Prefix { op, arg } => format!(
                        "rt.stateful.prefix({}({}))",
                        reducer(op),
                        expr(program, arg)
                    ),
                    Step::Update { keys, value } => {
                        let keys: Vec<String> = keys.iter().map(|k| expr(program, k)).collect();
                        format!(
                            "rt.stateful.update([{}], {})",
                            keys.join(", "),
                            expr(program, value)
                        )
                    }
                };
                self.line(out, depth, format!("rt.update(tmp, {slot}{keys})({step})"));
            }
        }
    }
}

impl Lowering for JsLowering {
    fn lower(&self, program: &Program) -> Vec<String> {
        let mut out = vec!["inp => {".to_string()];
        self.line(&mut out, 1, "let tmp = []".to_string());
        self.stmts(program, &program.body, 1, &mut out);
        self.line(&mut out, 1, format!("return {}", expr(program, &program.result)));
        out.push("}".to_string());
        out
    }
}

/// `*A` is not an identifier; loop variables are spelled `xA`.
fn quote_var(name: &str) -> String {
    name.replace('*', "x")
}

fn var_list(program: &Program, vars: &[crate::ir::Var]) -> String {
    vars.iter()
        .map(|v| format!(", {}", quote_var(program.var_name(*v))))
        .collect()
}

fn reducer(op: &Reducer) -> String {
    if op.nullable {
        format!("rt.stateful[\"{op}\"]")
    } else {
        format!("rt.stateful.{op}")
    }
}

fn expr(program: &Program, e: &Expr) -> String {
    match e {
        Expr::Input => "inp".to_string(),
        Expr::Const(value) => value.to_string(),
        Expr::Var(var) => quote_var(program.var_name(*var)),
        Expr::Undefined(name) => format!("undefined /* ERROR: var '{name}' not defined */"),
        Expr::Get(base, key) => format!("{}?.[{}]", expr(program, base), expr(program, key)),
        Expr::DeepGet(base, key) => {
            format!("rt.deepGet({}, {})", expr(program, base), expr(program, key))
        }
        Expr::Pure(op, args) => {
            let args: Vec<String> = args.iter().map(|a| expr(program, a)).collect();
            format!("rt.pure.{op}({})", args.join(", "))
        }
        Expr::Singleton(arg) => format!("rt.singleton({})", expr(program, arg)),
        Expr::Nop => "({})".to_string(),
        Expr::Slot { slot, keys } => {
            let mut out = format!("tmp[{slot}]");
            for key in keys {
                out.push_str(&format!("?.[{}]", expr(program, key)));
            }
            out
        }
    }
}
