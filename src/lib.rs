//! Rhyme: a compiler for path-based aggregation queries.
//!
//! A query is a raw expression tree ([`ast::RawExpr`]). Compilation
//! stratifies it, turns every `*` into a named generator variable,
//! infers where each variable is iterated, and emits a loop-nest program
//! that computes each aggregate once per binding of its free variables.
//!
//! ```
//! use rhyme::ast::{group, path, sum};
//! use serde_json::json;
//!
//! let query = rhyme::compile(&group(path("data.*.key"), sum(path("data.*.value")))).unwrap();
//! let data = json!({"data": [
//!     {"key": "A", "value": 10},
//!     {"key": "B", "value": 20},
//!     {"key": "A", "value": 30},
//! ]});
//! assert_eq!(query.run(&data), json!({"A": 40, "B": 20}));
//! ```

pub mod api;
pub mod ast;
pub mod codegen;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod extract;
pub mod infer;
pub mod ir;
pub mod preprocess;
pub mod runtime;
pub mod span;

pub use api::*;
pub use error::CompileError;
pub use runtime::Udfs;
