//! Fatal compilation errors.

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// An error that stops compilation. Every variant names the offending
/// subterm in its pretty-printed form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unknown operator '{op}' in {subterm}")]
    UnknownOperator { op: String, subterm: String },

    #[error("malformed query: {reason} in {subterm}")]
    Malformed { reason: String, subterm: String },

    #[error("invariant violated during {pass}: {detail} at {subterm}")]
    InvariantViolation {
        pass: &'static str,
        detail: String,
        subterm: String,
    },
}

impl CompileError {
    pub fn subterm(&self) -> &str {
        match self {
            CompileError::UnknownOperator { subterm, .. }
            | CompileError::Malformed { subterm, .. }
            | CompileError::InvariantViolation { subterm, .. } => subterm,
        }
    }

    /// Convert into a diagnostic pointing at the subterm inside `listing`.
    pub fn to_diagnostic(&self, listing: &str) -> Diagnostic {
        let span = Span::locate_or_all(listing, self.subterm());
        let diag = Diagnostic::error(self.to_string(), span);
        match self {
            CompileError::UnknownOperator { .. } => diag.with_help(
                "operators must be pure, stateful, prefix_<stateful> or a special form".to_string(),
            ),
            CompileError::Malformed { .. } => diag,
            CompileError::InvariantViolation { pass, .. } => {
                diag.with_note(format!("raised by the {pass} pass; this is a compiler bug"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operator_message() {
        let err = CompileError::UnknownOperator {
            op: "median".to_string(),
            subterm: "median(data[*][value])".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown operator 'median' in median(data[*][value])"
        );
        let diag = err.to_diagnostic("median(data[*][value])");
        assert_eq!(diag.span, Span::new(0, 22));
        assert!(diag.help.is_some());
    }

    #[test]
    fn test_invariant_violation_note() {
        let err = CompileError::InvariantViolation {
            pass: "free",
            detail: "fre ∩ bnd = {D0}".to_string(),
            subterm: "sum(data[D0])".to_string(),
        };
        let diag = err.to_diagnostic("group: sum(data[D0])");
        assert_eq!(diag.span.start, 7);
        assert!(diag.notes[0].contains("free"));
    }
}
