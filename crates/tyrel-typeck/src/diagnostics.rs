//! Diagnostic emission for typing errors.
//!
//! Each [`TypeError`] becomes one [`Diagnostic`] carrying the error's code
//! and, where the error has a source location, a primary label. Relations
//! synthesized without source text carry [`Span::DUMMY`] and get no label.
//!
//! Shape obligations left on a [`Solution`] are reported as warnings.

use tyrel_diagnostics::{Diagnostic, DiagnosticHandler, FileId, FullSpan, Span};

use crate::config::SolverConfig;
use crate::error::TypeError;
use crate::solver::Solution;

/// Code of the warning emitted for a deferred shape obligation.
pub const DEFERRED_CODE: &str = "W0001";

/// Converts a typing error into a diagnostic labelled in `file`.
#[must_use]
pub fn to_diagnostic(err: &TypeError, file: FileId) -> Diagnostic {
    let diag = Diagnostic::error(err.to_string()).with_code(err.code());
    let label = |diag: Diagnostic, span: Span, message: &str| {
        if span.is_dummy() {
            diag
        } else {
            diag.with_label(FullSpan::new(file, span), message)
        }
    };

    match err {
        TypeError::Mismatch { detail, span, .. } => {
            let diag = label(diag, *span, "type mismatch here");
            match detail {
                Some(detail) => diag.with_note(format!("the types differ in {detail}")),
                None => diag,
            }
        }
        TypeError::OccursCheck { span, .. } => label(diag, *span, "infinite type detected")
            .with_note("this would create an infinitely recursive type"),
        TypeError::KindMismatch { span, .. } => label(diag, *span, "kind mismatch"),
        TypeError::AssertionFailed { span, .. } => label(diag, *span, "shape check failed here"),
        TypeError::Unresolved { .. } => {
            diag.with_note("add a relation or annotation that determines these types")
        }
        TypeError::StuckRelation {
            args,
            diverged,
            span,
            ..
        } => {
            let args: Vec<String> = args.iter().map(ToString::to_string).collect();
            let diag = label(diag, *span, "in this operator call")
                .with_note(format!("arguments: ({})", args.join(", ")));
            if *diverged {
                diag.with_note("relation solving did not converge")
            } else {
                diag
            }
        }
        TypeError::DimensionMismatch { span, .. } => {
            label(diag, *span, "dimension mismatch here")
        }
    }
}

/// Emits every error into `handler`, labelled in the session's file.
pub fn emit_all(handler: &mut DiagnosticHandler, errors: &[TypeError], config: &SolverConfig) {
    for err in errors {
        handler.emit(to_diagnostic(err, config.file));
    }
}

/// Emits one warning per deferred shape obligation of `solution`.
pub fn emit_deferred(handler: &mut DiagnosticHandler, solution: &Solution) {
    for cond in solution.deferred() {
        handler.emit(
            Diagnostic::warning(format!("shape condition `{cond}` could not be checked"))
                .with_code(DEFERRED_CODE)
                .with_note("it must hold for the shapes seen at run time"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyrel_arith::{Cond, IndexExpr};
    use tyrel_types::Ty;

    #[test]
    fn test_assertion_diagnostic() {
        let err = TypeError::AssertionFailed {
            cond: Cond::equal(IndexExpr::lit(3), IndexExpr::lit(4)),
            span: Span::from_raw(10, 20),
        };
        let diag = to_diagnostic(&err, FileId::new(2));
        assert_eq!(diag.code.as_deref(), Some("T0004"));
        assert_eq!(
            diag.primary_span(),
            Some(FullSpan::new(FileId::new(2), Span::from_raw(10, 20)))
        );
        assert!(diag.to_string().starts_with("error[T0004]: assertion failed: 3 == 4"));
    }

    #[test]
    fn test_stuck_diagnostic_lists_arguments() {
        let err = TypeError::StuckRelation {
            name: "broadcast".to_string(),
            args: vec![Ty::unit()],
            diverged: true,
            span: Span::from_raw(0, 4),
        };
        let diag = to_diagnostic(&err, FileId::default());
        assert_eq!(diag.notes.len(), 2);
        assert_eq!(diag.notes[0], "arguments: (())");
    }

    #[test]
    fn test_emit_all_counts() {
        let mut handler = DiagnosticHandler::new();
        let errors = vec![
            TypeError::Unresolved { vars: Vec::new() },
            TypeError::Unresolved { vars: Vec::new() },
        ];
        emit_all(&mut handler, &errors, &SolverConfig::default());
        assert_eq!(handler.error_count(), 2);
        assert!(handler.diagnostics()[0].labels.is_empty());
    }

    #[test]
    fn test_emit_all_labels_in_configured_file() {
        let config = SolverConfig::from_toml_str("file = 3").unwrap();
        let mut handler = DiagnosticHandler::new();
        let err = TypeError::AssertionFailed {
            cond: Cond::equal(IndexExpr::lit(1), IndexExpr::lit(2)),
            span: Span::from_raw(4, 9),
        };
        emit_all(&mut handler, &[err], &config);
        assert_eq!(
            handler.diagnostics()[0].primary_span(),
            Some(FullSpan::new(FileId::new(3), Span::from_raw(4, 9)))
        );
    }

    #[test]
    fn test_dummy_span_is_not_labelled() {
        let err = TypeError::KindMismatch {
            expected: tyrel_types::Kind::Type,
            found: tyrel_types::Kind::ShapeVar,
            span: Span::DUMMY,
        };
        let diag = to_diagnostic(&err, FileId::new(1));
        assert_eq!(diag.primary_span(), None);
        assert_eq!(diag.code.as_deref(), Some("T0003"));
    }
}
