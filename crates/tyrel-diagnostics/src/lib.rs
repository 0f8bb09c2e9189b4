//! Diagnostics for the tyrel type solver.
//!
//! Typing failures are surfaced to callers as [`Diagnostic`] values: a
//! severity, a message, an error code, and labelled source locations. The
//! builder API mirrors what compiler front ends usually expose:
//!
//! ```
//! use tyrel_diagnostics::{Diagnostic, FileId, FullSpan, Span};
//!
//! let span = FullSpan::new(FileId::new(0), Span::from_raw(10, 24));
//! let diag = Diagnostic::error("assertion failed: 3 == 4")
//!     .with_code("T0004")
//!     .with_label(span, "shape check failed here");
//! assert!(diag.is_error());
//! ```
//!
//! Diagnostics render to plain text through `Display` and serialize with
//! `serde` for tooling.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod span;

pub use span::{BytePos, FileId, FullSpan, Span};

use serde::{Deserialize, Serialize};

/// The severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A typing failure that aborts the program unit.
    Error,
    /// A shape obligation that could not be discharged statically.
    Warning,
}

impl Severity {
    /// Get the label printed in front of the message.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// A labeled span for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// The span being labeled.
    pub span: FullSpan,
    /// The message for this label.
    pub message: String,
}

/// A diagnostic message with source locations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of this diagnostic.
    pub severity: Severity,
    /// The main message.
    pub message: String,
    /// An optional error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Labeled spans with messages.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub labels: Vec<Label>,
    /// Additional notes.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            code: None,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Create a new error diagnostic.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Add an error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add a label. The first label added is the primary location.
    #[must_use]
    pub fn with_label(mut self, span: FullSpan, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    /// Add a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Check if this is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The primary label's span, if there is one.
    #[must_use]
    pub fn primary_span(&self) -> Option<FullSpan> {
        self.labels.first().map(|l| l.span)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.severity.label())?;
        if let Some(code) = &self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)?;
        for (i, label) in self.labels.iter().enumerate() {
            let arrow = if i == 0 { "-->" } else { "   " };
            write!(f, "\n {arrow} {}", label.span)?;
            if !label.message.is_empty() {
                write!(f, ": {}", label.message)?;
            }
        }
        for note in &self.notes {
            write!(f, "\n = note: {note}")?;
        }
        Ok(())
    }
}

/// A handler for collecting diagnostics.
#[derive(Debug, Default)]
pub struct DiagnosticHandler {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticHandler {
    /// Create a new diagnostic handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
        }
        self.diagnostics.push(diagnostic);
    }

    /// Check if any errors have been emitted.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Get the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Get the number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Get all diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take all diagnostics, leaving the handler empty.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        self.warning_count = 0;
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> FullSpan {
        FullSpan::new(FileId::new(0), Span::from_raw(10, 20))
    }

    #[test]
    fn test_diagnostic_builder() {
        let diag = Diagnostic::error("type mismatch")
            .with_code("T0001")
            .with_label(span(), "expected `float32`, found `int32`")
            .with_note("tensor element types must agree");

        assert!(diag.is_error());
        assert_eq!(diag.code.as_deref(), Some("T0001"));
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.primary_span(), Some(span()));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error("assertion failed")
            .with_code("T0004")
            .with_label(span(), "here")
            .with_note("shapes differ");

        let text = diag.to_string();
        assert!(text.starts_with("error[T0004]: assertion failed"));
        assert!(text.contains("--> #0:10..20: here"));
        assert!(text.contains("= note: shapes differ"));
    }

    #[test]
    fn test_diagnostic_handler_counts() {
        let mut handler = DiagnosticHandler::new();

        handler.emit(Diagnostic::error("error 1"));
        handler.emit(Diagnostic::warning("warning 1"));
        handler.emit(Diagnostic::error("error 2"));

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 2);
        assert_eq!(handler.warning_count(), 1);
        assert!(!handler.diagnostics()[1].is_error());

        let taken = handler.take_diagnostics();
        assert_eq!(taken.len(), 3);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_serialized_form() {
        let diag = Diagnostic::error("stuck").with_code("T0006");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"code\":\"T0006\""));
        assert!(!json.contains("labels"));
    }
}
