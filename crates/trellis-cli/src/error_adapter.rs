//! Error adapter for converting TrellisError to miette diagnostics.
//!
//! This module provides the bridge between the library's error types and
//! miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Diagnostic Support
//!
//! A [`TrellisError::Decode`] carries every diagnostic produced before the
//! failure, warnings included. Each diagnostic is rendered independently.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, Severity as MietteSeverity, SourceSpan};

use trellis::{Diagnostic, Severity, TrellisError, position::Range};

/// Adapter for a single trellis diagnostic.
///
/// The subject range becomes the primary label, the context range a
/// secondary one, and the detail line the help text.
pub struct DiagnosticAdapter<'a> {
    /// The wrapped diagnostic
    diag: &'a Diagnostic,
    /// Source text for displaying snippets; empty when there is none
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src }
    }

    fn has_source(&self) -> bool {
        !self.src.is_empty()
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.summary())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<MietteSeverity> {
        Some(match self.diag.severity() {
            Severity::Error => MietteSeverity::Error,
            Severity::Warning => MietteSeverity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .detail()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.has_source()
            .then_some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if !self.has_source() {
            return None;
        }

        let mut labels = Vec::new();
        if let Some(subject) = self.diag.subject() {
            labels.push(LabeledSpan::new_primary_with_span(
                Some(location(subject)),
                range_to_miette(subject),
            ));
        }
        if let Some(context) = self.diag.context() {
            if Some(context) != self.diag.subject() {
                labels.push(LabeledSpan::new_with_span(None, range_to_miette(context)));
            }
        }

        if labels.is_empty() {
            return None;
        }
        Some(Box::new(labels.into_iter()))
    }
}

/// Adapter for non-diagnostic [`TrellisError`] variants.
///
/// This adapter handles errors that don't carry source ranges, such as I/O,
/// projection and configuration errors.
pub struct ErrorAdapter<'a>(pub &'a TrellisError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TrellisError::Io(_) => "trellis::io",
            TrellisError::Decode { .. } => return None,
            TrellisError::Projection(_) => "trellis::projection",
            TrellisError::Config(_) => "trellis::config",
        };
        Some(Box::new(code))
    }
}

/// A reportable error that can be rendered by miette.
///
/// This enum wraps either a single diagnostic or a non-diagnostic error,
/// providing a uniform interface for error rendering.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A rich diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<MietteSeverity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a trellis [`Range`] to a miette [`SourceSpan`].
fn range_to_miette(range: &Range) -> SourceSpan {
    SourceSpan::new(range.start().byte().into(), range.len())
}

fn location(range: &Range) -> String {
    format!(
        "{}:{}:{}",
        range.filename(),
        range.start().line(),
        range.start().column()
    )
}

/// Convert a [`TrellisError`] into a list of reportable errors.
///
/// For [`TrellisError::Decode`], this returns one [`Reportable`] for each
/// diagnostic in the error. For other error variants, this returns a single
/// [`Reportable`].
pub fn to_reportables(err: &TrellisError) -> Vec<Reportable<'_>> {
    match err {
        TrellisError::Decode { diagnostics, src } => diagnostics
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, src)))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

#[cfg(test)]
mod tests {
    use trellis::{ErrorCode, position::Pos};

    use super::*;

    fn range(start: usize, text: &str) -> Range {
        Range::covering("doc.yaml", Pos::new(1, start + 1, start), text)
    }

    #[test]
    fn test_single_diagnostic() {
        let diag = Diagnostic::error("no mapping found for expected attribute \"port\"")
            .with_code(ErrorCode::E300)
            .with_subject(range(0, "hello"))
            .with_detail("declare it or mark it optional");
        let err = TrellisError::new_decode_error(diag.into(), "hello: world");

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);

        match &reportables[0] {
            Reportable::Diagnostic(d) => {
                assert_eq!(
                    d.to_string(),
                    "no mapping found for expected attribute \"port\""
                );
                assert_eq!(d.code().unwrap().to_string(), "E300");
                assert_eq!(
                    d.help().unwrap().to_string(),
                    "declare it or mark it optional"
                );
            }
            Reportable::Error(_) => panic!("Expected Diagnostic"),
        }
    }

    #[test]
    fn test_warnings_and_error_are_separate() {
        let diags = vec![
            Diagnostic::warning("attribute \"a\" = 1, successfully converted to int"),
            Diagnostic::error("attribute \"extra\" is redundant").with_code(ErrorCode::E304),
        ];
        let err = TrellisError::new_decode_error(diags.into(), "a: 1\nextra: 2\n");

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].severity(), Some(MietteSeverity::Warning));
        assert_eq!(reportables[1].severity(), Some(MietteSeverity::Error));
        assert_eq!(reportables[1].to_string(), "attribute \"extra\" is redundant");
    }

    #[test]
    fn test_non_decode_error() {
        let err = TrellisError::Config("bad config".to_string());

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.to_string(), "Configuration error: bad config");
                assert_eq!(e.code().unwrap().to_string(), "trellis::config");
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_subject_and_context_labels() {
        let diag = Diagnostic::error("missing key")
            .with_subject(range(12, "two"))
            .with_context(range(8, "var.two"));

        let adapter = DiagnosticAdapter::new(&diag, "hello: ${var.two}");

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert_eq!(labels[0].offset(), 12);
        assert_eq!(labels[0].len(), 3);
        assert_eq!(labels[0].label(), Some("doc.yaml:1:13"));
        assert!(!labels[1].primary());
        assert_eq!(labels[1].offset(), 8);
    }

    #[test]
    fn test_context_equal_to_subject_is_not_repeated() {
        let diag = Diagnostic::error("oops")
            .with_subject(range(0, "abc"))
            .with_context(range(0, "abc"));

        let adapter = DiagnosticAdapter::new(&diag, "abc");
        assert_eq!(adapter.labels().unwrap().count(), 1);
    }

    #[test]
    fn test_no_source_no_labels() {
        let diag = Diagnostic::error("oops").with_subject(range(0, "abc"));
        let adapter = DiagnosticAdapter::new(&diag, "");

        assert!(adapter.source_code().is_none());
        assert!(adapter.labels().is_none());
    }
}
