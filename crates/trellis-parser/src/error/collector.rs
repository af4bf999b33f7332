//! Collector for accumulating diagnostics during a decode.
//!
//! The [`DiagnosticCollector`] keeps warnings produced while a body is
//! decoded, so that when a later step fails the returned [`Diagnostics`]
//! still carries them in front of the error.

use crate::error::{Diagnostic, Diagnostics};

/// A collector for accumulating diagnostics during a processing phase.
///
/// # Example
///
/// ```text
/// let mut collector = DiagnosticCollector::new();
///
/// collector.emit(Diagnostic::warning("attribute \"hello\" converted"));
///
/// let value = match evaluate() {
///     Ok(value) => value,
///     Err(err) => return Err(collector.fail(err)),
/// };
///
/// let warnings = collector.finish()?;
/// ```
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic to this collector.
    ///
    /// The diagnostic is added to the collection and if it's an error,
    /// the collector is marked as having errors.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Emit every diagnostic of a nested step.
    pub fn absorb(&mut self, diagnostics: Diagnostics) {
        for diagnostic in diagnostics {
            self.emit(diagnostic);
        }
    }

    /// Abort with `error`, keeping everything collected so far in front of it.
    pub fn fail(mut self, error: impl Into<Diagnostics>) -> Diagnostics {
        self.absorb(error.into());
        Diagnostics::from(self.diagnostics)
    }

    /// Finish collection and return a result.
    ///
    /// - If there are errors, returns `Err(Diagnostics)` with all diagnostics.
    /// - If there are no errors, returns the accumulated warnings.
    pub fn finish(self) -> Result<Diagnostics, Diagnostics> {
        let diagnostics = Diagnostics::from(self.diagnostics);
        if self.has_errors {
            Err(diagnostics)
        } else {
            Ok(diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_collector_new_finish_ok() {
        let collector = DiagnosticCollector::new();
        let warnings = collector.finish().unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_collector_emit_error_finish_err() {
        let mut collector = DiagnosticCollector::new();

        collector.emit(Diagnostic::error("test error"));

        assert!(collector.finish().is_err());
    }

    #[test]
    fn test_collector_finish_warnings_only() {
        let mut collector = DiagnosticCollector::new();

        collector.emit(Diagnostic::warning("warning 1"));
        collector.emit(Diagnostic::warning("warning 2"));

        let warnings = collector.finish().unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_collector_fail_keeps_warnings() {
        let mut collector = DiagnosticCollector::new();

        collector.emit(Diagnostic::warning("converted"));
        let err = collector.fail(Diagnostic::error("redundant").with_code(ErrorCode::E304));

        assert_eq!(err.len(), 2);
        assert!(err.as_slice()[0].severity().is_warning());
        assert_eq!(err.first_error().and_then(Diagnostic::code), Some(ErrorCode::E304));
    }

    #[test]
    fn test_collector_absorb_marks_errors() {
        let mut collector = DiagnosticCollector::new();

        collector.absorb(vec![Diagnostic::warning("w"), Diagnostic::error("e")].into());

        assert!(collector.finish().is_err());
    }
}
