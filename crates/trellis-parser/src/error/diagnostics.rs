//! An ordered list of diagnostics.
//!
//! [`Diagnostics`] is the error type of every fallible operation in this
//! crate. It may contain warnings next to the error that stopped the
//! operation, so nothing collected before the failure is lost.

use std::fmt;

use crate::error::Diagnostic;

/// A type alias for `Result<T, Diagnostics>`.
pub type Result<T> = std::result::Result<T, Diagnostics>;

/// An ordered sequence of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if any entry has error severity.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity().is_error())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Append every diagnostic of `other`, keeping order.
    pub fn append(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    /// Iterate over error diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| d.severity().is_error())
    }

    /// Iterate over warning diagnostics only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| d.severity().is_warning())
    }

    /// The first error, if any.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.errors().next()
    }

    /// Get all diagnostics.
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Lead with the first error so warnings never hide the failure.
        let first = self.first_error().or_else(|| self.diagnostics.first());
        if let Some(first) = first {
            write!(f, "{}", first)?;
            if self.diagnostics.len() > 1 {
                write!(f, " (+{} more)", self.diagnostics.len() - 1)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.diagnostics.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_from_diagnostic() {
        let diag = Diagnostic::error("test error").with_code(ErrorCode::E300);
        let list: Diagnostics = diag.into();

        assert_eq!(list.len(), 1);
        assert_eq!(list.as_slice()[0].summary(), "test error");
        assert!(list.has_errors());
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let list: Diagnostics = vec![Diagnostic::warning("w1"), Diagnostic::warning("w2")].into();

        assert!(!list.has_errors());
        assert_eq!(list.warnings().count(), 2);
        assert!(list.first_error().is_none());
    }

    #[test]
    fn test_display_single() {
        let list: Diagnostics = Diagnostic::error("undefined").into();

        assert_eq!(list.to_string(), "error: undefined");
    }

    #[test]
    fn test_display_leads_with_error() {
        let list: Diagnostics = vec![
            Diagnostic::warning("converted"),
            Diagnostic::error("first error").with_code(ErrorCode::E304),
            Diagnostic::error("second error"),
        ]
        .into();

        assert_eq!(list.to_string(), "error[E304]: first error (+2 more)");
    }

    #[test]
    fn test_append_keeps_order() {
        let mut list: Diagnostics = Diagnostic::warning("a").into();
        list.append(Diagnostic::error("b").into());

        let summaries: Vec<_> = list.iter().map(Diagnostic::summary).collect();
        assert_eq!(summaries, ["a", "b"]);
    }
}
