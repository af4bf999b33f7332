//! The core diagnostic type for the Trellis error system.
//!
//! A [`Diagnostic`] represents a single error or warning with an optional
//! error code, the range it is about, a surrounding context range, an
//! optional detail line, and optionally the expression that produced it.

use std::fmt;

use trellis_core::position::Range;

use crate::{
    error::{ErrorCode, Severity},
    expression::Expression,
};

/// A diagnostic message with source location information.
///
/// Diagnostics carry:
/// - A severity level
/// - An optional error code for documentation and searchability
/// - A one-line summary
/// - An optional detail line with further explanation
/// - An optional subject range: the exact source text the message is about
/// - An optional context range: the surrounding text worth showing
/// - An optional expression: the expression whose evaluation failed
///
/// # Example
///
/// ```text
/// error[E304]: attribute "extra" is redundant
///   --> example.yaml:4:1
///    |
///  3 | hello: world
///  4 | extra: value
///    | ^^^^^ not declared in the schema
/// ```
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    summary: String,
    detail: Option<String>,
    subject: Option<Range>,
    context: Option<Range>,
    expression: Option<Box<Expression>>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use trellis_parser::error::{Diagnostic, ErrorCode};
    /// # use trellis_core::position::{Pos, Range};
    ///
    /// let range = Range::covering("a.yaml", Pos::START, "hello");
    /// let diag = Diagnostic::error("no mapping found for expected attribute \"hello\"")
    ///     .with_code(ErrorCode::E300)
    ///     .with_subject(range);
    /// assert!(diag.severity().is_error());
    /// ```
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary)
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(Severity::Warning, summary)
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the one-line summary.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Get the detail text, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Get the range this diagnostic is about, if any.
    pub fn subject(&self) -> Option<&Range> {
        self.subject.as_ref()
    }

    /// Get the surrounding context range, if any.
    pub fn context(&self) -> Option<&Range> {
        self.context.as_ref()
    }

    /// Get the attached expression, if any.
    pub fn expression(&self) -> Option<&Expression> {
        self.expression.as_deref()
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Set the detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the subject range.
    pub fn with_subject(mut self, range: Range) -> Self {
        self.subject = Some(range);
        self
    }

    /// Set the context range.
    pub fn with_context(mut self, range: Range) -> Self {
        self.context = Some(range);
        self
    }

    /// Attach the expression involved.
    pub fn with_expression(mut self, expression: Expression) -> Self {
        self.expression = Some(Box::new(expression));
        self
    }

    fn new(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            summary: summary.into(),
            detail: None,
            subject: None,
            context: None,
            expression: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[E001]: summary" or "error: summary"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.summary)
    }
}

impl std::error::Error for Diagnostic {}
