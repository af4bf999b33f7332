//! Error and diagnostic system for Trellis.
//!
//! This module provides an error handling system with:
//! - Error codes grouped by processing phase
//! - Subject and context ranges pointing into the source document
//! - Severity levels
//! - A collector that keeps warnings alive across a failing decode
//!
//! # Overview
//!
//! The error system is built around the [`Diagnostic`] type, which represents
//! a single error or warning with an optional error code, the range it is
//! about, a wider context range, and optionally the expression involved.
//! Every fallible operation returns [`Diagnostics`] as its error type.
//!
//! # Example
//!
//! ```
//! # use trellis_parser::error::{Diagnostic, ErrorCode};
//! # use trellis_core::position::{Pos, Range};
//!
//! let subject = Range::covering("example.yaml", Pos::new(4, 1, 30), "extra");
//!
//! let diag = Diagnostic::error("attribute \"extra\" is redundant")
//!     .with_code(ErrorCode::E304)
//!     .with_subject(subject)
//!     .with_detail("remove the key or declare it in the schema");
//! ```

mod collector;
mod diagnostic;
mod diagnostics;
mod error_code;
mod severity;

pub(crate) use collector::DiagnosticCollector;
pub(crate) use diagnostics::Result;

pub use diagnostic::Diagnostic;
pub use diagnostics::Diagnostics;
pub use error_code::ErrorCode;
pub use severity::Severity;
