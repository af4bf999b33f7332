//! Error codes for the Trellis diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Document reader errors
//! - `E1xx` - Expression syntax errors
//! - `E2xx` - Structural errors (wrong node kind, bad scalar)
//! - `E3xx` - Schema violations
//! - `E4xx` - Evaluation errors
//! - `E5xx` - Coercion errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Document Reader Errors (E0xx)
    // =========================================================================
    /// Unterminated quoted scalar.
    ///
    /// A scalar was opened with a quote but the line ended before it closed.
    E001,

    /// Invalid indentation.
    ///
    /// A line is indented with tabs, or deeper/shallower than its parent
    /// structure allows.
    E002,

    /// Unexpected content.
    ///
    /// A line could not be read as a mapping entry, sequence item or scalar.
    E003,

    /// Unsupported syntax.
    ///
    /// Directives, multiple documents, flow collections that span lines or
    /// carry anchors, and aliases that expand past the node budget.
    E004,

    /// Duplicate mapping key.
    E005,

    /// Unknown alias.
    ///
    /// An alias names an anchor that no earlier node defines.
    E006,

    // =========================================================================
    // Expression Syntax Errors (E1xx)
    // =========================================================================
    /// Unexpected token in an expression.
    E100,

    /// Unterminated template interpolation.
    ///
    /// A `${` was opened inside a template but never closed with `}`.
    E101,

    /// Unterminated string literal inside an expression.
    E102,

    /// Invalid number literal.
    E103,

    /// Trailing input after a complete expression.
    E104,

    // =========================================================================
    // Structural Errors (E2xx)
    // =========================================================================
    /// Unexpected root node kind.
    ///
    /// Bodies must be mappings, or documents wrapping a mapping.
    E200,

    /// Non-scalar mapping key.
    E201,

    /// Unsupported node kind for a block.
    ///
    /// Block values must be a mapping (one instance) or a sequence of
    /// mappings (many instances).
    E202,

    /// Unsupported scalar tag.
    E203,

    /// Invalid integer scalar.
    E204,

    /// Nesting too deep.
    ///
    /// The document or schema nests deeper than the configured limit.
    E205,

    // =========================================================================
    // Schema Violations (E3xx)
    // =========================================================================
    /// Missing required attribute.
    E300,

    /// Missing required block.
    E301,

    /// Missing block label.
    E302,

    /// Singleton block given more than once.
    E303,

    /// Redundant attribute.
    ///
    /// The document contains a key the schema does not declare.
    E304,

    /// Non-scalar block label.
    E305,

    /// Block given under both its name and its plural.
    E306,

    // =========================================================================
    // Evaluation Errors (E4xx)
    // =========================================================================
    /// Unknown variable.
    E400,

    /// Missing map key or attribute in a traversal.
    E401,

    /// Index out of range.
    E402,

    /// Operand type mismatch.
    E403,

    /// Unknown function.
    E404,

    /// Function call failed.
    ///
    /// Wrong number of arguments, or an argument the function rejects.
    E405,

    /// Division by zero.
    E406,

    // =========================================================================
    // Coercion Errors (E5xx)
    // =========================================================================
    /// Value does not convert to the declared attribute kind.
    E500,

    /// Null value for a declared attribute.
    E501,
}

impl ErrorCode {
    /// Returns the code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Document reader errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E006 => "E006",
            // Expression syntax errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            // Structural errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            // Schema violations
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
            ErrorCode::E305 => "E305",
            ErrorCode::E306 => "E306",
            // Evaluation errors
            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E402 => "E402",
            ErrorCode::E403 => "E403",
            ErrorCode::E404 => "E404",
            ErrorCode::E405 => "E405",
            ErrorCode::E406 => "E406",
            // Coercion errors
            ErrorCode::E500 => "E500",
            ErrorCode::E501 => "E501",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Document reader errors
            ErrorCode::E001 => "unterminated quoted scalar",
            ErrorCode::E002 => "invalid indentation",
            ErrorCode::E003 => "unexpected content",
            ErrorCode::E004 => "unsupported syntax",
            ErrorCode::E005 => "duplicate mapping key",
            ErrorCode::E006 => "unknown alias",
            // Expression syntax errors
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "unterminated interpolation",
            ErrorCode::E102 => "unterminated string literal",
            ErrorCode::E103 => "invalid number literal",
            ErrorCode::E104 => "trailing input",
            // Structural errors
            ErrorCode::E200 => "unexpected node kind",
            ErrorCode::E201 => "non-scalar key",
            ErrorCode::E202 => "unsupported node kind for block",
            ErrorCode::E203 => "unsupported scalar tag",
            ErrorCode::E204 => "invalid integer",
            ErrorCode::E205 => "nesting too deep",
            // Schema violations
            ErrorCode::E300 => "missing required attribute",
            ErrorCode::E301 => "missing required block",
            ErrorCode::E302 => "missing block label",
            ErrorCode::E303 => "too many singleton blocks",
            ErrorCode::E304 => "redundant attribute",
            ErrorCode::E305 => "non-scalar block label",
            ErrorCode::E306 => "block given twice",
            // Evaluation errors
            ErrorCode::E400 => "unknown variable",
            ErrorCode::E401 => "missing key",
            ErrorCode::E402 => "index out of range",
            ErrorCode::E403 => "type mismatch",
            ErrorCode::E404 => "unknown function",
            ErrorCode::E405 => "function call failed",
            ErrorCode::E406 => "division by zero",
            // Coercion errors
            ErrorCode::E500 => "kind mismatch",
            ErrorCode::E501 => "null value",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E100.to_string(), "E100");
        assert_eq!(ErrorCode::E304.to_string(), "E304");
        assert_eq!(ErrorCode::E501.to_string(), "E501");
    }

    #[test]
    fn test_error_code_description() {
        assert_eq!(ErrorCode::E001.description(), "unterminated quoted scalar");
        assert_eq!(ErrorCode::E006.description(), "unknown alias");
        assert_eq!(ErrorCode::E303.description(), "too many singleton blocks");
        assert_eq!(ErrorCode::E500.description(), "kind mismatch");
    }
}
