//! Functions callable from expressions.

use std::{fmt, sync::Arc};

use thiserror::Error;
use trellis_core::value::{Value, ValueType};

/// Why a function call failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("expected {expected} argument(s), got {got}")]
    Arity { expected: String, got: usize },

    #[error("argument {index} must be {expected}, got {got}")]
    Argument {
        index: usize,
        expected: &'static str,
        got: ValueType,
    },

    #[error("{0}")]
    Message(String),
}

impl FunctionError {
    /// An error for argument `index` (zero-based) having the wrong type.
    pub fn argument(index: usize, expected: &'static str, got: &Value) -> Self {
        FunctionError::Argument {
            index: index + 1,
            expected,
            got: got.value_type(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        FunctionError::Message(message.into())
    }
}

type Body = dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// A named function's implementation with its accepted argument count.
#[derive(Clone)]
pub struct Function {
    min_args: usize,
    max_args: Option<usize>,
    body: Arc<Body>,
}

impl Function {
    /// A function taking exactly `arity` arguments.
    pub fn new<F>(arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Self {
            min_args: arity,
            max_args: Some(arity),
            body: Arc::new(body),
        }
    }

    /// A function taking `min_args` or more arguments.
    pub fn variadic<F>(min_args: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Self {
            min_args,
            max_args: None,
            body: Arc::new(body),
        }
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn max_args(&self) -> Option<usize> {
        self.max_args
    }

    /// Check the argument count, then run the body.
    pub fn call(&self, args: &[Value]) -> Result<Value, FunctionError> {
        let too_few = args.len() < self.min_args;
        let too_many = self.max_args.is_some_and(|max| args.len() > max);
        if too_few || too_many {
            let expected = match self.max_args {
                Some(max) if max == self.min_args => max.to_string(),
                Some(max) => format!("{} to {max}", self.min_args),
                None => format!("at least {}", self.min_args),
            };
            return Err(FunctionError::Arity {
                expected,
                got: args.len(),
            });
        }
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_checked_before_body() {
        let f = Function::new(2, |args| Ok(Value::Int(args.len() as i64)));
        assert_eq!(f.call(&[Value::Null, Value::Null]), Ok(Value::Int(2)));

        let err = f.call(&[Value::Null]).unwrap_err();
        assert_eq!(err.to_string(), "expected 2 argument(s), got 1");
    }

    #[test]
    fn test_variadic_minimum() {
        let f = Function::variadic(1, |args| Ok(Value::Int(args.len() as i64)));
        assert_eq!(f.call(&[const { Value::Null }; 5]), Ok(Value::Int(5)));
        assert!(matches!(f.call(&[]), Err(FunctionError::Arity { got: 0, .. })));
    }

    #[test]
    fn test_argument_error_message() {
        let err = FunctionError::argument(0, "a string", &Value::Int(1));
        assert_eq!(err.to_string(), "argument 1 must be a string, got int");
    }
}
