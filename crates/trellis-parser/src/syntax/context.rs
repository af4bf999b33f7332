//! Variables and functions available while evaluating expressions.

use indexmap::IndexMap;
use trellis_core::value::Value;

use super::{function::Function, stdlib};

/// The scope an expression is evaluated in.
///
/// Lookups are by exact name. Variable names are reported in insertion
/// order when a lookup fails.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    variables: IndexMap<String, Value>,
    functions: IndexMap<String, Function>,
}

impl EvalContext {
    /// An empty context with no variables and no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any earlier binding.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, function: Function) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Add the standard function library. Functions already registered
    /// under the same name are kept.
    pub fn with_stdlib(mut self) -> Self {
        for (name, function) in stdlib::functions() {
            self.functions.entry(name.to_string()).or_insert(function);
        }
        self
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_function_wins_over_stdlib() {
        let ctx = EvalContext::new()
            .with_function("upper", Function::new(1, |_| Ok(Value::from("custom"))))
            .with_stdlib();
        let upper = ctx.function("upper").unwrap();
        assert_eq!(upper.call(&[Value::from("x")]), Ok(Value::from("custom")));
        assert!(ctx.function("lower").is_some());
    }

    #[test]
    fn test_variables_keep_order() {
        let ctx = EvalContext::new()
            .with_variable("var", Value::Null)
            .with_variable("env", Value::Null);
        assert_eq!(ctx.variable_names().collect::<Vec<_>>(), ["var", "env"]);
    }
}
