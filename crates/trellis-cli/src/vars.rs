//! Variables given on the command line.
//!
//! `--var name=value` defines a string variable. Dotted names build nested
//! maps, so `--var var.one=ONE` defines `var` as the map `{one: "ONE"}` and
//! later `--var var.two=TWO` adds to the same map.

use log::debug;

use trellis::{
    EvalContext, TrellisError,
    value::{Value, ValueMap},
};

/// Build an evaluation context holding `vars` and the standard functions.
///
/// # Errors
///
/// Returns [`TrellisError::Config`] for a variable without `=`, with an empty
/// name segment, or one that nests below a variable already given a string.
pub fn build_context(vars: &[String]) -> Result<EvalContext, TrellisError> {
    let mut root = ValueMap::new();
    for var in vars {
        let (name, value) = var
            .split_once('=')
            .ok_or_else(|| invalid(var, "expected NAME=VALUE"))?;
        let path: Vec<&str> = name.split('.').map(str::trim).collect();
        if path.iter().any(|segment| segment.is_empty()) {
            return Err(invalid(var, "variable names must not have empty segments"));
        }
        insert(&mut root, &path, Value::from(value)).map_err(|reason| invalid(var, reason))?;
        debug!(name; "Variable defined");
    }

    let ctx = root
        .into_iter()
        .fold(EvalContext::new(), |ctx, (name, value)| ctx.with_variable(name, value));
    Ok(ctx.with_stdlib())
}

fn insert(map: &mut ValueMap, path: &[&str], value: Value) -> Result<(), &'static str> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        map.insert((*first).to_string(), value);
        return Ok(());
    }

    let entry = map
        .entry((*first).to_string())
        .or_insert_with(|| Value::Map(ValueMap::new()));
    match entry {
        Value::Map(inner) => insert(inner, rest, value),
        _ => Err("a parent of this variable is already set to a string"),
    }
}

fn invalid(var: &str, reason: &str) -> TrellisError {
    TrellisError::Config(format!("invalid variable `{var}`: {reason}"))
}
