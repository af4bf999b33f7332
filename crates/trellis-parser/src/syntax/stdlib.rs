//! The standard function library.

use trellis_core::value::{Value, ValueMap};

use super::function::{Function, FunctionError};

type FnResult = Result<Value, FunctionError>;

/// Every standard function, by name.
pub fn functions() -> Vec<(&'static str, Function)> {
    vec![
        ("list", Function::variadic(0, list)),
        ("map", Function::variadic(0, map)),
        ("upper", Function::new(1, upper)),
        ("lower", Function::new(1, lower)),
        ("length", Function::new(1, length)),
        ("concat", Function::variadic(0, concat)),
        ("join", Function::new(2, join)),
        ("split", Function::new(2, split)),
        ("keys", Function::new(1, keys)),
        ("values", Function::new(1, values)),
        ("lookup", Function::new(3, lookup)),
        ("merge", Function::variadic(0, merge)),
        ("tostring", Function::new(1, tostring)),
        ("tonumber", Function::new(1, tonumber)),
        ("abs", Function::new(1, abs)),
        ("min", Function::variadic(1, min)),
        ("max", Function::variadic(1, max)),
        ("coalesce", Function::variadic(1, coalesce)),
        ("replace", Function::new(3, replace)),
        ("trimspace", Function::new(1, trimspace)),
        ("contains", Function::new(2, contains)),
        ("format", Function::variadic(1, format)),
    ]
}

fn string_arg(args: &[Value], index: usize) -> Result<&str, FunctionError> {
    args[index]
        .as_str()
        .ok_or_else(|| FunctionError::argument(index, "a string", &args[index]))
}

fn list_arg(args: &[Value], index: usize) -> Result<&[Value], FunctionError> {
    args[index]
        .as_list()
        .ok_or_else(|| FunctionError::argument(index, "a list", &args[index]))
}

fn map_arg(args: &[Value], index: usize) -> Result<&ValueMap, FunctionError> {
    args[index]
        .as_map()
        .ok_or_else(|| FunctionError::argument(index, "a map", &args[index]))
}

fn number_arg(args: &[Value], index: usize) -> Result<f64, FunctionError> {
    args[index]
        .as_f64()
        .ok_or_else(|| FunctionError::argument(index, "a number", &args[index]))
}

fn list(args: &[Value]) -> FnResult {
    Ok(Value::List(args.to_vec()))
}

/// `map(k1, v1, k2, v2, ...)`
fn map(args: &[Value]) -> FnResult {
    if args.len() % 2 != 0 {
        return Err(FunctionError::message(
            "map requires an even number of arguments",
        ));
    }
    let mut map = ValueMap::new();
    for (i, pair) in args.chunks(2).enumerate() {
        let key = pair[0]
            .to_template_string()
            .ok_or_else(|| FunctionError::argument(i * 2, "a string key", &pair[0]))?;
        map.insert(key, pair[1].clone());
    }
    Ok(Value::Map(map))
}

fn upper(args: &[Value]) -> FnResult {
    Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
}

fn lower(args: &[Value]) -> FnResult {
    Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
}

fn length(args: &[Value]) -> FnResult {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        other => return Err(FunctionError::argument(0, "a string, list or map", other)),
    };
    Ok(Value::Int(len as i64))
}

fn concat(args: &[Value]) -> FnResult {
    let mut out = Vec::new();
    for index in 0..args.len() {
        out.extend_from_slice(list_arg(args, index)?);
    }
    Ok(Value::List(out))
}

/// `join(separator, list)`
fn join(args: &[Value]) -> FnResult {
    let separator = string_arg(args, 0)?;
    let parts = list_arg(args, 1)?
        .iter()
        .map(|item| {
            item.to_template_string()
                .ok_or_else(|| FunctionError::message(format!("cannot join a {}", item.value_type())))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(parts.join(separator)))
}

/// `split(separator, string)`
fn split(args: &[Value]) -> FnResult {
    let separator = string_arg(args, 0)?;
    let text = string_arg(args, 1)?;
    if text.is_empty() {
        return Ok(Value::List(Vec::new()));
    }
    Ok(Value::List(
        text.split(separator).map(Value::from).collect(),
    ))
}

fn keys(args: &[Value]) -> FnResult {
    Ok(Value::List(
        map_arg(args, 0)?.keys().map(|k| Value::from(k.as_str())).collect(),
    ))
}

fn values(args: &[Value]) -> FnResult {
    Ok(Value::List(map_arg(args, 0)?.values().cloned().collect()))
}

/// `lookup(map, key, default)`
fn lookup(args: &[Value]) -> FnResult {
    let map = map_arg(args, 0)?;
    let key = string_arg(args, 1)?;
    Ok(map.get(key).cloned().unwrap_or_else(|| args[2].clone()))
}

/// Later maps override earlier keys.
fn merge(args: &[Value]) -> FnResult {
    let mut out = ValueMap::new();
    for index in 0..args.len() {
        if args[index].is_null() {
            continue;
        }
        for (k, v) in map_arg(args, index)? {
            out.insert(k.clone(), v.clone());
        }
    }
    Ok(Value::Map(out))
}

fn tostring(args: &[Value]) -> FnResult {
    args[0]
        .to_template_string()
        .map(Value::String)
        .ok_or_else(|| FunctionError::argument(0, "a primitive value", &args[0]))
}

fn tonumber(args: &[Value]) -> FnResult {
    match &args[0] {
        Value::Int(_) | Value::Float(_) => Ok(args[0].clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(Value::Int(i))
            } else if let Ok(f) = s.parse::<f64>() {
                Ok(Value::Float(f))
            } else {
                Err(FunctionError::message(format!("cannot convert \"{s}\" to a number")))
            }
        }
        other => Err(FunctionError::argument(0, "a string or number", other)),
    }
}

fn abs(args: &[Value]) -> FnResult {
    match &args[0] {
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| FunctionError::message("integer overflow")),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(FunctionError::argument(0, "a number", other)),
    }
}

/// Shared body of `min` and `max`. Stays integral when every argument is.
fn extreme(args: &[Value], pick_later: fn(f64, f64) -> bool) -> FnResult {
    let mut best = 0;
    for index in 0..args.len() {
        if pick_later(number_arg(args, best)?, number_arg(args, index)?) {
            best = index;
        }
    }
    Ok(args[best].clone())
}

fn min(args: &[Value]) -> FnResult {
    extreme(args, |best, candidate| candidate < best)
}

fn max(args: &[Value]) -> FnResult {
    extreme(args, |best, candidate| candidate > best)
}

/// The first argument that is not null or an empty string.
fn coalesce(args: &[Value]) -> FnResult {
    Ok(args
        .iter()
        .find(|v| !v.is_null() && v.as_str() != Some(""))
        .cloned()
        .unwrap_or(Value::Null))
}

/// `replace(string, search, replacement)`
fn replace(args: &[Value]) -> FnResult {
    let text = string_arg(args, 0)?;
    let search = string_arg(args, 1)?;
    let replacement = string_arg(args, 2)?;
    if search.is_empty() {
        return Ok(Value::from(text));
    }
    Ok(Value::String(text.replace(search, replacement)))
}

fn trimspace(args: &[Value]) -> FnResult {
    Ok(Value::from(string_arg(args, 0)?.trim()))
}

/// `contains(list, value)`, or `contains(string, substring)`
fn contains(args: &[Value]) -> FnResult {
    match &args[0] {
        Value::List(items) => Ok(Value::Bool(items.contains(&args[1]))),
        Value::String(s) => Ok(Value::Bool(s.contains(string_arg(args, 1)?))),
        other => Err(FunctionError::argument(0, "a list or string", other)),
    }
}

/// `format(spec, args...)` with `%s`, `%d`, `%v` and `%%` verbs.
fn format(args: &[Value]) -> FnResult {
    let spec = string_arg(args, 0)?;
    let mut rest = args[1..].iter();
    let mut out = String::with_capacity(spec.len());
    let mut chars = spec.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(verb @ ('s' | 'd' | 'v')) => {
                let value = rest
                    .next()
                    .ok_or_else(|| FunctionError::message(format!("too few arguments for %{verb}")))?;
                if verb == 'd' && value.as_int().is_none() {
                    return Err(FunctionError::message(format!(
                        "%d requires an int, got {}",
                        value.value_type()
                    )));
                }
                out.push_str(&value.to_template_string().unwrap_or_else(|| value.to_string()));
            }
            Some(other) => {
                return Err(FunctionError::message(format!("unsupported verb %{other}")));
            }
            None => return Err(FunctionError::message("format ends with a lone %")),
        }
    }

    if rest.next().is_some() {
        return Err(FunctionError::message("too many arguments for format"));
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> FnResult {
        let (_, function) = functions()
            .into_iter()
            .find(|(n, _)| *n == name)
            .unwrap_or_else(|| panic!("no function {name}"));
        function.call(args)
    }

    fn strings(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn test_map_pairs() {
        let value = call("map", &["a".into(), "x".into(), "b".into(), 2.into()]).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("a"), Some(&Value::from("x")));
        assert_eq!(map.get("b"), Some(&Value::Int(2)));

        assert!(call("map", &["odd".into()]).is_err());
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call("upper", &["abc".into()]), Ok("ABC".into()));
        assert_eq!(call("trimspace", &["  x \n".into()]), Ok("x".into()));
        assert_eq!(call("replace", &["a-b-c".into(), "-".into(), "+".into()]), Ok("a+b+c".into()));
        assert_eq!(call("join", &[",".into(), strings(&["a", "b"])]), Ok("a,b".into()));
        assert_eq!(call("split", &[",".into(), "a,b".into()]), Ok(strings(&["a", "b"])));
        assert_eq!(call("split", &[",".into(), "".into()]), Ok(Value::List(Vec::new())));
    }

    #[test]
    fn test_wrong_argument_type() {
        let err = call("upper", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.to_string(), "argument 1 must be a string, got int");
    }

    #[test]
    fn test_collections() {
        assert_eq!(call("length", &[strings(&["a", "b", "c"])]), Ok(Value::Int(3)));
        assert_eq!(
            call("concat", &[strings(&["a"]), strings(&["b"])]),
            Ok(strings(&["a", "b"]))
        );
        assert_eq!(call("contains", &[strings(&["a"]), "a".into()]), Ok(Value::Bool(true)));

        let base: Value = [("a", Value::Int(1)), ("b", Value::Int(2))].into_iter().collect();
        let over: Value = [("b", Value::Int(3))].into_iter().collect();
        let merged = call("merge", &[base.clone(), over]).unwrap();
        assert_eq!(merged.as_map().unwrap().get("b"), Some(&Value::Int(3)));
        assert_eq!(call("keys", &[base.clone()]), Ok(strings(&["a", "b"])));
        assert_eq!(call("lookup", &[base, "z".into(), Value::Int(0)]), Ok(Value::Int(0)));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(call("max", &[1.into(), 5.into(), 3.into()]), Ok(Value::Int(5)));
        assert_eq!(call("min", &[1.into(), Value::Float(0.5)]), Ok(Value::Float(0.5)));
        assert_eq!(call("abs", &[Value::Int(-4)]), Ok(Value::Int(4)));
        assert_eq!(call("tonumber", &["42".into()]), Ok(Value::Int(42)));
        assert!(call("tonumber", &["forty".into()]).is_err());
        assert_eq!(call("tostring", &[Value::Int(7)]), Ok("7".into()));
    }

    #[test]
    fn test_coalesce_skips_empty() {
        assert_eq!(
            call("coalesce", &[Value::Null, "".into(), "x".into()]),
            Ok("x".into())
        );
    }

    #[test]
    fn test_format() {
        assert_eq!(
            call("format", &["%s-%d (%%)".into(), "a".into(), 3.into()]),
            Ok("a-3 (%)".into())
        );
        assert!(call("format", &["%d".into(), "x".into()]).is_err());
        assert!(call("format", &["%s".into()]).is_err());
        assert!(call("format", &["plain".into(), "extra".into()]).is_err());
    }
}
