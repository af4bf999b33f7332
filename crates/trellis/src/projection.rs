//! Projection of decoded maps onto caller-defined records.
//!
//! Fields are matched by name. Serde attributes such as `rename` take the
//! role of tag mappings, and `default` makes a field tolerate a missing key.

use log::trace;
use serde::de::{DeserializeOwned, Error as _};

use trellis_core::value::{Value, ValueMap};

use crate::TrellisError;

/// Project `map` onto `T`.
///
/// # Errors
///
/// Returns [`TrellisError::Projection`] when a field of `T` is missing from
/// the map or holds a value of the wrong shape, or when the map holds a NaN
/// or infinite float, which JSON cannot carry.
pub fn project<T: DeserializeOwned>(map: &ValueMap) -> Result<T, TrellisError> {
    if let Some(path) = non_finite_path(map) {
        return Err(serde_json::Error::custom(format!(
            "non-finite float at `{path}` cannot be projected"
        ))
        .into());
    }

    let json = serde_json::to_value(map)?;
    trace!(json:%; "Projecting decoded map");
    Ok(serde_json::from_value(json)?)
}

/// The dotted path of the first NaN or infinite float in `map`.
fn non_finite_path(map: &ValueMap) -> Option<String> {
    fn walk(value: &Value, path: String) -> Option<String> {
        match value {
            Value::Float(f) if !f.is_finite() => Some(path),
            Value::List(items) => items
                .iter()
                .enumerate()
                .find_map(|(idx, item)| walk(item, format!("{path}[{idx}]"))),
            Value::Map(map) => map
                .iter()
                .find_map(|(key, item)| walk(item, format!("{path}.{key}"))),
            _ => None,
        }
    }

    map.iter().find_map(|(key, value)| walk(value, key.clone()))
}
