//! Parsing of caller-supplied template parameters.

use std::collections::BTreeMap;

use crate::error::{IssuerError, Result};

/// Parse parameters given either as a JSON object of strings or as
/// `key=value[,key=value]*`.
///
/// JSON is tried first. Keys and values of the `k=v` form are trimmed.
/// Blank input yields an empty map.
pub fn parse_parameters(raw: &str) -> Result<BTreeMap<String, String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    if let Ok(map) = serde_json::from_str::<BTreeMap<String, String>>(raw) {
        return Ok(map);
    }

    let mut params = BTreeMap::new();
    for pair in raw.split(',') {
        let (key, value) = pair.trim().split_once('=').ok_or_else(|| {
            IssuerError::Validation(format!(
                "invalid key=value pair {pair:?}; use key=value,key2=value2 or JSON"
            ))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(IssuerError::Validation(format!("empty key in pair {pair:?}")));
        }
        params.insert(key.to_string(), value.trim().to_string());
    }
    Ok(params)
}
