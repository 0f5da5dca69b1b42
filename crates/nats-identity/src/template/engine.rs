//! Placeholder extraction and substitution over serialized claims.

use std::collections::{BTreeMap, HashSet};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{IssuerError, Result};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// One `{{ … }}` occurrence: byte range of the whole span and its trimmed name.
struct Placeholder<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

/// Iterate over `{{ … }}` spans left to right. An opening `{{` without a
/// later `}}` ends the scan.
fn placeholders(text: &str) -> impl Iterator<Item = Placeholder<'_>> {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        let open = cursor + text.get(cursor..)?.find(OPEN)?;
        let inner_start = open + OPEN.len();
        let close = inner_start + text[inner_start..].find(CLOSE)?;
        cursor = close + CLOSE.len();
        Some(Placeholder {
            start: open,
            end: cursor,
            name: text[inner_start..close].trim(),
        })
    })
}

/// Return the unique placeholder names in `text`, in first-occurrence order.
///
/// Whitespace around a name is ignored and empty names are skipped.
pub fn extract_variables(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    placeholders(text)
        .filter(|p| !p.name.is_empty())
        .filter(|p| seen.insert(p.name))
        .map(|p| p.name.to_string())
        .collect()
}

/// Replace every placeholder whose name is in `params` with its raw value.
fn substitute(text: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for p in placeholders(text) {
        if let Some(value) = params.get(p.name) {
            out.push_str(&text[last..p.start]);
            out.push_str(value);
            last = p.end;
        }
    }
    out.push_str(&text[last..]);
    out
}

/// Instantiate a claims template with caller parameters.
///
/// The template is rendered to compact JSON, every `{{name}}` is replaced
/// textually with its value, and the result is parsed back into `T`.
/// Values are inserted verbatim, so a value that breaks the JSON structure
/// is reported as malformed rather than escaped.
///
/// # Errors
///
/// - `MissingParameters` with every required name when `params` is empty,
///   otherwise with only the absent names, in first-occurrence order.
/// - `TemplateMalformed` when a `{{…}}` pair survives substitution or the
///   substituted text no longer parses as `T`.
pub fn instantiate<T>(template: &T, params: &BTreeMap<String, String>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let text = serde_json::to_string(template)
        .map_err(|e| IssuerError::SerializationError(format!("could not render template: {e}")))?;

    let required = extract_variables(&text);
    if !required.is_empty() {
        if params.is_empty() {
            return Err(IssuerError::MissingParameters(required));
        }
        let missing: Vec<String> = required
            .into_iter()
            .filter(|name| !params.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(IssuerError::MissingParameters(missing));
        }
    }

    let rendered = substitute(&text, params);
    if let Some(left) = placeholders(&rendered).next() {
        return Err(IssuerError::TemplateMalformed(format!(
            "unresolved placeholder {}",
            &rendered[left.start..left.end]
        )));
    }

    serde_json::from_str(&rendered).map_err(|e| IssuerError::TemplateMalformed(e.to_string()))
}
