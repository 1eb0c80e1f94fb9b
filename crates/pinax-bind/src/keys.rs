//! Key notation for maps and indexed slices.
//!
//! Flat sources express structure in their keys:
//!
//! - map entries as `meta.key`, `meta[key]`, `meta["key.with.dots"]` or
//!   `meta['key']`, or as one JSON object under `meta` whose member names
//!   are taken verbatim;
//! - elements of struct slices as `items[0].name` or `items.0.name`.

use indexmap::IndexMap;
use serde_json::Value;

use crate::getter::ValueMap;

/// Where one map entry's value lives in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MapEntry {
    /// Full key for scalar and slice values, element prefix for struct values.
    pub(crate) source: String,
}

/// Splits `[key]...` (the part after the field prefix) into the entry name
/// and whatever follows the closing bracket.
fn parse_bracket(rest: &str) -> Option<(&str, &str, usize)> {
    let inner = rest.strip_prefix('[')?;
    match inner.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let body = &inner[1..];
            let close = body.find(quote)?;
            let after = body[close + 1..].strip_prefix(']')?;
            let consumed = rest.len() - after.len();
            Some((&body[..close], after, consumed))
        }
        _ => {
            let close = inner.find(']')?;
            let after = &inner[close + 1..];
            let consumed = rest.len() - after.len();
            Some((&inner[..close], after, consumed))
        }
    }
}

/// Parses one source key against a map field prefix.
///
/// For scalar-valued maps the entry name is everything after `prefix.`, or
/// the bracketed name when nothing follows the bracket. For struct-valued
/// maps the name is one segment and a `.field` tail is required.
pub(crate) fn map_entry<'k>(key: &'k str, prefix: &str, nested: bool) -> Option<(&'k str, String)> {
    let rest = key.strip_prefix(prefix)?;
    if let Some(dotted) = rest.strip_prefix('.') {
        if !nested {
            return Some((dotted, key.to_string())).filter(|(name, _)| !name.is_empty());
        }
        let (name, tail) = dotted.split_once('.')?;
        if name.is_empty() || tail.is_empty() {
            return None;
        }
        return Some((name, format!("{prefix}.{name}")));
    }

    let (name, after, consumed) = parse_bracket(rest)?;
    if name.is_empty() {
        return None;
    }
    if nested {
        after
            .strip_prefix('.')
            .filter(|tail| !tail.is_empty())
            .map(|_| (name, format!("{prefix}{}", &rest[..consumed])))
    } else if after.is_empty() {
        Some((name, key.to_string()))
    } else {
        None
    }
}

/// Parses one source key against a struct-slice field prefix, returning the
/// element index and the element prefix.
pub(crate) fn slice_index(key: &str, prefix: &str) -> Option<(usize, String)> {
    let rest = key.strip_prefix(prefix)?;
    let (digits, tail, element) = if let Some(inner) = rest.strip_prefix('[') {
        let close = inner.find(']')?;
        let digits = &inner[..close];
        (digits, &inner[close + 1..], format!("{prefix}[{digits}]"))
    } else {
        let dotted = rest.strip_prefix('.')?;
        let (digits, tail) = match dotted.find('.') {
            Some(dot) => dotted.split_at(dot),
            None => (dotted, ""),
        };
        (digits, tail, format!("{prefix}.{digits}"))
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let tail = tail.strip_prefix('.')?;
    if tail.is_empty() {
        return None;
    }
    digits.parse().ok().map(|index| (index, element))
}

/// Scans `keys` for entries of the map field at `prefix`, stopping with
/// `Err(observed)` as soon as more than `limit` distinct entries are seen.
pub(crate) fn scan_map_keys<'k>(
    keys: impl IntoIterator<Item = &'k str>,
    prefix: &str,
    nested: bool,
    limit: usize,
    capacity: usize,
) -> Result<IndexMap<String, MapEntry>, usize> {
    let mut entries: IndexMap<String, MapEntry> = IndexMap::with_capacity(capacity);
    for key in keys {
        let Some((name, source)) = map_entry(key, prefix, nested) else {
            continue;
        };
        if entries.contains_key(name) {
            continue;
        }
        if entries.len() == limit {
            return Err(limit + 1);
        }
        entries.insert(name.to_string(), MapEntry { source });
    }
    Ok(entries)
}

fn flatten_value(values: &mut ValueMap, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => values.append(key, s.as_str()),
        Value::Bool(_) | Value::Number(_) => values.append(key, value.to_string()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => values.append(key, s.as_str()),
                    Value::Null => {}
                    other => values.append(key, other.to_string()),
                }
            }
        }
        Value::Object(fields) => {
            for (name, inner) in fields {
                flatten_value(values, &format!("{key}.{name}"), inner);
            }
        }
    }
}

/// Returns true if flattening `value` appends at least one pair.
fn has_values(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => items.iter().any(|item| !item.is_null()),
        Value::Object(fields) => fields.values().any(has_values),
        _ => true,
    }
}

/// Map entries decoded from a JSON object string.
#[derive(Debug, Default)]
pub(crate) struct JsonEntries {
    /// Flattened values, keyed by each entry's source.
    pub(crate) values: ValueMap,
    /// Member names in document order.
    pub(crate) entries: IndexMap<String, MapEntry>,
}

/// Decodes a JSON object string found under a map field.
///
/// Member names are kept as they are; each entry's values live under the
/// positional source `prefix[#n]`, so no name is ever re-parsed as key
/// notation. Members that would not bind under `nested` are left out.
pub(crate) fn json_object_values(prefix: &str, raw: &str, nested: bool) -> Result<JsonEntries, serde_json::Error> {
    let object: serde_json::Map<String, Value> = serde_json::from_str(raw)?;
    let mut decoded = JsonEntries::default();
    for (position, (name, value)) in object.iter().enumerate() {
        if nested != value.is_object() || !has_values(value) {
            continue;
        }
        let source = format!("{prefix}[#{position}]");
        flatten_value(&mut decoded.values, &source, value);
        decoded.entries.insert(name.clone(), MapEntry { source });
    }
    Ok(decoded)
}
