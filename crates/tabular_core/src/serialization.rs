//! Canonical JSON for model artifacts
//!
//! Object keys are emitted in sorted order with two-space indentation, so the
//! same pipeline always produces the same bytes and therefore the same hash.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use std::io::Write;

/// Rebuild `value` with every object's keys in ascending order
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, val)| (key, sort_keys(val)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Write the canonical form of `value` to `writer`
pub fn write_canonical_json<T, W>(writer: W, value: &T) -> Result<(), serde_json::Error>
where
    T: Serialize,
    W: Write,
{
    let sorted = sort_keys(serde_json::to_value(value)?);
    let mut serializer = Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"  "));
    sorted.serialize(&mut serializer)
}

pub fn canonical_json_string<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize,
{
    let mut buffer = Vec::new();
    write_canonical_json(&mut buffer, value)?;
    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// BLAKE3 hex digest of a value's canonical JSON form.
pub fn canonical_hash_hex<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize,
{
    let json = canonical_json_string(value)?;
    Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
}
