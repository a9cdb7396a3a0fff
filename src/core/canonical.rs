//! Canonical serialization used as hashing input and emission source.
//!
//! Canonical form is key-sorted, block-style YAML with `\n` line endings and
//! no non-breaking spaces. Volatile fields are substituted with fixed
//! sentinels *before* serialization so two stampings of the same logical
//! content always canonicalize to the same bytes, no matter what the
//! record's previous digest or modification time held.
//!
//! Round-trip guarantee: `canonicalize(parse(canonicalize(r))) ==
//! canonicalize(r)` for any valid record `r`.

use crate::core::error::StampError;
use crate::core::model::{HASH_FIELD, LAST_MODIFIED_FIELD, MetadataRecord};
use serde_yaml::{Mapping, Value};

/// Fixed sentinel substituted for `hash` before digesting. Type-correct:
/// a 64-char lowercase hex string, never the record's previous digest.
pub const HASH_SENTINEL: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Fixed sentinel substituted for `last_modified_at` before digesting.
pub const EPOCH_SENTINEL: &str = "1970-01-01T00:00:00Z";

/// The volatile fields paired with their sentinels.
pub fn volatile_masks() -> [(&'static str, &'static str); 2] {
    [
        (HASH_FIELD, HASH_SENTINEL),
        (LAST_MODIFIED_FIELD, EPOCH_SENTINEL),
    ]
}

/// Renders `record` as canonical YAML, substituting each `(field, sentinel)`
/// mask before serialization.
///
/// Masked fields are inserted unconditionally: a fresh record that has no
/// digest yet and a re-stamped record whose digest is masked must
/// canonicalize identically.
pub fn canonicalize(
    record: &MetadataRecord,
    masks: &[(&str, &str)],
) -> Result<String, StampError> {
    let mut value = serde_yaml::to_value(record)?;
    if let Value::Mapping(map) = &mut value {
        for (field, sentinel) in masks {
            map.insert(
                Value::String((*field).to_string()),
                Value::String((*sentinel).to_string()),
            );
        }
    }
    let text = serde_yaml::to_string(&sort_keys(value))?;
    Ok(scrub(&text))
}

/// Strict parse of a canonical (or hand-edited) YAML payload back into a
/// record. Unknown keys are an error, not silently dropped.
pub fn parse_record(yaml: &str) -> Result<MetadataRecord, StampError> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Body normalization applied before hashing and before re-emission:
/// `\n` line endings, no trailing whitespace per line, exactly one trailing
/// newline. An empty body stays empty.
pub fn normalize_body(text: &str) -> String {
    let scrubbed = scrub(text);
    let mut lines: Vec<&str> = scrubbed.lines().map(|l| l.trim_end()).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(Value, Value)> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            entries.sort_by(|(a, _), (b, _)| yaml_key(a).cmp(&yaml_key(b)));
            let mut sorted = Mapping::new();
            for (k, v) in entries {
                sorted.insert(k, v);
            }
            Value::Mapping(sorted)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn yaml_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

fn scrub(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{00A0}', " ")
}
