//! Metadata record model.
//!
//! A [`MetadataRecord`] is the payload carried by the delimited block at the
//! top of a stamped file. Two field classes matter to the engine:
//!
//! - **Identity fields** (`uuid`, `created_at`): written once at the first
//!   stamp and copied forward verbatim on every later stamp.
//! - **Volatile fields** (`hash`, `last_modified_at`): recomputed on every
//!   stamp that changes content, and masked with fixed sentinels before
//!   hashing so the digest never depends on its own history.
//!
//! Everything else is descriptive provenance. Serialization omits `None`
//! and empty collections so emitted blocks stay minimal.

use crate::core::error::StampError;
use crate::core::time;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Field name of the content digest (volatile).
pub const HASH_FIELD: &str = "hash";
/// Field name of the last-modified timestamp (volatile).
pub const LAST_MODIFIED_FIELD: &str = "last_modified_at";

/// Namespace prefix for records derived from a file path.
pub const NAMESPACE_PREFIX: &str = "omninode.stamped";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Draft,
    #[default]
    Active,
    Deprecated,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaType {
    Tool,
    Validator,
    Agent,
    Model,
    Schema,
    Plugin,
    IgnoreConfig,
    Doc,
    #[default]
    Unknown,
}

/// How the stamped entity is entered: the codec supplies `type`, the file
/// name supplies `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entrypoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataRecord {
    pub uuid: String,
    pub name: String,
    pub namespace: String,
    pub version: String,
    pub author: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub entrypoint: Entrypoint,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default)]
    pub meta_type: MetaType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetadataRecord {
    /// Field-level validation gate, run before any block is emitted.
    ///
    /// Parse-level failures of an existing block are `Corrupted`; a block
    /// that parses but carries malformed values fails here instead.
    pub fn validate(&self) -> Result<(), StampError> {
        if Uuid::parse_str(&self.uuid).is_err() {
            return Err(StampError::SchemaInvalid(format!(
                "uuid is not a valid UUID: {}",
                self.uuid
            )));
        }
        if self.name.trim().is_empty() {
            return Err(StampError::SchemaInvalid("name must not be empty".into()));
        }
        if self.namespace.trim().is_empty() {
            return Err(StampError::SchemaInvalid(
                "namespace must not be empty".into(),
            ));
        }
        let semver_re = Regex::new(r"^\d+\.\d+\.\d+$").unwrap();
        if !semver_re.is_match(&self.version) {
            return Err(StampError::SchemaInvalid(format!(
                "version is not semver: {}",
                self.version
            )));
        }
        if !time::is_iso(&self.created_at) {
            return Err(StampError::SchemaInvalid(format!(
                "created_at is not RFC-3339: {}",
                self.created_at
            )));
        }
        if let Some(ts) = &self.last_modified_at {
            if !time::is_iso(ts) {
                return Err(StampError::SchemaInvalid(format!(
                    "last_modified_at is not RFC-3339: {}",
                    ts
                )));
            }
        }
        if let Some(h) = &self.hash {
            let hash_re = Regex::new(r"^[0-9a-f]{64}$").unwrap();
            if !hash_re.is_match(h) {
                return Err(StampError::SchemaInvalid(format!(
                    "hash is not a 64-char lowercase hex digest: {}",
                    h
                )));
            }
        }
        if self.entrypoint.target.trim().is_empty() {
            return Err(StampError::SchemaInvalid(
                "entrypoint.target must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// True when the identity fields survived a parse intact. Used to decide
    /// whether a Present block can donate its identity to the candidate.
    pub fn identity_intact(&self) -> bool {
        Uuid::parse_str(&self.uuid).is_ok() && time::is_iso(&self.created_at)
    }
}

fn sanitize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Logical name derived from the file stem (`lib.py` → `lib`).
pub fn derive_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "unnamed".to_string())
}

/// Dotted namespace under [`NAMESPACE_PREFIX`], stable across machines
/// because it depends only on the file name, never on the absolute path.
pub fn derive_namespace(path: &Path) -> String {
    format!("{}.{}", NAMESPACE_PREFIX, sanitize_component(&derive_name(path)))
}
