//! Filetype codecs: per-filetype delimiter grammar, block extraction, and
//! block emission.
//!
//! One trait, one concrete type per filetype. A codec owns its delimiter
//! pair and comment convention and converts between on-disk text and
//! `(MetadataRecord, body)` pairs; everything else (identity, hashing,
//! placement, writing) belongs to the engine.

pub mod ignore;
pub mod markdown;
pub mod python;
pub mod registry;
pub mod tree;
pub mod yaml;

use crate::core::canonical;
use crate::core::error::StampError;
use crate::core::model::{MetaType, MetadataRecord};
use crate::core::placement::{self, PlacementPolicy};
use std::path::Path;

/// Delimiters for `#`-commented filetypes (Python, ignore files).
pub const HASH_OPEN: &str = "# === OmniNode:Metadata ===";
pub const HASH_CLOSE: &str = "# === /OmniNode:Metadata ===";

pub const MARKDOWN_OPEN: &str = "<!-- === OmniNode:Metadata === -->";
pub const MARKDOWN_CLOSE: &str = "<!-- === /OmniNode:Metadata === -->";

pub const YAML_OPEN: &str = "---";
pub const YAML_CLOSE: &str = "...";

/// Extraction outcome for the block region.
///
/// `Absent` and `Corrupted` are distinct on purpose: a file without a block
/// gets fresh identity, while a file whose block fails to parse is handled
/// per the corrupted policy. Conflating the two silently discards identity.
#[derive(Debug, Clone)]
pub enum BlockState {
    Absent,
    Present(MetadataRecord),
    Corrupted(String),
}

/// Result of splitting a file into block and body.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub block: BlockState,
    /// File content with the block and its layout scaffolding removed.
    pub body: String,
}

pub trait FileTypeCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// `entrypoint.type` recorded for files first stamped by this codec.
    fn entrypoint_type(&self) -> &'static str;

    fn default_meta_type(&self) -> MetaType;

    /// Delimiter pair, or `None` when the filetype forbids blocks entirely.
    fn delimiters(&self) -> Option<(&'static str, &'static str)>;

    fn can_handle(&self, path: &Path, content: &str) -> bool;

    fn extract(&self, path: &Path, content: &str) -> Result<Extraction, StampError>;

    fn emit(&self, record: &MetadataRecord) -> Result<String, StampError>;

    fn placement_policy(&self) -> PlacementPolicy;
}

/// Splits `content` at the first open/close pair. Returns the raw lines
/// inside the block and the body with the layout separators (blank runs
/// touching the block) dropped; those separators are re-synthesized by the
/// placement normalizer on emission.
pub(crate) fn split_block(
    content: &str,
    open: &str,
    close: &str,
) -> Option<(Vec<String>, String)> {
    let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
    let (start, end) = placement::find_block(&lines, open, close)?;

    let inner: Vec<String> = lines[start + 1..end]
        .iter()
        .map(|l| l.trim_start().to_string())
        .collect();

    let mut pre: Vec<String> = lines[..start].to_vec();
    while pre.last().is_some_and(|l| l.trim().is_empty()) {
        pre.pop();
    }
    let mut post: Vec<String> = lines[end + 1..].to_vec();
    while post.first().is_some_and(|l| l.trim().is_empty()) {
        post.remove(0);
    }

    pre.extend(post);
    let body = if pre.is_empty() {
        String::new()
    } else {
        let mut joined = pre.join("\n");
        joined.push('\n');
        joined
    };
    Some((inner, body))
}

/// Unwraps `#`-prefixed block lines back into a YAML payload.
pub(crate) fn unwrap_hash_lines(inner: &[String]) -> Result<String, String> {
    let mut yaml_lines: Vec<String> = Vec::new();
    for line in inner {
        if let Some(rest) = line.strip_prefix("# ") {
            yaml_lines.push(rest.to_string());
        } else if line == "#" {
            yaml_lines.push(String::new());
        } else {
            return Err(format!(
                "line inside metadata block is not a comment: {:?}",
                line
            ));
        }
    }
    let mut yaml = yaml_lines.join("\n");
    yaml.push('\n');
    Ok(yaml)
}

/// Emits a record as a `#`-commented block.
pub(crate) fn emit_hash_block(record: &MetadataRecord) -> Result<String, StampError> {
    let yaml = canonical::canonicalize(record, &[])?;
    let mut out: Vec<String> = vec![HASH_OPEN.to_string()];
    for line in yaml.lines() {
        if line.is_empty() {
            out.push("#".to_string());
        } else {
            out.push(format!("# {}", line));
        }
    }
    out.push(HASH_CLOSE.to_string());
    let mut text = out.join("\n");
    text.push('\n');
    Ok(text)
}

/// Shared extraction for `#`-commented filetypes.
pub(crate) fn extract_hash_grammar(content: &str) -> Extraction {
    match split_block(content, HASH_OPEN, HASH_CLOSE) {
        None => Extraction {
            block: BlockState::Absent,
            body: content.to_string(),
        },
        Some((inner, body)) => {
            let block = match unwrap_hash_lines(&inner) {
                Err(reason) => BlockState::Corrupted(reason),
                Ok(yaml) => match canonical::parse_record(&yaml) {
                    Ok(record) => BlockState::Present(record),
                    Err(e) => BlockState::Corrupted(format!("YAML parse error: {}", e)),
                },
            };
            Extraction { block, body }
        }
    }
}
