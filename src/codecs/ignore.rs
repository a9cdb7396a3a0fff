//! Ignore-file codec (`.onexignore`, `.gitignore`): same `#`-commented
//! grammar as Python, no shebang handling.

use crate::codecs::{
    Extraction, FileTypeCodec, HASH_CLOSE, HASH_OPEN, emit_hash_block, extract_hash_grammar,
};
use crate::core::error::StampError;
use crate::core::model::{MetaType, MetadataRecord};
use crate::core::placement::PlacementPolicy;
use std::path::Path;

pub const IGNORE_FILENAMES: &[&str] = &[".onexignore", ".gitignore"];

pub struct IgnoreCodec;

impl FileTypeCodec for IgnoreCodec {
    fn name(&self) -> &'static str {
        "ignore"
    }

    fn entrypoint_type(&self) -> &'static str {
        "ignore"
    }

    fn default_meta_type(&self) -> MetaType {
        MetaType::IgnoreConfig
    }

    fn delimiters(&self) -> Option<(&'static str, &'static str)> {
        Some((HASH_OPEN, HASH_CLOSE))
    }

    fn can_handle(&self, path: &Path, _content: &str) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|n| IGNORE_FILENAMES.contains(&n.as_ref()))
    }

    fn extract(&self, _path: &Path, content: &str) -> Result<Extraction, StampError> {
        Ok(extract_hash_grammar(content))
    }

    fn emit(&self, record: &MetadataRecord) -> Result<String, StampError> {
        emit_hash_block(record)
    }

    fn placement_policy(&self) -> PlacementPolicy {
        PlacementPolicy::default()
    }
}
