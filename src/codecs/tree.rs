//! Canonical tree-description files (`.onextree`) forbid embedded metadata:
//! they are generated artifacts addressed by their own content, and a block
//! inside one is a validation error, never silently accepted.

use crate::codecs::{BlockState, Extraction, FileTypeCodec, HASH_OPEN, MARKDOWN_OPEN};
use crate::core::error::StampError;
use crate::core::model::{MetaType, MetadataRecord};
use crate::core::placement::PlacementPolicy;
use std::path::Path;

pub const TREE_FILENAME: &str = ".onextree";

pub struct TreeCodec;

impl FileTypeCodec for TreeCodec {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn entrypoint_type(&self) -> &'static str {
        "tree"
    }

    fn default_meta_type(&self) -> MetaType {
        MetaType::Unknown
    }

    fn delimiters(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    fn can_handle(&self, path: &Path, _content: &str) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|n| n == TREE_FILENAME || n.ends_with(".onextree"))
    }

    fn extract(&self, path: &Path, content: &str) -> Result<Extraction, StampError> {
        let has_block = content
            .lines()
            .any(|l| l.trim() == HASH_OPEN || l.trim() == MARKDOWN_OPEN);
        if has_block {
            return Err(StampError::Forbidden(format!(
                "{} contains a metadata block, which is not allowed in canonical tree files",
                path.display()
            )));
        }
        Ok(Extraction {
            block: BlockState::Absent,
            body: content.to_string(),
        })
    }

    fn emit(&self, _record: &MetadataRecord) -> Result<String, StampError> {
        Err(StampError::Forbidden(
            "canonical tree files do not accept metadata blocks".to_string(),
        ))
    }

    fn placement_policy(&self) -> PlacementPolicy {
        PlacementPolicy::default()
    }
}
