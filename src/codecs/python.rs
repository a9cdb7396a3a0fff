//! Python source codec: `#`-commented YAML block, shebang-aware placement.

use crate::codecs::{
    BlockState, Extraction, FileTypeCodec, HASH_CLOSE, HASH_OPEN, emit_hash_block,
    extract_hash_grammar,
};
use crate::core::error::StampError;
use crate::core::model::{MetaType, MetadataRecord};
use crate::core::placement::PlacementPolicy;
use std::path::Path;

pub struct PythonCodec;

impl FileTypeCodec for PythonCodec {
    fn name(&self) -> &'static str {
        "python"
    }

    fn entrypoint_type(&self) -> &'static str {
        "python"
    }

    fn default_meta_type(&self) -> MetaType {
        MetaType::Tool
    }

    fn delimiters(&self) -> Option<(&'static str, &'static str)> {
        Some((HASH_OPEN, HASH_CLOSE))
    }

    fn can_handle(&self, path: &Path, _content: &str) -> bool {
        path.extension().is_some_and(|e| e == "py")
    }

    fn extract(&self, _path: &Path, content: &str) -> Result<Extraction, StampError> {
        Ok(extract_hash_grammar(content))
    }

    fn emit(&self, record: &MetadataRecord) -> Result<String, StampError> {
        emit_hash_block(record)
    }

    fn placement_policy(&self) -> PlacementPolicy {
        PlacementPolicy {
            allow_shebang: true,
            ..Default::default()
        }
    }
}
