//! YAML codec: the block is a bare YAML document delimited by `---`/`...`
//! at the top of the file.
//!
//! Plain YAML files routinely open with `---` and never carry a `...`
//! document end marker, so a block is only recognized when both delimiters
//! are present; a lone `---` belongs to the body.

use crate::codecs::{
    BlockState, Extraction, FileTypeCodec, YAML_CLOSE, YAML_OPEN, split_block,
};
use crate::core::canonical;
use crate::core::error::StampError;
use crate::core::model::{MetaType, MetadataRecord};
use crate::core::placement::PlacementPolicy;
use std::path::Path;

pub struct YamlCodec;

impl FileTypeCodec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn entrypoint_type(&self) -> &'static str {
        "yaml"
    }

    fn default_meta_type(&self) -> MetaType {
        MetaType::Unknown
    }

    fn delimiters(&self) -> Option<(&'static str, &'static str)> {
        Some((YAML_OPEN, YAML_CLOSE))
    }

    fn can_handle(&self, path: &Path, _content: &str) -> bool {
        path.extension().is_some_and(|e| e == "yaml" || e == "yml")
    }

    fn extract(&self, _path: &Path, content: &str) -> Result<Extraction, StampError> {
        let lines: Vec<&str> = content.lines().collect();
        let opens_with_document = match lines.iter().position(|l| !l.trim().is_empty()) {
            Some(i) => {
                lines[i].trim() == YAML_OPEN
                    && lines[i + 1..].iter().any(|l| l.trim() == YAML_CLOSE)
            }
            None => false,
        };
        if !opens_with_document {
            return Ok(Extraction {
                block: BlockState::Absent,
                body: content.to_string(),
            });
        }

        match split_block(content, YAML_OPEN, YAML_CLOSE) {
            None => Ok(Extraction {
                block: BlockState::Absent,
                body: content.to_string(),
            }),
            Some((inner, body)) => {
                let mut yaml = inner.join("\n");
                yaml.push('\n');
                match canonical::parse_record(&yaml) {
                    Ok(record) => Ok(Extraction {
                        block: BlockState::Present(record),
                        body,
                    }),
                    Err(e) => {
                        // A delimited leading document that never claimed to
                        // be a metadata record is ordinary YAML content, not
                        // a corrupted block; splitting it off would lose it.
                        let looks_like_block = inner
                            .iter()
                            .any(|l| l.trim_start().starts_with("uuid:"));
                        if looks_like_block {
                            Ok(Extraction {
                                block: BlockState::Corrupted(format!(
                                    "YAML parse error: {}",
                                    e
                                )),
                                body,
                            })
                        } else {
                            Ok(Extraction {
                                block: BlockState::Absent,
                                body: content.to_string(),
                            })
                        }
                    }
                }
            }
        }
    }

    fn emit(&self, record: &MetadataRecord) -> Result<String, StampError> {
        let yaml = canonical::canonicalize(record, &[])?;
        Ok(format!("{}\n{}{}\n", YAML_OPEN, yaml, YAML_CLOSE))
    }

    fn placement_policy(&self) -> PlacementPolicy {
        PlacementPolicy::default()
    }
}
