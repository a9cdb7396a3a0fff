//! Markdown codec: the block is a run of HTML comments, one wrapped YAML
//! line per comment, so stamped documents render cleanly everywhere.

use crate::codecs::{
    BlockState, Extraction, FileTypeCodec, MARKDOWN_CLOSE, MARKDOWN_OPEN, split_block,
};
use crate::core::canonical;
use crate::core::error::StampError;
use crate::core::model::{MetaType, MetadataRecord};
use crate::core::placement::PlacementPolicy;
use std::path::Path;

pub struct MarkdownCodec;

fn unwrap_comment_line(line: &str) -> Result<String, String> {
    if line == "<!-- -->" {
        return Ok(String::new());
    }
    line.strip_prefix("<!-- ")
        .and_then(|rest| rest.strip_suffix(" -->"))
        .map(|inner| inner.to_string())
        .ok_or_else(|| format!("line inside metadata block is not an HTML comment: {:?}", line))
}

fn wrap_comment_line(line: &str) -> String {
    if line.is_empty() {
        "<!-- -->".to_string()
    } else {
        format!("<!-- {} -->", line)
    }
}

impl FileTypeCodec for MarkdownCodec {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn entrypoint_type(&self) -> &'static str {
        "markdown"
    }

    fn default_meta_type(&self) -> MetaType {
        MetaType::Doc
    }

    fn delimiters(&self) -> Option<(&'static str, &'static str)> {
        Some((MARKDOWN_OPEN, MARKDOWN_CLOSE))
    }

    fn can_handle(&self, path: &Path, _content: &str) -> bool {
        path.extension()
            .is_some_and(|e| e == "md" || e == "markdown")
    }

    fn extract(&self, _path: &Path, content: &str) -> Result<Extraction, StampError> {
        match split_block(content, MARKDOWN_OPEN, MARKDOWN_CLOSE) {
            None => Ok(Extraction {
                block: BlockState::Absent,
                body: content.to_string(),
            }),
            Some((inner, body)) => {
                let mut yaml_lines: Vec<String> = Vec::new();
                for line in &inner {
                    match unwrap_comment_line(line) {
                        Ok(unwrapped) => yaml_lines.push(unwrapped),
                        Err(reason) => {
                            return Ok(Extraction {
                                block: BlockState::Corrupted(reason),
                                body,
                            });
                        }
                    }
                }
                let mut yaml = yaml_lines.join("\n");
                yaml.push('\n');
                let block = match canonical::parse_record(&yaml) {
                    Ok(record) => BlockState::Present(record),
                    Err(e) => BlockState::Corrupted(format!("YAML parse error: {}", e)),
                };
                Ok(Extraction { block, body })
            }
        }
    }

    fn emit(&self, record: &MetadataRecord) -> Result<String, StampError> {
        let yaml = canonical::canonicalize(record, &[])?;
        let mut out: Vec<String> = vec![MARKDOWN_OPEN.to_string()];
        for line in yaml.lines() {
            out.push(wrap_comment_line(line));
        }
        out.push(MARKDOWN_CLOSE.to_string());
        let mut text = out.join("\n");
        text.push('\n');
        Ok(text)
    }

    fn placement_policy(&self) -> PlacementPolicy {
        PlacementPolicy::default()
    }
}
