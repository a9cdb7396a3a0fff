//! Priority-ordered dispatch from path to codec.
//!
//! The registry is built once, is read-only afterwards, and is shared by
//! reference across concurrent stampers. Canonical-filename entries win
//! over extension entries; within a key, the highest registration priority
//! wins and later registrations break ties, so a plugin can shadow a core
//! codec for the same extension.

use crate::codecs::FileTypeCodec;
use crate::codecs::ignore::{IGNORE_FILENAMES, IgnoreCodec};
use crate::codecs::markdown::MarkdownCodec;
use crate::codecs::python::PythonCodec;
use crate::codecs::tree::{TREE_FILENAME, TreeCodec};
use crate::codecs::yaml::YamlCodec;
use crate::core::error::StampError;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// Highest wins: `Plugin > NodeLocal > Runtime > Core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandlerPriority {
    Core,
    Runtime,
    NodeLocal,
    Plugin,
}

struct Registration {
    priority: HandlerPriority,
    codec: Arc<dyn FileTypeCodec>,
}

#[derive(Default)]
pub struct HandlerRegistry {
    by_filename: FxHashMap<String, Vec<Registration>>,
    by_extension: FxHashMap<String, Vec<Registration>>,
}

impl HandlerRegistry {
    pub fn new() -> HandlerRegistry {
        HandlerRegistry::default()
    }

    /// Registry with the core codecs installed. Failing to assemble the
    /// default set is the one fatal (whole-run) condition.
    pub fn with_defaults() -> Result<HandlerRegistry, StampError> {
        let mut registry = HandlerRegistry::new();

        registry.register_extension("py", HandlerPriority::Core, Arc::new(PythonCodec));
        registry.register_extension("md", HandlerPriority::Core, Arc::new(MarkdownCodec));
        registry.register_extension("markdown", HandlerPriority::Core, Arc::new(MarkdownCodec));
        registry.register_extension("yaml", HandlerPriority::Core, Arc::new(YamlCodec));
        registry.register_extension("yml", HandlerPriority::Core, Arc::new(YamlCodec));
        for name in IGNORE_FILENAMES {
            registry.register_filename(name, HandlerPriority::Core, Arc::new(IgnoreCodec));
        }
        registry.register_filename(TREE_FILENAME, HandlerPriority::Core, Arc::new(TreeCodec));
        registry.register_extension("onextree", HandlerPriority::Core, Arc::new(TreeCodec));

        registry.ensure_populated()?;
        Ok(registry)
    }

    pub fn register_extension(
        &mut self,
        extension: &str,
        priority: HandlerPriority,
        codec: Arc<dyn FileTypeCodec>,
    ) {
        self.by_extension
            .entry(extension.trim_start_matches('.').to_string())
            .or_default()
            .push(Registration { priority, codec });
    }

    pub fn register_filename(
        &mut self,
        filename: &str,
        priority: HandlerPriority,
        codec: Arc<dyn FileTypeCodec>,
    ) {
        self.by_filename
            .entry(filename.to_string())
            .or_default()
            .push(Registration { priority, codec });
    }

    pub fn resolve(&self, path: &Path) -> Result<Arc<dyn FileTypeCodec>, StampError> {
        if let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) {
            if let Some(found) = self.by_filename.get(&name).and_then(best) {
                return Ok(found);
            }
        }
        if let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_string()) {
            if let Some(found) = self.by_extension.get(&ext).and_then(best) {
                return Ok(found);
            }
        }
        Err(StampError::UnsupportedFileType(path.display().to_string()))
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.resolve(path).is_ok()
    }

    fn ensure_populated(&self) -> Result<(), StampError> {
        if self.by_filename.is_empty() && self.by_extension.is_empty() {
            return Err(StampError::ConfigError(
                "handler registry has no registered codecs".to_string(),
            ));
        }
        Ok(())
    }
}

fn best(registrations: &Vec<Registration>) -> Option<Arc<dyn FileTypeCodec>> {
    let mut found: Option<&Registration> = None;
    for reg in registrations {
        match &found {
            // `>=` so later registrations win priority ties
            Some(current) if reg.priority >= current.priority => found = Some(reg),
            Some(_) => {}
            None => found = Some(reg),
        }
    }
    found.map(|r| r.codec.clone())
}
