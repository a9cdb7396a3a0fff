//! The idempotent stamping engine.
//!
//! Orchestration per file: resolve the codec, extract the existing block,
//! carry identity forward, rebuild the candidate record, digest the masked
//! canonical form, and rewrite only when the rendered result differs from
//! what is on disk.
//!
//! # Contracts
//!
//! - **Idempotence**: stamping a stamped file is a byte-for-byte no-op.
//! - **Identity preservation**: `uuid` and `created_at` survive every
//!   stamp, no matter how the body changes.
//! - **Volatile coupling**: `last_modified_at` moves if and only if the
//!   digest moves.
//! - **Atomicity**: rewrites go through write-to-temp + rename; a crashed
//!   run never leaves a truncated file.
//!
//! Directory runs fan out across files with rayon while a keyed lock map
//! serializes stamps per path; the registry is shared read-only.

use crate::codecs::registry::HandlerRegistry;
use crate::codecs::{BlockState, FileTypeCodec};
use crate::core::canonical;
use crate::core::config;
use crate::core::digest;
use crate::core::error::StampError;
use crate::core::fsio;
use crate::core::model::{self, Entrypoint, MetadataRecord};
use crate::core::placement;
use crate::core::report::{FileReport, RunReport, StampStatus};
use crate::core::time;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;
use walkdir::WalkDir;

pub const DEFAULT_VERSION: &str = "0.1.0";
pub const DEFAULT_AUTHOR: &str = "omnistamp";

/// What to do with a block that is present but unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptedPolicy {
    /// Treat as absent-with-warning: fresh identity, file re-stamped.
    #[default]
    Regenerate,
    /// Hard per-file error; the file is left untouched.
    Strict,
}

impl FromStr for CorruptedPolicy {
    type Err = StampError;

    fn from_str(s: &str) -> Result<CorruptedPolicy, StampError> {
        match s {
            "regenerate" => Ok(CorruptedPolicy::Regenerate),
            "strict" => Ok(CorruptedPolicy::Strict),
            other => Err(StampError::ConfigError(format!(
                "unknown corrupted policy: {} (expected 'regenerate' or 'strict')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StampOptions {
    /// Author recorded in fresh records and, when set, overriding the
    /// carried-forward author on re-stamps.
    pub author: Option<String>,
    /// Write results to disk. Off by default: dry-run computes and reports
    /// without touching any file.
    pub apply: bool,
    pub corrupted: CorruptedPolicy,
    /// Per-run override: regenerate corrupted blocks even under `Strict`.
    pub repair: bool,
}

impl Default for StampOptions {
    fn default() -> StampOptions {
        StampOptions {
            author: None,
            apply: false,
            corrupted: CorruptedPolicy::default(),
            repair: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryOptions {
    pub recursive: bool,
    /// Directory names never descended into.
    pub ignore: Vec<String>,
    /// Restrict to matching file names or extensions; empty means every
    /// supported file.
    pub include: Vec<String>,
}

impl Default for DirectoryOptions {
    fn default() -> DirectoryOptions {
        DirectoryOptions {
            recursive: true,
            ignore: config::DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            include: Vec::new(),
        }
    }
}

/// One in-flight stamp per path: the algorithm reads-then-writes the same
/// file, so concurrent stamps of one path must serialize.
#[derive(Default)]
struct PathLocks {
    inner: Mutex<FxHashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    fn acquire(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct StampEngine<'a> {
    registry: &'a HandlerRegistry,
    options: StampOptions,
    locks: PathLocks,
}

impl<'a> StampEngine<'a> {
    pub fn new(registry: &'a HandlerRegistry, options: StampOptions) -> StampEngine<'a> {
        StampEngine {
            registry,
            options,
            locks: PathLocks::default(),
        }
    }

    /// Stamps one path, converting every per-file failure into the report.
    /// Nothing here aborts a multi-file run.
    pub fn stamp_path(&self, path: &Path) -> FileReport {
        let lock = self.locks.acquire(path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.stamp_inner(path) {
            Ok(report) => report,
            Err(e) => FileReport::error(path, e.to_string(), !self.options.apply),
        }
    }

    /// Stamps explicitly named files. A named path that does not exist or
    /// has no codec is fatal to the run, unlike during traversal.
    pub fn stamp_files(&self, paths: &[PathBuf]) -> Result<RunReport, StampError> {
        for path in paths {
            if !path.is_file() {
                return Err(StampError::IoError(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                )));
            }
            self.registry.resolve(path)?;
        }
        let reports: Vec<FileReport> =
            paths.par_iter().map(|p| self.stamp_path(p)).collect();
        Ok(RunReport::from_files(reports))
    }

    /// Walks `dir` and stamps every eligible file, fanning out across
    /// files. Unsupported files are skipped; they only surface as warnings
    /// when an `--include` filter named them explicitly.
    pub fn stamp_directory(
        &self,
        dir: &Path,
        opts: &DirectoryOptions,
    ) -> Result<RunReport, StampError> {
        if !dir.is_dir() {
            return Err(StampError::IoError(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", dir.display()),
            )));
        }

        let dry_run = !self.options.apply;
        let mut reports: Vec<FileReport> = Vec::new();
        let mut paths: Vec<PathBuf> = Vec::new();

        let walker = if opts.recursive {
            WalkDir::new(dir)
        } else {
            WalkDir::new(dir).max_depth(1)
        };
        let skip = |entry: &walkdir::DirEntry| {
            entry.depth() > 0
                && opts
                    .ignore
                    .iter()
                    .any(|name| entry.file_name().to_string_lossy() == name.as_str())
        };
        for entry in walker.into_iter().filter_entry(|e| !skip(e)) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.to_path_buf())
                        .unwrap_or_else(|| dir.to_path_buf());
                    reports.push(FileReport::error(
                        &path,
                        format!("traversal error: {}", e),
                        dry_run,
                    ));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if !included(&path, &opts.include) {
                continue;
            }
            if self.registry.is_supported(&path) {
                paths.push(path);
            } else if !opts.include.is_empty() {
                reports.push(
                    FileReport::new(&path, StampStatus::Warning, dry_run)
                        .with_message("unsupported file type; skipped".to_string()),
                );
            }
        }

        paths.sort();
        let stamped: Vec<FileReport> =
            paths.par_iter().map(|p| self.stamp_path(p)).collect();
        reports.extend(stamped);
        Ok(RunReport::from_files(reports))
    }

    fn stamp_inner(&self, path: &Path) -> Result<FileReport, StampError> {
        let dry_run = !self.options.apply;
        let codec = self.registry.resolve(path)?;
        let content = fsio::read_file(path)?;
        if !codec.can_handle(path, &content) {
            return Err(StampError::UnsupportedFileType(path.display().to_string()));
        }

        // Forbidden filetypes surface here: extract errors when any block
        // is present.
        let extraction = codec.extract(path, &content)?;

        let Some((open, close)) = codec.delimiters() else {
            return Ok(FileReport::new(path, StampStatus::Unchanged, dry_run)
                .with_message(format!(
                    "{} files do not carry metadata blocks; nothing to do",
                    codec.name()
                )));
        };

        let (previous, messages) = self.resolve_previous(extraction.block)?;

        let now = time::now_iso();
        let mut candidate = self.build_candidate(path, codec.as_ref(), previous.as_ref(), &now);

        // The body is hashed in the exact shape it will occupy on disk, so
        // the digest of a freshly stamped file matches its own re-stamp.
        let policy = codec.placement_policy();
        let body = placement::normalize_layout(
            &canonical::normalize_body(&extraction.body),
            open,
            close,
            &policy,
        );

        let new_hash = digest::record_digest(&candidate, &body)?;
        let previous_hash = previous.as_ref().and_then(|p| p.hash.clone());
        let hash_changed = previous_hash.as_deref() != Some(new_hash.as_str());

        candidate.hash = Some(new_hash.clone());
        candidate.last_modified_at = if hash_changed {
            Some(now.clone())
        } else {
            previous
                .as_ref()
                .and_then(|p| p.last_modified_at.clone())
                .or(Some(now.clone()))
        };
        candidate.validate()?;

        let block_text = codec.emit(&candidate)?;
        let assembled = if body.is_empty() {
            block_text
        } else {
            format!("{}\n{}", block_text, body)
        };
        let rendered = placement::normalize_layout(&assembled, open, close, &policy);

        let mut report = if rendered == content {
            FileReport::new(path, StampStatus::Unchanged, dry_run)
        } else {
            if !dry_run {
                fsio::atomic_write(path, &rendered)?;
            }
            let status = if messages.is_empty() {
                StampStatus::Success
            } else {
                StampStatus::Warning
            };
            FileReport::new(path, status, dry_run)
        };
        report.previous_hash = previous_hash;
        report.hash = Some(new_hash);
        report.messages = messages;
        Ok(report)
    }

    /// Identity resolution. Present blocks donate `uuid`/`created_at`;
    /// Absent and (under the regenerate policy) Corrupted blocks get fresh
    /// identity. Corruption under `Strict` is a hard per-file error.
    fn resolve_previous(
        &self,
        block: BlockState,
    ) -> Result<(Option<MetadataRecord>, Vec<String>), StampError> {
        let mut messages = Vec::new();
        let regenerate =
            self.options.repair || self.options.corrupted == CorruptedPolicy::Regenerate;
        let previous = match block {
            BlockState::Present(record) => {
                if record.identity_intact() {
                    Some(record)
                } else if regenerate {
                    messages.push(
                        "existing block carries invalid identity fields; regenerated with fresh identity"
                            .to_string(),
                    );
                    None
                } else {
                    return Err(StampError::SchemaInvalid(
                        "existing block carries invalid identity fields (uuid/created_at)"
                            .to_string(),
                    ));
                }
            }
            BlockState::Absent => None,
            BlockState::Corrupted(reason) => {
                if regenerate {
                    messages.push(format!(
                        "corrupted block regenerated with fresh identity: {}",
                        reason
                    ));
                    None
                } else {
                    return Err(StampError::Corrupted(reason));
                }
            }
        };
        Ok((previous, messages))
    }

    /// Candidate record: descriptive fields carry forward from the previous
    /// record; identity carries forward unchanged; fresh records derive
    /// name/namespace/entrypoint from the path.
    fn build_candidate(
        &self,
        path: &Path,
        codec: &dyn FileTypeCodec,
        previous: Option<&MetadataRecord>,
        now: &str,
    ) -> MetadataRecord {
        match previous {
            Some(prev) => MetadataRecord {
                uuid: prev.uuid.clone(),
                name: prev.name.clone(),
                namespace: prev.namespace.clone(),
                version: prev.version.clone(),
                author: self
                    .options
                    .author
                    .clone()
                    .unwrap_or_else(|| prev.author.clone()),
                created_at: prev.created_at.clone(),
                last_modified_at: None,
                hash: None,
                entrypoint: prev.entrypoint.clone(),
                lifecycle: prev.lifecycle,
                meta_type: prev.meta_type,
                tags: prev.tags.clone(),
                description: prev.description.clone(),
            },
            None => MetadataRecord {
                uuid: Uuid::new_v4().to_string(),
                name: model::derive_name(path),
                namespace: model::derive_namespace(path),
                version: DEFAULT_VERSION.to_string(),
                author: self
                    .options
                    .author
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
                created_at: now.to_string(),
                last_modified_at: None,
                hash: None,
                entrypoint: Entrypoint {
                    kind: codec.entrypoint_type().to_string(),
                    target: path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| model::derive_name(path)),
                },
                lifecycle: Default::default(),
                meta_type: codec.default_meta_type(),
                tags: Vec::new(),
                description: None,
            },
        }
    }
}

fn included(path: &Path, include: &[String]) -> bool {
    if include.is_empty() {
        return true;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    include.iter().any(|raw| {
        if *raw == name {
            return true;
        }
        let pat = raw.trim_start_matches("*.").trim_start_matches('.');
        pat == ext
    })
}
