//! Omnistamp: idempotent metadata stamping for source and text files.
//!
//! Omnistamp embeds a structured, machine-verifiable metadata block at the
//! top of Python, Markdown, YAML, and ignore files, and rewrites that block
//! only when the file's logical content changes.
//!
//! # Core Principles
//!
//! - **Idempotent**: re-stamping an unchanged file is a byte-for-byte no-op
//! - **Identity-preserving**: `uuid` and `created_at` are written once and
//!   survive every later stamp
//! - **Deterministic**: hashing runs over a canonical, volatile-masked
//!   serialization, so the digest never depends on its own history
//! - **Atomic**: rewrites go through write-to-temp + rename
//!
//! # Architecture
//!
//! Per file: `StampEngine` → `HandlerRegistry::resolve(path)` →
//! `FileTypeCodec::extract` → canonicalize + digest →
//! `FileTypeCodec::emit` → placement normalization → atomic write.
//!
//! - [`core`]: canonicalization, digesting, placement, engine, reporting
//! - [`codecs`]: per-filetype block grammars and the handler registry
//!
//! # Examples
//!
//! ```bash
//! # Preview what would change (dry-run is the default)
//! omnistamp file src/tool.py
//!
//! # Stamp a whole tree, writing results
//! omnistamp directory . --apply --author "OmniNode Team"
//!
//! # Machine-readable results
//! omnistamp directory . --format json
//! ```

pub mod codecs;
pub mod core;

use crate::codecs::registry::HandlerRegistry;
use crate::core::config::StampConfig;
use crate::core::engine::{CorruptedPolicy, DirectoryOptions, StampEngine, StampOptions};
use crate::core::error::StampError;
use crate::core::report::RunReport;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "omnistamp",
    version = env!("CARGO_PKG_VERSION"),
    about = "Idempotent metadata stamping for source and text files"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct CommonCli {
    /// Author recorded in stamped blocks (overrides config).
    #[clap(long)]
    author: Option<String>,
    /// Write results to disk; without this flag the run is a dry run that
    /// computes and reports but never touches a file.
    #[clap(long)]
    apply: bool,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    format: String,
    /// Corrupted-block policy: 'regenerate' or 'strict'.
    #[clap(long)]
    corrupted: Option<String>,
    /// Regenerate corrupted blocks even under the strict policy.
    #[clap(long)]
    repair: bool,
}

#[derive(clap::Args, Debug)]
struct FileCli {
    /// Files to stamp.
    #[clap(required = true)]
    paths: Vec<PathBuf>,

    #[clap(flatten)]
    common: CommonCli,
}

#[derive(clap::Args, Debug)]
struct DirectoryCli {
    /// Directory to stamp.
    dir: PathBuf,

    #[clap(flatten)]
    common: CommonCli,

    /// Recurse into subdirectories (overrides config).
    #[clap(long)]
    recursive: Option<bool>,

    /// Restrict to matching file names or extensions (repeatable).
    #[clap(long)]
    include: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp one or more files
    #[clap(name = "file", visible_alias = "f")]
    File(FileCli),

    /// Stamp every eligible file under a directory
    #[clap(name = "directory", visible_alias = "dir")]
    Directory(DirectoryCli),

    /// Show version information
    #[clap(name = "version")]
    Version,
}

/// CLI entrypoint. Returns the process exit code: `0` all clean, `1` one or
/// more file-level errors/warnings. Fatal conditions (unreadable named
/// input, no codec for a named file, registry construction failure) bubble
/// as `Err` and exit `2` in `main`.
pub fn run() -> Result<i32, StampError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Command::File(file_cli) => {
            let start = file_cli
                .paths
                .first()
                .cloned()
                .unwrap_or_else(|| PathBuf::from("."));
            let config = StampConfig::discover(&start)?;
            let options = stamp_options(&file_cli.common, &config)?;
            let registry = HandlerRegistry::with_defaults()?;
            let engine = StampEngine::new(&registry, options);
            let report = engine.stamp_files(&file_cli.paths)?;
            emit_report(&report, &file_cli.common.format);
            Ok(report.exit_code())
        }
        Command::Directory(dir_cli) => {
            let config = StampConfig::discover(&dir_cli.dir)?;
            let options = stamp_options(&dir_cli.common, &config)?;
            let dir_options = DirectoryOptions {
                recursive: dir_cli
                    .recursive
                    .or(config.directory.recursive)
                    .unwrap_or(true),
                ignore: config.ignore_list(),
                include: dir_cli.include.clone(),
            };
            let registry = HandlerRegistry::with_defaults()?;
            let engine = StampEngine::new(&registry, options);
            let report = engine.stamp_directory(&dir_cli.dir, &dir_options)?;
            emit_report(&report, &dir_cli.common.format);
            Ok(report.exit_code())
        }
    }
}

fn stamp_options(common: &CommonCli, config: &StampConfig) -> Result<StampOptions, StampError> {
    let corrupted = match common.corrupted.as_deref().or(config.corrupted.as_deref()) {
        Some(raw) => raw.parse::<CorruptedPolicy>()?,
        None => CorruptedPolicy::default(),
    };
    Ok(StampOptions {
        author: common.author.clone().or_else(|| config.author.clone()),
        apply: common.apply,
        corrupted,
        repair: common.repair,
    })
}

fn emit_report(report: &RunReport, format: &str) {
    if format == "json" {
        println!("{}", report.to_json());
    } else {
        print!("{}", report.render_text());
    }
}
