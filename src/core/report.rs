//! Per-file and run-level result envelopes.
//!
//! Every stamped path yields one [`FileReport`]; a run aggregates them into
//! a [`RunReport`] whose worst status drives the process exit code. Reports
//! render as colored terminal lines or as a deterministic JSON envelope.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Worst-wins ordering: `Unchanged < Success < Warning < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StampStatus {
    Unchanged,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub status: StampStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub dry_run: bool,
}

impl FileReport {
    pub fn new(path: &Path, status: StampStatus, dry_run: bool) -> FileReport {
        FileReport {
            path: path.display().to_string(),
            status,
            messages: Vec::new(),
            previous_hash: None,
            hash: None,
            dry_run,
        }
    }

    pub fn error(path: &Path, message: String, dry_run: bool) -> FileReport {
        let mut report = FileReport::new(path, StampStatus::Error, dry_run);
        report.messages.push(message);
        report
    }

    pub fn with_message(mut self, message: String) -> FileReport {
        self.messages.push(message);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: String,
    pub status: StampStatus,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn from_files(files: Vec<FileReport>) -> RunReport {
        let status = files
            .iter()
            .map(|f| f.status)
            .max()
            .unwrap_or(StampStatus::Unchanged);
        RunReport {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            status,
            files,
        }
    }

    /// `0` when every file landed Success/Unchanged, `1` otherwise. The
    /// fatal exit `2` is reserved for whole-run failures and is produced by
    /// the CLI layer, not here.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            StampStatus::Unchanged | StampStatus::Success => 0,
            StampStatus::Warning | StampStatus::Error => 1,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mut stamped = 0usize;
        let mut unchanged = 0usize;
        let mut flagged = 0usize;

        for file in &self.files {
            let tag = match file.status {
                StampStatus::Success => {
                    stamped += 1;
                    "●".bright_green().to_string()
                }
                StampStatus::Unchanged => {
                    unchanged += 1;
                    "✓".bright_black().to_string()
                }
                StampStatus::Warning => {
                    flagged += 1;
                    "⚠".bright_yellow().to_string()
                }
                StampStatus::Error => {
                    flagged += 1;
                    "✗".bright_red().to_string()
                }
            };
            out.push_str(&format!("  {} {}", tag, file.path));
            if file.dry_run && file.status == StampStatus::Success {
                out.push_str(&format!(" {}", "(dry-run)".bright_black()));
            }
            if !file.messages.is_empty() {
                out.push_str(&format!(
                    " {}",
                    preview_messages(&file.messages, 2, 96).bright_black()
                ));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "\n  {} stamped, {} unchanged, {} flagged\n",
            stamped.to_string().bright_green(),
            unchanged.to_string().bright_white(),
            if flagged > 0 {
                flagged.to_string().bright_red().to_string()
            } else {
                flagged.to_string().bright_black().to_string()
            }
        ));
        out
    }
}

/// Single-line preview of the first messages, whitespace collapsed and
/// bounded for terminal display.
fn preview_messages(messages: &[String], max_items: usize, max_chars: usize) -> String {
    let mut shown: Vec<String> = Vec::new();
    for msg in messages.iter().take(max_items) {
        let collapsed = msg.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() > max_chars {
            let cut: String = collapsed.chars().take(max_chars).collect();
            shown.push(format!("{}...", cut));
        } else {
            shown.push(collapsed);
        }
    }
    let mut line = shown.join(" | ");
    if messages.len() > max_items {
        line.push_str(&format!(" (+{} more)", messages.len() - max_items));
    }
    line
}
