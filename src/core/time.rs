//! Shared timestamp helpers for stamp envelopes.

use chrono::{DateTime, SecondsFormat, Utc};

/// Returns RFC-3339 UTC with second precision and `Z` suffix
/// (e.g. `2026-08-07T12:00:00Z`).
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// True when `value` parses as an RFC-3339 timestamp.
pub fn is_iso(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}
