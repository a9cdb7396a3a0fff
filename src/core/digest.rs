//! Content-addressable digest over canonicalized, volatile-masked input.

use crate::core::canonical;
use crate::core::error::StampError;
use crate::core::model::MetadataRecord;
use sha2::{Digest, Sha256};

/// SHA-256 over `canonical_metadata + "\n\n" + canonical_body`, rendered as
/// 64 lowercase hex chars.
pub fn digest(canonical_metadata: &str, canonical_body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_metadata.as_bytes());
    hasher.update(b"\n\n");
    hasher.update(canonical_body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Digest of a record + body pair with the volatile fields masked.
///
/// This is the only digest entry point the engine uses. Masking runs with
/// the fixed sentinels from [`canonical::volatile_masks`]; feeding the
/// record's previous `hash` back in as the mask would make the digest a
/// function of its own history and it would never converge across stamps.
pub fn record_digest(record: &MetadataRecord, body: &str) -> Result<String, StampError> {
    let masks = canonical::volatile_masks();
    let metadata = canonical::canonicalize(record, &masks)?;
    Ok(digest(&metadata, &canonical::normalize_body(body)))
}
