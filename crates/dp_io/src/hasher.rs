//! SHA-256 digests and ids derived from canonical bytes.
//!
//! - Hex digests are lowercase.
//! - `sha256_canonical` hashes the canonical JSON of a value, so field order
//!   in the source file never changes the digest.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::snapshot::ContestSnapshot;
use crate::IoResult;

fn to_lower_hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(LUT[(b >> 4) as usize] as char);
        out.push(LUT[(b & 0x0F) as usize] as char);
    }
    out
}

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    to_lower_hex(&Sha256::digest(bytes))
}

/// SHA-256 over the canonical JSON of `value`.
pub fn sha256_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    Ok(sha256_hex(&to_canonical_bytes(value)?))
}

/// `SNP:<hex>` id of a snapshot.
pub fn snapshot_id(snap: &ContestSnapshot) -> IoResult<String> {
    Ok(format!("SNP:{}", sha256_canonical(snap)?))
}
