//! dp_io — the only crate that touches files.
//!
//! - Contest snapshots (camelCase JSON), loaded with a size limit and saved
//!   as canonical JSON with an atomic write.
//! - Params files for the predefinition run.
//! - SHA-256 digests over canonical bytes (`SNP:<hex>` snapshot ids).

#![forbid(unsafe_code)]

use thiserror::Error;

use dp_core::EngineError;

/// Unified error for dp_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, fsync, ...).
    #[error("io/path error: {0}")]
    Path(String),

    /// File exceeds the read limit.
    #[error("{path}: larger than {limit} bytes")]
    TooLarge { path: String, limit: u64 },

    /// JSON serialization/deserialization errors.
    #[error("json error in {path}: {msg}")]
    Json { path: String, msg: String },

    /// Content parsed but breaks a domain rule.
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json { path: "-".to_string(), msg: e.to_string() }
    }
}

impl From<EngineError> for IoError {
    fn from(e: EngineError) -> Self {
        IoError::Invalid(e.to_string())
    }
}

/// Read at most `limit` bytes of `path`; a longer file is an error, not a truncation.
pub(crate) fn read_limited(path: &std::path::Path, limit: u64) -> IoResult<Vec<u8>> {
    use std::io::Read;

    let f = std::fs::File::open(path).map_err(|e| IoError::Path(format!("{} ({e})", path.display())))?;
    let mut buf = Vec::new();
    f.take(limit + 1)
        .read_to_end(&mut buf)
        .map_err(|e| IoError::Path(format!("{} ({e})", path.display())))?;
    if buf.len() as u64 > limit {
        return Err(IoError::TooLarge { path: path.display().to_string(), limit });
    }
    Ok(buf)
}

pub(crate) fn json_err(path: &std::path::Path, e: serde_json::Error) -> IoError {
    IoError::Json { path: path.display().to_string(), msg: e.to_string() }
}

pub mod canonical_json;
pub mod hasher;
pub mod params;
pub mod snapshot;

pub use canonical_json::{to_canonical_bytes, write_canonical_file};
pub use hasher::{sha256_canonical, sha256_hex, snapshot_id};
pub use params::load_params;
pub use snapshot::{load_snapshot, save_snapshot, ContestSnapshot, SCHEMA_VERSION};
