//! Filesystem-backed JSON caches with mtime-based TTL freshness.
//!
//! Both stores share the same persistence rules:
//! - Writes are atomic: payloads land in a `.tmp` sibling first, then rename
//!   over the final path, so a crash mid-write never leaves a torn file.
//! - A cache file is fresh while its age (now minus mtime) is strictly less
//!   than the TTL. A zero TTL therefore never serves from cache.
//! - A file that exists but fails to parse is treated as a miss: it is
//!   deleted and the caller refetches.

pub mod roster_store;
pub mod series_store;

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use serde::{Serialize, de::DeserializeOwned};
use snafu::{Backtrace, ResultExt, Snafu};
use tokio::fs;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// The cache directory could not be created.
    #[snafu(display("Failed to create cache directory {}: {source}", path.display()))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// A cache file could not be read for a reason other than not existing.
    #[snafu(display("Failed to read cache file {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// A cache file (or its temporary sibling) could not be written or renamed.
    #[snafu(display("Failed to write cache file {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The payload could not be serialized to JSON.
    #[snafu(display("Failed to serialize cache payload for {}: {source}", path.display()))]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// A cache file could not be removed.
    #[snafu(display("Failed to remove cache file {}: {source}", path.display()))]
    Remove {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

/// Serialize `payload` as pretty JSON and move it into place atomically.
pub(crate) async fn write_json_atomic<T: Serialize>(
    path: &Path,
    payload: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(payload).context(SerializeSnafu { path })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    fs::write(&tmp_path, bytes)
        .await
        .context(WriteSnafu { path: &tmp_path })?;
    fs::rename(&tmp_path, path)
        .await
        .context(WriteSnafu { path })?;

    Ok(())
}

/// Read and parse a JSON cache file.
///
/// Returns `None` when the file does not exist, and also when it exists but
/// cannot be parsed; in the latter case the corrupt file is deleted so the
/// next write starts clean. Only genuine I/O failures surface as errors.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context(ReadSnafu { path }),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "cache file is corrupt, discarding and treating as a miss"
            );
            if let Err(remove_err) = fs::remove_file(path).await {
                if remove_err.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        path = %path.display(),
                        error = %remove_err,
                        "could not remove corrupt cache file"
                    );
                }
            }
            Ok(None)
        }
    }
}

/// Whether the file at `path` exists and is younger than `ttl`.
///
/// A file whose mtime lies in the future (clock adjustments) counts as age
/// zero, so it reads as fresh for any non-zero TTL.
pub(crate) async fn is_fresh(path: &Path, ttl: Duration) -> Result<bool, StoreError> {
    let meta = match fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).context(ReadSnafu { path }),
    };

    let Ok(modified) = meta.modified() else {
        return Ok(false);
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);

    Ok(age < ttl)
}

/// Remove a cache file, treating "already gone" as success.
pub(crate) async fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context(RemoveSnafu { path }),
    }
}
