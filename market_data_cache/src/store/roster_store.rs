//! TTL cache for the symbol roster, a single JSON file of entries.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use snafu::ResultExt;
use tokio::fs;

use crate::models::roster::{Roster, RosterEntry};
use crate::store::{
    CreateDirSnafu, StoreError, is_fresh, read_json, remove_if_present, write_json_atomic,
};

const ROSTER_FILE: &str = "stock_listing.json";

/// Filesystem cache for the symbol universe.
///
/// The whole roster lives in one file and expires as a unit; there is no
/// per-symbol freshness.
#[derive(Debug, Clone)]
pub struct RosterStore {
    path: PathBuf,
    ttl: Duration,
}

impl RosterStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .context(CreateDirSnafu { path: &dir })?;
        Ok(Self {
            path: dir.join(ROSTER_FILE),
            ttl,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the roster only if its cache file is fresh.
    pub async fn load_fresh(&self) -> Result<Option<Roster>, StoreError> {
        if !is_fresh(&self.path, self.ttl).await? {
            return Ok(None);
        }
        self.load_any().await
    }

    /// Load the roster regardless of age.
    pub async fn load_any(&self) -> Result<Option<Roster>, StoreError> {
        let Some(entries) = read_json::<Vec<RosterEntry>>(&self.path).await? else {
            return Ok(None);
        };
        Ok(Some(Roster::from_entries(entries)))
    }

    /// Write the roster, resetting the TTL clock.
    pub async fn put(&self, roster: &Roster) -> Result<(), StoreError> {
        write_json_atomic(&self.path, &roster.to_entries()).await
    }

    /// Drop the cached roster if it exists.
    pub async fn invalidate(&self) -> Result<(), StoreError> {
        remove_if_present(&self.path).await
    }
}
