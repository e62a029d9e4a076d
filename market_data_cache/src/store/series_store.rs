//! TTL cache for daily price series, one JSON file per symbol and window.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use snafu::ResultExt;
use tokio::fs;

use crate::models::{series::Series, window::FetchWindow};
use crate::store::{
    CreateDirSnafu, StoreError, is_fresh, read_json, remove_if_present, write_json_atomic,
};

/// Filesystem cache for [`Series`] payloads.
///
/// File names come from [`FetchWindow::cache_file_name`], so a dated request
/// and a full-history request for the same symbol occupy separate entries
/// and expire independently.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    dir: PathBuf,
    ttl: Duration,
}

impl SeriesStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .context(CreateDirSnafu { path: &dir })?;
        Ok(Self { dir, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str, window: FetchWindow) -> PathBuf {
        self.dir.join(window.cache_file_name(symbol))
    }

    /// Load a series only if its cache entry is fresh.
    ///
    /// Returns `None` for missing, stale, or corrupt entries; corrupt files
    /// are deleted on the way out.
    pub async fn load_fresh(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Option<Series>, StoreError> {
        let path = self.path_for(symbol, window);
        if !is_fresh(&path, self.ttl).await? {
            return Ok(None);
        }
        self.load_at(&path, symbol).await
    }

    /// Load a series regardless of age.
    ///
    /// Offline runs and incremental refreshes start from whatever is on disk,
    /// stale or not.
    pub async fn load_any(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Option<Series>, StoreError> {
        let path = self.path_for(symbol, window);
        self.load_at(&path, symbol).await
    }

    async fn load_at(&self, path: &Path, symbol: &str) -> Result<Option<Series>, StoreError> {
        let Some(loaded) = read_json::<Series>(path).await? else {
            return Ok(None);
        };
        // Rebuild through the constructor so hand-edited or legacy files
        // still come out sorted, deduplicated, and keyed by the requested
        // symbol.
        Ok(Some(Series::from_bars(symbol, loaded.bars().to_vec())))
    }

    /// Write a series to its cache entry, resetting the TTL clock.
    pub async fn put(&self, series: &Series, window: FetchWindow) -> Result<(), StoreError> {
        let path = self.path_for(&series.symbol, window);
        write_json_atomic(&path, series).await
    }

    /// Drop a cache entry if it exists.
    pub async fn invalidate(&self, symbol: &str, window: FetchWindow) -> Result<(), StoreError> {
        let path = self.path_for(symbol, window);
        remove_if_present(&path).await
    }
}
