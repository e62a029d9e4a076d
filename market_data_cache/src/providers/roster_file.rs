//! Roster source backed by a local JSON listing file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snafu::ResultExt;
use tokio::fs;

use crate::{
    models::roster::{RosterEntry, RosterRecord, normalize_records},
    providers::{DecodeSnafu, IoSnafu, ProviderError, RosterProvider},
};

/// Reads the symbol universe from a JSON array of listing records.
///
/// The file may use any of the key spellings [`RosterRecord`] accepts, so an
/// exported KRX listing and a hand-written `[{"symbol": ..., "name": ...}]`
/// file both work unchanged.
pub struct RosterFileProvider {
    path: PathBuf,
}

impl RosterFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RosterProvider for RosterFileProvider {
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, ProviderError> {
        let bytes = fs::read(&self.path)
            .await
            .context(IoSnafu { path: &self.path })?;
        let records: Vec<RosterRecord> = serde_json::from_slice(&bytes).context(DecodeSnafu)?;

        let (entries, report) = normalize_records(records);
        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            dropped = report.dropped_missing_symbol,
            padded = report.zero_padded,
            deduped = report.deduped,
            "loaded roster file"
        );

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_and_normalizes_listing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listing.json");
        std::fs::write(
            &path,
            r#"[
                {"Code": "5930", "Name": "Samsung Electronics"},
                {"symbol": "000660", "name": "SK hynix"},
                {"Name": "No Symbol Corp"}
            ]"#,
        )
        .unwrap();

        let entries = RosterFileProvider::new(&path).fetch_roster().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].symbol, "005930");
        assert_eq!(entries[1].name, "SK hynix");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RosterFileProvider::new(dir.path().join("nope.json"))
            .fetch_roster()
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Io { .. }));
    }

    #[tokio::test]
    async fn unparseable_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listing.json");
        std::fs::write(&path, "not json").unwrap();

        let err = RosterFileProvider::new(&path).fetch_roster().await.unwrap_err();

        assert!(matches!(err, ProviderError::Decode { .. }));
    }
}
