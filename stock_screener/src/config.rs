//! Screener configuration.
//!
//! Everything that used to be ambient state (cache directory, TTL,
//! worker counts) lives in one struct handed to the component
//! constructors. Values come from a TOML file when one exists, with
//! environment fallbacks for the file location and data directory;
//! command line flags override both in the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chart_analysis::{PatternParams, SimilarityParams};
use market_data_cache::RetryPolicy;
use serde::Deserialize;
use shared_utils::env::env_var_or;
use thiserror::Error;

use crate::pool::DEFAULT_CONCURRENCY;

pub const CONFIG_PATH_VAR: &str = "STOCK_SCREENER_CONFIG";
pub const DATA_DIR_VAR: &str = "STOCK_SCREENER_DATA_DIR";

const DEFAULT_CONFIG_PATH: &str = "screener.toml";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_TTL_HOURS: u64 = 24;
const DEFAULT_PROBE_SYMBOL: &str = "005930";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {}", path.display(), source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {}", path.display(), source)]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScreenerConfig {
    /// Directory holding cached series and the roster file.
    pub data_dir: PathBuf,
    /// Cache freshness window in hours.
    pub ttl_hours: u64,
    /// Concurrent fetch workers.
    pub concurrency: usize,
    /// Optional cap on provider requests per second, shared across
    /// workers.
    pub requests_per_second: Option<u32>,
    /// Listing file to refresh the roster from. Without one the roster
    /// comes from whatever an earlier run cached.
    pub roster_file: Option<PathBuf>,
    /// Liquid symbol probed before a bulk refresh to confirm today's
    /// closes are published.
    pub probe_symbol: String,
    /// Backoff applied to transient provider failures.
    pub retry: RetryConfig,
    /// Pattern-rule thresholds for `scan`.
    pub patterns: PatternParams,
    /// Overlap requirements for `similar`.
    pub similarity: SimilarityParams,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(env_var_or(DATA_DIR_VAR, DEFAULT_DATA_DIR)),
            ttl_hours: DEFAULT_TTL_HOURS,
            concurrency: DEFAULT_CONCURRENCY,
            requests_per_second: None,
            roster_file: None,
            probe_symbol: DEFAULT_PROBE_SYMBOL.to_string(),
            retry: RetryConfig::default(),
            patterns: PatternParams::default(),
            similarity: SimilarityParams::default(),
        }
    }
}

/// Retry schedule in file-friendly units; [`RetryConfig::policy`] turns
/// it into the fetcher's [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    /// Attempts per fetch, the first call included.
    pub max_attempts: u32,
    /// Ceiling of the first retry's delay, in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier applied to the ceiling per further retry.
    pub factor: f64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            factor: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            factor: self.factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl ScreenerConfig {
    /// Loads configuration from `path`, or from `$STOCK_SCREENER_CONFIG`
    /// (default `screener.toml`) when no path is given.
    ///
    /// A missing file is not an error unless the caller named it
    /// explicitly; the defaults apply instead.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (
                PathBuf::from(env_var_or(CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH)),
                false,
            ),
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound && !explicit => {
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use serial_test::serial;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn defaults_apply_without_a_config_file() {
        let config = ScreenerConfig::load(None).unwrap();
        assert_eq!(config.ttl_hours, 24);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.probe_symbol, "005930");
        assert_eq!(config.requests_per_second, None);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "data_dir = \"/var/cache/screener\"\nttl_hours = 6\nconcurrency = 8\nrequests_per_second = 4"
        )
        .unwrap();
        let config = ScreenerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/cache/screener"));
        assert_eq!(config.ttl_hours, 6);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.requests_per_second, Some(4));
        assert_eq!(config.probe_symbol, "005930");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ttl_hours = 6\nworker_count = 9").unwrap();
        let err = ScreenerConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn analysis_sections_override_their_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ttl_hours = 6\n\n[retry]\nmax_attempts = 5\nbase_delay_ms = 250\n\n[patterns]\nshoulder_tolerance = 0.15\nneckline_break = true\n\n[similarity]\nmin_overlap_floor = 10"
        )
        .unwrap();
        let config = ScreenerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.policy().base_delay, Duration::from_millis(250));
        assert_eq!(config.retry.factor, 2.0);
        assert_eq!(config.patterns.shoulder_tolerance, 0.15);
        assert!(config.patterns.neckline_break);
        assert_eq!(config.patterns.min_len, 30);
        assert_eq!(config.similarity.min_overlap_floor, 10);
        assert_eq!(config.similarity.min_overlap_fraction, 0.5);
    }

    #[test]
    fn unknown_keys_inside_a_section_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[patterns]\nshoulder_tol = 0.2").unwrap();
        let err = ScreenerConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn an_explicitly_named_missing_file_is_an_error() {
        let err = ScreenerConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    #[serial]
    fn data_dir_env_fallback_applies() {
        // Safety: tests touching process environment run serially.
        unsafe {
            std::env::set_var(DATA_DIR_VAR, "/tmp/screener-env-test");
        }
        let config = ScreenerConfig::default();
        unsafe {
            std::env::remove_var(DATA_DIR_VAR);
        }
        assert_eq!(config.data_dir, PathBuf::from("/tmp/screener-env-test"));
    }

    #[test]
    fn ttl_is_expressed_in_hours() {
        let config = ScreenerConfig {
            ttl_hours: 2,
            ..ScreenerConfig::default()
        };
        assert_eq!(config.ttl(), Duration::from_secs(7200));
    }
}
