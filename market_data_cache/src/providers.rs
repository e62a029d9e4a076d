//! Provider abstraction for market data sources.
//!
//! This module defines the [`MarketDataProvider`] trait, which serves as a
//! unified interface for fetching daily price history from any market data
//! vendor, and the [`RosterProvider`] trait for fetching the symbol universe.
//!
//! Each concrete implementation (such as the Yahoo chart API or a local
//! roster file) handles vendor-specific request building, response decoding,
//! and error classification.
//!
//! The traits are designed for async usage and support dynamic dispatch
//! (`dyn MarketDataProvider`) for runtime selection of sources.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_cache::models::{series::Series, window::FetchWindow};
//! use market_data_cache::providers::{MarketDataProvider, ProviderError};
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl MarketDataProvider for MyProvider {
//!     async fn fetch_daily(
//!         &self,
//!         symbol: &str,
//!         _window: FetchWindow,
//!     ) -> Result<Series, ProviderError> {
//!         Ok(Series::empty(symbol))
//!     }
//! }
//! ```

pub mod roster_file;
pub mod yahoo_chart;

use std::path::PathBuf;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{roster::RosterEntry, series::Series, window::FetchWindow};

/// Trait for fetching daily price history from a market data source.
///
/// Implement this trait for each concrete vendor. A symbol the source does
/// not know (delisted, never listed) comes back as an empty [`Series`], not
/// an error; errors are reserved for failures of the fetch itself.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches daily bars for one symbol over the given window.
    ///
    /// # Arguments
    ///
    /// * `symbol` - The vendor-facing symbol to fetch.
    /// * `window` - The date span to cover; [`FetchWindow::FullHistory`]
    ///   asks for everything the source has.
    async fn fetch_daily(&self, symbol: &str, window: FetchWindow)
    -> Result<Series, ProviderError>;
}

/// Trait for fetching the symbol universe a scan walks.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Fetches and normalizes the roster.
    ///
    /// Returns the entries in source order, already deduplicated. An empty
    /// result is returned as-is; deciding whether that is fatal belongs to
    /// the caller.
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The configured base URL is not a valid URL.
    #[snafu(display("Invalid base URL: {source}"))]
    InvalidBaseUrl {
        source: url::ParseError,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a provider implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The API answered with a non-success HTTP status.
    #[snafu(display("API returned status {status}"))]
    Status {
        status: reqwest::StatusCode,
        backtrace: Backtrace,
    },

    /// The API returned a specific error message in its payload.
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The response body could not be decoded into the expected shape.
    #[snafu(display("Failed to decode API response: {source}"))]
    Decode {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// A local source file could not be read.
    #[snafu(display("Failed to read source file {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// Whether retrying the same request has a reasonable chance of success.
    ///
    /// Timeouts, connection failures, server-side errors, and rate limiting
    /// are transient; everything else (bad symbol, malformed payload, local
    /// I/O) fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Reqwest { source, .. } => source.is_timeout() || source.is_connect(),
            ProviderError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
