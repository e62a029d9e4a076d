//! Daily price history from the Yahoo Finance v8 chart API.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::YahooChartProvider;
