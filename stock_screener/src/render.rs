//! Chart rendering seam.
//!
//! Drawing is presentation, not analysis. The orchestrator only ever
//! talks to a [`ChartRenderer`] and works the same with none wired.

use market_data_cache::Series;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Rendering failed: {}", message)]
pub struct RenderError {
    pub message: String,
}

/// Turns a price series into image bytes.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, series: &Series, label: &str) -> Result<Vec<u8>, RenderError>;
}

/// Both sides of a comparison, rendered over the shared date span.
#[derive(Debug)]
pub struct CompareCharts {
    pub base_png: Vec<u8>,
    pub compare_png: Vec<u8>,
}
