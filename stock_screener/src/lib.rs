//! Universe-wide chart pattern scanning and similarity ranking on top of
//! the cached market data layer.
//!
//! The orchestrator wires the retrying fetcher, the bounded work pool
//! and the pure analysis engines into the user-facing operations; the
//! binary in `src/bin` is a thin CLI over those.

pub mod config;
pub mod orchestrator;
pub mod output;
pub mod pool;
pub mod render;

pub use config::{RetryConfig, ScreenerConfig};
pub use orchestrator::{
    CompareRequest, Orchestrator, ScanRequest, ScreenerError, SimilarRequest,
};
pub use output::{CompareReport, PatternHit, SimilarReport, SimilarStock, UpdateSummary};
pub use pool::WorkPool;
pub use render::{ChartRenderer, CompareCharts, RenderError};
