//! Pure price-series analysis: extrema detection, rule-based chart pattern
//! matching, and normalized cosine similarity between two series.
//!
//! Everything in this crate is a pure function of slices and numeric
//! parameters. Fetching, caching and concurrency live in other crates.

pub mod extrema;
pub mod patterns;
pub mod similarity;

pub use extrema::{ExtremaParams, find_peaks, find_troughs};
pub use patterns::{PatternKind, PatternParams, PatternParseError, detect, trailing_volatility};
pub use similarity::{SimilarityParams, score};
