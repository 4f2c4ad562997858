//! Insight generation for healthlog
//!
//! Turns recent log history into a short ranked list of observations:
//! - [`window`]: the read-only history snapshot analyzers consume
//! - [`engine`]: the analyzer contract and the [`InsightEngine`]
//! - [`plugins`]: the built-in analyzers
//!
//! Rollup numbers (streaks, completion, totals) live in
//! [`crate::stats`], not here.

pub mod engine;
pub mod plugins;
pub mod window;

pub use engine::{
    insight_id, Analyzer, AnalyzerKind, AnalyzerRun, AnalyzerStatus, GenerateOptions,
    InsightCandidate, InsightEngine, InsightReport, DEFAULT_MIN_ENTRIES, DEFAULT_WINDOW_DAYS,
};
pub use plugins::create_default_engine;
pub use window::HistoricalWindow;
