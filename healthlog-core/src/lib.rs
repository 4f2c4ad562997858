//! # healthlog-core
//!
//! Core library for healthlog - a personal health log with derived insights.
//!
//! This library provides:
//! - Domain types for food, mood, exercise, sleep and water entries
//! - Date-keyed log storage over a pluggable repository (SQLite or memory)
//! - Streak, completion and total rollups
//! - A pluggable insight engine with built-in analyzers
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through two layers:
//! - **Entries:** user-authored logs, bucketed per `(category, day)`
//! - **Derived:** stats and insights, recomputed on demand and never stored
//!   as the source of truth
//!
//! ## Example
//!
//! ```rust,no_run
//! use healthlog_core::{
//!     create_default_engine, Config, Database, GenerateOptions, LogCategory, LogStore,
//!     NewLogEntry, StatsAggregator,
//! };
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&config.resolved_database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let store = LogStore::new(db, config.keyer().expect("bad offset"));
//! let today = store.today();
//! store
//!     .write(LogCategory::Sleep, NewLogEntry::on(today.to_string()).field("duration", 7))
//!     .expect("write failed");
//!
//! let streak = StatsAggregator::new(&store).current_streak(today).expect("read failed");
//! let insights = create_default_engine()
//!     .generate(&store, today, GenerateOptions::default())
//!     .expect("read failed");
//! println!("{streak} day streak, top insight: {}", insights[0].title);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{
    create_default_engine, Analyzer, AnalyzerKind, GenerateOptions, HistoricalWindow,
    InsightCandidate, InsightEngine, InsightReport,
};
pub use config::Config;
pub use datekey::{Clock, DateKey, DateKeyer, FixedClock, SystemClock};
pub use db::{Database, InsightRecord, LogRepository, MemoryRepository};
pub use error::{Error, Result};
pub use stats::{StatsAggregator, StreakSummary};
pub use store::LogStore;
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod datekey;
pub mod db;
pub mod error;
pub mod logging;
pub mod stats;
pub mod store;
pub mod types;
