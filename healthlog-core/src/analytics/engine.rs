//! Insight engine and analyzer framework
//!
//! Analyzers consume a [`HistoricalWindow`] and produce at most one
//! [`InsightCandidate`] each. The engine runs them, contains their
//! failures, and ranks what fired into the final [`Insight`] list.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       INSIGHT ENGINE                            │
//! │                                                                 │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────┐             │
//! │  │ sleep_mood  │  │ exercise_mood│  │ hydration   │  ...        │
//! │  └──────┬──────┘  └──────┬───────┘  └──────┬──────┘             │
//! │         │                │                 │                    │
//! │         ▼                ▼                 ▼                    │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              InsightEngine.generate_report()            │   │
//! │  │  - Loads the window [as_of - window_days, as_of]        │   │
//! │  │  - Gates on min_entries, then runs each analyzer        │   │
//! │  │  - Catches errors and panics per analyzer               │   │
//! │  │  - Falls back to core.general when nothing fired        │   │
//! │  │  - Dedups by id, ranks, truncates                       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use healthlog_core::analytics::{create_default_engine, GenerateOptions};
//!
//! let engine = create_default_engine();
//! let insights = engine.generate(&store, store.today(), GenerateOptions::default())?;
//! for insight in insights {
//!     println!("[{}] {}", insight.priority, insight.title);
//! }
//! ```

use super::window::HistoricalWindow;
use crate::config::AnalyticsConfig;
use crate::datekey::DateKey;
use crate::db::LogRepository;
use crate::error::Result;
use crate::store::LogStore;
use crate::types::{Insight, InsightKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Days of history before `as_of` that analyzers see.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;
/// Entries some category needs before non-fallback analyzers run.
pub const DEFAULT_MIN_ENTRIES: usize = 5;

const BUILTIN_FALLBACK_NAME: &str = "engine.builtin";

// ============================================
// Analyzer contract
// ============================================

/// What an analyzer looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    /// Relates two categories to each other
    Correlation,
    /// Looks at one category over time
    Pattern,
    /// Always answers; used when nothing else fires
    Fallback,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::Correlation => "correlation",
            AnalyzerKind::Pattern => "pattern",
            AnalyzerKind::Fallback => "fallback",
        }
    }
}

/// An insight before the engine stamps identity and provenance on it.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightCandidate {
    pub kind: InsightKind,
    pub title: String,
    pub content: String,
    pub priority: u8,
    pub signal_date: Option<DateKey>,
}

impl InsightCandidate {
    /// Create a priority-1 candidate.
    pub fn new(kind: InsightKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            content: content.into(),
            priority: 1,
            signal_date: None,
        }
    }

    /// Set the priority, clamped to 1..=5.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 5);
        self
    }

    pub fn with_signal_date(mut self, date: Option<DateKey>) -> Self {
        self.signal_date = date;
        self
    }

    /// Finalize into an [`Insight`] with a content-derived id.
    pub fn into_insight(self, analyzer: &str, created_at: DateTime<Utc>) -> Insight {
        Insight {
            id: insight_id(self.kind, &self.title, &self.content),
            kind: self.kind,
            title: self.title,
            content: self.content,
            priority: self.priority.clamp(1, 5),
            created_at,
            analyzer: analyzer.to_string(),
            signal_date: self.signal_date,
        }
    }
}

/// SHA-256 over kind, title and content; first 16 bytes, hex encoded.
pub fn insight_id(kind: InsightKind, title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Trait that all analyzers implement.
///
/// Analyzers are stateless functions of the window. They should be:
/// - **Deterministic**: the same window produces the same candidate
/// - **Quiet**: `Ok(None)` when the signal is too weak to report
///
/// ## Example
///
/// ```rust,ignore
/// use healthlog_core::analytics::{Analyzer, AnalyzerKind, HistoricalWindow, InsightCandidate};
///
/// pub struct WaterStreak;
///
/// impl Analyzer for WaterStreak {
///     fn name(&self) -> &str { "custom.water_streak" }
///     fn kind(&self) -> AnalyzerKind { AnalyzerKind::Pattern }
///     fn analyze(&self, window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
///         // Inspect window.entries(LogCategory::Water)...
///         Ok(None)
///     }
/// }
/// ```
pub trait Analyzer: Send + Sync {
    /// Unique name.
    ///
    /// Convention: `namespace.analyzer_name` (e.g., "core.sleep_mood")
    fn name(&self) -> &str;

    /// Only non-fallback analyzers are subject to the sufficiency gate.
    fn kind(&self) -> AnalyzerKind;

    fn analyze(&self, window: &HistoricalWindow) -> Result<Option<InsightCandidate>>;
}

// ============================================
// Run bookkeeping
// ============================================

/// Outcome of one analyzer during one engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerStatus {
    /// Produced a candidate
    Fired,
    /// Ran and found nothing worth saying
    Silent,
    /// Not run (disabled, or data below the sufficiency gate)
    Skipped,
    /// Returned an error or panicked
    Failed,
}

impl AnalyzerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerStatus::Fired => "fired",
            AnalyzerStatus::Silent => "silent",
            AnalyzerStatus::Skipped => "skipped",
            AnalyzerStatus::Failed => "failed",
        }
    }
}

/// Result of running (or skipping) one analyzer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerRun {
    pub analyzer: String,
    pub kind: AnalyzerKind,
    pub status: AnalyzerStatus,
    /// How long the analyzer took (milliseconds)
    pub duration_ms: i64,
    /// Error or skip reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzerRun {
    fn skipped(analyzer: &dyn Analyzer, reason: &str) -> Self {
        Self {
            analyzer: analyzer.name().to_string(),
            kind: analyzer.kind(),
            status: AnalyzerStatus::Skipped,
            duration_ms: 0,
            error: Some(reason.to_string()),
        }
    }
}

/// Insights plus the per-analyzer runs that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub as_of: DateKey,
    pub window_start: DateKey,
    /// Whether the window passed the sufficiency gate
    pub sufficient: bool,
    /// Whether the result came from the fallback path
    pub fallback_used: bool,
    pub insights: Vec<Insight>,
    pub runs: Vec<AnalyzerRun>,
}

/// Per-call knobs for [`InsightEngine::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub window_days: u32,
    /// `None` is unbounded. Values below 1 are treated as 1.
    pub max_results: Option<usize>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            max_results: None,
        }
    }
}

impl GenerateOptions {
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self {
            window_days: config.window_days,
            max_results: config.max_results,
        }
    }

    pub fn with_window_days(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }
}

// ============================================
// Insight engine
// ============================================

/// Engine that manages and runs analyzers.
pub struct InsightEngine {
    analyzers: Vec<Box<dyn Analyzer>>,
    fallback: Option<Box<dyn Analyzer>>,
    disabled: HashSet<String>,
    min_entries: usize,
    defaults: GenerateOptions,
}

impl InsightEngine {
    /// Create an empty engine. Without a fallback it answers with a
    /// generic built-in insight when nothing fires.
    pub fn new() -> Self {
        Self {
            analyzers: Vec::new(),
            fallback: None,
            disabled: HashSet::new(),
            min_entries: DEFAULT_MIN_ENTRIES,
            defaults: GenerateOptions::default(),
        }
    }

    /// Engine with the built-in analyzers, tuned by the `[analytics]`
    /// config section.
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        let mut engine = super::plugins::create_default_engine();
        engine.set_min_entries(config.min_entries);
        engine.defaults = GenerateOptions::from_config(config);
        for name in &config.disabled_analyzers {
            engine.disable(name);
        }
        engine
    }

    /// Register an analyzer. Ties in ranking resolve by registration
    /// order. A `Fallback` analyzer replaces the current fallback.
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        if analyzer.kind() == AnalyzerKind::Fallback {
            self.set_fallback(analyzer);
            return;
        }
        tracing::info!(analyzer = analyzer.name(), kind = analyzer.kind().as_str(), "Registered analyzer");
        self.analyzers.push(analyzer);
    }

    pub fn set_fallback(&mut self, analyzer: Box<dyn Analyzer>) {
        tracing::info!(analyzer = analyzer.name(), "Registered fallback analyzer");
        self.fallback = Some(analyzer);
    }

    /// Skip an analyzer by name on every subsequent call.
    pub fn disable(&mut self, name: &str) {
        if !self.has_analyzer(name) {
            tracing::warn!(analyzer = name, "Disabling unknown analyzer");
        }
        self.disabled.insert(name.to_string());
    }

    pub fn set_min_entries(&mut self, min_entries: usize) {
        self.min_entries = min_entries;
    }

    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    /// Options used by [`Self::generate_one`].
    pub fn default_options(&self) -> GenerateOptions {
        self.defaults
    }

    /// Registered analyzer names, fallback last.
    pub fn analyzer_names(&self) -> Vec<&str> {
        self.analyzers
            .iter()
            .chain(self.fallback.iter())
            .map(|a| a.name())
            .collect()
    }

    pub fn has_analyzer(&self, name: &str) -> bool {
        self.analyzer_names().contains(&name)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }

    /// Ranked insights for the window ending at `as_of`. Never empty.
    pub fn generate<R: LogRepository>(
        &self,
        store: &LogStore<R>,
        as_of: DateKey,
        options: GenerateOptions,
    ) -> Result<Vec<Insight>> {
        Ok(self.generate_report(store, as_of, options)?.insights)
    }

    /// The single most salient insight.
    pub fn generate_one<R: LogRepository>(
        &self,
        store: &LogStore<R>,
        as_of: DateKey,
    ) -> Result<Insight> {
        let options = self.defaults.with_max_results(Some(1));
        let insight = self.generate(store, as_of, options)?.into_iter().next();
        Ok(insight.unwrap_or_else(|| {
            builtin_fallback().into_insight(BUILTIN_FALLBACK_NAME, store.clock().now())
        }))
    }

    /// Load the window from the store and analyze it.
    ///
    /// Only store reads can fail; analyzer failures are recorded in the
    /// report's runs.
    pub fn generate_report<R: LogRepository>(
        &self,
        store: &LogStore<R>,
        as_of: DateKey,
        options: GenerateOptions,
    ) -> Result<InsightReport> {
        let start = as_of
            .add_days(-i64::from(options.window_days))
            .unwrap_or(as_of);
        let window = HistoricalWindow::load(store, start, as_of)?;
        Ok(self.analyze_window(&window, store.clock().now(), options.max_results))
    }

    /// Run every analyzer over an already-loaded window.
    pub fn analyze_window(
        &self,
        window: &HistoricalWindow,
        created_at: DateTime<Utc>,
        max_results: Option<usize>,
    ) -> InsightReport {
        let sufficient = window.is_sufficient(self.min_entries);
        let mut runs = Vec::with_capacity(self.analyzers.len() + 1);
        let mut fired: Vec<(usize, Insight)> = Vec::new();

        tracing::debug!(
            start = %window.start(),
            end = %window.end(),
            entries = window.total_entries(),
            sufficient,
            "Generating insights"
        );

        for (order, analyzer) in self.analyzers.iter().enumerate() {
            if self.disabled.contains(analyzer.name()) {
                runs.push(AnalyzerRun::skipped(analyzer.as_ref(), "disabled"));
                continue;
            }
            if !sufficient {
                runs.push(AnalyzerRun::skipped(analyzer.as_ref(), "insufficient data"));
                continue;
            }

            let (run, candidate) = Self::run_analyzer(analyzer.as_ref(), window);
            runs.push(run);
            if let Some(candidate) = candidate {
                fired.push((order, candidate.into_insight(analyzer.name(), created_at)));
            }
        }

        let fallback_used = fired.is_empty();
        if fallback_used {
            let insight = self
                .run_fallback(window, &mut runs)
                .map(|(name, candidate)| candidate.into_insight(&name, created_at))
                .unwrap_or_else(|| builtin_fallback().into_insight(BUILTIN_FALLBACK_NAME, created_at));
            fired.push((self.analyzers.len(), insight));
        }

        fired.sort_by(|(order_a, a), (order_b, b)| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| recency(a.signal_date, b.signal_date))
                .then_with(|| order_a.cmp(order_b))
        });

        let mut seen = HashSet::new();
        let mut insights: Vec<Insight> = fired
            .into_iter()
            .map(|(_, insight)| insight)
            .filter(|insight| seen.insert(insight.id.clone()))
            .collect();

        if let Some(max) = max_results {
            insights.truncate(max.max(1));
        }

        tracing::info!(
            insights = insights.len(),
            sufficient,
            fallback_used,
            "Insight generation complete"
        );

        InsightReport {
            as_of: window.end(),
            window_start: window.start(),
            sufficient,
            fallback_used,
            insights,
            runs,
        }
    }

    fn run_fallback(
        &self,
        window: &HistoricalWindow,
        runs: &mut Vec<AnalyzerRun>,
    ) -> Option<(String, InsightCandidate)> {
        let fallback = self.fallback.as_ref()?;
        if self.disabled.contains(fallback.name()) {
            runs.push(AnalyzerRun::skipped(fallback.as_ref(), "disabled"));
            return None;
        }
        let (run, candidate) = Self::run_analyzer(fallback.as_ref(), window);
        runs.push(run);
        candidate.map(|c| (fallback.name().to_string(), c))
    }

    /// Run one analyzer, turning errors and panics into a failed run.
    fn run_analyzer(
        analyzer: &dyn Analyzer,
        window: &HistoricalWindow,
    ) -> (AnalyzerRun, Option<InsightCandidate>) {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(window)));
        let duration_ms = start.elapsed().as_millis() as i64;

        let mut run = AnalyzerRun {
            analyzer: analyzer.name().to_string(),
            kind: analyzer.kind(),
            status: AnalyzerStatus::Silent,
            duration_ms,
            error: None,
        };

        match outcome {
            Ok(Ok(Some(candidate))) => {
                tracing::debug!(
                    analyzer = analyzer.name(),
                    priority = candidate.priority,
                    duration_ms,
                    "Analyzer fired"
                );
                run.status = AnalyzerStatus::Fired;
                (run, Some(candidate))
            }
            Ok(Ok(None)) => (run, None),
            Ok(Err(e)) => {
                tracing::warn!(analyzer = analyzer.name(), error = %e, "Analyzer failed");
                run.status = AnalyzerStatus::Failed;
                run.error = Some(e.to_string());
                (run, None)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(analyzer = analyzer.name(), panic = %message, "Analyzer panicked");
                run.status = AnalyzerStatus::Failed;
                run.error = Some(format!("panicked: {message}"));
                (run, None)
            }
        }
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Later signal first, missing last.
fn recency(a: Option<DateKey>, b: Option<DateKey>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn builtin_fallback() -> InsightCandidate {
    InsightCandidate::new(
        InsightKind::General,
        "Keep logging",
        "Log your meals, mood, sleep, exercise and water for a few days to unlock personal insights.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datekey::{DateKeyer, FixedClock};
    use crate::db::test_support::UnavailableRepository;
    use crate::db::MemoryRepository;
    use crate::error::Error;
    use crate::stats::StatsAggregator;
    use crate::types::{LogCategory, NewLogEntry};
    use chrono::TimeZone;
    use std::sync::Arc;

    struct StaticAnalyzer {
        name: String,
        kind: AnalyzerKind,
        candidate: Option<InsightCandidate>,
    }

    impl StaticAnalyzer {
        fn firing(name: &str, candidate: InsightCandidate) -> Self {
            Self {
                name: name.to_string(),
                kind: AnalyzerKind::Pattern,
                candidate: Some(candidate),
            }
        }

        fn silent(name: &str) -> Self {
            Self {
                name: name.to_string(),
                kind: AnalyzerKind::Pattern,
                candidate: None,
            }
        }
    }

    impl Analyzer for StaticAnalyzer {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> AnalyzerKind {
            self.kind
        }

        fn analyze(&self, _window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
            Ok(self.candidate.clone())
        }
    }

    struct FailingAnalyzer {
        kind: AnalyzerKind,
    }

    impl Analyzer for FailingAnalyzer {
        fn name(&self) -> &str {
            "test.failing"
        }

        fn kind(&self) -> AnalyzerKind {
            self.kind
        }

        fn analyze(&self, _window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
            Err(Error::Analyzer {
                analyzer: self.name().to_string(),
                message: "boom".to_string(),
            })
        }
    }

    struct PanickingAnalyzer;

    impl Analyzer for PanickingAnalyzer {
        fn name(&self) -> &str {
            "test.panicking"
        }

        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Correlation
        }

        fn analyze(&self, _window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
            panic!("analyzer bug");
        }
    }

    fn candidate(title: &str, priority: u8, signal: Option<&str>) -> InsightCandidate {
        InsightCandidate::new(InsightKind::Mood, title, format!("{title} content"))
            .with_priority(priority)
            .with_signal_date(signal.map(|s| s.parse().unwrap()))
    }

    fn store_with_moods(days: u32) -> LogStore<MemoryRepository> {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap());
        let store =
            LogStore::new(MemoryRepository::new(), DateKeyer::utc()).with_clock(Arc::new(clock));
        for n in 1..=days {
            store
                .write(
                    LogCategory::Mood,
                    NewLogEntry::on(format!("2024-06-{:02}", 20 + n)).field("rating", 3),
                )
                .unwrap();
        }
        store
    }

    fn as_of() -> DateKey {
        "2024-06-30".parse().unwrap()
    }

    fn statuses(report: &InsightReport) -> Vec<(&str, AnalyzerStatus)> {
        report
            .runs
            .iter()
            .map(|r| (r.analyzer.as_str(), r.status))
            .collect()
    }

    #[test]
    fn test_engine_registration() {
        let mut engine = InsightEngine::new();
        assert!(engine.analyzer_names().is_empty());

        engine.register(Box::new(StaticAnalyzer::silent("test.one")));
        engine.register(Box::new(StaticAnalyzer::silent("test.two")));
        engine.register(Box::new(StaticAnalyzer {
            name: "test.fallback".to_string(),
            kind: AnalyzerKind::Fallback,
            candidate: None,
        }));

        assert_eq!(
            engine.analyzer_names(),
            vec!["test.one", "test.two", "test.fallback"]
        );
        assert!(engine.has_analyzer("test.fallback"));
        assert!(!engine.has_analyzer("test.nonexistent"));
    }

    #[test]
    fn test_insight_id_is_content_derived() {
        let a = insight_id(InsightKind::Sleep, "Title", "Body");
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, insight_id(InsightKind::Sleep, "Title", "Body"));
        assert_ne!(a, insight_id(InsightKind::Mood, "Title", "Body"));
        assert_ne!(a, insight_id(InsightKind::Sleep, "Title", "Body."));
    }

    #[test]
    fn test_sparse_window_skips_to_fallback() {
        let store = store_with_moods(4);
        let mut engine = InsightEngine::new();
        engine.register(Box::new(StaticAnalyzer::firing("test.fires", candidate("a", 5, None))));

        let report = engine
            .generate_report(&store, as_of(), GenerateOptions::default())
            .unwrap();

        assert!(!report.sufficient);
        assert!(report.fallback_used);
        assert_eq!(report.insights.len(), 1);
        assert_eq!(report.insights[0].kind, InsightKind::General);
        assert_eq!(report.insights[0].analyzer, BUILTIN_FALLBACK_NAME);
        assert_eq!(statuses(&report), vec![("test.fires", AnalyzerStatus::Skipped)]);
    }

    #[test]
    fn test_generate_one_on_empty_store() {
        let store = store_with_moods(0);
        let engine = crate::analytics::create_default_engine();

        let insight = engine.generate_one(&store, as_of()).unwrap();
        assert_eq!(insight.kind, InsightKind::General);
        assert_eq!(insight.priority, 1);
        assert_eq!(insight.analyzer, "core.general");
    }

    #[test]
    fn test_generate_one_without_fallback_uses_builtin() {
        let engine = InsightEngine::new();
        let store = store_with_moods(0);

        let insight = engine.generate_one(&store, as_of()).unwrap();
        assert_eq!(insight.analyzer, BUILTIN_FALLBACK_NAME);
        assert_eq!(insight.kind, InsightKind::General);
        assert_eq!(insight.priority, 1);
    }

    #[test]
    fn test_storage_failure_aborts_generation() {
        let engine = crate::analytics::create_default_engine();
        let store = LogStore::new(UnavailableRepository, DateKeyer::utc());

        let err = engine
            .generate(&store, as_of(), GenerateOptions::default())
            .unwrap_err();
        assert!(err.is_storage(), "{err}");
        assert!(matches!(err, Error::Storage(_)));

        let err = engine.generate_one(&store, as_of()).unwrap_err();
        assert!(matches!(err, Error::Storage(_)), "{err}");

        let err = engine
            .generate_report(&store, as_of(), GenerateOptions::default())
            .unwrap_err();
        assert!(err.is_storage());

        let err = StatsAggregator::new(&store).current_streak(as_of()).unwrap_err();
        assert!(matches!(err, Error::Storage(_)), "{err}");
        assert!(!Error::Validation("x".into()).is_storage());
    }

    #[test]
    fn test_failures_and_panics_are_contained() {
        let store = store_with_moods(5);
        let mut engine = InsightEngine::new();
        engine.register(Box::new(FailingAnalyzer {
            kind: AnalyzerKind::Pattern,
        }));
        engine.register(Box::new(PanickingAnalyzer));
        engine.register(Box::new(StaticAnalyzer::firing("test.fires", candidate("ok", 3, None))));

        let report = engine
            .generate_report(&store, as_of(), GenerateOptions::default())
            .unwrap();

        assert!(report.sufficient);
        assert!(!report.fallback_used);
        assert_eq!(report.insights.len(), 1);
        assert_eq!(report.insights[0].title, "ok");
        assert_eq!(
            statuses(&report),
            vec![
                ("test.failing", AnalyzerStatus::Failed),
                ("test.panicking", AnalyzerStatus::Failed),
                ("test.fires", AnalyzerStatus::Fired),
            ]
        );
        assert!(report.runs[1]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("analyzer bug"));
    }

    #[test]
    fn test_all_failing_falls_back() {
        let store = store_with_moods(5);
        let mut engine = InsightEngine::new();
        engine.register(Box::new(PanickingAnalyzer));
        engine.set_fallback(Box::new(FailingAnalyzer {
            kind: AnalyzerKind::Fallback,
        }));

        let insights = engine
            .generate(&store, as_of(), GenerateOptions::default())
            .unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::General);
        assert_eq!(insights[0].analyzer, BUILTIN_FALLBACK_NAME);
    }

    #[test]
    fn test_ranking_priority_then_recency_then_order() {
        let store = store_with_moods(5);
        let mut engine = InsightEngine::new();
        engine.register(Box::new(StaticAnalyzer::firing("a", candidate("low", 2, Some("2024-06-30")))));
        engine.register(Box::new(StaticAnalyzer::firing("b", candidate("undated", 4, None))));
        engine.register(Box::new(StaticAnalyzer::firing("c", candidate("older", 4, Some("2024-06-10")))));
        engine.register(Box::new(StaticAnalyzer::firing("d", candidate("newer", 4, Some("2024-06-20")))));
        engine.register(Box::new(StaticAnalyzer::firing("e", candidate("undated2", 4, None))));

        let titles: Vec<String> = engine
            .generate(&store, as_of(), GenerateOptions::default())
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();

        assert_eq!(titles, vec!["newer", "older", "undated", "undated2", "low"]);
    }

    #[test]
    fn test_duplicates_are_collapsed_and_results_truncated() {
        let store = store_with_moods(5);
        let mut engine = InsightEngine::new();
        engine.register(Box::new(StaticAnalyzer::firing("a", candidate("same", 3, None))));
        engine.register(Box::new(StaticAnalyzer::firing("b", candidate("same", 3, None))));
        engine.register(Box::new(StaticAnalyzer::firing("c", candidate("other", 2, None))));

        let all = engine
            .generate(&store, as_of(), GenerateOptions::default())
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].analyzer, "a");

        let one = engine
            .generate(&store, as_of(), GenerateOptions::default().with_max_results(Some(1)))
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].title, "same");

        let zero = engine
            .generate(&store, as_of(), GenerateOptions::default().with_max_results(Some(0)))
            .unwrap();
        assert_eq!(zero.len(), 1);
    }

    #[test]
    fn test_generation_is_idempotent() {
        let store = store_with_moods(5);
        let mut engine = InsightEngine::new();
        engine.register(Box::new(StaticAnalyzer::firing("a", candidate("x", 3, Some("2024-06-25")))));
        engine.register(Box::new(StaticAnalyzer::firing("b", candidate("y", 2, None))));

        let first = engine
            .generate(&store, as_of(), GenerateOptions::default())
            .unwrap();
        let second = engine
            .generate(&store, as_of(), GenerateOptions::default())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_disabled_analyzers_are_skipped() {
        let store = store_with_moods(5);
        let mut engine = InsightEngine::new();
        engine.register(Box::new(StaticAnalyzer::firing("a", candidate("x", 3, None))));
        engine.disable("a");

        let report = engine
            .generate_report(&store, as_of(), GenerateOptions::default())
            .unwrap();
        assert!(report.fallback_used);
        assert_eq!(statuses(&report), vec![("a", AnalyzerStatus::Skipped)]);
        assert_eq!(report.runs[0].error.as_deref(), Some("disabled"));
    }

    #[test]
    fn test_window_excludes_data_before_start() {
        let store = store_with_moods(5);
        let engine = InsightEngine::new();

        // Moods are on 21..=25 June; a 2-day window ending on the 30th misses them
        let report = engine
            .generate_report(&store, as_of(), GenerateOptions::default().with_window_days(2))
            .unwrap();
        assert_eq!(report.window_start, "2024-06-28".parse().unwrap());
        assert!(!report.sufficient);
    }
}
