//! General Fallback Analyzer
//!
//! Always answers with a priority-1 insight so callers never get an
//! empty result. The wording depends on whether anything was logged in
//! the window.

use crate::analytics::engine::{Analyzer, AnalyzerKind, InsightCandidate};
use crate::analytics::window::HistoricalWindow;
use crate::error::Result;
use crate::types::{InsightKind, LogCategory};

/// Fallback analyzer producing an encouraging summary.
pub struct GeneralAnalyzer;

impl GeneralAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GeneralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for GeneralAnalyzer {
    fn name(&self) -> &str {
        "core.general"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Fallback
    }

    fn analyze(&self, window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
        if window.is_empty() {
            return Ok(Some(InsightCandidate::new(
                InsightKind::General,
                "Start your health log",
                "Log a meal, your mood, sleep, a workout or your water today. \
                 Insights appear after a few days of entries.",
            )));
        }

        let tracked: Vec<&str> = LogCategory::ALL
            .iter()
            .filter(|c| window.count(**c) > 0)
            .map(|c| c.as_str())
            .collect();
        let days: usize = LogCategory::ALL
            .iter()
            .flat_map(|c| window.active_days(*c))
            .collect::<std::collections::BTreeSet<_>>()
            .len();

        Ok(Some(
            InsightCandidate::new(
                InsightKind::General,
                "Keep building your log",
                format!(
                    "You have {} entries across {} days ({}). \
                     A few more days of consistent logging will reveal patterns.",
                    window.total_entries(),
                    days,
                    tracked.join(", ")
                ),
            )
            .with_signal_date(window.latest_date_of(&LogCategory::ALL)),
        ))
    }
}
