//! Sleep / Mood Correlation Analyzer
//!
//! Pairs each day's total sleep with that day's mean mood rating and
//! reports the Pearson correlation when it is strong enough to notice.
//!
//! ## Thresholds
//!
//! | Condition | Result |
//! |-----------|--------|
//! | fewer than 5 paired days | silent |
//! | `|r| < 0.3` | silent |
//! | `r >= 0.3` | "sleep lifts mood" |
//! | `r <= -0.3` | inverse relationship |
//!
//! Priority is 4 when `|r| >= 0.5`, otherwise 3.

use crate::analytics::engine::{Analyzer, AnalyzerKind, InsightCandidate};
use crate::analytics::window::{mean, pearson, HistoricalWindow};
use crate::error::Result;
use crate::types::{InsightKind, LogCategory};

const MIN_PAIRED_DAYS: usize = 5;
const MIN_CORRELATION: f64 = 0.3;
const STRONG_CORRELATION: f64 = 0.5;

/// Analyzer relating sleep duration to mood.
pub struct SleepMoodAnalyzer;

impl SleepMoodAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SleepMoodAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SleepMoodAnalyzer {
    fn name(&self) -> &str {
        "core.sleep_mood"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Correlation
    }

    fn analyze(&self, window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
        let sleep = window.daily_sum(LogCategory::Sleep, "duration");
        let mood = window.daily_mean(LogCategory::Mood, "rating");

        let mut hours = Vec::new();
        let mut ratings = Vec::new();
        let mut last_paired = None;
        for (date, h) in &sleep {
            if let Some(m) = mood.get(date) {
                hours.push(*h);
                ratings.push(*m);
                last_paired = Some(*date);
            }
        }

        if hours.len() < MIN_PAIRED_DAYS {
            return Ok(None);
        }
        let Some(r) = pearson(&hours, &ratings) else {
            return Ok(None);
        };
        if r.abs() < MIN_CORRELATION {
            return Ok(None);
        }

        let priority = if r.abs() >= STRONG_CORRELATION { 4 } else { 3 };
        let avg_hours = mean(&hours).unwrap_or_default();

        let candidate = if r > 0.0 {
            InsightCandidate::new(
                InsightKind::Sleep,
                "More sleep, better mood",
                format!(
                    "Across {} days, your mood was higher on days you slept more \
                     (correlation {:.2}, average {:.1} h). Protecting your sleep looks worth it.",
                    hours.len(),
                    r,
                    avg_hours
                ),
            )
        } else {
            InsightCandidate::new(
                InsightKind::Sleep,
                "Longer sleep, lower mood",
                format!(
                    "Across {} days, your mood was lower on days you slept more \
                     (correlation {:.2}, average {:.1} h). Oversleeping can be a sign of fatigue or stress.",
                    hours.len(),
                    r,
                    avg_hours
                ),
            )
        };

        Ok(Some(
            candidate
                .with_priority(priority)
                .with_signal_date(last_paired),
        ))
    }
}
