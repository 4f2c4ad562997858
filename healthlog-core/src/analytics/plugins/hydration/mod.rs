//! Hydration Pattern Analyzer
//!
//! Compares daily water glasses to the day's goal (8 when the entry has
//! none) over at least 5 logged water days.
//!
//! - Mean intake below 75% of goal: "drink more" (priority 4 below 50%)
//! - Goal met on at least 80% of days: praise (priority 2)

use crate::analytics::engine::{Analyzer, AnalyzerKind, InsightCandidate};
use crate::analytics::window::{mean, HistoricalWindow};
use crate::error::Result;
use crate::types::{InsightKind, LogCategory};

const MIN_WATER_DAYS: usize = 5;
const DEFAULT_GOAL: f64 = 8.0;
const LOW_RATIO: f64 = 0.75;
const VERY_LOW_RATIO: f64 = 0.5;
const CONSISTENT_SHARE: f64 = 0.8;

/// Analyzer tracking water intake against the daily goal.
pub struct HydrationAnalyzer;

impl HydrationAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HydrationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for HydrationAnalyzer {
    fn name(&self) -> &str {
        "core.hydration"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Pattern
    }

    fn analyze(&self, window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
        let days = window.entries(LogCategory::Water);
        if days.len() < MIN_WATER_DAYS {
            return Ok(None);
        }

        let mut glasses = Vec::with_capacity(days.len());
        let mut ratios = Vec::with_capacity(days.len());
        let mut met = 0usize;
        for entry in days {
            let g = entry.number("glasses").unwrap_or(0.0);
            let goal = entry
                .number("goal")
                .filter(|goal| *goal > 0.0)
                .unwrap_or(DEFAULT_GOAL);
            if g >= goal {
                met += 1;
            }
            glasses.push(g);
            ratios.push(g / goal);
        }

        let avg_glasses = mean(&glasses).unwrap_or_default();
        let avg_ratio = mean(&ratios).unwrap_or_default();
        let met_share = met as f64 / days.len() as f64;
        let signal = window.latest_date(LogCategory::Water);

        let candidate = if avg_ratio < LOW_RATIO {
            let priority = if avg_ratio < VERY_LOW_RATIO { 4 } else { 3 };
            InsightCandidate::new(
                InsightKind::Hydration,
                "Drink more water",
                format!(
                    "You averaged {:.1} glasses a day, {:.0}% of your goal. \
                     Keep a bottle nearby and sip through the day.",
                    avg_glasses,
                    avg_ratio * 100.0
                ),
            )
            .with_priority(priority)
        } else if met_share >= CONSISTENT_SHARE {
            InsightCandidate::new(
                InsightKind::Hydration,
                "Great hydration habit",
                format!(
                    "You met your water goal on {} of {} days. Keep it up.",
                    met,
                    days.len()
                ),
            )
            .with_priority(2)
        } else {
            return Ok(None);
        };

        Ok(Some(candidate.with_signal_date(signal)))
    }
}
