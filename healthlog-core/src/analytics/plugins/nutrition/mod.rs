//! Nutrition Pattern Analyzer
//!
//! Totals calories per food day and flags large day-to-day swings: a
//! coefficient of variation above 0.35 over at least 5 days.

use crate::analytics::engine::{Analyzer, AnalyzerKind, InsightCandidate};
use crate::analytics::window::{mean, std_dev, HistoricalWindow};
use crate::error::Result;
use crate::types::{InsightKind, LogCategory};

const MIN_FOOD_DAYS: usize = 5;
const MAX_VARIATION: f64 = 0.35;

/// Analyzer flagging irregular calorie intake.
pub struct NutritionAnalyzer;

impl NutritionAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NutritionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for NutritionAnalyzer {
    fn name(&self) -> &str {
        "core.nutrition"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Pattern
    }

    fn analyze(&self, window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
        let daily = window.daily_sum(LogCategory::Food, "calories");
        if daily.len() < MIN_FOOD_DAYS {
            return Ok(None);
        }

        let totals: Vec<f64> = daily.values().copied().collect();
        let (Some(avg), Some(sd)) = (mean(&totals), std_dev(&totals)) else {
            return Ok(None);
        };
        if avg <= 0.0 || sd / avg <= MAX_VARIATION {
            return Ok(None);
        }

        let low = totals.iter().copied().fold(f64::INFINITY, f64::min);
        let high = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Some(
            InsightCandidate::new(
                InsightKind::Nutrition,
                "Calorie intake swings",
                format!(
                    "Your daily calories ranged from {:.0} to {:.0} (average {:.0}). \
                     Steadier meals can help keep energy even.",
                    low, high, avg
                ),
            )
            .with_priority(2)
            .with_signal_date(daily.keys().next_back().copied()),
        ))
    }
}
