//! Exercise / Mood Correlation Analyzer
//!
//! Among days with a mood rating, compares the mean mood on days with any
//! exercise entry against days without one.
//!
//! Needs at least 5 rated days and 2 in each group. A difference of
//! +0.5 or more is reported as a lift (priority 4 from +1.0); -0.5 or
//! less is reported as a caution (priority 2).

use crate::analytics::engine::{Analyzer, AnalyzerKind, InsightCandidate};
use crate::analytics::window::{mean, HistoricalWindow};
use crate::error::Result;
use crate::types::{InsightKind, LogCategory};

const MIN_MOOD_DAYS: usize = 5;
const MIN_GROUP_DAYS: usize = 2;
const NOTABLE_DIFF: f64 = 0.5;
const STRONG_DIFF: f64 = 1.0;

/// Analyzer comparing mood on exercise days to rest days.
pub struct ExerciseMoodAnalyzer;

impl ExerciseMoodAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExerciseMoodAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for ExerciseMoodAnalyzer {
    fn name(&self) -> &str {
        "core.exercise_mood"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Correlation
    }

    fn analyze(&self, window: &HistoricalWindow) -> Result<Option<InsightCandidate>> {
        let mood = window.daily_mean(LogCategory::Mood, "rating");
        if mood.len() < MIN_MOOD_DAYS {
            return Ok(None);
        }

        let exercise_days = window.active_days(LogCategory::Exercise);
        let (active, rest): (Vec<_>, Vec<_>) = mood
            .iter()
            .partition(|(date, _)| exercise_days.contains(*date));

        if active.len() < MIN_GROUP_DAYS || rest.len() < MIN_GROUP_DAYS {
            return Ok(None);
        }

        let active: Vec<f64> = active.into_iter().map(|(_, m)| *m).collect();
        let rest: Vec<f64> = rest.into_iter().map(|(_, m)| *m).collect();
        let (Some(active_mean), Some(rest_mean)) = (mean(&active), mean(&rest)) else {
            return Ok(None);
        };
        let diff = active_mean - rest_mean;
        let signal = mood.keys().next_back().copied();

        let candidate = if diff >= NOTABLE_DIFF {
            let priority = if diff >= STRONG_DIFF { 4 } else { 3 };
            InsightCandidate::new(
                InsightKind::Exercise,
                "Exercise lifts your mood",
                format!(
                    "Your mood averaged {:.1} on days you exercised versus {:.1} on rest days \
                     ({} active days, {} rest days).",
                    active_mean,
                    rest_mean,
                    active.len(),
                    rest.len()
                ),
            )
            .with_priority(priority)
        } else if diff <= -NOTABLE_DIFF {
            InsightCandidate::new(
                InsightKind::Exercise,
                "Workouts may be wearing you down",
                format!(
                    "Your mood averaged {:.1} on days you exercised versus {:.1} on rest days. \
                     Consider lighter sessions or more recovery time.",
                    active_mean, rest_mean
                ),
            )
            .with_priority(2)
        } else {
            return Ok(None);
        };

        Ok(Some(candidate.with_signal_date(signal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::window::test_support::{day, entry, june};
    use serde_json::json;

    /// (mood rating, exercised?) per consecutive day
    fn window(days: &[(i64, bool)]) -> HistoricalWindow {
        let mut entries = Vec::new();
        for (i, (rating, exercised)) in days.iter().enumerate() {
            let d = day(i as u32 + 1);
            entries.push(entry(LogCategory::Mood, &d, &[("rating", json!(rating))]));
            if *exercised {
                entries.push(entry(LogCategory::Exercise, &d, &[("duration", json!(30))]));
            }
        }
        june(entries)
    }

    #[test]
    fn test_strong_lift() {
        let w = window(&[(5, true), (4, true), (5, true), (3, false), (2, false), (3, false)]);
        let insight = ExerciseMoodAnalyzer::new().analyze(&w).unwrap().unwrap();
        assert_eq!(insight.kind, InsightKind::Exercise);
        assert_eq!(insight.priority, 4);
        assert_eq!(insight.signal_date, Some(day(6).parse().unwrap()));
    }

    #[test]
    fn test_moderate_lift() {
        let w = window(&[(4, true), (4, true), (3, false), (4, false), (3, false)]);
        let insight = ExerciseMoodAnalyzer::new().analyze(&w).unwrap().unwrap();
        assert_eq!(insight.priority, 3);
    }

    #[test]
    fn test_caution() {
        let w = window(&[(2, true), (2, true), (4, false), (4, false), (4, false)]);
        let insight = ExerciseMoodAnalyzer::new().analyze(&w).unwrap().unwrap();
        assert_eq!(insight.priority, 2);
        assert_eq!(insight.title, "Workouts may be wearing you down");
    }

    #[test]
    fn test_small_difference_is_silent() {
        let w = window(&[(4, true), (3, true), (3, false), (4, false), (3, false)]);
        assert!(ExerciseMoodAnalyzer::new().analyze(&w).unwrap().is_none());
    }

    #[test]
    fn test_needs_both_groups() {
        let w = window(&[(5, true), (1, false), (1, false), (1, false), (1, false)]);
        assert!(ExerciseMoodAnalyzer::new().analyze(&w).unwrap().is_none());

        let w = window(&[(5, true), (5, true), (1, false), (1, false)]);
        assert!(ExerciseMoodAnalyzer::new().analyze(&w).unwrap().is_none());
    }
}
