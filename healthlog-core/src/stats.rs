//! Rollup statistics over the log store
//!
//! Everything here is read-only: streaks, completion percentages and
//! field totals are recomputed from the store on each call.
//!
//! A day is *active* when any category has at least one entry on it.

use crate::datekey::DateKey;
use crate::db::LogRepository;
use crate::error::{Error, Result};
use crate::store::LogStore;
use crate::types::LogCategory;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Streak summary over a date range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    /// Longest run of consecutive active days in the range
    pub longest_days: u32,
    pub longest_start: Option<DateKey>,
    pub longest_end: Option<DateKey>,
    /// Days in the range with any entry
    pub active_days: u32,
    /// Days in the range
    pub total_days: u32,
}

/// Derives rollup numbers from a [`LogStore`].
pub struct StatsAggregator<'a, R: LogRepository> {
    store: &'a LogStore<R>,
}

impl<'a, R: LogRepository> StatsAggregator<'a, R> {
    pub fn new(store: &'a LogStore<R>) -> Self {
        Self { store }
    }

    fn is_active(&self, date: DateKey) -> Result<bool> {
        for category in LogCategory::ALL {
            if self.store.has_entries(category, date)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Consecutive active days ending at `as_of`; 0 if `as_of` is empty.
    ///
    /// The walk never goes past the earliest stored day, so it terminates
    /// even for very long streaks.
    pub fn current_streak(&self, as_of: DateKey) -> Result<u32> {
        let Some(earliest) = self.store.earliest_date()? else {
            return Ok(0);
        };

        let mut streak = 0u32;
        let mut day = as_of;
        while day >= earliest && self.is_active(day)? {
            streak += 1;
            match day.pred() {
                Some(prev) => day = prev,
                None => break,
            }
        }

        tracing::debug!(as_of = %as_of, streak, "Computed current streak");
        Ok(streak)
    }

    /// Percentage (0–100, rounded) of `tracked` categories with an entry
    /// on `date`. An empty slice means all five categories.
    pub fn completion_rate(&self, date: DateKey, tracked: &[LogCategory]) -> Result<u8> {
        let tracked: BTreeSet<LogCategory> = if tracked.is_empty() {
            LogCategory::ALL.into_iter().collect()
        } else {
            tracked.iter().copied().collect()
        };

        let mut done = 0usize;
        for category in &tracked {
            if self.store.has_entries(*category, date)? {
                done += 1;
            }
        }

        let rate = (done as f64 / tracked.len() as f64 * 100.0).round();
        Ok(rate as u8)
    }

    /// Sum of a numeric payload field over `[start, end]`.
    ///
    /// Missing or null fields count as 0; anything else non-numeric is a
    /// validation error.
    pub fn totals(
        &self,
        category: LogCategory,
        start: DateKey,
        end: DateKey,
        field: &str,
    ) -> Result<f64> {
        let mut total = 0.0;
        for entry in self.store.read_range(category, start, end)? {
            match entry.fields.get(field) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    total += value.as_f64().ok_or_else(|| {
                        Error::Validation(format!(
                            "{}.{} is not numeric in entry {} on {}: {}",
                            category, field, entry.id, entry.date, value
                        ))
                    })?;
                }
            }
        }
        Ok(total)
    }

    /// Entry count per category on `date`.
    pub fn daily_counts(&self, date: DateKey) -> Result<Vec<(LogCategory, usize)>> {
        LogCategory::ALL
            .into_iter()
            .map(|category| Ok((category, self.store.read_day(category, date)?.len())))
            .collect()
    }

    /// Longest streak and activity counts within `[start, end]`.
    pub fn longest_streak(&self, start: DateKey, end: DateKey) -> Result<StreakSummary> {
        if start > end {
            return Ok(StreakSummary::default());
        }

        let mut active = BTreeSet::new();
        for category in LogCategory::ALL {
            for entry in self.store.read_range(category, start, end)? {
                active.insert(entry.date);
            }
        }

        let mut summary = StreakSummary {
            active_days: active.len() as u32,
            total_days: (start.days_between(end) + 1) as u32,
            ..Default::default()
        };

        let mut run_start: Option<DateKey> = None;
        let mut prev: Option<DateKey> = None;
        let mut run = 0u32;

        for &date in &active {
            match prev {
                Some(p) if p.succ() == Some(date) => run += 1,
                _ => {
                    run = 1;
                    run_start = Some(date);
                }
            }
            if run > summary.longest_days {
                summary.longest_days = run;
                summary.longest_start = run_start;
                summary.longest_end = Some(date);
            }
            prev = Some(date);
        }

        Ok(summary)
    }
}
