//! Read-only view of recent history handed to analyzers
//!
//! A window is built fresh for every engine call from
//! [`LogStore::read_range`] and never cached. Analyzers only ever see
//! this snapshot, never the store.

use crate::datekey::DateKey;
use crate::db::LogRepository;
use crate::error::Result;
use crate::store::LogStore;
use crate::types::{LogCategory, LogEntry};
use std::collections::{BTreeMap, BTreeSet};

/// Entries of every category within `[start, end]`, ascending by date.
#[derive(Debug, Clone)]
pub struct HistoricalWindow {
    start: DateKey,
    end: DateKey,
    entries: BTreeMap<LogCategory, Vec<LogEntry>>,
}

impl HistoricalWindow {
    /// Load a window from the store. Read failures propagate.
    pub fn load<R: LogRepository>(
        store: &LogStore<R>,
        start: DateKey,
        end: DateKey,
    ) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for category in LogCategory::ALL {
            entries.insert(category, store.read_range(category, start, end)?);
        }

        let window = Self {
            start,
            end,
            entries,
        };
        tracing::debug!(
            start = %start,
            end = %end,
            total_entries = window.total_entries(),
            "Loaded historical window"
        );
        Ok(window)
    }

    /// Build a window from loose entries. Entries outside the range are
    /// dropped; the rest keep their relative order within a day.
    pub fn from_entries(
        start: DateKey,
        end: DateKey,
        entries: impl IntoIterator<Item = LogEntry>,
    ) -> Self {
        let mut by_category: BTreeMap<LogCategory, Vec<LogEntry>> = BTreeMap::new();
        for entry in entries {
            if entry.date >= start && entry.date <= end {
                by_category.entry(entry.category).or_default().push(entry);
            }
        }
        for list in by_category.values_mut() {
            list.sort_by_key(|e| e.date);
        }

        Self {
            start,
            end,
            entries: by_category,
        }
    }

    pub fn start(&self) -> DateKey {
        self.start
    }

    pub fn end(&self) -> DateKey {
        self.end
    }

    pub fn entries(&self, category: LogCategory) -> &[LogEntry] {
        self.entries
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self, category: LogCategory) -> usize {
        self.entries(category).len()
    }

    pub fn total_entries(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries() == 0
    }

    /// Whether some category has at least `min_entries` entries.
    pub fn is_sufficient(&self, min_entries: usize) -> bool {
        LogCategory::ALL
            .iter()
            .any(|c| self.count(*c) >= min_entries)
    }

    /// Most recent day with an entry in `category`.
    pub fn latest_date(&self, category: LogCategory) -> Option<DateKey> {
        self.entries(category).last().map(|e| e.date)
    }

    /// Most recent day with an entry in any of `categories`.
    pub fn latest_date_of(&self, categories: &[LogCategory]) -> Option<DateKey> {
        categories.iter().filter_map(|c| self.latest_date(*c)).max()
    }

    /// Days with at least one entry in `category`.
    pub fn active_days(&self, category: LogCategory) -> BTreeSet<DateKey> {
        self.entries(category).iter().map(|e| e.date).collect()
    }

    /// Per-day sum of a numeric field. Days where no entry carries a
    /// numeric value for the field are absent.
    pub fn daily_sum(&self, category: LogCategory, field: &str) -> BTreeMap<DateKey, f64> {
        let mut sums = BTreeMap::new();
        for entry in self.entries(category) {
            if let Some(value) = entry.number(field) {
                *sums.entry(entry.date).or_insert(0.0) += value;
            }
        }
        sums
    }

    /// Per-day mean of a numeric field, same presence rule as
    /// [`Self::daily_sum`].
    pub fn daily_mean(&self, category: LogCategory, field: &str) -> BTreeMap<DateKey, f64> {
        let mut acc: BTreeMap<DateKey, (f64, usize)> = BTreeMap::new();
        for entry in self.entries(category) {
            if let Some(value) = entry.number(field) {
                let slot = acc.entry(entry.date).or_insert((0.0, 0));
                slot.0 += value;
                slot.1 += 1;
            }
        }
        acc.into_iter()
            .map(|(date, (sum, n))| (date, sum / n as f64))
            .collect()
    }
}

// ============================================
// Small numeric helpers shared by analyzers
// ============================================

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Pearson correlation coefficient. `None` for fewer than two pairs,
/// mismatched lengths or a constant series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }

    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}
