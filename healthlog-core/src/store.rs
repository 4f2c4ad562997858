//! Category-partitioned, date-indexed log storage
//!
//! [`LogStore`] is the only component allowed to mutate entries. It is a
//! single generic engine: per-category behaviour (singleton vs append,
//! payload schema) comes from [`crate::types::CategoryDescriptor`], and
//! persistence from any [`LogRepository`].
//!
//! ```rust,ignore
//! use healthlog_core::{LogCategory, LogStore, MemoryRepository, NewLogEntry, DateKeyer};
//!
//! let store = LogStore::new(MemoryRepository::new(), DateKeyer::utc());
//! let entry = store.write(
//!     LogCategory::Sleep,
//!     NewLogEntry::on("2024-06-01").field("duration", 7),
//! )?;
//! assert_eq!(store.read_day(LogCategory::Sleep, entry.date)?.len(), 1);
//! ```

use crate::datekey::{Clock, DateKey, DateKeyer, SystemClock};
use crate::db::LogRepository;
use crate::error::{Error, Result};
use crate::types::{LogCategory, LogEntry, LogPatch, NewLogEntry, StoragePolicy};
use std::sync::Arc;
use uuid::Uuid;

/// Date-keyed log storage over a persistence collaborator.
pub struct LogStore<R: LogRepository> {
    repo: R,
    keyer: DateKeyer,
    clock: Arc<dyn Clock>,
}

impl<R: LogRepository> LogStore<R> {
    /// Create a store using the system clock.
    pub fn new(repo: R, keyer: DateKeyer) -> Self {
        Self {
            repo,
            keyer,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for audit timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn keyer(&self) -> &DateKeyer {
        &self.keyer
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Today in the store's offset.
    pub fn today(&self) -> DateKey {
        self.keyer.today(self.clock.as_ref())
    }

    /// Normalize a raw date argument exactly the way writes do.
    pub fn date_key(&self, raw: &str) -> Result<DateKey> {
        self.keyer.parse(raw)
    }

    // ============================================
    // Writes
    // ============================================

    /// Store a new entry.
    ///
    /// Water replaces whatever was stored for the day; every other
    /// category appends. Returns the entry as stored.
    pub fn write(&self, category: LogCategory, entry: NewLogEntry) -> Result<LogEntry> {
        let raw_date = entry
            .date
            .as_deref()
            .ok_or_else(|| Error::Validation("date is required".to_string()))?;
        let date = self.keyer.parse(raw_date)?;

        let descriptor = category.descriptor();
        descriptor.validate(&entry.fields)?;

        let id = match entry.id {
            Some(id) if id.trim().is_empty() => {
                return Err(Error::Validation("id must not be blank".to_string()))
            }
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };

        let now = self.clock.now();
        let stored = LogEntry {
            id,
            category,
            date,
            time: entry.time,
            created_at: now,
            updated_at: now,
            fields: entry.fields,
        };

        let policy = descriptor.policy;
        self.repo.modify_day(category, date, &mut |entries| {
            match policy {
                StoragePolicy::Singleton => {
                    entries.clear();
                    entries.push(stored.clone());
                }
                StoragePolicy::Append => {
                    if entries.iter().any(|e| e.id == stored.id) {
                        return Err(Error::Validation(format!(
                            "duplicate id {} for {} on {}",
                            stored.id, category, date
                        )));
                    }
                    entries.push(stored.clone());
                }
            }
            Ok(())
        })?;

        tracing::debug!(
            category = %category,
            date = %date,
            id = %stored.id,
            "Stored log entry"
        );

        Ok(stored)
    }

    /// Merge `patch` into the entry `(date, id)`.
    pub fn update(
        &self,
        category: LogCategory,
        id: &str,
        date: DateKey,
        patch: &LogPatch,
    ) -> Result<LogEntry> {
        let descriptor = category.descriptor();
        let now = self.clock.now();
        let not_found = || Error::NotFound {
            category,
            date,
            id: id.to_string(),
        };

        let mut updated = None;
        self.repo.modify_day(category, date, &mut |entries| {
            let entry = entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(not_found)?;

            let mut candidate = entry.clone();
            patch.apply_to(&mut candidate);
            descriptor.validate(&candidate.fields)?;
            candidate.updated_at = now;

            *entry = candidate.clone();
            updated = Some(candidate);
            Ok(())
        })?;

        let updated = updated.ok_or_else(not_found)?;
        tracing::debug!(category = %category, date = %date, id, "Updated log entry");
        Ok(updated)
    }

    /// Remove the entry `(date, id)`. Returns `false` if it did not exist.
    pub fn delete(&self, category: LogCategory, id: &str, date: DateKey) -> Result<bool> {
        if !self.repo.load_day(category, date)?.iter().any(|e| e.id == id) {
            return Ok(false);
        }

        let mut removed = false;
        self.repo.modify_day(category, date, &mut |entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            removed = entries.len() != before;
            Ok(())
        })?;

        if removed {
            tracing::debug!(category = %category, date = %date, id, "Deleted log entry");
        }
        Ok(removed)
    }

    // ============================================
    // Reads
    // ============================================

    /// All entries for one day, oldest write first. Never fails for a
    /// missing day.
    pub fn read_day(&self, category: LogCategory, date: DateKey) -> Result<Vec<LogEntry>> {
        let mut entries = self.repo.load_day(category, date)?;
        if category.policy() == StoragePolicy::Singleton && entries.len() > 1 {
            // Only the last write is current
            entries.drain(..entries.len() - 1);
        }
        Ok(entries)
    }

    /// Entries for every day in `[start, end]`, ascending by date. Empty
    /// when `start > end`.
    pub fn read_range(
        &self,
        category: LogCategory,
        start: DateKey,
        end: DateKey,
    ) -> Result<Vec<LogEntry>> {
        if start > end {
            return Ok(Vec::new());
        }

        let singleton = category.policy() == StoragePolicy::Singleton;
        let entries = self
            .repo
            .load_range(category, start, end)?
            .into_iter()
            .flat_map(|(_, mut day)| {
                if singleton && day.len() > 1 {
                    day.drain(..day.len() - 1);
                }
                day
            })
            .collect();
        Ok(entries)
    }

    /// Whether `category` has anything logged on `date`.
    pub fn has_entries(&self, category: LogCategory, date: DateKey) -> Result<bool> {
        Ok(!self.repo.load_day(category, date)?.is_empty())
    }

    /// Earliest day with any entry, across categories.
    pub fn earliest_date(&self) -> Result<Option<DateKey>> {
        self.repo.earliest_date()
    }
}
