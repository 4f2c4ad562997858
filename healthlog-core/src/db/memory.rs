//! In-memory repository

use super::{BucketEdit, LogRepository};
use crate::datekey::DateKey;
use crate::error::{Error, Result};
use crate::types::{LogCategory, LogEntry};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

type Buckets = BTreeMap<(LogCategory, DateKey), Vec<LogEntry>>;

/// Map-backed [`LogRepository`]. The whole map is locked for each
/// read-modify-write, which serializes same-key writers.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    buckets: Mutex<Buckets>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Buckets>> {
        self.buckets
            .lock()
            .map_err(|_| Error::Storage("memory repository lock poisoned".to_string()))
    }
}

impl LogRepository for MemoryRepository {
    fn load_day(&self, category: LogCategory, date: DateKey) -> Result<Vec<LogEntry>> {
        Ok(self
            .lock()?
            .get(&(category, date))
            .cloned()
            .unwrap_or_default())
    }

    fn modify_day(
        &self,
        category: LogCategory,
        date: DateKey,
        edit: &mut BucketEdit<'_>,
    ) -> Result<Vec<LogEntry>> {
        let mut buckets = self.lock()?;
        // Edit a copy so a failed edit leaves the bucket as it was
        let mut entries = buckets.get(&(category, date)).cloned().unwrap_or_default();
        edit(&mut entries)?;

        if entries.is_empty() {
            buckets.remove(&(category, date));
        } else {
            buckets.insert((category, date), entries.clone());
        }
        Ok(entries)
    }

    fn load_range(
        &self,
        category: LogCategory,
        start: DateKey,
        end: DateKey,
    ) -> Result<Vec<(DateKey, Vec<LogEntry>)>> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .lock()?
            .range((category, start)..=(category, end))
            .map(|((_, date), entries)| (*date, entries.clone()))
            .collect())
    }

    fn earliest_date(&self) -> Result<Option<DateKey>> {
        Ok(self.lock()?.keys().map(|(_, date)| *date).min())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, date: DateKey) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            category: LogCategory::Food,
            date,
            time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            fields: Default::default(),
        }
    }

    #[test]
    fn test_failed_edit_leaves_bucket_untouched() {
        let repo = MemoryRepository::new();
        let date: DateKey = "2024-04-01".parse().unwrap();

        repo.modify_day(LogCategory::Food, date, &mut |entries| {
            entries.push(entry("a", date));
            Ok(())
        })
        .unwrap();

        let result = repo.modify_day(LogCategory::Food, date, &mut |entries| {
            entries.clear();
            Err(Error::Validation("nope".into()))
        });
        assert!(result.is_err());
        assert_eq!(repo.load_day(LogCategory::Food, date).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_bucket_removes_key() {
        let repo = MemoryRepository::new();
        let date: DateKey = "2024-04-01".parse().unwrap();

        repo.modify_day(LogCategory::Food, date, &mut |entries| {
            entries.push(entry("a", date));
            Ok(())
        })
        .unwrap();
        assert_eq!(repo.earliest_date().unwrap(), Some(date));

        repo.modify_day(LogCategory::Food, date, &mut |entries| {
            entries.clear();
            Ok(())
        })
        .unwrap();
        assert_eq!(repo.earliest_date().unwrap(), None);
    }

    #[test]
    fn test_range_is_scoped_to_category() {
        let repo = MemoryRepository::new();
        let d1: DateKey = "2024-04-01".parse().unwrap();
        let d2: DateKey = "2024-04-03".parse().unwrap();

        for (category, date) in [
            (LogCategory::Food, d1),
            (LogCategory::Food, d2),
            (LogCategory::Sleep, d1),
        ] {
            repo.modify_day(category, date, &mut |entries| {
                entries.push(entry("x", date));
                Ok(())
            })
            .unwrap();
        }

        let days = repo.load_range(LogCategory::Food, d1, d2).unwrap();
        assert_eq!(
            days.iter().map(|(d, _)| *d).collect::<Vec<_>>(),
            vec![d1, d2]
        );
        assert!(repo.load_range(LogCategory::Food, d2, d1).unwrap().is_empty());
    }
}
