//! Persistence layer for healthlog
//!
//! The store never talks to an engine directly. It goes through
//! [`LogRepository`], a key-value contract keyed by `(category, date)` where
//! each key holds the day's bucket of entries. Two implementations ship:
//! - [`Database`]: SQLite with schema migrations (the default)
//! - [`MemoryRepository`]: a mutex-guarded map, for tests and embedding

pub mod memory;
pub mod repo;
pub mod schema;

pub use memory::MemoryRepository;
pub use repo::{Database, InsightRecord};

use crate::datekey::DateKey;
use crate::error::Result;
use crate::types::{LogCategory, LogEntry};

/// Day bucket mutation passed to [`LogRepository::modify_day`].
pub type BucketEdit<'a> = dyn FnMut(&mut Vec<LogEntry>) -> Result<()> + 'a;

/// Storage contract consumed by [`crate::store::LogStore`].
///
/// Implementations must make `modify_day` atomic per key: concurrent
/// callers on the same `(category, date)` are serialized, and an edit that
/// returns an error leaves the stored bucket untouched.
pub trait LogRepository: Send + Sync {
    /// Current bucket for one day; empty when the key is absent.
    fn load_day(&self, category: LogCategory, date: DateKey) -> Result<Vec<LogEntry>>;

    /// Atomic read-modify-write of one day's bucket.
    ///
    /// Returns the bucket as stored after the edit. An empty bucket
    /// removes the key.
    fn modify_day(
        &self,
        category: LogCategory,
        date: DateKey,
        edit: &mut BucketEdit<'_>,
    ) -> Result<Vec<LogEntry>>;

    /// Non-empty buckets in `[start, end]`, ascending by date.
    ///
    /// The default walks the range one key at a time.
    fn load_range(
        &self,
        category: LogCategory,
        start: DateKey,
        end: DateKey,
    ) -> Result<Vec<(DateKey, Vec<LogEntry>)>> {
        let mut days = Vec::new();
        for date in start.iter_to(end) {
            let entries = self.load_day(category, date)?;
            if !entries.is_empty() {
                days.push((date, entries));
            }
        }
        Ok(days)
    }

    /// Earliest day holding any entry, across all categories.
    fn earliest_date(&self) -> Result<Option<DateKey>>;
}

impl<R: LogRepository + ?Sized> LogRepository for std::sync::Arc<R> {
    fn load_day(&self, category: LogCategory, date: DateKey) -> Result<Vec<LogEntry>> {
        (**self).load_day(category, date)
    }

    fn modify_day(
        &self,
        category: LogCategory,
        date: DateKey,
        edit: &mut BucketEdit<'_>,
    ) -> Result<Vec<LogEntry>> {
        (**self).modify_day(category, date, edit)
    }

    fn load_range(
        &self,
        category: LogCategory,
        start: DateKey,
        end: DateKey,
    ) -> Result<Vec<(DateKey, Vec<LogEntry>)>> {
        (**self).load_range(category, start, end)
    }

    fn earliest_date(&self) -> Result<Option<DateKey>> {
        (**self).earliest_date()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::Error;

    /// Repository whose backing storage is unreachable.
    pub(crate) struct UnavailableRepository;

    impl UnavailableRepository {
        fn down<T>() -> Result<T> {
            Err(Error::Storage("storage unavailable".to_string()))
        }
    }

    impl LogRepository for UnavailableRepository {
        fn load_day(&self, _category: LogCategory, _date: DateKey) -> Result<Vec<LogEntry>> {
            Self::down()
        }

        fn modify_day(
            &self,
            _category: LogCategory,
            _date: DateKey,
            _edit: &mut BucketEdit<'_>,
        ) -> Result<Vec<LogEntry>> {
            Self::down()
        }

        fn earliest_date(&self) -> Result<Option<DateKey>> {
            Self::down()
        }
    }
}
