//! Calendar-day keys and the clock
//!
//! Every log entry is bucketed by a [`DateKey`]: the calendar day of the
//! entry in the user's configured UTC offset. [`DateKeyer`] is the one
//! function that turns timestamps and raw strings into keys. Writes and
//! reads must both go through it, otherwise point lookups silently miss
//! when the same instant lands on different days.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical text form of a date key.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

// ============================================
// DateKey
// ============================================

/// A time-zone-normalized calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// The following day.
    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().map(DateKey)
    }

    /// The preceding day.
    pub fn pred(self) -> Option<Self> {
        self.0.pred_opt().map(DateKey)
    }

    /// Shift by `days` (negative goes back).
    pub fn add_days(self, days: i64) -> Option<Self> {
        self.0.checked_add_signed(Duration::days(days)).map(DateKey)
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_between(self, other: DateKey) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Every day from `self` to `end`, inclusive. Empty when `self > end`.
    pub fn iter_to(self, end: DateKey) -> impl Iterator<Item = DateKey> {
        let first = (self <= end).then_some(self);
        std::iter::successors(first, move |day| day.succ().filter(|next| *next <= end))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

/// Parses only the canonical `YYYY-MM-DD` form. Anything carrying a time
/// component must go through [`DateKeyer::parse`].
impl FromStr for DateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NaiveDate::parse_from_str(s.trim(), DATE_KEY_FORMAT)
            .map(DateKey)
            .map_err(|_| Error::Validation(format!("invalid date key: {s:?}")))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        DateKey(date)
    }
}

// ============================================
// Clock
// ============================================

/// Source of "now". Injected so that nothing reads ambient time directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant (tests, replays).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ============================================
// DateKeyer
// ============================================

/// Converts timestamps and raw date strings into [`DateKey`]s for one
/// fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateKeyer {
    offset: FixedOffset,
}

impl DateKeyer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Build from an offset string such as `+02:00`, `-0530`, `Z` or `UTC`.
    pub fn from_offset_str(raw: &str) -> Result<Self> {
        parse_offset(raw).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar day of `ts` in this offset.
    pub fn key_for(&self, ts: DateTime<Utc>) -> DateKey {
        DateKey(ts.with_timezone(&self.offset).date_naive())
    }

    /// Today according to `clock`.
    pub fn today(&self, clock: &dyn Clock) -> DateKey {
        self.key_for(clock.now())
    }

    /// Local midnight of `key`, as a UTC instant.
    pub fn start_of_day(&self, key: DateKey) -> DateTime<Utc> {
        let local_midnight = key.0.and_time(NaiveTime::MIN);
        let utc = local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, Utc)
    }

    /// Normalize a raw date argument.
    ///
    /// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp; timestamps are
    /// converted into this offset before the day is taken.
    pub fn parse(&self, raw: &str) -> Result<DateKey> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Validation("date is required".to_string()));
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_KEY_FORMAT) {
            return Ok(DateKey(date));
        }

        DateTime::parse_from_rfc3339(raw)
            .map(|ts| self.key_for(ts.with_timezone(&Utc)))
            .map_err(|_| Error::Validation(format!("unparseable date: {raw:?}")))
    }
}

impl Default for DateKeyer {
    fn default() -> Self {
        Self::utc()
    }
}

fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    let invalid = || Error::Config(format!("invalid UTC offset: {raw:?}"));

    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_round_trip_ignores_time_of_day() {
        let keyer = DateKeyer::from_offset_str("+02:00").unwrap();
        let day = keyer.key_for(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());

        for hour in 0..24 {
            let ts = keyer.start_of_day(day) + Duration::hours(hour) + Duration::minutes(59);
            let key = keyer.key_for(ts);
            assert_eq!(key, day, "hour {hour}");
            assert_eq!(keyer.key_for(keyer.start_of_day(key)), key);
        }
    }

    #[test]
    fn test_offset_moves_day_boundary() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
        assert_eq!(DateKeyer::utc().key_for(ts), key("2024-03-10"));
        assert_eq!(
            DateKeyer::from_offset_str("+01:00").unwrap().key_for(ts),
            key("2024-03-11")
        );
        assert_eq!(
            DateKeyer::from_offset_str("-05:00").unwrap().key_for(ts),
            key("2024-03-10")
        );
    }

    #[test]
    fn test_parse_accepts_dates_and_timestamps() {
        let keyer = DateKeyer::from_offset_str("+09:00").unwrap();
        assert_eq!(keyer.parse(" 2024-01-31 ").unwrap(), key("2024-01-31"));
        // 20:00 UTC is already the next morning at +09:00
        assert_eq!(
            keyer.parse("2024-01-31T20:00:00Z").unwrap(),
            key("2024-02-01")
        );
        assert_eq!(
            keyer.parse("2024-01-31T20:00:00+09:00").unwrap(),
            key("2024-01-31")
        );
    }

    #[test]
    fn test_parse_rejects_missing_and_garbage() {
        let keyer = DateKeyer::utc();
        assert!(matches!(keyer.parse(""), Err(Error::Validation(_))));
        assert!(matches!(keyer.parse("   "), Err(Error::Validation(_))));
        assert!(matches!(keyer.parse("yesterday"), Err(Error::Validation(_))));
        assert!(matches!(keyer.parse("2024-02-30"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_offset_strings() {
        assert_eq!(
            DateKeyer::from_offset_str("-0530").unwrap().offset(),
            FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(DateKeyer::from_offset_str("UTC").unwrap(), DateKeyer::utc());
        assert!(DateKeyer::from_offset_str("+25:00").is_err());
        assert!(DateKeyer::from_offset_str("0200").is_err());
    }

    #[test]
    fn test_iter_to_is_inclusive_and_empty_when_reversed() {
        let days: Vec<_> = key("2024-02-27").iter_to(key("2024-03-01")).collect();
        assert_eq!(
            days,
            vec![
                key("2024-02-27"),
                key("2024-02-28"),
                key("2024-02-29"),
                key("2024-03-01")
            ]
        );
        assert_eq!(key("2024-03-01").iter_to(key("2024-03-01")).count(), 1);
        assert_eq!(key("2024-03-02").iter_to(key("2024-03-01")).count(), 0);
    }

    #[test]
    fn test_days_between_is_signed() {
        assert_eq!(key("2024-02-27").days_between(key("2024-03-01")), 3);
        assert_eq!(key("2024-03-01").days_between(key("2024-03-01")), 0);
        assert_eq!(key("2024-03-01").days_between(key("2024-02-27")), -3);
        assert_eq!(key("2024-02-27").add_days(3), Some(key("2024-03-01")));
    }

    #[test]
    fn test_today_uses_clock() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 22, 0, 0).unwrap());
        let keyer = DateKeyer::from_offset_str("+03:00").unwrap();
        assert_eq!(keyer.today(&clock), key("2024-06-02"));
    }
}
