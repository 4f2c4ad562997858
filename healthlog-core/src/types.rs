//! Core domain types for healthlog
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Category** | One of Food, Mood, Exercise, Sleep, Water |
//! | **Date key** | The calendar day an entry is bucketed under (see [`crate::datekey`]) |
//! | **Entry** | One logged event (or, for Water, the running daily total) |
//! | **Payload** | Category-specific fields; unknown fields are passed through untouched |
//! | **Insight** | A ranked textual observation derived from history |
//!
//! Each category is described by a static [`CategoryDescriptor`]: its
//! storage policy plus the schema of the payload fields the engine knows
//! about. The store is a single generic engine driven by this table.

use crate::datekey::DateKey;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Payload map carried by every entry.
pub type Fields = Map<String, Value>;

// ============================================
// Categories
// ============================================

/// The closed set of log categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Food,
    Mood,
    Exercise,
    Sleep,
    Water,
}

impl LogCategory {
    /// All categories, in display order.
    pub const ALL: [LogCategory; 5] = [
        LogCategory::Food,
        LogCategory::Mood,
        LogCategory::Exercise,
        LogCategory::Sleep,
        LogCategory::Water,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Food => "food",
            LogCategory::Mood => "mood",
            LogCategory::Exercise => "exercise",
            LogCategory::Sleep => "sleep",
            LogCategory::Water => "water",
        }
    }

    pub fn descriptor(&self) -> &'static CategoryDescriptor {
        match self {
            LogCategory::Food => &FOOD,
            LogCategory::Mood => &MOOD,
            LogCategory::Exercise => &EXERCISE,
            LogCategory::Sleep => &SLEEP,
            LogCategory::Water => &WATER,
        }
    }

    pub fn policy(&self) -> StoragePolicy {
        self.descriptor().policy
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "food" | "nutrition" => Ok(LogCategory::Food),
            "mood" => Ok(LogCategory::Mood),
            "exercise" => Ok(LogCategory::Exercise),
            "sleep" => Ok(LogCategory::Sleep),
            "water" | "hydration" => Ok(LogCategory::Water),
            _ => Err(Error::Validation(format!("unknown category: {s}"))),
        }
    }
}

/// How writes for one day combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePolicy {
    /// A write replaces the day's record (last write wins).
    Singleton,
    /// A write appends to the day's ordered list.
    Append,
}

// ============================================
// Category schemas
// ============================================

/// Type of a known payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    /// Whole number in an inclusive range (ratings).
    Integer { min: i64, max: i64 },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text,
    }
}

const fn number(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Number,
    }
}

const fn rating(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Integer { min: 1, max: 5 },
    }
}

/// Static per-category configuration.
#[derive(Debug)]
pub struct CategoryDescriptor {
    pub category: LogCategory,
    pub policy: StoragePolicy,
    pub fields: &'static [FieldSpec],
}

static FOOD: CategoryDescriptor = CategoryDescriptor {
    category: LogCategory::Food,
    policy: StoragePolicy::Append,
    fields: &[
        text("name"),
        text("meal_type"),
        number("calories"),
        number("protein"),
        number("carbs"),
        number("fat"),
        text("notes"),
    ],
};

static MOOD: CategoryDescriptor = CategoryDescriptor {
    category: LogCategory::Mood,
    policy: StoragePolicy::Append,
    fields: &[
        rating("rating"),
        rating("energy"),
        rating("stress"),
        text("notes"),
    ],
};

static EXERCISE: CategoryDescriptor = CategoryDescriptor {
    category: LogCategory::Exercise,
    policy: StoragePolicy::Append,
    fields: &[
        text("activity"),
        // minutes
        number("duration"),
        text("intensity"),
        number("calories_burned"),
        text("notes"),
    ],
};

static SLEEP: CategoryDescriptor = CategoryDescriptor {
    category: LogCategory::Sleep,
    policy: StoragePolicy::Append,
    fields: &[
        // hours
        number("duration"),
        rating("quality"),
        text("bedtime"),
        text("wake_time"),
        text("notes"),
    ],
};

static WATER: CategoryDescriptor = CategoryDescriptor {
    category: LogCategory::Water,
    policy: StoragePolicy::Singleton,
    fields: &[number("glasses"), number("goal"), text("notes")],
};

impl CategoryDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check known fields against the schema. Unknown fields and `null`
    /// values are accepted as-is.
    pub fn validate(&self, fields: &Fields) -> Result<()> {
        for (name, value) in fields {
            let Some(spec) = self.field(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let ok = match spec.kind {
                FieldKind::Text => value.is_string(),
                FieldKind::Number => value.as_f64().is_some_and(f64::is_finite),
                FieldKind::Integer { min, max } => value
                    .as_i64()
                    .is_some_and(|v| (min..=max).contains(&v)),
            };

            if !ok {
                return Err(Error::Validation(format!(
                    "{}.{} must be {}, got {}",
                    self.category,
                    name,
                    describe_kind(spec.kind),
                    value
                )));
            }
        }
        Ok(())
    }
}

fn describe_kind(kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => "a string".to_string(),
        FieldKind::Number => "a number".to_string(),
        FieldKind::Integer { min, max } => format!("an integer between {min} and {max}"),
    }
}

// ============================================
// Log entries
// ============================================

/// A stored log entry. Values handed out by the store are snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Opaque identifier, immutable once assigned
    pub id: String,
    pub category: LogCategory,
    /// Bucketing key
    pub date: DateKey,
    /// Informational wall-clock time ("08:30")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Category payload, unknown keys preserved
    #[serde(default)]
    pub fields: Fields,
}

impl LogEntry {
    /// Numeric value of a payload field, if present and numeric.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Input to [`crate::store::LogStore::write`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLogEntry {
    /// Caller-chosen id; one is generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Raw date: `YYYY-MM-DD` or an RFC 3339 timestamp
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

impl NewLogEntry {
    pub fn on(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }
}

/// Partial update for an existing entry.
///
/// Each patch field overwrites the stored one; a `null` removes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogPatch {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

impl LogPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub(crate) fn apply_to(&self, entry: &mut LogEntry) {
        if let Some(time) = &self.time {
            entry.time = Some(time.clone());
        }
        for (name, value) in &self.fields {
            if value.is_null() {
                entry.fields.remove(name);
            } else {
                entry.fields.insert(name.clone(), value.clone());
            }
        }
    }
}

// ============================================
// Insights
// ============================================

/// Topic of an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Sleep,
    Nutrition,
    Exercise,
    Mood,
    Hydration,
    General,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Sleep => "sleep",
            InsightKind::Nutrition => "nutrition",
            InsightKind::Exercise => "exercise",
            InsightKind::Mood => "mood",
            InsightKind::Hydration => "hydration",
            InsightKind::General => "general",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sleep" => Ok(InsightKind::Sleep),
            "nutrition" => Ok(InsightKind::Nutrition),
            "exercise" => Ok(InsightKind::Exercise),
            "mood" => Ok(InsightKind::Mood),
            "hydration" => Ok(InsightKind::Hydration),
            "general" => Ok(InsightKind::General),
            _ => Err(format!("unknown insight kind: {}", s)),
        }
    }
}

/// A derived observation. Produced per engine call, never user-edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Content-derived: identical analysis yields identical ids
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub content: String,
    /// 1..=5, higher is more salient
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    /// Analyzer that produced it
    pub analyzer: String,
    /// Most recent day of supporting data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_date: Option<DateKey>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_round_trip_and_aliases() {
        for category in LogCategory::ALL {
            assert_eq!(category.as_str().parse::<LogCategory>().unwrap(), category);
            assert_eq!(category.descriptor().category, category);
        }
        assert_eq!("Hydration".parse::<LogCategory>().unwrap(), LogCategory::Water);
        assert!("steps".parse::<LogCategory>().is_err());
    }

    #[test]
    fn test_only_water_is_singleton() {
        for category in LogCategory::ALL {
            let expected = if category == LogCategory::Water {
                StoragePolicy::Singleton
            } else {
                StoragePolicy::Append
            };
            assert_eq!(category.policy(), expected, "{category}");
        }
    }

    #[test]
    fn test_validate_known_fields() {
        let mood = LogCategory::Mood.descriptor();
        let mut fields = Fields::new();
        fields.insert("rating".into(), json!(4));
        fields.insert("notes".into(), json!("fine"));
        fields.insert("weather".into(), json!({"sunny": true}));
        assert!(mood.validate(&fields).is_ok());

        fields.insert("rating".into(), json!(6));
        assert!(matches!(mood.validate(&fields), Err(Error::Validation(_))));

        fields.insert("rating".into(), json!("great"));
        assert!(mood.validate(&fields).is_err());

        fields.insert("rating".into(), Value::Null);
        assert!(mood.validate(&fields).is_ok());
    }

    #[test]
    fn test_validate_numbers() {
        let food = LogCategory::Food.descriptor();
        let mut fields = Fields::new();
        fields.insert("calories".into(), json!(512.5));
        assert!(food.validate(&fields).is_ok());

        fields.insert("calories".into(), json!("lots"));
        let err = food.validate(&fields).unwrap_err().to_string();
        assert!(err.contains("food.calories"), "{err}");
    }

    #[test]
    fn test_patch_overwrites_and_removes() {
        let now = Utc::now();
        let mut entry = LogEntry {
            id: "e1".into(),
            category: LogCategory::Food,
            date: "2024-05-01".parse().unwrap(),
            time: None,
            created_at: now,
            updated_at: now,
            fields: Fields::new(),
        };
        entry.fields.insert("calories".into(), json!(300));
        entry.fields.insert("notes".into(), json!("toast"));

        LogPatch::new()
            .at("09:15")
            .field("calories", 350)
            .field("notes", Value::Null)
            .apply_to(&mut entry);

        assert_eq!(entry.time.as_deref(), Some("09:15"));
        assert_eq!(entry.number("calories"), Some(350.0));
        assert!(!entry.fields.contains_key("notes"));
    }

    #[test]
    fn test_insight_serializes_kind_as_type() {
        let insight = Insight {
            id: "abc".into(),
            kind: InsightKind::Sleep,
            title: "t".into(),
            content: "c".into(),
            priority: 3,
            created_at: Utc::now(),
            analyzer: "core.sleep_mood".into(),
            signal_date: None,
        };

        let value = serde_json::to_value(&insight).unwrap();
        assert_eq!(value["type"], "sleep");
        assert!(value.get("kind").is_none());

        let back: Insight = serde_json::from_value(value).unwrap();
        assert_eq!(back, insight);
    }
}
