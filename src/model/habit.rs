use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::Difficulty;

pub type HabitId = Uuid;

pub const DEFAULT_HABIT_CATEGORIES: [&str; 4] = ["Health", "Productivity", "Personal", "Learning"];

/// How often a habit is meant to happen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        }
    }

    pub fn parse_frequency(s: &str) -> Option<Frequency> {
        match s {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            "custom" => Some(Frequency::Custom),
            _ => None,
        }
    }
}

/// Malformed `HH:MM` input
#[derive(Debug, thiserror::Error)]
#[error("invalid time '{0}': expected HH:MM")]
pub struct TimeParseError(pub String);

/// Parse a wall-clock time of day written as `HH:MM`.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, TimeParseError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| TimeParseError(s.to_string()))
}

pub fn format_hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Serde adapter storing `Option<NaiveTime>` as `"HH:MM"`
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_str(&super::format_hhmm(*t)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| super::parse_hhmm(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// A recurring behaviour the user is building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_frequency: Option<String>,
    /// Free-form hint such as "morning"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    /// Include this habit in calendar exports
    #[serde(default)]
    pub calendar_sync: bool,
    #[serde(default)]
    pub streak: u32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Days the habit was done, one entry per day
    #[serde(default)]
    pub completed_dates: BTreeSet<NaiveDate>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<NaiveTime>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
}

impl Habit {
    pub fn is_completed_on(&self, day: NaiveDate) -> bool {
        self.completed_dates.contains(&day)
    }
}

pub fn default_color() -> String {
    "#6366f1".to_string()
}

/// Everything a caller supplies when creating a habit
#[derive(Debug, Clone, PartialEq)]
pub struct NewHabit {
    pub title: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub custom_frequency: Option<String>,
    pub time_of_day: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub calendar_sync: bool,
    pub color: String,
    pub category: Option<String>,
    pub reminder_time: Option<NaiveTime>,
    pub difficulty: Difficulty,
    pub motivation: Option<String>,
}

impl Default for NewHabit {
    fn default() -> Self {
        NewHabit {
            title: String::new(),
            description: None,
            frequency: Frequency::Daily,
            custom_frequency: None,
            time_of_day: None,
            start_time: None,
            end_time: None,
            calendar_sync: false,
            color: default_color(),
            category: None,
            reminder_time: None,
            difficulty: Difficulty::default(),
            motivation: None,
        }
    }
}

impl NewHabit {
    pub fn titled(title: impl Into<String>) -> Self {
        NewHabit {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// A partial habit edit; `Some(None)` clears an optional field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub custom_frequency: Option<Option<String>>,
    pub time_of_day: Option<Option<String>>,
    pub start_time: Option<Option<NaiveTime>>,
    pub end_time: Option<Option<NaiveTime>>,
    pub calendar_sync: Option<bool>,
    pub color: Option<String>,
    pub category: Option<Option<String>>,
    pub reminder_time: Option<Option<NaiveTime>>,
    pub difficulty: Option<Difficulty>,
    pub motivation: Option<Option<String>>,
}

/// The habit store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitBook {
    #[serde(default)]
    pub habits: IndexMap<HabitId, Habit>,
    #[serde(default = "default_habit_categories")]
    pub categories: Vec<String>,
}

impl Default for HabitBook {
    fn default() -> Self {
        HabitBook {
            habits: IndexMap::new(),
            categories: default_habit_categories(),
        }
    }
}

fn default_habit_categories() -> Vec<String> {
    DEFAULT_HABIT_CATEGORIES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hhmm_accepts_padded_and_trims() {
        assert_eq!(
            parse_hhmm(" 07:15 ").unwrap(),
            NaiveTime::from_hms_opt(7, 15, 0).unwrap()
        );
        assert!(parse_hhmm("7.15").is_err());
        assert!(parse_hhmm("25:00").is_err());
    }

    #[test]
    fn habit_times_serialize_as_hhmm() {
        let json = r#"{
            "id": "6f1c1b8e-2c1a-4d5e-9a1b-1d2e3f4a5b6c",
            "title": "Meditate",
            "created_at": "2025-05-14T08:00:00Z",
            "start_time": "07:00",
            "end_time": "07:15"
        }"#;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(habit.start_time, NaiveTime::from_hms_opt(7, 0, 0));
        assert_eq!(habit.frequency, Frequency::Daily);
        assert!(habit.completed_dates.is_empty());

        let back = serde_json::to_value(&habit).unwrap();
        assert_eq!(back["end_time"], "07:15");
        assert!(back.get("reminder_time").is_none());
    }

    #[test]
    fn frequency_parse() {
        assert_eq!(Frequency::parse_frequency("weekly"), Some(Frequency::Weekly));
        assert_eq!(Frequency::parse_frequency("hourly"), None);
    }
}
