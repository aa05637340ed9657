use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::TaskId;

pub type SessionId = Uuid;
pub type DistractionId = Uuid;

/// Something that pulled attention away during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distraction {
    pub id: DistractionId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Self-assessed session quality, 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Option<Rating> {
        (1..=5).contains(&value).then_some(Rating(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating must be 1-5, got {}", value))
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

/// One block of focused work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: SessionId,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Whole minutes, fixed when the session ends
    #[serde(default)]
    pub duration_minutes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    /// Append-only while the session is open
    #[serde(default)]
    pub distractions: Vec<Distraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    FocusStreak,
    NoDistractions,
    LongSession,
    CompletionStreak,
}

impl AchievementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementKind::FocusStreak => "focus_streak",
            AchievementKind::NoDistractions => "no_distractions",
            AchievementKind::LongSession => "long_session",
            AchievementKind::CompletionStreak => "completion_streak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementLevel {
    Bronze,
    Silver,
    Gold,
}

/// An award earned at the end of a session. Never revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Uuid,
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub earned_at: DateTime<Utc>,
    pub icon: String,
    pub level: AchievementLevel,
}

/// The focus store: history, the open session, and earned achievements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusLog {
    /// Completed sessions, oldest first
    #[serde(default)]
    pub sessions: Vec<FocusSession>,
    /// The single in-progress session, if any
    #[serde(default)]
    pub current: Option<FocusSession>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
}
