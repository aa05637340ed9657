use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;
pub type SubtaskId = Uuid;

/// Category every task falls back to when its own category is deleted
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Tag carried by every shadow task a habit generates
pub const HABIT_TAG: &str = "habit";

pub const DEFAULT_CATEGORIES: [&str; 5] = ["Work", "Personal", "Health", "Learning", "Errands"];
pub const DEFAULT_TAGS: [&str; 6] = ["important", "urgent", "fun", "creative", "admin", "social"];

/// Three-step scale used for priority, energy level and focus requirement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }

    pub fn parse_level(s: &str) -> Option<Level> {
        match s {
            "low" => Some(Level::Low),
            "medium" | "med" => Some(Level::Medium),
            "high" => Some(Level::High),
            _ => None,
        }
    }
}

/// Perceived difficulty, 1 (trivial) to 5 (dreaded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Difficulty> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(Difficulty(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(3)
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Difficulty::new(value).ok_or_else(|| format!("difficulty must be 1-5, got {}", value))
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> u8 {
        d.0
    }
}

/// A checklist item owned by exactly one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// A task with its scheduling hints and classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Day the task is scheduled for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Level,
    pub category: String,
    /// Signed: habit windows are copied in verbatim and may be odd
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Tags in insertion order, no duplicates
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Something to look forward to once it's done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    #[serde(default)]
    pub energy_level: Level,
    #[serde(default)]
    pub focus_required: Level,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<String>,
    #[serde(default)]
    pub completion_streak: u32,
    /// Owning habit, for shadow tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habit_id: Option<Uuid>,
}

impl Task {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn subtask_mut(&mut self, id: SubtaskId) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == id)
    }

    /// Completed subtasks over total, for progress display
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (done, self.subtasks.len())
    }
}

/// Everything a caller supplies when creating a task.
/// Identity, timestamps, streak and subtasks are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub due_date: Option<NaiveDate>,
    pub priority: Level,
    pub category: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub reward: Option<String>,
    pub energy_level: Level,
    pub focus_required: Level,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub habit_id: Option<Uuid>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// A partial edit. `None` leaves a field alone; for optional fields,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Level>,
    pub category: Option<String>,
    pub estimated_minutes: Option<Option<i64>>,
    pub actual_minutes: Option<Option<i64>>,
    pub notes: Option<Option<String>>,
    pub difficulty: Option<Difficulty>,
    pub reward: Option<Option<String>>,
    pub energy_level: Option<Level>,
    pub focus_required: Option<Level>,
    pub is_recurring: Option<bool>,
    pub recurrence_pattern: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

/// The task store: every task plus the category and tag vocabularies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBook {
    /// Tasks keyed by id, in creation order
    #[serde(default)]
    pub tasks: IndexMap<TaskId, Task>,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

impl Default for TaskBook {
    fn default() -> Self {
        TaskBook {
            tasks: IndexMap::new(),
            categories: default_categories(),
            tags: default_tags(),
        }
    }
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
}

fn default_tags() -> Vec<String> {
    DEFAULT_TAGS.iter().map(|s| s.to_string()).collect()
}
