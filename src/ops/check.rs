use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::model::habit::HabitId;
use crate::model::task::{HABIT_TAG, Task, UNCATEGORIZED};
use crate::model::workspace::Workspace;
use crate::ops::clock::Clock;

/// An open focus session older than this is reported as stale
pub const STALE_SESSION_HOURS: i64 = 24;

/// Structured result from `ff check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A validation error (something that should be fixed).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// Two or more habits share a title, so legacy title links are ambiguous
    #[serde(rename = "duplicate_habit_title")]
    DuplicateHabitTitle { title: String, habit_ids: Vec<HabitId> },
    /// A task is linked to a habit that no longer exists
    #[serde(rename = "orphan_habit_task")]
    OrphanHabitTask { task_id: Uuid, habit_id: HabitId },
    /// A processed brain dump item points at a missing task
    #[serde(rename = "dangling_brain_dump_link")]
    DanglingBrainDumpLink { item_id: Uuid, task_id: Uuid },
}

/// A validation warning (non-critical issue).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// The open session started long ago and was probably forgotten
    #[serde(rename = "stale_session")]
    StaleSession {
        session_id: Uuid,
        started: DateTime<Utc>,
    },
    /// A task's category is not in the vocabulary
    #[serde(rename = "unknown_category")]
    UnknownCategory { task_id: Uuid, category: String },
    /// A task tagged `habit` that matches no habit by link or title
    #[serde(rename = "unlinked_habit_task")]
    UnlinkedHabitTask { task_id: Uuid, title: String },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a workspace and return structured results.
///
/// Read-only; nothing in the workspace is modified.
pub fn check_workspace(ws: &Workspace, clock: &dyn Clock) -> CheckResult {
    let mut result = CheckResult::default();
    check_habits(ws, &mut result);
    check_tasks(ws, &mut result);
    check_brain_dump(ws, &mut result);
    check_focus(ws, clock, &mut result);
    result.valid = result.errors.is_empty();
    result
}

fn check_habits(ws: &Workspace, result: &mut CheckResult) {
    let mut by_title: BTreeMap<&str, Vec<HabitId>> = BTreeMap::new();
    for habit in ws.habits.habits.values() {
        by_title.entry(habit.title.as_str()).or_default().push(habit.id);
    }
    for (title, habit_ids) in by_title {
        if habit_ids.len() > 1 {
            result.errors.push(CheckError::DuplicateHabitTitle {
                title: title.to_string(),
                habit_ids,
            });
        }
    }
}

fn check_tasks(ws: &Workspace, result: &mut CheckResult) {
    let titles: HashSet<&str> = ws.habits.habits.values().map(|h| h.title.as_str()).collect();

    for task in ws.tasks.tasks.values() {
        match task.habit_id {
            Some(habit_id) if !ws.habits.habits.contains_key(&habit_id) => {
                result.errors.push(CheckError::OrphanHabitTask {
                    task_id: task.id,
                    habit_id,
                });
            }
            None if task.has_tag(HABIT_TAG) && !titles.contains(task.title.as_str()) => {
                result.warnings.push(CheckWarning::UnlinkedHabitTask {
                    task_id: task.id,
                    title: task.title.clone(),
                });
            }
            _ => {}
        }

        if !category_known(ws, task) {
            result.warnings.push(CheckWarning::UnknownCategory {
                task_id: task.id,
                category: task.category.clone(),
            });
        }
    }
}

/// `Uncategorized` is always known. Habit tasks inherit their habit's
/// category, so habit categories count for them too.
fn category_known(ws: &Workspace, task: &Task) -> bool {
    let category = task.category.as_str();
    if category == UNCATEGORIZED || ws.tasks.categories.iter().any(|c| c == category) {
        return true;
    }
    let habit_task = task.habit_id.is_some() || task.has_tag(HABIT_TAG);
    habit_task && ws.habits.categories.iter().any(|c| c == category)
}

fn check_brain_dump(ws: &Workspace, result: &mut CheckResult) {
    for item in &ws.brain_dump.items {
        if let Some(task_id) = item.converted_to_task_id
            && !ws.tasks.tasks.contains_key(&task_id)
        {
            result.errors.push(CheckError::DanglingBrainDumpLink {
                item_id: item.id,
                task_id,
            });
        }
    }
}

fn check_focus(ws: &Workspace, clock: &dyn Clock, result: &mut CheckResult) {
    if let Some(current) = &ws.focus.current
        && clock.now() - current.start_time > Duration::hours(STALE_SESSION_HOURS)
    {
        warn!(session = %current.id, started = %current.start_time, "focus session left open");
        result.warnings.push(CheckWarning::StaleSession {
            session_id: current.id,
            started: current.start_time,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
