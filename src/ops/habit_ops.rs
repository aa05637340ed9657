//! Habit store operations and the habit/task coordinator.
//!
//! Every habit owns a "shadow" task per scheduled day: a recurring task
//! tagged `habit` whose `habit_id` points back at it. The functions here
//! take both the habit book and the task book so the link is maintained
//! in exactly one place.

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::habit::{Habit, HabitBook, HabitId, HabitPatch, NewHabit};
use crate::model::task::{HABIT_TAG, Level, NewTask, Task, TaskBook, TaskId, TaskPatch};
use crate::ops::clock::Clock;
use crate::ops::task_ops::{self, TaskError};

/// Category a shadow task gets when its habit has none
pub const DEFAULT_SHADOW_CATEGORY: &str = "Personal";

/// Error type for habit operations
#[derive(Debug, thiserror::Error)]
pub enum HabitError {
    #[error("habit not found: {0}")]
    NotFound(HabitId),
    #[error("habit title cannot be empty")]
    EmptyTitle,
    #[error("a habit titled \"{0}\" already exists")]
    DuplicateTitle(String),
    #[error("task error: {0}")]
    Task(#[from] TaskError),
}

// ---------------------------------------------------------------------------
// Linkage
// ---------------------------------------------------------------------------

/// Whether `task` is one of `habit`'s shadow tasks.
///
/// Tasks written before the stored link existed carry no `habit_id`; for
/// those the `habit` tag plus an exact title match decides.
pub fn is_linked(task: &Task, habit: &Habit) -> bool {
    match task.habit_id {
        Some(id) => id == habit.id,
        None => task.has_tag(HABIT_TAG) && task.title == habit.title,
    }
}

/// IDs of every shadow task of `habit`
pub fn linked_task_ids(tasks: &TaskBook, habit: &Habit) -> Vec<TaskId> {
    tasks
        .tasks
        .values()
        .filter(|t| is_linked(t, habit))
        .map(|t| t.id)
        .collect()
}

/// The shadow task of `habit` due on `day`, if one exists
pub fn linked_task_on(tasks: &TaskBook, habit: &Habit, day: NaiveDate) -> Option<TaskId> {
    tasks
        .tasks
        .values()
        .find(|t| is_linked(t, habit) && t.due_date == Some(day))
        .map(|t| t.id)
}

/// Minutes covered by a habit's time window.
///
/// A window whose end precedes its start runs past midnight. A zero-length
/// window has no estimate.
pub fn estimate_minutes(start: NaiveTime, end: NaiveTime) -> Option<i64> {
    let start = i64::from(start.num_seconds_from_midnight() / 60);
    let end = i64::from(end.num_seconds_from_midnight() / 60);
    match (end - start).rem_euclid(24 * 60) {
        0 => None,
        minutes => Some(minutes),
    }
}

fn habit_estimate(habit: &Habit) -> Option<i64> {
    match (habit.start_time, habit.end_time) {
        (Some(start), Some(end)) => estimate_minutes(start, end),
        _ => None,
    }
}

fn shadow_draft(habit: &Habit, day: NaiveDate) -> NewTask {
    NewTask {
        title: habit.title.clone(),
        description: habit.description.clone(),
        completed: false,
        due_date: Some(day),
        priority: Level::Medium,
        category: Some(
            habit
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_SHADOW_CATEGORY.to_string()),
        ),
        estimated_minutes: habit_estimate(habit),
        tags: vec![HABIT_TAG.to_string()],
        difficulty: habit.difficulty,
        energy_level: Level::Medium,
        focus_required: Level::Medium,
        is_recurring: true,
        recurrence_pattern: Some(habit.frequency.as_str().to_string()),
        habit_id: Some(habit.id),
        ..Default::default()
    }
}

fn ensure_unique_title(
    habits: &HabitBook,
    title: &str,
    except: Option<HabitId>,
) -> Result<(), HabitError> {
    let taken = habits
        .habits
        .values()
        .any(|h| Some(h.id) != except && h.title == title);
    if taken {
        return Err(HabitError::DuplicateTitle(title.to_string()));
    }
    Ok(())
}

pub fn find_habit(habits: &HabitBook, id: HabitId) -> Result<&Habit, HabitError> {
    habits.habits.get(&id).ok_or(HabitError::NotFound(id))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// Create a habit and its first shadow task, dated tomorrow.
pub fn add_habit(
    habits: &mut HabitBook,
    tasks: &mut TaskBook,
    draft: NewHabit,
    clock: &dyn Clock,
) -> Result<HabitId, HabitError> {
    let title = draft.title.trim().to_string();
    if title.is_empty() {
        return Err(HabitError::EmptyTitle);
    }
    ensure_unique_title(habits, &title, None)?;

    let habit = Habit {
        id: Uuid::new_v4(),
        title,
        description: draft.description,
        created_at: clock.now(),
        frequency: draft.frequency,
        custom_frequency: draft.custom_frequency,
        time_of_day: draft.time_of_day,
        start_time: draft.start_time,
        end_time: draft.end_time,
        calendar_sync: draft.calendar_sync,
        streak: 0,
        color: draft.color,
        category: draft.category,
        completed_dates: Default::default(),
        reminder_time: draft.reminder_time,
        difficulty: draft.difficulty,
        motivation: draft.motivation,
    };

    let task_id = task_ops::add_task(tasks, shadow_draft(&habit, clock.tomorrow()), clock)?;
    info!(habit = %habit.id, task = %task_id, title = %habit.title, "habit added with shadow task");
    let id = habit.id;
    habits.habits.insert(id, habit);
    Ok(id)
}

/// Edit a habit and push the change into every shadow task.
///
/// Shadow tasks are resolved against the habit as it was before the edit,
/// so a rename carries its tasks along.
pub fn update_habit(
    habits: &mut HabitBook,
    tasks: &mut TaskBook,
    id: HabitId,
    patch: HabitPatch,
    clock: &dyn Clock,
) -> Result<(), HabitError> {
    let old = find_habit(habits, id)?.clone();
    if let Some(title) = &patch.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(HabitError::EmptyTitle);
        }
        ensure_unique_title(habits, title, Some(id))?;
    }
    let linked = linked_task_ids(tasks, &old);

    let mut updated = old;
    apply_patch(&mut updated, patch);

    let shadow = TaskPatch {
        title: Some(updated.title.clone()),
        description: Some(updated.description.clone()),
        category: Some(
            updated
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_SHADOW_CATEGORY.to_string()),
        ),
        estimated_minutes: Some(habit_estimate(&updated)),
        difficulty: Some(updated.difficulty),
        recurrence_pattern: Some(Some(updated.frequency.as_str().to_string())),
        ..Default::default()
    };
    for task_id in &linked {
        task_ops::update_task(tasks, *task_id, shadow.clone(), clock)?;
        // Adopt legacy title-linked tasks so later renames follow the id
        if let Some(task) = tasks.tasks.get_mut(task_id) {
            task.habit_id = Some(id);
        }
    }
    info!(habit = %id, shadow_tasks = linked.len(), "habit updated");
    habits.habits.insert(id, updated);
    Ok(())
}

fn apply_patch(habit: &mut Habit, patch: HabitPatch) {
    if let Some(v) = patch.title {
        habit.title = v.trim().to_string();
    }
    if let Some(v) = patch.description {
        habit.description = v;
    }
    if let Some(v) = patch.frequency {
        habit.frequency = v;
    }
    if let Some(v) = patch.custom_frequency {
        habit.custom_frequency = v;
    }
    if let Some(v) = patch.time_of_day {
        habit.time_of_day = v;
    }
    if let Some(v) = patch.start_time {
        habit.start_time = v;
    }
    if let Some(v) = patch.end_time {
        habit.end_time = v;
    }
    if let Some(v) = patch.calendar_sync {
        habit.calendar_sync = v;
    }
    if let Some(v) = patch.color {
        habit.color = v;
    }
    if let Some(v) = patch.category {
        habit.category = v;
    }
    if let Some(v) = patch.reminder_time {
        habit.reminder_time = v;
    }
    if let Some(v) = patch.difficulty {
        habit.difficulty = v;
    }
    if let Some(v) = patch.motivation {
        habit.motivation = v;
    }
}

/// Delete a habit together with every shadow task. Returns how many tasks
/// went with it.
pub fn delete_habit(
    habits: &mut HabitBook,
    tasks: &mut TaskBook,
    id: HabitId,
) -> Result<usize, HabitError> {
    let habit = habits
        .habits
        .shift_remove(&id)
        .ok_or(HabitError::NotFound(id))?;
    let linked = linked_task_ids(tasks, &habit);
    for task_id in &linked {
        task_ops::delete_task(tasks, *task_id)?;
    }
    info!(habit = %id, shadow_tasks = linked.len(), "habit deleted");
    Ok(linked.len())
}

// ---------------------------------------------------------------------------
// Daily tracking
// ---------------------------------------------------------------------------

/// Record the habit as done on `day`. Returns false when it already was.
pub fn mark_complete(
    habits: &mut HabitBook,
    tasks: &mut TaskBook,
    id: HabitId,
    day: NaiveDate,
    clock: &dyn Clock,
) -> Result<bool, HabitError> {
    let habit = habits
        .habits
        .get_mut(&id)
        .ok_or(HabitError::NotFound(id))?;
    if !habit.completed_dates.insert(day) {
        return Ok(false);
    }
    habit.streak += 1;

    if let Some(task_id) = linked_task_on(tasks, habit, day) {
        set_shadow_completed(tasks, task_id, true, clock)?;
    }
    debug!(habit = %id, %day, streak = habit.streak, "habit completed");
    Ok(true)
}

/// Undo [`mark_complete`] for `day`. Returns false when there was nothing
/// to undo.
pub fn mark_incomplete(
    habits: &mut HabitBook,
    tasks: &mut TaskBook,
    id: HabitId,
    day: NaiveDate,
    clock: &dyn Clock,
) -> Result<bool, HabitError> {
    let habit = habits
        .habits
        .get_mut(&id)
        .ok_or(HabitError::NotFound(id))?;
    if !habit.completed_dates.remove(&day) {
        return Ok(false);
    }
    habit.streak = habit.streak.saturating_sub(1);

    if let Some(task_id) = linked_task_on(tasks, habit, day) {
        set_shadow_completed(tasks, task_id, false, clock)?;
    }
    debug!(habit = %id, %day, streak = habit.streak, "habit un-completed");
    Ok(true)
}

/// Only the flag moves; a shadow task's completion streak is left alone.
fn set_shadow_completed(
    tasks: &mut TaskBook,
    task_id: TaskId,
    completed: bool,
    clock: &dyn Clock,
) -> Result<(), TaskError> {
    let patch = TaskPatch {
        completed: Some(completed),
        ..Default::default()
    };
    task_ops::update_task(tasks, task_id, patch, clock)
}

/// Create a shadow task for an explicit day.
pub fn convert_to_task(
    habits: &HabitBook,
    tasks: &mut TaskBook,
    id: HabitId,
    day: NaiveDate,
    clock: &dyn Clock,
) -> Result<TaskId, HabitError> {
    let habit = find_habit(habits, id)?;
    Ok(task_ops::add_task(tasks, shadow_draft(habit, day), clock)?)
}

/// Make sure every habit has a shadow task for tomorrow. Safe to run any
/// number of times. Returns how many tasks were created.
pub fn generate_tomorrow(
    habits: &HabitBook,
    tasks: &mut TaskBook,
    clock: &dyn Clock,
) -> Result<usize, HabitError> {
    let tomorrow = clock.tomorrow();
    let mut created = 0;
    for habit in habits.habits.values() {
        if linked_task_on(tasks, habit, tomorrow).is_none() {
            task_ops::add_task(tasks, shadow_draft(habit, tomorrow), clock)?;
            created += 1;
        }
    }
    if created > 0 {
        info!(created, day = %tomorrow, "generated habit tasks");
    }
    Ok(created)
}

/// Consecutive days, ending today or yesterday, on which the habit was done.
/// Unlike the stored `streak` counter this is derived from history.
pub fn current_run(habit: &Habit, today: NaiveDate) -> u32 {
    let mut day = if habit.is_completed_on(today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut run = 0;
    while habit.is_completed_on(day) {
        run += 1;
        day -= Duration::days(1);
    }
    run
}

// ---------------------------------------------------------------------------
// Category vocabulary
// ---------------------------------------------------------------------------

pub fn add_category(habits: &mut HabitBook, category: &str) -> bool {
    let category = category.trim();
    if category.is_empty() || habits.categories.iter().any(|c| c == category) {
        return false;
    }
    habits.categories.push(category.to_string());
    true
}

/// Drop a category; habits filed under it lose their category.
pub fn delete_category(habits: &mut HabitBook, category: &str) -> usize {
    habits.categories.retain(|c| c != category);
    let mut cleared = 0;
    for habit in habits.habits.values_mut() {
        if habit.category.as_deref() == Some(category) {
            habit.category = None;
            cleared += 1;
        }
    }
    cleared
}
