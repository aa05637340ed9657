use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::model::task::{
    Level, NewTask, Subtask, SubtaskId, Task, TaskBook, TaskId, TaskPatch, UNCATEGORIZED,
};
use crate::ops::clock::Clock;

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("subtask not found: {0}")]
    SubtaskNotFound(SubtaskId),
    #[error("task title cannot be empty")]
    EmptyTitle,
}

// ---------------------------------------------------------------------------
// Task CRUD
// ---------------------------------------------------------------------------

/// Add a task built from `draft`. Returns the assigned ID.
pub fn add_task(book: &mut TaskBook, draft: NewTask, clock: &dyn Clock) -> Result<TaskId, TaskError> {
    let title = draft.title.trim().to_string();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    let now = clock.now();
    let id = Uuid::new_v4();

    let mut tags: Vec<String> = Vec::with_capacity(draft.tags.len());
    for tag in draft.tags {
        let tag = normalize_tag(&tag);
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let task = Task {
        id,
        title,
        description: draft.description,
        completed: draft.completed,
        created_at: now,
        updated_at: now,
        due_date: draft.due_date,
        priority: draft.priority,
        category: draft
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        estimated_minutes: draft.estimated_minutes,
        actual_minutes: draft.actual_minutes,
        notes: draft.notes,
        tags,
        subtasks: Vec::new(),
        difficulty: draft.difficulty,
        reward: draft.reward,
        energy_level: draft.energy_level,
        focus_required: draft.focus_required,
        is_recurring: draft.is_recurring,
        recurrence_pattern: draft.recurrence_pattern,
        completion_streak: 0,
        habit_id: draft.habit_id,
    };
    debug!(task = %id, title = %task.title, "task added");
    book.tasks.insert(id, task);
    Ok(id)
}

/// Apply every `Some` field of `patch` and re-stamp the update time.
pub fn update_task(
    book: &mut TaskBook,
    id: TaskId,
    patch: TaskPatch,
    clock: &dyn Clock,
) -> Result<(), TaskError> {
    if let Some(title) = &patch.title
        && title.trim().is_empty()
    {
        return Err(TaskError::EmptyTitle);
    }
    let task = find_task_mut(book, id)?;
    apply_patch(task, patch);
    task.updated_at = clock.now();
    debug!(task = %id, "task updated");
    Ok(())
}

fn apply_patch(task: &mut Task, patch: TaskPatch) {
    if let Some(title) = patch.title {
        task.title = title.trim().to_string();
    }
    if let Some(v) = patch.description {
        task.description = v;
    }
    if let Some(v) = patch.completed {
        task.completed = v;
    }
    if let Some(v) = patch.due_date {
        task.due_date = v;
    }
    if let Some(v) = patch.priority {
        task.priority = v;
    }
    if let Some(v) = patch.category {
        task.category = v;
    }
    if let Some(v) = patch.estimated_minutes {
        task.estimated_minutes = v;
    }
    if let Some(v) = patch.actual_minutes {
        task.actual_minutes = v;
    }
    if let Some(v) = patch.notes {
        task.notes = v;
    }
    if let Some(v) = patch.difficulty {
        task.difficulty = v;
    }
    if let Some(v) = patch.reward {
        task.reward = v;
    }
    if let Some(v) = patch.energy_level {
        task.energy_level = v;
    }
    if let Some(v) = patch.focus_required {
        task.focus_required = v;
    }
    if let Some(v) = patch.is_recurring {
        task.is_recurring = v;
    }
    if let Some(v) = patch.recurrence_pattern {
        task.recurrence_pattern = v;
    }
}

/// Flip completion. Completing bumps the streak, un-completing drops it
/// (never below zero). Returns the new completion state.
pub fn toggle_completion(book: &mut TaskBook, id: TaskId, clock: &dyn Clock) -> Result<bool, TaskError> {
    let task = find_task_mut(book, id)?;
    let completed = !task.completed;
    transition(task, completed);
    task.updated_at = clock.now();
    debug!(task = %id, completed, streak = task.completion_streak, "task toggled");
    Ok(completed)
}

fn transition(task: &mut Task, completed: bool) {
    task.completed = completed;
    task.completion_streak = if completed {
        task.completion_streak + 1
    } else {
        task.completion_streak.saturating_sub(1)
    };
}

/// Remove a task. Returns the removed record.
pub fn delete_task(book: &mut TaskBook, id: TaskId) -> Result<Task, TaskError> {
    let task = book.tasks.shift_remove(&id).ok_or(TaskError::NotFound(id))?;
    debug!(task = %id, "task deleted");
    Ok(task)
}

// ---------------------------------------------------------------------------
// Subtasks
// ---------------------------------------------------------------------------

/// Append a subtask. Returns the assigned subtask ID.
pub fn add_subtask(
    book: &mut TaskBook,
    task_id: TaskId,
    title: String,
    clock: &dyn Clock,
) -> Result<SubtaskId, TaskError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    let task = find_task_mut(book, task_id)?;
    let id = Uuid::new_v4();
    task.subtasks.push(Subtask {
        id,
        title,
        completed: false,
    });
    task.updated_at = clock.now();
    Ok(id)
}

pub fn update_subtask(
    book: &mut TaskBook,
    task_id: TaskId,
    subtask_id: SubtaskId,
    title: String,
    clock: &dyn Clock,
) -> Result<(), TaskError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    let task = find_task_mut(book, task_id)?;
    let sub = task
        .subtask_mut(subtask_id)
        .ok_or(TaskError::SubtaskNotFound(subtask_id))?;
    sub.title = title;
    task.updated_at = clock.now();
    Ok(())
}

/// Flip a subtask's completion. Returns the new state.
pub fn toggle_subtask(
    book: &mut TaskBook,
    task_id: TaskId,
    subtask_id: SubtaskId,
    clock: &dyn Clock,
) -> Result<bool, TaskError> {
    let task = find_task_mut(book, task_id)?;
    let sub = task
        .subtask_mut(subtask_id)
        .ok_or(TaskError::SubtaskNotFound(subtask_id))?;
    sub.completed = !sub.completed;
    let completed = sub.completed;
    task.updated_at = clock.now();
    Ok(completed)
}

pub fn delete_subtask(
    book: &mut TaskBook,
    task_id: TaskId,
    subtask_id: SubtaskId,
    clock: &dyn Clock,
) -> Result<(), TaskError> {
    let task = find_task_mut(book, task_id)?;
    let before = task.subtasks.len();
    task.subtasks.retain(|s| s.id != subtask_id);
    if task.subtasks.len() == before {
        return Err(TaskError::SubtaskNotFound(subtask_id));
    }
    task.updated_at = clock.now();
    Ok(())
}

// ---------------------------------------------------------------------------
// Category and tag vocabularies
// ---------------------------------------------------------------------------

/// Returns false if the category already existed.
pub fn add_category(book: &mut TaskBook, category: &str) -> bool {
    let category = category.trim();
    if category.is_empty() || book.categories.iter().any(|c| c == category) {
        return false;
    }
    book.categories.push(category.to_string());
    true
}

/// Drop a category from the vocabulary and move its tasks to
/// `Uncategorized`. Returns how many tasks were reassigned.
pub fn delete_category(book: &mut TaskBook, category: &str, clock: &dyn Clock) -> usize {
    book.categories.retain(|c| c != category);
    let now = clock.now();
    let mut moved = 0;
    for task in book.tasks.values_mut() {
        if task.category == category {
            task.category = UNCATEGORIZED.to_string();
            task.updated_at = now;
            moved += 1;
        }
    }
    debug!(category, moved, "category deleted");
    moved
}

/// Returns false if the tag already existed.
pub fn add_tag(book: &mut TaskBook, tag: &str) -> bool {
    let tag = normalize_tag(tag);
    if tag.is_empty() || book.tags.contains(&tag) {
        return false;
    }
    book.tags.push(tag);
    true
}

/// Drop a tag from the vocabulary and strip it from every task.
/// Returns how many tasks carried it.
pub fn delete_tag(book: &mut TaskBook, tag: &str, clock: &dyn Clock) -> usize {
    let tag = normalize_tag(tag);
    book.tags.retain(|t| *t != tag);
    let now = clock.now();
    let mut stripped = 0;
    for task in book.tasks.values_mut() {
        let before = task.tags.len();
        task.tags.retain(|t| *t != tag);
        if task.tags.len() != before {
            task.updated_at = now;
            stripped += 1;
        }
    }
    debug!(tag = %tag, stripped, "tag deleted");
    stripped
}

pub fn add_tag_to_task(
    book: &mut TaskBook,
    task_id: TaskId,
    tag: &str,
    clock: &dyn Clock,
) -> Result<(), TaskError> {
    let tag = normalize_tag(tag);
    let task = find_task_mut(book, task_id)?;
    if !tag.is_empty() && !task.tags.contains(&tag) {
        task.tags.push(tag);
        task.updated_at = clock.now();
    }
    Ok(())
}

pub fn remove_tag_from_task(
    book: &mut TaskBook,
    task_id: TaskId,
    tag: &str,
    clock: &dyn Clock,
) -> Result<(), TaskError> {
    let tag = normalize_tag(tag);
    let task = find_task_mut(book, task_id)?;
    let before = task.tags.len();
    task.tags.retain(|t| *t != tag);
    if task.tags.len() != before {
        task.updated_at = clock.now();
    }
    Ok(())
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_string()
}

// ---------------------------------------------------------------------------
// Lookup and filtering
// ---------------------------------------------------------------------------

pub fn find_task(book: &TaskBook, id: TaskId) -> Option<&Task> {
    book.tasks.get(&id)
}

pub fn find_task_mut(book: &mut TaskBook, id: TaskId) -> Result<&mut Task, TaskError> {
    book.tasks.get_mut(&id).ok_or(TaskError::NotFound(id))
}

/// Criteria for [`filter_tasks`]; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct TaskFilter<'a> {
    pub completed: Option<bool>,
    pub category: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub priority: Option<Level>,
    pub due_on: Option<NaiveDate>,
}

pub fn filter_tasks<'a>(book: &'a TaskBook, filter: &TaskFilter<'_>) -> Vec<&'a Task> {
    book.tasks
        .values()
        .filter(|t| filter.completed.is_none_or(|c| t.completed == c))
        .filter(|t| filter.category.is_none_or(|c| t.category == c))
        .filter(|t| filter.tag.is_none_or(|tag| t.has_tag(tag)))
        .filter(|t| filter.priority.is_none_or(|p| t.priority == p))
        .filter(|t| filter.due_on.is_none_or(|d| t.due_date == Some(d)))
        .collect()
}

pub fn pending_tasks(book: &TaskBook) -> Vec<&Task> {
    filter_tasks(
        book,
        &TaskFilter {
            completed: Some(false),
            ..Default::default()
        },
    )
}

pub fn tasks_due_on(book: &TaskBook, day: NaiveDate) -> Vec<&Task> {
    filter_tasks(
        book,
        &TaskFilter {
            due_on: Some(day),
            ..Default::default()
        },
    )
}
