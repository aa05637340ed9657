use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::brain_dump::BrainDumpItem;
use crate::model::focus::{Achievement, FocusSession};
use crate::model::habit::{Habit, format_hhmm};
use crate::model::task::Task;
use crate::ops::check::{CheckError, CheckWarning};
use crate::ops::search::{HitOwner, SearchHit};
use crate::util::unicode::{first_line, truncate_to_width};

/// Characters of a UUID shown in human output
pub const SHORT_ID_LEN: usize = 8;

/// Widest a title may be in one-line listings
const TITLE_WIDTH: usize = 60;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HabitJson<'a> {
    #[serde(flatten)]
    pub habit: &'a Habit,
    pub current_run: u32,
    pub done_today: bool,
    pub linked_tasks: usize,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    pub kind: &'static str,
    pub id: Uuid,
    pub field: &'static str,
    pub text: String,
}

#[derive(Serialize)]
pub struct FocusStatusJson<'a> {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<&'a FocusSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_minutes: Option<i64>,
}

#[derive(Serialize)]
pub struct EndedSessionJson<'a> {
    pub session: &'a FocusSession,
    pub achievements: &'a [Achievement],
}

#[derive(Serialize)]
pub struct CreatedJson {
    pub id: Uuid,
}

pub fn search_hit_to_json(hit: &SearchHit) -> SearchHitJson {
    let (kind, id) = match hit.owner {
        HitOwner::Task(id) => ("task", id),
        HitOwner::Habit(id) => ("habit", id),
        HitOwner::BrainDump(id) => ("brain_dump", id),
    };
    SearchHitJson {
        kind,
        id,
        field: hit.field.label(),
        text: hit.text.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

pub fn short_id(id: &Uuid) -> String {
    let mut s = id.to_string();
    s.truncate(SHORT_ID_LEN);
    s
}

fn local_stamp(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn tags_suffix(tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let joined = tags
        .iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ");
    format!(" {}", joined)
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let check = if task.completed { 'x' } else { ' ' };
    let due = task
        .due_date
        .map(|d| format!(" (due {})", d))
        .unwrap_or_default();
    let (done, total) = task.subtask_progress();
    let progress = if total > 0 {
        format!(" [{}/{}]", done, total)
    } else {
        String::new()
    };
    format!(
        "[{}] {} {}{}{}{}",
        check,
        short_id(&task.id),
        truncate_to_width(&task.title, TITLE_WIDTH),
        progress,
        due,
        tags_suffix(&task.tags)
    )
}

/// Format detailed task view
pub fn format_task_detail(task: &Task) -> Vec<String> {
    let mut lines = Vec::new();
    let check = if task.completed { 'x' } else { ' ' };
    lines.push(format!("[{}] {} {}", check, task.id, task.title));
    lines.push(format!("category: {}", task.category));
    lines.push(format!("priority: {}", task.priority.as_str()));
    lines.push(format!(
        "energy: {}  focus: {}  difficulty: {}",
        task.energy_level.as_str(),
        task.focus_required.as_str(),
        task.difficulty.get()
    ));
    if let Some(due) = task.due_date {
        lines.push(format!("due: {}", due));
    }
    if let Some(m) = task.estimated_minutes {
        lines.push(format!("estimate: {} min", m));
    }
    if let Some(m) = task.actual_minutes {
        lines.push(format!("actual: {} min", m));
    }
    if !task.tags.is_empty() {
        lines.push(format!("tags:{}", tags_suffix(&task.tags)));
    }
    if let Some(reward) = &task.reward {
        lines.push(format!("reward: {}", reward));
    }
    if task.is_recurring {
        lines.push(format!(
            "recurring: {}",
            task.recurrence_pattern.as_deref().unwrap_or("yes")
        ));
    }
    if let Some(habit_id) = task.habit_id {
        lines.push(format!("habit: {}", short_id(&habit_id)));
    }
    if task.completion_streak > 0 {
        lines.push(format!("completion streak: {}", task.completion_streak));
    }
    for (label, text) in [("description", &task.description), ("notes", &task.notes)] {
        if let Some(text) = text {
            lines.push(format!("{}:", label));
            for line in text.lines() {
                lines.push(format!("  {}", line));
            }
        }
    }
    if !task.subtasks.is_empty() {
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for sub in &task.subtasks {
            let check = if sub.completed { 'x' } else { ' ' };
            lines.push(format!("  [{}] {} {}", check, short_id(&sub.id), sub.title));
        }
    }
    lines
}

fn habit_window(habit: &Habit) -> String {
    match (habit.start_time, habit.end_time) {
        (Some(s), Some(e)) => format!(" {}-{}", format_hhmm(s), format_hhmm(e)),
        (Some(s), None) => format!(" from {}", format_hhmm(s)),
        _ => String::new(),
    }
}

/// One-line habit summary with today's state and streak
pub fn format_habit_line(habit: &Habit, today: NaiveDate, run: u32) -> String {
    let check = if habit.is_completed_on(today) { 'x' } else { ' ' };
    format!(
        "[{}] {} {} ({}){}  streak {}",
        check,
        short_id(&habit.id),
        truncate_to_width(&habit.title, TITLE_WIDTH),
        habit.frequency.as_str(),
        habit_window(habit),
        run
    )
}

pub fn format_habit_detail(habit: &Habit, today: NaiveDate, run: u32, linked: usize) -> Vec<String> {
    let mut lines = vec![format!("{} {}", habit.id, habit.title)];
    lines.push(format!("frequency: {}", habit.frequency.as_str()));
    if let Some(custom) = &habit.custom_frequency {
        lines.push(format!("custom frequency: {}", custom));
    }
    let window = habit_window(habit);
    if !window.is_empty() {
        lines.push(format!("window:{}", window));
    }
    if let Some(r) = habit.reminder_time {
        lines.push(format!("reminder: {}", format_hhmm(r)));
    }
    if let Some(c) = &habit.category {
        lines.push(format!("category: {}", c));
    }
    lines.push(format!("difficulty: {}", habit.difficulty.get()));
    lines.push(format!(
        "streak: {} (current run {}), done today: {}",
        habit.streak,
        run,
        if habit.is_completed_on(today) { "yes" } else { "no" }
    ));
    lines.push(format!("calendar sync: {}", if habit.calendar_sync { "on" } else { "off" }));
    lines.push(format!("linked tasks: {}", linked));
    if let Some(m) = &habit.motivation {
        lines.push(format!("motivation: {}", m));
    }
    if let Some(d) = &habit.description {
        lines.push("description:".to_string());
        for line in d.lines() {
            lines.push(format!("  {}", line));
        }
    }
    let recent: Vec<String> = habit
        .completed_dates
        .iter()
        .rev()
        .take(7)
        .map(|d| d.to_string())
        .collect();
    if !recent.is_empty() {
        lines.push(format!("recent: {}", recent.join(", ")));
    }
    lines
}

pub fn format_session_line(session: &FocusSession) -> String {
    let rating = session
        .rating
        .map(|r| format!("  rating {}", r.get()))
        .unwrap_or_default();
    format!(
        "{} {}  {} min  {} distraction{}{}",
        short_id(&session.id),
        local_stamp(session.start_time),
        session.duration_minutes,
        session.distractions.len(),
        if session.distractions.len() == 1 { "" } else { "s" },
        rating
    )
}

pub fn format_achievement_line(a: &Achievement) -> String {
    format!(
        "{} {}: {} ({})",
        local_stamp(a.earned_at),
        a.title,
        a.description,
        a.icon
    )
}

pub fn format_item_line(item: &BrainDumpItem) -> String {
    let check = if item.processed { 'x' } else { ' ' };
    let task = item
        .converted_to_task_id
        .map(|t| format!(" -> {}", short_id(&t)))
        .unwrap_or_default();
    format!(
        "[{}] {} {}{}",
        check,
        short_id(&item.id),
        truncate_to_width(first_line(&item.content), TITLE_WIDTH),
        task
    )
}

pub fn format_search_hit(hit: &SearchHit, title: &str) -> String {
    let (kind, id) = match hit.owner {
        HitOwner::Task(id) => ("task", id),
        HitOwner::Habit(id) => ("habit", id),
        HitOwner::BrainDump(id) => ("dump", id),
    };
    let mut line = format!("{:<5} {} {}", kind, short_id(&id), title);
    if hit.text != title {
        line.push_str(&format!("  ({}: {})", hit.field.label(), first_line(&hit.text)));
    }
    line
}

pub fn format_check_error(err: &CheckError) -> String {
    match err {
        CheckError::DuplicateHabitTitle { title, habit_ids } => format!(
            "  habit title \"{}\" is shared by {}",
            title,
            habit_ids.iter().map(short_id).collect::<Vec<_>>().join(", ")
        ),
        CheckError::OrphanHabitTask { task_id, habit_id } => format!(
            "  task {} belongs to missing habit {}",
            short_id(task_id),
            short_id(habit_id)
        ),
        CheckError::DanglingBrainDumpLink { item_id, task_id } => format!(
            "  brain dump item {} points at missing task {}",
            short_id(item_id),
            short_id(task_id)
        ),
    }
}

pub fn format_check_warning(warn: &CheckWarning) -> String {
    match warn {
        CheckWarning::StaleSession { session_id, started } => format!(
            "  focus session {} has been open since {}",
            short_id(session_id),
            local_stamp(*started)
        ),
        CheckWarning::UnknownCategory { task_id, category } => format!(
            "  task {} uses unknown category \"{}\"",
            short_id(task_id),
            category
        ),
        CheckWarning::UnlinkedHabitTask { task_id, title } => format!(
            "  task {} \"{}\" is tagged habit but matches no habit",
            short_id(task_id),
            title
        ),
    }
}
