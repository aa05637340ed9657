use std::ops::Range;

use regex::Regex;

use crate::model::brain_dump::{BrainDump, ItemId};
use crate::model::habit::{HabitBook, HabitId};
use crate::model::task::{SubtaskId, Task, TaskBook, TaskId};

/// Which field of a task, habit or brain dump item matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Title,
    Description,
    Notes,
    Tag,
    /// A subtask title
    Subtask(SubtaskId),
    /// Brain dump item text
    Content,
}

impl MatchField {
    pub fn label(self) -> &'static str {
        match self {
            MatchField::Title => "title",
            MatchField::Description => "description",
            MatchField::Notes => "notes",
            MatchField::Tag => "tag",
            MatchField::Subtask(_) => "subtask",
            MatchField::Content => "content",
        }
    }
}

/// What a hit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOwner {
    Task(TaskId),
    Habit(HabitId),
    BrainDump(ItemId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub owner: HitOwner,
    pub field: MatchField,
    /// The text that was searched
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

fn check(re: &Regex, owner: HitOwner, field: MatchField, text: &str, hits: &mut Vec<SearchHit>) {
    let spans = find_matches(re, text);
    if !spans.is_empty() {
        hits.push(SearchHit {
            owner,
            field,
            text: text.to_string(),
            spans,
        });
    }
}

// ---------------------------------------------------------------------------
// Task search
// ---------------------------------------------------------------------------

/// Search every task in the book, completed ones included.
pub fn search_tasks(book: &TaskBook, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for task in book.tasks.values() {
        search_task(re, task, &mut hits);
    }
    hits
}

fn search_task(re: &Regex, task: &Task, hits: &mut Vec<SearchHit>) {
    let owner = HitOwner::Task(task.id);
    check(re, owner, MatchField::Title, &task.title, hits);
    if let Some(description) = &task.description {
        check(re, owner, MatchField::Description, description, hits);
    }
    if let Some(notes) = &task.notes {
        check(re, owner, MatchField::Notes, notes, hits);
    }
    for tag in &task.tags {
        check(re, owner, MatchField::Tag, tag, hits);
    }
    for sub in &task.subtasks {
        check(re, owner, MatchField::Subtask(sub.id), &sub.title, hits);
    }
}

// ---------------------------------------------------------------------------
// Habit and brain dump search
// ---------------------------------------------------------------------------

/// Search habits by title and description.
pub fn search_habits(habits: &HabitBook, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for habit in habits.habits.values() {
        let owner = HitOwner::Habit(habit.id);
        check(re, owner, MatchField::Title, &habit.title, &mut hits);
        if let Some(description) = &habit.description {
            check(re, owner, MatchField::Description, description, &mut hits);
        }
    }
    hits
}

/// Search brain dump items by content, processed ones included.
pub fn search_brain_dump(dump: &BrainDump, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for item in &dump.items {
        check(re, HitOwner::BrainDump(item.id), MatchField::Content, &item.content, &mut hits);
    }
    hits
}
