//! Calendar export: habits with a time window become iCalendar events.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::model::habit::{Habit, HabitBook, HabitId};

/// Default file name for `ff export`
pub const DEFAULT_EXPORT_FILE: &str = "focusflow-calendar.ics";

const PRODID: &str = "-//FocusFlow//EN";
/// Content lines longer than this many octets are folded
const FOLD_AT: usize = 75;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Stable event id, `habit-<habit id>`
    pub id: String,
    pub title: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub description: Option<String>,
    pub habit_id: HabitId,
}

fn habit_event(habit: &Habit) -> Option<CalendarEvent> {
    if !habit.calendar_sync {
        return None;
    }
    Some(CalendarEvent {
        id: format!("habit-{}", habit.id),
        title: habit.title.clone(),
        start: habit.start_time?,
        end: habit.end_time?,
        description: habit.description.clone(),
        habit_id: habit.id,
    })
}

/// Events for every habit that opted into calendar sync and has both
/// a start and an end time.
pub fn habit_events(habits: &HabitBook) -> Vec<CalendarEvent> {
    habits.habits.values().filter_map(habit_event).collect()
}

/// Render events as an iCalendar document placed on `day`.
///
/// Times are floating local times. An event whose end is not after its
/// start ends on the following day. `stamp` is the export time, written
/// in UTC as each event's DTSTAMP. Lines end in CRLF.
pub fn to_icalendar(events: &[CalendarEvent], day: NaiveDate, stamp: DateTime<Utc>) -> String {
    let dtstamp = format!("{}Z", format_datetime(stamp.naive_utc()));
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".into(),
        format!("PRODID:{}", PRODID),
        "VERSION:2.0".into(),
        "CALSCALE:GREGORIAN".into(),
    ];
    for event in events {
        let start = day.and_time(event.start);
        let mut end = day.and_time(event.end);
        if end <= start {
            end += Duration::days(1);
        }
        lines.push("BEGIN:VEVENT".into());
        lines.push(format!("UID:{}@focusflow", event.id));
        lines.push(format!("DTSTAMP:{}", dtstamp));
        lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
        lines.push(format!("DTSTART:{}", format_datetime(start)));
        lines.push(format!("DTEND:{}", format_datetime(end)));
        lines.push(format!(
            "DESCRIPTION:{}",
            escape_text(event.description.as_deref().unwrap_or(""))
        ));
        lines.push("END:VEVENT".into());
    }
    lines.push("END:VCALENDAR".into());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

fn format_datetime(t: NaiveDateTime) -> String {
    t.format("%Y%m%dT%H%M%S").to_string()
}

/// Escape a TEXT value: backslash, semicolon, comma and newlines.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Split a content line into chunks of at most 75 octets, continuation
/// chunks prefixed with a space. Never splits inside a UTF-8 sequence.
fn fold_line(line: &str) -> String {
    if line.len() <= FOLD_AT {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / FOLD_AT * 3);
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        // continuation lines spend one octet on the leading space
        if width + len > FOLD_AT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out
}
