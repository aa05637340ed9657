use chrono::{Duration, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::focus::{
    Achievement, AchievementKind, Distraction, DistractionId, FocusLog, FocusSession, Rating,
    SessionId,
};
use crate::model::task::TaskId;
use crate::ops::achievements::{self, RULES, RuleContext};
use crate::ops::clock::{Clock, local_midnight, rounded_minutes};

/// Number of achievements shown as "recent"
pub const RECENT_ACHIEVEMENTS: usize = 5;

/// Error type for focus session operations
#[derive(Debug, thiserror::Error)]
pub enum FocusError {
    #[error("a focus session is already running (started {0})")]
    SessionAlreadyOpen(chrono::DateTime<chrono::Utc>),
    #[error("no achievement rule for {0:?}")]
    UnknownAchievement(AchievementKind),
}

/// Result of ending a session
#[derive(Debug, Clone)]
pub struct EndedSession {
    pub session: FocusSession,
    pub achievements: Vec<Achievement>,
}

/// Edits to the open session; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub task_id: Option<Option<TaskId>>,
    pub notes: Option<Option<String>>,
    pub pause_reason: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Session state machine
// ---------------------------------------------------------------------------

/// Open a new session. Only one may be open at a time.
pub fn start_session(
    log: &mut FocusLog,
    task_id: Option<TaskId>,
    clock: &dyn Clock,
) -> Result<SessionId, FocusError> {
    if let Some(current) = &log.current {
        return Err(FocusError::SessionAlreadyOpen(current.start_time));
    }
    let id = Uuid::new_v4();
    log.current = Some(FocusSession {
        id,
        start_time: clock.now(),
        end_time: None,
        duration_minutes: 0,
        task_id,
        notes: None,
        rating: None,
        distractions: Vec::new(),
        pause_reason: None,
    });
    debug!(session = %id, task = ?task_id, "focus session started");
    Ok(id)
}

/// Log a distraction against the open session. Returns `None` when no
/// session is open.
pub fn add_distraction(
    log: &mut FocusLog,
    description: Option<String>,
    clock: &dyn Clock,
) -> Option<DistractionId> {
    let current = log.current.as_mut()?;
    let id = Uuid::new_v4();
    current.distractions.push(Distraction {
        id,
        timestamp: clock.now(),
        description: description.filter(|d| !d.trim().is_empty()),
    });
    debug!(session = %current.id, count = current.distractions.len(), "distraction logged");
    Some(id)
}

/// Edit the open session. Returns false when no session is open.
pub fn update_current(log: &mut FocusLog, patch: SessionPatch) -> bool {
    let Some(current) = log.current.as_mut() else {
        return false;
    };
    if let Some(v) = patch.task_id {
        current.task_id = v;
    }
    if let Some(v) = patch.notes {
        current.notes = v;
    }
    if let Some(v) = patch.pause_reason {
        current.pause_reason = v;
    }
    true
}

/// Close the open session, file it in history, and award achievements.
/// Returns `None` when no session is open.
pub fn end_session(
    log: &mut FocusLog,
    notes: Option<String>,
    rating: Option<Rating>,
    clock: &dyn Clock,
) -> Option<EndedSession> {
    let mut session = log.current.take()?;
    let now = clock.now();
    session.end_time = Some(now);
    session.duration_minutes = rounded_minutes(session.start_time, now);
    if notes.is_some() {
        session.notes = notes;
    }
    if rating.is_some() {
        session.rating = rating;
    }
    log.sessions.push(session.clone());

    let ctx = RuleContext {
        session: &session,
        history: &log.sessions,
    };
    let earned = achievements::evaluate(&ctx, RULES, now);
    for a in &earned {
        info!(kind = a.kind.as_str(), title = %a.title, "achievement earned");
    }
    log.achievements.extend(earned.iter().cloned());
    debug!(
        session = %session.id,
        minutes = session.duration_minutes,
        distractions = session.distractions.len(),
        "focus session ended"
    );
    Some(EndedSession {
        session,
        achievements: earned,
    })
}

/// Award an achievement by hand using the canned descriptor for `kind`.
pub fn add_achievement<'a>(
    log: &'a mut FocusLog,
    kind: AchievementKind,
    clock: &dyn Clock,
) -> Result<&'a Achievement, FocusError> {
    let rule = achievements::rule_for(kind).ok_or(FocusError::UnknownAchievement(kind))?;
    log.achievements.push(Achievement {
        id: Uuid::new_v4(),
        kind,
        title: rule.title.to_string(),
        description: rule.description.to_string(),
        earned_at: clock.now(),
        icon: rule.icon.to_string(),
        level: rule.level,
    });
    Ok(&log.achievements[log.achievements.len() - 1])
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Minutes of live time in the open session, if any
pub fn elapsed_minutes(log: &FocusLog, clock: &dyn Clock) -> Option<i64> {
    log.current
        .as_ref()
        .map(|s| rounded_minutes(s.start_time, clock.now()))
}

/// All recorded focus time, counting the open session up to now.
pub fn total_focus_minutes(log: &FocusLog, clock: &dyn Clock) -> i64 {
    let finished: i64 = log.sessions.iter().map(|s| s.duration_minutes).sum();
    finished + elapsed_minutes(log, clock).unwrap_or(0)
}

/// Mean completed session length, rounded to whole minutes.
pub fn average_session_minutes(log: &FocusLog) -> i64 {
    if log.sessions.is_empty() {
        return 0;
    }
    let total: i64 = log.sessions.iter().map(|s| s.duration_minutes).sum();
    (total as f64 / log.sessions.len() as f64).round() as i64
}

/// Mean distractions per completed session, to one decimal place.
pub fn average_distractions(log: &FocusLog) -> f64 {
    if log.sessions.is_empty() {
        return 0.0;
    }
    let total: usize = log.sessions.iter().map(|s| s.distractions.len()).sum();
    (total as f64 / log.sessions.len() as f64 * 10.0).round() / 10.0
}

/// Completed sessions that started on the given local day.
pub fn sessions_on(log: &FocusLog, day: NaiveDate) -> Vec<&FocusSession> {
    let start = local_midnight(day);
    let end = local_midnight(day + Duration::days(1));
    log.sessions
        .iter()
        .filter(|s| s.start_time >= start && s.start_time < end)
        .collect()
}

/// The `n` most recently earned achievements, newest first.
pub fn recent_achievements(log: &FocusLog, n: usize) -> Vec<&Achievement> {
    let mut all: Vec<&Achievement> = log.achievements.iter().collect();
    all.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
    all.truncate(n);
    all
}

/// Summary numbers shown by `ff focus stats`
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FocusStats {
    pub sessions: usize,
    pub total_minutes: i64,
    pub average_minutes: i64,
    pub average_distractions: f64,
    pub achievements: usize,
    pub in_progress: bool,
}

pub fn stats(log: &FocusLog, clock: &dyn Clock) -> FocusStats {
    FocusStats {
        sessions: log.sessions.len(),
        total_minutes: total_focus_minutes(log, clock),
        average_minutes: average_session_minutes(log),
        average_distractions: average_distractions(log),
        achievements: log.achievements.len(),
        in_progress: log.current.is_some(),
    }
}
