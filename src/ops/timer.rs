//! Pomodoro timer state machine.
//!
//! `Timer` is pure countdown state driven one second at a time by `tick`.
//! `TimerSession` couples a timer to the focus log so that pomodoros open
//! and close focus sessions.

use tracing::debug;

use crate::model::config::TimerConfig;
use crate::model::focus::FocusLog;
use crate::model::task::TaskId;
use crate::ops::clock::Clock;
use crate::ops::focus_ops::{self, EndedSession, FocusError, SessionPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Pomodoro => "Focus Time",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }
}

/// Parse a mode name as accepted on the command line
pub fn parse_mode(s: &str) -> Option<TimerMode> {
    match s.to_ascii_lowercase().as_str() {
        "pomodoro" | "focus" => Some(TimerMode::Pomodoro),
        "short" | "short-break" | "shortbreak" => Some(TimerMode::ShortBreak),
        "long" | "long-break" | "longbreak" => Some(TimerMode::LongBreak),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

/// A finished phase, reported by `tick`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub finished: TimerMode,
    pub next: TimerMode,
    /// Whether the next phase started on its own
    pub auto_started: bool,
}

#[derive(Debug, Clone)]
pub struct Timer {
    config: TimerConfig,
    mode: TimerMode,
    status: TimerStatus,
    remaining_secs: u32,
    completed_pomodoros: u32,
}

impl Timer {
    pub fn new(config: TimerConfig) -> Self {
        let mut timer = Timer {
            config,
            mode: TimerMode::Pomodoro,
            status: TimerStatus::Idle,
            remaining_secs: 0,
            completed_pomodoros: 0,
        };
        timer.remaining_secs = timer.length_secs(TimerMode::Pomodoro);
        timer
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    /// Full length of a phase in seconds
    pub fn length_secs(&self, mode: TimerMode) -> u32 {
        let minutes = match mode {
            TimerMode::Pomodoro => self.config.pomodoro_minutes,
            TimerMode::ShortBreak => self.config.short_break_minutes,
            TimerMode::LongBreak => self.config.long_break_minutes,
        };
        minutes.saturating_mul(60)
    }

    /// Switch to another mode, idle with its full length.
    pub fn set_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.status = TimerStatus::Idle;
        self.remaining_secs = self.length_secs(mode);
    }

    /// Idle, Paused or Completed becomes Running. Returns the status it
    /// left.
    pub fn start(&mut self) -> Option<TimerStatus> {
        match self.status {
            TimerStatus::Idle | TimerStatus::Paused | TimerStatus::Completed => {
                let was = self.status;
                self.status = TimerStatus::Running;
                Some(was)
            }
            _ => None,
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
            true
        } else {
            false
        }
    }

    /// One second passes. Returns the phase change when the countdown
    /// reaches zero. The next mode is then loaded at full length and either
    /// runs or waits as Completed until `start`.
    pub fn tick(&mut self) -> Option<PhaseChange> {
        if self.status != TimerStatus::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return None;
        }

        let finished = self.mode;
        let (next, auto) = match finished {
            TimerMode::Pomodoro => {
                self.completed_pomodoros += 1;
                let every = self.config.pomodoros_until_long_break.max(1);
                let next = if self.completed_pomodoros % every == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                };
                (next, self.config.auto_start_breaks)
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => {
                (TimerMode::Pomodoro, self.config.auto_start_pomodoros)
            }
        };
        self.set_mode(next);
        self.status = if auto {
            TimerStatus::Running
        } else {
            TimerStatus::Completed
        };
        debug!(
            finished = finished.label(),
            next = next.label(),
            completed = self.completed_pomodoros,
            "timer phase finished"
        );
        Some(PhaseChange {
            finished,
            next,
            auto_started: auto,
        })
    }

    /// Back to idle with the full length of the current mode.
    pub fn reset(&mut self) {
        self.set_mode(self.mode);
    }

    /// Abandon the current phase. Pomodoro goes to a short break, any
    /// break goes to a pomodoro. Returns the mode that was skipped.
    pub fn skip(&mut self) -> TimerMode {
        let skipped = self.mode;
        let next = match skipped {
            TimerMode::Pomodoro => TimerMode::ShortBreak,
            _ => TimerMode::Pomodoro,
        };
        self.set_mode(next);
        skipped
    }

    /// Fraction of the current phase elapsed, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        let total = self.length_secs(self.mode);
        if total == 0 {
            return 1.0;
        }
        let elapsed = total.saturating_sub(self.remaining_secs);
        f64::from(elapsed) / f64::from(total)
    }

    /// Remaining time as `MM:SS`
    pub fn format_remaining(&self) -> String {
        format_secs(self.remaining_secs)
    }
}

pub fn format_secs(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// What happened to the focus log as a result of a timer action
#[derive(Debug, Default)]
pub struct TimerOutcome {
    pub phase: Option<PhaseChange>,
    pub ended: Option<EndedSession>,
    pub started: bool,
}

/// A timer wired to the focus log: pomodoros open a session when they
/// start from idle and close it when they finish, reset or get skipped.
#[derive(Debug, Clone)]
pub struct TimerSession {
    pub timer: Timer,
    pub task_id: Option<TaskId>,
}

impl TimerSession {
    pub fn new(config: TimerConfig, task_id: Option<TaskId>) -> Self {
        TimerSession {
            timer: Timer::new(config),
            task_id,
        }
    }

    fn open_session(&self, log: &mut FocusLog, clock: &dyn Clock) -> Result<bool, FocusError> {
        // Adopt a session the user already opened by hand
        if log.current.is_some() {
            return Ok(false);
        }
        focus_ops::start_session(log, self.task_id, clock)?;
        Ok(true)
    }

    pub fn start(&mut self, log: &mut FocusLog, clock: &dyn Clock) -> Result<TimerOutcome, FocusError> {
        let mut outcome = TimerOutcome::default();
        let fresh = matches!(
            self.timer.start(),
            Some(TimerStatus::Idle | TimerStatus::Completed)
        );
        if fresh && self.timer.mode() == TimerMode::Pomodoro {
            outcome.started = self.open_session(log, clock)?;
        }
        Ok(outcome)
    }

    /// Pause; a non-empty reason is logged as a distraction and kept as
    /// the session's pause reason.
    pub fn pause(&mut self, log: &mut FocusLog, reason: Option<&str>, clock: &dyn Clock) -> bool {
        if !self.timer.pause() {
            return false;
        }
        if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty())
            && log.current.is_some()
        {
            focus_ops::add_distraction(log, Some(reason.to_string()), clock);
            focus_ops::update_current(
                log,
                SessionPatch {
                    pause_reason: Some(Some(reason.to_string())),
                    ..Default::default()
                },
            );
        }
        true
    }

    pub fn tick(&mut self, log: &mut FocusLog, clock: &dyn Clock) -> Result<TimerOutcome, FocusError> {
        let mut outcome = TimerOutcome::default();
        let Some(change) = self.timer.tick() else {
            return Ok(outcome);
        };
        if change.finished == TimerMode::Pomodoro {
            outcome.ended = focus_ops::end_session(log, None, None, clock);
        }
        if change.next == TimerMode::Pomodoro && change.auto_started {
            outcome.started = self.open_session(log, clock)?;
        }
        outcome.phase = Some(change);
        Ok(outcome)
    }

    pub fn reset(&mut self, log: &mut FocusLog, clock: &dyn Clock) -> Option<EndedSession> {
        let was = self.timer.mode();
        self.timer.reset();
        if was == TimerMode::Pomodoro {
            focus_ops::end_session(log, None, None, clock)
        } else {
            None
        }
    }

    pub fn skip(&mut self, log: &mut FocusLog, clock: &dyn Clock) -> Option<EndedSession> {
        if self.timer.skip() == TimerMode::Pomodoro {
            focus_ops::end_session(log, None, None, clock)
        } else {
            None
        }
    }
}
