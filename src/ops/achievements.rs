//! Achievement rules, evaluated when a focus session ends.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::focus::{Achievement, AchievementKind, AchievementLevel, FocusSession};

/// Minimum length of a session that counts as focused work
pub const FOCUSED_MINUTES: i64 = 25;
/// Minimum length of a marathon session
pub const MARATHON_MINUTES: i64 = 50;
/// Sessions in a row needed for a streak
pub const STREAK_LENGTH: usize = 3;
/// Most distractions a streak session may have
pub const STREAK_MAX_DISTRACTIONS: usize = 1;

/// What a rule sees: the session that just ended, and the full history
/// (which already ends with that session).
pub struct RuleContext<'a> {
    pub session: &'a FocusSession,
    pub history: &'a [FocusSession],
}

/// A predicate paired with the achievement it awards
pub struct AchievementRule {
    pub kind: AchievementKind,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub level: AchievementLevel,
    pub earned: fn(&RuleContext<'_>) -> bool,
}

impl AchievementRule {
    fn award(&self, earned_at: DateTime<Utc>) -> Achievement {
        Achievement {
            id: Uuid::new_v4(),
            kind: self.kind,
            title: self.title.to_string(),
            description: self.description.to_string(),
            earned_at,
            icon: self.icon.to_string(),
            level: self.level,
        }
    }
}

pub const RULES: &[AchievementRule] = &[
    AchievementRule {
        kind: AchievementKind::NoDistractions,
        title: "Deep Focus",
        description: "Completed a session without any distractions",
        icon: "Zap",
        level: AchievementLevel::Gold,
        earned: deep_focus,
    },
    AchievementRule {
        kind: AchievementKind::LongSession,
        title: "Marathon Focus",
        description: "Maintained focus for over 50 minutes",
        icon: "Clock",
        level: AchievementLevel::Gold,
        earned: marathon,
    },
    AchievementRule {
        kind: AchievementKind::FocusStreak,
        title: "Focus Streak",
        description: "Completed 3 productive sessions in a row",
        icon: "Trophy",
        level: AchievementLevel::Gold,
        earned: focus_streak,
    },
];

fn deep_focus(ctx: &RuleContext<'_>) -> bool {
    ctx.session.distractions.is_empty() && ctx.session.duration_minutes >= FOCUSED_MINUTES
}

fn marathon(ctx: &RuleContext<'_>) -> bool {
    ctx.session.duration_minutes >= MARATHON_MINUTES
}

fn focus_streak(ctx: &RuleContext<'_>) -> bool {
    if ctx.history.len() < STREAK_LENGTH {
        return false;
    }
    ctx.history[ctx.history.len() - STREAK_LENGTH..]
        .iter()
        .all(|s| {
            s.duration_minutes >= FOCUSED_MINUTES
                && s.distractions.len() <= STREAK_MAX_DISTRACTIONS
        })
}

/// Run every rule and return the achievements earned.
pub fn evaluate(ctx: &RuleContext<'_>, rules: &[AchievementRule], now: DateTime<Utc>) -> Vec<Achievement> {
    rules
        .iter()
        .filter(|rule| (rule.earned)(ctx))
        .map(|rule| rule.award(now))
        .collect()
}

/// Look up the canned descriptor for a kind, for manual awards
pub fn rule_for(kind: AchievementKind) -> Option<&'static AchievementRule> {
    RULES.iter().find(|r| r.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::focus::Distraction;

    fn session(minutes: i64, distractions: usize) -> FocusSession {
        let now = Utc::now();
        FocusSession {
            id: Uuid::new_v4(),
            start_time: now,
            end_time: Some(now),
            duration_minutes: minutes,
            task_id: None,
            notes: None,
            rating: None,
            distractions: (0..distractions)
                .map(|_| Distraction {
                    id: Uuid::new_v4(),
                    timestamp: now,
                    description: None,
                })
                .collect(),
            pause_reason: None,
        }
    }

    fn kinds(history: &[FocusSession]) -> Vec<AchievementKind> {
        let ctx = RuleContext {
            session: history.last().unwrap(),
            history,
        };
        evaluate(&ctx, RULES, Utc::now())
            .into_iter()
            .map(|a| a.kind)
            .collect()
    }

    #[test]
    fn deep_focus_threshold() {
        assert_eq!(kinds(&[session(25, 0)]), vec![AchievementKind::NoDistractions]);
        assert!(kinds(&[session(24, 0)]).is_empty());
        assert!(kinds(&[session(30, 1)]).is_empty());
    }

    #[test]
    fn marathon_needs_fifty_minutes() {
        assert_eq!(
            kinds(&[session(50, 2)]),
            vec![AchievementKind::LongSession]
        );
        assert_eq!(
            kinds(&[session(55, 0)]),
            vec![AchievementKind::NoDistractions, AchievementKind::LongSession]
        );
    }

    #[test]
    fn streak_over_last_three() {
        let history = vec![session(25, 1), session(30, 1), session(26, 1)];
        assert_eq!(kinds(&history), vec![AchievementKind::FocusStreak]);

        let broken = vec![session(25, 1), session(20, 0), session(26, 1)];
        assert!(!kinds(&broken).contains(&AchievementKind::FocusStreak));

        let too_short = vec![session(30, 0), session(30, 0)];
        assert!(!kinds(&too_short).contains(&AchievementKind::FocusStreak));
    }

    #[test]
    fn streak_ignores_older_sessions() {
        let history = vec![session(5, 4), session(25, 0), session(25, 1), session(25, 0)];
        assert!(kinds(&history).contains(&AchievementKind::FocusStreak));
    }

    #[test]
    fn awards_carry_descriptor_fields() {
        let history = [session(25, 0)];
        let ctx = RuleContext {
            session: &history[0],
            history: &history,
        };
        let awarded = evaluate(&ctx, RULES, Utc::now());
        assert_eq!(awarded[0].title, "Deep Focus");
        assert_eq!(awarded[0].icon, "Zap");
        assert_eq!(awarded[0].level, AchievementLevel::Gold);
    }
}
