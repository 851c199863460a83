//! Countdown of repeat notifications after a reminder fires.
//!
//! The count lives only in the armed timer's payload. If the process dies
//! with timers armed, the remaining repeats are gone.

use crate::reminder::Reminder;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatStep {
    /// No more repeats: the counter ran out or the reminder is completed
    Done,
    /// Arm one more repeat at `trigger_at`, leaving `remaining` after it
    Next {
        trigger_at: DateTime<Utc>,
        remaining: i64,
    },
}

/// Decide what follows a fire that had `remaining` repeats still to come.
pub fn next_step(reminder: &Reminder, remaining: i64, now: DateTime<Utc>) -> RepeatStep {
    if remaining <= 0 || reminder.is_completed {
        return RepeatStep::Done;
    }
    RepeatStep::Next {
        trigger_at: now + Duration::minutes(i64::from(reminder.repeat_interval_minutes)),
        remaining: remaining - 1,
    }
}
