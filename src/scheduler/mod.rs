mod payload;
mod timer;

use crate::reminder::Reminder;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use payload::AlarmPayload;
pub use timer::{TimerError, TimerId, TimerMode, TimerService, TokioTimerService};

/// Arms and disarms the timers derived from a reminder's current fields.
///
/// Nothing here returns an error: unmet preconditions are skipped, and timer
/// service failures are logged and degrade to an approximate timer or a no-op.
pub struct AlarmScheduler {
    timers: Arc<dyn TimerService>,
}

impl AlarmScheduler {
    pub fn new(timers: Arc<dyn TimerService>) -> Self {
        Self { timers }
    }

    /// Arm the primary timer at the due date, or cancel everything if the
    /// reminder should not fire.
    pub fn schedule(&self, reminder: &Reminder) {
        let due = match check_schedulable(reminder, Utc::now()) {
            Ok(due) => due,
            Err(reason) => {
                log::debug!("Not scheduling reminder {}: {}, cancelling", reminder.id, reason);
                self.cancel(reminder);
                return;
            }
        };

        let id = TimerId::Primary(reminder.id.clone());
        self.timers.cancel(&id);
        self.arm(id, due, AlarmPayload::primary(reminder, due));
    }

    /// Arm the repeat timer that fires at `reminder.due_date` with `remaining`
    /// repeats left after it. Does not touch any other timer.
    pub fn schedule_repeat(&self, reminder: &Reminder, remaining: i64) {
        let due = match check_schedulable(reminder, Utc::now()) {
            Ok(due) => due,
            Err(reason) => {
                log::debug!("Skipping repeat for reminder {}: {}", reminder.id, reason);
                return;
            }
        };

        if remaining < 0 {
            log::debug!("No repeats remaining for reminder {}, skipping", reminder.id);
            return;
        }

        let index = i64::from(reminder.repeat_count) - remaining - 1;
        let index = match u32::try_from(index) {
            Ok(index) => index,
            Err(_) => {
                log::warn!(
                    "Repeat {} of {} is out of range for reminder {}, skipping",
                    remaining,
                    reminder.repeat_count,
                    reminder.id
                );
                return;
            }
        };

        let id = TimerId::Repeat {
            reminder_id: reminder.id.clone(),
            index,
        };
        self.arm(id, due, AlarmPayload::repeat(reminder, due, remaining));
    }

    /// Disarm the primary timer and every repeat slot. Best-effort and idempotent.
    pub fn cancel(&self, reminder: &Reminder) {
        if self.timers.cancel(&TimerId::Primary(reminder.id.clone())) {
            log::debug!("Cancelled main alarm for reminder {}", reminder.id);
        }

        let cancelled = (0..reminder.repeat_count)
            .filter(|&index| {
                self.timers.cancel(&TimerId::Repeat {
                    reminder_id: reminder.id.clone(),
                    index,
                })
            })
            .count();
        if cancelled > 0 {
            log::debug!(
                "Cancelled {}/{} repeat alarms for reminder {}",
                cancelled,
                reminder.repeat_count,
                reminder.id
            );
        }
    }

    fn arm(&self, id: TimerId, at: DateTime<Utc>, payload: AlarmPayload) {
        let mode = if self.timers.can_schedule_exact() {
            TimerMode::Exact
        } else {
            log::warn!("Cannot schedule exact alarms, falling back to approximate for {}", id);
            TimerMode::Approximate
        };

        match self.timers.schedule_at(id.clone(), at, payload.clone(), mode) {
            Ok(()) => log::debug!("Scheduled alarm {} at {}", id, at),
            Err(TimerError::PermissionDenied(e)) if mode == TimerMode::Exact => {
                log::warn!("Exact alarm {} denied ({}), retrying approximate", id, e);
                match self
                    .timers
                    .schedule_at(id.clone(), at, payload, TimerMode::Approximate)
                {
                    Ok(()) => log::info!("Fallback to approximate alarm {} succeeded", id),
                    Err(e) => log::error!("Failed to schedule even fallback alarm {}: {}", id, e),
                }
            }
            Err(e) => log::error!("Failed to schedule alarm {}: {}", id, e),
        }
    }
}

/// Checks in order; the first failing one names why the reminder must not fire.
fn check_schedulable(reminder: &Reminder, now: DateTime<Utc>) -> Result<DateTime<Utc>, &'static str> {
    if !reminder.notifications_enabled {
        return Err("notifications disabled");
    }
    let due = reminder.due_date.ok_or("no due date")?;
    if due <= now {
        return Err("due date is in the past");
    }
    if reminder.is_completed {
        return Err("reminder is completed");
    }
    Ok(due)
}
