use crate::config::{DEFAULT_REMINDER_TITLE, DEFAULT_REPEAT_INTERVAL_MINUTES};
use crate::error::{AppError, AppResult};
use crate::reminder::{Priority, Reminder, SoundFetchState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frozen snapshot of a reminder carried by an armed timer.
///
/// A fired timer is handled from this snapshot alone; the store is not
/// consulted, so edits made after arming only apply once the reminder is
/// rescheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub reminder_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub list_id: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "enabled")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub remote_sound_url: Option<String>,
    #[serde(default)]
    pub local_sound_path: Option<String>,
    #[serde(default)]
    pub sound_fetch_state: SoundFetchState,
    #[serde(default)]
    pub sound_fetch_progress: Option<u8>,
    #[serde(default = "enabled")]
    pub vibrate_enabled: bool,
    #[serde(default)]
    pub repeat_count: u32,
    #[serde(default = "default_interval")]
    pub repeat_interval_minutes: u32,
    pub trigger_at: DateTime<Utc>,
    /// Repeats still to come after this fire; `None` on the primary timer
    #[serde(default)]
    pub remaining_repeats: Option<i64>,
    #[serde(default)]
    pub is_repeat: bool,
}

fn enabled() -> bool {
    true
}

fn default_interval() -> u32 {
    DEFAULT_REPEAT_INTERVAL_MINUTES
}

impl AlarmPayload {
    /// Payload for the primary timer at `trigger_at`
    pub fn primary(reminder: &Reminder, trigger_at: DateTime<Utc>) -> Self {
        Self {
            reminder_id: reminder.id.clone(),
            title: Some(reminder.title.clone()),
            notes: reminder.notes.clone(),
            list_id: reminder.list_id.clone(),
            priority: reminder.priority,
            sound_enabled: reminder.is_sound_enabled,
            remote_sound_url: reminder.remote_sound_url.clone(),
            local_sound_path: reminder.local_sound_path.clone(),
            sound_fetch_state: reminder.sound_fetch_state,
            sound_fetch_progress: reminder.sound_fetch_progress,
            vibrate_enabled: reminder.is_vibrate_enabled,
            repeat_count: reminder.repeat_count,
            repeat_interval_minutes: reminder.repeat_interval_minutes,
            trigger_at,
            remaining_repeats: None,
            is_repeat: false,
        }
    }

    /// Payload for a repeat timer with `remaining` repeats left after it
    pub fn repeat(reminder: &Reminder, trigger_at: DateTime<Utc>, remaining: i64) -> Self {
        Self {
            remaining_repeats: Some(remaining),
            is_repeat: true,
            ..Self::primary(reminder, trigger_at)
        }
    }

    /// Rebuild the reminder this payload was taken from.
    /// A fired reminder is by definition live: notifications on, not completed.
    pub fn to_reminder(&self) -> Reminder {
        let mut reminder = Reminder::new(
            self.list_id.clone(),
            self.title
                .clone()
                .unwrap_or_else(|| DEFAULT_REMINDER_TITLE.to_string()),
        );
        reminder.id = self.reminder_id.clone();
        reminder.notes = self.notes.clone();
        reminder.due_date = Some(self.trigger_at);
        reminder.priority = self.priority;
        reminder.is_sound_enabled = self.sound_enabled;
        reminder.remote_sound_url = self.remote_sound_url.clone();
        reminder.local_sound_path = self.local_sound_path.clone();
        reminder.sound_fetch_state = self.sound_fetch_state;
        reminder.sound_fetch_progress = self.sound_fetch_progress;
        reminder.is_vibrate_enabled = self.vibrate_enabled;
        reminder.repeat_count = self.repeat_count;
        reminder.repeat_interval_minutes = self.repeat_interval_minutes;
        reminder
    }

    pub fn encode(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|e| AppError::scheduling(e.to_string()))
    }

    pub fn decode(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw).map_err(|e| AppError::scheduling(e.to_string()))
    }
}
