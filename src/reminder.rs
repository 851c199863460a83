use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_REPEAT_INTERVAL_MINUTES;

/// Ordered so that `None < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// Lifecycle of a custom sound download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundFetchState {
    #[default]
    Idle,
    Fetching,
    Fetched,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderList {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl ReminderList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub notes: Option<String>,
    pub list_id: String,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub priority: Priority,
    pub notifications_enabled: bool,
    pub is_sound_enabled: bool,
    pub remote_sound_url: Option<String>,
    pub local_sound_path: Option<String>,
    pub sound_fetch_state: SoundFetchState,
    pub sound_fetch_progress: Option<u8>,
    pub is_vibrate_enabled: bool,
    /// Total planned repeats after the primary fire
    pub repeat_count: u32,
    pub repeat_interval_minutes: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>, // Store-defined order within a list
}

impl Reminder {
    pub fn new(list_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            notes: None,
            list_id: list_id.into(),
            due_date: None,
            is_completed: false,
            priority: Priority::None,
            notifications_enabled: true,
            is_sound_enabled: true,
            remote_sound_url: None,
            local_sound_path: None,
            sound_fetch_state: SoundFetchState::Idle,
            sound_fetch_progress: None,
            is_vibrate_enabled: true,
            repeat_count: 0,
            repeat_interval_minutes: DEFAULT_REPEAT_INTERVAL_MINUTES,
            created_at: Utc::now(),
        }
    }

    pub fn is_due(&self) -> bool {
        if self.is_completed {
            return false;
        }
        match self.due_date {
            Some(due) => due <= Utc::now(),
            None => false,
        }
    }

    /// A fetched custom sound is only used while sound is on and the file is known
    pub fn uses_custom_sound(&self) -> bool {
        self.is_sound_enabled
            && self.sound_fetch_state == SoundFetchState::Fetched
            && self.local_sound_path.is_some()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
