/// Application configuration constants
///
/// Centralized configuration for the reminder app.
use std::path::PathBuf;
use std::time::Duration;

/// How long a custom sound download may run before it is cancelled
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Minutes between repeats when a payload does not carry an interval
pub const DEFAULT_REPEAT_INTERVAL_MINUTES: u32 = 5;

/// Title used when a fired payload has lost its title
pub const DEFAULT_REMINDER_TITLE: &str = "Reminder";

/// Body shown when a reminder has no notes
pub const DEFAULT_NOTIFICATION_BODY: &str = "Your reminder is due!";

/// Audible channel (priority LOW and up, or any custom sound)
pub const CHANNEL_ID: &str = "reminder_channel_id";
pub const CHANNEL_NAME: &str = "Reminder Notifications";
pub const CHANNEL_DESCRIPTION: &str = "Shows notifications for reminders";

/// Silent channel for reminders without a priority
pub const SILENT_CHANNEL_ID: &str = "reminder_silent_channel_id";
pub const SILENT_CHANNEL_NAME: &str = "Silent Reminders";
pub const SILENT_CHANNEL_DESCRIPTION: &str = "Shows silent notifications for reminders";

/// Directory under the platform data dir holding the store and sounds
pub const DATA_DIR_NAME: &str = "ReminderLists";

/// Store document file name
pub const STORE_FILE_NAME: &str = "reminders.json";

/// Downloaded sounds live here, relative to the data dir
pub const SOUNDS_DIR_NAME: &str = "sounds";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "REMINDER_APP_DATA_DIR";

/// Resolve the data directory: `$REMINDER_APP_DATA_DIR`, else the local data dir
pub fn data_dir() -> Result<PathBuf, String> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_local_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .ok_or_else(|| "Failed to get local data dir".to_string())
}

/// File a reminder's custom sound is downloaded to
pub fn sound_file_name(reminder_id: &str) -> String {
    format!("reminder_{}.mp3", reminder_id)
}
