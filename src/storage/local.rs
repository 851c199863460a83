use crate::config::STORE_FILE_NAME;
use crate::error::AppResult;
use crate::storage::ReminderStore;
use std::fs;
use std::path::Path;

/// Load the store document from the app data directory
pub fn load_local(app_data_path: &Path) -> AppResult<ReminderStore> {
    let path = app_data_path.join(STORE_FILE_NAME);

    if !path.exists() {
        return Ok(ReminderStore::default());
    }

    let content = fs::read_to_string(&path)?;
    let data = serde_json::from_str::<ReminderStore>(&content)?;
    Ok(data)
}

/// Save the store document, replacing the previous file in one rename
pub fn save_local(app_data_path: &Path, data: &ReminderStore) -> AppResult<()> {
    let path = app_data_path.join(STORE_FILE_NAME);
    let tmp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(data)?;
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::reminder::{Reminder, ReminderList};

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();

        let store = load_local(temp_dir.path()).unwrap();
        assert!(store.lists.is_empty());
        assert!(store.reminders.is_empty());
    }

    #[test]
    fn test_save_and_load_keeps_reminder_fields() {
        let temp_dir = tempfile::tempdir().unwrap();

        let list = ReminderList::new("Home");
        let mut reminder = Reminder::new(&list.id, "Test");
        reminder.repeat_count = 3;
        let store = ReminderStore {
            lists: vec![list],
            reminders: vec![reminder.clone()],
        };

        save_local(temp_dir.path(), &store).unwrap();
        let loaded = load_local(temp_dir.path()).unwrap();

        assert_eq!(loaded.lists.len(), 1);
        assert_eq!(loaded.reminders, vec![reminder]);
        assert!(!temp_dir.path().join("reminders.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_a_storage_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(STORE_FILE_NAME), "{ not json").unwrap();

        let err = load_local(temp_dir.path()).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
