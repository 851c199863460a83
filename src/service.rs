use crate::error::{AppError, AppResult};
use crate::reminder::{Reminder, ReminderList};
use crate::scheduler::AlarmScheduler;
use crate::sound::SoundFetcher;
use crate::storage::{Feed, Storage};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Entry point for the view layer.
///
/// Every reminder write is followed by a reschedule, so the armed timers
/// always reflect the stored fields.
pub struct ReminderService {
    storage: Arc<Storage>,
    scheduler: Arc<AlarmScheduler>,
    sounds: SoundFetcher,
}

impl ReminderService {
    pub fn new(storage: Arc<Storage>, scheduler: Arc<AlarmScheduler>, sounds: SoundFetcher) -> Self {
        Self {
            storage,
            scheduler,
            sounds,
        }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    // ============ Lists ============

    pub fn lists(&self) -> Vec<ReminderList> {
        self.storage.lists()
    }

    pub fn create_list(&self, name: &str) -> AppResult<ReminderList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("List name cannot be empty"));
        }
        let list = ReminderList::new(name);
        self.storage.insert_list(list.clone())?;
        log::info!("Created list {} ({})", list.name, list.id);
        Ok(list)
    }

    pub fn rename_list(&self, id: &str, name: &str) -> AppResult<ReminderList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("List name cannot be empty"));
        }
        let mut list = self
            .storage
            .list(id)
            .ok_or_else(|| AppError::not_found(format!("list {}", id)))?;
        list.name = name.to_string();
        self.storage.update_list(list.clone())?;
        Ok(list)
    }

    /// Delete a list and its reminders, disarming their timers
    pub fn delete_list(&self, id: &str) -> AppResult<()> {
        let removed = self.storage.delete_list(id)?;
        for reminder in &removed {
            self.scheduler.cancel(reminder);
        }
        log::info!("Deleted list {} with {} reminders", id, removed.len());
        Ok(())
    }

    // ============ Reminders ============

    pub fn reminders_for_list(&self, list_id: &str) -> Vec<Reminder> {
        self.storage.reminders_for_list(list_id)
    }

    pub fn reminder(&self, id: &str) -> AppResult<Reminder> {
        self.storage
            .reminder(id)
            .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))
    }

    pub fn add_reminder(&self, reminder: Reminder) -> AppResult<Reminder> {
        validate(&reminder)?;
        self.storage.insert_reminder(reminder.clone())?;
        self.scheduler.schedule(&reminder);
        Ok(reminder)
    }

    /// Store an edited reminder and re-arm it.
    ///
    /// The sound fetch fields belong to the fetcher, so the stored values win
    /// over whatever the caller read before the fetch moved on.
    pub fn update_reminder(&self, reminder: Reminder) -> AppResult<Reminder> {
        validate(&reminder)?;
        if self.storage.list(&reminder.list_id).is_none() {
            return Err(AppError::not_found(format!("list {}", reminder.list_id)));
        }

        let id = reminder.id.clone();
        let mut previous = None;
        let updated = self.storage.modify_reminder(&id, |stored| {
            previous = Some(stored.clone());
            let sound_fetch_state = stored.sound_fetch_state;
            let sound_fetch_progress = stored.sound_fetch_progress;
            let local_sound_path = stored.local_sound_path.take();
            *stored = Reminder {
                sound_fetch_state,
                sound_fetch_progress,
                local_sound_path,
                ..reminder
            };
        })?;

        // Repeat slots past the new count are out of reach of cancel(&updated)
        if let Some(previous) = previous {
            if previous.repeat_count > updated.repeat_count {
                self.scheduler.cancel(&previous);
            }
        }
        self.scheduler.schedule(&updated);
        Ok(updated)
    }

    /// Flip completion; completing disarms, un-completing re-arms a future due date
    pub fn toggle_completion(&self, id: &str) -> AppResult<Reminder> {
        let updated = self
            .storage
            .modify_reminder(id, |r| r.is_completed = !r.is_completed)?;
        self.scheduler.schedule(&updated);
        Ok(updated)
    }

    pub fn delete_reminder(&self, id: &str) -> AppResult<()> {
        match self.storage.delete_reminder(id)? {
            Some(removed) => {
                self.scheduler.cancel(&removed);
                Ok(())
            }
            None => Err(AppError::not_found(format!("reminder {}", id))),
        }
    }

    /// (active, completed) counts for a list
    pub fn counts_for_list(&self, list_id: &str) -> (usize, usize) {
        self.storage.counts_for_list(list_id)
    }

    pub fn watch_counts(&self, list_id: &str) -> Feed<(usize, usize)> {
        self.storage.watch_counts(list_id)
    }

    pub fn watch_reminders(&self) -> Feed<Vec<Reminder>> {
        self.storage.watch_reminders()
    }

    pub fn watch_list(&self, list_id: &str) -> Feed<Vec<Reminder>> {
        self.storage.watch_list(list_id)
    }

    pub fn watch_lists(&self) -> Feed<Vec<ReminderList>> {
        self.storage.watch_lists()
    }

    pub fn fetch_custom_sound(&self, reminder_id: &str, url: &str) -> AppResult<Option<JoinHandle<()>>> {
        self.sounds.fetch_custom_sound(reminder_id, url)
    }

    /// Arm timers for every stored reminder; returns how many were considered
    pub fn rearm_all(&self) -> usize {
        let reminders = self.storage.all_reminders();
        for reminder in &reminders {
            self.scheduler.schedule(reminder);
        }
        let overdue = reminders.iter().filter(|r| r.is_due()).count();
        log::info!(
            "Re-armed timers for {} reminders ({} already overdue)",
            reminders.len(),
            overdue
        );
        reminders.len()
    }
}

fn validate(reminder: &Reminder) -> AppResult<()> {
    if reminder.title.trim().is_empty() {
        return Err(AppError::validation("Reminder title cannot be empty"));
    }
    if reminder.repeat_count > 0 && reminder.repeat_interval_minutes == 0 {
        return Err(AppError::validation(
            "Repeat interval must be at least one minute",
        ));
    }
    Ok(())
}
