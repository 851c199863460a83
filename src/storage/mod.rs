mod feed;
mod local;

use crate::error::{AppError, AppResult};
use crate::reminder::{Reminder, ReminderList};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

pub use feed::Feed;

/// Persisted document holding every list and reminder
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReminderStore {
    pub lists: Vec<ReminderList>,
    pub reminders: Vec<Reminder>,
}

/// Reminder and list records, persisted as JSON, with change notification for feeds
pub struct Storage {
    data: Mutex<ReminderStore>,
    app_data_path: Option<PathBuf>,
    revision: watch::Sender<u64>,
}

impl Storage {
    /// Open (or create) the store under `app_data_path`
    pub fn open(app_data_path: impl Into<PathBuf>) -> AppResult<Self> {
        let app_data_path = app_data_path.into();
        fs::create_dir_all(&app_data_path)?;

        let data = local::load_local(&app_data_path)?;
        log::info!(
            "Loaded {} lists, {} reminders from {}",
            data.lists.len(),
            data.reminders.len(),
            app_data_path.display()
        );

        Ok(Self::with_data(data, Some(app_data_path)))
    }

    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self::with_data(ReminderStore::default(), None)
    }

    fn with_data(data: ReminderStore, app_data_path: Option<PathBuf>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            data: Mutex::new(data),
            app_data_path,
            revision,
        }
    }

    pub fn app_data_path(&self) -> Option<&Path> {
        self.app_data_path.as_deref()
    }

    /// Lock the document, recovering from poison if needed
    fn lock(&self) -> MutexGuard<'_, ReminderStore> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `change` to a copy under the lock, persist it, then swap it in
    /// and wake feeds. A failed change or save leaves the document untouched.
    /// Sequential writes from one caller land in call order.
    fn write<T>(
        &self,
        change: impl FnOnce(&mut ReminderStore) -> AppResult<T>,
    ) -> AppResult<T> {
        let result = {
            let mut data = self.lock();
            let mut next = data.clone();
            let result = change(&mut next)?;
            if let Some(path) = &self.app_data_path {
                local::save_local(path, &next)?;
            }
            *data = next;
            result
        };
        self.revision.send_modify(|rev| *rev += 1);
        Ok(result)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ============ Lists ============

    pub fn lists(&self) -> Vec<ReminderList> {
        let mut lists = self.lock().lists.clone();
        lists.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        lists
    }

    pub fn list(&self, id: &str) -> Option<ReminderList> {
        self.lock().lists.iter().find(|l| l.id == id).cloned()
    }

    pub fn insert_list(&self, list: ReminderList) -> AppResult<()> {
        self.write(|data| {
            if data.lists.iter().any(|l| l.id == list.id) {
                return Err(AppError::validation(format!("List {} already exists", list.id)));
            }
            data.lists.push(list);
            Ok(())
        })
    }

    pub fn update_list(&self, list: ReminderList) -> AppResult<()> {
        self.write(|data| {
            let existing = data
                .lists
                .iter_mut()
                .find(|l| l.id == list.id)
                .ok_or_else(|| AppError::not_found(format!("list {}", list.id)))?;
            *existing = list;
            Ok(())
        })
    }

    /// Delete a list together with its reminders; returns the removed reminders
    pub fn delete_list(&self, id: &str) -> AppResult<Vec<Reminder>> {
        self.write(|data| {
            data.lists.retain(|l| l.id != id);
            let (removed, kept): (Vec<Reminder>, Vec<Reminder>) = data
                .reminders
                .drain(..)
                .partition(|r| r.list_id == id);
            data.reminders = kept;
            Ok(removed)
        })
    }

    // ============ Reminders ============

    pub fn reminders_for_list(&self, list_id: &str) -> Vec<Reminder> {
        let mut reminders: Vec<Reminder> = self
            .lock()
            .reminders
            .iter()
            .filter(|r| r.list_id == list_id)
            .cloned()
            .collect();
        reminders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        reminders
    }

    /// (active, completed) counts of one list
    pub fn counts_for_list(&self, list_id: &str) -> (usize, usize) {
        let data = self.lock();
        let (completed, active): (Vec<&Reminder>, Vec<&Reminder>) = data
            .reminders
            .iter()
            .filter(|r| r.list_id == list_id)
            .partition(|r| r.is_completed);
        (active.len(), completed.len())
    }

    pub fn all_reminders(&self) -> Vec<Reminder> {
        self.lock().reminders.clone()
    }

    pub fn reminder(&self, id: &str) -> Option<Reminder> {
        self.lock().reminders.iter().find(|r| r.id == id).cloned()
    }

    pub fn insert_reminder(&self, reminder: Reminder) -> AppResult<()> {
        self.write(|data| {
            if !data.lists.iter().any(|l| l.id == reminder.list_id) {
                return Err(AppError::not_found(format!("list {}", reminder.list_id)));
            }
            if data.reminders.iter().any(|r| r.id == reminder.id) {
                return Err(AppError::validation(format!(
                    "Reminder {} already exists",
                    reminder.id
                )));
            }
            data.reminders.push(reminder);
            Ok(())
        })
    }

    /// Replace the stored reminder wholesale (last write wins)
    pub fn update_reminder(&self, reminder: Reminder) -> AppResult<()> {
        self.write(|data| {
            let existing = data
                .reminders
                .iter_mut()
                .find(|r| r.id == reminder.id)
                .ok_or_else(|| AppError::not_found(format!("reminder {}", reminder.id)))?;
            *existing = reminder;
            Ok(())
        })
    }

    /// Patch the latest stored copy of a reminder in place and return it.
    /// Fields `modify` does not touch keep whatever concurrent writers stored.
    pub fn modify_reminder(
        &self,
        id: &str,
        modify: impl FnOnce(&mut Reminder),
    ) -> AppResult<Reminder> {
        self.write(|data| {
            let existing = data
                .reminders
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))?;
            modify(existing);
            Ok(existing.clone())
        })
    }

    pub fn delete_reminder(&self, id: &str) -> AppResult<Option<Reminder>> {
        self.write(|data| {
            let pos = data.reminders.iter().position(|r| r.id == id);
            Ok(pos.map(|pos| data.reminders.remove(pos)))
        })
    }

    // ============ Feeds ============

    /// Reminders of one list, re-queried on every store change
    pub fn watch_list(self: &Arc<Self>, list_id: &str) -> Feed<Vec<Reminder>> {
        let list_id = list_id.to_string();
        Feed::new(self.clone(), move |storage| storage.reminders_for_list(&list_id))
    }

    pub fn watch_lists(self: &Arc<Self>) -> Feed<Vec<ReminderList>> {
        Feed::new(self.clone(), |storage| storage.lists())
    }

    /// (active, completed) counts of one list, re-queried on every store change
    pub fn watch_counts(self: &Arc<Self>, list_id: &str) -> Feed<(usize, usize)> {
        let list_id = list_id.to_string();
        Feed::new(self.clone(), move |storage| storage.counts_for_list(&list_id))
    }

    pub fn watch_reminders(self: &Arc<Self>) -> Feed<Vec<Reminder>> {
        Feed::new(self.clone(), |storage| storage.all_reminders())
    }
}
