use super::Storage;
use std::sync::Arc;
use tokio::sync::watch;

/// A query over the store that can be awaited for fresh results after each write.
pub struct Feed<T> {
    storage: Arc<Storage>,
    changes: watch::Receiver<u64>,
    query: Box<dyn Fn(&Storage) -> T + Send + Sync>,
}

impl<T> Feed<T> {
    pub(super) fn new(
        storage: Arc<Storage>,
        query: impl Fn(&Storage) -> T + Send + Sync + 'static,
    ) -> Self {
        let mut changes = storage.subscribe();
        changes.borrow_and_update();
        Self {
            storage,
            changes,
            query: Box::new(query),
        }
    }

    /// Current result, without waiting
    pub fn current(&self) -> T {
        (self.query)(&self.storage)
    }

    /// Wait for the next store write and return the re-run query.
    /// Several writes between two calls collapse into one result.
    pub async fn changed(&mut self) -> Option<T> {
        self.changes.changed().await.ok()?;
        self.changes.borrow_and_update();
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use crate::reminder::{Reminder, ReminderList};
    use crate::storage::Storage;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_feed_yields_after_write() {
        let storage = Arc::new(Storage::in_memory());
        let list = ReminderList::new("Inbox");
        storage.insert_list(list.clone()).unwrap();

        let mut feed = storage.watch_list(&list.id);
        assert!(feed.current().is_empty());

        storage.insert_reminder(Reminder::new(&list.id, "a")).unwrap();
        let reminders = feed.changed().await.unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].title, "a");
    }

    #[tokio::test]
    async fn test_counts_feed_follows_completion() {
        let storage = Arc::new(Storage::in_memory());
        let list = ReminderList::new("Inbox");
        storage.insert_list(list.clone()).unwrap();
        let reminder = Reminder::new(&list.id, "a");
        storage.insert_reminder(reminder.clone()).unwrap();

        let mut counts = storage.watch_counts(&list.id);
        assert_eq!(counts.current(), (1, 0));

        storage
            .modify_reminder(&reminder.id, |r| r.is_completed = true)
            .unwrap();
        assert_eq!(counts.changed().await, Some((0, 1)));
    }

    #[tokio::test]
    async fn test_lists_feed_collapses_writes() {
        let storage = Arc::new(Storage::in_memory());
        let mut feed = storage.watch_lists();

        storage.insert_list(ReminderList::new("one")).unwrap();
        storage.insert_list(ReminderList::new("two")).unwrap();

        let lists = feed.changed().await.unwrap();
        assert_eq!(lists.len(), 2);
    }
}
