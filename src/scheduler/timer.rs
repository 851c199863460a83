use super::AlarmPayload;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identity of one armed timer. Derived from the reminder id only, so
/// timers of different reminders never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerId {
    Primary(String),
    Repeat { reminder_id: String, index: u32 },
}

impl TimerId {
    pub fn reminder_id(&self) -> &str {
        match self {
            TimerId::Primary(id) => id,
            TimerId::Repeat { reminder_id, .. } => reminder_id,
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerId::Primary(id) => write!(f, "{}", id),
            TimerId::Repeat { reminder_id, index } => write!(f, "{}#repeat{}", reminder_id, index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Exact,
    Approximate,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimerError {
    /// The caller lacks the grant for this mode; a weaker mode may still work
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("timer service unavailable: {0}")]
    Unavailable(String),
}

/// Platform timer: one-shot callbacks at an instant, keyed by `TimerId`.
/// Arming an id that is already armed replaces the earlier timer.
pub trait TimerService: Send + Sync {
    fn can_schedule_exact(&self) -> bool;

    fn schedule_at(
        &self,
        id: TimerId,
        at: DateTime<Utc>,
        payload: AlarmPayload,
        mode: TimerMode,
    ) -> Result<(), TimerError>;

    /// Disarm `id`; returns whether anything was armed
    fn cancel(&self, id: &TimerId) -> bool;
}

struct ArmedTask {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Timers as sleeping tokio tasks. Fired payloads are sent down the channel
/// returned by [`TokioTimerService::new`].
pub struct TokioTimerService {
    runtime: Handle,
    fired: mpsc::UnboundedSender<AlarmPayload>,
    tasks: Arc<Mutex<HashMap<TimerId, ArmedTask>>>,
    generation: AtomicU64,
    exact: bool,
}

impl TokioTimerService {
    pub fn new(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<AlarmPayload>) {
        let (fired, receiver) = mpsc::unbounded_channel();
        let service = Self {
            runtime,
            fired,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            exact: true,
        };
        (service, receiver)
    }

    /// Report exact scheduling as unavailable, forcing approximate timers
    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn armed_count(&self) -> usize {
        lock_tasks(&self.tasks).len()
    }

    pub fn is_armed(&self, id: &TimerId) -> bool {
        lock_tasks(&self.tasks).contains_key(id)
    }
}

fn lock_tasks(
    tasks: &Mutex<HashMap<TimerId, ArmedTask>>,
) -> MutexGuard<'_, HashMap<TimerId, ArmedTask>> {
    tasks.lock().unwrap_or_else(|e| e.into_inner())
}

impl TimerService for TokioTimerService {
    fn can_schedule_exact(&self) -> bool {
        self.exact
    }

    fn schedule_at(
        &self,
        id: TimerId,
        at: DateTime<Utc>,
        payload: AlarmPayload,
        mode: TimerMode,
    ) -> Result<(), TimerError> {
        if self.fired.is_closed() {
            return Err(TimerError::Unavailable("alarm receiver has shut down".into()));
        }
        if mode == TimerMode::Exact && !self.exact {
            return Err(TimerError::PermissionDenied("exact timers are disabled".into()));
        }

        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let tasks = self.tasks.clone();
        let fired = self.fired.clone();
        let task_id = id.clone();

        // Hold the map lock across spawn so the task cannot look itself up too early
        let mut armed = lock_tasks(&self.tasks);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut armed = lock_tasks(&tasks);
                if armed.get(&task_id).map(|t| t.generation) == Some(generation) {
                    armed.remove(&task_id);
                }
            }
            log::debug!("Timer {} fired", task_id);
            if fired.send(payload).is_err() {
                log::error!("Timer {} fired after the alarm receiver shut down", task_id);
            }
        });
        if let Some(previous) = armed.insert(id, ArmedTask { generation, handle }) {
            previous.handle.abort();
        }
        Ok(())
    }

    fn cancel(&self, id: &TimerId) -> bool {
        match lock_tasks(&self.tasks).remove(id) {
            Some(task) => {
                task.handle.abort();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::Reminder;
    use chrono::Duration;

    fn payload_at(reminder: &Reminder, at: DateTime<Utc>) -> AlarmPayload {
        AlarmPayload::primary(reminder, at)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_payload() {
        let (timers, mut fired) = TokioTimerService::new(Handle::current());
        let reminder = Reminder::new("l", "tea");
        let at = Utc::now() + Duration::seconds(30);
        let id = TimerId::Primary(reminder.id.clone());

        timers
            .schedule_at(id.clone(), at, payload_at(&reminder, at), TimerMode::Exact)
            .unwrap();
        assert!(timers.is_armed(&id));

        let payload = fired.recv().await.unwrap();
        assert_eq!(payload.reminder_id, reminder.id);
        tokio::task::yield_now().await;
        assert!(!timers.is_armed(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_replaces_previous_timer() {
        let (timers, mut fired) = TokioTimerService::new(Handle::current());
        let reminder = Reminder::new("l", "tea");
        let id = TimerId::Primary(reminder.id.clone());
        let first = Utc::now() + Duration::seconds(10);
        let second = Utc::now() + Duration::seconds(20);

        timers
            .schedule_at(id.clone(), first, payload_at(&reminder, first), TimerMode::Exact)
            .unwrap();
        timers
            .schedule_at(id.clone(), second, payload_at(&reminder, second), TimerMode::Exact)
            .unwrap();
        assert_eq!(timers.armed_count(), 1);

        let payload = fired.recv().await.unwrap();
        assert_eq!(payload.trigger_at, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (timers, _fired) = TokioTimerService::new(Handle::current());
        let reminder = Reminder::new("l", "tea");
        let id = TimerId::Primary(reminder.id.clone());
        let at = Utc::now() + Duration::seconds(10);

        timers
            .schedule_at(id.clone(), at, payload_at(&reminder, at), TimerMode::Exact)
            .unwrap();

        assert!(timers.cancel(&id));
        assert!(!timers.cancel(&id));
    }

    #[tokio::test]
    async fn test_exact_denied_when_disabled() {
        let (timers, _fired) = TokioTimerService::new(Handle::current());
        let timers = timers.with_exact(false);
        let reminder = Reminder::new("l", "tea");
        let at = Utc::now() + Duration::seconds(10);
        let id = TimerId::Primary(reminder.id.clone());

        let err = timers
            .schedule_at(id.clone(), at, payload_at(&reminder, at), TimerMode::Exact)
            .unwrap_err();
        assert!(matches!(err, TimerError::PermissionDenied(_)));

        timers
            .schedule_at(id, at, payload_at(&reminder, at), TimerMode::Approximate)
            .unwrap();
        assert_eq!(timers.armed_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_after_receiver_dropped() {
        let (timers, fired) = TokioTimerService::new(Handle::current());
        drop(fired);
        let reminder = Reminder::new("l", "tea");
        let at = Utc::now() + Duration::seconds(10);

        let err = timers
            .schedule_at(
                TimerId::Primary(reminder.id.clone()),
                at,
                payload_at(&reminder, at),
                TimerMode::Exact,
            )
            .unwrap_err();
        assert!(matches!(err, TimerError::Unavailable(_)));
    }

    #[test]
    fn test_repeat_id_display() {
        let id = TimerId::Repeat {
            reminder_id: "abc".into(),
            index: 2,
        };
        assert_eq!(id.to_string(), "abc#repeat2");
        assert_eq!(id.reminder_id(), "abc");
    }
}
