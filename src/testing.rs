//! In-memory stand-ins for the platform services, for unit tests.

use crate::error::{AppError, AppResult};
use crate::notifier::{ChannelSpec, NotificationContent, NotificationService};
use crate::scheduler::{AlarmPayload, TimerError, TimerId, TimerMode, TimerService};
use crate::sound::{DownloadId, DownloadInfo, DownloadRequest, DownloadService, DownloadStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct ArmedTimer {
    pub at: DateTime<Utc>,
    pub payload: AlarmPayload,
    pub mode: TimerMode,
}

#[derive(Default)]
pub struct FakeTimerService {
    no_exact: bool,
    deny_exact: bool,
    unavailable: bool,
    armed: Mutex<HashMap<TimerId, ArmedTimer>>,
    cancelled: Mutex<Vec<TimerId>>,
}

impl FakeTimerService {
    /// Reports that exact timers are not permitted
    pub fn without_exact() -> Self {
        Self {
            no_exact: true,
            ..Self::default()
        }
    }

    /// Claims exact timers are permitted, then rejects them
    pub fn denying_exact() -> Self {
        Self {
            deny_exact: true,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn armed(&self) -> HashMap<TimerId, ArmedTimer> {
        self.armed.lock().unwrap().clone()
    }

    /// Ids whose cancel actually disarmed something
    pub fn cancelled(&self) -> Vec<TimerId> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Remove and return the timer for `id`, as if it had fired
    pub fn fire(&self, id: &TimerId) -> Option<AlarmPayload> {
        self.armed.lock().unwrap().remove(id).map(|t| t.payload)
    }
}

impl TimerService for FakeTimerService {
    fn can_schedule_exact(&self) -> bool {
        !self.no_exact
    }

    fn schedule_at(
        &self,
        id: TimerId,
        at: DateTime<Utc>,
        payload: AlarmPayload,
        mode: TimerMode,
    ) -> Result<(), TimerError> {
        if self.unavailable {
            return Err(TimerError::Unavailable("fake".into()));
        }
        if self.deny_exact && mode == TimerMode::Exact {
            return Err(TimerError::PermissionDenied("fake".into()));
        }
        self.armed
            .lock()
            .unwrap()
            .insert(id, ArmedTimer { at, payload, mode });
        Ok(())
    }

    fn cancel(&self, id: &TimerId) -> bool {
        let removed = self.armed.lock().unwrap().remove(id).is_some();
        if removed {
            self.cancelled.lock().unwrap().push(id.clone());
        }
        removed
    }
}

#[derive(Default)]
pub struct FakeNotificationService {
    fail_next: AtomicBool,
    channels: Mutex<Vec<ChannelSpec>>,
    shown: Mutex<Vec<(i32, NotificationContent)>>,
    visible: Mutex<HashMap<i32, NotificationContent>>,
}

impl FakeNotificationService {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn channels(&self) -> Vec<ChannelSpec> {
        self.channels.lock().unwrap().clone()
    }

    /// Every successful notify call, in order
    pub fn shown(&self) -> Vec<(i32, NotificationContent)> {
        self.shown.lock().unwrap().clone()
    }

    /// Notifications on screen after replacements
    pub fn visible_count(&self) -> usize {
        self.visible.lock().unwrap().len()
    }
}

impl NotificationService for FakeNotificationService {
    fn create_channel(&self, channel: &ChannelSpec) -> AppResult<()> {
        self.channels.lock().unwrap().push(channel.clone());
        Ok(())
    }

    fn notify(&self, id: i32, content: &NotificationContent) -> AppResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AppError::notification("fake render failure"));
        }
        self.shown.lock().unwrap().push((id, content.clone()));
        self.visible.lock().unwrap().insert(id, content.clone());
        Ok(())
    }
}

pub struct FakeDownloadService {
    next_id: AtomicU64,
    reject_enqueue: AtomicBool,
    requests: Mutex<Vec<(DownloadId, DownloadRequest)>>,
    downloads: Mutex<HashMap<DownloadId, DownloadInfo>>,
    removed: Mutex<Vec<DownloadId>>,
    completions: broadcast::Sender<DownloadId>,
}

impl Default for FakeDownloadService {
    fn default() -> Self {
        let (completions, _) = broadcast::channel(16);
        Self {
            next_id: AtomicU64::new(1),
            reject_enqueue: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            downloads: Mutex::new(HashMap::new()),
            removed: Mutex::new(Vec::new()),
            completions,
        }
    }
}

impl FakeDownloadService {
    pub fn reject_enqueue(&self) {
        self.reject_enqueue.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<(DownloadId, DownloadRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<DownloadId> {
        self.removed.lock().unwrap().clone()
    }

    /// Finish `id` successfully and announce it, even if it was removed
    pub fn succeed(&self, id: DownloadId, path: &str) {
        self.finish(
            id,
            DownloadInfo {
                status: DownloadStatus::Successful,
                local_path: Some(path.to_string()),
                reason: None,
            },
        );
    }

    pub fn fail(&self, id: DownloadId, reason: &str) {
        self.finish(
            id,
            DownloadInfo {
                status: DownloadStatus::Failed,
                local_path: None,
                reason: Some(reason.to_string()),
            },
        );
    }

    fn finish(&self, id: DownloadId, info: DownloadInfo) {
        self.downloads.lock().unwrap().insert(id, info);
        let _ = self.completions.send(id);
    }
}

impl DownloadService for FakeDownloadService {
    fn enqueue(&self, request: DownloadRequest) -> AppResult<DownloadId> {
        if self.reject_enqueue.load(Ordering::SeqCst) {
            return Err(AppError::download("fake enqueue failure"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((id, request));
        self.downloads.lock().unwrap().insert(
            id,
            DownloadInfo {
                status: DownloadStatus::Pending,
                local_path: None,
                reason: None,
            },
        );
        Ok(id)
    }

    fn query(&self, id: DownloadId) -> Option<DownloadInfo> {
        self.downloads.lock().unwrap().get(&id).cloned()
    }

    fn remove(&self, id: DownloadId) -> bool {
        self.removed.lock().unwrap().push(id);
        self.downloads.lock().unwrap().remove(&id).is_some()
    }

    fn subscribe(&self) -> broadcast::Receiver<DownloadId> {
        self.completions.subscribe()
    }
}
