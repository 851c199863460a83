mod download;
mod ureq_download;

use crate::config::{sound_file_name, DOWNLOAD_TIMEOUT};
use crate::error::{AppError, AppResult};
use crate::reminder::SoundFetchState;
use crate::scheduler::AlarmScheduler;
use crate::storage::Storage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

pub use download::{DownloadId, DownloadInfo, DownloadRequest, DownloadService, DownloadStatus};
pub use ureq_download::UreqDownloadService;

/// Only http(s) sources are fetched
pub fn is_valid_sound_url(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Drives a reminder's sound through IDLE → FETCHING → FETCHED | ERROR.
///
/// Store updates patch only the sound fields of the latest stored reminder.
/// One download is tracked per reminder; completions for anything else
/// (a replaced fetch, a fetch that already timed out) are dropped.
#[derive(Clone)]
pub struct SoundFetcher {
    runtime: Handle,
    storage: Arc<Storage>,
    downloads: Arc<dyn DownloadService>,
    scheduler: Arc<AlarmScheduler>,
    sounds_dir: PathBuf,
    active: Arc<Mutex<HashMap<String, DownloadId>>>,
    timeout: Duration,
}

impl SoundFetcher {
    pub fn new(
        runtime: Handle,
        storage: Arc<Storage>,
        downloads: Arc<dyn DownloadService>,
        scheduler: Arc<AlarmScheduler>,
        sounds_dir: PathBuf,
    ) -> Self {
        Self {
            runtime,
            storage,
            downloads,
            scheduler,
            sounds_dir,
            active: Arc::new(Mutex::new(HashMap::new())),
            timeout: DOWNLOAD_TIMEOUT,
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, HashMap<String, DownloadId>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start downloading `url` as the custom sound of `reminder_id`.
    ///
    /// Returns the task awaiting completion, or `None` when the fetch ended
    /// before a download was started (invalid URL, enqueue failure). Failures
    /// land in the reminder's `sound_fetch_state`, not in the return value;
    /// only an unknown reminder is an error.
    pub fn fetch_custom_sound(&self, reminder_id: &str, url: &str) -> AppResult<Option<JoinHandle<()>>> {
        if self.storage.reminder(reminder_id).is_none() {
            log::error!("Failed to fetch sound: reminder {} not found", reminder_id);
            return Err(AppError::not_found(format!("reminder {}", reminder_id)));
        }

        if !is_valid_sound_url(url) {
            self.retire_active(reminder_id);
            self.fail(reminder_id, &format!("Invalid URL format: {}", url));
            return Ok(None);
        }

        self.storage.modify_reminder(reminder_id, |r| {
            r.remote_sound_url = Some(url.to_string());
            r.sound_fetch_state = SoundFetchState::Fetching;
            r.sound_fetch_progress = Some(0);
        })?;

        // Subscribe before enqueueing so a fast completion is not missed
        let completions = self.downloads.subscribe();
        let request = DownloadRequest {
            url: url.to_string(),
            destination: self.sounds_dir.join(sound_file_name(reminder_id)),
            title: "Reminder Sound".to_string(),
            description: "Downloading custom reminder sound".to_string(),
            visible: true,
        };
        let download_id = match self.downloads.enqueue(request) {
            Ok(id) => id,
            Err(e) => {
                self.retire_active(reminder_id);
                self.fail(reminder_id, &format!("Failed to start download: {}", e));
                return Ok(None);
            }
        };

        if let Some(previous) = self.lock_active().insert(reminder_id.to_string(), download_id) {
            log::debug!("Replacing download {} for reminder {}", previous, reminder_id);
            self.downloads.remove(previous);
        }

        let fetcher = self.clone();
        let reminder_id = reminder_id.to_string();
        let handle = self.runtime.spawn(async move {
            fetcher.await_completion(reminder_id, download_id, completions).await;
        });
        Ok(Some(handle))
    }

    async fn await_completion(
        &self,
        reminder_id: String,
        download_id: DownloadId,
        mut completions: broadcast::Receiver<DownloadId>,
    ) {
        let signalled = tokio::time::timeout(
            self.timeout,
            wait_for(&mut completions, download_id, self.downloads.as_ref()),
        )
        .await;
        // Single-shot: stop listening before handling the result
        drop(completions);

        match signalled {
            Ok(_) => self.complete(&reminder_id, download_id),
            Err(_) => self.time_out(&reminder_id, download_id),
        }
    }

    /// Drop the in-flight download of `reminder_id`, if any, so its
    /// completion can no longer land
    fn retire_active(&self, reminder_id: &str) {
        let previous = self.lock_active().remove(reminder_id);
        if let Some(previous) = previous {
            log::debug!("Abandoning download {} for reminder {}", previous, reminder_id);
            self.downloads.remove(previous);
        }
    }

    /// Claim the active ticket; false if this download is no longer current
    fn take_ticket(&self, reminder_id: &str, download_id: DownloadId) -> bool {
        let mut active = self.lock_active();
        if active.get(reminder_id) == Some(&download_id) {
            active.remove(reminder_id);
            true
        } else {
            false
        }
    }

    fn complete(&self, reminder_id: &str, download_id: DownloadId) {
        if !self.take_ticket(reminder_id, download_id) {
            log::debug!("Ignoring stale completion of download {}", download_id);
            return;
        }

        match self.downloads.query(download_id) {
            Some(DownloadInfo {
                status: DownloadStatus::Successful,
                local_path: Some(path),
                ..
            }) => self.succeed(reminder_id, path),
            Some(DownloadInfo {
                status: DownloadStatus::Successful,
                local_path: None,
                ..
            }) => self.fail(reminder_id, "Downloaded file location is missing"),
            Some(info) => self.fail(
                reminder_id,
                &format!(
                    "Download failed (status: {:?}, reason: {})",
                    info.status,
                    info.reason.as_deref().unwrap_or("unknown")
                ),
            ),
            None => self.fail(reminder_id, "Download query returned no results"),
        }
    }

    fn time_out(&self, reminder_id: &str, download_id: DownloadId) {
        let status = self.downloads.query(download_id).map(|info| info.status);
        if status.is_some_and(DownloadStatus::is_terminal) {
            // Finished without us hearing about it
            self.complete(reminder_id, download_id);
            return;
        }
        if !self.take_ticket(reminder_id, download_id) {
            return;
        }
        self.downloads.remove(download_id);
        self.fail(reminder_id, "Download timed out");
    }

    fn succeed(&self, reminder_id: &str, path: String) {
        let result = self.storage.modify_reminder(reminder_id, |r| {
            r.local_sound_path = Some(path.clone());
            r.sound_fetch_state = SoundFetchState::Fetched;
            r.sound_fetch_progress = Some(100);
        });
        match result {
            Ok(updated) => {
                log::info!("Sound download successful: {}", path);
                // Re-arm so the frozen payload carries the new sound
                self.scheduler.schedule(&updated);
            }
            Err(e) => log::warn!("Sound for reminder {} downloaded but not stored: {}", reminder_id, e),
        }
    }

    fn fail(&self, reminder_id: &str, message: &str) {
        log::error!("Sound fetch for reminder {} failed: {}", reminder_id, message);
        let result = self.storage.modify_reminder(reminder_id, |r| {
            r.sound_fetch_state = SoundFetchState::Error;
            r.sound_fetch_progress = None;
        });
        if let Err(e) = result {
            log::warn!("Could not record fetch error for reminder {}: {}", reminder_id, e);
        }
    }
}

/// Wait until `download_id` is announced. Returns false if the channel closed.
async fn wait_for(
    completions: &mut broadcast::Receiver<DownloadId>,
    download_id: DownloadId,
    downloads: &dyn DownloadService,
) -> bool {
    loop {
        match completions.recv().await {
            Ok(id) if id == download_id => return true,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Missed {} download completions, checking status", skipped);
                let finished = downloads
                    .query(download_id)
                    .is_some_and(|info| info.status.is_terminal());
                if finished {
                    return true;
                }
            }
            Err(RecvError::Closed) => return false,
        }
    }
}
