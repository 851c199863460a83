use super::download::{DownloadId, DownloadInfo, DownloadRequest, DownloadService, DownloadStatus};
use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

const CHUNK_SIZE: usize = 16 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(30);

struct Entry {
    info: DownloadInfo,
    cancelled: Arc<AtomicBool>,
}

type Entries = Arc<Mutex<HashMap<DownloadId, Entry>>>;

fn lock_entries(entries: &Mutex<HashMap<DownloadId, Entry>>) -> MutexGuard<'_, HashMap<DownloadId, Entry>> {
    entries.lock().unwrap_or_else(|e| e.into_inner())
}

/// Downloads over HTTP with ureq on the blocking pool
pub struct UreqDownloadService {
    runtime: Handle,
    agent: ureq::Agent,
    next_id: AtomicU64,
    entries: Entries,
    completions: broadcast::Sender<DownloadId>,
}

impl UreqDownloadService {
    pub fn new(runtime: Handle) -> Self {
        let (completions, _) = broadcast::channel(64);
        Self {
            runtime,
            agent: ureq::AgentBuilder::new().timeout_read(READ_TIMEOUT).build(),
            next_id: AtomicU64::new(1),
            entries: Arc::new(Mutex::new(HashMap::new())),
            completions,
        }
    }
}

impl DownloadService for UreqDownloadService {
    fn enqueue(&self, request: DownloadRequest) -> AppResult<DownloadId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cancelled = Arc::new(AtomicBool::new(false));
        lock_entries(&self.entries).insert(
            id,
            Entry {
                info: DownloadInfo {
                    status: DownloadStatus::Pending,
                    local_path: None,
                    reason: None,
                },
                cancelled: cancelled.clone(),
            },
        );

        let agent = self.agent.clone();
        let entries = self.entries.clone();
        let completions = self.completions.clone();
        log::info!("Downloading {} ({})", request.title, request.url);

        self.runtime.spawn_blocking(move || {
            if let Some(entry) = lock_entries(&entries).get_mut(&id) {
                entry.info.status = DownloadStatus::Running;
            }

            let result = fetch_to_file(&agent, &request.url, &request.destination, id, &cancelled);

            let mut guard = lock_entries(&entries);
            let Some(entry) = guard.get_mut(&id) else {
                // The destination may already belong to a newer download
                log::debug!("Download {} was removed before it finished", id);
                return;
            };
            entry.info = match result {
                Ok(()) => DownloadInfo {
                    status: DownloadStatus::Successful,
                    local_path: Some(request.destination.to_string_lossy().into_owned()),
                    reason: None,
                },
                Err(e) => {
                    log::error!("Download {} failed: {}", id, e);
                    DownloadInfo {
                        status: DownloadStatus::Failed,
                        local_path: None,
                        reason: Some(e.to_string()),
                    }
                }
            };
            drop(guard);

            // No subscribers just means nobody is waiting any more
            let _ = completions.send(id);
        });

        Ok(id)
    }

    fn query(&self, id: DownloadId) -> Option<DownloadInfo> {
        lock_entries(&self.entries).get(&id).map(|e| e.info.clone())
    }

    fn remove(&self, id: DownloadId) -> bool {
        match lock_entries(&self.entries).remove(&id) {
            Some(entry) => {
                entry.cancelled.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<DownloadId> {
        self.completions.subscribe()
    }
}

/// Temp file owned by one download; concurrent downloads to the same
/// destination never share it
fn partial_path(destination: &Path, id: DownloadId) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.part", id));
    destination.with_file_name(name)
}

/// Stream `url` into this download's temp file, then move it onto `destination`
fn fetch_to_file(
    agent: &ureq::Agent,
    url: &str,
    destination: &Path,
    id: DownloadId,
    cancelled: &AtomicBool,
) -> AppResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let response = agent
        .get(url)
        .call()
        .map_err(|e| AppError::network(format!("Failed to download {}: {}", url, e)))?;
    log::debug!("Response status: {}", response.status());

    let partial = partial_path(destination, id);
    let mut reader = response.into_reader();
    let mut file = fs::File::create(&partial)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0usize;

    loop {
        if cancelled.load(Ordering::SeqCst) {
            drop(file);
            let _ = fs::remove_file(&partial);
            return Err(AppError::download("cancelled"));
        }
        let read = reader
            .read(&mut buf)
            .map_err(|e| AppError::network(format!("Failed to read sound data: {}", e)))?;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read])?;
        total += read;
    }
    file.flush()?;
    drop(file);

    if cancelled.load(Ordering::SeqCst) {
        let _ = fs::remove_file(&partial);
        return Err(AppError::download("cancelled"));
    }
    fs::rename(&partial, destination)?;
    log::debug!("Downloaded {} bytes to {}", total, destination.display());
    Ok(())
}
