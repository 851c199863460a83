use crate::error::AppResult;
use std::path::PathBuf;
use tokio::sync::broadcast;

pub type DownloadId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Running,
    Successful,
    Failed,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadStatus::Successful | DownloadStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub status: DownloadStatus,
    /// Where the finished file landed
    pub local_path: Option<String>,
    /// Why a failed download failed
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
    pub title: String,
    pub description: String,
    /// Show the transfer in the platform's download UI
    pub visible: bool,
}

/// Platform download manager. Every download that reaches a terminal status
/// is announced once on the completion channel.
pub trait DownloadService: Send + Sync {
    fn enqueue(&self, request: DownloadRequest) -> AppResult<DownloadId>;

    fn query(&self, id: DownloadId) -> Option<DownloadInfo>;

    /// Cancel and forget a download; returns whether it was known
    fn remove(&self, id: DownloadId) -> bool;

    fn subscribe(&self) -> broadcast::Receiver<DownloadId>;
}
