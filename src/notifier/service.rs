use crate::error::AppResult;
use serde::Serialize;

/// Platform notification category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    Audible,
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Importance {
    Min,
    Low,
    Default,
    High,
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SoundSource {
    /// The platform's default notification sound
    Default,
    /// A downloaded file
    Custom(String),
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub importance: Importance,
    pub sound: SoundSource,
    pub vibration: bool,
}

/// What opening the notification should navigate to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationTarget {
    pub reminder_id: String,
    pub list_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationContent {
    pub channel: Channel,
    pub channel_id: &'static str,
    pub title: String,
    pub body: String,
    pub importance: Importance,
    pub activation: ActivationTarget,
    pub sound: SoundSource,
    /// `Some` replaces the channel's vibration pattern; `Some(vec![0])` disables it
    pub vibration_pattern: Option<Vec<u64>>,
    pub auto_cancel: bool,
}

/// Platform notification renderer
pub trait NotificationService: Send + Sync {
    fn create_channel(&self, channel: &ChannelSpec) -> AppResult<()>;

    /// Show `content`, replacing any notification already shown under `id`
    fn notify(&self, id: i32, content: &NotificationContent) -> AppResult<()>;
}

/// Renders notifications as log lines, for headless runs
#[derive(Debug, Default)]
pub struct LogNotificationService;

impl NotificationService for LogNotificationService {
    fn create_channel(&self, channel: &ChannelSpec) -> AppResult<()> {
        log::debug!("Notification channel {} ({:?})", channel.id, channel.importance);
        Ok(())
    }

    fn notify(&self, id: i32, content: &NotificationContent) -> AppResult<()> {
        log::info!(
            "[notification {}] {}: {} ({:?}, {:?}, sound {:?})",
            id,
            content.title,
            content.body,
            content.channel,
            content.importance,
            content.sound
        );
        Ok(())
    }
}
