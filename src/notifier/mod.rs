mod service;

use crate::config::{
    CHANNEL_DESCRIPTION, CHANNEL_ID, CHANNEL_NAME, DEFAULT_NOTIFICATION_BODY,
    SILENT_CHANNEL_DESCRIPTION, SILENT_CHANNEL_ID, SILENT_CHANNEL_NAME,
};
use crate::error::AppResult;
use crate::reminder::{Priority, Reminder};
use crate::repeat::{self, RepeatStep};
use crate::scheduler::AlarmScheduler;
use chrono::Utc;
use std::sync::Arc;

pub use service::{
    ActivationTarget, Channel, ChannelSpec, Importance, LogNotificationService,
    NotificationContent, NotificationService, SoundSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelChoice {
    pub channel: Channel,
    pub importance: Importance,
}

/// Channel and displayed importance for a notification.
pub fn select_channel(priority: Priority, use_custom_sound: bool) -> ChannelChoice {
    let (channel, importance) = match priority {
        Priority::High => (Channel::Audible, Importance::Max),
        Priority::Medium => (Channel::Audible, Importance::High),
        Priority::Low => (Channel::Audible, Importance::Low),
        Priority::None if use_custom_sound => (Channel::Audible, Importance::Default),
        Priority::None => (Channel::Silent, Importance::Low),
    };
    ChannelChoice { channel, importance }
}

pub fn sound_source(reminder: &Reminder) -> SoundSource {
    if !reminder.is_sound_enabled {
        return SoundSource::Silent;
    }
    match (&reminder.local_sound_path, reminder.uses_custom_sound()) {
        (Some(path), true) => SoundSource::Custom(path.clone()),
        _ => SoundSource::Default,
    }
}

/// Stable notification id for a reminder, so a re-fire replaces the old one
pub fn notification_id(reminder_id: &str) -> i32 {
    reminder_id
        .chars()
        .fold(0i32, |hash, c| hash.wrapping_mul(31).wrapping_add(c as i32))
}

fn channel_id(channel: Channel) -> &'static str {
    match channel {
        Channel::Audible => CHANNEL_ID,
        Channel::Silent => SILENT_CHANNEL_ID,
    }
}

pub fn build_content(reminder: &Reminder) -> NotificationContent {
    let choice = select_channel(reminder.priority, reminder.uses_custom_sound());
    NotificationContent {
        channel: choice.channel,
        channel_id: channel_id(choice.channel),
        title: reminder.title.clone(),
        body: reminder
            .notes
            .clone()
            .unwrap_or_else(|| DEFAULT_NOTIFICATION_BODY.to_string()),
        importance: choice.importance,
        activation: ActivationTarget {
            reminder_id: reminder.id.clone(),
            list_id: reminder.list_id.clone(),
        },
        sound: sound_source(reminder),
        vibration_pattern: if reminder.is_vibrate_enabled {
            None
        } else {
            Some(vec![0])
        },
        auto_cancel: true,
    }
}

pub fn channel_specs() -> [ChannelSpec; 2] {
    [
        ChannelSpec {
            id: CHANNEL_ID,
            name: CHANNEL_NAME,
            description: CHANNEL_DESCRIPTION,
            importance: Importance::High,
            sound: SoundSource::Default,
            vibration: true,
        },
        ChannelSpec {
            id: SILENT_CHANNEL_ID,
            name: SILENT_CHANNEL_NAME,
            description: SILENT_CHANNEL_DESCRIPTION,
            importance: Importance::Low,
            sound: SoundSource::Silent,
            vibration: false,
        },
    ]
}

/// Turns fired reminders into visible notifications and arms the next repeat.
pub struct Notifier {
    notifications: Arc<dyn NotificationService>,
    scheduler: Arc<AlarmScheduler>,
}

impl Notifier {
    pub fn new(notifications: Arc<dyn NotificationService>, scheduler: Arc<AlarmScheduler>) -> Self {
        Self {
            notifications,
            scheduler,
        }
    }

    pub fn create_notification_channels(&self) {
        for spec in channel_specs() {
            if let Err(e) = self.notifications.create_channel(&spec) {
                log::error!("Failed to create notification channel {}: {}", spec.id, e);
            }
        }
    }

    /// Show the notification for a fired reminder, then run one repeat step.
    ///
    /// `remaining_repeats` comes from the fired payload; `None` means this was
    /// the primary fire, so all `repeat_count` repeats are still ahead.
    pub fn show_notification(&self, reminder: &Reminder, remaining_repeats: Option<i64>) {
        if let Err(e) = self.render(reminder) {
            log::error!("Failed to show notification for reminder {}: {}", reminder.id, e);
        }

        let remaining = remaining_repeats.unwrap_or_else(|| i64::from(reminder.repeat_count));
        match repeat::next_step(reminder, remaining, Utc::now()) {
            RepeatStep::Next {
                trigger_at,
                remaining,
            } => {
                let mut next = reminder.clone();
                next.due_date = Some(trigger_at);
                self.scheduler.schedule_repeat(&next, remaining);
            }
            RepeatStep::Done => {
                log::debug!("No further repeats for reminder {}", reminder.id);
            }
        }
    }

    fn render(&self, reminder: &Reminder) -> AppResult<()> {
        let content = build_content(reminder);
        log::info!(
            "Showing notification for reminder {} on channel {}",
            reminder.title,
            content.channel_id
        );
        self.notifications
            .notify(notification_id(&reminder.id), &content)
    }
}
