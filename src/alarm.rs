use crate::error::AppResult;
use crate::notifier::Notifier;
use crate::scheduler::AlarmPayload;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What a fired timer needs to reach the notifier
#[derive(Clone)]
pub struct AlarmContext {
    pub notifier: Arc<Notifier>,
}

impl AlarmContext {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self { notifier }
    }
}

/// Handle one fired timer from its payload alone
pub fn on_alarm_fired(ctx: &AlarmContext, payload: AlarmPayload) {
    log::info!(
        "Alarm fired for reminder {} (repeat: {}, remaining: {:?})",
        payload.reminder_id,
        payload.is_repeat,
        payload.remaining_repeats
    );
    let reminder = payload.to_reminder();
    ctx.notifier
        .show_notification(&reminder, payload.remaining_repeats);
}

/// Same as [`on_alarm_fired`], for a payload that arrived serialized
pub fn on_encoded_alarm(ctx: &AlarmContext, raw: &str) -> AppResult<()> {
    let payload = AlarmPayload::decode(raw)?;
    on_alarm_fired(ctx, payload);
    Ok(())
}

/// Drain fired payloads until every sender is gone
pub fn spawn_alarm_loop(
    runtime: &Handle,
    ctx: AlarmContext,
    mut fired: mpsc::UnboundedReceiver<AlarmPayload>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        while let Some(payload) = fired.recv().await {
            on_alarm_fired(&ctx, payload);
        }
        log::debug!("Alarm loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::notifier::{notification_id, SoundSource};
    use crate::reminder::{Priority, Reminder};
    use crate::scheduler::{AlarmScheduler, TimerId, TokioTimerService};
    use crate::testing::{FakeNotificationService, FakeTimerService};
    use chrono::{Duration, Utc};

    fn setup() -> (Arc<FakeNotificationService>, Arc<FakeTimerService>, AlarmContext) {
        let notifications = Arc::new(FakeNotificationService::default());
        let timers = Arc::new(FakeTimerService::default());
        let scheduler = Arc::new(AlarmScheduler::new(timers.clone()));
        let notifier = Arc::new(Notifier::new(notifications.clone(), scheduler));
        (notifications, timers, AlarmContext::new(notifier))
    }

    fn reminder(repeats: u32) -> Reminder {
        let mut reminder = Reminder::new("list", "Take pills");
        reminder.due_date = Some(Utc::now() + Duration::minutes(1));
        reminder.repeat_count = repeats;
        reminder.repeat_interval_minutes = 1;
        reminder
    }

    #[test]
    fn test_fired_payload_is_rendered_from_snapshot() {
        let (notifications, _, ctx) = setup();
        let mut reminder = reminder(0);
        reminder.priority = Priority::High;
        reminder.local_sound_path = Some("/sounds/x.mp3".into());
        reminder.sound_fetch_state = crate::reminder::SoundFetchState::Fetched;
        let payload = AlarmPayload::primary(&reminder, Utc::now());

        on_alarm_fired(&ctx, payload);

        let shown = notifications.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, notification_id(&reminder.id));
        assert_eq!(shown[0].1.title, "Take pills");
        assert_eq!(shown[0].1.sound, SoundSource::Custom("/sounds/x.mp3".into()));
    }

    #[test]
    fn test_repeats_fire_exactly_repeat_count_times() {
        let (notifications, timers, ctx) = setup();
        let reminder = reminder(3);

        on_alarm_fired(&ctx, AlarmPayload::primary(&reminder, Utc::now()));

        let mut repeat_fires = 0;
        for index in 0..4 {
            let id = TimerId::Repeat {
                reminder_id: reminder.id.clone(),
                index,
            };
            match timers.fire(&id) {
                Some(payload) => {
                    repeat_fires += 1;
                    on_alarm_fired(&ctx, payload);
                }
                None => break,
            }
        }

        assert_eq!(repeat_fires, 3);
        assert!(timers.armed().is_empty());
        assert_eq!(notifications.shown().len(), 4);
        assert_eq!(notifications.visible_count(), 1);
    }

    #[test]
    fn test_encoded_payload_round_trips_through_entry_point() {
        let (notifications, _, ctx) = setup();
        let raw = AlarmPayload::primary(&reminder(0), Utc::now())
            .encode()
            .unwrap();

        on_encoded_alarm(&ctx, &raw).unwrap();

        assert_eq!(notifications.shown().len(), 1);
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        let (notifications, _, ctx) = setup();
        let err = on_encoded_alarm(&ctx, "{").unwrap_err();
        assert!(matches!(err, AppError::Scheduling(_)));
        assert!(notifications.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_alarm_loop_delivers_fired_timers() {
        let notifications = Arc::new(FakeNotificationService::default());
        let (timers, fired) = TokioTimerService::new(Handle::current());
        let timers = Arc::new(timers);
        let scheduler = Arc::new(AlarmScheduler::new(timers.clone()));
        let notifier = Arc::new(Notifier::new(notifications.clone(), scheduler.clone()));
        let ctx = AlarmContext::new(notifier);
        let _alarms = spawn_alarm_loop(&Handle::current(), ctx, fired);

        let reminder = reminder(0);
        scheduler.schedule(&reminder);
        assert_eq!(timers.armed_count(), 1);

        tokio::time::sleep(std::time::Duration::from_secs(120)).await;
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        assert_eq!(notifications.shown().len(), 1);
        assert_eq!(timers.armed_count(), 0);
    }
}
