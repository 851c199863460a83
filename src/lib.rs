pub mod alarm;
pub mod config;
pub mod error;
pub mod notifier;
pub mod reminder;
pub mod repeat;
pub mod scheduler;
pub mod service;
pub mod sound;
pub mod storage;

#[cfg(feature = "desktop")]
mod desktop;
#[cfg(test)]
pub(crate) mod testing;

use alarm::AlarmContext;
use notifier::{NotificationService, Notifier};
use scheduler::{AlarmScheduler, TokioTimerService};
use sound::{DownloadService, SoundFetcher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub use error::{AppError, AppResult};
pub use reminder::{Priority, Reminder, ReminderList, SoundFetchState};
pub use service::ReminderService;
pub use storage::Storage;

#[cfg(feature = "desktop")]
pub use desktop::run;

/// Log to stderr; `RUST_LOG` overrides the default `info` filter
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// A wired-up reminder app: the service for the view layer plus the alarm loop
pub struct App {
    pub service: Arc<ReminderService>,
    pub alarms: AlarmContext,
    pub alarm_loop: JoinHandle<()>,
}

/// Wire storage, timers, notifier and sound fetcher together on `runtime`.
///
/// Timers are not re-armed here; call [`ReminderService::rearm_all`] once the
/// caller is ready to receive notifications.
pub fn launch(
    runtime: &Handle,
    storage: Arc<Storage>,
    notifications: Arc<dyn NotificationService>,
    downloads: Arc<dyn DownloadService>,
) -> App {
    let (timers, fired) = TokioTimerService::new(runtime.clone());
    let scheduler = Arc::new(AlarmScheduler::new(Arc::new(timers)));

    let notifier = Arc::new(Notifier::new(notifications, scheduler.clone()));
    notifier.create_notification_channels();
    let alarms = AlarmContext::new(notifier);
    let alarm_loop = alarm::spawn_alarm_loop(runtime, alarms.clone(), fired);

    let sounds = SoundFetcher::new(
        runtime.clone(),
        storage.clone(),
        downloads,
        scheduler.clone(),
        sounds_dir(&storage),
    );
    let service = Arc::new(ReminderService::new(storage, scheduler, sounds));

    App {
        service,
        alarms,
        alarm_loop,
    }
}

fn sounds_dir(storage: &Storage) -> PathBuf {
    match storage.app_data_path() {
        Some(path) => path.join(config::SOUNDS_DIR_NAME),
        None => std::env::temp_dir()
            .join(config::DATA_DIR_NAME)
            .join(config::SOUNDS_DIR_NAME),
    }
}
