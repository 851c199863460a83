use crate::alarm::{self, AlarmContext};
use crate::config;
use crate::error::{AppError, AppResult};
use crate::notifier::{ChannelSpec, NotificationContent, NotificationService, SoundSource};
use crate::reminder::{Reminder, ReminderList};
use crate::service::ReminderService;
use crate::sound::UreqDownloadService;
use crate::storage::Storage;
use std::sync::Arc;
use tauri::{Emitter, Manager};
use tauri_plugin_notification::NotificationExt;

pub struct AppState {
    pub service: Arc<ReminderService>,
    pub alarms: AlarmContext,
}

/// Shows notifications through the OS notification center
struct TauriNotificationService {
    app: tauri::AppHandle,
}

impl NotificationService for TauriNotificationService {
    fn create_channel(&self, channel: &ChannelSpec) -> AppResult<()> {
        // Desktop notification centers have no channels; importance rides on each notification
        log::debug!("Skipping channel {} on desktop", channel.id);
        Ok(())
    }

    fn notify(&self, id: i32, content: &NotificationContent) -> AppResult<()> {
        let mut builder = self
            .app
            .notification()
            .builder()
            .id(id)
            .channel_id(content.channel_id)
            .title(&content.title)
            .body(&content.body);
        builder = match &content.sound {
            SoundSource::Custom(path) => builder.sound(path.clone()),
            SoundSource::Default => builder.sound("default"),
            SoundSource::Silent => builder,
        };
        builder
            .show()
            .map_err(|e| AppError::notification(e.to_string()))
    }
}

#[tauri::command]
fn get_lists(state: tauri::State<AppState>) -> Result<Vec<ReminderList>, String> {
    Ok(state.service.lists())
}

#[tauri::command]
fn create_list(state: tauri::State<AppState>, name: String) -> Result<ReminderList, String> {
    Ok(state.service.create_list(&name)?)
}

#[tauri::command]
fn rename_list(state: tauri::State<AppState>, id: String, name: String) -> Result<ReminderList, String> {
    Ok(state.service.rename_list(&id, &name)?)
}

#[tauri::command]
fn delete_list(state: tauri::State<AppState>, id: String) -> Result<(), String> {
    Ok(state.service.delete_list(&id)?)
}

#[tauri::command]
fn get_list_counts(state: tauri::State<AppState>, list_id: String) -> Result<(usize, usize), String> {
    Ok(state.service.counts_for_list(&list_id))
}

#[tauri::command]
fn get_reminders(state: tauri::State<AppState>, list_id: String) -> Result<Vec<Reminder>, String> {
    Ok(state.service.reminders_for_list(&list_id))
}

#[tauri::command]
fn get_reminder(state: tauri::State<AppState>, id: String) -> Result<Reminder, String> {
    Ok(state.service.reminder(&id)?)
}

#[tauri::command]
fn add_reminder(state: tauri::State<AppState>, reminder: Reminder) -> Result<Reminder, String> {
    Ok(state.service.add_reminder(reminder)?)
}

#[tauri::command]
fn update_reminder(state: tauri::State<AppState>, reminder: Reminder) -> Result<Reminder, String> {
    Ok(state.service.update_reminder(reminder)?)
}

#[tauri::command]
fn toggle_completion(state: tauri::State<AppState>, id: String) -> Result<Reminder, String> {
    Ok(state.service.toggle_completion(&id)?)
}

#[tauri::command]
fn delete_reminder(state: tauri::State<AppState>, id: String) -> Result<(), String> {
    Ok(state.service.delete_reminder(&id)?)
}

/// Starts the download and returns; progress shows up in the reminder's fetch state
#[tauri::command]
fn fetch_custom_sound(state: tauri::State<AppState>, reminder_id: String, url: String) -> Result<(), String> {
    state.service.fetch_custom_sound(&reminder_id, &url)?;
    Ok(())
}

/// Fire a serialized alarm payload right away
#[tauri::command]
fn trigger_alarm(state: tauri::State<AppState>, payload: String) -> Result<(), String> {
    Ok(alarm::on_encoded_alarm(&state.alarms, &payload)?)
}

/// Push lists and reminders to the window after every store write
fn forward_changes(app: tauri::AppHandle, service: &ReminderService) {
    let mut lists = service.watch_lists();
    let lists_app = app.clone();
    tauri::async_runtime::spawn(async move {
        while let Some(value) = lists.changed().await {
            if let Err(e) = lists_app.emit("lists-changed", &value) {
                log::warn!("Failed to emit lists-changed: {}", e);
            }
        }
    });

    // Counts and fetch progress are derived from these on the window side
    let mut reminders = service.watch_reminders();
    tauri::async_runtime::spawn(async move {
        while let Some(value) = reminders.changed().await {
            if let Err(e) = app.emit("reminders-changed", &value) {
                log::warn!("Failed to emit reminders-changed: {}", e);
            }
        }
    });
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    crate::init_logging();

    let runtime = tokio::runtime::Runtime::new().expect("Failed to start async runtime");
    tauri::async_runtime::set(runtime.handle().clone());
    let handle = runtime.handle().clone();

    let storage = config::data_dir()
        .map_err(AppError::storage)
        .and_then(Storage::open)
        .map(Arc::new)
        .expect("Failed to initialize storage");

    tauri::Builder::default()
        .plugin(tauri_plugin_notification::init())
        .setup(move |app| {
            let notifications = Arc::new(TauriNotificationService {
                app: app.handle().clone(),
            });
            let downloads = Arc::new(UreqDownloadService::new(handle.clone()));
            let launched = crate::launch(&handle, storage.clone(), notifications, downloads);
            launched.service.rearm_all();
            forward_changes(app.handle().clone(), &launched.service);

            app.manage(AppState {
                service: launched.service,
                alarms: launched.alarms,
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_lists,
            create_list,
            rename_list,
            delete_list,
            get_list_counts,
            get_reminders,
            get_reminder,
            add_reminder,
            update_reminder,
            toggle_completion,
            delete_reminder,
            fetch_custom_sound,
            trigger_alarm,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
