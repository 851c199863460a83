// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(all(feature = "desktop", not(debug_assertions)), windows_subsystem = "windows")]

#[cfg(feature = "desktop")]
fn main() {
    reminder_lists_lib::run()
}

#[cfg(not(feature = "desktop"))]
#[tokio::main]
async fn main() {
    use reminder_lists_lib::notifier::LogNotificationService;
    use reminder_lists_lib::sound::UreqDownloadService;
    use reminder_lists_lib::{config, Storage};
    use std::sync::Arc;
    use tokio::runtime::Handle;

    reminder_lists_lib::init_logging();

    let storage = match config::data_dir()
        .map_err(reminder_lists_lib::AppError::storage)
        .and_then(Storage::open)
    {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            log::error!("Failed to open reminder store: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = Handle::current();
    let app = reminder_lists_lib::launch(
        &runtime,
        storage,
        Arc::new(LogNotificationService),
        Arc::new(UreqDownloadService::new(runtime.clone())),
    );
    app.service.rearm_all();
    log::info!("Reminder service running, press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
    }
    log::info!("Shutting down");
}
