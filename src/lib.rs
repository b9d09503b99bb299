//! Backend for the breast tumor histology classifier.
//!
//! The crate owns the upload/predict lifecycle, the call to the remote
//! inference service and the persisted prediction history. The `desktop`
//! feature wraps it in a Tauri shell whose commands the web frontend invokes.

#[cfg(feature = "desktop")]
mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::AppError;
pub use services::session::{Session, SessionController};

pub const DATABASE_FILE_NAME: &str = "histo-lense.db";

/// Installs `env_logger` at the configured level; `RUST_LOG` still wins.
pub fn init_logging(config: &AppConfig) {
    let _ = env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use services::db::Database;
    use services::history_store::{HistoryStore, SqliteBackend};
    use services::inference_client::HttpInferenceClient;
    use std::sync::Arc;
    use tauri::{Emitter, Manager};

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_window_state::Builder::default().build())
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir()?;
            std::fs::create_dir_all(&app_data_dir)?;

            let config = AppConfig::load(&app_data_dir);
            init_logging(&config);
            log::info!(
                "Using inference service at {} (timeout: {:?})",
                config.api_base_url,
                config.request_timeout()
            );

            let db = Database::new(app_data_dir.join(DATABASE_FILE_NAME))?;
            let history = HistoryStore::load_on_init(Box::new(SqliteBackend::new(db)));
            let client = HttpInferenceClient::new(&config.api_base_url, config.request_timeout())?;

            let app_handle = app.handle().clone();
            let controller = SessionController::new(Arc::new(client), history).with_listener(
                move |snapshot| {
                    let _ = app_handle.emit("session-changed", snapshot);
                },
            );
            app.manage(controller);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::session::get_session,
            commands::session::select_file_path,
            commands::session::select_file_bytes,
            commands::session::clear_selection,
            commands::session::submit_prediction,
            commands::session::get_history,
            commands::session::clear_history,
            commands::report::export_report,
            commands::report::default_report_file_name,
            commands::report::get_model_info,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
