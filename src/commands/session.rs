use crate::error::AppError;
use crate::models::history_types::HistoryEntry;
use crate::models::session_types::{ImageCandidate, SessionSnapshot};
use crate::services::session::SessionController;
use crate::services::upload;
use std::path::Path;
use tauri::State;

#[tauri::command]
pub fn get_session(controller: State<'_, SessionController>) -> SessionSnapshot {
    controller.snapshot()
}

/// File picked through the browse dialog.
#[tauri::command]
pub async fn select_file_path(
    controller: State<'_, SessionController>,
    path: String,
) -> Result<SessionSnapshot, AppError> {
    let ticket = controller.begin_selection();
    let candidate = upload::candidate_from_path(Path::new(&path)).await?;
    select_candidate(controller.inner(), ticket, candidate).await
}

/// File dropped onto the uploader; the webview hands over the bytes.
#[tauri::command]
pub async fn select_file_bytes(
    controller: State<'_, SessionController>,
    filename: String,
    mime_type: String,
    bytes: Vec<u8>,
) -> Result<SessionSnapshot, AppError> {
    let ticket = controller.begin_selection();
    select_candidate(controller.inner(), ticket, ImageCandidate::new(filename, mime_type, bytes)).await
}

async fn select_candidate(
    controller: &SessionController,
    ticket: u64,
    candidate: ImageCandidate,
) -> Result<SessionSnapshot, AppError> {
    // Preview encoding decodes the whole image; keep it off the async workers.
    let image = tauri::async_runtime::spawn_blocking(move || upload::validate(candidate))
        .await
        .map_err(|e| AppError::Io(format!("Task join failed: {}", e)))??;
    Ok(controller.finish_selection(ticket, image))
}

#[tauri::command]
pub fn clear_selection(controller: State<'_, SessionController>) -> SessionSnapshot {
    controller.clear()
}

#[tauri::command]
pub async fn submit_prediction(
    controller: State<'_, SessionController>,
) -> Result<SessionSnapshot, AppError> {
    let controller = controller.inner().clone();
    Ok(controller.submit().await)
}

#[tauri::command]
pub fn get_history(controller: State<'_, SessionController>) -> Vec<HistoryEntry> {
    controller.history()
}

#[tauri::command]
pub fn clear_history(controller: State<'_, SessionController>) -> Result<SessionSnapshot, AppError> {
    controller.clear_history()
}
