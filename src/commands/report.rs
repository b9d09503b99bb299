use crate::error::AppError;
use crate::models::classify_types::ModelInfo;
use crate::services::report;
use crate::services::session::SessionController;
use std::path::Path;
use tauri::State;

#[tauri::command]
pub async fn export_report(
    controller: State<'_, SessionController>,
    path: String,
) -> Result<(), AppError> {
    let result = controller
        .current_result()
        .ok_or_else(|| AppError::Validation("There is no prediction to export yet".to_string()))?;
    report::write_report(&result, Path::new(&path)).await
}

#[tauri::command]
pub fn default_report_file_name() -> &'static str {
    report::DEFAULT_REPORT_FILE_NAME
}

#[tauri::command]
pub fn get_model_info() -> ModelInfo {
    ModelInfo::current()
}
