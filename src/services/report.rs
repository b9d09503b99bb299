use crate::error::AppError;
use crate::models::classify_types::PredictionResult;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use std::path::Path;

pub const DEFAULT_REPORT_FILE_NAME: &str = "tumor-classification-report.txt";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Plain-text report for one result.
pub fn render_report<Tz>(result: &PredictionResult, date: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "Breast Tumor Classification Report\n\
         ---------------------------------\n\
         Date: {}\n\
         Prediction: {}\n\
         Confidence: {:.2}%\n",
        date.format(DATE_FORMAT),
        result.prediction,
        result.confidence
    )
}

pub async fn write_report(result: &PredictionResult, path: &Path) -> Result<(), AppError> {
    let report = render_report(result, &Local::now());
    tokio::fs::write(path, report)
        .await
        .map_err(|e| AppError::Io(format!("Failed to write report {}: {}", path.display(), e)))?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
