use crate::error::AppError;
use crate::models::classify_types::PredictionResult;
use crate::models::session_types::UploadedImage;
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::time::Duration;

/// The one call the upload flow makes to the classification service.
pub trait InferenceClient: Send + Sync {
    fn predict(&self, image: UploadedImage) -> BoxFuture<'_, Result<PredictionResult, AppError>>;
}

#[derive(Clone)]
pub struct HttpInferenceClient {
    client: reqwest::Client,
    predict_url: String,
}

impl HttpInferenceClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    async fn send(&self, image: UploadedImage) -> Result<PredictionResult, AppError> {
        let part = Part::bytes(image.raw_bytes)
            .file_name(image.filename)
            .mime_str(&image.mime_type)
            .map_err(|e| AppError::Service(format!("Invalid content type: {}", e)))?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(&self.predict_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Service(error_detail(status, &body)));
        }

        parse_prediction(&body)
    }
}

impl InferenceClient for HttpInferenceClient {
    fn predict(&self, image: UploadedImage) -> BoxFuture<'_, Result<PredictionResult, AppError>> {
        Box::pin(self.send(image))
    }
}

pub fn parse_prediction(body: &str) -> Result<PredictionResult, AppError> {
    let result: PredictionResult = serde_json::from_str(body)
        .map_err(|e| AppError::Service(format!("Unexpected response from classifier: {}", e)))?;

    if !result.confidence.is_finite() || !(0.0..=100.0).contains(&result.confidence) {
        return Err(AppError::Service(format!(
            "Classifier returned an out-of-range confidence: {}",
            result.confidence
        )));
    }

    Ok(result)
}

/// Human-readable reason for a failed call: the service's `detail` when the
/// body is JSON, the status text otherwise. reqwest does not expose the reason
/// phrase the server sent, so the status text is the canonical reason for the
/// code (`HTTP <code>` when the code has none).
pub fn error_detail(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("detail") {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail.clone(),
            Some(detail) if !detail.is_null() && !detail.is_string() => detail.to_string(),
            _ => json.to_string(),
        },
        Err(_) => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
    }
}
