use crate::models::classify_types::ResultView;
use crate::models::history_types::HistoryEntry;
use serde::Serialize;

/// Unvalidated file handed over by the uploader (drag-and-drop or browse).
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageCandidate {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub raw_bytes: Vec<u8>,
    pub preview: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Ready,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub size_label: String,
    pub mime_type: String,
    pub preview: String,
}

impl From<&UploadedImage> for ImageInfo {
    fn from(image: &UploadedImage) -> Self {
        Self {
            filename: image.filename.clone(),
            size_bytes: image.size_bytes,
            size_label: format!("{:.2} KB", image.size_bytes as f64 / 1024.0),
            mime_type: image.mime_type.clone(),
            preview: image.preview.clone(),
        }
    }
}

/// Everything the frontend needs to render the uploader, results and history.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub image: Option<ImageInfo>,
    pub result: Option<ResultView>,
    pub error: Option<String>,
    pub history: Vec<HistoryEntry>,
}
