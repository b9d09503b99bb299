use crate::models::classify_types::Prediction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub filename: String,
    pub timestamp: String,
    pub prediction: Prediction,
    pub confidence: f64,
}
