use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Benign,
    Malignant,
}

impl Prediction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prediction::Benign => "Benign",
            Prediction::Malignant => "Malignant",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            Prediction::Malignant => "A malignant classification suggests cancerous cells that can invade nearby tissues and spread to other parts of the body.",
            Prediction::Benign => "A benign classification suggests non-cancerous cells that do not invade nearby tissues or spread to other parts of the body.",
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a successful `/predict` response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub prediction: Prediction,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap_url: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Moderate,
    Fair,
    Low,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 90.0 {
            ConfidenceBand::High
        } else if confidence >= 70.0 {
            ConfidenceBand::Moderate
        } else if confidence >= 50.0 {
            ConfidenceBand::Fair
        } else {
            ConfidenceBand::Low
        }
    }
}

pub const MEDICAL_NOTE: &str =
    "This is an AI-assisted classification and should be confirmed by a medical professional.";

/// A result as the results panel renders it.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub prediction: Prediction,
    pub confidence: f64,
    pub heatmap_url: Option<String>,
    pub heatmap_available: bool,
    pub confidence_band: ConfidenceBand,
    pub explanation: &'static str,
    pub note: &'static str,
}

impl From<&PredictionResult> for ResultView {
    fn from(result: &PredictionResult) -> Self {
        Self {
            prediction: result.prediction,
            confidence: result.confidence,
            heatmap_url: result.heatmap_url.clone(),
            heatmap_available: result.heatmap_url.is_some(),
            confidence_band: ConfidenceBand::from_confidence(result.confidence),
            explanation: result.prediction.explanation(),
            note: MEDICAL_NOTE,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub architecture: &'static str,
    pub accuracy: f32,
    pub auc: f32,
    pub sensitivity: f32,
    pub specificity: f32,
    pub dataset: &'static str,
    pub last_updated: &'static str,
    pub disclaimer: &'static str,
}

impl ModelInfo {
    pub fn current() -> Self {
        Self {
            architecture: "MobileNetV2 (fine-tuned)",
            accuracy: 92.7,
            auc: 0.95,
            sensitivity: 91.3,
            specificity: 94.1,
            dataset: "Trained on BreakHis dataset containing 7,909 histopathological images of breast tumor tissue",
            last_updated: "2025-04-28",
            disclaimer: "This tool is for research and educational purposes only. It is not intended to be a substitute for professional medical advice, diagnosis, or treatment.",
        }
    }
}
