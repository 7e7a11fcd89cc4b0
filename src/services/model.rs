//! Mock ML model loader.

use serde::Serialize;

/// Metadata of the simulated sentiment model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub version: String,
    pub accuracy: f64,
}

impl ModelInfo {
    pub fn sentiment_analyzer() -> Self {
        Self {
            model_name: "Sentiment Analyzer".to_string(),
            version: "1.0".to_string(),
            accuracy: 0.87,
        }
    }
}
