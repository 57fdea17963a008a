use async_trait::async_trait;
use std::path::Path;
use anyhow::{Context, Result};

use super::{parse_analysis_response, validate_image, AnalysisError, ImageAnalyzer};
use crate::domain::order::RawTagReading;

/// Replays a response previously captured from the recognition service.
///
/// Used for offline order entry and demos; the photo is validated but not
/// inspected.
pub struct RecordedAnalyzer {
    readings: Vec<RawTagReading>,
}

impl RecordedAnalyzer {
    pub fn from_json(payload: &str) -> Result<Self, AnalysisError> {
        Ok(Self {
            readings: parse_analysis_response(payload)?,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis response {}", path.display()))?;
        Self::from_json(&payload)
            .with_context(|| format!("Invalid analysis response in {}", path.display()))
    }
}

#[async_trait]
impl ImageAnalyzer for RecordedAnalyzer {
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<Vec<RawTagReading>, AnalysisError> {
        validate_image(image, mime_type)?;

        tracing::debug!(
            bytes = image.len(),
            mime_type = %mime_type,
            readings = self.readings.len(),
            "Replaying recorded analysis"
        );

        Ok(self.readings.clone())
    }
}
