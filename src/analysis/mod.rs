// ============================================================================
// Image Analysis - External Tag Recognition
// ============================================================================
//
// The recognition service is a black box: it takes a photo and returns one
// `RawTagReading` per price tag. Everything here is the seam to it plus the
// parsing of its JSON answer.
//
// ============================================================================

mod parser;
mod recorded;

pub use parser::parse_analysis_response;
pub use recorded::RecordedAnalyzer;

use async_trait::async_trait;

use crate::domain::order::RawTagReading;
use crate::utils::IsTransient;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("No image data provided")]
    EmptyImage,

    #[error("Unsupported image type: {0}")]
    UnsupportedMimeType(String),

    #[error("Analysis service unreachable: {0}")]
    Transport(String),

    #[error("Analysis service returned an error: {0}")]
    Service(String),

    #[error("Could not parse analysis response: {0}")]
    Parse(String),
}

impl AnalysisError {
    /// Short label used for the failure metric
    pub fn reason(&self) -> &'static str {
        match self {
            AnalysisError::EmptyImage => "empty_image",
            AnalysisError::UnsupportedMimeType(_) => "unsupported_mime_type",
            AnalysisError::Transport(_) => "transport",
            AnalysisError::Service(_) => "service",
            AnalysisError::Parse(_) => "parse",
        }
    }
}

impl IsTransient for AnalysisError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            AnalysisError::Transport(_) | AnalysisError::Service(_) | AnalysisError::Parse(_)
        )
    }
}

/// Reject input no analyzer could do anything with.
pub fn validate_image(image: &[u8], mime_type: &str) -> Result<(), AnalysisError> {
    if image.is_empty() {
        return Err(AnalysisError::EmptyImage);
    }
    if !mime_type.starts_with("image/") {
        return Err(AnalysisError::UnsupportedMimeType(mime_type.to_string()));
    }
    Ok(())
}

/// Guess an image MIME type from a file extension
pub fn mime_type_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

/// Recognition service: photo in, ordered tag readings out. A failed call
/// returns no readings at all.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<Vec<RawTagReading>, AnalysisError>;
}
