use super::value_objects::SessionPhase;
use crate::analysis::AnalysisError;
use crate::persistence::RepositoryError;

// ============================================================================
// Order Session Business Rule Errors
// ============================================================================

/// Input the caller can correct and retry with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("A client must be selected")]
    MissingClient,

    #[error("Order has no items")]
    EmptyItems,

    #[error("Order must be signed before it is finalized")]
    MissingSignature,

    #[error("Item has no product code")]
    MissingCode,

    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("Client {resolved} does not match selected client {selected}")]
    ClientMismatch { selected: String, resolved: String },
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Image analysis failed: {0}")]
    AnalysisFailure(#[from] AnalysisError),

    #[error("Order session is already finalized")]
    AlreadyFinalized,

    #[error("Operation not allowed while session is {0:?}")]
    InvalidPhase(SessionPhase),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Failed to store order: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("Aggregate not initialized")]
    NotInitialized,
}

impl OrderError {
    /// Whether retrying the same call can succeed without changing the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::AnalysisFailure(_) | OrderError::Persistence(_))
    }
}
