use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextGraphError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown relation type: {0}")]
    UnknownRelationType(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ContextGraphError {
    /// Whether the caller may retry the request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ContextGraphError::StoreUnavailable(_))
    }

    /// Errors the orchestrator absorbs during resolution by descending the
    /// fallback ladder.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            ContextGraphError::StoreUnavailable(_) | ContextGraphError::EmbedderUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ContextGraphError>;
