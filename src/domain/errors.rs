use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Gateway error: {0}")]
    Gateway(String),
    #[error("Gateway timed out: {0}")]
    GatewayTimeout(String),
    #[error("{0}")]
    Signature(String),
    #[error("Not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Whether the caller may safely retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::DataUnavailable(_) | DomainError::GatewayTimeout(_)
        )
    }
}
