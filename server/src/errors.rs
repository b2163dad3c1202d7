use thiserror::Error;

/// Failures of the auxiliary providers (web search, page preview).
///
/// These never reach the HTTP client; callers log them and degrade.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("unexpected response: {0}")]
    Parse(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
