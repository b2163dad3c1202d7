use thiserror::Error;

/// Errors raised while talking to the Gemini API or loading configuration
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("Gemini API error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl GeminiError {
    /// HTTP status returned by the upstream API, if the failure carried one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Result type for Gemini operations
pub type GeminiResult<T> = Result<T, GeminiError>;
