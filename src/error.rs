use thiserror::Error;

/// Failures the proxy can surface to a caller.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unsupported language code '{code}'. Supported codes: {}", .supported.join(", "))]
    UnsupportedLanguage {
        code: String,
        supported: Vec<String>,
    },

    #[error("No extractable text found in the uploaded document")]
    EmptyDocument,

    #[error("Error with Groq API: {0}")]
    Upstream(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ProxyError::InvalidInput(msg.into())
    }

    pub fn upstream(err: impl std::fmt::Display) -> Self {
        ProxyError::Upstream(err.to_string())
    }

    pub fn speech(err: impl std::fmt::Display) -> Self {
        ProxyError::Speech(err.to_string())
    }

    /// True for errors caused by the caller's input rather than by this
    /// service or an upstream dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProxyError::InvalidInput(_)
                | ProxyError::UnsupportedLanguage { .. }
                | ProxyError::EmptyDocument
        )
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
