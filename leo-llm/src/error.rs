use leo_core::LeoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} is not configured")]
    MissingApiKey(&'static str),
    #[error("invalid client configuration: {0}")]
    Config(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("OpenAI error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),
}

impl LlmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

impl From<LlmError> for LeoError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey(name) => LeoError::MissingCredential(name),
            LlmError::Config(message) => LeoError::InvalidConfig(message),
            other => LeoError::LlmProvider(other.to_string()),
        }
    }
}
