use std::path::PathBuf;

use leo_core::LeoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unsupported file extension '{extension}' for {path}")]
    UnsupportedExtension { path: PathBuf, extension: String },
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    /// Timeouts, refused connections, 429 and 5xx answers.
    #[error("{url} is temporarily unavailable: {message}")]
    Unavailable { url: String, message: String },
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl IngestionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestionError::Unavailable { .. })
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        IngestionError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<IngestionError> for LeoError {
    fn from(err: IngestionError) -> Self {
        LeoError::Custom(err.to_string())
    }
}
