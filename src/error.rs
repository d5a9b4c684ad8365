use std::path::PathBuf;

use thiserror::Error;

/// Every failure the search core can report to its caller.
#[derive(Error, Debug)]
pub enum BvrError {
    #[error("invalid image directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("detection failed for {}: {cause}", path.display())]
    ImageDetection { path: PathBuf, cause: String },

    #[error("metadata file not found at {} or {}", given.display(), fallback.display())]
    MetadataNotFound { given: PathBuf, fallback: PathBuf },

    #[error("malformed metadata in {}: {reason}", path.display())]
    MalformedMetadata { path: PathBuf, reason: String },

    #[error("invalid search spec: {0}")]
    InvalidSearchSpec(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BvrError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BvrError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        BvrError::MalformedMetadata {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
