//! Error types for CarSight

/// Result type alias using CarSight's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for CarSight operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The classifier could not be built from its model artifact.
    /// Fatal for the adapter that requested it.
    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// A single classification failed or produced no results
    #[error("classification failed: {0}")]
    ClassificationFailed(String),

    /// Invalid frame data
    #[error("frame error: {0}")]
    Frame(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Image decoding errors
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier-unavailable error
    pub fn classifier_unavailable(msg: impl Into<String>) -> Self {
        Self::ClassifierUnavailable(msg.into())
    }

    /// Create a new classification-failed error
    pub fn classification_failed(msg: impl Into<String>) -> Self {
        Self::ClassificationFailed(msg.into())
    }

    /// Create a new frame error
    pub fn frame(msg: impl Into<String>) -> Self {
        Self::Frame(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error ends the adapter's usefulness
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ClassifierUnavailable(_))
    }
}
