use thiserror::Error;

/// Result type for upload engine operations
pub type ResumableResult<T> = Result<T, ResumableError>;

/// Errors that can occur while decoding, storing or assembling chunks
#[derive(Error, Debug)]
pub enum ResumableError {
    #[error("Missing parameter: {name}")]
    MissingParameter { name: String },

    #[error("Invalid value for parameter {name}: {value:?}")]
    InvalidParameter { name: String, value: String },

    #[error("Invalid chunk size: {size}")]
    InvalidChunkSize { size: i64 },

    #[error("Object already exists: {key}")]
    AlreadyExists { key: String },

    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ResumableError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a missing parameter error
    pub fn missing<S: Into<String>>(name: S) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create an invalid parameter error
    pub fn invalid<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create an already-exists error
    pub fn already_exists<S: Into<String>>(key: S) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// True for errors caused by a malformed request rather than storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidChunkSize { .. }
        )
    }
}
