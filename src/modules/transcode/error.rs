use thiserror::Error;

/// Everything that can go wrong between intake and finalization.
///
/// Validation and identity failures surface synchronously to the intake
/// caller; the pipeline variants are caught at the stage boundary inside the
/// worker and converted into a job-failure transition, never rethrown.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("unsupported container format: {0}")]
    UnsupportedContainer(String),

    #[error("source resolution {height}p is below the {min}p minimum")]
    ResolutionTooLow { height: u32, min: u32 },

    #[error("could not allocate a unique content id")]
    IdentityExhausted,

    #[error("unsupported audio codec: {0}")]
    UnsupportedAudioCodec(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("queue error: {0}")]
    Queue(String),
}

impl TranscodeError {
    /// True for errors the intake caller gets back before any job exists.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TranscodeError::UnsupportedContainer(_) | TranscodeError::ResolutionTooLow { .. }
        )
    }
}

impl From<sqlx::Error> for TranscodeError {
    fn from(e: sqlx::Error) -> Self {
        TranscodeError::Store(e.to_string())
    }
}

impl From<redis::RedisError> for TranscodeError {
    fn from(e: redis::RedisError) -> Self {
        TranscodeError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for TranscodeError {
    fn from(e: serde_json::Error) -> Self {
        TranscodeError::Store(e.to_string())
    }
}
