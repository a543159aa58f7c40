use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading data, training or evaluating.
#[derive(Debug, Error)]
pub enum MsfanError {
    /// A file required at startup could not be opened or read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The two embedding tables or the vocabulary disagree on shape.
    #[error("embedding shape mismatch: {0}")]
    EmbeddingShape(String),

    /// A triple carried a sentiment label outside negative/neutral/positive.
    #[error("unknown sentiment label: {0:?}")]
    UnknownSentiment(String),

    /// A batch index past `batch_count` was requested.
    #[error("batch index {index} out of range (batch count {count})")]
    BatchOutOfRange {
        /// Requested batch index.
        index: usize,
        /// Number of batches available.
        count: usize,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A checkpoint could not be written, found or restored.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Generic I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a dataset, vocabulary or sidecar file.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Candle ML framework error.
    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Result type alias for MSFAN operations.
pub type Result<T> = std::result::Result<T, MsfanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = MsfanError::BatchOutOfRange { index: 4, count: 2 };
        assert_eq!(
            err.to_string(),
            "batch index 4 out of range (batch count 2)"
        );

        let err = MsfanError::Read {
            path: PathBuf::from("data/res14/train.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("data/res14/train.json"));

        let err = MsfanError::UnknownSentiment("mixed".into());
        assert!(err.to_string().contains("mixed"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MsfanError>();
    }
}
