//! Error types for usage reporting

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by user-supplied hooks and sinks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for usage reporting operations
#[derive(Error, Debug)]
pub enum Error {
    /// A trace builder operation was called out of sequence
    #[error("Trace builder misuse: {0}")]
    Phase(String),

    /// A histogram bucket index fell outside the fixed domain
    #[error("Histogram bucket {bucket} is out of bounds (max {max})")]
    BucketOutOfRange { bucket: usize, max: usize },

    /// A trace was handed to the sampler before it was stopped
    #[error("Trace has no end time; was it stopped?")]
    MissingEndTime,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Protobuf encoding error
    #[error("Encoding error: {0}")]
    Encode(#[from] prost::EncodeError),

    /// The pipeline channel is closed
    #[error("Channel error: {0}")]
    Channel(String),

    /// The report sink rejected a report
    #[error("Report sink error: {0}")]
    Sink(String),
}

impl Error {
    /// Create a phase error
    pub fn phase(msg: impl Into<String>) -> Self {
        Self::Phase(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
