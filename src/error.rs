//! Error types for pageslab.

/// Errors that abort a pipeline call.
///
/// Structuring failures never appear here. They degrade a page to its
/// raw text instead (see [`crate::ArtifactSource::RawFallback`]).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid token budget (must be > 0).
    #[error("invalid token budget: {0} (must be > 0)")]
    InvalidBudget(usize),

    /// A file id that cannot be used to namespace artifacts.
    #[error("invalid file id: {0:?}")]
    InvalidFileId(String),

    /// A configuration value outside its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading the input stream or an artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunk list (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The caller cancelled the run between pages.
    #[error("pipeline cancelled")]
    Cancelled,
}

/// Result type for pageslab operations.
pub type Result<T> = std::result::Result<T, Error>;
