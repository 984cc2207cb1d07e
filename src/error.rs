#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Source unreadable: {path}: {message}")]
    SourceRead { path: String, message: String },

    #[error("Destination write failed: {path}: {message}")]
    DestinationWrite {
        path: String,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Archive error: {path}: {message}")]
    ArchiveError { path: String, message: String },

    #[error("Fatal abort: {message}")]
    FatalAbort { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a stable kind string for log output and diagnostics
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::SourceRead { .. } => "SOURCE_READ_ERROR",
            Self::DestinationWrite { .. } => "DEST_WRITE_ERROR",
            Self::InvalidPath { .. } => "INVALID_PATH",
            Self::ConfigError { .. } => "CONFIG_ERROR",
            Self::ArchiveError { .. } => "ARCHIVE_ERROR",
            Self::FatalAbort { .. } => "FATAL_ABORT",
            Self::Io(_) => "IO_ERROR",
            Self::SerdeJson(_) => "PARSE_ERROR",
            Self::Regex(_) => "PATTERN_ERROR",
            Self::Other(_) => "UNKNOWN_ERROR",
        }
    }

    /// Per-file errors are contained by the pipeline; everything else
    /// terminates the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceRead { .. } | Self::DestinationWrite { .. } | Self::ArchiveError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
