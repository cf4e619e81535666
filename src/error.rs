use serde::Serialize;
use thiserror::Error;

/// Main error type for the clip normalizer library
#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("Clip processing error: {0}")]
    Clip(#[from] ClipError),

    #[error("Clip table error: {0}")]
    Table(#[from] TableError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while normalizing a single clip
///
/// None of these escape [`ClipNormalizer::clip`](crate::clip::ClipNormalizer::clip);
/// they are folded into a failed [`ClipResult`](crate::clip::ClipResult).
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("Source video not found: {path}")]
    SourceNotFound { path: String },

    #[error("Malformed time specification '{value}': {reason}")]
    MalformedTimeSpec { value: String, reason: String },

    #[error("Invalid time range {start}s-{end}s for source of {duration}s")]
    InvalidRange { start: f64, end: f64, duration: f64 },

    #[error("Failed to probe {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Video decoding failed: {reason}")]
    DecodeFailure { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodeFailure { reason: String },

    #[error("Backend fault: {reason}")]
    BackendFault { reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tag identifying which stage of the pipeline rejected a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClipErrorKind {
    SourceNotFound,
    MalformedTimeSpec,
    InvalidRange,
    ProbeFailed,
    DecodeFailure,
    EncodeFailure,
    BackendFault,
    Io,
}

/// Clip table errors
#[derive(Error, Debug, Clone)]
pub enum TableError {
    #[error("Clip table not found: {path}")]
    FileNotFound { path: String },

    #[error("Clip table has no '{column}' column")]
    MissingColumn { column: String },

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Unsupported table delimiter '{delimiter}': must be a single ASCII character")]
    UnsupportedDelimiter { delimiter: char },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using NormalizerError
pub type Result<T> = std::result::Result<T, NormalizerError>;

impl NormalizerError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Table(TableError::FileNotFound { path }) => {
                format!("Clip table '{}' not found.", path)
            }
            Self::Table(TableError::MissingColumn { column }) => {
                format!("Clip table is missing the '{}' column. Check the [table] section of the configuration.", column)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

impl ClipError {
    pub fn kind(&self) -> ClipErrorKind {
        match self {
            Self::SourceNotFound { .. } => ClipErrorKind::SourceNotFound,
            Self::MalformedTimeSpec { .. } => ClipErrorKind::MalformedTimeSpec,
            Self::InvalidRange { .. } => ClipErrorKind::InvalidRange,
            Self::ProbeFailed { .. } => ClipErrorKind::ProbeFailed,
            Self::DecodeFailure { .. } => ClipErrorKind::DecodeFailure,
            Self::EncodeFailure { .. } => ClipErrorKind::EncodeFailure,
            Self::BackendFault { .. } => ClipErrorKind::BackendFault,
            Self::Io { .. } => ClipErrorKind::Io,
        }
    }

    pub(crate) fn malformed_time<V: Into<String>, R: Into<String>>(value: V, reason: R) -> Self {
        Self::MalformedTimeSpec {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io<P: AsRef<std::path::Path>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
