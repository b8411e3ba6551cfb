//! Result and error types for gifcast.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for gifcast operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Outcome of one encode job: a finished recording or the reason it failed
pub type EncodeResult = RecorderResult<crate::job::Recording>;

/// Errors that can occur while recording or encoding
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Encode requested with zero frames
    #[error("Cannot encode an empty frame sequence")]
    EmptySequence,

    /// A frame does not match the canvas established by the first frame
    #[error(
        "Frame {index} is {found_width}x{found_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        /// Position of the offending frame
        index: usize,
        /// Canvas width
        expected_width: u32,
        /// Canvas height
        expected_height: u32,
        /// Frame width
        found_width: u32,
        /// Frame height
        found_height: u32,
    },

    /// Frame rate is not positive
    #[error("Invalid frame rate: {fps} fps")]
    InvalidFrameRate {
        /// Configured frames per second
        fps: u32,
    },

    /// Raw pixel buffer does not match its declared dimensions
    #[error("Invalid frame: {message}")]
    InvalidFrame {
        /// Error message
        message: String,
    },

    /// Staging or finalize I/O failed
    #[error("Storage I/O failed at {}: {source}", path.display())]
    StorageIo {
        /// File or directory being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// GIF encoder failure
    #[error("GIF encoding failed: {message}")]
    Mux {
        /// Error message
        message: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

/// Coarse classification of a [`RecorderError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// See [`RecorderError::EmptySequence`]
    EmptySequence,
    /// See [`RecorderError::DimensionMismatch`]
    DimensionMismatch,
    /// See [`RecorderError::InvalidFrameRate`]
    InvalidFrameRate,
    /// See [`RecorderError::InvalidFrame`]
    InvalidFrame,
    /// See [`RecorderError::StorageIo`]
    StorageIo,
    /// See [`RecorderError::Mux`]
    Mux,
    /// See [`RecorderError::Config`]
    Config,
}

impl RecorderError {
    /// Create a storage error for the given path
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            source,
        }
    }

    /// Create an encoder error
    pub fn mux(message: impl Into<String>) -> Self {
        Self::Mux {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::EmptySequence => FailureKind::EmptySequence,
            Self::DimensionMismatch { .. } => FailureKind::DimensionMismatch,
            Self::InvalidFrameRate { .. } => FailureKind::InvalidFrameRate,
            Self::InvalidFrame { .. } => FailureKind::InvalidFrame,
            Self::StorageIo { .. } => FailureKind::StorageIo,
            Self::Mux { .. } => FailureKind::Mux,
            Self::Config { .. } => FailureKind::Config,
        }
    }
}

impl From<serde_yaml_ng::Error> for RecorderError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<serde_json::Error> for RecorderError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(err.to_string())
    }
}
