//! Error types for ShadeReel.

use std::io;
use thiserror::Error;

/// Main error type for ShadeReel operations.
#[derive(Error, Debug)]
pub enum ShadeReelError {
    /// Bad counts, non-positive durations, malformed ranges.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Corrupt or missing image, clip, or audio input.
    #[error("Source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Encoder failure: {0}")]
    EncoderFailure(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Render cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ShadeReelError {
    /// Shorthand for [`ShadeReelError::InvalidParameter`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Shorthand for [`ShadeReelError::SourceUnreadable`].
    pub fn unreadable(msg: impl Into<String>) -> Self {
        Self::SourceUnreadable(msg.into())
    }

    /// Classify an I/O error raised while writing output.
    ///
    /// A full disk becomes `ResourceExhausted`; anything else on the write path
    /// is an encoder failure.
    pub fn from_write(err: io::Error, context: &str) -> Self {
        match err.kind() {
            io::ErrorKind::StorageFull | io::ErrorKind::OutOfMemory => {
                Self::ResourceExhausted(format!("{context}: {err}"))
            }
            _ => Self::EncoderFailure(format!("{context}: {err}")),
        }
    }

    /// Whether a batch must stop after this error instead of moving on to the
    /// next item.
    pub fn is_fatal_for_batch(&self) -> bool {
        match self {
            Self::InvalidParameter(_) | Self::SourceUnreadable(_) | Self::Serialization(_) => false,
            Self::EncoderFailure(_) | Self::ResourceExhausted(_) | Self::Cancelled => true,
            Self::Io(e) => matches!(e.kind(), io::ErrorKind::StorageFull),
        }
    }
}

/// Result type alias for ShadeReel operations.
pub type Result<T> = std::result::Result<T, ShadeReelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_full_is_resource_exhausted() {
        let err = ShadeReelError::from_write(
            io::Error::new(io::ErrorKind::StorageFull, "no space left"),
            "writing frame 12",
        );
        assert!(matches!(err, ShadeReelError::ResourceExhausted(_)));
        assert!(err.is_fatal_for_batch());
    }

    #[test]
    fn test_broken_pipe_is_encoder_failure() {
        let err = ShadeReelError::from_write(
            io::Error::new(io::ErrorKind::BrokenPipe, "ffmpeg went away"),
            "writing frame 3",
        );
        assert!(matches!(err, ShadeReelError::EncoderFailure(_)));
        assert!(err.to_string().contains("writing frame 3"));
    }

    #[test]
    fn test_unreadable_source_is_recoverable() {
        assert!(!ShadeReelError::unreadable("cat.png: bad header").is_fatal_for_batch());
        assert!(!ShadeReelError::invalid("keyframes must be >= 2").is_fatal_for_batch());
        assert!(ShadeReelError::Cancelled.is_fatal_for_batch());
    }
}
