//! Error types for the timeline player
//!
//! This module defines the error type used throughout the crate. We use
//! thiserror for the error definitions; callers that want application-level
//! error handling can wrap these in anyhow.

use thiserror::Error;

/// Main error type for the timeline player
#[derive(Error, Debug)]
pub enum PlayerError {
    /// The timeline handed to the player cannot be played
    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    /// Audio device errors
    #[error("Audio error: {0}")]
    Audio(String),

    /// Read (decode) errors reported by a timeline request
    #[error("Read error: {0}")]
    Read(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Player linking errors
    #[error("Synchronization error: {0}")]
    Sync(String),

    /// Generic error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlayerError {
    /// Create a read error from string
    pub fn read_error<S: Into<String>>(msg: S) -> Self {
        PlayerError::Read(msg.into())
    }
}

/// Convenience type alias for Results in the timeline player
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Extension trait for converting other errors to PlayerError
pub trait IntoPlayerError<T> {
    /// Convert this error into a PlayerError with the given context
    fn audio_err(self, context: &str) -> Result<T>;
    fn read_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn audio_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Audio(format!("{}: {}", context, e)))
    }

    fn read_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Read(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Config(format!("{}: {}", context, e)))
    }
}

/// Helper macro for creating internal errors with file and line information
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::utils::error::PlayerError::Internal(
            format!("{} at {}:{}", $msg, file!(), line!())
        )
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::utils::error::PlayerError::Internal(
            format!("{} at {}:{}", format!($fmt, $($arg)*), file!(), line!())
        )
    };
}
