//! Recorder error taxonomy

use crate::recorder::events::LogLevel;
use crate::storage::error::StorageError;
use thiserror::Error;

/// Errors that can occur while recording
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Tracking provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Camera access denied")]
    CameraDenied,

    #[error("Calibration failed (attempt {attempt} of {max})")]
    CalibrationFailed { attempt: u32, max: u32 },

    #[error("Calibration failed {attempts} times; reset required before tracking again")]
    RecoveryExhausted { attempts: u32 },

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("No data to export")]
    ExportEmpty,

    #[error("Export error: {0}")]
    ExportError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RecorderError {
    /// Level of the user-visible log line this error turns into
    pub fn level(&self) -> LogLevel {
        match self {
            RecorderError::CalibrationFailed { .. }
            | RecorderError::StorageError(_)
            | RecorderError::ExportEmpty => LogLevel::Warning,
            _ => LogLevel::Error,
        }
    }
}

/// Result type for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(RecorderError::ExportEmpty.level(), LogLevel::Warning);
        assert_eq!(
            RecorderError::CalibrationFailed { attempt: 1, max: 3 }.level(),
            LogLevel::Warning
        );
        assert_eq!(
            RecorderError::StorageError(StorageError::EmptySession).level(),
            LogLevel::Warning
        );
        assert_eq!(RecorderError::CameraDenied.level(), LogLevel::Error);
        assert_eq!(RecorderError::RecoveryExhausted { attempts: 3 }.level(), LogLevel::Error);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            RecorderError::CalibrationFailed { attempt: 2, max: 3 }.to_string(),
            "Calibration failed (attempt 2 of 3)"
        );
        assert_eq!(RecorderError::ExportEmpty.to_string(), "No data to export");
    }
}
