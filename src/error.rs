//! Error handling for fxrack
//!
//! Real-time `process` paths never return errors; everything here surfaces
//! from control-side operations (settings, presets, kernel files).

use thiserror::Error;

/// Result type alias for fxrack operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Main error type for fxrack operations
#[derive(Error, Debug)]
pub enum FxError {
    // Impulse response errors
    #[error("Impulse response not found: {path}")]
    KernelNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid impulse response: {reason}")]
    InvalidKernel { reason: String },

    #[error("Invalid kernel name '{name}': {reason}")]
    InvalidKernelName { name: String, reason: String },

    // Settings errors
    #[error("Unknown setting: {key}")]
    UnknownSetting { key: String },

    #[error("Invalid value for setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    // Processing errors
    #[error("Resampling failed: {reason}")]
    Resample { reason: String },

    #[error("Invalid audio: {reason}")]
    InvalidAudio { reason: String },

    // Persistence errors
    #[error("Preset error: {reason}")]
    Preset { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::KernelNotFound { .. } => "KERNEL_NOT_FOUND",
            FxError::InvalidKernel { .. } => "INVALID_KERNEL",
            FxError::InvalidKernelName { .. } => "INVALID_KERNEL_NAME",
            FxError::UnknownSetting { .. } => "UNKNOWN_SETTING",
            FxError::InvalidSetting { .. } => "INVALID_SETTING",
            FxError::Resample { .. } => "RESAMPLE_ERROR",
            FxError::InvalidAudio { .. } => "INVALID_AUDIO",
            FxError::Preset { .. } => "PRESET_ERROR",
            FxError::Config { .. } => "CONFIG_ERROR",
            FxError::Io(_) => "IO_ERROR",
            FxError::Wav(_) => "WAV_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by correcting user input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FxError::KernelNotFound { .. }
                | FxError::InvalidKernelName { .. }
                | FxError::InvalidSetting { .. }
                | FxError::Preset { .. }
        )
    }

    pub(crate) fn invalid_setting(key: &str, reason: impl Into<String>) -> Self {
        FxError::InvalidSetting {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
