//! Host configuration
//!
//! Values the host decides once at startup. Passed explicitly into the
//! components that need them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FxError, Result};

/// Extension of impulse response files
pub const IRS_EXTENSION: &str = "irs";

/// Default peak notification window in seconds
pub const DEFAULT_NOTIFICATION_WINDOW: f32 = 1.0 / 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory holding `*.irs` impulse responses
    pub irs_dir: PathBuf,
    /// Processing sample rate in Hz
    pub sample_rate: u32,
    /// Frames per processing block
    pub block_size: usize,
    /// Minimum interval between peak notifications
    pub notification_window_secs: f32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            irs_dir: default_irs_dir(),
            sample_rate: 48000,
            block_size: 512,
            notification_window_secs: DEFAULT_NOTIFICATION_WINDOW,
        }
    }
}

impl HostConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: HostConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(FxError::Config {
                reason: "sample_rate must be positive".to_string(),
            });
        }
        if self.block_size == 0 {
            return Err(FxError::Config {
                reason: "block_size must be positive".to_string(),
            });
        }
        if self.notification_window_secs.is_nan() || self.notification_window_secs <= 0.0 {
            return Err(FxError::Config {
                reason: "notification_window_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// `<user config dir>/fxrack/irs`, falling back to the working directory
pub fn default_irs_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fxrack")
        .join("irs")
}
