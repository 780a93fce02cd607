//! Equal-loudness compensation

use super::base::gain_specs;
use super::plugin_effect::PluginEffect;
use crate::error::Result;
use crate::plugin::{Binding, PluginRegistry, LOUDNESS_URI};
use crate::settings::{SettingSpec, Settings};

pub const NAME: &str = "loudness";

pub const FFT_SIZES: &[&str] = &["256", "512", "1024", "2048", "4096", "8192", "16384"];

/// Equal-loudness contour standards
pub const STANDARDS: &[&str] = &[
    "Flat",
    "ISO226-2003",
    "Fletcher-Munson",
    "Robinson-Dadson",
    "ISO226-2023",
];

pub fn schema() -> Vec<SettingSpec> {
    let mut specs = gain_specs();
    specs.extend([
        SettingSpec::enumeration("fft", FFT_SIZES, "4096"),
        SettingSpec::enumeration("std", STANDARDS, "ISO226-2003"),
        SettingSpec::double("volume", 0.0, -83.0, 7.0),
    ]);
    specs
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessConfig {
    pub fft_size: usize,
    pub standard: String,
    pub volume_db: f64,
}

impl LoudnessConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let fft = settings.get_enum_nick("fft")?;
        Ok(Self {
            fft_size: fft.parse().unwrap_or(4096),
            standard: settings.get_enum_nick("std")?,
            volume_db: settings.get_double("volume")?,
        })
    }
}

pub fn create(registry: &PluginRegistry, settings: Settings) -> Result<PluginEffect> {
    let mut effect = PluginEffect::load(NAME, settings, registry, LOUDNESS_URI)?;

    effect.bind(Binding::Enum, "fft", "fft")?;
    effect.bind(Binding::Enum, "std", "std")?;
    effect.bind(Binding::Double, "volume", "volume")?;

    Ok(effect)
}
