//! Effects
//!
//! Every effect processes stereo blocks through the same
//! `process(left_in, right_in, left_out, right_out)` contract:
//! outputs are fully overwritten on every call, and any condition that
//! prevents real processing (bypass, missing plugin, no engine yet)
//! degrades to an identity copy.

pub mod base;
pub mod chain;
pub mod clipper;
pub mod equalizer;
pub mod loudness;
pub mod pitch;
pub mod plugin_effect;

pub use base::{gain_specs, passthrough, EffectBase};
pub use chain::EffectChain;
pub use clipper::ClipperConfig;
pub use equalizer::{BandState, Equalizer, EqualizerConfig};
pub use loudness::LoudnessConfig;
pub use pitch::{Pitch, PitchConfig};
pub use plugin_effect::PluginEffect;

use crate::error::{FxError, Result};
use crate::notify::Notifier;
use crate::plugin::PluginRegistry;
use crate::settings::Settings;

/// A block-processing effect
pub trait Effect: Send {
    fn base(&self) -> &EffectBase;

    fn base_mut(&mut self) -> &mut EffectBase;

    /// (Re)configure for a sample rate and nominal block size
    fn setup(&mut self, rate: u32, n_samples: usize);

    /// Process one block
    ///
    /// The input slices may be modified in place (input gain is applied to
    /// them). Outputs have the same length as the inputs.
    fn process(
        &mut self,
        left_in: &mut [f32],
        right_in: &mut [f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    );

    /// Current internal buffering latency
    fn latency_seconds(&self) -> f32 {
        0.0
    }

    fn name(&self) -> &'static str {
        self.base().name()
    }

    fn settings(&self) -> &Settings {
        self.base().settings()
    }

    /// Extra named settings groups stored beside the main one in presets
    fn channel_settings(&self) -> Vec<(&'static str, &Settings)> {
        Vec::new()
    }

    fn set_notifier(&mut self, notifier: Notifier) {
        self.base_mut().set_notifier(Some(notifier));
    }

    /// Enable or disable peak notifications
    fn set_post_messages(&mut self, enabled: bool) {
        self.base_mut().set_post_messages(enabled);
    }
}

/// Names accepted by [`create_effect`], in preset order
pub const EFFECT_NAMES: &[&str] = &[
    pitch::NAME,
    equalizer::NAME,
    clipper::NAME,
    loudness::NAME,
];

/// Build an effect by name with fresh default settings
pub fn create_effect(name: &str, registry: &PluginRegistry) -> Result<Box<dyn Effect>> {
    let effect: Box<dyn Effect> = match name {
        pitch::NAME => Box::new(Pitch::new(Settings::new(pitch::NAME, pitch::schema()))?),
        equalizer::NAME => Box::new(Equalizer::new(registry)?),
        clipper::NAME => Box::new(clipper::create(
            registry,
            Settings::new(clipper::NAME, clipper::schema()),
        )?),
        loudness::NAME => Box::new(loudness::create(
            registry,
            Settings::new(loudness::NAME, loudness::schema()),
        )?),
        other => {
            return Err(FxError::Config {
                reason: format!("unknown effect '{}'", other),
            })
        }
    };
    Ok(effect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_every_named_effect() {
        let registry = PluginRegistry::with_native();
        for name in EFFECT_NAMES {
            let effect = create_effect(name, &registry).unwrap();
            assert_eq!(effect.name(), *name);
        }
        assert!(create_effect("reverb", &registry).is_err());
    }
}
