//! Psychoacoustic clipper
//!
//! Runs through whatever backend the registry resolves for [`CLIPPER_URI`].

use super::base::gain_specs;
use super::plugin_effect::PluginEffect;
use crate::error::Result;
use crate::plugin::{Binding, PluginRegistry, CLIPPER_URI};
use crate::settings::{SettingSpec, Settings};

pub const NAME: &str = "psyclipper";

/// Centre frequencies of the protection bands, in Hz
pub const PROTECTION_BANDS: [u32; 8] = [125, 250, 500, 1000, 2000, 4000, 8000, 16000];

fn protection_key(freq: u32) -> String {
    format!("protection{}", freq)
}

pub fn schema() -> Vec<SettingSpec> {
    let mut specs = gain_specs();
    specs.extend([
        SettingSpec::double("clip-level", 0.0, -30.0, 0.0),
        SettingSpec::boolean("auto-level", true),
        SettingSpec::boolean("diff-only", false),
        SettingSpec::double("adaptive-distortion", 0.1, 0.0, 1.0),
        SettingSpec::int("iterations", 10, 1, 20),
    ]);
    specs.extend(
        PROTECTION_BANDS
            .iter()
            .map(|freq| SettingSpec::int(protection_key(*freq), 12, 0, 48)),
    );
    specs
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipperConfig {
    pub clip_level: f64,
    pub auto_level: bool,
    pub diff_only: bool,
    pub adaptive_distortion: f64,
    pub iterations: i32,
    /// Protection per band, in [`PROTECTION_BANDS`] order
    pub protection: [i32; 8],
}

impl ClipperConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut protection = [0; 8];
        for (level, freq) in protection.iter_mut().zip(PROTECTION_BANDS) {
            *level = settings.get_int(&protection_key(freq))?;
        }

        Ok(Self {
            clip_level: settings.get_double("clip-level")?,
            auto_level: settings.get_bool("auto-level")?,
            diff_only: settings.get_bool("diff-only")?,
            adaptive_distortion: settings.get_double("adaptive-distortion")?,
            iterations: settings.get_int("iterations")?,
            protection,
        })
    }
}

/// Load the clipper and bind its keys to the plugin ports of the same name
pub fn create(registry: &PluginRegistry, settings: Settings) -> Result<PluginEffect> {
    let mut effect = PluginEffect::load(NAME, settings, registry, CLIPPER_URI)?;

    effect.bind(Binding::Double, "clip-level", "clip-level")?;
    effect.bind(Binding::Bool, "auto-level", "auto-level")?;
    effect.bind(Binding::Bool, "diff-only", "diff-only")?;
    effect.bind(Binding::Double, "adaptive-distortion", "adaptive-distortion")?;
    effect.bind(Binding::Int, "iterations", "iterations")?;
    for freq in PROTECTION_BANDS {
        let key = protection_key(freq);
        effect.bind(Binding::Int, &key, &key)?;
    }

    Ok(effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effect;
    use crate::plugin::{ControlPorts, PluginBackend};
    use std::sync::Arc;

    struct PortsOnly(Arc<ControlPorts>);

    impl PluginBackend for PortsOnly {
        fn uri(&self) -> &str {
            CLIPPER_URI
        }
        fn found_plugin(&self) -> bool {
            true
        }
        fn ports(&self) -> Arc<ControlPorts> {
            Arc::clone(&self.0)
        }
        fn create_instance(&mut self, _rate: u32) -> bool {
            true
        }
        fn has_instance(&self) -> bool {
            true
        }
        fn n_samples(&self) -> usize {
            0
        }
        fn set_n_samples(&mut self, _n_samples: usize) {}
        fn run(&mut self, _l: &[f32], _r: &[f32], left_out: &mut [f32], right_out: &mut [f32]) {
            left_out.fill(0.0);
            right_out.fill(0.0);
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ClipperConfig::from_settings(&Settings::new(NAME, schema())).unwrap();
        assert_eq!(config.iterations, 10);
        assert!(config.auto_level);
        assert_eq!(config.protection, [12; 8]);
    }

    #[test]
    fn test_keys_reach_ports() {
        let names: Vec<String> = schema()
            .into_iter()
            .map(|s| s.key)
            .filter(|k| !matches!(k.as_str(), "input-gain" | "output-gain" | "bypass"))
            .collect();
        let ports = Arc::new(ControlPorts::new(names.iter().map(|n| (n.clone(), 0.0))));

        let mut registry = PluginRegistry::new();
        let shared = Arc::clone(&ports);
        registry.register(CLIPPER_URI, move || Box::new(PortsOnly(Arc::clone(&shared))));

        let effect = create(&registry, Settings::new(NAME, schema())).unwrap();
        assert_eq!(ports.get("iterations"), Some(10.0));
        assert_eq!(ports.get("auto-level"), Some(1.0));

        effect.settings().set("protection4000", 30).unwrap();
        effect.settings().set("clip-level", -3.5).unwrap();
        assert_eq!(ports.get("protection4000"), Some(30.0));
        assert_eq!(ports.get("clip-level"), Some(-3.5));
    }

    #[test]
    fn test_without_backend_is_passthrough() {
        let registry = PluginRegistry::with_native();
        let mut effect = create(&registry, Settings::new(NAME, schema())).unwrap();
        assert!(!effect.found_plugin());
        effect.setup(48000, 4);

        let mut l = vec![0.1, 0.2, 0.3, 0.4];
        let mut r = l.clone();
        let mut lo = vec![0.0; 4];
        let mut ro = vec![0.0; 4];
        effect.process(&mut l, &mut r, &mut lo, &mut ro);
        assert_eq!(lo, l);
        assert_eq!(ro, r);
    }
}
