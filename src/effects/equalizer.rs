//! 32-band parametric equalizer
//!
//! Three settings groups: the main group (gains, bypass, mode, band count,
//! split-channels) and one group per channel holding the band fields. Every
//! band field is bound to the matching filter-bank port.
//!
//! While the channels are linked (`split-channels` off) edits of the left
//! bands are mirrored to the right ones. Turning `split-channels` off copies
//! every left band onto the right once. Edits made while split stay on their
//! own channel.

use super::base::{gain_specs, EffectBase};
use super::plugin_effect::PluginEffect;
use super::Effect;
use crate::error::Result;
use crate::plugin::para_eq::{BAND_MODES, BAND_SLOPES, BAND_TYPES, EQ_MODES, MAX_BANDS};
use crate::plugin::{Binding, PluginRegistry, EQUALIZER_URI};
use crate::settings::{SettingSpec, Settings, Subscription};

pub const NAME: &str = "equalizer";

/// Bands active by default
pub const DEFAULT_NUM_BANDS: i32 = 8;

/// The eight per-band fields, as they appear in keys
pub const BAND_FIELDS: [&str; 8] = [
    "type",
    "mode",
    "slope",
    "solo",
    "mute",
    "frequency",
    "gain",
    "q",
];

pub fn band_key(n: usize, field: &str) -> String {
    format!("band{}-{}", n, field)
}

/// Main group schema
pub fn schema() -> Vec<SettingSpec> {
    let mut specs = gain_specs();
    specs.extend([
        SettingSpec::enumeration("mode", EQ_MODES, "IIR"),
        SettingSpec::int("num-bands", DEFAULT_NUM_BANDS, 1, MAX_BANDS as i32),
        SettingSpec::boolean("split-channels", false),
    ]);
    specs
}

/// Octave-spaced default centre frequencies, 31.25 Hz to 16 kHz
fn default_frequency(n: usize) -> f64 {
    31.25 * 2.0_f64.powi((n % 10) as i32)
}

/// Per-channel group schema
pub fn channel_schema() -> Vec<SettingSpec> {
    let mut specs = Vec::with_capacity(MAX_BANDS * BAND_FIELDS.len());
    for n in 0..MAX_BANDS {
        let default_type = if (n as i32) < DEFAULT_NUM_BANDS {
            "Bell"
        } else {
            "Off"
        };
        specs.extend([
            SettingSpec::enumeration(band_key(n, "type"), BAND_TYPES, default_type),
            SettingSpec::enumeration(band_key(n, "mode"), BAND_MODES, "RLC (BT)"),
            SettingSpec::enumeration(band_key(n, "slope"), BAND_SLOPES, "x1"),
            SettingSpec::boolean(band_key(n, "solo"), false),
            SettingSpec::boolean(band_key(n, "mute"), false),
            SettingSpec::double(band_key(n, "frequency"), default_frequency(n), 10.0, 24000.0),
            SettingSpec::double(band_key(n, "gain"), 0.0, -36.0, 36.0),
            SettingSpec::double(band_key(n, "q"), 4.36, 0.1, 100.0),
        ]);
    }
    specs
}

/// One band of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct BandState {
    pub band_type: String,
    pub mode: String,
    pub slope: String,
    pub solo: bool,
    pub mute: bool,
    pub frequency: f64,
    pub gain: f64,
    pub q: f64,
}

impl BandState {
    pub fn read(settings: &Settings, n: usize) -> Result<Self> {
        Ok(Self {
            band_type: settings.get_enum_nick(&band_key(n, "type"))?,
            mode: settings.get_enum_nick(&band_key(n, "mode"))?,
            slope: settings.get_enum_nick(&band_key(n, "slope"))?,
            solo: settings.get_bool(&band_key(n, "solo"))?,
            mute: settings.get_bool(&band_key(n, "mute"))?,
            frequency: settings.get_double(&band_key(n, "frequency"))?,
            gain: settings.get_double(&band_key(n, "gain"))?,
            q: settings.get_double(&band_key(n, "q"))?,
        })
    }

    pub fn write(&self, settings: &Settings, n: usize) -> Result<()> {
        settings.set(&band_key(n, "type"), self.band_type.as_str())?;
        settings.set(&band_key(n, "mode"), self.mode.as_str())?;
        settings.set(&band_key(n, "slope"), self.slope.as_str())?;
        settings.set(&band_key(n, "solo"), self.solo)?;
        settings.set(&band_key(n, "mute"), self.mute)?;
        settings.set(&band_key(n, "frequency"), self.frequency)?;
        settings.set(&band_key(n, "gain"), self.gain)?;
        settings.set(&band_key(n, "q"), self.q)?;
        Ok(())
    }
}

/// Typed view of all three groups; only the active bands are listed
#[derive(Debug, Clone, PartialEq)]
pub struct EqualizerConfig {
    pub mode: String,
    pub num_bands: usize,
    pub split_channels: bool,
    pub left: Vec<BandState>,
    pub right: Vec<BandState>,
}

impl EqualizerConfig {
    pub fn from_settings(main: &Settings, left: &Settings, right: &Settings) -> Result<Self> {
        let num_bands = main.get_int("num-bands")?.clamp(1, MAX_BANDS as i32) as usize;
        Ok(Self {
            mode: main.get_enum_nick("mode")?,
            num_bands,
            split_channels: main.get_bool("split-channels")?,
            left: (0..num_bands)
                .map(|n| BandState::read(left, n))
                .collect::<Result<_>>()?,
            right: (0..num_bands)
                .map(|n| BandState::read(right, n))
                .collect::<Result<_>>()?,
        })
    }
}

pub struct Equalizer {
    inner: PluginEffect,
    left: Settings,
    right: Settings,
    _subscriptions: Vec<Subscription>,
}

impl Equalizer {
    /// Equalizer with fresh default settings groups
    pub fn new(registry: &PluginRegistry) -> Result<Self> {
        Self::with_settings(
            registry,
            Settings::new(NAME, schema()),
            Settings::new(format!("{}.left", NAME), channel_schema()),
            Settings::new(format!("{}.right", NAME), channel_schema()),
        )
    }

    pub fn with_settings(
        registry: &PluginRegistry,
        main: Settings,
        left: Settings,
        right: Settings,
    ) -> Result<Self> {
        let mut inner = PluginEffect::load(NAME, main.clone(), registry, EQUALIZER_URI)?;

        inner.bind(Binding::Enum, "mode", "mode")?;
        for n in 0..MAX_BANDS {
            bind_band(&mut inner, &left, n, 'l')?;
            bind_band(&mut inner, &right, n, 'r')?;
        }

        let mut subscriptions = Vec::with_capacity(2 + MAX_BANDS * BAND_FIELDS.len());

        {
            let (left, right) = (left.clone(), right.clone());
            subscriptions.push(main.subscribe("num-bands", move |_, value| {
                let Some(count) = value.as_i32() else {
                    return;
                };
                for n in (count.max(0) as usize)..MAX_BANDS {
                    let key = band_key(n, "type");
                    for group in [&left, &right] {
                        if let Err(e) = group.set(&key, "Off") {
                            log::warn!("{}: could not disable band {}: {}", NAME, n, e);
                        }
                    }
                }
            })?);
        }

        {
            let (left, right) = (left.clone(), right.clone());
            subscriptions.push(main.subscribe("split-channels", move |_, value| {
                if value.as_bool() != Some(false) {
                    return;
                }
                for n in 0..MAX_BANDS {
                    let copied = BandState::read(&left, n).and_then(|band| band.write(&right, n));
                    if let Err(e) = copied {
                        log::warn!("{}: could not link band {}: {}", NAME, n, e);
                    }
                }
            })?);
        }

        for n in 0..MAX_BANDS {
            for field in BAND_FIELDS {
                let (main, right) = (main.clone(), right.clone());
                subscriptions.push(left.subscribe(&band_key(n, field), move |key, value| {
                    if main.get_bool("split-channels").unwrap_or(true) {
                        return;
                    }
                    if let Err(e) = right.set(key, value.clone()) {
                        log::warn!("{}: could not mirror {}: {}", NAME, key, e);
                    }
                })?);
            }
        }

        Ok(Self {
            inner,
            left,
            right,
            _subscriptions: subscriptions,
        })
    }

    pub fn main(&self) -> &Settings {
        self.inner.base().settings()
    }

    pub fn left(&self) -> &Settings {
        &self.left
    }

    pub fn right(&self) -> &Settings {
        &self.right
    }

    pub fn found_plugin(&self) -> bool {
        self.inner.found_plugin()
    }

    pub fn config(&self) -> Result<EqualizerConfig> {
        EqualizerConfig::from_settings(self.main(), &self.left, &self.right)
    }
}

fn bind_band(effect: &mut PluginEffect, settings: &Settings, n: usize, side: char) -> Result<()> {
    let port = |prefix: &str| format!("{}{}_{}", prefix, side, n);

    effect.bind_group(Binding::Enum, settings, &band_key(n, "type"), &port("ft"))?;
    effect.bind_group(Binding::Enum, settings, &band_key(n, "mode"), &port("fm"))?;
    effect.bind_group(Binding::Enum, settings, &band_key(n, "slope"), &port("s"))?;
    effect.bind_group(Binding::Bool, settings, &band_key(n, "solo"), &port("xs"))?;
    effect.bind_group(Binding::Bool, settings, &band_key(n, "mute"), &port("xm"))?;
    effect.bind_group(Binding::Double, settings, &band_key(n, "frequency"), &port("f"))?;
    effect.bind_group(Binding::Double, settings, &band_key(n, "q"), &port("q"))?;
    effect.bind_group(Binding::DoubleDb, settings, &band_key(n, "gain"), &port("g"))?;
    Ok(())
}

impl Effect for Equalizer {
    fn base(&self) -> &EffectBase {
        self.inner.base()
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        self.inner.base_mut()
    }

    fn channel_settings(&self) -> Vec<(&'static str, &Settings)> {
        vec![("left", &self.left), ("right", &self.right)]
    }

    fn setup(&mut self, rate: u32, n_samples: usize) {
        self.inner.setup(rate, n_samples);
    }

    fn process(
        &mut self,
        left_in: &mut [f32],
        right_in: &mut [f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        self.inner.process(left_in, right_in, left_out, right_out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equalizer() -> Equalizer {
        Equalizer::new(&PluginRegistry::with_native()).unwrap()
    }

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin())
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|s| s * s).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn test_every_band_field_is_bound() {
        let eq = equalizer();
        assert!(eq.found_plugin());
        assert_eq!(eq.inner.binding_count(), 1 + 2 * MAX_BANDS * BAND_FIELDS.len());

        let ports = eq.inner.ports();
        assert_eq!(ports.get("ftl_0"), Some(1.0)); // Bell
        assert_eq!(ports.get("ftr_8"), Some(0.0)); // Off

        eq.right().set("band3-gain", -20.0).unwrap();
        assert!((ports.value("gr_3", 0.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_split_off_copies_left_once() {
        let eq = equalizer();
        eq.main().set("split-channels", true).unwrap();

        eq.left().set("band0-frequency", 440.0).unwrap();
        eq.left().set("band0-gain", -6.0).unwrap();
        eq.left().set("band0-q", 2.0).unwrap();
        eq.left().set("band0-type", "Lo-shelf").unwrap();
        assert_eq!(eq.right().get_double("band0-frequency").unwrap(), default_frequency(0));

        eq.main().set("split-channels", false).unwrap();
        assert_eq!(BandState::read(eq.right(), 0).unwrap(), BandState::read(eq.left(), 0).unwrap());
        assert_eq!(eq.right().get_double("band0-frequency").unwrap(), 440.0);
        assert_eq!(eq.right().get_double("band0-gain").unwrap(), -6.0);
        assert_eq!(eq.right().get_double("band0-q").unwrap(), 2.0);

        // Split again: left edits stay on the left
        eq.main().set("split-channels", true).unwrap();
        eq.left().set("band0-frequency", 1000.0).unwrap();
        assert_eq!(eq.right().get_double("band0-frequency").unwrap(), 440.0);
    }

    #[test]
    fn test_linked_edits_mirror_left_to_right_only() {
        let eq = equalizer();
        assert!(!eq.main().get_bool("split-channels").unwrap());

        eq.left().set("band2-mute", true).unwrap();
        eq.left().set("band2-slope", "x3").unwrap();
        assert!(eq.right().get_bool("band2-mute").unwrap());
        assert_eq!(eq.right().get_enum_nick("band2-slope").unwrap(), "x3");

        eq.right().set("band2-gain", 5.0).unwrap();
        assert_eq!(eq.left().get_double("band2-gain").unwrap(), 0.0);
    }

    #[test]
    fn test_band_count_reduction_turns_bands_off() {
        let eq = equalizer();
        eq.main().set("split-channels", true).unwrap();
        for n in 0..8 {
            eq.right().set(&band_key(n, "type"), "Bell").unwrap();
        }

        eq.main().set("num-bands", 4).unwrap();

        for n in 0..4 {
            assert_eq!(eq.left().get_enum_nick(&band_key(n, "type")).unwrap(), "Bell");
            assert_eq!(eq.right().get_enum_nick(&band_key(n, "type")).unwrap(), "Bell");
        }
        for n in 4..8 {
            assert_eq!(eq.left().get_enum_nick(&band_key(n, "type")).unwrap(), "Off");
            assert_eq!(eq.right().get_enum_nick(&band_key(n, "type")).unwrap(), "Off");
        }

        let config = eq.config().unwrap();
        assert_eq!(config.num_bands, 4);
        assert_eq!(config.left.len(), 4);
    }

    #[test]
    fn test_split_lowpass_filters_one_channel() {
        let mut eq = equalizer();
        eq.setup(48000, 4800);
        eq.main().set("split-channels", true).unwrap();
        eq.left().set("band0-type", "Lo-pass").unwrap();
        eq.left().set("band0-frequency", 200.0).unwrap();
        eq.left().set("band0-q", 0.707).unwrap();
        eq.left().set("band0-slope", "x4").unwrap();

        let tone = sine(5000.0, 4800);
        let mut l_in = tone.clone();
        let mut r_in = tone.clone();
        let mut l_out = vec![0.0; 4800];
        let mut r_out = vec![0.0; 4800];
        eq.process(&mut l_in, &mut r_in, &mut l_out, &mut r_out);

        assert!(rms(&l_out[2400..]) < 0.01 * rms(&tone[2400..]));
        // Right bands are 0 dB bells
        assert!((rms(&r_out[2400..]) - rms(&tone[2400..])).abs() < 1e-3);
    }

    #[test]
    fn test_missing_filter_bank_passes_through() {
        let mut eq = Equalizer::new(&PluginRegistry::new()).unwrap();
        assert!(!eq.found_plugin());
        eq.setup(48000, 8);

        // Group logic works without a backend
        eq.main().set("num-bands", 2).unwrap();
        assert_eq!(eq.left().get_enum_nick("band5-type").unwrap(), "Off");

        let mut l = vec![0.3; 8];
        let mut r = vec![-0.3; 8];
        let mut lo = vec![0.0; 8];
        let mut ro = vec![0.0; 8];
        eq.process(&mut l, &mut r, &mut lo, &mut ro);
        assert_eq!(lo, l);
        assert_eq!(ro, r);
    }
}
