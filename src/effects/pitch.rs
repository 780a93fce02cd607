//! Pitch shifter / time stretcher
//!
//! The stretcher produces a variable number of frames per input block, so
//! its output is queued in a [`ReorderBuffer`] and handed out one block at a
//! time. While the queue cannot cover a block the output starts with a run
//! of silence.
//!
//! The reported latency is the engine's own delay plus that run of silence.
//! It is posted from `process` whenever it differs from the last value
//! posted, so a rebuilt engine with a new delay is reported on the next block.
//!
//! `setup` and `process` share one mutex: a settings change rebuilds the
//! stretcher from the notifying thread while the audio thread may be inside
//! `process`.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::base::{gain_specs, passthrough, EffectBase};
use super::Effect;
use crate::dsp::stretch::{
    CrispnessPreset, ReorderBuffer, SignalsmithBuilder, StretchConfig, Stretcher, StretcherBuilder,
};
use crate::error::Result;
use crate::settings::{SettingSpec, Settings, Subscription};

pub const NAME: &str = "pitch";

/// Keys whose change rebuilds the stretcher
const STRETCH_KEYS: &[&str] = &[
    "time-ratio",
    "octaves",
    "semitones",
    "cents",
    "crispness",
    "formant-preserving",
    "faster",
];

pub fn schema() -> Vec<SettingSpec> {
    let mut specs = gain_specs();
    specs.extend([
        SettingSpec::double("time-ratio", 1.0, 0.25, 4.0),
        SettingSpec::int("octaves", 0, -4, 4),
        SettingSpec::int("semitones", 0, -12, 12),
        SettingSpec::double("cents", 0.0, -100.0, 100.0),
        SettingSpec::int("crispness", 3, 0, 5),
        SettingSpec::boolean("formant-preserving", false),
        SettingSpec::boolean("faster", false),
    ]);
    specs
}

/// Typed view of the pitch settings
#[derive(Debug, Clone, PartialEq)]
pub struct PitchConfig {
    pub time_ratio: f64,
    pub octaves: i32,
    pub semitones: i32,
    pub cents: f64,
    pub crispness: i32,
    pub formant_preserving: bool,
    pub faster: bool,
}

impl PitchConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            time_ratio: settings.get_double("time-ratio")?,
            octaves: settings.get_int("octaves")?,
            semitones: settings.get_int("semitones")?,
            cents: settings.get_double("cents")?,
            crispness: settings.get_int("crispness")?,
            formant_preserving: settings.get_bool("formant-preserving")?,
            faster: settings.get_bool("faster")?,
        })
    }

    /// Frequency multiplier from octaves, semitones and cents
    pub fn pitch_scale(&self) -> f64 {
        let total_cents =
            1200.0 * f64::from(self.octaves) + 100.0 * f64::from(self.semitones) + self.cents;
        2.0_f64.powf(total_cents / 1200.0)
    }

    fn apply(&self, config: &mut StretchConfig) {
        config.time_ratio = self.time_ratio;
        config.pitch_scale = self.pitch_scale();
        config.formant_preserving = self.formant_preserving;
        config.faster = self.faster;
        config.crispness = CrispnessPreset::from_level(self.crispness);
    }
}

struct PitchData {
    config: StretchConfig,
    stretcher: Option<Box<dyn Stretcher>>,
    reorder: ReorderBuffer,
    scratch_left: Vec<f32>,
    scratch_right: Vec<f32>,
    /// Zero-fill offset of the last underrun
    latency_n_frames: usize,
    engine_latency: usize,
    reported_latency: usize,
}

impl PitchData {
    fn latency_frames(&self) -> usize {
        self.engine_latency + self.latency_n_frames
    }
}

struct PitchShared {
    data: Mutex<PitchData>,
    builder: Box<dyn StretcherBuilder>,
    settings: Settings,
}

impl PitchShared {
    fn setup(&self, rate: u32, n_samples: usize) {
        let mut data = self.data.lock();
        data.config.rate = rate;
        data.config.max_block = n_samples;
        self.init_stretcher(&mut data);
    }

    /// Rebuild after a settings change, if `setup` has run
    fn reinit(&self) {
        let mut data = self.data.lock();
        if data.stretcher.is_some() {
            self.init_stretcher(&mut data);
        }
    }

    fn init_stretcher(&self, data: &mut PitchData) {
        match PitchConfig::from_settings(&self.settings) {
            Ok(config) => config.apply(&mut data.config),
            Err(e) => log::warn!("{}: keeping previous stretch settings: {}", NAME, e),
        }

        let stretcher = self.builder.build(&data.config);
        data.engine_latency = stretcher.latency();
        data.stretcher = Some(stretcher);

        let scratch = data.config.max_block.max(1);
        data.scratch_left.resize(scratch, 0.0);
        data.scratch_right.resize(scratch, 0.0);

        log::debug!(
            "{}: stretcher ready (rate {}, block {}, ratio {}, scale {}, delay {})",
            NAME,
            data.config.rate,
            data.config.max_block,
            data.config.time_ratio,
            data.config.pitch_scale,
            data.engine_latency
        );
    }
}

pub struct Pitch {
    base: EffectBase,
    shared: Arc<PitchShared>,
    _subscriptions: Vec<Subscription>,
}

impl Pitch {
    /// Pitch effect backed by signalsmith-stretch
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_builder(settings, Box::new(SignalsmithBuilder))
    }

    pub fn with_builder(settings: Settings, builder: Box<dyn StretcherBuilder>) -> Result<Self> {
        let base = EffectBase::new(NAME, settings.clone())?;

        let shared = Arc::new(PitchShared {
            data: Mutex::new(PitchData {
                config: StretchConfig::default(),
                stretcher: None,
                reorder: ReorderBuffer::default(),
                scratch_left: Vec::new(),
                scratch_right: Vec::new(),
                latency_n_frames: 0,
                engine_latency: 0,
                reported_latency: 0,
            }),
            builder,
            settings: settings.clone(),
        });

        let mut subscriptions = Vec::with_capacity(STRETCH_KEYS.len());
        for key in STRETCH_KEYS {
            let weak: Weak<PitchShared> = Arc::downgrade(&shared);
            subscriptions.push(settings.subscribe(key, move |_, _| {
                if let Some(shared) = weak.upgrade() {
                    shared.reinit();
                }
            })?);
        }

        Ok(Self {
            base,
            shared,
            _subscriptions: subscriptions,
        })
    }

    /// Frames currently queued between the stretcher and the output
    pub fn queued_frames(&self) -> usize {
        self.shared.data.lock().reorder.len()
    }
}

impl Effect for Pitch {
    fn base(&self) -> &EffectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        &mut self.base
    }

    fn setup(&mut self, rate: u32, n_samples: usize) {
        self.base.set_format(rate, n_samples);
        self.shared.setup(rate, n_samples);
    }

    fn process(
        &mut self,
        left_in: &mut [f32],
        right_in: &mut [f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        let mut guard = self.shared.data.lock();
        let data = &mut *guard;

        let stretcher = match data.stretcher.as_mut() {
            Some(stretcher) if !self.base.is_bypassed() => stretcher,
            _ => {
                passthrough(left_in, right_in, left_out, right_out);
                return;
            }
        };

        self.base.apply_input_gain(left_in, right_in);

        let frames = left_in.len().min(right_in.len());
        stretcher.process(&left_in[..frames], &right_in[..frames], false);

        loop {
            let wanted = stretcher.available().min(data.scratch_left.len());
            if wanted == 0 {
                break;
            }
            let got = stretcher.retrieve(
                &mut data.scratch_left[..wanted],
                &mut data.scratch_right[..wanted],
            );
            if got == 0 {
                break;
            }
            data.reorder
                .push(&data.scratch_left[..got], &data.scratch_right[..got]);
        }

        let out_len = left_out.len().min(right_out.len());

        if data.reorder.len() >= out_len {
            data.reorder
                .pop_into(&mut left_out[..out_len], &mut right_out[..out_len]);
        } else {
            let offset = 2 * (out_len - data.reorder.len());
            data.latency_n_frames = offset;

            left_out.fill(0.0);
            right_out.fill(0.0);

            let start = offset.min(out_len);
            data.reorder
                .pop_into(&mut left_out[start..out_len], &mut right_out[start..out_len]);
        }

        let mut new_latency = None;
        if data.latency_frames() != data.reported_latency {
            data.reported_latency = data.latency_frames();
            new_latency = Some(data.reported_latency);
        }

        let rate = data.config.rate.max(1);
        drop(guard);

        self.base.apply_output_gain(left_out, right_out);

        if let Some(frames) = new_latency {
            self.base.notify_latency(frames as f32 / rate as f32);
        }

        self.base.notify_peaks(left_in, right_in, left_out, right_out);
    }

    fn latency_seconds(&self) -> f32 {
        let data = self.shared.data.lock();
        data.latency_frames() as f32 / data.config.rate.max(1) as f32
    }
}
