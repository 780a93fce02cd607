//! State shared by every effect
//!
//! Gain multipliers, bypass flag, block format and the peak notification
//! throttle. The gain and bypass values are kept in sync with the effect's
//! settings group through subscriptions owned by [`EffectBase`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::DEFAULT_NOTIFICATION_WINDOW;
use crate::dsp::gain::{apply_gain, GainState};
use crate::error::Result;
use crate::notify::{HostEvent, Notifier, PeakHold};
use crate::settings::{SettingSpec, Settings, Subscription};

/// Range of the input/output gain settings, in dB
pub const GAIN_RANGE_DB: (f64, f64) = (-36.0, 36.0);

/// The `input-gain`, `output-gain` and `bypass` keys every effect carries
pub fn gain_specs() -> Vec<SettingSpec> {
    vec![
        SettingSpec::double("input-gain", 0.0, GAIN_RANGE_DB.0, GAIN_RANGE_DB.1),
        SettingSpec::double("output-gain", 0.0, GAIN_RANGE_DB.0, GAIN_RANGE_DB.1),
        SettingSpec::boolean("bypass", false),
    ]
}

pub struct EffectBase {
    name: &'static str,
    settings: Settings,
    gains: Arc<GainState>,
    bypass: Arc<AtomicBool>,
    rate: u32,
    n_samples: usize,
    notifier: Option<Notifier>,
    post_messages: bool,
    notification_window: f32,
    notification_dt: f32,
    peaks: PeakHold,
    _subscriptions: Vec<Subscription>,
}

impl EffectBase {
    /// Read gains and bypass from `settings` and follow their changes
    pub fn new(name: &'static str, settings: Settings) -> Result<Self> {
        let gains = Arc::new(GainState::from_db(
            settings.get_double("input-gain")?,
            settings.get_double("output-gain")?,
        ));
        let bypass = Arc::new(AtomicBool::new(settings.get_bool("bypass")?));

        let mut subscriptions = Vec::with_capacity(3);

        let g = Arc::clone(&gains);
        subscriptions.push(settings.subscribe("input-gain", move |_, value| {
            if let Some(db) = value.as_f64() {
                g.set_input_db(db);
            }
        })?);

        let g = Arc::clone(&gains);
        subscriptions.push(settings.subscribe("output-gain", move |_, value| {
            if let Some(db) = value.as_f64() {
                g.set_output_db(db);
            }
        })?);

        let b = Arc::clone(&bypass);
        subscriptions.push(settings.subscribe("bypass", move |_, value| {
            if let Some(on) = value.as_bool() {
                b.store(on, Ordering::Relaxed);
            }
        })?);

        Ok(Self {
            name,
            settings,
            gains,
            bypass,
            rate: 0,
            n_samples: 0,
            notifier: None,
            post_messages: false,
            notification_window: DEFAULT_NOTIFICATION_WINDOW,
            notification_dt: 0.0,
            peaks: PeakHold::default(),
            _subscriptions: subscriptions,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn gains(&self) -> &GainState {
        &self.gains
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypass.load(Ordering::Relaxed)
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn set_format(&mut self, rate: u32, n_samples: usize) {
        self.rate = rate;
        self.n_samples = n_samples;
    }

    pub fn set_notifier(&mut self, notifier: Option<Notifier>) {
        self.notifier = notifier;
    }

    pub fn post_messages(&self) -> bool {
        self.post_messages
    }

    pub fn set_post_messages(&mut self, enabled: bool) {
        self.post_messages = enabled;
        self.notification_dt = 0.0;
        self.peaks = PeakHold::default();
    }

    pub fn set_notification_window(&mut self, seconds: f32) {
        self.notification_window = seconds;
    }

    #[inline]
    pub fn apply_input_gain(&self, left: &mut [f32], right: &mut [f32]) {
        apply_gain(left, right, self.gains.input());
    }

    #[inline]
    pub fn apply_output_gain(&self, left: &mut [f32], right: &mut [f32]) {
        apply_gain(left, right, self.gains.output());
    }

    /// Fold one block into the running peaks and post them once the
    /// notification window has elapsed. No-op unless messages are enabled.
    pub fn notify_peaks(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &[f32],
        right_out: &[f32],
    ) {
        if !self.post_messages || self.rate == 0 {
            return;
        }

        self.peaks.update(left_in, right_in, left_out, right_out);
        self.notification_dt += left_out.len() as f32 / self.rate as f32;

        if self.notification_dt >= self.notification_window {
            self.notification_dt = 0.0;
            let levels = self.peaks.take();

            if let Some(notifier) = &self.notifier {
                notifier.post(HostEvent::Peaks {
                    effect: self.name.to_string(),
                    levels,
                });
            }
        }
    }

    pub fn notify_latency(&self, seconds: f32) {
        log::debug!("{} latency: {} s", self.name, seconds);

        if let Some(notifier) = &self.notifier {
            notifier.post(HostEvent::Latency {
                effect: self.name.to_string(),
                seconds,
            });
        }
    }
}

impl std::fmt::Debug for EffectBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectBase")
            .field("name", &self.name)
            .field("rate", &self.rate)
            .field("n_samples", &self.n_samples)
            .field("bypass", &self.is_bypassed())
            .finish()
    }
}

/// Copy inputs to outputs; output samples past the input length are zeroed
pub fn passthrough(
    left_in: &[f32],
    right_in: &[f32],
    left_out: &mut [f32],
    right_out: &mut [f32],
) {
    copy_or_zero(left_in, left_out);
    copy_or_zero(right_in, right_out);
}

fn copy_or_zero(input: &[f32], output: &mut [f32]) {
    let n = input.len().min(output.len());
    output[..n].copy_from_slice(&input[..n]);
    output[n..].fill(0.0);
}
