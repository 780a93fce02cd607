//! Native parametric equalizer
//!
//! Stands in for the 32-band stereo para-equalizer plugin: same URI, same
//! port names, cascaded biquads per band and channel.

use std::sync::Arc;

use super::{ControlPorts, PluginBackend, EQUALIZER_URI};
use crate::dsp::biquad::{BiquadCoeffs, BiquadKind, BiquadState};
use crate::dsp::gain::linear_to_db;

/// Maximum number of bands per channel
pub const MAX_BANDS: usize = 32;

/// Band filter types; a band's type port holds an index into this list
pub const BAND_TYPES: &[&str] = &[
    "Off", "Bell", "Hi-pass", "Hi-shelf", "Lo-pass", "Lo-shelf", "Notch", "Resonance", "Allpass",
    "Bandpass",
];

pub const BAND_MODES: &[&str] = &[
    "RLC (BT)", "RLC (MT)", "BWC (BT)", "BWC (MT)", "LRX (BT)", "LRX (MT)", "APO (DR)",
];

pub const BAND_SLOPES: &[&str] = &["x1", "x2", "x3", "x4"];

/// Global filter implementation
pub const EQ_MODES: &[&str] = &["IIR", "FIR", "FFT", "SPM"];

// Slope x4 in an LRX mode
const MAX_SECTIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn tag(self) -> char {
        match self {
            Side::Left => 'l',
            Side::Right => 'r',
        }
    }
}

/// Port names of band `n` on one side
struct BandPorts {
    kind: String,
    mode: String,
    slope: String,
    solo: String,
    mute: String,
    frequency: String,
    q: String,
    gain: String,
}

impl BandPorts {
    fn new(side: Side, n: usize) -> Self {
        let c = side.tag();
        Self {
            kind: format!("ft{}_{}", c, n),
            mode: format!("fm{}_{}", c, n),
            slope: format!("s{}_{}", c, n),
            solo: format!("xs{}_{}", c, n),
            mute: format!("xm{}_{}", c, n),
            frequency: format!("f{}_{}", c, n),
            q: format!("q{}_{}", c, n),
            gain: format!("g{}_{}", c, n),
        }
    }

    fn defaults(&self) -> Vec<(String, f64)> {
        vec![
            (self.kind.clone(), 0.0),
            (self.mode.clone(), 0.0),
            (self.slope.clone(), 0.0),
            (self.solo.clone(), 0.0),
            (self.mute.clone(), 0.0),
            (self.frequency.clone(), 1000.0),
            (self.q.clone(), 4.36),
            (self.gain.clone(), 1.0),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct BandFilter {
    sections: usize,
    coeffs: BiquadCoeffs,
    states: [BiquadState; MAX_SECTIONS],
}

impl Default for BandFilter {
    fn default() -> Self {
        Self {
            sections: 0,
            coeffs: BiquadCoeffs::identity(),
            states: [BiquadState::default(); MAX_SECTIONS],
        }
    }
}

impl BandFilter {
    #[inline]
    fn process(&mut self, sample: f64) -> f64 {
        let mut y = sample;
        for state in &mut self.states[..self.sections] {
            y = state.process(y, &self.coeffs);
        }
        y
    }
}

/// Map a type index to the biquad used for it; `None` means the band is off
fn kind_for(type_index: usize) -> Option<BiquadKind> {
    match BAND_TYPES.get(type_index).copied()? {
        "Bell" | "Resonance" => Some(BiquadKind::Peak),
        "Hi-pass" => Some(BiquadKind::HighPass),
        "Hi-shelf" => Some(BiquadKind::HighShelf),
        "Lo-pass" => Some(BiquadKind::LowPass),
        "Lo-shelf" => Some(BiquadKind::LowShelf),
        "Notch" => Some(BiquadKind::Notch),
        "Allpass" => Some(BiquadKind::AllPass),
        "Bandpass" => Some(BiquadKind::BandPass),
        _ => None,
    }
}

fn is_lrx(mode_index: usize) -> bool {
    matches!(BAND_MODES.get(mode_index), Some(m) if m.starts_with("LRX"))
}

/// Biquad filter bank behind the equalizer URI
pub struct ParaEqualizer {
    ports: Arc<ControlPorts>,
    left_ports: Vec<BandPorts>,
    right_ports: Vec<BandPorts>,
    left: Vec<BandFilter>,
    right: Vec<BandFilter>,
    rate: Option<u32>,
    n_samples: usize,
    seen_version: Option<u64>,
}

impl ParaEqualizer {
    pub fn new() -> Self {
        let left_ports: Vec<BandPorts> =
            (0..MAX_BANDS).map(|n| BandPorts::new(Side::Left, n)).collect();
        let right_ports: Vec<BandPorts> =
            (0..MAX_BANDS).map(|n| BandPorts::new(Side::Right, n)).collect();

        let mut defaults = vec![("mode".to_string(), 0.0)];
        for ports in left_ports.iter().chain(&right_ports) {
            defaults.extend(ports.defaults());
        }

        Self {
            ports: Arc::new(ControlPorts::new(defaults)),
            left_ports,
            right_ports,
            left: vec![BandFilter::default(); MAX_BANDS],
            right: vec![BandFilter::default(); MAX_BANDS],
            rate: None,
            n_samples: 0,
            seen_version: None,
        }
    }

    /// Recompute coefficients when any port changed since the last block
    fn update_filters(&mut self) {
        let Some(rate) = self.rate else {
            return;
        };
        let version = self.ports.version();
        if self.seen_version == Some(version) {
            return;
        }
        self.seen_version = Some(version);

        let rate = f64::from(rate);
        configure_side(&self.ports, &self.left_ports, &mut self.left, rate);
        configure_side(&self.ports, &self.right_ports, &mut self.right, rate);
    }
}

fn configure_side(
    ports: &ControlPorts,
    names: &[BandPorts],
    filters: &mut [BandFilter],
    rate: f64,
) {
    let any_solo = names.iter().any(|p| ports.value(&p.solo, 0.0) >= 0.5);

    for (p, filter) in names.iter().zip(filters.iter_mut()) {
        let kind = kind_for(ports.value(&p.kind, 0.0) as usize);
        let muted = ports.value(&p.mute, 0.0) >= 0.5;
        let soloed = ports.value(&p.solo, 0.0) >= 0.5;

        let Some(kind) = kind.filter(|_| !muted && (!any_solo || soloed)) else {
            filter.sections = 0;
            continue;
        };

        let slope = ports.value(&p.slope, 0.0).clamp(0.0, 3.0) as usize + 1;
        let sections = if is_lrx(ports.value(&p.mode, 0.0) as usize) {
            slope * 2
        } else {
            slope
        };

        // The gain port is linear; split it evenly over the cascade
        let gain_db = f64::from(linear_to_db(ports.value(&p.gain, 1.0) as f32)) / sections as f64;

        let coeffs = BiquadCoeffs::calculate(
            kind,
            rate,
            ports.value(&p.frequency, 1000.0),
            gain_db,
            ports.value(&p.q, 0.707),
        );

        if filter.coeffs != coeffs || filter.sections != sections {
            if filter.sections != sections {
                for state in &mut filter.states {
                    state.reset();
                }
            }
            filter.coeffs = coeffs;
            filter.sections = sections;
        }
    }
}

impl Default for ParaEqualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginBackend for ParaEqualizer {
    fn uri(&self) -> &str {
        EQUALIZER_URI
    }

    fn found_plugin(&self) -> bool {
        true
    }

    fn ports(&self) -> Arc<ControlPorts> {
        Arc::clone(&self.ports)
    }

    fn create_instance(&mut self, rate: u32) -> bool {
        if rate == 0 {
            self.rate = None;
            return false;
        }
        self.rate = Some(rate);
        self.seen_version = None;
        for filter in self.left.iter_mut().chain(self.right.iter_mut()) {
            *filter = BandFilter::default();
        }
        true
    }

    fn has_instance(&self) -> bool {
        self.rate.is_some()
    }

    fn n_samples(&self) -> usize {
        self.n_samples
    }

    fn set_n_samples(&mut self, n_samples: usize) {
        self.n_samples = n_samples;
    }

    fn run(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        self.update_filters();

        for (x, y) in left_in.iter().zip(left_out.iter_mut()) {
            let mut s = f64::from(*x);
            for band in self.left.iter_mut().filter(|b| b.sections > 0) {
                s = band.process(s);
            }
            *y = s as f32;
        }

        for (x, y) in right_in.iter().zip(right_out.iter_mut()) {
            let mut s = f64::from(*x);
            for band in self.right.iter_mut().filter(|b| b.sections > 0) {
                s = band.process(s);
            }
            *y = s as f32;
        }
    }
}
