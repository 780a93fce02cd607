//! Time/pitch stretching
//!
//! The pitch effect talks to a [`Stretcher`]: a streaming engine that takes
//! fixed input blocks and makes a variable number of output frames available.
//! [`SignalsmithStretcher`] implements it on top of signalsmith-stretch;
//! tests substitute their own engines through [`StretcherBuilder`].

use std::collections::VecDeque;

use signalsmith_stretch::Stretch;

const CHANNELS: u32 = 2;

/// Transient handling aggressiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientsOption {
    Crisp,
    Mixed,
    Smooth,
}

/// Phase coherence between bins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOption {
    Laminar,
    Independent,
}

/// Onset detector type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorOption {
    Compound,
    Percussive,
    Soft,
}

/// One crispness preset: three engine tuning knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrispnessPreset {
    pub transients: TransientsOption,
    pub phase: PhaseOption,
    pub detector: DetectorOption,
}

/// The closed preset table, indexed by the `crispness` setting
pub const CRISPNESS_PRESETS: [CrispnessPreset; 6] = [
    CrispnessPreset {
        transients: TransientsOption::Smooth,
        phase: PhaseOption::Independent,
        detector: DetectorOption::Compound,
    },
    CrispnessPreset {
        transients: TransientsOption::Crisp,
        phase: PhaseOption::Independent,
        detector: DetectorOption::Soft,
    },
    CrispnessPreset {
        transients: TransientsOption::Smooth,
        phase: PhaseOption::Independent,
        detector: DetectorOption::Compound,
    },
    CrispnessPreset {
        transients: TransientsOption::Smooth,
        phase: PhaseOption::Laminar,
        detector: DetectorOption::Compound,
    },
    CrispnessPreset {
        transients: TransientsOption::Mixed,
        phase: PhaseOption::Laminar,
        detector: DetectorOption::Compound,
    },
    CrispnessPreset {
        transients: TransientsOption::Crisp,
        phase: PhaseOption::Laminar,
        detector: DetectorOption::Compound,
    },
];

impl CrispnessPreset {
    /// Preset for a `crispness` value; out-of-range values clamp to the ends
    pub fn from_level(level: i32) -> Self {
        let idx = level.clamp(0, CRISPNESS_PRESETS.len() as i32 - 1) as usize;
        CRISPNESS_PRESETS[idx]
    }
}

/// Everything needed to build a stretcher
#[derive(Debug, Clone, PartialEq)]
pub struct StretchConfig {
    pub rate: u32,
    /// Largest block passed to a single `process` call
    pub max_block: usize,
    /// Output duration / input duration
    pub time_ratio: f64,
    pub pitch_scale: f64,
    pub formant_preserving: bool,
    pub faster: bool,
    pub crispness: CrispnessPreset,
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            rate: 48000,
            max_block: 512,
            time_ratio: 1.0,
            pitch_scale: 1.0,
            formant_preserving: false,
            faster: false,
            crispness: CrispnessPreset::from_level(3),
        }
    }
}

/// Streaming stereo stretch engine
pub trait Stretcher: Send {
    /// Feed one block; `final_block` flushes the engine's tail
    fn process(&mut self, left: &[f32], right: &[f32], final_block: bool);

    /// Frames ready to be retrieved
    fn available(&self) -> usize;

    /// Move up to `left.len()` frames out, returning how many were written
    fn retrieve(&mut self, left: &mut [f32], right: &mut [f32]) -> usize;

    /// Frames between an input frame and its stretched output
    fn latency(&self) -> usize {
        0
    }
}

/// Factory the pitch effect calls on every setup
pub trait StretcherBuilder: Send + Sync {
    fn build(&self, config: &StretchConfig) -> Box<dyn Stretcher>;
}

/// Builds [`SignalsmithStretcher`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalsmithBuilder;

impl StretcherBuilder for SignalsmithBuilder {
    fn build(&self, config: &StretchConfig) -> Box<dyn Stretcher> {
        Box::new(SignalsmithStretcher::new(config))
    }
}

/// Block length and hop in frames for a configuration
///
/// Crisper transients shorten the analysis block; laminar phase and the
/// detector type set the overlap.
pub fn block_geometry(config: &StretchConfig) -> (usize, usize) {
    let block_secs = match config.crispness.transients {
        TransientsOption::Crisp => 0.09,
        TransientsOption::Mixed => 0.105,
        TransientsOption::Smooth => 0.12,
    };

    let mut overlap = match config.crispness.phase {
        PhaseOption::Laminar => 4.0,
        PhaseOption::Independent => 3.0,
    };
    overlap *= match config.crispness.detector {
        DetectorOption::Compound => 1.0,
        DetectorOption::Percussive => 1.25,
        DetectorOption::Soft => 0.8,
    };
    if config.faster {
        overlap *= 0.75;
    }

    let block = ((block_secs * f64::from(config.rate)) as usize).max(64);
    let interval = ((block as f64 / overlap) as usize).max(1);
    (block, interval)
}

/// signalsmith-stretch behind the streaming [`Stretcher`] contract
///
/// signalsmith produces exactly as many frames as it is asked for, so the
/// adapter asks for `frames * time_ratio` per block, carrying the fraction,
/// and keeps them queued until retrieved.
pub struct SignalsmithStretcher {
    stretch: Stretch,
    time_ratio: f64,
    carry: f64,
    interleaved: Vec<f32>,
    pending: Vec<f32>,
}

impl SignalsmithStretcher {
    pub fn new(config: &StretchConfig) -> Self {
        let (block, interval) = block_geometry(config);
        let mut stretch = Stretch::new(CHANNELS, block, interval);

        let tonality_limit = if config.formant_preserving {
            Some(8000.0 / config.rate as f32)
        } else {
            None
        };
        stretch.set_transpose_factor(config.pitch_scale as f32, tonality_limit);

        let ratio = config.time_ratio.max(f64::EPSILON);
        let max_out = (config.max_block as f64 * ratio).ceil() as usize + 1;

        Self {
            stretch,
            time_ratio: ratio,
            carry: 0.0,
            interleaved: vec![0.0; config.max_block * CHANNELS as usize],
            pending: Vec::with_capacity(4 * max_out * CHANNELS as usize),
        }
    }
}

impl Stretcher for SignalsmithStretcher {
    fn process(&mut self, left: &[f32], right: &[f32], final_block: bool) {
        let frames = left.len().min(right.len());
        if self.interleaved.len() < frames * 2 {
            self.interleaved.resize(frames * 2, 0.0);
        }
        for (n, (l, r)) in left.iter().zip(right).take(frames).enumerate() {
            self.interleaved[2 * n] = *l;
            self.interleaved[2 * n + 1] = *r;
        }

        let wanted = frames as f64 * self.time_ratio + self.carry;
        let out_frames = wanted.floor() as usize;
        self.carry = wanted - out_frames as f64;

        let start = self.pending.len();
        self.pending.resize(start + out_frames * 2, 0.0);
        self.stretch
            .process(&self.interleaved[..frames * 2], &mut self.pending[start..]);

        if final_block {
            let tail = self.stretch.output_latency();
            let start = self.pending.len();
            self.pending.resize(start + tail * 2, 0.0);
            self.stretch.flush(&mut self.pending[start..]);
        }
    }

    fn available(&self) -> usize {
        self.pending.len() / 2
    }

    fn retrieve(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        let n = self.available().min(left.len()).min(right.len());
        for i in 0..n {
            left[i] = self.pending[2 * i];
            right[i] = self.pending[2 * i + 1];
        }
        self.pending.drain(..n * 2);
        n
    }

    fn latency(&self) -> usize {
        self.stretch.input_latency() + self.stretch.output_latency()
    }
}

/// Per-channel FIFO absorbing the mismatch between stretcher output and
/// block size. Both queues always hold the same number of frames.
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    left: VecDeque<f32>,
    right: VecDeque<f32>,
}

impl ReorderBuffer {
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            left: VecDeque::with_capacity(frames),
            right: VecDeque::with_capacity(frames),
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    /// Append frames; extra samples on the longer channel are ignored
    pub fn push(&mut self, left: &[f32], right: &[f32]) {
        let n = left.len().min(right.len());
        self.left.extend(&left[..n]);
        self.right.extend(&right[..n]);
    }

    /// Pop frames in FIFO order into the given slices, stopping when either
    /// side runs out. Returns the number of frames written.
    pub fn pop_into(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        let n = self.len().min(left.len()).min(right.len());
        for (dst, src) in left.iter_mut().zip(self.left.drain(..n)) {
            *dst = src;
        }
        for (dst, src) in right.iter_mut().zip(self.right.drain(..n)) {
            *dst = src;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crispness_table() {
        assert_eq!(CRISPNESS_PRESETS.len(), 6);
        assert_eq!(
            CrispnessPreset::from_level(1),
            CrispnessPreset {
                transients: TransientsOption::Crisp,
                phase: PhaseOption::Independent,
                detector: DetectorOption::Soft,
            }
        );
        assert_eq!(
            CrispnessPreset::from_level(4).transients,
            TransientsOption::Mixed
        );
        assert_eq!(CrispnessPreset::from_level(5).phase, PhaseOption::Laminar);
        assert_eq!(CrispnessPreset::from_level(0), CrispnessPreset::from_level(2));
        assert_eq!(CrispnessPreset::from_level(42), CRISPNESS_PRESETS[5]);
    }

    #[test]
    fn test_block_geometry_follows_preset() {
        let mut config = StretchConfig::default();
        config.crispness = CrispnessPreset::from_level(5);
        let (crisp_block, crisp_hop) = block_geometry(&config);

        config.crispness = CrispnessPreset::from_level(3);
        let (smooth_block, _) = block_geometry(&config);

        assert!(crisp_block < smooth_block);
        assert_eq!(crisp_hop, crisp_block / 4);

        config.faster = true;
        let (_, fast_hop) = block_geometry(&config);
        assert!(fast_hop > smooth_block / 4);
    }

    #[test]
    fn test_reorder_buffer_fifo() {
        let mut buffer = ReorderBuffer::with_capacity(16);
        buffer.push(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]);
        buffer.push(&[4.0], &[-4.0, -5.0]);
        assert_eq!(buffer.len(), 4);

        let mut l = [0.0; 3];
        let mut r = [0.0; 3];
        assert_eq!(buffer.pop_into(&mut l, &mut r), 3);
        assert_eq!(l, [1.0, 2.0, 3.0]);
        assert_eq!(r, [-1.0, -2.0, -3.0]);

        let mut l = [9.0; 3];
        let mut r = [9.0; 3];
        assert_eq!(buffer.pop_into(&mut l, &mut r), 1);
        assert_eq!(l, [4.0, 9.0, 9.0]);
        assert_eq!(r, [-4.0, 9.0, 9.0]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_signalsmith_unity_ratio_is_rate_preserving() {
        let config = StretchConfig::default();
        let mut stretcher = SignalsmithStretcher::new(&config);
        let block = vec![0.0f32; 512];

        for _ in 0..4 {
            stretcher.process(&block, &block, false);
        }
        assert_eq!(stretcher.available(), 4 * 512);

        let mut l = vec![0.0; 1000];
        let mut r = vec![0.0; 1000];
        assert_eq!(stretcher.retrieve(&mut l, &mut r), 1000);
        assert_eq!(stretcher.available(), 4 * 512 - 1000);
    }

    #[test]
    fn test_signalsmith_reports_its_latency() {
        let config = StretchConfig::default();
        let stretcher = SignalsmithStretcher::new(&config);
        let (block, _) = block_geometry(&config);
        assert!(stretcher.latency() > 0);
        assert!(stretcher.latency() <= 2 * block);
    }

    #[test]
    fn test_signalsmith_ratio_carries_fraction() {
        let mut config = StretchConfig::default();
        config.time_ratio = 1.5;
        let mut stretcher = SignalsmithStretcher::new(&config);
        let block = vec![0.0f32; 3];

        stretcher.process(&block, &block, false);
        assert_eq!(stretcher.available(), 4);
        stretcher.process(&block, &block, false);
        assert_eq!(stretcher.available(), 9);
    }
}
