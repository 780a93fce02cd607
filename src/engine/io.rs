//! Stereo WAV I/O
//!
//! Everything is converted to deinterleaved 32-bit float on import. Mono
//! files are duplicated to both channels; files with more than two channels
//! are rejected.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{FxError, Result};

/// Deinterleaved stereo material
#[derive(Debug, Clone, PartialEq)]
pub struct StereoAudio {
    pub sample_rate: u32,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoAudio {
    pub fn new(sample_rate: u32, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self {
            sample_rate,
            left,
            right,
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// On-disk sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Int16,
    Int24,
    Int32,
    Float32,
}

impl SampleEncoding {
    fn spec(self, sample_rate: u32) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            SampleEncoding::Int16 => (16, SampleFormat::Int),
            SampleEncoding::Int24 => (24, SampleFormat::Int),
            SampleEncoding::Int32 => (32, SampleFormat::Int),
            SampleEncoding::Float32 => (32, SampleFormat::Float),
        };
        WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Read a WAV file as stereo float
pub fn read_stereo(path: &Path) -> Result<StereoAudio> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);

    if channels == 0 || channels > 2 {
        return Err(FxError::InvalidAudio {
            reason: format!("{}-channel audio (only mono/stereo supported)", channels),
        });
    }

    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    let (left, right) = if channels == 1 {
        (samples.clone(), samples)
    } else {
        deinterleave(&samples)
    };

    Ok(StereoAudio::new(spec.sample_rate, left, right))
}

/// Write stereo float material, converting to `encoding`
pub fn write_stereo(path: &Path, audio: &StereoAudio, encoding: SampleEncoding) -> Result<()> {
    let mut writer = WavWriter::create(path, encoding.spec(audio.sample_rate))?;
    let interleaved = interleave(&audio.left, &audio.right);

    match encoding {
        SampleEncoding::Int16 => {
            for sample in interleaved {
                writer.write_sample((sample * 32767.0).clamp(-32768.0, 32767.0) as i16)?;
            }
        }
        SampleEncoding::Int24 => {
            for sample in interleaved {
                writer.write_sample((sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32)?;
            }
        }
        SampleEncoding::Int32 => {
            for sample in interleaved {
                writer.write_sample(float_to_i32(sample))?;
            }
        }
        SampleEncoding::Float32 => {
            for sample in interleaved {
                writer.write_sample(sample)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Full-scale conversion to 32-bit PCM, clipping at +/-1
#[inline]
pub fn float_to_i32(sample: f32) -> i32 {
    (f64::from(sample).clamp(-1.0, 1.0) * f64::from(i32::MAX)).round() as i32
}

fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let samples = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        // 24-bit is stored as i32 in hound
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (f64::from(v) / 2147483648.0) as f32))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(FxError::InvalidAudio {
                reason: format!("{}-bit {:?} samples are not supported", bits, format),
            })
        }
    };
    Ok(samples)
}

/// [L,R,L,R,...] to ([L,L,...], [R,R,...]); a trailing odd sample is dropped
pub fn deinterleave(samples: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let frames = samples.len() / 2;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in samples.chunks_exact(2) {
        left.push(frame[0]);
        right.push(frame[1]);
    }
    (left, right)
}

/// `buffer[2n] = left[n]`, `buffer[2n + 1] = right[n]`
pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    let frames = left.len().min(right.len());
    let mut buffer = vec![0.0; frames * 2];
    for (n, (l, r)) in left.iter().zip(right).enumerate() {
        buffer[2 * n] = *l;
        buffer[2 * n + 1] = *r;
    }
    buffer
}

/// Stereo sine test tone with a different frequency per channel
pub fn stereo_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> StereoAudio {
    let frames = (duration_secs * sample_rate as f32) as usize;
    let tone = |freq: f32| -> Vec<f32> {
        let w = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
        (0..frames).map(|i| 0.5 * (w * i as f32).sin()).collect()
    };
    StereoAudio::new(sample_rate, tone(freq_left), tone(freq_right))
}
