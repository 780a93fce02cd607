//! Offline sample-rate conversion
//!
//! Thin wrapper over rubato's sinc resampler for whole mono sequences.
//! Only the kernel combiner uses it, so quality wins over speed.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{FxError, Result};

const CHUNK_SIZE: usize = 1024;

fn high_quality_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Convert `input` from `from_rate` to `to_rate`
///
/// The output is aligned with the input (the filter delay is removed) and
/// holds `ceil(len * to_rate / from_rate)` samples.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(FxError::Resample {
            reason: format!("invalid rates {} -> {}", from_rate, to_rate),
        });
    }
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let expected = (input.len() as f64 * ratio).ceil() as usize;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, high_quality_params(), CHUNK_SIZE, 1)
        .map_err(|e| FxError::Resample {
            reason: e.to_string(),
        })?;

    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);

    for chunk in input.chunks(CHUNK_SIZE) {
        let waves = [chunk];
        let result = if chunk.len() == CHUNK_SIZE {
            resampler.process(&waves[..], None)
        } else {
            resampler.process_partial(Some(&waves[..]), None)
        };
        let frames = result.map_err(|e| FxError::Resample {
            reason: e.to_string(),
        })?;
        output.extend_from_slice(&frames[0]);
    }

    // Flush the filter tail
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| FxError::Resample {
                reason: e.to_string(),
            })?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);

    Ok(output)
}
