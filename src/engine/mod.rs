//! Offline engine
//!
//! File I/O plus a block-wise renderer that feeds stereo material through an
//! [`EffectChain`] the way a host would, one fixed-size block at a time.

pub mod io;

pub use io::{read_stereo, stereo_tone, write_stereo, SampleEncoding, StereoAudio};

use crate::effects::EffectChain;

/// Run `audio` through `chain` in blocks of `block_size` frames
///
/// The final partial block is zero-padded before processing and trimmed
/// afterwards, so the output has exactly as many frames as the input.
pub fn render(chain: &mut EffectChain, audio: &StereoAudio, block_size: usize) -> StereoAudio {
    let block_size = block_size.max(1);
    let frames = audio.frames();

    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);

    let mut l_in = vec![0.0; block_size];
    let mut r_in = vec![0.0; block_size];
    let mut l_out = vec![0.0; block_size];
    let mut r_out = vec![0.0; block_size];

    let mut start = 0;
    while start < frames {
        let n = block_size.min(frames - start);

        l_in[..n].copy_from_slice(&audio.left[start..start + n]);
        r_in[..n].copy_from_slice(&audio.right[start..start + n]);
        l_in[n..].fill(0.0);
        r_in[n..].fill(0.0);

        chain.process(&mut l_in, &mut r_in, &mut l_out, &mut r_out);

        left.extend_from_slice(&l_out[..n]);
        right.extend_from_slice(&r_out[..n]);
        start += n;
    }

    log::debug!("rendered {} frames in blocks of {}", frames, block_size);

    StereoAudio::new(audio.sample_rate, left, right)
}
