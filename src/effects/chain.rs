//! Effect chain
//!
//! Effects run in insertion order, each one reading the previous effect's
//! output. Two scratch buffer pairs ping-pong between effects so the caller's
//! input is only touched by the first effect.

use super::Effect;
use crate::notify::Notifier;

pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
    rate: u32,
    n_samples: usize,
    scratch: [Vec<f32>; 4],
}

impl EffectChain {
    pub fn new(rate: u32, n_samples: usize) -> Self {
        Self {
            effects: Vec::new(),
            rate,
            n_samples,
            scratch: std::array::from_fn(|_| vec![0.0; n_samples]),
        }
    }

    /// Reconfigure every effect
    pub fn setup(&mut self, rate: u32, n_samples: usize) {
        self.rate = rate;
        self.n_samples = n_samples;
        for buffer in &mut self.scratch {
            buffer.resize(n_samples, 0.0);
        }
        for effect in &mut self.effects {
            effect.setup(rate, n_samples);
        }
    }

    /// Append an effect, configured for the chain's current format
    pub fn push(&mut self, mut effect: Box<dyn Effect>) {
        effect.setup(self.rate, self.n_samples);
        self.effects.push(effect);
    }

    pub fn set_notifier(&mut self, notifier: &Notifier) {
        for effect in &mut self.effects {
            effect.set_notifier(notifier.clone());
        }
    }

    pub fn set_post_messages(&mut self, enabled: bool) {
        for effect in &mut self.effects {
            effect.set_post_messages(enabled);
        }
    }

    /// Sum of every effect's current latency
    pub fn latency_seconds(&self) -> f32 {
        self.effects.iter().map(|e| e.latency_seconds()).sum()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Effect> {
        self.effects.iter().map(|e| e.as_ref())
    }

    /// Run one block through every effect
    ///
    /// An empty chain copies input to output.
    pub fn process(
        &mut self,
        left_in: &mut [f32],
        right_in: &mut [f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        let frames = left_in
            .len()
            .min(right_in.len())
            .min(left_out.len())
            .min(right_out.len());

        let Some((last, rest)) = self.effects.split_last_mut() else {
            super::passthrough(left_in, right_in, left_out, right_out);
            return;
        };

        // Host block size may differ from the nominal one
        if self.scratch[0].len() < frames {
            for buffer in &mut self.scratch {
                buffer.resize(frames, 0.0);
            }
        }

        let [a_left, a_right, b_left, b_right] = &mut self.scratch;
        let (a_left, a_right) = (&mut a_left[..frames], &mut a_right[..frames]);
        let (b_left, b_right) = (&mut b_left[..frames], &mut b_right[..frames]);

        if rest.is_empty() {
            last.process(left_in, right_in, left_out, right_out);
            return;
        }

        // First effect reads the caller's input
        let mut effects = rest.iter_mut();
        if let Some(first) = effects.next() {
            first.process(&mut left_in[..frames], &mut right_in[..frames], a_left, a_right);
        }

        let mut in_a = true;
        for effect in effects {
            if in_a {
                effect.process(a_left, a_right, b_left, b_right);
            } else {
                effect.process(b_left, b_right, a_left, a_right);
            }
            in_a = !in_a;
        }

        let (src_left, src_right) = if in_a {
            (a_left, a_right)
        } else {
            (b_left, b_right)
        };
        last.process(src_left, src_right, &mut left_out[..frames], &mut right_out[..frames]);
        left_out[frames..].fill(0.0);
        right_out[frames..].fill(0.0);
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("effects", &self.effects.iter().map(|e| e.name()).collect::<Vec<_>>())
            .field("rate", &self.rate)
            .field("n_samples", &self.n_samples)
            .finish()
    }
}
