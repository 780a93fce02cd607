//! Gain staging
//!
//! dB conversion and in-place stereo gain. The linear multipliers live in
//! [`GainState`] and are recomputed by settings callbacks, never per block.

use std::sync::atomic::{AtomicU32, Ordering};

/// Floor reported for silence
pub const MINIMUM_DB_LEVEL: f32 = -100.0;

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f32 {
    10.0_f64.powf(db / 20.0) as f32
}

/// Convert linear amplitude to decibels, floored at [`MINIMUM_DB_LEVEL`]
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear > 10.0_f32.powf(MINIMUM_DB_LEVEL / 20.0) {
        20.0 * linear.log10()
    } else {
        MINIMUM_DB_LEVEL
    }
}

/// Multiply both channels by `gain` in place
///
/// No sign restriction: 0 silences, negative gains invert polarity.
#[inline]
pub fn apply_gain(left: &mut [f32], right: &mut [f32], gain: f32) {
    for sample in left.iter_mut() {
        *sample *= gain;
    }
    for sample in right.iter_mut() {
        *sample *= gain;
    }
}

/// f32 stored as bits so the control thread can write it lock-free
#[derive(Debug)]
pub struct AtomicGain(AtomicU32);

impl AtomicGain {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Input/output linear multipliers of one effect
///
/// Written from settings callbacks, read once per block. A write may land
/// one block late, which is acceptable for gain staging.
#[derive(Debug)]
pub struct GainState {
    input: AtomicGain,
    output: AtomicGain,
}

impl GainState {
    pub fn from_db(input_db: f64, output_db: f64) -> Self {
        Self {
            input: AtomicGain::new(db_to_linear(input_db)),
            output: AtomicGain::new(db_to_linear(output_db)),
        }
    }

    #[inline]
    pub fn input(&self) -> f32 {
        self.input.get()
    }

    #[inline]
    pub fn output(&self) -> f32 {
        self.output.get()
    }

    pub fn set_input_db(&self, db: f64) {
        self.input.set(db_to_linear(db));
    }

    pub fn set_output_db(&self, db: f64) {
        self.output.set(db_to_linear(db));
    }
}

impl Default for GainState {
    fn default() -> Self {
        Self::from_db(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_db_to_linear() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
        assert_relative_eq!(db_to_linear(-6.0), 0.501187, epsilon = 1e-5);
        assert_relative_eq!(db_to_linear(20.0), 10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_linear_to_db_floor() {
        assert_relative_eq!(linear_to_db(1.0), 0.0);
        assert_relative_eq!(linear_to_db(0.1), -20.0, epsilon = 1e-4);
        assert_eq!(linear_to_db(0.0), MINIMUM_DB_LEVEL);
    }

    #[test]
    fn test_apply_gain_inverse_restores() {
        let original_l: Vec<f32> = (0..64).map(|i| (i as f32 * 0.1).sin()).collect();
        let original_r: Vec<f32> = (0..64).map(|i| (i as f32 * 0.2).cos()).collect();

        for gain in [0.25f32, 1.7, -3.0, 1e-3] {
            let mut left = original_l.clone();
            let mut right = original_r.clone();

            apply_gain(&mut left, &mut right, gain);
            apply_gain(&mut left, &mut right, 1.0 / gain);

            for (a, b) in left.iter().zip(&original_l) {
                assert_relative_eq!(*a, *b, epsilon = 1e-5);
            }
            for (a, b) in right.iter().zip(&original_r) {
                assert_relative_eq!(*a, *b, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_zero_gain_silences_and_negative_inverts() {
        let mut left = vec![0.5, -0.25];
        let mut right = vec![1.0, 0.0];
        apply_gain(&mut left, &mut right, -1.0);
        assert_eq!(left, vec![-0.5, 0.25]);
        assert_eq!(right, vec![-1.0, -0.0]);

        apply_gain(&mut left, &mut right, 0.0);
        assert!(left.iter().chain(&right).all(|s| *s == 0.0));
    }

    #[test]
    fn test_gain_state_updates() {
        let gains = GainState::default();
        assert_relative_eq!(gains.input(), 1.0);

        gains.set_input_db(-12.0);
        gains.set_output_db(6.0);
        assert_relative_eq!(gains.input(), 0.251189, epsilon = 1e-5);
        assert_relative_eq!(gains.output(), 1.995262, epsilon = 1e-5);
    }
}
