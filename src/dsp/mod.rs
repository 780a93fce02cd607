//! DSP building blocks
//!
//! Stateless helpers and small engines shared by the effects and the
//! kernel combiner.

pub mod biquad;
pub mod convolve;
pub mod gain;
pub mod resample;
pub mod stretch;

pub use biquad::{BiquadCoeffs, BiquadKind, BiquadState};
pub use convolve::direct_conv;
pub use gain::{apply_gain, db_to_linear, linear_to_db, GainState};
pub use resample::resample;
pub use stretch::{
    CrispnessPreset, ReorderBuffer, SignalsmithBuilder, StretchConfig, Stretcher,
    StretcherBuilder,
};
