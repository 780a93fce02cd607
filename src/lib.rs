//! fxrack - Real-time Stereo Effects Host
//!
//! fxrack hosts block-processing audio effects and the tooling around them:
//! 1. Streaming effects - pitch/time stretching, a 32-band parametric EQ and
//!    plugin-backed clipper and loudness stages, all behind one `process` contract
//! 2. Impulse response tools - listing, loading and combining `*.irs` kernels
//!    on background workers
//!
//! # Architecture
//!
//! - `settings` is the source of truth; effects observe it and cache derived state
//! - `effects` run on the audio thread and never return errors
//! - `notify` carries latency, peak and busy events to the UI-owning thread

pub mod cli;
pub mod config;
pub mod convolver;
pub mod dsp;
pub mod effects;
pub mod engine;
pub mod error;
pub mod notify;
pub mod plugin;
pub mod preset;
pub mod settings;

pub use error::{FxError, Result};
