//! Effect-to-host notifications
//!
//! The audio thread and the kernel workers never touch UI state directly.
//! They post [`HostEvent`]s into a bounded channel that the UI-owning thread
//! drains at its own pace.

use std::path::PathBuf;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::dsp::gain::linear_to_db;

/// Default capacity of the notification channel
pub const DEFAULT_CAPACITY: usize = 256;

/// Peak levels of one block, in dB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakLevels {
    pub input_left: f32,
    pub input_right: f32,
    pub output_left: f32,
    pub output_right: f32,
}

impl PeakLevels {
    /// Measure max |x| of each channel
    pub fn measure(
        left_in: &[f32],
        right_in: &[f32],
        left_out: &[f32],
        right_out: &[f32],
    ) -> Self {
        let mut hold = PeakHold::default();
        hold.update(left_in, right_in, left_out, right_out);
        hold.levels()
    }
}

/// Linear peaks accumulated over several blocks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakHold {
    input_left: f32,
    input_right: f32,
    output_left: f32,
    output_right: f32,
}

impl PeakHold {
    pub fn update(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &[f32],
        right_out: &[f32],
    ) {
        self.input_left = self.input_left.max(peak(left_in));
        self.input_right = self.input_right.max(peak(right_in));
        self.output_left = self.output_left.max(peak(left_out));
        self.output_right = self.output_right.max(peak(right_out));
    }

    pub fn levels(&self) -> PeakLevels {
        PeakLevels {
            input_left: linear_to_db(self.input_left),
            input_right: linear_to_db(self.input_right),
            output_left: linear_to_db(self.output_left),
            output_right: linear_to_db(self.output_right),
        }
    }

    /// Take the current levels and start a new hold period
    pub fn take(&mut self) -> PeakLevels {
        let levels = self.levels();
        *self = Self::default();
        levels
    }
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Internal buffering latency changed
    Latency { effect: String, seconds: f32 },
    /// Throttled peak reading
    Peaks { effect: String, levels: PeakLevels },
    /// A kernel combination was accepted; start the busy indicator
    CombineStarted { output: String },
    /// A kernel combination ended; stop the busy indicator
    CombineFinished {
        output: String,
        written: Option<PathBuf>,
    },
}

/// Non-blocking sender half, cloneable into any thread
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Sender<HostEvent>,
}

impl Notifier {
    /// Create a notifier and the receiver the UI thread drains
    pub fn channel(capacity: usize) -> (Self, Receiver<HostEvent>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }

    /// Post an event; a full or closed channel drops it
    pub fn post(&self, event: HostEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                log::trace!("notification channel full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::gain::MINIMUM_DB_LEVEL;

    #[test]
    fn test_peak_levels() {
        let levels = PeakLevels::measure(&[0.5, -1.0], &[0.0, 0.0], &[0.1], &[-0.1]);
        assert!((levels.input_left - 0.0).abs() < 1e-6);
        assert_eq!(levels.input_right, MINIMUM_DB_LEVEL);
        assert!((levels.output_left - (-20.0)).abs() < 1e-4);
        assert!((levels.output_right - (-20.0)).abs() < 1e-4);
    }

    #[test]
    fn test_peak_hold_keeps_maxima_until_taken() {
        let mut hold = PeakHold::default();
        hold.update(&[1.0], &[0.5], &[-1.0], &[0.25]);
        hold.update(&[0.1], &[0.1], &[0.1], &[0.1]);

        let levels = hold.take();
        assert!(levels.input_left.abs() < 1e-6);
        assert!(levels.output_left.abs() < 1e-6);
        assert!((levels.output_right - (-12.0412)).abs() < 1e-3);

        hold.update(&[0.1], &[0.1], &[0.1], &[0.1]);
        assert!((hold.levels().output_left - (-20.0)).abs() < 1e-4);
    }

    #[test]
    fn test_full_channel_drops_events() {
        let (notifier, rx) = Notifier::channel(1);
        let event = HostEvent::Latency {
            effect: "pitch".into(),
            seconds: 0.01,
        };

        assert!(notifier.post(event.clone()));
        assert!(!notifier.post(event.clone()));
        assert_eq!(rx.try_recv().unwrap(), event);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_is_silent() {
        let (notifier, rx) = Notifier::channel(4);
        drop(rx);
        assert!(!notifier.post(HostEvent::CombineStarted {
            output: "x".into()
        }));
    }
}
