//! Kernel combination
//!
//! Two impulse responses are merged into one by convolving them channel by
//! channel. Direct convolution of long kernels is slow, so requests run on
//! worker threads. The combiner tracks every worker and joins them all when
//! it is dropped.

use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use super::kernel::{kernel_path, list_kernels, ImpulseResponse};
use crate::dsp::convolve::direct_conv;
use crate::error::{FxError, Result};
use crate::notify::{HostEvent, Notifier};

/// Longest output name kept, in characters
pub const MAX_NAME_LEN: usize = 100;

/// Check a user-supplied output name, truncating it to [`MAX_NAME_LEN`]
pub fn validate_output_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(FxError::InvalidKernelName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }
    if name.contains(['/', '\\']) {
        return Err(FxError::InvalidKernelName {
            name: name.to_string(),
            reason: "name contains a path separator".to_string(),
        });
    }
    Ok(name.chars().take(MAX_NAME_LEN).collect())
}

/// Convolve kernels `kernel_1` and `kernel_2` from `irs_dir` and save the
/// result as `<irs_dir>/<output_name>.irs`
///
/// An empty `output_name` does nothing and returns `Ok(None)`. Any failure
/// to load either kernel returns before anything is written.
pub fn combine_kernels(
    irs_dir: &Path,
    kernel_1: &str,
    kernel_2: &str,
    output_name: &str,
) -> Result<Option<PathBuf>> {
    if output_name.is_empty() {
        return Ok(None);
    }
    let output_name = validate_output_name(output_name)?;

    let mut first = ImpulseResponse::load(irs_dir, kernel_1)?;
    let mut second = ImpulseResponse::load(irs_dir, kernel_2)?;

    let rate = first.sample_rate.max(second.sample_rate);
    if first.sample_rate < rate {
        log::debug!("resampling the kernel {} to {} Hz", kernel_1, rate);
        first = first.resampled(rate)?;
    } else if second.sample_rate < rate {
        log::debug!("resampling the kernel {} to {} Hz", kernel_2, rate);
        second = second.resampled(rate)?;
    }

    // Same result either way; the longer kernel first is faster
    let (a, b) = if first.len() > second.len() {
        (&first, &second)
    } else {
        (&second, &first)
    };

    let (left, right) = rayon::join(
        || direct_conv(&a.left, &b.left),
        || direct_conv(&a.right, &b.right),
    );

    let combined = ImpulseResponse {
        sample_rate: rate,
        left,
        right,
    };

    let path = kernel_path(irs_dir, &output_name);
    combined.write(&path)?;

    log::debug!("combined kernel saved: {}", path.display());

    Ok(Some(path))
}

/// Body of one worker thread
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Posts `CombineFinished` when dropped, whichever way the worker exits.
/// A worker that never starts drops it with its closure.
struct FinishGuard {
    notifier: Option<Notifier>,
    output: String,
    written: Option<PathBuf>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if let Some(notifier) = &self.notifier {
            notifier.post(HostEvent::CombineFinished {
                output: self.output.clone(),
                written: self.written.take(),
            });
        }
    }
}

/// Runs kernel combinations in the background
pub struct KernelCombiner {
    irs_dir: PathBuf,
    notifier: Option<Notifier>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl KernelCombiner {
    pub fn new(irs_dir: impl Into<PathBuf>, notifier: Option<Notifier>) -> Self {
        Self {
            irs_dir: irs_dir.into(),
            notifier,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn irs_dir(&self) -> &Path {
        &self.irs_dir
    }

    /// Kernels available for combination
    pub fn kernels(&self) -> Result<Vec<String>> {
        list_kernels(&self.irs_dir)
    }

    /// Start combining `kernel_1` and `kernel_2` into `output_name`
    ///
    /// Returns the (possibly truncated) output name the worker will use. An
    /// invalid name is rejected here and no worker is started; the busy
    /// indicator is still stopped.
    pub fn request(&self, kernel_1: &str, kernel_2: &str, output_name: &str) -> Result<String> {
        if kernel_1.is_empty() || kernel_2.is_empty() {
            return Err(FxError::InvalidKernelName {
                name: String::new(),
                reason: "no kernel selected".to_string(),
            });
        }

        self.post(HostEvent::CombineStarted {
            output: output_name.to_string(),
        });

        let finished = FinishGuard {
            notifier: self.notifier.clone(),
            output: output_name.to_string(),
            written: None,
        };

        let output_name = match validate_output_name(output_name) {
            Ok(name) => name,
            Err(e) => {
                log::debug!("combined IR filename rejected: {}", e);
                return Err(e);
            }
        };

        let irs_dir = self.irs_dir.clone();
        let (k1, k2, out) = (kernel_1.to_string(), kernel_2.to_string(), output_name.clone());

        let job: Job = Box::new(move || {
            let mut finished = finished;
            match combine_kernels(&irs_dir, &k1, &k2, &out) {
                Ok(written) => finished.written = written,
                Err(e) => log::warn!("could not combine {} and {}: {}", k1, k2, e),
            }
        });

        self.dispatch(job, |job| {
            thread::Builder::new()
                .name("kernel-combine".to_string())
                .spawn(job)
        })?;
        Ok(output_name)
    }

    /// Start `job` through `spawn` and track its handle, joining workers
    /// that have already finished
    fn dispatch<F>(&self, job: Job, spawn: F) -> Result<()>
    where
        F: FnOnce(Job) -> io::Result<JoinHandle<()>>,
    {
        let handle = match spawn(job) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("could not start a kernel combination worker: {}", e);
                return Err(e.into());
            }
        };

        let mut tasks = self.tasks.lock();
        let mut i = 0;
        while i < tasks.len() {
            if tasks[i].is_finished() {
                if tasks.swap_remove(i).join().is_err() {
                    log::warn!("kernel combination worker panicked");
                }
            } else {
                i += 1;
            }
        }
        tasks.push(handle);
        Ok(())
    }

    /// Workers still running
    pub fn pending_tasks(&self) -> usize {
        self.tasks.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Workers spawned and not yet joined
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Block until every worker has finished
    pub fn join_all(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                log::warn!("kernel combination worker panicked");
            }
        }
    }

    fn post(&self, event: HostEvent) {
        if let Some(notifier) = &self.notifier {
            notifier.post(event);
        }
    }
}

impl Drop for KernelCombiner {
    fn drop(&mut self) {
        self.join_all();
        log::debug!("kernel combiner disposed");
    }
}

impl std::fmt::Debug for KernelCombiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelCombiner")
            .field("irs_dir", &self.irs_dir)
            .field("tasks", &self.task_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DEFAULT_CAPACITY;
    use tempfile::TempDir;
    use test_case::test_case;

    fn write_kernel(dir: &Path, name: &str, rate: u32, left: &[f32], right: &[f32]) {
        ImpulseResponse {
            sample_rate: rate,
            left: left.to_vec(),
            right: right.to_vec(),
        }
        .write(&kernel_path(dir, name))
        .unwrap();
    }

    #[test_case("" ; "empty")]
    #[test_case("a/b" ; "slash")]
    #[test_case("a\\b" ; "backslash")]
    fn test_rejected_names(name: &str) {
        assert!(matches!(
            validate_output_name(name),
            Err(FxError::InvalidKernelName { .. })
        ));
    }

    #[test]
    fn test_long_names_are_truncated() {
        assert_eq!(validate_output_name("hall").unwrap(), "hall");
        let long = "é".repeat(150);
        assert_eq!(validate_output_name(&long).unwrap().chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_equal_rates_combine_to_full_length() {
        let dir = TempDir::new().unwrap();
        write_kernel(dir.path(), "k1", 48000, &[0.5, 0.25, 0.0, -0.25], &[0.1, 0.1, 0.1, 0.1]);
        write_kernel(dir.path(), "k2", 48000, &[1.0, 0.5, 0.25], &[0.5, 0.0, -0.5]);

        let path = combine_kernels(dir.path(), "k1", "k2", "out").unwrap().unwrap();
        assert_eq!(path, kernel_path(dir.path(), "out"));

        let out = ImpulseResponse::read(&path).unwrap();
        assert_eq!(out.sample_rate, 48000);
        assert_eq!(out.len(), 6);

        let expected_left = [0.5, 0.5, 0.25, -0.1875, -0.125, -0.0625];
        let expected_right = [0.05, 0.05, 0.0, 0.0, -0.05, -0.05];
        for (a, b) in out.left.iter().zip(expected_left) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
        for (a, b) in out.right.iter().zip(expected_right) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_lower_rate_kernel_is_resampled_up() {
        let dir = TempDir::new().unwrap();
        let impulse: Vec<f32> = (0..64).map(|i| if i == 0 { 0.5 } else { 0.0 }).collect();
        write_kernel(dir.path(), "slow", 24000, &impulse, &impulse);
        write_kernel(dir.path(), "fast", 48000, &[0.5; 10], &[0.5; 10]);

        let path = combine_kernels(dir.path(), "slow", "fast", "mix").unwrap().unwrap();
        let out = ImpulseResponse::read(&path).unwrap();
        assert_eq!(out.sample_rate, 48000);
        // 64 frames at 24 kHz become 128 at 48 kHz
        assert_eq!(out.len(), 128 + 10 - 1);
    }

    #[test]
    fn test_empty_output_name_writes_nothing() {
        let dir = TempDir::new().unwrap();
        write_kernel(dir.path(), "k1", 48000, &[1.0], &[1.0]);
        assert_eq!(combine_kernels(dir.path(), "k1", "k1", "").unwrap(), None);
        assert_eq!(list_kernels(dir.path()).unwrap(), vec!["k1"]);
    }

    #[test]
    fn test_missing_kernel_writes_nothing() {
        let dir = TempDir::new().unwrap();
        write_kernel(dir.path(), "k1", 48000, &[1.0], &[1.0]);
        let result = combine_kernels(dir.path(), "k1", "ghost", "out");
        assert!(matches!(result, Err(FxError::KernelNotFound { .. })));
        assert!(!kernel_path(dir.path(), "out").exists());
    }

    #[test]
    fn test_combiner_rejects_bad_name_without_spawning() {
        let dir = TempDir::new().unwrap();
        let (notifier, rx) = Notifier::channel(DEFAULT_CAPACITY);
        let combiner = KernelCombiner::new(dir.path(), Some(notifier));

        assert!(combiner.request("k1", "k2", "a/b").is_err());
        assert_eq!(combiner.task_count(), 0);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                HostEvent::CombineStarted {
                    output: "a/b".to_string()
                },
                HostEvent::CombineFinished {
                    output: "a/b".to_string(),
                    written: None
                },
            ]
        );

        // Empty pickers: nothing starts at all
        assert!(combiner.request("", "k2", "out").is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_combiner_runs_in_background_and_reports() {
        let dir = TempDir::new().unwrap();
        write_kernel(dir.path(), "k1", 48000, &[1.0, 0.5], &[1.0, 0.5]);
        write_kernel(dir.path(), "k2", 48000, &[0.5], &[0.5]);

        let (notifier, rx) = Notifier::channel(DEFAULT_CAPACITY);
        let combiner = KernelCombiner::new(dir.path(), Some(notifier));

        assert_eq!(combiner.request("k1", "k2", "first").unwrap(), "first");
        assert_eq!(combiner.request("k1", "ghost", "second").unwrap(), "second");
        combiner.join_all();
        assert_eq!(combiner.pending_tasks(), 0);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(events.contains(&HostEvent::CombineFinished {
            output: "first".to_string(),
            written: Some(kernel_path(dir.path(), "first")),
        }));
        assert!(events.contains(&HostEvent::CombineFinished {
            output: "second".to_string(),
            written: None,
        }));
        assert_eq!(combiner.kernels().unwrap(), vec!["first", "k1", "k2"]);
    }

    #[test]
    fn test_failed_spawn_still_finishes() {
        let dir = TempDir::new().unwrap();
        let (notifier, rx) = Notifier::channel(DEFAULT_CAPACITY);
        let combiner = KernelCombiner::new(dir.path(), Some(notifier.clone()));

        let finished = FinishGuard {
            notifier: Some(notifier),
            output: "out".to_string(),
            written: None,
        };
        let job: Job = Box::new(move || drop(finished));

        // Like `thread::Builder::spawn`, a failed start drops the closure
        let result = combiner.dispatch(job, |job| {
            drop(job);
            Err(io::Error::new(io::ErrorKind::Other, "no threads left"))
        });
        assert!(result.is_err());
        assert_eq!(combiner.task_count(), 0);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![HostEvent::CombineFinished {
                output: "out".to_string(),
                written: None
            }]
        );
    }

    #[test]
    fn test_finished_workers_are_reaped_on_request() {
        let dir = TempDir::new().unwrap();
        write_kernel(dir.path(), "k1", 48000, &[1.0, 0.5], &[1.0, 0.5]);
        let combiner = KernelCombiner::new(dir.path(), None);

        for name in ["a", "b", "c"] {
            combiner.request("k1", "k1", name).unwrap();
        }
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while combiner.pending_tasks() > 0 && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(combiner.pending_tasks(), 0);

        combiner.request("k1", "k1", "d").unwrap();
        assert_eq!(combiner.task_count(), 1);
    }

    #[test]
    fn test_drop_joins_workers() {
        let dir = TempDir::new().unwrap();
        let long: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.01).sin() * 0.1).collect();
        write_kernel(dir.path(), "long", 48000, &long, &long);

        {
            let combiner = KernelCombiner::new(dir.path(), None);
            combiner.request("long", "long", "squared").unwrap();
        }

        assert!(kernel_path(dir.path(), "squared").exists());
    }
}
