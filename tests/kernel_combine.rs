//! Kernel Combination Integration Tests
//!
//! Background combination of impulse responses stored in a kernel directory.

use std::path::Path;

use approx::assert_abs_diff_eq;
use fxrack::convolver::{
    kernel_path, list_kernels, ImpulseResponse, KernelCombiner, MAX_NAME_LEN,
};
use fxrack::dsp::direct_conv;
use fxrack::notify::{HostEvent, Notifier, DEFAULT_CAPACITY};
use tempfile::tempdir;

fn decaying(rate: u32, frames: usize, scale: f32) -> ImpulseResponse {
    let left: Vec<f32> = (0..frames).map(|i| scale * 0.8f32.powi(i as i32)).collect();
    let right: Vec<f32> = left.iter().map(|s| -s * 0.5).collect();
    ImpulseResponse {
        sample_rate: rate,
        left,
        right,
    }
}

fn store(dir: &Path, name: &str, ir: &ImpulseResponse) {
    ir.write(&kernel_path(dir, name)).unwrap();
}

#[test]
fn test_combined_kernel_matches_reference_convolution() {
    let dir = tempdir().unwrap();
    let a = decaying(48000, 40, 0.5);
    let b = decaying(48000, 25, 0.25);
    store(dir.path(), "a", &a);
    store(dir.path(), "b", &b);

    let (notifier, events) = Notifier::channel(DEFAULT_CAPACITY);
    let combiner = KernelCombiner::new(dir.path(), Some(notifier));
    combiner.request("a", "b", "ab").unwrap();
    combiner.join_all();

    let events: Vec<HostEvent> = events.try_iter().collect();
    assert_eq!(
        events.last(),
        Some(&HostEvent::CombineFinished {
            output: "ab".to_string(),
            written: Some(kernel_path(dir.path(), "ab")),
        })
    );

    let combined = ImpulseResponse::load(dir.path(), "ab").unwrap();
    assert_eq!(combined.sample_rate, 48000);
    assert_eq!(combined.len(), 40 + 25 - 1);

    for (got, want) in combined.left.iter().zip(direct_conv(&a.left, &b.left)) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }
    for (got, want) in combined.right.iter().zip(direct_conv(&b.right, &a.right)) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }
}

#[test]
fn test_mixed_rates_take_the_higher_rate() {
    let dir = tempdir().unwrap();
    store(dir.path(), "low", &decaying(22050, 441, 0.5));
    store(dir.path(), "high", &decaying(44100, 10, 0.5));

    let combiner = KernelCombiner::new(dir.path(), None);
    combiner.request("low", "high", "mixed").unwrap();
    combiner.join_all();

    let combined = ImpulseResponse::load(dir.path(), "mixed").unwrap();
    assert_eq!(combined.sample_rate, 44100);
    assert_eq!(combined.len(), 882 + 10 - 1);
}

#[test]
fn test_sequential_requests_and_teardown() {
    let dir = tempdir().unwrap();
    store(dir.path(), "a", &decaying(48000, 512, 0.3));

    {
        let combiner = KernelCombiner::new(dir.path(), None);
        for name in ["one", "two", "three"] {
            combiner.request("a", "a", name).unwrap();
        }
        // Earlier workers may already be reaped; the latest is still tracked
        assert!((1..=3).contains(&combiner.task_count()));
    }

    assert_eq!(list_kernels(dir.path()).unwrap(), vec!["a", "one", "three", "two"]);
}

#[test]
fn test_long_name_is_truncated_on_disk() {
    let dir = tempdir().unwrap();
    store(dir.path(), "a", &decaying(48000, 4, 1.0));

    let combiner = KernelCombiner::new(dir.path(), None);
    let long = "k".repeat(MAX_NAME_LEN + 20);
    let used = combiner.request("a", "a", &long).unwrap();
    combiner.join_all();

    assert_eq!(used.len(), MAX_NAME_LEN);
    assert!(kernel_path(dir.path(), &used).exists());
}

#[test]
fn test_rejected_requests_leave_directory_untouched() {
    let dir = tempdir().unwrap();
    store(dir.path(), "a", &decaying(48000, 4, 1.0));

    let (notifier, events) = Notifier::channel(DEFAULT_CAPACITY);
    let combiner = KernelCombiner::new(dir.path(), Some(notifier));

    assert!(combiner.request("a", "a", "../escape").is_err());
    assert!(combiner.request("a", "", "out").is_err());
    assert!(combiner.request("a", "a", "").is_err());
    assert_eq!(combiner.task_count(), 0);

    assert_eq!(list_kernels(dir.path()).unwrap(), vec!["a"]);
    let finished = events
        .try_iter()
        .filter(|e| matches!(e, HostEvent::CombineFinished { written: None, .. }))
        .count();
    assert_eq!(finished, 2);
}
