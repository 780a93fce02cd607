//! Impulse response files
//!
//! Kernels live in one directory as `<name>.irs` WAV files. They are read as
//! stereo float and written back as 32-bit PCM.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::IRS_EXTENSION;
use crate::dsp::resample::resample;
use crate::engine::io::{read_stereo, write_stereo, SampleEncoding, StereoAudio};
use crate::error::{FxError, Result};

/// Path of kernel `name` inside `irs_dir`
pub fn kernel_path(irs_dir: &Path, name: &str) -> PathBuf {
    irs_dir.join(format!("{}.{}", name, IRS_EXTENSION))
}

/// Sorted names (file stems) of the kernels directly inside `irs_dir`
///
/// A missing directory simply has no kernels.
pub fn list_kernels(irs_dir: &Path) -> Result<Vec<String>> {
    if !irs_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(irs_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| FxError::Io(e.into()))?;
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(IRS_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub sample_rate: u32,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl ImpulseResponse {
    /// Load kernel `name` from `irs_dir`
    pub fn load(irs_dir: &Path, name: &str) -> Result<Self> {
        Self::read(&kernel_path(irs_dir, name))
    }

    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(FxError::KernelNotFound {
                path: path.display().to_string(),
                source: None,
            });
        }

        let audio = read_stereo(path).map_err(|e| match e {
            FxError::Wav(hound::Error::IoError(source)) => FxError::KernelNotFound {
                path: path.display().to_string(),
                source: Some(source),
            },
            other => FxError::InvalidKernel {
                reason: format!("{}: {}", path.display(), other),
            },
        })?;

        if audio.sample_rate == 0 {
            return Err(FxError::InvalidKernel {
                reason: format!("{}: sample rate is 0", path.display()),
            });
        }
        if audio.is_empty() {
            return Err(FxError::InvalidKernel {
                reason: format!("{}: no samples", path.display()),
            });
        }

        let StereoAudio {
            sample_rate,
            left,
            right,
        } = audio;

        Ok(Self {
            sample_rate,
            left,
            right,
        })
    }

    /// Frames per channel
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Both channels converted to `rate`
    pub fn resampled(&self, rate: u32) -> Result<Self> {
        Ok(Self {
            sample_rate: rate,
            left: resample(&self.left, self.sample_rate, rate)?,
            right: resample(&self.right, self.sample_rate, rate)?,
        })
    }

    /// Write as interleaved stereo 32-bit PCM
    pub fn write(&self, path: &Path) -> Result<()> {
        let audio = StereoAudio::new(self.sample_rate, self.left.clone(), self.right.clone());
        write_stereo(path, &audio, SampleEncoding::Int32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn kernel(rate: u32, frames: usize) -> ImpulseResponse {
        ImpulseResponse {
            sample_rate: rate,
            left: (0..frames).map(|i| 0.5 / (i + 1) as f32).collect(),
            right: (0..frames).map(|i| -0.25 / (i + 1) as f32).collect(),
        }
    }

    #[test]
    fn test_write_and_load() {
        let dir = TempDir::new().unwrap();
        let ir = kernel(44100, 32);
        ir.write(&kernel_path(dir.path(), "room")).unwrap();

        let back = ImpulseResponse::load(dir.path(), "room").unwrap();
        assert_eq!(back.sample_rate, 44100);
        assert_eq!(back.len(), 32);
        for (a, b) in back.left.iter().zip(&ir.left) {
            assert!((a - b).abs() < 1e-7);
        }

        let spec = hound::WavReader::open(kernel_path(dir.path(), "room"))
            .unwrap()
            .spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    }

    #[test]
    fn test_missing_and_corrupt_kernels() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ImpulseResponse::load(dir.path(), "nope"),
            Err(FxError::KernelNotFound { .. })
        ));

        fs::write(kernel_path(dir.path(), "junk"), b"not a wav file").unwrap();
        assert!(matches!(
            ImpulseResponse::load(dir.path(), "junk"),
            Err(FxError::InvalidKernel { .. })
        ));
    }

    #[test]
    fn test_list_kernels() {
        let dir = TempDir::new().unwrap();
        for name in ["b", "a", "c"] {
            kernel(48000, 4).write(&kernel_path(dir.path(), name)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.irs")).unwrap();

        assert_eq!(list_kernels(dir.path()).unwrap(), vec!["a", "b", "c"]);
        assert!(list_kernels(&dir.path().join("absent")).unwrap().is_empty());
    }
}
