//! Control ports
//!
//! Named scalar inputs of a plugin instance. The control thread writes them,
//! the audio thread reads them once per block; both sides are lock-free.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ControlPorts {
    ports: HashMap<String, AtomicU64>,
    version: AtomicU64,
}

impl ControlPorts {
    /// Create the fixed port set with initial values
    pub fn new<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            ports: ports
                .into_iter()
                .map(|(name, value)| (name.into(), AtomicU64::new(value.to_bits())))
                .collect(),
            version: AtomicU64::new(0),
        }
    }

    /// Write a port; returns false for unknown names
    pub fn set(&self, name: &str, value: f64) -> bool {
        match self.ports.get(name) {
            Some(port) => {
                port.store(value.to_bits(), Ordering::Relaxed);
                self.version.fetch_add(1, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.ports
            .get(name)
            .map(|port| f64::from_bits(port.load(Ordering::Relaxed)))
    }

    /// Read a port known to exist, with a fallback
    #[inline]
    pub fn value(&self, name: &str, fallback: f64) -> f64 {
        self.get(name).unwrap_or(fallback)
    }

    /// Bumped on every write
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
