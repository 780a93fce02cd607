//! Plugin backends
//!
//! Effects that wrap an external DSP plugin talk to it through
//! [`PluginBackend`]: a set of named control ports plus a stereo `run`.
//! Backends are looked up by URI in a [`PluginRegistry`]; a URI with no
//! registered factory yields a [`MissingPlugin`] and the effect passes audio
//! through unchanged.

pub mod binding;
pub mod para_eq;
mod ports;

use std::collections::HashMap;
use std::sync::Arc;

pub use binding::{bind_key, Binding};
pub use para_eq::ParaEqualizer;
pub use ports::ControlPorts;

/// 32-band stereo parametric equalizer with independent left/right bands
pub const EQUALIZER_URI: &str = "http://lsp-plug.in/plugins/lv2/para_equalizer_x32_lr";

/// Psychoacoustic clipper
pub const CLIPPER_URI: &str = "urn:fxrack:psyclipper";

/// Stereo loudness compensator
pub const LOUDNESS_URI: &str = "http://lsp-plug.in/plugins/lv2/loud_comp_stereo";

/// A loaded plugin
pub trait PluginBackend: Send {
    fn uri(&self) -> &str;

    /// False when the URI could not be resolved
    fn found_plugin(&self) -> bool;

    /// Shared handle to the control ports
    fn ports(&self) -> Arc<ControlPorts>;

    /// (Re)create the instance at `rate`. Returns false on failure.
    fn create_instance(&mut self, rate: u32) -> bool;

    fn has_instance(&self) -> bool;

    /// Block size the instance was last configured for
    fn n_samples(&self) -> usize;

    fn set_n_samples(&mut self, n_samples: usize);

    /// Process one block. Output slices are at least as long as the inputs.
    fn run(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    );
}

/// Backend for a URI nothing could be loaded for
#[derive(Debug)]
pub struct MissingPlugin {
    uri: String,
    ports: Arc<ControlPorts>,
}

impl MissingPlugin {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ports: Arc::new(ControlPorts::default()),
        }
    }
}

impl PluginBackend for MissingPlugin {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn found_plugin(&self) -> bool {
        false
    }

    fn ports(&self) -> Arc<ControlPorts> {
        Arc::clone(&self.ports)
    }

    fn create_instance(&mut self, _rate: u32) -> bool {
        false
    }

    fn has_instance(&self) -> bool {
        false
    }

    fn n_samples(&self) -> usize {
        0
    }

    fn set_n_samples(&mut self, _n_samples: usize) {}

    fn run(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        left_out[..left_in.len()].copy_from_slice(left_in);
        right_out[..right_in.len()].copy_from_slice(right_in);
    }
}

type BackendFactory = Box<dyn Fn() -> Box<dyn PluginBackend> + Send + Sync>;

/// URI to backend factory lookup
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl PluginRegistry {
    /// Empty registry: every lookup yields a missing plugin
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the backends implemented in this crate
    pub fn with_native() -> Self {
        let mut registry = Self::new();
        registry.register(EQUALIZER_URI, || Box::new(ParaEqualizer::new()));
        registry
    }

    pub fn register<F>(&mut self, uri: &str, factory: F)
    where
        F: Fn() -> Box<dyn PluginBackend> + Send + Sync + 'static,
    {
        self.factories.insert(uri.to_string(), Box::new(factory));
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.factories.contains_key(uri)
    }

    /// Instantiate the backend for `uri`
    pub fn load(&self, uri: &str) -> Box<dyn PluginBackend> {
        match self.factories.get(uri) {
            Some(factory) => {
                log::debug!("loaded plugin {}", uri);
                factory()
            }
            None => {
                log::warn!("plugin {} not found, audio will pass through", uri);
                Box::new(MissingPlugin::new(uri))
            }
        }
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("uris", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_registry_resolves_equalizer() {
        let registry = PluginRegistry::with_native();
        let eq = registry.load(EQUALIZER_URI);
        assert!(eq.found_plugin());
        assert_eq!(eq.uri(), EQUALIZER_URI);
        assert!(!eq.ports().is_empty());
    }

    #[test]
    fn test_unknown_uri_is_missing() {
        let registry = PluginRegistry::with_native();
        let mut clipper = registry.load(CLIPPER_URI);
        assert!(!clipper.found_plugin());
        assert!(!clipper.create_instance(48000));
        assert!(!clipper.has_instance());

        let input = [0.1, 0.2, 0.3];
        let mut l = [0.0; 3];
        let mut r = [0.0; 3];
        clipper.run(&input, &input, &mut l, &mut r);
        assert_eq!(l, input);
        assert_eq!(r, input);
    }
}
