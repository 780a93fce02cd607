//! Effect running through a [`PluginBackend`]

use std::sync::Arc;

use super::base::{passthrough, EffectBase};
use super::Effect;
use crate::error::Result;
use crate::plugin::{bind_key, Binding, ControlPorts, PluginBackend, PluginRegistry};
use crate::settings::{Settings, Subscription};

pub struct PluginEffect {
    base: EffectBase,
    backend: Box<dyn PluginBackend>,
    bindings: Vec<Subscription>,
}

impl PluginEffect {
    pub fn new(
        name: &'static str,
        settings: Settings,
        backend: Box<dyn PluginBackend>,
    ) -> Result<Self> {
        if !backend.found_plugin() {
            log::warn!("{}: {} is not available, effect disabled", name, backend.uri());
        }

        Ok(Self {
            base: EffectBase::new(name, settings)?,
            backend,
            bindings: Vec::new(),
        })
    }

    /// Resolve `uri` in `registry` and wrap the result
    pub fn load(
        name: &'static str,
        settings: Settings,
        registry: &PluginRegistry,
        uri: &str,
    ) -> Result<Self> {
        Self::new(name, settings, registry.load(uri))
    }

    /// Bind a key of the effect's own settings group to a port
    pub fn bind(&mut self, binding: Binding, key: &str, port: &str) -> Result<()> {
        let settings = self.base.settings().clone();
        self.bind_group(binding, &settings, key, port)
    }

    /// Bind a key of another settings group (e.g. a per-channel group)
    pub fn bind_group(
        &mut self,
        binding: Binding,
        settings: &Settings,
        key: &str,
        port: &str,
    ) -> Result<()> {
        // Still validate the key so schema mistakes surface with or without a plugin
        settings.spec(key)?;

        if !self.backend.found_plugin() {
            return Ok(());
        }

        let ports = self.backend.ports();
        let subscription = bind_key(binding, settings, key, &ports, port)?;
        self.bindings.push(subscription);
        Ok(())
    }

    pub fn found_plugin(&self) -> bool {
        self.backend.found_plugin()
    }

    pub fn ports(&self) -> Arc<ControlPorts> {
        self.backend.ports()
    }

    pub fn backend(&self) -> &dyn PluginBackend {
        self.backend.as_ref()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

impl Effect for PluginEffect {
    fn base(&self) -> &EffectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        &mut self.base
    }

    fn setup(&mut self, rate: u32, n_samples: usize) {
        self.base.set_format(rate, n_samples);

        if !self.backend.found_plugin() {
            return;
        }

        if self.backend.create_instance(rate) {
            self.backend.set_n_samples(n_samples);
        } else {
            log::warn!("{}: failed to instantiate {}", self.base.name(), self.backend.uri());
        }
    }

    fn process(
        &mut self,
        left_in: &mut [f32],
        right_in: &mut [f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        if !self.backend.found_plugin() || self.base.is_bypassed() || !self.backend.has_instance() {
            passthrough(left_in, right_in, left_out, right_out);
            return;
        }

        self.base.apply_input_gain(left_in, right_in);

        let frames = left_in
            .len()
            .min(right_in.len())
            .min(left_out.len())
            .min(right_out.len());

        if self.backend.n_samples() != frames {
            self.backend.set_n_samples(frames);
        }

        self.backend.run(
            &left_in[..frames],
            &right_in[..frames],
            &mut left_out[..frames],
            &mut right_out[..frames],
        );
        left_out[frames..].fill(0.0);
        right_out[frames..].fill(0.0);

        self.base.apply_output_gain(left_out, right_out);

        self.base.notify_peaks(left_in, right_in, left_out, right_out);
    }
}
