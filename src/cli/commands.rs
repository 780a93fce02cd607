//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use log::{info, warn};
use serde_json::{json, Value};

use crate::config::HostConfig;
use crate::convolver::{list_kernels, KernelCombiner};
use crate::effects::{create_effect, EffectChain};
use crate::engine::{read_stereo, render, write_stereo, SampleEncoding};
use crate::error::{FxError, Result};
use crate::notify::{HostEvent, Notifier, DEFAULT_CAPACITY};
use crate::plugin::PluginRegistry;
use crate::preset::{self, Section};

/// Host configuration from `path`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<HostConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            HostConfig::load(path)
        }
        None => Ok(HostConfig::default()),
    }
}

/// Print the kernels available for combination.
pub fn show_kernels(config: &HostConfig) -> Result<()> {
    let kernels = list_kernels(&config.irs_dir)?;

    if kernels.is_empty() {
        println!("No impulse responses in {}", config.irs_dir.display());
        return Ok(());
    }

    println!("Impulse responses in {}:", config.irs_dir.display());
    for name in kernels {
        println!("  {}", name);
    }

    Ok(())
}

/// Combine two kernels and wait for the worker to finish.
pub fn combine(config: &HostConfig, kernel_1: &str, kernel_2: &str, output: &str) -> Result<()> {
    info!("Combining {} and {} into {}", kernel_1, kernel_2, output);

    let (notifier, events) = Notifier::channel(DEFAULT_CAPACITY);
    let combiner = KernelCombiner::new(&config.irs_dir, Some(notifier));

    let name = combiner.request(kernel_1, kernel_2, output)?;
    combiner.join_all();

    for event in events.try_iter() {
        if let HostEvent::CombineFinished { written, .. } = event {
            return match written {
                Some(path) => {
                    println!("Combined kernel saved: {}", path.display());
                    Ok(())
                }
                None => Err(FxError::InvalidKernel {
                    reason: format!(
                        "could not combine {} and {} into {}",
                        kernel_1, kernel_2, name
                    ),
                }),
            };
        }
    }

    Ok(())
}

/// Build a chain of named effects for `config`'s format.
pub fn build_chain(
    config: &HostConfig,
    sample_rate: u32,
    effects: &[String],
) -> Result<EffectChain> {
    let registry = PluginRegistry::with_native();
    let mut chain = EffectChain::new(sample_rate, config.block_size);

    for name in effects {
        let mut effect = create_effect(name.trim(), &registry)?;
        effect.base_mut().set_notification_window(config.notification_window_secs);
        chain.push(effect);
    }

    Ok(chain)
}

/// Run `input` through the chain and write the result to `output`.
pub fn process(
    config: &HostConfig,
    input: &Path,
    output: &Path,
    preset_path: Option<&Path>,
    effects: &[String],
) -> Result<()> {
    info!("Processing {} -> {}", input.display(), output.display());

    let audio = read_stereo(input)?;
    let mut chain = build_chain(config, audio.sample_rate, effects)?;

    if let Some(path) = preset_path {
        let doc = preset::read_file(path)?;
        for effect in chain.iter() {
            preset::load_effect(&doc, Section::Output, effect)?;
        }
        info!("Loaded preset: {}", path.display());
    }

    for effect in chain.iter() {
        if effect.latency_seconds() > 0.0 {
            warn!("{} adds {:.3} s of latency", effect.name(), effect.latency_seconds());
        }
    }

    let rendered = render(&mut chain, &audio, config.block_size);
    write_stereo(output, &rendered, SampleEncoding::Float32)?;

    println!(
        "Processed {:.2} s through {} effect(s), latency {:.3} s",
        rendered.duration_secs(),
        chain.len(),
        chain.latency_seconds()
    );
    println!("Output written: {}", output.display());

    Ok(())
}

/// Default preset document for the named effects.
pub fn default_preset(effects: &[String], section: Section) -> Result<Value> {
    let registry = PluginRegistry::with_native();
    let mut doc = json!({});

    for name in effects {
        let effect = create_effect(name.trim(), &registry)?;
        preset::save_effect(&mut doc, section, effect.as_ref())?;
    }

    Ok(doc)
}

/// Print the default preset document.
pub fn print_preset(effects: &[String], section: &str) -> Result<()> {
    let doc = default_preset(effects, section.parse()?)?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
