//! Settings key to control port bindings
//!
//! Each binding copies the current value into the port, then keeps the port
//! in sync for as long as the returned [`Subscription`] lives.

use std::sync::Arc;

use super::ControlPorts;
use crate::dsp::gain::db_to_linear;
use crate::error::Result;
use crate::settings::{SettingKind, SettingValue, Settings, Subscription};

/// How a setting value maps onto a port value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Double,
    /// Setting in dB, port linear
    DoubleDb,
    Int,
    Bool,
    /// Enum nick to its index
    Enum,
}

impl Binding {
    fn port_value(self, nicks: &[&str], value: &SettingValue) -> Option<f64> {
        match self {
            Binding::Double | Binding::Int => value.as_f64(),
            Binding::DoubleDb => value.as_f64().map(|db| f64::from(db_to_linear(db))),
            Binding::Bool => value.as_bool().map(|b| if b { 1.0 } else { 0.0 }),
            Binding::Enum => {
                let nick = value.as_str()?;
                nicks.iter().position(|n| *n == nick).map(|idx| idx as f64)
            }
        }
    }
}

/// Bind `key` of `settings` to `port`
pub fn bind_key(
    binding: Binding,
    settings: &Settings,
    key: &str,
    ports: &Arc<ControlPorts>,
    port: &str,
) -> Result<Subscription> {
    let nicks: &'static [&'static str] = match settings.spec(key)?.kind {
        SettingKind::Enum(nicks) => nicks,
        _ => &[],
    };

    let current = settings.get(key)?;
    if let Some(value) = binding.port_value(nicks, &current) {
        ports.set(port, value);
    }

    let group = settings.name().to_string();
    let ports = Arc::clone(ports);
    let port = port.to_string();

    settings.subscribe(key, move |_, value| {
        if let Some(v) = binding.port_value(nicks, value) {
            if !ports.set(&port, v) {
                log::warn!("{}: no control port named {}", group, port);
            }
        }
    })
}
