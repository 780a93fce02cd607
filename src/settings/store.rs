//! Change-notifying settings store

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::schema::{SettingKind, SettingSpec, SettingValue};
use crate::error::{FxError, Result};

type Callback = Arc<dyn Fn(&str, &SettingValue) + Send + Sync>;

struct Subscriber {
    id: u64,
    key: String,
    callback: Callback,
}

struct Inner {
    name: String,
    specs: Vec<SettingSpec>,
    index: HashMap<String, usize>,
    values: RwLock<Vec<SettingValue>>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

/// Shared handle to one settings group
///
/// Cloning is cheap and every clone observes the same values. Writes notify
/// subscribers of that key on the writing thread, after the value lock is
/// released, and only when the stored value actually changes.
#[derive(Clone)]
pub struct Settings {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.inner.name)
            .field("keys", &self.inner.specs.len())
            .finish()
    }
}

impl Settings {
    /// Create a group seeded with every schema default
    pub fn new(name: impl Into<String>, specs: Vec<SettingSpec>) -> Self {
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.key.clone(), i))
            .collect();
        let values = specs.iter().map(|spec| spec.default.clone()).collect();

        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                specs,
                index,
                values: RwLock::new(values),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Group name (schema path), used in log messages
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Keys in schema order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.specs.iter().map(|spec| spec.key.as_str())
    }

    pub fn spec(&self, key: &str) -> Result<&SettingSpec> {
        let idx = self.index_of(key)?;
        Ok(&self.inner.specs[idx])
    }

    pub fn get(&self, key: &str) -> Result<SettingValue> {
        let idx = self.index_of(key)?;
        Ok(self.inner.values.read()[idx].clone())
    }

    pub fn get_double(&self, key: &str) -> Result<f64> {
        self.get(key)?
            .as_f64()
            .ok_or_else(|| FxError::invalid_setting(key, "not a double"))
    }

    pub fn get_int(&self, key: &str) -> Result<i32> {
        self.get(key)?
            .as_i32()
            .ok_or_else(|| FxError::invalid_setting(key, "not an int"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)?
            .as_bool()
            .ok_or_else(|| FxError::invalid_setting(key, "not a bool"))
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        match self.get(key)? {
            SettingValue::Str(s) => Ok(s),
            _ => Err(FxError::invalid_setting(key, "not a string")),
        }
    }

    /// Nick of an enum setting
    pub fn get_enum_nick(&self, key: &str) -> Result<String> {
        self.get_string(key)
    }

    /// Index of an enum setting within its nick list
    pub fn get_enum(&self, key: &str) -> Result<usize> {
        let spec = self.spec(key)?;
        let nick = self.get_string(key)?;
        enum_index(spec, &nick)
    }

    /// Store `value`, notifying subscribers when it differs from the current one
    pub fn set(&self, key: &str, value: impl Into<SettingValue>) -> Result<()> {
        let idx = self.index_of(key)?;
        let value = self.inner.specs[idx].validate(value.into())?;

        {
            let mut values = self.inner.values.write();
            if values[idx] == value {
                return Ok(());
            }
            values[idx] = value.clone();
        }

        self.emit(key, &value);
        Ok(())
    }

    /// Store an enum setting by index
    pub fn set_enum(&self, key: &str, index: usize) -> Result<()> {
        let nick = match &self.spec(key)?.kind {
            SettingKind::Enum(nicks) => nicks
                .get(index)
                .copied()
                .ok_or_else(|| FxError::invalid_setting(key, format!("no value at {}", index)))?,
            _ => return Err(FxError::invalid_setting(key, "not an enum")),
        };
        self.set(key, nick)
    }

    /// Restore the schema default
    pub fn reset(&self, key: &str) -> Result<()> {
        let default = self.spec(key)?.default.clone();
        self.set(key, default)
    }

    /// Observe writes to `key`; the callback runs until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&str, &SettingValue) + Send + Sync + 'static,
    {
        self.index_of(key)?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push(Subscriber {
            id,
            key: key.to_string(),
            callback: Arc::new(callback),
        });

        Ok(Subscription {
            settings: Arc::downgrade(&self.inner),
            id,
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    fn emit(&self, key: &str, value: &SettingValue) {
        // Callbacks may write other keys or groups, so none of our locks is held.
        let callbacks: Vec<Callback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.key == key)
            .map(|s| s.callback.clone())
            .collect();

        for callback in callbacks {
            callback(key, value);
        }
    }

    fn index_of(&self, key: &str) -> Result<usize> {
        self.inner
            .index
            .get(key)
            .copied()
            .ok_or_else(|| FxError::UnknownSetting {
                key: key.to_string(),
            })
    }
}

pub(crate) fn enum_index(spec: &SettingSpec, nick: &str) -> Result<usize> {
    match &spec.kind {
        SettingKind::Enum(nicks) => nicks
            .iter()
            .position(|n| *n == nick)
            .ok_or_else(|| {
                FxError::invalid_setting(&spec.key, format!("unknown value '{}'", nick))
            }),
        _ => Err(FxError::invalid_setting(&spec.key, "not an enum")),
    }
}

/// Live subscription; unsubscribes on drop
pub struct Subscription {
    settings: Weak<Inner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.settings.upgrade() {
            inner.subscribers.lock().retain(|s| s.id != self.id);
        }
    }
}
