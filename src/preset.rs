//! Preset documents
//!
//! A preset is one JSON document with an `input` and an `output` section.
//! Each effect stores its keys one-to-one under its own name:
//!
//! ```json
//! { "output": { "pitch": { "semitones": 3, ... },
//!               "equalizer": { "mode": "IIR", ..., "left": { ... }, "right": { ... } } } }
//! ```
//!
//! Enumerations are stored by nick. Loading leaves keys missing from the
//! document untouched.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::effects::Effect;
use crate::error::{FxError, Result};
use crate::settings::Settings;

/// Top-level preset section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Input,
    Output,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Input => "input",
            Section::Output => "output",
        }
    }
}

impl std::str::FromStr for Section {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "input" => Ok(Section::Input),
            "output" => Ok(Section::Output),
            other => Err(FxError::Preset {
                reason: format!("unknown section '{}'", other),
            }),
        }
    }
}

/// Every key of `settings` as a JSON object, in schema order
pub fn settings_to_json(settings: &Settings) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for key in settings.keys() {
        object.insert(key.to_string(), settings.get(key)?.to_json());
    }
    Ok(object)
}

/// Apply the keys of `object` that belong to `settings`
///
/// Returns how many keys were applied. Values of the wrong type or out of
/// range fail the whole load at the first offending key.
pub fn settings_from_json(object: &Map<String, Value>, settings: &Settings) -> Result<usize> {
    let mut applied = 0;
    let keys: Vec<String> = settings.keys().map(str::to_string).collect();

    for key in keys {
        let Some(json) = object.get(&key) else {
            continue;
        };
        let value = settings.spec(&key)?.value_from_json(json)?;
        settings.set(&key, value)?;
        applied += 1;
    }

    Ok(applied)
}

fn object_mut<'a>(value: &'a mut Value, name: &str) -> Result<&'a mut Map<String, Value>> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut().ok_or_else(|| FxError::Preset {
        reason: format!("'{}' is not an object", name),
    })
}

fn effect_entry<'a>(
    doc: &'a mut Value,
    section: Section,
    effect: &str,
) -> Result<&'a mut Map<String, Value>> {
    let root = object_mut(doc, "preset")?;
    let section_value = root
        .entry(section.as_str())
        .or_insert_with(|| Value::Object(Map::new()));
    let section_map = object_mut(section_value, section.as_str())?;
    let effect_value = section_map
        .entry(effect)
        .or_insert_with(|| Value::Object(Map::new()));
    object_mut(effect_value, effect)
}

fn find_entry<'a>(
    doc: &'a Value,
    section: Section,
    effect: &str,
) -> Option<&'a Map<String, Value>> {
    doc.get(section.as_str())?.get(effect)?.as_object()
}

/// Store one settings group under `doc[section][effect]`
pub fn save(doc: &mut Value, section: Section, effect: &str, settings: &Settings) -> Result<()> {
    let entry = effect_entry(doc, section, effect)?;
    entry.extend(settings_to_json(settings)?);
    Ok(())
}

/// Restore one settings group from `doc[section][effect]`
///
/// A document without that effect leaves the settings as they are.
pub fn load(doc: &Value, section: Section, effect: &str, settings: &Settings) -> Result<()> {
    match find_entry(doc, section, effect) {
        Some(entry) => {
            let applied = settings_from_json(entry, settings)?;
            log::debug!("{}: loaded {} keys from the {} preset", effect, applied, section.as_str());
        }
        None => log::debug!("no {} entry in the {} preset", effect, section.as_str()),
    }
    Ok(())
}

/// Store an effect's main group and its channel groups
pub fn save_effect(doc: &mut Value, section: Section, effect: &dyn Effect) -> Result<()> {
    save(doc, section, effect.name(), effect.settings())?;

    let entry = effect_entry(doc, section, effect.name())?;
    for (group, settings) in effect.channel_settings() {
        entry.insert(group.to_string(), Value::Object(settings_to_json(settings)?));
    }
    Ok(())
}

pub fn load_effect(doc: &Value, section: Section, effect: &dyn Effect) -> Result<()> {
    load(doc, section, effect.name(), effect.settings())?;

    let Some(entry) = find_entry(doc, section, effect.name()) else {
        return Ok(());
    };
    for (group, settings) in effect.channel_settings() {
        match entry.get(group) {
            Some(Value::Object(object)) => {
                settings_from_json(object, settings)?;
            }
            Some(_) => {
                return Err(FxError::Preset {
                    reason: format!("{}.{} is not an object", effect.name(), group),
                })
            }
            None => {}
        }
    }
    Ok(())
}

pub fn read_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&text)?;
    if !doc.is_object() {
        return Err(FxError::Preset {
            reason: format!("{}: top level is not an object", path.display()),
        });
    }
    Ok(doc)
}

pub fn write_file(path: &Path, doc: &Value) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(doc)?)?;
    Ok(())
}
