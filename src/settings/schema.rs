//! Setting kinds, values and validation

use serde_json::{json, Value};

use crate::error::{FxError, Result};

/// A single stored setting value
///
/// Enumerations are stored by nick, the same string that lands in presets.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(String),
}

impl SettingValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Double(v) => Some(*v),
            SettingValue::Int(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            SettingValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// JSON form used by presets
    pub fn to_json(&self) -> Value {
        match self {
            SettingValue::Bool(v) => json!(v),
            SettingValue::Int(v) => json!(v),
            SettingValue::Double(v) => json!(v),
            SettingValue::Str(v) => json!(v),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Double(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Str(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Str(v)
    }
}

/// Value domain of a setting
#[derive(Debug, Clone, PartialEq)]
pub enum SettingKind {
    Bool,
    Int { min: i32, max: i32 },
    Double { min: f64, max: f64 },
    /// Closed set of nicks; the port value of an enum is its index here
    Enum(&'static [&'static str]),
    Str,
}

/// Schema entry: key, domain and default
#[derive(Debug, Clone)]
pub struct SettingSpec {
    pub key: String,
    pub kind: SettingKind,
    pub default: SettingValue,
}

impl SettingSpec {
    pub fn boolean(key: impl Into<String>, default: bool) -> Self {
        Self {
            key: key.into(),
            kind: SettingKind::Bool,
            default: SettingValue::Bool(default),
        }
    }

    pub fn int(key: impl Into<String>, default: i32, min: i32, max: i32) -> Self {
        Self {
            key: key.into(),
            kind: SettingKind::Int { min, max },
            default: SettingValue::Int(default),
        }
    }

    pub fn double(key: impl Into<String>, default: f64, min: f64, max: f64) -> Self {
        Self {
            key: key.into(),
            kind: SettingKind::Double { min, max },
            default: SettingValue::Double(default),
        }
    }

    pub fn enumeration(
        key: impl Into<String>,
        nicks: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            key: key.into(),
            kind: SettingKind::Enum(nicks),
            default: SettingValue::Str(default.to_string()),
        }
    }

    pub fn string(key: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: SettingKind::Str,
            default: SettingValue::Str(default.into()),
        }
    }

    /// Check `value` against this spec, widening ints to doubles where needed
    pub fn validate(&self, value: SettingValue) -> Result<SettingValue> {
        match (&self.kind, value) {
            (SettingKind::Bool, v @ SettingValue::Bool(_)) => Ok(v),
            (SettingKind::Int { min, max }, SettingValue::Int(v)) => {
                if v < *min || v > *max {
                    return Err(FxError::invalid_setting(
                        &self.key,
                        format!("{} outside {}..={}", v, min, max),
                    ));
                }
                Ok(SettingValue::Int(v))
            }
            (
                SettingKind::Double { min, max },
                value @ (SettingValue::Double(_) | SettingValue::Int(_)),
            ) => {
                let v = value.as_f64().unwrap_or_default();
                if !v.is_finite() || v < *min || v > *max {
                    return Err(FxError::invalid_setting(
                        &self.key,
                        format!("{} outside {}..={}", v, min, max),
                    ));
                }
                Ok(SettingValue::Double(v))
            }
            (SettingKind::Enum(nicks), SettingValue::Str(nick)) => {
                if nicks.contains(&nick.as_str()) {
                    Ok(SettingValue::Str(nick))
                } else {
                    Err(FxError::invalid_setting(
                        &self.key,
                        format!("unknown value '{}'", nick),
                    ))
                }
            }
            (SettingKind::Str, v @ SettingValue::Str(_)) => Ok(v),
            (kind, v) => Err(FxError::invalid_setting(
                &self.key,
                format!("expected {:?}, got {:?}", kind, v),
            )),
        }
    }

    /// Decode a preset JSON value according to this spec's kind
    pub fn value_from_json(&self, json: &Value) -> Result<SettingValue> {
        let value = match self.kind {
            SettingKind::Bool => json.as_bool().map(SettingValue::Bool),
            SettingKind::Int { .. } => json
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(SettingValue::Int),
            SettingKind::Double { .. } => json.as_f64().map(SettingValue::Double),
            SettingKind::Enum(_) | SettingKind::Str => {
                json.as_str().map(|s| SettingValue::Str(s.to_string()))
            }
        };

        match value {
            Some(v) => self.validate(v),
            None => Err(FxError::invalid_setting(
                &self.key,
                format!("unexpected JSON value {}", json),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLOPES: &[&str] = &["x1", "x2", "x3", "x4"];

    #[test]
    fn test_double_accepts_int_and_checks_range() {
        let spec = SettingSpec::double("output-gain", 0.0, -36.0, 36.0);
        assert_eq!(
            spec.validate(SettingValue::Int(3)).unwrap(),
            SettingValue::Double(3.0)
        );
        assert!(spec.validate(SettingValue::Double(40.0)).is_err());
        assert!(spec.validate(SettingValue::Double(f64::NAN)).is_err());
    }

    #[test]
    fn test_enum_rejects_unknown_nick() {
        let spec = SettingSpec::enumeration("band0-slope", SLOPES, "x1");
        assert!(spec.validate("x3".into()).is_ok());
        assert!(spec.validate("x9".into()).is_err());
        assert!(spec.validate(SettingValue::Int(1)).is_err());
    }

    #[test]
    fn test_value_from_json() {
        let spec = SettingSpec::int("iterations", 10, 1, 20);
        assert_eq!(
            spec.value_from_json(&json!(5)).unwrap(),
            SettingValue::Int(5)
        );
        assert!(spec.value_from_json(&json!("5")).is_err());
        assert!(spec.value_from_json(&json!(2.5)).is_err());
    }
}
