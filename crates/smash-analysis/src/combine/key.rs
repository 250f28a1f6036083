//! Configuration keys that decide which files may be merged.

use crate::utils::config::KEY_FLOAT_DECIMALS;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One configuration value
///
/// Floats are held as fixed-point integers with `KEY_FLOAT_DECIMALS`
/// decimals, so keys compare and hash exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "KeyValueRepr", into = "KeyValueRepr")]
pub enum KeyValue {
    Int(i64),
    Float(i64),
    Str(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum KeyValueRepr {
    Int(i64),
    Float(f64),
    Str(String),
}

fn float_scale() -> f64 {
    10f64.powi(KEY_FLOAT_DECIMALS as i32)
}

impl KeyValue {
    /// Fixed-point float; non-finite or out-of-range values fall back to text
    pub fn float(value: f64) -> Self {
        let scaled = (value * float_scale()).round();
        if scaled.is_finite() && scaled.abs() < i64::MAX as f64 {
            KeyValue::Float(scaled as i64)
        } else {
            KeyValue::Str(value.to_string())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            KeyValue::Int(v) => Some(*v as f64),
            KeyValue::Float(scaled) => Some(*scaled as f64 / float_scale()),
            KeyValue::Str(_) => None,
        }
    }

    /// Parse one textual value: a `.` makes it a float, otherwise an integer,
    /// and anything that does not parse stays a string
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.contains('.') {
            match text.parse::<f64>() {
                Ok(v) if v.is_finite() => KeyValue::float(v),
                _ => KeyValue::Str(text.to_string()),
            }
        } else {
            text.parse::<i64>()
                .map(KeyValue::Int)
                .unwrap_or_else(|_| KeyValue::Str(text.to_string()))
        }
    }

    /// Text used inside labels; floats always carry six decimals
    fn label_text(&self) -> String {
        match self {
            KeyValue::Int(v) => v.to_string(),
            KeyValue::Float(scaled) => format!(
                "{:.*}",
                KEY_FLOAT_DECIMALS as usize,
                *scaled as f64 / float_scale()
            ),
            KeyValue::Str(s) => s.clone(),
        }
    }
}

impl From<KeyValueRepr> for KeyValue {
    fn from(repr: KeyValueRepr) -> Self {
        match repr {
            KeyValueRepr::Int(v) => KeyValue::Int(v),
            KeyValueRepr::Float(v) => KeyValue::float(v),
            KeyValueRepr::Str(s) => KeyValue::Str(s),
        }
    }
}

impl From<KeyValue> for KeyValueRepr {
    fn from(value: KeyValue) -> Self {
        match value {
            KeyValue::Int(v) => KeyValueRepr::Int(v),
            KeyValue::Float(scaled) => KeyValueRepr::Float(scaled as f64 / float_scale()),
            KeyValue::Str(s) => KeyValueRepr::Str(s),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Float(scaled) => write!(f, "{}", *scaled as f64 / float_scale()),
            KeyValue::Str(s) => f.write_str(s),
        }
    }
}

/// Canonical set of `name → value` pairs
///
/// Names are unique and kept sorted, so ordering, equality and hashing
/// follow the canonical form regardless of how the key was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeKey(BTreeMap<String, KeyValue>);

impl MergeKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, returning the value it replaces
    pub fn insert(&mut self, name: impl Into<String>, value: KeyValue) -> Option<KeyValue> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&KeyValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Document label: `name_value_name_value`, names in sorted order
    ///
    /// The empty key labels as `default`.
    pub fn label(&self) -> String {
        if self.0.is_empty() {
            return "default".to_string();
        }

        self.0
            .iter()
            .map(|(name, value)| format!("{}_{}", name, value.label_text()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl FromIterator<(String, KeyValue)> for MergeKey {
    fn from_iter<I: IntoIterator<Item = (String, KeyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for MergeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Parse `name=value,name=value`
///
/// **Public** - used for command-line input tags
///
/// Items without `=` or with an empty name are skipped. A repeated name keeps
/// its last value.
///
/// # Example
/// ```ignore
/// let key = parse_merge_key("energy=7.7,system=AuAu");
/// assert_eq!(key.label(), "energy_7.700000_system_AuAu");
/// ```
pub fn parse_merge_key(text: &str) -> MergeKey {
    let mut key = MergeKey::new();

    for item in text.split(',') {
        let Some((name, value)) = item.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let value = KeyValue::parse(value);
        if let Some(previous) = key.insert(name, value.clone()) {
            warn!(
                "Configuration key '{}' given twice ({} then {}); keeping {}",
                name, previous, value, value
            );
        }
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_typing() {
        assert_eq!(KeyValue::parse("7.7"), KeyValue::Float(7_700_000));
        assert_eq!(KeyValue::parse("200"), KeyValue::Int(200));
        assert_eq!(KeyValue::parse("AuAu"), KeyValue::Str("AuAu".to_string()));
        assert_eq!(KeyValue::parse("v1.0"), KeyValue::Str("v1.0".to_string()));
    }

    #[test]
    fn test_canonical_order() {
        let a = parse_merge_key("system=AuAu,energy=7.7");
        let b = parse_merge_key("energy=7.70,system=AuAu");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "energy=7.7,system=AuAu");
    }

    #[test]
    fn test_skips_and_duplicates() {
        let key = parse_merge_key("energy=7.7,,novalue,=3,energy=11.5");
        assert_eq!(key.len(), 1);
        assert_eq!(key.get("energy"), Some(&KeyValue::float(11.5)));
    }

    #[test]
    fn test_label() {
        let key = parse_merge_key("energy=7.7,b=3,system=AuAu");
        assert_eq!(key.label(), "b_3_energy_7.700000_system_AuAu");
        assert_eq!(MergeKey::new().label(), "default");
    }

    #[test]
    fn test_serde_form() {
        let key = parse_merge_key("energy=7.7,b=3,system=AuAu");
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"b": 3, "energy": 7.7, "system": "AuAu"})
        );

        let back: MergeKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
    }
}
