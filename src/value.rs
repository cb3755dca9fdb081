//! Typed values mirrored out of a form.
//!
//! A [`ValueSnapshot`] has the same shape as the input tree it was gathered
//! from: every field becomes a [`FieldValue`], every fieldset becomes a nested
//! snapshot. Both serialize to a plain JSON-like object.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field value: checkbox state, parsed number, or raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used when a value is written into a checkbox.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    /// Renders the value the way a text field displays it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) if n.is_nan() => f.write_str("NaN"),
            FieldValue::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // -0 displays as 0
            FieldValue::Number(n) if *n == 0.0 => f.write_str("0"),
            FieldValue::Number(n) if n.abs() >= 1e21 || n.abs() < 1e-6 => {
                let text = format!("{:e}", n);
                match text.split_once('e') {
                    Some((mantissa, exp)) if !exp.starts_with('-') => {
                        write!(f, "{}e+{}", mantissa, exp)
                    }
                    _ => f.write_str(&text),
                }
            }
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

/// Entry of a snapshot: either a field value or a nested fieldset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotEntry {
    Value(FieldValue),
    Group(ValueSnapshot),
}

impl SnapshotEntry {
    pub fn as_value(&self) -> Option<&FieldValue> {
        match self {
            SnapshotEntry::Value(v) => Some(v),
            SnapshotEntry::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&ValueSnapshot> {
        match self {
            SnapshotEntry::Group(g) => Some(g),
            SnapshotEntry::Value(_) => None,
        }
    }
}

impl From<FieldValue> for SnapshotEntry {
    fn from(value: FieldValue) -> Self {
        SnapshotEntry::Value(value)
    }
}

impl From<ValueSnapshot> for SnapshotEntry {
    fn from(group: ValueSnapshot) -> Self {
        SnapshotEntry::Group(group)
    }
}

/// Name → value mapping mirroring a form, in collection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueSnapshot {
    entries: IndexMap<String, SnapshotEntry>,
}

impl ValueSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&SnapshotEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut SnapshotEntry> {
        self.entries.get_mut(key)
    }

    /// Field value under `key`, `None` for groups and missing keys.
    pub fn value(&self, key: &str) -> Option<&FieldValue> {
        self.get(key).and_then(SnapshotEntry::as_value)
    }

    /// Nested fieldset snapshot under `key`.
    pub fn group(&self, key: &str) -> Option<&ValueSnapshot> {
        self.get(key).and_then(SnapshotEntry::as_group)
    }

    /// Walks a sequence of group names, starting at `self`.
    pub fn descend<S: AsRef<str>>(&self, path: &[S]) -> Option<&ValueSnapshot> {
        path.iter()
            .try_fold(self, |snapshot, key| snapshot.group(key.as_ref()))
    }

    pub(crate) fn descend_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut ValueSnapshot> {
        let mut current = self;
        for key in path {
            current = match current.entries.get_mut(key.as_ref()) {
                Some(SnapshotEntry::Group(group)) => group,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Looks up a dotted path such as `"address.city"`.
    pub fn get_path(&self, path: &str) -> Option<&SnapshotEntry> {
        let keys: Vec<&str> = path.split('.').collect();
        let (last, parents) = keys.split_last()?;
        self.descend(parents)?.get(last)
    }

    /// Inserts or replaces an entry, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<SnapshotEntry>) {
        self.entries.insert(key.into(), entry.into());
    }

    /// Number of field values, counting into nested groups.
    pub fn field_count(&self) -> usize {
        self.entries
            .values()
            .map(|entry| match entry {
                SnapshotEntry::Value(_) => 1,
                SnapshotEntry::Group(group) => group.field_count(),
            })
            .sum()
    }
}

impl FromIterator<(String, SnapshotEntry)> for ValueSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, SnapshotEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
