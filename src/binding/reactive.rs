//! Reactive view: object → form propagation through an explicit accessor API.
//!
//! A [`BoundValue`] addresses one level of the value snapshot. Reading a
//! fieldset key yields a nested [`BoundValue`] over the same session, reading
//! a field yields its [`FieldValue`]. Writing an existing field updates the
//! snapshot, pushes the value into the bound element and, with
//! `auto_notify`, dispatches the change event immediately (no debounce).
//!
//! Writes never add keys: an unknown key is logged and rejected with
//! [`BindError::UnknownField`], leaving snapshot and form untouched.

use super::collector::InputNode;
use super::error::{display_path, BindError};
use super::shared::BindingCore;
use crate::dom::{Document, NodeId};
use crate::value::{FieldValue, SnapshotEntry, ValueSnapshot};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Result of reading a key through a [`BoundValue`].
#[derive(Debug, Clone)]
pub enum Bound {
    Value(FieldValue),
    Group(BoundValue),
}

impl Bound {
    pub fn into_value(self) -> Option<FieldValue> {
        match self {
            Bound::Value(v) => Some(v),
            Bound::Group(_) => None,
        }
    }

    pub fn into_group(self) -> Option<BoundValue> {
        match self {
            Bound::Group(g) => Some(g),
            Bound::Value(_) => None,
        }
    }
}

/// Live view over (a nested level of) a session's value snapshot.
#[derive(Clone)]
pub struct BoundValue {
    core: Arc<BindingCore>,
    path: Vec<String>,
    writable: bool,
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundValue")
            .field("event_name", &self.core.event_name)
            .field("path", &self.path)
            .field("writable", &self.writable)
            .finish()
    }
}

impl BoundValue {
    pub(crate) fn new(core: Arc<BindingCore>, writable: bool) -> Self {
        Self {
            core,
            path: Vec::new(),
            writable,
        }
    }

    /// Name of the change event dispatched for this form.
    pub fn event_name(&self) -> &str {
        &self.core.event_name
    }

    /// Group names leading from the form to this view.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_released(&self) -> bool {
        self.core.is_released()
    }

    /// Copy of the snapshot at this level.
    pub fn snapshot(&self) -> ValueSnapshot {
        let values = self.core.values.lock();
        values.descend(&self.path).cloned().unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<String> {
        let values = self.core.values.lock();
        values
            .descend(&self.path)
            .map(|level| level.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let values = self.core.values.lock();
        values
            .descend(&self.path)
            .is_some_and(|level| level.contains_key(key))
    }

    pub fn get(&self, key: &str) -> Option<Bound> {
        let values = self.core.values.lock();
        match values.descend(&self.path)?.get(key)? {
            SnapshotEntry::Value(value) => Some(Bound::Value(value.clone())),
            SnapshotEntry::Group(_) => Some(Bound::Group(self.child(key))),
        }
    }

    pub fn value(&self, key: &str) -> Option<FieldValue> {
        self.get(key).and_then(Bound::into_value)
    }

    pub fn group(&self, key: &str) -> Option<BoundValue> {
        self.get(key).and_then(Bound::into_group)
    }

    /// Reads a dotted path such as `"address.city"`.
    pub fn get_path(&self, path: &str) -> Option<Bound> {
        let (parents, key) = split_path(path);
        let mut view = self.clone();
        for name in parents {
            view = view.group(name)?;
        }
        view.get(key)
    }

    /// Writes a field value and pushes it into the form.
    pub fn set(&self, key: &str, value: impl Into<FieldValue>) -> Result<(), BindError> {
        let value = value.into();
        if self.core.is_released() {
            return Err(BindError::SessionReleased(self.core.event_name.clone()));
        }
        if !self.writable {
            warn!("Rejected write to \"{}\": view is read-only", key);
            return Err(BindError::ReadOnly(self.core.event_name.clone()));
        }

        let node = {
            let mut values = self.core.values.lock();
            let level = values.descend_mut(&self.path);
            match level.as_ref().and_then(|level| level.get(key)) {
                None => {
                    let path = display_path(&self.path);
                    error!("No key \"{}\" in object at {}: {:?}", key, path, level);
                    return Err(BindError::UnknownField {
                        key: key.to_string(),
                        path,
                    });
                }
                Some(SnapshotEntry::Group(_)) => {
                    let path = display_path(&self.path);
                    error!("Key \"{}\" at {} is a fieldset, refusing to overwrite", key, path);
                    return Err(BindError::NotAField {
                        key: key.to_string(),
                        path,
                    });
                }
                Some(SnapshotEntry::Value(_)) => {}
            }

            let node = match self
                .core
                .inputs
                .descend(&self.path)
                .and_then(|tree| tree.get(key))
            {
                Some(InputNode::Field(node)) => *node,
                _ => {
                    return Err(BindError::UnknownField {
                        key: key.to_string(),
                        path: display_path(&self.path),
                    })
                }
            };
            if let Some(level) = level {
                level.insert(key, value.clone());
            }
            node
        };

        update_input(&self.core.document, node, &value);
        debug!("Wrote {:?} to \"{}\" ({})", value, key, node);

        if self.core.auto_notify {
            self.core.notify();
        }
        Ok(())
    }

    /// Writes through a dotted path such as `"address.city"`.
    pub fn set_path(&self, path: &str, value: impl Into<FieldValue>) -> Result<(), BindError> {
        let (parents, key) = split_path(path);
        let mut view = self.clone();
        for name in parents {
            view = match view.get(name) {
                Some(Bound::Group(group)) => group,
                Some(Bound::Value(_)) => {
                    error!("Key \"{}\" at {} is a field, not a fieldset", name, display_path(&view.path));
                    return Err(BindError::UnknownField {
                        key: name.to_string(),
                        path: display_path(&view.path),
                    });
                }
                None => {
                    error!("No key \"{}\" in object at {}", name, display_path(&view.path));
                    return Err(BindError::UnknownField {
                        key: name.to_string(),
                        path: display_path(&view.path),
                    });
                }
            };
        }
        view.set(key, value)
    }

    /// Dispatches the change event with the current snapshot, regardless of
    /// `auto_notify`.
    pub fn notify(&self) -> Result<usize, BindError> {
        if self.core.is_released() {
            return Err(BindError::SessionReleased(self.core.event_name.clone()));
        }
        Ok(self.core.notify())
    }

    fn child(&self, key: &str) -> BoundValue {
        let mut path = self.path.clone();
        path.push(key.to_string());
        BoundValue {
            core: Arc::clone(&self.core),
            path,
            writable: self.writable,
        }
    }
}

fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let key = parts.pop().unwrap_or_default();
    (parts, key)
}

/// Pushes a value into a control: checkboxes take its truthiness, everything
/// else its display text.
pub fn update_input(document: &Document, node: NodeId, value: &FieldValue) {
    let result = document.with_element_mut(node, |el| {
        if el.is_checkbox() {
            el.set_checked(value.is_truthy());
        } else {
            el.set_value(value.to_string());
        }
    });
    if let Err(e) = result {
        warn!("Could not write value back to {}: {}", node, e);
    }
}
