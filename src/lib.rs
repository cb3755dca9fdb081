//! Two-way binding between HTML-style forms and nested value objects.
//!
//! A [`Binder`] attaches to a form in a [`Document`], builds a value object
//! mirroring the form's fields and fieldsets, and keeps both sides in sync:
//! edits in the form are debounced and announced as a `"<form>-change"`
//! custom event, writes through a [`BoundValue`] are pushed straight into the
//! matching input.

pub mod binding;
pub mod config;
pub mod dom;
pub mod value;

pub use binding::{formul8, BindError, Binder, BindingSession, BoundValue, FormTarget};
pub use config::{BindOptions, ConfigError, Direction, Preset};
pub use dom::{Document, Element, NodeId, Subscription};
pub use value::{FieldValue, SnapshotEntry, ValueSnapshot};
