//! Error types for binding sessions

use crate::config::ConfigError;
use crate::dom::NodeId;
use thiserror::Error;

/// Errors reported by [`Binder`](super::Binder) and [`BoundValue`](super::BoundValue)
#[derive(Debug, Error)]
pub enum BindError {
    /// The identifier does not resolve to any element
    #[error("No element with id \"{0}\" in document")]
    FormNotFound(String),

    /// The target exists but is not a form element
    #[error("Element {0} is not a form")]
    NotAForm(NodeId),

    /// The options failed validation
    #[error("Invalid bind options: {0}")]
    Config(#[from] ConfigError),

    /// Form → object propagation needs a tokio runtime for its debounce task
    #[error("Form to object binding requires a running tokio runtime")]
    NoRuntime,

    /// Form → object propagation only coalesces bursts on a current-thread runtime
    #[error("Form to object binding requires a current-thread tokio runtime")]
    MultiThreadRuntime,

    /// Write to a key the snapshot does not have
    #[error("No key \"{key}\" in object at {path}")]
    UnknownField { key: String, path: String },

    /// Write to a key that names a fieldset group
    #[error("Key \"{key}\" at {path} is a fieldset, not a field")]
    NotAField { key: String, path: String },

    /// Write through a view whose session does not propagate to the form
    #[error("Values of \"{0}\" are read-only: TO_FORM direction is disabled")]
    ReadOnly(String),

    /// Use of a view after its session was torn down
    #[error("Binding session \"{0}\" has been torn down")]
    SessionReleased(String),
}

/// Display form of a group path: `<root>` or `address.billing`.
pub(crate) fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}
