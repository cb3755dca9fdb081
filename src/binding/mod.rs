//! # Form binding
//!
//! Binds a form of a [`Document`] to a nested value object and keeps both in
//! sync:
//!
//! ```text
//!               ┌──────────── FROM_FORM ─────────────┐
//!  <form> ──► collector ──► InputTree      ChangeNotifier ──► "<id>-change"
//!     ▲                        │            (debounce task)
//!     │                        ▼
//!     └──── TO_FORM ◄──── BoundValue ◄──── ValueSnapshot
//! ```
//!
//! [`Binder::bind`] resolves the form, collects its inputs, reads the initial
//! snapshot and returns a [`BindingSession`]. The session hands out
//! [`BoundValue`] views; writes through a view land in the form immediately,
//! edits in the form reach listeners of the change event after the debounce
//! window.

mod shared;

pub mod collector;
pub mod error;
pub mod extractor;
pub mod notifier;
pub mod reactive;
pub mod session;

pub use collector::{gather_inputs, legend_label, FallbackIds, InputNode, InputTree};
pub use error::BindError;
pub use extractor::{gather_values, parse_number, read_field};
pub use reactive::{update_input, Bound, BoundValue};
pub use session::{BindingSession, Bound as SessionBound, Released, SessionState};

use crate::config::{BindOptions, Direction};
use crate::dom::{Document, ElementKind, NodeId};
use self::shared::BindingCore;
use std::sync::Arc;
use tracing::{error, info};

/// What to bind: an element handle or the `id` of a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormTarget {
    Node(NodeId),
    Id(String),
}

impl From<NodeId> for FormTarget {
    fn from(node: NodeId) -> Self {
        FormTarget::Node(node)
    }
}

impl From<&str> for FormTarget {
    fn from(id: &str) -> Self {
        FormTarget::Id(id.to_string())
    }
}

impl From<String> for FormTarget {
    fn from(id: String) -> Self {
        FormTarget::Id(id)
    }
}

/// Creates binding sessions on one document.
///
/// All sessions of a binder share its fallback identifier counter, so
/// synthesized names never repeat within a binder.
#[derive(Debug, Clone)]
pub struct Binder {
    document: Document,
    fallback_ids: Arc<FallbackIds>,
}

impl Binder {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            fallback_ids: Arc::new(FallbackIds::default()),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn fallback_ids(&self) -> &FallbackIds {
        &self.fallback_ids
    }

    /// Resolves `target` to a form element.
    pub fn resolve(&self, target: &FormTarget) -> Result<NodeId, BindError> {
        let node = match target {
            FormTarget::Node(node) => {
                if !self.document.contains(*node) {
                    return Err(BindError::FormNotFound(node.to_string()));
                }
                *node
            }
            FormTarget::Id(id) => self
                .document
                .get_element_by_id(id)
                .ok_or_else(|| BindError::FormNotFound(id.clone()))?,
        };

        match self.document.kind(node) {
            Some(ElementKind::Form) => Ok(node),
            _ => Err(BindError::NotAForm(node)),
        }
    }

    /// Binds the form identified by `target`. `None` options use the
    /// [`Formul8`](crate::config::Preset::Formul8) preset.
    pub fn bind(
        &self,
        target: impl Into<FormTarget>,
        options: Option<BindOptions>,
    ) -> Result<BindingSession<SessionBound>, BindError> {
        let options = options.unwrap_or_default();
        options.validate()?;

        if options.direction.contains(Direction::FROM_FORM) {
            notifier::current_runtime()?;
        }

        let form = self.resolve(&target.into())?;
        let form_name = self
            .document
            .name(form)
            .or_else(|| self.document.id(form))
            .unwrap_or_else(|| self.fallback_ids.assign(&self.document, form));
        let event_name = format!("{form_name}-change");

        let inputs = gather_inputs(&self.document, form, &self.fallback_ids);
        info!(
            "Collected {} field(s) in {} top-level entries for \"{}\"",
            inputs.field_count(),
            inputs.len(),
            form_name
        );

        let core = Arc::new(BindingCore::new(
            self.document.clone(),
            event_name,
            inputs,
            options.auto_notify,
        ));
        BindingSession::start(core, form, options)
    }
}

/// Setup call returning the `(value view, event name)` pair, or `(None, None)`
/// when the form cannot be bound. The session stays attached for the rest of
/// the document's life.
pub fn formul8(
    binder: &Binder,
    target: impl Into<FormTarget>,
    options: Option<BindOptions>,
) -> (Option<BoundValue>, Option<String>) {
    match binder.bind(target, options) {
        Ok(session) => {
            let (values, event_name) = session.into_parts();
            (Some(values), Some(event_name))
        }
        Err(e) => {
            error!("formul8: {}", e);
            (None, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::dom::Element;
    use crate::value::FieldValue;
    use pretty_assertions::assert_eq;

    fn login_document() -> (Document, NodeId) {
        let doc = Document::new();
        let form = doc
            .append(doc.root(), Element::form().with_id("login"))
            .unwrap();
        doc.append(form, Element::input("text").with_name("user"))
            .unwrap();
        doc.append(form, Element::input("checkbox").with_name("remember"))
            .unwrap();
        (doc, form)
    }

    fn to_form_only() -> Option<BindOptions> {
        Some(BindOptions::default().with_direction(Direction::TO_FORM))
    }

    #[test]
    fn resolves_form_by_id_and_handle() {
        let (doc, form) = login_document();
        let binder = Binder::new(doc);
        assert_eq!(binder.resolve(&"login".into()).unwrap(), form);
        assert_eq!(binder.resolve(&form.into()).unwrap(), form);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (doc, _) = login_document();
        let binder = Binder::new(doc.clone());
        let err = binder.bind("missing", to_form_only()).unwrap_err();
        assert!(matches!(err, BindError::FormNotFound(ref id) if id == "missing"));
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn non_form_element_is_rejected() {
        let (doc, form) = login_document();
        let div = doc
            .append(form, Element::container("div").with_id("panel"))
            .unwrap();
        let binder = Binder::new(doc);
        let err = binder.bind("panel", to_form_only()).unwrap_err();
        assert!(matches!(err, BindError::NotAForm(node) if node == div));
    }

    #[test]
    fn from_form_outside_runtime_fails() {
        let (doc, _) = login_document();
        let binder = Binder::new(doc.clone());
        let err = binder.bind("login", None).unwrap_err();
        assert!(matches!(err, BindError::NoRuntime));
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn invalid_options_are_rejected_before_resolution() {
        let (doc, _) = login_document();
        let binder = Binder::new(doc);
        let options = BindOptions::default().with_direction(Direction::empty());
        let err = binder.bind("missing", Some(options)).unwrap_err();
        assert!(matches!(err, BindError::Config(_)));
    }

    #[test]
    fn name_wins_over_id_for_event_name() {
        let (doc, form) = login_document();
        doc.set_name(form, "signin").unwrap();
        let binder = Binder::new(doc);
        let session = binder.bind("login", to_form_only()).unwrap();
        assert_eq!(session.event_name(), "signin-change");
    }

    #[test]
    fn anonymous_form_gets_fallback_name() {
        let doc = Document::new();
        let form = doc.append(doc.root(), Element::form()).unwrap();
        doc.append(form, Element::input("text")).unwrap();
        let binder = Binder::new(doc.clone());

        let session = binder.bind(form, to_form_only()).unwrap();
        assert_eq!(session.event_name(), "formul8_0-change");
        assert_eq!(doc.name(form).as_deref(), Some("formul8_0"));
        assert_eq!(session.snapshot().keys().collect::<Vec<_>>(), vec!["formul8_1"]);
        assert_eq!(binder.fallback_ids().issued(), 2);
    }

    #[test]
    fn to_form_only_attaches_no_listeners() {
        let (doc, _) = login_document();
        let binder = Binder::new(doc.clone());
        let session = binder.bind("login", to_form_only()).unwrap();
        assert_eq!(session.listener_count(), 0);
        assert_eq!(doc.listener_count(), 0);

        session.values().set("user", "bob").unwrap();
        let user = doc.get_element_by_id("login").map(|form| doc.children(form)[0]);
        assert_eq!(doc.value(user.unwrap()).as_deref(), Some("bob"));
    }

    #[test]
    fn formul8_pair_on_failure_is_none_none() {
        let (doc, _) = login_document();
        let binder = Binder::new(doc);
        let (values, event_name) = formul8(&binder, "missing", to_form_only());
        assert!(values.is_none());
        assert!(event_name.is_none());
    }

    #[test]
    fn formul8_pair_on_success() {
        let (doc, _) = login_document();
        let binder = Binder::new(doc);
        let (values, event_name) = formul8(&binder, "login", to_form_only());
        let values = values.unwrap();
        assert_eq!(event_name.as_deref(), Some("login-change"));
        assert_eq!(values.value("user"), Some(FieldValue::from("")));
        assert_eq!(values.value("remember"), Some(FieldValue::Bool(false)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn multi_thread_runtime_is_rejected_for_form_events() {
        let (doc, _) = login_document();
        let binder = Binder::new(doc.clone());
        let err = binder.bind("login", None).unwrap_err();
        assert!(matches!(err, BindError::MultiThreadRuntime));
        assert_eq!(doc.listener_count(), 0);

        // object → form needs no debounce task
        let session = binder.bind("login", to_form_only()).unwrap();
        assert_eq!(session.listener_count(), 0);
    }

    #[tokio::test]
    async fn form_factor_preset_is_one_way() {
        let (doc, _) = login_document();
        let binder = Binder::new(doc.clone());
        let session = binder.bind("login", Some(Preset::FormFactor.options())).unwrap();

        assert_eq!(session.listener_count(), 4);
        let err = session.values().set("user", "bob").unwrap_err();
        assert!(matches!(err, BindError::ReadOnly(_)));
        session.teardown();
        assert_eq!(doc.listener_count(), 0);
    }
}
