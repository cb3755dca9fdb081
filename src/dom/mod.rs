//! # In-memory document
//!
//! A small arena-backed DOM with just enough surface for form binding: an
//! element tree, the live `value`/`checked` state of controls, bubbling DOM
//! events and document-level custom events.
//!
//! ```text
//! Document ─┬─ RwLock<Dom>              (nodes, addressed by NodeId)
//!           └─ Mutex<ListenerRegistry>  (element + custom listeners)
//! ```
//!
//! [`Document`] is a cheap `Arc` handle; clones share the same tree. Listener
//! callbacks are invoked after all locks are released, so a callback may read
//! or mutate the document it was fired from.

pub mod element;
pub mod event;

pub use element::{Element, ElementKind};
pub use event::{CustomEvent, DomEvent, ListenerId};

use crate::value::ValueSnapshot;
use chrono::Local;
use event::ListenerRegistry;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

/// Index of a node inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} is the document root, not an element")]
    NotAnElement(NodeId),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    // None only for the document root
    element: Option<Element>,
}

#[derive(Debug)]
struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                element: None,
            }],
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).and_then(|n| n.element.as_ref())
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
        self.nodes
            .get_mut(id.0)
            .ok_or(DomError::UnknownNode(id))?
            .element
            .as_mut()
            .ok_or(DomError::NotAnElement(id))
    }

    /// Pre-order traversal below `from`.
    fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.node(from) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.node(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }
}

struct DocumentInner {
    dom: RwLock<Dom>,
    listeners: Mutex<ListenerRegistry>,
}

/// Shared handle to an in-memory document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.inner.dom.read().nodes.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                dom: RwLock::new(Dom::new()),
                listeners: Mutex::new(ListenerRegistry::default()),
            }),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends `element` as the last child of `parent`.
    pub fn append(&self, parent: NodeId, element: Element) -> Result<NodeId, DomError> {
        let mut dom = self.inner.dom.write();
        if dom.node(parent).is_none() {
            return Err(DomError::UnknownNode(parent));
        }
        let id = NodeId(dom.nodes.len());
        dom.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            element: Some(element),
        });
        dom.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.dom.read().node(node).is_some()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.dom.read().node(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .dom
            .read()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Copy of the element at `node`.
    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.inner.dom.read().element(node).cloned()
    }

    pub fn with_element<R>(&self, node: NodeId, f: impl FnOnce(&Element) -> R) -> Option<R> {
        self.inner.dom.read().element(node).map(f)
    }

    pub fn with_element_mut<R>(
        &self,
        node: NodeId,
        f: impl FnOnce(&mut Element) -> R,
    ) -> Result<R, DomError> {
        let mut dom = self.inner.dom.write();
        dom.element_mut(node).map(f)
    }

    pub fn kind(&self, node: NodeId) -> Option<ElementKind> {
        self.with_element(node, |el| el.kind().clone())
    }

    /// First element in document order whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let dom = self.inner.dom.read();
        dom.descendants(NodeId(0))
            .into_iter()
            .find(|&n| dom.element(n).and_then(Element::id) == Some(id))
    }

    pub fn name(&self, node: NodeId) -> Option<String> {
        self.with_element(node, |el| el.name().map(str::to_string))
            .flatten()
    }

    pub fn id(&self, node: NodeId) -> Option<String> {
        self.with_element(node, |el| el.id().map(str::to_string))
            .flatten()
    }

    pub fn set_name(&self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.with_element_mut(node, |el| el.set_name(name))
    }

    pub fn value(&self, node: NodeId) -> Option<String> {
        self.with_element(node, |el| el.value().to_string())
    }

    pub fn set_value(&self, node: NodeId, value: impl Into<String>) -> Result<(), DomError> {
        let value = value.into();
        self.with_element_mut(node, |el| el.set_value(value))
    }

    pub fn checked(&self, node: NodeId) -> Option<bool> {
        self.with_element(node, Element::checked)
    }

    pub fn set_checked(&self, node: NodeId, checked: bool) -> Result<(), DomError> {
        self.with_element_mut(node, |el| el.set_checked(checked))
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.with_element(node, |el| el.text().to_string())
    }

    pub fn add_event_listener(
        &self,
        node: NodeId,
        event_type: &str,
        callback: impl Fn(&DomEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self
            .inner
            .listeners
            .lock()
            .add_dom(node, event_type, Arc::new(callback));
        debug!("Registered {} for \"{}\" on {}", id, event_type, node);
        id
    }

    /// Returns whether a listener with this id was registered.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.lock().remove(id)
    }

    /// Number of registered element and custom listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Fires `event_type` at `target`, bubbling through every ancestor.
    /// Returns the number of callbacks invoked.
    pub fn dispatch_event(&self, target: NodeId, event_type: &str) -> usize {
        let path: Vec<NodeId> = {
            let dom = self.inner.dom.read();
            std::iter::successors(dom.node(target).map(|_| target), |&n| {
                dom.node(n).and_then(|node| node.parent)
            })
            .collect()
        };

        let mut invoked = 0;
        for current_target in path {
            let callbacks = self
                .inner
                .listeners
                .lock()
                .dom_callbacks(current_target, event_type);
            let event = DomEvent {
                event_type: event_type.to_string(),
                target,
                current_target,
            };
            for callback in callbacks {
                callback(&event);
                invoked += 1;
            }
        }
        invoked
    }

    pub fn add_custom_listener(
        &self,
        name: &str,
        callback: impl Fn(&CustomEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner
            .listeners
            .lock()
            .add_custom(name, Arc::new(callback))
    }

    /// Receives every custom event called `name` until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self, name: &str) -> Subscription {
        let (tx, receiver) = mpsc::unbounded_channel();
        let id = self.add_custom_listener(name, move |event| {
            // the subscription unregisters itself before its receiver goes away
            let _ = tx.send(event.clone());
        });
        Subscription {
            document: self.clone(),
            id,
            receiver,
        }
    }

    /// Dispatches a custom event on the document. Returns the number of
    /// callbacks invoked.
    pub fn dispatch_custom(&self, name: &str, detail: ValueSnapshot) -> usize {
        let callbacks = self.inner.listeners.lock().custom_callbacks(name);
        let event = CustomEvent {
            name: name.to_string(),
            detail,
            timestamp: Local::now(),
        };
        debug!(
            "Dispatching \"{}\" to {} listener(s) at {}",
            name,
            callbacks.len(),
            event.timestamp.format("%H:%M:%S.%3f")
        );
        for callback in &callbacks {
            callback(&event);
        }
        callbacks.len()
    }

    /// Simulates typing into a control: sets the value, then fires `keydown`
    /// and `change`.
    pub fn user_input(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.set_value(node, text)?;
        self.dispatch_event(node, "keydown");
        self.dispatch_event(node, "change");
        Ok(())
    }

    /// Simulates clicking a checkbox: flips `checked`, then fires `change`.
    pub fn toggle(&self, node: NodeId) -> Result<bool, DomError> {
        let checked = self.with_element_mut(node, |el| {
            let next = !el.checked();
            el.set_checked(next);
            next
        })?;
        self.dispatch_event(node, "change");
        Ok(checked)
    }
}

/// Channel end of [`Document::subscribe`]. Dropping it removes the listener.
#[derive(Debug)]
pub struct Subscription {
    document: Document,
    id: ListenerId,
    receiver: mpsc::UnboundedReceiver<CustomEvent>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Waits for the next event. Never returns `None` while subscribed.
    pub async fn recv(&mut self) -> Option<CustomEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<CustomEvent, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.document.remove_event_listener(self.id) {
            debug!("Unsubscribed {}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> (Document, NodeId, NodeId) {
        let doc = Document::new();
        let form = doc.append(doc.root(), Element::form().with_id("login")).unwrap();
        let wrapper = doc.append(form, Element::container("div")).unwrap();
        let input = doc
            .append(wrapper, Element::input("text").with_name("user"))
            .unwrap();
        (doc, form, input)
    }

    #[test]
    fn append_to_unknown_parent_fails() {
        let doc = Document::new();
        let err = doc.append(NodeId(7), Element::form()).unwrap_err();
        assert_eq!(err, DomError::UnknownNode(NodeId(7)));
    }

    #[test]
    fn lookup_by_id_and_tree_links() {
        let (doc, form, input) = sample();
        assert_eq!(doc.get_element_by_id("login"), Some(form));
        assert_eq!(doc.get_element_by_id("nope"), None);
        assert_eq!(doc.parent(form), Some(doc.root()));
        assert_eq!(doc.kind(form), Some(ElementKind::Form));
        assert_eq!(doc.name(input).as_deref(), Some("user"));
    }

    #[test]
    fn root_is_not_an_element() {
        let doc = Document::new();
        assert_eq!(
            doc.set_value(doc.root(), "x"),
            Err(DomError::NotAnElement(doc.root()))
        );
    }

    #[test]
    fn events_bubble_to_ancestors() {
        let (doc, form, input) = sample();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        doc.add_event_listener(form, "change", move |event| {
            assert_eq!(event.current_target, form);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(doc.dispatch_event(input, "change"), 1);
        assert_eq!(doc.dispatch_event(input, "blur"), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listener_is_not_invoked() {
        let (doc, form, input) = sample();
        let id = doc.add_event_listener(form, "change", |_| panic!("should be removed"));
        assert!(doc.remove_event_listener(id));
        assert!(!doc.remove_event_listener(id));
        assert_eq!(doc.dispatch_event(input, "change"), 0);
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn callbacks_may_touch_the_document() {
        let (doc, form, input) = sample();
        let handle = doc.clone();
        doc.add_event_listener(form, "keydown", move |event| {
            let _ = handle.set_value(event.target, "rewritten");
        });
        doc.user_input(input, "typed").unwrap();
        assert_eq!(doc.value(input).as_deref(), Some("rewritten"));
    }

    #[test]
    fn subscribe_receives_custom_events() {
        let doc = Document::new();
        let mut rx = doc.subscribe("login-change");
        assert_eq!(doc.dispatch_custom("login-change", ValueSnapshot::new()), 1);
        assert_eq!(doc.dispatch_custom("other-change", ValueSnapshot::new()), 0);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "login-change");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscriptions_unregister() {
        let doc = Document::new();
        for _ in 0..100 {
            let _ = doc.subscribe("login-change");
        }
        assert_eq!(doc.listener_count(), 0);
        assert_eq!(doc.dispatch_custom("login-change", ValueSnapshot::new()), 0);

        let kept = doc.subscribe("login-change");
        assert_eq!(doc.listener_count(), 1);
        assert!(doc.remove_event_listener(kept.id()));
        drop(kept);
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn toggle_flips_checked_state() {
        let doc = Document::new();
        let form = doc.append(doc.root(), Element::form()).unwrap();
        let cb = doc
            .append(form, Element::input("checkbox").with_name("remember"))
            .unwrap();
        assert_eq!(doc.toggle(cb), Ok(true));
        assert_eq!(doc.toggle(cb), Ok(false));
    }
}
