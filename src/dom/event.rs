use super::NodeId;
use crate::value::ValueSnapshot;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Handle returned when registering a listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A plain DOM event (`change`, `blur`, ...) travelling up from its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub event_type: String,
    /// Node the event was fired on.
    pub target: NodeId,
    /// Node whose listener is currently running.
    pub current_target: NodeId,
}

/// Document-scoped custom event carrying a value snapshot as its detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomEvent {
    pub name: String,
    pub detail: ValueSnapshot,
    pub timestamp: DateTime<Local>,
}

pub(crate) type DomCallback = Arc<dyn Fn(&DomEvent) + Send + Sync>;
pub(crate) type CustomCallback = Arc<dyn Fn(&CustomEvent) + Send + Sync>;

struct DomListener {
    id: ListenerId,
    node: NodeId,
    event_type: String,
    callback: DomCallback,
}

struct CustomListener {
    id: ListenerId,
    name: String,
    callback: CustomCallback,
}

/// All listeners of one document. Callbacks are cloned out before they run so
/// the registry lock is never held across user code.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    dom: Vec<DomListener>,
    custom: Vec<CustomListener>,
}

impl ListenerRegistry {
    fn allocate(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn add_dom(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: DomCallback,
    ) -> ListenerId {
        let id = self.allocate();
        self.dom.push(DomListener {
            id,
            node,
            event_type: event_type.to_string(),
            callback,
        });
        id
    }

    pub(crate) fn add_custom(&mut self, name: &str, callback: CustomCallback) -> ListenerId {
        let id = self.allocate();
        self.custom.push(CustomListener {
            id,
            name: name.to_string(),
            callback,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.dom.len() + self.custom.len();
        self.dom.retain(|l| l.id != id);
        self.custom.retain(|l| l.id != id);
        before != self.dom.len() + self.custom.len()
    }

    pub(crate) fn dom_callbacks(&self, node: NodeId, event_type: &str) -> Vec<DomCallback> {
        self.dom
            .iter()
            .filter(|l| l.node == node && l.event_type == event_type)
            .map(|l| Arc::clone(&l.callback))
            .collect()
    }

    pub(crate) fn custom_callbacks(&self, name: &str) -> Vec<CustomCallback> {
        self.custom
            .iter()
            .filter(|l| l.name == name)
            .map(|l| Arc::clone(&l.callback))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.dom.len() + self.custom.len()
    }
}
