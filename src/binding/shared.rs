use super::collector::InputTree;
use super::extractor::gather_values;
use crate::dom::Document;
use crate::value::ValueSnapshot;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// State shared by a session, its change notifier task and every value view.
///
/// The snapshot is written by the extractor (form → object) and by view
/// writes (object → form); both take the same lock.
pub(crate) struct BindingCore {
    pub(crate) document: Document,
    pub(crate) event_name: String,
    pub(crate) inputs: InputTree,
    pub(crate) values: Mutex<ValueSnapshot>,
    pub(crate) auto_notify: bool,
    released: AtomicBool,
}

impl BindingCore {
    pub(crate) fn new(
        document: Document,
        event_name: String,
        inputs: InputTree,
        auto_notify: bool,
    ) -> Self {
        let mut values = ValueSnapshot::new();
        gather_values(&document, &mut values, &inputs);
        Self {
            document,
            event_name,
            inputs,
            values: Mutex::new(values),
            auto_notify,
            released: AtomicBool::new(false),
        }
    }

    /// Re-reads the form into the snapshot and returns a copy.
    pub(crate) fn refresh(&self) -> ValueSnapshot {
        let mut values = self.values.lock();
        gather_values(&self.document, &mut values, &self.inputs);
        values.clone()
    }

    pub(crate) fn snapshot(&self) -> ValueSnapshot {
        self.values.lock().clone()
    }

    /// Dispatches the change event with the current snapshot.
    pub(crate) fn notify(&self) -> usize {
        let detail = self.snapshot();
        let delivered = self.document.dispatch_custom(&self.event_name, detail);
        debug!("\"{}\" delivered to {} listener(s)", self.event_name, delivered);
        delivered
    }

    pub(crate) fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}
