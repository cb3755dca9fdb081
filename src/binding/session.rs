//! Binding session lifecycle with statum state machine
//!
//! ```text
//! Bound ──(teardown)──► Released
//! ```
//!
//! A `Bound` session keeps its form listeners and debounce task alive for as
//! long as the caller wants; dropping the session does not detach anything.
//! `teardown` removes the listeners, stops the task and invalidates every
//! [`BoundValue`] handed out, leaving a `Released` session that can still
//! report the last snapshot.

use super::error::BindError;
use super::notifier::ChangeNotifier;
use super::reactive::BoundValue;
use super::shared::BindingCore;
use crate::config::{BindOptions, Direction};
use crate::dom::NodeId;
use crate::value::ValueSnapshot;
use statum::{machine, state};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// States of a binding session
#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Bound,    // listeners attached, view writable
    Released, // listeners detached, view invalidated
}

/// One bound form: identifier, input tree, snapshot and active wiring.
#[machine]
pub struct BindingSession<S: SessionState> {
    core: Arc<BindingCore>,
    form: NodeId,
    options: BindOptions,
    notifier: Option<ChangeNotifier>,
}

impl<S: SessionState> BindingSession<S> {
    /// `"<form identifier>-change"`
    pub fn event_name(&self) -> &str {
        &self.core.event_name
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    /// Copy of the current value snapshot.
    pub fn snapshot(&self) -> ValueSnapshot {
        self.core.snapshot()
    }
}

impl<S: SessionState> fmt::Debug for BindingSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSession")
            .field("event_name", &self.core.event_name)
            .field("form", &self.form)
            .field("options", &self.options)
            .field("released", &self.core.is_released())
            .finish()
    }
}

impl BindingSession<Bound> {
    /// Wires up an already collected form according to `options`.
    pub(crate) fn start(
        core: Arc<BindingCore>,
        form: NodeId,
        options: BindOptions,
    ) -> Result<Self, BindError> {
        let notifier = if options.direction.contains(Direction::FROM_FORM) {
            Some(ChangeNotifier::spawn(
                Arc::clone(&core),
                form,
                &options.events,
                options.debounce_duration(),
            )?)
        } else {
            debug!("FROM_FORM disabled for \"{}\", no listeners attached", core.event_name);
            None
        };

        info!(
            "Bound \"{}\" ({} fields, direction {:?})",
            core.event_name,
            core.inputs.field_count(),
            options.direction
        );
        Ok(Self::new(core, form, options, notifier))
    }

    /// Value view of the whole form. Writable when `TO_FORM` is enabled.
    pub fn values(&self) -> BoundValue {
        BoundValue::new(
            Arc::clone(&self.core),
            self.options.direction.contains(Direction::TO_FORM),
        )
    }

    /// Re-reads the form immediately, bypassing the debounce timer.
    pub fn refresh(&self) -> ValueSnapshot {
        self.core.refresh()
    }

    /// Dispatches the change event with the current snapshot. Returns the
    /// number of listeners reached.
    pub fn notify(&self) -> usize {
        self.core.notify()
    }

    /// Number of DOM listeners this session attached to the form.
    pub fn listener_count(&self) -> usize {
        self.notifier
            .as_ref()
            .map(|n| n.listener_ids().len())
            .unwrap_or(0)
    }

    /// The `(value view, event name)` pair of the classic setup call.
    pub fn into_parts(self) -> (BoundValue, String) {
        let values = self.values();
        (values, self.core.event_name.clone())
    }

    /// Detaches all listeners, stops the debounce task and invalidates the
    /// value views of this session.
    pub fn teardown(mut self) -> BindingSession<Released> {
        info!("Tearing down binding \"{}\"", self.core.event_name);
        if let Some(notifier) = self.notifier.take() {
            notifier.shutdown(&self.core);
        }
        self.core.release();
        self.transition()
    }
}

impl BindingSession<Released> {
    pub fn is_released(&self) -> bool {
        self.core.is_released()
    }
}
