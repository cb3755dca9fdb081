//! Change notifier: debounced form → object propagation.
//!
//! ```text
//! DOM event ──► form listener ──[trigger]──► debounce task ──► extract ──► "<id>-change"
//!               (one per type)  (unbounded)   (one per session)
//! ```
//!
//! Every trigger restarts the quiet period. Only when a full `debounce`
//! elapses without a new trigger is the form re-read and a single change
//! event dispatched, so a burst of edits produces one event carrying the
//! state after the last edit.

use super::shared::BindingCore;
use super::error::BindError;
use crate::dom::{ListenerId, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Running notifier of one session: its DOM listeners and debounce task.
#[derive(Debug)]
pub struct ChangeNotifier {
    listeners: Vec<ListenerId>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ChangeNotifier {
    /// Attaches one listener per event type to `form` and spawns the debounce
    /// task on the current tokio runtime.
    pub(crate) fn spawn(
        core: Arc<BindingCore>,
        form: NodeId,
        events: &[String],
        debounce: Duration,
    ) -> Result<Self, BindError> {
        let runtime = current_runtime()?;
        info!(
            "Spawning change notifier for \"{}\" ({:?} debounce, events {:?})",
            core.event_name, debounce, events
        );

        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel::<String>();
        let listeners = events
            .iter()
            .map(|event_type| {
                let tx = trigger_tx.clone();
                core.document.add_event_listener(form, event_type, move |event| {
                    // closed only while the session is being torn down
                    let _ = tx.send(event.event_type.clone());
                })
            })
            .collect();

        let cancel = CancellationToken::new();
        let task = runtime.spawn(run_debounce_loop(
            core,
            trigger_rx,
            debounce,
            cancel.clone(),
        ));
        debug!("Debounce task spawned: {:?}", task);

        Ok(Self {
            listeners,
            cancel,
            task,
        })
    }

    pub fn listener_ids(&self) -> &[ListenerId] {
        &self.listeners
    }

    /// Detaches every listener and stops the debounce task. A pending
    /// debounce window is dropped without dispatching.
    pub(crate) fn shutdown(self, core: &BindingCore) {
        let removed = self
            .listeners
            .iter()
            .filter(|&&id| core.document.remove_event_listener(id))
            .count();
        self.cancel.cancel();
        debug!(
            "Change notifier for \"{}\" stopped, {} listener(s) removed, task finished: {}",
            core.event_name,
            removed,
            self.task.is_finished()
        );
    }
}

/// Handle of the current runtime, which must be a current-thread one.
///
/// DOM events are dispatched synchronously on the runtime thread, so the
/// debounce task only observes a burst once the dispatching code yields and a
/// zero-length window covers the whole burst.
pub(crate) fn current_runtime() -> Result<Handle, BindError> {
    let handle = Handle::try_current().map_err(|_| BindError::NoRuntime)?;
    match handle.runtime_flavor() {
        RuntimeFlavor::CurrentThread => Ok(handle),
        flavor => {
            warn!("Refusing to spawn change notifier on a {:?} runtime", flavor);
            Err(BindError::MultiThreadRuntime)
        }
    }
}

async fn run_debounce_loop(
    core: Arc<BindingCore>,
    mut triggers: mpsc::UnboundedReceiver<String>,
    debounce: Duration,
    cancel: CancellationToken,
) {
    loop {
        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            trigger = triggers.recv() => trigger,
        };
        let Some(first) = first else { break };
        debug!("\"{}\" triggered by {}", core.event_name, first);

        let mut coalesced = 1usize;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                quiet = tokio::time::timeout(debounce, triggers.recv()) => match quiet {
                    Ok(Some(_)) => coalesced += 1,
                    Ok(None) => return,
                    Err(_) => break,
                },
            }
        }

        core.refresh();
        debug!(
            "Debounce window for \"{}\" closed after {} trigger(s)",
            core.event_name, coalesced
        );
        core.notify();
    }
    debug!("Debounce task for \"{}\" finished", core.event_name);
}
