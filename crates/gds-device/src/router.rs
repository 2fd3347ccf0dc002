//! Per-kind report dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use gds_proto::{GdsMessage, MessageKind};
use tracing::{trace, warn};

type Callback = Arc<dyn Fn(&GdsMessage) + Send + Sync>;

/// Ordered callback table keyed by message kind.
///
/// Registration may race with dispatch; the table is mutex guarded and
/// dispatch runs against a snapshot so a callback can itself register
/// without deadlocking. A panicking callback is contained and logged and
/// never stops the remaining callbacks or poisons the table.
pub struct ReportRouter {
    table: Mutex<[Vec<Callback>; MessageKind::COUNT]>,
}

impl ReportRouter {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(std::array::from_fn(|_| Vec::new())),
        }
    }

    /// Append a callback for `kind`. Callbacks run in registration order.
    pub fn register<F>(&self, kind: MessageKind, callback: F)
    where
        F: Fn(&GdsMessage) + Send + Sync + 'static,
    {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        table[kind.index()].push(Arc::new(callback));
    }

    /// Invoke every callback registered for the message's kind.
    pub fn dispatch(&self, message: &GdsMessage) {
        let kind = message.kind();
        let callbacks = {
            let table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table[kind.index()].clone()
        };
        trace!(?kind, count = callbacks.len(), "dispatching report");
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(message))).is_err() {
                warn!(?kind, "report callback panicked; continuing dispatch");
            }
        }
    }

    /// Drop every registered callback.
    pub fn clear(&self) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        for slot in table.iter_mut() {
            slot.clear();
        }
    }
}

impl Default for ReportRouter {
    fn default() -> Self {
        Self::new()
    }
}
