//! Property change notification.
//!
//! The notifier is the graph → UI change-propagation channel. It is bound at
//! node creation and invoked synchronously on the caller's thread whenever a
//! setter runs with `notify = true`. Receivers must not re-enter the graph
//! model.

use std::sync::Arc;

/// External observer callback: `(node_handle, property_index, serialized)`.
pub type NotifyFn = dyn Fn(u64, u32, &str) + Send + Sync;

/// Callback bound to one node, carrying the node's wire handle.
#[derive(Clone)]
pub struct PropertyNotifier {
    node_handle: u64,
    callback: Arc<NotifyFn>,
}

impl PropertyNotifier {
    #[must_use]
    pub fn new(node_handle: u64, callback: Arc<NotifyFn>) -> Self {
        Self {
            node_handle,
            callback,
        }
    }

    #[inline]
    #[must_use]
    pub fn node_handle(&self) -> u64 {
        self.node_handle
    }

    /// Announces a property change with its freshly serialized value.
    pub fn notify(&self, property_index: u32, serialized: &str) {
        (self.callback)(self.node_handle, property_index, serialized);
    }
}

impl std::fmt::Debug for PropertyNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyNotifier")
            .field("node_handle", &self.node_handle)
            .finish_non_exhaustive()
    }
}
