//! Signals for fanning out notifications to connected slots.
//!
//! A [`Signal`] holds any number of slots (closures). Emitting the signal
//! invokes every slot in connection order on the emitting thread. Execution
//! events are emitted from the UI thread, so slots observing them can touch
//! UI state directly.
//!
//! # Example
//!
//! ```
//! use formwright_core::signal::Signal;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//!
//! let value_changed = Signal::<i32>::new();
//! let seen = Arc::new(AtomicI32::new(0));
//!
//! let sink = seen.clone();
//! let id = value_changed.connect(move |v| {
//!     sink.store(*v, Ordering::SeqCst);
//! });
//!
//! value_changed.emit(&42);
//! assert_eq!(seen.load(Ordering::SeqCst), 42);
//!
//! value_changed.disconnect(id);
//! value_changed.emit(&7);
//! assert_eq!(seen.load(Ordering::SeqCst), 42);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A type-safe signal that can have multiple connected slots.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot to this signal.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Disconnect a slot. Returns `true` if it was connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Temporarily suppress emission.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether emission is suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Invoke every connected slot with `args`.
    ///
    /// Slots run outside the connection lock, so a slot may connect or
    /// disconnect other slots; such changes apply from the next emission.
    #[tracing::instrument(skip_all, target = "formwright_core::signal", level = "trace")]
    pub fn emit(&self, args: &Args) {
        if self.is_blocked() {
            crate::fw_trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }
        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        crate::fw_trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");
        for slot in slots {
            slot(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_all_slots_in_order() {
        let signal = Signal::<String>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let log = log.clone();
            signal.connect(move |s| log.lock().push(format!("{tag}:{s}")));
        }

        signal.emit(&"x".to_string());
        assert_eq!(*log.lock(), vec!["a:x".to_string(), "b:x".to_string()]);
    }

    #[test]
    fn test_blocked_signal() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        signal.emit(&());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        signal.set_blocked(false);
        signal.emit(&());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<i32>::new();
        let id = signal.connect(|_| {});
        assert_eq!(signal.connection_count(), 1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_may_connect_during_emit() {
        let signal = Arc::new(Signal::<i32>::new());
        let inner = signal.clone();
        signal.connect(move |_| {
            inner.connect(|_| {});
        });
        signal.emit(&1);
        assert_eq!(signal.connection_count(), 2);
    }
}
