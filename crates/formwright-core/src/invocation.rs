//! Queued invocations for delivery on the UI thread.
//!
//! Workers never touch UI state directly. Instead they post closures onto a
//! [`UiQueue`], and the UI thread executes them one at a time, in submission
//! order, when it calls [`UiQueue::process_pending`]. Each closure receives a
//! mutable reference to the UI-side context `C` (for the form library this is
//! the host's handler object), so the context itself never has to be `Send`.
//!
//! # How It Works
//!
//! 1. A worker calls [`UiQueue::post`] (fire and forget) or [`UiQueue::call`]
//!    (blocking request/response).
//! 2. The closure is wrapped in a [`QueuedInvocation`] and pushed onto an
//!    unbounded FIFO channel.
//! 3. The UI thread drains the channel. For blocking calls a
//!    [`ReplyHandle`] carries the closure's return value back, and the worker
//!    wakes up from [`ReplyWaiter::wait`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use formwright_core::invocation::UiQueue;
//!
//! struct Console { lines: Vec<String> }
//!
//! let queue: Arc<UiQueue<Console>> = Arc::new(UiQueue::new());
//! let mut console = Console { lines: Vec::new() };
//!
//! let worker_queue = queue.clone();
//! let worker = std::thread::spawn(move || {
//!     worker_queue
//!         .call(|console: &mut Console| {
//!             console.lines.push("hello".to_string());
//!             console.lines.len()
//!         })
//!         .unwrap()
//! });
//!
//! while !worker.is_finished() {
//!     queue.wait_and_process(&mut console, std::time::Duration::from_millis(5));
//! }
//! assert_eq!(worker.join().unwrap(), 1);
//! assert_eq!(console.lines, vec!["hello".to_string()]);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::{Condvar, Mutex};

use crate::error::{DispatchError, Result};
use crate::logging::targets;
use crate::thread_check::ThreadAffinity;

/// Global invocation counter for unique IDs.
static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// A type-erased invocation waiting to run on the UI thread.
pub struct QueuedInvocation<C: ?Sized + 'static> {
    id: u64,
    invoke: Box<dyn FnOnce(&mut C) + Send>,
}

impl<C: ?Sized + 'static> QueuedInvocation<C> {
    /// Wrap a closure as a queued invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        Self {
            id: NEXT_INVOCATION_ID.fetch_add(1, Ordering::SeqCst),
            invoke: Box::new(invoke),
        }
    }

    /// The unique ID of this invocation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Execute the invocation against the UI-side context.
    pub fn execute(self, context: &mut C) {
        (self.invoke)(context);
    }
}

impl<C: ?Sized + 'static> std::fmt::Debug for QueuedInvocation<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedInvocation").field("id", &self.id).finish()
    }
}

enum ReplySlot<R> {
    Pending,
    Ready(R),
    Dropped,
    Taken,
}

struct ReplyState<R> {
    slot: Mutex<ReplySlot<R>>,
    condvar: Condvar,
}

/// The sending half of a blocking invocation's reply.
///
/// Dropping the handle without calling [`send`](Self::send) wakes the waiter
/// with [`DispatchError::ReplyDropped`].
pub struct ReplyHandle<R> {
    inner: Arc<ReplyState<R>>,
}

impl<R> ReplyHandle<R> {
    /// Deliver the reply and wake the waiting thread.
    pub fn send(self, value: R) {
        let mut slot = self.inner.slot.lock();
        *slot = ReplySlot::Ready(value);
        self.inner.condvar.notify_all();
    }
}

impl<R> Drop for ReplyHandle<R> {
    fn drop(&mut self) {
        let mut slot = self.inner.slot.lock();
        if matches!(*slot, ReplySlot::Pending) {
            *slot = ReplySlot::Dropped;
            self.inner.condvar.notify_all();
        }
    }
}

/// The receiving half of a blocking invocation's reply.
pub struct ReplyWaiter<R> {
    inner: Arc<ReplyState<R>>,
}

impl<R> ReplyWaiter<R> {
    /// Block until the reply arrives.
    ///
    /// # Warning
    ///
    /// Calling this on the thread that is supposed to produce the reply
    /// deadlocks. [`UiQueue::call`] guards against that case.
    pub fn wait(self) -> Result<R> {
        let mut slot = self.inner.slot.lock();
        while matches!(*slot, ReplySlot::Pending) {
            self.inner.condvar.wait(&mut slot);
        }
        take_reply(&mut slot)
    }

    /// Block until the reply arrives or the timeout elapses.
    ///
    /// Returns `None` on timeout; the waiter stays usable.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<R>> {
        let mut slot = self.inner.slot.lock();
        if matches!(*slot, ReplySlot::Pending) {
            let _ = self.inner.condvar.wait_for(&mut slot, timeout);
        }
        if matches!(*slot, ReplySlot::Pending) {
            return None;
        }
        Some(take_reply(&mut slot))
    }

    /// Whether a reply (or a drop) has been recorded.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.inner.slot.lock(), ReplySlot::Pending)
    }
}

fn take_reply<R>(slot: &mut ReplySlot<R>) -> Result<R> {
    match std::mem::replace(slot, ReplySlot::Taken) {
        ReplySlot::Ready(value) => Ok(value),
        _ => Err(DispatchError::ReplyDropped),
    }
}

/// Create a connected reply handle/waiter pair.
pub fn reply_pair<R>() -> (ReplyHandle<R>, ReplyWaiter<R>) {
    let state = Arc::new(ReplyState {
        slot: Mutex::new(ReplySlot::Pending),
        condvar: Condvar::new(),
    });
    (
        ReplyHandle {
            inner: state.clone(),
        },
        ReplyWaiter { inner: state },
    )
}

/// A FIFO queue of invocations drained by a single UI thread.
///
/// The queue is created on the UI thread and remembers it. Blocking calls
/// from that thread are refused with [`DispatchError::WouldDeadlock`].
pub struct UiQueue<C: ?Sized + 'static> {
    sender: Sender<QueuedInvocation<C>>,
    receiver: Receiver<QueuedInvocation<C>>,
    affinity: ThreadAffinity,
    closed: AtomicBool,
}

impl<C: ?Sized + 'static> Default for UiQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized + 'static> UiQueue<C> {
    /// Create a queue owned by the calling thread.
    pub fn new() -> Self {
        Self::with_affinity(ThreadAffinity::current())
    }

    /// Create a queue owned by an explicit UI thread.
    pub fn with_affinity(affinity: ThreadAffinity) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            affinity,
            closed: AtomicBool::new(false),
        }
    }

    /// The UI thread this queue belongs to.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    /// Whether the caller is on the UI thread.
    pub fn is_ui_thread(&self) -> bool {
        self.affinity.is_current()
    }

    /// Post a fire-and-forget invocation.
    ///
    /// Returns the invocation ID.
    pub fn post<F>(&self, invoke: F) -> Result<u64>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.enqueue(QueuedInvocation::new(invoke))
    }

    /// Post an invocation and block until the UI thread has run it.
    ///
    /// The closure's return value is handed back to the caller.
    pub fn call<R, F>(&self, invoke: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut C) -> R + Send + 'static,
    {
        if self.is_ui_thread() {
            return Err(DispatchError::WouldDeadlock);
        }
        let (handle, waiter) = reply_pair();
        self.post(move |context: &mut C| handle.send(invoke(context)))?;
        waiter.wait()
    }

    fn enqueue(&self, invocation: QueuedInvocation<C>) -> Result<u64> {
        if self.is_closed() {
            return Err(DispatchError::QueueClosed);
        }
        let id = invocation.id();
        self.sender
            .send(invocation)
            .map_err(|_| DispatchError::QueueClosed)?;
        crate::fw_trace!(target: targets::DISPATCH, id, "queued UI invocation");
        Ok(id)
    }

    /// Run one pending invocation, if any.
    ///
    /// Returns `true` if an invocation was executed.
    pub fn process_one(&self, context: &mut C) -> bool {
        self.affinity.debug_assert_same_thread();
        match self.receiver.try_recv() {
            Ok(invocation) => {
                crate::fw_trace!(
                    target: targets::DISPATCH,
                    id = invocation.id(),
                    "executing UI invocation"
                );
                invocation.execute(context);
                true
            }
            Err(_) => false,
        }
    }

    /// Run every pending invocation, including ones posted while draining.
    ///
    /// Returns the number of invocations executed.
    pub fn process_pending(&self, context: &mut C) -> usize {
        let mut count = 0;
        while self.process_one(context) {
            count += 1;
        }
        count
    }

    /// Wait up to `timeout` for work, then drain the queue.
    ///
    /// Returns the number of invocations executed.
    pub fn wait_and_process(&self, context: &mut C, timeout: Duration) -> usize {
        self.affinity.debug_assert_same_thread();
        match self.receiver.recv_timeout(timeout) {
            Ok(invocation) => {
                invocation.execute(context);
                1 + self.process_pending(context)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// The number of invocations waiting to run.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Close the queue and drop every pending invocation.
    ///
    /// Workers blocked in [`call`](Self::call) wake with
    /// [`DispatchError::ReplyDropped`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut dropped = 0usize;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        crate::fw_debug!(target: targets::DISPATCH, dropped, "UI queue closed");
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
