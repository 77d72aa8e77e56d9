//! Thread affinity tracking.
//!
//! All widget state and every UI-side handler lives on a single UI thread.
//! [`ThreadAffinity`] records the thread an object was created on so the UI
//! queue can tell whether a caller is the thread that drains it.
//!
//! ```
//! use formwright_core::thread_check::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current();
//! assert!(affinity.is_current());
//!
//! let other = std::thread::spawn(move || affinity.is_current()).join().unwrap();
//! assert!(!other);
//! ```

use std::thread::ThreadId;

/// Records the thread an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Create an affinity bound to the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// The thread this affinity is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether the calling thread is the bound thread.
    #[inline]
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Panic in debug builds when called from a foreign thread.
    #[inline]
    #[track_caller]
    pub fn debug_assert_same_thread(&self) {
        #[cfg(debug_assertions)]
        self.assert_same_thread();
    }

    /// Panic when called from a foreign thread.
    #[track_caller]
    pub fn assert_same_thread(&self) {
        if !self.is_current() {
            panic_wrong_thread(self.thread_id);
        }
    }
}

#[cold]
#[inline(never)]
#[track_caller]
fn panic_wrong_thread(expected: ThreadId) -> ! {
    let current = std::thread::current();
    panic!(
        "thread affinity violation: expected thread {expected:?}, called from \"{}\" ({:?}). \
         UI-side state must only be touched from the thread that drains the UI queue.",
        current.name().unwrap_or("<unnamed>"),
        current.id(),
    )
}
