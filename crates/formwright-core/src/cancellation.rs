//! Cooperative cancellation.
//!
//! A [`CancelFlag`] is a shared atomic boolean. The UI thread sets it; the
//! running function polls it. Nothing is ever preempted: a function that
//! never looks at the flag simply runs to completion.
//!
//! ```
//! use formwright_core::cancellation::CancelFlag;
//!
//! let flag = CancelFlag::new();
//! let worker_flag = flag.clone();
//!
//! let handle = std::thread::spawn(move || {
//!     let mut iterations = 0;
//!     while !worker_flag.is_cancelled() {
//!         iterations += 1;
//!         std::thread::sleep(std::time::Duration::from_millis(1));
//!     }
//!     iterations
//! });
//!
//! std::thread::sleep(std::time::Duration::from_millis(10));
//! flag.cancel();
//! assert!(handle.join().unwrap() > 0);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared, thread-safe cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a flag in the non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call flipped the flag.
    pub fn cancel(&self) -> bool {
        let flipped = !self.cancelled.swap(true, Ordering::AcqRel);
        if flipped {
            crate::fw_debug!("cancellation requested");
        }
        flipped
    }

    /// Whether two handles observe the same flag.
    pub fn same_flag(&self, other: &CancelFlag) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}
