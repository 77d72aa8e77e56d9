//! Threading substrate for formwright.
//!
//! This crate provides the pieces the form library builds its execution model
//! on:
//!
//! - **UI queue**: FIFO of invocations drained by a single UI thread, with
//!   blocking request/response for worker threads ([`UiQueue`])
//! - **Worker**: a dedicated background thread running one task at a time
//!   ([`Worker`])
//! - **Cancellation**: a shared atomic flag polled cooperatively
//!   ([`CancelFlag`])
//! - **Progress**: `(current, total, message)` updates ([`ProgressUpdate`])
//! - **Signals**: fan-out of notifications to connected slots ([`Signal`])
//! - **Logging**: `tracing` targets and helper macros
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use formwright_core::{CancelFlag, UiQueue, Worker};
//!
//! struct Ui { log: Vec<String> }
//!
//! let queue: Arc<UiQueue<Ui>> = Arc::new(UiQueue::new());
//! let worker = Worker::new().unwrap();
//! let cancel = CancelFlag::new();
//!
//! let (q, flag) = (queue.clone(), cancel.clone());
//! worker.send(move || {
//!     let answer = q.call(|ui: &mut Ui| { ui.log.push("asked".into()); 42 }).unwrap();
//!     if !flag.is_cancelled() {
//!         q.post(move |ui: &mut Ui| ui.log.push(format!("answer {answer}"))).unwrap();
//!     }
//! }).unwrap();
//!
//! let mut ui = Ui { log: Vec::new() };
//! while ui.log.len() < 2 {
//!     queue.wait_and_process(&mut ui, std::time::Duration::from_millis(5));
//! }
//! assert_eq!(ui.log, vec!["asked".to_string(), "answer 42".to_string()]);
//! worker.stop_and_join();
//! ```

pub mod cancellation;
mod error;
pub mod invocation;
pub mod logging;
pub mod progress;
pub mod signal;
pub mod thread_check;
pub mod worker;

pub use cancellation::CancelFlag;
pub use error::{DispatchError, Result, WorkerError};
pub use invocation::{QueuedInvocation, ReplyHandle, ReplyWaiter, UiQueue, reply_pair};
pub use logging::PerfSpan;
pub use progress::ProgressUpdate;
pub use signal::{ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
pub use worker::{Worker, WorkerBuilder, WorkerConfig};
