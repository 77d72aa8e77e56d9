//! Dedicated background thread for running tasks one at a time.
//!
//! A [`Worker`] owns a single thread with its own task queue. Tasks are
//! executed sequentially in submission order, which is exactly what the form
//! library needs: at most one function body runs at any time, and the UI
//! thread is never blocked by it.
//!
//! # Example
//!
//! ```no_run
//! use formwright_core::worker::Worker;
//!
//! let worker = Worker::new().expect("spawn worker");
//!
//! worker.send(|| {
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//!     println!("Hello from the worker");
//! }).expect("queue task");
//!
//! // Graceful shutdown: pending tasks still run.
//! worker.stop();
//! worker.join();
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use parking_lot::{Condvar, Mutex};

use crate::error::WorkerError;
use crate::logging::targets;

/// Default capacity for the worker's task queue.
const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Configuration for creating a Worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name for the worker thread.
    pub name: String,
    /// Stack size for the worker thread in bytes. `None` uses the default.
    pub stack_size: Option<usize>,
    /// Capacity of the task queue.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "formwright-worker".to_string(),
            stack_size: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Create a new configuration with the given thread name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builder for creating Workers with custom configuration.
#[derive(Debug, Default)]
pub struct WorkerBuilder {
    config: WorkerConfig,
}

impl WorkerBuilder {
    /// Create a new WorkerBuilder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the stack size for the worker thread.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Set the task queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity.max(1);
        self
    }

    /// Build and start the worker.
    pub fn build(self) -> Result<Worker, WorkerError> {
        Worker::with_config(self.config)
    }
}

/// State shared between the Worker handle and its thread.
struct WorkerState {
    running: AtomicBool,
    busy: AtomicBool,
    pending_tasks: AtomicUsize,
    shutdown_condvar: Condvar,
    shutdown_mutex: Mutex<bool>,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            busy: AtomicBool::new(false),
            pending_tasks: AtomicUsize::new(0),
            shutdown_condvar: Condvar::new(),
            shutdown_mutex: Mutex::new(false),
        }
    }

    fn signal_shutdown(&self) {
        let mut exited = self.shutdown_mutex.lock();
        *exited = true;
        self.shutdown_condvar.notify_all();
    }
}

enum WorkerTask {
    Execute(Box<dyn FnOnce() + Send>),
    Shutdown,
}

/// A dedicated worker thread with its own task queue.
///
/// `Worker` is `Send + Sync`; any thread may submit tasks. Tasks never run
/// concurrently with each other.
pub struct Worker {
    name: String,
    task_sender: Sender<WorkerTask>,
    handle: Mutex<Option<JoinHandle<()>>>,
    state: Arc<WorkerState>,
}

impl Worker {
    /// Create a new worker with default configuration.
    ///
    /// The worker thread starts immediately.
    pub fn new() -> Result<Self, WorkerError> {
        Self::with_config(WorkerConfig::default())
    }

    /// Create a new worker with custom configuration.
    pub fn with_config(config: WorkerConfig) -> Result<Self, WorkerError> {
        let (sender, receiver) = bounded(config.queue_capacity.max(1));
        let state = Arc::new(WorkerState::new());
        let thread_state = state.clone();

        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || {
                worker_loop(receiver, &thread_state);
                thread_state.running.store(false, Ordering::Release);
                thread_state.signal_shutdown();
            })
            .map_err(WorkerError::Spawn)?;

        crate::fw_debug!(target: targets::WORKER, name = %config.name, "worker started");

        Ok(Self {
            name: config.name,
            task_sender: sender,
            handle: Mutex::new(Some(handle)),
            state,
        })
    }

    /// The worker thread's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the worker still accepts tasks.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Whether a task is executing right now.
    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::Acquire)
    }

    /// Number of tasks queued or executing.
    pub fn pending_tasks(&self) -> usize {
        self.state.pending_tasks.load(Ordering::Acquire)
    }

    /// Queue a task for execution on the worker thread.
    pub fn send<F>(&self, task: F) -> Result<(), WorkerError>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_running() {
            return Err(WorkerError::Stopped);
        }

        self.state.pending_tasks.fetch_add(1, Ordering::AcqRel);

        match self.task_sender.try_send(WorkerTask::Execute(Box::new(task))) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state.pending_tasks.fetch_sub(1, Ordering::AcqRel);
                match err {
                    TrySendError::Full(_) => Err(WorkerError::QueueFull),
                    TrySendError::Disconnected(_) => Err(WorkerError::Stopped),
                }
            }
        }
    }

    /// Request the worker to stop after processing remaining tasks.
    ///
    /// Non-blocking. New tasks are rejected from this point on.
    pub fn stop(&self) {
        if self.state.running.swap(false, Ordering::AcqRel) {
            crate::fw_debug!(target: targets::WORKER, name = %self.name, "worker stop requested");
        }
        let _ = self.task_sender.try_send(WorkerTask::Shutdown);
    }

    /// Wait for the worker thread to finish.
    ///
    /// Returns `true` if the thread was joined, `false` if it was already
    /// joined or panicked.
    pub fn join(&self) -> bool {
        let handle = self.handle.lock().take();
        match handle {
            Some(h) => h.join().is_ok(),
            None => false,
        }
    }

    /// Stop the worker and wait for it to finish.
    pub fn stop_and_join(&self) -> bool {
        self.stop();
        self.join()
    }

    /// Wait for the worker thread to exit, up to `timeout`.
    ///
    /// Returns `true` if the thread has exited.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut exited = self.state.shutdown_mutex.lock();
        if !*exited {
            let _ = self.state.shutdown_condvar.wait_for(&mut exited, timeout);
        }
        *exited
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(receiver: Receiver<WorkerTask>, state: &WorkerState) {
    loop {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(WorkerTask::Execute(task)) => run_task(task, state),
            Ok(WorkerTask::Shutdown) => {
                // Drain what was queued before the stop request.
                while let Ok(task) = receiver.try_recv() {
                    if let WorkerTask::Execute(t) = task {
                        run_task(t, state);
                    }
                }
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !state.running.load(Ordering::Acquire)
                    && state.pending_tasks.load(Ordering::Acquire) == 0
                {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run_task(task: Box<dyn FnOnce() + Send>, state: &WorkerState) {
    state.busy.store(true, Ordering::Release);
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        crate::fw_error!(target: targets::WORKER, "worker task panicked");
    }
    state.busy.store(false, Ordering::Release);
    state.pending_tasks.fetch_sub(1, Ordering::AcqRel);
}
