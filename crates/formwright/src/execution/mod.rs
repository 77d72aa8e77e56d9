//! Running functions off the UI thread.
//!
//! The [`ExecutionCoordinator`] owns one worker thread and runs at most one
//! [`ExecutionTicket`] at a time. Everything the UI sees about a run arrives
//! as [`ExecutionEvent`]s, delivered through the host queue in a fixed
//! order:
//!
//! ```text
//! Started, Progress*, (Result | Error | Canceled), Finished
//! ```
//!
//! The coordinator is back to [`ExecutionState::Idle`] once `Finished` has
//! been handled on the UI thread.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use formwright::execution::{ExecutionCoordinator, ExecutionEvent, ExecutionTicket};
//! use formwright::host::{HeadlessHost, HostQueue};
//! use formwright::signature::Callable;
//! use formwright::{Arguments, Value};
//! use formwright_core::UiQueue;
//!
//! let queue: Arc<HostQueue> = Arc::new(UiQueue::new());
//! let coordinator = ExecutionCoordinator::new(queue.clone()).unwrap();
//!
//! let double = Arc::new(
//!     Callable::parse("def double(x: int) -> int")
//!         .unwrap()
//!         .body(|_ctx, args| Ok(Value::Int(args.get_i64("x")? * 2)))
//!         .build(),
//! );
//! let args: Arguments = [("x", Value::Int(21))].into_iter().collect();
//! coordinator.submit(ExecutionTicket::new(double, args)).unwrap();
//!
//! let mut host = HeadlessHost::new();
//! while !coordinator.is_idle() {
//!     queue.wait_and_process(&mut host, Duration::from_millis(5));
//! }
//! assert!(host.events.contains(&ExecutionEvent::Result(Value::Int(42))));
//! ```

pub mod context;

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use formwright_core::{CancelFlag, ConnectionId, ProgressUpdate, Signal, Worker, WorkerConfig};
use parking_lot::Mutex;

use crate::error::{Error, FunctionExecutionError, Result};
use crate::host::{HostQueue, MessageKind, MessageRequest, UiHost};
use crate::signature::Callable;
use crate::value::{Arguments, Value};

pub use context::CallContext;

const TARGET: &str = "formwright::execution";

/// Where the coordinator is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionState {
    #[default]
    Idle,
    /// Submitted, not yet picked up by the worker.
    Starting,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl ExecutionState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    Started { function: String },
    Progress(ProgressUpdate),
    /// The function returned normally.
    Result(Value),
    /// The function failed or panicked.
    Error(FunctionExecutionError),
    /// The function returned after seeing a cancel request.
    Canceled,
    Finished,
}

impl ExecutionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Progress(_) => "progress",
            Self::Result(_) => "result",
            Self::Error(_) => "error",
            Self::Canceled => "canceled",
            Self::Finished => "finished",
        }
    }
}

/// What to tell the user about a run's outcome, besides the events.
///
/// Templates substitute `{result}` and `{error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub print_result: bool,
    pub show_result_dialog: bool,
    pub result_template: String,
    pub print_error: bool,
    pub show_error_dialog: bool,
    pub error_template: String,
    pub print_canceled: bool,
    pub canceled_message: String,
}

impl Default for ExecutionOutput {
    fn default() -> Self {
        Self {
            print_result: true,
            show_result_dialog: false,
            result_template: "Result: {result}\n".to_string(),
            print_error: true,
            show_error_dialog: true,
            error_template: "{error}\n".to_string(),
            print_canceled: true,
            canceled_message: "Canceled\n".to_string(),
        }
    }
}

impl ExecutionOutput {
    /// Report nothing beyond the events.
    pub fn silent() -> Self {
        Self {
            print_result: false,
            show_result_dialog: false,
            print_error: false,
            show_error_dialog: false,
            print_canceled: false,
            ..Self::default()
        }
    }

    fn report(&self, host: &mut dyn UiHost, event: &ExecutionEvent) {
        let outcome = match event {
            ExecutionEvent::Result(value) => {
                let text = self.result_template.replace("{result}", &value.to_string());
                self.emit(host, &text, self.print_result, self.show_result_dialog, MessageKind::Info)
            }
            ExecutionEvent::Error(error) => {
                let text = self.error_template.replace("{error}", &error.to_string());
                self.emit(host, &text, self.print_error, self.show_error_dialog, MessageKind::Error)
            }
            ExecutionEvent::Canceled if self.print_canceled => {
                host.append_output(&self.canceled_message, false, true)
            }
            _ => Ok(()),
        };
        if let Err(err) = outcome {
            tracing::warn!(target: TARGET, event = event.name(), error = %err, "failed to report outcome");
        }
    }

    fn emit(
        &self,
        host: &mut dyn UiHost,
        text: &str,
        print: bool,
        dialog: bool,
        kind: MessageKind,
    ) -> crate::host::HostResult<()> {
        if print {
            host.append_output(text, false, true)?;
        }
        if dialog {
            host.show_message(&MessageRequest::new(kind, text.trim_end()))?;
        }
        Ok(())
    }
}

type EventSink = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;
type ProgressSink = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// One run of a function with concrete arguments.
///
/// A ticket is consumed by [`ExecutionCoordinator::submit`]; a new run needs
/// a new ticket.
pub struct ExecutionTicket {
    callable: Arc<Callable>,
    arguments: Arguments,
    cancelable: bool,
    cancel: CancelFlag,
    output: ExecutionOutput,
    event_sink: Option<EventSink>,
    progress_sink: Option<ProgressSink>,
}

impl fmt::Debug for ExecutionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionTicket")
            .field("function", &self.callable.name())
            .field("arguments", &self.arguments)
            .field("cancelable", &self.cancelable)
            .finish()
    }
}

impl ExecutionTicket {
    /// A ticket running `callable` with a snapshot of `arguments`.
    pub fn new(callable: Arc<Callable>, arguments: Arguments) -> Self {
        Self {
            callable,
            arguments,
            cancelable: false,
            cancel: CancelFlag::new(),
            output: ExecutionOutput::default(),
            event_sink: None,
            progress_sink: None,
        }
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn output(mut self, output: ExecutionOutput) -> Self {
        self.output = output;
        self
    }

    /// Called on the UI thread for every event of this run.
    pub fn on_event<F>(mut self, sink: F) -> Self
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_sink = Some(Arc::new(sink));
        self
    }

    /// Called on the UI thread for every progress report of this run.
    pub fn on_progress<F>(mut self, sink: F) -> Self
    where
        F: Fn(&ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_sink = Some(Arc::new(sink));
        self
    }

    pub fn function_name(&self) -> &str {
        self.callable.name()
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// The flag that stops this run. Setting it is the only way the UI can
    /// influence a running ticket.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }
}

/// Settings for an [`ExecutionCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub worker: WorkerConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::with_name("formwright-exec"),
        }
    }
}

struct ActiveRun {
    function: String,
    cancel: CancelFlag,
    cancelable: bool,
}

#[derive(Default)]
struct CoordinatorState {
    state: ExecutionState,
    active: Option<ActiveRun>,
}

/// Runs tickets on a dedicated worker, one at a time.
pub struct ExecutionCoordinator {
    worker: Worker,
    queue: Arc<HostQueue>,
    shared: Arc<Mutex<CoordinatorState>>,
    events: Arc<Signal<ExecutionEvent>>,
}

impl fmt::Debug for ExecutionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionCoordinator")
            .field("worker", &self.worker.name())
            .field("state", &self.state())
            .finish()
    }
}

static_assertions::assert_impl_all!(ExecutionCoordinator: Send, Sync);

impl ExecutionCoordinator {
    /// A coordinator delivering to `queue`, which the UI thread drains.
    pub fn new(queue: Arc<HostQueue>) -> Result<Self> {
        Self::with_config(queue, CoordinatorConfig::default())
    }

    pub fn with_config(queue: Arc<HostQueue>, config: CoordinatorConfig) -> Result<Self> {
        Ok(Self {
            worker: Worker::with_config(config.worker)?,
            queue,
            shared: Arc::new(Mutex::new(CoordinatorState::default())),
            events: Arc::new(Signal::new()),
        })
    }

    pub fn queue(&self) -> &Arc<HostQueue> {
        &self.queue
    }

    /// Start running `ticket`.
    ///
    /// Fails with [`Error::CoordinatorBusy`] while another ticket has not
    /// finished; nothing is emitted in that case.
    pub fn submit(&self, ticket: ExecutionTicket) -> Result<()> {
        {
            let mut shared = self.shared.lock();
            if shared.state != ExecutionState::Idle {
                let running = shared
                    .active
                    .as_ref()
                    .map(|run| run.function.clone())
                    .unwrap_or_default();
                tracing::debug!(target: TARGET, %running, rejected = ticket.function_name(), "coordinator busy");
                return Err(Error::CoordinatorBusy { running });
            }
            shared.state = ExecutionState::Starting;
            shared.active = Some(ActiveRun {
                function: ticket.function_name().to_string(),
                cancel: ticket.cancel.clone(),
                cancelable: ticket.cancelable,
            });
        }

        tracing::debug!(target: TARGET, function = ticket.function_name(), "ticket submitted");
        let run = Run {
            queue: self.queue.clone(),
            shared: self.shared.clone(),
            events: self.events.clone(),
            ticket,
        };
        if let Err(err) = self.worker.send(move || run.execute()) {
            *self.shared.lock() = CoordinatorState::default();
            return Err(err.into());
        }
        Ok(())
    }

    /// Ask the running function to stop.
    ///
    /// Returns `false` when nothing cancelable is running.
    pub fn request_cancel(&self) -> bool {
        let shared = self.shared.lock();
        match &shared.active {
            Some(run) if run.cancelable && shared.state.is_active() => {
                run.cancel.cancel();
                tracing::debug!(target: TARGET, function = %run.function, "cancel requested");
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.shared.lock().state
    }

    pub fn is_idle(&self) -> bool {
        self.state() == ExecutionState::Idle
    }

    /// Whether the page's window may close. Refused while a ticket runs.
    pub fn can_close(&self) -> bool {
        self.is_idle()
    }

    /// Observe every event, on the UI thread.
    pub fn on_event<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.connect(slot)
    }

    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.events.disconnect(id)
    }
}

impl Drop for ExecutionCoordinator {
    fn drop(&mut self) {
        if let Some(run) = &self.shared.lock().active {
            run.cancel.cancel();
        }
        self.worker.stop();
    }
}

/// A ticket in flight, owned by the worker thread.
struct Run {
    queue: Arc<HostQueue>,
    shared: Arc<Mutex<CoordinatorState>>,
    events: Arc<Signal<ExecutionEvent>>,
    ticket: ExecutionTicket,
}

impl Run {
    fn execute(self) {
        let function = self.ticket.function_name().to_string();
        let delivery = Arc::new(Delivery {
            queue: self.queue.clone(),
            shared: self.shared.clone(),
            events: self.events.clone(),
            event_sink: self.ticket.event_sink.clone(),
            progress_sink: self.ticket.progress_sink.clone(),
            output: self.ticket.output.clone(),
        });

        self.shared.lock().state = ExecutionState::Running;
        tracing::debug!(target: TARGET, %function, "function started");
        delivery.deliver(ExecutionEvent::Started {
            function: function.clone(),
        });

        let progress = delivery.clone();
        let context = CallContext::build(
            function.clone(),
            Some(self.queue.clone()),
            self.ticket.cancel.clone(),
            self.ticket.cancelable,
            Some(Box::new(move |update: &ProgressUpdate| {
                progress.deliver(ExecutionEvent::Progress(update.clone()));
            })),
        );

        let callable = &self.ticket.callable;
        let arguments = &self.ticket.arguments;
        let outcome = context::enter(&context, || {
            catch_unwind(AssertUnwindSafe(|| callable.call(&context, arguments)))
        });

        let (state, event) = match outcome {
            Ok(Ok(_)) if context.cancel_observed() => {
                (ExecutionState::Canceled, ExecutionEvent::Canceled)
            }
            Ok(Ok(value)) => (ExecutionState::Succeeded, ExecutionEvent::Result(value)),
            Ok(Err(error)) => (
                ExecutionState::Failed,
                ExecutionEvent::Error(FunctionExecutionError::new(&function, error)),
            ),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(target: TARGET, %function, %message, "function panicked");
                (
                    ExecutionState::Failed,
                    ExecutionEvent::Error(FunctionExecutionError::panic(&function, message)),
                )
            }
        };

        tracing::debug!(target: TARGET, %function, outcome = event.name(), "function returned");
        self.shared.lock().state = state;
        delivery.deliver(event);
        delivery.deliver(ExecutionEvent::Finished);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "function panicked".to_string()
    }
}

/// Hands events to the UI thread.
struct Delivery {
    queue: Arc<HostQueue>,
    shared: Arc<Mutex<CoordinatorState>>,
    events: Arc<Signal<ExecutionEvent>>,
    event_sink: Option<EventSink>,
    progress_sink: Option<ProgressSink>,
    output: ExecutionOutput,
}

impl Delivery {
    fn deliver(self: &Arc<Self>, event: ExecutionEvent) {
        let delivery = self.clone();
        let finished = matches!(event, ExecutionEvent::Finished);
        let posted = self.queue.post(move |host| delivery.dispatch(host, &event));
        if let Err(err) = posted {
            tracing::warn!(target: TARGET, error = %err, "execution event dropped");
            if finished {
                self.finish();
            }
        }
    }

    fn dispatch(&self, host: &mut dyn UiHost, event: &ExecutionEvent) {
        tracing::trace!(target: TARGET, event = event.name(), "delivering execution event");
        host.on_execution_event(event);
        if let ExecutionEvent::Progress(update) = event
            && let Some(sink) = &self.progress_sink
        {
            sink(update);
        }
        if let Some(sink) = &self.event_sink {
            sink(event);
        }
        self.events.emit(event);
        self.output.report(host, event);
        if matches!(event, ExecutionEvent::Finished) {
            self.finish();
        }
    }

    fn finish(&self) {
        *self.shared.lock() = CoordinatorState::default();
    }
}
