//! The side channel a running function talks to the UI through.
//!
//! Every request is queued onto the page's [`HostQueue`] and the calling
//! worker blocks until the UI thread has answered it. Requests from one
//! function are therefore handled strictly in the order they were made.
//!
//! Besides the [`CallContext`] handed to every function body, the same
//! operations are available as free functions that find the context of the
//! function running on the current thread:
//!
//! ```
//! use formwright::execution::context;
//!
//! // Outside a running function there is no context.
//! assert!(context::uprint("hello").is_err());
//! assert!(!context::is_cancel_requested());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use formwright_core::{CancelFlag, ProgressUpdate};

use crate::error::{Error, Result};
use crate::host::{
    HostQueue, HostResult, InputRequest, MessageKind, MessageRequest, StandardButton, UiHost,
};
use crate::value::Value;

const TARGET: &str = "formwright::execution";

/// How long a toast stays visible unless told otherwise.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(3);

type ProgressEmitter = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;

struct ContextInner {
    function: String,
    queue: Option<Arc<HostQueue>>,
    cancel: CancelFlag,
    cancelable: bool,
    cancel_observed: AtomicBool,
    on_progress: Option<ProgressEmitter>,
}

/// A running function's handle to the UI.
#[derive(Clone)]
pub struct CallContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("function", &self.inner.function)
            .field("attached", &self.inner.queue.is_some())
            .field("cancelable", &self.inner.cancelable)
            .finish()
    }
}

impl CallContext {
    /// A context whose requests go to `queue`.
    pub fn new(function: impl Into<String>, queue: Arc<HostQueue>, cancel: CancelFlag) -> Self {
        Self::build(function.into(), Some(queue), cancel, true, None)
    }

    /// A context with no UI behind it. Every UI request fails with
    /// [`Error::NotInFunctionContext`]; cancellation still works.
    pub fn detached(function: impl Into<String>) -> Self {
        Self::build(function.into(), None, CancelFlag::new(), true, None)
    }

    pub(crate) fn build(
        function: String,
        queue: Option<Arc<HostQueue>>,
        cancel: CancelFlag,
        cancelable: bool,
        on_progress: Option<ProgressEmitter>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                function,
                queue,
                cancel,
                cancelable,
                cancel_observed: AtomicBool::new(false),
                on_progress,
            }),
        }
    }

    /// Name of the running function.
    pub fn function_name(&self) -> &str {
        &self.inner.function
    }

    /// Whether the user asked the function to stop.
    ///
    /// Always `false` for functions registered as not cancelable.
    pub fn is_cancel_requested(&self) -> bool {
        if !self.inner.cancelable {
            return false;
        }
        let requested = self.inner.cancel.is_cancelled();
        if requested {
            self.inner.cancel_observed.store(true, Ordering::Release);
        }
        requested
    }

    /// Whether the function has seen a cancel request.
    pub(crate) fn cancel_observed(&self) -> bool {
        self.inner.cancel_observed.load(Ordering::Acquire)
    }

    fn host_call<R, F>(&self, operation: &'static str, request: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut (dyn UiHost + 'static)) -> HostResult<R> + Send + 'static,
    {
        let queue = self.inner.queue.as_ref().ok_or(Error::NotInFunctionContext)?;
        tracing::trace!(target: TARGET, function = %self.inner.function, operation, "side-channel request");
        queue
            .call(request)?
            .map_err(|e| Error::side_channel(operation, e.to_string()))
    }

    /// Print a line of plain text to the output area.
    pub fn uprint(&self, text: impl fmt::Display) -> Result<()> {
        self.uprint_with(format!("{text}\n"), false, true)
    }

    /// Print a line of HTML to the output area.
    pub fn uprint_html(&self, html: impl fmt::Display) -> Result<()> {
        self.uprint_with(format!("{html}\n"), true, true)
    }

    /// Append `text` verbatim.
    pub fn uprint_with(&self, text: impl Into<String>, html: bool, scroll: bool) -> Result<()> {
        let text = text.into();
        self.host_call("uprint", move |host| host.append_output(&text, html, scroll))
    }

    pub fn clear_output(&self) -> Result<()> {
        self.host_call("clear_output", |host| host.clear_output())
    }

    /// Report progress. A negative `total` shows a busy indicator.
    pub fn show_progress(&self, update: ProgressUpdate) -> Result<()> {
        let shown = update.clone();
        self.host_call("show_progress", move |host| host.show_progress(&shown))?;
        if let Some(emit) = &self.inner.on_progress {
            emit(&update);
        }
        Ok(())
    }

    pub fn show_message(&self, request: MessageRequest) -> Result<StandardButton> {
        self.host_call("show_message", move |host| host.show_message(&request))
    }

    pub fn show_info_dialog(&self, text: impl Into<String>) -> Result<StandardButton> {
        self.show_message(MessageRequest::new(MessageKind::Info, text))
    }

    pub fn show_warning_dialog(&self, text: impl Into<String>) -> Result<StandardButton> {
        self.show_message(MessageRequest::new(MessageKind::Warning, text))
    }

    pub fn show_error_dialog(&self, text: impl Into<String>) -> Result<StandardButton> {
        self.show_message(MessageRequest::new(MessageKind::Error, text))
    }

    pub fn show_question_dialog(&self, text: impl Into<String>) -> Result<StandardButton> {
        self.show_message(MessageRequest::new(MessageKind::Question, text))
    }

    /// Ask for a value. `None` means the user cancelled the dialog.
    pub fn get_input(&self, request: InputRequest) -> Result<Option<Value>> {
        let operation = request.operation();
        self.host_call(operation, move |host| host.get_input(&request))
    }

    pub fn get_text(&self, label: impl Into<String>) -> Result<Option<String>> {
        let request = InputRequest::Text {
            title: String::new(),
            label: label.into(),
            default: String::new(),
            password: false,
        };
        self.typed_input(request, |v| v.as_str().map(str::to_string))
    }

    pub fn get_int(&self, label: impl Into<String>, value: i64) -> Result<Option<i64>> {
        let request = InputRequest::Int {
            title: String::new(),
            label: label.into(),
            value,
            min: i64::from(i32::MIN),
            max: i64::from(i32::MAX),
            step: 1,
        };
        self.typed_input(request, Value::as_i64)
    }

    pub fn get_float(&self, label: impl Into<String>, value: f64) -> Result<Option<f64>> {
        let request = InputRequest::Float {
            title: String::new(),
            label: label.into(),
            value,
            min: f64::from(i32::MIN),
            max: f64::from(i32::MAX),
            decimals: 2,
        };
        self.typed_input(request, Value::as_f64)
    }

    /// Let the user pick one of `items`.
    pub fn get_item<I, S>(&self, label: impl Into<String>, items: I) -> Result<Option<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = InputRequest::Item {
            title: String::new(),
            label: label.into(),
            items: items.into_iter().map(Into::into).collect(),
            current: 0,
            editable: false,
        };
        self.typed_input(request, |v| v.as_str().map(str::to_string))
    }

    pub fn get_file(
        &self,
        title: impl Into<String>,
        filters: impl Into<String>,
    ) -> Result<Option<String>> {
        let request = InputRequest::File {
            title: title.into(),
            start_dir: String::new(),
            filters: filters.into(),
            save: false,
        };
        self.typed_input(request, |v| v.as_str().map(str::to_string))
    }

    pub fn get_dir(&self, title: impl Into<String>) -> Result<Option<String>> {
        let request = InputRequest::Dir {
            title: title.into(),
            start_dir: String::new(),
        };
        self.typed_input(request, |v| v.as_str().map(str::to_string))
    }

    fn typed_input<T>(
        &self,
        request: InputRequest,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<Option<T>> {
        let operation = request.operation();
        match self.get_input(request)? {
            None => Ok(None),
            Some(value) => convert(&value).map(Some).ok_or_else(|| {
                Error::side_channel(
                    operation,
                    format!("host answered with a value of type {}", value.type_name()),
                )
            }),
        }
    }

    pub fn show_toast(&self, message: impl Into<String>, duration: Duration) -> Result<()> {
        let message = message.into();
        self.host_call("show_toast", move |host| host.show_toast(&message, duration))
    }

    pub fn clipboard_get(&self) -> Result<String> {
        self.host_call("clipboard_get", |host| host.clipboard_get())
    }

    pub fn clipboard_set(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.host_call("clipboard_set", move |host| host.clipboard_set(&text))
    }
}

thread_local! {
    static CURRENT: RefCell<Option<CallContext>> = const { RefCell::new(None) };
}

/// Restores the previous context when dropped, panics included.
struct ContextGuard {
    previous: Option<CallContext>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Run `f` with `context` as the current thread's context.
pub(crate) fn enter<R>(context: &CallContext, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|current| current.borrow_mut().replace(context.clone()));
    let _guard = ContextGuard { previous };
    f()
}

/// The context of the function running on this thread.
pub fn current() -> Result<CallContext> {
    CURRENT
        .with(|current| current.borrow().clone())
        .ok_or(Error::NotInFunctionContext)
}

/// See [`CallContext::uprint`].
pub fn uprint(text: impl fmt::Display) -> Result<()> {
    current()?.uprint(text)
}

pub fn uprint_html(html: impl fmt::Display) -> Result<()> {
    current()?.uprint_html(html)
}

pub fn clear_output() -> Result<()> {
    current()?.clear_output()
}

/// `false` outside a running function.
pub fn is_cancel_requested() -> bool {
    current().is_ok_and(|context| context.is_cancel_requested())
}

pub fn show_progress(current_step: i64, total: i64, message: Option<&str>) -> Result<()> {
    let mut update = ProgressUpdate::new(current_step, total);
    if let Some(message) = message {
        update = update.with_message(message);
    }
    current()?.show_progress(update)
}

pub fn show_info_dialog(text: impl Into<String>) -> Result<StandardButton> {
    current()?.show_info_dialog(text)
}

pub fn show_warning_dialog(text: impl Into<String>) -> Result<StandardButton> {
    current()?.show_warning_dialog(text)
}

pub fn show_error_dialog(text: impl Into<String>) -> Result<StandardButton> {
    current()?.show_error_dialog(text)
}

pub fn show_question_dialog(text: impl Into<String>) -> Result<StandardButton> {
    current()?.show_question_dialog(text)
}

pub fn get_text(label: impl Into<String>) -> Result<Option<String>> {
    current()?.get_text(label)
}

pub fn get_int(label: impl Into<String>, value: i64) -> Result<Option<i64>> {
    current()?.get_int(label, value)
}

pub fn get_float(label: impl Into<String>, value: f64) -> Result<Option<f64>> {
    current()?.get_float(label, value)
}

pub fn get_item<I, S>(label: impl Into<String>, items: I) -> Result<Option<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    current()?.get_item(label, items)
}

pub fn get_file(title: impl Into<String>, filters: impl Into<String>) -> Result<Option<String>> {
    current()?.get_file(title, filters)
}

pub fn get_dir(title: impl Into<String>) -> Result<Option<String>> {
    current()?.get_dir(title)
}

pub fn show_toast(message: impl Into<String>, duration: Duration) -> Result<()> {
    current()?.show_toast(message, duration)
}

pub fn clipboard_get() -> Result<String> {
    current()?.clipboard_get()
}

pub fn clipboard_set(text: impl Into<String>) -> Result<()> {
    current()?.clipboard_set(text)
}
