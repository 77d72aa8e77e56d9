//! The UI side of side-channel calls.
//!
//! A running function never touches the UI directly. Its requests are queued
//! onto a [`HostQueue`] and the UI thread answers them through a [`UiHost`],
//! one at a time and in submission order. A UI backend implements `UiHost`
//! on top of its toolkit; [`HeadlessHost`] answers from a script and keeps a
//! transcript, which is all a test or a terminal frontend needs.

use std::collections::VecDeque;
use std::time::Duration;

use formwright_core::{ProgressUpdate, UiQueue};

use crate::execution::ExecutionEvent;
use crate::value::Value;

/// The queue side-channel requests travel on.
pub type HostQueue = UiQueue<dyn UiHost>;

/// Result type for host handlers.
pub type HostResult<T> = std::result::Result<T, HostError>;

/// A host handler refused or failed a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("'{0}' is not supported by this host")]
    Unsupported(&'static str),
    #[error("{0}")]
    Failed(String),
}

impl HostError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Severity of a message dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Info,
    Warning,
    Error,
    Question,
}

/// Buttons a message dialog can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardButton {
    Ok,
    Cancel,
    Yes,
    No,
    Abort,
    Retry,
    Ignore,
    Close,
}

/// A message dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRequest {
    pub kind: MessageKind,
    pub title: String,
    pub text: String,
    pub buttons: Vec<StandardButton>,
    pub default_button: Option<StandardButton>,
}

impl MessageRequest {
    /// A dialog of `kind` with the buttons usual for it.
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        let (title, buttons) = match kind {
            MessageKind::Info => ("Info", vec![StandardButton::Ok]),
            MessageKind::Warning => ("Warning", vec![StandardButton::Ok]),
            MessageKind::Error => ("Error", vec![StandardButton::Ok]),
            MessageKind::Question => ("Question", vec![StandardButton::Yes, StandardButton::No]),
        };
        Self {
            kind,
            title: title.to_string(),
            text: text.into(),
            default_button: buttons.first().copied(),
            buttons,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn buttons(mut self, buttons: impl IntoIterator<Item = StandardButton>) -> Self {
        self.buttons = buttons.into_iter().collect();
        self
    }

    pub fn default_button(mut self, button: StandardButton) -> Self {
        self.default_button = Some(button);
        self
    }
}

/// A request for one value from the user.
///
/// The host answers with `Some(value)` or `None` when the user cancels.
#[derive(Debug, Clone, PartialEq)]
pub enum InputRequest {
    Text {
        title: String,
        label: String,
        default: String,
        password: bool,
    },
    Int {
        title: String,
        label: String,
        value: i64,
        min: i64,
        max: i64,
        step: i64,
    },
    Float {
        title: String,
        label: String,
        value: f64,
        min: f64,
        max: f64,
        decimals: u32,
    },
    Item {
        title: String,
        label: String,
        items: Vec<String>,
        current: usize,
        editable: bool,
    },
    File {
        title: String,
        start_dir: String,
        filters: String,
        save: bool,
    },
    Dir {
        title: String,
        start_dir: String,
    },
}

impl InputRequest {
    /// The side-channel operation this request belongs to.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Text { .. } => "get_text",
            Self::Int { .. } => "get_int",
            Self::Float { .. } => "get_float",
            Self::Item { .. } => "get_item",
            Self::File { .. } => "get_file",
            Self::Dir { .. } => "get_dir",
        }
    }
}

/// UI-thread handlers for everything a running function may ask for.
///
/// Only output and message dialogs are mandatory; the other requests fail
/// with [`HostError::Unsupported`] unless the host overrides them.
pub trait UiHost {
    /// Append text to the page's output area.
    fn append_output(&mut self, text: &str, html: bool, scroll: bool) -> HostResult<()>;

    fn clear_output(&mut self) -> HostResult<()>;

    /// Show a modal message and return the button the user picked.
    fn show_message(&mut self, request: &MessageRequest) -> HostResult<StandardButton>;

    fn show_progress(&mut self, _update: &ProgressUpdate) -> HostResult<()> {
        Ok(())
    }

    fn get_input(&mut self, _request: &InputRequest) -> HostResult<Option<Value>> {
        Err(HostError::Unsupported("get_input"))
    }

    fn show_toast(&mut self, _message: &str, _duration: Duration) -> HostResult<()> {
        Err(HostError::Unsupported("show_toast"))
    }

    fn clipboard_get(&mut self) -> HostResult<String> {
        Err(HostError::Unsupported("clipboard_get"))
    }

    fn clipboard_set(&mut self, _text: &str) -> HostResult<()> {
        Err(HostError::Unsupported("clipboard_set"))
    }

    /// Called on the UI thread for every execution event, in order.
    fn on_execution_event(&mut self, _event: &ExecutionEvent) {}
}

/// A host without a screen.
///
/// Output accumulates in [`output`](Self::output), dialogs and inputs are
/// answered from scripted queues, and every execution event is recorded.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    pub output: String,
    pub messages: Vec<MessageRequest>,
    pub progress: Vec<ProgressUpdate>,
    pub toasts: Vec<String>,
    pub events: Vec<ExecutionEvent>,
    pub clipboard: String,
    answers: VecDeque<Option<Value>>,
    buttons: VecDeque<StandardButton>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next input request.
    pub fn answer(mut self, value: impl Into<Value>) -> Self {
        self.answers.push_back(Some(value.into()));
        self
    }

    /// Make the next input request look cancelled by the user.
    pub fn dismiss(mut self) -> Self {
        self.answers.push_back(None);
        self
    }

    /// Queue the button the next message dialog returns.
    pub fn press(mut self, button: StandardButton) -> Self {
        self.buttons.push_back(button);
        self
    }

    /// Whether a `finished` event has been recorded.
    pub fn is_finished(&self) -> bool {
        matches!(self.events.last(), Some(ExecutionEvent::Finished))
    }
}

impl UiHost for HeadlessHost {
    fn append_output(&mut self, text: &str, _html: bool, _scroll: bool) -> HostResult<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn clear_output(&mut self) -> HostResult<()> {
        self.output.clear();
        Ok(())
    }

    fn show_message(&mut self, request: &MessageRequest) -> HostResult<StandardButton> {
        self.messages.push(request.clone());
        match self.buttons.pop_front() {
            Some(button) => Ok(button),
            None => request
                .default_button
                .or_else(|| request.buttons.first().copied())
                .ok_or_else(|| HostError::failed("message has no buttons")),
        }
    }

    fn show_progress(&mut self, update: &ProgressUpdate) -> HostResult<()> {
        self.progress.push(update.clone());
        Ok(())
    }

    fn get_input(&mut self, request: &InputRequest) -> HostResult<Option<Value>> {
        self.answers.pop_front().ok_or_else(|| {
            HostError::failed(format!("no scripted answer for {}", request.operation()))
        })
    }

    fn show_toast(&mut self, message: &str, _duration: Duration) -> HostResult<()> {
        self.toasts.push(message.to_string());
        Ok(())
    }

    fn clipboard_get(&mut self) -> HostResult<String> {
        Ok(self.clipboard.clone())
    }

    fn clipboard_set(&mut self, text: &str) -> HostResult<()> {
        self.clipboard = text.to_string();
        Ok(())
    }

    fn on_execution_event(&mut self, event: &ExecutionEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_defaults() {
        let request = MessageRequest::new(MessageKind::Question, "Continue?");
        assert_eq!(request.buttons, vec![StandardButton::Yes, StandardButton::No]);
        assert_eq!(request.default_button, Some(StandardButton::Yes));
        assert_eq!(request.title, "Question");
    }

    #[test]
    fn test_headless_host_scripts() {
        let mut host = HeadlessHost::new()
            .answer("Ada")
            .dismiss()
            .press(StandardButton::No);
        let text = InputRequest::Text {
            title: String::new(),
            label: "name?".into(),
            default: String::new(),
            password: false,
        };
        assert_eq!(host.get_input(&text).unwrap(), Some(Value::from("Ada")));
        assert_eq!(host.get_input(&text).unwrap(), None);
        assert!(host.get_input(&text).is_err());

        let question = MessageRequest::new(MessageKind::Question, "Sure?");
        assert_eq!(host.show_message(&question).unwrap(), StandardButton::No);
        assert_eq!(host.show_message(&question).unwrap(), StandardButton::Yes);
    }

    #[test]
    fn test_default_handlers_are_unsupported() {
        struct Minimal;
        impl UiHost for Minimal {
            fn append_output(&mut self, _: &str, _: bool, _: bool) -> HostResult<()> {
                Ok(())
            }
            fn clear_output(&mut self) -> HostResult<()> {
                Ok(())
            }
            fn show_message(&mut self, _: &MessageRequest) -> HostResult<StandardButton> {
                Ok(StandardButton::Ok)
            }
        }
        let mut host = Minimal;
        assert_eq!(host.clipboard_get(), Err(HostError::Unsupported("clipboard_get")));
        assert!(host.show_progress(&ProgressUpdate::new(1, 2)).is_ok());
    }
}
