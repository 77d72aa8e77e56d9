//! Error types for formwright.

use std::fmt;

use formwright_core::{DispatchError, WorkerError};

/// Result type alias for formwright operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while introspecting, resolving, binding or running a function.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The callable cannot be turned into a form.
    #[error("Invalid callable '{name}': {reason}")]
    InvalidCallable { name: String, reason: String },

    /// A variadic parameter (`*args` / `**kwargs`) has no widget mapping.
    #[error("Parameter '{parameter}' of '{function}' is {kind} and cannot be bound to a widget")]
    UnsupportedParameter {
        function: String,
        parameter: String,
        kind: String,
    },

    /// A type annotation could not be parsed.
    #[error("Invalid type annotation '{annotation}': {reason}")]
    TypeAnnotation { annotation: String, reason: String },

    /// The `@params` region of a docstring is not a valid table of tables.
    #[error("Malformed @params block: {message}\n{region}")]
    DocstringConfig { message: String, region: String },

    /// A widget kind name is not registered.
    #[error("Unknown widget kind '{0}'")]
    UnknownWidgetKind(String),

    /// No widget kind is registered for a type, and no fallback exists.
    #[error("No widget registered for type '{type_name}'")]
    NoWidgetForType { type_name: String },

    /// A widget kind name was registered twice.
    #[error("Widget kind '{0}' is already registered")]
    AlreadyRegistered(String),

    /// A schema redeclares a reserved option with an incompatible type.
    #[error("Widget kind '{kind}' redeclares reserved option '{option}' as {declared}, expected {reserved}")]
    SchemaConflict {
        kind: String,
        option: String,
        declared: String,
        reserved: String,
    },

    /// A resolved option is unknown to the schema or has the wrong type.
    #[error("Invalid option '{key}' for {kind}: {reason}")]
    ConfigValidation {
        kind: String,
        key: String,
        reason: String,
    },

    /// A widget factory or widget instance broke the widget contract.
    #[error("Widget {kind} for '{parameter}' violates the widget contract: {reason}")]
    WidgetContract {
        parameter: String,
        kind: String,
        reason: String,
    },

    /// A widget was handed a value of the wrong type.
    #[error("Parameter '{parameter}' expects {expected}, got {actual}")]
    ValueType {
        parameter: String,
        expected: String,
        actual: String,
    },

    /// One or more widgets hold invalid input.
    #[error("Invalid parameter values: {}", format_failures(.failures))]
    ParameterValidation { failures: Vec<ParameterFailure> },

    /// A ticket was submitted while another one is in flight.
    #[error("A function is already running: '{running}'")]
    CoordinatorBusy { running: String },

    /// The function body failed.
    #[error(transparent)]
    FunctionExecution(#[from] FunctionExecutionError),

    /// A side-channel request was refused by the UI host.
    #[error("UI operation '{operation}' failed: {message}")]
    SideChannel { operation: String, message: String },

    /// The UI dispatch queue could not deliver a request.
    #[error("UI dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The worker thread could not accept a ticket.
    #[error("Worker unavailable: {0}")]
    Worker(#[from] WorkerError),

    /// A side-channel function was called outside a running function body.
    #[error("Not inside a running function")]
    NotInFunctionContext,

    /// `run` was called on an app with no pages.
    #[error("No functions have been added")]
    NoFunctions,

    /// A page handle does not belong to this app.
    #[error("Unknown page handle")]
    UnknownPage,

    /// A widget overlay could not be parsed as TOML.
    #[error("Failed to parse widget configs: {0}")]
    OverlayParse(#[from] toml::de::Error),

    /// A typed widget config could not be converted into options.
    #[error("Failed to convert widget config: {0}")]
    OverlaySerialize(#[from] toml::ser::Error),

    /// Another error, attributed to a parameter.
    #[error("Parameter '{name}': {source}")]
    Parameter {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn invalid_callable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCallable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn type_annotation(annotation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeAnnotation {
            annotation: annotation.into(),
            reason: reason.into(),
        }
    }

    pub fn config_validation(
        kind: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConfigValidation {
            kind: kind.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn widget_contract(
        parameter: impl Into<String>,
        kind: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::WidgetContract {
            parameter: parameter.into(),
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    pub fn value_type(
        parameter: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ValueType {
            parameter: parameter.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn side_channel(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SideChannel {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Attach a parameter name to this error.
    pub fn for_parameter(self, name: impl Into<String>) -> Self {
        Self::Parameter {
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// The error beneath any parameter attribution.
    pub fn root(&self) -> &Error {
        match self {
            Self::Parameter { source, .. } => source.root(),
            other => other,
        }
    }

    /// The parameter this error is attributed to, if any.
    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            Self::Parameter { name, .. } => Some(name),
            Self::WidgetContract { parameter, .. } | Self::ValueType { parameter, .. } => {
                Some(parameter)
            }
            _ => None,
        }
    }
}

/// Why one parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterFailure {
    pub parameter: String,
    pub reason: String,
}

impl ParameterFailure {
    pub fn new(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

fn format_failures(failures: &[ParameterFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.parameter, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The error a function body returns.
///
/// `kind` names the error class shown to the user (for example
/// `"ValueError"`); `message` is its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionError {
    pub kind: String,
    pub message: String,
}

impl FunctionError {
    /// An error with the generic `"Error"` kind.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind("Error", message)
    }

    pub fn with_kind(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FunctionError {}

impl From<Error> for FunctionError {
    fn from(err: Error) -> Self {
        let kind = match err.root() {
            Error::SideChannel { .. } | Error::Dispatch(_) => "SideChannelError",
            Error::NotInFunctionContext => "ContextError",
            Error::ValueType { .. } => "TypeError",
            _ => "Error",
        };
        Self::with_kind(kind, err.to_string())
    }
}

impl From<String> for FunctionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for FunctionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A function body failure, as reported to the UI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FunctionExecutionError {
    /// Name of the function that failed.
    pub function: String,
    /// Error class, `"panic"` when the body panicked.
    pub kind: String,
    pub message: String,
}

impl FunctionExecutionError {
    pub fn new(function: impl Into<String>, error: FunctionError) -> Self {
        Self {
            function: function.into(),
            kind: error.kind,
            message: error.message,
        }
    }

    pub(crate) fn panic(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            kind: "panic".to_string(),
            message: message.into(),
        }
    }
}
