//! Logging facilities for formwright.
//!
//! formwright uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in the host program:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("formwright=debug,formwright_core=info")
//!     .init();
//! ```
//!
//! Every event is emitted under one of the [`targets`] so individual
//! subsystems can be filtered.

/// Target names for log filtering.
pub mod targets {
    /// Core substrate target.
    pub const CORE: &str = "formwright_core";
    /// UI dispatch queue target.
    pub const DISPATCH: &str = "formwright_core::dispatch";
    /// Worker thread and cancellation target.
    pub const WORKER: &str = "formwright_core::worker";
    /// Signal emission target.
    pub const SIGNAL: &str = "formwright_core::signal";
    /// Signature parsing target.
    pub const SIGNATURE: &str = "formwright::signature";
    /// Docstring extraction target.
    pub const DOCSTRING: &str = "formwright::docstring";
    /// Widget registry target.
    pub const REGISTRY: &str = "formwright::registry";
    /// Config resolution target.
    pub const RESOLVER: &str = "formwright::resolver";
    /// Widget binding and harvesting target.
    pub const BINDING: &str = "formwright::binding";
    /// Function execution target.
    pub const EXECUTION: &str = "formwright::execution";
    /// Registration API target.
    pub const APP: &str = "formwright::app";
}

/// A guard that traces the duration of an operation.
///
/// ```
/// use formwright_core::logging::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("resolve_page");
///     // ... work ...
/// } // span closes here
/// ```
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a performance span named after `operation`.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::info_span!(target: "formwright::perf", "perf", operation);
        Self {
            _span: span.entered(),
        }
    }
}

/// Trace-level event under the core target, or under `target:` when given.
#[macro_export]
macro_rules! fw_trace {
    (target: $target:expr, $($arg:tt)*) => {
        tracing::trace!(target: $target, $($arg)*)
    };
    ($($arg:tt)*) => {
        tracing::trace!(target: "formwright_core", $($arg)*)
    };
}

/// Debug-level event under the core target.
#[macro_export]
macro_rules! fw_debug {
    (target: $target:expr, $($arg:tt)*) => {
        tracing::debug!(target: $target, $($arg)*)
    };
    ($($arg:tt)*) => {
        tracing::debug!(target: "formwright_core", $($arg)*)
    };
}

/// Info-level event under the core target.
#[macro_export]
macro_rules! fw_info {
    (target: $target:expr, $($arg:tt)*) => {
        tracing::info!(target: $target, $($arg)*)
    };
    ($($arg:tt)*) => {
        tracing::info!(target: "formwright_core", $($arg)*)
    };
}

/// Warn-level event under the core target.
#[macro_export]
macro_rules! fw_warn {
    (target: $target:expr, $($arg:tt)*) => {
        tracing::warn!(target: $target, $($arg)*)
    };
    ($($arg:tt)*) => {
        tracing::warn!(target: "formwright_core", $($arg)*)
    };
}

/// Error-level event under the core target.
#[macro_export]
macro_rules! fw_error {
    (target: $target:expr, $($arg:tt)*) => {
        tracing::error!(target: $target, $($arg)*)
    };
    ($($arg:tt)*) => {
        tracing::error!(target: "formwright_core", $($arg)*)
    };
}
