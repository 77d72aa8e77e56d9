//! Progress updates reported by running functions.
//!
//! A function reports progress as `(current, total, message)`. A negative
//! `total` marks the bar as indeterminate (a busy indicator with no known
//! end).
//!
//! ```
//! use formwright_core::progress::ProgressUpdate;
//!
//! let update = ProgressUpdate::new(25, 100).with_message("Resizing images");
//! assert_eq!(update.fraction(), Some(0.25));
//!
//! let busy = ProgressUpdate::indeterminate("Waiting for server");
//! assert!(busy.is_indeterminate());
//! assert_eq!(busy.fraction(), None);
//! ```

use std::fmt;

/// A single progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Units of work completed.
    pub current: i64,
    /// Total units of work; negative when indeterminate.
    pub total: i64,
    /// Optional status message describing the current step.
    pub message: Option<String>,
}

impl ProgressUpdate {
    /// Create an update without a message.
    pub fn new(current: i64, total: i64) -> Self {
        Self {
            current,
            total,
            message: None,
        }
    }

    /// Create an indeterminate update with a message.
    pub fn indeterminate(message: impl Into<String>) -> Self {
        Self {
            current: 0,
            total: -1,
            message: Some(message.into()),
        }
    }

    /// Attach a status message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether the total amount of work is unknown.
    pub fn is_indeterminate(&self) -> bool {
        self.total < 0
    }

    /// Completed fraction clamped to `0.0..=1.0`.
    ///
    /// `None` for indeterminate updates. A zero total counts as complete.
    pub fn fraction(&self) -> Option<f64> {
        if self.is_indeterminate() {
            return None;
        }
        if self.total == 0 {
            return Some(1.0);
        }
        Some((self.current as f64 / self.total as f64).clamp(0.0, 1.0))
    }
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_indeterminate() {
            write!(f, "{}", self.current)?;
        } else {
            write!(f, "{}/{}", self.current, self.total)?;
        }
        if let Some(message) = &self.message {
            write!(f, " {message}")?;
        }
        Ok(())
    }
}
