//! The widget contract.
//!
//! Every widget kind is produced by a [`WidgetFactory`] and yields an
//! [`InputWidget`]. The library only talks to widgets through this trait,
//! so the same resolution and binding logic drives any UI backend.
//!
//! A widget must hold a value of its kind's type at all times: after
//! `set_value(v)` succeeds, `get_value()` returns a value that passes
//! `check_value_type`.

use std::any::Any;

use crate::error::Result;
use crate::value::{Table, Value};

/// An input control bound to one parameter.
///
/// Widgets live on the UI thread and are never shared across threads.
pub trait InputWidget {
    /// The parameter this widget edits.
    fn parameter_name(&self) -> &str;

    /// The registered kind name that produced this widget.
    fn kind(&self) -> &str;

    /// Replace the current value. Fails if the value has the wrong type.
    fn set_value(&mut self, value: Value) -> Result<()>;

    /// The current value.
    fn get_value(&self) -> Result<Value>;

    /// Fail with [`Error::ValueType`](crate::Error::ValueType) unless
    /// `value` has a type this widget can hold.
    fn check_value_type(&self, value: &Value) -> Result<()>;

    /// Why the current input is invalid, or `None` when it is acceptable.
    fn validation_error(&self) -> Option<String> {
        None
    }

    /// Whether the current input is acceptable.
    fn validate(&self) -> bool {
        self.validation_error().is_none()
    }

    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Mark the widget as holding invalid input.
    fn highlight(&mut self);

    /// Remove the invalid-input mark.
    fn clear_highlight(&mut self) {}

    fn as_any(&self) -> &dyn Any;
}

/// Creates widgets of one kind.
///
/// `parent` is the backend's container object, if any; backends downcast it
/// to their own type.
pub trait WidgetFactory: Send + Sync {
    fn create(
        &self,
        parent: Option<&dyn Any>,
        parameter_name: &str,
        options: &Table,
    ) -> Result<Box<dyn InputWidget>>;
}

impl<F> WidgetFactory for F
where
    F: Fn(Option<&dyn Any>, &str, &Table) -> Result<Box<dyn InputWidget>> + Send + Sync,
{
    fn create(
        &self,
        parent: Option<&dyn Any>,
        parameter_name: &str,
        options: &Table,
    ) -> Result<Box<dyn InputWidget>> {
        self(parent, parameter_name, options)
    }
}
