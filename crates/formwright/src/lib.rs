//! Turn plain functions into input forms.
//!
//! formwright describes a function's parameters, picks an input widget for
//! each one, and runs the function in the background with the values the
//! user entered:
//!
//! - **Signatures**: callables and their parameter declarations become a
//!   [`FunctionInfo`](signature::FunctionInfo) ([`signature`])
//! - **Docstrings**: prose, parameter descriptions and an embedded `@params`
//!   TOML block of widget options ([`docstring`])
//! - **Registry**: widget kinds, their option schemas and the default kind
//!   for each type ([`registry`])
//! - **Resolution**: schema defaults, docstring and caller options merged into
//!   one [`WidgetPlan`](resolver::WidgetPlan) per parameter ([`resolver`])
//! - **Binding**: widgets built from plans and harvested into arguments
//!   ([`binding`])
//! - **Execution**: one background run at a time, with ordered events,
//!   cooperative cancellation and blocking UI requests ([`execution`])
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use formwright::prelude::*;
//!
//! let registry = WidgetRegistry::with_builtins();
//! let scale = Callable::parse("def scale(image: file, quality: int = 80)")
//!     .unwrap()
//!     .docstring(
//!         "Scale an image.\n\n@params\n[quality]\nmin_value = 10\nmax_value = 100\n@end",
//!     )
//!     .body(|_ctx, _args| Ok(Value::None))
//!     .build();
//!
//! let doc = Docstring::extract(scale.docstring()).unwrap();
//! let info = SignatureParser::new().parse_with_docstring(&scale, &doc).unwrap();
//! let plan = ConfigResolver::new(&registry)
//!     .resolve(&info, &doc.overlays, &Overlays::new())
//!     .unwrap();
//!
//! let quality = plan.get("quality").unwrap();
//! assert_eq!(quality.widget_kind, "IntSpinBox");
//! assert_eq!(quality.initial_value, Value::Int(80));
//! assert_eq!(quality.options["max_value"], Value::Int(100));
//! ```

pub mod app;
pub mod binding;
pub mod config;
pub mod docstring;
pub mod execution;
pub mod host;
pub mod registry;
pub mod resolver;
pub mod signature;
pub mod types;
pub mod value;
pub mod widget;

mod error;

pub use error::{Error, FunctionError, FunctionExecutionError, ParameterFailure, Result};
pub use execution::context::{
    clear_output, clipboard_get, clipboard_set, get_dir, get_file, get_float, get_int, get_item,
    get_text, is_cancel_requested, show_error_dialog, show_info_dialog, show_progress,
    show_question_dialog, show_toast, show_warning_dialog, uprint, uprint_html,
};
pub use value::{Arguments, Table, Value};

pub use formwright_core::{CancelFlag, ProgressUpdate};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::app::{AddOptions, FormApp, PageHandle, RunOptions, UiBackend};
    pub use crate::binding::{BoundPage, bind_page};
    pub use crate::config::{CommonOptions, WidgetConfig};
    pub use crate::docstring::Docstring;
    pub use crate::execution::{
        CallContext, ExecutionCoordinator, ExecutionEvent, ExecutionOutput, ExecutionState,
        ExecutionTicket,
    };
    pub use crate::host::{HostQueue, UiHost};
    pub use crate::registry::{ConfigSchema, OptionSpec, OptionType, TypeKey, WidgetRegistry};
    pub use crate::resolver::{ConfigResolver, Overlays, PagePlan, WidgetPlan};
    pub use crate::signature::{Callable, FunctionInfo, ParameterDecl, ParameterInfo, SignatureParser};
    pub use crate::widget::{InputWidget, WidgetFactory};
    pub use crate::{Arguments, Error, FunctionError, Result, Table, Value};
}
