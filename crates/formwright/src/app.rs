//! Registering functions and handing them to a UI backend.
//!
//! ```
//! use formwright::app::{AddOptions, FormApp};
//! use formwright::signature::Callable;
//! use formwright::Value;
//!
//! let mut app = FormApp::new();
//! let greet = Callable::parse("def greet(name: str, times: int = 1)")
//!     .unwrap()
//!     .docstring("Say hello.")
//!     .body(|ctx, args| {
//!         for _ in 0..args.get_i64("times")? {
//!             ctx.uprint(format!("Hello, {}!", args.get_str("name")?))?;
//!         }
//!         Ok(Value::None)
//!     })
//!     .build();
//!
//! let handle = app.add(greet, AddOptions::new().display_name("Greeter")).unwrap();
//! let page = app.page(handle).unwrap();
//! assert_eq!(page.info().display_name, "Greeter");
//! assert_eq!(page.plan().len(), 2);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::binding::{BoundPage, bind_page};
use crate::config::WidgetConfig;
use crate::docstring::Docstring;
use crate::error::{Error, ParameterFailure, Result};
use crate::execution::{ExecutionOutput, ExecutionTicket};
use crate::registry::WidgetRegistry;
use crate::resolver::{ConfigResolver, Overlays, PagePlan};
use crate::signature::{Callable, DocumentFormat, FunctionInfo, SignatureParser};
use crate::value::{Arguments, Table};

const TARGET: &str = "formwright::app";

new_key_type! {
    /// Identifies a page registered with a [`FormApp`].
    pub struct PageHandle;
}

/// Checks a full set of arguments before a run; returns the failures.
pub type ParametersValidator = Arc<dyn Fn(&Arguments) -> Vec<ParameterFailure> + Send + Sync>;

/// Window settings for one function page. Carried for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: Option<String>,
    pub size: (u32, u32),
    pub position: Option<(i32, i32)>,
    pub always_on_top: bool,
    /// Show the output area.
    pub show_output: bool,
    /// Clear the output area before every run.
    pub clear_output_before_run: bool,
    /// Ask before closing the window.
    pub close_confirmation: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: None,
            size: (800, 600),
            position: None,
            always_on_top: false,
            show_output: true,
            clear_output_before_run: false,
            close_confirmation: false,
        }
    }
}

/// Settings for the function selection window.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectWindowConfig {
    pub title: String,
    pub size: (u32, u32),
    pub icon: Option<String>,
    /// Label of the group holding functions added without one.
    pub default_group_name: String,
}

impl Default for SelectWindowConfig {
    fn default() -> Self {
        Self {
            title: "Select Function".to_string(),
            size: (450, 600),
            icon: None,
            default_group_name: "Main Functions".to_string(),
        }
    }
}

/// How a function is registered.
#[derive(Clone, Default)]
pub struct AddOptions {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub document_format: Option<DocumentFormat>,
    pub group: Option<String>,
    pub widget_configs: Overlays,
    pub cancelable: bool,
    pub icon: Option<String>,
    pub window_config: WindowConfig,
    pub parameters_validator: Option<ParametersValidator>,
    pub output: ExecutionOutput,
}

impl fmt::Debug for AddOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddOptions")
            .field("display_name", &self.display_name)
            .field("group", &self.group)
            .field("widget_configs", &self.widget_configs)
            .field("cancelable", &self.cancelable)
            .field("has_validator", &self.parameters_validator.is_some())
            .finish_non_exhaustive()
    }
}

impl AddOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Replace the docstring's prose description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn document_format(mut self, format: DocumentFormat) -> Self {
        self.document_format = Some(format);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Options for one parameter. They take precedence over the docstring.
    pub fn widget_config(mut self, parameter: impl Into<String>, options: Table) -> Self {
        self.widget_configs.insert(parameter, options);
        self
    }

    /// Typed options for one parameter.
    pub fn typed_widget_config<C: WidgetConfig>(
        mut self,
        parameter: impl Into<String>,
        config: &C,
    ) -> Result<Self> {
        self.widget_configs.insert_config(parameter, config)?;
        Ok(self)
    }

    pub fn widget_configs(mut self, overlays: Overlays) -> Self {
        self.widget_configs = overlays;
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn window_config(mut self, config: WindowConfig) -> Self {
        self.window_config = config;
        self
    }

    pub fn parameters_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Arguments) -> Vec<ParameterFailure> + Send + Sync + 'static,
    {
        self.parameters_validator = Some(Arc::new(validator));
        self
    }

    pub fn output(mut self, output: ExecutionOutput) -> Self {
        self.output = output;
        self
    }
}

/// A registered function with its resolved widget plan.
pub struct FunctionPage {
    handle: PageHandle,
    callable: Arc<Callable>,
    info: FunctionInfo,
    plan: PagePlan,
    cancelable: bool,
    window_config: WindowConfig,
    validator: Option<ParametersValidator>,
    output: ExecutionOutput,
}

impl fmt::Debug for FunctionPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionPage")
            .field("handle", &self.handle)
            .field("function", &self.info.name)
            .field("widgets", &self.plan.len())
            .field("cancelable", &self.cancelable)
            .finish_non_exhaustive()
    }
}

impl FunctionPage {
    pub fn handle(&self) -> PageHandle {
        self.handle
    }

    pub fn callable(&self) -> &Arc<Callable> {
        &self.callable
    }

    pub fn info(&self) -> &FunctionInfo {
        &self.info
    }

    pub fn plan(&self) -> &PagePlan {
        &self.plan
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn window_config(&self) -> &WindowConfig {
        &self.window_config
    }

    /// The window title: the configured one, else the display name.
    pub fn window_title(&self) -> &str {
        self.info
            .window_title
            .as_deref()
            .unwrap_or(&self.info.display_name)
    }

    /// Build the page's widgets.
    pub fn bind(&self, registry: &WidgetRegistry, parent: Option<&dyn Any>) -> Result<BoundPage> {
        bind_page(&self.plan, registry, parent)
    }

    /// Harvest `page` and turn its values into a ticket.
    ///
    /// Invalid widgets and parameters rejected by the validator are
    /// highlighted, and the run is refused with
    /// [`Error::ParameterValidation`].
    pub fn ticket_from(&self, page: &mut BoundPage) -> Result<ExecutionTicket> {
        let arguments = page.harvest()?;
        match self.validate(&arguments) {
            Ok(()) => Ok(self.ticket_unchecked(arguments)),
            Err(failures) => {
                page.highlight(&failures);
                Err(Error::ParameterValidation { failures })
            }
        }
    }

    /// A ticket for explicit arguments, checked by the validator only.
    pub fn ticket(&self, arguments: Arguments) -> Result<ExecutionTicket> {
        self.validate(&arguments)
            .map_err(|failures| Error::ParameterValidation { failures })?;
        Ok(self.ticket_unchecked(arguments))
    }

    fn validate(&self, arguments: &Arguments) -> std::result::Result<(), Vec<ParameterFailure>> {
        let failures = self
            .validator
            .as_ref()
            .map(|validator| validator(arguments))
            .unwrap_or_default();
        if failures.is_empty() {
            Ok(())
        } else {
            tracing::debug!(target: TARGET, function = %self.info.name, failed = failures.len(), "parameters rejected");
            Err(failures)
        }
    }

    fn ticket_unchecked(&self, arguments: Arguments) -> ExecutionTicket {
        ExecutionTicket::new(self.callable.clone(), arguments)
            .cancelable(self.cancelable)
            .output(self.output.clone())
    }
}

/// How the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialView {
    /// The function selection window.
    SelectWindow,
    /// The page of the only registered function.
    Page(PageHandle),
}

/// Options for [`FormApp::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub select_window_config: SelectWindowConfig,
    /// Show the selection window even for a single function.
    pub show_select_window: bool,
}

/// Everything a backend needs to put the app on screen.
pub struct AppSession<'a> {
    app: &'a FormApp,
    select_window_config: SelectWindowConfig,
    initial_view: InitialView,
}

impl<'a> AppSession<'a> {
    pub fn initial_view(&self) -> InitialView {
        self.initial_view
    }

    pub fn select_window_config(&self) -> &SelectWindowConfig {
        &self.select_window_config
    }

    pub fn registry(&self) -> &Arc<WidgetRegistry> {
        self.app.registry()
    }

    pub fn pages(&self) -> impl Iterator<Item = &'a FunctionPage> {
        self.app.pages()
    }

    pub fn page(&self, handle: PageHandle) -> Option<&'a FunctionPage> {
        self.app.page(handle)
    }

    /// Pages grouped for the selection window: functions without a group
    /// first, under the configured default name, then groups in order of
    /// first appearance.
    pub fn groups(&self) -> Vec<(String, Vec<&'a FunctionPage>)> {
        let mut groups: Vec<(String, Vec<&'a FunctionPage>)> =
            vec![(self.select_window_config.default_group_name.clone(), Vec::new())];
        for page in self.app.pages() {
            if page.info.group.is_empty() {
                groups[0].1.push(page);
                continue;
            }
            match groups[1..].iter_mut().find(|(name, _)| *name == page.info.group) {
                Some((_, members)) => members.push(page),
                None => groups.push((page.info.group.clone(), vec![page])),
            }
        }
        if groups[0].1.is_empty() {
            groups.remove(0);
        }
        groups
    }

    /// Build the widgets of a page.
    pub fn open(&self, handle: PageHandle, parent: Option<&dyn Any>) -> Result<BoundPage> {
        let page = self.page(handle).ok_or(Error::UnknownPage)?;
        tracing::debug!(target: TARGET, function = %page.info.name, "opening page");
        page.bind(self.registry(), parent)
    }
}

/// Owns the UI loop. Implemented by toolkit integrations.
pub trait UiBackend {
    fn run(&mut self, session: AppSession<'_>) -> Result<()>;
}

/// The set of functions presented to the user.
pub struct FormApp {
    registry: Arc<WidgetRegistry>,
    parser: SignatureParser,
    pages: SlotMap<PageHandle, FunctionPage>,
    order: Vec<PageHandle>,
}

impl fmt::Debug for FormApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormApp")
            .field("pages", &self.order.len())
            .finish_non_exhaustive()
    }
}

impl Default for FormApp {
    fn default() -> Self {
        Self::new()
    }
}

impl FormApp {
    /// An app using the process-wide registry.
    pub fn new() -> Self {
        Self::with_registry(WidgetRegistry::global())
    }

    pub fn with_registry(registry: Arc<WidgetRegistry>) -> Self {
        Self {
            registry,
            parser: SignatureParser::new(),
            pages: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    pub fn parser(mut self, parser: SignatureParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn registry(&self) -> &Arc<WidgetRegistry> {
        &self.registry
    }

    /// Register `callable` as a page.
    ///
    /// Every problem with the callable, its docstring or its widget configs
    /// is reported here, attributed to the offending parameter.
    pub fn add(&mut self, callable: Callable, options: AddOptions) -> Result<PageHandle> {
        let docstring = Docstring::extract(callable.docstring())?;
        let mut info = self.parser.parse_with_docstring(&callable, &docstring)?;
        if let Some(name) = options.display_name {
            info.display_name = name;
        }
        if let Some(description) = options.description {
            info.description = description;
        }
        if let Some(format) = options.document_format {
            info.document_format = format;
        }
        info.group = options.group.unwrap_or_default();
        info.icon = options.icon;
        info.window_title = options.window_config.title.clone();

        let plan = ConfigResolver::new(&self.registry).resolve(
            &info,
            &docstring.overlays,
            &options.widget_configs,
        )?;

        let callable = Arc::new(callable);
        let handle = self.pages.insert_with_key(|handle| FunctionPage {
            handle,
            callable,
            info,
            plan,
            cancelable: options.cancelable,
            window_config: options.window_config,
            validator: options.parameters_validator,
            output: options.output,
        });
        self.order.push(handle);
        tracing::info!(target: TARGET, function = %self.pages[handle].info.name, "function added");
        Ok(handle)
    }

    pub fn page(&self, handle: PageHandle) -> Option<&FunctionPage> {
        self.pages.get(handle)
    }

    /// Pages in registration order.
    pub fn pages(&self) -> impl Iterator<Item = &FunctionPage> {
        self.order.iter().filter_map(|handle| self.pages.get(*handle))
    }

    pub fn remove(&mut self, handle: PageHandle) -> Option<FunctionPage> {
        let page = self.pages.remove(handle)?;
        self.order.retain(|h| *h != handle);
        Some(page)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Hand the registered pages to `backend`, which runs the UI loop.
    ///
    /// With one page and no selection window requested, the page opens
    /// directly.
    pub fn run<B: UiBackend + ?Sized>(&self, backend: &mut B, options: RunOptions) -> Result<()> {
        let Some(first) = self.order.first().copied() else {
            return Err(Error::NoFunctions);
        };
        let initial_view = if self.order.len() == 1 && !options.show_select_window {
            InitialView::Page(first)
        } else {
            InitialView::SelectWindow
        };
        tracing::info!(target: TARGET, pages = self.order.len(), ?initial_view, "starting UI");
        backend.run(AppSession {
            app: self,
            select_window_config: options.select_window_config,
            initial_view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn app() -> FormApp {
        FormApp::with_registry(Arc::new(WidgetRegistry::with_builtins()))
    }

    fn function(signature: &str) -> Callable {
        Callable::parse(signature)
            .unwrap()
            .body(|_, _| Ok(Value::None))
            .build()
    }

    struct Recorder {
        initial: Option<InitialView>,
        groups: Vec<(String, Vec<String>)>,
    }

    impl UiBackend for Recorder {
        fn run(&mut self, session: AppSession<'_>) -> Result<()> {
            self.initial = Some(session.initial_view());
            self.groups = session
                .groups()
                .into_iter()
                .map(|(name, pages)| (name, pages.iter().map(|p| p.info().name.clone()).collect()))
                .collect();
            Ok(())
        }
    }

    #[test]
    fn test_add_applies_options() {
        let mut app = app();
        let handle = app
            .add(
                function("def f(a: int)"),
                AddOptions::new()
                    .description("Custom")
                    .group("Tools")
                    .document_format(DocumentFormat::Html),
            )
            .unwrap();
        let info = app.page(handle).unwrap().info();
        assert_eq!(info.description, "Custom");
        assert_eq!(info.group, "Tools");
        assert_eq!(info.document_format, DocumentFormat::Html);
    }

    #[test]
    fn test_add_reports_bad_config() {
        let mut app = app();
        let mut options = Table::new();
        options.insert("bogus".into(), Value::Int(1));
        let err = app
            .add(function("def f(a: int)"), AddOptions::new().widget_config("a", options))
            .unwrap_err();
        assert_eq!(err.parameter_name(), Some("a"));
        assert!(app.is_empty());
    }

    #[test]
    fn test_run_without_pages() {
        let mut backend = Recorder { initial: None, groups: Vec::new() };
        assert!(matches!(
            app().run(&mut backend, RunOptions::default()),
            Err(Error::NoFunctions)
        ));
    }

    #[test]
    fn test_single_page_opens_directly() {
        let mut app = app();
        let handle = app.add(function("def f()"), AddOptions::new()).unwrap();
        let mut backend = Recorder { initial: None, groups: Vec::new() };
        app.run(&mut backend, RunOptions::default()).unwrap();
        assert_eq!(backend.initial, Some(InitialView::Page(handle)));

        let options = RunOptions {
            show_select_window: true,
            ..Default::default()
        };
        app.run(&mut backend, options).unwrap();
        assert_eq!(backend.initial, Some(InitialView::SelectWindow));
    }

    #[test]
    fn test_select_window_groups() {
        let mut app = app();
        app.add(function("def a()"), AddOptions::new().group("X")).unwrap();
        app.add(function("def b()"), AddOptions::new()).unwrap();
        app.add(function("def c()"), AddOptions::new().group("Y")).unwrap();
        app.add(function("def d()"), AddOptions::new().group("X")).unwrap();

        let mut backend = Recorder { initial: None, groups: Vec::new() };
        app.run(&mut backend, RunOptions::default()).unwrap();
        assert_eq!(backend.initial, Some(InitialView::SelectWindow));
        let expected = vec![
            ("Main Functions".to_string(), vec!["b".to_string()]),
            ("X".to_string(), vec!["a".to_string(), "d".to_string()]),
            ("Y".to_string(), vec!["c".to_string()]),
        ];
        assert_eq!(backend.groups, expected);
    }

    #[test]
    fn test_validator_blocks_ticket() {
        let mut app = app();
        let handle = app
            .add(
                function("def f(a: int, b: int)"),
                AddOptions::new().parameters_validator(|args| {
                    let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
                    let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
                    if a < b {
                        Vec::new()
                    } else {
                        vec![ParameterFailure::new("b", "must be greater than a")]
                    }
                }),
            )
            .unwrap();
        let page = app.page(handle).unwrap();
        let mut bound = page.bind(app.registry(), None).unwrap();

        let err = page.ticket_from(&mut bound).unwrap_err();
        assert!(matches!(err, Error::ParameterValidation { ref failures } if failures[0].parameter == "b"));

        bound.widget_mut("b").unwrap().set_value(Value::Int(3)).unwrap();
        let ticket = page.ticket_from(&mut bound).unwrap();
        assert_eq!(ticket.arguments().get("b"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut app = app();
        let a = app.add(function("def a()"), AddOptions::new()).unwrap();
        app.add(function("def b()"), AddOptions::new()).unwrap();
        assert!(app.remove(a).is_some());
        assert!(app.page(a).is_none());
        let names: Vec<_> = app.pages().map(|p| p.info().name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }
}
