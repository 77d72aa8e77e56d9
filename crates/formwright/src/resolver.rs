//! Widget config resolution.
//!
//! For every parameter the resolver decides which widget kind to build and
//! with which options, layering three sources from weakest to strongest:
//!
//! 1. the kind's schema defaults,
//! 2. the docstring `@params` overlay,
//! 3. the caller's overlay.
//!
//! Later layers replace earlier ones key by key; options declared with
//! `deep_merge` merge nested tables instead. The kind itself is chosen by a
//! `widget_class` (or `type`) key in the caller overlay, then the docstring
//! overlay, then the registry's default for the parameter type, then the
//! `any` kind.

use std::collections::{BTreeMap, HashSet};

use formwright_core::PerfSpan;

use crate::config::WidgetConfig;
use crate::error::{Error, Result};
use crate::registry::WidgetRegistry;
use crate::registry::schema::{
    ConfigSchema, DEFAULT_VALUE, DESCRIPTION, GROUP, HIDE_DEFAULT_WIDGET, LABEL, OPTIONAL,
};
use crate::signature::{FunctionInfo, ParameterInfo};
use crate::value::{Table, Value};

const TARGET: &str = "formwright::resolver";

/// Overlay key selecting the widget kind.
pub const WIDGET_CLASS: &str = "widget_class";
/// Alternative spelling of [`WIDGET_CLASS`].
pub const WIDGET_TYPE: &str = "type";

/// Name of the group parameters land in when none is set.
pub const DEFAULT_GROUP: &str = "";

/// Per-parameter option tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlays {
    entries: BTreeMap<String, Table>,
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse overlays from TOML where each top-level table names a
    /// parameter.
    ///
    /// ```
    /// use formwright::resolver::Overlays;
    ///
    /// let overlays = Overlays::from_toml_str("[count]\nmin_value = 1\n").unwrap();
    /// assert!(overlays.get("count").is_some());
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text)?;
        let mut overlays = Self::new();
        for (parameter, options) in table {
            match Value::from(options) {
                Value::Table(options) => {
                    overlays.insert(parameter, options);
                }
                other => {
                    return Err(Error::config_validation(
                        "overlay",
                        parameter,
                        format!("expected a table of options, found {}", other.type_name()),
                    ));
                }
            }
        }
        Ok(overlays)
    }

    /// Set the options for `parameter`, returning the previous ones.
    pub fn insert(&mut self, parameter: impl Into<String>, options: Table) -> Option<Table> {
        self.entries.insert(parameter.into(), options)
    }

    pub fn with(mut self, parameter: impl Into<String>, options: Table) -> Self {
        self.insert(parameter, options);
        self
    }

    /// Set the options for `parameter` from a typed config.
    pub fn insert_config<C: WidgetConfig>(
        &mut self,
        parameter: impl Into<String>,
        config: &C,
    ) -> Result<()> {
        self.insert(parameter, config.to_options()?);
        Ok(())
    }

    pub fn with_config<C: WidgetConfig>(
        mut self,
        parameter: impl Into<String>,
        config: &C,
    ) -> Result<Self> {
        self.insert_config(parameter, config)?;
        Ok(self)
    }

    pub fn get(&self, parameter: &str) -> Option<&Table> {
        self.entries.get(parameter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// The resolved widget for one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetPlan {
    pub parameter_name: String,
    pub widget_kind: String,
    /// The full option table, reserved options included.
    pub options: Table,
    pub initial_value: Value,
    pub group: String,
    pub label: String,
    pub description: String,
    /// Position of the parameter in the signature.
    pub source_index: usize,
    /// Whether the widget starts hidden.
    pub hidden: bool,
}

/// The resolved widgets of one function, in signature order.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub function_name: String,
    pub widgets: Vec<WidgetPlan>,
}

impl PagePlan {
    pub fn get(&self, parameter: &str) -> Option<&WidgetPlan> {
        self.widgets.iter().find(|w| w.parameter_name == parameter)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Widgets grouped for layout: the default group first, then other groups
    /// in order of first appearance. Signature order is kept within a group.
    pub fn groups(&self) -> Vec<(&str, Vec<&WidgetPlan>)> {
        let mut groups: Vec<(&str, Vec<&WidgetPlan>)> = vec![(DEFAULT_GROUP, Vec::new())];
        for widget in &self.widgets {
            match groups.iter_mut().find(|(name, _)| *name == widget.group) {
                Some((_, members)) => members.push(widget),
                None => groups.push((widget.group.as_str(), vec![widget])),
            }
        }
        if groups[0].1.is_empty() {
            groups.remove(0);
        }
        groups
    }
}

/// Resolves parameters into widget plans against a registry.
#[derive(Debug, Clone, Copy)]
pub struct ConfigResolver<'a> {
    registry: &'a WidgetRegistry,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(registry: &'a WidgetRegistry) -> Self {
        Self { registry }
    }

    /// Resolve every parameter of `info`.
    ///
    /// Errors are attributed to the parameter that caused them.
    pub fn resolve(
        &self,
        info: &FunctionInfo,
        docstring_overlays: &Overlays,
        caller_overlays: &Overlays,
    ) -> Result<PagePlan> {
        let _span = PerfSpan::new("resolve_page");
        for overlays in [docstring_overlays, caller_overlays] {
            for name in overlays.parameters() {
                if info.parameter(name).is_none() {
                    tracing::warn!(
                        target: TARGET,
                        function = %info.name,
                        parameter = name,
                        "widget config names an unknown parameter"
                    );
                }
            }
        }

        let widgets = info
            .parameters
            .iter()
            .map(|param| {
                self.resolve_parameter(
                    param,
                    docstring_overlays.get(&param.name),
                    caller_overlays.get(&param.name),
                )
                .map_err(|e| e.for_parameter(&param.name))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(target: TARGET, function = %info.name, widgets = widgets.len(), "resolved page");
        Ok(PagePlan {
            function_name: info.name.clone(),
            widgets,
        })
    }

    /// Resolve one parameter.
    pub fn resolve_parameter(
        &self,
        param: &ParameterInfo,
        docstring_overlay: Option<&Table>,
        caller_overlay: Option<&Table>,
    ) -> Result<WidgetPlan> {
        let kind = match kind_from_overlay(caller_overlay)? {
            Some(kind) => kind,
            None => match kind_from_overlay(docstring_overlay)? {
                Some(kind) => kind,
                None => self.default_kind(param)?,
            },
        };
        let registered = self.registry.lookup(&kind)?;
        let schema = registered.schema.as_ref();

        let mut options = schema.defaults();
        let mut explicit = HashSet::new();
        for overlay in [docstring_overlay, caller_overlay].into_iter().flatten() {
            apply_overlay(&kind, schema, &mut options, overlay, &mut explicit)?;
        }

        if options.get(LABEL).is_none_or(Value::is_none) {
            options.insert(LABEL.to_string(), Value::from(param.name.as_str()));
        }
        if options.get(DESCRIPTION).is_none_or(Value::is_none) {
            let description = param.description().unwrap_or_default().to_string();
            options.insert(DESCRIPTION.to_string(), Value::from(description));
        }
        if options.get(GROUP).is_none_or(Value::is_none) {
            options.insert(GROUP.to_string(), Value::from(DEFAULT_GROUP));
        }
        if !explicit.contains(DEFAULT_VALUE)
            && let Some(default) = &param.default_value
        {
            options.insert(DEFAULT_VALUE.to_string(), default.clone());
        }
        if !explicit.contains(OPTIONAL) {
            options.insert(OPTIONAL.to_string(), Value::Bool(param.optional));
        }
        if let Some(option) = schema.args_option()
            && !explicit.contains(option)
            && !param.literal_values.is_empty()
        {
            options.insert(option.to_string(), Value::List(param.literal_values.clone()));
        }

        let text = |key: &str| {
            options
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let hidden = param.has_default()
            && options
                .get(HIDE_DEFAULT_WIDGET)
                .and_then(Value::as_bool)
                .unwrap_or(false);

        tracing::trace!(target: TARGET, parameter = %param.name, %kind, "resolved widget");
        Ok(WidgetPlan {
            parameter_name: param.name.clone(),
            initial_value: options.get(DEFAULT_VALUE).cloned().unwrap_or_default(),
            group: text(GROUP),
            label: text(LABEL),
            description: text(DESCRIPTION),
            source_index: param.position,
            hidden,
            widget_kind: kind,
            options,
        })
    }

    fn default_kind(&self, param: &ParameterInfo) -> Result<String> {
        match self.registry.resolve_kind(&param.type_name, &param.type_args) {
            Ok(kind) => Ok(kind),
            Err(err @ Error::NoWidgetForType { .. }) => match self.registry.fallback_kind() {
                Some(kind) => {
                    tracing::debug!(
                        target: TARGET,
                        parameter = %param.name,
                        type_name = %param.type_name,
                        %kind,
                        "no widget for type, using fallback kind"
                    );
                    Ok(kind)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}

/// The kind named by an overlay's `widget_class` (or `type`) key.
fn kind_from_overlay(overlay: Option<&Table>) -> Result<Option<String>> {
    let Some(overlay) = overlay else {
        return Ok(None);
    };
    for key in [WIDGET_CLASS, WIDGET_TYPE] {
        match overlay.get(key) {
            Some(Value::Str(kind)) => return Ok(Some(kind.clone())),
            Some(other) => {
                return Err(Error::config_validation(
                    "overlay",
                    key,
                    format!("expected a widget kind name, found {}", other.type_name()),
                ));
            }
            None => {}
        }
    }
    Ok(None)
}

fn apply_overlay(
    kind: &str,
    schema: &ConfigSchema,
    options: &mut Table,
    overlay: &Table,
    explicit: &mut HashSet<String>,
) -> Result<()> {
    for (key, value) in overlay {
        if key == WIDGET_CLASS || key == WIDGET_TYPE {
            continue;
        }
        match schema.spec(key) {
            Some(spec) => {
                if !spec.ty.accepts(value) {
                    return Err(Error::config_validation(
                        kind,
                        key,
                        format!("expected {}, found {}", spec.ty, value.type_name()),
                    ));
                }
                match (options.get_mut(key), value) {
                    (Some(Value::Table(base)), Value::Table(patch)) if spec.deep_merge => {
                        deep_merge(base, patch);
                    }
                    _ => {
                        options.insert(key.clone(), value.clone());
                    }
                }
            }
            None if schema.is_extensible() => {
                options.insert(key.clone(), value.clone());
            }
            None => {
                return Err(Error::config_validation(kind, key, "unknown option"));
            }
        }
        explicit.insert(key.clone());
    }
    Ok(())
}

/// Merge `patch` into `base`, recursing into tables present in both.
pub fn deep_merge(base: &mut Table, patch: &Table) {
    for (key, value) in patch {
        match (base.get_mut(key), value) {
            (Some(Value::Table(inner)), Value::Table(patch_inner)) => deep_merge(inner, patch_inner),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin;
    use crate::registry::schema::{OptionSpec, OptionType};
    use crate::signature::{Callable, SignatureParser};

    fn info(signature: &str) -> FunctionInfo {
        let callable = Callable::parse(signature)
            .unwrap()
            .body(|_, _| Ok(Value::None))
            .build();
        SignatureParser::new().parse(&callable).unwrap()
    }

    fn table(text: &str) -> Table {
        crate::value::table_from_toml(toml::from_str(text).unwrap())
    }

    #[test]
    fn test_defaults_from_schema_and_signature() {
        let registry = WidgetRegistry::with_builtins();
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(a: int, b: int = 5)"), &Overlays::new(), &Overlays::new())
            .unwrap();
        let a = plan.get("a").unwrap();
        assert_eq!(a.widget_kind, builtin::INT_SPIN_BOX);
        assert_eq!(a.initial_value, Value::Int(0));
        assert_eq!(a.label, "a");
        assert_eq!(a.group, DEFAULT_GROUP);
        assert_eq!(a.options["step"], Value::Int(1));
        assert_eq!(plan.get("b").unwrap().initial_value, Value::Int(5));
    }

    #[test]
    fn test_caller_beats_docstring() {
        let registry = WidgetRegistry::with_builtins();
        let docs = Overlays::new().with("a", table("label = 'Doc'\nstep = 2"));
        let caller = Overlays::new().with("a", table("label = 'Caller'"));
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(a: int)"), &docs, &caller)
            .unwrap();
        let a = plan.get("a").unwrap();
        assert_eq!(a.label, "Caller");
        assert_eq!(a.options["step"], Value::Int(2));
    }

    #[test]
    fn test_overlay_default_beats_signature_default() {
        let registry = WidgetRegistry::with_builtins();
        let docs = Overlays::new().with("b", table("default_value = 7"));
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(b: int = 5)"), &docs, &Overlays::new())
            .unwrap();
        assert_eq!(plan.get("b").unwrap().initial_value, Value::Int(7));
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let registry = WidgetRegistry::with_builtins();
        let caller = Overlays::new().with("a", table("colour = 'red'"));
        let err = ConfigResolver::new(&registry)
            .resolve(&info("def f(a: int)"), &Overlays::new(), &caller)
            .unwrap_err();
        assert_eq!(err.parameter_name(), Some("a"));
        assert!(matches!(err.root(), Error::ConfigValidation { key, .. } if key == "colour"));
    }

    #[test]
    fn test_option_type_is_checked() {
        let registry = WidgetRegistry::with_builtins();
        let caller = Overlays::new().with("a", table("step = 'big'"));
        let err = ConfigResolver::new(&registry)
            .resolve(&info("def f(a: int)"), &Overlays::new(), &caller)
            .unwrap_err();
        assert!(matches!(err.root(), Error::ConfigValidation { key, .. } if key == "step"));
    }

    #[test]
    fn test_explicit_kind_wins_and_unknown_kind_errors() {
        let registry = WidgetRegistry::with_builtins();
        let caller = Overlays::new().with("s", table("widget_class = 'TextEdit'"));
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(s: str)"), &Overlays::new(), &caller)
            .unwrap();
        assert_eq!(plan.get("s").unwrap().widget_kind, builtin::TEXT_EDIT);

        let caller = Overlays::new().with("s", table("type = 'Fancy'"));
        let err = ConfigResolver::new(&registry)
            .resolve(&info("def f(s: str)"), &Overlays::new(), &caller)
            .unwrap_err();
        assert!(matches!(err.root(), Error::UnknownWidgetKind(k) if k == "Fancy"));
    }

    #[test]
    fn test_unknown_type_falls_back_to_any() {
        let registry = WidgetRegistry::with_builtins();
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(x: Widget, y)"), &Overlays::new(), &Overlays::new())
            .unwrap();
        assert_eq!(plan.get("x").unwrap().widget_kind, builtin::ANY_VALUE_EDIT);
        assert_eq!(plan.get("y").unwrap().initial_value, Value::None);

        let empty = WidgetRegistry::new();
        let err = ConfigResolver::new(&empty)
            .resolve(&info("def f(x: Widget)"), &Overlays::new(), &Overlays::new())
            .unwrap_err();
        assert!(matches!(err.root(), Error::NoWidgetForType { type_name } if type_name == "Widget"));
    }

    #[test]
    fn test_deep_merge_option() {
        let registry = WidgetRegistry::with_builtins();
        let caller = Overlays::new().with("d", table("[editor]\nkey_header = 'Name'"));
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(d: dict)"), &Overlays::new(), &caller)
            .unwrap();
        let editor = plan.get("d").unwrap().options["editor"].as_table().unwrap();
        assert_eq!(editor["key_header"], Value::from("Name"));
        assert_eq!(editor["value_header"], Value::from("Value"));
    }

    #[test]
    fn test_literal_fills_choices() {
        let registry = WidgetRegistry::with_builtins();
        let plan = ConfigResolver::new(&registry)
            .resolve(
                &info("def f(mode: Literal['a', 'b'] = 'b')"),
                &Overlays::new(),
                &Overlays::new(),
            )
            .unwrap();
        let mode = plan.get("mode").unwrap();
        assert_eq!(mode.widget_kind, builtin::CHOICE_BOX);
        assert_eq!(mode.options["choices"], Value::from(vec!["a", "b"]));
        assert_eq!(mode.initial_value, Value::from("b"));
    }

    #[test]
    fn test_extensible_schema_accepts_extra_keys() {
        let registry = WidgetRegistry::with_builtins();
        registry
            .register(
                "Loose",
                |_: Option<&dyn std::any::Any>, name: &str, options: &Table| -> Result<Box<dyn crate::widget::InputWidget>> {
                    Ok(Box::new(builtin::ValueWidget::new("Loose", builtin::ValueShape::Any, name, options)))
                },
                ConfigSchema::new(Value::None)
                    .option(OptionSpec::new("known", OptionType::Int, 0i64))
                    .extensible(true),
                [],
            )
            .unwrap();
        let caller = Overlays::new().with("x", table("widget_class = 'Loose'\nextra = true"));
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(x)"), &Overlays::new(), &caller)
            .unwrap();
        assert_eq!(plan.get("x").unwrap().options["extra"], Value::Bool(true));
    }

    #[test]
    fn test_hidden_only_with_default() {
        let registry = WidgetRegistry::with_builtins();
        let hide = table("hide_default_widget = true");
        let caller = Overlays::new().with("a", hide.clone()).with("b", hide);
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(a: int, b: int = 1)"), &Overlays::new(), &caller)
            .unwrap();
        assert!(!plan.get("a").unwrap().hidden);
        assert!(plan.get("b").unwrap().hidden);
    }

    #[test]
    fn test_group_order() {
        let registry = WidgetRegistry::with_builtins();
        let caller = Overlays::new()
            .with("a", table("group = 'Extra'"))
            .with("c", table("group = 'More'"))
            .with("d", table("group = 'Extra'"));
        let plan = ConfigResolver::new(&registry)
            .resolve(&info("def f(a: int, b: int, c: int, d: int)"), &Overlays::new(), &caller)
            .unwrap();
        let groups: Vec<(&str, Vec<&str>)> = plan
            .groups()
            .into_iter()
            .map(|(g, ws)| (g, ws.iter().map(|w| w.parameter_name.as_str()).collect()))
            .collect();
        assert_eq!(
            groups,
            vec![("", vec!["b"]), ("Extra", vec!["a", "d"]), ("More", vec!["c"])]
        );
    }

    #[test]
    fn test_overlays_from_toml() {
        let overlays = Overlays::from_toml_str("[a]\nstep = 3\n[b]\nlabel = 'B'").unwrap();
        assert_eq!(overlays.len(), 2);
        assert!(Overlays::from_toml_str("a = 1").is_err());
        assert!(matches!(
            Overlays::from_toml_str("[a"),
            Err(Error::OverlayParse(_))
        ));
    }
}
