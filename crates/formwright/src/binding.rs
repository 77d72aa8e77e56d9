//! Building widgets from a page plan and reading values back.

use std::any::Any;

use crate::error::{Error, ParameterFailure, Result};
use crate::registry::WidgetRegistry;
use crate::resolver::{PagePlan, WidgetPlan};
use crate::value::{Arguments, Table, Value};
use crate::widget::InputWidget;

const TARGET: &str = "formwright::binding";

/// A widget together with the plan it was built from.
pub struct BoundWidget {
    plan: WidgetPlan,
    widget: Box<dyn InputWidget>,
}

impl BoundWidget {
    pub fn plan(&self) -> &WidgetPlan {
        &self.plan
    }

    pub fn widget(&self) -> &dyn InputWidget {
        self.widget.as_ref()
    }

    pub fn widget_mut(&mut self) -> &mut dyn InputWidget {
        self.widget.as_mut()
    }
}

impl std::fmt::Debug for BoundWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundWidget")
            .field("parameter", &self.plan.parameter_name)
            .field("kind", &self.plan.widget_kind)
            .finish()
    }
}

/// The live widgets of one function page.
#[derive(Debug)]
pub struct BoundPage {
    function_name: String,
    widgets: Vec<BoundWidget>,
}

/// Build one widget per plan entry.
///
/// Every widget is checked against the factory contract: it must accept its
/// own initial value, and whatever it reports after `set_value` must pass its
/// own type check.
pub fn bind_page(
    plan: &PagePlan,
    registry: &WidgetRegistry,
    parent: Option<&dyn Any>,
) -> Result<BoundPage> {
    let widgets = plan
        .widgets
        .iter()
        .map(|widget_plan| {
            bind_widget(widget_plan, registry, parent)
                .map_err(|e| e.for_parameter(&widget_plan.parameter_name))
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(target: TARGET, function = %plan.function_name, widgets = widgets.len(), "bound page");
    Ok(BoundPage {
        function_name: plan.function_name.clone(),
        widgets,
    })
}

fn bind_widget(
    plan: &WidgetPlan,
    registry: &WidgetRegistry,
    parent: Option<&dyn Any>,
) -> Result<BoundWidget> {
    let registered = registry.lookup(&plan.widget_kind)?;
    let contract = |reason: String| Error::widget_contract(&plan.parameter_name, &plan.widget_kind, reason);

    let mut widget = registered
        .factory
        .create(parent, &plan.parameter_name, &plan.options)
        .map_err(|e| contract(format!("factory failed: {e}")))?;
    widget
        .check_value_type(&plan.initial_value)
        .map_err(|e| contract(format!("rejects its initial value: {e}")))?;
    widget
        .set_value(plan.initial_value.clone())
        .map_err(|e| contract(format!("set_value failed: {e}")))?;
    let current = widget
        .get_value()
        .map_err(|e| contract(format!("get_value failed: {e}")))?;
    widget
        .check_value_type(&current)
        .map_err(|e| contract(format!("reports a value it does not accept: {e}")))?;

    Ok(BoundWidget {
        plan: plan.clone(),
        widget,
    })
}

impl BoundPage {
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundWidget> {
        self.widgets.iter()
    }

    pub fn widget(&self, parameter: &str) -> Option<&dyn InputWidget> {
        self.find(parameter).map(|b| b.widget.as_ref())
    }

    pub fn widget_mut(&mut self, parameter: &str) -> Option<&mut dyn InputWidget> {
        for bound in &mut self.widgets {
            if bound.plan.parameter_name == parameter {
                return Some(bound.widget.as_mut());
            }
        }
        None
    }

    fn find(&self, parameter: &str) -> Option<&BoundWidget> {
        self.widgets.iter().find(|b| b.plan.parameter_name == parameter)
    }

    /// Collect the current values of every widget.
    ///
    /// Widgets holding invalid input are highlighted, and all failures are
    /// reported together.
    pub fn harvest(&mut self) -> Result<Arguments> {
        let mut arguments = Arguments::new();
        let mut failures = Vec::new();
        for bound in &mut self.widgets {
            let name = bound.plan.parameter_name.clone();
            let outcome = match bound.widget.validation_error() {
                Some(reason) => Err(reason),
                None => bound.widget.get_value().map_err(|e| e.to_string()),
            };
            match outcome {
                Ok(value) => {
                    bound.widget.clear_highlight();
                    arguments.insert(name, value);
                }
                Err(reason) => {
                    bound.widget.highlight();
                    failures.push(ParameterFailure::new(name, reason));
                }
            }
        }
        if failures.is_empty() {
            Ok(arguments)
        } else {
            tracing::debug!(target: TARGET, function = %self.function_name, failed = failures.len(), "harvest failed");
            Err(Error::ParameterValidation { failures })
        }
    }

    /// Highlight the named widgets as invalid.
    pub fn highlight(&mut self, failures: &[ParameterFailure]) {
        for failure in failures {
            if let Some(widget) = self.widget_mut(&failure.parameter) {
                widget.highlight();
            }
        }
    }

    /// Set widget values by parameter name. Unknown names are ignored.
    ///
    /// Every value is type-checked before any widget changes.
    pub fn apply_values(&mut self, values: &Arguments) -> Result<()> {
        for (name, value) in values.iter() {
            if let Some(bound) = self.find(name) {
                bound
                    .widget
                    .check_value_type(value)
                    .map_err(|e| e.for_parameter(name))?;
            }
        }
        for (name, value) in values.iter() {
            if let Some(widget) = self.widget_mut(name) {
                widget.set_value(value.clone()).map_err(|e| e.for_parameter(name))?;
            }
        }
        Ok(())
    }

    /// Restore every widget to its plan's initial value.
    pub fn reset_defaults(&mut self) -> Result<()> {
        for bound in &mut self.widgets {
            bound
                .widget
                .set_value(bound.plan.initial_value.clone())
                .map_err(|e| e.for_parameter(&bound.plan.parameter_name))?;
            bound.widget.clear_highlight();
        }
        Ok(())
    }

    /// Enable or disable every widget, e.g. while the function runs.
    pub fn set_enabled(&mut self, enabled: bool) {
        for bound in &mut self.widgets {
            bound.widget.set_enabled(enabled);
        }
    }

    /// The current values without validation.
    pub fn values(&self) -> Table {
        self.widgets
            .iter()
            .filter_map(|b| {
                b.widget
                    .get_value()
                    .ok()
                    .map(|v| (b.plan.parameter_name.clone(), v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin::ValueWidget;
    use crate::registry::schema::ConfigSchema;
    use crate::resolver::{ConfigResolver, Overlays};
    use crate::signature::{Callable, SignatureParser};

    fn plan(registry: &WidgetRegistry, signature: &str, caller: &Overlays) -> PagePlan {
        let callable = Callable::parse(signature)
            .unwrap()
            .body(|_, _| Ok(Value::None))
            .build();
        let info = SignatureParser::new().parse(&callable).unwrap();
        ConfigResolver::new(registry)
            .resolve(&info, &Overlays::new(), caller)
            .unwrap()
    }

    fn overlay(text: &str) -> Table {
        crate::value::table_from_toml(toml::from_str(text).unwrap())
    }

    #[test]
    fn test_bind_and_harvest() {
        let registry = WidgetRegistry::with_builtins();
        let plan = plan(&registry, "def f(a: int, s: str = 'hi')", &Overlays::new());
        let mut page = bind_page(&plan, &registry, None).unwrap();
        assert_eq!(page.len(), 2);

        let args = page.harvest().unwrap();
        assert_eq!(args.get("a"), Some(&Value::Int(0)));
        assert_eq!(args.get("s"), Some(&Value::from("hi")));
    }

    #[test]
    fn test_harvest_reports_every_invalid_widget() {
        let registry = WidgetRegistry::with_builtins();
        let caller = Overlays::new()
            .with("a", overlay("max_value = 3"))
            .with("b", overlay("min_value = 10"));
        let plan = plan(&registry, "def f(a: int, b: int, c: int)", &caller);
        let mut page = bind_page(&plan, &registry, None).unwrap();
        page.widget_mut("a").unwrap().set_value(Value::Int(9)).unwrap();

        let err = page.harvest().unwrap_err();
        let Error::ParameterValidation { failures } = err else {
            panic!("expected validation failure, got {err:?}");
        };
        let names: Vec<_> = failures.iter().map(|f| f.parameter.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let highlighted = |name: &str| {
            page.widget(name)
                .unwrap()
                .as_any()
                .downcast_ref::<ValueWidget>()
                .unwrap()
                .is_highlighted()
        };
        assert!(highlighted("a"));
        assert!(highlighted("b"));
        assert!(!highlighted("c"));
    }

    #[test]
    fn test_apply_values_is_type_checked() {
        let registry = WidgetRegistry::with_builtins();
        let plan = plan(&registry, "def f(a: int, b: bool)", &Overlays::new());
        let mut page = bind_page(&plan, &registry, None).unwrap();

        let bad: Arguments = [("a", Value::Int(4)), ("b", Value::from("yes"))]
            .into_iter()
            .collect();
        let err = page.apply_values(&bad).unwrap_err();
        assert_eq!(err.parameter_name(), Some("b"));
        assert_eq!(page.widget("a").unwrap().get_value().unwrap(), Value::Int(0));

        let good: Arguments = [("a", Value::Int(4)), ("b", Value::Bool(true))]
            .into_iter()
            .collect();
        page.apply_values(&good).unwrap();
        assert_eq!(page.values()["a"], Value::Int(4));

        page.reset_defaults().unwrap();
        assert_eq!(page.values()["a"], Value::Int(0));
    }

    #[test]
    fn test_contract_violation_is_reported() {
        struct Liar;
        impl InputWidget for Liar {
            fn parameter_name(&self) -> &str {
                "x"
            }
            fn kind(&self) -> &str {
                "Liar"
            }
            fn set_value(&mut self, _value: Value) -> Result<()> {
                Ok(())
            }
            fn get_value(&self) -> Result<Value> {
                Ok(Value::from("not an int"))
            }
            fn check_value_type(&self, value: &Value) -> Result<()> {
                match value {
                    Value::Int(_) => Ok(()),
                    other => Err(Error::value_type("x", "int", other.type_name())),
                }
            }
            fn set_enabled(&mut self, _enabled: bool) {}
            fn is_enabled(&self) -> bool {
                true
            }
            fn highlight(&mut self) {}
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let registry = WidgetRegistry::with_builtins();
        registry
            .register(
                "Liar",
                |_: Option<&dyn Any>, _: &str, _: &Table| -> Result<Box<dyn InputWidget>> {
                    Ok(Box::new(Liar))
                },
                ConfigSchema::new(0i64),
                [],
            )
            .unwrap();
        let caller = Overlays::new().with("x", overlay("widget_class = 'Liar'"));
        let plan = plan(&registry, "def f(x: int)", &caller);
        let err = bind_page(&plan, &registry, None).unwrap_err();
        assert_eq!(err.parameter_name(), Some("x"));
        assert!(matches!(err.root(), Error::WidgetContract { kind, .. } if kind == "Liar"));
    }

    #[test]
    fn test_set_enabled_reaches_every_widget() {
        let registry = WidgetRegistry::with_builtins();
        let plan = plan(&registry, "def f(a: int, b: str)", &Overlays::new());
        let mut page = bind_page(&plan, &registry, None).unwrap();
        page.set_enabled(false);
        assert!(page.iter().all(|b| !b.widget().is_enabled()));
    }
}
