//! Built-in widget kinds.
//!
//! The built-in kinds cover the common parameter types. Their widgets are
//! headless [`ValueWidget`]s: they hold and validate a value without drawing
//! anything, which is what tests and non-graphical frontends need. A UI
//! backend replaces a kind's factory by registering its own kind under a new
//! name and remapping the type with
//! [`WidgetRegistry::set_default_kind`].

use std::any::Any;

use crate::error::{Error, Result};
use crate::registry::schema::{
    ConfigSchema, DEFAULT_VALUE, HIDE_DEFAULT_WIDGET, OPTIONAL, OptionSpec, OptionType,
};
use crate::registry::{TypeKey, WidgetRegistry};
use crate::value::{Table, Value};
use crate::widget::InputWidget;

const TARGET: &str = "formwright::registry";

pub const INT_SPIN_BOX: &str = "IntSpinBox";
pub const FLOAT_SPIN_BOX: &str = "FloatSpinBox";
pub const BOOL_BOX: &str = "BoolBox";
pub const LINE_EDIT: &str = "LineEdit";
pub const TEXT_EDIT: &str = "TextEdit";
pub const CHOICE_BOX: &str = "ChoiceBox";
pub const MULTI_CHOICE_BOX: &str = "MultiChoiceBox";
pub const STRING_LIST_EDIT: &str = "StringListEdit";
pub const LIST_EDIT: &str = "ListEdit";
pub const DICT_EDIT: &str = "DictEdit";
pub const FILE_PICKER: &str = "FilePicker";
pub const DIR_PICKER: &str = "DirPicker";
pub const COLOR_PICKER: &str = "ColorPicker";
pub const ANY_VALUE_EDIT: &str = "AnyValueEdit";

/// The kind of value a [`ValueWidget`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Int,
    Float,
    Bool,
    Str,
    /// One of the `choices` option. Unless the parameter is optional, an
    /// unset value selects the first choice, as a combo box always shows a
    /// current item. `None` only when there are no choices.
    Choice,
    /// A list drawn from the `choices` option.
    MultiChoice,
    StrList,
    List,
    Table,
    /// A `#rrggbb` or `#rrggbbaa` string.
    Color,
    Any,
}

impl ValueShape {
    fn expected(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str | Self::Color => "str",
            Self::Choice | Self::Any => "any",
            Self::MultiChoice | Self::List => "list",
            Self::StrList => "list of str",
            Self::Table => "table",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any | Self::Choice, _) => true,
            (Self::Int, Value::Int(_)) => true,
            (Self::Float, Value::Int(_) | Value::Float(_)) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::Str | Self::Color, Value::Str(_)) => true,
            (Self::MultiChoice | Self::List, Value::List(_)) => true,
            (Self::StrList, Value::List(items)) => items.iter().all(|v| v.as_str().is_some()),
            (Self::Table, Value::Table(_)) => true,
            _ => false,
        }
    }
}

/// A headless input widget.
#[derive(Debug, Clone)]
pub struct ValueWidget {
    kind: String,
    parameter_name: String,
    shape: ValueShape,
    options: Table,
    value: Value,
    enabled: bool,
    highlighted: bool,
}

impl ValueWidget {
    /// A widget of `kind` for `parameter_name`, starting at the options'
    /// `default_value`.
    pub fn new(
        kind: impl Into<String>,
        shape: ValueShape,
        parameter_name: impl Into<String>,
        options: &Table,
    ) -> Self {
        let mut widget = Self {
            kind: kind.into(),
            parameter_name: parameter_name.into(),
            shape,
            value: Value::None,
            options: options.clone(),
            enabled: true,
            highlighted: false,
        };
        widget.value = widget.held(options.get(DEFAULT_VALUE).cloned().unwrap_or_default());
        widget
    }

    pub fn shape(&self) -> ValueShape {
        self.shape
    }

    pub fn options(&self) -> &Table {
        &self.options
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    /// Whether the widget is hidden because its parameter has a default.
    pub fn is_hidden(&self) -> bool {
        self.options
            .get(HIDE_DEFAULT_WIDGET)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// What the widget holds after being given `value`.
    fn held(&self, value: Value) -> Value {
        match (self.shape, value) {
            (ValueShape::Float, Value::Int(i)) => Value::Float(i as f64),
            (ValueShape::Choice, Value::None) if !self.optional() => {
                self.choices().first().cloned().unwrap_or_default()
            }
            (_, value) => value,
        }
    }

    fn optional(&self) -> bool {
        self.options
            .get(OPTIONAL)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn choices(&self) -> &[Value] {
        self.options
            .get("choices")
            .and_then(Value::as_list)
            .unwrap_or(&[])
    }

    fn number_option(&self, name: &str) -> Option<f64> {
        self.options.get(name).and_then(Value::as_f64)
    }

    fn range_error(&self, value: f64) -> Option<String> {
        if let Some(min) = self.number_option("min_value")
            && value < min
        {
            return Some(format!("{value} is below the minimum {min}"));
        }
        if let Some(max) = self.number_option("max_value")
            && value > max
        {
            return Some(format!("{value} is above the maximum {max}"));
        }
        None
    }
}

impl InputWidget for ValueWidget {
    fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn set_value(&mut self, value: Value) -> Result<()> {
        self.check_value_type(&value)?;
        self.value = self.held(value);
        Ok(())
    }

    fn get_value(&self) -> Result<Value> {
        Ok(self.value.clone())
    }

    fn check_value_type(&self, value: &Value) -> Result<()> {
        if self.shape.accepts(value) || (value.is_none() && self.optional()) {
            Ok(())
        } else {
            Err(Error::value_type(
                &self.parameter_name,
                self.shape.expected(),
                value.type_name(),
            ))
        }
    }

    fn validation_error(&self) -> Option<String> {
        let value = &self.value;
        if value.is_none() {
            let allowed = self.optional() || matches!(self.shape, ValueShape::Any);
            return (!allowed).then(|| "a value is required".to_string());
        }
        match self.shape {
            ValueShape::Int | ValueShape::Float => value.as_f64().and_then(|v| self.range_error(v)),
            ValueShape::Str => {
                let max = self.options.get("max_length").and_then(Value::as_i64)?;
                let len = value.as_str().map_or(0, |s| s.chars().count());
                (max > 0 && len as i64 > max)
                    .then(|| format!("longer than {max} characters"))
            }
            ValueShape::Choice => {
                let choices = self.choices();
                (!choices.is_empty() && !choices.contains(value))
                    .then(|| format!("{} is not one of the choices", value.repr()))
            }
            ValueShape::MultiChoice => {
                let choices = self.choices();
                value
                    .as_list()
                    .and_then(|items| items.iter().find(|item| !choices.contains(item)))
                    .map(|item| format!("{} is not one of the choices", item.repr()))
            }
            ValueShape::Color => {
                let text = value.as_str().unwrap_or_default();
                (!is_color(text)).then(|| format!("'{text}' is not a #rrggbb color"))
            }
            _ => None,
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn highlight(&mut self) {
        self.highlighted = true;
    }

    fn clear_highlight(&mut self) {
        self.highlighted = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn is_color(text: &str) -> bool {
    text.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

struct BuiltinKind {
    name: &'static str,
    shape: ValueShape,
    schema: ConfigSchema,
    default_for: Vec<TypeKey>,
}

fn str_opt(name: &str, default: &str) -> OptionSpec {
    OptionSpec::new(name, OptionType::Str, default)
}

fn builtin_kinds() -> Vec<BuiltinKind> {
    let int_range = |name: &str, v: i64| OptionSpec::new(name, OptionType::Int, v);
    let float_opt = |name: &str, v: f64| OptionSpec::new(name, OptionType::Float, v);
    let list_of = |head: &str, arg: &str| TypeKey::extended(head, [arg]);

    let mut editor = Table::new();
    editor.insert("key_header".to_string(), Value::from("Key"));
    editor.insert("value_header".to_string(), Value::from("Value"));

    vec![
        BuiltinKind {
            name: INT_SPIN_BOX,
            shape: ValueShape::Int,
            schema: ConfigSchema::new(0i64)
                .option(int_range("min_value", i32::MIN.into()))
                .option(int_range("max_value", i32::MAX.into()))
                .option(int_range("step", 1))
                .option(str_opt("prefix", ""))
                .option(str_opt("suffix", ""))
                .option(int_range("display_integer_base", 10)),
            default_for: vec![TypeKey::head("int")],
        },
        BuiltinKind {
            name: FLOAT_SPIN_BOX,
            shape: ValueShape::Float,
            schema: ConfigSchema::new(0.0)
                .option(float_opt("min_value", f64::from(i32::MIN)))
                .option(float_opt("max_value", f64::from(i32::MAX)))
                .option(float_opt("step", 1.0))
                .option(int_range("decimals", 2))
                .option(str_opt("prefix", ""))
                .option(str_opt("suffix", "")),
            default_for: vec![TypeKey::head("float")],
        },
        BuiltinKind {
            name: BOOL_BOX,
            shape: ValueShape::Bool,
            schema: ConfigSchema::new(false)
                .option(str_opt("true_text", "True"))
                .option(str_opt("false_text", "False")),
            default_for: vec![TypeKey::head("bool")],
        },
        BuiltinKind {
            name: LINE_EDIT,
            shape: ValueShape::Str,
            schema: ConfigSchema::new("")
                .option(str_opt("placeholder", ""))
                .option(OptionSpec::new("clear_button", OptionType::Bool, false))
                .option(int_range("max_length", 0))
                .option(str_opt("echo_mode", "normal")),
            default_for: vec![TypeKey::head("str")],
        },
        BuiltinKind {
            name: TEXT_EDIT,
            shape: ValueShape::Str,
            schema: ConfigSchema::new("")
                .option(str_opt("placeholder", ""))
                .option(int_range("min_height", 0)),
            default_for: vec![TypeKey::head("text")],
        },
        BuiltinKind {
            name: CHOICE_BOX,
            shape: ValueShape::Choice,
            schema: ConfigSchema::new(Value::None)
                .option(OptionSpec::new("choices", OptionType::List, Value::List(Vec::new())))
                .option(OptionSpec::new("editable", OptionType::Bool, false))
                .literal_values_option("choices"),
            default_for: vec![TypeKey::head("Literal"), TypeKey::head("Enum")],
        },
        BuiltinKind {
            name: MULTI_CHOICE_BOX,
            shape: ValueShape::MultiChoice,
            schema: ConfigSchema::new(Value::List(Vec::new()))
                .option(OptionSpec::new("choices", OptionType::List, Value::List(Vec::new())))
                .option(int_range("columns", 1))
                .literal_values_option("choices"),
            default_for: vec![list_of("list", "Literal"), list_of("set", "Literal")],
        },
        BuiltinKind {
            name: STRING_LIST_EDIT,
            shape: ValueShape::StrList,
            schema: ConfigSchema::new(Value::List(Vec::new())).option(str_opt("placeholder", "")),
            default_for: vec![list_of("list", "str")],
        },
        BuiltinKind {
            name: LIST_EDIT,
            shape: ValueShape::List,
            schema: ConfigSchema::new(Value::List(Vec::new())),
            default_for: vec![
                TypeKey::head("list"),
                TypeKey::head("tuple"),
                TypeKey::head("set"),
            ],
        },
        BuiltinKind {
            name: DICT_EDIT,
            shape: ValueShape::Table,
            schema: ConfigSchema::new(Table::new())
                .option(OptionSpec::new("editor", OptionType::Table, editor).deep_merge()),
            default_for: vec![TypeKey::head("dict")],
        },
        BuiltinKind {
            name: FILE_PICKER,
            shape: ValueShape::Str,
            schema: ConfigSchema::new("")
                .option(str_opt("filters", ""))
                .option(str_opt("start_dir", ""))
                .option(OptionSpec::new("save_file", OptionType::Bool, false))
                .option(str_opt("dialog_title", "")),
            default_for: vec![
                TypeKey::head("file path"),
                TypeKey::head("file"),
                TypeKey::head("Path"),
                TypeKey::head("PathLike"),
            ],
        },
        BuiltinKind {
            name: DIR_PICKER,
            shape: ValueShape::Str,
            schema: ConfigSchema::new("")
                .option(str_opt("start_dir", ""))
                .option(str_opt("dialog_title", "")),
            default_for: vec![TypeKey::head("dir path"), TypeKey::head("directory")],
        },
        BuiltinKind {
            name: COLOR_PICKER,
            shape: ValueShape::Color,
            schema: ConfigSchema::new("#ffffff")
                .option(OptionSpec::new("alpha_channel", OptionType::Bool, false))
                .option(OptionSpec::new("display_color_name", OptionType::Bool, true)),
            default_for: vec![TypeKey::head("color")],
        },
        BuiltinKind {
            name: ANY_VALUE_EDIT,
            shape: ValueShape::Any,
            schema: ConfigSchema::new(Value::None).option(str_opt("placeholder", "")),
            default_for: vec![TypeKey::head(crate::types::ANY_TYPE)],
        },
    ]
}

/// Register the built-in kinds. Kinds already present are left alone.
pub fn install(registry: &WidgetRegistry) {
    for builtin in builtin_kinds() {
        let BuiltinKind {
            name,
            shape,
            schema,
            default_for,
        } = builtin;
        if registry.contains(name) {
            continue;
        }
        let factory = move |_parent: Option<&dyn Any>,
                            parameter: &str,
                            options: &Table|
              -> Result<Box<dyn InputWidget>> {
            Ok(Box::new(ValueWidget::new(name, shape, parameter, options)))
        };
        if let Err(err) = registry.register(name, factory, schema, default_for) {
            tracing::warn!(target: TARGET, kind = name, error = %err, "failed to register built-in widget kind");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(kind: &str) -> Box<dyn InputWidget> {
        let registry = WidgetRegistry::with_builtins();
        let registered = registry.lookup(kind).unwrap();
        let options = registered.schema.defaults();
        registered.factory.create(None, "p", &options).unwrap()
    }

    #[test]
    fn test_every_builtin_holds_its_sentinel() {
        let registry = WidgetRegistry::with_builtins();
        for kind in registry.kinds() {
            let registered = registry.lookup(&kind).unwrap();
            let options = registered.schema.defaults();
            let mut w = registered.factory.create(None, "p", &options).unwrap();
            let sentinel = registered.schema.sentinel().clone();
            w.check_value_type(&sentinel).unwrap();
            w.set_value(sentinel).unwrap();
            let back = w.get_value().unwrap();
            w.check_value_type(&back).unwrap();
            assert_eq!(w.kind(), kind);
        }
    }

    #[test]
    fn test_type_mismatch() {
        let mut w = widget(INT_SPIN_BOX);
        let err = w.set_value(Value::from("ten")).unwrap_err();
        assert!(matches!(err, Error::ValueType { expected, .. } if expected == "int"));
        assert!(w.set_value(Value::None).is_err());
    }

    #[test]
    fn test_float_widens_ints() {
        let mut w = widget(FLOAT_SPIN_BOX);
        w.set_value(Value::Int(2)).unwrap();
        assert_eq!(w.get_value().unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_range_validation() {
        let registry = WidgetRegistry::with_builtins();
        let registered = registry.lookup(INT_SPIN_BOX).unwrap();
        let mut options = registered.schema.defaults();
        options.insert("max_value".into(), Value::Int(10));
        let mut w = registered.factory.create(None, "n", &options).unwrap();
        w.set_value(Value::Int(11)).unwrap();
        assert!(!w.validate());
        assert!(w.validation_error().unwrap().contains("maximum"));
        w.set_value(Value::Int(10)).unwrap();
        assert!(w.validate());
    }

    #[test]
    fn test_choice_box() {
        let registry = WidgetRegistry::with_builtins();
        let registered = registry.lookup(CHOICE_BOX).unwrap();
        let mut options = registered.schema.defaults();
        options.insert("choices".into(), Value::from(vec!["a", "b"]));
        let mut w = registered.factory.create(None, "c", &options).unwrap();
        assert_eq!(w.get_value().unwrap(), Value::from("a"));
        assert!(w.validate());
        w.set_value(Value::from("z")).unwrap();
        assert!(!w.validate());

        // clearing selects the first choice again; the held value is what
        // get_value reports
        w.set_value(Value::None).unwrap();
        assert_eq!(w.get_value().unwrap(), Value::from("a"));
        let concrete = w.as_any().downcast_ref::<ValueWidget>().unwrap();
        assert_eq!(concrete.value, Value::from("a"));
    }

    #[test]
    fn test_choice_box_unset_states() {
        let registry = WidgetRegistry::with_builtins();
        let registered = registry.lookup(CHOICE_BOX).unwrap();

        let empty = registered.factory.create(None, "c", &registered.schema.defaults()).unwrap();
        assert_eq!(empty.get_value().unwrap(), Value::None);
        assert_eq!(empty.validation_error().as_deref(), Some("a value is required"));

        let mut options = registered.schema.defaults();
        options.insert("choices".into(), Value::from(vec!["a", "b"]));
        options.insert(OPTIONAL.into(), Value::Bool(true));
        let optional = registered.factory.create(None, "c", &options).unwrap();
        assert_eq!(optional.get_value().unwrap(), Value::None);
        assert!(optional.validate());
    }

    #[test]
    fn test_optional_accepts_none() {
        let registry = WidgetRegistry::with_builtins();
        let registered = registry.lookup(LINE_EDIT).unwrap();
        let mut options = registered.schema.defaults();
        options.insert(OPTIONAL.into(), Value::Bool(true));
        let mut w = registered.factory.create(None, "s", &options).unwrap();
        w.set_value(Value::None).unwrap();
        assert!(w.validate());
    }

    #[test]
    fn test_string_list_and_color() {
        let mut list = widget(STRING_LIST_EDIT);
        assert!(list.set_value(Value::from(vec!["x", "y"])).is_ok());
        assert!(list.set_value(Value::from(vec![1i64])).is_err());

        let mut color = widget(COLOR_PICKER);
        assert!(color.validate());
        color.set_value(Value::from("red")).unwrap();
        assert!(!color.validate());
    }

    #[test]
    fn test_highlight_and_enable() {
        let mut w = widget(BOOL_BOX);
        w.highlight();
        w.set_enabled(false);
        let concrete = w.as_any().downcast_ref::<ValueWidget>().unwrap();
        assert!(concrete.is_highlighted());
        assert!(!w.is_enabled());
        w.clear_highlight();
        assert!(!w.as_any().downcast_ref::<ValueWidget>().unwrap().is_highlighted());
    }

    #[test]
    fn test_install_is_idempotent() {
        let registry = WidgetRegistry::with_builtins();
        let before = registry.kinds();
        install(&registry);
        assert_eq!(registry.kinds(), before);
    }
}
