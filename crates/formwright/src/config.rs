//! Typed widget configs.
//!
//! Overlays are plain option tables, but building them by hand is easy to
//! get wrong. The records here name the options of the built-in kinds and
//! convert into an overlay table that also pins the widget kind.
//!
//! ```
//! use formwright::config::{CommonOptions, IntSpinBoxConfig, WidgetConfig};
//! use formwright::Value;
//!
//! let config = IntSpinBoxConfig {
//!     default_value: Some(3),
//!     max_value: Some(10),
//!     common: CommonOptions::labeled("Retries"),
//!     ..Default::default()
//! };
//! let options = config.to_options().unwrap();
//! assert_eq!(options["widget_class"], Value::from("IntSpinBox"));
//! assert_eq!(options["max_value"], Value::Int(10));
//! assert_eq!(options["label"], Value::from("Retries"));
//! assert!(!options.contains_key("min_value"));
//! ```

use serde::Serialize;

use crate::error::Result;
use crate::registry::builtin;
use crate::resolver::WIDGET_CLASS;
use crate::value::{Table, Value};

/// A typed overlay for one widget kind.
pub trait WidgetConfig: Serialize {
    /// The kind this config selects.
    const KIND: &'static str;

    /// The set options, plus `widget_class`.
    fn to_options(&self) -> Result<Table> {
        let mut options = match Value::from(toml::Value::try_from(self)?) {
            Value::Table(table) => table,
            _ => Table::new(),
        };
        options.insert(WIDGET_CLASS.to_string(), Value::from(Self::KIND));
        Ok(options)
    }
}

/// Options every kind accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommonOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_default_widget: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

impl CommonOptions {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn grouped(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntSpinBoxConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl WidgetConfig for IntSpinBoxConfig {
    const KIND: &'static str = builtin::INT_SPIN_BOX;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FloatSpinBoxConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<i64>,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl WidgetConfig for FloatSpinBoxConfig {
    const KIND: &'static str = builtin::FLOAT_SPIN_BOX;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolBoxConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_text: Option<String>,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl WidgetConfig for BoolBoxConfig {
    const KIND: &'static str = builtin::BOOL_BOX;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineEditConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_button: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo_mode: Option<String>,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl WidgetConfig for LineEditConfig {
    const KIND: &'static str = builtin::LINE_EDIT;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextEditConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_height: Option<i64>,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl WidgetConfig for TextEditConfig {
    const KIND: &'static str = builtin::TEXT_EDIT;
}

/// Choices are strings here; use a plain overlay table for other values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChoiceBoxConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl WidgetConfig for ChoiceBoxConfig {
    const KIND: &'static str = builtin::CHOICE_BOX;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilePickerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_file: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog_title: Option<String>,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl WidgetConfig for FilePickerConfig {
    const KIND: &'static str = builtin::FILE_PICKER;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DictEditConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_header: Option<String>,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl WidgetConfig for DictEditConfig {
    const KIND: &'static str = builtin::DICT_EDIT;

    /// Headers live in the deep-merged `editor` table.
    fn to_options(&self) -> Result<Table> {
        let mut options = match Value::from(toml::Value::try_from(&self.common)?) {
            Value::Table(table) => table,
            _ => Table::new(),
        };
        let mut editor = Table::new();
        if let Some(header) = &self.key_header {
            editor.insert("key_header".to_string(), Value::from(header.as_str()));
        }
        if let Some(header) = &self.value_header {
            editor.insert("value_header".to_string(), Value::from(header.as_str()));
        }
        if !editor.is_empty() {
            options.insert("editor".to_string(), Value::Table(editor));
        }
        options.insert(WIDGET_CLASS.to_string(), Value::from(Self::KIND));
        Ok(options)
    }
}
