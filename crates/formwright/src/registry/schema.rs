//! Widget config schemas.
//!
//! A [`ConfigSchema`] lists the options a widget kind understands, their
//! types and defaults. Every schema implicitly carries the reserved options
//! (see [`RESERVED_OPTIONS`]); a schema may redeclare one to change its
//! default, but not its type.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::value::{Table, Value};

/// Initial value of the widget. Defaults to the kind's sentinel.
pub const DEFAULT_VALUE: &str = "default_value";
/// Text shown next to the widget. Defaults to the parameter name.
pub const LABEL: &str = "label";
/// Help text for the parameter.
pub const DESCRIPTION: &str = "description";
/// Name of the group box the widget is placed in.
pub const GROUP: &str = "group";
/// Hide the widget for a parameter that has a default.
pub const HIDE_DEFAULT_WIDGET: &str = "hide_default_widget";
/// Whether the widget accepts "no value".
pub const OPTIONAL: &str = "optional";

/// Option names every schema accepts.
pub const RESERVED_OPTIONS: [&str; 6] = [
    DEFAULT_VALUE,
    LABEL,
    DESCRIPTION,
    GROUP,
    HIDE_DEFAULT_WIDGET,
    OPTIONAL,
];

/// The value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Any,
    Bool,
    Int,
    /// Accepts integers as well.
    Float,
    Str,
    List,
    Table,
    /// A string or `None`.
    OptionalStr,
}

impl OptionType {
    /// Whether `value` is acceptable for an option of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::Int, Value::Int(_)) => true,
            (Self::Float, Value::Int(_) | Value::Float(_)) => true,
            (Self::Str | Self::OptionalStr, Value::Str(_)) => true,
            (Self::OptionalStr, Value::None) => true,
            (Self::List, Value::List(_)) => true,
            (Self::Table, Value::Table(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Table => "table",
            Self::OptionalStr => "str or None",
        })
    }
}

/// One option of a widget kind.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub ty: OptionType,
    pub default: Value,
    /// Merge table values key by key instead of replacing them.
    pub deep_merge: bool,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, ty: OptionType, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            default: default.into(),
            deep_merge: false,
        }
    }

    pub fn deep_merge(mut self) -> Self {
        self.deep_merge = true;
        self
    }
}

/// The options understood by a widget kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSchema {
    sentinel: Value,
    declared: BTreeMap<String, OptionSpec>,
    extensible: bool,
    args_option: Option<String>,
}

impl ConfigSchema {
    /// A schema whose "no default given" value is `sentinel`.
    pub fn new(sentinel: impl Into<Value>) -> Self {
        Self {
            sentinel: sentinel.into(),
            declared: BTreeMap::new(),
            extensible: false,
            args_option: None,
        }
    }

    /// Declare an option.
    pub fn option(mut self, spec: OptionSpec) -> Self {
        self.declared.insert(spec.name.clone(), spec);
        self
    }

    /// Accept option keys the schema does not declare.
    pub fn extensible(mut self, extensible: bool) -> Self {
        self.extensible = extensible;
        self
    }

    /// Fill `option` from the parameter's literal values when no overlay
    /// sets it.
    pub fn literal_values_option(mut self, option: impl Into<String>) -> Self {
        self.args_option = Some(option.into());
        self
    }

    /// The initial value used when nothing else supplies one.
    pub fn sentinel(&self) -> &Value {
        &self.sentinel
    }

    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    pub fn args_option(&self) -> Option<&str> {
        self.args_option.as_deref()
    }

    /// Look up an option, declared or reserved.
    pub fn spec(&self, name: &str) -> Option<OptionSpec> {
        self.declared
            .get(name)
            .cloned()
            .or_else(|| self.reserved_spec(name))
    }

    /// Every option name, reserved first.
    pub fn option_names(&self) -> Vec<String> {
        let mut names: Vec<String> = RESERVED_OPTIONS.iter().map(|s| s.to_string()).collect();
        names.extend(
            self.declared
                .keys()
                .filter(|k| !RESERVED_OPTIONS.contains(&k.as_str()))
                .cloned(),
        );
        names
    }

    /// The option defaults, including the reserved options.
    pub fn defaults(&self) -> Table {
        self.option_names()
            .into_iter()
            .filter_map(|name| self.spec(&name).map(|spec| (name, spec.default)))
            .collect()
    }

    /// Check that no declared option changes the type of a reserved one.
    pub fn check_reserved(&self, kind: &str) -> Result<()> {
        for (name, spec) in &self.declared {
            if let Some(reserved) = self.reserved_spec(name)
                && reserved.ty != spec.ty
            {
                return Err(Error::SchemaConflict {
                    kind: kind.to_string(),
                    option: name.clone(),
                    declared: spec.ty.to_string(),
                    reserved: reserved.ty.to_string(),
                });
            }
        }
        Ok(())
    }

    fn reserved_spec(&self, name: &str) -> Option<OptionSpec> {
        let spec = match name {
            DEFAULT_VALUE => OptionSpec::new(name, OptionType::Any, self.sentinel.clone()),
            LABEL | DESCRIPTION | GROUP => OptionSpec::new(name, OptionType::OptionalStr, Value::None),
            HIDE_DEFAULT_WIDGET | OPTIONAL => OptionSpec::new(name, OptionType::Bool, false),
            _ => return None,
        };
        Some(spec)
    }
}
