//! Dynamic values exchanged between widgets, options and functions.
//!
//! Widget options, initial values, harvested arguments and function results
//! are all [`Value`]s. Structural variants clone deeply; [`Value::Opaque`]
//! wraps an arbitrary shared object that is compared by identity.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FunctionError;

/// An ordered, string-keyed map of values.
pub type Table = BTreeMap<String, Value>;

/// A dynamically typed value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// The absence of a value.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered sequence.
    List(Vec<Value>),
    /// A string-keyed table.
    Table(Table),
    /// An arbitrary host object.
    Opaque(OpaqueValue),
}

/// A shared handle to a host object carried through the library untouched.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    /// Wrap a host object.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// The Rust type name of the wrapped object.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped object as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", self.type_name)
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Value {
    /// Wrap a host object as an opaque value.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(OpaqueValue::new(value))
    }

    /// A short name of this value's variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Table(_) => "table",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Render the value the way it would be written as a literal.
    ///
    /// Strings are quoted, unlike [`Display`](fmt::Display) which prints
    /// their raw content.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Table(table) => {
                let inner: Vec<String> = table
                    .iter()
                    .map(|(k, v)| format!("{k:?}: {}", v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            other => other.to_string(),
        }
    }

    /// Parse a literal written in signature syntax.
    ///
    /// Accepts `None`, `True`/`False`, integers (with `_` separators,
    /// `0x`/`0o`/`0b` prefixes), floats, single- or double-quoted strings,
    /// lists, tuples and dicts. Returns `None` when the text is not a pure
    /// literal.
    pub fn from_literal(text: &str) -> Option<Value> {
        let mut parser = LiteralParser::new(text);
        let value = parser.parse_value()?;
        parser.skip_ws();
        if parser.at_end() { Some(value) } else { None }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(_) | Value::Table(_) => write!(f, "{}", self.repr()),
            Value::Opaque(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Table> for Value {
    fn from(v: Table) -> Self {
        Value::Table(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl From<toml::Value> for Value {
    fn from(v: toml::Value) -> Self {
        match v {
            toml::Value::String(s) => Value::Str(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => Value::Table(table_from_toml(table)),
        }
    }
}

/// Convert a TOML table into a value table.
pub fn table_from_toml(table: toml::Table) -> Table {
    table.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

impl Value {
    /// Convert into a TOML value.
    ///
    /// Fails, handing back the offending value, for `None` and opaque
    /// values, which TOML cannot represent.
    pub fn into_toml(self) -> Result<toml::Value, Value> {
        Ok(match self {
            Value::Bool(b) => toml::Value::Boolean(b),
            Value::Int(i) => toml::Value::Integer(i),
            Value::Float(f) => toml::Value::Float(f),
            Value::Str(s) => toml::Value::String(s),
            Value::List(items) => toml::Value::Array(
                items
                    .into_iter()
                    .map(Value::into_toml)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Table(table) => {
                let mut out = toml::Table::new();
                for (k, v) in table {
                    out.insert(k, v.into_toml()?);
                }
                toml::Value::Table(out)
            }
            other @ (Value::None | Value::Opaque(_)) => return Err(other),
        })
    }
}

/// Argument values keyed by parameter name, as passed to a function body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Table,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an argument, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn as_table(&self) -> &Table {
        &self.values
    }

    pub fn into_table(self) -> Table {
        self.values
    }

    /// The argument named `name`, or a `KeyError`.
    pub fn require(&self, name: &str) -> Result<&Value, FunctionError> {
        self.values
            .get(name)
            .ok_or_else(|| FunctionError::with_kind("KeyError", format!("missing argument '{name}'")))
    }

    pub fn get_i64(&self, name: &str) -> Result<i64, FunctionError> {
        let value = self.require(name)?;
        value.as_i64().ok_or_else(|| type_error(name, "int", value))
    }

    pub fn get_f64(&self, name: &str) -> Result<f64, FunctionError> {
        let value = self.require(name)?;
        value.as_f64().ok_or_else(|| type_error(name, "float", value))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, FunctionError> {
        let value = self.require(name)?;
        value.as_bool().ok_or_else(|| type_error(name, "bool", value))
    }

    pub fn get_str(&self, name: &str) -> Result<&str, FunctionError> {
        let value = self.require(name)?;
        value.as_str().ok_or_else(|| type_error(name, "str", value))
    }
}

fn type_error(name: &str, expected: &str, actual: &Value) -> FunctionError {
    FunctionError::with_kind(
        "TypeError",
        format!("argument '{name}' must be {expected}, not {}", actual.type_name()),
    )
}

impl From<Table> for Arguments {
    fn from(values: Table) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '[' => self.parse_sequence('[', ']'),
            '(' => self.parse_sequence('(', ')'),
            '{' => self.parse_dict(),
            '"' | '\'' => self.parse_string().map(Value::Str),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.parse_number(),
            c if c.is_alphabetic() || c == '_' => {
                let word = self.take_while(|c| c.is_alphanumeric() || c == '_');
                match word.as_str() {
                    "None" => Some(Value::None),
                    "True" => Some(Value::Bool(true)),
                    "False" => Some(Value::Bool(false)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_sequence(&mut self, open: char, close: char) -> Option<Value> {
        if !self.eat(open) {
            return None;
        }
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Some(Value::List(items));
            }
            items.push(self.parse_value()?);
            if self.eat(',') {
                continue;
            }
            return self.eat(close).then_some(Value::List(items));
        }
    }

    fn parse_dict(&mut self) -> Option<Value> {
        if !self.eat('{') {
            return None;
        }
        let mut table = Table::new();
        loop {
            if self.eat('}') {
                return Some(Value::Table(table));
            }
            let key = match self.parse_value()? {
                Value::Str(s) => s,
                other => other.to_string(),
            };
            if !self.eat(':') {
                return None;
            }
            let value = self.parse_value()?;
            table.insert(key, value);
            if self.eat(',') {
                continue;
            }
            return self.eat('}').then_some(Value::Table(table));
        }
    }

    fn parse_string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let c = self.peek()?;
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self.peek()?;
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                c if c == quote => return Some(out),
                c => out.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Option<Value> {
        let text = self.take_while(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_')
        });
        let cleaned = text.replace('_', "");
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
        };
        let radix = match digits.get(..2) {
            Some("0x") | Some("0X") => Some(16),
            Some("0o") | Some("0O") => Some(8),
            Some("0b") | Some("0B") => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            let magnitude = i64::from_str_radix(&digits[2..], radix).ok()?;
            return Some(Value::Int(if negative { -magnitude } else { magnitude }));
        }
        if let Ok(i) = cleaned.parse::<i64>() {
            return Some(Value::Int(i));
        }
        cleaned.parse::<f64>().ok().map(Value::Float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_scalars() {
        assert_eq!(Value::from_literal("None"), Some(Value::None));
        assert_eq!(Value::from_literal("True"), Some(Value::Bool(true)));
        assert_eq!(Value::from_literal("False"), Some(Value::Bool(false)));
        assert_eq!(Value::from_literal("42"), Some(Value::Int(42)));
        assert_eq!(Value::from_literal("-7"), Some(Value::Int(-7)));
        assert_eq!(Value::from_literal("1_000"), Some(Value::Int(1000)));
        assert_eq!(Value::from_literal("0x1F"), Some(Value::Int(31)));
        assert_eq!(Value::from_literal("2.5"), Some(Value::Float(2.5)));
        assert_eq!(Value::from_literal("1e3"), Some(Value::Float(1000.0)));
        assert_eq!(Value::from_literal("'hi'"), Some(Value::from("hi")));
        assert_eq!(Value::from_literal(r#""a\nb""#), Some(Value::from("a\nb")));
    }

    #[test]
    fn test_literal_containers() {
        assert_eq!(
            Value::from_literal("[1, 2, 3]"),
            Some(Value::from(vec![1i64, 2, 3]))
        );
        assert_eq!(
            Value::from_literal("('a', 1,)"),
            Some(Value::List(vec![Value::from("a"), Value::Int(1)]))
        );
        let mut expected = Table::new();
        expected.insert("k".to_string(), Value::Int(1));
        expected.insert("2".to_string(), Value::Bool(true));
        assert_eq!(
            Value::from_literal("{'k': 1, 2: True}"),
            Some(Value::Table(expected))
        );
        assert_eq!(Value::from_literal("[]"), Some(Value::List(Vec::new())));
    }

    #[test]
    fn test_non_literals() {
        assert_eq!(Value::from_literal("os.getcwd()"), None);
        assert_eq!(Value::from_literal("[1, foo]"), None);
        assert_eq!(Value::from_literal("1 + 2"), None);
        assert_eq!(Value::from_literal("'unterminated"), None);
    }

    #[test]
    fn test_display_and_repr() {
        assert_eq!(Value::from("text").to_string(), "text");
        assert_eq!(Value::from("text").repr(), "\"text\"");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[\"a\", \"b\"]");
        assert_eq!(Value::None.to_string(), "None");
    }

    #[test]
    fn test_toml_conversion() {
        let parsed: toml::Table = toml::from_str("a = 1\nb = [true]\n[c]\nd = 'x'").unwrap();
        let table = table_from_toml(parsed);
        assert_eq!(table["a"], Value::Int(1));
        assert_eq!(table["b"], Value::List(vec![Value::Bool(true)]));
        assert_eq!(table["c"].as_table().unwrap()["d"], Value::from("x"));

        let back = Value::Table(table).into_toml().unwrap();
        assert!(back.is_table());
        assert!(Value::None.into_toml().is_err());
    }

    #[test]
    fn test_arguments_accessors() {
        let args: Arguments = [("n", Value::Int(3)), ("name", Value::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(args.get_i64("n").unwrap(), 3);
        assert_eq!(args.get_f64("n").unwrap(), 3.0);
        assert_eq!(args.get_str("name").unwrap(), "x");
        assert_eq!(args.get_bool("n").unwrap_err().kind, "TypeError");
        assert_eq!(args.get_i64("missing").unwrap_err().kind, "KeyError");
    }

    #[test]
    fn test_opaque_identity() {
        let a = Value::opaque(vec![1u8, 2, 3]);
        let b = a.clone();
        let c = Value::opaque(vec![1u8, 2, 3]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        if let Value::Opaque(o) = &a {
            assert_eq!(o.downcast_ref::<Vec<u8>>(), Some(&vec![1u8, 2, 3]));
        }
    }
}
