//! Type descriptors parsed from parameter annotations.
//!
//! An annotation such as `list[int]`, `Optional[str]`, `int | None` or
//! `Literal["a", "b"]` is reduced to a [`TypeDescriptor`]: a head name used
//! for widget lookup, the heads of its type arguments, and an optional flag.
//! Common aliases are canonicalized (`List` → `list`, `typing.Dict` →
//! `dict`, `Any` → `any`).

use std::fmt;

use crate::error::{Error, Result};
use crate::value::Value;

/// The type head used when a parameter has no annotation.
pub const ANY_TYPE: &str = "any";

/// A parsed type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Canonical head name, e.g. `"int"`, `"list"`, `"Literal"`.
    pub head: String,
    /// Head names of the type arguments. For `Literal`, the literal values
    /// rendered as strings.
    pub args: Vec<String>,
    /// Whether `None` is an accepted value.
    pub optional: bool,
    /// Literal values found in the annotation, including nested `Literal`
    /// arguments such as `list[Literal[1, 2]]`.
    pub literals: Vec<Value>,
}

impl TypeDescriptor {
    /// A bare head with no arguments.
    pub fn new(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            args: Vec::new(),
            optional: false,
            literals: Vec::new(),
        }
    }

    /// The descriptor used for unannotated parameters.
    pub fn any() -> Self {
        Self::new(ANY_TYPE)
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn is_any(&self) -> bool {
        self.head == ANY_TYPE
    }

    /// Parse an annotation.
    ///
    /// A quoted annotation (`"list[int]"`) is unquoted first. Unions that
    /// include `None` become optional; unions of several other types keep
    /// the head `Union`.
    pub fn parse(annotation: &str) -> Result<Self> {
        let text = unquote(annotation.trim());
        if text.is_empty() {
            return Err(Error::type_annotation(annotation, "empty annotation"));
        }
        check_balanced(text).map_err(|reason| Error::type_annotation(annotation, reason))?;
        parse_union(text, split_top_level(text, '|'))
            .map_err(|reason| Error::type_annotation(annotation, reason))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.args.is_empty() {
            write!(f, "[{}]", self.args.join(", "))?;
        }
        if self.optional {
            write!(f, " | None")?;
        }
        Ok(())
    }
}

fn parse_union(text: &str, parts: Vec<&str>) -> std::result::Result<TypeDescriptor, String> {
    let mut optional = false;
    let mut members = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            return Err(format!("empty union member in '{text}'"));
        }
        if is_none_type(part) {
            optional = true;
        } else {
            members.push(part);
        }
    }

    match members.as_slice() {
        [] => Ok(TypeDescriptor::new("None").optional(true)),
        [single] => {
            let mut desc = parse_single(single)?;
            desc.optional |= optional;
            Ok(desc)
        }
        many => {
            let mut heads = Vec::with_capacity(many.len());
            let mut literals = Vec::new();
            for member in many {
                let desc = parse_single(member)?;
                literals.extend(desc.literals);
                heads.push(desc.head);
            }
            Ok(TypeDescriptor {
                head: "Union".to_string(),
                args: heads,
                optional,
                literals,
            })
        }
    }
}

fn parse_single(text: &str) -> std::result::Result<TypeDescriptor, String> {
    let text = text.trim();
    let (raw_head, inner) = match text.find('[') {
        Some(open) => {
            if !text.ends_with(']') {
                return Err(format!("trailing characters after ']' in '{text}'"));
            }
            (&text[..open], Some(&text[open + 1..text.len() - 1]))
        }
        None => (text, None),
    };
    let head = canonical_head(raw_head.trim());
    if head.is_empty() {
        return Err(format!("missing type name in '{text}'"));
    }

    let Some(inner) = inner else {
        return Ok(TypeDescriptor::new(head));
    };
    let args = split_top_level(inner, ',')
        .into_iter()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>();

    match head.as_str() {
        "Optional" => {
            let [arg] = args.as_slice() else {
                return Err("Optional takes exactly one argument".to_string());
            };
            let mut desc = parse_union(arg, split_top_level(arg, '|'))?;
            desc.optional = true;
            Ok(desc)
        }
        "Union" => parse_union(inner, args),
        "Annotated" => match args.first() {
            Some(first) => parse_union(first, split_top_level(first, '|')),
            None => Err("Annotated needs a type argument".to_string()),
        },
        "Literal" => {
            let mut desc = TypeDescriptor::new(head);
            for arg in args {
                let value = Value::from_literal(arg)
                    .ok_or_else(|| format!("'{arg}' is not a literal value"))?;
                desc.args.push(match &value {
                    Value::Str(s) => s.clone(),
                    other => other.to_string(),
                });
                desc.literals.push(value);
            }
            Ok(desc)
        }
        _ => {
            let mut desc = TypeDescriptor::new(head);
            for arg in args {
                if arg == "..." {
                    continue;
                }
                let nested = parse_union(arg, split_top_level(arg, '|'))?;
                desc.literals.extend(nested.literals);
                desc.args.push(nested.head);
            }
            Ok(desc)
        }
    }
}

fn is_none_type(text: &str) -> bool {
    matches!(text, "None" | "NoneType" | "types.NoneType")
}

/// Strip a module path and map well-known aliases to canonical names.
fn canonical_head(raw: &str) -> String {
    let name = match raw.rsplit_once('.') {
        Some((module, name)) if !module.is_empty() && !raw.contains(' ') => name,
        _ => raw,
    };
    let canonical = match name {
        "List" | "Sequence" | "MutableSequence" => "list",
        "Tuple" => "tuple",
        "Dict" | "Mapping" | "MutableMapping" => "dict",
        "Set" | "FrozenSet" | "frozenset" | "AbstractSet" => "set",
        "Any" | "object" => ANY_TYPE,
        "string" => "str",
        "integer" => "int",
        "double" => "float",
        "boolean" => "bool",
        other => other,
    };
    canonical.to_string()
}

fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].trim();
        }
    }
    text
}

fn check_balanced(text: &str) -> std::result::Result<(), String> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced closing bracket".to_string());
                }
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return Err("unbalanced brackets or quotes".to_string());
    }
    Ok(())
}

/// Split on `sep` where it is not nested inside brackets or quotes.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_heads() {
        assert_eq!(TypeDescriptor::parse("int").unwrap(), TypeDescriptor::new("int"));
        assert_eq!(TypeDescriptor::parse("typing.Any").unwrap().head, "any");
        assert_eq!(TypeDescriptor::parse("'str'").unwrap().head, "str");
        assert_eq!(TypeDescriptor::parse("file path").unwrap().head, "file path");
    }

    #[test]
    fn test_generic_args() {
        let desc = TypeDescriptor::parse("List[int]").unwrap();
        assert_eq!(desc.head, "list");
        assert_eq!(desc.args, vec!["int"]);

        let desc = TypeDescriptor::parse("dict[str, list[float]]").unwrap();
        assert_eq!(desc.head, "dict");
        assert_eq!(desc.args, vec!["str", "list"]);

        let desc = TypeDescriptor::parse("tuple[int, ...]").unwrap();
        assert_eq!(desc.args, vec!["int"]);
    }

    #[test]
    fn test_optional_forms() {
        for text in ["Optional[int]", "Union[int, None]", "int | None", "None | int"] {
            let desc = TypeDescriptor::parse(text).unwrap();
            assert_eq!(desc.head, "int", "{text}");
            assert!(desc.optional, "{text}");
        }
        let desc = TypeDescriptor::parse("Optional[list[str]]").unwrap();
        assert_eq!(desc.head, "list");
        assert_eq!(desc.args, vec!["str"]);
        assert!(desc.optional);
    }

    #[test]
    fn test_multi_member_union() {
        let desc = TypeDescriptor::parse("int | str | None").unwrap();
        assert_eq!(desc.head, "Union");
        assert_eq!(desc.args, vec!["int", "str"]);
        assert!(desc.optional);
    }

    #[test]
    fn test_literal() {
        let desc = TypeDescriptor::parse("Literal['fast', 'slow', 3]").unwrap();
        assert_eq!(desc.head, "Literal");
        assert_eq!(desc.args, vec!["fast", "slow", "3"]);
        assert_eq!(
            desc.literals,
            vec![Value::from("fast"), Value::from("slow"), Value::Int(3)]
        );

        let desc = TypeDescriptor::parse("list[Literal['a', 'b']]").unwrap();
        assert_eq!(desc.args, vec!["Literal"]);
        assert_eq!(desc.literals, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_literal_with_comma_in_string() {
        let desc = TypeDescriptor::parse("Literal['a,b', 'c']").unwrap();
        assert_eq!(desc.args, vec!["a,b", "c"]);
    }

    #[test]
    fn test_malformed() {
        assert!(TypeDescriptor::parse("").is_err());
        assert!(TypeDescriptor::parse("list[int").is_err());
        assert!(TypeDescriptor::parse("list]int[").is_err());
        assert!(TypeDescriptor::parse("Optional[int, str]").is_err());
        assert!(TypeDescriptor::parse("Literal[foo()]").is_err());
        assert!(matches!(
            TypeDescriptor::parse("int |"),
            Err(Error::TypeAnnotation { .. })
        ));
    }

    #[test]
    fn test_display() {
        let desc = TypeDescriptor::parse("Optional[dict[str, int]]").unwrap();
        assert_eq!(desc.to_string(), "dict[str, int] | None");
    }
}
