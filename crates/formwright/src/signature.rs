//! Callable descriptions and signature introspection.
//!
//! A [`Callable`] pairs a function body with the declaration of its
//! parameters. Declarations come either from the builder API or from a
//! signature string in the familiar `def name(a: int, *, b: str = "x") -> T`
//! form. [`SignatureParser`] turns a callable into a [`FunctionInfo`]: one
//! [`ParameterInfo`] per bindable parameter, in declaration order.
//!
//! # Example
//!
//! ```
//! use formwright::signature::{Callable, SignatureParser};
//! use formwright::Value;
//!
//! let add = Callable::parse("def add(a: int, b: int = 5) -> int")
//!     .unwrap()
//!     .docstring("Add two numbers.")
//!     .body(|_ctx, args| Ok(Value::Int(args.get_i64("a")? + args.get_i64("b")?)))
//!     .build();
//!
//! let info = SignatureParser::new().parse(&add).unwrap();
//! assert_eq!(info.parameters.len(), 2);
//! assert_eq!(info.parameters[1].default_value, Some(Value::Int(5)));
//! assert_eq!(info.description, "Add two numbers.");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::docstring::Docstring;
use crate::error::{Error, FunctionError, Result};
use crate::execution::CallContext;
use crate::types::{TypeDescriptor, split_top_level};
use crate::value::{Arguments, Value};

const TARGET: &str = "formwright::signature";

/// The body of a callable.
pub type FunctionBody =
    Arc<dyn Fn(&CallContext, &Arguments) -> std::result::Result<Value, FunctionError> + Send + Sync>;

/// How a parameter may be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// The implicit instance or class receiver (`self` / `cls`).
    Receiver,
    PositionalOnly,
    PositionalOrKeyword,
    KeywordOnly,
    /// `*args`
    VarPositional,
    /// `**kwargs`
    VarKeyword,
}

impl ParameterKind {
    pub fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Receiver => "a receiver",
            Self::PositionalOnly => "positional-only",
            Self::PositionalOrKeyword => "positional-or-keyword",
            Self::KeywordOnly => "keyword-only",
            Self::VarPositional => "variadic positional",
            Self::VarKeyword => "variadic keyword",
        })
    }
}

/// A declared default.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultDecl {
    /// A known value.
    Value(Value),
    /// Source text of a default expression. Literals are evaluated, anything
    /// else is kept verbatim as a string.
    Source(String),
}

impl DefaultDecl {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Source(text) => {
                Value::from_literal(text).unwrap_or_else(|| Value::Str(text.clone()))
            }
        }
    }
}

/// The declaration of a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDecl {
    pub name: String,
    pub kind: ParameterKind,
    pub annotation: Option<String>,
    pub default: Option<DefaultDecl>,
    pub description: Option<String>,
}

impl ParameterDecl {
    /// A positional-or-keyword parameter without annotation or default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::PositionalOrKeyword,
            annotation: None,
            default: None,
            description: None,
        }
    }

    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultDecl::Value(value.into()));
        self
    }

    pub fn default_source(mut self, source: impl Into<String>) -> Self {
        self.default = Some(DefaultDecl::Source(source.into()));
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn keyword_only(self) -> Self {
        self.kind(ParameterKind::KeywordOnly)
    }

    pub fn positional_only(self) -> Self {
        self.kind(ParameterKind::PositionalOnly)
    }
}

/// What sort of callable this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallableKind {
    #[default]
    Function,
    /// A method. Bound methods never expose their receiver.
    Method { bound: bool },
    /// A type constructor. Its receiver is always hidden.
    Constructor { inspectable: bool },
}

/// A function that can be presented as a form.
#[derive(Clone)]
pub struct Callable {
    name: String,
    kind: CallableKind,
    parameters: Vec<ParameterDecl>,
    return_annotation: Option<String>,
    docstring: String,
    body: Option<FunctionBody>,
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("return_annotation", &self.return_annotation)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl Callable {
    /// Start building a callable named `name`.
    pub fn builder(name: impl Into<String>) -> CallableBuilder {
        CallableBuilder {
            callable: Callable {
                name: name.into(),
                kind: CallableKind::Function,
                parameters: Vec::new(),
                return_annotation: None,
                docstring: String::new(),
                body: None,
            },
        }
    }

    /// Start building a callable from signature text.
    pub fn parse(signature: &str) -> Result<CallableBuilder> {
        let parsed = parse_signature_text(signature)?;
        let mut builder = Self::builder(parsed.name);
        builder.callable.parameters = parsed.parameters;
        builder.callable.return_annotation = parsed.return_annotation;
        Ok(builder)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn parameters(&self) -> &[ParameterDecl] {
        &self.parameters
    }

    pub fn return_annotation(&self) -> Option<&str> {
        self.return_annotation.as_deref()
    }

    pub fn docstring(&self) -> &str {
        &self.docstring
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Invoke the body.
    pub fn call(
        &self,
        context: &CallContext,
        arguments: &Arguments,
    ) -> std::result::Result<Value, FunctionError> {
        match &self.body {
            Some(body) => body(context, arguments),
            None => Err(FunctionError::with_kind(
                "TypeError",
                format!("'{}' is not callable", self.name),
            )),
        }
    }
}

/// Builder for [`Callable`].
#[derive(Debug)]
pub struct CallableBuilder {
    callable: Callable,
}

impl CallableBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.callable.name = name.into();
        self
    }

    pub fn kind(mut self, kind: CallableKind) -> Self {
        self.callable.kind = kind;
        self
    }

    pub fn param(mut self, parameter: ParameterDecl) -> Self {
        self.callable.parameters.push(parameter);
        self
    }

    pub fn params<I: IntoIterator<Item = ParameterDecl>>(mut self, parameters: I) -> Self {
        self.callable.parameters.extend(parameters);
        self
    }

    pub fn returns(mut self, annotation: impl Into<String>) -> Self {
        self.callable.return_annotation = Some(annotation.into());
        self
    }

    pub fn docstring(mut self, docstring: impl Into<String>) -> Self {
        self.callable.docstring = docstring.into();
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&CallContext, &Arguments) -> std::result::Result<Value, FunctionError>
            + Send
            + Sync
            + 'static,
    {
        self.callable.body = Some(Arc::new(body));
        self
    }

    pub fn build(self) -> Callable {
        self.callable
    }
}

/// How a description string should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Markdown,
    Html,
    PlainText,
}

/// A bindable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub kind: ParameterKind,
    /// Canonical type head, `"any"` when unannotated.
    pub type_name: String,
    pub type_args: Vec<String>,
    /// Values of a `Literal` annotation.
    pub literal_values: Vec<Value>,
    pub optional: bool,
    /// `None` when the parameter has no default.
    pub default_value: Option<Value>,
    /// Set on the declaration with [`ParameterDecl::describe`].
    pub declared_description: Option<String>,
    /// Found in the docstring's `:param` or `Args:` entries.
    pub docstring_description: Option<String>,
    /// Index among the bindable parameters.
    pub position: usize,
}

impl ParameterInfo {
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    /// The docstring's description, else the declared one.
    pub fn description(&self) -> Option<&str> {
        self.docstring_description
            .as_deref()
            .or(self.declared_description.as_deref())
    }
}

/// Everything the form needs to know about a callable.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub document_format: DocumentFormat,
    pub docstring: String,
    pub return_annotation: Option<String>,
    pub parameters: Vec<ParameterInfo>,
    /// Group on the function selection window, `""` for the default group.
    pub group: String,
    /// Carried for the UI backend, never interpreted.
    pub icon: Option<String>,
    pub window_title: Option<String>,
}

impl FunctionInfo {
    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Turns a [`Callable`] into a [`FunctionInfo`].
#[derive(Debug, Clone)]
pub struct SignatureParser {
    skip_receiver: bool,
}

impl Default for SignatureParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureParser {
    /// A parser that hides the receiver of unbound methods.
    pub fn new() -> Self {
        Self {
            skip_receiver: true,
        }
    }

    /// Whether the receiver of an unbound method is hidden.
    pub fn skip_receiver(mut self, skip: bool) -> Self {
        self.skip_receiver = skip;
        self
    }

    /// Introspect `callable`, extracting its docstring as well.
    pub fn parse(&self, callable: &Callable) -> Result<FunctionInfo> {
        let docstring = Docstring::extract(callable.docstring())?;
        self.parse_with_docstring(callable, &docstring)
    }

    /// Introspect `callable` using an already extracted docstring.
    pub fn parse_with_docstring(
        &self,
        callable: &Callable,
        docstring: &Docstring,
    ) -> Result<FunctionInfo> {
        let name = callable.name();
        if !callable.has_body() {
            return Err(Error::invalid_callable(name, "no function body"));
        }
        if !is_identifier(name) {
            return Err(Error::invalid_callable(name, "name is not a valid identifier"));
        }
        let hide_receiver = match callable.kind() {
            CallableKind::Function => self.skip_receiver,
            CallableKind::Method { bound } => bound || self.skip_receiver,
            CallableKind::Constructor { inspectable: false } => {
                return Err(Error::invalid_callable(
                    name,
                    "constructor signature cannot be inspected",
                ));
            }
            CallableKind::Constructor { inspectable: true } => true,
        };

        let mut seen = HashSet::new();
        let mut parameters = Vec::with_capacity(callable.parameters().len());
        for (index, decl) in callable.parameters().iter().enumerate() {
            if !is_identifier(&decl.name) {
                return Err(Error::invalid_callable(
                    name,
                    format!("parameter name '{}' is not a valid identifier", decl.name),
                ));
            }
            if !seen.insert(decl.name.as_str()) {
                return Err(Error::invalid_callable(
                    name,
                    format!("duplicate parameter '{}'", decl.name),
                ));
            }
            let kind = match decl.kind {
                ParameterKind::Receiver if index != 0 => {
                    return Err(Error::invalid_callable(
                        name,
                        format!("receiver '{}' must be the first parameter", decl.name),
                    ));
                }
                ParameterKind::Receiver if hide_receiver => continue,
                ParameterKind::Receiver => ParameterKind::PositionalOrKeyword,
                kind if kind.is_variadic() => {
                    return Err(Error::UnsupportedParameter {
                        function: name.to_string(),
                        parameter: decl.name.clone(),
                        kind: kind.to_string(),
                    });
                }
                kind => kind,
            };

            let descriptor = match &decl.annotation {
                Some(annotation) => {
                    TypeDescriptor::parse(annotation).map_err(|e| e.for_parameter(&decl.name))?
                }
                None => TypeDescriptor::any(),
            };
            let docstring_description = docstring
                .parameter_description(&decl.name)
                .map(str::to_string);

            parameters.push(ParameterInfo {
                name: decl.name.clone(),
                kind,
                type_name: descriptor.head,
                type_args: descriptor.args,
                literal_values: descriptor.literals,
                optional: descriptor.optional,
                default_value: decl.default.as_ref().map(DefaultDecl::to_value),
                declared_description: decl.description.clone(),
                docstring_description,
                position: parameters.len(),
            });
        }

        tracing::debug!(
            target: TARGET,
            function = name,
            parameters = parameters.len(),
            "parsed signature"
        );

        Ok(FunctionInfo {
            name: name.to_string(),
            display_name: name.to_string(),
            description: docstring.description.clone(),
            document_format: DocumentFormat::default(),
            docstring: callable.docstring().to_string(),
            return_annotation: callable.return_annotation().map(str::to_string),
            parameters,
            group: String::new(),
            icon: None,
            window_title: None,
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// A signature string broken into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSignature {
    pub name: String,
    pub parameters: Vec<ParameterDecl>,
    pub return_annotation: Option<String>,
}

/// Parse `def name(params) -> ret:` (the `def`, return annotation and
/// trailing colon are optional).
///
/// A leading `self` or `cls` without annotation is marked as the receiver.
pub fn parse_signature_text(text: &str) -> Result<ParsedSignature> {
    let src = text.trim();
    let src = src.strip_prefix("async ").map_or(src, str::trim_start);
    let src = src.strip_prefix("def ").map_or(src, str::trim_start);
    let invalid = |reason: &str| Error::invalid_callable(text.trim(), reason);

    let open = src.find('(').ok_or_else(|| invalid("missing parameter list"))?;
    let close = matching_paren(src, open).ok_or_else(|| invalid("unbalanced parentheses"))?;
    let name = src[..open].trim().to_string();

    let trailer = src[close + 1..].trim();
    let trailer = trailer.strip_suffix(':').map_or(trailer, str::trim_end);
    let return_annotation = if trailer.is_empty() {
        None
    } else if let Some(ret) = trailer.strip_prefix("->") {
        let ret = ret.trim();
        if ret.is_empty() {
            return Err(invalid("empty return annotation"));
        }
        Some(ret.to_string())
    } else {
        return Err(invalid("unexpected text after parameter list"));
    };

    let mut pieces: Vec<&str> = split_top_level(&src[open + 1..close], ',')
        .into_iter()
        .map(str::trim)
        .collect();
    if pieces.last().is_some_and(|p| p.is_empty()) {
        pieces.pop();
    }

    let mut parameters: Vec<ParameterDecl> = Vec::new();
    let mut keyword_only = false;
    let mut seen_slash = false;
    let mut seen_default = false;
    for piece in pieces {
        match piece {
            "" => return Err(invalid("empty parameter")),
            "/" => {
                if seen_slash || keyword_only || parameters.is_empty() {
                    return Err(invalid("misplaced '/'"));
                }
                seen_slash = true;
                for decl in &mut parameters {
                    if decl.kind == ParameterKind::PositionalOrKeyword {
                        decl.kind = ParameterKind::PositionalOnly;
                    }
                }
            }
            "*" => {
                if keyword_only {
                    return Err(invalid("misplaced '*'"));
                }
                keyword_only = true;
            }
            _ => {
                let (kind, rest) = if let Some(rest) = piece.strip_prefix("**") {
                    (ParameterKind::VarKeyword, rest)
                } else if let Some(rest) = piece.strip_prefix('*') {
                    if keyword_only {
                        return Err(invalid("misplaced '*'"));
                    }
                    keyword_only = true;
                    (ParameterKind::VarPositional, rest)
                } else if keyword_only {
                    (ParameterKind::KeywordOnly, piece)
                } else {
                    (ParameterKind::PositionalOrKeyword, piece)
                };
                let mut decl = parse_parameter(rest).ok_or_else(|| invalid("malformed parameter"))?;
                decl.kind = kind;
                if parameters.is_empty()
                    && kind == ParameterKind::PositionalOrKeyword
                    && decl.annotation.is_none()
                    && decl.default.is_none()
                    && matches!(decl.name.as_str(), "self" | "cls")
                {
                    decl.kind = ParameterKind::Receiver;
                }
                if kind == ParameterKind::PositionalOrKeyword {
                    if decl.default.is_some() {
                        seen_default = true;
                    } else if seen_default {
                        return Err(invalid("non-default parameter follows default parameter"));
                    }
                }
                if kind.is_variadic() && decl.default.is_some() {
                    return Err(invalid("variadic parameter cannot have a default"));
                }
                parameters.push(decl);
            }
        }
    }

    Ok(ParsedSignature {
        name,
        parameters,
        return_annotation,
    })
}

/// Parse `name[: annotation][= default]`.
fn parse_parameter(text: &str) -> Option<ParameterDecl> {
    let (head, default) = match find_top_level(text, '=') {
        Some(eq) => (&text[..eq], Some(text[eq + 1..].trim())),
        None => (text, None),
    };
    let (name, annotation) = match find_top_level(head, ':') {
        Some(colon) => (head[..colon].trim(), Some(head[colon + 1..].trim())),
        None => (head.trim(), None),
    };
    if name.is_empty() || annotation.is_some_and(str::is_empty) || default.is_some_and(str::is_empty)
    {
        return None;
    }
    let mut decl = ParameterDecl::new(name);
    decl.annotation = annotation.map(str::to_string);
    decl.default = default.map(|d| DefaultDecl::Source(d.to_string()));
    Some(decl)
}

fn find_top_level(text: &str, needle: char) -> Option<usize> {
    let first = split_top_level(text, needle);
    if first.len() > 1 { Some(first[0].len()) } else { None }
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (c == ')').then_some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(signature: &str) -> Callable {
        Callable::parse(signature)
            .unwrap()
            .body(|_, _| Ok(Value::None))
            .build()
    }

    #[test]
    fn test_parse_signature_text() {
        let parsed =
            parse_signature_text("def f(a: int, b: list[int] = [1, 2], *, c: str = 'x, y') -> int:")
                .unwrap();
        assert_eq!(parsed.name, "f");
        assert_eq!(parsed.return_annotation.as_deref(), Some("int"));
        assert_eq!(parsed.parameters.len(), 3);
        assert_eq!(parsed.parameters[1].annotation.as_deref(), Some("list[int]"));
        assert_eq!(
            parsed.parameters[1].default,
            Some(DefaultDecl::Source("[1, 2]".into()))
        );
        assert_eq!(parsed.parameters[2].kind, ParameterKind::KeywordOnly);
        assert_eq!(
            parsed.parameters[2].default.as_ref().map(DefaultDecl::to_value),
            Some(Value::from("x, y"))
        );
    }

    #[test]
    fn test_positional_only_and_receiver() {
        let parsed = parse_signature_text("def m(self, a, /, b, *args, **kw)").unwrap();
        let kinds: Vec<_> = parsed.parameters.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParameterKind::Receiver,
                ParameterKind::PositionalOnly,
                ParameterKind::PositionalOrKeyword,
                ParameterKind::VarPositional,
                ParameterKind::VarKeyword,
            ]
        );
    }

    #[test]
    fn test_malformed_signatures() {
        for text in [
            "def f(a, b",
            "def f a, b",
            "def f(a, , b)",
            "def f(a=1, b)",
            "def f(/, a)",
            "def f(a) junk",
            "def f(a:)",
            "def f(*, *)",
        ] {
            assert!(
                matches!(parse_signature_text(text), Err(Error::InvalidCallable { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn test_parameter_info() {
        let callable = noop("def f(a: int, b: Optional[str] = None, c=os.getcwd())");
        let info = SignatureParser::new().parse(&callable).unwrap();
        let a = &info.parameters[0];
        assert_eq!(a.type_name, "int");
        assert!(!a.has_default());

        let b = &info.parameters[1];
        assert_eq!(b.type_name, "str");
        assert!(b.optional);
        assert_eq!(b.default_value, Some(Value::None));

        let c = &info.parameters[2];
        assert_eq!(c.type_name, "any");
        assert_eq!(c.default_value, Some(Value::from("os.getcwd()")));
        assert_eq!(c.position, 2);
    }

    #[test]
    fn test_receiver_is_skipped() {
        let callable = noop("def method(self, x: int)");
        let info = SignatureParser::new().parse(&callable).unwrap();
        assert_eq!(info.parameters.len(), 1);
        assert_eq!(info.parameters[0].name, "x");
        assert_eq!(info.parameters[0].position, 0);

        let info = SignatureParser::new()
            .skip_receiver(false)
            .parse(&callable)
            .unwrap();
        assert_eq!(info.parameters[0].name, "self");

        let bound = Callable::parse("def method(self, x: int)")
            .unwrap()
            .kind(CallableKind::Method { bound: true })
            .body(|_, _| Ok(Value::None))
            .build();
        let info = SignatureParser::new()
            .skip_receiver(false)
            .parse(&bound)
            .unwrap();
        assert_eq!(info.parameters.len(), 1);
    }

    #[test]
    fn test_variadic_is_unsupported() {
        let err = SignatureParser::new()
            .parse(&noop("def f(a, *rest)"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedParameter { parameter, .. } if parameter == "rest"));

        let err = SignatureParser::new()
            .parse(&noop("def f(a, **options)"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedParameter { .. }));
    }

    #[test]
    fn test_invalid_callables() {
        let no_body = Callable::parse("def f(a)").unwrap().build();
        assert!(matches!(
            SignatureParser::new().parse(&no_body),
            Err(Error::InvalidCallable { .. })
        ));

        let constructor = Callable::builder("Widget")
            .kind(CallableKind::Constructor { inspectable: false })
            .body(|_, _| Ok(Value::None))
            .build();
        assert!(matches!(
            SignatureParser::new().parse(&constructor),
            Err(Error::InvalidCallable { .. })
        ));

        let duplicate = Callable::builder("f")
            .param(ParameterDecl::new("a"))
            .param(ParameterDecl::new("a"))
            .body(|_, _| Ok(Value::None))
            .build();
        assert!(matches!(
            SignatureParser::new().parse(&duplicate),
            Err(Error::InvalidCallable { .. })
        ));

        assert!(matches!(
            SignatureParser::new().parse(&noop("(a)")),
            Err(Error::InvalidCallable { .. })
        ));
    }

    #[test]
    fn test_bad_annotation_names_parameter() {
        let callable = Callable::builder("f")
            .param(ParameterDecl::new("a").annotated("list[int"))
            .body(|_, _| Ok(Value::None))
            .build();
        let err = SignatureParser::new().parse(&callable).unwrap_err();
        assert_eq!(err.parameter_name(), Some("a"));
        assert!(matches!(err.root(), Error::TypeAnnotation { .. }));
    }

    #[test]
    fn test_builder_parameters() {
        let callable = Callable::builder("scale")
            .param(ParameterDecl::new("factor").annotated("float").default(1.5))
            .param(
                ParameterDecl::new("mode")
                    .annotated("Literal['fast', 'slow']")
                    .keyword_only()
                    .describe("Processing mode"),
            )
            .body(|_, _| Ok(Value::None))
            .build();
        let info = SignatureParser::new().parse(&callable).unwrap();
        assert_eq!(info.parameters[0].default_value, Some(Value::Float(1.5)));
        let mode = info.parameter("mode").unwrap();
        assert_eq!(mode.kind, ParameterKind::KeywordOnly);
        assert_eq!(mode.literal_values, vec![Value::from("fast"), Value::from("slow")]);
        assert_eq!(mode.declared_description.as_deref(), Some("Processing mode"));
    }

    #[test]
    fn test_docstring_descriptions_fill_parameters() {
        let callable = Callable::parse("def f(a: int, b: int)")
            .unwrap()
            .docstring("Adds.\n\n:param a: first operand\n")
            .body(|_, _| Ok(Value::None))
            .build();
        let info = SignatureParser::new().parse(&callable).unwrap();
        assert_eq!(
            info.parameters[0].docstring_description.as_deref(),
            Some("first operand")
        );
        assert_eq!(info.parameters[0].declared_description, None);
        assert_eq!(info.parameters[1].description(), None);
    }

    #[test]
    fn test_docstring_description_wins_over_declared() {
        let callable = Callable::builder("f")
            .param(ParameterDecl::new("mode").annotated("str").describe("declared"))
            .param(ParameterDecl::new("level").annotated("int").describe("declared level"))
            .docstring("Run.\n\n:param mode: from docstring\n")
            .body(|_, _| Ok(Value::None))
            .build();
        let info = SignatureParser::new().parse(&callable).unwrap();
        let mode = info.parameter("mode").unwrap();
        assert_eq!(mode.declared_description.as_deref(), Some("declared"));
        assert_eq!(mode.description(), Some("from docstring"));
        assert_eq!(info.parameter("level").unwrap().description(), Some("declared level"));
    }
}
