//! Registry of widget kinds.
//!
//! The registry maps kind names to a factory and a [`ConfigSchema`], and
//! type descriptors to default kinds. A type is looked up by its extended
//! key (head plus argument heads, e.g. `list[str]`) first, then by its head
//! alone.
//!
//! The registry is shared and thread-safe. Reads (resolution, lookup) take a
//! shared lock; registration takes an exclusive one.
//!
//! # Example
//!
//! ```
//! use formwright::registry::{TypeKey, WidgetRegistry, builtin};
//!
//! let registry = WidgetRegistry::with_builtins();
//! assert_eq!(registry.resolve_kind("int", &[]).unwrap(), builtin::INT_SPIN_BOX);
//! assert_eq!(
//!     registry.resolve_kind("list", &["str".to_string()]).unwrap(),
//!     builtin::STRING_LIST_EDIT
//! );
//! assert_eq!(registry.resolve_kind("list", &["int".to_string()]).unwrap(), builtin::LIST_EDIT);
//! ```

pub mod builtin;
pub mod schema;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::ANY_TYPE;
use crate::widget::WidgetFactory;

pub use schema::{ConfigSchema, OptionSpec, OptionType, RESERVED_OPTIONS};

const TARGET: &str = "formwright::registry";

static GLOBAL_REGISTRY: OnceLock<Arc<WidgetRegistry>> = OnceLock::new();

/// A type a widget kind can be the default for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// Matches every type with this head.
    Head(String),
    /// Matches a head with exactly these argument heads.
    Extended { head: String, args: Vec<String> },
}

impl TypeKey {
    pub fn head(head: impl Into<String>) -> Self {
        Self::Head(head.into())
    }

    pub fn extended<I, S>(head: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Extended {
            head: head.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head(head) => write!(f, "{head}"),
            Self::Extended { head, args } => write!(f, "{head}[{}]", args.join(", ")),
        }
    }
}

/// A registered widget kind.
#[derive(Clone)]
pub struct RegisteredKind {
    pub factory: Arc<dyn WidgetFactory>,
    pub schema: Arc<ConfigSchema>,
}

impl fmt::Debug for RegisteredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredKind")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryInner {
    kinds: HashMap<String, RegisteredKind>,
    defaults: HashMap<TypeKey, String>,
}

/// Thread-safe registry of widget kinds.
#[derive(Default)]
pub struct WidgetRegistry {
    inner: RwLock<RegistryInner>,
}

static_assertions::assert_impl_all!(WidgetRegistry: Send, Sync);

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl WidgetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in kinds.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtin::install(&registry);
        registry
    }

    /// The process-wide registry, created with the built-in kinds on first
    /// use.
    pub fn global() -> Arc<WidgetRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(Self::with_builtins()))
            .clone()
    }

    /// Register a widget kind and the types it is the default for.
    ///
    /// A type already mapped to another kind is remapped to this one.
    pub fn register<F, I>(
        &self,
        kind: impl Into<String>,
        factory: F,
        schema: ConfigSchema,
        default_for: I,
    ) -> Result<()>
    where
        F: WidgetFactory + 'static,
        I: IntoIterator<Item = TypeKey>,
    {
        self.register_shared(kind, Arc::new(factory), schema, default_for)
    }

    /// Like [`register`](Self::register), with an already shared factory.
    pub fn register_shared<I>(
        &self,
        kind: impl Into<String>,
        factory: Arc<dyn WidgetFactory>,
        schema: ConfigSchema,
        default_for: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = TypeKey>,
    {
        let kind = kind.into();
        schema.check_reserved(&kind)?;

        let mut inner = self.inner.write();
        if inner.kinds.contains_key(&kind) {
            return Err(Error::AlreadyRegistered(kind));
        }
        inner.kinds.insert(
            kind.clone(),
            RegisteredKind {
                factory,
                schema: Arc::new(schema),
            },
        );
        for key in default_for {
            if let Some(previous) = inner.defaults.insert(key.clone(), kind.clone()) {
                tracing::debug!(target: TARGET, %key, %previous, new = %kind, "default widget kind replaced");
            }
        }
        tracing::debug!(target: TARGET, %kind, "widget kind registered");
        Ok(())
    }

    /// Remove a kind and every type mapping to it.
    ///
    /// Returns `false` if the kind was not registered.
    pub fn unregister(&self, kind: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.kinds.remove(kind).is_none() {
            return false;
        }
        inner.defaults.retain(|_, mapped| mapped != kind);
        tracing::debug!(target: TARGET, %kind, "widget kind unregistered");
        true
    }

    /// Make `kind` the default for `key`.
    pub fn set_default_kind(&self, key: TypeKey, kind: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.kinds.contains_key(kind) {
            return Err(Error::UnknownWidgetKind(kind.to_string()));
        }
        inner.defaults.insert(key, kind.to_string());
        Ok(())
    }

    /// The default kind for a type: extended key first, then head.
    pub fn resolve_kind(&self, head: &str, args: &[String]) -> Result<String> {
        let inner = self.inner.read();
        if !args.is_empty() {
            let key = TypeKey::extended(head, args.iter().cloned());
            if let Some(kind) = inner.defaults.get(&key) {
                return Ok(kind.clone());
            }
        }
        inner
            .defaults
            .get(&TypeKey::head(head))
            .cloned()
            .ok_or_else(|| Error::NoWidgetForType {
                type_name: if args.is_empty() {
                    head.to_string()
                } else {
                    TypeKey::extended(head, args.iter().cloned()).to_string()
                },
            })
    }

    /// The kind used for types nothing else claims.
    pub fn fallback_kind(&self) -> Option<String> {
        self.resolve_kind(ANY_TYPE, &[]).ok()
    }

    /// The factory and schema registered under `kind`.
    pub fn lookup(&self, kind: &str) -> Result<RegisteredKind> {
        self.inner
            .read()
            .kinds
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::UnknownWidgetKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.inner.read().kinds.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.inner.read().kinds.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin::{self, ValueShape, ValueWidget};
    use crate::registry::schema::OptionSpec;
    use crate::value::Value;
    use crate::widget::InputWidget;
    use std::any::Any;

    fn slider_factory(
        _parent: Option<&dyn Any>,
        name: &str,
        options: &crate::value::Table,
    ) -> Result<Box<dyn InputWidget>> {
        Ok(Box::new(ValueWidget::new("Slider", ValueShape::Int, name, options)))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = WidgetRegistry::new();
        registry
            .register(
                "Slider",
                slider_factory,
                ConfigSchema::new(0i64).option(OptionSpec::new("ticks", OptionType::Int, 10i64)),
                [TypeKey::head("int")],
            )
            .unwrap();
        assert!(registry.contains("Slider"));
        assert_eq!(registry.resolve_kind("int", &[]).unwrap(), "Slider");
        let kind = registry.lookup("Slider").unwrap();
        assert_eq!(kind.schema.defaults()["ticks"], Value::Int(10));
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = WidgetRegistry::new();
        registry
            .register("Slider", slider_factory, ConfigSchema::new(0i64), [])
            .unwrap();
        let err = registry
            .register("Slider", slider_factory, ConfigSchema::new(0i64), [])
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(k) if k == "Slider"));
    }

    #[test]
    fn test_schema_conflict_is_rejected() {
        let registry = WidgetRegistry::new();
        let schema = ConfigSchema::new(0i64)
            .option(OptionSpec::new(schema::GROUP, OptionType::Int, 1i64));
        let err = registry
            .register("Bad", slider_factory, schema, [])
            .unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { .. }));
        assert!(!registry.contains("Bad"));
    }

    #[test]
    fn test_unknown_lookups() {
        let registry = WidgetRegistry::new();
        assert!(matches!(
            registry.lookup("Nope"),
            Err(Error::UnknownWidgetKind(k)) if k == "Nope"
        ));
        assert!(matches!(
            registry.resolve_kind("list", &["int".to_string()]),
            Err(Error::NoWidgetForType { type_name }) if type_name == "list[int]"
        ));
        assert_eq!(registry.fallback_kind(), None);
    }

    #[test]
    fn test_extended_key_beats_head() {
        let registry = WidgetRegistry::with_builtins();
        let str_arg = ["str".to_string()];
        assert_eq!(
            registry.resolve_kind("list", &str_arg).unwrap(),
            builtin::STRING_LIST_EDIT
        );
        assert_eq!(registry.resolve_kind("list", &[]).unwrap(), builtin::LIST_EDIT);
        assert_eq!(
            registry.resolve_kind("unknown", &[]).ok(),
            None
        );
        assert_eq!(registry.fallback_kind().as_deref(), Some(builtin::ANY_VALUE_EDIT));
    }

    #[test]
    fn test_unregister_drops_defaults() {
        let registry = WidgetRegistry::with_builtins();
        assert!(registry.unregister(builtin::STRING_LIST_EDIT));
        assert!(!registry.unregister(builtin::STRING_LIST_EDIT));
        assert_eq!(
            registry.resolve_kind("list", &["str".to_string()]).unwrap(),
            builtin::LIST_EDIT
        );
    }

    #[test]
    fn test_set_default_kind() {
        let registry = WidgetRegistry::with_builtins();
        registry
            .set_default_kind(TypeKey::head("str"), builtin::TEXT_EDIT)
            .unwrap();
        assert_eq!(registry.resolve_kind("str", &[]).unwrap(), builtin::TEXT_EDIT);
        assert!(registry.set_default_kind(TypeKey::head("str"), "Missing").is_err());
    }

    #[test]
    fn test_concurrent_reads() {
        let registry = Arc::new(WidgetRegistry::with_builtins());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert_eq!(
                            registry.resolve_kind("float", &[]).unwrap(),
                            builtin::FLOAT_SPIN_BOX
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_global_is_shared() {
        let a = WidgetRegistry::global();
        let b = WidgetRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.contains(builtin::BOOL_BOX));
    }
}
