use core::fmt;
use std::sync::Arc;

use crate::key::Key;
use crate::resolver::{KeyHandler, KeyResolver, Resolver};
use crate::value::{Value, ValueMap};

/// Read-only evaluation environment.
///
/// Besides named values a context may carry a key resolver that shadows the
/// engine's key chain for evaluations against this context only, for
/// example to scope an iteration variable. Cloning is cheap.
#[derive(Clone, Default)]
pub struct ExprContext {
    values: Arc<ValueMap>,
    keys: Option<Arc<KeyResolver>>,
}

impl ExprContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level entries of a JSON object become context values. Anything
    /// other than an object yields an empty context.
    pub fn from_json(json: serde_json::Value) -> Self {
        match Value::from(json) {
            Value::Map(map) => Self::from(map),
            _ => Self::default(),
        }
    }

    pub fn with_value<V: Into<Value>>(mut self, name: &str, value: V) -> Self {
        Arc::make_mut(&mut self.values).insert(name.to_string(), value.into());
        self
    }

    pub fn with_keys<R>(mut self, keys: R) -> Self
    where
        R: Resolver<Key, Handler = Arc<dyn KeyHandler>> + 'static,
    {
        self.keys = Some(Arc::new(keys));
        self
    }

    /// Child context with `name` bound to `value`; everything else, including
    /// the key override, is inherited.
    pub fn scoped<V: Into<Value>>(&self, name: &str, value: V) -> Self {
        self.clone().with_value(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn keys_override(&self) -> Option<&Arc<KeyResolver>> {
        self.keys.as_ref()
    }
}

impl From<ValueMap> for ExprContext {
    fn from(values: ValueMap) -> Self {
        Self {
            values: Arc::new(values),
            keys: None,
        }
    }
}

impl fmt::Debug for ExprContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExprContext")
            .field("values", &self.values)
            .field("keys_override", &self.keys.is_some())
            .finish()
    }
}
