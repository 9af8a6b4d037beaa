use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{ConditionHandler, ExecHandler, KeyHandler, PipeTransform};
use super::Resolver;
use crate::exec::Exec;
use crate::key::Key;

/// Key registration table. A key registered with name `*` serves every name
/// in its namespace; exact registrations win over the wildcard.
#[derive(Clone, Default)]
pub struct BasicKeyResolver {
    handlers: HashMap<Key, Arc<dyn KeyHandler>>,
}

impl BasicKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key<H: KeyHandler + 'static>(mut self, key: Key, handler: H) -> Self {
        self.handlers.insert(key, Arc::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Resolver<Key> for BasicKeyResolver {
    type Handler = Arc<dyn KeyHandler>;

    fn find(&self, key: &Key) -> Option<Self::Handler> {
        self.handlers
            .get(key)
            .or_else(|| self.handlers.get(&key.wildcard()))
            .cloned()
    }
}

#[derive(Clone, Default)]
pub struct BasicPipeResolver {
    transforms: HashMap<String, Arc<dyn PipeTransform>>,
}

impl BasicPipeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipe<T: PipeTransform + 'static>(mut self, name: &str, transform: T) -> Self {
        self.transforms.insert(name.to_string(), Arc::new(transform));
        self
    }
}

impl Resolver<str> for BasicPipeResolver {
    type Handler = Arc<dyn PipeTransform>;

    fn find(&self, name: &str) -> Option<Self::Handler> {
        self.transforms.get(name).cloned()
    }
}

#[derive(Clone, Default)]
pub struct BasicConditionResolver {
    conditions: HashMap<String, Arc<dyn ConditionHandler>>,
}

impl BasicConditionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition<C: ConditionHandler + 'static>(mut self, op: &str, handler: C) -> Self {
        self.conditions.insert(op.to_string(), Arc::new(handler));
        self
    }
}

impl Resolver<str> for BasicConditionResolver {
    type Handler = Arc<dyn ConditionHandler>;

    fn find(&self, op: &str) -> Option<Self::Handler> {
        self.conditions.get(op).cloned()
    }
}

type ExecFactory = Arc<dyn Fn() -> Box<dyn ExecHandler> + Send + Sync>;

/// Maps `Exec.type` to a handler factory. Each lookup builds a fresh
/// handler, so `configure` never leaks state into a concurrent dispatch.
#[derive(Clone, Default)]
pub struct BasicExecResolver {
    factories: HashMap<String, ExecFactory>,
}

impl BasicExecResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler<F, H>(mut self, exec_type: &str, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: ExecHandler + 'static,
    {
        self.factories.insert(
            exec_type.to_string(),
            Arc::new(move || Box::new(factory()) as Box<dyn ExecHandler>),
        );
        self
    }
}

impl Resolver<Exec> for BasicExecResolver {
    type Handler = Box<dyn ExecHandler>;

    fn find(&self, exec: &Exec) -> Option<Self::Handler> {
        self.factories
            .get(&exec.exec_type)
            .map(|factory| factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExprContext;
    use crate::error::EngineResult;
    use crate::value::{Value, ValueMap};

    #[test]
    fn test_key_wildcard_and_exact() {
        let resolver = BasicKeyResolver::new()
            .key(Key::new("env", "*"), |key: &Key, _: &ExprContext| {
                Value::from(format!("wild:{}", key.name))
            })
            .key(Key::new("env", "HOME"), |_: &Key, _: &ExprContext| {
                Value::from("exact")
            });
        let ctx = ExprContext::new();

        let home = Key::parse("env:HOME");
        let user = Key::parse("env:USER");
        assert_eq!(
            resolver.find(&home).unwrap().call(&home, &ctx),
            Value::from("exact")
        );
        assert_eq!(
            resolver.find(&user).unwrap().call(&user, &ctx),
            Value::from("wild:USER")
        );
        assert!(resolver.find(&Key::parse("other:USER")).is_none());
        assert_eq!(resolver.len(), 2);
    }

    #[test]
    fn test_pipe_and_condition_lookup() {
        let pipes = BasicPipeResolver::new().pipe(
            "upper",
            |value: Value, _: &[Value], _: &ExprContext| Value::from(value.to_text().to_uppercase()),
        );
        let upper = pipes.find("upper").unwrap();
        assert_eq!(
            upper.transform(Value::from("abc"), &[], &ExprContext::new()),
            Value::from("ABC")
        );
        assert!(pipes.find("lower").is_none());

        let conditions = BasicConditionResolver::new()
            .condition("exists", |value: &Value, _: &[Value]| !value.is_null());
        assert!(conditions.find("exists").unwrap().test(&Value::from(1), &[]));
        assert!(conditions.find("eq").is_none());
    }

    struct Counter {
        configured: usize,
    }

    impl ExecHandler for Counter {
        fn configure(&mut self, _config: &ValueMap) -> EngineResult<()> {
            self.configured += 1;
            Ok(())
        }

        fn call(&mut self, _context: &ExprContext, _params: &ValueMap) -> EngineResult<()> {
            assert_eq!(self.configured, 1);
            Ok(())
        }
    }

    #[test]
    fn test_exec_factory_builds_fresh_handler() {
        let resolver = BasicExecResolver::new().handler("count", || Counter { configured: 0 });
        let exec = Exec::new("count");

        for _ in 0..3 {
            let mut handler = resolver.find(&exec).unwrap();
            handler.configure(&ValueMap::new()).unwrap();
            handler.call(&ExprContext::new(), &ValueMap::new()).unwrap();
        }
        assert!(resolver.find(&Exec::new("missing")).is_none());
    }
}
