use std::sync::Arc;

use tracing::trace;

use super::handler::KeyHandler;
use super::Resolver;
use crate::context::ExprContext;
use crate::key::Key;
use crate::path::PathCache;
use crate::value::Value;

/// Key resolver that reads context values by path.
///
/// * `PathKeys::context("field", ..)` resolves `field:user.name` as the path
///   `user.name` over the whole context.
/// * `PathKeys::scoped("repeat", ..)` resolves `repeat:item.name` as the path
///   `item.name` under the context entry `repeat`. Iteration helpers bind
///   that entry with [`ExprContext::scoped`].
#[derive(Clone)]
pub struct PathKeys {
    namespace: String,
    handler: Arc<PathKeyHandler>,
}

struct PathKeyHandler {
    scope: Option<String>,
    paths: Arc<PathCache>,
}

impl PathKeys {
    pub fn context(namespace: &str, paths: Arc<PathCache>) -> Self {
        Self {
            namespace: namespace.to_string(),
            handler: Arc::new(PathKeyHandler { scope: None, paths }),
        }
    }

    pub fn scoped(namespace: &str, paths: Arc<PathCache>) -> Self {
        Self {
            namespace: namespace.to_string(),
            handler: Arc::new(PathKeyHandler {
                scope: Some(namespace.to_string()),
                paths,
            }),
        }
    }
}

impl Resolver<Key> for PathKeys {
    type Handler = Arc<dyn KeyHandler>;

    fn find(&self, key: &Key) -> Option<Self::Handler> {
        if key.namespace == self.namespace {
            Some(self.handler.clone())
        } else {
            None
        }
    }
}

impl KeyHandler for PathKeyHandler {
    fn call(&self, key: &Key, context: &ExprContext) -> Value {
        let path = match self.paths.get_or_compile(&key.name) {
            Ok(path) => path,
            Err(e) => {
                trace!("Unresolvable key path {}: {}", key, e);
                return Value::Null;
            }
        };
        match &self.scope {
            Some(scope) => context
                .get(scope)
                .and_then(|root| path.resolve(root))
                .cloned()
                .unwrap_or_default(),
            None => path.resolve_in(context.values()).cloned().unwrap_or_default(),
        }
    }
}
