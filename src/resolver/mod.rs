//! Chain-of-delegation lookup for every pluggable handler kind.
//!
//! A [`Resolver`] answers one question: "which handler serves this query?".
//! A [`ResolverChain`] holds an ordered list of resolvers and asks them
//! front to back; the first one that answers wins. Chains are resolvers
//! themselves, so they compose recursively.
//!
//! The same chain type serves all four handler kinds:
//!
//! | Chain                       | Query   | Handler                     |
//! |-----------------------------|---------|-----------------------------|
//! | [`KeyResolverChain`]        | [`Key`] | `Arc<dyn KeyHandler>`       |
//! | [`PipeResolverChain`]       | `str`   | `Arc<dyn PipeTransform>`    |
//! | [`ConditionResolverChain`]  | `str`   | `Arc<dyn ConditionHandler>` |
//! | [`ExecResolverChain`]       | [`Exec`]| `Box<dyn ExecHandler>`      |

use std::sync::{Arc, PoisonError, RwLock};

use crate::exec::Exec;
use crate::key::Key;

pub mod basic;
pub mod builtin;
pub mod handler;

pub use basic::{BasicConditionResolver, BasicExecResolver, BasicKeyResolver, BasicPipeResolver};
pub use builtin::PathKeys;
pub use handler::{ConditionHandler, ExecHandler, KeyHandler, PipeTransform};

pub trait Resolver<Q: ?Sized>: Send + Sync {
    type Handler;

    fn find(&self, query: &Q) -> Option<Self::Handler>;
}

impl<Q: ?Sized, R: Resolver<Q> + ?Sized> Resolver<Q> for Arc<R> {
    type Handler = R::Handler;

    fn find(&self, query: &Q) -> Option<Self::Handler> {
        (**self).find(query)
    }
}

pub type DynResolver<Q, H> = dyn Resolver<Q, Handler = H>;

pub type KeyResolver = DynResolver<Key, Arc<dyn KeyHandler>>;
pub type PipeResolver = DynResolver<str, Arc<dyn PipeTransform>>;
pub type ConditionResolver = DynResolver<str, Arc<dyn ConditionHandler>>;
pub type ExecResolver = DynResolver<Exec, Box<dyn ExecHandler>>;

pub type KeyResolverChain = ResolverChain<Key, Arc<dyn KeyHandler>>;
pub type PipeResolverChain = ResolverChain<str, Arc<dyn PipeTransform>>;
pub type ConditionResolverChain = ResolverChain<str, Arc<dyn ConditionHandler>>;
pub type ExecResolverChain = ResolverChain<Exec, Box<dyn ExecHandler>>;

type Delegates<Q, H> = Arc<Vec<Arc<DynResolver<Q, H>>>>;

/// Ordered, append-only list of delegates. First match wins.
///
/// Appends copy the delegate list and swap it in, so `find` only holds the
/// lock long enough to clone an `Arc` and never blocks on a delegate.
pub struct ResolverChain<Q: ?Sized + 'static, H: 'static> {
    delegates: RwLock<Delegates<Q, H>>,
}

impl<Q: ?Sized + 'static, H: 'static> ResolverChain<Q, H> {
    pub fn new() -> Self {
        Self {
            delegates: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Builder-style append.
    pub fn with<R>(self, delegate: R) -> Self
    where
        R: Resolver<Q, Handler = H> + 'static,
    {
        self.delegate(delegate);
        self
    }

    pub fn delegate<R>(&self, delegate: R) -> &Self
    where
        R: Resolver<Q, Handler = H> + 'static,
    {
        let delegate: Arc<DynResolver<Q, H>> = Arc::new(delegate);
        let mut guard = self
            .delegates
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(delegate);
        *guard = Arc::new(next);
        self
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Delegates<Q, H> {
        self.delegates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<Q: ?Sized + 'static, H: 'static> Default for ResolverChain<Q, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: ?Sized + 'static, H: 'static> Resolver<Q> for ResolverChain<Q, H> {
    type Handler = H;

    fn find(&self, query: &Q) -> Option<H> {
        self.snapshot()
            .iter()
            .find_map(|delegate| delegate.find(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExprContext;
    use crate::value::Value;

    fn constant(value: i64) -> impl Fn(&Key, &ExprContext) -> Value + Send + Sync {
        move |_: &Key, _: &ExprContext| Value::Integer(value)
    }

    fn call(chain: &KeyResolverChain, key: &str) -> Option<Value> {
        let key = Key::parse(key);
        chain
            .find(&key)
            .map(|handler| handler.call(&key, &ExprContext::new()))
    }

    #[test]
    fn test_empty_chain_finds_nothing() {
        let chain = KeyResolverChain::new();
        assert!(chain.is_empty());
        assert!(call(&chain, "x").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let chain = KeyResolverChain::new()
            .with(BasicKeyResolver::new().key(Key::parse("x"), constant(1)))
            .with(
                BasicKeyResolver::new()
                    .key(Key::parse("x"), constant(2))
                    .key(Key::parse("y"), constant(3)),
            );

        assert_eq!(chain.len(), 2);
        assert_eq!(call(&chain, "x"), Some(Value::Integer(1)));
        assert_eq!(call(&chain, "y"), Some(Value::Integer(3)));
        assert!(call(&chain, "z").is_none());
    }

    #[test]
    fn test_fluent_delegate() {
        let chain = KeyResolverChain::new();
        chain
            .delegate(BasicKeyResolver::new().key(Key::parse("a"), constant(1)))
            .delegate(BasicKeyResolver::new().key(Key::parse("b"), constant(2)));
        assert_eq!(chain.len(), 2);
        assert_eq!(call(&chain, "b"), Some(Value::Integer(2)));
    }

    #[test]
    fn test_chain_as_delegate_of_chain() {
        let inner = Arc::new(
            KeyResolverChain::new()
                .with(BasicKeyResolver::new().key(Key::parse("inner"), constant(10))),
        );
        let outer = KeyResolverChain::new().with(inner.clone());
        assert_eq!(call(&outer, "inner"), Some(Value::Integer(10)));

        // 内側のチェーンへの追加は外側からも見える
        inner.delegate(BasicKeyResolver::new().key(Key::parse("late"), constant(11)));
        assert_eq!(call(&outer, "late"), Some(Value::Integer(11)));
    }
}
