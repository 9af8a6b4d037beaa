//! Compiled expressions and the parser boundary.
//!
//! An [`Expr`] is an immutable, shareable compiled form of one source
//! string. Any grammar can produce one by implementing [`ExprParser`]; the
//! crate ships [`TemplateParser`] for `${key | pipe:arg}` templates.

use core::fmt;
use std::sync::Arc;

use crate::context::ExprContext;
use crate::error::{EngineResult, SyntaxError};
use crate::resolver::{KeyResolverChain, PipeResolverChain};
use crate::value::Value;

pub mod template;

pub use template::TemplateParser;

/// A compiled expression tree node.
pub trait ExprNode: Send + Sync {
    fn call(&self, context: &ExprContext) -> EngineResult<Value>;
}

impl<F> ExprNode for F
where
    F: Fn(&ExprContext) -> EngineResult<Value> + Send + Sync,
{
    fn call(&self, context: &ExprContext) -> EngineResult<Value> {
        self(context)
    }
}

#[derive(Clone)]
pub struct Expr {
    source: Arc<str>,
    node: Arc<dyn ExprNode>,
}

impl Expr {
    pub fn new<N: ExprNode + 'static>(source: &str, node: N) -> Self {
        Self {
            source: Arc::from(source),
            node: Arc::new(node),
        }
    }

    pub fn constant(source: &str, value: Value) -> Self {
        Self::new(source, ConstantNode(value))
    }

    pub fn call(&self, context: &ExprContext) -> EngineResult<Value> {
        self.node.call(context)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when both handles share one compiled tree.
    pub fn same_compilation(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr").field(&self.source).finish()
    }
}

struct ConstantNode(Value);

impl ExprNode for ConstantNode {
    fn call(&self, _context: &ExprContext) -> EngineResult<Value> {
        Ok(self.0.clone())
    }
}

/// Resolver chains visible to a parser. Grammar constructs that reference
/// keys or pipes bind their handlers through these at compile time.
pub struct ParseEnv<'a> {
    pub keys: &'a KeyResolverChain,
    pub pipes: &'a PipeResolverChain,
}

pub trait ExprParser: Send + Sync {
    fn parse(&self, source: &str, env: &ParseEnv<'_>) -> Result<Expr, SyntaxError>;
}
