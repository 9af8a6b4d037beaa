//! # exprkit: pluggable expression evaluation
//!
//! exprkit evaluates small embedded expressions such as `Hello ${user.name}`
//! against a context, and builds two declarative features on top of them:
//! conditions (`{key, op, value}` tests) and actions (`{type, config,
//! params}` dispatch).
//!
//! ## Architecture
//!
//! ```text
//! source ──► ExprCache ──(miss)──► ExprParser ──► Expr ──► Value
//!                                     │
//!                      keys / pipes resolver chains
//! ```
//!
//! - Resolution: every pluggable handler is found through a chain of
//!   delegates ([`resolver`]). Keys, pipes, condition operators and action
//!   handlers each have their own chain on the [`Engine`].
//! - Compilation: expressions are parsed once and memoised in a bounded
//!   cache ([`cache`]); registering any delegate clears it.
//! - Paths: `a.b[0].c` lookups over structured values ([`path`]) compile
//!   into an unbounded cache.
//! - Conditions: lists of [`Condition`] compile to a single test or an AND
//!   over several ([`condition`]). Unknown operators fail at compile time.
//! - Actions: an [`Exec`] is routed to a handler that is configured, then
//!   called ([`exec`]). Unknown action types are skipped.
//!
//! ## Example
//!
//! ```
//! use exprkit::{Engine, ExprContext, Value};
//!
//! let engine = Engine::new();
//! let ctx = ExprContext::new().with_value("name", "alice");
//! assert_eq!(engine.eval("Hi ${name}", &ctx).unwrap(), Value::from("Hi alice"));
//! ```

pub mod cache;
pub mod condition;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod exec;
pub mod expr;
pub mod key;
pub mod path;
pub mod resolver;
pub mod value;

// Re-exports
pub use cache::ExprCache;
pub use condition::{Condition, ConditionExpr, MultiConditionExpr, SingleConditionExpr};
pub use config::EngineConfig;
pub use context::ExprContext;
pub use engine::{Engine, EvalPath};
pub use error::{EngineResult, Error, SyntaxError};
pub use exec::Exec;
pub use expr::{Expr, ExprNode, ExprParser, ParseEnv, TemplateParser};
pub use key::Key;
pub use path::{PathCache, PathExpr, PathSegment};
pub use resolver::{
    BasicConditionResolver, BasicExecResolver, BasicKeyResolver, BasicPipeResolver,
    ConditionHandler, ExecHandler, KeyHandler, PipeTransform, Resolver, ResolverChain,
};
pub use value::{Value, ValueMap};
