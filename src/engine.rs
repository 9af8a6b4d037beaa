//! The evaluation engine.
//!
//! [`Engine`] owns the four resolver chains, the expression cache and the
//! path cache, and exposes the evaluation surface:
//!
//! - [`Engine::eval`]: evaluate an expression source against a context
//! - [`Engine::get_path`]: evaluate a property path against a value
//! - [`Engine::compile_condition`] / [`Engine::test_conditions`]
//! - [`Engine::exec`]: dispatch a declarative action
//!
//! Registering a delegate on any chain clears the expression cache, because
//! compiled expressions bind key and pipe handlers when they are parsed.
//!
//! An engine is `Send + Sync`; share it behind an `Arc` and evaluate from as
//! many threads as needed.

use std::sync::Arc;

use lazy_static::lazy_static;
use tracing::{debug, instrument, trace};

use crate::cache::ExprCache;
use crate::condition::{Condition, ConditionExpr, MultiConditionExpr, SingleConditionExpr};
use crate::config::EngineConfig;
use crate::context::ExprContext;
use crate::error::{EngineResult, Error, SyntaxError};
use crate::exec::Exec;
use crate::expr::{Expr, ExprParser, ParseEnv, TemplateParser};
use crate::key::Key;
use crate::path::PathCache;
use crate::resolver::{
    ConditionHandler, ConditionResolverChain, ExecHandler, ExecResolverChain, KeyHandler,
    KeyResolverChain, PathKeys, PipeResolverChain, PipeTransform, Resolver,
};
use crate::value::{Value, ValueMap};

pub struct Engine {
    config: EngineConfig,
    /// Lookup chain: `user_keys` first, then the built-in path keys.
    keys: KeyResolverChain,
    user_keys: Arc<KeyResolverChain>,
    pipes: PipeResolverChain,
    conditions: ConditionResolverChain,
    execs: ExecResolverChain,
    parser: Arc<dyn ExprParser>,
    cache: ExprCache,
    paths: Arc<PathCache>,
}

lazy_static! {
    static ref GLOBAL: Engine = Engine::new();
}

impl Engine {
    /// Engine with the default configuration and the default template
    /// grammar.
    pub fn new() -> Self {
        let config = EngineConfig::default();
        let parser = Arc::new(TemplateParser::new(&config.default_key_namespace));
        Self::build(config, parser)
    }

    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let parser = Arc::new(TemplateParser::new(&config.default_key_namespace));
        Ok(Self::build(config, parser))
    }

    /// Engine using a caller-supplied grammar.
    pub fn with_parser<P>(config: EngineConfig, parser: P) -> EngineResult<Self>
    where
        P: ExprParser + 'static,
    {
        config.validate()?;
        Ok(Self::build(config, Arc::new(parser)))
    }

    /// Process-wide default instance for composition roots that do not want
    /// to thread an engine through. Libraries should take an `&Engine`.
    pub fn global() -> &'static Engine {
        &GLOBAL
    }

    fn build(config: EngineConfig, parser: Arc<dyn ExprParser>) -> Self {
        let paths = Arc::new(PathCache::new());
        let user_keys = Arc::new(KeyResolverChain::new());
        let keys = KeyResolverChain::new().with(user_keys.clone());
        if config.register_context_keys {
            keys.delegate(PathKeys::context(
                &config.default_key_namespace,
                paths.clone(),
            ));
        }
        for namespace in &config.scoped_key_namespaces {
            keys.delegate(PathKeys::scoped(namespace, paths.clone()));
        }
        Self {
            cache: ExprCache::new(config.expr_cache_threshold),
            config,
            keys,
            user_keys,
            pipes: PipeResolverChain::new(),
            conditions: ConditionResolverChain::new(),
            execs: ExecResolverChain::new(),
            parser,
            paths,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered key delegates are consulted in order, ahead of the
    /// built-in context and scoped path keys.
    pub fn keys<R>(&self, delegate: R) -> &Self
    where
        R: Resolver<Key, Handler = Arc<dyn KeyHandler>> + 'static,
    {
        self.user_keys.delegate(delegate);
        self.invalidate("keys");
        self
    }

    pub fn pipes<R>(&self, delegate: R) -> &Self
    where
        R: Resolver<str, Handler = Arc<dyn PipeTransform>> + 'static,
    {
        self.pipes.delegate(delegate);
        self.invalidate("pipes");
        self
    }

    pub fn conditions<R>(&self, delegate: R) -> &Self
    where
        R: Resolver<str, Handler = Arc<dyn ConditionHandler>> + 'static,
    {
        self.conditions.delegate(delegate);
        self.invalidate("conditions");
        self
    }

    pub fn execs<R>(&self, delegate: R) -> &Self
    where
        R: Resolver<Exec, Handler = Box<dyn ExecHandler>> + 'static,
    {
        self.execs.delegate(delegate);
        self.invalidate("execs");
        self
    }

    fn invalidate(&self, chain: &str) {
        debug!(
            "Registered {} delegate, dropping {} cached expressions",
            chain,
            self.cache.len()
        );
        self.cache.clear();
    }

    /// Parses `source` without consulting or filling the cache.
    pub fn parse(&self, source: &str) -> Result<Expr, SyntaxError> {
        let env = ParseEnv {
            keys: &self.keys,
            pipes: &self.pipes,
        };
        self.parser.parse(source, &env)
    }

    fn compile(&self, source: &str) -> Result<Expr, SyntaxError> {
        self.cache
            .get_or_compile(source, |source| self.parse(source))
    }

    pub fn eval(&self, source: &str, context: &ExprContext) -> EngineResult<Value> {
        self.compile(source)?.call(context)
    }

    pub fn get_path(&self, path: &str, root: &Value) -> EngineResult<Value> {
        Ok(self.paths.get_or_compile(path)?.call(root))
    }

    /// [`get_path`](Self::get_path) rooted at a bare map. The empty path
    /// addresses nothing here and yields `Null`.
    pub fn get_path_in(&self, path: &str, root: &ValueMap) -> EngineResult<Value> {
        Ok(self
            .paths
            .get_or_compile(path)?
            .resolve_in(root)
            .cloned()
            .unwrap_or_default())
    }

    /// Resolves a key token the way `${...}` does: the context's key
    /// override first, then the engine's chain. Unknown keys are `Null`.
    pub fn resolve_key(&self, key: &str, context: &ExprContext) -> Value {
        let key = Key::parse_with_default(key, &self.config.default_key_namespace);
        let handler = context
            .keys_override()
            .and_then(|keys| keys.find(&key))
            .or_else(|| self.keys.find(&key));
        match handler {
            Some(handler) => handler.call(&key, context),
            None => {
                trace!("No handler for key {}", key);
                Value::Null
            }
        }
    }

    pub fn find_condition_handler(&self, op: &str) -> Option<Arc<dyn ConditionHandler>> {
        self.conditions.find(op)
    }

    /// One condition compiles to a single node; any other count compiles to
    /// an AND over one node per condition, in input order.
    #[instrument(level = "debug", skip(self, conditions), fields(count = conditions.len()))]
    pub fn compile_condition(&self, conditions: &[Condition]) -> EngineResult<ConditionExpr> {
        match conditions {
            [condition] => Ok(ConditionExpr::Single(self.compile_single(condition)?)),
            _ => {
                let children = conditions
                    .iter()
                    .map(|condition| self.compile_single(condition).map(ConditionExpr::Single))
                    .collect::<EngineResult<Vec<_>>>()?;
                Ok(ConditionExpr::Multi(MultiConditionExpr::new(children)))
            }
        }
    }

    fn compile_single(&self, condition: &Condition) -> EngineResult<SingleConditionExpr> {
        let handler = self
            .conditions
            .find(condition.op.as_str())
            .ok_or_else(|| Error::UnresolvedOperator(condition.op.clone()))?;
        let key_expr = self.compile(&condition.key_source())?;
        let value_exprs = condition
            .value
            .iter()
            .map(|source| self.compile(source))
            .collect::<Result<Vec<_>, SyntaxError>>()?;
        Ok(SingleConditionExpr::new(
            &condition.op,
            handler,
            key_expr,
            value_exprs,
        ))
    }

    pub fn test_conditions(
        &self,
        conditions: &[Condition],
        context: &ExprContext,
    ) -> EngineResult<bool> {
        self.compile_condition(conditions)?.call(context)
    }

    /// Dispatches an action. An `Exec` whose type no resolver knows is
    /// skipped without error. Otherwise config and params are evaluated,
    /// then the handler is configured and called, in that order, every time.
    pub fn exec(&self, exec: &Exec, context: &ExprContext) -> EngineResult<()> {
        let Some(mut handler) = self.execs.find(exec) else {
            debug!("No exec handler for type {:?}, skipping", exec.exec_type);
            return Ok(());
        };
        let config = self.eval_map(exec.config.iter(), context)?;
        let params = self.eval_map(exec.params.iter(), context)?;
        handler.configure(&config)?;
        handler.call(context, &params)
    }

    fn eval_map<'a, I>(&self, sources: I, context: &ExprContext) -> EngineResult<ValueMap>
    where
        I: Iterator<Item = (&'a String, &'a String)>,
    {
        sources
            .map(|(name, source)| Ok((name.clone(), self.eval(source, context)?)))
            .collect()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn path_cache_len(&self) -> usize {
        self.paths.len()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Path lookups on any value through [`Engine::global`].
pub trait EvalPath {
    fn eval_path(&self, path: &str) -> EngineResult<Value>;

    /// `fallback` when the path is malformed or addresses nothing.
    fn eval_path_or(&self, path: &str, fallback: Value) -> Value {
        match self.eval_path(path) {
            Ok(value) if !value.is_null() => value,
            _ => fallback,
        }
    }
}

impl EvalPath for Value {
    fn eval_path(&self, path: &str) -> EngineResult<Value> {
        Engine::global().get_path(path, self)
    }
}

impl EvalPath for ValueMap {
    fn eval_path(&self, path: &str) -> EngineResult<Value> {
        Engine::global().get_path_in(path, self)
    }
}

impl EvalPath for ExprContext {
    fn eval_path(&self, path: &str) -> EngineResult<Value> {
        self.values().eval_path(path)
    }
}
