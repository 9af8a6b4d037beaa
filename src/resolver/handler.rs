use crate::context::ExprContext;
use crate::error::EngineResult;
use crate::key::Key;
use crate::value::{Value, ValueMap};

/// Produces the value addressed by a [`Key`]. Returns `Value::Null` when
/// there is nothing to produce.
pub trait KeyHandler: Send + Sync {
    fn call(&self, key: &Key, context: &ExprContext) -> Value;
}

impl<F> KeyHandler for F
where
    F: Fn(&Key, &ExprContext) -> Value + Send + Sync,
{
    fn call(&self, key: &Key, context: &ExprContext) -> Value {
        self(key, context)
    }
}

/// A pipe stage: `${ key | name:arg:arg }`.
pub trait PipeTransform: Send + Sync {
    fn transform(&self, value: Value, args: &[Value], context: &ExprContext) -> Value;
}

impl<F> PipeTransform for F
where
    F: Fn(Value, &[Value], &ExprContext) -> Value + Send + Sync,
{
    fn transform(&self, value: Value, args: &[Value], context: &ExprContext) -> Value {
        self(value, args, context)
    }
}

/// Condition operator. `key_value` is the evaluated left-hand side, `values`
/// the evaluated right-hand sides in declaration order.
#[mockall::automock]
pub trait ConditionHandler: Send + Sync {
    fn test(&self, key_value: &Value, values: &[Value]) -> bool;
}

impl<F> ConditionHandler for F
where
    F: Fn(&Value, &[Value]) -> bool + Send + Sync,
{
    fn test(&self, key_value: &Value, values: &[Value]) -> bool {
        self(key_value, values)
    }
}

/// Action handler with a two-phase lifecycle.
///
/// For every dispatch the engine calls [`configure`](ExecHandler::configure)
/// exactly once and then [`call`](ExecHandler::call). `configure` must be
/// idempotent.
#[mockall::automock]
pub trait ExecHandler: Send {
    fn configure(&mut self, config: &ValueMap) -> EngineResult<()>;

    fn call(&mut self, context: &ExprContext, params: &ValueMap) -> EngineResult<()>;
}
