use core::fmt;
use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::ExprContext;
use crate::error::EngineResult;
use crate::expr::Expr;
use crate::resolver::ConditionHandler;
use crate::value::Value;

/// Declarative condition: `key`, and each entry of `value`, are expression
/// sources, so both sides may be dynamic.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Condition {
    pub key: String,
    pub op: String,
    #[serde(default)]
    pub value: Vec<String>,
}

impl Condition {
    pub fn new<I, S>(key: &str, op: &str, value: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.to_string(),
            op: op.to_string(),
            value: value.into_iter().map(Into::into).collect(),
        }
    }

    /// Expression source for the left-hand side. A bare key is wrapped as
    /// `${key}`; a key that already interpolates is used as written.
    pub fn key_source(&self) -> Cow<'_, str> {
        if self.key.contains("${") {
            Cow::Borrowed(&self.key)
        } else {
            Cow::Owned(format!("${{{}}}", self.key))
        }
    }
}

/// Compiled form of one [`Condition`].
#[derive(Clone)]
pub struct SingleConditionExpr {
    op: String,
    handler: Arc<dyn ConditionHandler>,
    key_expr: Expr,
    value_exprs: Vec<Expr>,
}

impl SingleConditionExpr {
    pub fn new(
        op: &str,
        handler: Arc<dyn ConditionHandler>,
        key_expr: Expr,
        value_exprs: Vec<Expr>,
    ) -> Self {
        Self {
            op: op.to_string(),
            handler,
            key_expr,
            value_exprs,
        }
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn call(&self, context: &ExprContext) -> EngineResult<bool> {
        let key_value = self.key_expr.call(context)?;
        let values = self
            .value_exprs
            .iter()
            .map(|expr| expr.call(context))
            .collect::<EngineResult<Vec<Value>>>()?;
        Ok(self.handler.test(&key_value, &values))
    }
}

impl fmt::Debug for SingleConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleConditionExpr")
            .field("op", &self.op)
            .field("key_expr", &self.key_expr)
            .field("value_exprs", &self.value_exprs)
            .finish()
    }
}

/// Logical AND over its children, evaluated in order. No children is true.
#[derive(Debug, Clone, Default)]
pub struct MultiConditionExpr {
    children: Vec<ConditionExpr>,
}

impl MultiConditionExpr {
    pub fn new(children: Vec<ConditionExpr>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[ConditionExpr] {
        &self.children
    }

    pub fn call(&self, context: &ExprContext) -> EngineResult<bool> {
        for child in &self.children {
            if !child.call(context)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[derive(Debug, Clone)]
pub enum ConditionExpr {
    Single(SingleConditionExpr),
    Multi(MultiConditionExpr),
}

impl ConditionExpr {
    pub fn call(&self, context: &ExprContext) -> EngineResult<bool> {
        match self {
            ConditionExpr::Single(single) => single.call(context),
            ConditionExpr::Multi(multi) => multi.call(context),
        }
    }
}
