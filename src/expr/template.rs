//! Default expression grammar: literal text with `${ ... }` interpolations.
//!
//! ```text
//! template      := (interpolation | text)*
//! interpolation := "${" key ("|" pipe)* "}"
//! pipe          := name (":" arg)*
//! ```
//!
//! * A template that is exactly one interpolation evaluates to the raw key
//!   value, type preserved.
//! * A template with no interpolation is a literal. Numeric literals become
//!   numbers, anything else stays text.
//! * Mixed templates render every part as text and concatenate.

use std::sync::Arc;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, not, opt, recognize},
    error::{context, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use tracing::trace;

use super::{Expr, ExprNode, ExprParser, ParseEnv};
use crate::context::ExprContext;
use crate::error::{EngineResult, SyntaxError};
use crate::key::{Key, DEFAULT_NAMESPACE};
use crate::resolver::{KeyHandler, PipeTransform, Resolver};
use crate::value::Value;

type ParserResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Interpolation(Interpolation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    pub key: String,
    pub pipes: Vec<PipeCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeCall {
    pub name: String,
    pub args: Vec<String>,
}

#[tracing::instrument(level = "trace", skip(input))]
fn parse_key(input: &str) -> ParserResult<String> {
    context(
        "key",
        map(
            take_while1(|c: char| !c.is_whitespace() && c != '|' && c != '}'),
            |key: &str| key.to_string(),
        ),
    )(input)
}

fn parse_pipe_arg(input: &str) -> ParserResult<String> {
    context(
        "pipe argument",
        map(
            preceded(char(':'), take_while(|c: char| c != ':' && c != '|' && c != '}')),
            |arg: &str| arg.trim().to_string(),
        ),
    )(input)
}

fn parse_pipe(input: &str) -> ParserResult<PipeCall> {
    context(
        "pipe",
        map(
            preceded(
                tuple((multispace0, char('|'), multispace0)),
                pair(
                    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
                    many0(parse_pipe_arg),
                ),
            ),
            |(name, args): (&str, Vec<String>)| PipeCall {
                name: name.to_string(),
                args,
            },
        ),
    )(input)
}

#[tracing::instrument(level = "trace", skip(input))]
fn parse_interpolation(input: &str) -> ParserResult<TemplatePart> {
    context(
        "interpolation",
        map(
            delimited(
                pair(tag("${"), multispace0),
                pair(parse_key, many0(parse_pipe)),
                pair(multispace0, char('}')),
            ),
            |(key, pipes)| TemplatePart::Interpolation(Interpolation { key, pipes }),
        ),
    )(input)
}

fn parse_text(input: &str) -> ParserResult<TemplatePart> {
    context(
        "text",
        map(
            alt((
                take_while1(|c: char| c != '$'),
                recognize(terminated(char('$'), not(char('{')))),
            )),
            |text: &str| TemplatePart::Text(text.to_string()),
        ),
    )(input)
}

/// Splits a source string into text and interpolation parts. Adjacent text
/// parts are merged.
pub fn parse_template(source: &str) -> Result<Vec<TemplatePart>, SyntaxError> {
    let (rest, parts) = many0(alt((parse_interpolation, parse_text)))(source).map_err(|_| {
        SyntaxError::ParseError {
            message: "invalid template".to_string(),
            source_text: source.to_string(),
            offset: 0,
        }
    })?;
    if !rest.is_empty() {
        return Err(if rest.starts_with("${") && !rest.contains('}') {
            SyntaxError::UnterminatedInterpolation(source.to_string())
        } else {
            SyntaxError::ParseError {
                message: format!("unexpected input {:?}", rest),
                source_text: source.to_string(),
                offset: source.len() - rest.len(),
            }
        });
    }

    let mut merged: Vec<TemplatePart> = Vec::with_capacity(parts.len());
    for part in parts {
        match (merged.last_mut(), part) {
            (Some(TemplatePart::Text(previous)), TemplatePart::Text(text)) => {
                previous.push_str(&text)
            }
            (_, part) => merged.push(part),
        }
    }
    Ok(merged)
}

fn parse_number(input: &str) -> ParserResult<&str> {
    recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)
}

/// Literal text as a value: integers and decimals become numbers.
pub fn literal_value(text: &str) -> Value {
    let trimmed = text.trim();
    if all_consuming(parse_number)(trimmed).is_ok() {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::String(text.to_string())
}

struct BoundPipe {
    transform: Arc<dyn PipeTransform>,
    args: Vec<Value>,
}

/// `${key | pipe}`: resolves through the context's key override first and
/// falls back to the handler bound from the engine chain at compile time.
struct KeyNode {
    key: Key,
    bound: Option<Arc<dyn KeyHandler>>,
    pipes: Vec<BoundPipe>,
}

impl KeyNode {
    fn value(&self, context: &ExprContext) -> Value {
        let handler = context
            .keys_override()
            .and_then(|keys| keys.find(&self.key))
            .or_else(|| self.bound.clone());
        let value = match handler {
            Some(handler) => handler.call(&self.key, context),
            None => {
                trace!("No handler for key {}", self.key);
                Value::Null
            }
        };
        self.pipes.iter().fold(value, |value, pipe| {
            pipe.transform.transform(value, &pipe.args, context)
        })
    }
}

impl ExprNode for KeyNode {
    fn call(&self, context: &ExprContext) -> EngineResult<Value> {
        Ok(self.value(context))
    }
}

enum Segment {
    Text(String),
    Key(KeyNode),
}

struct TemplateNode {
    segments: Vec<Segment>,
}

impl ExprNode for TemplateNode {
    fn call(&self, context: &ExprContext) -> EngineResult<Value> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Key(node) => out.push_str(&node.value(context).to_text()),
            }
        }
        Ok(Value::String(out))
    }
}

/// The crate's default [`ExprParser`].
#[derive(Debug, Clone)]
pub struct TemplateParser {
    default_namespace: String,
}

impl TemplateParser {
    pub fn new(default_namespace: &str) -> Self {
        Self {
            default_namespace: default_namespace.to_string(),
        }
    }

    fn bind(
        &self,
        interpolation: Interpolation,
        env: &ParseEnv<'_>,
    ) -> Result<KeyNode, SyntaxError> {
        let key = Key::parse_with_default(&interpolation.key, &self.default_namespace);
        let bound = env.keys.find(&key);
        let pipes = interpolation
            .pipes
            .into_iter()
            .map(|pipe| -> Result<BoundPipe, SyntaxError> {
                let transform = env
                    .pipes
                    .find(pipe.name.as_str())
                    .ok_or_else(|| SyntaxError::UnknownPipe(pipe.name.clone()))?;
                Ok(BoundPipe {
                    transform,
                    args: pipe.args.iter().map(|arg| literal_value(arg)).collect(),
                })
            })
            .collect::<Result<Vec<_>, SyntaxError>>()?;
        Ok(KeyNode { key, bound, pipes })
    }
}

impl Default for TemplateParser {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl ExprParser for TemplateParser {
    #[tracing::instrument(level = "debug", skip(self, env))]
    fn parse(&self, source: &str, env: &ParseEnv<'_>) -> Result<Expr, SyntaxError> {
        let mut parts = parse_template(source)?;
        match parts.len() {
            0 => Ok(Expr::constant(source, Value::String(String::new()))),
            1 => match parts.remove(0) {
                TemplatePart::Text(text) => Ok(Expr::constant(source, literal_value(&text))),
                TemplatePart::Interpolation(interpolation) => {
                    Ok(Expr::new(source, self.bind(interpolation, env)?))
                }
            },
            _ => {
                let segments = parts
                    .into_iter()
                    .map(|part| -> Result<Segment, SyntaxError> {
                        match part {
                            TemplatePart::Text(text) => Ok(Segment::Text(text)),
                            TemplatePart::Interpolation(interpolation) => {
                                Ok(Segment::Key(self.bind(interpolation, env)?))
                            }
                        }
                    })
                    .collect::<Result<Vec<_>, SyntaxError>>()?;
                Ok(Expr::new(source, TemplateNode { segments }))
            }
        }
    }
}
