//! Property-access paths such as `user.roles[0].name` or `user.roles.0.name`.
//!
//! Paths are compiled by a small dedicated grammar: no operators, no pipes,
//! only field and index traversal. Compiled paths are cached in a
//! [`PathCache`] for the lifetime of the cache owner.

use std::sync::Arc;

use dashmap::DashMap;
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt},
    error::{context, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use tracing::debug;

use crate::error::SyntaxError;
use crate::value::{Value, ValueMap};

type ParserResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    source: String,
    segments: Vec<PathSegment>,
}

fn parse_field(input: &str) -> ParserResult<PathSegment> {
    context(
        "path field",
        map(
            take_while1(|c: char| c != '.' && c != '[' && c != ']'),
            |name: &str| PathSegment::Field(name.to_string()),
        ),
    )(input)
}

fn parse_index(input: &str) -> ParserResult<PathSegment> {
    context(
        "path index",
        map_res(delimited(char('['), digit1, char(']')), |digits: &str| {
            digits.parse::<usize>().map(PathSegment::Index)
        }),
    )(input)
}

fn parse_path(input: &str) -> ParserResult<Vec<PathSegment>> {
    context(
        "path",
        map(
            pair(
                opt(alt((parse_index, parse_field))),
                many0(alt((preceded(char('.'), parse_field), parse_index))),
            ),
            |(first, rest)| first.into_iter().chain(rest).collect(),
        ),
    )(input)
}

impl PathExpr {
    pub fn compile(source: &str) -> Result<Self, SyntaxError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Ok(Self {
                source: source.to_string(),
                segments: Vec::new(),
            });
        }
        let (_, segments) = all_consuming(parse_path)(trimmed)
            .map_err(|_| SyntaxError::InvalidPath(source.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Evaluates against `root`; any miss yields `Value::Null`.
    pub fn call(&self, root: &Value) -> Value {
        self.resolve(root).cloned().unwrap_or_default()
    }

    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| step(current, segment))
    }

    /// Like [`resolve`](Self::resolve) but rooted at a bare map, so callers
    /// holding a context need not wrap it in a `Value`. An empty path has no
    /// value here.
    pub fn resolve_in<'a>(&self, root: &'a ValueMap) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        let start = match first {
            PathSegment::Field(name) => root.get(name),
            PathSegment::Index(index) => root.get(&index.to_string()),
        }?;
        rest.iter()
            .try_fold(start, |current, segment| step(current, segment))
    }
}

fn step<'a>(current: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (current, segment) {
        (Value::Map(map), PathSegment::Field(name)) => map.get(name),
        (Value::Map(map), PathSegment::Index(index)) => map.get(&index.to_string()),
        (Value::List(items), PathSegment::Index(index)) => items.get(*index),
        (Value::List(items), PathSegment::Field(name)) => {
            name.parse::<usize>().ok().and_then(|index| items.get(index))
        }
        _ => None,
    }
}

/// Unbounded cache of compiled paths. Path compilation never depends on
/// registered resolvers, so entries stay valid for the cache's lifetime and
/// are never evicted.
#[derive(Debug, Default)]
pub struct PathCache {
    paths: DashMap<String, Arc<PathExpr>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&self, source: &str) -> Result<Arc<PathExpr>, SyntaxError> {
        if let Some(path) = self.paths.get(source) {
            return Ok(path.value().clone());
        }
        let compiled = Arc::new(PathExpr::compile(source)?);
        debug!("Compiled path: {}", source);
        Ok(self
            .paths
            .entry(source.to_string())
            .or_insert(compiled)
            .value()
            .clone())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
