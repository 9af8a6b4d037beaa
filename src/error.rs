use thiserror::Error;

/// Raised by an [`ExprParser`](crate::expr::ExprParser) or the path compiler
/// for malformed source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("Parse error at offset {offset}: {message} (source: {source_text:?})")]
    ParseError {
        message: String,
        source_text: String,
        offset: usize,
    },
    #[error("Unterminated interpolation in {0:?}")]
    UnterminatedInterpolation(String),
    #[error("Unknown pipe: {0}")]
    UnknownPipe(String),
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("No condition handler registered for operator: {0}")]
    UnresolvedOperator(String),
    #[error("Handler error in {handler}: {message}")]
    Handler { handler: String, message: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, Error>;

impl Error {
    pub fn handler<H: Into<String>, M: Into<String>>(handler: H, message: M) -> Self {
        Error::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }

    /// Configuration-time defects: bad syntax or a missing operator.
    pub fn is_configuration_defect(&self) -> bool {
        matches!(self, Error::Syntax(_) | Error::UnresolvedOperator(_))
    }
}
