//! Error values of the expression engine. Syntax errors carry the normalized source and a
//! labelled span so that `miette` can render them; definition errors describe why a user
//! function or sequence is not callable.
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("empty expression")]
    Empty,
    #[error("unmatched parenthesis")]
    UnmatchedParenthesis,
    #[error("misplaced operator")]
    MisplacedOperator,
    #[error("misplaced operand")]
    MisplacedOperand,
    #[error("unknown identifier")]
    UnknownIdentifier,
    #[error("function must be called with parentheses")]
    FunctionWithoutParentheses,
    #[error("invalid number")]
    InvalidNumber,
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("symbol not available in this expression")]
    NotAvailable,
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[error("{kind}: `{fragment}` at position {column}")]
#[diagnostic(code(grapher::syntax))]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub fragment: String,
    /// 1-based character column in the normalized expression
    pub column: usize,

    #[source_code]
    pub source_text: String,

    #[label("here")]
    pub span: SourceSpan,

    #[help]
    pub help: Option<String>,
}

impl SyntaxError {
    /// `offset` and `len` are byte positions in `source`
    pub fn new(kind: SyntaxErrorKind, source: &str, offset: usize, len: usize) -> Self {
        let offset = offset.min(source.len());
        let end = (offset + len).min(source.len());
        SyntaxError {
            kind,
            fragment: source[offset..end].to_string(),
            column: source[..offset].chars().count() + 1,
            source_text: source.to_string(),
            span: SourceSpan::from(offset..end),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// byte offset of the error in the normalized expression
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("`{0}` is not defined")]
    Undefined(String),

    #[error("`{0}` is not a valid function or sequence name")]
    #[diagnostic(help("names start with a lowercase letter and contain only letters and `_`"))]
    InvalidName(String),

    #[error("`{0}` is already taken")]
    Duplicate(String),

    #[error("cannot read a definition from `{0}`")]
    #[diagnostic(help("write definitions as `f(x)=...` or `u(n)=...`"))]
    MalformedDefinition(String),

    #[error("the expression of `{name}` is invalid")]
    InvalidSyntax {
        name: String,
        #[source]
        #[diagnostic_source]
        source: SyntaxError,
    },

    #[error("`{name}` has no expression yet")]
    MissingExpression { name: String },

    #[error("`{name}` calls itself in its expression")]
    SelfReference { name: String },

    #[error("`{name}` is part of an infinite calling loop: {chain}")]
    Cycle { name: String, chain: String },

    #[error("`{name}` calls `{callee}`, which is either undefined or invalid")]
    InvalidCallee { name: String, callee: String },

    #[error("`{name}` calls the antiderivative of `{function}` without an anchor point")]
    MissingAnchor { name: String, function: String },
}
