//! Error types for every compiler stage.
//!
//! Each stage gets its own `thiserror`-derived enum carrying the
//! structured data a diagnostic needs (never just a pre-formatted
//! string), plus a [`Position`] for the diagnostics renderer. [`WispError`]
//! is the top-level union the driver and CLI deal in.

use crate::position::Position;
use thiserror::Error;

/// Errors raised while turning source bytes into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character {ch:?}")]
    UnexpectedChar { ch: u8, span: Position },

    #[error("invalid number {text:?}")]
    InvalidNumber { text: String, span: Position },

    #[error("unterminated string")]
    UnterminatedString { span: Position },
}

impl LexError {
    pub fn span(&self) -> Position {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::InvalidNumber { span, .. } => *span,
            LexError::UnterminatedString { span, .. } => *span,
        }
    }
}

/// Errors raised while turning tokens into an expression tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token: {found}")]
    UnexpectedToken { found: String, span: Position },

    #[error("unexpected end of input")]
    UnexpectedEof { span: Position },

    #[error("{message}")]
    Arity {
        form: &'static str,
        message: String,
        span: Position,
    },

    #[error("expected identifier")]
    ExpectedIdentifier { span: Position },

    #[error("expected body")]
    ExpectedBody { span: Position },

    #[error("expected a params vector")]
    ExpectedParams { span: Position },

    #[error("malformed match pattern")]
    MalformedMatchPattern { span: Position },
}

impl ParseError {
    pub fn span(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::UnexpectedEof { span, .. } => *span,
            ParseError::Arity { span, .. } => *span,
            ParseError::ExpectedIdentifier { span, .. } => *span,
            ParseError::ExpectedBody { span, .. } => *span,
            ParseError::ExpectedParams { span, .. } => *span,
            ParseError::MalformedMatchPattern { span, .. } => *span,
        }
    }
}

/// Errors raised while expanding macros and quotation forms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpandError {
    #[error("macro {macro_name:?} called with the wrong number of arguments")]
    Arity { macro_name: String, span: Position },

    #[error("destructuring parameter does not match the shape of its argument")]
    DestructureShape { span: Position },

    #[error("unquote used outside of a quasiquote")]
    UnquoteOutsideQuasiquote { span: Position },

    #[error("unquote-splicing value is not a list or vector")]
    SpliceNotAList { span: Position },

    #[error("failed to evaluate unquote at compile time: {message}")]
    EvalBridge { message: String, span: Position },

    #[error("macro expansion exceeded the maximum depth")]
    DepthExceeded { span: Position },
}

impl ExpandError {
    pub fn span(&self) -> Position {
        match self {
            ExpandError::Arity { span, .. } => *span,
            ExpandError::DestructureShape { span, .. } => *span,
            ExpandError::UnquoteOutsideQuasiquote { span, .. } => *span,
            ExpandError::SpliceNotAList { span, .. } => *span,
            ExpandError::EvalBridge { span, .. } => *span,
            ExpandError::DepthExceeded { span, .. } => *span,
        }
    }
}

/// Errors raised while lowering an expression tree to JavaScript text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranspileError {
    #[error("misplaced operator outside of a call")]
    MisplacedOperator { span: Position },

    #[error("unknown expression variant")]
    UnknownExpr { span: Position },
}

impl TranspileError {
    pub fn span(&self) -> Position {
        match self {
            TranspileError::MisplacedOperator { span } => *span,
            TranspileError::UnknownExpr { span } => *span,
        }
    }
}

/// Errors raised talking to the external JavaScript host process.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("failed to spawn host process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error talking to host process: {0}")]
    Io(#[source] std::io::Error),

    #[error("host process produced a malformed response frame: {line:?}")]
    MalformedFrame { line: String },

    #[error("host process reported an error: {0}")]
    Reported(String),

    #[error("timed out after {waited_ms}ms waiting for the host process")]
    Timeout { waited_ms: u64 },
}

/// The top-level error type the CLI and compiler driver deal in.
#[derive(Error, Debug)]
pub enum WispError {
    #[error("lexing error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("expansion error: {0}")]
    Expand(#[from] ExpandError),

    #[error("compile error: {0}")]
    Transpile(#[from] TranspileError),

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl WispError {
    /// The stage label used as the diagnostic's bold-red prefix, matching
    /// the "lexing error"/"parse error"/... vocabulary from the spec.
    pub fn stage_label(&self) -> &'static str {
        match self {
            WispError::Lex(_) => "lexing error",
            WispError::Parse(_) => "parse error",
            WispError::Expand(_) => "expansion error",
            WispError::Transpile(_) => "compile error",
            WispError::Host(_) => "host error",
            WispError::Io(_) => "I/O error",
        }
    }

    /// The source span this error points at, if any (host and I/O errors
    /// have no span into the compiled source).
    pub fn span(&self) -> Option<Position> {
        match self {
            WispError::Lex(e) => Some(e.span()),
            WispError::Parse(e) => Some(e.span()),
            WispError::Expand(e) => Some(e.span()),
            WispError::Transpile(e) => Some(e.span()),
            WispError::Host(_) => None,
            WispError::Io(_) => None,
        }
    }
}
