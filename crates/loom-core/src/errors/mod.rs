//! Error taxonomy for the Loom syntax pipeline
//!
//! Two error families exist at this layer: lexical errors (malformed
//! tokens) and syntax errors (terminal mismatches and no-viable-alternative
//! failures). Semantic errors belong to the layers consuming the AST and
//! are deliberately absent here.

pub mod diagnostic;


use crate::shared::SpanInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use diagnostic::{render_diagnostic, render_diagnostics, DiagnosticConfig, SourceInfo};

/// Lexer errors
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum LexerError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Unterminated island block")]
    UnterminatedIsland,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Invalid escape sequence: {0}")]
    InvalidEscape(String),
}

/// Parse errors
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("No viable alternative for {rule} at {found}")]
    NoViableAlternative { rule: String, found: String },
    #[error("Syntax error: {0}")]
    SyntaxError(String),
    #[error("Invalid multiplicity: lower bound {lower} exceeds upper bound {upper}")]
    InvalidMultiplicity { lower: u32, upper: u32 },
    #[error("A code block requires at least one statement")]
    EmptyCodeBlock,
}

/// Top-level error type, parameterized over position info like the rest of
/// the pipeline so synthetic nodes can carry empty spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoomError<Info> {
    ELexerError(LexerError, Info),
    EParseError(ParseError, Info),
}

/// The error type used everywhere source positions are line/column spans
pub type LoomErrorI = LoomError<SpanInfo>;

impl<Info> LoomError<Info> {
    /// Position info attached to this error
    pub fn info(&self) -> &Info {
        match self {
            LoomError::ELexerError(_, info) | LoomError::EParseError(_, info) => info,
        }
    }

    /// True for structural (no-viable-alternative) parse errors
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LoomError::EParseError(ParseError::NoViableAlternative { .. }, _)
        )
    }
}

impl<Info> fmt::Display for LoomError<Info> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoomError::ELexerError(e, _) => write!(f, "{}", e),
            LoomError::EParseError(e, _) => write!(f, "{}", e),
        }
    }
}

impl<Info: fmt::Debug> std::error::Error for LoomError<Info> {}
