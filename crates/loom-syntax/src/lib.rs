//! Loom syntax - lexical analysis and parsing for the Loom modeling language
//!
//! This crate turns Loom source text into a typed AST in two stages: a
//! logos-driven lexer producing a token stream with span information, and
//! a recursive-descent parser over that stream with deterministic
//! first-match ambiguity resolution and two-tier error recovery.
//!
//! ```rust,ignore
//! use loom_syntax::parser::parse_expression;
//!
//! let output = parse_expression("Person.all()->filter({p | $p.age > 30})").unwrap();
//! assert!(output.diagnostics.is_empty());
//! ```

pub mod lexer;
pub mod parser;


pub use lexer::{lex, Token};
pub use loom_core::errors::{LexerError, LoomError, LoomErrorI, ParseError};
pub use loom_core::names::QualifiedName;
pub use loom_core::shared::SpanInfo;
pub use parser::{
    parse, parse_expression, parse_instance, parse_type, parse_with_diagnostics, ExprArena,
    ExprId, ExtensionRegistry, IslandExtension, ParseOutput, Parser, Printer,
};
