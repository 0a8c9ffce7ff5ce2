//! Loom lexer - tokenization for the Loom modeling language
//!
//! ```rust,ignore
//! use loom_syntax::lexer::lex;
//!
//! let tokens = lex("let x = $y + 1").unwrap();
//! for (token, span) in tokens {
//!     println!("{:?} at line {}", token, span.start_line);
//! }
//! ```

pub mod token;

pub use loom_core::shared::SpanInfo;
pub use token::{lex, Token};
