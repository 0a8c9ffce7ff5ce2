//! Loom Core Library
//!
//! Foundation types shared by the Loom syntax pipeline and anything that
//! consumes its output:
//!
//! - **Spans**: source positions for diagnostics (`shared` module)
//! - **Names**: qualified-name references (`names` module)
//! - **Errors**: the lexer/parser error taxonomy and diagnostic rendering
//!   (`errors` module)

pub mod errors;
pub mod names;
pub mod shared;

// Re-export the types callers reach for constantly
pub use errors::{LexerError, LoomError, LoomErrorI, ParseError};
pub use names::QualifiedName;
pub use shared::SpanInfo;

/// Version information for the loom-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
