//! Loom parser - recursive descent over the lexed token stream
//!
//! ```rust,ignore
//! use loom_syntax::parser::parse_expression;
//!
//! let output = parse_expression("$x + 1").unwrap();
//! println!("{:?}", output.arena.get(output.node));
//! ```

pub mod arena;
pub mod ast;
pub mod error;
pub mod extension;
mod prediction;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod printer;

#[cfg(test)]
mod tests;

pub use arena::{ArenaStats, ExprArena, ExprId};
pub use extension::{ExtensionRegistry, IslandExtension};
pub use parser::{
    parse, parse_expression, parse_instance, parse_type, parse_with_diagnostics, ParseOutput,
    Parser,
};
pub use printer::Printer;
