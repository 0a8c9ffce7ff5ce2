//! Arena allocation for expression nodes
//!
//! Expressions are stored contiguously and referenced by 32-bit indices,
//! which keeps recursive AST shapes flat in memory and makes nodes cheap
//! to copy around during parsing.

use loom_core::shared::SpanInfo;
use serde::{Deserialize, Serialize};

use super::ast::Expr;

/// Index of an expression node in an [`ExprArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owning store for every expression node produced by one parse. Each
/// node carries the source span it consumed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExprArena {
    nodes: Vec<(Expr, SpanInfo)>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Allocate a node and return its id
    pub fn alloc(&mut self, expr: Expr, info: SpanInfo) -> ExprId {
        let id = ExprId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push((expr, info));
        id
    }

    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()].0
    }

    pub fn get_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.nodes[id.index()].0
    }

    pub fn span(&self, id: ExprId) -> SpanInfo {
        self.nodes[id.index()].1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node allocated at or after `mark`. Used to discard
    /// speculative allocations after a failed lookahead.
    pub fn truncate(&mut self, mark: usize) {
        self.nodes.truncate(mark);
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            node_count: self.nodes.len(),
            capacity: self.nodes.capacity(),
        }
    }
}

/// Memory statistics for diagnostics and benchmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    pub node_count: usize,
    pub capacity: usize,
}
