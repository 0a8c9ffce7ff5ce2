//! Qualified names
//!
//! Every named reference in Loom source is a `::`-separated package path
//! followed by a final identifier. A leading `::` marks the reference as
//! absolute (resolved from the root package rather than the current one).

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A package-qualified name such as `meta::pure::Person`.
///
/// Invariant: a qualified name always has at least one segment (the final
/// `name`); `path` may be empty for bare references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Package path segments, in source order, excluding the final name
    pub path: Vec<CompactString>,
    /// The final identifier
    pub name: CompactString,
    /// True when the reference carries a leading `::`
    pub absolute: bool,
}

impl QualifiedName {
    /// Create a bare (unqualified, relative) name
    pub fn bare(name: impl Into<CompactString>) -> Self {
        QualifiedName {
            path: Vec::new(),
            name: name.into(),
            absolute: false,
        }
    }

    /// Create a qualified name from path segments and a final name
    pub fn qualified<I, S>(path: I, name: impl Into<CompactString>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        QualifiedName {
            path: path.into_iter().map(Into::into).collect(),
            name: name.into(),
            absolute: false,
        }
    }

    /// True when the name carries no package path
    pub fn is_bare(&self) -> bool {
        self.path.is_empty()
    }

    /// Total number of segments including the final name
    pub fn segment_count(&self) -> usize {
        self.path.len() + 1
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "::")?;
        }
        for segment in &self.path {
            write!(f, "{}::", segment)?;
        }
        write!(f, "{}", self.name)
    }
}
