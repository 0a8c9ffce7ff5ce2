//! Island extension hooks
//!
//! An island block delegates its interior to whatever sub-language the
//! block names. The parser itself only records the delimited content; a
//! registered [`IslandExtension`] may additionally parse that content into
//! a structured fragment, which is attached to the island node.

use loom_core::errors::LoomErrorI;
use loom_core::shared::SpanInfo;
use rustc_hash::FxHashMap;

use super::ast::IslandBlock;

/// A pluggable parser for one island sub-language
pub trait IslandExtension {
    /// The island name this extension handles, e.g. `SQL` for `#SQL{...}#`
    fn name(&self) -> &str;

    /// Parse the delimited island content into a structured fragment.
    /// Errors propagate as structural parse failures.
    fn parse(&self, block: &IslandBlock, info: SpanInfo) -> Result<serde_json::Value, LoomErrorI>;
}

/// Registry of island extensions, keyed by island name
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: FxHashMap<String, Box<dyn IslandExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extension: Box<dyn IslandExtension>) {
        self.extensions
            .insert(extension.name().to_string(), extension);
    }

    pub fn get(&self, name: &str) -> Option<&dyn IslandExtension> {
        self.extensions.get(name).map(Box::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("names", &self.extensions.keys().collect::<Vec<_>>())
            .finish()
    }
}
