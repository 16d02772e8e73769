// Parser interface - source text to module tree
// The weaver never parses source itself; a parser front end hands it trees.
use std::path::Path;

use crate::ast::Module;
use crate::Result;

/// Trait for parser front ends producing module trees
pub trait SourceParser: Send + Sync {
    /// Parse source into a module tree
    fn parse(&mut self, source: &str) -> Result<Module>;

    /// Parse a file
    fn parse_file(&mut self, path: &Path) -> Result<Module> {
        let source = std::fs::read_to_string(path)?;
        self.parse(&source)
    }

    /// Get parser name for debugging
    fn name(&self) -> &'static str;
}

/// Reads module trees serialized as JSON by an external parser
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTreeParser;

impl JsonTreeParser {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for JsonTreeParser {
    fn parse(&mut self, source: &str) -> Result<Module> {
        let module: Module = serde_json::from_str(source)?;
        module.check_syntax()?;
        Ok(module)
    }

    fn name(&self) -> &'static str {
        "json-tree"
    }
}

/// Serialize a tree in the format [`JsonTreeParser`] reads
pub fn to_json(module: &Module) -> Result<String> {
    Ok(serde_json::to_string_pretty(module)?)
}
