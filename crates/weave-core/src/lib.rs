//! # Weave Core
//!
//! Ahead-of-time aspect weaving over module syntax trees, including:
//! - A Python-shaped syntax tree and source renderer
//! - The advice model (references, advices, aspects, worklists)
//! - Pointcut matching over structural paths
//! - The two-phase transformer and alias mangling
//! - Module resolution, search-path registration and per-module orchestration
//!
//! Parsing source text into a tree is left to an external parser; trees are
//! exchanged through [`parser::SourceParser`] implementations.

#![warn(clippy::all)]

pub mod aspect;
pub mod ast;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod weaver;

// Re-export commonly used types
pub use aspect::{Advice, AdviceKind, Aspect, AspectSpec, Declaration, Pointcut, Reference, Worklist};
pub use ast::{ClassDef, Expr, FunctionDef, Module, Stmt, ToSource, WovenRef};
pub use parser::{JsonTreeParser, SourceParser};
pub use registry::SearchPathRegistry;
pub use resolver::{is_writable, ModuleResolver, SearchPathResolver, StaticResolver};
pub use weaver::{ModuleWeaver, Phase, StructuralPath, Transformer, WeaveOutcome};

/// Weave core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on suffixing rounds while mangling a single alias
pub const MAX_MANGLE_ATTEMPTS: usize = 32;

/// Initialize tracing for weave components
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initialize tracing with `level` as the default for weave components;
/// `RUST_LOG` still applies to everything else
pub fn init_tracing_with_level(level: &str) {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match format!("weave_core={level}").parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Weaving run configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// Extra roots searched when resolving advice modules
    pub search_paths: Vec<std::path::PathBuf>,
    /// Base directory used to derive module local names
    pub base_path: Option<std::path::PathBuf>,
    /// Extension of serialized tree files
    pub tree_extension: String,
    /// Maximum suffixing rounds per alias before giving up
    pub max_mangle_attempts: usize,
    /// Compute the weave but write nothing
    pub dry_run: bool,
    /// Print rendered source of woven modules
    pub display: bool,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            base_path: None,
            tree_extension: "json".to_string(),
            max_mangle_attempts: MAX_MANGLE_ATTEMPTS,
            dry_run: false,
            display: false,
        }
    }
}

impl WeaveConfig {
    /// Load a configuration file (JSON)
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Error types for weaving operations
#[derive(thiserror::Error, Debug)]
pub enum WeaveError {
    /// A reference's origin module cannot be located
    #[error("Unresolvable module: {module}")]
    UnresolvableModule { module: String },

    /// A pointcut pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// No collision-free alias could be produced
    #[error("Could not mangle alias '{alias}' into a unique name after {attempts} attempts")]
    MangleExhausted { alias: String, attempts: usize },

    /// A declaration handle is malformed
    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    /// The tree failed structural validation
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// A module was woven before its tree was loaded
    #[error("Module {} has no parsed tree", .0.display())]
    MissingTree(std::path::PathBuf),

    /// Malformed spec, config or tree file
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for weaving operations
pub type Result<T> = std::result::Result<T, WeaveError>;
