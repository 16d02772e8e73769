//! Module resolution and file-system probes
//!
//! Advice references name declarations by dotted module path. Resolution maps
//! such a path to the absolute file defining it, once, when the reference is
//! built.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use crate::registry::SearchPathRegistry;
use crate::{Result, WeaveError};

/// Locates the source file of a dotted module name
pub trait ModuleResolver: Send + Sync {
    /// Absolute path of the file defining `module`
    fn resolve(&self, module: &str) -> Result<PathBuf>;
}

impl<R: ModuleResolver + ?Sized> ModuleResolver for &R {
    fn resolve(&self, module: &str) -> Result<PathBuf> {
        (**self).resolve(module)
    }
}

impl<R: ModuleResolver + ?Sized> ModuleResolver for Arc<R> {
    fn resolve(&self, module: &str) -> Result<PathBuf> {
        (**self).resolve(module)
    }
}

/// Resolves modules against an ordered list of root directories.
///
/// `a.b.c` resolves to `<root>/a/b/c.py` or `<root>/a/b/c/__init__.py`; the
/// first root that has either wins.
#[derive(Debug, Clone)]
pub struct SearchPathResolver {
    roots: Vec<PathBuf>,
    extension: String,
    registry: Option<Arc<SearchPathRegistry>>,
}

impl SearchPathResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            extension: "py".to_string(),
            registry: None,
        }
    }

    /// Append the current working directory as the last root
    pub fn with_current_dir(mut self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            if !self.roots.contains(&cwd) {
                self.roots.push(cwd);
            }
        }
        self
    }

    /// Source file extension (without the dot)
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Also search every root registered in `registry`, after the own roots
    pub fn with_registry(mut self, registry: Arc<SearchPathRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Add a root at the end of the search order
    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        let root = root.into();
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn candidates(&self, root: &Path, module: &str) -> [PathBuf; 2] {
        let mut base = root.to_path_buf();
        for segment in module.split('.') {
            base.push(segment);
        }
        let file = base.with_extension(&self.extension);
        let package = base.join(format!("__init__.{}", self.extension));
        [file, package]
    }

    fn resolve_in(&self, roots: &[PathBuf], module: &str) -> Option<PathBuf> {
        roots.iter().find_map(|root| {
            self.candidates(root, module)
                .into_iter()
                .find(|candidate| candidate.is_file())
        })
    }
}

impl ModuleResolver for SearchPathResolver {
    fn resolve(&self, module: &str) -> Result<PathBuf> {
        if module.is_empty() || module.split('.').any(str::is_empty) {
            return Err(WeaveError::UnresolvableModule {
                module: module.to_string(),
            });
        }

        let found = self.resolve_in(&self.roots, module).or_else(|| {
            self.registry
                .as_ref()
                .and_then(|registry| self.resolve_in(&registry.entries(), module))
        });

        match found {
            Some(path) => {
                let path = std::path::absolute(&path)?;
                trace!(module, path = %path.display(), "resolved module");
                Ok(path)
            }
            None => Err(WeaveError::UnresolvableModule {
                module: module.to_string(),
            }),
        }
    }
}

/// In-memory module table, for embedders that already know their files
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    modules: HashMap<String, PathBuf>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.insert(module, file);
        self
    }

    pub fn insert(&mut self, module: impl Into<String>, file: impl Into<PathBuf>) {
        self.modules.insert(module.into(), file.into());
    }
}

impl ModuleResolver for StaticResolver {
    fn resolve(&self, module: &str) -> Result<PathBuf> {
        match self.modules.get(module) {
            Some(path) => Ok(std::path::absolute(path)?),
            None => Err(WeaveError::UnresolvableModule {
                module: module.to_string(),
            }),
        }
    }
}

/// Check a file (or, if it does not exist yet, its directory) for write access
pub fn is_writable(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    if path.exists() {
        return std::fs::metadata(path)
            .map(|meta| !meta.permissions().readonly())
            .unwrap_or(false);
    }
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return false,
    };
    std::fs::metadata(parent)
        .map(|meta| meta.is_dir() && !meta.permissions().readonly())
        .unwrap_or(false)
}
