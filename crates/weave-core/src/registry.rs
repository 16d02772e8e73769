//! Search-path registry
//!
//! Woven modules import their advice modules by name, so the directories
//! those modules live in have to be importable. The registry records them.
//!
//! Semantics:
//! - `register` is idempotent: registering a path twice keeps one entry and
//!   returns `false` the second time.
//! - entries keep first-registration order; lookups (`contains`, `entries`)
//!   never mutate.
//! - `global()` lazily creates one process-wide instance on first use; local
//!   instances are independent of it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexSet;
use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SearchPathRegistry {
    entries: RwLock<IndexSet<PathBuf>>,
}

static GLOBAL: OnceLock<SearchPathRegistry> = OnceLock::new();

impl SearchPathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static SearchPathRegistry {
        GLOBAL.get_or_init(SearchPathRegistry::new)
    }

    /// Register a search path; returns whether it was newly added
    pub fn register(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if self.entries.read().contains(path) {
            return false;
        }
        let added = self.entries.write().insert(path.to_path_buf());
        if added {
            debug!(path = %path.display(), "registered search path");
        }
        added
    }

    /// Register several paths, returning how many were new
    pub fn register_all<I, P>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths.into_iter().filter(|p| self.register(p)).count()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entries.read().contains(path.as_ref())
    }

    /// Snapshot of the registered paths in registration order
    pub fn entries(&self) -> Vec<PathBuf> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let registry = SearchPathRegistry::new();
        assert!(registry.register("/aspects"));
        assert!(!registry.register("/aspects"));
        assert!(registry.register("/other"));

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.entries(),
            vec![PathBuf::from("/aspects"), PathBuf::from("/other")]
        );
    }

    #[test]
    fn test_register_all_counts_new_entries() {
        let registry = SearchPathRegistry::new();
        registry.register("/a");
        assert_eq!(registry.register_all(["/a", "/b", "/c", "/b"]), 2);
        assert!(registry.contains("/c"));
        assert!(!registry.contains("/d"));
    }

    #[test]
    fn test_global_is_shared() {
        let unique = format!("/weave-registry-test-{}", std::process::id());
        SearchPathRegistry::global().register(&unique);
        assert!(SearchPathRegistry::global().contains(&unique));
    }
}
