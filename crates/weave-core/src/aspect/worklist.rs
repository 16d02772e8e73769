//! Worklists: deduplicated, order-preserving advice aggregates

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::advice::{Advice, AdviceKey, AdviceKind};
use super::group::Aspect;
use crate::{Result, WeaveError, MAX_MANGLE_ATTEMPTS};

/// Ordered set of advices gathered from one or more aspects.
///
/// An advice whose key (kind, pattern, references) was already seen is
/// dropped; the first occurrence keeps its position.
#[derive(Debug, Clone, Default)]
pub struct Worklist {
    advices: Vec<Advice>,
    seen: HashSet<AdviceKey>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the advices of `aspects`, in aspect order then declaration order
    pub fn from_groups<'a, 'r: 'a, I>(aspects: I) -> Self
    where
        I: IntoIterator<Item = &'a Aspect<'r>>,
    {
        Self::from_advices(
            aspects
                .into_iter()
                .flat_map(|aspect| aspect.advices().iter().cloned()),
        )
    }

    pub fn from_advices(advices: impl IntoIterator<Item = Advice>) -> Self {
        let mut worklist = Self::new();
        for advice in advices {
            worklist.append(advice);
        }
        worklist
    }

    /// Append one advice; returns `false` if an equal advice is already present
    pub fn append(&mut self, advice: Advice) -> bool {
        if !self.seen.insert(advice.key()) {
            return false;
        }
        self.advices.push(advice);
        true
    }

    pub fn contains(&self, advice: &Advice) -> bool {
        self.seen.contains(&advice.key())
    }

    pub fn len(&self) -> usize {
        self.advices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Advice> {
        self.advices.iter()
    }

    /// Advices of one variant, in worklist order
    pub fn by_kind(&self, kind: AdviceKind) -> impl Iterator<Item = &Advice> {
        self.advices.iter().filter(move |advice| advice.kind() == kind)
    }

    pub fn function_wrappers(&self) -> impl Iterator<Item = &Advice> {
        self.by_kind(AdviceKind::FunctionWrapper)
    }

    pub fn class_hooks(&self) -> impl Iterator<Item = &Advice> {
        self.by_kind(AdviceKind::ClassHook)
    }

    pub fn accessor_triples(&self) -> impl Iterator<Item = &Advice> {
        self.by_kind(AdviceKind::AccessorTriple)
    }

    /// Distinct `(origin_module, short_module)` pairs, first-seen order
    pub fn modules(&self) -> Vec<(String, String)> {
        let pairs: IndexSet<(String, String)> = self
            .advices
            .iter()
            .flat_map(Advice::references)
            .map(|r| (r.origin_module().to_string(), r.short_module().to_string()))
            .collect();
        pairs.into_iter().collect()
    }

    /// Distinct source files of the referenced declarations, first-seen order
    pub fn source_files(&self) -> Vec<PathBuf> {
        let files: IndexSet<PathBuf> = self
            .advices
            .iter()
            .flat_map(Advice::references)
            .map(|r| r.source_file().to_path_buf())
            .collect();
        files.into_iter().collect()
    }

    /// Distinct directories that must be importable, first-seen order
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let roots: IndexSet<PathBuf> = self
            .advices
            .iter()
            .flat_map(Advice::references)
            .map(|r| r.search_root())
            .collect();
        roots.into_iter().collect()
    }

    /// Current alias of the module `origin_module` defined in `source_file`
    pub fn alias_for(&self, source_file: &Path, origin_module: &str) -> Option<&str> {
        self.advices
            .iter()
            .flat_map(Advice::references)
            .find(|r| r.source_file() == source_file && r.origin_module() == origin_module)
            .map(|r| r.short_module())
    }

    /// Make every referenced module alias unique against `names`.
    ///
    /// References are grouped by `(source_file, origin_module)`; each group
    /// gets one alias, suffixed with `_` until it is not in `names`, and the
    /// committed alias is pushed onto `names`. Call once per worklist.
    pub fn mangle_aliases(&mut self, names: &mut Vec<String>) -> Result<()> {
        self.mangle_aliases_bounded(names, MAX_MANGLE_ATTEMPTS)
    }

    pub fn mangle_aliases_bounded(
        &mut self,
        names: &mut Vec<String>,
        max_attempts: usize,
    ) -> Result<()> {
        let mut index: IndexMap<(PathBuf, String), String> = IndexMap::new();
        for reference in self.advices.iter().flat_map(Advice::references) {
            index
                .entry(reference.module_key())
                .or_insert_with(|| reference.short_module().to_string());
        }

        for alias in index.values_mut() {
            let original = alias.clone();
            let mut attempts = 0;
            while names.contains(alias) {
                if attempts == max_attempts {
                    return Err(WeaveError::MangleExhausted {
                        alias: original,
                        attempts,
                    });
                }
                alias.push('_');
                attempts += 1;
            }
            if *alias != original {
                debug!(from = %original, to = %alias, "mangled module alias");
            }
            names.push(alias.clone());
        }

        for advice in &mut self.advices {
            for reference in advice.references_mut() {
                if let Some(alias) = index.get(&reference.module_key()) {
                    reference.set_short_module(alias.clone());
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Worklist {
    type Item = &'a Advice;
    type IntoIter = std::slice::Iter<'a, Advice>;

    fn into_iter(self) -> Self::IntoIter {
        self.advices.iter()
    }
}
