/*!
# ModuleWeaver - Per-Module Orchestration

Owns one module's tree and runs the full weave over it:

1. `Transform`; stop if nothing matched
2. collect the names used by the module and mangle the matched aliases
   against them
3. `Post`, then structural validation of the result
4. register the advice search roots

Also hosts the module discovery helpers used by the command line front end.
*/

use std::collections::VecDeque;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context};
use indexmap::IndexSet;
use tracing::{debug, info, warn};

use super::finders;
use super::transformer::Transformer;
use crate::aspect::Worklist;
use crate::ast::{Module, ToSource};
use crate::parser::{to_json, SourceParser};
use crate::registry::SearchPathRegistry;
use crate::resolver::{is_writable, ModuleResolver};
use crate::{Result, WeaveError};

/// A module file and its tree
#[derive(Debug, Clone)]
pub struct ModuleWeaver {
    file: PathBuf,
    base_path: Option<PathBuf>,
    local_name: String,
    tree: Option<Module>,
    matched: Worklist,
}

impl ModuleWeaver {
    /// `base_path` anchors the local name; without it the file stem is used
    pub fn new(file: impl Into<PathBuf>, base_path: Option<&Path>) -> Self {
        let file = file.into();
        let local_name = local_name(&file, base_path);
        Self {
            file,
            base_path: base_path.map(Path::to_path_buf),
            local_name,
            tree: None,
            matched: Worklist::new(),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Name of the module in structural paths
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn parse(&mut self, parser: &mut dyn SourceParser) -> Result<&Module> {
        debug!(file = %self.file.display(), parser = parser.name(), "parsing module");
        let tree = parser.parse_file(&self.file)?;
        Ok(&*self.tree.insert(tree))
    }

    pub fn set_tree(&mut self, tree: Module) {
        self.tree = Some(tree);
    }

    pub fn tree(&self) -> Option<&Module> {
        self.tree.as_ref()
    }

    /// Advices applied by the last successful weave
    pub fn matched(&self) -> &Worklist {
        &self.matched
    }

    fn loaded_tree(&self) -> Result<&Module> {
        self.tree
            .as_ref()
            .ok_or_else(|| WeaveError::MissingTree(self.file.clone()))
    }

    /// Weave `worklist` into the tree. Returns whether anything matched; an
    /// unmatched tree is left exactly as it was.
    ///
    /// The weave runs on a copy that replaces the tree only once both
    /// phases and validation succeed. On error the tree and the matched set
    /// are those of the last successful weave.
    pub fn weave(
        &mut self,
        worklist: &Worklist,
        registry: &SearchPathRegistry,
        max_mangle_attempts: usize,
    ) -> Result<bool> {
        let local_name = self.local_name.as_str();
        let mut tree = self.loaded_tree()?.clone();

        let mut matched = Transformer::transform(&mut tree, local_name, worklist)?;
        if matched.is_empty() {
            debug!(module = %local_name, "no advice matched");
            self.matched = matched;
            return Ok(false);
        }

        let mut names = finders::find_names(&tree);
        matched.mangle_aliases_bounded(&mut names, max_mangle_attempts)?;
        Transformer::post(&mut tree, local_name, &matched)?;
        tree.check_syntax()?;

        let added = registry.register_all(matched.search_paths());
        info!(
            module = %local_name,
            advices = matched.len(),
            new_search_paths = added,
            "woven module"
        );
        self.tree = Some(tree);
        self.matched = matched;
        Ok(true)
    }

    /// Rendered source of the current tree
    pub fn render(&self) -> Result<String> {
        Ok(self.loaded_tree()?.to_source())
    }

    pub fn find_names(&self) -> Result<Vec<String>> {
        Ok(finders::find_names(self.loaded_tree()?))
    }

    pub fn find_imports(&self) -> Result<Vec<String>> {
        Ok(finders::find_imports(self.loaded_tree()?))
    }

    /// Modules reachable from this one through static imports, breadth
    /// first, parsed. Imports the resolver cannot locate, and modules that
    /// cannot be written back, are skipped along with their own imports.
    pub fn chase_imports(
        &self,
        parser: &mut dyn SourceParser,
        resolver: &dyn ModuleResolver,
    ) -> Result<Vec<ModuleWeaver>> {
        let mut seen: IndexSet<PathBuf> = IndexSet::new();
        seen.insert(self.file.clone());
        let mut queue: VecDeque<String> = self.find_imports()?.into();
        let mut found = Vec::new();

        while let Some(module) = queue.pop_front() {
            let file = match resolver.resolve(&module) {
                Ok(file) => file,
                Err(e) => {
                    warn!(module = %module, error = %e, "skipping import");
                    continue;
                }
            };
            if !seen.insert(file.clone()) {
                continue;
            }
            if !is_writable(&file) {
                warn!(module = %module, file = %file.display(), "skipping read-only module");
                continue;
            }
            let mut weaver = ModuleWeaver::new(file, self.base_path.as_deref());
            weaver.parse(parser)?;
            queue.extend(weaver.find_imports()?);
            found.push(weaver);
        }
        Ok(found)
    }

    /// Write the tree (`<local>.json`) and rendered source (`<local>.py`)
    /// under `out_dir`
    pub fn write_outputs(&self, out_dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
        let tree = self.loaded_tree()?;
        let stem = out_dir.join(&self.local_name);
        let tree_path = stem.with_extension("json");
        let source_path = stem.with_extension("py");
        if let Some(parent) = tree_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tree_path, to_json(tree)?)
            .with_context(|| format!("writing {}", tree_path.display()))?;
        fs::write(&source_path, tree.to_source())
            .with_context(|| format!("writing {}", source_path.display()))?;
        Ok((tree_path, source_path))
    }
}

/// Path of `file` relative to its common prefix with `base_path`, slash
/// separated, extension stripped
fn local_name(file: &Path, base_path: Option<&Path>) -> String {
    let stem_only = || {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let Some(base) = base_path else {
        return stem_only();
    };
    let (Ok(file_abs), Ok(base_abs)) = (std::path::absolute(file), std::path::absolute(base))
    else {
        return stem_only();
    };

    let common = file_abs
        .components()
        .zip(base_abs.components())
        .take_while(|(a, b)| a == b)
        .count();
    let relative: Vec<String> = file_abs
        .with_extension("")
        .components()
        .skip(common)
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if relative.is_empty() {
        stem_only()
    } else {
        relative.join("/")
    }
}

/// Files under `dir` with extension `ext`, sorted. Files that cannot be
/// written back are skipped with a warning.
pub fn find_modules(dir: &Path, ext: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("Not a directory: {}", dir.display()));
    }
    let mut modules = Vec::new();
    find_modules_recursive(dir, ext, &mut modules)?;
    modules.sort();
    Ok(modules)
}

fn find_modules_recursive(dir: &Path, ext: &str, modules: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            find_modules_recursive(&path, ext, modules)?;
        } else if path.extension().is_some_and(|e| e == ext) {
            if is_writable(&path) {
                modules.push(path);
            } else {
                warn!(file = %path.display(), "skipping read-only module");
            }
        }
    }
    Ok(())
}

/// Totals over a batch of modules
#[derive(Debug, Default)]
pub struct WeaveSummary {
    pub modules_processed: u64,
    pub modules_woven: u64,
    pub advices_applied: u64,
    pub errors: Vec<String>,
}

impl WeaveSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of weaving one module
    pub fn record(&mut self, weaver: &ModuleWeaver, outcome: &Result<bool>) {
        self.modules_processed += 1;
        match outcome {
            Ok(true) => {
                self.modules_woven += 1;
                self.advices_applied += weaver.matched().len() as u64;
            }
            Ok(false) => {}
            Err(e) => self
                .errors
                .push(format!("Error weaving {}: {}", weaver.file().display(), e)),
        }
    }

    pub fn merge(&mut self, other: WeaveSummary) {
        self.modules_processed += other.modules_processed;
        self.modules_woven += other.modules_woven;
        self.advices_applied += other.advices_applied;
        self.errors.extend(other.errors);
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}
