//! Aspect spec files
//!
//! A spec file declares named aspects as JSON:
//!
//! ```json
//! {
//!   "search_paths": ["vendor"],
//!   "aspects": {
//!     "logging": [
//!       { "kind": "function_wrapper", "pattern": "main:compute", "wrapper": "myaspects.decorator" },
//!       { "kind": "class_hook", "pattern": "main:Class", "hook": "myaspects.Metaclass" },
//!       { "kind": "accessor_triple", "pattern": "main:Class/att",
//!         "getter": "myaspects._get", "setter": "myaspects._set" }
//!     ]
//!   },
//!   "__all__": ["logging"]
//! }
//! ```
//!
//! `__all__` selects and orders the aspects that are woven; without it every
//! aspect is used in file order. Relative search paths are taken relative to
//! the spec file, whose own directory is always searched first.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use super::group::Aspect;
use super::worklist::Worklist;
use crate::resolver::{ModuleResolver, SearchPathResolver};
use crate::{Result, WeaveError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdviceSpec {
    FunctionWrapper {
        pattern: String,
        wrapper: String,
    },
    ClassHook {
        pattern: String,
        hook: String,
    },
    AccessorTriple {
        pattern: String,
        #[serde(default)]
        getter: Option<String>,
        #[serde(default)]
        setter: Option<String>,
        #[serde(default)]
        deleter: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AspectSpec {
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    pub aspects: IndexMap<String, Vec<AdviceSpec>>,
    #[serde(default, rename = "__all__")]
    pub export: Option<Vec<String>>,
    /// Directory of the file the spec was loaded from
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl AspectSpec {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut spec: AspectSpec = serde_json::from_str(&text)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        spec.base_dir = Some(std::path::absolute(dir)?);
        Ok(spec)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Names of the aspects to weave, in weaving order
    pub fn exported(&self) -> Result<Vec<&str>> {
        match &self.export {
            Some(names) => names
                .iter()
                .map(|name| {
                    if self.aspects.contains_key(name) {
                        Ok(name.as_str())
                    } else {
                        Err(WeaveError::InvalidDeclaration(format!(
                            "__all__ names unknown aspect '{name}'"
                        )))
                    }
                })
                .collect(),
            None => Ok(self.aspects.keys().map(String::as_str).collect()),
        }
    }

    /// Roots to resolve advice modules against: the spec's directory, then
    /// its declared search paths, then `extra`
    pub fn resolver(&self, extra: &[PathBuf]) -> SearchPathResolver {
        let mut roots = Vec::new();
        if let Some(base) = &self.base_dir {
            roots.push(base.clone());
        }
        for path in &self.search_paths {
            match &self.base_dir {
                Some(base) if path.is_relative() => roots.push(base.join(path)),
                _ => roots.push(path.clone()),
            }
        }
        let mut resolver = SearchPathResolver::new(roots);
        for path in extra {
            resolver.add_root(path.clone());
        }
        resolver
    }

    /// Build the exported aspects, resolving every declaration
    pub fn aspects<'r>(&self, resolver: &'r dyn ModuleResolver) -> Result<Vec<Aspect<'r>>> {
        let mut aspects = Vec::new();
        for name in self.exported()? {
            let mut aspect = Aspect::new(name, resolver);
            for entry in &self.aspects[name] {
                match entry {
                    AdviceSpec::FunctionWrapper { pattern, wrapper } => {
                        aspect.add_function_wrapper(pattern, wrapper)?;
                    }
                    AdviceSpec::ClassHook { pattern, hook } => {
                        aspect.add_class_hook(pattern, hook)?;
                    }
                    AdviceSpec::AccessorTriple {
                        pattern,
                        getter,
                        setter,
                        deleter,
                    } => {
                        aspect.add_accessor_triple(
                            pattern,
                            getter.as_deref(),
                            setter.as_deref(),
                            deleter.as_deref(),
                        )?;
                    }
                }
            }
            aspects.push(aspect);
        }
        Ok(aspects)
    }

    /// Build the joined worklist of the exported aspects
    pub fn worklist(&self, resolver: &dyn ModuleResolver) -> Result<Worklist> {
        let aspects = self.aspects(resolver)?;
        Ok(Worklist::from_groups(&aspects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::AdviceKind;
    use crate::resolver::StaticResolver;

    const SPEC: &str = r#"{
        "aspects": {
            "first": [
                { "kind": "function_wrapper", "pattern": "main:compute", "wrapper": "myaspects.decorator" }
            ],
            "second": [
                { "kind": "class_hook", "pattern": "main:Class", "hook": "myaspects.Metaclass" },
                { "kind": "accessor_triple", "pattern": "main:Class/att", "getter": "myaspects._get" },
                { "kind": "function_wrapper", "pattern": "main:compute", "wrapper": "myaspects.decorator" }
            ]
        },
        "__all__": ["second", "first"]
    }"#;

    fn resolver() -> StaticResolver {
        StaticResolver::new().with_module("myaspects", "/p/myaspects.py")
    }

    #[test]
    fn test_export_order_and_dedup() -> anyhow::Result<()> {
        let spec = AspectSpec::from_json(SPEC)?;
        assert_eq!(spec.exported()?, vec!["second", "first"]);

        let worklist = spec.worklist(&resolver())?;
        let kinds: Vec<_> = worklist.iter().map(|a| a.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                AdviceKind::ClassHook,
                AdviceKind::AccessorTriple,
                AdviceKind::FunctionWrapper
            ]
        );
        Ok(())
    }

    #[test]
    fn test_unknown_export_is_rejected() {
        let spec = AspectSpec::from_json(r#"{"aspects": {}, "__all__": ["ghost"]}"#).unwrap();
        assert!(spec.exported().is_err());
    }

    #[test]
    fn test_bad_pattern_fails_the_load() {
        let spec = AspectSpec::from_json(
            r#"{"aspects": {"a": [{"kind": "class_hook", "pattern": "main:(", "hook": "myaspects.M"}]}}"#,
        )
        .unwrap();
        assert!(matches!(
            spec.worklist(&resolver()),
            Err(WeaveError::Pattern { .. })
        ));
    }

    #[test]
    fn test_spec_directory_is_a_search_root() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("myaspects.py"), "")?;
        let spec_path = dir.path().join("spec.json");
        std::fs::write(&spec_path, SPEC)?;

        let spec = AspectSpec::from_file(&spec_path)?;
        let resolver = spec.resolver(&[]);
        let worklist = spec.worklist(&resolver)?;
        assert_eq!(worklist.search_paths(), vec![dir.path().to_path_buf()]);
        Ok(())
    }
}
