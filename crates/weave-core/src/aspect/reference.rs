//! Identity of injected declarations

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::resolver::ModuleResolver;
use crate::{Result, WeaveError};

/// Unresolved handle to a declaration: `pkg.module.name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub module: String,
    pub name: String,
}

impl Declaration {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl FromStr for Declaration {
    type Err = WeaveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.rsplit_once('.') {
            Some((module, name))
                if !name.is_empty() && !module.is_empty() && !module.split('.').any(str::is_empty) =>
            {
                Ok(Declaration::new(module, name))
            }
            _ => Err(WeaveError::InvalidDeclaration(format!(
                "'{s}' is not of the form module.name"
            ))),
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Immutable identity of a reference, used for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceKey {
    pub origin_module: String,
    pub decl_name: String,
    pub source_file: PathBuf,
}

/// A resolved declaration living in an external module.
///
/// Equality and hashing only consider `origin_module`, `decl_name` and
/// `source_file`. `short_module` is the alias emitted at injection sites and
/// may be rewritten by alias mangling after deduplication has happened.
#[derive(Debug, Clone)]
pub struct Reference {
    origin_module: String,
    short_module: String,
    decl_name: String,
    source_file: PathBuf,
}

impl Reference {
    /// Resolve a declaration's defining module; fails fast if it cannot be located
    pub fn resolve(decl: &Declaration, resolver: &dyn ModuleResolver) -> Result<Self> {
        let source_file = resolver.resolve(&decl.module)?;
        Ok(Self::from_parts(&decl.module, &decl.name, source_file))
    }

    /// Build a reference whose source file is already known
    pub fn from_parts(
        origin_module: impl Into<String>,
        decl_name: impl Into<String>,
        source_file: impl Into<PathBuf>,
    ) -> Self {
        let origin_module = origin_module.into();
        let short_module = default_alias(&origin_module);
        Self {
            origin_module,
            short_module,
            decl_name: decl_name.into(),
            source_file: source_file.into(),
        }
    }

    pub fn origin_module(&self) -> &str {
        &self.origin_module
    }

    pub fn short_module(&self) -> &str {
        &self.short_module
    }

    pub fn decl_name(&self) -> &str {
        &self.decl_name
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn key(&self) -> ReferenceKey {
        ReferenceKey {
            origin_module: self.origin_module.clone(),
            decl_name: self.decl_name.clone(),
            source_file: self.source_file.clone(),
        }
    }

    /// Grouping key for alias mangling: one alias per defining file and module
    pub(crate) fn module_key(&self) -> (PathBuf, String) {
        (self.source_file.clone(), self.origin_module.clone())
    }

    pub(crate) fn set_short_module(&mut self, alias: String) {
        self.short_module = alias;
    }

    /// Restore the alias to the last dotted segment of the origin module
    pub fn reset_short_module(&mut self) {
        self.short_module = default_alias(&self.origin_module);
    }

    /// Directory that must be importable for `import origin_module` to find
    /// `source_file`: the file's directory with one level stripped per
    /// enclosing package.
    pub fn search_root(&self) -> PathBuf {
        let Some(dir) = self.source_file.parent() else {
            return PathBuf::new();
        };
        let mut depth = self.origin_module.split('.').count() - 1;
        let is_package = self
            .source_file
            .file_stem()
            .is_some_and(|stem| stem == "__init__");
        if is_package {
            depth += 1;
        }
        dir.ancestors()
            .nth(depth)
            .unwrap_or(dir)
            .to_path_buf()
    }
}

fn default_alias(origin_module: &str) -> String {
    origin_module
        .rsplit('.')
        .next()
        .unwrap_or(origin_module)
        .to_string()
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.origin_module == other.origin_module
            && self.decl_name == other.decl_name
            && self.source_file == other.source_file
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin_module.hash(state);
        self.decl_name.hash(state);
        self.source_file.hash(state);
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.origin_module, self.decl_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticResolver;

    #[test]
    fn test_declaration_parsing() {
        let decl: Declaration = "aspects.logger.main.dec".parse().unwrap();
        assert_eq!(decl.module, "aspects.logger.main");
        assert_eq!(decl.name, "dec");
        assert_eq!(decl.to_string(), "aspects.logger.main.dec");

        assert!("decorator".parse::<Declaration>().is_err());
        assert!("mod.".parse::<Declaration>().is_err());
        assert!(".name".parse::<Declaration>().is_err());
        assert!("a..b".parse::<Declaration>().is_err());
    }

    #[test]
    fn test_resolve_sets_default_alias_and_file() {
        let resolver =
            StaticResolver::new().with_module("aspects.cache.main", "/proj/aspects/cache/main.py");
        let reference =
            Reference::resolve(&Declaration::new("aspects.cache.main", "dec"), &resolver).unwrap();

        assert_eq!(reference.origin_module(), "aspects.cache.main");
        assert_eq!(reference.short_module(), "main");
        assert_eq!(reference.decl_name(), "dec");
        assert_eq!(reference.source_file(), Path::new("/proj/aspects/cache/main.py"));
    }

    #[test]
    fn test_resolve_fails_for_unknown_module() {
        let resolver = StaticResolver::new();
        let err = Reference::resolve(&Declaration::new("missing", "dec"), &resolver).unwrap_err();
        assert!(matches!(err, WeaveError::UnresolvableModule { .. }));
    }

    #[test]
    fn test_identity_ignores_alias() {
        let a = Reference::from_parts("aspects.logger.main", "dec", "/p/aspects/logger/main.py");
        let mut b = a.clone();
        b.set_short_module("main_".to_string());
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());

        let c = Reference::from_parts("aspects.cache.main", "dec", "/p/aspects/cache/main.py");
        assert_ne!(a, c);
    }

    #[test]
    fn test_search_root_strips_package_levels() {
        let flat = Reference::from_parts("myaspects", "decorator", "/p/myaspects.py");
        assert_eq!(flat.search_root(), PathBuf::from("/p"));

        let nested = Reference::from_parts("aspects.logger.main", "dec", "/p/aspects/logger/main.py");
        assert_eq!(nested.search_root(), PathBuf::from("/p"));

        let package = Reference::from_parts("aspects.logger", "dec", "/p/aspects/logger/__init__.py");
        assert_eq!(package.search_root(), PathBuf::from("/p"));
    }
}
