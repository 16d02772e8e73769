//! Weaving instructions

use std::fmt;

use regex::Regex;

use super::reference::{Reference, ReferenceKey};
use crate::{Result, WeaveError};

/// Regular expression over structural paths.
///
/// Matching is anchored at the start of the path only: `main:compute`
/// matches `main:compute` and `main:computed`, but not `sub/main:compute`.
/// Write `^main:compute$` (or `main:compute$`) for an exact match.
#[derive(Debug, Clone)]
pub struct Pointcut {
    pattern: String,
    regex: Regex,
}

impl Pointcut {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            WeaveError::Pattern {
                pattern: pattern.clone(),
                source,
            }
        })?;
        Ok(Self { pattern, regex })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl PartialEq for Pointcut {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for Pointcut {}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdviceKind {
    /// Wrap a function in a decorator
    FunctionWrapper,
    /// Override a class's construction hook (metaclass)
    ClassHook,
    /// Install a getter/setter/deleter property for an instance attribute
    AccessorTriple,
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdviceKind::FunctionWrapper => "function wrapper",
            AdviceKind::ClassHook => "class hook",
            AdviceKind::AccessorTriple => "accessor triple",
        };
        f.write_str(name)
    }
}

/// One weaving instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advice {
    FunctionWrapper {
        pointcut: Pointcut,
        wrapper: Reference,
    },
    ClassHook {
        pointcut: Pointcut,
        hook: Reference,
    },
    AccessorTriple {
        pointcut: Pointcut,
        getter: Option<Reference>,
        setter: Option<Reference>,
        deleter: Option<Reference>,
    },
}

/// Duplicate-detection key of an advice
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdviceKey {
    kind: AdviceKind,
    pattern: String,
    references: Vec<Option<ReferenceKey>>,
}

impl Advice {
    pub fn function_wrapper(pattern: impl Into<String>, wrapper: Reference) -> Result<Self> {
        Ok(Advice::FunctionWrapper {
            pointcut: Pointcut::new(pattern)?,
            wrapper,
        })
    }

    pub fn class_hook(pattern: impl Into<String>, hook: Reference) -> Result<Self> {
        Ok(Advice::ClassHook {
            pointcut: Pointcut::new(pattern)?,
            hook,
        })
    }

    pub fn accessor_triple(
        pattern: impl Into<String>,
        getter: Option<Reference>,
        setter: Option<Reference>,
        deleter: Option<Reference>,
    ) -> Result<Self> {
        Ok(Advice::AccessorTriple {
            pointcut: Pointcut::new(pattern)?,
            getter,
            setter,
            deleter,
        })
    }

    pub fn kind(&self) -> AdviceKind {
        match self {
            Advice::FunctionWrapper { .. } => AdviceKind::FunctionWrapper,
            Advice::ClassHook { .. } => AdviceKind::ClassHook,
            Advice::AccessorTriple { .. } => AdviceKind::AccessorTriple,
        }
    }

    pub fn pointcut(&self) -> &Pointcut {
        match self {
            Advice::FunctionWrapper { pointcut, .. }
            | Advice::ClassHook { pointcut, .. }
            | Advice::AccessorTriple { pointcut, .. } => pointcut,
        }
    }

    /// Constituent references in declaration order; absent hooks are `None`
    pub fn slots(&self) -> Vec<Option<&Reference>> {
        match self {
            Advice::FunctionWrapper { wrapper, .. } => vec![Some(wrapper)],
            Advice::ClassHook { hook, .. } => vec![Some(hook)],
            Advice::AccessorTriple {
                getter,
                setter,
                deleter,
                ..
            } => vec![getter.as_ref(), setter.as_ref(), deleter.as_ref()],
        }
    }

    /// Present references only
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.slots().into_iter().flatten()
    }

    pub(crate) fn references_mut(&mut self) -> Vec<&mut Reference> {
        match self {
            Advice::FunctionWrapper { wrapper, .. } => vec![wrapper],
            Advice::ClassHook { hook, .. } => vec![hook],
            Advice::AccessorTriple {
                getter,
                setter,
                deleter,
                ..
            } => [getter, setter, deleter]
                .into_iter()
                .filter_map(Option::as_mut)
                .collect(),
        }
    }

    pub fn key(&self) -> AdviceKey {
        AdviceKey {
            kind: self.kind(),
            pattern: self.pointcut().pattern().to_string(),
            references: self
                .slots()
                .into_iter()
                .map(|slot| slot.map(Reference::key))
                .collect(),
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let refs = self
            .slots()
            .into_iter()
            .map(|slot| slot.map_or_else(|| "-".to_string(), |r| r.to_string()))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} '{}' -> ({})", self.kind(), self.pointcut(), refs)
    }
}
