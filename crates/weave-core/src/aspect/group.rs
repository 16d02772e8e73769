//! Aspects: the authoring API for groups of advices

use super::advice::Advice;
use super::reference::{Declaration, Reference};
use crate::resolver::ModuleResolver;
use crate::Result;

/// A named group of advices.
///
/// Declarations are resolved as they are added, so an aspect never holds a
/// reference to a module that cannot be located.
pub struct Aspect<'r> {
    name: String,
    resolver: &'r dyn ModuleResolver,
    advices: Vec<Advice>,
}

impl<'r> Aspect<'r> {
    pub fn new(name: impl Into<String>, resolver: &'r dyn ModuleResolver) -> Self {
        Self {
            name: name.into(),
            resolver,
            advices: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn reference(&self, decl: &str) -> Result<Reference> {
        let decl: Declaration = decl.parse()?;
        Reference::resolve(&decl, self.resolver)
    }

    fn optional_reference(&self, decl: Option<&str>) -> Result<Option<Reference>> {
        decl.map(|d| self.reference(d)).transpose()
    }

    /// Wrap functions matching `pattern` with the decorator `wrapper`
    pub fn add_function_wrapper(&mut self, pattern: &str, wrapper: &str) -> Result<&mut Self> {
        let advice = Advice::function_wrapper(pattern, self.reference(wrapper)?)?;
        self.advices.push(advice);
        Ok(self)
    }

    /// Construct classes matching `pattern` through the metaclass `hook`
    pub fn add_class_hook(&mut self, pattern: &str, hook: &str) -> Result<&mut Self> {
        let advice = Advice::class_hook(pattern, self.reference(hook)?)?;
        self.advices.push(advice);
        Ok(self)
    }

    /// Route instance attributes matching `pattern` through a property
    pub fn add_accessor_triple(
        &mut self,
        pattern: &str,
        getter: Option<&str>,
        setter: Option<&str>,
        deleter: Option<&str>,
    ) -> Result<&mut Self> {
        let advice = Advice::accessor_triple(
            pattern,
            self.optional_reference(getter)?,
            self.optional_reference(setter)?,
            self.optional_reference(deleter)?,
        )?;
        self.advices.push(advice);
        Ok(self)
    }

    /// Add an already-built advice
    pub fn push(&mut self, advice: Advice) {
        self.advices.push(advice);
    }

    pub fn advices(&self) -> &[Advice] {
        &self.advices
    }

    pub fn len(&self) -> usize {
        self.advices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advices.is_empty()
    }
}

impl std::fmt::Debug for Aspect<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aspect")
            .field("name", &self.name)
            .field("advices", &self.advices)
            .finish()
    }
}
