//! The two-phase transformer
//!
//! `Transform` tests every class, function and instance attribute path
//! against the worklist and rewrites matching declarations, collecting the
//! advices that matched. `Post` runs with that matched set only: it injects
//! the imports and search-path registration at the top of the module and
//! binds every woven reference to its module's final alias.

use tracing::{debug, trace};

use super::injection;
use super::visit::{walk_module, Visitor};
use super::{Phase, StructuralPath};
use crate::aspect::{Advice, Worklist};
use crate::ast::{ClassDef, Expr, FunctionDef, Module};
use crate::Result;

/// Result of a complete transformer run
#[derive(Debug, Clone, Default)]
pub struct WeaveOutcome {
    /// Advices that matched at least one path, worklist order
    pub matched_advices: Worklist,
}

impl WeaveOutcome {
    /// Whether anything was woven
    pub fn matched(&self) -> bool {
        !self.matched_advices.is_empty()
    }
}

pub struct Transformer<'w> {
    phase: Phase,
    worklist: &'w Worklist,
    matched: Worklist,
}

impl<'w> Transformer<'w> {
    /// Transformer for one phase. In `Post`, `worklist` is the matched set.
    pub fn new(phase: Phase, worklist: &'w Worklist) -> Self {
        Self {
            phase,
            worklist,
            matched: Worklist::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Walk `module` once in this transformer's phase
    pub fn apply(&mut self, module: &mut Module, local_name: &str) -> Result<()> {
        walk_module(self, module, &StructuralPath::root(local_name))
    }

    /// Advices matched so far, in the order the walk reached them
    pub fn matched(&self) -> &Worklist {
        &self.matched
    }

    pub fn into_matched(self) -> Worklist {
        self.matched
    }

    /// Run the transform phase, returning the matched advices in worklist
    /// order, whatever order the tree reached them in
    pub fn transform(module: &mut Module, local_name: &str, worklist: &Worklist) -> Result<Worklist> {
        let mut transformer = Transformer::new(Phase::Transform, worklist);
        transformer.apply(module, local_name)?;
        let hits = transformer.into_matched();
        let matched = Worklist::from_advices(worklist.iter().filter(|a| hits.contains(a)).cloned());
        debug!(
            module = local_name,
            matched = matched.len(),
            "transform phase complete"
        );
        Ok(matched)
    }

    /// Run the post phase for `matched`; does nothing and returns `false`
    /// when the set is empty
    pub fn post(module: &mut Module, local_name: &str, matched: &Worklist) -> Result<bool> {
        if matched.is_empty() {
            return Ok(false);
        }
        Transformer::new(Phase::Post, matched).apply(module, local_name)?;
        Ok(true)
    }

    /// Both phases, without alias mangling in between. Injected aliases may
    /// shadow names the module already binds; [`ModuleWeaver::weave`]
    /// mangles them first and is the entry point for real modules.
    ///
    /// [`ModuleWeaver::weave`]: super::ModuleWeaver::weave
    pub fn run(module: &mut Module, local_name: &str, worklist: &Worklist) -> Result<WeaveOutcome> {
        let matched_advices = Self::transform(module, local_name, worklist)?;
        Self::post(module, local_name, &matched_advices)?;
        Ok(WeaveOutcome { matched_advices })
    }

    /// Test one pointcut; every test is traced, hit or miss
    fn test(&mut self, advice: &Advice, path: &StructuralPath) -> bool {
        let pattern = advice.pointcut().pattern();
        if advice.pointcut().matches(path.as_str()) {
            debug!(pattern, path = %path, kind = %advice.kind(), "pointcut matched");
            self.matched.append(advice.clone());
            true
        } else {
            trace!(pattern, path = %path, "pointcut did not match");
            false
        }
    }

    fn weave_class(&mut self, class: &mut ClassDef, path: &StructuralPath) {
        let worklist = self.worklist;

        for advice in worklist.class_hooks() {
            if let Advice::ClassHook { hook, .. } = advice {
                if self.test(advice, path) {
                    injection::set_class_hook(class, hook);
                }
            }
        }

        let accessors: Vec<&Advice> = worklist.accessor_triples().collect();
        if accessors.is_empty() {
            return;
        }
        let attributes = injection::instance_attributes(class);
        for advice in accessors {
            let Advice::AccessorTriple {
                getter,
                setter,
                deleter,
                ..
            } = advice
            else {
                continue;
            };
            for attr in &attributes {
                if self.test(advice, &path.child(attr)) {
                    injection::set_accessor(
                        class,
                        attr,
                        getter.as_ref(),
                        setter.as_ref(),
                        deleter.as_ref(),
                    );
                }
            }
        }
    }

    fn weave_function(&mut self, func: &mut FunctionDef, path: &StructuralPath) {
        let worklist = self.worklist;
        for advice in worklist.function_wrappers() {
            if let Advice::FunctionWrapper { wrapper, .. } = advice {
                if self.test(advice, path) {
                    injection::add_wrapper(func, wrapper);
                }
            }
        }
    }
}

impl Visitor for Transformer<'_> {
    fn visit_module(&mut self, module: &mut Module) -> Result<()> {
        if self.phase == Phase::Post {
            let search_paths = self.worklist.search_paths();
            let modules = self.worklist.modules();
            debug!(
                search_paths = search_paths.len(),
                imports = modules.len(),
                "injecting imports"
            );
            injection::add_imports(module, &search_paths, &modules);
        }
        Ok(())
    }

    fn visit_class(&mut self, class: &mut ClassDef, path: &StructuralPath) -> Result<()> {
        if self.phase == Phase::Transform {
            self.weave_class(class, path);
        }
        Ok(())
    }

    fn visit_function(&mut self, func: &mut FunctionDef, path: &StructuralPath) -> Result<()> {
        if self.phase == Phase::Transform {
            self.weave_function(func, path);
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        if self.phase != Phase::Post {
            return Ok(());
        }
        if let Expr::Woven(woven) = expr {
            if let Some(alias) = self.worklist.alias_for(&woven.source_file, &woven.origin_module) {
                if woven.alias != alias {
                    woven.alias = alias.to_string();
                }
            }
        }
        Ok(())
    }
}
