/*!
# Weaver - Two-Phase Tree Transformation

Applies a worklist of advices to a module tree.

## Overview

Weaving a module runs the `Transformer` twice:

1. **Transform**: walk the tree, build the structural path of every class,
   function and instance attribute, test it against each advice's pointcut
   and rewrite the declaration on a match. Matching advices are collected.
2. **Post**: only if something matched. Inject imports of the advice
   modules and the search-path registration loop at the top of the module,
   and bind every woven reference to its final (mangled) alias.

There is no way to know in advance whether a module matches any advice, so
a module without matches is never touched by the post phase.

## Architecture

- `StructuralPath`: `<local-name>:<name>[/<name>]*` addresses
- `visit`: the walk driver; handlers run, then the walk always resumes into
  the node's children
- `transformer`: the two phases
- `injection`: the tree mutations and method classification
- `finders`: name and import collection
- `module_weaver`: per-module orchestration (parse, weave, mangle, register)

## Example Usage

```rust,no_run
use weave_core::weaver::Transformer;
# fn demo(module: &mut weave_core::ast::Module, worklist: &weave_core::aspect::Worklist)
#     -> weave_core::Result<()> {
let outcome = Transformer::run(module, "main", worklist)?;
if outcome.matched() {
    println!("{} advices applied", outcome.matched_advices.len());
}
# Ok(())
# }
```
*/

pub mod finders;
pub mod injection;
pub mod module_weaver;
pub mod transformer;
pub mod visit;


use std::fmt;

// Re-export main types
pub use finders::{find_imports, find_names};
pub use injection::MethodKind;
pub use module_weaver::{find_modules, ModuleWeaver, WeaveSummary};
pub use transformer::{Transformer, WeaveOutcome};
pub use visit::Visitor;

/// Transformer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Match pointcuts and rewrite declarations
    Transform,
    /// Inject imports and bind aliases for the matched advices
    Post,
}

/// Slash-separated address of a declaration inside its module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructuralPath {
    text: String,
    depth: usize,
}

impl StructuralPath {
    /// Path of the module itself: `<local_name>:`
    pub fn root(local_name: &str) -> Self {
        Self {
            text: format!("{local_name}:"),
            depth: 0,
        }
    }

    /// Path of a nested declaration or attribute
    pub fn child(&self, name: &str) -> Self {
        let text = if self.depth == 0 {
            format!("{}{}", self.text, name)
        } else {
            format!("{}/{}", self.text, name)
        };
        Self {
            text,
            depth: self.depth + 1,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of names below the module
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
