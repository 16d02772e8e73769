/*!
# Aspects - Advice Model

Declarative weaving instructions and their aggregation.

## Overview

- `Reference`: a resolved declaration in an external module (wrapper
  factory, metaclass, accessor function)
- `Advice`: a pointcut pattern plus one or more references
- `Aspect`: a named group of advices, the authoring API
- `Worklist`: the deduplicated, order-preserving join of several aspects;
  also owns alias mangling
- `AspectSpec`: aspects declared in a JSON spec file

## Example Usage

```rust,no_run
use weave_core::aspect::{Aspect, Worklist};
use weave_core::resolver::SearchPathResolver;

let resolver = SearchPathResolver::new(vec!["aspects".into()]);
let mut aspect = Aspect::new("logging", &resolver);
aspect.add_function_wrapper("main:compute", "myaspects.decorator")?;

let worklist = Worklist::from_groups([&aspect]);
# Ok::<(), weave_core::WeaveError>(())
```
*/

pub mod advice;
pub mod group;
pub mod reference;
pub mod spec_file;
pub mod worklist;

// Re-export main types
pub use advice::{Advice, AdviceKey, AdviceKind, Pointcut};
pub use group::Aspect;
pub use reference::{Declaration, Reference, ReferenceKey};
pub use spec_file::{AdviceSpec, AspectSpec};
pub use worklist::Worklist;
