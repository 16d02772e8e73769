//! Tree mutations performed by the weaver, and the method classification
//! they depend on.

use std::path::PathBuf;

use indexmap::IndexSet;

use crate::aspect::Reference;
use crate::ast::{Alias, ClassDef, CmpOp, Expr, FunctionDef, Keyword, Module, Stmt, WovenRef};

/// Binding kind of a method, from its markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Class,
    Static,
}

impl MethodKind {
    fn from_marker(name: &str) -> Option<Self> {
        match name {
            "classmethod" => Some(MethodKind::Class),
            "staticmethod" => Some(MethodKind::Static),
            _ => None,
        }
    }
}

/// Classify a method of `class`.
///
/// A method is a class or static method if it carries a `classmethod` /
/// `staticmethod` decorator, or if the class body rebinds its name through
/// one (`name = staticmethod(name)`). Later rebindings win.
pub fn method_kind(class: &ClassDef, method: &FunctionDef) -> MethodKind {
    let mut kind = method
        .decorators
        .iter()
        .filter_map(|decorator| decorator.as_name().and_then(MethodKind::from_marker))
        .next()
        .unwrap_or(MethodKind::Instance);

    for stmt in &class.body {
        let Stmt::Assign { targets, value } = stmt else {
            continue;
        };
        let Expr::Call { func, .. } = value else {
            continue;
        };
        let Some(marker) = func.as_name().and_then(MethodKind::from_marker) else {
            continue;
        };
        if targets.iter().any(|t| t.as_name() == Some(method.name.as_str())) {
            kind = marker;
        }
    }
    kind
}

/// Names assigned through the receiver (`self.X = ...`) in the instance
/// methods of `class`, first occurrence order.
///
/// Nested functions and classes are not scanned: their `self` is not the
/// instance.
pub fn instance_attributes(class: &ClassDef) -> Vec<String> {
    let mut names = IndexSet::new();
    for method in class.methods() {
        if method_kind(class, method) != MethodKind::Instance {
            continue;
        }
        let Some(receiver) = method.params.first() else {
            continue;
        };
        collect_receiver_assignments(&method.body, &receiver.name, &mut names);
    }
    names.into_iter().collect()
}

fn collect_receiver_assignments(body: &[Stmt], receiver: &str, names: &mut IndexSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Assign { targets, .. } => {
                for target in targets {
                    collect_target(target, receiver, names);
                }
            }
            Stmt::If { body, orelse, .. } => {
                collect_receiver_assignments(body, receiver, names);
                collect_receiver_assignments(orelse, receiver, names);
            }
            Stmt::For { target, body, .. } => {
                collect_target(target, receiver, names);
                collect_receiver_assignments(body, receiver, names);
            }
            Stmt::While { body, .. } => collect_receiver_assignments(body, receiver, names),
            _ => {}
        }
    }
}

fn collect_target(target: &Expr, receiver: &str, names: &mut IndexSet<String>) {
    match target {
        Expr::Attribute { value, attr } if value.as_name() == Some(receiver) => {
            names.insert(attr.clone());
        }
        Expr::Tuple(items) | Expr::List(items) => {
            for item in items {
                collect_target(item, receiver, names);
            }
        }
        _ => {}
    }
}

/// Qualified reference to `reference`, under its current alias
pub fn woven(reference: &Reference) -> Expr {
    Expr::Woven(WovenRef {
        origin_module: reference.origin_module().to_string(),
        decl_name: reference.decl_name().to_string(),
        source_file: reference.source_file().to_path_buf(),
        alias: reference.short_module().to_string(),
    })
}

/// Make `wrapper` the outermost decorator of `func`
pub fn add_wrapper(func: &mut FunctionDef, wrapper: &Reference) {
    func.decorators.insert(0, woven(wrapper));
}

/// Install `hook` as the metaclass of `class`, replacing any previous one
pub fn set_class_hook(class: &mut ClassDef, hook: &Reference) {
    let value = woven(hook);
    match class.keywords.iter_mut().find(|k| k.arg == "metaclass") {
        Some(keyword) => keyword.value = value,
        None => class.keywords.push(Keyword {
            arg: "metaclass".to_string(),
            value,
        }),
    }
    remove_class_binding(class, "__metaclass__");
    if class.body.is_empty() {
        class.body.push(Stmt::Pass);
    }
}

/// Replace the class-scope binding of `attr` with a property built from the
/// present hooks
pub fn set_accessor(
    class: &mut ClassDef,
    attr: &str,
    getter: Option<&Reference>,
    setter: Option<&Reference>,
    deleter: Option<&Reference>,
) {
    remove_class_binding(class, attr);

    let keywords = [("fget", getter), ("fset", setter), ("fdel", deleter)]
        .into_iter()
        .filter_map(|(arg, hook)| {
            hook.map(|hook| Keyword {
                arg: arg.to_string(),
                value: woven(hook),
            })
        })
        .collect();
    class.body.push(Stmt::assign_name(
        attr,
        Expr::call(Expr::name("property"), Vec::new(), keywords),
    ));
}

/// Drop `name` from the targets of class-scope assignments; an assignment
/// left without targets is removed
fn remove_class_binding(class: &mut ClassDef, name: &str) {
    class.body.retain_mut(|stmt| match stmt {
        Stmt::Assign { targets, .. } => {
            targets.retain(|target| target.as_name() != Some(name));
            !targets.is_empty()
        }
        _ => true,
    });
}

/// Insert search-path registration and module imports at the top of
/// `module`, after its docstring and `__future__` imports.
///
/// `modules` holds `(origin_module, alias)` pairs.
pub fn add_imports(module: &mut Module, search_paths: &[PathBuf], modules: &[(String, String)]) {
    let mut header = Vec::new();
    if !search_paths.is_empty() {
        header.push(Stmt::Import(vec![Alias {
            name: "sys".to_string(),
            asname: None,
        }]));
        header.push(search_path_loop(search_paths));
    }
    for (origin, alias) in modules {
        header.push(Stmt::Import(vec![Alias {
            name: origin.clone(),
            asname: (origin != alias).then(|| alias.clone()),
        }]));
    }

    let position = header_position(&module.body);
    module.body.splice(position..position, header);
}

fn sys_path() -> Expr {
    Expr::attribute(Expr::name("sys"), "path")
}

// for path in (...):
//     if path not in sys.path:
//         sys.path.append(path)
fn search_path_loop(search_paths: &[PathBuf]) -> Stmt {
    let entries = search_paths
        .iter()
        .map(|path| Expr::str(path.display().to_string()))
        .collect();
    Stmt::For {
        target: Expr::name("path"),
        iter: Expr::Tuple(entries),
        body: vec![Stmt::If {
            test: Expr::Compare {
                left: Box::new(Expr::name("path")),
                op: CmpOp::NotIn,
                right: Box::new(sys_path()),
            },
            body: vec![Stmt::Expr(Expr::call(
                Expr::attribute(sys_path(), "append"),
                vec![Expr::name("path")],
                Vec::new(),
            ))],
            orelse: Vec::new(),
        }],
    }
}

fn header_position(body: &[Stmt]) -> usize {
    let mut position = 0;
    if body.first().is_some_and(Stmt::is_docstring) {
        position = 1;
    }
    while let Some(Stmt::ImportFrom { module, .. }) = body.get(position) {
        if module != "__future__" {
            break;
        }
        position += 1;
    }
    position
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::ToSource;

    fn reference(module: &str, decl: &str) -> Reference {
        Reference::from_parts(module, decl, format!("/p/{}.py", module.replace('.', "/")))
    }

    fn self_assign(attr: &str) -> Stmt {
        Stmt::Assign {
            targets: vec![Expr::attribute(Expr::name("self"), attr)],
            value: Expr::int(1),
        }
    }

    fn decorated(name: &str, marker: &str) -> FunctionDef {
        let mut func = FunctionDef::new(name, &["cls"], vec![self_assign("hidden")]);
        func.decorators.push(Expr::name(marker));
        func
    }

    #[test]
    fn test_method_kind_from_decorators_and_rebinding() {
        let plain = FunctionDef::new("plain", &["self"], vec![Stmt::Pass]);
        let rebound = FunctionDef::new("rebound", &["x"], vec![Stmt::Pass]);
        let class = ClassDef::new(
            "C",
            vec![
                Stmt::FunctionDef(plain.clone()),
                Stmt::FunctionDef(rebound.clone()),
                Stmt::assign_name(
                    "rebound",
                    Expr::call(Expr::name("staticmethod"), vec![Expr::name("rebound")], vec![]),
                ),
            ],
        );

        assert_eq!(method_kind(&class, &plain), MethodKind::Instance);
        assert_eq!(method_kind(&class, &rebound), MethodKind::Static);
        assert_eq!(method_kind(&class, &decorated("m", "classmethod")), MethodKind::Class);
    }

    #[test]
    fn test_instance_attributes_skip_class_and_static_methods() {
        let init = FunctionDef::new(
            "__init__",
            &["self"],
            vec![
                self_assign("att"),
                Stmt::If {
                    test: Expr::name("flag"),
                    body: vec![Stmt::Assign {
                        targets: vec![Expr::Tuple(vec![
                            Expr::attribute(Expr::name("self"), "a"),
                            Expr::attribute(Expr::name("other"), "b"),
                        ])],
                        value: Expr::name("pair"),
                    }],
                    orelse: vec![],
                },
                self_assign("att"),
            ],
        );
        let class = ClassDef::new(
            "Obj",
            vec![
                Stmt::FunctionDef(init),
                Stmt::FunctionDef(decorated("build", "classmethod")),
                Stmt::FunctionDef(decorated("make", "staticmethod")),
            ],
        );

        assert_eq!(instance_attributes(&class), vec!["att", "a"]);
    }

    #[test]
    fn test_wrappers_stack_outermost_first() {
        let mut func = FunctionDef::new("compute", &["x"], vec![Stmt::Pass]);
        func.decorators.push(Expr::name("existing"));
        add_wrapper(&mut func, &reference("a", "first"));
        add_wrapper(&mut func, &reference("b", "second"));

        let rendered: Vec<_> = func.decorators.iter().map(ToSource::to_source).collect();
        assert_eq!(rendered, vec!["b.second", "a.first", "existing"]);
    }

    #[test]
    fn test_class_hook_replaces_existing_metaclass() {
        let mut class = ClassDef::new(
            "C",
            vec![Stmt::assign_name("__metaclass__", Expr::name("Old"))],
        );
        class.keywords.push(Keyword {
            arg: "metaclass".to_string(),
            value: Expr::name("Older"),
        });

        set_class_hook(&mut class, &reference("myaspects", "Meta"));
        assert_eq!(
            Stmt::ClassDef(class).to_source(),
            "class C(metaclass=myaspects.Meta):\n    pass\n"
        );
    }

    #[test]
    fn test_accessor_replaces_class_binding() {
        let mut class = ClassDef::new(
            "Obj",
            vec![
                Stmt::Assign {
                    targets: vec![Expr::name("att"), Expr::name("other")],
                    value: Expr::int(0),
                },
                Stmt::assign_name("att", Expr::int(1)),
            ],
        );
        let getter = reference("myaspects", "_get");
        let deleter = reference("myaspects", "_del");
        set_accessor(&mut class, "att", Some(&getter), None, Some(&deleter));

        assert_eq!(
            Stmt::ClassDef(class).to_source(),
            "class Obj:\n    other = 0\n    att = property(fget=myaspects._get, fdel=myaspects._del)\n"
        );
    }

    #[test]
    fn test_imports_follow_docstring_and_future_imports() {
        let mut module = Module::new(vec![
            Stmt::Expr(Expr::str("doc")),
            Stmt::ImportFrom {
                module: "__future__".to_string(),
                names: vec![Alias {
                    name: "annotations".to_string(),
                    asname: None,
                }],
            },
            Stmt::Pass,
        ]);
        add_imports(
            &mut module,
            &[PathBuf::from("/p")],
            &[
                ("myaspects".to_string(), "myaspects".to_string()),
                ("aspects.logger.main".to_string(), "main_".to_string()),
            ],
        );

        let expected = "'doc'\n\
                        from __future__ import annotations\n\
                        import sys\n\
                        for path in ('/p',):\n    \
                        if path not in sys.path:\n        \
                        sys.path.append(path)\n\
                        import myaspects\n\
                        import aspects.logger.main as main_\n\
                        pass\n";
        assert_eq!(module.to_source(), expected);
    }

    #[test]
    fn test_imports_without_search_paths() {
        let mut module = Module::new(vec![Stmt::Pass]);
        add_imports(&mut module, &[], &[("m".to_string(), "m".to_string())]);
        assert_eq!(module.to_source(), "import m\npass\n");
    }
}
