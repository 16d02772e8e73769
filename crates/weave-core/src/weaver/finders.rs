// Read-only tree queries used around weaving
// Names feed alias mangling; imports feed import chasing.

use indexmap::IndexSet;

use crate::ast::{Expr, Module, Stmt};

/// Every name bound or referenced in `module`, first occurrence order.
///
/// Covers declarations, parameters, plain names, attribute names, import
/// bindings and globals. Woven references are skipped: their aliases are
/// the ones being mangled.
pub fn find_names(module: &Module) -> Vec<String> {
    let mut names = IndexSet::new();
    names_in_block(&module.body, &mut names);
    names.into_iter().collect()
}

fn names_in_block(body: &[Stmt], names: &mut IndexSet<String>) {
    for stmt in body {
        names_in_stmt(stmt, names);
    }
}

fn names_in_stmt(stmt: &Stmt, names: &mut IndexSet<String>) {
    match stmt {
        Stmt::FunctionDef(func) => {
            names.insert(func.name.clone());
            for decorator in &func.decorators {
                names_in_expr(decorator, names);
            }
            for param in &func.params {
                names.insert(param.name.clone());
                if let Some(default) = &param.default {
                    names_in_expr(default, names);
                }
            }
            names_in_block(&func.body, names);
        }
        Stmt::ClassDef(class) => {
            names.insert(class.name.clone());
            for expr in class.decorators.iter().chain(&class.bases) {
                names_in_expr(expr, names);
            }
            for keyword in &class.keywords {
                names_in_expr(&keyword.value, names);
            }
            names_in_block(&class.body, names);
        }
        Stmt::Assign { targets, value } => {
            for target in targets {
                names_in_expr(target, names);
            }
            names_in_expr(value, names);
        }
        Stmt::Expr(expr) | Stmt::Return(Some(expr)) => names_in_expr(expr, names),
        Stmt::Delete(targets) => {
            for target in targets {
                names_in_expr(target, names);
            }
        }
        Stmt::Import(aliases) => {
            for alias in aliases {
                names.insert(alias.bound_name().to_string());
            }
        }
        Stmt::ImportFrom { names: aliases, .. } => {
            for alias in aliases {
                names.insert(alias.asname.clone().unwrap_or_else(|| alias.name.clone()));
            }
        }
        Stmt::If { test, body, orelse } => {
            names_in_expr(test, names);
            names_in_block(body, names);
            names_in_block(orelse, names);
        }
        Stmt::For { target, iter, body } => {
            names_in_expr(target, names);
            names_in_expr(iter, names);
            names_in_block(body, names);
        }
        Stmt::While { test, body } => {
            names_in_expr(test, names);
            names_in_block(body, names);
        }
        Stmt::Global(globals) => names.extend(globals.iter().cloned()),
        Stmt::Return(None) | Stmt::Pass => {}
    }
}

fn names_in_expr(expr: &Expr, names: &mut IndexSet<String>) {
    match expr {
        Expr::Name(id) => {
            names.insert(id.clone());
        }
        Expr::Attribute { value, attr } => {
            names_in_expr(value, names);
            names.insert(attr.clone());
        }
        Expr::Call {
            func,
            args,
            keywords,
        } => {
            names_in_expr(func, names);
            for arg in args {
                names_in_expr(arg, names);
            }
            for keyword in keywords {
                names.insert(keyword.arg.clone());
                names_in_expr(&keyword.value, names);
            }
        }
        Expr::Tuple(items) | Expr::List(items) => {
            for item in items {
                names_in_expr(item, names);
            }
        }
        Expr::Compare { left, right, .. } | Expr::BinOp { left, right, .. } => {
            names_in_expr(left, names);
            names_in_expr(right, names);
        }
        Expr::Constant(_) | Expr::Woven(_) => {}
    }
}

/// Absolute module names imported anywhere in `module`, first occurrence
/// order. Relative imports are skipped.
pub fn find_imports(module: &Module) -> Vec<String> {
    let mut imports = IndexSet::new();
    imports_in_block(&module.body, &mut imports);
    imports.into_iter().collect()
}

fn imports_in_block(body: &[Stmt], imports: &mut IndexSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Import(aliases) => {
                imports.extend(aliases.iter().map(|alias| alias.name.clone()));
            }
            Stmt::ImportFrom { module, .. } if !module.starts_with('.') => {
                imports.insert(module.clone());
            }
            Stmt::FunctionDef(func) => imports_in_block(&func.body, imports),
            Stmt::ClassDef(class) => imports_in_block(&class.body, imports),
            Stmt::If { body, orelse, .. } => {
                imports_in_block(body, imports);
                imports_in_block(orelse, imports);
            }
            Stmt::For { body, .. } | Stmt::While { body, .. } => imports_in_block(body, imports),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Alias, ClassDef, FunctionDef};

    fn import(name: &str, asname: Option<&str>) -> Stmt {
        Stmt::Import(vec![Alias {
            name: name.to_string(),
            asname: asname.map(str::to_string),
        }])
    }

    #[test]
    fn test_find_names_collects_bindings_and_uses() {
        let mut func = FunctionDef::new(
            "compute",
            &["x"],
            vec![Stmt::Return(Some(Expr::call(
                Expr::attribute(Expr::name("math"), "sqrt"),
                vec![Expr::name("x")],
                vec![],
            )))],
        );
        func.decorators.push(Expr::name("cached"));
        let module = Module::new(vec![
            import("os.path", None),
            import("numpy", Some("np")),
            Stmt::FunctionDef(func),
            Stmt::ClassDef(ClassDef::new("Obj", vec![Stmt::Pass])),
        ]);

        assert_eq!(
            find_names(&module),
            vec!["os", "np", "compute", "cached", "x", "math", "sqrt", "Obj"]
        );
    }

    #[test]
    fn test_find_imports_reaches_nested_blocks() {
        let func = FunctionDef::new("lazy", &[], vec![import("json", None)]);
        let module = Module::new(vec![
            import("os.path", None),
            Stmt::ImportFrom {
                module: ".sibling".to_string(),
                names: vec![Alias {
                    name: "thing".to_string(),
                    asname: None,
                }],
            },
            Stmt::ImportFrom {
                module: "collections".to_string(),
                names: vec![Alias {
                    name: "OrderedDict".to_string(),
                    asname: None,
                }],
            },
            Stmt::FunctionDef(func),
            import("os.path", None),
        ]);

        assert_eq!(find_imports(&module), vec!["os.path", "collections", "json"]);
    }
}
