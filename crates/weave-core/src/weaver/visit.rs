//! Pre-order tree walk with unconditional resume.
//!
//! The `walk_*` functions call the visitor's handler for a node and then,
//! whatever the handler did, continue into the node's children. Handlers
//! therefore never recurse themselves and cannot cut a subtree off: a match
//! may occur anywhere below a node that matched nothing.
//!
//! A handler may restructure its node (decorators, class body). The walk
//! reads the children only after the handler returns, so the rewritten node
//! is the one that gets traversed.

use crate::ast::{ClassDef, Expr, FunctionDef, Module, Stmt};
use crate::Result;

use super::StructuralPath;

pub trait Visitor {
    /// Called once for the module root
    fn visit_module(&mut self, _module: &mut Module) -> Result<()> {
        Ok(())
    }

    /// Called for every class; `path` already includes the class name
    fn visit_class(&mut self, _class: &mut ClassDef, _path: &StructuralPath) -> Result<()> {
        Ok(())
    }

    /// Called for every function or method; `path` includes its name
    fn visit_function(&mut self, _func: &mut FunctionDef, _path: &StructuralPath) -> Result<()> {
        Ok(())
    }

    /// Called for every expression, outer before inner
    fn visit_expr(&mut self, _expr: &mut Expr) -> Result<()> {
        Ok(())
    }
}

/// Walk a whole module
pub fn walk_module<V: Visitor + ?Sized>(
    visitor: &mut V,
    module: &mut Module,
    root: &StructuralPath,
) -> Result<()> {
    visitor.visit_module(module)?;
    resume_block(visitor, &mut module.body, root)
}

fn resume_block<V: Visitor + ?Sized>(
    visitor: &mut V,
    body: &mut [Stmt],
    path: &StructuralPath,
) -> Result<()> {
    for stmt in body {
        walk_stmt(visitor, stmt, path)?;
    }
    Ok(())
}

pub fn walk_stmt<V: Visitor + ?Sized>(
    visitor: &mut V,
    stmt: &mut Stmt,
    path: &StructuralPath,
) -> Result<()> {
    match stmt {
        Stmt::ClassDef(class) => {
            let path = path.child(&class.name);
            visitor.visit_class(class, &path)?;
            resume_class(visitor, class, &path)
        }
        Stmt::FunctionDef(func) => {
            let path = path.child(&func.name);
            visitor.visit_function(func, &path)?;
            resume_function(visitor, func, &path)
        }
        Stmt::Assign { targets, value } => {
            for target in targets {
                walk_expr(visitor, target)?;
            }
            walk_expr(visitor, value)
        }
        Stmt::Expr(expr) => walk_expr(visitor, expr),
        Stmt::Return(value) => match value {
            Some(value) => walk_expr(visitor, value),
            None => Ok(()),
        },
        Stmt::Delete(targets) => {
            for target in targets {
                walk_expr(visitor, target)?;
            }
            Ok(())
        }
        Stmt::If { test, body, orelse } => {
            walk_expr(visitor, test)?;
            resume_block(visitor, body, path)?;
            resume_block(visitor, orelse, path)
        }
        Stmt::For { target, iter, body } => {
            walk_expr(visitor, target)?;
            walk_expr(visitor, iter)?;
            resume_block(visitor, body, path)
        }
        Stmt::While { test, body } => {
            walk_expr(visitor, test)?;
            resume_block(visitor, body, path)
        }
        Stmt::Pass | Stmt::Import(_) | Stmt::ImportFrom { .. } | Stmt::Global(_) => Ok(()),
    }
}

fn resume_class<V: Visitor + ?Sized>(
    visitor: &mut V,
    class: &mut ClassDef,
    path: &StructuralPath,
) -> Result<()> {
    for expr in class.decorators.iter_mut().chain(class.bases.iter_mut()) {
        walk_expr(visitor, expr)?;
    }
    for keyword in &mut class.keywords {
        walk_expr(visitor, &mut keyword.value)?;
    }
    resume_block(visitor, &mut class.body, path)
}

fn resume_function<V: Visitor + ?Sized>(
    visitor: &mut V,
    func: &mut FunctionDef,
    path: &StructuralPath,
) -> Result<()> {
    for decorator in &mut func.decorators {
        walk_expr(visitor, decorator)?;
    }
    for param in &mut func.params {
        if let Some(default) = &mut param.default {
            walk_expr(visitor, default)?;
        }
    }
    resume_block(visitor, &mut func.body, path)
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &mut Expr) -> Result<()> {
    visitor.visit_expr(expr)?;
    match expr {
        Expr::Attribute { value, .. } => walk_expr(visitor, value),
        Expr::Call {
            func,
            args,
            keywords,
        } => {
            walk_expr(visitor, func)?;
            for arg in args {
                walk_expr(visitor, arg)?;
            }
            for keyword in keywords {
                walk_expr(visitor, &mut keyword.value)?;
            }
            Ok(())
        }
        Expr::Tuple(items) | Expr::List(items) => {
            for item in items {
                walk_expr(visitor, item)?;
            }
            Ok(())
        }
        Expr::Compare { left, right, .. } | Expr::BinOp { left, right, .. } => {
            walk_expr(visitor, left)?;
            walk_expr(visitor, right)
        }
        Expr::Name(_) | Expr::Constant(_) | Expr::Woven(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ClassDef;

    /// Records every visited declaration path
    #[derive(Default)]
    struct PathRecorder {
        paths: Vec<String>,
        exprs: usize,
    }

    impl Visitor for PathRecorder {
        fn visit_class(&mut self, _class: &mut ClassDef, path: &StructuralPath) -> Result<()> {
            self.paths.push(path.to_string());
            Ok(())
        }

        fn visit_function(&mut self, _func: &mut FunctionDef, path: &StructuralPath) -> Result<()> {
            self.paths.push(path.to_string());
            Ok(())
        }

        fn visit_expr(&mut self, _expr: &mut Expr) -> Result<()> {
            self.exprs += 1;
            Ok(())
        }
    }

    #[test]
    fn test_walk_visits_nested_declarations_in_preorder() {
        let inner = FunctionDef::new("inner", &[], vec![Stmt::Pass]);
        let method = FunctionDef::new("method", &["self"], vec![Stmt::FunctionDef(inner)]);
        let class = ClassDef::new("Obj", vec![Stmt::FunctionDef(method)]);
        let guarded = FunctionDef::new("guarded", &[], vec![Stmt::Pass]);
        let mut module = Module::new(vec![
            Stmt::ClassDef(class),
            Stmt::If {
                test: Expr::name("DEBUG"),
                body: vec![Stmt::FunctionDef(guarded)],
                orelse: vec![],
            },
        ]);

        let mut recorder = PathRecorder::default();
        walk_module(&mut recorder, &mut module, &StructuralPath::root("main")).unwrap();
        assert_eq!(
            recorder.paths,
            vec!["main:Obj", "main:Obj/method", "main:Obj/method/inner", "main:guarded"]
        );
        assert_eq!(recorder.exprs, 1);
    }

    /// Handler that rewrites the node it is given
    struct Renamer;

    impl Visitor for Renamer {
        fn visit_class(&mut self, class: &mut ClassDef, _path: &StructuralPath) -> Result<()> {
            class
                .body
                .push(Stmt::FunctionDef(FunctionDef::new("added", &[], vec![Stmt::Pass])));
            Ok(())
        }
    }

    #[test]
    fn test_walk_resumes_into_rewritten_children() {
        let mut module = Module::new(vec![Stmt::ClassDef(ClassDef::new("C", vec![Stmt::Pass]))]);
        let mut renamer = Renamer;
        walk_module(&mut renamer, &mut module, &StructuralPath::root("m")).unwrap();

        let mut recorder = PathRecorder::default();
        walk_module(&mut recorder, &mut module, &StructuralPath::root("m")).unwrap();
        assert_eq!(recorder.paths, vec!["m:C", "m:C/added"]);
    }
}
