/*!
# Weaving Integration Tests

End-to-end runs: spec file on disk, advice modules resolved from search
roots, module trees read through the JSON tree parser and woven by
`ModuleWeaver`.
*/

use std::fs;
use std::path::Path;

use weave_core::ast::{BinOp, ClassDef, Expr, FunctionDef, Module, Stmt};
use weave_core::parser::to_json;
use weave_core::{
    AspectSpec, JsonTreeParser, ModuleWeaver, SearchPathRegistry, SearchPathResolver, SourceParser,
    WeaveError, MAX_MANGLE_ATTEMPTS,
};

const SPEC: &str = r#"{
    "aspects": {
        "logging": [
            { "kind": "function_wrapper", "pattern": "main:compute$", "wrapper": "myaspects.decorator" }
        ],
        "tracing": [
            { "kind": "function_wrapper", "pattern": "main:compute$", "wrapper": "aspects.logger.main.trace" },
            { "kind": "accessor_triple", "pattern": "main:Obj/att$",
              "getter": "myaspects._get", "setter": "myaspects._set", "deleter": "myaspects._del" }
        ]
    }
}"#;

/// Project layout:
///
/// ```text
/// root/spec.json
/// root/myaspects.py
/// root/aspects/logger/main.py
/// root/src/main.json
/// ```
fn project(root: &Path, module: &Module) -> anyhow::Result<()> {
    fs::write(root.join("spec.json"), SPEC)?;
    fs::write(root.join("myaspects.py"), "")?;
    fs::create_dir_all(root.join("aspects").join("logger"))?;
    fs::write(root.join("aspects").join("logger").join("main.py"), "")?;
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("src").join("main.json"), to_json(module)?)?;
    Ok(())
}

fn compute() -> FunctionDef {
    FunctionDef::new(
        "compute",
        &["x"],
        vec![Stmt::Return(Some(Expr::BinOp {
            left: Box::new(Expr::name("x")),
            op: BinOp::Pow,
            right: Box::new(Expr::name("x")),
        }))],
    )
}

fn target_module() -> Module {
    let init = FunctionDef::new(
        "__init__",
        &["self"],
        vec![Stmt::Assign {
            targets: vec![Expr::attribute(Expr::name("self"), "att")],
            value: Expr::int(1),
        }],
    );
    Module::new(vec![
        Stmt::Expr(Expr::str("Target module.")),
        Stmt::FunctionDef(compute()),
        Stmt::ClassDef(ClassDef::new(
            "Obj",
            vec![
                Stmt::assign_name("att", Expr::int(0)),
                Stmt::FunctionDef(init),
            ],
        )),
        // Takes the natural alias of aspects.logger.main
        Stmt::FunctionDef(FunctionDef::new("main", &[], vec![Stmt::Pass])),
    ])
}

#[test]
fn test_weave_module_from_spec_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    project(root, &target_module())?;

    let spec = AspectSpec::from_file(root.join("spec.json"))?;
    let resolver = spec.resolver(&[]);
    let worklist = spec.worklist(&resolver)?;
    assert_eq!(worklist.len(), 3);

    let src = root.join("src");
    let mut weaver = ModuleWeaver::new(src.join("main.json"), Some(&src));
    assert_eq!(weaver.local_name(), "main");
    weaver.parse(&mut JsonTreeParser::new())?;

    let registry = SearchPathRegistry::new();
    assert!(weaver.weave(&worklist, &registry, MAX_MANGLE_ATTEMPTS)?);
    assert_eq!(weaver.matched().len(), 3);
    assert_eq!(registry.entries(), vec![root.to_path_buf()]);

    let expected = format!(
        "'Target module.'\n\
         import sys\n\
         for path in ('{root}',):\n    \
         if path not in sys.path:\n        \
         sys.path.append(path)\n\
         import myaspects\n\
         import aspects.logger.main as main_\n\
         @main_.trace\n\
         @myaspects.decorator\n\
         def compute(x):\n    \
         return x ** x\n\
         class Obj:\n    \
         def __init__(self):\n        \
         self.att = 1\n    \
         att = property(fget=myaspects._get, fset=myaspects._set, fdel=myaspects._del)\n\
         def main():\n    \
         pass\n",
        root = root.display()
    );
    assert_eq!(weaver.render()?, expected);
    Ok(())
}

#[test]
fn test_woven_outputs_round_trip_through_the_parser() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    project(root, &target_module())?;

    let spec = AspectSpec::from_file(root.join("spec.json"))?;
    let resolver = spec.resolver(&[]);
    let worklist = spec.worklist(&resolver)?;

    let src = root.join("src");
    let mut weaver = ModuleWeaver::new(src.join("main.json"), Some(root));
    assert_eq!(weaver.local_name(), "src/main");
    weaver.parse(&mut JsonTreeParser::new())?;

    // Pointcuts are written against local name `main`
    assert!(!weaver.weave(&worklist, &SearchPathRegistry::new(), MAX_MANGLE_ATTEMPTS)?);

    let mut weaver = ModuleWeaver::new(src.join("main.json"), Some(&src));
    weaver.parse(&mut JsonTreeParser::new())?;
    assert!(weaver.weave(&worklist, &SearchPathRegistry::new(), MAX_MANGLE_ATTEMPTS)?);

    let out = root.join("out");
    let (tree_path, source_path) = weaver.write_outputs(&out)?;
    assert_eq!(tree_path, out.join("main.json"));
    assert_eq!(fs::read_to_string(&source_path)?, weaver.render()?);

    let reread = JsonTreeParser::new().parse_file(&tree_path)?;
    assert_eq!(Some(&reread), weaver.tree());
    Ok(())
}

#[test]
fn test_unmatched_module_is_untouched() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let module = Module::new(vec![Stmt::FunctionDef(FunctionDef::new(
        "unrelated",
        &[],
        vec![Stmt::Pass],
    ))]);
    project(root, &module)?;

    let spec = AspectSpec::from_file(root.join("spec.json"))?;
    let resolver = spec.resolver(&[]);
    let worklist = spec.worklist(&resolver)?;

    let src = root.join("src");
    let mut weaver = ModuleWeaver::new(src.join("main.json"), Some(&src));
    weaver.parse(&mut JsonTreeParser::new())?;
    let registry = SearchPathRegistry::new();

    assert!(!weaver.weave(&worklist, &registry, MAX_MANGLE_ATTEMPTS)?);
    assert_eq!(weaver.tree(), Some(&module));
    assert!(weaver.matched().is_empty());
    assert!(registry.is_empty());
    Ok(())
}

#[test]
fn test_unresolvable_advice_module_fails_the_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let spec = AspectSpec::from_json(
        r#"{"aspects": {"a": [{"kind": "class_hook", "pattern": "main:C", "hook": "missing.Meta"}]}}"#,
    )?;
    let resolver = SearchPathResolver::new(vec![dir.path().to_path_buf()]);

    let err = spec.worklist(&resolver).unwrap_err();
    assert!(matches!(err, WeaveError::UnresolvableModule { module } if module == "missing"));
    Ok(())
}

#[test]
fn test_mangle_exhaustion_aborts_the_module() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    project(root, &target_module())?;

    let spec = AspectSpec::from_file(root.join("spec.json"))?;
    let resolver = spec.resolver(&[]);
    let worklist = spec.worklist(&resolver)?;

    let src = root.join("src");
    let mut weaver = ModuleWeaver::new(src.join("main.json"), Some(&src));
    weaver.parse(&mut JsonTreeParser::new())?;
    let registry = SearchPathRegistry::new();
    let before = weaver.tree().cloned();

    let err = weaver.weave(&worklist, &registry, 0).unwrap_err();
    assert!(matches!(err, WeaveError::MangleExhausted { .. }));
    assert!(registry.is_empty());
    assert_eq!(weaver.tree().cloned(), before);
    assert!(weaver.matched().is_empty());
    assert!(!weaver.render()?.contains("@main"));
    Ok(())
}

#[test]
fn test_chase_imports_follows_resolvable_modules() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let src = dir.path();

    let import = |name: &str| {
        Stmt::Import(vec![weave_core::ast::Alias {
            name: name.to_string(),
            asname: None,
        }])
    };
    let main = Module::new(vec![import("os"), import("helper"), Stmt::Pass]);
    let helper = Module::new(vec![import("main"), import("util"), Stmt::Pass]);
    let util = Module::new(vec![import("helper"), Stmt::Pass]);
    fs::write(src.join("main.json"), to_json(&main)?)?;
    fs::write(src.join("helper.json"), to_json(&helper)?)?;
    fs::write(src.join("util.json"), to_json(&util)?)?;

    let mut weaver = ModuleWeaver::new(src.join("main.json"), Some(src));
    let mut parser = JsonTreeParser::new();
    weaver.parse(&mut parser)?;

    let resolver = SearchPathResolver::new(vec![src.to_path_buf()]).extension("json");
    let found = weaver.chase_imports(&mut parser, &resolver)?;
    let names: Vec<_> = found.iter().map(ModuleWeaver::local_name).collect();
    assert_eq!(names, vec!["helper", "util"]);
    Ok(())
}

#[test]
fn test_chase_imports_skips_read_only_modules() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let src = dir.path();

    let import = |name: &str| {
        Stmt::Import(vec![weave_core::ast::Alias {
            name: name.to_string(),
            asname: None,
        }])
    };
    let main = Module::new(vec![import("locked"), import("open"), Stmt::Pass]);
    let locked = Module::new(vec![import("behind"), Stmt::Pass]);
    fs::write(src.join("main.json"), to_json(&main)?)?;
    fs::write(src.join("locked.json"), to_json(&locked)?)?;
    fs::write(src.join("open.json"), to_json(&Module::new(vec![Stmt::Pass]))?)?;
    fs::write(src.join("behind.json"), to_json(&Module::new(vec![Stmt::Pass]))?)?;

    let locked_path = src.join("locked.json");
    let mut perms = fs::metadata(&locked_path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(&locked_path, perms)?;

    let mut weaver = ModuleWeaver::new(src.join("main.json"), Some(src));
    let mut parser = JsonTreeParser::new();
    weaver.parse(&mut parser)?;

    let resolver = SearchPathResolver::new(vec![src.to_path_buf()]).extension("json");
    let found = weaver.chase_imports(&mut parser, &resolver)?;
    let names: Vec<_> = found.iter().map(ModuleWeaver::local_name).collect();
    assert_eq!(names, vec!["open"]);
    Ok(())
}
