// Module syntax tree
// Python-shaped declarations and expressions, produced by an external parser
// and rewritten in place by the weaver.

pub mod source_gen;
pub use source_gen::ToSource;


use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Result, WeaveError};

/// A parsed module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
}

/// Function (or method) definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    /// Decorators, outermost first
    #[serde(default)]
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// Class definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub bases: Vec<Expr>,
    /// Class keywords such as `metaclass=...`
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    #[serde(default)]
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub default: Option<Expr>,
}

/// Keyword argument: `arg=value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub arg: String,
    pub value: Expr,
}

/// Imported name with optional rebinding: `name as asname`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    #[serde(default)]
    pub asname: Option<String>,
}

impl Alias {
    /// Name bound in the importing namespace by `import name [as asname]`
    pub fn bound_name(&self) -> &str {
        match &self.asname {
            Some(asname) => asname,
            None => self.name.split('.').next().unwrap_or(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
    Delete(Vec<Expr>),
    Pass,
    Import(Vec<Alias>),
    ImportFrom {
        module: String,
        names: Vec<Alias>,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    Global(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Pow,
}

/// Qualified reference to an injected declaration, rendered `alias.decl_name`.
///
/// The alias is provisional until the post phase rebinds it from the
/// mangled matched-advice set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WovenRef {
    pub origin_module: String,
    pub decl_name: String,
    pub source_file: PathBuf,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Name(String),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Call {
        func: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        keywords: Vec<Keyword>,
    },
    Constant(Constant),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Woven(WovenRef),
}

// Convenience constructors used by the injection code and tests

impl Expr {
    pub fn name(id: impl Into<String>) -> Self {
        Expr::Name(id.into())
    }

    pub fn attribute(value: Expr, attr: impl Into<String>) -> Self {
        Expr::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>, keywords: Vec<Keyword>) -> Self {
        Expr::Call {
            func: Box::new(func),
            args,
            keywords,
        }
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Constant(Constant::Str(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Expr::Constant(Constant::Int(value))
    }

    /// Name of a bare `Name` expression
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(id) => Some(id),
            _ => None,
        }
    }
}

impl Stmt {
    /// `target = value` with a single name target
    pub fn assign_name(target: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            targets: vec![Expr::Name(target.into())],
            value,
        }
    }

    /// Whether this is a bare string expression (docstring position)
    pub fn is_docstring(&self) -> bool {
        matches!(self, Stmt::Expr(Expr::Constant(Constant::Str(_))))
    }
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, params: &[&str], body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params: params
                .iter()
                .map(|p| Param {
                    name: p.to_string(),
                    default: None,
                })
                .collect(),
            decorators: Vec::new(),
            body,
        }
    }
}

impl ClassDef {
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            keywords: Vec::new(),
            decorators: Vec::new(),
            body,
        }
    }

    /// Methods defined directly in the class body
    pub fn methods(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::FunctionDef(func) => Some(func),
            _ => None,
        })
    }
}

impl Module {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }

    /// Structural validation performed after weaving.
    ///
    /// Checks that every identifier is well formed and that no block was
    /// left empty by a rewrite.
    pub fn check_syntax(&self) -> Result<()> {
        check_block(&self.body, "module", true)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn is_dotted_name(name: &str) -> bool {
    name.split('.').all(is_identifier)
}

fn syntax_error(message: String) -> WeaveError {
    WeaveError::Syntax(message)
}

fn check_identifier(name: &str, what: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(syntax_error(format!("invalid {what} name '{name}'")))
    }
}

fn check_block(body: &[Stmt], owner: &str, may_be_empty: bool) -> Result<()> {
    if body.is_empty() && !may_be_empty {
        return Err(syntax_error(format!("empty block in {owner}")));
    }
    for stmt in body {
        check_stmt(stmt)?;
    }
    Ok(())
}

fn check_stmt(stmt: &Stmt) -> Result<()> {
    match stmt {
        Stmt::FunctionDef(func) => {
            check_identifier(&func.name, "function")?;
            for param in &func.params {
                check_identifier(&param.name, "parameter")?;
                if let Some(default) = &param.default {
                    check_expr(default)?;
                }
            }
            for decorator in &func.decorators {
                check_expr(decorator)?;
            }
            check_block(&func.body, &format!("function '{}'", func.name), false)
        }
        Stmt::ClassDef(class) => {
            check_identifier(&class.name, "class")?;
            for expr in class.bases.iter().chain(&class.decorators) {
                check_expr(expr)?;
            }
            for keyword in &class.keywords {
                check_identifier(&keyword.arg, "keyword")?;
                check_expr(&keyword.value)?;
            }
            check_block(&class.body, &format!("class '{}'", class.name), false)
        }
        Stmt::Assign { targets, value } => {
            if targets.is_empty() {
                return Err(syntax_error("assignment without target".to_string()));
            }
            for target in targets {
                check_target(target)?;
            }
            check_expr(value)
        }
        Stmt::Expr(expr) => check_expr(expr),
        Stmt::Return(value) => value.as_ref().map_or(Ok(()), check_expr),
        Stmt::Delete(targets) => targets.iter().try_for_each(check_target),
        Stmt::Pass => Ok(()),
        Stmt::Import(names) => {
            for alias in names {
                check_alias(alias)?;
            }
            Ok(())
        }
        Stmt::ImportFrom { module, names } => {
            let relative = module.trim_start_matches('.');
            if !relative.is_empty() && !is_dotted_name(relative) {
                return Err(syntax_error(format!("invalid module name '{module}'")));
            }
            if names.is_empty() {
                return Err(syntax_error(format!("empty import from '{module}'")));
            }
            for alias in names {
                if alias.name != "*" {
                    check_identifier(&alias.name, "imported")?;
                }
                if let Some(asname) = &alias.asname {
                    check_identifier(asname, "import alias")?;
                }
            }
            Ok(())
        }
        Stmt::If { test, body, orelse } => {
            check_expr(test)?;
            check_block(body, "if", false)?;
            check_block(orelse, "else", true)
        }
        Stmt::For { target, iter, body } => {
            check_target(target)?;
            check_expr(iter)?;
            check_block(body, "for", false)
        }
        Stmt::While { test, body } => {
            check_expr(test)?;
            check_block(body, "while", false)
        }
        Stmt::Global(names) => names.iter().try_for_each(|n| check_identifier(n, "global")),
    }
}

fn check_alias(alias: &Alias) -> Result<()> {
    if !is_dotted_name(&alias.name) {
        return Err(syntax_error(format!("invalid module name '{}'", alias.name)));
    }
    if let Some(asname) = &alias.asname {
        check_identifier(asname, "import alias")?;
    }
    Ok(())
}

fn check_target(target: &Expr) -> Result<()> {
    match target {
        Expr::Name(id) => check_identifier(id, "target"),
        Expr::Attribute { value, attr } => {
            check_identifier(attr, "attribute")?;
            check_expr(value)
        }
        Expr::Tuple(items) | Expr::List(items) => items.iter().try_for_each(check_target),
        other => Err(syntax_error(format!("cannot assign to {other:?}"))),
    }
}

fn check_expr(expr: &Expr) -> Result<()> {
    match expr {
        Expr::Name(id) => check_identifier(id, "variable"),
        Expr::Attribute { value, attr } => {
            check_identifier(attr, "attribute")?;
            check_expr(value)
        }
        Expr::Call {
            func,
            args,
            keywords,
        } => {
            check_expr(func)?;
            args.iter().try_for_each(check_expr)?;
            for keyword in keywords {
                check_identifier(&keyword.arg, "keyword")?;
                check_expr(&keyword.value)?;
            }
            Ok(())
        }
        Expr::Constant(_) => Ok(()),
        Expr::Tuple(items) | Expr::List(items) => items.iter().try_for_each(check_expr),
        Expr::Compare { left, right, .. } | Expr::BinOp { left, right, .. } => {
            check_expr(left)?;
            check_expr(right)
        }
        Expr::Woven(woven) => {
            check_identifier(&woven.alias, "woven alias")?;
            check_identifier(&woven.decl_name, "woven declaration")
        }
    }
}
