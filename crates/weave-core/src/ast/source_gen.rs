// Source code generation from the module tree
// Used for diagnostics (--display) and for writing woven modules back out.

use super::*;

/// Trait for types that can generate their source code representation
pub trait ToSource {
    fn to_source(&self) -> String;
}

const INDENT: &str = "    ";

impl ToSource for Module {
    fn to_source(&self) -> String {
        let mut out = String::new();
        write_block(&self.body, 0, &mut out);
        out
    }
}

impl ToSource for Stmt {
    fn to_source(&self) -> String {
        let mut out = String::new();
        write_stmt(self, 0, &mut out);
        out
    }
}

impl ToSource for Expr {
    fn to_source(&self) -> String {
        match self {
            Expr::Name(id) => id.clone(),
            Expr::Attribute { value, attr } => format!("{}.{}", operand(value), attr),
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                let args_str = args
                    .iter()
                    .map(|arg| arg.to_source())
                    .chain(keywords.iter().map(|kw| kw.to_source()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", operand(func), args_str)
            }
            Expr::Constant(constant) => constant.to_source(),
            Expr::Tuple(items) => match items.as_slice() {
                [single] => format!("({},)", single.to_source()),
                _ => format!("({})", join_exprs(items)),
            },
            Expr::List(items) => format!("[{}]", join_exprs(items)),
            Expr::Compare { left, op, right } => {
                format!("{} {} {}", operand(left), op.symbol(), operand(right))
            }
            Expr::BinOp { left, op, right } => {
                format!("{} {} {}", operand(left), op.symbol(), operand(right))
            }
            Expr::Woven(woven) => format!("{}.{}", woven.alias, woven.decl_name),
        }
    }
}

impl ToSource for Constant {
    fn to_source(&self) -> String {
        match self {
            Constant::None => "None".to_string(),
            Constant::Bool(true) => "True".to_string(),
            Constant::Bool(false) => "False".to_string(),
            Constant::Int(n) => n.to_string(),
            // Debug keeps the fractional part (1.0, not 1)
            Constant::Float(f) => format!("{f:?}"),
            Constant::Str(s) => format!("'{}'", escape_string(s)),
        }
    }
}

impl ToSource for Keyword {
    fn to_source(&self) -> String {
        format!("{}={}", self.arg, self.value.to_source())
    }
}

impl ToSource for Alias {
    fn to_source(&self) -> String {
        match &self.asname {
            Some(asname) if asname != &self.name => format!("{} as {}", self.name, asname),
            _ => self.name.clone(),
        }
    }
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mult => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

/// Render a sub-expression, parenthesizing operators so nesting stays explicit
fn operand(expr: &Expr) -> String {
    match expr {
        Expr::Compare { .. } | Expr::BinOp { .. } => format!("({})", expr.to_source()),
        _ => expr.to_source(),
    }
}

fn join_exprs(items: &[Expr]) -> String {
    items
        .iter()
        .map(|item| item.to_source())
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn write_line(indent: usize, text: &str, out: &mut String) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn write_block(body: &[Stmt], indent: usize, out: &mut String) {
    if body.is_empty() {
        // An empty suite still has to parse
        if indent > 0 {
            write_line(indent, "pass", out);
        }
        return;
    }
    for stmt in body {
        write_stmt(stmt, indent, out);
    }
}

fn write_decorators(decorators: &[Expr], indent: usize, out: &mut String) {
    for decorator in decorators {
        write_line(indent, &format!("@{}", decorator.to_source()), out);
    }
}

fn write_stmt(stmt: &Stmt, indent: usize, out: &mut String) {
    match stmt {
        Stmt::FunctionDef(func) => {
            write_decorators(&func.decorators, indent, out);
            let params = func
                .params
                .iter()
                .map(|p| match &p.default {
                    Some(default) => format!("{}={}", p.name, default.to_source()),
                    None => p.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            write_line(indent, &format!("def {}({}):", func.name, params), out);
            write_block(&func.body, indent + 1, out);
        }
        Stmt::ClassDef(class) => {
            write_decorators(&class.decorators, indent, out);
            let header_args = class
                .bases
                .iter()
                .map(|base| base.to_source())
                .chain(class.keywords.iter().map(|kw| kw.to_source()))
                .collect::<Vec<_>>();
            let header = if header_args.is_empty() {
                format!("class {}:", class.name)
            } else {
                format!("class {}({}):", class.name, header_args.join(", "))
            };
            write_line(indent, &header, out);
            write_block(&class.body, indent + 1, out);
        }
        Stmt::Assign { targets, value } => {
            let mut line = String::new();
            for target in targets {
                line.push_str(&target.to_source());
                line.push_str(" = ");
            }
            line.push_str(&value.to_source());
            write_line(indent, &line, out);
        }
        Stmt::Expr(expr) => write_line(indent, &expr.to_source(), out),
        Stmt::Return(value) => match value {
            Some(value) => write_line(indent, &format!("return {}", value.to_source()), out),
            None => write_line(indent, "return", out),
        },
        Stmt::Delete(targets) => write_line(indent, &format!("del {}", join_exprs(targets)), out),
        Stmt::Pass => write_line(indent, "pass", out),
        Stmt::Import(names) => {
            let names = names
                .iter()
                .map(|alias| alias.to_source())
                .collect::<Vec<_>>()
                .join(", ");
            write_line(indent, &format!("import {names}"), out);
        }
        Stmt::ImportFrom { module, names } => {
            let names = names
                .iter()
                .map(|alias| alias.to_source())
                .collect::<Vec<_>>()
                .join(", ");
            write_line(indent, &format!("from {module} import {names}"), out);
        }
        Stmt::If { test, body, orelse } => {
            write_line(indent, &format!("if {}:", test.to_source()), out);
            write_block(body, indent + 1, out);
            if !orelse.is_empty() {
                write_line(indent, "else:", out);
                write_block(orelse, indent + 1, out);
            }
        }
        Stmt::For { target, iter, body } => {
            write_line(
                indent,
                &format!("for {} in {}:", target.to_source(), iter.to_source()),
                out,
            );
            write_block(body, indent + 1, out);
        }
        Stmt::While { test, body } => {
            write_line(indent, &format!("while {}:", test.to_source()), out);
            write_block(body, indent + 1, out);
        }
        Stmt::Global(names) => write_line(indent, &format!("global {}", names.join(", ")), out),
    }
}
