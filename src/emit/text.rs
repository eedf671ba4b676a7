//! Java-like source text from the syntax tree.

use std::fmt::Write;

use crate::emit::ast::{Block, Expression, MethodAst, Statement, SwitchCase};

const INDENT: &str = "    ";

/// Renders an expression.
#[must_use]
pub fn render_expr(expr: &Expression) -> String {
    match expr {
        Expression::Assignment { lhs, rhs, op } => format!(
            "{} {}= {}",
            render_expr(lhs),
            op.as_deref().unwrap_or(""),
            render_expr(rhs)
        ),
        Expression::BinaryInfix { op, lhs, rhs } => {
            format!("{} {op} {}", render_expr(lhs), render_expr(rhs))
        }
        Expression::Unary {
            op,
            operand,
            postfix,
        } => {
            let operand = render_expr(operand);
            if *postfix {
                format!("{operand}{op}")
            } else if operand.starts_with(op.as_str()) {
                // `- -x`, not the decrement `--x`
                format!("{op} {operand}")
            } else {
                format!("{op}{operand}")
            }
        }
        Expression::MethodInvocation {
            name,
            receiver,
            args,
            ..
        } => match receiver {
            Some(receiver) => format!("{}.{name}({})", render_expr(receiver), render_args(args)),
            None => format!("{name}({})", render_args(args)),
        },
        Expression::ClassInstanceCreation { ty, args, .. } => {
            format!("new {}({})", ty.spelling(), render_args(args))
        }
        Expression::FieldAccess { name, object, .. } => {
            format!("{}.{name}", render_expr(object))
        }
        Expression::ArrayAccess { array, index } => {
            format!("{}[{}]", render_expr(array), render_expr(index))
        }
        Expression::Cast { ty, operand } => format!("({}) {}", ty.spelling(), render_expr(operand)),
        Expression::Literal { value, .. } => value.clone(),
        Expression::Local { name } => name.clone(),
        Expression::TypeName(ty) => ty.spelling(),
        Expression::ArrayInitializer { ty, elements } => {
            let elements = format!("{{{}}}", render_args(elements));
            match ty {
                Some(ty) => format!("new {} {elements}", ty.spelling()),
                None => elements,
            }
        }
        Expression::ArrayCreation { ty, dims } => {
            let mut out = format!("new {}", ty.name);
            for dim in dims {
                let _ = write!(out, "[{}]", render_expr(dim));
            }
            for _ in 0..ty.dim {
                out.push_str("[]");
            }
            out
        }
        Expression::Parenthesis { expr } => format!("({})", render_expr(expr)),
        Expression::Dummy { label, args } if args.is_empty() => label.clone(),
        Expression::Dummy { label, args } => format!("{label}({})", render_args(args)),
    }
}

fn render_args(args: &[Expression]) -> String {
    args.iter().map(render_expr).collect::<Vec<_>>().join(", ")
}

/// Conditions are printed inside the statement's own parentheses.
fn render_condition(expr: &Expression) -> String {
    match expr {
        Expression::Parenthesis { expr } => render_expr(expr),
        other => render_expr(other),
    }
}

struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, block: &Block) {
        self.depth += 1;
        for stmt in &block.statements {
            self.statement(stmt);
        }
        self.depth -= 1;
    }

    fn case(&mut self, case: &SwitchCase) {
        for key in &case.keys {
            self.line(&format!("case {key}:"));
        }
        if case.is_default {
            self.line("default:");
        }
        self.block(&case.body);
    }

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::BlockStatement(block) => {
                self.line("{");
                self.block(block);
                self.line("}");
            }
            Statement::IfStatement {
                condition,
                then_block,
                else_block,
            } => {
                self.line(&format!("if ({}) {{", render_condition(condition)));
                self.block(then_block);
                if let Some(else_block) = else_block {
                    self.line("} else {");
                    self.block(else_block);
                }
                self.line("}");
            }
            Statement::WhileStatement { condition, body } => {
                self.line(&format!("while ({}) {{", render_condition(condition)));
                self.block(body);
                self.line("}");
            }
            Statement::DoStatement { condition, body } => {
                self.line("do {");
                self.block(body);
                self.line(&format!("}} while ({});", render_condition(condition)));
            }
            Statement::SwitchStatement { selector, cases } => {
                self.line(&format!("switch ({}) {{", render_condition(selector)));
                self.depth += 1;
                for case in cases {
                    self.case(case);
                }
                self.depth -= 1;
                self.line("}");
            }
            Statement::TryStatement { body, catches } => {
                self.line("try {");
                self.block(body);
                for catch in catches {
                    self.line(&format!(
                        "}} catch ({} {}) {{",
                        catch.decl.ty.spelling(),
                        catch.decl.name
                    ));
                    self.block(&catch.body);
                }
                self.line("}");
            }
            Statement::ReturnStatement { value: Some(value) } => {
                self.line(&format!("return {};", render_expr(value)));
            }
            Statement::ReturnStatement { value: None } => self.line("return;"),
            Statement::ThrowStatement { value } => {
                self.line(&format!("throw {};", render_expr(value)));
            }
            Statement::ExpressionStatement { expression } => {
                self.line(&format!("{};", render_expr(expression)));
            }
            Statement::LocalDeclarationStatement { decl, init } => {
                let head = format!("{} {}", decl.ty.spelling(), decl.name);
                match init {
                    Some(init) => self.line(&format!("{head} = {};", render_expr(init))),
                    None => self.line(&format!("{head};")),
                }
            }
            Statement::JumpStatement {
                keyword,
                label: Some(label),
            } => self.line(&format!("{keyword} {label};")),
            Statement::JumpStatement {
                keyword,
                label: None,
            } => self.line(&format!("{keyword};")),
            Statement::LabelStatement { label } => self.line(&format!("{label}:")),
        }
    }
}

/// Renders a statement list at the given indentation depth.
#[must_use]
pub fn render_block(block: &Block, depth: usize) -> String {
    let mut printer = Printer {
        out: String::new(),
        depth,
    };
    for stmt in &block.statements {
        printer.statement(stmt);
    }
    printer.out
}

/// Renders a method with its signature line.
///
/// Constructors are named after the class, `<clinit>` prints as a static
/// initializer, and methods without a body end with `;`.
#[must_use]
pub fn render_method(ast: &MethodAst, depth: usize) -> String {
    let mut printer = Printer {
        out: String::new(),
        depth,
    };
    let signature = match ast.triple.name.as_str() {
        "<clinit>" => "static".to_string(),
        name => {
            let simple = ast
                .triple
                .class
                .rsplit(['/', '$'])
                .next()
                .unwrap_or(&ast.triple.class);
            let params = ast
                .params
                .iter()
                .map(|p| format!("{} {}", p.ty.spelling(), p.name))
                .collect::<Vec<_>>()
                .join(", ");
            let mut head: Vec<String> = ast.flags.clone();
            if name == "<init>" {
                head.push(format!("{simple}({params})"));
            } else {
                head.push(ast.ret.spelling());
                head.push(format!("{name}({params})"));
            }
            head.join(" ")
        }
    };

    for comment in &ast.comments {
        printer.line(&format!("// {comment}"));
    }
    match &ast.body {
        Some(body) => {
            printer.line(&format!("{signature} {{"));
            printer.block(body);
            printer.line("}");
        }
        None => printer.line(&format!("{signature};")),
    }
    printer.out
}
