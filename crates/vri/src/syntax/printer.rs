//! Source regeneration for syntax trees
//!
//! Operands are parenthesized unless they are simple (identifiers, literals,
//! member accesses, subscripts, calls), so the output never depends on
//! operator precedence. Comma sequences always print inside parentheses.

use super::ast::{Expr, Stmt};
use std::fmt::{self, Display, Formatter};

const INDENT: &str = "    ";

fn is_simple(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Ident(_)
            | Expr::Constant(_)
            | Expr::Field { .. }
            | Expr::Index { .. }
            | Expr::Call { .. }
            | Expr::Sequence(_)
    )
}

struct Operand<'a>(&'a Expr);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if is_simple(self.0) {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => f.write_str(name),
            Self::Constant(text) => f.write_str(text),
            Self::Field { base, op, name } => {
                write!(f, "{}{}{name}", Operand(base), op.as_str())
            }
            Self::Index { base, index } => write!(f, "{}[{index}]", Operand(base)),
            Self::Call { callee, args } => {
                write!(f, "{}(", Operand(callee))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Unary { op, operand } => {
                if op.is_postfix() {
                    write!(f, "{}{}", Operand(operand), op.as_str())
                } else {
                    write!(f, "{}{}", op.as_str(), Operand(operand))
                }
            }
            Self::Binary { op, lhs, rhs } => {
                write!(f, "{} {} {}", Operand(lhs), op.as_str(), Operand(rhs))
            }
            Self::Ternary {
                cond,
                then_expr,
                else_expr,
            } => write!(
                f,
                "{} ? {} : {}",
                Operand(cond),
                Operand(then_expr),
                Operand(else_expr)
            ),
            Self::Assign { op, target, value } => {
                write!(f, "{} {} {value}", Operand(target), op.as_str())
            }
            Self::Sequence(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Render statements, one level of indentation per `depth`
#[must_use]
pub fn print_statements(stmts: &[Stmt], depth: usize) -> String {
    let mut out = String::new();
    for stmt in stmts {
        write_stmt(&mut out, stmt, depth);
    }
    out
}

/// Render a single statement
#[must_use]
pub fn print_statement(stmt: &Stmt, depth: usize) -> String {
    let mut out = String::new();
    write_stmt(&mut out, stmt, depth);
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Writes `{ ... }` for a branch or loop body; the opening brace continues
/// the current line, the closing brace is left unterminated.
fn write_braced(out: &mut String, stmt: &Stmt, depth: usize) {
    out.push_str("{\n");
    match stmt {
        Stmt::Compound(stmts) => {
            for inner in stmts {
                write_stmt(out, inner, depth + 1);
            }
        }
        other => write_stmt(out, other, depth + 1),
    }
    indent(out, depth);
    out.push('}');
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match stmt {
        Stmt::Compound(stmts) => {
            indent(out, depth);
            out.push_str("{\n");
            for inner in stmts {
                write_stmt(out, inner, depth + 1);
            }
            indent(out, depth);
            out.push_str("}\n");
        }
        Stmt::If { .. } => {
            indent(out, depth);
            write_if(out, stmt, depth);
            out.push('\n');
        }
        Stmt::Expr(expr) => {
            indent(out, depth);
            out.push_str(&format!("{expr};\n"));
        }
        Stmt::Switch { cond, body } => {
            indent(out, depth);
            out.push_str(&format!("switch ({cond}) "));
            write_braced(out, body, depth);
            out.push('\n');
        }
        Stmt::Case(value) => {
            indent(out, depth);
            out.push_str(&format!("case {value}:\n"));
        }
        Stmt::Default => {
            indent(out, depth);
            out.push_str("default:\n");
        }
        Stmt::While { cond, body } => {
            indent(out, depth);
            out.push_str(&format!("while ({cond}) "));
            write_braced(out, body, depth);
            out.push('\n');
        }
        Stmt::DoWhile { body, cond } => {
            indent(out, depth);
            out.push_str("do ");
            write_braced(out, body, depth);
            out.push_str(&format!(" while ({cond});\n"));
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            let part = |e: &Option<Expr>| e.as_ref().map(ToString::to_string).unwrap_or_default();
            indent(out, depth);
            out.push_str(&format!(
                "for ({}; {}; {}) ",
                part(init),
                part(cond),
                part(step)
            ));
            write_braced(out, body, depth);
            out.push('\n');
        }
        Stmt::Break => {
            indent(out, depth);
            out.push_str("break;\n");
        }
        Stmt::Continue => {
            indent(out, depth);
            out.push_str("continue;\n");
        }
        Stmt::Return(value) => {
            indent(out, depth);
            match value {
                Some(value) => out.push_str(&format!("return {value};\n")),
                None => out.push_str("return;\n"),
            }
        }
        Stmt::Empty => {
            indent(out, depth);
            out.push_str(";\n");
        }
    }
}

/// Writes an `if` chain without leading indentation or trailing newline
fn write_if(out: &mut String, stmt: &Stmt, depth: usize) {
    let Stmt::If {
        cond,
        then_branch,
        else_branch,
    } = stmt
    else {
        write_braced(out, stmt, depth);
        return;
    };
    out.push_str(&format!("if ({cond}) "));
    write_braced(out, then_branch, depth);
    match else_branch.as_deref() {
        None => {}
        Some(nested @ Stmt::If { .. }) => {
            out.push_str(" else ");
            write_if(out, nested, depth);
        }
        Some(other) => {
            out.push_str(" else ");
            write_braced(out, other, depth);
        }
    }
}
