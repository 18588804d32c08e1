//! C subset front end: tokenizer, parser, syntax tree and printer.
//!
//! This is the grammar the snippet parser wraps extracted bodies in. It only
//! has to cover what Verilator emits inside evaluation functions.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;

pub use ast::{AssignOp, BinaryOp, Expr, FieldOp, FunctionDef, Stmt, UnaryOp};
pub use lexer::{Token, TokenKind, Tokenizer};
pub use parser::Parser;
pub use printer::{print_statement, print_statements};

use crate::result::VriResult;

/// Name of the function shell snippets are parsed inside
pub const SNIPPET_FUNCTION: &str = "__vri_snippet";

/// Parse a statement list by wrapping it in `void __vri_snippet() { ... }`
pub fn parse_snippet(body: &str) -> VriResult<Vec<Stmt>> {
    let wrapped = format!("void {SNIPPET_FUNCTION}() {{\n{body}\n}}");
    Parser::parse_function_str(&wrapped).map(|function| function.body)
}
