//! Recursive descent parser for generated function bodies
//!
//! Grammar:
//! ```text
//! function    ::= IDENT IDENT '(' ')' compound
//! compound    ::= '{' statement* '}'
//! statement   ::= compound | 'if' '(' expression ')' statement ('else' statement)?
//!               | 'switch' '(' expression ')' statement
//!               | 'case' conditional ':' | 'default' ':'
//!               | 'while' '(' expression ')' statement
//!               | 'do' statement 'while' '(' expression ')' ';'
//!               | 'for' '(' expression? ';' expression? ';' expression? ')' statement
//!               | 'break' ';' | 'continue' ';' | 'return' expression? ';'
//!               | expression? ';'
//! expression  ::= assignment (',' assignment)*
//! assignment  ::= conditional (ASSIGN_OP assignment)?      // right associative
//! conditional ::= binary ('?' expression ':' conditional)?
//! binary      ::= unary (BINARY_OP unary)*                  // precedence climbing
//! unary       ::= ('!' | '~' | '-' | '+' | '*' | '&' | '++' | '--') unary | postfix
//! postfix     ::= primary ('(' args ')' | '[' expression ']' | '.' IDENT
//!                          | '->' IDENT | '++' | '--')*
//! primary     ::= IDENT | NUMBER | CHAR | STRING+ | '(' expression ')'
//! ```

use super::ast::{AssignOp, BinaryOp, Expr, FieldOp, FunctionDef, Stmt, UnaryOp};
use super::lexer::{Token, TokenKind, Tokenizer};
use crate::result::{VriError, VriResult};

const KEYWORDS: &[&str] = &[
    "if", "else", "switch", "case", "default", "while", "do", "for", "break", "continue", "return",
];

/// Recursive descent parser over a token stream
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    /// Creates a new parser from tokens; `end` is the input length for diagnostics
    #[must_use]
    pub fn new(tokens: Vec<Token>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    /// Parses a complete function definition
    pub fn parse_function_str(input: &str) -> VriResult<FunctionDef> {
        let tokens = Tokenizer::new(input).tokenize()?;
        let mut parser = Self::new(tokens, input.len());
        let function = parser.parse_function()?;
        parser.expect_end()?;
        Ok(function)
    }

    /// Parses a single expression
    pub fn parse_expression_str(input: &str) -> VriResult<Expr> {
        let tokens = Tokenizer::new(input).tokenize()?;
        let mut parser = Self::new(tokens, input.len());
        let expr = parser.parse_expression()?;
        parser.expect_end()?;
        Ok(expr)
    }

    /// Parses `<return_type> <name>() { ... }`
    pub fn parse_function(&mut self) -> VriResult<FunctionDef> {
        let return_type = self.expect_ident()?;
        let name = self.expect_ident()?;
        self.expect_punct("(")?;
        self.expect_punct(")")?;
        let body = self.parse_compound()?;
        Ok(FunctionDef {
            return_type,
            name,
            body,
        })
    }

    fn expect_end(&self) -> VriResult<()> {
        match self.current() {
            None => Ok(()),
            Some(token) => Err(VriError::syntax(
                token.offset,
                format!("Unexpected trailing token {:?}", token.kind),
            )),
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn lookahead(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    /// Type name of a C-style cast `(T)(...)` starting at the current token
    fn cast_type(&self) -> Option<String> {
        match (
            self.lookahead(0),
            self.lookahead(1),
            self.lookahead(2),
            self.lookahead(3),
        ) {
            (
                Some(TokenKind::Punct("(")),
                Some(TokenKind::Ident(name)),
                Some(TokenKind::Punct(")")),
                Some(TokenKind::Punct("(")),
            ) if !KEYWORDS.contains(&name.as_str()) => Some(name.clone()),
            _ => None,
        }
    }

    fn offset(&self) -> usize {
        self.current().map_or(self.end, |t| t.offset)
    }

    fn error(&self, message: impl Into<String>) -> VriError {
        let found = self
            .current()
            .map_or_else(|| "end of input".to_string(), |t| format!("{:?}", t.kind));
        VriError::syntax(self.offset(), format!("{}, found {found}", message.into()))
    }

    fn at_punct(&self, p: &str) -> bool {
        self.current().is_some_and(|t| t.is_punct(p))
    }

    fn at_keyword(&self, word: &str) -> bool {
        self.current().is_some_and(|t| t.is_ident(word))
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> VriResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.error(format!("Expected '{p}'")))
        }
    }

    fn expect_keyword(&mut self, word: &str) -> VriResult<()> {
        if self.at_keyword(word) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("Expected '{word}'")))
        }
    }

    fn expect_ident(&mut self) -> VriResult<String> {
        match self.current().map(|t| &t.kind) {
            Some(TokenKind::Ident(name)) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    fn parse_compound(&mut self) -> VriResult<Vec<Stmt>> {
        self.expect_punct("{")?;
        let mut stmts = Vec::new();
        while !self.at_punct("}") {
            if self.current().is_none() {
                return Err(self.error("Unclosed block"));
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect_punct("}")?;
        Ok(stmts)
    }

    fn parse_condition(&mut self) -> VriResult<Expr> {
        self.expect_punct("(")?;
        let cond = self.parse_expression()?;
        self.expect_punct(")")?;
        Ok(cond)
    }

    fn parse_statement(&mut self) -> VriResult<Stmt> {
        if self.at_punct("{") {
            return Ok(Stmt::Compound(self.parse_compound()?));
        }
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }

        let keyword = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Ident(word)) if KEYWORDS.contains(&word.as_str()) => word.clone(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect_punct(";")?;
                return Ok(Stmt::Expr(expr));
            }
        };
        self.pos += 1;

        match keyword.as_str() {
            "if" => {
                let cond = self.parse_condition()?;
                let then_branch = Box::new(self.parse_statement()?);
                let else_branch = if self.at_keyword("else") {
                    self.pos += 1;
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            "switch" => {
                let cond = self.parse_condition()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::Switch { cond, body })
            }
            "case" => {
                let value = self.parse_conditional()?;
                self.expect_punct(":")?;
                Ok(Stmt::Case(value))
            }
            "default" => {
                self.expect_punct(":")?;
                Ok(Stmt::Default)
            }
            "while" => {
                let cond = self.parse_condition()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { cond, body })
            }
            "do" => {
                let body = Box::new(self.parse_statement()?);
                self.expect_keyword("while")?;
                let cond = self.parse_condition()?;
                self.expect_punct(";")?;
                Ok(Stmt::DoWhile { body, cond })
            }
            "for" => {
                self.expect_punct("(")?;
                let init = self.parse_optional_expression(";")?;
                self.expect_punct(";")?;
                let cond = self.parse_optional_expression(";")?;
                self.expect_punct(";")?;
                let step = self.parse_optional_expression(")")?;
                self.expect_punct(")")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                })
            }
            "break" => {
                self.expect_punct(";")?;
                Ok(Stmt::Break)
            }
            "continue" => {
                self.expect_punct(";")?;
                Ok(Stmt::Continue)
            }
            "return" => {
                let value = self.parse_optional_expression(";")?;
                self.expect_punct(";")?;
                Ok(Stmt::Return(value))
            }
            _ => {
                self.pos -= 1;
                Err(self.error("Unexpected keyword"))
            }
        }
    }

    fn parse_optional_expression(&mut self, terminator: &str) -> VriResult<Option<Expr>> {
        if self.at_punct(terminator) {
            Ok(None)
        } else {
            self.parse_expression().map(Some)
        }
    }

    /// Parses a comma expression
    pub fn parse_expression(&mut self) -> VriResult<Expr> {
        let first = self.parse_assignment()?;
        if !self.at_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(",") {
            items.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence(items))
    }

    fn parse_assignment(&mut self) -> VriResult<Expr> {
        let target = self.parse_conditional()?;
        let op = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Punct(p)) => AssignOp::from_token(p),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(target);
        };
        self.pos += 1;
        let value = self.parse_assignment()?;
        Ok(Expr::assign(op, target, value))
    }

    fn parse_conditional(&mut self) -> VriResult<Expr> {
        let cond = self.parse_binary(1)?;
        if !self.eat_punct("?") {
            return Ok(cond);
        }
        let then_expr = self.parse_expression()?;
        self.expect_punct(":")?;
        let else_expr = self.parse_conditional()?;
        Ok(Expr::ternary(cond, then_expr, else_expr))
    }

    fn current_binary_op(&self) -> Option<BinaryOp> {
        match self.current().map(|t| &t.kind) {
            Some(TokenKind::Punct(p)) => BinaryOp::from_token(p),
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_precedence: u8) -> VriResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.current_binary_op() {
            if op.precedence() < min_precedence {
                break;
            }
            self.pos += 1;
            // Left associative: the right side only takes tighter operators
            let rhs = self.parse_binary(op.precedence() + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> VriResult<Expr> {
        let op = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Punct("!")) => Some(UnaryOp::Not),
            Some(TokenKind::Punct("~")) => Some(UnaryOp::BitNot),
            Some(TokenKind::Punct("-")) => Some(UnaryOp::Neg),
            Some(TokenKind::Punct("+")) => Some(UnaryOp::Plus),
            Some(TokenKind::Punct("*")) => Some(UnaryOp::Deref),
            Some(TokenKind::Punct("&")) => Some(UnaryOp::AddrOf),
            Some(TokenKind::Punct("++")) => Some(UnaryOp::PreInc),
            Some(TokenKind::Punct("--")) => Some(UnaryOp::PreDec),
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::unary(op, operand))
            }
            None => match self.cast_type() {
                // The cast applies to the whole unary operand, postfix included
                Some(ty) => {
                    self.pos += 3;
                    let operand = self.parse_unary()?;
                    Ok(Expr::ident(ty).call(vec![operand]))
                }
                None => self.parse_postfix(),
            },
        }
    }

    fn parse_postfix(&mut self) -> VriResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_punct("(") {
                let mut args = Vec::new();
                if !self.at_punct(")") {
                    args.push(self.parse_assignment()?);
                    while self.eat_punct(",") {
                        args.push(self.parse_assignment()?);
                    }
                }
                self.expect_punct(")")?;
                expr = expr.call(args);
            } else if self.eat_punct("[") {
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = expr.index(index);
            } else if self.at_punct(".") || self.at_punct("->") {
                let op = if self.eat_punct(".") {
                    FieldOp::Dot
                } else {
                    self.pos += 1;
                    FieldOp::Arrow
                };
                let name = self.expect_ident()?;
                expr = Expr::Field {
                    base: Box::new(expr),
                    op,
                    name,
                };
            } else if self.eat_punct("++") {
                expr = Expr::unary(UnaryOp::PostInc, expr);
            } else if self.eat_punct("--") {
                expr = Expr::unary(UnaryOp::PostDec, expr);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> VriResult<Expr> {
        let Some(token) = self.current().cloned() else {
            return Err(self.error("Unexpected end of expression"));
        };
        match token.kind {
            TokenKind::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                self.pos += 1;
                Ok(Expr::Ident(name))
            }
            TokenKind::Number(text) | TokenKind::Char(text) => {
                self.pos += 1;
                Ok(Expr::Constant(text))
            }
            TokenKind::Str(text) => {
                self.pos += 1;
                let mut joined = text;
                while let Some(TokenKind::Str(next)) = self.current().map(|t| &t.kind) {
                    joined.push(' ');
                    joined.push_str(next);
                    self.pos += 1;
                }
                Ok(Expr::Constant(joined))
            }
            TokenKind::Punct("(") => {
                self.pos += 1;
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            _ => Err(self.error("Expected expression")),
        }
    }
}
