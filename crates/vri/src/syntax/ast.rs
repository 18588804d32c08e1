//! Syntax tree for generated function bodies.
//!
//! The tree models the C subset Verilator emits inside evaluation functions.
//! It is deliberately wider than what the instrumentation engine accepts so
//! that loops, `switch` and friends parse cleanly and are then rejected by
//! the engine with a precise diagnostic.

/// A parsed function definition: `<return_type> <name>() { body }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Return type identifier
    pub return_type: String,
    /// Function name
    pub name: String,
    /// Statements of the body
    pub body: Vec<Stmt>,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `{ stmts }`
    Compound(Vec<Stmt>),
    /// `if (cond) then_branch else else_branch`
    If {
        /// Condition
        cond: Expr,
        /// Taken branch
        then_branch: Box<Stmt>,
        /// Not-taken branch
        else_branch: Option<Box<Stmt>>,
    },
    /// Expression statement: `expr;`
    Expr(Expr),
    /// `switch (cond) body`
    Switch {
        /// Scrutinee
        cond: Expr,
        /// Body, usually a compound of case labels and statements
        body: Box<Stmt>,
    },
    /// `case value:`
    Case(Expr),
    /// `default:`
    Default,
    /// `while (cond) body`
    While {
        /// Loop condition
        cond: Expr,
        /// Loop body
        body: Box<Stmt>,
    },
    /// `do body while (cond);`
    DoWhile {
        /// Loop body
        body: Box<Stmt>,
        /// Loop condition
        cond: Expr,
    },
    /// `for (init; cond; step) body`
    For {
        /// Initializer
        init: Option<Expr>,
        /// Condition
        cond: Option<Expr>,
        /// Step
        step: Option<Expr>,
        /// Loop body
        body: Box<Stmt>,
    },
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// `return expr;`
    Return(Option<Expr>),
    /// `;`
    Empty,
}

/// Expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Identifier, possibly `::`-qualified
    Ident(String),
    /// Integer, floating, character or string literal, kept verbatim
    Constant(String),
    /// Struct member access: `base.name` or `base->name`
    Field {
        /// Object expression
        base: Box<Expr>,
        /// `.` or `->`
        op: FieldOp,
        /// Member name
        name: String,
    },
    /// Array subscript: `base[index]`
    Index {
        /// Array expression
        base: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
    /// Function call: `callee(args)`
    Call {
        /// Called expression
        callee: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Prefix or postfix unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// `cond ? then_expr : else_expr`
    Ternary {
        /// Condition
        cond: Box<Expr>,
        /// Value when true
        then_expr: Box<Expr>,
        /// Value when false
        else_expr: Box<Expr>,
    },
    /// Assignment, simple or compound
    Assign {
        /// Operator
        op: AssignOp,
        /// Assigned location
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// Comma sequence `(a, b, c)`; evaluates left to right, yields the last
    Sequence(Vec<Expr>),
}

/// Member access operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// `.`
    Dot,
    /// `->`
    Arrow,
}

impl FieldOp {
    /// Source text of the operator
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Arrow => "->",
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
    /// `*x`
    Deref,
    /// `&x`
    AddrOf,
    /// `++x`
    PreInc,
    /// `--x`
    PreDec,
    /// `x++`
    PostInc,
    /// `x--`
    PostDec,
}

impl UnaryOp {
    /// Source text of the operator
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Deref => "*",
            Self::AddrOf => "&",
            Self::PreInc | Self::PostInc => "++",
            Self::PreDec | Self::PostDec => "--",
        }
    }

    /// Whether the operator is written after its operand
    #[must_use]
    pub const fn is_postfix(self) -> bool {
        matches!(self, Self::PostInc | Self::PostDec)
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `&`
    BitAnd,
    /// `^`
    BitXor,
    /// `|`
    BitOr,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// Source text of the operator
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Operator name, as used by the toggle counter's compound store methods
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mul => "Mul",
            Self::Div => "Div",
            Self::Rem => "Rem",
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Shl => "Shl",
            Self::Shr => "Shr",
            Self::Lt => "Lt",
            Self::Le => "Le",
            Self::Gt => "Gt",
            Self::Ge => "Ge",
            Self::Eq => "Eq",
            Self::Ne => "Ne",
            Self::BitAnd => "And",
            Self::BitXor => "Xor",
            Self::BitOr => "Or",
            Self::And => "LogicalAnd",
            Self::Or => "LogicalOr",
        }
    }

    /// Binding strength; higher binds tighter
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::BitOr => 3,
            Self::BitXor => 4,
            Self::BitAnd => 5,
            Self::Eq | Self::Ne => 6,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 7,
            Self::Shl | Self::Shr => 8,
            Self::Add | Self::Sub => 9,
            Self::Mul | Self::Div | Self::Rem => 10,
        }
    }

    /// Whether the right operand is only evaluated conditionally
    #[must_use]
    pub const fn is_short_circuit(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Operator for a binary token
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "+" => Self::Add,
            "-" => Self::Sub,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "&" => Self::BitAnd,
            "^" => Self::BitXor,
            "|" => Self::BitOr,
            "&&" => Self::And,
            "||" => Self::Or,
            _ => return None,
        })
    }
}

/// Assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `op=`
    Compound(BinaryOp),
}

impl AssignOp {
    /// Source text of the operator
    #[must_use]
    pub fn as_str(self) -> String {
        match self {
            Self::Assign => "=".to_string(),
            Self::Compound(op) => format!("{}=", op.as_str()),
        }
    }

    /// Operator for an assignment token
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        if token == "=" {
            return Some(Self::Assign);
        }
        let op = BinaryOp::from_token(token.strip_suffix('=')?)?;
        match op {
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd
            | BinaryOp::BitXor
            | BinaryOp::BitOr => Some(Self::Compound(op)),
            _ => None,
        }
    }
}

impl Expr {
    /// Identifier expression
    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    /// Literal expression
    #[must_use]
    pub fn constant(text: impl Into<String>) -> Self {
        Self::Constant(text.into())
    }

    /// `self.name`
    #[must_use]
    pub fn dot(self, name: impl Into<String>) -> Self {
        Self::Field {
            base: Box::new(self),
            op: FieldOp::Dot,
            name: name.into(),
        }
    }

    /// `self->name`
    #[must_use]
    pub fn arrow(self, name: impl Into<String>) -> Self {
        Self::Field {
            base: Box::new(self),
            op: FieldOp::Arrow,
            name: name.into(),
        }
    }

    /// `self[index]`
    #[must_use]
    pub fn index(self, index: Self) -> Self {
        Self::Index {
            base: Box::new(self),
            index: Box::new(index),
        }
    }

    /// `self(args)`
    #[must_use]
    pub fn call(self, args: Vec<Self>) -> Self {
        Self::Call {
            callee: Box::new(self),
            args,
        }
    }

    /// `op self`
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// `lhs op rhs`
    #[must_use]
    pub fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `cond ? then_expr : else_expr`
    #[must_use]
    pub fn ternary(cond: Self, then_expr: Self, else_expr: Self) -> Self {
        Self::Ternary {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    /// `target op value`
    #[must_use]
    pub fn assign(op: AssignOp, target: Self, value: Self) -> Self {
        Self::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// Name of the node kind, for diagnostics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ident(_) => "identifier",
            Self::Constant(_) => "constant",
            Self::Field { .. } => "field access",
            Self::Index { .. } => "array subscript",
            Self::Call { .. } => "call",
            Self::Unary { .. } => "unary operation",
            Self::Binary { .. } => "binary operation",
            Self::Ternary { .. } => "ternary",
            Self::Assign { .. } => "assignment",
            Self::Sequence(_) => "expression list",
        }
    }
}

impl Stmt {
    /// Name of the node kind, for diagnostics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Compound(_) => "compound statement",
            Self::If { .. } => "if statement",
            Self::Expr(Expr::Assign { .. }) => "assignment",
            Self::Expr(Expr::Call { .. }) => "call",
            Self::Expr(_) => "expression statement",
            Self::Switch { .. } => "switch statement",
            Self::Case(_) => "case label",
            Self::Default => "default label",
            Self::While { .. } => "while loop",
            Self::DoWhile { .. } => "do-while loop",
            Self::For { .. } => "for loop",
            Self::Break => "break statement",
            Self::Continue => "continue statement",
            Self::Return(_) => "return statement",
            Self::Empty => "empty statement",
        }
    }
}
