//=====================================================
// File: script/ast.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Abstract syntax tree for the Python subset
// Objective: Define statement, expression, and assignment target nodes
//            consumed by the tree-walking interpreter
//=====================================================

use std::rc::Rc;

use super::tokenizer::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    /// Split a trailing bare expression off the program, if there is one.
    pub fn split_trailing_expression(mut self) -> (Program, Option<Expr>) {
        match self.statements.pop() {
            Some(Stmt::Expression { expr, .. }) => (self, Some(expr)),
            Some(other) => {
                self.statements.push(other);
                (self, None)
            }
            None => (self, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Less => "<",
            CompareOp::LessEq => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEq => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        position: Position,
    },
    Name {
        name: String,
        position: Position,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        position: Position,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        position: Position,
    },
    Logical {
        operator: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
        position: Position,
    },
    /// `a < b <= c` keeps every link so each operand is evaluated once.
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CompareOp, Expr)>,
        position: Position,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
        position: Position,
    },
    Attribute {
        object: Box<Expr>,
        name: String,
        position: Position,
    },
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },
    List {
        elements: Vec<Expr>,
        position: Position,
    },
    Tuple {
        elements: Vec<Expr>,
        position: Position,
    },
    Dict {
        entries: Vec<(Expr, Expr)>,
        position: Position,
    },
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        position: Position,
    },
    Lambda {
        params: Vec<Parameter>,
        body: Rc<Expr>,
        position: Position,
    },
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::Literal { position, .. }
            | Expr::Name { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Unary { position, .. }
            | Expr::Logical { position, .. }
            | Expr::Compare { position, .. }
            | Expr::Call { position, .. }
            | Expr::Attribute { position, .. }
            | Expr::Subscript { position, .. }
            | Expr::List { position, .. }
            | Expr::Tuple { position, .. }
            | Expr::Dict { position, .. }
            | Expr::Conditional { position, .. }
            | Expr::Lambda { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Name(String),
    Attribute { object: Expr, name: String },
    Subscript { object: Expr, index: Expr },
    Unpack(Vec<AssignTarget>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    /// `None` for a bare `except:`.
    pub exception_type: Option<Expr>,
    pub binding: Option<String>,
    pub body: Vec<Stmt>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Vec<Stmt>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression {
        expr: Expr,
        position: Position,
    },
    /// `a = b = value` stores every target left to right.
    Assign {
        targets: Vec<AssignTarget>,
        value: Expr,
        position: Position,
    },
    AugAssign {
        target: AssignTarget,
        operator: BinaryOp,
        value: Expr,
        position: Position,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        position: Position,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        position: Position,
    },
    For {
        target: AssignTarget,
        iterable: Expr,
        body: Vec<Stmt>,
        position: Position,
    },
    Break {
        position: Position,
    },
    Continue {
        position: Position,
    },
    Pass {
        position: Position,
    },
    FunctionDef {
        decl: Rc<FunctionDecl>,
        position: Position,
    },
    Return {
        value: Option<Expr>,
        position: Position,
    },
    Raise {
        exception: Option<Expr>,
        position: Position,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        else_body: Option<Vec<Stmt>>,
        finally_body: Option<Vec<Stmt>>,
        position: Position,
    },
    Global {
        names: Vec<String>,
        position: Position,
    },
}

impl Stmt {
    pub fn position(&self) -> Position {
        match self {
            Stmt::Expression { position, .. }
            | Stmt::Assign { position, .. }
            | Stmt::AugAssign { position, .. }
            | Stmt::If { position, .. }
            | Stmt::While { position, .. }
            | Stmt::For { position, .. }
            | Stmt::Break { position }
            | Stmt::Continue { position }
            | Stmt::Pass { position }
            | Stmt::FunctionDef { position, .. }
            | Stmt::Return { position, .. }
            | Stmt::Raise { position, .. }
            | Stmt::Try { position, .. }
            | Stmt::Global { position, .. } => *position,
        }
    }

    pub fn line(&self) -> usize {
        self.position().line
    }
}

//=====================================================
// End of file
//=====================================================
