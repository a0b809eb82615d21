//! Expression nodes.
//!
//! `ExprKind` is the closed sum of every expression form the language has:
//! control flow (if, while), grouping (block, let, case), assignment, the
//! unary and binary operators, the two dispatch forms, object construction,
//! and the atomic literals. Each analysis pass matches on it exhaustively.

use serde::Serialize;

use crate::item::Ident;
use crate::loc::Loc;

/// One expression node.
///
/// `static_ty` starts out `None`; the semantic analyzer fills in the
/// resolved static type name of every expression it visits.
#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: Loc,
    /// Resolved static type name, assigned during semantic analysis.
    pub static_ty: Option<String>,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: Loc) -> Self {
        Expr { kind, loc, static_ty: None }
    }

    /// Integer literal.
    pub fn int(value: i64, loc: Loc) -> Self {
        Expr::new(ExprKind::IntLit(value), loc)
    }

    /// String literal.
    pub fn string(value: impl Into<String>, loc: Loc) -> Self {
        Expr::new(ExprKind::StrLit(value.into()), loc)
    }

    /// Boolean literal.
    pub fn boolean(value: bool, loc: Loc) -> Self {
        Expr::new(ExprKind::BoolLit(value), loc)
    }

    /// Identifier reference.
    pub fn id(name: impl Into<String>, loc: Loc) -> Self {
        Expr::new(ExprKind::Id(name.into()), loc)
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    /// `if <condition> then <then_body> else <else_body> fi`
    If {
        condition: Box<Expr>,
        then_body: Box<Expr>,
        else_body: Box<Expr>,
    },
    /// `while <condition> loop <body> pool`
    While { condition: Box<Expr>, body: Box<Expr> },
    /// `{ e1; e2; ... }` -- the block's value is its last expression's.
    Block { body: Vec<Expr> },
    /// `let <bindings> in <body>`
    Let {
        bindings: Vec<LetBinding>,
        body: Box<Expr>,
    },
    /// `case <scrutinee> of <branches> esac`
    Case {
        scrutinee: Box<Expr>,
        branches: Vec<CaseBranch>,
    },
    /// `<target> <- <value>`
    Assign { target: Ident, value: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Qualified dispatch `receiver.method(args)`, or static dispatch
    /// `receiver@Type.method(args)` when `static_target` is present.
    Dispatch {
        receiver: Box<Expr>,
        static_target: Option<Ident>,
        method: Ident,
        args: Vec<Expr>,
    },
    /// Unqualified dispatch `method(args)` on the implicit `self`.
    SelfDispatch { method: Ident, args: Vec<Expr> },
    /// `new Type`
    New { class: Ident },
    IntLit(i64),
    StrLit(String),
    BoolLit(bool),
    Id(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// Boolean negation `not`.
    Not,
    /// `isvoid` -- true when the operand is unset; defined for any type.
    IsVoid,
    /// Integer complement `~`.
    Complement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    LessEq,
    /// `=` -- comparison between any two types, except that a primitive
    /// operand may only be compared to another operand of the same
    /// primitive type.
    Eq,
}

/// One `name: Type [<- init]` binding inside a `let`.
#[derive(Debug, Clone, Serialize)]
pub struct LetBinding {
    pub name: Ident,
    pub declared_ty: Ident,
    pub init: Option<Expr>,
}

impl LetBinding {
    pub fn new(name: Ident, declared_ty: Ident, init: Option<Expr>) -> Self {
        LetBinding { name, declared_ty, init }
    }
}

/// One `name: Type => body` branch of a `case`.
#[derive(Debug, Clone, Serialize)]
pub struct CaseBranch {
    pub name: Ident,
    pub declared_ty: Ident,
    pub body: Expr,
}

impl CaseBranch {
    pub fn new(name: Ident, declared_ty: Ident, body: Expr) -> Self {
        CaseBranch { name, declared_ty, body }
    }
}
