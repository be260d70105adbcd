//! Statements as written in function bodies.

use lily_span::Location;

use crate::{AstPath, DataTy, Expr, Pat};

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Location,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: Location) -> Self {
        Stmt { kind, location }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    If {
        cond: Box<Expr>,
        then: Vec<Stmt>,
        elifs: Vec<ElifBranch>,
        else_: Option<Vec<Stmt>>,
    },
    While {
        cond: Box<Expr>,
        body: Vec<Stmt>,
    },
    For {
        capture: ForCapture,
        iterable: Box<Expr>,
        body: Vec<Stmt>,
    },
    Match {
        scrutinee: Box<Expr>,
        cases: Vec<MatchCase>,
    },
    Try {
        body: Vec<Stmt>,
        /// `catch name { … }`; the name is optional.
        catch: Option<(Option<String>, Vec<Stmt>)>,
    },
    Unsafe(Vec<Stmt>),
    Defer(Box<Stmt>),
    Drop(Box<Expr>),
    Raise {
        name: AstPath,
        values: Vec<Expr>,
    },
    Return(Option<Box<Expr>>),
    Variable {
        name: String,
        ty: Option<DataTy>,
        value: Box<Expr>,
        mutable: bool,
    },
    Expr(Box<Expr>),
    Break,
    Next,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElifBranch {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// The binding form of a `for` head: `for x in …` or `for (k, v) in …`.
#[derive(Clone, Debug, PartialEq)]
pub enum ForCapture {
    Identifier(String),
    Tuple(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchCase {
    pub pat: Pat,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
    pub location: Location,
}
