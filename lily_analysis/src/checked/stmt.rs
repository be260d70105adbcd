//! Checked statements.

use std::rc::Rc;

use lily_span::{Location, ScopeId};
use lily_ty::Ty;

use super::{CheckedExpr, CheckedPattern};

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedStmt {
    pub kind: CheckedStmtKind,
    pub location: Location,
}

impl CheckedStmt {
    pub fn new(kind: CheckedStmtKind, location: Location) -> Self {
        CheckedStmt { kind, location }
    }

    /// Whether control cannot continue past this statement.
    pub fn diverges(&self) -> bool {
        matches!(
            self.kind,
            CheckedStmtKind::Return { .. } | CheckedStmtKind::Raise { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckedStmtKind {
    Block {
        scope: ScopeId,
        stmts: Vec<CheckedStmt>,
    },
    If {
        /// `if` plus every `elif`, in order.
        branches: Vec<(CheckedExpr, ScopeId, Vec<CheckedStmt>)>,
        else_: Option<(ScopeId, Vec<CheckedStmt>)>,
    },
    While {
        cond: CheckedExpr,
        scope: ScopeId,
        body: Vec<CheckedStmt>,
    },
    For {
        captures: Vec<(String, Ty)>,
        iterable: CheckedExpr,
        scope: ScopeId,
        body: Vec<CheckedStmt>,
    },
    Match(CheckedMatch),
    Switch(CheckedSwitch),
    Try {
        scope: ScopeId,
        body: Vec<CheckedStmt>,
        catch: Option<(Option<String>, ScopeId, Vec<CheckedStmt>)>,
        /// Error types raised inside the body.
        raises: Vec<Ty>,
    },
    Unsafe {
        scope: ScopeId,
        body: Vec<CheckedStmt>,
    },
    /// Checked eagerly, buffered on the scope, re-emitted at exits.
    Defer(Rc<CheckedStmt>),
    Drop(CheckedExpr),
    Raise {
        error_ty: Ty,
        values: Vec<CheckedExpr>,
    },
    Return {
        expr: Option<CheckedExpr>,
        /// The deferred statements dumped before this exit, innermost
        /// first.
        deferred: Vec<Rc<CheckedStmt>>,
    },
    Variable {
        name: String,
        ty: Ty,
        value: CheckedExpr,
        mutable: bool,
    },
    Expr(CheckedExpr),
    Break,
    Next,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedMatch {
    pub scrutinee: CheckedExpr,
    pub cases: Vec<CheckedMatchCase>,
    pub nb_cases: usize,
    pub total_cases: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedMatchCase {
    pub pattern: CheckedPattern,
    /// Bindings the pattern introduced, flushed into `scope`.
    pub captures: Vec<(String, Ty)>,
    pub guard: Option<CheckedExpr>,
    pub scope: ScopeId,
    pub body: Vec<CheckedStmt>,
}

/// The switch lowering chosen for primitive scrutinees: each case carries
/// its boolean predicate over the scrutinee.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckedSwitch {
    pub scrutinee: CheckedExpr,
    pub cases: Vec<CheckedSwitchCase>,
    pub else_case: Option<(ScopeId, Vec<CheckedStmt>)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedSwitchCase {
    pub predicate: CheckedExpr,
    pub scope: ScopeId,
    pub body: Vec<CheckedStmt>,
}
