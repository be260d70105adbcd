//! Checked expressions.
//!
//! Every checked expression carries a non-null data type; `unknown` only
//! appears while inference is still running. Identifier-ish expressions
//! become calls with a call kind so the lowering needs no further
//! resolution.

use lily_ast::{BinaryOp, UnaryOp};
use lily_span::{DeclId, Location, ScopeId};
use lily_ty::{GenericMap, Ty};

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedExpr {
    pub kind: CheckedExprKind,
    pub ty: Ty,
    pub location: Location,
}

impl CheckedExpr {
    pub fn new(kind: CheckedExprKind, ty: Ty, location: Location) -> Self {
        CheckedExpr { kind, ty, location }
    }

    /// The placeholder a failed sub-check recovers with.
    pub fn unknown(location: Location) -> Self {
        CheckedExpr {
            kind: CheckedExprKind::Unknown,
            ty: Ty::new(lily_ty::TyKind::Unknown),
            location,
        }
    }

    pub fn literal(literal: CheckedLiteral, ty: Ty, location: Location) -> Self {
        CheckedExpr {
            kind: CheckedExprKind::Literal(literal),
            ty,
            location,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckedExprKind {
    Literal(CheckedLiteral),
    Call(CheckedCall),
    Binary {
        op: BinaryOp,
        lhs: Box<CheckedExpr>,
        rhs: Box<CheckedExpr>,
    },
    Unary {
        op: UnaryOp,
        rhs: Box<CheckedExpr>,
    },
    Array(Vec<CheckedExpr>),
    List(Vec<CheckedExpr>),
    Tuple(Vec<CheckedExpr>),
    Cast {
        expr: Box<CheckedExpr>,
        kind: CastKind,
    },
    Path {
        head: Box<CheckedExpr>,
        segments: Vec<CheckedPathSegment>,
    },
    Grouping(Box<CheckedExpr>),
    Wildcard,
    /// Recovery placeholder.
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckedLiteral {
    Bool(bool),
    Int(i128),
    Float(f64),
    Byte(u8),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
    CStr(String),
    Nil,
    None,
    Undef,
    Unit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckedCall {
    Variable {
        name: String,
        scope: ScopeId,
    },
    Param {
        name: String,
        index: usize,
    },
    CapturedVariable {
        name: String,
        scope: ScopeId,
    },
    Constant {
        decl: DeclId,
        global_name: String,
    },
    Enum {
        decl: DeclId,
        global_name: String,
    },
    Variant {
        enum_decl: DeclId,
        name: String,
        index: usize,
    },
    Fun {
        decl: DeclId,
        global_name: String,
        args: Vec<CheckedExpr>,
        generic_map: Option<GenericMap>,
    },
    Record {
        decl: DeclId,
        global_name: String,
        fields: Vec<(String, CheckedExpr)>,
        generic_map: GenericMap,
    },
    VariantCall {
        enum_decl: DeclId,
        variant: String,
        index: usize,
        values: Vec<CheckedExpr>,
        generic_map: GenericMap,
    },
    Builtin {
        name: String,
        args: Vec<CheckedExpr>,
    },
    Sys {
        name: String,
        args: Vec<CheckedExpr>,
    },
    Len {
        arg: Box<CheckedExpr>,
    },
    /// Recovery placeholder for unresolved calls.
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastKind {
    Literal,
    Str,
    Dynamic,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedPathSegment {
    pub name: String,
    pub ty: Ty,
    pub kind: PathSegmentKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PathSegmentKind {
    /// A record field: the scope of the owning record plus the compiler
    /// field index.
    Field {
        record_scope: ScopeId,
        index: usize,
    },
    /// An enum variant reached through a two-segment path.
    Variant {
        enum_decl: DeclId,
        index: usize,
    },
    /// A member of a module reached through its name.
    ModuleMember(DeclId),
}
