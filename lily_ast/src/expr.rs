//! Expressions as written in source.

use lily_span::Location;

use crate::{AstPath, DataTy};

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Self {
        Expr { kind, location }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    /// `a.b.c` — field access, enum variant, module member.
    Path(AstPath),
    Literal(Literal),
    /// `_`, allowed on the left of `=` only.
    Wildcard,
    SelfExpr,

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        rhs: Box<Expr>,
    },
    Grouping(Box<Expr>),

    FunCall {
        name: AstPath,
        generic_args: Option<Vec<DataTy>>,
        args: Vec<Expr>,
    },
    RecordCall {
        name: AstPath,
        generic_args: Option<Vec<DataTy>>,
        fields: Vec<(String, Expr)>,
    },
    VariantCall {
        name: AstPath,
        generic_args: Option<Vec<DataTy>>,
        values: Vec<Expr>,
    },
    /// `@builtin.name(args…)`.
    BuiltinCall {
        name: String,
        args: Vec<Expr>,
    },
    /// `@sys.name(args…)`.
    SysCall {
        name: String,
        args: Vec<Expr>,
    },
    /// `@len(x)`.
    LenCall(Box<Expr>),

    Array(Vec<Expr>),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),

    Cast {
        expr: Box<Expr>,
        dest: DataTy,
    },

    Lambda {
        params: Vec<(String, Option<DataTy>)>,
        body: Box<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    /// All integer literals; the sign and magnitude fit i128 so overflow
    /// checks against every target width stay exact.
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

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ExpAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    ShlAssign,
    ShrAssign,
    /// `x |> f(…)` — pipes `x` as the last positional argument of `f`.
    Chain,
    /// `..` in list patterns and ranges.
    Range,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Sub
                | Self::Mul
                | Self::Div
                | Self::Rem
                | Self::Exp
                | Self::BitAnd
                | Self::BitOr
                | Self::BitXor
                | Self::Shl
                | Self::Shr
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_assign(self) -> bool {
        self.assign_op().is_some() || self == Self::Assign
    }

    /// For `x op= y`, the underlying `op`.
    pub fn assign_op(self) -> Option<BinaryOp> {
        match self {
            Self::AddAssign => Some(Self::Add),
            Self::SubAssign => Some(Self::Sub),
            Self::MulAssign => Some(Self::Mul),
            Self::DivAssign => Some(Self::Div),
            Self::RemAssign => Some(Self::Rem),
            Self::ExpAssign => Some(Self::Exp),
            Self::BitAndAssign => Some(Self::BitAnd),
            Self::BitOrAssign => Some(Self::BitOr),
            Self::BitXorAssign => Some(Self::BitXor),
            Self::ShlAssign => Some(Self::Shl),
            Self::ShrAssign => Some(Self::Shr),
            _ => None,
        }
    }

    /// The operator token as it appears in an operator declaration name.
    pub fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Exp => "**",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "xor",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "==",
            Self::Ne => "not=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Assign => ":=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::RemAssign => "%=",
            Self::ExpAssign => "**=",
            Self::BitAndAssign => "&=",
            Self::BitOrAssign => "|=",
            Self::BitXorAssign => "xor=",
            Self::ShlAssign => "<<=",
            Self::ShrAssign => ">>=",
            Self::Chain => "|>",
            Self::Range => "..",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Deref,
    Ref,
    RefMut,
}

impl UnaryOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::Neg => "-",
            Self::Deref => ".*",
            Self::Ref => "ref",
            Self::RefMut => "ref mut",
        }
    }
}
