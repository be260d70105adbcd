//! Checked patterns.

use lily_span::{DeclId, Location};
use lily_ty::Ty;

use super::CheckedLiteral;

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedPattern {
    pub kind: CheckedPatternKind,
    pub ty: Ty,
    pub location: Location,
}

impl CheckedPattern {
    pub fn new(kind: CheckedPatternKind, ty: Ty, location: Location) -> Self {
        CheckedPattern { kind, ty, location }
    }

    /// Accepts every value of the scrutinee type.
    pub fn is_universal(&self) -> bool {
        matches!(
            self.kind,
            CheckedPatternKind::Name(_)
                | CheckedPatternKind::Wildcard
                | CheckedPatternKind::AutoComplete
                | CheckedPatternKind::Else
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckedPatternKind {
    Array {
        elems: Vec<CheckedPattern>,
        /// `..` was present: length is "at least n" instead of "exactly n".
        auto_complete: bool,
    },
    List {
        elems: Vec<CheckedPattern>,
        auto_complete: bool,
    },
    ListHead {
        head: Vec<CheckedPattern>,
        rest: Option<String>,
    },
    ListTail {
        rest: Option<String>,
        tail: Vec<CheckedPattern>,
    },
    Tuple(Vec<CheckedPattern>),
    Record {
        decl: DeclId,
        fields: Vec<(String, CheckedPattern)>,
    },
    Variant {
        enum_decl: DeclId,
        name: String,
        index: usize,
        args: Vec<CheckedPattern>,
    },
    /// `Some(pat)` over the builtin optional.
    OptionalSome(Box<CheckedPattern>),
    /// `None` over the builtin optional.
    OptionalNone,
    As {
        pat: Box<CheckedPattern>,
        name: String,
    },
    Name(String),
    Wildcard,
    AutoComplete,
    Range {
        lo: CheckedLiteral,
        hi: CheckedLiteral,
    },
    Error {
        decl: DeclId,
        inner: Option<Box<CheckedPattern>>,
    },
    Literal(CheckedLiteral),
    Else,
}
