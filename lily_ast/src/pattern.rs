//! Patterns as written in `match` cases and `for` captures.

use lily_span::Location;

use crate::{AstPath, Literal};

#[derive(Clone, Debug, PartialEq)]
pub struct Pat {
    pub kind: PatKind,
    pub location: Location,
}

impl Pat {
    pub fn new(kind: PatKind, location: Location) -> Self {
        Pat { kind, location }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PatKind {
    /// `[a, b, c]`, optionally ending in `..`.
    Array(Vec<Pat>),
    List(Vec<Pat>),
    /// `[x, y -> rest]` — leading elements plus remainder.
    ListHead {
        head: Vec<Pat>,
        rest: Option<String>,
    },
    /// `[rest <- x, y]` — remainder plus trailing elements.
    ListTail {
        rest: Option<String>,
        tail: Vec<Pat>,
    },
    Tuple(Vec<Pat>),
    RecordCall {
        name: AstPath,
        fields: Vec<(String, Pat)>,
    },
    VariantCall {
        name: AstPath,
        args: Vec<Pat>,
    },
    /// `pat as name`; the inner must be `..`.
    As {
        pat: Box<Pat>,
        name: String,
    },
    /// A binding.
    Name(String),
    Wildcard,
    /// `..`.
    AutoComplete,
    Range {
        lo: Literal,
        hi: Literal,
    },
    /// `error Name(pat)`.
    Error {
        name: AstPath,
        inner: Option<Box<Pat>>,
    },
    Literal(Literal),
    /// The final `else` case of a match.
    Else,
}

impl PatKind {
    /// Whether this pattern accepts every value of its scrutinee type.
    pub fn is_universal(&self) -> bool {
        matches!(
            self,
            PatKind::Name(_) | PatKind::Wildcard | PatKind::AutoComplete | PatKind::Else
        )
    }
}
