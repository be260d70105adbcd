//! The parser output consumed by semantic analysis.
//!
//! The analyzer never mutates these nodes; it stores locations and indices
//! into this tree inside checked declarations. Construction helpers exist so
//! analysis tests can build programs without a parser.

mod data_ty;
mod decl;
mod expr;
mod pattern;
mod stmt;

pub use data_ty::{DataTy, DataTyKind};
pub use decl::{
    Decl, DeclKind, EnumVariant, Field, FunParam, GenericParam, Module, Package, PackageStatus,
    Visibility,
};
pub use expr::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};
pub use pattern::{Pat, PatKind};
pub use stmt::{ElifBranch, ForCapture, MatchCase, Stmt, StmtKind};

/// A dot-separated path as written in source, e.g. `Color.Red` or
/// `std.io.write`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AstPath {
    pub segments: Vec<String>,
}

impl AstPath {
    pub fn new(segments: Vec<String>) -> Self {
        debug_assert!(!segments.is_empty());
        AstPath { segments }
    }

    pub fn single(name: impl Into<String>) -> Self {
        AstPath {
            segments: vec![name.into()],
        }
    }

    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_single(&self) -> bool {
        self.segments.len() == 1
    }
}

impl std::fmt::Display for AstPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
