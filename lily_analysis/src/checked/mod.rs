//! The checked IR: fully typed, scope-resolved counterparts of the AST.

mod decl;
mod expr;
mod pattern;
mod stmt;

pub use decl::{
    AliasDecl, AstDeclRef, CheckedDecl, CheckedDeclKind, CheckedField, CheckedParam,
    CheckedVariant, ConstantDecl, DeclArena, EnumDecl, ErrorDecl, FunDecl, ModuleDecl, ObjectDecl,
    ObjectKind, RecordDecl,
};
pub use expr::{
    CastKind, CheckedCall, CheckedExpr, CheckedExprKind, CheckedLiteral, CheckedPathSegment,
    PathSegmentKind,
};
pub use pattern::{CheckedPattern, CheckedPatternKind};
pub use stmt::{
    CheckedMatch, CheckedMatchCase, CheckedStmt, CheckedStmtKind, CheckedSwitch, CheckedSwitchCase,
};
