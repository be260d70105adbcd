//! Checked declarations and their arena.
//!
//! Declarations and scopes form a cyclic graph; both live in arenas and
//! refer to each other by id. Payload fields that step 2 fills in use
//! interior mutability so a decl can be mutated while other decls are
//! being resolved through shared references.

use std::cell::{Cell, RefCell};

use lily_ast::Visibility;
use lily_span::{DeclId, Location, ScopeId};
use lily_ty::Ty;
use smallvec::SmallVec;

use crate::signature::{FunSignature, TypeSignature};

use super::{CheckedExpr, CheckedStmt};

/// Where the declaration's AST node lives inside the package:
/// `modules[module]`, then `path` indexes through nested decl lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AstDeclRef {
    pub module: usize,
    pub path: SmallVec<[usize; 2]>,
}

#[derive(Debug)]
pub struct CheckedDecl {
    pub id: DeclId,
    pub name: String,
    pub global_name: String,
    pub visibility: Visibility,
    pub location: Location,
    pub ast: AstDeclRef,
    /// Scope the declaration's own contents live in.
    pub scope: ScopeId,
    /// Scope the declaration was pushed into.
    pub parent_scope: ScopeId,
    /// Flips exactly once, at the end of the first successful check.
    pub checked: Cell<bool>,
    pub kind: CheckedDeclKind,
}

#[derive(Debug)]
pub enum CheckedDeclKind {
    Constant(ConstantDecl),
    Fun(FunDecl),
    Module(ModuleDecl),
    Alias(AliasDecl),
    Record(RecordDecl),
    Enum(EnumDecl),
    Error(ErrorDecl),
    Object(ObjectDecl),
}

impl CheckedDecl {
    pub fn as_fun(&self) -> Option<&FunDecl> {
        match &self.kind {
            CheckedDeclKind::Fun(fun) => Some(fun),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordDecl> {
        match &self.kind {
            CheckedDeclKind::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDecl> {
        match &self.kind {
            CheckedDeclKind::Enum(enum_decl) => Some(enum_decl),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorDecl> {
        match &self.kind {
            CheckedDeclKind::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&ConstantDecl> {
        match &self.kind {
            CheckedDeclKind::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&AliasDecl> {
        match &self.kind {
            CheckedDeclKind::Alias(alias) => Some(alias),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleDecl> {
        match &self.kind {
            CheckedDeclKind::Module(module) => Some(module),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ConstantDecl {
    pub ty: RefCell<Ty>,
    pub value: RefCell<Option<CheckedExpr>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedParam {
    pub name: String,
    pub ty: Ty,
    pub mutable: bool,
    pub location: Location,
}

#[derive(Debug)]
pub struct FunDecl {
    pub generic_params: Vec<String>,
    pub params: RefCell<Vec<CheckedParam>>,
    pub return_ty: RefCell<Ty>,
    pub body: RefCell<Vec<CheckedStmt>>,
    /// First entry is the original (generic) signature.
    pub signatures: RefCell<Vec<FunSignature>>,
    /// Declarations this function's body resolves to.
    pub deps: RefCell<Vec<DeclId>>,
    /// Error types this function may raise.
    pub raises: RefCell<Vec<Ty>>,
    /// Compiler-generic slots allocated during inference, in allocation
    /// order.
    pub used_compiler_generics: RefCell<Vec<String>>,
    pub is_operator: bool,
    pub is_main: bool,
}

#[derive(Debug)]
pub struct ModuleDecl {
    pub decls: Vec<DeclId>,
}

#[derive(Debug)]
pub struct AliasDecl {
    pub generic_params: Vec<String>,
    pub ty: RefCell<Ty>,
    pub signatures: RefCell<Vec<TypeSignature>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedField {
    pub name: String,
    pub ty: Ty,
    pub mutable: bool,
    pub location: Location,
}

#[derive(Debug)]
pub struct RecordDecl {
    pub generic_params: Vec<String>,
    pub fields: RefCell<Vec<CheckedField>>,
    pub signatures: RefCell<Vec<TypeSignature>>,
    pub is_recursive: Cell<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckedVariant {
    pub name: String,
    pub values: Vec<Ty>,
    pub location: Location,
}

#[derive(Debug)]
pub struct EnumDecl {
    pub generic_params: Vec<String>,
    pub variants: RefCell<Vec<CheckedVariant>>,
    pub signatures: RefCell<Vec<TypeSignature>>,
    pub is_recursive: Cell<bool>,
}

#[derive(Debug)]
pub struct ErrorDecl {
    pub generic_params: Vec<String>,
    pub fields: RefCell<Vec<CheckedField>>,
    pub signatures: RefCell<Vec<TypeSignature>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Class,
    Trait,
    RecordObject,
    EnumObject,
}

#[derive(Debug)]
pub struct ObjectDecl {
    pub object_kind: ObjectKind,
    pub decls: Vec<DeclId>,
}

/// Arena of checked declarations, indexed by [`DeclId`].
#[derive(Debug, Default)]
pub struct DeclArena {
    decls: Vec<CheckedDecl>,
}

impl DeclArena {
    pub fn new() -> Self {
        DeclArena::default()
    }

    pub fn next_id(&self) -> DeclId {
        DeclId(u32::try_from(self.decls.len()).expect("decl arena overflow"))
    }

    pub fn alloc(&mut self, decl: CheckedDecl) -> DeclId {
        let id = decl.id;
        debug_assert_eq!(id, self.next_id());
        self.decls.push(decl);
        id
    }

    pub fn get(&self, id: DeclId) -> &CheckedDecl {
        &self.decls[id.index()]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut CheckedDecl {
        &mut self.decls[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckedDecl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}
