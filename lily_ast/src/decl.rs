//! Declarations, modules and packages.

use lily_span::Location;
use smallvec::SmallVec;

use crate::{DataTy, Expr, Stmt};

#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub location: Location,
}

impl Decl {
    pub fn new(kind: DeclKind, location: Location) -> Self {
        Decl { kind, location }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            DeclKind::Constant { name, .. }
            | DeclKind::Fun { name, .. }
            | DeclKind::Module(Module { name, .. })
            | DeclKind::Alias { name, .. }
            | DeclKind::Record { name, .. }
            | DeclKind::Enum { name, .. }
            | DeclKind::Error { name, .. }
            | DeclKind::Class { name, .. }
            | DeclKind::Trait { name, .. }
            | DeclKind::RecordObject { name, .. }
            | DeclKind::EnumObject { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclKind {
    Constant {
        name: String,
        ty: Option<DataTy>,
        value: Expr,
        visibility: Visibility,
    },
    Fun {
        name: String,
        generic_params: SmallVec<[GenericParam; 4]>,
        params: Vec<FunParam>,
        return_ty: Option<DataTy>,
        body: Vec<Stmt>,
        is_operator: bool,
        visibility: Visibility,
    },
    Module(Module),
    Alias {
        name: String,
        generic_params: SmallVec<[GenericParam; 4]>,
        ty: DataTy,
        visibility: Visibility,
    },
    Record {
        name: String,
        generic_params: SmallVec<[GenericParam; 4]>,
        fields: Vec<Field>,
        visibility: Visibility,
    },
    Enum {
        name: String,
        generic_params: SmallVec<[GenericParam; 4]>,
        variants: Vec<EnumVariant>,
        visibility: Visibility,
    },
    Error {
        name: String,
        generic_params: SmallVec<[GenericParam; 4]>,
        fields: Vec<Field>,
        visibility: Visibility,
    },
    Class {
        name: String,
        body: Vec<Decl>,
        visibility: Visibility,
    },
    Trait {
        name: String,
        body: Vec<Decl>,
        visibility: Visibility,
    },
    RecordObject {
        name: String,
        fields: Vec<Field>,
        body: Vec<Decl>,
        visibility: Visibility,
    },
    EnumObject {
        name: String,
        variants: Vec<EnumVariant>,
        body: Vec<Decl>,
        visibility: Visibility,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenericParam {
    pub name: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunParam {
    pub name: String,
    /// Absent means the type is inferred (a compiler-generic slot when no
    /// context exists).
    pub ty: Option<DataTy>,
    pub mutable: bool,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: DataTy,
    pub mutable: bool,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumVariant {
    pub name: String,
    pub values: Vec<DataTy>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub name: String,
    pub decls: Vec<Decl>,
    pub location: Location,
}

/// One compilation unit handed to the analyzer.
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    pub name: String,
    pub modules: Vec<Module>,
    pub status: PackageStatus,
    /// `import @builtin` seen at package level.
    pub import_builtin: bool,
    /// `import @sys` seen at package level.
    pub import_sys: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageStatus {
    Main,
    Library,
    SubPackage,
}

impl Package {
    pub fn is_exe(&self) -> bool {
        self.status == PackageStatus::Main
    }
}
