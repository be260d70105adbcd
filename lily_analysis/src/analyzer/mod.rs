//! The three-pass analyzer driver.

mod call;
mod decl;
mod expr;
mod pattern;
mod reanalyze;
mod stmt;

use lily_ast::{Decl, DeclKind, Package, Visibility};
use lily_errors::{DiagnosticKind, Handler, WarningKind};
use lily_span::{DeclId, FileId, Location, ScopeId};
use lily_ty::{CustomKind, CustomTy, Ty, TyKind};
use smallvec::SmallVec;

use crate::checked::{
    AliasDecl, AstDeclRef, CheckedDecl, CheckedDeclKind, ConstantDecl, DeclArena, EnumDecl,
    ErrorDecl, FunDecl, ModuleDecl, ObjectDecl, ObjectKind, RecordDecl,
};
use crate::context::AnalysisContext;
use crate::operator::OperatorRegistry;
use crate::package::PackageContext;
use crate::scope::{ScopeArena, ScopeTag, SearchResponse, VariantEntry};

/// Everything analysis produced. The caller decides what a nonzero error
/// count means (a build exits with code 1).
#[derive(Debug)]
pub struct Analysis {
    pub scopes: ScopeArena,
    pub decls: DeclArena,
    pub package: PackageContext,
    pub operators: OperatorRegistry,
    pub root_scope: ScopeId,
}

/// Run the full analysis of one package.
pub fn analyze(package: &Package, handler: &Handler) -> Analysis {
    let mut analyzer = Analyzer::new(package, handler);
    analyzer.run();
    let Analyzer {
        scopes,
        decls,
        package_ctx,
        operators,
        root_scope,
        ..
    } = analyzer;
    Analysis {
        scopes,
        decls,
        package: package_ctx,
        operators,
        root_scope,
    }
}

pub struct Analyzer<'a> {
    pub(crate) package: &'a Package,
    pub(crate) handler: &'a Handler,
    pub(crate) scopes: ScopeArena,
    pub(crate) decls: DeclArena,
    pub(crate) package_ctx: PackageContext,
    pub(crate) operators: OperatorRegistry,
    pub(crate) root_scope: ScopeId,
    /// Fresh-name source for compiler-generic slots.
    pub(crate) compiler_generic_counter: u32,
}

impl<'a> Analyzer<'a> {
    pub fn new(package: &'a Package, handler: &'a Handler) -> Self {
        let mut scopes = ScopeArena::new();
        let root_scope = scopes.alloc(None, ScopeTag::Package);
        let mut package_ctx = PackageContext::new(FileId(0), package.name.clone(), package.status);
        package_ctx.import_builtin = package.import_builtin;
        package_ctx.import_sys = package.import_sys;
        Analyzer {
            package,
            handler,
            scopes,
            decls: DeclArena::new(),
            package_ctx,
            operators: OperatorRegistry::new(),
            root_scope,
            compiler_generic_counter: 0,
        }
    }

    pub fn run(&mut self) {
        self.step0_imports();
        self.step1_push_decls();
        self.step2_check_decls();

        if self.package_ctx.is_exe && !self.package_ctx.main_is_found {
            self.error(Location::DUMMY, DiagnosticKind::ExpectedMainFunction);
        }
    }

    /// Reserved for cross-package resolution.
    fn step0_imports(&mut self) {}

    // -- step 1: push declarations ------------------------------------

    fn step1_push_decls(&mut self) {
        for (module_index, module) in self.package.modules.iter().enumerate() {
            self.push_top_module(module, module_index);
        }
    }

    fn push_top_module(&mut self, module: &'a lily_ast::Module, module_index: usize) {
        let id = self.decls.next_id();
        let scope = self.scopes.alloc(Some(self.root_scope), ScopeTag::Module(id));
        let ast = AstDeclRef {
            module: module_index,
            path: SmallVec::new(),
        };
        let mut child_ids = Vec::with_capacity(module.decls.len());
        self.decls.alloc(CheckedDecl {
            id,
            name: module.name.clone(),
            global_name: module.name.clone(),
            visibility: Visibility::Public,
            location: module.location,
            ast: ast.clone(),
            scope,
            parent_scope: self.root_scope,
            checked: std::cell::Cell::new(false),
            kind: CheckedDeclKind::Module(ModuleDecl { decls: Vec::new() }),
        });
        if self
            .scopes
            .push_module(self.root_scope, &module.name, id)
            .is_err()
        {
            self.error(module.location, DiagnosticKind::DuplicateModule);
            return;
        }

        for (decl_index, decl) in module.decls.iter().enumerate() {
            let mut path = SmallVec::new();
            path.push(decl_index);
            let child_ref = AstDeclRef {
                module: module_index,
                path,
            };
            if let Some(child) = self.push_decl(&module.name, scope, decl, child_ref) {
                child_ids.push(child);
            }
        }

        self.set_module_children(id, child_ids);
    }

    fn set_module_children(&mut self, id: DeclId, children: Vec<DeclId>) {
        let decl = self.decls.get_mut(id);
        match &mut decl.kind {
            CheckedDeclKind::Module(module_decl) => module_decl.decls = children,
            _ => unreachable!("set_module_children on a non-module decl"),
        }
    }

    fn push_decl(
        &mut self,
        parent_global: &str,
        parent_scope: ScopeId,
        decl: &'a Decl,
        ast: AstDeclRef,
    ) -> Option<DeclId> {
        let id = self.decls.next_id();
        let name = decl.name().to_owned();
        let global_name = format!("{parent_global}.{name}");

        match &decl.kind {
            DeclKind::Constant { .. } => {
                let scope = self.scopes.alloc(Some(parent_scope), ScopeTag::Constant(id));
                self.alloc_decl(
                    id,
                    &name,
                    global_name,
                    decl,
                    ast,
                    scope,
                    parent_scope,
                    CheckedDeclKind::Constant(ConstantDecl {
                        ty: std::cell::RefCell::new(Ty::new(TyKind::Unknown)),
                        value: std::cell::RefCell::new(None),
                    }),
                );
                if self.scopes.push_constant(parent_scope, &name, id).is_err() {
                    self.error(decl.location, DiagnosticKind::DuplicateConstant);
                    return None;
                }
                Some(id)
            }
            DeclKind::Fun {
                generic_params,
                is_operator,
                ..
            } => {
                let scope = self.scopes.alloc(Some(parent_scope), ScopeTag::Fun(id));
                let is_main = name == "main" && self.package_ctx.is_exe;
                self.alloc_decl(
                    id,
                    &name,
                    global_name,
                    decl,
                    ast,
                    scope,
                    parent_scope,
                    CheckedDeclKind::Fun(FunDecl {
                        generic_params: generic_params.iter().map(|p| p.name.clone()).collect(),
                        params: std::cell::RefCell::new(Vec::new()),
                        return_ty: std::cell::RefCell::new(Ty::new(TyKind::Unknown)),
                        body: std::cell::RefCell::new(Vec::new()),
                        signatures: std::cell::RefCell::new(Vec::new()),
                        deps: std::cell::RefCell::new(Vec::new()),
                        raises: std::cell::RefCell::new(Vec::new()),
                        used_compiler_generics: std::cell::RefCell::new(Vec::new()),
                        is_operator: *is_operator,
                        is_main,
                    }),
                );
                if self.scopes.push_fun(parent_scope, &name, id).is_err() {
                    self.error(decl.location, DiagnosticKind::DuplicateFun);
                    return None;
                }
                Some(id)
            }
            DeclKind::Module(module) => {
                let scope = self.scopes.alloc(Some(parent_scope), ScopeTag::Module(id));
                self.alloc_decl(
                    id,
                    &name,
                    global_name.clone(),
                    decl,
                    ast.clone(),
                    scope,
                    parent_scope,
                    CheckedDeclKind::Module(ModuleDecl { decls: Vec::new() }),
                );
                if self.scopes.push_module(parent_scope, &name, id).is_err() {
                    self.error(decl.location, DiagnosticKind::DuplicateModule);
                    return None;
                }
                let mut children = Vec::with_capacity(module.decls.len());
                for (decl_index, child) in module.decls.iter().enumerate() {
                    let mut path = ast.path.clone();
                    path.push(decl_index);
                    let child_ref = AstDeclRef {
                        module: ast.module,
                        path,
                    };
                    if let Some(child_id) =
                        self.push_decl(&global_name, scope, child, child_ref)
                    {
                        children.push(child_id);
                    }
                }
                self.set_module_children(id, children);
                Some(id)
            }
            DeclKind::Alias { generic_params, .. } => {
                let scope = self.scopes.alloc(Some(parent_scope), ScopeTag::Alias(id));
                self.alloc_decl(
                    id,
                    &name,
                    global_name,
                    decl,
                    ast,
                    scope,
                    parent_scope,
                    CheckedDeclKind::Alias(AliasDecl {
                        generic_params: generic_params.iter().map(|p| p.name.clone()).collect(),
                        ty: std::cell::RefCell::new(Ty::new(TyKind::Unknown)),
                        signatures: std::cell::RefCell::new(Vec::new()),
                    }),
                );
                if self.scopes.push_alias(parent_scope, &name, id).is_err() {
                    self.error(decl.location, DiagnosticKind::DuplicateAlias);
                    return None;
                }
                Some(id)
            }
            DeclKind::Record { generic_params, .. } => {
                let scope = self.scopes.alloc(Some(parent_scope), ScopeTag::Record(id));
                self.alloc_decl(
                    id,
                    &name,
                    global_name,
                    decl,
                    ast,
                    scope,
                    parent_scope,
                    CheckedDeclKind::Record(RecordDecl {
                        generic_params: generic_params.iter().map(|p| p.name.clone()).collect(),
                        fields: std::cell::RefCell::new(Vec::new()),
                        signatures: std::cell::RefCell::new(Vec::new()),
                        is_recursive: std::cell::Cell::new(false),
                    }),
                );
                if self.scopes.push_record(parent_scope, &name, id).is_err() {
                    self.error(decl.location, DiagnosticKind::DuplicateRecord);
                    return None;
                }
                Some(id)
            }
            DeclKind::Enum {
                generic_params,
                variants,
                ..
            } => {
                let scope = self.scopes.alloc(Some(parent_scope), ScopeTag::Enum(id));
                self.alloc_decl(
                    id,
                    &name,
                    global_name,
                    decl,
                    ast,
                    scope,
                    parent_scope,
                    CheckedDeclKind::Enum(EnumDecl {
                        generic_params: generic_params.iter().map(|p| p.name.clone()).collect(),
                        variants: std::cell::RefCell::new(Vec::new()),
                        signatures: std::cell::RefCell::new(Vec::new()),
                        is_recursive: std::cell::Cell::new(false),
                    }),
                );
                if self.scopes.push_enum(parent_scope, &name, id).is_err() {
                    self.error(decl.location, DiagnosticKind::DuplicateEnum);
                    return None;
                }
                for (index, variant) in variants.iter().enumerate() {
                    if self
                        .scopes
                        .push_variant(
                            parent_scope,
                            &variant.name,
                            VariantEntry {
                                enum_decl: id,
                                index,
                            },
                        )
                        .is_err()
                    {
                        self.error(variant.location, DiagnosticKind::DuplicateVariant);
                    }
                }
                Some(id)
            }
            DeclKind::Error { generic_params, .. } => {
                let scope = self.scopes.alloc(Some(parent_scope), ScopeTag::Error(id));
                self.alloc_decl(
                    id,
                    &name,
                    global_name,
                    decl,
                    ast,
                    scope,
                    parent_scope,
                    CheckedDeclKind::Error(ErrorDecl {
                        generic_params: generic_params.iter().map(|p| p.name.clone()).collect(),
                        fields: std::cell::RefCell::new(Vec::new()),
                        signatures: std::cell::RefCell::new(Vec::new()),
                    }),
                );
                if self.scopes.push_error(parent_scope, &name, id).is_err() {
                    self.error(decl.location, DiagnosticKind::DuplicateError);
                    return None;
                }
                Some(id)
            }
            DeclKind::Class { body, .. } => self.push_object_decl(
                parent_global,
                parent_scope,
                decl,
                ast,
                id,
                name,
                global_name,
                ObjectKind::Class,
                body,
            ),
            DeclKind::Trait { body, .. } => self.push_object_decl(
                parent_global,
                parent_scope,
                decl,
                ast,
                id,
                name,
                global_name,
                ObjectKind::Trait,
                body,
            ),
            DeclKind::RecordObject { body, .. } => self.push_object_decl(
                parent_global,
                parent_scope,
                decl,
                ast,
                id,
                name,
                global_name,
                ObjectKind::RecordObject,
                body,
            ),
            DeclKind::EnumObject { body, .. } => self.push_object_decl(
                parent_global,
                parent_scope,
                decl,
                ast,
                id,
                name,
                global_name,
                ObjectKind::EnumObject,
                body,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_object_decl(
        &mut self,
        _parent_global: &str,
        parent_scope: ScopeId,
        decl: &'a Decl,
        ast: AstDeclRef,
        id: DeclId,
        name: String,
        global_name: String,
        object_kind: ObjectKind,
        body: &'a [Decl],
    ) -> Option<DeclId> {
        let tag = match object_kind {
            ObjectKind::Class => ScopeTag::Class(id),
            ObjectKind::Trait => ScopeTag::Trait(id),
            ObjectKind::RecordObject => ScopeTag::RecordObject(id),
            ObjectKind::EnumObject => ScopeTag::EnumObject(id),
        };
        let scope = self.scopes.alloc(Some(parent_scope), tag);
        self.alloc_decl(
            id,
            &name,
            global_name.clone(),
            decl,
            ast.clone(),
            scope,
            parent_scope,
            CheckedDeclKind::Object(ObjectDecl {
                object_kind,
                decls: Vec::new(),
            }),
        );
        let pushed = match object_kind {
            ObjectKind::Class => self.scopes.push_class(parent_scope, &name, id),
            ObjectKind::Trait => self.scopes.push_trait(parent_scope, &name, id),
            ObjectKind::RecordObject => self.scopes.push_record_object(parent_scope, &name, id),
            ObjectKind::EnumObject => self.scopes.push_enum_object(parent_scope, &name, id),
        };
        if pushed.is_err() {
            let kind = match object_kind {
                ObjectKind::Class => DiagnosticKind::DuplicateClass,
                ObjectKind::Trait => DiagnosticKind::DuplicateTrait,
                ObjectKind::RecordObject => DiagnosticKind::DuplicateRecordObject,
                ObjectKind::EnumObject => DiagnosticKind::DuplicateEnumObject,
            };
            self.error(decl.location, kind);
            return None;
        }
        let mut children = Vec::with_capacity(body.len());
        for (decl_index, child) in body.iter().enumerate() {
            let mut path = ast.path.clone();
            path.push(decl_index);
            let child_ref = AstDeclRef {
                module: ast.module,
                path,
            };
            if let Some(child_id) = self.push_decl(&global_name, scope, child, child_ref) {
                children.push(child_id);
            }
        }
        self.set_object_children(id, children);
        Some(id)
    }

    fn set_object_children(&mut self, id: DeclId, children: Vec<DeclId>) {
        let decl = self.decls.get_mut(id);
        match &mut decl.kind {
            CheckedDeclKind::Object(object) => object.decls = children,
            _ => unreachable!("set_object_children on a non-object decl"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn alloc_decl(
        &mut self,
        id: DeclId,
        name: &str,
        global_name: String,
        decl: &Decl,
        ast: AstDeclRef,
        scope: ScopeId,
        parent_scope: ScopeId,
        kind: CheckedDeclKind,
    ) {
        let visibility = match &decl.kind {
            DeclKind::Constant { visibility, .. }
            | DeclKind::Fun { visibility, .. }
            | DeclKind::Alias { visibility, .. }
            | DeclKind::Record { visibility, .. }
            | DeclKind::Enum { visibility, .. }
            | DeclKind::Error { visibility, .. }
            | DeclKind::Class { visibility, .. }
            | DeclKind::Trait { visibility, .. }
            | DeclKind::RecordObject { visibility, .. }
            | DeclKind::EnumObject { visibility, .. } => *visibility,
            DeclKind::Module(_) => Visibility::Public,
        };
        self.decls.alloc(CheckedDecl {
            id,
            name: name.to_owned(),
            global_name,
            visibility,
            location: decl.location,
            ast,
            scope,
            parent_scope,
            checked: std::cell::Cell::new(false),
            kind,
        });
    }

    // -- step 2: check declarations -----------------------------------

    fn step2_check_decls(&mut self) {
        let mut ctx = AnalysisContext::new();
        let ids: Vec<DeclId> = self.decls.iter().map(|decl| decl.id).collect();
        for id in ids {
            self.check_decl(&mut ctx, id);
        }
    }

    // -- shared helpers ------------------------------------------------

    pub(crate) fn error(&self, location: Location, kind: DiagnosticKind) {
        self.handler
            .emit_error(self.package_ctx.file, location, kind);
    }

    pub(crate) fn error_with_detail(
        &self,
        location: Location,
        kind: DiagnosticKind,
        detail: impl Into<String>,
    ) {
        self.handler
            .emit_error_with_detail(self.package_ctx.file, location, kind, detail);
    }

    pub(crate) fn warn(&self, location: Location, kind: WarningKind) {
        self.handler
            .emit_warning(self.package_ctx.file, location, kind);
    }

    /// The AST node a checked declaration was created from. `None` for
    /// top-level module shells (their path is empty).
    pub(crate) fn ast_decl(&self, ast: &AstDeclRef) -> Option<&'a Decl> {
        let module = self.package.modules.get(ast.module)?;
        let (&first, rest) = ast.path.split_first()?;
        let mut decl = module.decls.get(first)?;
        for &index in rest {
            decl = match &decl.kind {
                DeclKind::Module(module) => module.decls.get(index)?,
                DeclKind::Class { body, .. }
                | DeclKind::Trait { body, .. }
                | DeclKind::RecordObject { body, .. }
                | DeclKind::EnumObject { body, .. } => body.get(index)?,
                _ => return None,
            };
        }
        Some(decl)
    }

    /// A `Custom` type referring to `decl`, applied to `generics`.
    pub(crate) fn decl_custom_ty(
        &self,
        decl_id: DeclId,
        generics: Option<Vec<Ty>>,
        access_scope: ScopeId,
    ) -> Ty {
        let decl = self.decls.get(decl_id);
        let custom_kind = match &decl.kind {
            CheckedDeclKind::Record(_) => CustomKind::Record,
            CheckedDeclKind::Enum(_) => CustomKind::Enum,
            CheckedDeclKind::Alias(_) => CustomKind::Alias,
            CheckedDeclKind::Error(_) => CustomKind::Error,
            CheckedDeclKind::Object(object) => match object.object_kind {
                ObjectKind::Class => CustomKind::Class,
                ObjectKind::Trait => CustomKind::Trait,
                ObjectKind::RecordObject => CustomKind::Record,
                ObjectKind::EnumObject => CustomKind::Enum,
            },
            _ => CustomKind::Record,
        };
        let is_recursive = match &decl.kind {
            CheckedDeclKind::Record(record) => record.is_recursive.get(),
            CheckedDeclKind::Enum(enum_decl) => enum_decl.is_recursive.get(),
            _ => false,
        };
        Ty::new(TyKind::Custom(CustomTy {
            scope_id: decl.scope,
            access_scope_id: access_scope,
            name: decl.name.clone(),
            global_name: decl.global_name.clone(),
            generics,
            kind: custom_kind,
            is_recursive,
        }))
    }

    /// Make sure a referenced declaration has been checked; guarded against
    /// re-entry by the history chain.
    pub(crate) fn ensure_checked(&mut self, ctx: &mut AnalysisContext, decl_id: DeclId) {
        if !self.decls.get(decl_id).checked.get() && !ctx.in_history(decl_id, None) {
            self.check_decl(ctx, decl_id);
        }
    }

    /// Allocate a compiler-generic slot, recorded on the enclosing
    /// function when there is one.
    pub(crate) fn fresh_compiler_generic(&mut self, scope: ScopeId) -> Ty {
        let name = format!("T{}", self.compiler_generic_counter);
        self.compiler_generic_counter += 1;
        if let Some(fun_id) = self.scopes.get_current_fun(scope) {
            if let Some(fun) = self.decls.get(fun_id).as_fun() {
                fun.used_compiler_generics.borrow_mut().push(name.clone());
            }
        }
        log::trace!("allocate compiler generic `{name}`");
        Ty::new(TyKind::CompilerGeneric(name))
    }

    /// Reconcile `actual` against `expected`, binding unknown cells in
    /// place. `true` means the types agree; `false` means the caller
    /// diagnoses.
    pub(crate) fn unify(&self, expected: &Ty, actual: &Ty) -> bool {
        if expected == actual {
            return true;
        }

        let expected_kind = expected.clone_kind();
        let actual_kind = actual.clone_kind();

        match (&expected_kind, &actual_kind) {
            (TyKind::Mut(inner), _) => return self.unify(inner, actual),
            (_, TyKind::Mut(inner)) => return self.unify(expected, inner),
            (TyKind::Unknown, _) => return expected.update(actual_kind.clone()).is_ok(),
            (_, TyKind::Unknown) => return actual.update(expected_kind.clone()).is_ok(),
            // Compiler generics are reconciled through call-site value
            // sets, not here.
            (TyKind::CompilerGeneric(_), _) | (_, TyKind::CompilerGeneric(_)) => return true,
            (_, TyKind::Never) => return true,
            (TyKind::Any, _) => return true,
            (TyKind::Str(None), TyKind::Str(_)) | (TyKind::Str(_), TyKind::Str(None)) => {
                return true
            }
            (TyKind::Bytes(None), TyKind::Bytes(_)) | (TyKind::Bytes(_), TyKind::Bytes(None)) => {
                return true
            }
            _ => {}
        }

        // Structural descent so nested unknowns still bind.
        match (&expected_kind, &actual_kind) {
            (TyKind::Optional(a), TyKind::Optional(b))
            | (TyKind::List(a), TyKind::List(b))
            | (TyKind::UnsizedArray(a), TyKind::UnsizedArray(b))
            | (TyKind::DynamicArray(a), TyKind::DynamicArray(b))
            | (TyKind::Ptr(a), TyKind::Ptr(b))
            | (TyKind::PtrMut(a), TyKind::PtrMut(b))
            | (TyKind::Ref(a), TyKind::Ref(b))
            | (TyKind::RefMut(a), TyKind::RefMut(b))
            | (TyKind::Trace(a), TyKind::Trace(b))
            | (TyKind::TraceMut(a), TyKind::TraceMut(b)) => self.unify(a, b),
            (TyKind::SizedArray(size_a, a), TyKind::SizedArray(size_b, b)) => {
                size_a == size_b && self.unify(a, b)
            }
            (TyKind::Tuple(items_a), TyKind::Tuple(items_b)) => {
                items_a.len() == items_b.len()
                    && items_a
                        .iter()
                        .zip(items_b.iter())
                        .all(|(a, b)| self.unify(a, b))
            }
            (TyKind::Custom(a), TyKind::Custom(b)) => {
                a.global_name == b.global_name
                    && match (&a.generics, &b.generics) {
                        (Some(generics_a), Some(generics_b)) => {
                            generics_a.len() == generics_b.len()
                                && generics_a
                                    .iter()
                                    .zip(generics_b.iter())
                                    .all(|(a, b)| self.unify(a, b))
                        }
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    /// Resolve a type name from a scope: records, enums, aliases, errors,
    /// objects and generic params are all type namespaces.
    pub(crate) fn resolve_type_name(&self, scope: ScopeId, name: &str) -> SearchResponse {
        let response = self.scopes.search_record(scope, name);
        if !response.is_not_found() {
            return response;
        }
        let response = self.scopes.search_enum(scope, name);
        if !response.is_not_found() {
            return response;
        }
        let response = self.scopes.search_alias(scope, name);
        if !response.is_not_found() {
            return response;
        }
        let response = self.scopes.search_error(scope, name);
        if !response.is_not_found() {
            return response;
        }
        let response = self.scopes.search_class(scope, name);
        if !response.is_not_found() {
            return response;
        }
        let response = self.scopes.search_record_object(scope, name);
        if !response.is_not_found() {
            return response;
        }
        let response = self.scopes.search_enum_object(scope, name);
        if !response.is_not_found() {
            return response;
        }
        let response = self.scopes.search_trait(scope, name);
        if !response.is_not_found() {
            return response;
        }
        self.scopes.search_generic(scope, name)
    }

    /// 2 for bool/result/optional, the variant count for enums, otherwise 1
    /// (a universal wildcard covers the type).
    pub(crate) fn total_cases(&self, ty: &Ty) -> usize {
        let kind = ty.clone_kind();
        match kind {
            TyKind::Bool => 2,
            TyKind::Optional(_) | TyKind::Result { .. } => 2,
            TyKind::Custom(custom) if custom.kind == CustomKind::Enum => {
                match self.scopes.get(custom.scope_id).tag {
                    ScopeTag::Enum(decl_id) => self
                        .decls
                        .get(decl_id)
                        .as_enum()
                        .map(|enum_decl| enum_decl.variants.borrow().len())
                        .unwrap_or(1),
                    _ => 1,
                }
            }
            TyKind::Mut(inner) => self.total_cases(&inner),
            _ => 1,
        }
    }
}
