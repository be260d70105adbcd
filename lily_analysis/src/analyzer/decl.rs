//! Step 2: declaration checking.

use lily_ast::{DataTy, DataTyKind, Decl, DeclKind};
use lily_errors::DiagnosticKind;
use lily_span::{DeclId, Location, ScopeId};
use lily_ty::{CustomKind, CustomTy, GenericMap, Ty, TyKind};
use rustc_hash::FxHashSet;

use crate::checked::{
    CheckedDeclKind, CheckedExpr, CheckedExprKind, CheckedField, CheckedParam, CheckedStmt,
    CheckedStmtKind, CheckedVariant,
};
use crate::context::AnalysisContext;
use crate::operator::{is_valid_operator_name, OperatorEntry};
use crate::scope::{GenericEntry, ParamEntry, ScopeTag, SearchResponse};
use crate::signature::{
    add_fun_signature, add_type_signature, serialize_signature_name, FunSignature, TypeSignature,
};

use super::Analyzer;

impl<'a> Analyzer<'a> {
    pub(crate) fn check_decl(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        if self.decls.get(id).checked.get() || ctx.in_history(id, None) {
            return;
        }
        log::debug!("check decl `{}`", self.decls.get(id).global_name);
        match &self.decls.get(id).kind {
            CheckedDeclKind::Constant(_) => self.check_constant(ctx, id),
            CheckedDeclKind::Fun(_) => self.check_fun(ctx, id),
            CheckedDeclKind::Module(_) => self.check_module(ctx, id),
            CheckedDeclKind::Alias(_) => self.check_alias(ctx, id),
            CheckedDeclKind::Record(_) => self.check_record(ctx, id),
            CheckedDeclKind::Enum(_) => self.check_enum(ctx, id),
            CheckedDeclKind::Error(_) => self.check_error(ctx, id),
            CheckedDeclKind::Object(_) => self.check_object(ctx, id),
        }
    }

    fn check_module(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        ctx.enter(id, None);
        let children = match &self.decls.get(id).kind {
            CheckedDeclKind::Module(module) => module.decls.clone(),
            _ => Vec::new(),
        };
        for child in children {
            self.check_decl(ctx, child);
        }
        self.decls.get(id).checked.set(true);
        ctx.leave(id);
    }

    fn check_object(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        ctx.enter(id, None);
        let children = match &self.decls.get(id).kind {
            CheckedDeclKind::Object(object) => object.decls.clone(),
            _ => Vec::new(),
        };
        for child in children {
            self.check_decl(ctx, child);
        }
        self.decls.get(id).checked.set(true);
        ctx.leave(id);
    }

    fn check_constant(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        ctx.enter(id, None);
        let (parent_scope, location, ast_ref) = {
            let decl = self.decls.get(id);
            (decl.parent_scope, decl.location, decl.ast.clone())
        };
        let Some(Decl {
            kind: DeclKind::Constant { ty, value, .. },
            ..
        }) = self.ast_decl(&ast_ref)
        else {
            ctx.leave(id);
            return;
        };

        let declared = match ty {
            Some(data_ty) => self.check_data_ty(ctx, parent_scope, data_ty),
            None => Ty::new(TyKind::Unknown),
        };
        let defined = if declared.is_unknown() {
            None
        } else {
            Some(declared.clone())
        };
        let checked_value = self.check_expr(ctx, parent_scope, value, defined.as_ref());

        if declared.is_unknown() {
            let _ = declared.update(checked_value.ty.clone_kind());
        } else if !self.unify(&declared, &checked_value.ty) {
            self.error(location, DiagnosticKind::DataTypeDontMatch);
        }

        if let Some(constant) = self.decls.get(id).as_constant() {
            *constant.ty.borrow_mut() = declared.clone();
            *constant.value.borrow_mut() = Some(checked_value);
        }
        declared.lock();
        self.decls.get(id).checked.set(true);
        ctx.leave(id);
    }

    fn check_alias(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        ctx.enter(id, None);
        let (scope, location, ast_ref, generic_params) = {
            let decl = self.decls.get(id);
            let generic_params = decl
                .as_alias()
                .map(|alias| alias.generic_params.clone())
                .unwrap_or_default();
            (decl.scope, decl.location, decl.ast.clone(), generic_params)
        };
        self.push_generic_params(scope, &generic_params, location);

        let Some(Decl {
            kind: DeclKind::Alias { ty, .. },
            ..
        }) = self.ast_decl(&ast_ref)
        else {
            ctx.leave(id);
            return;
        };

        let previous_alias = ctx.alias_decl.replace(id);
        let aliased = self.check_data_ty(ctx, scope, ty);
        ctx.alias_decl = previous_alias;

        for generic_param in &generic_params {
            if !ty_uses_generic(&aliased, generic_param) {
                self.error(location, DiagnosticKind::AliasGenericParamsMismatch);
            }
        }

        if let Some(alias) = self.decls.get(id).as_alias() {
            *alias.ty.borrow_mut() = aliased.clone();
        }
        aliased.lock();
        self.decls.get(id).checked.set(true);
        ctx.leave(id);
    }

    fn check_record(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        ctx.enter(id, None);
        let (scope, location, global_name, ast_ref, generic_params) = {
            let decl = self.decls.get(id);
            let generic_params = decl
                .as_record()
                .map(|record| record.generic_params.clone())
                .unwrap_or_default();
            (
                decl.scope,
                decl.location,
                decl.global_name.clone(),
                decl.ast.clone(),
                generic_params,
            )
        };
        self.push_generic_params(scope, &generic_params, location);

        let Some(Decl {
            kind: DeclKind::Record { fields, .. },
            ..
        }) = self.ast_decl(&ast_ref)
        else {
            ctx.leave(id);
            return;
        };

        // The original (identity) type signature.
        if let Some(record) = self.decls.get(id).as_record() {
            add_type_signature(
                &mut record.signatures.borrow_mut(),
                TypeSignature::new(global_name.clone(), GenericMap::new()),
            );
        }

        let mut checked_fields: Vec<CheckedField> = Vec::with_capacity(fields.len());
        for field in fields {
            if checked_fields.iter().any(|f| f.name == field.name) {
                self.error(field.location, DiagnosticKind::DuplicateField);
                continue;
            }
            let ty = self.check_data_ty(ctx, scope, &field.ty);
            checked_fields.push(CheckedField {
                name: field.name.clone(),
                ty,
                mutable: field.mutable,
                location: field.location,
            });
        }
        if let Some(record) = self.decls.get(id).as_record() {
            *record.fields.borrow_mut() = checked_fields.clone();
        }

        // Infinite containment is only detectable once every field type is
        // in place.
        let mut visited = FxHashSet::default();
        for field in &checked_fields {
            self.detect_infinite(id, &field.ty, true, &mut visited, field.location);
            field.ty.lock();
        }

        self.decls.get(id).checked.set(true);
        ctx.leave(id);
    }

    fn check_enum(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        ctx.enter(id, None);
        let (scope, location, global_name, ast_ref, generic_params) = {
            let decl = self.decls.get(id);
            let generic_params = decl
                .as_enum()
                .map(|enum_decl| enum_decl.generic_params.clone())
                .unwrap_or_default();
            (
                decl.scope,
                decl.location,
                decl.global_name.clone(),
                decl.ast.clone(),
                generic_params,
            )
        };
        self.push_generic_params(scope, &generic_params, location);

        let Some(Decl {
            kind: DeclKind::Enum { variants, .. },
            ..
        }) = self.ast_decl(&ast_ref)
        else {
            ctx.leave(id);
            return;
        };

        if let Some(enum_decl) = self.decls.get(id).as_enum() {
            add_type_signature(
                &mut enum_decl.signatures.borrow_mut(),
                TypeSignature::new(global_name.clone(), GenericMap::new()),
            );
        }

        let mut checked_variants: Vec<CheckedVariant> = Vec::with_capacity(variants.len());
        for variant in variants {
            let values = variant
                .values
                .iter()
                .map(|value| self.check_data_ty(ctx, scope, value))
                .collect();
            checked_variants.push(CheckedVariant {
                name: variant.name.clone(),
                values,
                location: variant.location,
            });
        }
        if let Some(enum_decl) = self.decls.get(id).as_enum() {
            *enum_decl.variants.borrow_mut() = checked_variants.clone();
        }

        let mut visited = FxHashSet::default();
        for variant in &checked_variants {
            for value in &variant.values {
                self.detect_infinite(id, value, true, &mut visited, variant.location);
                value.lock();
            }
        }

        self.decls.get(id).checked.set(true);
        ctx.leave(id);
    }

    fn check_error(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        ctx.enter(id, None);
        let (scope, location, ast_ref, generic_params) = {
            let decl = self.decls.get(id);
            let generic_params = decl
                .as_error()
                .map(|error| error.generic_params.clone())
                .unwrap_or_default();
            (decl.scope, decl.location, decl.ast.clone(), generic_params)
        };
        self.push_generic_params(scope, &generic_params, location);

        let Some(Decl {
            kind: DeclKind::Error { fields, .. },
            ..
        }) = self.ast_decl(&ast_ref)
        else {
            ctx.leave(id);
            return;
        };

        let mut checked_fields: Vec<CheckedField> = Vec::with_capacity(fields.len());
        for field in fields {
            if checked_fields.iter().any(|f| f.name == field.name) {
                self.error(field.location, DiagnosticKind::DuplicateField);
                continue;
            }
            let ty = self.check_data_ty(ctx, scope, &field.ty);
            checked_fields.push(CheckedField {
                name: field.name.clone(),
                ty,
                mutable: field.mutable,
                location: field.location,
            });
        }
        let mut visited = FxHashSet::default();
        for field in &checked_fields {
            self.detect_infinite(id, &field.ty, true, &mut visited, field.location);
            field.ty.lock();
        }
        if let Some(error) = self.decls.get(id).as_error() {
            *error.fields.borrow_mut() = checked_fields;
        }

        self.decls.get(id).checked.set(true);
        ctx.leave(id);
    }

    pub(crate) fn check_fun(&mut self, ctx: &mut AnalysisContext, id: DeclId) {
        ctx.enter(id, None);
        let (scope, location, name, global_name, ast_ref, is_operator, is_main, generic_params) = {
            let decl = self.decls.get(id);
            let fun = decl.as_fun().expect("check_fun on a non-fun decl");
            (
                decl.scope,
                decl.location,
                decl.name.clone(),
                decl.global_name.clone(),
                decl.ast.clone(),
                fun.is_operator,
                fun.is_main,
                fun.generic_params.clone(),
            )
        };
        let Some(Decl {
            kind:
                DeclKind::Fun {
                    params: ast_params,
                    return_ty: ast_return_ty,
                    body: ast_body,
                    ..
                },
            ..
        }) = self.ast_decl(&ast_ref)
        else {
            ctx.leave(id);
            return;
        };

        if is_main {
            self.package_ctx.main_is_found = true;
            if !generic_params.is_empty() {
                self.error(location, DiagnosticKind::GenericParamsNotExpectedInMain);
            }
            if !ast_params.is_empty() {
                self.error(location, DiagnosticKind::NoExplicitParamsExpectedInMain);
            }
            if let Some(return_ty) = ast_return_ty {
                if !matches!(
                    return_ty.kind,
                    DataTyKind::Unit | DataTyKind::CVoid | DataTyKind::Int32
                ) {
                    self.error(
                        return_ty.location,
                        DiagnosticKind::ThisReturnDataTypeIsNotExpectedForAMainFunction,
                    );
                }
            }
        }

        if is_operator && !is_valid_operator_name(&name) {
            self.error(location, DiagnosticKind::OperatorIsNotValid);
        }
        if is_operator && ast_return_ty.is_none() {
            self.error(location, DiagnosticKind::OperatorMustHaveReturnDataType);
        }

        self.push_generic_params(scope, &generic_params, location);

        let mut checked_params: Vec<CheckedParam> = Vec::with_capacity(ast_params.len());
        for (index, param) in ast_params.iter().enumerate() {
            let ty = match &param.ty {
                Some(data_ty) => self.check_data_ty(ctx, scope, data_ty),
                None => {
                    if is_operator {
                        self.error(
                            param.location,
                            DiagnosticKind::OperatorCannotHaveCompilerDefinedDataTypeAsParameter,
                        );
                    }
                    Ty::new(TyKind::Unknown)
                }
            };
            if self
                .scopes
                .push_fun_param(
                    scope,
                    &param.name,
                    ParamEntry {
                        index,
                        ty: ty.clone(),
                        mutable: param.mutable,
                    },
                )
                .is_err()
            {
                self.error(param.location, DiagnosticKind::DuplicateParamName);
                continue;
            }
            checked_params.push(CheckedParam {
                name: param.name.clone(),
                ty,
                mutable: param.mutable,
                location: param.location,
            });
        }

        let return_ty = match ast_return_ty {
            Some(data_ty) => self.check_data_ty(ctx, scope, data_ty),
            None if is_main => Ty::new(TyKind::Unit),
            None => Ty::new(TyKind::Unknown),
        };

        // The original signature goes in before the body so recursive calls
        // resolve against it.
        {
            let decl = self.decls.get(id);
            let fun = decl.as_fun().expect("fun decl");
            *fun.params.borrow_mut() = checked_params.clone();
            *fun.return_ty.borrow_mut() = return_ty.clone();
            let mut types: Vec<Ty> = checked_params.iter().map(|p| p.ty.clone()).collect();
            types.push(return_ty.clone());
            add_fun_signature(
                &mut fun.signatures.borrow_mut(),
                FunSignature::new(global_name.clone(), types, None),
            );
        }

        let body = self.check_fun_body(ctx, scope, ast_body, &return_ty, is_main);

        // No return left anywhere: the function yields unit.
        if return_ty.is_unknown() {
            let _ = return_ty.update(TyKind::Unit);
        }

        if is_operator && is_valid_operator_name(&name) {
            let entry = OperatorEntry {
                name: name.clone(),
                param_tys: checked_params.iter().map(|p| p.ty.clone()).collect(),
                ret_ty: return_ty.clone(),
            };
            if self.operators.add(entry).is_err() {
                self.error(location, DiagnosticKind::DuplicateOperator);
            }
        }

        {
            let decl = self.decls.get(id);
            let fun = decl.as_fun().expect("fun decl");
            *fun.body.borrow_mut() = body;
            // Compiler-generic slots landed in the signature types; refresh
            // the original signature's mangled name.
            if !fun.used_compiler_generics.borrow().is_empty() {
                let mut signatures = fun.signatures.borrow_mut();
                if let Some(first) = signatures.first_mut() {
                    first.serial_name =
                        serialize_signature_name(&first.global_name, &first.types);
                }
            }
        }

        self.lock_fun(id);
        self.decls.get(id).checked.set(true);
        ctx.leave(id);
    }

    fn push_generic_params(&mut self, scope: ScopeId, generic_params: &[String], location: Location) {
        for (index, name) in generic_params.iter().enumerate() {
            let ty = Ty::new(TyKind::Custom(CustomTy {
                scope_id: scope,
                access_scope_id: scope,
                name: name.clone(),
                global_name: name.clone(),
                generics: None,
                kind: CustomKind::Generic,
                is_recursive: false,
            }));
            if self
                .scopes
                .push_generic(scope, name, GenericEntry { index, ty })
                .is_err()
            {
                self.error(location, DiagnosticKind::DuplicateGenericParam);
            }
        }
    }

    // -- data types ----------------------------------------------------

    pub(crate) fn check_data_ty(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        data_ty: &DataTy,
    ) -> Ty {
        let location = data_ty.location;
        let kind = match &data_ty.kind {
            DataTyKind::Bool => TyKind::Bool,
            DataTyKind::Byte => TyKind::Byte,
            DataTyKind::Char => TyKind::Char,
            DataTyKind::Int8 => TyKind::Int8,
            DataTyKind::Int16 => TyKind::Int16,
            DataTyKind::Int32 => TyKind::Int32,
            DataTyKind::Int64 => TyKind::Int64,
            DataTyKind::Isize => TyKind::Isize,
            DataTyKind::Uint8 => TyKind::Uint8,
            DataTyKind::Uint16 => TyKind::Uint16,
            DataTyKind::Uint32 => TyKind::Uint32,
            DataTyKind::Uint64 => TyKind::Uint64,
            DataTyKind::Usize => TyKind::Usize,
            DataTyKind::Float32 => TyKind::Float32,
            DataTyKind::Float64 => TyKind::Float64,
            DataTyKind::Unit => TyKind::Unit,
            DataTyKind::Never => TyKind::Never,
            DataTyKind::Any => {
                if !self.scopes.is_unsafe(scope) {
                    self.error(location, DiagnosticKind::CannotUseAnyInSafeMode);
                }
                TyKind::Any
            }
            DataTyKind::CChar => TyKind::CChar,
            DataTyKind::CShort => TyKind::CShort,
            DataTyKind::CInt => TyKind::CInt,
            DataTyKind::CLong => TyKind::CLong,
            DataTyKind::CLongLong => TyKind::CLongLong,
            DataTyKind::CFloat => TyKind::CFloat,
            DataTyKind::CDouble => TyKind::CDouble,
            DataTyKind::CVoid => TyKind::CVoid,
            DataTyKind::Str => TyKind::Str(None),
            DataTyKind::Bytes => TyKind::Bytes(None),
            DataTyKind::CStr => TyKind::CStr,
            DataTyKind::SizedArray(size, inner) => {
                TyKind::SizedArray(*size, self.check_data_ty(ctx, scope, inner))
            }
            DataTyKind::UnsizedArray(inner) => {
                TyKind::UnsizedArray(self.check_data_ty(ctx, scope, inner))
            }
            DataTyKind::DynamicArray(inner) => {
                TyKind::DynamicArray(self.check_data_ty(ctx, scope, inner))
            }
            DataTyKind::List(inner) => TyKind::List(self.check_data_ty(ctx, scope, inner)),
            DataTyKind::Tuple(items) => TyKind::Tuple(
                items
                    .iter()
                    .map(|item| self.check_data_ty(ctx, scope, item))
                    .collect(),
            ),
            DataTyKind::Optional(inner) => {
                TyKind::Optional(self.check_data_ty(ctx, scope, inner))
            }
            DataTyKind::Result { ok, errs } => TyKind::Result {
                ok: self.check_data_ty(ctx, scope, ok),
                errs: errs
                    .iter()
                    .map(|err| self.check_data_ty(ctx, scope, err))
                    .collect(),
            },
            DataTyKind::Ptr(inner) => TyKind::Ptr(self.check_data_ty(ctx, scope, inner)),
            DataTyKind::PtrMut(inner) => TyKind::PtrMut(self.check_data_ty(ctx, scope, inner)),
            DataTyKind::Ref(inner) => TyKind::Ref(self.check_data_ty(ctx, scope, inner)),
            DataTyKind::RefMut(inner) => TyKind::RefMut(self.check_data_ty(ctx, scope, inner)),
            DataTyKind::Trace(inner) => TyKind::Trace(self.check_data_ty(ctx, scope, inner)),
            DataTyKind::TraceMut(inner) => {
                TyKind::TraceMut(self.check_data_ty(ctx, scope, inner))
            }
            DataTyKind::Mut(inner) => TyKind::Mut(self.check_data_ty(ctx, scope, inner)),
            DataTyKind::Custom { path, generics } => {
                return self.check_custom_data_ty(ctx, scope, path, generics.as_deref(), location)
            }
            DataTyKind::Lambda { .. } => {
                self.error(location, DiagnosticKind::Unsupported("lambda data type"));
                TyKind::Unknown
            }
        };
        Ty::with_location(kind, location)
    }

    fn check_custom_data_ty(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        path: &lily_ast::AstPath,
        generics: Option<&[DataTy]>,
        location: Location,
    ) -> Ty {
        let name = path.last();
        let response = self.resolve_type_name(scope, name);
        let decl_id = match response {
            SearchResponse::Record { decl }
            | SearchResponse::Enum { decl }
            | SearchResponse::Alias { decl }
            | SearchResponse::Error { decl }
            | SearchResponse::Class { decl }
            | SearchResponse::Trait { decl }
            | SearchResponse::RecordObject { decl }
            | SearchResponse::EnumObject { decl } => decl,
            SearchResponse::Generic { ty, .. } => return ty,
            _ => {
                self.error(location, DiagnosticKind::UnknownIdentifier(name.to_owned()));
                return Ty::with_location(TyKind::Unknown, location);
            }
        };

        let checked_generics = generics.map(|generics| {
            generics
                .iter()
                .map(|generic| self.check_data_ty(ctx, scope, generic))
                .collect::<Vec<_>>()
        });

        // A concrete application allocates (or reuses) a type signature on
        // the declaration.
        if let Some(args) = &checked_generics {
            let decl = self.decls.get(decl_id);
            let (params, signatures) = match &decl.kind {
                CheckedDeclKind::Record(record) => {
                    (record.generic_params.clone(), Some(&record.signatures))
                }
                CheckedDeclKind::Enum(enum_decl) => {
                    (enum_decl.generic_params.clone(), Some(&enum_decl.signatures))
                }
                CheckedDeclKind::Error(error) => {
                    (error.generic_params.clone(), Some(&error.signatures))
                }
                CheckedDeclKind::Alias(alias) => {
                    (alias.generic_params.clone(), None)
                }
                _ => (Vec::new(), None),
            };
            if params.len() != args.len() {
                self.error(location, DiagnosticKind::NumberOfGenericParamsMismatched);
            } else if let Some(signatures) = signatures {
                let map: GenericMap = params.into_iter().zip(args.iter().cloned()).collect();
                add_type_signature(
                    &mut signatures.borrow_mut(),
                    TypeSignature::new(decl.global_name.clone(), map),
                );
            }
        }

        self.decl_custom_ty(decl_id, checked_generics, scope)
    }

    // -- infinite data types -------------------------------------------

    /// Walk a field/variant type looking for direct containment of the
    /// declaration being checked. Indirected self-references mark the
    /// declaration recursive instead.
    fn detect_infinite(
        &mut self,
        self_decl: DeclId,
        ty: &Ty,
        direct: bool,
        visited: &mut FxHashSet<DeclId>,
        location: Location,
    ) {
        let kind = ty.clone_kind();
        match kind {
            TyKind::Custom(custom)
                if matches!(
                    custom.kind,
                    CustomKind::Record | CustomKind::Enum | CustomKind::Error
                ) =>
            {
                let Some(target) = self.decl_of_scope(custom.scope_id) else {
                    return;
                };
                if target == self_decl {
                    if direct {
                        self.error(location, DiagnosticKind::InfiniteDataType);
                    } else {
                        self.mark_recursive(self_decl);
                        if !custom.is_recursive {
                            let _ = ty.update(TyKind::Custom(CustomTy {
                                is_recursive: true,
                                ..custom
                            }));
                        }
                    }
                    return;
                }
                if direct && visited.insert(target) {
                    // Transitive direct containment: A { B } where
                    // B { A } is as infinite as A { A }.
                    let field_tys: Vec<(Ty, Location)> = match &self.decls.get(target).kind {
                        CheckedDeclKind::Record(record) => record
                            .fields
                            .borrow()
                            .iter()
                            .map(|field| (field.ty.clone(), field.location))
                            .collect(),
                        CheckedDeclKind::Enum(enum_decl) => enum_decl
                            .variants
                            .borrow()
                            .iter()
                            .flat_map(|variant| {
                                variant
                                    .values
                                    .iter()
                                    .map(|value| (value.clone(), variant.location))
                                    .collect::<Vec<_>>()
                            })
                            .collect(),
                        CheckedDeclKind::Error(error) => error
                            .fields
                            .borrow()
                            .iter()
                            .map(|field| (field.ty.clone(), field.location))
                            .collect(),
                        _ => Vec::new(),
                    };
                    for (field_ty, _field_location) in field_tys {
                        self.detect_infinite(self_decl, &field_ty, true, visited, location);
                    }
                }
            }
            TyKind::Mut(inner) => self.detect_infinite(self_decl, &inner, direct, visited, location),
            TyKind::SizedArray(_, inner)
            | TyKind::UnsizedArray(inner)
            | TyKind::DynamicArray(inner)
            | TyKind::List(inner)
            | TyKind::Optional(inner)
            | TyKind::Ptr(inner)
            | TyKind::PtrMut(inner)
            | TyKind::Ref(inner)
            | TyKind::RefMut(inner)
            | TyKind::Trace(inner)
            | TyKind::TraceMut(inner) => {
                self.detect_infinite(self_decl, &inner, false, visited, location);
            }
            TyKind::Tuple(items) => {
                for item in items {
                    self.detect_infinite(self_decl, &item, false, visited, location);
                }
            }
            TyKind::Result { ok, errs } => {
                self.detect_infinite(self_decl, &ok, false, visited, location);
                for err in errs {
                    self.detect_infinite(self_decl, &err, false, visited, location);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn decl_of_scope(&self, scope: ScopeId) -> Option<DeclId> {
        match self.scopes.get(scope).tag {
            ScopeTag::Module(decl)
            | ScopeTag::Constant(decl)
            | ScopeTag::Fun(decl)
            | ScopeTag::Record(decl)
            | ScopeTag::Enum(decl)
            | ScopeTag::Alias(decl)
            | ScopeTag::Error(decl)
            | ScopeTag::Class(decl)
            | ScopeTag::Trait(decl)
            | ScopeTag::RecordObject(decl)
            | ScopeTag::EnumObject(decl) => Some(decl),
            _ => None,
        }
    }

    fn mark_recursive(&self, id: DeclId) {
        match &self.decls.get(id).kind {
            CheckedDeclKind::Record(record) => record.is_recursive.set(true),
            CheckedDeclKind::Enum(enum_decl) => enum_decl.is_recursive.set(true),
            _ => {}
        }
    }

    // -- locking -------------------------------------------------------

    fn lock_fun(&self, id: DeclId) {
        let decl = self.decls.get(id);
        let Some(fun) = decl.as_fun() else { return };
        for param in fun.params.borrow().iter() {
            param.ty.lock();
        }
        fun.return_ty.borrow().lock();
        for raise in fun.raises.borrow().iter() {
            raise.lock();
        }
        for signature in fun.signatures.borrow().iter() {
            for ty in &signature.types {
                ty.lock();
            }
        }
        for stmt in fun.body.borrow().iter() {
            lock_stmt_tys(stmt);
        }
    }
}

fn ty_uses_generic(ty: &Ty, name: &str) -> bool {
    let kind = ty.clone_kind();
    match &kind {
        TyKind::CompilerGeneric(generic) => generic == name,
        TyKind::Custom(custom) => {
            (custom.kind == CustomKind::Generic && custom.name == name)
                || custom
                    .generics
                    .as_ref()
                    .map_or(false, |generics| generics.iter().any(|g| ty_uses_generic(g, name)))
        }
        other => {
            let mut found = false;
            other.for_each_child(|child| found |= ty_uses_generic(child, name));
            found
        }
    }
}

pub(crate) fn lock_stmt_tys(stmt: &CheckedStmt) {
    match &stmt.kind {
        CheckedStmtKind::Block { stmts, .. } | CheckedStmtKind::Unsafe { body: stmts, .. } => {
            stmts.iter().for_each(lock_stmt_tys);
        }
        CheckedStmtKind::If { branches, else_ } => {
            for (cond, _, body) in branches {
                lock_expr_tys(cond);
                body.iter().for_each(lock_stmt_tys);
            }
            if let Some((_, body)) = else_ {
                body.iter().for_each(lock_stmt_tys);
            }
        }
        CheckedStmtKind::While { cond, body, .. } => {
            lock_expr_tys(cond);
            body.iter().for_each(lock_stmt_tys);
        }
        CheckedStmtKind::For {
            captures,
            iterable,
            body,
            ..
        } => {
            for (_, ty) in captures {
                ty.lock();
            }
            lock_expr_tys(iterable);
            body.iter().for_each(lock_stmt_tys);
        }
        CheckedStmtKind::Match(checked_match) => {
            lock_expr_tys(&checked_match.scrutinee);
            for case in &checked_match.cases {
                case.pattern.ty.lock();
                for (_, ty) in &case.captures {
                    ty.lock();
                }
                if let Some(guard) = &case.guard {
                    lock_expr_tys(guard);
                }
                case.body.iter().for_each(lock_stmt_tys);
            }
        }
        CheckedStmtKind::Switch(checked_switch) => {
            lock_expr_tys(&checked_switch.scrutinee);
            for case in &checked_switch.cases {
                lock_expr_tys(&case.predicate);
                case.body.iter().for_each(lock_stmt_tys);
            }
            if let Some((_, body)) = &checked_switch.else_case {
                body.iter().for_each(lock_stmt_tys);
            }
        }
        CheckedStmtKind::Try {
            body,
            catch,
            raises,
            ..
        } => {
            body.iter().for_each(lock_stmt_tys);
            if let Some((_, _, catch_body)) = catch {
                catch_body.iter().for_each(lock_stmt_tys);
            }
            for raise in raises {
                raise.lock();
            }
        }
        CheckedStmtKind::Defer(inner) => lock_stmt_tys(inner),
        CheckedStmtKind::Drop(expr) => lock_expr_tys(expr),
        CheckedStmtKind::Raise { error_ty, values } => {
            error_ty.lock();
            values.iter().for_each(lock_expr_tys);
        }
        CheckedStmtKind::Return { expr, .. } => {
            if let Some(expr) = expr {
                lock_expr_tys(expr);
            }
        }
        CheckedStmtKind::Variable { ty, value, .. } => {
            ty.lock();
            lock_expr_tys(value);
        }
        CheckedStmtKind::Expr(expr) => lock_expr_tys(expr),
        CheckedStmtKind::Break | CheckedStmtKind::Next => {}
    }
}

pub(crate) fn lock_expr_tys(expr: &CheckedExpr) {
    expr.ty.lock();
    match &expr.kind {
        CheckedExprKind::Binary { lhs, rhs, .. } => {
            lock_expr_tys(lhs);
            lock_expr_tys(rhs);
        }
        CheckedExprKind::Unary { rhs, .. } => lock_expr_tys(rhs),
        CheckedExprKind::Array(items)
        | CheckedExprKind::List(items)
        | CheckedExprKind::Tuple(items) => items.iter().for_each(lock_expr_tys),
        CheckedExprKind::Cast { expr, .. } => lock_expr_tys(expr),
        CheckedExprKind::Grouping(inner) => lock_expr_tys(inner),
        CheckedExprKind::Path { head, segments } => {
            lock_expr_tys(head);
            for segment in segments {
                segment.ty.lock();
            }
        }
        CheckedExprKind::Call(call) => match call {
            crate::checked::CheckedCall::Fun { args, .. }
            | crate::checked::CheckedCall::Builtin { args, .. }
            | crate::checked::CheckedCall::Sys { args, .. } => {
                args.iter().for_each(lock_expr_tys);
            }
            crate::checked::CheckedCall::Record { fields, .. } => {
                fields.iter().for_each(|(_, field)| lock_expr_tys(field));
            }
            crate::checked::CheckedCall::VariantCall { values, .. } => {
                values.iter().for_each(lock_expr_tys);
            }
            crate::checked::CheckedCall::Len { arg } => lock_expr_tys(arg),
            _ => {}
        },
        CheckedExprKind::Literal(_) | CheckedExprKind::Wildcard | CheckedExprKind::Unknown => {}
    }
}
