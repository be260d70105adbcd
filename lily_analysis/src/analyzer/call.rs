//! Call checking: functions, records, variants, builtins, sys and `len`.
//!
//! Calls drive monomorphization: a call with a novel combination of
//! generic arguments adds a signature to the callee, and a signature that
//! binds compiler generics triggers re-analysis of the callee body against
//! signature-specific types.

use lily_ast::{AstPath, DataTy, Expr, ExprKind, Literal};
use lily_errors::DiagnosticKind;
use lily_span::{DeclId, Location, ScopeId};
use lily_ty::{CustomKind, GenericMap, Ty, TyKind};

use crate::builtin;
use crate::checked::{CheckedCall, CheckedExpr, CheckedExprKind, CheckedLiteral};
use crate::context::AnalysisContext;
use crate::scope::SearchResponse;
use crate::signature::{add_fun_signature, add_type_signature, FunSignature, TypeSignature};
use crate::sys;

use super::Analyzer;

impl<'a> Analyzer<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn check_fun_call(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &AstPath,
        generic_args: Option<&[DataTy]>,
        args: &[Expr],
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        let Some(decl_id) = self.resolve_fun_path(scope, name, location) else {
            return CheckedExpr::unknown(location);
        };

        if self
            .decls
            .get(decl_id)
            .as_fun()
            .map(|fun| fun.is_main)
            .unwrap_or(false)
        {
            let kind = if self.scopes.get_current_fun(scope) == Some(decl_id) {
                DiagnosticKind::MainFunctionCannotBeRecursive
            } else {
                DiagnosticKind::MainFunctionIsNotCallable
            };
            self.error(location, kind);
            return CheckedExpr::unknown(location);
        }

        self.ensure_checked(ctx, decl_id);
        self.record_dep(scope, decl_id);

        let (global_name, params, return_ty, generic_params) = {
            let decl = self.decls.get(decl_id);
            let fun = match decl.as_fun() {
                Some(fun) => fun,
                None => {
                    self.error(location, DiagnosticKind::ExpectedFunCall);
                    return CheckedExpr::unknown(location);
                }
            };
            (
                decl.global_name.clone(),
                fun.params.borrow().clone(),
                fun.return_ty.borrow().clone(),
                fun.generic_params.clone(),
            )
        };

        // Explicit generic arguments, or an empty map filled by inference.
        let mut generic_map = GenericMap::new();
        if let Some(explicit) = generic_args {
            if explicit.len() != generic_params.len() {
                self.error(location, DiagnosticKind::NumberOfGenericParamsMismatched);
            } else {
                for (param, arg) in generic_params.iter().zip(explicit.iter()) {
                    let ty = self.check_data_ty(ctx, scope, arg);
                    generic_map.insert(param.clone(), ty);
                }
            }
        }

        if args.len() > params.len() {
            self.error(location, DiagnosticKind::TooManyParams);
        } else if args.len() < params.len() {
            self.error(location, DiagnosticKind::NumberOfParamsMismatched);
        }

        // Per-parameter checking; compiler-generic slots unify through a
        // per-name value set so a reused slot cannot contradict an earlier
        // binding.
        let mut compiler_bindings = GenericMap::new();
        let mut checked_args = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            match params.get(index) {
                Some(param) => {
                    let formal = param.ty.resolve_generic(&generic_map);
                    if formal.contains_generic() {
                        let checked = self.check_expr(ctx, scope, arg, None);
                        self.unify_call_generics(
                            &param.ty,
                            &checked.ty,
                            &mut generic_map,
                            &mut compiler_bindings,
                            checked.location,
                        );
                        checked_args.push(checked);
                    } else {
                        let checked = self.check_expr(ctx, scope, arg, Some(&formal));
                        if !self.unify(&formal, &checked.ty) {
                            self.error(checked.location, DiagnosticKind::DataTypeDontMatch);
                        }
                        checked_args.push(checked);
                    }
                }
                None => {
                    checked_args.push(self.check_expr(ctx, scope, arg, None));
                }
            }
        }

        // The concrete return type, possibly via conditional
        // compiler-choice dispatch.
        let mut ret = return_ty
            .resolve_generic(&generic_map)
            .resolve_generic(&compiler_bindings);
        if let TyKind::ConditionalCompilerChoice(choice) = ret.clone_kind() {
            let arg_tys: Vec<Ty> = checked_args.iter().map(|arg| arg.ty.clone()).collect();
            match choice.lookup(&arg_tys) {
                Some(resolved) => ret = resolved,
                None => {
                    self.error(location, DiagnosticKind::ImpossibleToGetReturnDataType);
                    ret = Ty::with_location(TyKind::Unknown, location);
                }
            }
        }
        if ret.is_unknown() {
            if let Some(expected) = defined {
                let _ = ret.update(expected.clone_kind());
            }
        }

        // A novel signature is appended and, when compiler generics were
        // bound, the body is re-analyzed against it; otherwise the existing
        // one is reused.
        let mut full_map = generic_map.clone();
        for (name, ty) in &compiler_bindings {
            full_map.insert(name.clone(), ty.clone());
        }
        if !full_map.is_empty() {
            let mut types: Vec<Ty> = params
                .iter()
                .map(|param| {
                    param
                        .ty
                        .resolve_generic(&generic_map)
                        .resolve_generic(&compiler_bindings)
                })
                .collect();
            types.push(ret.clone());
            let signature = FunSignature::new(global_name.clone(), types, Some(full_map.clone()));
            let serial_name = signature.serial_name.clone();
            let added = {
                let decl = self.decls.get(decl_id);
                let fun = decl.as_fun().expect("fun decl");
                let mut signatures = fun.signatures.borrow_mut();
                add_fun_signature(&mut signatures, signature)
            };
            if added && !compiler_bindings.is_empty() {
                self.reanalyze_fun_signature(ctx, decl_id, &serial_name);
            }
        }

        CheckedExpr::new(
            CheckedExprKind::Call(CheckedCall::Fun {
                decl: decl_id,
                global_name,
                args: checked_args,
                generic_map: if full_map.is_empty() {
                    None
                } else {
                    Some(full_map)
                },
            }),
            ret,
            location,
        )
    }

    fn resolve_fun_path(
        &mut self,
        scope: ScopeId,
        name: &AstPath,
        location: Location,
    ) -> Option<DeclId> {
        if name.is_single() {
            return match self.scopes.search_identifier(scope, name.head()) {
                SearchResponse::Fun { decl } => Some(decl),
                SearchResponse::NotFound => {
                    self.error(
                        location,
                        DiagnosticKind::UnknownIdentifier(name.head().to_owned()),
                    );
                    None
                }
                _ => {
                    self.error(location, DiagnosticKind::ExpectedFunCall);
                    None
                }
            };
        }

        // `module.fun` or deeper: descend module scopes.
        let mut current_scope = scope;
        for (index, segment) in name.segments.iter().enumerate() {
            let is_last = index + 1 == name.segments.len();
            match self.scopes.search_identifier(current_scope, segment) {
                SearchResponse::Module { decl } if !is_last => {
                    current_scope = self.decls.get(decl).scope;
                }
                SearchResponse::Fun { decl } if is_last => return Some(decl),
                SearchResponse::NotFound => {
                    self.error(location, DiagnosticKind::UnknownIdentifier(segment.clone()));
                    return None;
                }
                _ => {
                    self.error(location, DiagnosticKind::ExpectedFunCall);
                    return None;
                }
            }
        }
        None
    }

    /// The caller's enclosing function depends on `callee`.
    fn record_dep(&mut self, scope: ScopeId, callee: DeclId) {
        if let Some(caller) = self.scopes.get_current_fun(scope) {
            if caller == callee {
                return;
            }
            if let Some(fun) = self.decls.get(caller).as_fun() {
                let mut deps = fun.deps.borrow_mut();
                if !deps.contains(&callee) {
                    deps.push(callee);
                }
            }
        }
    }

    /// Unify a formal type containing generics against an actual argument
    /// type, binding user generics into `generic_map` and compiler-generic
    /// slots into `compiler_bindings`.
    pub(crate) fn unify_call_generics(
        &mut self,
        formal: &Ty,
        actual: &Ty,
        generic_map: &mut GenericMap,
        compiler_bindings: &mut GenericMap,
        location: Location,
    ) {
        let formal_kind = formal.clone_kind();
        let actual_kind = actual.clone_kind();
        match (&formal_kind, &actual_kind) {
            (TyKind::CompilerGeneric(name), _) => {
                if let Some(bound) = compiler_bindings.get(name) {
                    // Reusing a slot must not contradict the earlier
                    // binding.
                    if bound != actual {
                        self.error(location, DiagnosticKind::DataTypeDontMatchWithInferred);
                    }
                } else {
                    compiler_bindings.insert(name.clone(), actual.clone());
                }
            }
            (TyKind::Custom(custom), _) if custom.kind == CustomKind::Generic => {
                if let Some(bound) = generic_map.get(&custom.name) {
                    if bound != actual {
                        self.error(location, DiagnosticKind::DataTypeDontMatchWithInferred);
                    }
                } else {
                    generic_map.insert(custom.name.clone(), actual.clone());
                }
            }
            (TyKind::Mut(inner), _) => {
                self.unify_call_generics(inner, actual, generic_map, compiler_bindings, location)
            }
            (_, TyKind::Mut(inner)) => {
                self.unify_call_generics(formal, inner, generic_map, compiler_bindings, location)
            }
            (TyKind::SizedArray(_, a), TyKind::SizedArray(_, b))
            | (TyKind::UnsizedArray(a), TyKind::UnsizedArray(b))
            | (TyKind::DynamicArray(a), TyKind::DynamicArray(b))
            | (TyKind::List(a), TyKind::List(b))
            | (TyKind::Optional(a), TyKind::Optional(b))
            | (TyKind::Ptr(a), TyKind::Ptr(b))
            | (TyKind::PtrMut(a), TyKind::PtrMut(b))
            | (TyKind::Ref(a), TyKind::Ref(b))
            | (TyKind::RefMut(a), TyKind::RefMut(b))
            | (TyKind::Trace(a), TyKind::Trace(b))
            | (TyKind::TraceMut(a), TyKind::TraceMut(b)) => {
                self.unify_call_generics(a, b, generic_map, compiler_bindings, location)
            }
            (TyKind::Tuple(formals), TyKind::Tuple(actuals))
                if formals.len() == actuals.len() =>
            {
                for (formal, actual) in formals.iter().zip(actuals.iter()) {
                    self.unify_call_generics(
                        formal,
                        actual,
                        generic_map,
                        compiler_bindings,
                        location,
                    );
                }
            }
            (TyKind::Custom(formal_custom), TyKind::Custom(actual_custom)) => {
                if let (Some(formal_generics), Some(actual_generics)) =
                    (&formal_custom.generics, &actual_custom.generics)
                {
                    for (formal, actual) in formal_generics.iter().zip(actual_generics.iter()) {
                        self.unify_call_generics(
                            formal,
                            actual,
                            generic_map,
                            compiler_bindings,
                            location,
                        );
                    }
                }
            }
            _ => {
                if !self.unify(formal, actual) {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
            }
        }
    }

    // -- record calls --------------------------------------------------

    pub(crate) fn check_record_call(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &AstPath,
        generic_args: Option<&[DataTy]>,
        fields: &[(String, Expr)],
        location: Location,
    ) -> CheckedExpr {
        let decl_id = match self.resolve_type_name(scope, name.last()) {
            SearchResponse::Record { decl } | SearchResponse::RecordObject { decl } => decl,
            SearchResponse::NotFound => {
                self.error(
                    location,
                    DiagnosticKind::UnknownIdentifier(name.last().to_owned()),
                );
                return CheckedExpr::unknown(location);
            }
            _ => {
                self.error(location, DiagnosticKind::ExpectedCustomDataType);
                return CheckedExpr::unknown(location);
            }
        };
        self.ensure_checked(ctx, decl_id);

        let (global_name, generic_params, decl_fields) = {
            let decl = self.decls.get(decl_id);
            let record = match decl.as_record() {
                Some(record) => record,
                None => {
                    self.error(location, DiagnosticKind::ExpectedCustomDataType);
                    return CheckedExpr::unknown(location);
                }
            };
            (
                decl.global_name.clone(),
                record.generic_params.clone(),
                record.fields.borrow().clone(),
            )
        };

        // The generic-argument map: explicit, inferred from field value
        // types, or empty.
        let mut generic_map = GenericMap::new();
        if let Some(explicit) = generic_args {
            if explicit.len() != generic_params.len() {
                self.error(location, DiagnosticKind::NumberOfGenericParamsMismatched);
            } else {
                for (param, arg) in generic_params.iter().zip(explicit.iter()) {
                    let ty = self.check_data_ty(ctx, scope, arg);
                    generic_map.insert(param.clone(), ty);
                }
            }
        }

        let mut compiler_bindings = GenericMap::new();
        let mut checked_fields: Vec<(String, CheckedExpr)> = Vec::with_capacity(fields.len());
        for (field_name, value) in fields {
            let Some(decl_field) = decl_fields.iter().find(|field| &field.name == field_name)
            else {
                self.error(value.location, DiagnosticKind::FieldIsNotFound);
                continue;
            };
            let formal = decl_field.ty.resolve_generic(&generic_map);
            if formal.contains_generic() {
                let checked = self.check_expr(ctx, scope, value, None);
                self.unify_call_generics(
                    &decl_field.ty,
                    &checked.ty,
                    &mut generic_map,
                    &mut compiler_bindings,
                    checked.location,
                );
                checked_fields.push((field_name.clone(), checked));
            } else {
                let checked = self.check_expr(ctx, scope, value, Some(&formal));
                if !self.unify(&formal, &checked.ty) {
                    self.error(checked.location, DiagnosticKind::DataTypeDontMatch);
                }
                checked_fields.push((field_name.clone(), checked));
            }
        }

        for (name, ty) in &compiler_bindings {
            generic_map.entry(name.clone()).or_insert_with(|| ty.clone());
        }

        // Allocate or reuse the record's type signature for this
        // application.
        if !generic_map.is_empty() {
            if let Some(record) = self.decls.get(decl_id).as_record() {
                add_type_signature(
                    &mut record.signatures.borrow_mut(),
                    TypeSignature::new(global_name.clone(), generic_map.clone()),
                );
            }
        }

        let generics = if generic_map.is_empty() {
            None
        } else {
            Some(generic_map.values().cloned().collect())
        };
        let ty = self.decl_custom_ty(decl_id, generics, scope);
        CheckedExpr::new(
            CheckedExprKind::Call(CheckedCall::Record {
                decl: decl_id,
                global_name,
                fields: checked_fields,
                generic_map,
            }),
            ty,
            location,
        )
    }

    // -- variant calls -------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn check_variant_call(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &AstPath,
        generic_args: Option<&[DataTy]>,
        values: &[Expr],
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        let resolved = if name.is_single() {
            self.scopes.search_variant(scope, name.head())
        } else {
            match self.resolve_type_name(scope, &name.segments[name.segments.len() - 2]) {
                SearchResponse::Enum { decl } => {
                    let variant_name = name.last();
                    let index = self.decls.get(decl).as_enum().and_then(|e| {
                        e.variants
                            .borrow()
                            .iter()
                            .position(|variant| variant.name == variant_name)
                    });
                    match index {
                        Some(index) => SearchResponse::Variant {
                            enum_decl: decl,
                            index,
                        },
                        None => SearchResponse::NotFound,
                    }
                }
                _ => SearchResponse::NotFound,
            }
        };
        let SearchResponse::Variant { enum_decl, index } = resolved else {
            self.error(location, DiagnosticKind::VariantIsNotFound);
            return CheckedExpr::unknown(location);
        };
        self.ensure_checked(ctx, enum_decl);

        let (global_name, generic_params, variant) = {
            let decl = self.decls.get(enum_decl);
            let enum_payload = decl.as_enum().expect("variant of a non-enum");
            (
                decl.global_name.clone(),
                enum_payload.generic_params.clone(),
                enum_payload.variants.borrow()[index].clone(),
            )
        };

        let mut generic_map = GenericMap::new();
        if let Some(explicit) = generic_args {
            if explicit.len() != generic_params.len() {
                self.error(location, DiagnosticKind::NumberOfGenericParamsMismatched);
            } else {
                for (param, arg) in generic_params.iter().zip(explicit.iter()) {
                    let ty = self.check_data_ty(ctx, scope, arg);
                    generic_map.insert(param.clone(), ty);
                }
            }
        }
        // The expected enum type also binds generic arguments.
        if generic_map.is_empty() {
            if let Some(expected) = defined {
                if let Some(custom) = expected.direct_custom() {
                    if custom.global_name == global_name {
                        if let Some(args) = &custom.generics {
                            for (param, arg) in generic_params.iter().zip(args.iter()) {
                                generic_map.insert(param.clone(), arg.clone());
                            }
                        }
                    }
                }
            }
        }

        if values.len() != variant.values.len() {
            self.error(location, DiagnosticKind::NumberOfParamsMismatched);
        }

        let mut compiler_bindings = GenericMap::new();
        let mut checked_values = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            match variant.values.get(index) {
                Some(formal_raw) => {
                    let formal = formal_raw.resolve_generic(&generic_map);
                    if formal.contains_generic() {
                        let checked = self.check_expr(ctx, scope, value, None);
                        self.unify_call_generics(
                            formal_raw,
                            &checked.ty,
                            &mut generic_map,
                            &mut compiler_bindings,
                            checked.location,
                        );
                        checked_values.push(checked);
                    } else {
                        let checked = self.check_expr(ctx, scope, value, Some(&formal));
                        if !self.unify(&formal, &checked.ty) {
                            self.error(checked.location, DiagnosticKind::DataTypeDontMatch);
                        }
                        checked_values.push(checked);
                    }
                }
                None => checked_values.push(self.check_expr(ctx, scope, value, None)),
            }
        }
        for (name, ty) in &compiler_bindings {
            generic_map.entry(name.clone()).or_insert_with(|| ty.clone());
        }

        if !generic_map.is_empty() {
            if let Some(enum_payload) = self.decls.get(enum_decl).as_enum() {
                add_type_signature(
                    &mut enum_payload.signatures.borrow_mut(),
                    TypeSignature::new(global_name, generic_map.clone()),
                );
            }
        }

        let generics = if generic_map.is_empty() {
            None
        } else {
            Some(generic_map.values().cloned().collect())
        };
        let ty = match defined {
            Some(expected)
                if expected
                    .direct_custom()
                    .map_or(false, |custom| custom.kind == CustomKind::Enum) =>
            {
                expected.clone()
            }
            _ => self.decl_custom_ty(enum_decl, generics, scope),
        };
        CheckedExpr::new(
            CheckedExprKind::Call(CheckedCall::VariantCall {
                enum_decl,
                variant: variant.name,
                index,
                values: checked_values,
                generic_map,
            }),
            ty,
            location,
        )
    }

    // -- builtin / sys / len -------------------------------------------

    pub(crate) fn check_builtin_call(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &str,
        args: &[Expr],
        location: Location,
    ) -> CheckedExpr {
        if !self.package_ctx.import_builtin {
            self.error(location, DiagnosticKind::ImportBuiltinRequired);
            return CheckedExpr::unknown(location);
        }
        let Some(builtin_fun) = builtin::lookup(name) else {
            self.error(location, DiagnosticKind::BadBuiltinFunction);
            return CheckedExpr::unknown(location);
        };
        if args.len() != builtin_fun.arity {
            self.error(location, DiagnosticKind::NumberOfParamsMismatched);
        }

        let checked_args: Vec<CheckedExpr> = args
            .iter()
            .map(|arg| self.check_expr(ctx, scope, arg, None))
            .collect();
        let arg_tys: Vec<Ty> = checked_args.iter().map(|arg| arg.ty.clone()).collect();
        let ty = match builtin::return_ty(name, &arg_tys) {
            Some(ty) => ty,
            None => {
                self.error(location, DiagnosticKind::ImpossibleToGetReturnDataType);
                Ty::with_location(TyKind::Unknown, location)
            }
        };
        self.package_ctx.used_builtins.insert(name.to_owned());

        CheckedExpr::new(
            CheckedExprKind::Call(CheckedCall::Builtin {
                name: name.to_owned(),
                args: checked_args,
            }),
            ty,
            location,
        )
    }

    pub(crate) fn check_sys_call(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &str,
        args: &[Expr],
        location: Location,
    ) -> CheckedExpr {
        if !self.package_ctx.import_sys {
            self.error(location, DiagnosticKind::ImportSysRequired);
            return CheckedExpr::unknown(location);
        }
        let Some(sys_fun) = sys::lookup(name) else {
            self.error(location, DiagnosticKind::BadSysFunction);
            return CheckedExpr::unknown(location);
        };
        if args.len() != sys_fun.arity {
            self.error(location, DiagnosticKind::NumberOfParamsMismatched);
        }

        let checked_args: Vec<CheckedExpr> = args
            .iter()
            .map(|arg| self.check_expr(ctx, scope, arg, None))
            .collect();
        let ty = sys::return_ty(name).unwrap_or_else(|| Ty::with_location(TyKind::Unknown, location));
        self.package_ctx.used_sys.insert(name.to_owned());

        CheckedExpr::new(
            CheckedExprKind::Call(CheckedCall::Sys {
                name: name.to_owned(),
                args: checked_args,
            }),
            ty,
            location,
        )
    }

    /// `@len` compile-time evaluates string literals; everything else goes
    /// through the runtime builtin.
    pub(crate) fn check_len_call(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        arg: &Expr,
        location: Location,
    ) -> CheckedExpr {
        if let ExprKind::Literal(Literal::Str(text)) | ExprKind::Literal(Literal::CStr(text)) =
            &arg.kind
        {
            return CheckedExpr::literal(
                CheckedLiteral::Int(text.len() as i128),
                Ty::with_location(TyKind::Usize, location),
                location,
            );
        }

        let checked_arg = self.check_expr(ctx, scope, arg, None);
        let arg_kind = checked_arg.ty.clone_kind();
        let sized = matches!(
            arg_kind,
            TyKind::Str(_)
                | TyKind::Bytes(_)
                | TyKind::CStr
                | TyKind::SizedArray(..)
                | TyKind::UnsizedArray(_)
                | TyKind::DynamicArray(_)
                | TyKind::List(_)
        );
        if !sized {
            self.error(checked_arg.location, DiagnosticKind::DataTypeDontMatch);
        }
        self.package_ctx.used_builtins.insert("len".to_owned());

        CheckedExpr::new(
            CheckedExprKind::Call(CheckedCall::Len {
                arg: Box::new(checked_arg),
            }),
            Ty::with_location(TyKind::Usize, location),
            location,
        )
    }
}
