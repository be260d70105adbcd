//! Expression checking.
//!
//! Every checked expression carries a data type; failed checks recover
//! with an unknown placeholder so surrounding checks still run.

use lily_ast::{AstPath, BinaryOp, Expr, ExprKind, Literal, UnaryOp};
use lily_errors::DiagnosticKind;
use lily_span::{Location, ScopeId};
use lily_ty::{CustomKind, GenericMap, Guarantee, Ty, TyKind};

use crate::checked::{
    CastKind, CheckedCall, CheckedDeclKind, CheckedExpr, CheckedExprKind, CheckedLiteral,
    CheckedPathSegment, PathSegmentKind,
};
use crate::context::AnalysisContext;
use crate::scope::SearchResponse;

use super::Analyzer;

impl<'a> Analyzer<'a> {
    pub(crate) fn check_expr(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        expr: &Expr,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                self.resolve_identifier(ctx, scope, name, expr.location, defined, false)
            }
            ExprKind::Path(path) => self.check_path_access(ctx, scope, path, expr.location),
            ExprKind::Literal(literal) => self.check_literal(scope, literal, expr.location, defined),
            ExprKind::Wildcard => {
                // Only `_ = expr` accepts a wildcard; anywhere else it is a
                // recovery case.
                self.error(expr.location, DiagnosticKind::ExpectedAssignableExpression);
                CheckedExpr::unknown(expr.location)
            }
            ExprKind::SelfExpr => {
                if self.scopes.get_current_object(scope).is_none() {
                    self.error(expr.location, DiagnosticKind::ExpectedMethodParent);
                } else {
                    self.error(
                        expr.location,
                        DiagnosticKind::Unsupported("class attribute access"),
                    );
                }
                CheckedExpr::unknown(expr.location)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_binary(ctx, scope, *op, lhs, rhs, expr.location, defined)
            }
            ExprKind::Unary { op, rhs } => {
                self.check_unary(ctx, scope, *op, rhs, expr.location, defined)
            }
            ExprKind::Grouping(inner) => {
                let checked = self.check_expr(ctx, scope, inner, defined);
                let ty = checked.ty.clone();
                CheckedExpr::new(
                    CheckedExprKind::Grouping(Box::new(checked)),
                    ty,
                    expr.location,
                )
            }
            ExprKind::FunCall {
                name,
                generic_args,
                args,
            } => self.check_fun_call(
                ctx,
                scope,
                name,
                generic_args.as_deref(),
                args,
                expr.location,
                defined,
            ),
            ExprKind::RecordCall {
                name,
                generic_args,
                fields,
            } => self.check_record_call(
                ctx,
                scope,
                name,
                generic_args.as_deref(),
                fields,
                expr.location,
            ),
            ExprKind::VariantCall {
                name,
                generic_args,
                values,
            } => self.check_variant_call(
                ctx,
                scope,
                name,
                generic_args.as_deref(),
                values,
                expr.location,
                defined,
            ),
            ExprKind::BuiltinCall { name, args } => {
                self.check_builtin_call(ctx, scope, name, args, expr.location)
            }
            ExprKind::SysCall { name, args } => {
                self.check_sys_call(ctx, scope, name, args, expr.location)
            }
            ExprKind::LenCall(arg) => self.check_len_call(ctx, scope, arg, expr.location),
            ExprKind::Array(elems) => {
                self.check_array(ctx, scope, elems, expr.location, defined)
            }
            ExprKind::List(elems) => self.check_list(ctx, scope, elems, expr.location, defined),
            ExprKind::Tuple(elems) => self.check_tuple(ctx, scope, elems, expr.location, defined),
            ExprKind::Cast { expr: inner, dest } => {
                self.check_cast(ctx, scope, inner, dest, expr.location)
            }
            ExprKind::Lambda { .. } => {
                self.error(expr.location, DiagnosticKind::Unsupported("lambda expression"));
                CheckedExpr::unknown(expr.location)
            }
        }
    }

    // -- identifiers ---------------------------------------------------

    pub(crate) fn resolve_identifier(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &str,
        location: Location,
        defined: Option<&Ty>,
        must_mut: bool,
    ) -> CheckedExpr {
        match self.scopes.search_identifier(scope, name) {
            SearchResponse::Variable {
                scope: var_scope,
                ty,
                mutable,
            } => {
                if must_mut && !mutable {
                    self.error(location, DiagnosticKind::ExpectedMutableVariable);
                }
                self.bind_unknown_binding(scope, &ty, defined);
                CheckedExpr::new(
                    CheckedExprKind::Call(CheckedCall::Variable {
                        name: name.to_owned(),
                        scope: var_scope,
                    }),
                    ty,
                    location,
                )
            }
            SearchResponse::Param {
                index, ty, mutable, ..
            } => {
                if must_mut && !mutable {
                    self.error(location, DiagnosticKind::ExpectedMutableVariable);
                }
                self.bind_unknown_binding(scope, &ty, defined);
                CheckedExpr::new(
                    CheckedExprKind::Call(CheckedCall::Param {
                        name: name.to_owned(),
                        index,
                    }),
                    ty,
                    location,
                )
            }
            SearchResponse::CapturedVariable {
                scope: capture_scope,
                ty,
            } => {
                self.bind_unknown_binding(scope, &ty, defined);
                CheckedExpr::new(
                    CheckedExprKind::Call(CheckedCall::CapturedVariable {
                        name: name.to_owned(),
                        scope: capture_scope,
                    }),
                    ty,
                    location,
                )
            }
            SearchResponse::Constant { decl } => {
                self.ensure_checked(ctx, decl);
                let (ty, global_name) = {
                    let checked = self.decls.get(decl);
                    let ty = checked
                        .as_constant()
                        .map(|constant| constant.ty.borrow().clone())
                        .unwrap_or_else(|| Ty::new(TyKind::Unknown));
                    (ty, checked.global_name.clone())
                };
                CheckedExpr::new(
                    CheckedExprKind::Call(CheckedCall::Constant { decl, global_name }),
                    ty,
                    location,
                )
            }
            SearchResponse::Fun { .. } => {
                self.error(location, DiagnosticKind::ExpectedFunCall);
                CheckedExpr::unknown(location)
            }
            SearchResponse::Enum { decl } => {
                self.ensure_checked(ctx, decl);
                let global_name = self.decls.get(decl).global_name.clone();
                let ty = self.decl_custom_ty(decl, None, scope);
                CheckedExpr::new(
                    CheckedExprKind::Call(CheckedCall::Enum { decl, global_name }),
                    ty,
                    location,
                )
            }
            SearchResponse::Variant { enum_decl, index } => {
                self.ensure_checked(ctx, enum_decl);
                let ty = self.variant_result_ty(enum_decl, defined, scope);
                CheckedExpr::new(
                    CheckedExprKind::Call(CheckedCall::Variant {
                        enum_decl,
                        name: name.to_owned(),
                        index,
                    }),
                    ty,
                    location,
                )
            }
            SearchResponse::Generic { ty, .. } => CheckedExpr::new(
                CheckedExprKind::Call(CheckedCall::Unknown),
                ty,
                location,
            ),
            SearchResponse::NotFound => {
                self.error(location, DiagnosticKind::UnknownIdentifier(name.to_owned()));
                CheckedExpr::unknown(location)
            }
            _ => {
                self.error(location, DiagnosticKind::ExpectedFunCall);
                CheckedExpr::unknown(location)
            }
        }
    }

    /// A binding whose declared type is still `unknown` adopts the
    /// expected type when one exists, otherwise a compiler-generic slot.
    fn bind_unknown_binding(&mut self, scope: ScopeId, ty: &Ty, defined: Option<&Ty>) {
        if !ty.is_unknown() {
            return;
        }
        match defined {
            Some(expected) if !expected.is_unknown() => {
                let _ = ty.update(expected.clone_kind());
            }
            _ => {
                let generic = self.fresh_compiler_generic(scope);
                let _ = ty.update(generic.clone_kind());
            }
        }
    }

    /// The enum type a variant reference produces; generic enums bind
    /// their arguments from context when possible.
    pub(crate) fn variant_result_ty(
        &mut self,
        enum_decl: lily_span::DeclId,
        defined: Option<&Ty>,
        scope: ScopeId,
    ) -> Ty {
        if let Some(expected) = defined {
            if let Some(custom) = expected.direct_custom() {
                if custom.kind == CustomKind::Enum {
                    return expected.clone();
                }
            }
        }
        let generic_params = self
            .decls
            .get(enum_decl)
            .as_enum()
            .map(|e| e.generic_params.clone())
            .unwrap_or_default();
        let generics = if generic_params.is_empty() {
            None
        } else {
            Some(
                generic_params
                    .iter()
                    .map(|_| self.fresh_compiler_generic(scope))
                    .collect(),
            )
        };
        self.decl_custom_ty(enum_decl, generics, scope)
    }

    // -- literals ------------------------------------------------------

    pub(crate) fn check_literal(
        &mut self,
        scope: ScopeId,
        literal: &Literal,
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        match literal {
            Literal::Bool(value) => CheckedExpr::literal(
                CheckedLiteral::Bool(*value),
                Ty::with_location(TyKind::Bool, location),
                location,
            ),
            Literal::Int(value) => self.check_int_literal(*value, location, defined),
            Literal::Float(value) => {
                let ty = match defined {
                    Some(expected) if expected.is_guaranteed(Guarantee::Float) => expected.clone(),
                    _ => Ty::with_location(TyKind::Float64, location),
                };
                CheckedExpr::literal(CheckedLiteral::Float(*value), ty, location)
            }
            Literal::Byte(value) => CheckedExpr::literal(
                CheckedLiteral::Byte(*value),
                Ty::with_location(TyKind::Byte, location),
                location,
            ),
            Literal::Char(value) => CheckedExpr::literal(
                CheckedLiteral::Char(*value),
                Ty::with_location(TyKind::Char, location),
                location,
            ),
            Literal::Str(value) => CheckedExpr::literal(
                CheckedLiteral::Str(value.clone()),
                Ty::with_location(TyKind::Str(Some(value.len())), location),
                location,
            ),
            Literal::Bytes(value) => CheckedExpr::literal(
                CheckedLiteral::Bytes(value.clone()),
                Ty::with_location(TyKind::Bytes(Some(value.len())), location),
                location,
            ),
            Literal::CStr(value) => CheckedExpr::literal(
                CheckedLiteral::CStr(value.clone()),
                Ty::with_location(TyKind::CStr, location),
                location,
            ),
            Literal::Nil => {
                // `nil` binds its pointee from context or allocates a
                // compiler-generic slot inside a ptr.
                let ty = match defined {
                    Some(expected)
                        if matches!(
                            expected.clone_kind(),
                            TyKind::Ptr(_) | TyKind::PtrMut(_) | TyKind::CStr
                        ) =>
                    {
                        expected.clone()
                    }
                    _ => {
                        let inner = self.fresh_compiler_generic(scope);
                        Ty::with_location(TyKind::Ptr(inner), location)
                    }
                };
                CheckedExpr::literal(CheckedLiteral::Nil, ty, location)
            }
            Literal::None => {
                let ty = match defined {
                    Some(expected) if matches!(expected.clone_kind(), TyKind::Optional(_)) => {
                        expected.clone()
                    }
                    _ => {
                        let inner = self.fresh_compiler_generic(scope);
                        Ty::with_location(TyKind::Optional(inner), location)
                    }
                };
                CheckedExpr::literal(CheckedLiteral::None, ty, location)
            }
            Literal::Undef => {
                let ty = defined
                    .cloned()
                    .unwrap_or_else(|| Ty::with_location(TyKind::Unknown, location));
                CheckedExpr::literal(CheckedLiteral::Undef, ty, location)
            }
            Literal::Unit => CheckedExpr::literal(
                CheckedLiteral::Unit,
                Ty::with_location(TyKind::Unit, location),
                location,
            ),
        }
    }

    fn check_int_literal(
        &mut self,
        value: i128,
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        if let Some(expected) = defined {
            let expected_kind = expected.clone_kind();
            if expected_kind.matches_guarantee(Guarantee::Integer)
                || matches!(
                    expected_kind,
                    TyKind::CChar | TyKind::CShort | TyKind::CInt | TyKind::CLong | TyKind::CLongLong
                )
            {
                if expected_kind.fits_int(value) {
                    return CheckedExpr::literal(
                        CheckedLiteral::Int(value),
                        expected.clone(),
                        location,
                    );
                }
                self.error_with_detail(
                    location,
                    DiagnosticKind::ComptimeCastOverflow,
                    format!("Int32 is out of range to cast {expected_kind}"),
                );
                return CheckedExpr::literal(CheckedLiteral::Int(value), expected.clone(), location);
            }
            if expected_kind.matches_guarantee(Guarantee::Float) {
                return CheckedExpr::literal(
                    CheckedLiteral::Int(value),
                    expected.clone(),
                    location,
                );
            }
        }
        // No integer context: Int32 when it fits, Int64 otherwise.
        let kind = if TyKind::Int32.fits_int(value) {
            TyKind::Int32
        } else {
            TyKind::Int64
        };
        CheckedExpr::literal(
            CheckedLiteral::Int(value),
            Ty::with_location(kind, location),
            location,
        )
    }

    // -- binary --------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn check_binary(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        if op == BinaryOp::Chain {
            return self.check_chain(ctx, scope, lhs, rhs, location, defined);
        }
        if op.is_assign() {
            return self.check_assign(ctx, scope, op, lhs, rhs, location);
        }

        // Literal operands adopt the other side's type, so check the
        // non-literal side first.
        let (checked_lhs, checked_rhs) = if is_int_literal(lhs) && !is_int_literal(rhs) {
            let checked_rhs = self.check_expr(ctx, scope, rhs, defined);
            let checked_lhs = self.check_expr(ctx, scope, lhs, Some(&checked_rhs.ty.clone()));
            (checked_lhs, checked_rhs)
        } else {
            let checked_lhs = self.check_expr(ctx, scope, lhs, defined);
            let lhs_ty = checked_lhs.ty.clone();
            let checked_rhs = self.check_expr(ctx, scope, rhs, Some(&lhs_ty));
            (checked_lhs, checked_rhs)
        };

        let ty = if op.is_logical() {
            if !checked_lhs.ty.is_guaranteed(Guarantee::Bool) {
                self.error(checked_lhs.location, DiagnosticKind::ExpectedBooleanExpression);
            }
            if !checked_rhs.ty.is_guaranteed(Guarantee::Bool) {
                self.error(checked_rhs.location, DiagnosticKind::ExpectedBooleanExpression);
            }
            Ty::with_location(TyKind::Bool, location)
        } else if op == BinaryOp::Range {
            if !self.unify(&checked_lhs.ty, &checked_rhs.ty)
                || !checked_lhs.ty.is_guaranteed(Guarantee::Integer)
            {
                self.error(location, DiagnosticKind::DataTypeDontMatch);
            }
            checked_lhs.ty.clone()
        } else {
            // Arithmetic and comparisons reconcile through the operator
            // registry.
            match self
                .operators
                .lookup(op.token(), &[checked_lhs.ty.clone(), checked_rhs.ty.clone()])
            {
                Some(ret) => ret,
                None => {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                    Ty::with_location(TyKind::Unknown, location)
                }
            }
        };

        CheckedExpr::new(
            CheckedExprKind::Binary {
                op,
                lhs: Box::new(checked_lhs),
                rhs: Box::new(checked_rhs),
            },
            ty,
            location,
        )
    }

    fn check_assign(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        location: Location,
    ) -> CheckedExpr {
        let checked_lhs = match &lhs.kind {
            ExprKind::Identifier(name) => {
                self.resolve_identifier(ctx, scope, name, lhs.location, None, true)
            }
            ExprKind::Path(path) => self.check_path_access(ctx, scope, path, lhs.location),
            ExprKind::Unary {
                op: UnaryOp::Deref, ..
            } => self.check_expr(ctx, scope, lhs, None),
            ExprKind::Wildcard if op == BinaryOp::Assign => CheckedExpr::new(
                CheckedExprKind::Wildcard,
                Ty::with_location(TyKind::Unknown, lhs.location),
                lhs.location,
            ),
            _ => {
                self.error(lhs.location, DiagnosticKind::ExpectedAssignableExpression);
                CheckedExpr::unknown(lhs.location)
            }
        };

        let lhs_ty = checked_lhs.ty.clone();
        let defined = if lhs_ty.is_unknown() { None } else { Some(lhs_ty.clone()) };
        let checked_rhs = self.check_expr(ctx, scope, rhs, defined.as_ref());

        if let Some(inner_op) = op.assign_op() {
            // `x op= y` must also satisfy the operator itself.
            if self
                .operators
                .lookup(inner_op.token(), &[lhs_ty.clone(), checked_rhs.ty.clone()])
                .is_none()
            {
                self.error(location, DiagnosticKind::DataTypeDontMatch);
            }
        } else if !lhs_ty.is_unknown() && !self.unify(&lhs_ty, &checked_rhs.ty) {
            self.error(location, DiagnosticKind::DataTypeDontMatch);
        }

        CheckedExpr::new(
            CheckedExprKind::Binary {
                op,
                lhs: Box::new(checked_lhs),
                rhs: Box::new(checked_rhs),
            },
            Ty::with_location(TyKind::Unit, location),
            location,
        )
    }

    /// `x |> f(a, b)` rewrites to `f(a, b, x)` before analysis.
    fn check_chain(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        lhs: &Expr,
        rhs: &Expr,
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        match &rhs.kind {
            ExprKind::FunCall {
                name,
                generic_args,
                args,
            } => {
                let mut chained_args: Vec<Expr> = args.clone();
                chained_args.push(lhs.clone());
                self.check_fun_call(
                    ctx,
                    scope,
                    name,
                    generic_args.as_deref(),
                    &chained_args,
                    location,
                    defined,
                )
            }
            _ => {
                self.error(rhs.location, DiagnosticKind::ExpectedFunCall);
                CheckedExpr::unknown(location)
            }
        }
    }

    // -- unary ---------------------------------------------------------

    fn check_unary(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        op: UnaryOp,
        rhs: &Expr,
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        let checked_rhs = match op {
            UnaryOp::Deref | UnaryOp::Ref | UnaryOp::RefMut => {
                self.check_expr(ctx, scope, rhs, None)
            }
            _ => self.check_expr(ctx, scope, rhs, defined),
        };

        let ty = match op {
            UnaryOp::Not => {
                if !checked_rhs.ty.is_guaranteed(Guarantee::Bool) {
                    self.error(checked_rhs.location, DiagnosticKind::ExpectedBooleanExpression);
                }
                Ty::with_location(TyKind::Bool, location)
            }
            UnaryOp::Neg => {
                if !checked_rhs.ty.is_guaranteed(Guarantee::SignedInteger)
                    && !checked_rhs.ty.is_guaranteed(Guarantee::Float)
                {
                    self.error(checked_rhs.location, DiagnosticKind::DataTypeDontMatch);
                }
                checked_rhs.ty.clone()
            }
            UnaryOp::Deref => match checked_rhs.ty.clone_kind() {
                TyKind::Ptr(inner)
                | TyKind::PtrMut(inner)
                | TyKind::Ref(inner)
                | TyKind::RefMut(inner) => inner,
                _ => {
                    self.error(checked_rhs.location, DiagnosticKind::DataTypeDontMatch);
                    Ty::with_location(TyKind::Unknown, location)
                }
            },
            UnaryOp::Ref | UnaryOp::RefMut => {
                let inner = checked_rhs.ty.clone();
                let kind = match (op, defined.map(Ty::clone_kind)) {
                    (UnaryOp::Ref, Some(TyKind::Ptr(_))) => TyKind::Ptr(inner),
                    (UnaryOp::RefMut, Some(TyKind::PtrMut(_))) => TyKind::PtrMut(inner),
                    (UnaryOp::Ref, _) => TyKind::Ref(inner),
                    (UnaryOp::RefMut, _) => TyKind::RefMut(inner),
                    _ => unreachable!(),
                };
                Ty::with_location(kind, location)
            }
        };

        CheckedExpr::new(
            CheckedExprKind::Unary {
                op,
                rhs: Box::new(checked_rhs),
            },
            ty,
            location,
        )
    }

    // -- containers ----------------------------------------------------

    fn check_array(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        elems: &[Expr],
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        let expected = defined.map(Ty::clone_kind);
        let (elem_defined, expected_size) = match &expected {
            Some(TyKind::SizedArray(size, inner)) => (Some(inner.clone()), Some(*size)),
            Some(TyKind::UnsizedArray(inner)) | Some(TyKind::DynamicArray(inner)) => {
                (Some(inner.clone()), None)
            }
            _ => (None, None),
        };

        if let Some(size) = expected_size {
            if elems.len() != size {
                self.error(location, DiagnosticKind::ExpectedSizedArrayWithTheSameSize);
            }
        }

        let (checked_elems, elem_ty) =
            self.check_elements(ctx, scope, elems, elem_defined);

        let ty = match defined {
            Some(expected) if expected_size.is_some() => expected.clone(),
            _ => Ty::with_location(TyKind::SizedArray(checked_elems.len(), elem_ty), location),
        };
        CheckedExpr::new(CheckedExprKind::Array(checked_elems), ty, location)
    }

    fn check_list(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        elems: &[Expr],
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        let elem_defined = match defined.map(Ty::clone_kind) {
            Some(TyKind::List(inner)) => Some(inner),
            _ => None,
        };
        let (checked_elems, elem_ty) =
            self.check_elements(ctx, scope, elems, elem_defined);
        CheckedExpr::new(
            CheckedExprKind::List(checked_elems),
            Ty::with_location(TyKind::List(elem_ty), location),
            location,
        )
    }

    /// Shared element walk: unify every element against the first (or the
    /// expected element type); empty containers with no context get a
    /// compiler-generic element.
    fn check_elements(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        elems: &[Expr],
        elem_defined: Option<Ty>,
    ) -> (Vec<CheckedExpr>, Ty) {
        let mut checked_elems = Vec::with_capacity(elems.len());
        let mut elem_ty = elem_defined;
        for elem in elems {
            let checked = self.check_expr(ctx, scope, elem, elem_ty.as_ref());
            match &elem_ty {
                Some(expected) => {
                    if !self.unify(expected, &checked.ty) {
                        self.error(checked.location, DiagnosticKind::DataTypeDontMatch);
                    }
                }
                None => elem_ty = Some(checked.ty.clone()),
            }
            checked_elems.push(checked);
        }
        let elem_ty = elem_ty.unwrap_or_else(|| self.fresh_compiler_generic(scope));
        (checked_elems, elem_ty)
    }

    fn check_tuple(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        elems: &[Expr],
        location: Location,
        defined: Option<&Ty>,
    ) -> CheckedExpr {
        let expected_items = match defined.map(Ty::clone_kind) {
            Some(TyKind::Tuple(items)) if items.len() == elems.len() => Some(items),
            _ => None,
        };
        let mut checked_elems = Vec::with_capacity(elems.len());
        let mut tys = Vec::with_capacity(elems.len());
        for (index, elem) in elems.iter().enumerate() {
            let elem_defined = expected_items.as_ref().map(|items| items[index].clone());
            let checked = self.check_expr(ctx, scope, elem, elem_defined.as_ref());
            tys.push(checked.ty.clone());
            checked_elems.push(checked);
        }
        CheckedExpr::new(
            CheckedExprKind::Tuple(checked_elems),
            Ty::with_location(TyKind::Tuple(tys), location),
            location,
        )
    }

    // -- casts ---------------------------------------------------------

    fn check_cast(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        inner: &Expr,
        dest: &lily_ast::DataTy,
        location: Location,
    ) -> CheckedExpr {
        let checked_inner = self.check_expr(ctx, scope, inner, None);
        let dest_ty = self.check_data_ty(ctx, scope, dest);

        if checked_inner.ty.is_unknown() {
            // The operand already failed; don't pile a cast error on top.
            return CheckedExpr::new(
                CheckedExprKind::Cast {
                    expr: Box::new(checked_inner),
                    kind: CastKind::Dynamic,
                },
                dest_ty,
                location,
            );
        }

        if matches!(dest_ty.clone_kind(), TyKind::Any) && !self.scopes.is_unsafe(scope) {
            self.error(location, DiagnosticKind::CannotCastToAnyInSafeMode);
        }
        if checked_inner.ty == dest_ty {
            self.error(location, DiagnosticKind::CastWithSameDataType);
        }

        let src_kind = checked_inner.ty.clone_kind();
        let dest_kind = dest_ty.clone_kind();
        let cast_kind = if matches!(checked_inner.kind, CheckedExprKind::Literal(_))
            && src_kind.matches_guarantee(Guarantee::Numeric)
        {
            if let CheckedExprKind::Literal(CheckedLiteral::Int(value)) = &checked_inner.kind {
                if dest_kind.matches_guarantee(Guarantee::Integer) && !dest_kind.fits_int(*value) {
                    self.error(location, DiagnosticKind::BadLiteralCast);
                }
            }
            CastKind::Literal
        } else if matches!(src_kind, TyKind::Str(_) | TyKind::CStr | TyKind::Bytes(_))
            || matches!(dest_kind, TyKind::Str(_) | TyKind::CStr | TyKind::Bytes(_))
        {
            CastKind::Str
        } else if src_kind.matches_guarantee(Guarantee::Numeric)
            && dest_kind.matches_guarantee(Guarantee::Numeric)
        {
            CastKind::Dynamic
        } else if matches!(src_kind, TyKind::Custom(_)) || matches!(dest_kind, TyKind::Custom(_))
            || matches!(dest_kind, TyKind::Any)
        {
            CastKind::Dynamic
        } else {
            self.error(location, DiagnosticKind::UnknownCast);
            CastKind::Dynamic
        };

        CheckedExpr::new(
            CheckedExprKind::Cast {
                expr: Box::new(checked_inner),
                kind: cast_kind,
            },
            dest_ty,
            location,
        )
    }

    // -- path access ---------------------------------------------------

    pub(crate) fn check_path_access(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        path: &AstPath,
        location: Location,
    ) -> CheckedExpr {
        let head_name = path.head();
        let mut head = match self.scopes.search_identifier(scope, head_name) {
            SearchResponse::Module { decl } => {
                return self.check_module_path(ctx, scope, decl, &path.segments[1..], location);
            }
            SearchResponse::Enum { decl } => {
                return self.check_enum_path(ctx, scope, decl, &path.segments[1..], location);
            }
            SearchResponse::Class { .. } => {
                self.error(location, DiagnosticKind::Unsupported("class attribute access"));
                return CheckedExpr::unknown(location);
            }
            _ => self.resolve_identifier(ctx, scope, head_name, location, None, false),
        };
        if head.ty.is_unknown() {
            return head;
        }

        let mut segments: Vec<CheckedPathSegment> = Vec::with_capacity(path.segments.len() - 1);
        for segment_name in &path.segments[1..] {
            let Some(segment) =
                self.resolve_field_segment(ctx, scope, &head.ty, segment_name, location)
            else {
                return CheckedExpr::unknown(location);
            };
            head = CheckedExpr::new(head.kind.clone(), segment.ty.clone(), location);
            segments.push(segment);
        }

        if segments.is_empty() {
            return head;
        }
        let ty = segments.last().map(|s| s.ty.clone()).unwrap_or_else(|| head.ty.clone());
        // Rebuild the head expression: the stored head keeps its own type.
        let head_expr = CheckedExpr::new(head.kind, head.ty, location);
        CheckedExpr::new(
            CheckedExprKind::Path {
                head: Box::new(head_expr),
                segments,
            },
            ty,
            location,
        )
    }

    fn resolve_field_segment(
        &mut self,
        ctx: &mut AnalysisContext,
        _scope: ScopeId,
        base_ty: &Ty,
        field_name: &str,
        location: Location,
    ) -> Option<CheckedPathSegment> {
        let Some(custom) = base_ty.direct_custom() else {
            self.error(location, DiagnosticKind::ExpectedCustomDataType);
            return None;
        };
        let Some(decl_id) = self.decl_of_scope(custom.scope_id) else {
            self.error(location, DiagnosticKind::ExpectedCustomDataType);
            return None;
        };
        self.ensure_checked(ctx, decl_id);

        let decl = self.decls.get(decl_id);
        match &decl.kind {
            CheckedDeclKind::Record(record) => {
                let fields = record.fields.borrow();
                let Some(index) = fields.iter().position(|field| field.name == field_name) else {
                    self.error(location, DiagnosticKind::FieldIsNotFound);
                    return None;
                };
                let field_ty = fields[index].ty.clone();
                let generic_params = record.generic_params.clone();
                drop(fields);
                // Substitute the record's generic arguments into the field.
                let field_ty = match &custom.generics {
                    Some(args) if !generic_params.is_empty() => {
                        let map: GenericMap = generic_params
                            .into_iter()
                            .zip(args.iter().cloned())
                            .collect();
                        field_ty.resolve_generic(&map)
                    }
                    _ => field_ty,
                };
                Some(CheckedPathSegment {
                    name: field_name.to_owned(),
                    ty: field_ty,
                    kind: PathSegmentKind::Field {
                        record_scope: custom.scope_id,
                        index,
                    },
                })
            }
            CheckedDeclKind::Object(_) => {
                self.error(location, DiagnosticKind::Unsupported("class attribute access"));
                None
            }
            _ => {
                self.error(location, DiagnosticKind::ExpectedCustomDataType);
                None
            }
        }
    }

    /// A two-segment path on an enum names a variant.
    fn check_enum_path(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        enum_decl: lily_span::DeclId,
        rest: &[String],
        location: Location,
    ) -> CheckedExpr {
        self.ensure_checked(ctx, enum_decl);
        let [variant_name] = rest else {
            self.error(location, DiagnosticKind::VariantIsNotFound);
            return CheckedExpr::unknown(location);
        };
        let index = self
            .decls
            .get(enum_decl)
            .as_enum()
            .and_then(|e| {
                e.variants
                    .borrow()
                    .iter()
                    .position(|variant| &variant.name == variant_name)
            });
        let Some(index) = index else {
            self.error(location, DiagnosticKind::VariantIsNotFound);
            return CheckedExpr::unknown(location);
        };
        let ty = self.variant_result_ty(enum_decl, None, scope);
        CheckedExpr::new(
            CheckedExprKind::Call(CheckedCall::Variant {
                enum_decl,
                name: variant_name.clone(),
                index,
            }),
            ty,
            location,
        )
    }

    fn check_module_path(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        module_decl: lily_span::DeclId,
        rest: &[String],
        location: Location,
    ) -> CheckedExpr {
        let Some((next, remaining)) = rest.split_first() else {
            self.error(location, DiagnosticKind::ExpectedDataType);
            return CheckedExpr::unknown(location);
        };
        let module_scope = self.decls.get(module_decl).scope;
        match self.scopes.search_identifier(module_scope, next) {
            SearchResponse::Module { decl } if !remaining.is_empty() => {
                self.check_module_path(ctx, scope, decl, remaining, location)
            }
            SearchResponse::Enum { decl } if !remaining.is_empty() => {
                self.check_enum_path(ctx, scope, decl, remaining, location)
            }
            SearchResponse::Constant { decl } if remaining.is_empty() => {
                self.ensure_checked(ctx, decl);
                let (ty, global_name) = {
                    let checked = self.decls.get(decl);
                    let ty = checked
                        .as_constant()
                        .map(|constant| constant.ty.borrow().clone())
                        .unwrap_or_else(|| Ty::new(TyKind::Unknown));
                    (ty, checked.global_name.clone())
                };
                CheckedExpr::new(
                    CheckedExprKind::Call(CheckedCall::Constant { decl, global_name }),
                    ty,
                    location,
                )
            }
            SearchResponse::Fun { .. } => {
                self.error(location, DiagnosticKind::ExpectedFunCall);
                CheckedExpr::unknown(location)
            }
            SearchResponse::NotFound => {
                self.error(location, DiagnosticKind::UnknownIdentifier(next.clone()));
                CheckedExpr::unknown(location)
            }
            _ => {
                self.error(location, DiagnosticKind::ExpectedDataType);
                CheckedExpr::unknown(location)
            }
        }
    }
}

fn is_int_literal(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Literal(Literal::Int(_)))
}
