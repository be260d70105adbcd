//! Signature re-analysis.
//!
//! When a call adds a new signature that binds compiler generics, the
//! callee's body is re-walked against a [`VirtualScope`] that shadows
//! parameter and variable types with the signature-specific ones. The walk
//! is a pure visitor: it produces a map from expression id (traversal
//! index) to type and never mutates the AST or the stored checked body.
//! Its result concretizes compiler-generic leaves left in the signature's
//! return type.

use lily_ast::{Decl, DeclKind, Expr, ExprKind, Literal, Stmt, StmtKind};
use lily_span::DeclId;
use lily_ty::{GenericMap, Ty, TyKind};
use rustc_hash::FxHashMap;

use crate::context::AnalysisContext;
use crate::scope::SearchResponse;
use crate::signature::serialize_signature_name;
use crate::virtual_scope::VirtualScope;

use super::Analyzer;

/// The visitor's output: expression-id → resolved type, plus the type the
/// body returns.
#[derive(Debug, Default)]
pub(crate) struct ReanalyzeResult {
    pub expr_tys: FxHashMap<usize, Ty>,
    pub return_ty: Option<Ty>,
}

impl<'a> Analyzer<'a> {
    pub(crate) fn reanalyze_fun_signature(
        &mut self,
        ctx: &mut AnalysisContext,
        decl_id: DeclId,
        serial_name: &str,
    ) {
        if ctx.in_history(decl_id, Some(serial_name)) {
            return;
        }
        ctx.enter(decl_id, Some(serial_name.to_owned()));
        log::debug!("reanalyze `{serial_name}`");

        let (ast_ref, fun_scope, signature) = {
            let decl = self.decls.get(decl_id);
            let Some(fun) = decl.as_fun() else {
                ctx.leave(decl_id);
                return;
            };
            let signature = fun
                .signatures
                .borrow()
                .iter()
                .find(|signature| signature.serial_name == serial_name)
                .cloned();
            (decl.ast.clone(), decl.scope, signature)
        };
        let Some(signature) = signature else {
            ctx.leave(decl_id);
            return;
        };
        let Some(Decl {
            kind:
                DeclKind::Fun {
                    params: ast_params,
                    body: ast_body,
                    ..
                },
            ..
        }) = self.ast_decl(&ast_ref)
        else {
            ctx.leave(decl_id);
            return;
        };

        let generic_map = signature.generic_map.clone().unwrap_or_default();
        let mut virtual_scope = VirtualScope::new();
        for (param, ty) in ast_params.iter().zip(signature.param_tys().iter()) {
            virtual_scope.bind(&param.name, ty.clone());
        }

        let mut result = ReanalyzeResult::default();
        let mut counter = 0usize;
        for stmt in ast_body {
            self.reanalyze_stmt(
                stmt,
                fun_scope,
                &mut virtual_scope,
                &generic_map,
                &mut counter,
                &mut result,
            );
        }
        // A trailing expression is the implicit return.
        if result.return_ty.is_none() {
            if let Some(Stmt {
                kind: StmtKind::Expr(expr),
                ..
            }) = ast_body.last()
            {
                let ty = self.reanalyze_expr(
                    expr,
                    fun_scope,
                    &virtual_scope,
                    &generic_map,
                    &mut counter,
                    &mut result,
                );
                result.return_ty = Some(ty);
            }
        }

        // Concretize the signature's return type when the visitor found a
        // better answer than a compiler-generic leaf.
        if let Some(found) = &result.return_ty {
            if !found.contains_generic() && signature.return_ty().contains_generic() {
                let decl = self.decls.get(decl_id);
                if let Some(fun) = decl.as_fun() {
                    let mut signatures = fun.signatures.borrow_mut();
                    if let Some(entry) = signatures
                        .iter_mut()
                        .find(|entry| entry.serial_name == serial_name)
                    {
                        *entry.types.last_mut().expect("return slot") = found.clone();
                        entry.serial_name =
                            serialize_signature_name(&entry.global_name, &entry.types);
                    }
                }
            }
        }

        ctx.leave(decl_id);
    }

    #[allow(clippy::too_many_arguments)]
    fn reanalyze_stmt(
        &self,
        stmt: &Stmt,
        fun_scope: lily_span::ScopeId,
        virtual_scope: &mut VirtualScope<'_>,
        generic_map: &GenericMap,
        counter: &mut usize,
        result: &mut ReanalyzeResult,
    ) {
        match &stmt.kind {
            StmtKind::Variable { name, value, .. } => {
                let ty = self.reanalyze_expr(
                    value,
                    fun_scope,
                    virtual_scope,
                    generic_map,
                    counter,
                    result,
                );
                virtual_scope.bind(name, ty);
            }
            StmtKind::Return(Some(expr)) => {
                let ty = self.reanalyze_expr(
                    expr,
                    fun_scope,
                    virtual_scope,
                    generic_map,
                    counter,
                    result,
                );
                result.return_ty = Some(ty);
            }
            StmtKind::Return(None) => {
                result.return_ty = Some(Ty::new(TyKind::Unit));
            }
            StmtKind::Expr(expr) => {
                self.reanalyze_expr(expr, fun_scope, virtual_scope, generic_map, counter, result);
            }
            StmtKind::Block(stmts) | StmtKind::Unsafe(stmts) => {
                for stmt in stmts {
                    self.reanalyze_stmt(
                        stmt,
                        fun_scope,
                        virtual_scope,
                        generic_map,
                        counter,
                        result,
                    );
                }
            }
            StmtKind::If {
                cond,
                then,
                elifs,
                else_,
            } => {
                self.reanalyze_expr(cond, fun_scope, virtual_scope, generic_map, counter, result);
                for stmt in then {
                    self.reanalyze_stmt(
                        stmt,
                        fun_scope,
                        virtual_scope,
                        generic_map,
                        counter,
                        result,
                    );
                }
                for elif in elifs {
                    self.reanalyze_expr(
                        &elif.cond,
                        fun_scope,
                        virtual_scope,
                        generic_map,
                        counter,
                        result,
                    );
                    for stmt in &elif.body {
                        self.reanalyze_stmt(
                            stmt,
                            fun_scope,
                            virtual_scope,
                            generic_map,
                            counter,
                            result,
                        );
                    }
                }
                if let Some(stmts) = else_ {
                    for stmt in stmts {
                        self.reanalyze_stmt(
                            stmt,
                            fun_scope,
                            virtual_scope,
                            generic_map,
                            counter,
                            result,
                        );
                    }
                }
            }
            StmtKind::While { cond, body } => {
                self.reanalyze_expr(cond, fun_scope, virtual_scope, generic_map, counter, result);
                for stmt in body {
                    self.reanalyze_stmt(
                        stmt,
                        fun_scope,
                        virtual_scope,
                        generic_map,
                        counter,
                        result,
                    );
                }
            }
            // Other statement kinds carry no type information the
            // signature return could depend on.
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn reanalyze_expr(
        &self,
        expr: &Expr,
        fun_scope: lily_span::ScopeId,
        virtual_scope: &VirtualScope<'_>,
        generic_map: &GenericMap,
        counter: &mut usize,
        result: &mut ReanalyzeResult,
    ) -> Ty {
        let expr_id = *counter;
        *counter += 1;

        let ty = match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Bool(_) => Ty::new(TyKind::Bool),
                Literal::Int(value) => {
                    if TyKind::Int32.fits_int(*value) {
                        Ty::new(TyKind::Int32)
                    } else {
                        Ty::new(TyKind::Int64)
                    }
                }
                Literal::Float(_) => Ty::new(TyKind::Float64),
                Literal::Byte(_) => Ty::new(TyKind::Byte),
                Literal::Char(_) => Ty::new(TyKind::Char),
                Literal::Str(text) => Ty::new(TyKind::Str(Some(text.len()))),
                Literal::Bytes(bytes) => Ty::new(TyKind::Bytes(Some(bytes.len()))),
                Literal::CStr(_) => Ty::new(TyKind::CStr),
                Literal::Unit => Ty::new(TyKind::Unit),
                _ => Ty::new(TyKind::Unknown),
            },
            ExprKind::Identifier(name) => virtual_scope
                .resolve(name)
                .map(|ty| ty.resolve_generic(generic_map))
                .unwrap_or_else(|| match self.scopes.search_identifier(fun_scope, name) {
                    SearchResponse::Variable { ty, .. }
                    | SearchResponse::Param { ty, .. }
                    | SearchResponse::CapturedVariable { ty, .. } => {
                        ty.resolve_generic(generic_map)
                    }
                    SearchResponse::Constant { decl } => self
                        .decls
                        .get(decl)
                        .as_constant()
                        .map(|constant| constant.ty.borrow().clone())
                        .unwrap_or_else(|| Ty::new(TyKind::Unknown)),
                    _ => Ty::new(TyKind::Unknown),
                }),
            ExprKind::Grouping(inner) => self.reanalyze_expr(
                inner,
                fun_scope,
                virtual_scope,
                generic_map,
                counter,
                result,
            ),
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = self.reanalyze_expr(
                    lhs,
                    fun_scope,
                    virtual_scope,
                    generic_map,
                    counter,
                    result,
                );
                let rhs_ty = self.reanalyze_expr(
                    rhs,
                    fun_scope,
                    virtual_scope,
                    generic_map,
                    counter,
                    result,
                );
                if op.is_comparison() || op.is_logical() {
                    Ty::new(TyKind::Bool)
                } else if op.is_assign() {
                    Ty::new(TyKind::Unit)
                } else if lhs_ty.is_unknown() || lhs_ty.contains_generic() {
                    rhs_ty
                } else {
                    lhs_ty
                }
            }
            ExprKind::Unary { op, rhs } => {
                let rhs_ty = self.reanalyze_expr(
                    rhs,
                    fun_scope,
                    virtual_scope,
                    generic_map,
                    counter,
                    result,
                );
                match op {
                    lily_ast::UnaryOp::Not => Ty::new(TyKind::Bool),
                    _ => rhs_ty,
                }
            }
            ExprKind::FunCall { name, args, .. } => {
                for arg in args {
                    self.reanalyze_expr(
                        arg,
                        fun_scope,
                        virtual_scope,
                        generic_map,
                        counter,
                        result,
                    );
                }
                match self.scopes.search_fun(fun_scope, name.last()) {
                    SearchResponse::Fun { decl } => self
                        .decls
                        .get(decl)
                        .as_fun()
                        .map(|fun| fun.return_ty.borrow().resolve_generic(generic_map))
                        .unwrap_or_else(|| Ty::new(TyKind::Unknown)),
                    _ => Ty::new(TyKind::Unknown),
                }
            }
            _ => Ty::new(TyKind::Unknown),
        };

        result.expr_tys.insert(expr_id, ty.clone());
        ty
    }
}
