//! Statement and function-body checking.

use std::rc::Rc;

use if_chain::if_chain;
use lily_ast::{Expr, ForCapture, Stmt, StmtKind};
use lily_errors::{DiagnosticKind, WarningKind};
use lily_span::{Location, ScopeId};
use lily_ty::{Guarantee, Ty, TyKind};

use crate::checked::{
    CheckedCall, CheckedExpr, CheckedExprKind, CheckedLiteral, CheckedStmt, CheckedStmtKind,
};
use crate::context::AnalysisContext;
use crate::scope::{CapturedVariable, ScopeTag, SearchResponse, VariableEntry};

use super::Analyzer;

impl<'a> Analyzer<'a> {
    pub(crate) fn check_stmts(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        stmts: &[Stmt],
    ) -> Vec<CheckedStmt> {
        stmts
            .iter()
            .map(|stmt| self.check_stmt(ctx, scope, stmt))
            .collect()
    }

    pub(crate) fn check_stmt(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        stmt: &Stmt,
    ) -> CheckedStmt {
        let location = stmt.location;
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                let block_scope = self.scopes.alloc(Some(scope), ScopeTag::Block);
                let checked = self.check_stmts(ctx, block_scope, stmts);
                CheckedStmt::new(
                    CheckedStmtKind::Block {
                        scope: block_scope,
                        stmts: checked,
                    },
                    location,
                )
            }
            StmtKind::If {
                cond,
                then,
                elifs,
                else_,
            } => self.check_if(ctx, scope, cond, then, elifs, else_.as_deref(), location),
            StmtKind::While { cond, body } => {
                let checked_cond = self.check_expr(ctx, scope, cond, None);
                if !checked_cond.ty.is_guaranteed(Guarantee::Bool) {
                    self.error(checked_cond.location, DiagnosticKind::ExpectedBooleanExpression);
                }
                let body_scope = self.scopes.alloc(Some(scope), ScopeTag::While);
                let checked_body = self.check_stmts(ctx, body_scope, body);
                CheckedStmt::new(
                    CheckedStmtKind::While {
                        cond: checked_cond,
                        scope: body_scope,
                        body: checked_body,
                    },
                    location,
                )
            }
            StmtKind::For {
                capture,
                iterable,
                body,
            } => self.check_for(ctx, scope, capture, iterable, body, location),
            StmtKind::Match { scrutinee, cases } => {
                self.check_match(ctx, scope, scrutinee, cases, location)
            }
            StmtKind::Try { body, catch } => self.check_try(ctx, scope, body, catch, location),
            StmtKind::Unsafe(stmts) => {
                let unsafe_scope = self.scopes.alloc(Some(scope), ScopeTag::Unsafe);
                let checked = self.check_stmts(ctx, unsafe_scope, stmts);
                CheckedStmt::new(
                    CheckedStmtKind::Unsafe {
                        scope: unsafe_scope,
                        body: checked,
                    },
                    location,
                )
            }
            StmtKind::Defer(inner) => {
                // Checked eagerly; the buffered copy is re-emitted (by
                // refcount) at every exit point of the scope.
                let defer_scope = self.scopes.alloc(Some(scope), ScopeTag::Defer);
                let checked = Rc::new(self.check_stmt(ctx, defer_scope, inner));
                self.scopes.push_deferred(scope, checked.clone());
                CheckedStmt::new(CheckedStmtKind::Defer(checked), location)
            }
            StmtKind::Drop(expr) => self.check_drop(ctx, scope, expr, location),
            StmtKind::Raise { name, values } => {
                self.check_raise(ctx, scope, name, values, location)
            }
            StmtKind::Return(expr) => self.check_return(ctx, scope, expr.as_deref(), location),
            StmtKind::Variable {
                name,
                ty,
                value,
                mutable,
            } => {
                let declared = match ty {
                    Some(data_ty) => self.check_data_ty(ctx, scope, data_ty),
                    None => Ty::new(TyKind::Unknown),
                };
                let defined = if declared.is_unknown() {
                    None
                } else {
                    Some(declared.clone())
                };
                let checked_value = self.check_expr(ctx, scope, value, defined.as_ref());
                if declared.is_unknown() {
                    let _ = declared.update(checked_value.ty.clone_kind());
                } else if !self.unify(&declared, &checked_value.ty) {
                    self.error(checked_value.location, DiagnosticKind::DataTypeDontMatch);
                }
                if self
                    .scopes
                    .push_variable(
                        scope,
                        name,
                        VariableEntry {
                            ty: declared.clone(),
                            mutable: *mutable,
                            location,
                        },
                    )
                    .is_err()
                {
                    self.error(location, DiagnosticKind::DuplicateVariable);
                }
                CheckedStmt::new(
                    CheckedStmtKind::Variable {
                        name: name.clone(),
                        ty: declared,
                        value: checked_value,
                        mutable: *mutable,
                    },
                    location,
                )
            }
            StmtKind::Expr(expr) => {
                let checked = self.check_expr(ctx, scope, expr, None);
                CheckedStmt::new(CheckedStmtKind::Expr(checked), location)
            }
            StmtKind::Break => {
                if !self.scopes.in_loop(scope) {
                    self.error(location, DiagnosticKind::BreakIsNotExpectedInThisContext);
                }
                CheckedStmt::new(CheckedStmtKind::Break, location)
            }
            StmtKind::Next => {
                if !self.scopes.in_loop(scope) {
                    self.error(location, DiagnosticKind::NextIsNotExpectedInThisContext);
                }
                CheckedStmt::new(CheckedStmtKind::Next, location)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_if(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        cond: &Expr,
        then: &[Stmt],
        elifs: &[lily_ast::ElifBranch],
        else_: Option<&[Stmt]>,
        location: Location,
    ) -> CheckedStmt {
        let mut branches = Vec::with_capacity(1 + elifs.len());
        let mut branch_scopes = Vec::new();

        let checked_cond = self.check_expr(ctx, scope, cond, None);
        if !checked_cond.ty.is_guaranteed(Guarantee::Bool) {
            self.error(checked_cond.location, DiagnosticKind::ExpectedBooleanExpression);
        }
        let then_scope = self.scopes.alloc(Some(scope), ScopeTag::If);
        let checked_then = self.check_stmts(ctx, then_scope, then);
        branch_scopes.push(then_scope);
        branches.push((checked_cond, then_scope, checked_then));

        for elif in elifs {
            let checked_cond = self.check_expr(ctx, scope, &elif.cond, None);
            if !checked_cond.ty.is_guaranteed(Guarantee::Bool) {
                self.error(checked_cond.location, DiagnosticKind::ExpectedBooleanExpression);
            }
            let elif_scope = self.scopes.alloc(Some(scope), ScopeTag::If);
            let checked_body = self.check_stmts(ctx, elif_scope, &elif.body);
            branch_scopes.push(elif_scope);
            branches.push((checked_cond, elif_scope, checked_body));
        }

        let checked_else = else_.map(|stmts| {
            let else_scope = self.scopes.alloc(Some(scope), ScopeTag::Else);
            let checked = self.check_stmts(ctx, else_scope, stmts);
            branch_scopes.push(else_scope);
            (else_scope, checked)
        });

        // The whole `if` returns only when every branch, else included,
        // returns.
        if checked_else.is_some()
            && branch_scopes
                .iter()
                .all(|&branch| self.scopes.has_return(branch))
        {
            self.scopes.set_has_return(scope);
        }

        CheckedStmt::new(
            CheckedStmtKind::If {
                branches,
                else_: checked_else,
            },
            location,
        )
    }

    fn check_for(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        capture: &ForCapture,
        iterable: &Expr,
        body: &[Stmt],
        location: Location,
    ) -> CheckedStmt {
        let checked_iterable = self.check_expr(ctx, scope, iterable, None);
        let elem_ty = match checked_iterable.ty.clone_kind() {
            TyKind::List(inner)
            | TyKind::SizedArray(_, inner)
            | TyKind::UnsizedArray(inner)
            | TyKind::DynamicArray(inner) => inner,
            TyKind::Str(_) => Ty::new(TyKind::Char),
            TyKind::Bytes(_) => Ty::new(TyKind::Byte),
            _ => {
                self.error(checked_iterable.location, DiagnosticKind::DataTypeDontMatch);
                Ty::new(TyKind::Unknown)
            }
        };

        let body_scope = self.scopes.alloc(Some(scope), ScopeTag::For);
        let captures: Vec<(String, Ty)> = match capture {
            ForCapture::Identifier(name) => vec![(name.clone(), elem_ty)],
            ForCapture::Tuple(names) => match elem_ty.clone_kind() {
                TyKind::Tuple(items) if items.len() == names.len() => names
                    .iter()
                    .cloned()
                    .zip(items.iter().cloned())
                    .collect(),
                _ => {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                    names
                        .iter()
                        .map(|name| (name.clone(), Ty::new(TyKind::Unknown)))
                        .collect()
                }
            },
        };
        for (name, ty) in &captures {
            if self
                .scopes
                .add_captured_variable(body_scope, name, CapturedVariable { ty: ty.clone() })
                .is_err()
            {
                self.error(location, DiagnosticKind::DuplicateVariable);
            }
        }

        let checked_body = self.check_stmts(ctx, body_scope, body);
        CheckedStmt::new(
            CheckedStmtKind::For {
                captures,
                iterable: checked_iterable,
                scope: body_scope,
                body: checked_body,
            },
            location,
        )
    }

    fn check_try(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        body: &[Stmt],
        catch: &Option<(Option<String>, Vec<Stmt>)>,
        location: Location,
    ) -> CheckedStmt {
        let try_scope = self.scopes.alloc(Some(scope), ScopeTag::Try);
        self.scopes.get_mut(try_scope).raises = Some(Vec::new());

        ctx.in_try.push(try_scope);
        let checked_body = self.check_stmts(ctx, try_scope, body);
        ctx.in_try.pop();

        let raises = self
            .scopes
            .get(try_scope)
            .raises
            .clone()
            .unwrap_or_default();

        let checked_catch = catch.as_ref().map(|(catch_name, catch_body)| {
            let catch_scope = self.scopes.alloc(Some(scope), ScopeTag::Catch);
            if let Some(name) = catch_name {
                // The catch binding takes the raised error type when the
                // body raises exactly one, the union placeholder otherwise.
                let catch_ty = match raises.as_slice() {
                    [single] => single.clone(),
                    _ => Ty::new(TyKind::Unknown),
                };
                self.scopes.set_catch_name(catch_scope, name, catch_ty);
            }
            let checked = self.check_stmts(ctx, catch_scope, catch_body);
            (catch_name.clone(), catch_scope, checked)
        });

        CheckedStmt::new(
            CheckedStmtKind::Try {
                scope: try_scope,
                body: checked_body,
                catch: checked_catch,
                raises,
            },
            location,
        )
    }

    fn check_drop(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        expr: &Expr,
        location: Location,
    ) -> CheckedStmt {
        let checked = self.check_expr(ctx, scope, expr, None);
        if_chain! {
            if let CheckedExprKind::Call(call) = &checked.kind;
            if matches!(
                call,
                CheckedCall::Variable { .. }
                    | CheckedCall::Param { .. }
                    | CheckedCall::CapturedVariable { .. }
            );
            then {
                let droppable = checked.ty.direct_custom().is_some()
                    || checked.ty.is_guaranteed(Guarantee::Ptr)
                    || checked.ty.is_guaranteed(Guarantee::Ref);
                if !droppable {
                    self.error(checked.location, DiagnosticKind::DataTypeCannotBeDropped);
                }
            } else {
                if !matches!(checked.kind, CheckedExprKind::Unknown) {
                    self.error(checked.location, DiagnosticKind::ThisKindOfExprIsNotAllowedToDrop);
                }
            }
        }
        CheckedStmt::new(CheckedStmtKind::Drop(checked), location)
    }

    fn check_raise(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &lily_ast::AstPath,
        values: &[Expr],
        location: Location,
    ) -> CheckedStmt {
        let SearchResponse::Error { decl } = self.scopes.search_error(scope, name.last()) else {
            self.error(
                location,
                DiagnosticKind::UnknownIdentifier(name.last().to_owned()),
            );
            return CheckedStmt::new(
                CheckedStmtKind::Raise {
                    error_ty: Ty::new(TyKind::Unknown),
                    values: Vec::new(),
                },
                location,
            );
        };
        self.ensure_checked(ctx, decl);

        let fields = self
            .decls
            .get(decl)
            .as_error()
            .map(|error| error.fields.borrow().clone())
            .unwrap_or_default();
        if values.len() != fields.len() {
            self.error(location, DiagnosticKind::NumberOfParamsMismatched);
        }
        let checked_values: Vec<CheckedExpr> = values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let defined = fields.get(index).map(|field| field.ty.clone());
                let checked = self.check_expr(ctx, scope, value, defined.as_ref());
                if let Some(expected) = &defined {
                    if !self.unify(expected, &checked.ty) {
                        self.error(checked.location, DiagnosticKind::DataTypeDontMatch);
                    }
                }
                checked
            })
            .collect();

        let error_ty = self.decl_custom_ty(decl, None, scope);
        // The raise set lives on the function and, inside `try`, on the
        // try's scope.
        if let Some(fun_id) = self.scopes.get_current_fun(scope) {
            if let Some(fun) = self.decls.get(fun_id).as_fun() {
                let mut raises = fun.raises.borrow_mut();
                if !raises.contains(&error_ty) {
                    raises.push(error_ty.clone());
                }
            }
        }
        if let Some(try_scope) = ctx.current_try() {
            self.scopes.add_raise(try_scope, error_ty.clone());
        }

        CheckedStmt::new(
            CheckedStmtKind::Raise {
                error_ty,
                values: checked_values,
            },
            location,
        )
    }

    fn check_return(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        expr: Option<&Expr>,
        location: Location,
    ) -> CheckedStmt {
        let Some(fun_id) = self.scopes.get_current_fun(scope) else {
            self.error(location, DiagnosticKind::ReturnIsNotExpectedInThisContext);
            return CheckedStmt::new(
                CheckedStmtKind::Return {
                    expr: None,
                    deferred: Vec::new(),
                },
                location,
            );
        };
        let (return_ty, is_main) = {
            let fun = self.decls.get(fun_id).as_fun().expect("fun scope tag");
            (fun.return_ty.borrow().clone(), fun.is_main)
        };

        let checked_expr = expr.map(|expr| {
            let defined = if return_ty.is_unknown() {
                None
            } else {
                Some(return_ty.clone())
            };
            self.check_expr(ctx, scope, expr, defined.as_ref())
        });

        match &checked_expr {
            Some(checked) => {
                let unit_main_exit_code = is_main
                    && matches!(checked.kind, CheckedExprKind::Literal(CheckedLiteral::Int(_)))
                    && (return_ty.is_unknown()
                        || return_ty.is_guaranteed(Guarantee::Unit));
                if unit_main_exit_code {
                    // `return 0` from a unit main is the exit-code idiom.
                    if return_ty.is_unknown() {
                        let _ = return_ty.update(TyKind::Unit);
                    }
                } else if return_ty.is_unknown() {
                    let _ = return_ty.update(checked.ty.clone_kind());
                } else if !self.unify(&return_ty, &checked.ty) {
                    self.error(checked.location, DiagnosticKind::DataTypeDontMatch);
                }
            }
            None => {
                if return_ty.is_unknown() {
                    let _ = return_ty.update(TyKind::Unit);
                } else if !self.unify(&return_ty, &Ty::new(TyKind::Unit)) {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
            }
        }

        let deferred = self.collect_deferred(scope);
        self.scopes.set_has_return(scope);
        CheckedStmt::new(
            CheckedStmtKind::Return {
                expr: checked_expr,
                deferred,
            },
            location,
        )
    }

    /// Deferred statements visible from `scope` up to the enclosing
    /// function, innermost first. Shared by refcount so multiple exit
    /// points can dump the same items.
    fn collect_deferred(&self, scope: ScopeId) -> Vec<Rc<CheckedStmt>> {
        let mut deferred = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(id);
            for stmt in scope.deferred.iter().rev() {
                deferred.push(stmt.clone());
            }
            if !scope.tag.is_block_like() {
                break;
            }
            current = scope.parent;
        }
        deferred
    }

    // -- function bodies -----------------------------------------------

    pub(crate) fn check_fun_body(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        stmts: &[Stmt],
        return_ty: &Ty,
        is_main: bool,
    ) -> Vec<CheckedStmt> {
        let mut checked: Vec<CheckedStmt> = Vec::with_capacity(stmts.len());
        let mut reported_unreachable = false;
        for stmt in stmts {
            if self.scopes.has_return(scope) && !reported_unreachable {
                self.warn(stmt.location, WarningKind::UnreachableCode);
                reported_unreachable = true;
            }
            checked.push(self.check_stmt(ctx, scope, stmt));
        }

        // Without an explicit return, the trailing expression becomes one.
        if !self.scopes.has_return(scope) {
            if matches!(
                checked.last().map(|stmt| &stmt.kind),
                Some(CheckedStmtKind::Expr(_))
            ) {
                let trailing = checked.pop().expect("non-empty tail");
                let location = trailing.location;
                let CheckedStmtKind::Expr(expr) = trailing.kind else {
                    unreachable!()
                };
                let accept_as_exit_code = is_main
                    && matches!(expr.kind, CheckedExprKind::Literal(CheckedLiteral::Int(_)));
                if !accept_as_exit_code {
                    if return_ty.is_unknown() {
                        let _ = return_ty.update(expr.ty.clone_kind());
                    } else if !self.unify(return_ty, &expr.ty) {
                        self.error(expr.location, DiagnosticKind::DataTypeDontMatch);
                    }
                }
                let deferred = self.collect_deferred(scope);
                checked.push(CheckedStmt::new(
                    CheckedStmtKind::Return {
                        expr: Some(expr),
                        deferred,
                    },
                    location,
                ));
                self.scopes.set_has_return(scope);
            }
        }

        // Non-trailing expression statements of non-unit type do nothing.
        for stmt in &checked {
            if let CheckedStmtKind::Expr(expr) = &stmt.kind {
                let kind = expr.ty.clone_kind();
                if !matches!(kind, TyKind::Unit | TyKind::Never | TyKind::Unknown) {
                    self.warn(expr.location, WarningKind::UnusedExpression);
                }
            }
        }

        checked
    }
}
