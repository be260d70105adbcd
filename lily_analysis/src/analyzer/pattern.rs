//! Pattern checking, match exhaustiveness, and the match-vs-switch
//! selection with pattern-to-expression lowering.

use either::Either;
use indexmap::IndexMap;
use lily_ast::{BinaryOp, Expr, Literal, MatchCase, Pat, PatKind};
use lily_errors::{DiagnosticKind, WarningKind};
use lily_span::{Location, ScopeId};
use lily_ty::{CustomKind, GenericMap, Guarantee, Ty, TyKind};
use rustc_hash::FxHashSet;

use crate::checked::{
    CheckedExpr, CheckedExprKind, CheckedLiteral, CheckedMatch, CheckedMatchCase, CheckedPattern,
    CheckedPatternKind, CheckedPathSegment, CheckedStmt, CheckedStmtKind, CheckedSwitch,
    CheckedSwitchCase, PathSegmentKind,
};
use crate::context::AnalysisContext;
use crate::scope::{CapturedVariable, ScopeTag, SearchResponse};

use super::Analyzer;

/// Identity of a case for duplicate detection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum CaseKey {
    Bool(bool),
    Int(i128),
    Variant(String),
    OptionalSome,
    OptionalNone,
    Range(i128, i128),
    Other(String),
}

impl CaseKey {
    /// Whether this case narrows the scrutinee's case space (`total_cases`
    /// counts these).
    fn contributes(&self) -> bool {
        matches!(
            self,
            CaseKey::Bool(_) | CaseKey::Variant(_) | CaseKey::OptionalSome | CaseKey::OptionalNone
        )
    }
}

/// `None` means the case accepts everything.
fn case_key(pat: &Pat) -> Option<CaseKey> {
    match &pat.kind {
        PatKind::Name(_) | PatKind::Wildcard | PatKind::AutoComplete | PatKind::Else => None,
        PatKind::Literal(Literal::Bool(value)) => Some(CaseKey::Bool(*value)),
        PatKind::Literal(Literal::Int(value)) => Some(CaseKey::Int(*value)),
        PatKind::Literal(Literal::None) => Some(CaseKey::OptionalNone),
        PatKind::Range { lo: Literal::Int(lo), hi: Literal::Int(hi) } => {
            Some(CaseKey::Range(*lo, *hi))
        }
        PatKind::VariantCall { name, .. } if name.last() == "Some" => Some(CaseKey::OptionalSome),
        PatKind::VariantCall { name, .. } if name.last() == "None" => Some(CaseKey::OptionalNone),
        PatKind::VariantCall { name, .. } => Some(CaseKey::Variant(name.last().to_owned())),
        other => Some(CaseKey::Other(format!("{other:?}"))),
    }
}

impl<'a> Analyzer<'a> {
    pub(crate) fn check_match(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        scrutinee: &Expr,
        cases: &[MatchCase],
        location: Location,
    ) -> CheckedStmt {
        let checked_scrutinee = self.check_expr(ctx, scope, scrutinee, None);
        let scrutinee_ty = checked_scrutinee.ty.clone();

        let use_switch = self.selects_switch(&scrutinee_ty);
        let total_cases = self.total_cases(&scrutinee_ty);
        let mut nb_cases = 0usize;
        let mut seen: FxHashSet<CaseKey> = FxHashSet::default();

        let mut match_cases: Vec<CheckedMatchCase> = Vec::new();
        let mut switch_cases: Vec<CheckedSwitchCase> = Vec::new();
        let mut else_case: Option<(ScopeId, Vec<CheckedStmt>)> = None;
        let mut case_scopes: Vec<ScopeId> = Vec::new();

        for case in cases {
            if nb_cases >= total_cases {
                self.warn(case.location, WarningKind::UnusedCase);
            }
            match case_key(&case.pat) {
                None => nb_cases = total_cases,
                Some(key) => {
                    if !seen.insert(key.clone()) {
                        self.error(case.location, DiagnosticKind::DuplicateCase);
                    } else if key.contributes() {
                        nb_cases += 1;
                    }
                }
            }

            let mut captures: IndexMap<String, Ty> = IndexMap::new();
            let checked_pat = self.check_pattern(
                ctx,
                scope,
                &case.pat,
                &scrutinee_ty,
                &mut captures,
                use_switch,
            );

            // Captures are write-only within a case and flushed into the
            // case's scope once its body begins.
            let case_scope = self.scopes.alloc(Some(scope), ScopeTag::MatchCase);
            case_scopes.push(case_scope);
            for (name, ty) in &captures {
                let _ = self.scopes.add_captured_variable(
                    case_scope,
                    name,
                    CapturedVariable { ty: ty.clone() },
                );
            }

            let checked_guard = case.guard.as_ref().map(|guard| {
                let checked = self.check_expr(ctx, case_scope, guard, None);
                if !checked.ty.is_guaranteed(Guarantee::Bool) {
                    self.error(checked.location, DiagnosticKind::ExpectedBooleanExpression);
                }
                checked
            });

            let checked_body = self.check_stmts(ctx, case_scope, &case.body);

            if use_switch {
                match checked_pat {
                    None => {
                        // Binding patterns are erased in switch mode; they
                        // become the else case.
                        if else_case.is_none() {
                            else_case = Some((case_scope, checked_body));
                        }
                    }
                    Some(pattern) => {
                        let predicate = match self.pattern_to_expr(&pattern, &checked_scrutinee) {
                            Some(predicate) => predicate,
                            None => {
                                self.error(
                                    pattern.location,
                                    DiagnosticKind::Unsupported(
                                        "pattern in switch lowering",
                                    ),
                                );
                                truth(pattern.location)
                            }
                        };
                        switch_cases.push(CheckedSwitchCase {
                            predicate,
                            scope: case_scope,
                            body: checked_body,
                        });
                    }
                }
            } else {
                let pattern = checked_pat.unwrap_or(CheckedPattern {
                    kind: CheckedPatternKind::Wildcard,
                    ty: scrutinee_ty.clone(),
                    location: case.pat.location,
                });
                match_cases.push(CheckedMatchCase {
                    pattern,
                    captures: captures.into_iter().collect(),
                    guard: checked_guard,
                    scope: case_scope,
                    body: checked_body,
                });
            }
        }

        if nb_cases < total_cases {
            self.error(location, DiagnosticKind::NonExhaustivePatterns);
        } else if !case_scopes.is_empty()
            && case_scopes.iter().all(|&case| self.scopes.has_return(case))
        {
            self.scopes.set_has_return(scope);
        }

        let lowered: Either<CheckedMatch, CheckedSwitch> = if use_switch {
            Either::Right(CheckedSwitch {
                scrutinee: checked_scrutinee,
                cases: switch_cases,
                else_case,
            })
        } else {
            Either::Left(CheckedMatch {
                scrutinee: checked_scrutinee,
                cases: match_cases,
                nb_cases,
                total_cases,
            })
        };
        match lowered {
            Either::Left(checked_match) => {
                CheckedStmt::new(CheckedStmtKind::Match(checked_match), location)
            }
            Either::Right(checked_switch) => {
                CheckedStmt::new(CheckedStmtKind::Switch(checked_switch), location)
            }
        }
    }

    /// Switch lowering applies to primitive integers, bools, and
    /// payloadless enums (plain tags); everything else stays a structural
    /// match.
    fn selects_switch(&self, ty: &Ty) -> bool {
        if ty.is_guaranteed(Guarantee::Integer) || ty.is_guaranteed(Guarantee::Bool) {
            return true;
        }
        if let Some(custom) = ty.direct_custom() {
            if custom.kind == CustomKind::Enum {
                if let Some(decl_id) = self.decl_of_scope(custom.scope_id) {
                    if let Some(enum_decl) = self.decls.get(decl_id).as_enum() {
                        return enum_decl
                            .variants
                            .borrow()
                            .iter()
                            .all(|variant| variant.values.is_empty());
                    }
                }
            }
        }
        false
    }

    // -- pattern checking ----------------------------------------------

    /// Check one pattern against the defined (scrutinee) type, collecting
    /// captured names. In switch mode, patterns that only bind are erased
    /// (`None`).
    pub(crate) fn check_pattern(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        pat: &Pat,
        defined: &Ty,
        captures: &mut IndexMap<String, Ty>,
        switch_mode: bool,
    ) -> Option<CheckedPattern> {
        let location = pat.location;
        match &pat.kind {
            PatKind::Name(name) => {
                self.add_capture(captures, name, defined.clone(), location);
                if switch_mode {
                    return None;
                }
                Some(CheckedPattern::new(
                    CheckedPatternKind::Name(name.clone()),
                    defined.clone(),
                    location,
                ))
            }
            PatKind::Wildcard => {
                if switch_mode {
                    return None;
                }
                Some(CheckedPattern::new(
                    CheckedPatternKind::Wildcard,
                    defined.clone(),
                    location,
                ))
            }
            PatKind::AutoComplete => {
                if switch_mode {
                    return None;
                }
                Some(CheckedPattern::new(
                    CheckedPatternKind::AutoComplete,
                    defined.clone(),
                    location,
                ))
            }
            PatKind::Else => {
                if switch_mode {
                    return None;
                }
                Some(CheckedPattern::new(
                    CheckedPatternKind::Else,
                    defined.clone(),
                    location,
                ))
            }
            PatKind::Array(elems) => {
                self.check_sequence_pattern(ctx, scope, elems, defined, captures, location, true)
            }
            PatKind::List(elems) => {
                self.check_sequence_pattern(ctx, scope, elems, defined, captures, location, false)
            }
            PatKind::ListHead { head, rest } => {
                let elem_ty = self.list_elem_ty(defined, location);
                let checked_head = head
                    .iter()
                    .filter_map(|elem| {
                        self.check_pattern(ctx, scope, elem, &elem_ty, captures, false)
                    })
                    .collect();
                if let Some(rest_name) = rest {
                    self.add_capture(captures, rest_name, defined.clone(), location);
                }
                Some(CheckedPattern::new(
                    CheckedPatternKind::ListHead {
                        head: checked_head,
                        rest: rest.clone(),
                    },
                    defined.clone(),
                    location,
                ))
            }
            PatKind::ListTail { rest, tail } => {
                let elem_ty = self.list_elem_ty(defined, location);
                let checked_tail = tail
                    .iter()
                    .filter_map(|elem| {
                        self.check_pattern(ctx, scope, elem, &elem_ty, captures, false)
                    })
                    .collect();
                if let Some(rest_name) = rest {
                    self.add_capture(captures, rest_name, defined.clone(), location);
                }
                Some(CheckedPattern::new(
                    CheckedPatternKind::ListTail {
                        rest: rest.clone(),
                        tail: checked_tail,
                    },
                    defined.clone(),
                    location,
                ))
            }
            PatKind::Tuple(elems) => {
                let item_tys = match defined.clone_kind() {
                    TyKind::Tuple(items) if items.len() == elems.len() => items,
                    _ => {
                        self.error(location, DiagnosticKind::DataTypeDontMatch);
                        elems.iter().map(|_| Ty::new(TyKind::Unknown)).collect()
                    }
                };
                let checked_elems = elems
                    .iter()
                    .zip(item_tys.iter())
                    .filter_map(|(elem, item_ty)| {
                        self.check_pattern(ctx, scope, elem, item_ty, captures, false)
                    })
                    .collect();
                Some(CheckedPattern::new(
                    CheckedPatternKind::Tuple(checked_elems),
                    defined.clone(),
                    location,
                ))
            }
            PatKind::RecordCall { name, fields } => {
                self.check_record_pattern(ctx, scope, name, fields, defined, captures, location)
            }
            PatKind::VariantCall { name, args } => {
                self.check_variant_pattern(ctx, scope, name, args, defined, captures, location)
            }
            PatKind::As { pat: inner, name } => {
                if !matches!(inner.kind, PatKind::AutoComplete) {
                    self.error(
                        location,
                        DiagnosticKind::Unsupported("`as` over a non-`..` pattern"),
                    );
                }
                let checked_inner =
                    self.check_pattern(ctx, scope, inner, defined, captures, false)?;
                self.add_capture(captures, name, defined.clone(), location);
                Some(CheckedPattern::new(
                    CheckedPatternKind::As {
                        pat: Box::new(checked_inner),
                        name: name.clone(),
                    },
                    defined.clone(),
                    location,
                ))
            }
            PatKind::Range { lo, hi } => {
                let (Literal::Int(lo_value), Literal::Int(hi_value)) = (lo, hi) else {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                    return Some(CheckedPattern::new(
                        CheckedPatternKind::Wildcard,
                        defined.clone(),
                        location,
                    ));
                };
                let defined_kind = defined.clone_kind();
                if !defined_kind.matches_guarantee(Guarantee::Integer)
                    || !defined_kind.fits_int(*lo_value)
                    || !defined_kind.fits_int(*hi_value)
                {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
                Some(CheckedPattern::new(
                    CheckedPatternKind::Range {
                        lo: CheckedLiteral::Int(*lo_value),
                        hi: CheckedLiteral::Int(*hi_value),
                    },
                    defined.clone(),
                    location,
                ))
            }
            PatKind::Error { name, inner } => {
                let SearchResponse::Error { decl } = self.scopes.search_error(scope, name.last())
                else {
                    self.error(
                        location,
                        DiagnosticKind::UnknownIdentifier(name.last().to_owned()),
                    );
                    return Some(CheckedPattern::new(
                        CheckedPatternKind::Wildcard,
                        defined.clone(),
                        location,
                    ));
                };
                self.ensure_checked(ctx, decl);
                let payload_ty = self
                    .decls
                    .get(decl)
                    .as_error()
                    .and_then(|error| error.fields.borrow().first().map(|field| field.ty.clone()))
                    .unwrap_or_else(|| Ty::new(TyKind::Unit));
                let checked_inner = inner.as_ref().and_then(|inner| {
                    self.check_pattern(ctx, scope, inner, &payload_ty, captures, false)
                        .map(Box::new)
                });
                Some(CheckedPattern::new(
                    CheckedPatternKind::Error {
                        decl,
                        inner: checked_inner,
                    },
                    defined.clone(),
                    location,
                ))
            }
            PatKind::Literal(literal) => {
                self.check_literal_pattern(scope, literal, defined, location)
            }
        }
    }

    fn add_capture(
        &mut self,
        captures: &mut IndexMap<String, Ty>,
        name: &str,
        ty: Ty,
        location: Location,
    ) {
        if captures.insert(name.to_owned(), ty).is_some() {
            self.error(location, DiagnosticKind::DuplicateVariable);
        }
    }

    fn list_elem_ty(&mut self, defined: &Ty, location: Location) -> Ty {
        match defined.clone_kind() {
            TyKind::List(inner) => inner,
            _ => {
                self.error(location, DiagnosticKind::DataTypeDontMatch);
                Ty::new(TyKind::Unknown)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_sequence_pattern(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        elems: &[Pat],
        defined: &Ty,
        captures: &mut IndexMap<String, Ty>,
        location: Location,
        is_array: bool,
    ) -> Option<CheckedPattern> {
        let auto_complete = elems
            .iter()
            .any(|elem| matches!(elem.kind, PatKind::AutoComplete));
        let concrete_len = elems
            .iter()
            .filter(|elem| !matches!(elem.kind, PatKind::AutoComplete))
            .count();

        let elem_ty = match defined.clone_kind() {
            TyKind::SizedArray(size, inner) if is_array => {
                // `..` relaxes "exactly n" to "at least n".
                if (!auto_complete && concrete_len != size)
                    || (auto_complete && concrete_len > size)
                {
                    self.error(location, DiagnosticKind::ExpectedSizedArrayWithTheSameSize);
                }
                inner
            }
            TyKind::UnsizedArray(inner) | TyKind::DynamicArray(inner) if is_array => inner,
            TyKind::List(inner) if !is_array => inner,
            _ => {
                self.error(location, DiagnosticKind::DataTypeDontMatch);
                Ty::new(TyKind::Unknown)
            }
        };

        let checked_elems: Vec<CheckedPattern> = elems
            .iter()
            .filter(|elem| !matches!(elem.kind, PatKind::AutoComplete))
            .filter_map(|elem| self.check_pattern(ctx, scope, elem, &elem_ty, captures, false))
            .collect();

        let kind = if is_array {
            CheckedPatternKind::Array {
                elems: checked_elems,
                auto_complete,
            }
        } else {
            CheckedPatternKind::List {
                elems: checked_elems,
                auto_complete,
            }
        };
        Some(CheckedPattern::new(kind, defined.clone(), location))
    }

    #[allow(clippy::too_many_arguments)]
    fn check_record_pattern(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &lily_ast::AstPath,
        fields: &[(String, Pat)],
        defined: &Ty,
        captures: &mut IndexMap<String, Ty>,
        location: Location,
    ) -> Option<CheckedPattern> {
        let SearchResponse::Record { decl } = self.resolve_type_name(scope, name.last()) else {
            self.error(location, DiagnosticKind::ExpectedCustomDataType);
            return Some(CheckedPattern::new(
                CheckedPatternKind::Wildcard,
                defined.clone(),
                location,
            ));
        };
        self.ensure_checked(ctx, decl);

        let (decl_fields, generic_params) = {
            let record = self.decls.get(decl).as_record().expect("record decl");
            (record.fields.borrow().clone(), record.generic_params.clone())
        };
        let generic_map: GenericMap = match defined.direct_custom().and_then(|c| c.generics) {
            Some(args) => generic_params.into_iter().zip(args.into_iter()).collect(),
            None => GenericMap::new(),
        };

        let mut checked_fields = Vec::with_capacity(fields.len());
        for (field_name, field_pat) in fields {
            let Some(decl_field) = decl_fields.iter().find(|field| &field.name == field_name)
            else {
                self.error(field_pat.location, DiagnosticKind::FieldIsNotFound);
                continue;
            };
            let field_ty = decl_field.ty.resolve_generic(&generic_map);
            if let Some(checked) =
                self.check_pattern(ctx, scope, field_pat, &field_ty, captures, false)
            {
                checked_fields.push((field_name.clone(), checked));
            }
        }

        Some(CheckedPattern::new(
            CheckedPatternKind::Record {
                decl,
                fields: checked_fields,
            },
            defined.clone(),
            location,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn check_variant_pattern(
        &mut self,
        ctx: &mut AnalysisContext,
        scope: ScopeId,
        name: &lily_ast::AstPath,
        args: &[Pat],
        defined: &Ty,
        captures: &mut IndexMap<String, Ty>,
        location: Location,
    ) -> Option<CheckedPattern> {
        // `Some`/`None` over the builtin optional.
        if let TyKind::Optional(inner) = defined.clone_kind() {
            match name.last() {
                "Some" => {
                    if args.len() != 1 {
                        self.error(location, DiagnosticKind::NumberOfParamsMismatched);
                    }
                    let checked_inner = args.first().and_then(|arg| {
                        self.check_pattern(ctx, scope, arg, &inner, captures, false)
                    });
                    return Some(CheckedPattern::new(
                        CheckedPatternKind::OptionalSome(Box::new(checked_inner.unwrap_or(
                            CheckedPattern {
                                kind: CheckedPatternKind::Wildcard,
                                ty: inner.clone(),
                                location,
                            },
                        ))),
                        defined.clone(),
                        location,
                    ));
                }
                "None" => {
                    if !args.is_empty() {
                        self.error(location, DiagnosticKind::NumberOfParamsMismatched);
                    }
                    return Some(CheckedPattern::new(
                        CheckedPatternKind::OptionalNone,
                        defined.clone(),
                        location,
                    ));
                }
                _ => {}
            }
        }

        let resolved = self.scopes.search_variant(scope, name.last());
        let SearchResponse::Variant { enum_decl, index } = resolved else {
            self.error(location, DiagnosticKind::VariantIsNotFound);
            return Some(CheckedPattern::new(
                CheckedPatternKind::Wildcard,
                defined.clone(),
                location,
            ));
        };
        self.ensure_checked(ctx, enum_decl);

        let (variant, generic_params) = {
            let enum_payload = self.decls.get(enum_decl).as_enum().expect("enum decl");
            (
                enum_payload.variants.borrow()[index].clone(),
                enum_payload.generic_params.clone(),
            )
        };
        if args.len() != variant.values.len() {
            self.error(location, DiagnosticKind::NumberOfParamsMismatched);
        }
        let generic_map: GenericMap = match defined.direct_custom().and_then(|c| c.generics) {
            Some(generic_args) => generic_params
                .into_iter()
                .zip(generic_args.into_iter())
                .collect(),
            None => GenericMap::new(),
        };

        let checked_args: Vec<CheckedPattern> = args
            .iter()
            .enumerate()
            .filter_map(|(value_index, arg)| {
                let value_ty = variant
                    .values
                    .get(value_index)
                    .map(|value| value.resolve_generic(&generic_map))
                    .unwrap_or_else(|| Ty::new(TyKind::Unknown));
                self.check_pattern(ctx, scope, arg, &value_ty, captures, false)
            })
            .collect();

        Some(CheckedPattern::new(
            CheckedPatternKind::Variant {
                enum_decl,
                name: variant.name,
                index,
                args: checked_args,
            },
            defined.clone(),
            location,
        ))
    }

    fn check_literal_pattern(
        &mut self,
        scope: ScopeId,
        literal: &Literal,
        defined: &Ty,
        location: Location,
    ) -> Option<CheckedPattern> {
        let defined_kind = defined.clone_kind();
        let checked_literal = match literal {
            Literal::Bool(value) => {
                if !matches!(defined_kind, TyKind::Bool) {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
                CheckedLiteral::Bool(*value)
            }
            Literal::Int(value) => {
                if !defined_kind.matches_guarantee(Guarantee::Integer)
                    || !defined_kind.fits_int(*value)
                {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
                CheckedLiteral::Int(*value)
            }
            Literal::Float(value) => {
                if !defined_kind.matches_guarantee(Guarantee::Float) {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
                CheckedLiteral::Float(*value)
            }
            Literal::Str(value) => {
                if !matches!(defined_kind, TyKind::Str(_)) {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
                CheckedLiteral::Str(value.clone())
            }
            Literal::Char(value) => {
                if !matches!(defined_kind, TyKind::Char) {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
                CheckedLiteral::Char(*value)
            }
            Literal::None => {
                if !matches!(defined_kind, TyKind::Optional(_)) {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
                return Some(CheckedPattern::new(
                    CheckedPatternKind::OptionalNone,
                    defined.clone(),
                    location,
                ));
            }
            other => {
                let checked = self.check_literal(scope, other, location, Some(defined));
                if !self.unify(defined, &checked.ty) {
                    self.error(location, DiagnosticKind::DataTypeDontMatch);
                }
                match checked.kind {
                    CheckedExprKind::Literal(lit) => lit,
                    _ => CheckedLiteral::Unit,
                }
            }
        };
        Some(CheckedPattern::new(
            CheckedPatternKind::Literal(checked_literal),
            defined.clone(),
            location,
        ))
    }

    // -- pattern → expression lowering ---------------------------------

    /// The boolean predicate of a pattern over the current scrutinee.
    /// `None` means the pattern has no expression form (the caller fails
    /// loudly).
    pub(crate) fn pattern_to_expr(
        &self,
        pat: &CheckedPattern,
        scrutinee: &CheckedExpr,
    ) -> Option<CheckedExpr> {
        let location = pat.location;
        match &pat.kind {
            CheckedPatternKind::Name(_)
            | CheckedPatternKind::Wildcard
            | CheckedPatternKind::AutoComplete
            | CheckedPatternKind::Else => Some(truth(location)),
            CheckedPatternKind::As { pat: inner, .. } => self.pattern_to_expr(inner, scrutinee),
            CheckedPatternKind::Literal(literal) => Some(eq_expr(
                scrutinee.clone(),
                CheckedExpr::literal(literal.clone(), pat.ty.clone(), location),
                location,
            )),
            CheckedPatternKind::Range { lo, hi } => {
                let ge = binary_bool(
                    BinaryOp::Ge,
                    scrutinee.clone(),
                    CheckedExpr::literal(lo.clone(), pat.ty.clone(), location),
                    location,
                );
                let le = binary_bool(
                    BinaryOp::Le,
                    scrutinee.clone(),
                    CheckedExpr::literal(hi.clone(), pat.ty.clone(), location),
                    location,
                );
                Some(binary_bool(BinaryOp::And, ge, le, location))
            }
            CheckedPatternKind::Variant {
                enum_decl,
                name,
                index,
                args,
            } => {
                // Variant tag test; payload bindings lower to true.
                if !args.is_empty() {
                    return None;
                }
                let variant_expr = CheckedExpr::new(
                    CheckedExprKind::Call(crate::checked::CheckedCall::Variant {
                        enum_decl: *enum_decl,
                        name: name.clone(),
                        index: *index,
                    }),
                    pat.ty.clone(),
                    location,
                );
                Some(eq_expr(scrutinee.clone(), variant_expr, location))
            }
            CheckedPatternKind::Array {
                elems,
                auto_complete,
            } if !*auto_complete => {
                let literal_elems: Option<Vec<CheckedExpr>> = elems
                    .iter()
                    .map(|elem| match &elem.kind {
                        CheckedPatternKind::Literal(literal) => Some(CheckedExpr::literal(
                            literal.clone(),
                            elem.ty.clone(),
                            elem.location,
                        )),
                        _ => None,
                    })
                    .collect();
                literal_elems.map(|exprs| {
                    eq_expr(
                        scrutinee.clone(),
                        CheckedExpr::new(
                            CheckedExprKind::Array(exprs),
                            pat.ty.clone(),
                            location,
                        ),
                        location,
                    )
                })
            }
            CheckedPatternKind::Tuple(elems) => {
                let literal_elems: Option<Vec<CheckedExpr>> = elems
                    .iter()
                    .map(|elem| match &elem.kind {
                        CheckedPatternKind::Literal(literal) => Some(CheckedExpr::literal(
                            literal.clone(),
                            elem.ty.clone(),
                            elem.location,
                        )),
                        _ => None,
                    })
                    .collect();
                literal_elems.map(|exprs| {
                    eq_expr(
                        scrutinee.clone(),
                        CheckedExpr::new(
                            CheckedExprKind::Tuple(exprs),
                            pat.ty.clone(),
                            location,
                        ),
                        location,
                    )
                })
            }
            CheckedPatternKind::Record { decl, fields } => {
                // Field-wise conjunction over field accesses.
                let record_scope = self.decls.get(*decl).scope;
                let record = self.decls.get(*decl).as_record()?;
                let decl_fields = record.fields.borrow();
                let mut conjunction: Option<CheckedExpr> = None;
                for (field_name, field_pat) in fields {
                    let index = decl_fields
                        .iter()
                        .position(|field| &field.name == field_name)?;
                    let access = CheckedExpr::new(
                        CheckedExprKind::Path {
                            head: Box::new(scrutinee.clone()),
                            segments: vec![CheckedPathSegment {
                                name: field_name.clone(),
                                ty: field_pat.ty.clone(),
                                kind: PathSegmentKind::Field {
                                    record_scope,
                                    index,
                                },
                            }],
                        },
                        field_pat.ty.clone(),
                        location,
                    );
                    let predicate = self.pattern_to_expr(field_pat, &access)?;
                    conjunction = Some(match conjunction {
                        Some(left) => binary_bool(BinaryOp::And, left, predicate, location),
                        None => predicate,
                    });
                }
                Some(conjunction.unwrap_or_else(|| truth(location)))
            }
            // List decompositions and error patterns have no expression
            // form yet.
            CheckedPatternKind::Array { .. }
            | CheckedPatternKind::List { .. }
            | CheckedPatternKind::ListHead { .. }
            | CheckedPatternKind::ListTail { .. }
            | CheckedPatternKind::OptionalSome(_)
            | CheckedPatternKind::OptionalNone
            | CheckedPatternKind::Error { .. } => None,
        }
    }
}

fn truth(location: Location) -> CheckedExpr {
    CheckedExpr::literal(
        CheckedLiteral::Bool(true),
        Ty::with_location(TyKind::Bool, location),
        location,
    )
}

fn eq_expr(lhs: CheckedExpr, rhs: CheckedExpr, location: Location) -> CheckedExpr {
    binary_bool(BinaryOp::Eq, lhs, rhs, location)
}

fn binary_bool(
    op: BinaryOp,
    lhs: CheckedExpr,
    rhs: CheckedExpr,
    location: Location,
) -> CheckedExpr {
    CheckedExpr::new(
        CheckedExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        Ty::with_location(TyKind::Bool, location),
        location,
    )
}

#[cfg(test)]
mod tests {
    use lily_ast::PackageStatus;
    use lily_errors::Handler;
    use lily_span::DeclId;

    use super::*;

    fn empty_package() -> lily_ast::Package {
        lily_ast::Package {
            name: "main".to_owned(),
            modules: vec![],
            status: PackageStatus::Library,
            import_builtin: false,
            import_sys: false,
        }
    }

    fn scrutinee(ty: Ty) -> CheckedExpr {
        CheckedExpr::new(
            CheckedExprKind::Call(crate::checked::CheckedCall::Variable {
                name: "n".to_owned(),
                scope: lily_span::ScopeId(0),
            }),
            ty,
            Location::DUMMY,
        )
    }

    fn pattern(kind: CheckedPatternKind, ty: Ty) -> CheckedPattern {
        CheckedPattern::new(kind, ty, Location::DUMMY)
    }

    #[test]
    fn irrefutable_patterns_lower_to_true() {
        let package = empty_package();
        let handler = Handler::new();
        let analyzer = crate::Analyzer::new(&package, &handler);
        let int32 = Ty::new(TyKind::Int32);
        let sc = scrutinee(int32.clone());

        for kind in [
            CheckedPatternKind::Name("x".to_owned()),
            CheckedPatternKind::Wildcard,
            CheckedPatternKind::AutoComplete,
            CheckedPatternKind::Else,
        ] {
            let lowered = analyzer
                .pattern_to_expr(&pattern(kind, int32.clone()), &sc)
                .expect("irrefutable patterns have an expression form");
            assert!(matches!(
                lowered.kind,
                CheckedExprKind::Literal(CheckedLiteral::Bool(true))
            ));
        }
    }

    #[test]
    fn literal_pattern_lowers_to_an_equality() {
        let package = empty_package();
        let handler = Handler::new();
        let analyzer = crate::Analyzer::new(&package, &handler);
        let int32 = Ty::new(TyKind::Int32);
        let sc = scrutinee(int32.clone());

        let lowered = analyzer
            .pattern_to_expr(
                &pattern(CheckedPatternKind::Literal(CheckedLiteral::Int(7)), int32),
                &sc,
            )
            .unwrap();
        let CheckedExprKind::Binary { op, rhs, .. } = lowered.kind else {
            panic!("expected an equality");
        };
        assert_eq!(op, BinaryOp::Eq);
        assert!(matches!(
            rhs.kind,
            CheckedExprKind::Literal(CheckedLiteral::Int(7))
        ));
    }

    #[test]
    fn error_pattern_has_no_expression_form() {
        let package = empty_package();
        let handler = Handler::new();
        let analyzer = crate::Analyzer::new(&package, &handler);
        let int32 = Ty::new(TyKind::Int32);
        let sc = scrutinee(int32.clone());

        assert!(analyzer
            .pattern_to_expr(
                &pattern(
                    CheckedPatternKind::Error {
                        decl: DeclId(0),
                        inner: None,
                    },
                    int32,
                ),
                &sc,
            )
            .is_none());
    }

    #[test]
    fn binding_array_pattern_has_no_equality_form() {
        let package = empty_package();
        let handler = Handler::new();
        let analyzer = crate::Analyzer::new(&package, &handler);
        let array_ty = Ty::new(TyKind::SizedArray(2, Ty::new(TyKind::Int32)));
        let sc = scrutinee(array_ty.clone());

        // All-literal arrays lower to an array equality; an array holding
        // a binding does not.
        let all_literal = pattern(
            CheckedPatternKind::Array {
                elems: vec![
                    pattern(
                        CheckedPatternKind::Literal(CheckedLiteral::Int(1)),
                        Ty::new(TyKind::Int32),
                    ),
                    pattern(
                        CheckedPatternKind::Literal(CheckedLiteral::Int(2)),
                        Ty::new(TyKind::Int32),
                    ),
                ],
                auto_complete: false,
            },
            array_ty.clone(),
        );
        assert!(analyzer.pattern_to_expr(&all_literal, &sc).is_some());

        let with_binding = pattern(
            CheckedPatternKind::Array {
                elems: vec![pattern(
                    CheckedPatternKind::Name("x".to_owned()),
                    Ty::new(TyKind::Int32),
                )],
                auto_complete: false,
            },
            array_ty,
        );
        assert!(analyzer.pattern_to_expr(&with_binding, &sc).is_none());
    }
}
