//! End-to-end analysis over hand-built ASTs.

use lily_analysis::{analyze, Analysis};
use lily_ast::{
    AstPath, DataTy, DataTyKind, Decl, DeclKind, ElifBranch, Expr, ExprKind, Field, FunParam,
    GenericParam, Literal, MatchCase, Module, Package, PackageStatus, Pat, PatKind, Stmt,
    StmtKind, Visibility,
};
use lily_analysis::checked::{CheckedDeclKind, CheckedStmtKind};
use lily_errors::{DiagnosticKind, Handler, WarningKind};
use lily_span::Location;
use lily_ty::{Guarantee, TyKind};
use smallvec::SmallVec;

fn loc() -> Location {
    Location::DUMMY
}

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, loc())
}

fn int(value: i128) -> Expr {
    expr(ExprKind::Literal(Literal::Int(value)))
}

fn ident(name: &str) -> Expr {
    expr(ExprKind::Identifier(name.to_owned()))
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, loc())
}

fn ty(kind: DataTyKind) -> DataTy {
    DataTy::new(kind, loc())
}

fn ret_stmt(value: Expr) -> Stmt {
    stmt(StmtKind::Return(Some(Box::new(value))))
}

fn fun(name: &str, params: Vec<FunParam>, return_ty: Option<DataTy>, body: Vec<Stmt>) -> Decl {
    Decl::new(
        DeclKind::Fun {
            name: name.to_owned(),
            generic_params: SmallVec::new(),
            params,
            return_ty,
            body,
            is_operator: false,
            visibility: Visibility::Public,
        },
        loc(),
    )
}

fn param(name: &str, data_ty: Option<DataTy>) -> FunParam {
    FunParam {
        name: name.to_owned(),
        ty: data_ty,
        mutable: false,
        location: loc(),
    }
}

fn constant(name: &str, value: Expr) -> Decl {
    Decl::new(
        DeclKind::Constant {
            name: name.to_owned(),
            ty: None,
            value,
            visibility: Visibility::Public,
        },
        loc(),
    )
}

fn package(decls: Vec<Decl>) -> Package {
    Package {
        name: "main".to_owned(),
        modules: vec![Module {
            name: "main".to_owned(),
            decls,
            location: loc(),
        }],
        status: PackageStatus::Main,
        import_builtin: false,
        import_sys: false,
    }
}

fn run(package: &Package) -> (Analysis, Handler) {
    let handler = Handler::new();
    let analysis = analyze(package, &handler);
    (analysis, handler)
}

fn main_body(analysis: &Analysis) -> Vec<lily_analysis::checked::CheckedStmt> {
    let decl = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "main" && decl.as_fun().is_some())
        .expect("main decl");
    decl.as_fun().expect("main is a fun").body.borrow().clone()
}

// -- §8 scenario 1: main function sanity ------------------------------

#[test]
fn main_with_return_zero_is_clean() {
    let package = package(vec![fun("main", vec![], None, vec![ret_stmt(int(0))])]);
    let (analysis, handler) = run(&package);

    assert!(analysis.package.main_is_found);
    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    assert_eq!(handler.warning_count(), 0);

    let main = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "main" && decl.as_fun().is_some())
        .unwrap();
    let return_ty = main.as_fun().unwrap().return_ty.borrow().clone();
    assert!(return_ty.is_guaranteed(Guarantee::Unit));
}

// -- §8 scenario 2: main return type mismatch --------------------------

#[test]
fn main_with_str_return_type_is_rejected() {
    let package = package(vec![fun(
        "main",
        vec![],
        Some(ty(DataTyKind::Str)),
        vec![ret_stmt(expr(ExprKind::Literal(Literal::Str("hi".to_owned()))))],
    )]);
    let (_, handler) = run(&package);

    assert_eq!(
        handler.error_kinds(),
        vec![DiagnosticKind::ThisReturnDataTypeIsNotExpectedForAMainFunction]
    );
}

// -- §8 scenario 3: comptime cast overflow -----------------------------

#[test]
fn int8_variable_with_200_overflows_at_compile_time() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "x".to_owned(),
                ty: Some(ty(DataTyKind::Int8)),
                value: Box::new(int(200)),
                mutable: false,
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);

    assert_eq!(
        handler.error_kinds(),
        vec![DiagnosticKind::ComptimeCastOverflow]
    );
    let diagnostic = &handler.diagnostics()[0];
    assert_eq!(
        diagnostic.detail.as_deref(),
        Some("Int32 is out of range to cast Int8")
    );
}

// -- §8 scenario 4: exhaustive match over an optional ------------------

#[test]
fn exhaustive_optional_match_is_clean() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "opt".to_owned(),
                ty: Some(ty(DataTyKind::Optional(Box::new(ty(DataTyKind::Int32))))),
                value: Box::new(expr(ExprKind::Literal(Literal::None))),
                mutable: false,
            }),
            stmt(StmtKind::Match {
                scrutinee: Box::new(ident("opt")),
                cases: vec![
                    MatchCase {
                        pat: Pat::new(
                            PatKind::VariantCall {
                                name: AstPath::single("Some"),
                                args: vec![Pat::new(PatKind::Name("x".to_owned()), loc())],
                            },
                            loc(),
                        ),
                        guard: None,
                        body: vec![stmt(StmtKind::Expr(Box::new(ident("x"))))],
                        location: loc(),
                    },
                    MatchCase {
                        pat: Pat::new(PatKind::Literal(Literal::None), loc()),
                        guard: None,
                        body: vec![stmt(StmtKind::Expr(Box::new(int(0))))],
                        location: loc(),
                    },
                ],
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());

    let body = main_body(&analysis);
    let CheckedStmtKind::Match(checked_match) = &body[1].kind else {
        panic!("optional scrutinee must stay a structural match");
    };
    assert_eq!(checked_match.nb_cases, 2);
    assert_eq!(checked_match.total_cases, 2);
}

// -- §8 scenario 5: duplicate constant ---------------------------------

#[test]
fn duplicate_constant_keeps_one_entry() {
    let package = package(vec![
        constant("PI", expr(ExprKind::Literal(Literal::Float(3.14)))),
        constant("PI", expr(ExprKind::Literal(Literal::Float(3.14)))),
        fun("main", vec![], None, vec![ret_stmt(int(0))]),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(
        handler.error_kinds(),
        vec![DiagnosticKind::DuplicateConstant]
    );

    let module = analysis
        .decls
        .iter()
        .find(|decl| matches!(decl.kind, CheckedDeclKind::Module(_)))
        .unwrap();
    assert_eq!(analysis.scopes.get(module.scope).constants.len(), 1);
}

// -- duplicates and recovery -------------------------------------------

#[test]
fn duplicate_fun_and_unknown_identifier_are_both_reported() {
    let package = package(vec![
        fun("helper", vec![], None, vec![ret_stmt(int(0))]),
        fun("helper", vec![], None, vec![ret_stmt(int(1))]),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Expr(Box::new(ident("missing")))),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (_, handler) = run(&package);

    let kinds = handler.error_kinds();
    assert!(kinds.contains(&DiagnosticKind::DuplicateFun));
    assert!(kinds.contains(&DiagnosticKind::UnknownIdentifier("missing".to_owned())));
}

#[test]
fn missing_main_in_exe_package() {
    let package = package(vec![fun("helper", vec![], None, vec![ret_stmt(int(0))])]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::ExpectedMainFunction));
}

#[test]
fn library_packages_need_no_main() {
    let mut pkg = package(vec![fun("helper", vec![], None, vec![ret_stmt(int(0))])]);
    pkg.status = PackageStatus::Library;
    let (_, handler) = run(&pkg);
    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
}

#[test]
fn main_rules_reject_params_and_generics() {
    let mut decl = fun(
        "main",
        vec![param("x", Some(ty(DataTyKind::Int32)))],
        None,
        vec![ret_stmt(int(0))],
    );
    if let DeclKind::Fun { generic_params, .. } = &mut decl.kind {
        generic_params.push(GenericParam {
            name: "T".to_owned(),
            location: loc(),
        });
    }
    let (_, handler) = run(&package(vec![decl]));

    let kinds = handler.error_kinds();
    assert!(kinds.contains(&DiagnosticKind::NoExplicitParamsExpectedInMain));
    assert!(kinds.contains(&DiagnosticKind::GenericParamsNotExpectedInMain));
}

// -- infinite and recursive data types ---------------------------------

fn record(name: &str, fields: Vec<(&str, DataTyKind)>) -> Decl {
    Decl::new(
        DeclKind::Record {
            name: name.to_owned(),
            generic_params: SmallVec::new(),
            fields: fields
                .into_iter()
                .map(|(field_name, field_ty)| Field {
                    name: field_name.to_owned(),
                    ty: ty(field_ty),
                    mutable: false,
                    location: loc(),
                })
                .collect(),
            visibility: Visibility::Public,
        },
        loc(),
    )
}

#[test]
fn direct_self_field_is_infinite() {
    let package = package(vec![
        record("Node", vec![("next", DataTyKind::custom("Node"))]),
        fun("main", vec![], None, vec![ret_stmt(int(0))]),
    ]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::InfiniteDataType));
}

#[test]
fn self_reference_through_a_pointer_is_recursive_not_infinite() {
    let package = package(vec![
        record(
            "Node",
            vec![(
                "next",
                DataTyKind::Ptr(Box::new(ty(DataTyKind::custom("Node")))),
            )],
        ),
        fun("main", vec![], None, vec![ret_stmt(int(0))]),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let node = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "Node")
        .unwrap();
    assert!(node.as_record().unwrap().is_recursive.get());
}

#[test]
fn mutual_direct_containment_is_infinite() {
    let package = package(vec![
        record("A", vec![("b", DataTyKind::custom("B"))]),
        record("B", vec![("a", DataTyKind::custom("A"))]),
        fun("main", vec![], None, vec![ret_stmt(int(0))]),
    ]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::InfiniteDataType));
}

// -- generics and monomorphization -------------------------------------

#[test]
fn generic_fun_call_adds_a_concrete_signature() {
    let mut id_fun = fun(
        "id",
        vec![param("x", Some(ty(DataTyKind::custom("T"))))],
        Some(ty(DataTyKind::custom("T"))),
        vec![ret_stmt(ident("x"))],
    );
    if let DeclKind::Fun { generic_params, .. } = &mut id_fun.kind {
        generic_params.push(GenericParam {
            name: "T".to_owned(),
            location: loc(),
        });
    }
    let package = package(vec![
        id_fun,
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "y".to_owned(),
                    ty: None,
                    value: Box::new(expr(ExprKind::FunCall {
                        name: AstPath::single("id"),
                        generic_args: None,
                        args: vec![int(42)],
                    })),
                    mutable: false,
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let id_decl = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "id")
        .unwrap();
    let signatures = id_decl.as_fun().unwrap().signatures.borrow().clone();
    assert_eq!(signatures.len(), 2);
    assert!(signatures[0].is_original());
    let mono = &signatures[1];
    assert_eq!(mono.param_tys()[0].clone_kind(), TyKind::Int32);
    assert_eq!(mono.return_ty().clone_kind(), TyKind::Int32);
}

#[test]
fn untyped_param_allocates_a_compiler_generic_slot() {
    let package = package(vec![
        fun("echo", vec![param("x", None)], None, vec![ret_stmt(ident("x"))]),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "y".to_owned(),
                    ty: None,
                    value: Box::new(expr(ExprKind::FunCall {
                        name: AstPath::single("echo"),
                        generic_args: None,
                        args: vec![int(7)],
                    })),
                    mutable: false,
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let echo = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "echo")
        .unwrap();
    let fun_decl = echo.as_fun().unwrap();
    assert!(!fun_decl.used_compiler_generics.borrow().is_empty());
    // The call bound the slot to Int32 in a fresh signature.
    let signatures = fun_decl.signatures.borrow();
    assert!(signatures.len() >= 2);
    assert!(signatures
        .iter()
        .any(|signature| signature.param_tys()[0].clone_kind() == TyKind::Int32));
}

// -- match lowering -----------------------------------------------------

#[test]
fn integer_scrutinee_selects_switch_lowering() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "n".to_owned(),
                ty: Some(ty(DataTyKind::Int32)),
                value: Box::new(int(1)),
                mutable: false,
            }),
            stmt(StmtKind::Match {
                scrutinee: Box::new(ident("n")),
                cases: vec![
                    MatchCase {
                        pat: Pat::new(PatKind::Literal(Literal::Int(1)), loc()),
                        guard: None,
                        body: vec![],
                        location: loc(),
                    },
                    MatchCase {
                        pat: Pat::new(PatKind::Else, loc()),
                        guard: None,
                        body: vec![],
                        location: loc(),
                    },
                ],
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let body = main_body(&analysis);
    let CheckedStmtKind::Switch(checked_switch) = &body[1].kind else {
        panic!("integer scrutinee must lower to a switch");
    };
    assert_eq!(checked_switch.cases.len(), 1);
    assert!(checked_switch.else_case.is_some());
}

#[test]
fn range_pattern_lowers_to_a_conjunction_predicate() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "n".to_owned(),
                ty: Some(ty(DataTyKind::Int32)),
                value: Box::new(int(5)),
                mutable: false,
            }),
            stmt(StmtKind::Match {
                scrutinee: Box::new(ident("n")),
                cases: vec![
                    MatchCase {
                        pat: Pat::new(
                            PatKind::Range {
                                lo: Literal::Int(0),
                                hi: Literal::Int(9),
                            },
                            loc(),
                        ),
                        guard: None,
                        body: vec![],
                        location: loc(),
                    },
                    MatchCase {
                        pat: Pat::new(PatKind::Name("other".to_owned()), loc()),
                        guard: None,
                        body: vec![],
                        location: loc(),
                    },
                ],
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let body = main_body(&analysis);
    let CheckedStmtKind::Switch(checked_switch) = &body[1].kind else {
        panic!("expected switch lowering");
    };
    // `0 .. 9` becomes `n >= 0 and n <= 9`; the binding case is erased
    // into the else case.
    let predicate = &checked_switch.cases[0].predicate;
    let lily_analysis::checked::CheckedExprKind::Binary { op, lhs, rhs } = &predicate.kind else {
        panic!("expected a conjunction, got {predicate:?}");
    };
    assert_eq!(*op, lily_ast::BinaryOp::And);
    assert!(matches!(
        lhs.kind,
        lily_analysis::checked::CheckedExprKind::Binary {
            op: lily_ast::BinaryOp::Ge,
            ..
        }
    ));
    assert!(matches!(
        rhs.kind,
        lily_analysis::checked::CheckedExprKind::Binary {
            op: lily_ast::BinaryOp::Le,
            ..
        }
    ));
    assert!(checked_switch.else_case.is_some());
}

#[test]
fn duplicate_case_is_an_error_and_extra_case_a_warning() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "b".to_owned(),
                ty: Some(ty(DataTyKind::Bool)),
                value: Box::new(expr(ExprKind::Literal(Literal::Bool(true)))),
                mutable: false,
            }),
            stmt(StmtKind::Match {
                scrutinee: Box::new(ident("b")),
                cases: vec![
                    MatchCase {
                        pat: Pat::new(PatKind::Literal(Literal::Bool(true)), loc()),
                        guard: None,
                        body: vec![],
                        location: loc(),
                    },
                    MatchCase {
                        pat: Pat::new(PatKind::Literal(Literal::Bool(true)), loc()),
                        guard: None,
                        body: vec![],
                        location: loc(),
                    },
                    MatchCase {
                        pat: Pat::new(PatKind::Literal(Literal::Bool(false)), loc()),
                        guard: None,
                        body: vec![],
                        location: loc(),
                    },
                    MatchCase {
                        pat: Pat::new(PatKind::Else, loc()),
                        guard: None,
                        body: vec![],
                        location: loc(),
                    },
                ],
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);

    assert!(handler.error_kinds().contains(&DiagnosticKind::DuplicateCase));
    assert!(handler.warning_kinds().contains(&WarningKind::UnusedCase));
}

#[test]
fn non_exhaustive_bool_match() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "b".to_owned(),
                ty: Some(ty(DataTyKind::Bool)),
                value: Box::new(expr(ExprKind::Literal(Literal::Bool(true)))),
                mutable: false,
            }),
            stmt(StmtKind::Match {
                scrutinee: Box::new(ident("b")),
                cases: vec![MatchCase {
                    pat: Pat::new(PatKind::Literal(Literal::Bool(true)), loc()),
                    guard: None,
                    body: vec![],
                    location: loc(),
                }],
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::NonExhaustivePatterns));
}

// -- warnings -----------------------------------------------------------

#[test]
fn unreachable_code_after_return_warns_once() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            ret_stmt(int(0)),
            stmt(StmtKind::Expr(Box::new(int(1)))),
            stmt(StmtKind::Expr(Box::new(int(2)))),
        ],
    )]);
    let (_, handler) = run(&package);
    assert_eq!(
        handler
            .warning_kinds()
            .iter()
            .filter(|kind| **kind == WarningKind::UnreachableCode)
            .count(),
        1
    );
}

#[test]
fn unused_non_unit_expression_warns() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Expr(Box::new(expr(ExprKind::Binary {
                op: lily_ast::BinaryOp::Add,
                lhs: Box::new(int(1)),
                rhs: Box::new(int(1)),
            })))),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);
    assert!(handler
        .warning_kinds()
        .contains(&WarningKind::UnusedExpression));
}

// -- statements ---------------------------------------------------------

#[test]
fn break_outside_a_loop_is_rejected() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![stmt(StmtKind::Break), ret_stmt(int(0))],
    )]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::BreakIsNotExpectedInThisContext));
}

#[test]
fn break_inside_a_while_loop_is_fine() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::While {
                cond: Box::new(expr(ExprKind::Literal(Literal::Bool(true)))),
                body: vec![stmt(StmtKind::Break)],
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);
    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
}

#[test]
fn raise_records_on_fun_and_try_scope() {
    let error_decl = Decl::new(
        DeclKind::Error {
            name: "Oops".to_owned(),
            generic_params: SmallVec::new(),
            fields: vec![],
            visibility: Visibility::Public,
        },
        loc(),
    );
    let package = package(vec![
        error_decl,
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Try {
                    body: vec![stmt(StmtKind::Raise {
                        name: AstPath::single("Oops"),
                        values: vec![],
                    })],
                    catch: Some((Some("e".to_owned()), vec![])),
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let main = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "main" && decl.as_fun().is_some())
        .unwrap();
    assert_eq!(main.as_fun().unwrap().raises.borrow().len(), 1);

    let body = main_body(&analysis);
    let CheckedStmtKind::Try { raises, catch, .. } = &body[0].kind else {
        panic!("expected try stmt");
    };
    assert_eq!(raises.len(), 1);
    assert!(catch.is_some());
}

#[test]
fn return_dumps_deferred_statements() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Defer(Box::new(stmt(StmtKind::Expr(Box::new(
                expr(ExprKind::Literal(Literal::Unit)),
            )))))),
            ret_stmt(int(0)),
        ],
    )]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let body = main_body(&analysis);
    let CheckedStmtKind::Return { deferred, .. } = &body[1].kind else {
        panic!("expected return stmt");
    };
    assert_eq!(deferred.len(), 1);
}

// -- expressions --------------------------------------------------------

#[test]
fn assignment_to_immutable_variable_is_rejected() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "x".to_owned(),
                ty: Some(ty(DataTyKind::Int32)),
                value: Box::new(int(1)),
                mutable: false,
            }),
            stmt(StmtKind::Expr(Box::new(expr(ExprKind::Binary {
                op: lily_ast::BinaryOp::Assign,
                lhs: Box::new(ident("x")),
                rhs: Box::new(int(2)),
            })))),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::ExpectedMutableVariable));
}

#[test]
fn arithmetic_requires_matching_operand_types() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "a".to_owned(),
                ty: Some(ty(DataTyKind::Int32)),
                value: Box::new(int(1)),
                mutable: false,
            }),
            stmt(StmtKind::Variable {
                name: "b".to_owned(),
                ty: Some(ty(DataTyKind::Int64)),
                value: Box::new(int(2)),
                mutable: false,
            }),
            stmt(StmtKind::Expr(Box::new(expr(ExprKind::Binary {
                op: lily_ast::BinaryOp::Add,
                lhs: Box::new(ident("a")),
                rhs: Box::new(ident("b")),
            })))),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::DataTypeDontMatch));
}

#[test]
fn chain_pipes_the_value_as_last_argument() {
    let package = package(vec![
        fun(
            "inc",
            vec![param("x", Some(ty(DataTyKind::Int32)))],
            Some(ty(DataTyKind::Int32)),
            vec![ret_stmt(expr(ExprKind::Binary {
                op: lily_ast::BinaryOp::Add,
                lhs: Box::new(ident("x")),
                rhs: Box::new(int(1)),
            }))],
        ),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "y".to_owned(),
                    ty: Some(ty(DataTyKind::Int32)),
                    value: Box::new(expr(ExprKind::Binary {
                        op: lily_ast::BinaryOp::Chain,
                        lhs: Box::new(int(41)),
                        rhs: Box::new(expr(ExprKind::FunCall {
                            name: AstPath::single("inc"),
                            generic_args: None,
                            args: vec![],
                        })),
                    })),
                    mutable: false,
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (_, handler) = run(&package);
    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
}

#[test]
fn cast_to_same_type_and_to_any_in_safe_mode_are_rejected() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "x".to_owned(),
                ty: Some(ty(DataTyKind::Int32)),
                value: Box::new(int(1)),
                mutable: false,
            }),
            stmt(StmtKind::Expr(Box::new(expr(ExprKind::Cast {
                expr: Box::new(ident("x")),
                dest: ty(DataTyKind::Int32),
            })))),
            stmt(StmtKind::Expr(Box::new(expr(ExprKind::Cast {
                expr: Box::new(ident("x")),
                dest: ty(DataTyKind::Any),
            })))),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);

    let kinds = handler.error_kinds();
    assert!(kinds.contains(&DiagnosticKind::CastWithSameDataType));
    assert!(kinds.contains(&DiagnosticKind::CannotCastToAnyInSafeMode));
}

#[test]
fn sized_array_literal_must_match_expected_size() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "xs".to_owned(),
                ty: Some(ty(DataTyKind::SizedArray(
                    3,
                    Box::new(ty(DataTyKind::Int32)),
                ))),
                value: Box::new(expr(ExprKind::Array(vec![int(1), int(2)]))),
                mutable: false,
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::ExpectedSizedArrayWithTheSameSize));
}

#[test]
fn empty_array_without_context_allocates_a_compiler_generic() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "xs".to_owned(),
                ty: None,
                value: Box::new(expr(ExprKind::Array(vec![]))),
                mutable: false,
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let main = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "main" && decl.as_fun().is_some())
        .unwrap();
    assert!(!main
        .as_fun()
        .unwrap()
        .used_compiler_generics
        .borrow()
        .is_empty());
}

#[test]
fn builtin_call_requires_the_import() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Expr(Box::new(expr(ExprKind::BuiltinCall {
                name: "len".to_owned(),
                args: vec![expr(ExprKind::Literal(Literal::Str("abc".to_owned())))],
            })))),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::ImportBuiltinRequired));
}

#[test]
fn len_of_a_string_literal_is_comptime_evaluated() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "n".to_owned(),
                ty: Some(ty(DataTyKind::Usize)),
                value: Box::new(expr(ExprKind::LenCall(Box::new(expr(ExprKind::Literal(
                    Literal::Str("hello".to_owned()),
                )))))),
                mutable: false,
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let body = main_body(&analysis);
    let CheckedStmtKind::Variable { value, .. } = &body[0].kind else {
        panic!("expected variable");
    };
    assert!(matches!(
        value.kind,
        lily_analysis::checked::CheckedExprKind::Literal(
            lily_analysis::checked::CheckedLiteral::Int(5)
        )
    ));
}

#[test]
fn record_call_checks_fields_and_allocates_signature() {
    let package = package(vec![
        record("Point", vec![("x", DataTyKind::Int32), ("y", DataTyKind::Int32)]),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "p".to_owned(),
                    ty: None,
                    value: Box::new(expr(ExprKind::RecordCall {
                        name: AstPath::single("Point"),
                        generic_args: None,
                        fields: vec![
                            ("x".to_owned(), int(1)),
                            ("y".to_owned(), int(2)),
                            ("z".to_owned(), int(3)),
                        ],
                    })),
                    mutable: false,
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (_, handler) = run(&package);
    assert_eq!(
        handler.error_kinds(),
        vec![DiagnosticKind::FieldIsNotFound]
    );
}

#[test]
fn field_access_resolves_type_and_index() {
    let package = package(vec![
        record("Point", vec![("x", DataTyKind::Int32), ("y", DataTyKind::Int64)]),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "p".to_owned(),
                    ty: None,
                    value: Box::new(expr(ExprKind::RecordCall {
                        name: AstPath::single("Point"),
                        generic_args: None,
                        fields: vec![("x".to_owned(), int(1)), ("y".to_owned(), int(2))],
                    })),
                    mutable: false,
                }),
                stmt(StmtKind::Variable {
                    name: "y".to_owned(),
                    ty: Some(ty(DataTyKind::Int64)),
                    value: Box::new(expr(ExprKind::Path(AstPath::new(vec![
                        "p".to_owned(),
                        "y".to_owned(),
                    ])))),
                    mutable: false,
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (_, handler) = run(&package);
    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
}

#[test]
fn enum_variant_resolves_through_a_path() {
    let enum_decl = Decl::new(
        DeclKind::Enum {
            name: "Color".to_owned(),
            generic_params: SmallVec::new(),
            variants: vec![
                lily_ast::EnumVariant {
                    name: "Red".to_owned(),
                    values: vec![],
                    location: loc(),
                },
                lily_ast::EnumVariant {
                    name: "Green".to_owned(),
                    values: vec![],
                    location: loc(),
                },
            ],
            visibility: Visibility::Public,
        },
        loc(),
    );
    let package = package(vec![
        enum_decl,
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "c".to_owned(),
                    ty: None,
                    value: Box::new(expr(ExprKind::Path(AstPath::new(vec![
                        "Color".to_owned(),
                        "Green".to_owned(),
                    ])))),
                    mutable: false,
                }),
                stmt(StmtKind::Match {
                    scrutinee: Box::new(ident("c")),
                    cases: vec![
                        MatchCase {
                            pat: Pat::new(
                                PatKind::VariantCall {
                                    name: AstPath::single("Red"),
                                    args: vec![],
                                },
                                loc(),
                            ),
                            guard: None,
                            body: vec![],
                            location: loc(),
                        },
                        MatchCase {
                            pat: Pat::new(
                                PatKind::VariantCall {
                                    name: AstPath::single("Green"),
                                    args: vec![],
                                },
                                loc(),
                            ),
                            guard: None,
                            body: vec![],
                            location: loc(),
                        },
                    ],
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    // A payloadless enum lowers to a switch with both tags covered.
    let body = main_body(&analysis);
    let CheckedStmtKind::Switch(checked_switch) = &body[1].kind else {
        panic!("payloadless enum scrutinee must lower to a switch");
    };
    assert_eq!(checked_switch.cases.len(), 2);
}

#[test]
fn alias_with_unused_generic_param_is_rejected() {
    let alias = Decl::new(
        DeclKind::Alias {
            name: "Meters".to_owned(),
            generic_params: {
                let mut params = SmallVec::<[GenericParam; 4]>::new();
                params.push(GenericParam {
                    name: "T".to_owned(),
                    location: loc(),
                });
                params
            },
            ty: ty(DataTyKind::Int64),
            visibility: Visibility::Public,
        },
        loc(),
    );
    let package = package(vec![alias, fun("main", vec![], None, vec![ret_stmt(int(0))])]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::AliasGenericParamsMismatch));
}

#[test]
fn if_branches_propagate_has_return() {
    let package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![stmt(StmtKind::If {
            cond: Box::new(expr(ExprKind::Literal(Literal::Bool(true)))),
            then: vec![ret_stmt(int(0))],
            elifs: vec![ElifBranch {
                cond: expr(ExprKind::Literal(Literal::Bool(false))),
                body: vec![ret_stmt(int(1))],
            }],
            else_: Some(vec![ret_stmt(int(2))]),
        })],
    )]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let main = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "main" && decl.as_fun().is_some())
        .unwrap();
    assert!(analysis.scopes.has_return(main.scope));
}
