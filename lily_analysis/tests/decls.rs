//! Declaration-level analysis: enums, errors, operators, modules and
//! generic type applications.

use lily_analysis::{analyze, Analysis};
use lily_ast::{
    AstPath, DataTy, DataTyKind, Decl, DeclKind, EnumVariant, Expr, ExprKind, Field, FunParam,
    GenericParam, Literal, MatchCase, Module, Package, PackageStatus, Pat, PatKind, Stmt,
    StmtKind, Visibility,
};
use lily_errors::{DiagnosticKind, Handler};
use lily_span::Location;
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

fn float(value: f64) -> Expr {
    expr(ExprKind::Literal(Literal::Float(value)))
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

fn generic_params(names: &[&str]) -> SmallVec<[GenericParam; 4]> {
    names
        .iter()
        .map(|name| GenericParam {
            name: (*name).to_owned(),
            location: loc(),
        })
        .collect()
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

fn operator(name: &str, params: Vec<FunParam>, return_ty: Option<DataTy>, body: Vec<Stmt>) -> Decl {
    Decl::new(
        DeclKind::Fun {
            name: name.to_owned(),
            generic_params: SmallVec::new(),
            params,
            return_ty,
            body,
            is_operator: true,
            visibility: Visibility::Public,
        },
        loc(),
    )
}

fn param(name: &str, data_ty: DataTyKind) -> FunParam {
    FunParam {
        name: name.to_owned(),
        ty: Some(ty(data_ty)),
        mutable: false,
        location: loc(),
    }
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

fn shape_enum() -> Decl {
    Decl::new(
        DeclKind::Enum {
            name: "Shape".to_owned(),
            generic_params: SmallVec::new(),
            variants: vec![
                EnumVariant {
                    name: "Circle".to_owned(),
                    values: vec![ty(DataTyKind::Float64)],
                    location: loc(),
                },
                EnumVariant {
                    name: "Square".to_owned(),
                    values: vec![ty(DataTyKind::Float64)],
                    location: loc(),
                },
            ],
            visibility: Visibility::Public,
        },
        loc(),
    )
}

#[test]
fn payload_enum_match_stays_structural_and_exhaustive() {
    let package = package(vec![
        shape_enum(),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "s".to_owned(),
                    ty: None,
                    value: Box::new(expr(ExprKind::VariantCall {
                        name: AstPath::single("Circle"),
                        generic_args: None,
                        values: vec![float(1.5)],
                    })),
                    mutable: false,
                }),
                stmt(StmtKind::Match {
                    scrutinee: Box::new(ident("s")),
                    cases: vec![
                        MatchCase {
                            pat: Pat::new(
                                PatKind::VariantCall {
                                    name: AstPath::single("Circle"),
                                    args: vec![Pat::new(PatKind::Name("r".to_owned()), loc())],
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
                                    name: AstPath::single("Square"),
                                    args: vec![Pat::new(PatKind::Name("x".to_owned()), loc())],
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
    let main = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "main" && decl.as_fun().is_some())
        .unwrap();
    let body = main.as_fun().unwrap().body.borrow().clone();
    let lily_analysis::checked::CheckedStmtKind::Match(checked_match) = &body[1].kind else {
        panic!("payload enums must stay a structural match");
    };
    assert_eq!(checked_match.nb_cases, checked_match.total_cases);
    // The captures flowed into the case scopes.
    assert_eq!(checked_match.cases[0].captures[0].0, "r");
}

#[test]
fn variant_call_arity_is_checked() {
    let package = package(vec![
        shape_enum(),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Expr(Box::new(expr(ExprKind::VariantCall {
                    name: AstPath::single("Circle"),
                    generic_args: None,
                    values: vec![float(1.0), float(2.0)],
                })))),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::NumberOfParamsMismatched));
}

#[test]
fn raise_values_are_checked_against_error_fields() {
    let error_decl = Decl::new(
        DeclKind::Error {
            name: "Overflow".to_owned(),
            generic_params: SmallVec::new(),
            fields: vec![Field {
                name: "value".to_owned(),
                ty: ty(DataTyKind::Int64),
                mutable: false,
                location: loc(),
            }],
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
                stmt(StmtKind::Raise {
                    name: AstPath::single("Overflow"),
                    values: vec![],
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::NumberOfParamsMismatched));
}

#[test]
fn operator_declarations_register_and_deduplicate() {
    // The registry is package-wide: the same (name, param types) declared
    // in two different modules collides there, not in the fun containers.
    let str_plus = || {
        operator(
            "+",
            vec![param("a", DataTyKind::Str), param("b", DataTyKind::Str)],
            Some(ty(DataTyKind::Str)),
            vec![ret_stmt(expr(ExprKind::Literal(Literal::Str("".to_owned()))))],
        )
    };
    let module = |name: &str| {
        Decl::new(
            DeclKind::Module(Module {
                name: name.to_owned(),
                decls: vec![str_plus()],
                location: loc(),
            }),
            loc(),
        )
    };
    let package = package(vec![
        module("a"),
        module("b"),
        fun("main", vec![], None, vec![ret_stmt(int(0))]),
    ]);
    let (_, handler) = run(&package);
    assert_eq!(
        handler.error_kinds(),
        vec![DiagnosticKind::DuplicateOperator]
    );
}

#[test]
fn operator_rules_reject_bad_names_and_missing_returns() {
    let package = package(vec![
        operator(
            "frobnicate",
            vec![param("a", DataTyKind::Int32)],
            None,
            vec![ret_stmt(int(0))],
        ),
        fun("main", vec![], None, vec![ret_stmt(int(0))]),
    ]);
    let (_, handler) = run(&package);

    let kinds = handler.error_kinds();
    assert!(kinds.contains(&DiagnosticKind::OperatorIsNotValid));
    assert!(kinds.contains(&DiagnosticKind::OperatorMustHaveReturnDataType));
}

#[test]
fn operator_param_without_type_is_rejected() {
    let package = package(vec![
        operator(
            "+",
            vec![FunParam {
                name: "a".to_owned(),
                ty: None,
                mutable: false,
                location: loc(),
            }],
            Some(ty(DataTyKind::Int32)),
            vec![ret_stmt(int(0))],
        ),
        fun("main", vec![], None, vec![ret_stmt(int(0))]),
    ]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::OperatorCannotHaveCompilerDefinedDataTypeAsParameter));
}

#[test]
fn nested_module_members_resolve_through_paths() {
    let math = Decl::new(
        DeclKind::Module(Module {
            name: "math".to_owned(),
            decls: vec![fun(
                "double",
                vec![param("x", DataTyKind::Int32)],
                Some(ty(DataTyKind::Int32)),
                vec![ret_stmt(expr(ExprKind::Binary {
                    op: lily_ast::BinaryOp::Mul,
                    lhs: Box::new(ident("x")),
                    rhs: Box::new(int(2)),
                }))],
            )],
            location: loc(),
        }),
        loc(),
    );
    let package = package(vec![
        math,
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "y".to_owned(),
                    ty: Some(ty(DataTyKind::Int32)),
                    value: Box::new(expr(ExprKind::FunCall {
                        name: AstPath::new(vec!["math".to_owned(), "double".to_owned()]),
                        generic_args: None,
                        args: vec![int(21)],
                    })),
                    mutable: false,
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let double = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "double")
        .unwrap();
    assert_eq!(double.global_name, "main.math.double");
}

fn pair_record() -> Decl {
    Decl::new(
        DeclKind::Record {
            name: "Pair".to_owned(),
            generic_params: generic_params(&["T"]),
            fields: vec![
                Field {
                    name: "first".to_owned(),
                    ty: ty(DataTyKind::custom("T")),
                    mutable: false,
                    location: loc(),
                },
                Field {
                    name: "second".to_owned(),
                    ty: ty(DataTyKind::custom("T")),
                    mutable: false,
                    location: loc(),
                },
            ],
            visibility: Visibility::Public,
        },
        loc(),
    )
}

#[test]
fn explicit_generic_application_allocates_a_type_signature() {
    let package = package(vec![
        pair_record(),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "p".to_owned(),
                    ty: None,
                    value: Box::new(expr(ExprKind::RecordCall {
                        name: AstPath::single("Pair"),
                        generic_args: Some(vec![ty(DataTyKind::Int32)]),
                        fields: vec![
                            ("first".to_owned(), int(1)),
                            ("second".to_owned(), int(2)),
                        ],
                    })),
                    mutable: false,
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let pair = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "Pair")
        .unwrap();
    let signatures = pair.as_record().unwrap().signatures.borrow().clone();
    // The identity signature plus the Int32 application.
    assert_eq!(signatures.len(), 2);
    assert_eq!(signatures[1].serial_name, "main.Pair__Int32");
}

#[test]
fn generic_record_fields_infer_the_argument_map() {
    let package = package(vec![
        pair_record(),
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Variable {
                    name: "p".to_owned(),
                    ty: None,
                    value: Box::new(expr(ExprKind::RecordCall {
                        name: AstPath::single("Pair"),
                        generic_args: None,
                        fields: vec![
                            ("first".to_owned(), int(1)),
                            ("second".to_owned(), int(2)),
                        ],
                    })),
                    mutable: false,
                }),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (analysis, handler) = run(&package);

    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
    let pair = analysis
        .decls
        .iter()
        .find(|decl| decl.name == "Pair")
        .unwrap();
    assert_eq!(pair.as_record().unwrap().signatures.borrow().len(), 2);
}

#[test]
fn record_field_value_type_mismatch_is_reported() {
    let record = Decl::new(
        DeclKind::Record {
            name: "Point".to_owned(),
            generic_params: SmallVec::new(),
            fields: vec![Field {
                name: "x".to_owned(),
                ty: ty(DataTyKind::Bool),
                mutable: false,
                location: loc(),
            }],
            visibility: Visibility::Public,
        },
        loc(),
    );
    let package = package(vec![
        record,
        fun(
            "main",
            vec![],
            None,
            vec![
                stmt(StmtKind::Expr(Box::new(expr(ExprKind::RecordCall {
                    name: AstPath::single("Point"),
                    generic_args: None,
                    fields: vec![("x".to_owned(), int(3))],
                })))),
                ret_stmt(int(0)),
            ],
        ),
    ]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::DataTypeDontMatch));
}

#[test]
fn constant_with_declared_type_checks_its_value() {
    let constant = Decl::new(
        DeclKind::Constant {
            name: "N".to_owned(),
            ty: Some(ty(DataTyKind::Int32)),
            value: expr(ExprKind::Literal(Literal::Str("nope".to_owned()))),
            visibility: Visibility::Public,
        },
        loc(),
    );
    let package = package(vec![
        constant,
        fun("main", vec![], None, vec![ret_stmt(int(0))]),
    ]);
    let (_, handler) = run(&package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::DataTypeDontMatch));
}

#[test]
fn any_is_rejected_in_safe_mode_and_allowed_in_unsafe() {
    let safe_package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Variable {
                name: "x".to_owned(),
                ty: Some(ty(DataTyKind::Any)),
                value: Box::new(int(1)),
                mutable: false,
            }),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&safe_package);
    assert!(handler
        .error_kinds()
        .contains(&DiagnosticKind::CannotUseAnyInSafeMode));

    let unsafe_package = package(vec![fun(
        "main",
        vec![],
        None,
        vec![
            stmt(StmtKind::Unsafe(vec![stmt(StmtKind::Variable {
                name: "x".to_owned(),
                ty: Some(ty(DataTyKind::Any)),
                value: Box::new(int(1)),
                mutable: false,
            })])),
            ret_stmt(int(0)),
        ],
    )]);
    let (_, handler) = run(&unsafe_package);
    assert_eq!(handler.error_count(), 0, "{:?}", handler.error_kinds());
}

#[test]
fn checked_flag_flips_exactly_once() {
    let package = package(vec![fun("main", vec![], None, vec![ret_stmt(int(0))])]);
    let (analysis, _) = run(&package);
    assert!(analysis.decls.iter().all(|decl| decl.checked.get()));
}
