//! End-to-end interpreter runs over hand-assembled MIR.

use lily_config::Conf;
use lily_mir::{Dt, FunBuilder, Inst, Module, SwitchCase, Val, ValKind};
use lily_vm::{Obj, Resources, RuntimeErrorKind, Value, Vm};

fn conf(check_overflow: bool) -> Conf {
    Conf {
        check_overflow,
        ..Conf::default()
    }
}

fn run_module(module: &Module, check_overflow: bool) -> Result<Value, RuntimeErrorKind> {
    let mut vm = Vm::new(module, &conf(check_overflow), Resources::default())
        .map_err(|err| err.kind)?;
    vm.run().map_err(|err| err.kind)
}

fn main_module(insts: Vec<Inst>) -> Module {
    let mut module = Module::new();
    module.add_fun(FunBuilder::new("main").ret(Dt::I32).block("entry", insts).finish());
    module
}

#[test]
fn iadd_with_check_overflow_aborts() {
    let module = main_module(vec![
        Inst::val(Val::int(Dt::I32, 0x7FFF_FFFF)),
        Inst::val(Val::int(Dt::I32, 1)),
        Inst::ret(Inst::Iadd),
    ]);
    assert_eq!(run_module(&module, true), Err(RuntimeErrorKind::Overflow));
}

#[test]
fn iadd_without_check_overflow_wraps() {
    let module = main_module(vec![
        Inst::val(Val::int(Dt::I32, 0x7FFF_FFFF)),
        Inst::val(Val::int(Dt::I32, 1)),
        Inst::ret(Inst::Iadd),
    ]);
    assert_eq!(run_module(&module, false), Ok(Value::Int32(-2147483648)));
}

#[test]
fn arithmetic_of_each_width_keeps_its_kind() {
    let module = main_module(vec![
        Inst::val(Val::uint(Dt::U16, 300)),
        Inst::val(Val::uint(Dt::U16, 14)),
        Inst::ret(Inst::Imul),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::Uint16(4200)));
}

#[test]
fn division_by_zero_is_fatal_in_both_modes() {
    for check_overflow in [true, false] {
        let module = main_module(vec![
            Inst::val(Val::int(Dt::I64, 10)),
            Inst::val(Val::int(Dt::I64, 0)),
            Inst::ret(Inst::Idiv),
        ]);
        assert_eq!(
            run_module(&module, check_overflow),
            Err(RuntimeErrorKind::DivisionByZero)
        );
    }
}

#[test]
fn icmp_pushes_bool_values() {
    let module = main_module(vec![
        Inst::val(Val::int(Dt::I8, 3)),
        Inst::val(Val::int(Dt::I8, 7)),
        Inst::ret(Inst::IcmpLt),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::True));
}

#[test]
fn frem_follows_fmod_semantics() {
    let module = main_module(vec![
        Inst::val(Val::float(-7.5)),
        Inst::val(Val::float(2.0)),
        Inst::ret(Inst::Frem),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::Float(-1.5)));
}

#[test]
fn jmp_cond_selects_then_and_else() {
    for (flag, expected) in [(1, 10), (0, 20)] {
        let module = {
            let mut module = Module::new();
            module.add_fun(
                FunBuilder::new("main")
                    .ret(Dt::I32)
                    .block(
                        "entry",
                        vec![Inst::jmp_cond(
                            Val::new(Dt::I1, ValKind::Int(flag)),
                            "then",
                            "else",
                        )],
                    )
                    .block("then", vec![Inst::ret(Inst::val(Val::int(Dt::I32, 10)))])
                    .block("else", vec![Inst::ret(Inst::val(Val::int(Dt::I32, 20)))])
                    .finish(),
            );
            module
        };
        assert_eq!(run_module(&module, true), Ok(Value::Int32(expected)));
    }
}

#[test]
fn loop_back_edge_reuses_the_block_frame() {
    // Sums 0..5 with a counter variable threaded through registers:
    //   entry:        var i = 0; var acc = 0; jmp cond
    //   cond (limit1): i < 5 ? body : exit
    //   body (limit1): acc = acc + i; i = i + 1; jmp cond
    //   exit:         ret acc
    let module = {
        let mut module = Module::new();
        module.add_fun(
            FunBuilder::new("main")
                .ret(Dt::I32)
                .block(
                    "entry",
                    vec![
                        Inst::var("i", Inst::val(Val::int(Dt::I32, 0))),
                        Inst::var("acc", Inst::val(Val::int(Dt::I32, 0))),
                        Inst::Jmp("cond".to_owned()),
                    ],
                )
                .block(
                    "cond",
                    vec![
                        Inst::val(Val::new(Dt::I32, ValKind::Var("i".to_owned()))),
                        Inst::val(Val::int(Dt::I32, 5)),
                        Inst::reg("%cmp", Inst::IcmpLt),
                        Inst::jmp_cond(Val::new(Dt::I1, ValKind::Reg("%cmp".to_owned())), "body", "exit"),
                    ],
                )
                .block_with_limit(
                    "body",
                    1,
                    vec![
                        Inst::val(Val::new(Dt::I32, ValKind::Var("acc".to_owned()))),
                        Inst::val(Val::new(Dt::I32, ValKind::Var("i".to_owned()))),
                        Inst::reg("%sum", Inst::Iadd),
                        Inst::Store {
                            dest: Box::new(Val::new(Dt::I32, ValKind::Var("acc".to_owned()))),
                            src: Box::new(Val::new(Dt::I32, ValKind::Reg("%sum".to_owned()))),
                        },
                        Inst::val(Val::new(Dt::I32, ValKind::Var("i".to_owned()))),
                        Inst::val(Val::int(Dt::I32, 1)),
                        Inst::reg("%next", Inst::Iadd),
                        Inst::Store {
                            dest: Box::new(Val::new(Dt::I32, ValKind::Var("i".to_owned()))),
                            src: Box::new(Val::new(Dt::I32, ValKind::Reg("%next".to_owned()))),
                        },
                        Inst::Jmp("cond".to_owned()),
                    ],
                )
                .block("exit", vec![Inst::ret(Inst::val(Val::new(
                    Dt::I32,
                    ValKind::Var("acc".to_owned()),
                )))])
                .finish(),
        );
        module
    };
    assert_eq!(run_module(&module, true), Ok(Value::Int32(10)));
}

#[test]
fn branch_join_cleans_the_branch_extent() {
    // Values pushed inside a branch are popped when the branch jumps to
    // the join block; variables recorded before the branch stay
    // addressable.
    let mut module = Module::new();
    module.add_fun(
        FunBuilder::new("main")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![
                    Inst::var("base", Inst::val(Val::int(Dt::I32, 40))),
                    Inst::jmp_cond(Val::new(Dt::I1, ValKind::Int(1)), "then", "else"),
                ],
            )
            .block(
                "then",
                vec![
                    Inst::val(Val::int(Dt::I32, 111)),
                    Inst::val(Val::int(Dt::I32, 222)),
                    Inst::Jmp("join".to_owned()),
                ],
            )
            .block("else", vec![Inst::Jmp("join".to_owned())])
            .block_with_limit(
                "join",
                0,
                vec![
                    Inst::val(Val::new(Dt::I32, ValKind::Var("base".to_owned()))),
                    Inst::val(Val::int(Dt::I32, 2)),
                    Inst::ret(Inst::Iadd),
                ],
            )
            .finish(),
    );
    assert_eq!(run_module(&module, true), Ok(Value::Int32(42)));
}

#[test]
fn calls_attach_and_detach_frames() {
    let mut module = Module::new();
    module.add_fun(
        FunBuilder::new("add")
            .param(Dt::I32)
            .param(Dt::I32)
            .ret(Dt::I32)
            .block(
                "entry",
                vec![
                    Inst::GetArg(0),
                    Inst::GetArg(1),
                    Inst::ret(Inst::Iadd),
                ],
            )
            .finish(),
    );
    module.add_fun(
        FunBuilder::new("main")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![Inst::ret(Inst::Call {
                    name: "add".to_owned(),
                    args: vec![Val::int(Dt::I32, 40), Val::int(Dt::I32, 2)],
                    ret_dt: Dt::I32,
                })],
            )
            .finish(),
    );
    assert_eq!(run_module(&module, true), Ok(Value::Int32(42)));
}

#[test]
fn net_zero_stack_effect_after_run() {
    let module = main_module(vec![
        Inst::val(Val::int(Dt::I32, 1)),
        Inst::val(Val::int(Dt::I32, 2)),
        Inst::val(Val::int(Dt::I32, 3)),
        Inst::ret(Inst::Iadd),
    ]);
    let mut vm = Vm::new(&module, &conf(true), Resources::default()).unwrap();
    vm.run().unwrap();
    // Everything above the (empty) pre-frame region was cleaned.
    assert_eq!(vm.stack_len(), 0);
}

#[test]
fn consts_load_from_the_pre_frame_region() {
    let mut module = Module::new();
    module.add_const("main.ANSWER", Val::int(Dt::I32, 42));
    module.add_fun(
        FunBuilder::new("main")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![Inst::ret(Inst::val(Val::new(
                    Dt::I32,
                    ValKind::Const("main.ANSWER".to_owned()),
                )))],
            )
            .finish(),
    );
    assert_eq!(run_module(&module, true), Ok(Value::Int32(42)));
}

#[test]
fn switch_dispatches_on_value() {
    let module = {
        let mut module = Module::new();
        module.add_fun(
            FunBuilder::new("main")
                .ret(Dt::I32)
                .block(
                    "entry",
                    vec![Inst::Switch {
                        val: Box::new(Val::int(Dt::I32, 2)),
                        cases: vec![
                            SwitchCase {
                                val: Val::int(Dt::I32, 1),
                                target: "one".to_owned(),
                            },
                            SwitchCase {
                                val: Val::int(Dt::I32, 2),
                                target: "two".to_owned(),
                            },
                        ],
                        default: "other".to_owned(),
                    }],
                )
                .block("one", vec![Inst::ret(Inst::val(Val::int(Dt::I32, 100)))])
                .block("two", vec![Inst::ret(Inst::val(Val::int(Dt::I32, 200)))])
                .block("other", vec![Inst::ret(Inst::val(Val::int(Dt::I32, 300)))])
                .finish(),
        );
        module
    };
    assert_eq!(run_module(&module, true), Ok(Value::Int32(200)));
}

#[test]
fn try_routes_a_raise_to_the_catch_block() {
    let mut module = Module::new();
    module.add_fun(
        FunBuilder::new("fails")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![
                    Inst::val(Val::int(Dt::I32, 7)),
                    Inst::ret(Inst::MakeErr),
                ],
            )
            .finish(),
    );
    module.add_fun(
        FunBuilder::new("main")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![
                    Inst::Try {
                        inner: Box::new(Inst::Call {
                            name: "fails".to_owned(),
                            args: vec![],
                            ret_dt: Dt::I32,
                        }),
                        catch_block: "catch".to_owned(),
                    },
                    Inst::ret(Inst::val(Val::int(Dt::I32, 0))),
                ],
            )
            .block("catch", vec![Inst::ret(Inst::val(Val::int(Dt::I32, 1)))])
            .finish(),
    );
    assert_eq!(run_module(&module, true), Ok(Value::Int32(1)));
}

#[test]
fn uncaught_raise_propagates_through_plain_calls() {
    let mut module = Module::new();
    module.add_fun(
        FunBuilder::new("fails")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![Inst::val(Val::int(Dt::I32, 7)), Inst::ret(Inst::MakeErr)],
            )
            .finish(),
    );
    module.add_fun(
        FunBuilder::new("main")
            .ret(Dt::I32)
            .block(
                "entry",
                vec![
                    Inst::Call {
                        name: "fails".to_owned(),
                        args: vec![],
                        ret_dt: Dt::I32,
                    },
                    Inst::ret(Inst::val(Val::int(Dt::I32, 0))),
                ],
            )
            .finish(),
    );
    assert!(matches!(
        run_module(&module, true),
        Err(RuntimeErrorKind::Unreachable(_))
    ));
}

#[test]
fn is_ok_and_is_err_classify_results() {
    let module = main_module(vec![
        Inst::val(Val::int(Dt::I32, 1)),
        Inst::MakeOk,
        Inst::ret(Inst::IsErr),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::False));
}

#[test]
fn getfield_reads_struct_slots() {
    let module = main_module(vec![Inst::ret(Inst::GetField {
        src: Box::new(Val::new(
            Dt::Struct(vec![Dt::I32, Dt::I32]),
            ValKind::Struct(vec![Val::int(Dt::I32, 5), Val::int(Dt::I32, 9)]),
        )),
        index: 1,
    })]);
    assert_eq!(run_module(&module, true), Ok(Value::Int32(9)));
}

#[test]
fn len_of_str_and_array() {
    let module = main_module(vec![
        Inst::val(Val::str("hello")),
        Inst::ret(Inst::Len),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::Usize(5)));

    let module = main_module(vec![
        Inst::val(Val::new(
            Dt::Array(3, Box::new(Dt::I32)),
            ValKind::Array(vec![
                Val::int(Dt::I32, 1),
                Val::int(Dt::I32, 2),
                Val::int(Dt::I32, 3),
            ]),
        )),
        Inst::ret(Inst::Len),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::Usize(3)));
}

#[test]
fn sys_exit_is_an_observable_stop() {
    let module = main_module(vec![
        Inst::SysCall {
            name: "exit".to_owned(),
            args: vec![Val::int(Dt::I32, 3)],
            ret_dt: Dt::Unit,
        },
        Inst::ret(Inst::val(Val::int(Dt::I32, 0))),
    ]);
    assert_eq!(run_module(&module, true), Err(RuntimeErrorKind::Exit(3)));
}

#[test]
fn sys_argv_reads_resources() {
    let module = main_module(vec![Inst::ret(Inst::SysCall {
        name: "argv".to_owned(),
        args: vec![Val::uint(Dt::Usize, 1)],
        ret_dt: Dt::Str(0),
    })]);
    let resources = Resources::new(vec!["prog".to_owned(), "arg1".to_owned()]);
    let mut vm = Vm::new(&module, &conf(true), resources).unwrap();
    match vm.run().unwrap() {
        Value::Object(Obj::Str(s)) => assert_eq!(&*s, "arg1"),
        other => panic!("expected str, got {other:?}"),
    }
}

#[test]
fn stack_overflow_on_tiny_stack() {
    let module = main_module(vec![
        Inst::val(Val::int(Dt::I32, 1)),
        Inst::val(Val::int(Dt::I32, 2)),
        Inst::val(Val::int(Dt::I32, 3)),
        Inst::ret(Inst::val(Val::int(Dt::I32, 0))),
    ]);
    let conf = Conf {
        stack_capacity: 2,
        ..Conf::default()
    };
    let mut vm = Vm::new(&module, &conf, Resources::default()).unwrap();
    assert_eq!(vm.run().unwrap_err().kind, RuntimeErrorKind::StackOverflow);
}

#[test]
fn unreachable_inst_aborts() {
    let module = main_module(vec![Inst::Unreachable]);
    assert!(matches!(
        run_module(&module, true),
        Err(RuntimeErrorKind::Unreachable(_))
    ));
}

#[test]
fn getarray_indexes_with_a_runtime_value() {
    let array = Val::new(
        Dt::Array(3, Box::new(Dt::I32)),
        ValKind::Array(vec![
            Val::int(Dt::I32, 10),
            Val::int(Dt::I32, 20),
            Val::int(Dt::I32, 30),
        ]),
    );
    let module = main_module(vec![Inst::ret(Inst::GetArray {
        src: Box::new(array),
        index: Box::new(Val::uint(Dt::Usize, 2)),
    })]);
    assert_eq!(run_module(&module, true), Ok(Value::Int32(30)));
}

#[test]
fn getslice_copies_the_requested_range() {
    let array = Val::new(
        Dt::Array(4, Box::new(Dt::I32)),
        ValKind::Array(vec![
            Val::int(Dt::I32, 1),
            Val::int(Dt::I32, 2),
            Val::int(Dt::I32, 3),
            Val::int(Dt::I32, 4),
        ]),
    );
    let module = main_module(vec![
        Inst::GetSlice {
            src: Box::new(array),
            lo: Box::new(Val::uint(Dt::Usize, 1)),
            hi: Box::new(Val::uint(Dt::Usize, 3)),
        },
        Inst::ret(Inst::Len),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::Usize(2)));
}

#[test]
fn ineg_of_int_min_overflows_only_when_checked() {
    let body = || {
        vec![
            Inst::val(Val::int(Dt::I8, i8::MIN as i64)),
            Inst::ret(Inst::Ineg),
        ]
    };
    assert_eq!(
        run_module(&main_module(body()), true),
        Err(RuntimeErrorKind::Overflow)
    );
    assert_eq!(
        run_module(&main_module(body()), false),
        Ok(Value::Int8(i8::MIN))
    );
}

#[test]
fn alloc_is_bounded_by_heap_capacity() {
    let module = main_module(vec![
        Inst::Alloc(Dt::I64),
        Inst::ret(Inst::val(Val::int(Dt::I32, 0))),
    ]);
    let conf = Conf {
        heap_capacity: 4,
        ..Conf::default()
    };
    let mut vm = Vm::new(&module, &conf, Resources::default()).unwrap();
    assert_eq!(vm.run().unwrap_err().kind, RuntimeErrorKind::MemoryExhausted);
}

#[test]
fn builtin_len_call_returns_usize() {
    let module = main_module(vec![Inst::ret(Inst::BuiltinCall {
        name: "len".to_owned(),
        args: vec![Val::str("abcd")],
        ret_dt: Dt::Usize,
    })]);
    assert_eq!(run_module(&module, true), Ok(Value::Usize(4)));
}

#[test]
fn non_nil_on_nil_is_fatal() {
    let module = main_module(vec![
        Inst::val(Val::new(Dt::Ptr(Box::new(Dt::I32)), ValKind::Nil)),
        Inst::NonNil,
        Inst::ret(Inst::val(Val::int(Dt::I32, 0))),
    ]);
    assert!(matches!(
        run_module(&module, true),
        Err(RuntimeErrorKind::Unreachable(_))
    ));
}

#[test]
fn unsigned_comparison_and_bool_xor() {
    let module = main_module(vec![
        Inst::val(Val::uint(Dt::U64, 3)),
        Inst::val(Val::uint(Dt::U64, 7)),
        Inst::ret(Inst::IcmpGe),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::False));

    let module = main_module(vec![
        Inst::val(Val::new(Dt::I1, ValKind::Int(1))),
        Inst::val(Val::new(Dt::I1, ValKind::Int(0))),
        Inst::ret(Inst::Xor),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::True));
}

#[test]
fn trunc_narrows_and_rewidens() {
    let module = main_module(vec![
        Inst::val(Val::int(Dt::I32, 300)),
        Inst::ret(Inst::Trunc { dt: Dt::I8 }),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::Int8(44)));
}

#[test]
fn shifts_and_bitops() {
    let module = main_module(vec![
        Inst::val(Val::int(Dt::I32, 1)),
        Inst::val(Val::int(Dt::I32, 5)),
        Inst::ret(Inst::Shl),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::Int32(32)));

    let module = main_module(vec![
        Inst::val(Val::int(Dt::I32, 0b1100)),
        Inst::val(Val::int(Dt::I32, 0b1010)),
        Inst::ret(Inst::Bitand),
    ]);
    assert_eq!(run_module(&module, true), Ok(Value::Int32(0b1000)));
}
