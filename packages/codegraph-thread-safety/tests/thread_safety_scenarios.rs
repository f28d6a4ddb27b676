//! End-to-end thread-safety scenarios
//!
//! Each test assembles a small program, runs the checker and inspects the
//! report.

mod common;

use codegraph_thread_safety::shared::models::{
    AnnotationKind, Builtin, Callee, ClassDecl, Exp, FieldName, Ident, Instr, ProcAccess,
    ProcDescBuilder, ProcName, Typ,
};
use codegraph_thread_safety::{
    check_program, CheckReport, Diagnostic, IssueKind, Program, ThreadSafetyChecker,
    ThreadSafetyConfig,
};
use common::*;
use pretty_assertions::assert_eq;

fn check(program: &Program) -> CheckReport {
    check_program(program, &ThreadSafetyConfig::default()).expect("check succeeds")
}

// ═══════════════════════════════════════════════════════════════════════════
// Core scenarios
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn unsynchronized_write_in_thread_safe_class_is_reported() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("foo")
                .body(vec![load_this(0, 3), store_field(0, "x", Exp::int(5), 3)])
                .build(),
        )
        .build();

    let report = check(&program);
    assert_eq!(report.diagnostics.len(), 1);
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.kind, IssueKind::UnprotectedWrite);
    assert_eq!(diagnostic.access, "this.x");
    assert_eq!(diagnostic.location, loc(3));
    assert_eq!(
        diagnostic.message,
        "Unprotected write. Non-private method `Foo.foo()` writes to field `this.x` outside of synchronization."
    );
}

#[test]
fn repeated_writes_to_one_field_are_reported_once() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("twice")
                .body(vec![
                    load_this(0, 3),
                    store_field(0, "x", Exp::var(5), 3),
                    store_field(0, "x", Exp::var(6), 4),
                ])
                .build(),
        )
        .build();

    let report = check(&program);
    let writes = violations(&report, IssueKind::UnprotectedWrite, "twice");
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].location, loc(3));
}

#[test]
fn synchronized_write_is_not_reported() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("bar")
                .synchronized()
                .body(vec![load_this(0, 3), store_field(0, "x", Exp::int(5), 3)])
                .build(),
        )
        .build();

    assert_no_violations(&check(&program));
}

#[test]
fn read_racing_with_write_names_the_writer() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("read")
                .returns(Typ::Int)
                .body(vec![
                    load_this(0, 3),
                    load_field(1, 0, "x", Typ::Int, 3),
                    store_return(Exp::var(1), 3),
                ])
                .build(),
        )
        .with_procedure(
            method("write")
                .body(vec![load_this(0, 7), store_field(0, "x", Exp::int(1), 7)])
                .build(),
        )
        .build();

    let report = check(&program);
    let races = violations(&report, IssueKind::ReadWriteRace, "read");
    assert_eq!(races.len(), 1);
    assert_eq!(races[0].conflicts, vec![ProcName::new(CLASS, "write")]);
    assert!(races[0]
        .message
        .ends_with("Potentially races with writes in method(s) `Foo.write()`."));
    assert_violation_count(&report, IssueKind::UnprotectedWrite, "write", 1);
    assert_eq!(report.stats.read_write_races, 1);
}

#[test]
fn constructor_writes_are_owned() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            ProcDescBuilder::instance_method(ProcName::constructor(CLASS), FILE)
                .body(vec![load_this(0, 2), store_field(0, "y", Exp::var(5), 2)])
                .build(),
        )
        .build();

    let checker = ThreadSafetyChecker::default();
    let report = checker.run(&program).unwrap();
    assert_no_violations(&report);

    let summary = &checker.summaries()[&ProcName::constructor(CLASS)];
    assert!(summary.accesses.is_empty());
}

#[test]
fn builder_classes_are_exempt() {
    let builder = "com.example.FooBuilder";
    let program = ProgramBuilder::new()
        .with_class(thread_safe_class(builder))
        .with_procedure(
            ProcDescBuilder::instance_method(ProcName::new(builder, "setX"), "FooBuilder.java")
                .body(vec![
                    Instr::Load {
                        id: Ident(0),
                        exp: Exp::lvar("this"),
                        typ: Typ::object(builder),
                        loc: loc(4),
                    },
                    Instr::Store {
                        lhs: Exp::field(Exp::var(0), field("x")),
                        typ: Typ::Int,
                        rhs: Exp::var(1),
                        loc: loc(4),
                    },
                ])
                .build(),
        )
        .build();

    let report = check(&program);
    assert_no_violations(&report);
    assert_eq!(report.stats.skipped, 1);
}

#[test]
fn methods_confined_to_the_same_thread_do_not_race() {
    let assert_main = || {
        call(
            None,
            ProcName::new(THREAD_UTILS, "assertMainThread"),
            vec![],
            2,
        )
    };
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("first")
                .body(vec![
                    assert_main(),
                    load_this(0, 3),
                    store_field(0, "x", Exp::var(5), 3),
                    load_field(1, 0, "y", Typ::Int, 4),
                ])
                .build(),
        )
        .with_procedure(
            method("second")
                .body(vec![
                    assert_main(),
                    load_this(0, 8),
                    store_field(0, "y", Exp::var(5), 8),
                    load_field(1, 0, "x", Typ::Int, 9),
                ])
                .build(),
        )
        .build();

    assert_no_violations(&check(&program));
}

#[test]
fn confined_reader_still_races_with_unconfined_writer() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("reader")
                .body(vec![
                    call(None, ProcName::new(THREAD_UTILS, "assertMainThread"), vec![], 2),
                    load_this(0, 3),
                    load_field(1, 0, "x", Typ::Int, 3),
                ])
                .build(),
        )
        .with_procedure(
            method("writer")
                .body(vec![load_this(0, 7), store_field(0, "x", Exp::var(5), 7)])
                .build(),
        )
        .build();

    let report = check(&program);
    assert_violation_count(&report, IssueKind::ReadWriteRace, "reader", 1);
    assert_violation_count(&report, IssueKind::UnprotectedWrite, "writer", 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Locks
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn try_lock_narrows_lock_state_per_branch() {
    let try_lock = call(
        Some((1, Typ::Boolean)),
        ProcName::new(LOCK, "tryLock"),
        vec![(Exp::var(9), Typ::object(LOCK))],
        2,
    );
    // 0 → {1 (locked), 2 (not locked)} → 3
    let pdesc = method("maybeLocked")
        .node(vec![load_this(0, 2), try_lock], &[1, 2])
        .node(
            vec![prune(Exp::var(1), true, 3), store_field(0, "x", Exp::var(5), 4)],
            &[3],
        )
        .node(
            vec![
                prune(Exp::not(Exp::var(1)), false, 3),
                store_field(0, "y", Exp::var(5), 6),
            ],
            &[3],
        )
        .node(vec![], &[])
        .build();
    let program = ProgramBuilder::thread_safe().with_procedure(pdesc).build();

    let report = check(&program);
    let writes = violations(&report, IssueKind::UnprotectedWrite, "maybeLocked");
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].access, "this.y");
}

#[test]
fn write_after_released_try_lock_is_unprotected() {
    let lock_arg = || vec![(Exp::var(9), Typ::object(LOCK))];
    // 0 → {1 (locked, then released), 2 (not locked)} → 3
    let pdesc = method("releaseThenWrite")
        .node(
            vec![
                load_this(0, 2),
                call(Some((1, Typ::Boolean)), ProcName::new(LOCK, "tryLock"), lock_arg(), 2),
            ],
            &[1, 2],
        )
        .node(
            vec![
                prune(Exp::var(1), true, 3),
                store_field(0, "x", Exp::var(5), 4),
                call(None, ProcName::new(LOCK, "unlock"), lock_arg(), 5),
            ],
            &[3],
        )
        .node(vec![prune(Exp::not(Exp::var(1)), false, 3)], &[3])
        .node(vec![store_field(0, "z", Exp::var(5), 8)], &[])
        .build();
    let program = ProgramBuilder::thread_safe().with_procedure(pdesc).build();

    let report = check(&program);
    let writes = violations(&report, IssueKind::UnprotectedWrite, "releaseThenWrite");
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].access, "this.z");
    assert_eq!(writes[0].location, loc(8));
}

#[test]
fn lock_acquired_in_callee_protects_caller() {
    let lock_field = || {
        vec![
            load_this(0, 2),
            load_field(1, 0, "lock", Typ::object(LOCK), 2),
            call(None, ProcName::new(LOCK, "lock"), vec![(Exp::var(1), Typ::object(LOCK))], 2),
        ]
    };
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("acquire")
                .access(ProcAccess::Private)
                .body(lock_field())
                .build(),
        )
        .with_procedure(
            method("update")
                .body(vec![
                    load_this(0, 5),
                    call(
                        None,
                        ProcName::new(CLASS, "acquire"),
                        vec![(Exp::var(0), Typ::object(CLASS))],
                        5,
                    ),
                    store_field(0, "x", Exp::var(5), 6),
                ])
                .build(),
        )
        .build();

    let report = check(&program);
    assert_violation_count(&report, IssueKind::UnprotectedWrite, "update", 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Ownership
// ═══════════════════════════════════════════════════════════════════════════

fn program_with_private_setter(caller: ProcDescBuilder) -> Program {
    let other = "com.example.Other";
    // private void store(Other p) { p.g = v; }
    let setter = method("store")
        .access(ProcAccess::Private)
        .formal("p", Typ::object(other))
        .body(vec![
            load_var(0, "p", Typ::object(other), 20),
            Instr::Store {
                lhs: Exp::field(Exp::var(0), FieldName::new(other, "g")),
                typ: Typ::Int,
                rhs: Exp::var(5),
                loc: loc(20),
            },
        ])
        .build();
    ProgramBuilder::thread_safe()
        .with_procedure(setter)
        .with_procedure(caller.build())
        .build()
}

fn call_store(actual: Exp, line: u32) -> Instr {
    call(
        None,
        ProcName::new(CLASS, "store"),
        vec![
            (Exp::var(0), Typ::object(CLASS)),
            (actual, Typ::object("com.example.Other")),
        ],
        line,
    )
}

#[test]
fn constant_argument_discharges_callee_obligation() {
    let program = program_with_private_setter(
        method("withNull").body(vec![load_this(0, 3), call_store(Exp::null(), 3)]),
    );

    assert_no_violations(&check(&program));
}

#[test]
fn fresh_argument_discharges_callee_obligation() {
    let alloc = Instr::Call {
        ret: Some((Ident(1), Typ::object("com.example.Other"))),
        callee: Callee::Builtin(Builtin::New),
        args: vec![],
        loc: loc(3),
    };
    let program = program_with_private_setter(
        method("withFresh").body(vec![load_this(0, 3), alloc, call_store(Exp::var(1), 4)]),
    );

    assert_no_violations(&check(&program));
}

#[test]
fn field_argument_is_reported_at_call_site() {
    let program = program_with_private_setter(method("withField").body(vec![
        load_this(0, 3),
        load_field(1, 0, "other", Typ::object("com.example.Other"), 3),
        call_store(Exp::var(1), 4),
    ]));

    let report = check(&program);
    let writes = violations(&report, IssueKind::UnprotectedWrite, "withField");
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].location, loc(4));
    assert_eq!(writes[0].trace.len(), 2);
    assert_eq!(writes[0].trace[0].description, "call to `Foo.store()`");
    assert_violation_count(&report, IssueKind::UnprotectedWrite, "store", 0);
}

#[test]
fn caller_lock_does_not_discharge_callee_obligation() {
    let lock_arg = || vec![(Exp::var(9), Typ::object(LOCK))];
    let program = program_with_private_setter(method("withFieldLocked").body(vec![
        load_this(0, 3),
        call(None, ProcName::new(LOCK, "lock"), lock_arg(), 3),
        load_field(1, 0, "other", Typ::object("com.example.Other"), 4),
        call_store(Exp::var(1), 4),
        call(None, ProcName::new(LOCK, "unlock"), lock_arg(), 5),
    ]));

    let report = check(&program);
    let writes = violations(&report, IssueKind::UnprotectedWrite, "withFieldLocked");
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].location, loc(4));
    assert_violation_count(&report, IssueKind::ReadWriteRace, "withFieldLocked", 0);
}

#[test]
fn custom_initializer_owns_receiver() {
    let pdesc = method("setup")
        .body(vec![load_this(0, 3), store_field(0, "x", Exp::var(5), 3)])
        .build();
    let program = ProgramBuilder::thread_safe().with_procedure(pdesc).build();

    let config = ThreadSafetyConfig::default().custom_initializer(CLASS, "setup");
    assert_no_violations(&check_program(&program, &config).unwrap());
    assert_eq!(check(&program).diagnostics.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Functional values
// ═══════════════════════════════════════════════════════════════════════════

fn program_caching(typ: Typ) -> Program {
    let compute = method("compute")
        .annotate(AnnotationKind::Functional)
        .returns(typ.clone())
        .body(vec![])
        .build();
    let cache = method("getCached")
        .body(vec![
            load_this(0, 5),
            call(
                Some((1, typ.clone())),
                ProcName::new(CLASS, "compute"),
                vec![(Exp::var(0), Typ::object(CLASS))],
                5,
            ),
            store_typed_field(0, "cached", typ, Exp::var(1), 6),
        ])
        .build();
    ProgramBuilder::thread_safe()
        .with_procedure(compute)
        .with_procedure(cache)
        .build()
}

#[test]
fn functional_result_write_is_suppressed() {
    assert_no_violations(&check(&program_caching(Typ::Int)));
}

#[test]
fn wide_functional_result_write_is_reported() {
    let report = check(&program_caching(Typ::Long));
    assert_violation_count(&report, IssueKind::UnprotectedWrite, "getCached", 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Containers
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn container_mutation_is_a_write() {
    let list = "java.util.List";
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("addItem")
                .body(vec![
                    load_this(0, 3),
                    load_field(1, 0, "items", Typ::object(list), 3),
                    call(
                        Some((2, Typ::Boolean)),
                        ProcName::new(list, "add"),
                        vec![(Exp::var(1), Typ::object(list)), (Exp::var(5), Typ::object("java.lang.Object"))],
                        3,
                    ),
                ])
                .build(),
        )
        .build();

    let report = check(&program);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].access, "this.items");
    assert!(report.diagnostics[0]
        .message
        .contains("mutates container `this.items` via call to `add`"));
}

#[test]
fn thread_safe_container_mutation_is_not_reported() {
    let map = "java.util.Map";
    let concurrent = "java.util.concurrent.ConcurrentHashMap";
    let program = ProgramBuilder::thread_safe()
        .with_class(ClassDecl::new(concurrent).with_super("java.util.concurrent.ConcurrentMap"))
        .with_procedure(
            method("put")
                .body(vec![
                    load_this(0, 3),
                    load_field(1, 0, "cache", Typ::object(concurrent), 3),
                    call(None, ProcName::new(map, "put"), vec![(Exp::var(1), Typ::object(concurrent))], 3),
                ])
                .build(),
        )
        .build();

    assert_no_violations(&check(&program));
}

#[test]
fn container_add_does_not_conflict_with_get() {
    let list = "java.util.List";
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("add")
                .access(ProcAccess::Private)
                .body(vec![
                    load_this(0, 3),
                    load_field(1, 0, "items", Typ::object(list), 3),
                    call(None, ProcName::new(list, "add"), vec![(Exp::var(1), Typ::object(list))], 3),
                ])
                .build(),
        )
        .with_procedure(
            method("get")
                .body(vec![
                    load_this(0, 7),
                    load_field(1, 0, "items", Typ::object(list), 7),
                    call(Some((2, Typ::object("java.lang.Object"))), ProcName::new(list, "get"), vec![(Exp::var(1), Typ::object(list))], 7),
                ])
                .build(),
        )
        .build();

    let report = check(&program);
    assert_violation_count(&report, IssueKind::ReadWriteRace, "get", 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Reporting gates
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn subclass_of_thread_safe_class_explains_why() {
    let base = "com.example.Base";
    let program = ProgramBuilder::new()
        .with_class(thread_safe_class(base))
        .with_class(ClassDecl::new(CLASS).with_super(base))
        .with_procedure(
            method("foo")
                .body(vec![load_this(0, 3), store_field(0, "x", Exp::var(5), 3)])
                .build(),
        )
        .build();

    let report = check(&program);
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0]
        .message
        .ends_with("Reporting because a superclass `com.example.Base` is annotated @ThreadSafe"));
}

#[test]
fn unannotated_class_is_not_reported() {
    let program = ProgramBuilder::new()
        .with_procedure(
            method("foo")
                .body(vec![load_this(0, 3), store_field(0, "x", Exp::var(5), 3)])
                .build(),
        )
        .build();

    assert_no_violations(&check(&program));
}

#[test]
fn disabled_issue_kinds_are_not_reported() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("foo")
                .body(vec![load_this(0, 3), store_field(0, "x", Exp::var(5), 3)])
                .build(),
        )
        .build();

    let config = ThreadSafetyConfig::default().report_unprotected_writes(false);
    assert_no_violations(&check_program(&program, &config).unwrap());
}

#[test]
fn diagnostics_stream_into_a_sink() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("write")
                .body(vec![load_this(0, 3), store_field(0, "x", Exp::int(1), 3)])
                .build(),
        )
        .with_procedure(
            method("read")
                .returns(Typ::Int)
                .body(vec![
                    load_this(0, 7),
                    load_field(1, 0, "x", Typ::Int, 7),
                    store_return(Exp::var(1), 7),
                ])
                .build(),
        )
        .build();

    let checker = ThreadSafetyChecker::default();
    let mut sink: Vec<Diagnostic> = Vec::new();
    let stats = checker.run_with_sink(&program, &mut sink).unwrap();

    assert_eq!(sink, checker.run(&program).unwrap().diagnostics);
    assert_eq!(stats.unprotected_writes, 1);
    assert_eq!(stats.read_write_races, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Summaries
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn each_summary_is_computed_once() {
    let helper = method("helper")
        .access(ProcAccess::Private)
        .body(vec![load_this(0, 20), store_field(0, "x", Exp::var(5), 20)])
        .build();
    let call_helper = |name: &str, line: u32| {
        method(name)
            .body(vec![
                load_this(0, line),
                call(
                    None,
                    ProcName::new(CLASS, "helper"),
                    vec![(Exp::var(0), Typ::object(CLASS))],
                    line,
                ),
            ])
            .build()
    };
    let program = ProgramBuilder::thread_safe()
        .with_procedure(call_helper("a", 3))
        .with_procedure(call_helper("b", 6))
        .with_procedure(call_helper("c", 9))
        .with_procedure(helper)
        .build();

    let report = check(&program);
    assert_eq!(report.stats.procedures, 4);
    assert_eq!(report.stats.summaries_computed, 4);
    assert_eq!(report.stats.unprotected_writes, 3);
}

#[test]
fn recursive_procedure_terminates() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("loop")
                .body(vec![
                    load_this(0, 3),
                    store_field(0, "x", Exp::var(5), 3),
                    call(
                        None,
                        ProcName::new(CLASS, "loop"),
                        vec![(Exp::var(0), Typ::object(CLASS))],
                        4,
                    ),
                ])
                .build(),
        )
        .build();

    let report = check(&program);
    assert_violation_count(&report, IssueKind::UnprotectedWrite, "loop", 1);
}

#[test]
fn program_survives_json_round_trip() {
    let program = ProgramBuilder::thread_safe()
        .with_procedure(
            method("foo")
                .body(vec![load_this(0, 3), store_field(0, "x", Exp::int(5), 3)])
                .build(),
        )
        .build();

    let json = serde_json::to_string(&program).unwrap();
    let reloaded = Program::from_json(&json).unwrap();
    assert_eq!(check(&reloaded).diagnostics, check(&program).diagnostics);
}
